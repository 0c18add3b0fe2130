use crate::catalog::{ARCHIVE_EXTENSION, EXTRACTED_EXTENSION};
use crate::error::Error;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractStatus {
    Extracted { path: PathBuf, removed_archive: bool },
    Skipped { path: PathBuf },
    /// Not a zip archive; the file has been deleted
    Corrupt,
    Failed { reason: String },
}

#[derive(Serialize, Clone, Debug)]
pub struct ExtractOutcome {
    pub archive: PathBuf,
    #[serde(flatten)]
    pub status: ExtractStatus,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct ExtractReport {
    pub outcomes: Vec<ExtractOutcome>,
}

impl ExtractReport {
    /// Product directories present in the output directory after the pass.
    pub fn extracted(self: &Self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                ExtractStatus::Extracted { path, .. } | ExtractStatus::Skipped { path } => {
                    Some(path.clone())
                }
                _ => None,
            })
            .collect()
    }
}

/// Extracts each archive into `output_dir` unless its `.SAFE` directory is already there.
///
/// Every path must carry the archive extension; this is checked before anything is touched.
/// Archives that turn out not to be zip files are deleted. With `remove` set, an archive is
/// deleted once it has been extracted.
pub fn decompress(archives: &[PathBuf], output_dir: &Path, remove: bool) -> Result<ExtractReport> {
    for archive in archives {
        let has_extension = archive
            .extension()
            .is_some_and(|ext| ext == ARCHIVE_EXTENSION);
        if !has_extension {
            return Err(Error::validation(format!(
                "Files to decompress must be .{} format: {}",
                ARCHIVE_EXTENSION,
                archive.display()
            ))
            .into());
        }
    }

    let mut report = ExtractReport::default();
    for archive in archives {
        let status = decompress_one(archive, output_dir, remove)?;
        report.outcomes.push(ExtractOutcome {
            archive: archive.clone(),
            status,
        });
    }
    Ok(report)
}

fn extracted_path(archive: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = archive
        .file_stem()
        .ok_or(anyhow!("Archive path has no file name: {}", archive.display()))?;
    let mut name = stem.to_os_string();
    name.push(format!(".{EXTRACTED_EXTENSION}"));
    Ok(output_dir.join(name))
}

fn decompress_one(archive: &Path, output_dir: &Path, remove: bool) -> Result<ExtractStatus> {
    let target = extracted_path(archive, output_dir)?;
    if target.exists() {
        info!(
            "Skipping extraction of {}, already extracted in {}",
            archive.display(),
            output_dir.display()
        );
        return Ok(ExtractStatus::Skipped { path: target });
    }

    info!("Extracting {}", archive.display());
    let file = match File::open(archive) {
        Ok(file) => file,
        Err(e) => {
            warn!("Unable to open {}: {}", archive.display(), e);
            return Ok(ExtractStatus::Failed {
                reason: e.to_string(),
            });
        }
    };
    let mut zip = match ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(e) => {
            warn!(
                "Could not extract {} ({}), removing the bad archive",
                archive.display(),
                e
            );
            fs::remove_file(archive)?;
            return Ok(ExtractStatus::Corrupt);
        }
    };

    if let Err(e) = extract_all(&mut zip, output_dir) {
        warn!("Extraction of {} failed: {:#}", archive.display(), e);
        // A partial directory would make the next run skip this archive
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        return Ok(ExtractStatus::Failed {
            reason: format!("{e:#}"),
        });
    }

    if !target.is_dir() {
        warn!(
            "{} did not contain {}, keeping the archive",
            archive.display(),
            target.display()
        );
        return Ok(ExtractStatus::Failed {
            reason: format!("Archive did not contain {}", target.display()),
        });
    }

    if remove {
        debug!("Removing {}", archive.display());
        fs::remove_file(archive)?;
    }
    Ok(ExtractStatus::Extracted {
        path: target,
        removed_archive: remove,
    })
}

fn extract_all(zip: &mut ZipArchive<File>, output_dir: &Path) -> Result<()> {
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let outpath = match entry.enclosed_name() {
            Some(path) => output_dir.join(path),
            None => {
                warn!("Ignoring archive entry with unsafe path: {}", entry.name());
                continue;
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }
    Ok(())
}

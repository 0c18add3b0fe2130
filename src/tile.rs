//! Sentinel-2 tiling grid identifiers
use regex::Regex;

/// Returns true if `tile` has the `##XXX` shape of a Sentinel-2 grid cell, e.g. `36KWA`.
pub fn validate_tile(tile: &str) -> bool {
    let re = Regex::new(r"^[0-9]{2}[A-Z]{3}$").expect("Regex pattern should always compile");
    re.is_match(tile)
}

/// Pulls the tile id out of a product title such as
/// `S2A_MSIL1C_20170105T013442_N0204_R031_T53NMJ_20170105T013443`.
pub fn tile_from_title(title: &str) -> Option<&str> {
    title
        .split('_')
        .filter_map(|part| part.strip_prefix('T'))
        .find(|candidate| validate_tile(candidate))
}

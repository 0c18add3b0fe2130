#![allow(async_fn_in_trait)]
pub mod catalog;
pub mod decompress;
pub mod dhus;
pub mod download;
pub mod error;
pub mod harvest;
pub mod search;
pub mod selection;
pub mod tile;

#[cfg(test)]
mod fake;

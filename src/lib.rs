//! Intent-driven enrichment of catalog records.
//!
//! An operator request is classified into one action, the matching generator
//! asks the generation service for content, and the merge policy writes only
//! what fills empty fields (the display name excepted) and adds or updates
//! free-form attributes without duplicating them.

pub mod batch;
pub mod db;
pub mod enrich;
pub mod error;
pub mod generation;
pub mod images;
pub mod intent;
pub mod merge;
mod migrations;
pub mod parser;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;

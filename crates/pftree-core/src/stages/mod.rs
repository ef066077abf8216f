//! Ready-made pipeline stages.

pub mod listing;

pub use listing::{ListingMode, ListingStages, TestSpec, LISTING_FILE};

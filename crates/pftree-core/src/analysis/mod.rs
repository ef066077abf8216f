//! Post-run analysis over the finished tree.

pub mod stats;

pub use stats::{aggregate, DirStat, StatsOrder, TreeStats};

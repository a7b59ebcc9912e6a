//! Library components of the `colmap` command-line tool.

pub mod events;
pub mod export;
pub mod logging;
pub mod report;

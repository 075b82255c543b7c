//! fieldpulse common - persistence, configuration and dataset loading
//!
//! The metrics engine itself lives in `fieldpulse-shared` and never touches
//! the filesystem; everything here is the host side around it.

pub mod config;
pub mod dataset_file;
pub mod visit_db;

pub use config::{PulseConfig, VisitStatusMode};
pub use dataset_file::load_dataset;
pub use visit_db::SqliteVisitStore;

//! Core functionality for organizing a folder of photographs.
//!
//! This library provides the building blocks of the organizer:
//! - Directory scanning and metadata extraction
//! - Period calendar arithmetic and the filename grammar
//! - Duplicate detection by content hash
//! - Folder assignment by year, event and period
//! - Previewable, backed-up batches of file moves

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::{Config, LogLevel, NamingDefaults};
pub use deduplication::DuplicateDetector;
pub use error::{Error, Result};
pub use naming::FilenamePatternGenerator;
pub use organize::{
    BatchPlan, BatchReport, ExecutionMode, FolderOrganizer, MoveOutcome, Operation, PendingBatch,
    PreviewedBatch,
};
pub use period::{parse_date_input, parse_event, PeriodConfiguration};
pub use report::{search_by_period, LibraryReport};
pub use service::{Analysis, CommitResult, OrganizationService};
pub use types::*;

// -- Public Modules --
pub mod backup;
pub mod config;
pub mod deduplication;
pub mod discovery;
pub mod logging;
pub mod naming;
pub mod organize;
pub mod period;
pub mod rename;
pub mod report;
pub mod service;
pub mod types;

// ABOUTME: Public library API for marksort saved-mark exports
// ABOUTME: Re-exports core modules for external use

pub mod assets;
pub mod auth;
pub mod bilibili;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod platform;
pub mod rednote;
pub mod resume;
pub mod storage;
pub mod util;

pub use error::{Error, Result};
pub use export::{run_export, ExportReport, ExportRequest};
pub use platform::{Cursor, EnrichedItem, MarkPage, MarkRef, Platform};
pub use resume::ResumeStore;

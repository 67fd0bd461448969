//! Claim extraction and evidence-grounded verification of documents.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;

pub use config::Config;
pub use error::{ExtractionCause, FactCheckError, GatewayError, Result};
pub use report::{summarize, StatusCounts, VerificationReport, VerificationRun};

//! Error types that cross component boundaries.
//!
//! Per the propagation policy: only fatal ingestion errors and
//! caller-initiated cancellation are allowed to escape the pipeline as
//! `Result::Err`. Everything else (a failed DNS lookup, a malformed SPF
//! record, an HTML parse failure) is captured as data inside the report.

use thiserror::Error;

/// Raised when the raw message bytes cannot be turned into a [`crate::message::ParsedMessage`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parseable header block found in message")]
    NoHeaderBlock,
    #[error("underlying mail parser failed: {0}")]
    MailParse(#[from] mailparse::MailParseError),
}

/// Raised by the report generator only for conditions that make a total
/// function impossible: an unparseable message, or a cancelled analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("analysis cancelled before completion")]
    Cancelled,
}

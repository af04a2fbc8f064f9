//! Email deliverability analysis: parses a raw message, runs authentication,
//! DNS, content, header, blacklist, and spam-filter analyzers against it, and
//! produces a scored [`report::Report`].

pub mod auth;
pub mod config;
pub mod content;
pub mod dns;
pub mod dns_analyzer;
pub mod error;
pub mod headers;
pub mod http_prober;
pub mod message;
pub mod rbl;
pub mod report;
pub mod scoring;
pub mod spamfilters;

pub use config::Config;
pub use error::{AnalysisError, ParseError};
pub use report::{generate_report, generate_report_for_message, Report};

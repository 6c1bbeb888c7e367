//! Library root for the `apexlog_extractor` crate
//! Retrieves Apex debug logs through the Salesforce REST/Tooling APIs

// Core error handling
pub mod errors;

// Configuration & CLI
pub mod cli;
pub mod config;
pub mod config_loader;
pub mod platform;

// Session & remote access
pub mod api;
pub mod models;
pub mod process;
pub mod session;

// Pipeline steps
pub mod archive;
pub mod deleter;
pub mod extractor;
pub mod limits;
pub mod retriever;
pub mod trace_flag;

#[cfg(test)]
mod tests {
    pub mod test_utils;
    pub mod trace_flag_tests;
    pub mod retrieval_tests;
    pub mod pipeline_tests;
}

pub use errors::{ExtractorError, ExtractorResult};
pub use extractor::{LogExtractor, RunOptions, RunSummary};
pub use session::Session;

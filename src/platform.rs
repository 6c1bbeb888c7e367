//! Platform gate
//!
//! The extractor shells out to the `sfdx` CLI and relies on POSIX paths for
//! its working directories. Windows users are pointed at the Docker image.

use crate::errors::{ExtractorError, ExtractorResult};

/// Name of the platform the binary was built for
pub fn current_platform() -> &'static str {
    std::env::consts::OS
}

pub fn is_supported(os: &str) -> bool {
    os != "windows"
}

/// Fails before any network activity on unsupported platforms.
pub fn ensure_supported(os: &str) -> ExtractorResult<()> {
    if is_supported(os) {
        Ok(())
    } else {
        Err(ExtractorError::unsupported_platform(format!(
            "{os} (currently only supported for linux/mac, deploy via Docker on windows)"
        )))
    }
}

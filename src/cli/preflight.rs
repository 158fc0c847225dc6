//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available before
//! starting operations that would otherwise fail midway.

use crate::error::{PodgistError, Result};
use crate::openai::require_api_key;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion requires media tools and an API key.
    Ingest,
    /// Rechunking and asking require only the API key.
    Ask,
    /// Keyword search has no external requirements.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ingest => {
            require_api_key()?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Operation::Ask => {
            require_api_key()?;
        }
        Operation::Search => {}
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe take -version with a single dash
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(PodgistError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PodgistError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(PodgistError::ToolFailed(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_has_no_requirements() {
        assert!(check(Operation::Search).is_ok());
    }
}

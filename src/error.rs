//! Error types for the renderer and the HTTP layer

use thiserror::Error;

/// Result type alias for dmshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a script into an image
#[derive(Error, Debug)]
pub enum Error {
    /// The browser process could not be started
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    /// The markup could not be loaded into the page
    #[error("Failed to load content: {0}")]
    LoadError(String),

    /// Screenshot capture failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error (scratch directory, output file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_underlying_message() {
        let err = Error::LaunchError("no chrome".into());
        assert_eq!(err.to_string(), "Browser launch failed: no chrome");
        assert_eq!(Error::Timeout(250).to_string(), "Operation timed out after 250ms");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}

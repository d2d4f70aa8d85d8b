//! dmshot
//!
//! Renders a two-party chat script into a PNG that looks like a phone
//! messaging screen, and serves that as an HTTP endpoint.
//!
//! # Features
//!
//! - **Script parsing**: `R) ` lines become right-hand bubbles, `L) ` lines
//!   become left-hand bubbles, everything else is ignored
//! - **CDP Backend** (default): markup is rasterized by headless Chrome
//! - **HTTP Endpoint**: `POST /generate` returns `image/png` bytes
//!
//! # Example
//!
//! Any [`Renderer`] can drive the pipeline; with the default `cdp` feature,
//! `dmshot::new_renderer(RenderConfig::default())` returns the Chrome one.
//!
//! ```
//! use dmshot::{Renderer, Result};
//! use std::path::Path;
//!
//! struct Placeholder;
//!
//! impl Renderer for Placeholder {
//!     fn render_to_file(&self, _html: &str, out: &Path) -> Result<()> {
//!         std::fs::write(out, b"\x89PNG\r\n\x1a\n")?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let png = dmshot::pipeline::generate_png(&Placeholder, "R) hey\nL) hi there")?;
//! assert_eq!(&png[..4], b"\x89PNG");
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

pub mod error;
pub use error::{Error, Result};

pub mod markup;
pub mod pipeline;
pub mod script;
pub mod server;
pub mod worker;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use script::{parse_script, Message, Side};
pub use server::{Server, ServerConfig, ServerHandle};

/// Canvas width in CSS pixels
pub const CANVAS_WIDTH: u32 = 1200;

/// Canvas height in CSS pixels
pub const CANVAS_HEIGHT: u32 = 800;

/// Configuration for the headless renderer
///
/// Defaults match the chat canvas: a 1200x800 viewport, a 300ms settle
/// delay and a 30 second ceiling on a single render.
///
/// # Examples
///
/// ```
/// let cfg = dmshot::RenderConfig::default();
/// assert_eq!(cfg.viewport.width, 1200);
/// assert_eq!(cfg.settle_delay_ms, 300);
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Viewport dimensions; the screenshot is clipped to exactly this size
    pub viewport: Viewport,
    /// How long to let fonts and layout settle before capturing
    pub settle_delay_ms: u64,
    /// What to wait for before the settle delay
    pub settle: SettleMode,
    /// Upper bound for one complete render (launch to teardown)
    pub timeout_ms: u64,
    /// Chrome/Chromium executable; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Extra command-line flags passed to the browser
    pub extra_args: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            settle_delay_ms: 300,
            settle: SettleMode::Delay,
            timeout_ms: 30000,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Reject configurations that could never produce an image
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

/// What the renderer waits for between loading content and capturing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleMode {
    /// Sleep for `settle_delay_ms` only
    Delay,
    /// Await `document.fonts.ready`, then sleep for `settle_delay_ms`
    FontsReady,
}

/// Turns a complete HTML document into a PNG file
///
/// Implementations must not keep any state between calls that affects the
/// output, and must release every resource they acquire before returning.
pub trait Renderer: Send + Sync {
    /// Render `html` and write the PNG to `out`
    fn render_to_file(&self, html: &str, out: &Path) -> Result<()>;
}

/// Create the default renderer (headless Chrome over CDP)
#[cfg(feature = "cdp")]
pub fn new_renderer(config: RenderConfig) -> Result<cdp::ChromeRenderer> {
    cdp::ChromeRenderer::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.viewport.width, 1200);
        assert_eq!(config.viewport.height, 800);
        assert_eq!(config.settle, SettleMode::Delay);
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let empty = RenderConfig {
            viewport: Viewport { width: 0, height: 800 },
            ..Default::default()
        };
        assert!(matches!(empty.validate(), Err(Error::ConfigError(_))));

        let no_time = RenderConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(no_time.validate(), Err(Error::ConfigError(_))));
    }
}

//! Chrome DevTools Protocol renderer (uses the `headless_chrome` crate)

use crate::worker::run_with_deadline;
use crate::{Error, RenderConfig, Renderer, Result, SettleMode, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Flags needed to run inside containers and other restricted hosts, and to
/// keep the screenshot pixel-exact.
const BASE_FLAGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--hide-scrollbars",
    "--force-device-scale-factor=1",
    "--force-color-profile=sRGB",
];

/// Headless Chrome renderer
///
/// A fresh browser is launched for every render and torn down before
/// `render_to_file` returns, so no state leaks between requests.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    config: RenderConfig,
}

impl ChromeRenderer {
    /// Validate `config` and create a renderer. No browser is started here.
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

impl Renderer for ChromeRenderer {
    fn render_to_file(&self, html: &str, out: &Path) -> Result<()> {
        let config = self.config.clone();
        let html = html.to_string();
        let out = out.to_path_buf();
        let timeout = Duration::from_millis(self.config.timeout_ms);

        run_with_deadline("chrome-render", timeout, move || {
            render_once(&config, &html, &out)
        })
    }
}

fn render_once(config: &RenderConfig, html: &str, out: &Path) -> Result<()> {
    let started = Instant::now();
    let session = ChromeSession::launch(config)?;
    debug!("Browser launched in {:?}", started.elapsed());

    session.load(html)?;
    session.settle(config)?;
    let png = session.capture(config.viewport)?;

    drop(session);
    debug!("Browser closed after {:?}", started.elapsed());

    std::fs::write(out, &png)?;
    debug!("Wrote {} byte screenshot", png.len());
    Ok(())
}

/// Command-line flags for a render, base flags first
fn launch_flags(config: &RenderConfig) -> Vec<String> {
    BASE_FLAGS
        .iter()
        .map(|f| f.to_string())
        .chain(config.extra_args.iter().cloned())
        .collect()
}

/// One browser process plus the tab we draw into. Dropping it kills the
/// browser through `headless_chrome::Browser`'s own `Drop`.
struct ChromeSession {
    // Field order matters: the tab goes before the browser that owns its transport
    tab: Arc<Tab>,
    _browser: Browser,
}

impl ChromeSession {
    fn launch(config: &RenderConfig) -> Result<Self> {
        let flags = launch_flags(config);
        let args: Vec<&OsStr> = flags.iter().map(|f| OsStr::new(f.as_str())).collect();
        let timeout = Duration::from_millis(config.timeout_ms);

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(timeout)
            .path(config.chrome_path.clone())
            .args(args)
            .build()
            .map_err(|e| Error::LaunchError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::LaunchError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::LaunchError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        Ok(Self { tab, _browser: browser })
    }

    /// Replace the blank page's document with `html`
    fn load(&self, html: &str) -> Result<()> {
        self.tab
            .navigate_to("about:blank")
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        // The top-level frame shares its id with the target
        let frame_id = self.tab.get_target_id().clone();
        self.tab
            .call_method(Page::SetDocumentContent {
                frame_id,
                html: html.to_string(),
            })
            .map_err(|e| Error::LoadError(format!("Failed to set document content: {}", e)))?;
        Ok(())
    }

    fn settle(&self, config: &RenderConfig) -> Result<()> {
        if config.settle == SettleMode::FontsReady {
            self.tab
                .evaluate("document.fonts.ready.then(() => true)", true)
                .map_err(|e| Error::LoadError(format!("Waiting for fonts failed: {}", e)))?;
        }
        std::thread::sleep(Duration::from_millis(config.settle_delay_ms));
        Ok(())
    }

    /// Capture exactly the viewport, never the full scrollable page
    fn capture(&self, viewport: Viewport) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(viewport.width),
            height: f64::from(viewport.height),
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
    }
}

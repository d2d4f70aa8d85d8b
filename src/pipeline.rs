//! Script-to-PNG render job.
//!
//! Every job gets its own scratch directory; it is removed when the job
//! finishes, whether rendering succeeded or not.

use crate::markup::build_html;
use crate::script::parse_script;
use crate::{Renderer, Result};
use log::debug;

const OUTPUT_FILE: &str = "output.png";

/// Parse `script`, build the chat markup, render it and return the PNG bytes.
pub fn generate_png<R: Renderer + ?Sized>(renderer: &R, script: &str) -> Result<Vec<u8>> {
    let workdir = tempfile::Builder::new().prefix("dmshot-").tempdir()?;
    let out = workdir.path().join(OUTPUT_FILE);

    let messages = parse_script(script);
    let html = build_html(&messages);
    debug!("Rendering {} message(s) to {}", messages.len(), out.display());

    renderer.render_to_file(&html, &out)?;
    let png = std::fs::read(&out)?;

    // Close explicitly so a failed removal surfaces instead of being swallowed by Drop
    workdir.close()?;
    Ok(png)
}

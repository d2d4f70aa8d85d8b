//! Render a chat script to `chat.png` with headless Chrome

use dmshot::{pipeline, RenderConfig, SettleMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("dmshot - render example\n");

    let config = RenderConfig {
        settle: SettleMode::FontsReady,
        ..Default::default()
    };

    println!("Renderer config:");
    println!("  Viewport: {}x{}", config.viewport.width, config.viewport.height);
    println!("  Settle: {:?} + {}ms", config.settle, config.settle_delay_ms);
    println!("  Timeout: {}ms\n", config.timeout_ms);

    let renderer = dmshot::new_renderer(config)?;

    let script = "R) hey\nL) hi there\nR) what's up\nL) <not much> & you?";
    for msg in dmshot::parse_script(script) {
        println!("  {:>4}px {:?}: {}", msg.top, msg.side, msg.text);
    }

    println!("\nRendering...");
    let png_data = pipeline::generate_png(&renderer, script)?;
    println!("Screenshot captured: {} bytes", png_data.len());

    std::fs::write("chat.png", png_data)?;
    println!("Saved to: chat.png");

    Ok(())
}

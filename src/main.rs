use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dmshot::{RenderConfig, Server, ServerConfig, SettleMode};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dmshot", version, about = "Render chat scripts to phone-style PNG screenshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP endpoint
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, env = "PORT", default_value_t = 10000)]
        port: u16,
        /// Request-handling threads (defaults to the number of CPUs)
        #[arg(long)]
        workers: Option<usize>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Render one script to a file and exit
    Render {
        /// Script file, or `-` for stdin
        #[arg(long)]
        script: String,
        /// Output PNG path
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Chrome/Chromium executable
    #[arg(long = "chrome", env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,
    /// Give up on a single render after this long
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
    /// Delay before capturing, after the content is loaded
    #[arg(long, default_value_t = 300)]
    settle_ms: u64,
    /// Wait for web fonts before the settle delay
    #[arg(long)]
    wait_fonts: bool,
    /// Extra browser flag (repeatable)
    #[arg(long = "chrome-arg", allow_hyphen_values = true)]
    chrome_args: Vec<String>,
}

impl RenderArgs {
    fn into_config(self) -> RenderConfig {
        RenderConfig {
            settle_delay_ms: self.settle_ms,
            settle: if self.wait_fonts { SettleMode::FontsReady } else { SettleMode::Delay },
            timeout_ms: self.timeout_ms,
            chrome_path: self.chrome_path,
            extra_args: self.chrome_args,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    match Cli::parse().command {
        Command::Serve { host, port, workers, render } => {
            let renderer = dmshot::new_renderer(render.into_config())?;
            let defaults = ServerConfig::default();
            let config = ServerConfig {
                host,
                port,
                workers: workers.unwrap_or(defaults.workers),
                ..defaults
            };
            log::info!("dmshot v{} starting", env!("CARGO_PKG_VERSION"));
            Server::bind(config, Arc::new(renderer))?.run()?;
        }
        Command::Render { script, out, render } => {
            let text = read_script(&script)?;
            let renderer = dmshot::new_renderer(render.into_config())?;
            let png = dmshot::pipeline::generate_png(&renderer, &text)?;
            std::fs::write(&out, &png)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            log::info!("Wrote {} ({} bytes)", out.display(), png.len());
        }
    }
    Ok(())
}

fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("Failed to read script from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("Failed to read script {}", source))
}

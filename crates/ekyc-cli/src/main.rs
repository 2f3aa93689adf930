use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ekyc_tools::{EkycTools, Options};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ekyc", about = "eKYC capture toolkit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a still document image
    Capture {
        #[command(flatten)]
        common: CommonOpts,
        /// Output mime type
        #[arg(long, env = "EKYC_MIME", default_value = "image/png")]
        mime: String,
    },
    /// Record a face-verification video clip
    Record {
        #[command(flatten)]
        common: CommonOpts,
        /// Output mime type
        #[arg(long, env = "EKYC_MIME", default_value = "video/webm")]
        mime: String,
        /// Required valid-face duration in milliseconds
        #[arg(long, env = "EKYC_RECORD_MS", default_value_t = 6000)]
        record_ms: u64,
        /// Disable face-position validation (record unconditionally)
        #[arg(long)]
        no_validation: bool,
        /// Where to write the poster still (defaults next to the video)
        #[arg(long)]
        poster: Option<PathBuf>,
    },
    /// List available cameras as JSON
    Devices,
}

#[derive(Args)]
struct CommonOpts {
    /// Where to write the blob; defaults to the generated content name
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Overlay content-box ratio; 0 disables the overlay
    #[arg(long, env = "EKYC_SHADING_RATIO")]
    shading_ratio: Option<f64>,
    /// Camera facing: "user" or "environment"
    #[arg(long, env = "EKYC_FACING")]
    facing: Option<String>,
    /// Encoder quality in [0, 1]
    #[arg(long, env = "EKYC_QUALITY")]
    quality: Option<f64>,
    /// Rendered viewport as WIDTHxHEIGHT; defaults to the native size
    #[arg(long, env = "EKYC_VIEWPORT")]
    viewport: Option<String>,
    #[arg(long, env = "EKYC_CANVAS_MIN_WIDTH")]
    canvas_min_width: Option<u32>,
    #[arg(long, env = "EKYC_CANVAS_MAX_WIDTH")]
    canvas_max_width: Option<u32>,
    #[arg(long, env = "EKYC_MAX_CANVAS_RATIO")]
    max_canvas_ratio: Option<f64>,
}

impl CommonOpts {
    fn to_options(&self, mime: &str) -> Options {
        Options {
            shading_ratio: self.shading_ratio,
            facing_mode: self.facing.clone(),
            quality: self.quality,
            mime_type: Some(mime.to_string()),
            canvas_min_width: self.canvas_min_width,
            canvas_max_width: self.canvas_max_width,
            max_canvas_ratio: self.max_canvas_ratio,
            ..Default::default()
        }
    }

    fn parse_viewport(&self) -> Result<Option<(u32, u32)>> {
        let Some(raw) = &self.viewport else { return Ok(None) };
        let (w, h) = raw
            .split_once('x')
            .with_context(|| format!("viewport must be WIDTHxHEIGHT, got {raw:?}"))?;
        Ok(Some((w.trim().parse()?, h.trim().parse()?)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture { common, mime } => capture(common, mime).await,
        Commands::Record { common, mime, record_ms, no_validation, poster } => {
            record(common, mime, record_ms, no_validation, poster).await
        }
        Commands::Devices => devices(),
    }
}

async fn capture(common: CommonOpts, mime: String) -> Result<()> {
    let tools = EkycTools::new();
    if let Some((w, h)) = common.parse_viewport()? {
        tools.set_viewport(w, h);
    }
    let options = common.to_options(&mime);

    let Some(result) = tools.get_image(options).await? else {
        anyhow::bail!("no capture produced (camera unavailable)");
    };
    let path = common.output.unwrap_or_else(|| PathBuf::from(&result.content_name));
    std::fs::write(&path, &result.blob)
        .with_context(|| format!("writing {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!("wrote {}", path.display());
    Ok(())
}

async fn record(
    common: CommonOpts,
    mime: String,
    record_ms: u64,
    no_validation: bool,
    poster_path: Option<PathBuf>,
) -> Result<()> {
    let mut tools = EkycTools::new();
    if let Some((w, h)) = common.parse_viewport()? {
        tools.set_viewport(w, h);
    }
    let mut options = common.to_options(&mime);
    options.record_ms = Some(record_ms);
    if no_validation {
        options.enable_validation = Some(false);
    }

    let Some(result) = tools.get_video(options).await? else {
        anyhow::bail!("no recording produced (camera unavailable or session closed)");
    };
    let path = common.output.unwrap_or_else(|| PathBuf::from(&result.video.content_name));
    std::fs::write(&path, &result.video.blob)
        .with_context(|| format!("writing {}", path.display()))?;
    if let Some(poster) = &result.poster {
        let path = poster_path.unwrap_or_else(|| PathBuf::from(&poster.content_name));
        std::fs::write(&path, &poster.blob)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("wrote poster {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn devices() -> Result<()> {
    let devices = ekyc_camera::list_devices();
    println!("{}", serde_json::to_string_pretty(&devices)?);
    if devices.is_empty() {
        eprintln!("no capture devices found");
    } else if ekyc_camera::has_both_facings() {
        eprintln!("front and back cameras available (switch-camera supported)");
    }
    Ok(())
}

mod compare;
mod config;
mod decode;
mod error;
mod pipeline;
mod scratch;
mod server;

#[cfg(test)]
mod fixtures;

use anyhow::Result;
use clap::Parser;
use config::{OutputFormat, PipelineConfig, Profile, ServiceConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Deployment profile (dev logs at DEBUG, production at WARN)
    #[arg(long, value_enum, default_value_t = Profile::Production)]
    profile: Profile,

    /// Enable debug logging regardless of profile
    #[arg(long)]
    debug: bool,

    /// Directory for per-request scratch files
    /// If not provided, intermediates are kept in memory
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Keep per-request scratch directories after the response is sent
    #[arg(long, requires = "scratch_dir")]
    keep_scratch: bool,

    /// Differences enclosing this many pixels or fewer are ignored
    #[arg(long, default_value_t = 200.0)]
    min_region_area: f64,

    /// Container for the annotated images
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    output_format: OutputFormat,

    /// JPEG quality when --output-format jpeg
    #[arg(long, default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = 32 * 1024 * 1024)]
    max_body_bytes: usize,

    /// Largest accepted input image in pixels (width * height)
    #[arg(long, default_value_t = 8_000_000)]
    max_image_pixels: u64,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        ServiceConfig {
            host: self.host,
            port: self.port,
            max_body_bytes: self.max_body_bytes,
            scratch_dir: self.scratch_dir,
            keep_scratch: self.keep_scratch,
            pipeline: PipelineConfig {
                min_region_area: self.min_region_area,
                output_format: self.output_format,
                jpeg_quality: self.jpeg_quality,
                max_image_pixels: self.max_image_pixels,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        args.profile.log_level()
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("imgdiff starting ({:?} profile)", args.profile);
    tracing::info!("Minimum region area: {}", args.min_region_area);
    tracing::info!("Output format: {:?}", args.output_format);

    let config = args.into_config();
    server::serve(config).await
}

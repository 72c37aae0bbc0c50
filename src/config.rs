use std::path::PathBuf;

use clap::ValueEnum;

/// Deployment profile; only the log level depends on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Dev,
    Production,
}

impl Profile {
    pub fn log_level(self) -> tracing::Level {
        match self {
            Profile::Dev => tracing::Level::DEBUG,
            Profile::Production => tracing::Level::WARN,
        }
    }
}

/// Container used for the annotated images returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

/// Knobs of the comparison pipeline itself
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Contours enclosing this area or less are treated as noise
    pub min_region_area: f64,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    /// Upper bound on width * height of a decoded input
    pub max_image_pixels: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_region_area: 200.0,
            output_format: OutputFormat::Png,
            jpeg_quality: 95,
            max_image_pixels: 8_000_000,
        }
    }
}

/// Everything the HTTP service needs at startup
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    /// `None` keeps intermediates in memory
    pub scratch_dir: Option<PathBuf>,
    pub keep_scratch: bool,
    pub pipeline: PipelineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 32 * 1024 * 1024,
            scratch_dir: None,
            keep_scratch: false,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pixel_limit_bounds_similarity_buffers() {
        // SSIM holds up to nine f64 planes of the input size at once
        let peak = PipelineConfig::default().max_image_pixels * 9 * std::mem::size_of::<f64>() as u64;
        assert!(peak <= 1 << 30, "peak {} bytes", peak);
    }

    #[test]
    fn output_extensions() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }
}

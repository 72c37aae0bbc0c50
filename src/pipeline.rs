use std::io::Cursor;
use std::time::Instant;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::compare::types::Region;
use crate::compare::{
    annotate, create_default_scorer, extract_regions, to_difference_map, to_luma, Annotations,
    SimilarityScorer,
};
use crate::config::{OutputFormat, PipelineConfig};
use crate::decode::{decode_input, encode_base64, DecodedInput};
use crate::error::CompareError;
use crate::scratch::{ScratchSession, ScratchStore};

pub const FIRST_FIELD: &str = "bfirstImg";
pub const SECOND_FIELD: &str = "bsecondImg";

/// Outcome of one successful comparison
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub score: f64,
    /// Number of regions that were annotated
    pub regions: usize,
    /// Second image with boxes around each region
    pub square_image: Vec<u8>,
    /// Second image with each region filled
    pub fill_image: Vec<u8>,
}

impl ComparisonResult {
    pub fn square_base64(&self) -> String {
        encode_base64(&self.square_image)
    }

    pub fn fill_base64(&self) -> String {
        encode_base64(&self.fill_image)
    }
}

/// Names of the annotated files inside a scratch session
struct OutputNames {
    square: String,
    fill: String,
}

/// Decode → score → extract → annotate → stage → encode, one request at a time
///
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct Pipeline {
    scorer: Box<dyn SimilarityScorer>,
    scratch: Box<dyn ScratchStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, scratch: Box<dyn ScratchStore>) -> Self {
        Self::with_scorer(config, scratch, create_default_scorer())
    }

    pub fn with_scorer(
        config: PipelineConfig,
        scratch: Box<dyn ScratchStore>,
        scorer: Box<dyn SimilarityScorer>,
    ) -> Self {
        let window = scorer.window_size();
        tracing::debug!("Similarity window {}x{}", window, window);
        Self {
            scorer,
            scratch,
            config,
        }
    }

    /// Compare two base64-encoded images
    pub fn run(&self, first: &str, second: &str) -> Result<ComparisonResult, CompareError> {
        let start = Instant::now();

        // Both payloads are validated before anything touches scratch storage
        let max_pixels = self.config.max_image_pixels;
        let first = decode_input(FIRST_FIELD, first, max_pixels)?;
        let second = decode_input(SECOND_FIELD, second, max_pixels)?;
        let decode_time = start.elapsed();

        let mut session = self
            .scratch
            .open_session()
            .map_err(CompareError::encoding)?;
        stage_inputs(session.as_mut(), &first, &second).map_err(CompareError::encoding)?;

        let compare_start = Instant::now();
        let (score, regions, annotations) = self
            .compare(&first.image, &second.image)
            .map_err(CompareError::comparison)?;
        let compare_time = compare_start.elapsed();

        let encode_start = Instant::now();
        let names = self
            .stage_outputs(session.as_mut(), &annotations)
            .map_err(CompareError::encoding)?;
        let square_image = session.read(&names.square).map_err(CompareError::encoding)?;
        let fill_image = session.read(&names.fill).map_err(CompareError::encoding)?;
        let encode_time = encode_start.elapsed();

        tracing::debug!(
            "Session {}: decode={:.1}ms, compare={:.1}ms, encode={:.1}ms",
            session.id(),
            decode_time.as_secs_f64() * 1000.0,
            compare_time.as_secs_f64() * 1000.0,
            encode_time.as_secs_f64() * 1000.0
        );
        tracing::info!(
            "Compared {}x{} images: ssim={:.6}, regions={}, total={:.1}ms",
            first.image.width(),
            first.image.height(),
            score,
            regions.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(ComparisonResult {
            score,
            regions: regions.len(),
            square_image,
            fill_image,
        })
    }

    /// Score, extract regions and render both annotation modes
    fn compare(
        &self,
        first: &RgbImage,
        second: &RgbImage,
    ) -> Result<(f64, Vec<Region>, Annotations)> {
        let _span = tracing::debug_span!("compare").entered();

        let gray_first = to_luma(first);
        let gray_second = to_luma(second);

        let similarity = self
            .scorer
            .score(&gray_first, &gray_second)
            .context("Failed to score similarity")?;
        let diff = to_difference_map(&similarity);

        let regions = extract_regions(diff, self.config.min_region_area);
        for region in &regions {
            tracing::debug!(
                "Region at ({}, {}) {}x{}, area {:.0}",
                region.x,
                region.y,
                region.width,
                region.height,
                region.area
            );
        }

        let annotations = annotate(first, second, &regions);
        Ok((similarity.score, regions, annotations))
    }

    fn stage_outputs(
        &self,
        session: &mut dyn ScratchSession,
        annotations: &Annotations,
    ) -> Result<OutputNames> {
        let _span = tracing::debug_span!("stage_outputs").entered();

        let ext = self.config.output_format.extension();
        let names = OutputNames {
            square: format!("square.{ext}"),
            fill: format!("fill.{ext}"),
        };

        let staged = [
            (names.square.clone(), &annotations.square_second),
            (names.fill.clone(), &annotations.filled_second),
            (format!("square_first.{ext}"), &annotations.square_first),
            (format!("mask.{ext}"), &annotations.mask),
        ];
        for (name, image) in staged {
            let bytes = encode_image(image, self.config.output_format, self.config.jpeg_quality)
                .with_context(|| format!("Failed to encode {}", name))?;
            session.write(&name, &bytes)?;
        }

        Ok(names)
    }
}

fn stage_inputs(
    session: &mut dyn ScratchSession,
    first: &DecodedInput,
    second: &DecodedInput,
) -> Result<()> {
    session.write(&format!("first.{}", first.extension()), &first.bytes)?;
    session.write(&format!("second.{}", second.extension()), &second.bytes)?;
    Ok(())
}

/// Encode an annotated image in the configured container
pub fn encode_image(image: &RgbImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => image
            .write_to(&mut buf, ImageFormat::Png)
            .context("PNG encoding failed")?,
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, jpeg_quality)
            .encode_image(image)
            .context("JPEG encoding failed")?,
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::annotate::MARK_COLOR;
    use crate::fixtures;
    use crate::scratch::{DirScratch, MemoryScratch};
    use image::Rgb;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default(), Box::new(MemoryScratch))
    }

    fn decode_png(bytes: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    fn count_marked(image: &RgbImage) -> usize {
        image.pixels().filter(|p| **p == MARK_COLOR).count()
    }

    #[test]
    fn identical_white_images() {
        let white = fixtures::png_base64(&fixtures::solid(100, 100, fixtures::WHITE));
        let result = pipeline().run(&white, &white).unwrap();

        assert!((result.score - 1.0).abs() < 1e-9);
        assert_eq!(result.regions, 0);
        let expected = fixtures::solid(100, 100, fixtures::WHITE);
        assert_eq!(decode_png(&result.square_image), expected);
        assert_eq!(decode_png(&result.fill_image), expected);
    }

    #[test]
    fn single_block_is_boxed_and_filled() {
        let first = fixtures::solid(100, 100, fixtures::WHITE);
        let second = fixtures::white_with_blocks(100, 100, &[(40, 30, 20, 20)]);
        let result = pipeline()
            .run(&fixtures::png_base64(&first), &fixtures::png_base64(&second))
            .unwrap();

        assert!(result.score < 1.0);
        assert_eq!(result.regions, 1);

        let square = decode_png(&result.square_image);
        let fill = decode_png(&result.fill_image);
        assert!(count_marked(&square) > 0);
        // the block interior stays black in square mode, turns green in fill mode
        assert_eq!(square.get_pixel(50, 40), &fixtures::BLACK);
        assert_eq!(fill.get_pixel(50, 40), &MARK_COLOR);
        assert_eq!(fill.get_pixel(5, 5), &fixtures::WHITE);
    }

    #[test]
    fn region_box_covers_block() {
        let pipeline = pipeline();
        let first = fixtures::solid(100, 100, fixtures::WHITE);
        let second = fixtures::white_with_blocks(100, 100, &[(40, 30, 20, 20)]);

        let (_, _, annotations) = pipeline.compare(&first, &second).unwrap();
        let gray = to_difference_map(
            &create_default_scorer()
                .score(&to_luma(&first), &to_luma(&second))
                .unwrap(),
        );
        let regions = extract_regions(gray, 200.0);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].covers(40, 30, 20, 20));
        assert_eq!(annotations.square_first.get_pixel(regions[0].x, regions[0].y), &MARK_COLOR);
    }

    #[test]
    fn corner_block_is_boxed() {
        let first = fixtures::solid(100, 100, fixtures::WHITE);
        let second = fixtures::white_with_blocks(100, 100, &[(0, 0, 30, 30)]);

        let (score, regions, annotations) = pipeline().compare(&first, &second).unwrap();
        assert!(score < 1.0);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].covers(0, 0, 30, 30));
        assert_eq!(annotations.filled_second.get_pixel(10, 10), &MARK_COLOR);
    }

    #[test]
    fn side_block_is_boxed() {
        let first = fixtures::solid(100, 100, fixtures::WHITE);
        let second = fixtures::white_with_blocks(100, 100, &[(0, 40, 30, 30)]);

        let result = pipeline()
            .run(&fixtures::png_base64(&first), &fixtures::png_base64(&second))
            .unwrap();
        assert_eq!(result.regions, 1);

        let (_, regions, _) = pipeline().compare(&first, &second).unwrap();
        assert!(regions[0].covers(0, 40, 30, 30));
    }

    #[test]
    fn white_against_black_is_one_full_region() {
        let white = fixtures::solid(100, 100, fixtures::WHITE);
        let black = fixtures::solid(100, 100, fixtures::BLACK);

        let (score, regions, _) = pipeline().compare(&white, &black).unwrap();
        assert!(score < 0.01);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!((region.x, region.y, region.width, region.height), (0, 0, 100, 100));
    }

    #[test]
    fn disjoint_blocks_each_become_a_region() {
        let first = fixtures::solid(120, 120, fixtures::WHITE);
        let second = fixtures::white_with_blocks(120, 120, &[(10, 10, 20, 20), (80, 20, 25, 25), (30, 80, 30, 20)]);
        let result = pipeline()
            .run(&fixtures::png_base64(&first), &fixtures::png_base64(&second))
            .unwrap();
        assert_eq!(result.regions, 3);
    }

    #[test]
    fn small_difference_is_not_annotated() {
        let first = fixtures::solid(100, 100, fixtures::WHITE);
        let second = fixtures::white_with_blocks(100, 100, &[(50, 50, 5, 5)]);
        let result = pipeline()
            .run(&fixtures::png_base64(&first), &fixtures::png_base64(&second))
            .unwrap();

        assert!(result.score < 1.0);
        assert_eq!(result.regions, 0);
        assert_eq!(count_marked(&decode_png(&result.fill_image)), 0);
    }

    #[test]
    fn malformed_base64_writes_no_scratch_files() {
        let tmp = tempdir().unwrap();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(DirScratch::new(tmp.path(), true).unwrap()),
        );
        let valid = fixtures::png_base64(&fixtures::solid(20, 20, fixtures::WHITE));

        let err = pipeline.run(&valid, "%%%not base64%%%").unwrap_err();
        assert!(matches!(err, CompareError::InvalidEncoding { field: SECOND_FIELD, .. }));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let valid = fixtures::png_base64(&fixtures::solid(20, 20, fixtures::WHITE));
        let text = encode_base64(b"definitely not an image");
        let err = pipeline().run(&text, &valid).unwrap_err();
        assert!(matches!(err, CompareError::InvalidImageFormat { field: FIRST_FIELD, .. }));
    }

    #[test]
    fn mismatched_dimensions_fail_comparison() {
        let a = fixtures::png_base64(&fixtures::solid(40, 40, fixtures::WHITE));
        let b = fixtures::png_base64(&fixtures::solid(40, 50, fixtures::WHITE));
        let err = pipeline().run(&a, &b).unwrap_err();
        assert!(matches!(err, CompareError::ComparisonFailure(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn kept_session_holds_inputs_and_outputs() {
        let tmp = tempdir().unwrap();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Box::new(DirScratch::new(tmp.path(), true).unwrap()),
        );
        let white = fixtures::png_base64(&fixtures::solid(30, 30, fixtures::WHITE));
        pipeline.run(&white, &white).unwrap();

        let sessions: Vec<_> = fs::read_dir(tmp.path()).unwrap().flatten().collect();
        assert_eq!(sessions.len(), 1);
        let mut names: Vec<String> = fs::read_dir(sessions[0].path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["fill.png", "first.png", "mask.png", "second.png", "square.png", "square_first.png"]
        );
    }

    #[test]
    fn jpeg_output_is_jpeg() {
        let config = PipelineConfig {
            output_format: OutputFormat::Jpeg,
            jpeg_quality: 90,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config, Box::new(MemoryScratch));
        let gray = fixtures::png_base64(&fixtures::solid(16, 16, Rgb([128, 128, 128])));
        let result = pipeline.run(&gray, &gray).unwrap();
        assert_eq!(&result.square_image[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&result.fill_image).unwrap(),
            ImageFormat::Jpeg
        );
    }
}

use anyhow::Result;
use image::GrayImage;
use imageproc::point::Point;
use ndarray::Array2;

/// Per-pixel similarity in [-1, 1], indexed `[row, column]`, plus its summary score
#[derive(Debug, Clone)]
pub struct SimilarityMap {
    pub score: f64,
    pub map: Array2<f64>,
}

impl SimilarityMap {
    /// Returns (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = self.map.dim();
        (cols as u32, rows as u32)
    }
}

/// Trait for similarity metrics
/// Allows swapping SSIM for another windowed metric without touching the pipeline
pub trait SimilarityScorer: Send + Sync {
    /// Compare two equally sized luminance images
    ///
    /// # Returns
    /// * The mean score and the full-size per-pixel map
    ///
    /// Fails when the images differ in size or are smaller than the window.
    fn score(&self, first: &GrayImage, second: &GrayImage) -> Result<SimilarityMap>;

    /// Side length of the square comparison window
    fn window_size(&self) -> u32;
}

/// A connected area of low similarity
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Polygon area enclosed by the outer contour
    pub area: f64,
    /// Outer contour, used for fill rendering
    pub contour: Vec<Point<i32>>,
}

#[cfg(test)]
impl Region {
    /// True when the bounding box fully contains the given rectangle
    pub fn covers(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        self.x <= x
            && self.y <= y
            && self.x + self.width >= x + width
            && self.y + self.height >= y + height
    }
}

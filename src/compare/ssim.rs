use anyhow::{bail, Context, Result};
use image::GrayImage;
use ndarray::{s, Array2, Zip};

use super::preprocess::to_array;
use super::types::{SimilarityMap, SimilarityScorer};

/// Side length of the comparison window
const WINDOW: usize = 7;

/// Structural similarity over a uniform square window
///
/// Local means, variances and covariance are box-filtered with mirrored
/// borders; variances use the sample (N - 1) normalisation. The summary
/// score averages the map away from the border half-window.
///
/// # Default Configuration
/// - 7x7 window
/// - K1 = 0.01, K2 = 0.03
/// - Data range 255 (8-bit inputs)
pub struct Ssim {
    window: usize,
    k1: f64,
    k2: f64,
    data_range: f64,
}

impl Default for Ssim {
    fn default() -> Self {
        Self {
            window: WINDOW,
            k1: 0.01,
            k2: 0.03,
            data_range: 255.0,
        }
    }
}

impl SimilarityScorer for Ssim {
    fn score(&self, first: &GrayImage, second: &GrayImage) -> Result<SimilarityMap> {
        let _span = tracing::debug_span!("ssim").entered();

        if first.dimensions() != second.dimensions() {
            bail!(
                "input dimensions differ: {}x{} vs {}x{}",
                first.width(),
                first.height(),
                second.width(),
                second.height()
            );
        }

        let (width, height) = first.dimensions();
        if (width as usize) < self.window || (height as usize) < self.window {
            bail!(
                "{}x{} is smaller than the {}x{} comparison window",
                width,
                height,
                self.window,
                self.window
            );
        }

        // At most nine full-size buffers are alive at once; each product is
        // dropped as soon as its mean is taken and the inputs before the map.
        let radius = self.window / 2;
        let x = to_array(first);
        let y = to_array(second);

        let ux = box_mean(&x, radius);
        let uy = box_mean(&y, radius);
        let uxx = box_mean(&(&x * &x), radius);
        let uyy = box_mean(&(&y * &y), radius);
        let uxy = box_mean(&(&x * &y), radius);
        drop(x);
        drop(y);

        let np = (self.window * self.window) as f64;
        let cov_norm = np / (np - 1.0);
        let c1 = (self.k1 * self.data_range).powi(2);
        let c2 = (self.k2 * self.data_range).powi(2);

        let map = Zip::from(&ux)
            .and(&uy)
            .and(&uxx)
            .and(&uyy)
            .and(&uxy)
            .map_collect(|&ux, &uy, &uxx, &uyy, &uxy| {
                let vx = cov_norm * (uxx - ux * ux);
                let vy = cov_norm * (uyy - uy * uy);
                let vxy = cov_norm * (uxy - ux * uy);

                let a1 = 2.0 * ux * uy + c1;
                let a2 = 2.0 * vxy + c2;
                let b1 = ux * ux + uy * uy + c1;
                let b2 = vx + vy + c2;

                (a1 * a2) / (b1 * b2)
            });

        let (rows, cols) = map.dim();
        let score = map
            .slice(s![radius..rows - radius, radius..cols - radius])
            .mean()
            .context("similarity map has no interior pixels")?;

        tracing::debug!("SSIM {:.6} over {}x{}", score, width, height);

        Ok(SimilarityMap { score, map })
    }

    fn window_size(&self) -> u32 {
        self.window as u32
    }
}

/// Mirror an out-of-range index back inside `0..len` (edge sample repeated)
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let mirrored = if index < 0 {
        -index - 1
    } else if index >= len {
        2 * len - index - 1
    } else {
        index
    };
    mirrored as usize
}

/// Separable mean filter over a `(2 * radius + 1)` square window
fn box_mean(input: &Array2<f64>, radius: usize) -> Array2<f64> {
    let (rows, cols) = input.dim();
    let span = radius as isize;
    let size = (2 * radius + 1) as f64;

    let horizontal = Array2::from_shape_fn((rows, cols), |(row, col)| {
        let sum: f64 = (-span..=span)
            .map(|k| input[[row, reflect(col as isize + k, cols)]])
            .sum();
        sum / size
    });

    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let sum: f64 = (-span..=span)
            .map(|k| horizontal[[reflect(row as isize + k, rows), col]])
            .sum();
        sum / size
    })
}

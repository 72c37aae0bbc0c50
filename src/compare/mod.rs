pub mod annotate;
mod preprocess;
mod regions;
mod ssim;
pub mod types;

pub use annotate::{annotate, Annotations};
pub use preprocess::{to_difference_map, to_luma};
pub use regions::extract_regions;
pub use ssim::Ssim;
pub use types::SimilarityScorer;

/// Create the default similarity metric (7x7 SSIM)
pub fn create_default_scorer() -> Box<dyn SimilarityScorer> {
    Box::new(Ssim::default())
}

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Recipe;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image service unavailable: {0}")]
    Unavailable(String),
    #[error("image generation failed for '{recipe}': {reason}")]
    Failed { recipe: String, reason: String },
}

/// Produces a picture for a finished recipe.
///
/// `Ok(None)` means no image was made; the recipe keeps an empty
/// `image_path`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, recipe: &Recipe) -> Result<Option<String>, ImageError>;
}

/// Used when no image backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledImageGenerator;

#[async_trait]
impl ImageGenerator for DisabledImageGenerator {
    async fn generate_image(&self, _recipe: &Recipe) -> Result<Option<String>, ImageError> {
        Ok(None)
    }
}

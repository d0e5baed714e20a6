use thiserror::Error;

use crate::types::RenderId;

/// Errors raised while setting up a particle sub-system.
///
/// None of these are fatal: the catalog logs them and carries on with the
/// remaining sub-systems of the explosion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    #[error("texture generation failed: {0}")]
    Texture(String),

    #[error("scene rejected {what}: {reason}")]
    Scene { what: &'static str, reason: String },

    #[error("renderable {0:?} is not known to the scene")]
    UnknownRenderable(RenderId),
}

pub type FxResult<T> = Result<T, FxError>;

use crate::error::{Error, Result};
use validator::Validate;

/// Runs the derived rules of `val`, reporting every failed field at once.
pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate().map_err(|errors| {
        tracing::warn!(%errors, "validation failed");
        Error::Validation(errors)
    })
}

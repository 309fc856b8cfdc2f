//! Operations exposed to external callers (CLI, embedding services).
//!
//! Each command validates its input before touching the store, logs what it
//! was asked and what it returned, and reports failures as [`AppError`].

pub mod debug;
pub mod index;
pub mod ratings;
pub mod recommend;
pub mod search;

use crate::error::AppError;
use std::time::Instant;

pub use debug::*;
pub use index::*;
pub use ratings::*;
pub use recommend::*;
pub use search::*;

/// Milliseconds since `start`, rounded to two decimals.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}

pub(crate) fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be blank", field)));
    }
    Ok(trimmed)
}

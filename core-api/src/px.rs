//! Pixel size conversion.
//!
//! Sizes authored against a design width are scaled by that width's device
//! ratio and expressed in the host's responsive unit.

use crate::error::{ApiError, Result};
use core_runtime::config::PxTransformConfig;
use std::fmt::Display;

pub const HOST_UNIT: &str = "rpx";

/// Convert `size` (a number or a string such as `"24px"`) to host units.
///
/// Only the leading integer of `size` is used, so `"24.8px"` converts as 24.
pub fn px_transform(size: impl Display, config: &PxTransformConfig) -> Result<String> {
    let ratio = config
        .ratio()
        .ok_or(ApiError::UnsupportedDesignWidth(config.design_width))?;

    let text = size.to_string();
    let value = leading_integer(&text).ok_or(ApiError::InvalidSize(text))?;

    Ok(format!("{}{}", value as f64 * ratio, HOST_UNIT))
}

/// Leading optionally-signed decimal integer, after leading whitespace.
fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

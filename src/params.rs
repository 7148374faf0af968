//! Transform request parameters.
//!
//! Parses the untrusted query string of an image request into a validated
//! [`TransformRequest`].
//!
//! # Recognized Parameters
//!
//! | Name | Meaning |
//! |------|---------|
//! | `a`  | action: `resize` (default) or `crop` |
//! | `r`  | resize mode: `contain`, `widen`, `heighten` or `cover` |
//! | `w`, `h` | target width / height, positive integers |
//! | `x`, `y` | crop origin, integers (may be negative) |
//!
//! # Pass-Through
//!
//! A resize request whose mode is missing or unrecognized, or an action other
//! than `resize`/`crop`, is not an error: it yields
//! [`TransformRequest::PassThrough`] and the source image is served as is.

use std::fmt;

use url::form_urlencoded;

use crate::error::ValidationError;

/// Decode a raw query string into ordered name/value pairs.
///
/// Order is preserved as received; the cache key depends on it.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// How a resize fits the source into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Fit inside `width x height`, preserving aspect ratio
    Contain,
    /// Exact width, height follows the aspect ratio
    Widen,
    /// Exact height, width follows the aspect ratio
    Heighten,
    /// Fill `width x height` exactly, cropping overflow from the center
    Cover,
}

impl ResizeMode {
    fn from_param(value: &str) -> Option<Self> {
        match value {
            "contain" => Some(ResizeMode::Contain),
            "widen" => Some(ResizeMode::Widen),
            "heighten" => Some(ResizeMode::Heighten),
            "cover" => Some(ResizeMode::Cover),
            _ => None,
        }
    }

    /// Query-string spelling of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMode::Contain => "contain",
            ResizeMode::Widen => "widen",
            ResizeMode::Heighten => "heighten",
            ResizeMode::Cover => "cover",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated transform request.
///
/// Built fresh for every incoming request and never mutated afterwards.
/// Which dimensions are present depends on the mode: `Widen` carries only a
/// width, `Heighten` only a height, `Contain` and `Cover` both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformRequest {
    /// Geometric resize
    Resize {
        mode: ResizeMode,
        width: Option<u32>,
        height: Option<u32>,
    },

    /// Extract a `width x height` rectangle with its top-left corner at `(x, y)`
    Crop {
        width: u32,
        height: u32,
        x: i32,
        y: i32,
    },

    /// Serve the source unchanged
    PassThrough,
}

impl TransformRequest {
    /// Parse and validate a request from decoded query pairs.
    ///
    /// When a name appears more than once, the last value wins. Empty values
    /// count as absent.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingParameter`] if the operation needs a value that is absent
    /// - [`ValidationError::InvalidDimension`] if `w`/`h` is not a positive integer
    /// - [`ValidationError::InvalidCoordinate`] if `x`/`y` is not an integer
    pub fn parse(pairs: &[(String, String)]) -> Result<Self, ValidationError> {
        let action = lookup(pairs, "a").unwrap_or("resize");

        match action {
            "resize" => {
                let Some(mode) = lookup(pairs, "r").and_then(ResizeMode::from_param) else {
                    return Ok(TransformRequest::PassThrough);
                };

                let width = dimension(pairs, "w")?;
                let height = dimension(pairs, "h")?;

                match mode {
                    ResizeMode::Widen => {
                        require(width, "w")?;
                    }
                    ResizeMode::Heighten => {
                        require(height, "h")?;
                    }
                    ResizeMode::Contain | ResizeMode::Cover => {
                        require(width, "w")?;
                        require(height, "h")?;
                    }
                }

                Ok(TransformRequest::Resize {
                    mode,
                    width,
                    height,
                })
            }
            "crop" => Ok(TransformRequest::Crop {
                width: require(dimension(pairs, "w")?, "w")?,
                height: require(dimension(pairs, "h")?, "h")?,
                x: require(coordinate(pairs, "x")?, "x")?,
                y: require(coordinate(pairs, "y")?, "y")?,
            }),
            _ => Ok(TransformRequest::PassThrough),
        }
    }

    /// Whether this request leaves the source untouched.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, TransformRequest::PassThrough)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn require<T>(value: Option<T>, name: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingParameter(name))
}

fn dimension(
    pairs: &[(String, String)],
    name: &'static str,
) -> Result<Option<u32>, ValidationError> {
    let Some(raw) = lookup(pairs, name) else {
        return Ok(None);
    };

    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ValidationError::InvalidDimension {
            name,
            value: raw.to_string(),
        }),
    }
}

fn coordinate(
    pairs: &[(String, String)],
    name: &'static str,
) -> Result<Option<i32>, ValidationError> {
    let Some(raw) = lookup(pairs, name) else {
        return Ok(None);
    };

    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidCoordinate {
            name,
            value: raw.to_string(),
        })
}

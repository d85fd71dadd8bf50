//! Padding and window spacing.
//!
//! Values are resolved cell first, then layout, then global settings. The
//! first level that sets a value wins; nothing set anywhere means zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigurationError;
use crate::sys::geometry::Rect;

/// A single spacing value: absolute pixels, or `N × base_spacing` when
/// written as `"Nx"`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpacing", into = "RawSpacing")]
pub enum SpacingValue {
    Pixels(f64),
    Relative(f64),
}

impl SpacingValue {
    pub fn resolve(self, base_spacing: f64) -> f64 {
        match self {
            SpacingValue::Pixels(px) => px,
            SpacingValue::Relative(n) => n * base_spacing,
        }
    }

    fn from_number(value: f64) -> Result<Self, ConfigurationError> {
        if value.is_finite() && value >= 0.0 {
            Ok(SpacingValue::Pixels(value))
        } else {
            Err(ConfigurationError::InvalidSpacing(value.to_string()))
        }
    }
}

impl Default for SpacingValue {
    fn default() -> Self { SpacingValue::Pixels(0.0) }
}

impl FromStr for SpacingValue {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ConfigurationError::InvalidSpacing(s.to_string());
        let number = |n: &str| -> Result<f64, ConfigurationError> {
            let n: f64 = n.trim().parse().map_err(|_| invalid())?;
            if n.is_finite() && n >= 0.0 { Ok(n) } else { Err(invalid()) }
        };

        if let Some(n) = trimmed.strip_suffix("px") {
            Ok(SpacingValue::Pixels(number(n)?))
        } else if let Some(n) = trimmed.strip_suffix('x') {
            Ok(SpacingValue::Relative(number(n)?))
        } else {
            Ok(SpacingValue::Pixels(number(trimmed)?))
        }
    }
}

impl fmt::Display for SpacingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpacingValue::Pixels(px) => write!(f, "{px}px"),
            SpacingValue::Relative(n) => write!(f, "{n}x"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSpacing {
    Number(f64),
    Text(String),
}

impl TryFrom<RawSpacing> for SpacingValue {
    type Error = ConfigurationError;

    fn try_from(raw: RawSpacing) -> Result<Self, Self::Error> {
        match raw {
            RawSpacing::Number(n) => SpacingValue::from_number(n),
            RawSpacing::Text(s) => s.parse(),
        }
    }
}

impl From<SpacingValue> for RawSpacing {
    fn from(value: SpacingValue) -> Self {
        match value {
            SpacingValue::Pixels(px) => RawSpacing::Number(px),
            value @ SpacingValue::Relative(_) => RawSpacing::Text(value.to_string()),
        }
    }
}

/// Four sided padding as written in configuration.
///
/// Accepts a single value, a CSS style list of one to four values, or a
/// `{ top, right, bottom, left }` table with missing sides at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPadding", into = "RawPadding")]
pub struct PaddingSpec {
    pub top: SpacingValue,
    pub right: SpacingValue,
    pub bottom: SpacingValue,
    pub left: SpacingValue,
}

impl PaddingSpec {
    pub fn uniform(value: SpacingValue) -> Self {
        PaddingSpec { top: value, right: value, bottom: value, left: value }
    }

    pub fn from_values(values: &[SpacingValue]) -> Result<Self, ConfigurationError> {
        let spec = match *values {
            [all] => PaddingSpec::uniform(all),
            [vertical, horizontal] => PaddingSpec {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            },
            [top, horizontal, bottom] => PaddingSpec {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            },
            [top, right, bottom, left] => PaddingSpec { top, right, bottom, left },
            _ => {
                return Err(ConfigurationError::InvalidSpacing(format!(
                    "expected 1 to 4 padding values, got {}",
                    values.len()
                )));
            }
        };
        Ok(spec)
    }

    pub fn resolve(&self, base_spacing: f64) -> Insets {
        Insets {
            top: self.top.resolve(base_spacing),
            right: self.right.resolve(base_spacing),
            bottom: self.bottom.resolve(base_spacing),
            left: self.left.resolve(base_spacing),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPadding {
    Uniform(SpacingValue),
    List(Vec<SpacingValue>),
    Sides {
        #[serde(default)]
        top: SpacingValue,
        #[serde(default)]
        right: SpacingValue,
        #[serde(default)]
        bottom: SpacingValue,
        #[serde(default)]
        left: SpacingValue,
    },
}

impl TryFrom<RawPadding> for PaddingSpec {
    type Error = ConfigurationError;

    fn try_from(raw: RawPadding) -> Result<Self, Self::Error> {
        match raw {
            RawPadding::Uniform(value) => Ok(PaddingSpec::uniform(value)),
            RawPadding::List(values) => PaddingSpec::from_values(&values),
            RawPadding::Sides { top, right, bottom, left } => {
                Ok(PaddingSpec { top, right, bottom, left })
            }
        }
    }
}

impl From<PaddingSpec> for RawPadding {
    fn from(spec: PaddingSpec) -> Self {
        if spec == PaddingSpec::uniform(spec.top) {
            RawPadding::Uniform(spec.top)
        } else {
            RawPadding::Sides {
                top: spec.top,
                right: spec.right,
                bottom: spec.bottom,
                left: spec.left,
            }
        }
    }
}

/// Resolved padding in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    pub const ZERO: Insets = Insets { top: 0.0, right: 0.0, bottom: 0.0, left: 0.0 };

    /// Shrinks `rect` by the insets. Never produces a negative size.
    pub fn apply(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x + self.left,
            rect.y + self.top,
            (rect.width - self.left - self.right).max(0.0),
            (rect.height - self.top - self.bottom).max(0.0),
        )
    }
}

/// Cell, layout and global levels of one setting, most specific first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpacingLevels<'a, T> {
    pub cell: Option<&'a T>,
    pub layout: Option<&'a T>,
    pub global: Option<&'a T>,
}

impl<'a, T> SpacingLevels<'a, T> {
    pub fn first(&self) -> Option<&'a T> { self.cell.or(self.layout).or(self.global) }
}

pub fn resolve_padding(levels: SpacingLevels<'_, PaddingSpec>, base_spacing: f64) -> Insets {
    levels.first().map_or(Insets::ZERO, |spec| spec.resolve(base_spacing))
}

pub fn resolve_window_spacing(levels: SpacingLevels<'_, SpacingValue>, base_spacing: f64) -> f64 {
    levels.first().map_or(0.0, |value| value.resolve(base_spacing))
}

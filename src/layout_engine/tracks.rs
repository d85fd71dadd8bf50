//! Column/row track sizing.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_with::{DeserializeFromStr, SerializeDisplay};

use super::ConfigurationError;

/// Size given to `auto` tracks. Content based sizing is not available to the
/// layout engine, so they behave like a fixed track of this many pixels.
pub const AUTO_TRACK_SIZE: f64 = 0.0;

/// Upper bound of a `minmax()` track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackMax {
    /// Flexible weight with no pixel cap.
    Fr(f64),
    /// Pixel cap, flexes with weight 1.
    Px(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub enum TrackSize {
    Fr(f64),
    Px(f64),
    Auto,
    MinMax { min: f64, max: TrackMax },
}

impl TrackSize {
    fn flex_weight(&self) -> f64 {
        match *self {
            TrackSize::Fr(fr) => fr,
            TrackSize::MinMax { max: TrackMax::Fr(fr), .. } => fr,
            TrackSize::MinMax { max: TrackMax::Px(_), .. } => 1.0,
            TrackSize::Px(_) | TrackSize::Auto => 0.0,
        }
    }

    fn is_flexible(&self) -> bool { matches!(self, TrackSize::Fr(_) | TrackSize::MinMax { .. }) }

    /// Clamps a proposed flexible size into the track's bounds.
    fn clamp(&self, proposed: f64) -> f64 {
        match *self {
            TrackSize::MinMax { min, max } => {
                let upper = match max {
                    TrackMax::Fr(_) => f64::INFINITY,
                    TrackMax::Px(px) => px.max(min),
                };
                proposed.clamp(min, upper)
            }
            _ => proposed.max(0.0),
        }
    }
}

const NUMBER: &str = r"(\d+(?:\.\d+)?)";

static FR_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!(r"^{NUMBER}\s*fr$")).ok());
static PX_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!(r"^{NUMBER}\s*px$")).ok());
static MINMAX_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(&format!(
        r"^minmax\s*\(\s*{NUMBER}\s*px\s*,\s*{NUMBER}\s*(fr|px)\s*\)$"
    ))
    .ok()
});

fn capture_number(pattern: &Lazy<Option<Regex>>, s: &str) -> Option<f64> {
    let caps = pattern.as_ref()?.captures(s)?;
    caps.get(1)?.as_str().parse().ok()
}

impl FromStr for TrackSize {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || ConfigurationError::MalformedTrack(s.to_string());

        if s == "auto" {
            return Ok(TrackSize::Auto);
        }
        if let Some(fr) = capture_number(&FR_PATTERN, s) {
            return Ok(TrackSize::Fr(fr));
        }
        if let Some(px) = capture_number(&PX_PATTERN, s) {
            return Ok(TrackSize::Px(px));
        }

        let caps = MINMAX_PATTERN.as_ref().and_then(|re| re.captures(s)).ok_or_else(malformed)?;
        let number = |i: usize| -> Result<f64, ConfigurationError> {
            caps.get(i).and_then(|m| m.as_str().parse().ok()).ok_or_else(malformed)
        };
        let min = number(1)?;
        let max = number(2)?;
        let max = match caps.get(3).map(|m| m.as_str()) {
            Some("px") => TrackMax::Px(max),
            _ => TrackMax::Fr(max),
        };
        Ok(TrackSize::MinMax { min, max })
    }
}

fn fmt_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 {
        write!(f, "{value:.0}")
    } else {
        write!(f, "{value:.2}")
    }
}

impl fmt::Display for TrackSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TrackSize::Fr(fr) => {
                fmt_number(f, fr)?;
                f.write_str("fr")
            }
            TrackSize::Px(px) => {
                fmt_number(f, px)?;
                f.write_str("px")
            }
            TrackSize::Auto => f.write_str("auto"),
            TrackSize::MinMax { min, max } => {
                f.write_str("minmax(")?;
                fmt_number(f, min)?;
                f.write_str("px, ")?;
                match max {
                    TrackMax::Fr(fr) => {
                        fmt_number(f, fr)?;
                        f.write_str("fr)")
                    }
                    TrackMax::Px(px) => {
                        fmt_number(f, px)?;
                        f.write_str("px)")
                    }
                }
            }
        }
    }
}

pub fn parse_tracks<S: AsRef<str>>(specs: &[S]) -> Result<Vec<TrackSize>, ConfigurationError> {
    specs.iter().map(|s| s.as_ref().parse()).collect()
}

/// Resolves `tracks` into pixel sizes for `available` pixels, with `gap`
/// pixels between consecutive tracks but not at the outer edges.
pub fn calculate_tracks(tracks: &[TrackSize], available: f64, gap: f64) -> Vec<f64> {
    if tracks.is_empty() {
        return Vec::new();
    }

    let mut sizes = vec![0.0; tracks.len()];
    let mut remaining = available - gap * (tracks.len() - 1) as f64;
    let mut flexible = Vec::new();

    for (i, track) in tracks.iter().enumerate() {
        match *track {
            TrackSize::Px(px) => {
                sizes[i] = px.max(0.0);
                remaining -= sizes[i];
            }
            TrackSize::Auto => {
                sizes[i] = AUTO_TRACK_SIZE;
                remaining -= AUTO_TRACK_SIZE;
            }
            _ if track.is_flexible() => flexible.push(i),
            _ => {}
        }
    }

    distribute_flexible(tracks, &mut sizes, flexible, remaining.max(0.0));
    sizes
}

/// Shares `space` among the flexible tracks by weight. A track whose share
/// violates its bounds is frozen at the bound and the rest is shared again
/// among the tracks still open.
fn distribute_flexible(tracks: &[TrackSize], sizes: &mut [f64], mut open: Vec<usize>, mut space: f64) {
    loop {
        if open.is_empty() {
            return;
        }
        let total_weight: f64 = open.iter().map(|&i| tracks[i].flex_weight()).sum();
        let unit = if total_weight > 0.0 { space / total_weight } else { 0.0 };

        let mut froze_any = false;
        open.retain(|&i| {
            let proposed = unit * tracks[i].flex_weight();
            let clamped = tracks[i].clamp(proposed);
            if clamped != proposed {
                sizes[i] = clamped;
                space -= clamped;
                froze_any = true;
                false
            } else {
                true
            }
        });

        if !froze_any {
            for &i in &open {
                sizes[i] = unit * tracks[i].flex_weight();
            }
            return;
        }
        space = space.max(0.0);
    }
}

/// Start offset of every track plus the end of the last one
/// (`sizes.len() + 1` entries).
pub fn track_positions(sizes: &[f64], gap: f64) -> Vec<f64> {
    let mut positions = Vec::with_capacity(sizes.len() + 1);
    positions.push(0.0);
    for (i, size) in sizes.iter().enumerate() {
        let mut next = positions[i] + size;
        if i + 1 < sizes.len() {
            next += gap;
        }
        positions.push(next);
    }
    positions
}

//! Plain geometry value types shared by the layout engine and the window server.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Point { x, y } }
}

/// Screen rectangle with a top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn min_x(&self) -> f64 { self.x }
    pub fn max_x(&self) -> f64 { self.x + self.width }
    pub fn min_y(&self) -> f64 { self.y }
    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool { *self == Rect::ZERO }
}

/// Snaps to whole pixels. Rect edges are rounded, not the size, so rects
/// that shared an edge still do.
pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min_x = self.min_x().round();
        let min_y = self.min_y().round();
        Rect {
            x: min_x,
            y: min_y,
            width: self.max_x().round() - min_x,
            height: self.max_y().round() - min_y,
        }
    }
}

pub trait RectExt {
    fn intersection(&self, other: &Self) -> Self;
    /// Area shared by both rectangles, zero when they only touch.
    fn overlap(&self, other: &Self) -> f64;
    fn contains(&self, point: Point) -> bool;
    fn contains_rect(&self, other: Self) -> bool;
    fn overlaps_vertically(&self, other: &Self) -> bool;
    fn overlaps_horizontally(&self, other: &Self) -> bool;
    fn area(&self) -> f64;
}

impl RectExt for Rect {
    fn intersection(&self, other: &Self) -> Self {
        let min_x = f64::max(self.min_x(), other.min_x());
        let max_x = f64::min(self.max_x(), other.max_x());
        let min_y = f64::max(self.min_y(), other.min_y());
        let max_y = f64::min(self.max_y(), other.max_y());
        Rect::new(min_x, min_y, f64::max(max_x - min_x, 0.), f64::max(max_y - min_y, 0.))
    }

    fn overlap(&self, other: &Self) -> f64 { self.intersection(other).area() }

    fn contains(&self, point: Point) -> bool {
        (self.min_x()..=self.max_x()).contains(&point.x)
            && (self.min_y()..=self.max_y()).contains(&point.y)
    }

    fn contains_rect(&self, other: Self) -> bool {
        self.min_x() <= other.min_x()
            && self.min_y() <= other.min_y()
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }

    fn overlaps_vertically(&self, other: &Self) -> bool {
        self.min_y() < other.max_y() && self.max_y() > other.min_y()
    }

    fn overlaps_horizontally(&self, other: &Self) -> bool {
        self.min_x() < other.max_x() && self.max_x() > other.min_x()
    }

    fn area(&self) -> f64 { self.width * self.height }
}

use serde::{Deserialize, Serialize};

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;
/// English Metric Units per typographic point.
pub const EMU_PER_PT: i64 = 12_700;
/// English Metric Units per millimetre.
pub const EMU_PER_MM: i64 = 36_000;

pub fn pt(value: f64) -> i64 {
    (value * EMU_PER_PT as f64) as i64
}

/// Absolute box in EMU. This is the interchange unit between the resolver and every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub const fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left as f64 + self.width as f64 / 2.0,
            self.top as f64 + self.height as f64 / 2.0,
        )
    }

    /// Shrinks the box on every side; never produces a negative extent.
    pub fn inset(self, dx: i64, dy: i64) -> Self {
        let dx = dx.max(0);
        let dy = dy.max(0);
        Self {
            left: self.left + dx,
            top: self.top + dy,
            width: (self.width - dx * 2).max(0),
            height: (self.height - dy * 2).max(0),
        }
    }

    /// Grows the box by `dx`/`dy` on every side.
    pub fn outset(self, dx: i64, dy: i64) -> Self {
        Self {
            left: self.left - dx,
            top: self.top - dy,
            width: (self.width + dx * 2).max(0),
            height: (self.height + dy * 2).max(0),
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, rect| match acc {
                Some(acc) => Some(acc.union(rect)),
                None => Some(*rect),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

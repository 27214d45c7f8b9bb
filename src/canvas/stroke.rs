//! Per-color stroke history
//!
//! Every color owns an ordered list of strokes, and every stroke is an ordered
//! list of points. Points are only ever appended to the last (open) stroke of
//! a color; a pen lift opens a new stroke so consecutive strokes never join.

use std::collections::VecDeque;

use super::color::PaintColor;

/// A canvas position in frame pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Strokes of a single color
#[derive(Clone, Debug, Default)]
struct ColorHistory {
    strokes: VecDeque<Vec<Point>>,
    points: usize,
}

impl ColorHistory {
    /// Drop points from the oldest end until at most `limit` remain.
    /// The open stroke is trimmed but never removed.
    fn enforce_limit(&mut self, limit: usize) {
        let mut excess = self.points.saturating_sub(limit);
        while excess > 0 {
            let has_successor = self.strokes.len() > 1;
            let Some(front) = self.strokes.front_mut() else {
                break;
            };

            if has_successor && front.len() <= excess {
                excess -= front.len();
                self.points -= front.len();
                self.strokes.pop_front();
            } else {
                let n = excess.min(front.len());
                front.drain(..n);
                excess -= n;
                self.points -= n;
                if n == 0 {
                    break;
                }
            }
        }
    }
}

/// Stroke buffer for all paint colors
#[derive(Clone, Debug, Default)]
pub struct StrokeBuffer {
    histories: [ColorHistory; 4],
    history_limit: Option<usize>,
}

impl StrokeBuffer {
    /// Create an unbounded buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that keeps at most `limit` points per color
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history_limit: limit.filter(|&l| l > 0),
            ..Self::default()
        }
    }

    fn history(&self, color: PaintColor) -> &ColorHistory {
        &self.histories[color.index()]
    }

    fn history_mut(&mut self, color: PaintColor) -> &mut ColorHistory {
        &mut self.histories[color.index()]
    }

    /// Open a new stroke for `color`.
    ///
    /// Does nothing if the color's open stroke is still empty, so repeated pen
    /// lifts never pile up empty strokes. Returns whether a stroke was added.
    pub fn begin_stroke(&mut self, color: PaintColor) -> bool {
        let history = self.history_mut(color);
        match history.strokes.back() {
            Some(last) if last.is_empty() => false,
            _ => {
                history.strokes.push_back(Vec::new());
                true
            }
        }
    }

    /// Append a point to the open stroke of `color`.
    ///
    /// The pen starts lifted: until the first stroke is opened, points are
    /// dropped and `false` is returned.
    pub fn push_point(&mut self, color: PaintColor, point: Point) -> bool {
        let limit = self.history_limit;
        let history = self.history_mut(color);
        let Some(open) = history.strokes.back_mut() else {
            return false;
        };
        open.push(point);
        history.points += 1;
        if let Some(limit) = limit {
            history.enforce_limit(limit);
        }
        true
    }

    /// Append a point, opening a stroke first if `color` has none
    pub fn push_free(&mut self, color: PaintColor, point: Point) {
        if self.history(color).strokes.is_empty() {
            self.begin_stroke(color);
        }
        self.push_point(color, point);
    }

    /// Strokes of `color`, oldest first
    pub fn strokes(&self, color: PaintColor) -> impl Iterator<Item = &[Point]> + '_ {
        self.history(color).strokes.iter().map(Vec::as_slice)
    }

    /// Number of strokes of `color`, including an empty open stroke
    pub fn stroke_count(&self, color: PaintColor) -> usize {
        self.history(color).strokes.len()
    }

    /// Number of points stored for `color`
    pub fn point_count(&self, color: PaintColor) -> usize {
        self.history(color).points
    }

    /// Number of points stored across all colors
    pub fn total_points(&self) -> usize {
        self.histories.iter().map(|h| h.points).sum()
    }

    /// Whether no color has any points
    pub fn is_empty(&self) -> bool {
        self.total_points() == 0
    }

    /// Drop the history of one color
    pub fn clear_color(&mut self, color: PaintColor) {
        *self.history_mut(color) = ColorHistory::default();
    }

    /// Drop every color's history
    pub fn clear(&mut self) {
        for color in PaintColor::ALL {
            self.clear_color(color);
        }
    }
}

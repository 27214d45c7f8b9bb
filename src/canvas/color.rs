//! Paint colors

/// Stroke color. Each color keeps its own stroke history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PaintColor {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
}

impl PaintColor {
    /// All colors in cycling order
    pub const ALL: [PaintColor; 4] = [
        PaintColor::Red,
        PaintColor::Green,
        PaintColor::Blue,
        PaintColor::Yellow,
    ];

    /// Position in [`PaintColor::ALL`]
    pub fn index(self) -> usize {
        match self {
            PaintColor::Red => 0,
            PaintColor::Green => 1,
            PaintColor::Blue => 2,
            PaintColor::Yellow => 3,
        }
    }

    /// The color after this one, wrapping around
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// 8-bit RGB value
    pub fn rgb(self) -> [u8; 3] {
        match self {
            PaintColor::Red => [255, 0, 0],
            PaintColor::Green => [0, 255, 0],
            PaintColor::Blue => [0, 0, 255],
            PaintColor::Yellow => [255, 255, 0],
        }
    }

    /// Toolbar label
    pub fn label(self) -> &'static str {
        match self {
            PaintColor::Red => "RED",
            PaintColor::Green => "GREEN",
            PaintColor::Blue => "BLUE",
            PaintColor::Yellow => "YELLOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycles_through_all() {
        let mut color = PaintColor::Red;
        let mut seen = Vec::new();
        for _ in 0..PaintColor::ALL.len() {
            seen.push(color);
            color = color.next();
        }
        assert_eq!(seen, PaintColor::ALL);
        assert_eq!(color, PaintColor::Red);
    }

    #[test]
    fn test_index_matches_all() {
        for (i, color) in PaintColor::ALL.iter().enumerate() {
            assert_eq!(color.index(), i);
        }
    }
}

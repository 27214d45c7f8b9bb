//! Flattening strokes into an image
//!
//! Strokes are drawn on a white background as connected segments with a round
//! brush. Saved drawings are PNG files named after the save time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::{Rgb, RgbImage};

use super::color::PaintColor;
use super::stroke::{Point, StrokeBuffer};

/// Errors while saving a drawing
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// Render every stroke onto a white `width` x `height` image.
/// Strokes with fewer than two points leave no mark.
pub fn rasterize(strokes: &StrokeBuffer, width: u32, height: u32, line_width: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width.max(1), height.max(1), Rgb([255, 255, 255]));
    let radius = (line_width / 2.0).max(0.5);

    for color in PaintColor::ALL {
        let rgb = Rgb(color.rgb());
        for stroke in strokes.strokes(color) {
            for segment in stroke.windows(2) {
                draw_segment(&mut img, segment[0], segment[1], radius, rgb);
            }
        }
    }

    img
}

/// Fill every pixel whose centre lies within `radius` of the segment `a`-`b`
fn draw_segment(img: &mut RgbImage, a: Point, b: Point, radius: f32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let pad = radius.ceil() as i64;

    let x0 = (a.x.min(b.x) as i64 - pad).max(0);
    let x1 = (a.x.max(b.x) as i64 + pad).min(w - 1);
    let y0 = (a.y.min(b.y) as i64 - pad).max(0);
    let y1 = (a.y.max(b.y) as i64 + pad).min(h - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let (ax, ay) = (a.x as f32, a.y as f32);
    let (dx, dy) = (b.x as f32 - ax, b.y as f32 - ay);
    let len_sq = dx * dx + dy * dy;
    let r_sq = radius * radius;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let (px, py) = (x as f32 - ax, y as f32 - ay);
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (ex, ey) = (px - t * dx, py - t * dy);
            if ex * ex + ey * ey <= r_sq {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Pick `drawing_<timestamp>.png` in `dir`, adding `_<n>` if that name is taken
pub fn drawing_path(dir: &Path, timestamp: u64) -> PathBuf {
    let mut path = dir.join(format!("drawing_{}.png", timestamp));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("drawing_{}_{}.png", timestamp, n));
        n += 1;
    }
    path
}

/// Rasterize and write the drawing into `dir`, creating it if needed.
/// Returns the written file.
pub fn save_drawing(
    strokes: &StrokeBuffer,
    dir: &Path,
    width: u32,
    height: u32,
    line_width: f32,
) -> Result<PathBuf, SaveError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    save_drawing_at(strokes, dir, width, height, line_width, timestamp)
}

/// [`save_drawing`] with an explicit timestamp
pub fn save_drawing_at(
    strokes: &StrokeBuffer,
    dir: &Path,
    width: u32,
    height: u32,
    line_width: f32,
    timestamp: u64,
) -> Result<PathBuf, SaveError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        log::info!("Created drawings directory {:?}", dir);
    }

    let img = rasterize(strokes, width, height, line_width);
    let path = drawing_path(dir, timestamp);
    img.save_with_format(&path, image::ImageFormat::Png)?;
    log::info!("Saved drawing as {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn buffer_with(color: PaintColor, points: &[(i32, i32)]) -> StrokeBuffer {
        let mut buffer = StrokeBuffer::new();
        buffer.begin_stroke(color);
        for &p in points {
            buffer.push_point(color, p.into());
        }
        buffer
    }

    #[test]
    fn test_empty_buffer_is_white() {
        let img = rasterize(&StrokeBuffer::new(), 8, 4, 2.0);
        assert_eq!(img.dimensions(), (8, 4));
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_horizontal_segment() {
        let buffer = buffer_with(PaintColor::Blue, &[(2, 5), (8, 5)]);
        let img = rasterize(&buffer, 12, 12, 2.0);

        for x in 2..=8 {
            assert_eq!(*img.get_pixel(x, 5), Rgb([0, 0, 255]));
        }
        assert_eq!(*img.get_pixel(5, 8), WHITE);
        assert_eq!(*img.get_pixel(11, 5), WHITE);
    }

    #[test]
    fn test_single_point_stroke_not_drawn() {
        let buffer = buffer_with(PaintColor::Red, &[(3, 3)]);
        let img = rasterize(&buffer, 6, 6, 4.0);
        assert!(img.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_strokes_are_not_joined() {
        let mut buffer = buffer_with(PaintColor::Green, &[(0, 0), (2, 0)]);
        buffer.begin_stroke(PaintColor::Green);
        buffer.push_point(PaintColor::Green, Point::new(18, 0));
        buffer.push_point(PaintColor::Green, Point::new(19, 0));

        let img = rasterize(&buffer, 20, 3, 1.0);
        assert_eq!(*img.get_pixel(1, 0), Rgb([0, 255, 0]));
        assert_eq!(*img.get_pixel(10, 0), WHITE);
        assert_eq!(*img.get_pixel(19, 0), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_out_of_bounds_points_are_clipped() {
        let buffer = buffer_with(PaintColor::Yellow, &[(-50, 2), (50, 2)]);
        let img = rasterize(&buffer, 5, 5, 1.0);
        assert_eq!(*img.get_pixel(0, 2), Rgb([255, 255, 0]));
        assert_eq!(*img.get_pixel(4, 2), Rgb([255, 255, 0]));
    }

    #[test]
    fn test_save_creates_dir_and_unique_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("drawings");
        let buffer = buffer_with(PaintColor::Red, &[(1, 1), (5, 5)]);

        let first = save_drawing_at(&buffer, &dir, 16, 16, 2.0, 1700000000).unwrap();
        assert_eq!(first, dir.join("drawing_1700000000.png"));
        assert!(first.exists());

        let second = save_drawing_at(&buffer, &dir, 16, 16, 2.0, 1700000000).unwrap();
        assert_eq!(second, dir.join("drawing_1700000000_1.png"));

        let loaded = image::open(&first).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (16, 16));
        assert_eq!(*loaded.get_pixel(3, 3), Rgb([255, 0, 0]));
    }
}

//! Drawing screen
//!
//! Camera feed with the strokes and the tracked hand skeleton painted on top,
//! plus a bottom toolbar for clearing, picking colors, and saving.

use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke};

use crate::canvas::{DrawingSession, PaintColor, Point};
use crate::ml::{Hand, HAND_CONNECTIONS};

/// Skeleton overlay colors
const LANDMARK_COLOR: Color32 = Color32::from_rgb(220, 40, 40);
const CONNECTION_COLOR: Color32 = Color32::from_rgb(240, 240, 240);

/// What the user did on the drawing screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawingAction {
    Clear,
    SelectColor(PaintColor),
    CycleColor,
    Save,
    /// Mouse press, starts a stroke (canvas pixels)
    MouseDown(Point),
    /// Mouse drag, continues the stroke (canvas pixels)
    MouseDrag(Point),
}

/// Values for the status line
#[derive(Clone, Debug, Default)]
pub struct StatusInfo {
    pub fps: f64,
    pub camera_frames: u64,
    pub camera_connected: bool,
    pub tracking_ready: bool,
    /// Side of the tracked hand, if any
    pub hand: Option<&'static str>,
}

/// Maps canvas pixels onto the on-screen rectangle showing the camera feed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasTransform {
    pub rect: Rect,
    pub scale: f32,
}

impl CanvasTransform {
    /// Largest rectangle with the canvas aspect ratio centred in `available`
    pub fn fit(available: Rect, canvas_size: (u32, u32)) -> Self {
        let (w, h) = (canvas_size.0.max(1) as f32, canvas_size.1.max(1) as f32);
        let scale = (available.width() / w).min(available.height() / h).max(f32::EPSILON);
        let size = egui::vec2(w * scale, h * scale);
        Self {
            rect: Rect::from_center_size(available.center(), size),
            scale,
        }
    }

    pub fn to_screen(&self, point: Point) -> Pos2 {
        self.rect.min + egui::vec2(point.x as f32, point.y as f32) * self.scale
    }

    pub fn to_canvas(&self, pos: Pos2) -> Point {
        let v = (pos - self.rect.min) / self.scale;
        Point::new(v.x.floor() as i32, v.y.floor() as i32)
    }
}

/// Canvas pointer state for one frame, in screen coordinates
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerInput {
    /// Primary click released without dragging
    pub clicked: bool,
    pub secondary_clicked: bool,
    /// Primary drag passed the drag threshold this frame
    pub drag_started: bool,
    /// Primary drag in progress
    pub dragging: bool,
    /// Where the button went down
    pub press_origin: Option<Pos2>,
    pub pos: Option<Pos2>,
}

impl PointerInput {
    /// Clicks cycle the color. A primary drag draws, starting from where the
    /// button was pressed rather than where the drag threshold was crossed.
    pub fn actions(&self, transform: &CanvasTransform) -> Vec<DrawingAction> {
        let mut actions = Vec::new();
        if self.clicked || self.secondary_clicked {
            actions.push(DrawingAction::CycleColor);
        }

        let Some(pos) = self.pos else {
            return actions;
        };
        if self.drag_started {
            let origin = transform.to_canvas(self.press_origin.unwrap_or(pos));
            let current = transform.to_canvas(pos);
            actions.push(DrawingAction::MouseDown(origin));
            if current != origin {
                actions.push(DrawingAction::MouseDrag(current));
            }
        } else if self.dragging {
            actions.push(DrawingAction::MouseDrag(transform.to_canvas(pos)));
        }
        actions
    }
}

fn color32(color: PaintColor) -> Color32 {
    let [r, g, b] = color.rgb();
    Color32::from_rgb(r, g, b)
}

/// Borrowed state needed to draw the screen
pub struct DrawingView<'a> {
    pub camera: Option<&'a egui::TextureHandle>,
    pub session: &'a DrawingSession,
    pub hand: Option<&'a Hand>,
    pub line_width: f32,
    pub status: StatusInfo,
    /// False while a popup is open
    pub enabled: bool,
}

impl DrawingView<'_> {
    pub fn show(&self, ctx: &egui::Context) -> Vec<DrawingAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::bottom("toolbar")
            .min_height(48.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(self.enabled, |ui| self.toolbar(ui, &mut actions));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(Color32::BLACK))
            .show(ctx, |ui| {
                let sense = if self.enabled {
                    Sense::click_and_drag()
                } else {
                    Sense::hover()
                };
                let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
                let transform = CanvasTransform::fit(response.rect, self.session.canvas_size());

                self.paint_canvas(&painter, &transform);

                let pointer = PointerInput {
                    clicked: response.clicked(),
                    secondary_clicked: response.secondary_clicked(),
                    drag_started: response.drag_started_by(egui::PointerButton::Primary),
                    dragging: response.dragged_by(egui::PointerButton::Primary),
                    press_origin: ui.input(|i| i.pointer.press_origin()),
                    pos: response.interact_pointer_pos(),
                };
                actions.extend(pointer.actions(&transform));
            });

        actions
    }

    fn toolbar(&self, ui: &mut egui::Ui, actions: &mut Vec<DrawingAction>) {
        ui.horizontal_centered(|ui| {
            if ui.button("CLEAR").clicked() {
                actions.push(DrawingAction::Clear);
            }

            for color in [
                PaintColor::Blue,
                PaintColor::Green,
                PaintColor::Red,
                PaintColor::Yellow,
            ] {
                let selected = self.session.color() == color;
                let text = egui::RichText::new(color.label()).color(color32(color));
                if ui.selectable_label(selected, text).clicked() {
                    actions.push(DrawingAction::SelectColor(color));
                }
            }

            ui.separator();
            if ui.button("Save Drawing").clicked() {
                actions.push(DrawingAction::Save);
            }

            ui.separator();
            let status = &self.status;
            ui.label(format!("FPS: {:.1}", status.fps));
            if status.camera_connected {
                ui.label(format!("Frames: {}", status.camera_frames));
            } else {
                ui.label("No camera");
            }
            if !status.tracking_ready {
                ui.label("Hand tracking unavailable");
            } else if let Some(side) = status.hand {
                ui.label(format!("{} hand tracked", side));
            } else {
                ui.label("No hand");
            }
            ui.label(format!("Points: {}", self.session.strokes().total_points()));
        });
    }

    fn paint_canvas(&self, painter: &egui::Painter, transform: &CanvasTransform) {
        match self.camera {
            Some(texture) => {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                painter.image(texture.id(), transform.rect, uv, Color32::WHITE);
            }
            None => {
                painter.rect_filled(transform.rect, 0.0, Color32::from_gray(24));
            }
        }

        let width = (self.line_width * transform.scale).max(1.0);
        let strokes = self.session.strokes();
        for color in PaintColor::ALL {
            let stroke = Stroke::new(width, color32(color));
            for points in strokes.strokes(color).filter(|s| s.len() > 1) {
                let line: Vec<Pos2> = points.iter().map(|p| transform.to_screen(*p)).collect();
                painter.add(Shape::line(line, stroke));
            }
        }

        if let Some(hand) = self.hand {
            let (w, h) = self.session.canvas_size();
            let pixels = hand.to_pixels(w, h);
            let bone = Stroke::new(2.0, CONNECTION_COLOR);
            for (a, b) in HAND_CONNECTIONS {
                painter.line_segment(
                    [
                        transform.to_screen(pixels[*a as usize]),
                        transform.to_screen(pixels[*b as usize]),
                    ],
                    bone,
                );
            }
            for p in pixels {
                painter.circle_filled(transform.to_screen(p), 3.0, LANDMARK_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_letterboxes_wide_area() {
        let available = Rect::from_min_size(Pos2::ZERO, egui::vec2(400.0, 100.0));
        let t = CanvasTransform::fit(available, (200, 100));
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.rect, Rect::from_min_size(Pos2::new(100.0, 0.0), egui::vec2(200.0, 100.0)));
    }

    #[test]
    fn test_fit_scales_down() {
        let available = Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(320.0, 240.0));
        let t = CanvasTransform::fit(available, (640, 480));
        assert_eq!(t.scale, 0.5);
        assert_eq!(t.rect, available);
    }

    #[test]
    fn test_screen_canvas_round_trip() {
        let available = Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(320.0, 240.0));
        let t = CanvasTransform::fit(available, (640, 480));

        let p = Point::new(100, 60);
        let screen = t.to_screen(p);
        assert_eq!(screen, Pos2::new(60.0, 50.0));
        assert_eq!(t.to_canvas(screen), p);
    }

    fn identity() -> CanvasTransform {
        CanvasTransform::fit(
            Rect::from_min_size(Pos2::ZERO, egui::vec2(640.0, 480.0)),
            (640, 480),
        )
    }

    #[test]
    fn test_drag_starts_at_press_origin() {
        let pointer = PointerInput {
            drag_started: true,
            dragging: true,
            press_origin: Some(Pos2::new(100.0, 100.0)),
            pos: Some(Pos2::new(106.0, 103.0)),
            ..PointerInput::default()
        };
        assert_eq!(
            pointer.actions(&identity()),
            vec![
                DrawingAction::MouseDown(Point::new(100, 100)),
                DrawingAction::MouseDrag(Point::new(106, 103)),
            ]
        );
    }

    #[test]
    fn test_drag_continues_stroke() {
        let pointer = PointerInput {
            dragging: true,
            press_origin: Some(Pos2::new(100.0, 100.0)),
            pos: Some(Pos2::new(150.0, 120.0)),
            ..PointerInput::default()
        };
        assert_eq!(
            pointer.actions(&identity()),
            vec![DrawingAction::MouseDrag(Point::new(150, 120))]
        );
    }

    #[test]
    fn test_clicks_cycle_color() {
        let primary = PointerInput {
            clicked: true,
            pos: Some(Pos2::new(10.0, 10.0)),
            ..PointerInput::default()
        };
        let secondary = PointerInput {
            secondary_clicked: true,
            pos: Some(Pos2::new(10.0, 10.0)),
            ..PointerInput::default()
        };
        assert_eq!(primary.actions(&identity()), vec![DrawingAction::CycleColor]);
        assert_eq!(secondary.actions(&identity()), vec![DrawingAction::CycleColor]);
        assert!(PointerInput::default().actions(&identity()).is_empty());
    }
}

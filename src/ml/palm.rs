//! Palm detection
//!
//! Decodes the MediaPipe palm detection SSD (192x192 input, 2016 anchors).
//! Detections live in normalized detector input coordinates; the caller maps
//! them back through the letterbox region the frame was sampled with.

/// Palm detection model file name inside the models directory
pub const PALM_DETECTION_MODEL: &str = "palm_detection.onnx";

/// Model input edge length in pixels
pub const PALM_INPUT_SIZE: u32 = 192;

/// Number of SSD anchors (and output rows) of the model
pub const PALM_ANCHOR_COUNT: usize = 2016;

/// Values per output row: box centre, size, then 7 keypoints
pub const PALM_BOX_PARAMS: usize = 18;

/// Palm keypoints in output order
pub const PALM_KEYPOINT_COUNT: usize = 7;

/// Wrist centre keypoint
const KEYPOINT_WRIST: usize = 0;
/// Middle finger base keypoint
const KEYPOINT_MIDDLE_MCP: usize = 2;

/// Detections overlapping the best one by at least this much are merged
const IOU_THRESH: f32 = 0.3;

/// One SSD output layer
struct LayerInfo {
    boxes_per_cell: usize,
    cells: usize,
}

/// Strides 8 then 16 (three stride-16 layers merged) over a 192 px input
const LAYERS: [LayerInfo; 2] = [
    LayerInfo {
        boxes_per_cell: 2,
        cells: 24,
    },
    LayerInfo {
        boxes_per_cell: 6,
        cells: 12,
    },
];

/// Anchor centres (normalized), in output row order
pub fn anchors() -> Vec<(f32, f32)> {
    let mut anchors = Vec::with_capacity(PALM_ANCHOR_COUNT);
    for layer in &LAYERS {
        for y in 0..layer.cells {
            for x in 0..layer.cells {
                let center = (
                    (x as f32 + 0.5) / layer.cells as f32,
                    (y as f32 + 0.5) / layer.cells as f32,
                );
                for _ in 0..layer.boxes_per_cell {
                    anchors.push(center);
                }
            }
        }
    }
    anchors
}

/// Axis-aligned box given by its centre and size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingRect {
    pub xc: f32,
    pub yc: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingRect {
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        let left = (self.xc - self.w / 2.0).max(other.xc - other.w / 2.0);
        let right = (self.xc + self.w / 2.0).min(other.xc + other.w / 2.0);
        let top = (self.yc - self.h / 2.0).max(other.yc - other.h / 2.0);
        let bottom = (self.yc + self.h / 2.0).min(other.yc + other.h / 2.0);
        (right - left).max(0.0) * (bottom - top).max(0.0)
    }

    /// Intersection over union
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// A detected palm in normalized detector input coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct PalmDetection {
    pub score: f32,
    pub rect: BoundingRect,
    pub keypoints: [(f32, f32); PALM_KEYPOINT_COUNT],
}

impl PalmDetection {
    /// Clockwise angle that turns the wrist -> middle finger direction
    /// upright. 0 when the fingers point up.
    pub fn rotation(&self) -> f32 {
        let (x0, y0) = self.keypoints[KEYPOINT_WRIST];
        let (x1, y1) = self.keypoints[KEYPOINT_MIDDLE_MCP];
        hand_rotation((x0, y0), (x1, y1))
    }
}

/// Rotation of the direction `wrist -> finger` relative to straight up, in
/// image coordinates (y down). Positive is clockwise.
pub fn hand_rotation(wrist: (f32, f32), finger: (f32, f32)) -> f32 {
    let (dx, dy) = (finger.0 - wrist.0, finger.1 - wrist.1);
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    dx.atan2(-dy)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-100.0, 100.0)).exp())
}

/// Decode the raw regressor and classifier outputs into every detection
/// scoring at least `min_score`
pub fn decode_palms(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[(f32, f32)],
    min_score: f32,
) -> Vec<PalmDetection> {
    let input = PALM_INPUT_SIZE as f32;
    let mut detections = Vec::new();

    for ((params, &raw), &(ax, ay)) in boxes
        .chunks_exact(PALM_BOX_PARAMS)
        .zip(scores)
        .zip(anchors)
    {
        let score = sigmoid(raw);
        if score < min_score {
            continue;
        }

        let point = |i: usize| (params[i] / input + ax, params[i + 1] / input + ay);
        let mut keypoints = [(0.0, 0.0); PALM_KEYPOINT_COUNT];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            *kp = point(4 + k * 2);
        }

        let (xc, yc) = point(0);
        detections.push(PalmDetection {
            score,
            rect: BoundingRect {
                xc,
                yc,
                w: params[2] / input,
                h: params[3] / input,
            },
            keypoints,
        });
    }

    detections
}

/// Pick the most confident palm, averaging in the detections that overlap
/// it (weighted by score)
pub fn best_palm(detections: &[PalmDetection]) -> Option<PalmDetection> {
    let seed = detections
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;

    let mut rect = BoundingRect::default();
    let mut keypoints = [(0.0, 0.0); PALM_KEYPOINT_COUNT];
    let mut total = 0.0;
    for det in detections
        .iter()
        .filter(|d| d.rect.iou(&seed.rect) >= IOU_THRESH)
    {
        let w = det.score;
        rect.xc += det.rect.xc * w;
        rect.yc += det.rect.yc * w;
        rect.w += det.rect.w * w;
        rect.h += det.rect.h * w;
        for (acc, kp) in keypoints.iter_mut().zip(&det.keypoints) {
            acc.0 += kp.0 * w;
            acc.1 += kp.1 * w;
        }
        total += w;
    }

    if total <= 0.0 {
        return Some(seed.clone());
    }

    rect.xc /= total;
    rect.yc /= total;
    rect.w /= total;
    rect.h /= total;
    for kp in keypoints.iter_mut() {
        kp.0 /= total;
        kp.1 /= total;
    }

    Some(PalmDetection {
        score: seed.score,
        rect,
        keypoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn palm(score: f32, xc: f32, yc: f32, size: f32) -> PalmDetection {
        PalmDetection {
            score,
            rect: BoundingRect {
                xc,
                yc,
                w: size,
                h: size,
            },
            keypoints: [(xc, yc); PALM_KEYPOINT_COUNT],
        }
    }

    #[test]
    fn test_anchor_count_matches_model() {
        let anchors = anchors();
        assert_eq!(anchors.len(), PALM_ANCHOR_COUNT);
        // First two share the first stride-8 cell
        assert_eq!(anchors[0], (0.5 / 24.0, 0.5 / 24.0));
        assert_eq!(anchors[1], anchors[0]);
        // Last one is the bottom-right stride-16 cell
        assert_eq!(anchors[PALM_ANCHOR_COUNT - 1], (11.5 / 12.0, 11.5 / 12.0));
    }

    #[test]
    fn test_iou() {
        let a = BoundingRect { xc: 1.0, yc: 0.0, w: 1.0, h: 1.0 };
        let b = BoundingRect { xc: 2.0, yc: 0.0, w: 1.0, h: 1.0 };
        let c = BoundingRect { xc: 1.0, yc: 0.0, w: 2.0, h: 2.0 };
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&c), 0.25);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_decode_offsets_from_anchor() {
        let anchors = vec![(0.25, 0.75), (0.5, 0.5)];
        let mut boxes = vec![0.0f32; 2 * PALM_BOX_PARAMS];
        // Row 0: shifted 19.2 px right, 38.4 px wide, wrist keypoint 9.6 px up
        boxes[0] = 19.2;
        boxes[2] = 38.4;
        boxes[3] = 19.2;
        boxes[5] = -9.6;
        let scores = vec![5.0, -5.0];

        let palms = decode_palms(&boxes, &scores, &anchors, 0.5);
        assert_eq!(palms.len(), 1);

        let palm = &palms[0];
        assert!(palm.score > 0.99);
        assert!((palm.rect.xc - 0.35).abs() < 1e-5);
        assert!((palm.rect.yc - 0.75).abs() < 1e-5);
        assert!((palm.rect.w - 0.2).abs() < 1e-5);
        assert!((palm.rect.h - 0.1).abs() < 1e-5);
        assert!((palm.keypoints[0].0 - 0.25).abs() < 1e-5);
        assert!((palm.keypoints[0].1 - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_best_palm_averages_overlaps() {
        let detections = vec![
            palm(0.9, 0.50, 0.5, 0.2),
            palm(0.3, 0.52, 0.5, 0.2),
            palm(0.8, 0.10, 0.1, 0.1),
        ];
        let best = best_palm(&detections).unwrap();
        assert_eq!(best.score, 0.9);
        // (0.9 * 0.50 + 0.3 * 0.52) / 1.2
        assert!((best.rect.xc - 0.505).abs() < 1e-5);
        assert!((best.keypoints[0].0 - 0.505).abs() < 1e-5);

        assert!(best_palm(&[]).is_none());
    }

    #[test]
    fn test_hand_rotation() {
        assert_eq!(hand_rotation((0.5, 0.5), (0.5, 0.2)), 0.0);
        assert!((hand_rotation((0.5, 0.5), (0.8, 0.5)) - FRAC_PI_2).abs() < 1e-6);
        assert!((hand_rotation((0.5, 0.5), (0.2, 0.5)) + FRAC_PI_2).abs() < 1e-6);
        assert_eq!(hand_rotation((0.5, 0.5), (0.5, 0.5)), 0.0);
    }
}

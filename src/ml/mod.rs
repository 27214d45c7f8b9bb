//! ML inference module
//!
//! Hand tracking using ONNX Runtime on a background thread, with the MediaPipe
//! palm detection and hand landmark models (PINTO Model Zoo exports). While no
//! hand is tracked, the palm detector scans the whole frame and its box seeds
//! the landmark region of interest; after that the region follows the
//! previous frame's landmarks.

pub mod landmarks;
pub mod palm;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use ndarray::Array4;
use parking_lot::Mutex;

pub use landmarks::{Hand, HandLandmark, LandmarkIdx, HAND_CONNECTIONS, LANDMARK_COUNT};
pub use palm::{PalmDetection, PALM_DETECTION_MODEL};

/// Landmark model file name inside the models directory
pub const HAND_LANDMARK_MODEL: &str = "hand_landmark.onnx";

/// Model input edge length in pixels
const LANDMARK_INPUT_SIZE: u32 = 224;

/// Hand landmarks -> tracking region grow factor
const ROI_GROW: f32 = 1.5;

/// Palm box -> hand region scale
const PALM_TO_HAND_SCALE: f32 = 2.6;

/// Palm box -> hand region shift towards the fingers, in palm box heights
const PALM_TO_HAND_SHIFT: f32 = 0.5;

/// Minimum palm detection score
const MIN_PALM_SCORE: f32 = 0.5;

/// Inference configuration
#[derive(Clone, Debug)]
pub struct InferenceConfig {
    /// Explicit models directory; searched for when `None`
    pub models_dir: Option<PathBuf>,
    /// Minimum presence score for a hand to be reported
    pub min_detection_confidence: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            models_dir: None,
            min_detection_confidence: 0.7,
        }
    }
}

/// ML inference results
#[derive(Clone, Debug, Default)]
pub struct HandResult {
    /// Detected hand, at most one
    pub hand: Option<Hand>,
    /// Frame number this result corresponds to
    pub frame_number: u64,
}

/// Rotated square region of interest in frame pixels.
///
/// `rotation` is clockwise in radians; the region's "up" points along the
/// hand when built from a palm or from landmarks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    pub cx: f32,
    pub cy: f32,
    pub size: f32,
    pub rotation: f32,
}

impl Roi {
    /// Largest square centred in the frame
    pub fn centered(width: u32, height: u32) -> Self {
        Self {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            size: width.min(height) as f32,
            rotation: 0.0,
        }
    }

    /// Smallest centred square containing the whole frame (letterboxed)
    pub fn covering(width: u32, height: u32) -> Self {
        Self {
            size: width.max(height) as f32,
            ..Self::centered(width, height)
        }
    }

    /// Map a point given relative to the region (0..1 on both axes) to frame
    /// pixels
    pub fn to_pixels(&self, u: f32, v: f32) -> (f32, f32) {
        let dx = (u - 0.5) * self.size;
        let dy = (v - 0.5) * self.size;
        let (sin, cos) = self.rotation.sin_cos();
        (
            self.cx + dx * cos - dy * sin,
            self.cy + dx * sin + dy * cos,
        )
    }

    /// Hand region from a palm detection. `letterbox` is the region the
    /// detector input was sampled from.
    pub fn from_palm(palm: &PalmDetection, letterbox: &Roi) -> Self {
        let (cx, cy) = letterbox.to_pixels(palm.rect.xc, palm.rect.yc);
        let w = palm.rect.w * letterbox.size;
        let h = palm.rect.h * letterbox.size;
        let rotation = letterbox.rotation + palm.rotation();

        // Move towards the fingers along the hand's own axis
        let (sin, cos) = rotation.sin_cos();
        let shift = PALM_TO_HAND_SHIFT * h;
        Self {
            cx: cx + shift * sin,
            cy: cy - shift * cos,
            size: w.max(h) * PALM_TO_HAND_SCALE,
            rotation,
        }
    }

    /// Square around a hand's landmarks, aligned with the wrist -> middle
    /// finger direction and grown by `grow`
    pub fn around_hand(hand: &Hand, width: u32, height: u32, grow: f32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let px = |lm: &HandLandmark| (lm.x * w, lm.y * h);

        let wrist = px(&hand.landmark(LandmarkIdx::Wrist));
        let finger = px(&hand.landmark(LandmarkIdx::MiddleFingerMcp));
        let rotation = palm::hand_rotation(wrist, finger);
        let (sin, cos) = rotation.sin_cos();

        // Bounds in the hand-aligned frame
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for lm in &hand.landmarks {
            let (x, y) = px(lm);
            let u = x * cos + y * sin;
            let v = -x * sin + y * cos;
            x0 = x0.min(u);
            x1 = x1.max(u);
            y0 = y0.min(v);
            y1 = y1.max(v);
        }

        let (u, v) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        Self {
            cx: u * cos - v * sin,
            cy: u * sin + v * cos,
            size: ((x1 - x0).max(y1 - y0) * grow).max(1.0),
            rotation,
        }
    }

    /// Map a position in landmark model input pixels back to normalized
    /// frame coordinates
    fn to_frame(&self, input_x: f32, input_y: f32, width: u32, height: u32) -> (f32, f32) {
        let input = LANDMARK_INPUT_SIZE as f32;
        let (x, y) = self.to_pixels(input_x / input, input_y / input);
        (x / width as f32, y / height as f32)
    }
}

/// Frame data to be processed
struct FrameData {
    /// RGBA pixel data
    data: Vec<u8>,
    /// Frame width
    width: u32,
    /// Frame height
    height: u32,
    /// Frame number
    frame_number: u64,
}

/// Loaded ONNX sessions
struct Models {
    landmarks: ort::session::Session,
    /// Without a palm detector, the centred square is searched instead
    palm: Option<ort::session::Session>,
}

/// Hand tracking inference engine
pub struct HandInference {
    /// Latest result from inference thread
    latest_result: Arc<Mutex<HandResult>>,
    /// Channel to send frames to inference thread
    frame_sender: Option<Sender<FrameData>>,
    /// Whether the models are loaded
    running: Arc<AtomicBool>,
    /// Set when model loading failed; frames are no longer accepted
    failed: Arc<AtomicBool>,
    /// Inference thread handle
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl HandInference {
    /// Create a new inference engine and start its thread
    pub fn new(config: InferenceConfig) -> Result<Self, String> {
        let latest_result = Arc::new(Mutex::new(HandResult::default()));
        let running = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let (frame_sender, frame_receiver) = crossbeam_channel::bounded::<FrameData>(2);

        let latest_result_clone = latest_result.clone();
        let running_clone = running.clone();
        let failed_clone = failed.clone();

        let thread_handle = std::thread::Builder::new()
            .name("hand-inference".to_string())
            .spawn(move || {
                Self::inference_thread(
                    config,
                    frame_receiver,
                    latest_result_clone,
                    running_clone,
                    failed_clone,
                );
            })
            .map_err(|e| format!("Failed to spawn inference thread: {}", e))?;

        Ok(Self {
            latest_result,
            frame_sender: Some(frame_sender),
            running,
            failed,
            thread_handle: Some(thread_handle),
        })
    }

    /// Inference thread main loop
    fn inference_thread(
        config: InferenceConfig,
        frame_receiver: Receiver<FrameData>,
        latest_result: Arc<Mutex<HandResult>>,
        running: Arc<AtomicBool>,
        failed: Arc<AtomicBool>,
    ) {
        log::info!("Hand inference thread started");

        let mut models = match Self::init_ort(config.models_dir.as_deref()) {
            Ok(models) => {
                running.store(true, Ordering::Release);
                log::info!("ONNX Runtime initialized successfully");
                models
            }
            Err(e) => {
                log::warn!("Failed to initialize ONNX Runtime: {}. Hand tracking disabled.", e);
                failed.store(true, Ordering::Release);
                return;
            }
        };

        let anchors = palm::anchors();
        let mut tracked: Option<Hand> = None;

        while let Ok(frame) = frame_receiver.recv() {
            let roi = match &tracked {
                Some(hand) => Some(Roi::around_hand(hand, frame.width, frame.height, ROI_GROW)),
                None => match models.palm.as_mut() {
                    Some(detector) => match Self::detect_palm(detector, &frame, &anchors) {
                        Ok(roi) => roi,
                        Err(e) => {
                            log::warn!("Palm detection error: {}", e);
                            None
                        }
                    },
                    None => Some(Roi::centered(frame.width, frame.height)),
                },
            };

            let hand = match roi {
                Some(roi) => match Self::run_landmarks(&mut models.landmarks, &frame, roi) {
                    Ok(hand) => hand.filter(|h| h.presence >= config.min_detection_confidence),
                    Err(e) => {
                        log::warn!("Inference error: {}", e);
                        None
                    }
                },
                None => None,
            };

            if hand.is_some() != tracked.is_some() {
                log::debug!("Hand tracked: {}", hand.is_some());
            }
            tracked = hand.clone();
            *latest_result.lock() = HandResult {
                hand,
                frame_number: frame.frame_number,
            };
        }

        running.store(false, Ordering::Release);
        log::info!("Hand inference thread stopped");
    }

    /// Initialize ONNX Runtime and load the models
    fn init_ort(models_dir: Option<&Path>) -> Result<Models, String> {
        let model_dir = match models_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::find_model_dir()?,
        };
        log::info!("Model directory: {:?}", model_dir);

        let landmark_path = model_dir.join(HAND_LANDMARK_MODEL);
        if !landmark_path.exists() {
            return Err(format!("Hand landmark model not found: {:?}", landmark_path));
        }

        ort::init()
            .with_name("AirCanvas")
            .commit()
            .map_err(|e| format!("Failed to initialize ORT: {}", e))?;

        let landmarks = Self::load_session(&landmark_path)?;
        log::info!("Loaded hand landmark model from {:?}", landmark_path);

        let palm_path = model_dir.join(PALM_DETECTION_MODEL);
        let palm = if palm_path.exists() {
            let session = Self::load_session(&palm_path)?;
            log::info!("Loaded palm detection model from {:?}", palm_path);
            Some(session)
        } else {
            log::warn!(
                "Palm detection model not found: {:?}. Searching the frame centre only.",
                palm_path
            );
            None
        };

        Ok(Models { landmarks, palm })
    }

    fn load_session(path: &Path) -> Result<ort::session::Session, String> {
        ort::session::Session::builder()
            .map_err(|e| format!("Failed to create session builder: {}", e))?
            .with_intra_threads(2)
            .map_err(|e| format!("Failed to set threads: {}", e))?
            .commit_from_file(path)
            .map_err(|e| format!("Failed to load model {:?}: {}", path, e))
    }

    /// Find the models directory
    fn find_model_dir() -> Result<PathBuf, String> {
        // Try relative to executable first, then up to target/<profile>/..
        if let Ok(exe_path) = std::env::current_exe() {
            for dir in exe_path.ancestors().skip(1).take(3) {
                let model_dir = dir.join("models");
                if model_dir.exists() {
                    return Ok(model_dir);
                }
            }
        }

        let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
        let model_dir = cwd.join("models");
        if model_dir.exists() {
            return Ok(model_dir);
        }

        Err("Models directory not found. Create a 'models' directory with hand_landmark.onnx."
            .to_string())
    }

    /// Run a model on one NHWC input, returning every output flattened
    fn run_model(
        session: &mut ort::session::Session,
        input: Vec<f32>,
        size: u32,
    ) -> Result<Vec<Vec<f32>>, String> {
        let input_array = Array4::from_shape_vec((1, size as usize, size as usize, 3), input)
            .map_err(|e| format!("Failed to create input array: {}", e))?;

        let input_tensor = ort::value::Tensor::from_array(input_array)
            .map_err(|e| format!("Failed to create tensor: {}", e))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| format!("Inference failed: {}", e))?;

        let mut tensors: Vec<Vec<f32>> = Vec::new();
        for (_name, value) in outputs.iter() {
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| format!("Failed to extract output: {}", e))?;
            tensors.push(data.iter().copied().collect());
        }
        Ok(tensors)
    }

    /// Search the whole (letterboxed) frame for a palm and turn the best one
    /// into a hand region
    fn detect_palm(
        session: &mut ort::session::Session,
        frame: &FrameData,
        anchors: &[(f32, f32)],
    ) -> Result<Option<Roi>, String> {
        let letterbox = Roi::covering(frame.width, frame.height);
        let input = preprocess_roi_nhwc(
            &frame.data,
            frame.width,
            frame.height,
            letterbox,
            palm::PALM_INPUT_SIZE,
        );
        let tensors = Self::run_model(session, input, palm::PALM_INPUT_SIZE)?;
        Ok(detect_palm_roi(&tensors, anchors, &letterbox))
    }

    /// Run the landmark model on one region of interest
    fn run_landmarks(
        session: &mut ort::session::Session,
        frame: &FrameData,
        roi: Roi,
    ) -> Result<Option<Hand>, String> {
        let input = preprocess_roi_nhwc(
            &frame.data,
            frame.width,
            frame.height,
            roi,
            LANDMARK_INPUT_SIZE,
        );
        let tensors = Self::run_model(session, input, LANDMARK_INPUT_SIZE)?;
        Ok(decode_landmarks(&tensors, roi, frame.width, frame.height))
    }

    /// Send a frame for inference (non-blocking, dropped when busy or when
    /// the models failed to load)
    pub fn process_frame(&self, frame: &[u8], width: u32, height: u32, frame_number: u64) {
        if !self.accepts_frames() {
            return;
        }
        if let Some(ref sender) = self.frame_sender {
            let _ = sender.try_send(FrameData {
                data: frame.to_vec(),
                width,
                height,
                frame_number,
            });
        }
    }

    /// False once model loading has failed
    pub fn accepts_frames(&self) -> bool {
        !self.failed.load(Ordering::Acquire)
    }

    /// Get latest inference result
    pub fn latest_result(&self) -> HandResult {
        self.latest_result.lock().clone()
    }

    /// Check if the models are loaded and running
    pub fn is_ready(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the inference thread
    pub fn stop(&mut self) {
        // Dropping the sender ends the thread's receive loop
        self.frame_sender = None;

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HandInference {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sample `roi` out of an RGBA frame (nearest neighbour, following the
/// region's rotation) into an NHWC float buffer in [0, 1]. Pixels outside
/// the frame are black.
pub fn preprocess_roi_nhwc(
    data: &[u8],
    width: u32,
    height: u32,
    roi: Roi,
    target: u32,
) -> Vec<f32> {
    let mut output = vec![0.0f32; (target * target * 3) as usize];

    for y in 0..target {
        for x in 0..target {
            let (src_x, src_y) = roi.to_pixels(
                (x as f32 + 0.5) / target as f32,
                (y as f32 + 0.5) / target as f32,
            );
            let (src_x, src_y) = (src_x.floor(), src_y.floor());
            if src_x < 0.0 || src_x >= width as f32 || src_y < 0.0 || src_y >= height as f32 {
                continue;
            }

            let src_idx = ((src_y as u32 * width + src_x as u32) * 4) as usize;
            if src_idx + 2 < data.len() {
                let out_idx = ((y * target + x) * 3) as usize;
                output[out_idx] = data[src_idx] as f32 / 255.0;
                output[out_idx + 1] = data[src_idx + 1] as f32 / 255.0;
                output[out_idx + 2] = data[src_idx + 2] as f32 / 255.0;
            }
        }
    }

    output
}

/// Turn raw palm detector outputs into the hand region of the best palm.
///
/// The regressor tensor holds 18 values per anchor, the classifier tensor one
/// score per anchor.
pub fn detect_palm_roi(
    tensors: &[Vec<f32>],
    anchors: &[(f32, f32)],
    letterbox: &Roi,
) -> Option<Roi> {
    let boxes = tensors
        .iter()
        .find(|t| t.len() == palm::PALM_ANCHOR_COUNT * palm::PALM_BOX_PARAMS)?;
    let scores = tensors.iter().find(|t| t.len() == palm::PALM_ANCHOR_COUNT)?;

    let detections = palm::decode_palms(boxes, scores, anchors, MIN_PALM_SCORE);
    let best = palm::best_palm(&detections)?;
    log::trace!("Palm detected (score {:.2})", best.score);
    Some(Roi::from_palm(&best, letterbox))
}

/// Turn raw model outputs into a hand in normalized frame coordinates.
///
/// The landmark tensor is the one with 63 values (x, y, z per landmark, in
/// model input pixels). Of the single-value tensors, the first is the
/// presence score and the second the handedness.
pub fn decode_landmarks(tensors: &[Vec<f32>], roi: Roi, width: u32, height: u32) -> Option<Hand> {
    let coords = tensors.iter().find(|t| t.len() == LANDMARK_COUNT * 3)?;
    let mut scalars = tensors.iter().filter(|t| t.len() == 1).map(|t| t[0]);
    let presence = scalars.next()?;
    let handedness = scalars.next().unwrap_or(0.0);

    let mut hand = Hand {
        presence,
        is_right: handedness > 0.5,
        ..Hand::default()
    };
    for (out, c) in hand.landmarks.iter_mut().zip(coords.chunks_exact(3)) {
        let (x, y) = roi.to_frame(c[0], c[1], width, height);
        *out = HandLandmark {
            x,
            y,
            z: c[2] / LANDMARK_INPUT_SIZE as f32,
        };
    }

    Some(hand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use std::time::{Duration, Instant};

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn hand_at(rest: (f32, f32), points: &[(LandmarkIdx, f32, f32)]) -> Hand {
        let mut hand = Hand::default();
        for lm in hand.landmarks.iter_mut() {
            lm.x = rest.0;
            lm.y = rest.1;
        }
        for &(idx, x, y) in points {
            hand.landmarks[idx as usize] = HandLandmark { x, y, z: 0.0 };
        }
        hand
    }

    #[test]
    fn test_centered_and_covering_roi() {
        let centered = Roi::centered(640, 480);
        assert_eq!(
            centered,
            Roi { cx: 320.0, cy: 240.0, size: 480.0, rotation: 0.0 }
        );
        assert_eq!(centered.to_pixels(0.0, 0.0), (80.0, 0.0));

        let covering = Roi::covering(640, 480);
        assert_eq!(covering.size, 640.0);
        assert_eq!(covering.to_pixels(0.0, 0.0), (0.0, -80.0));
    }

    #[test]
    fn test_roi_around_upright_hand() {
        let hand = hand_at(
            (0.5, 0.5),
            &[
                (LandmarkIdx::Wrist, 0.5, 0.75),
                (LandmarkIdx::IndexFingerTip, 0.375, 0.25),
            ],
        );

        // Hand spans x 150..200, y 100..300 in a 400x400 frame
        let roi = Roi::around_hand(&hand, 400, 400, 1.5);
        assert_eq!(roi.rotation, 0.0);
        assert_close(roi.size, 300.0);
        assert_close(roi.cx, 175.0);
        assert_close(roi.cy, 200.0);
    }

    #[test]
    fn test_roi_around_sideways_hand_is_rotated() {
        // Fingers point right: wrist at (100, 200), everything else at (200, 200)
        let hand = hand_at((0.5, 0.5), &[(LandmarkIdx::Wrist, 0.25, 0.5)]);

        let roi = Roi::around_hand(&hand, 400, 400, 1.5);
        assert_close(roi.rotation, FRAC_PI_2);
        assert_close(roi.size, 150.0);
        assert_close(roi.cx, 150.0);
        assert_close(roi.cy, 200.0);
    }

    #[test]
    fn test_roi_from_palm_shifts_towards_fingers() {
        let letterbox = Roi::covering(640, 480);
        let mut keypoints = [(0.5, 0.5); palm::PALM_KEYPOINT_COUNT];
        keypoints[0] = (0.5, 0.55);
        keypoints[2] = (0.5, 0.45);
        let mut detection = PalmDetection {
            score: 0.9,
            rect: palm::BoundingRect { xc: 0.5, yc: 0.5, w: 0.1, h: 0.1 },
            keypoints,
        };

        // 64 px palm, moved up by half its height
        let roi = Roi::from_palm(&detection, &letterbox);
        assert_eq!(roi.rotation, 0.0);
        assert_close(roi.cx, 320.0);
        assert_close(roi.cy, 208.0);
        assert_close(roi.size, 64.0 * 2.6);

        // Fingers pointing right, moved right instead
        detection.keypoints[0] = (0.45, 0.5);
        detection.keypoints[2] = (0.55, 0.5);
        let roi = Roi::from_palm(&detection, &letterbox);
        assert_close(roi.rotation, FRAC_PI_2);
        assert_close(roi.cx, 352.0);
        assert_close(roi.cy, 240.0);
    }

    #[test]
    fn test_palm_at_frame_edge_gives_roi_there() {
        // Single confident anchor near the left edge of a 1280x720 frame
        let anchors = palm::anchors();
        let row = (12 * 24 + 2) * 2;
        let mut boxes = vec![0.0f32; palm::PALM_ANCHOR_COUNT * palm::PALM_BOX_PARAMS];
        let mut scores = vec![-10.0f32; palm::PALM_ANCHOR_COUNT];
        scores[row] = 10.0;
        let params = &mut boxes[row * palm::PALM_BOX_PARAMS..(row + 1) * palm::PALM_BOX_PARAMS];
        params[2] = 19.2;
        params[3] = 19.2;
        params[5] = 9.6; // wrist below the centre
        params[9] = -9.6; // middle finger above

        let letterbox = Roi::covering(1280, 720);
        let roi = detect_palm_roi(&[boxes, scores], &anchors, &letterbox).unwrap();

        assert_eq!(roi.rotation, 0.0);
        assert_close(roi.cx, 2.5 / 24.0 * 1280.0);
        assert_close(roi.cy, -280.0 + 12.5 / 24.0 * 1280.0 - 64.0);
        assert_close(roi.size, 128.0 * 2.6);
        // Left of the 720 px centred square
        assert!(roi.cx < 280.0);
    }

    #[test]
    fn test_no_palm_no_roi() {
        let anchors = palm::anchors();
        let boxes = vec![0.0f32; palm::PALM_ANCHOR_COUNT * palm::PALM_BOX_PARAMS];
        let scores = vec![-10.0f32; palm::PALM_ANCHOR_COUNT];
        let letterbox = Roi::covering(640, 480);
        assert!(detect_palm_roi(&[boxes, scores], &anchors, &letterbox).is_none());
        assert!(detect_palm_roi(&[], &anchors, &letterbox).is_none());
    }

    #[test]
    fn test_preprocess_copies_roi_pixels() {
        // 4x4 frame, red everywhere except the bottom-right 2x2 block which is green
        let mut data = vec![0u8; 4 * 4 * 4];
        for y in 0..4u32 {
            for x in 0..4u32 {
                let i = ((y * 4 + x) * 4) as usize;
                if x >= 2 && y >= 2 {
                    data[i + 1] = 255;
                } else {
                    data[i] = 255;
                }
                data[i + 3] = 255;
            }
        }

        let roi = Roi { cx: 3.0, cy: 3.0, size: 2.0, rotation: 0.0 };
        let out = preprocess_roi_nhwc(&data, 4, 4, roi, 2);
        assert_eq!(out.len(), 12);
        for px in out.chunks(3) {
            assert_eq!(px, &[0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_preprocess_follows_rotation() {
        // 3x3 frame, red channel holds the pixel index
        let mut data = vec![0u8; 3 * 3 * 4];
        for i in 0..9 {
            data[i * 4] = i as u8 * 10;
        }

        let roi = Roi { cx: 1.5, cy: 1.5, size: 3.0, rotation: FRAC_PI_2 };
        let out = preprocess_roi_nhwc(&data, 3, 3, roi, 3);
        for y in 0..3usize {
            for x in 0..3usize {
                // Output (x, y) samples source (2 - y, x)
                let src = x * 3 + (2 - y);
                assert_eq!(out[(y * 3 + x) * 3], (src as u8 * 10) as f32 / 255.0);
            }
        }
    }

    #[test]
    fn test_preprocess_outside_frame_is_black() {
        let data = vec![255u8; 2 * 2 * 4];
        let roi = Roi { cx: -3.0, cy: -3.0, size: 2.0, rotation: 0.0 };
        let out = preprocess_roi_nhwc(&data, 2, 2, roi, 2);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_decode_maps_back_to_frame() {
        let mut coords = vec![0.0f32; 63];
        // Index fingertip at the centre of the model input
        coords[8 * 3] = 112.0;
        coords[8 * 3 + 1] = 112.0;
        let tensors = vec![coords, vec![0.9], vec![0.8]];

        let roi = Roi::centered(640, 480);
        let hand = decode_landmarks(&tensors, roi, 640, 480).unwrap();
        assert_eq!(hand.presence, 0.9);
        assert!(hand.is_right);

        let tip = hand.landmark(LandmarkIdx::IndexFingerTip);
        assert!((tip.x - 0.5).abs() < 1e-4);
        assert!((tip.y - 0.5).abs() < 1e-4);

        let wrist = hand.landmark(LandmarkIdx::Wrist);
        assert!((wrist.x - 80.0 / 640.0).abs() < 1e-4);
        assert_eq!(wrist.y, 0.0);
    }

    #[test]
    fn test_decode_requires_landmarks_and_presence() {
        let roi = Roi::centered(10, 10);
        assert!(decode_landmarks(&[vec![0.5]], roi, 10, 10).is_none());
        assert!(decode_landmarks(&[vec![0.0; 63]], roi, 10, 10).is_none());
    }

    #[test]
    fn test_missing_models_stop_accepting_frames() {
        let dir = tempfile::tempdir().unwrap();
        let inference = HandInference::new(InferenceConfig {
            models_dir: Some(dir.path().to_path_buf()),
            ..InferenceConfig::default()
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while inference.accepts_frames() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!inference.accepts_frames());
        assert!(!inference.is_ready());
        inference.process_frame(&[0u8; 16], 2, 2, 1);
        assert_eq!(inference.latest_result().frame_number, 0);
    }
}

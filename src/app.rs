//! Application state holding the wgpu graphics context
//!
//! Owns the wgpu device/surface and the egui integration, plus the camera,
//! hand tracking, credential store, and drawing session. `update` runs once
//! per tick before `render`.

use std::sync::Arc;
use std::time::Instant;

use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;
use winit::window::Window;

use crate::auth::{AuthError, CredentialStore};
use crate::camera::{CameraCapture, CameraFrame};
use crate::canvas::{raster, DrawingSession, HandUpdate, PaintColor, PinchDetector};
use crate::ml::{Hand, HandInference, InferenceConfig};
use crate::settings::Settings;
use crate::ui::{DrawingAction, DrawingView, LoginAction, LoginForm, Popup, Screen, StatusInfo};

/// Main application state
pub struct App {
    /// Reference to the window
    window: Arc<Window>,
    /// The wgpu surface for presenting rendered frames
    surface: wgpu::Surface<'static>,
    /// The wgpu device for creating GPU resources
    device: wgpu::Device,
    /// The command queue for submitting GPU work
    queue: wgpu::Queue,
    /// Surface configuration
    config: wgpu::SurfaceConfiguration,
    /// Current window size in physical pixels
    size: PhysicalSize<u32>,

    settings: Settings,

    // Login
    store: Option<CredentialStore>,
    screen: Screen,
    login_form: LoginForm,
    popup: Option<Popup>,

    // Camera capture
    camera: Option<CameraCapture>,
    camera_texture: Option<egui::TextureHandle>,
    last_camera_frame: u64,

    // Hand tracking
    hand_inference: Option<HandInference>,
    last_hand_frame: u64,
    hand: Option<Hand>,

    // Drawing
    session: DrawingSession,

    // egui integration
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    // Frame timing
    fps: f64,
    last_fps_update: Instant,
    frames_since_update: u64,
}

impl App {
    /// Create a new App instance with initialized wgpu context
    pub async fn new(window: Arc<Window>, settings: Settings) -> Result<Self, String> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Air Canvas Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to create device: {}", e))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or("Surface reports no supported formats")?;

        log::info!("Surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        let store = match CredentialStore::open(&settings.database_path) {
            Ok(store) => Some(store),
            Err(e) => {
                log::error!("Failed to open credential store {:?}: {}", settings.database_path, e);
                None
            }
        };

        let session = DrawingSession::new(
            PinchDetector::new(settings.pinch_threshold_px),
            settings.history_limit,
        );

        let mut app = Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            settings,
            store,
            screen: Screen::Login,
            login_form: LoginForm::default(),
            popup: None,
            camera: None,
            camera_texture: None,
            last_camera_frame: 0,
            hand_inference: None,
            last_hand_frame: 0,
            hand: None,
            session,
            egui_ctx,
            egui_state,
            egui_renderer,
            fps: 0.0,
            last_fps_update: Instant::now(),
            frames_since_update: 0,
        };

        if !app.settings.require_login {
            app.enter_drawing();
        }

        Ok(app)
    }

    /// Handle a window event, returning true if egui consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        response.consumed
    }

    /// Resize the surface
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Get current size
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Keyboard shortcuts on the drawing screen. Returns true if handled.
    pub fn handle_shortcut(&mut self, key: KeyCode, ctrl: bool) -> bool {
        if self.screen != Screen::Drawing || self.popup.is_some() {
            return false;
        }

        match key {
            KeyCode::KeyS if ctrl => self.save_drawing(),
            KeyCode::Delete => self.session.clear(),
            KeyCode::Tab => {
                let color = self.session.cycle_color();
                log::info!("Color: {:?}", color);
            }
            KeyCode::Digit1 => self.session.set_color(PaintColor::Red),
            KeyCode::Digit2 => self.session.set_color(PaintColor::Green),
            KeyCode::Digit3 => self.session.set_color(PaintColor::Blue),
            KeyCode::Digit4 => self.session.set_color(PaintColor::Yellow),
            _ => return false,
        }
        true
    }

    fn login(&mut self) {
        let form = &self.login_form;
        let valid = match &self.store {
            Some(store) => store.validate_user(&form.username, &form.password),
            None => {
                self.popup = Some(Popup::new("Login Failed", "Credential store unavailable"));
                return;
            }
        };

        match valid {
            Ok(true) => {
                log::info!("User '{}' logged in", form.username);
                self.login_form.password.clear();
                self.enter_drawing();
            }
            Ok(false) => {
                self.popup = Some(Popup::new("Login Failed", "Invalid username or password"));
            }
            Err(e) => {
                log::error!("Login query failed: {}", e);
                self.popup = Some(Popup::new("Login Failed", e.to_string()));
            }
        }
    }

    fn register(&mut self) {
        let Some(store) = &self.store else {
            self.popup = Some(Popup::new("Registration Failed", "Credential store unavailable"));
            return;
        };

        let form = &self.login_form;
        self.popup = Some(match store.create_user(&form.username, &form.password) {
            Ok(()) => Popup::new("Registration Success", "User created successfully"),
            Err(AuthError::UsernameTaken) => {
                Popup::new("Registration Failed", "Username already exists")
            }
            Err(e) => {
                log::warn!("Registration failed: {}", e);
                Popup::new("Registration Failed", e.to_string())
            }
        });
    }

    /// Switch to the drawing screen, starting the camera and hand tracking
    fn enter_drawing(&mut self) {
        self.screen = Screen::Drawing;
        if self.camera.is_none() {
            self.connect_camera(self.settings.camera_index);
        }
        self.init_hand_tracking();
    }

    /// Connect to a camera
    pub fn connect_camera(&mut self, camera_index: u32) {
        log::info!("Connecting to camera {}", camera_index);

        let cameras = CameraCapture::list_cameras();
        for info in &cameras {
            log::info!("  Camera {}: {}", info.index, info.name);
        }
        if !cameras.is_empty() && !cameras.iter().any(|c| c.index == camera_index) {
            log::warn!(
                "Camera {} not among {} detected device(s)",
                camera_index,
                cameras.len()
            );
        }

        match CameraCapture::new(camera_index) {
            Ok(capture) => {
                self.camera = Some(capture);
                self.camera_texture = None;
                self.last_camera_frame = 0;
            }
            Err(e) => {
                log::error!("Failed to connect camera: {}", e);
            }
        }
    }

    /// Start the hand landmark thread
    pub fn init_hand_tracking(&mut self) {
        if self.hand_inference.is_some() {
            return;
        }

        let config = InferenceConfig {
            models_dir: self.settings.models_dir.clone(),
            min_detection_confidence: self.settings.min_detection_confidence,
        };
        match HandInference::new(config) {
            Ok(inference) => {
                self.hand_inference = Some(inference);
                log::info!("Hand tracking initialized");
            }
            Err(e) => {
                log::warn!("Failed to initialize hand tracking: {}", e);
            }
        }
    }

    /// Per-tick update: pull the newest camera frame and hand result
    pub fn update(&mut self) {
        if self.screen != Screen::Drawing {
            return;
        }
        self.update_camera();
        self.update_hand();
    }

    /// Poll for a new frame, upload it, and queue it for hand tracking
    fn update_camera(&mut self) {
        let Some(camera) = &self.camera else { return };
        let Some(frame) = camera.latest_frame() else { return };

        if frame.frame_number <= self.last_camera_frame {
            return;
        }
        self.last_camera_frame = frame.frame_number;

        if let Some(inference) = &self.hand_inference {
            inference.process_frame(&frame.data, frame.width, frame.height, frame.frame_number);
        }

        if self.session.canvas_size() != (frame.width, frame.height) {
            log::info!("Canvas size: {}x{}", frame.width, frame.height);
            self.session.set_canvas_size(frame.width, frame.height);
        }

        self.upload_camera_frame(&frame);
    }

    fn upload_camera_frame(&mut self, frame: &CameraFrame) {
        let expected = (frame.width * frame.height * 4) as usize;
        if frame.data.len() < expected {
            log::warn!(
                "Skipping short camera frame ({} of {} bytes)",
                frame.data.len(),
                expected
            );
            return;
        }

        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width as usize, frame.height as usize],
            &frame.data[..expected],
        );
        match &mut self.camera_texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.camera_texture = Some(self.egui_ctx.load_texture(
                    "camera",
                    image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
    }

    /// Apply the newest hand result to the drawing session, once per result
    fn update_hand(&mut self) {
        let Some(inference) = &self.hand_inference else { return };
        let result = inference.latest_result();

        if result.frame_number <= self.last_hand_frame {
            return;
        }
        self.last_hand_frame = result.frame_number;

        if let Some(hand) = &result.hand {
            match self.session.apply_hand(hand) {
                HandUpdate::PenUp(true) => log::debug!("Pen lifted, new stroke"),
                HandUpdate::Ignored => log::trace!("Hand ignored, pen is up"),
                _ => {}
            }
        }
        self.hand = result.hand;
    }

    /// Write the current strokes to the drawings directory
    pub fn save_drawing(&mut self) {
        let (width, height) = self.session.canvas_size();
        let result = raster::save_drawing(
            self.session.strokes(),
            &self.settings.drawings_dir,
            width,
            height,
            self.settings.line_width,
        );

        self.popup = Some(match result {
            Ok(path) => Popup::new("Drawing Saved", format!("Saved drawing as {}", path.display())),
            Err(e) => {
                log::error!("Failed to save drawing: {}", e);
                Popup::new("Save Failed", e.to_string())
            }
        });
    }

    fn apply_drawing_action(&mut self, action: DrawingAction) {
        match action {
            DrawingAction::Clear => self.session.clear(),
            DrawingAction::SelectColor(color) => self.session.set_color(color),
            DrawingAction::CycleColor => {
                self.session.cycle_color();
            }
            DrawingAction::Save => self.save_drawing(),
            DrawingAction::MouseDown(point) => self.session.begin_mouse_stroke(point),
            DrawingAction::MouseDrag(point) => self.session.mouse_point(point),
        }
    }

    /// Render a frame
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        self.render_ui(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.update_fps();

        Ok(())
    }

    fn render_ui(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        let screen = self.screen;
        let popup_open = self.popup.is_some();
        let status = StatusInfo {
            fps: self.fps,
            camera_frames: self.camera.as_ref().map(|c| c.frame_count()).unwrap_or(0),
            camera_connected: self.camera.as_ref().is_some_and(|c| c.is_running()),
            tracking_ready: self.hand_inference.as_ref().is_some_and(|h| h.is_ready()),
            hand: self.hand.as_ref().map(|h| h.side_label()),
        };

        let mut login_action = None;
        let mut drawing_actions = Vec::new();
        let mut popup_still_open = true;

        // Split borrows so the closure does not capture `self`
        let login_form = &mut self.login_form;
        let view_state = DrawingView {
            camera: self.camera_texture.as_ref(),
            session: &self.session,
            hand: self.hand.as_ref(),
            line_width: self.settings.line_width,
            status,
            enabled: !popup_open,
        };
        let popup = self.popup.as_ref();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            match screen {
                Screen::Login => login_action = login_form.show(ctx, !popup_open),
                Screen::Drawing => drawing_actions = view_state.show(ctx),
            }
            if let Some(popup) = popup {
                popup_still_open = popup.show(ctx);
            }
        });

        if !popup_still_open {
            self.popup = None;
        }
        match login_action {
            Some(LoginAction::Login) => self.login(),
            Some(LoginAction::Register) => self.register(),
            None => {}
        }
        for action in drawing_actions {
            self.apply_drawing_action(action);
        }

        self.egui_state.handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn update_fps(&mut self) {
        self.frames_since_update += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_update).as_secs_f64();
        if elapsed >= 1.0 {
            self.fps = self.frames_since_update as f64 / elapsed;
            self.frames_since_update = 0;
            self.last_fps_update = now;
        }
    }
}

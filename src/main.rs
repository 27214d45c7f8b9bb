//! Air Canvas - Main Entry Point

use std::sync::Arc;
use std::time::{Duration, Instant};

use air_canvas::settings::Settings;
use air_canvas::App;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Air Canvas";
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 800;

/// Application state machine
enum AppState {
    /// Initial state before window is created
    Uninitialized(Settings),
    /// Window and graphics context are ready
    Running { window: Arc<Window>, app: App },
    /// Startup failed, waiting for the loop to exit
    Failed,
}

/// Main application handler implementing winit's ApplicationHandler trait
struct AirCanvasApp {
    state: AppState,
    frame_duration: Duration,
    next_redraw_at: Instant,
    modifiers: ModifiersState,
}

impl AirCanvasApp {
    fn new(settings: Settings) -> Self {
        let frame_duration =
            Duration::from_nanos(1_000_000_000u64 / settings.target_fps.max(1) as u64);
        Self {
            state: AppState::Uninitialized(settings),
            frame_duration,
            next_redraw_at: Instant::now(),
            modifiers: ModifiersState::empty(),
        }
    }
}

impl ApplicationHandler for AirCanvasApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Uninitialized(settings) = &self.state else {
            return;
        };
        let settings = settings.clone();

        log::info!("Creating window...");
        let window_attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                self.state = AppState::Failed;
                event_loop.exit();
                return;
            }
        };

        log::info!("Initializing wgpu and egui...");
        match pollster::block_on(App::new(window.clone(), settings)) {
            Ok(app) => {
                log::info!("Air Canvas ready! Pinch thumb and index finger to lift the pen");
                log::info!("Press ESC to exit, F11 for fullscreen");
                self.state = AppState::Running { window, app };
            }
            Err(e) => {
                log::error!("Failed to initialize graphics: {}", e);
                self.state = AppState::Failed;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Running { window, app } = &mut self.state else {
            return;
        };

        // Let egui handle the event first
        let egui_consumed = app.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                event_loop.exit();
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !egui_consumed => match key_code {
                KeyCode::Escape => {
                    log::info!("Escape pressed, exiting...");
                    event_loop.exit();
                }
                KeyCode::F11 => {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                        log::info!("Exiting fullscreen");
                    } else {
                        window.set_fullscreen(Some(winit::window::Fullscreen::Borderless(None)));
                        log::info!("Entering fullscreen");
                    }
                }
                key => {
                    app.handle_shortcut(key, self.modifiers.control_key());
                }
            },

            WindowEvent::Resized(physical_size) => {
                app.resize(physical_size);
            }

            WindowEvent::RedrawRequested => {
                app.update();

                match app.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::warn!("Surface lost, reconfiguring...");
                        app.resize(app.size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {:?}", e);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running { window, .. } = &self.state else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        // Drive redraws at the fixed target rate
        let now = Instant::now();
        if now >= self.next_redraw_at {
            window.request_redraw();
            self.next_redraw_at += self.frame_duration;

            // Reset if too far behind
            if now > self.next_redraw_at + self.frame_duration * 2 {
                self.next_redraw_at = now + self.frame_duration;
            }
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_redraw_at));
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Air Canvas v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load();
    log::info!(
        "Target {} FPS, drawings in {:?}",
        settings.target_fps,
        settings.drawings_dir
    );

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = AirCanvasApp::new(settings);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
}

//! egui screens
//!
//! The UI code only reads application state and reports what the user asked
//! for; the caller applies the returned actions after the egui pass.

pub mod drawing;
pub mod login;

pub use drawing::{DrawingAction, DrawingView, StatusInfo};
pub use login::{LoginAction, LoginForm};

/// Which screen is showing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Login,
    Drawing,
}

/// Modal message box
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub message: String,
}

impl Popup {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Show the popup; returns false once the user dismissed it
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let mut open = true;
        let mut dismissed = false;

        egui::Window::new(self.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([360.0, 120.0])
            .open(&mut open)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(self.message.as_str());
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        open && !dismissed
    }
}

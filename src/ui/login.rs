//! Login screen

/// Login form contents
#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login screen buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginAction {
    Login,
    Register,
}

impl LoginForm {
    /// Draw the login screen. `enabled` is false while a popup is open.
    pub fn show(&mut self, ctx: &egui::Context, enabled: bool) -> Option<LoginAction> {
        let mut action = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(ui.available_height() * 0.25);
                    ui.heading(egui::RichText::new("Login").size(32.0));
                    ui.add_space(12.0);

                    let width = 320.0;
                    ui.add(
                        egui::TextEdit::singleline(&mut self.username)
                            .hint_text("Username")
                            .desired_width(width),
                    );
                    let password = ui.add(
                        egui::TextEdit::singleline(&mut self.password)
                            .hint_text("Password")
                            .password(true)
                            .desired_width(width),
                    );
                    if password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        action = Some(LoginAction::Login);
                    }

                    ui.add_space(12.0);
                    let button_size = egui::vec2(width, 36.0);
                    if ui.add_sized(button_size, egui::Button::new("Login")).clicked() {
                        action = Some(LoginAction::Login);
                    }
                    if ui.add_sized(button_size, egui::Button::new("Register")).clicked() {
                        action = Some(LoginAction::Register);
                    }
                });
            });
        });

        action
    }
}

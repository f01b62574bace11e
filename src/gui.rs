//! The eframe/egui implementation of the interactive controller.
//!
//! A small dialog with a resource field, a Connect/Disconnect toggle, the
//! reported instrument identity and a frequency readout with an entry field
//! for setting a new value. After a set, the frequency is read back and the
//! confirmed value is displayed, so the readout always shows what the
//! instrument accepted rather than what was typed.
//!
//! All instrument I/O runs synchronously on the UI thread; a connect blocks
//! the dialog for the settle period, exactly like the bench workflow this
//! panel fronts. On a connect failure the session rollback has already
//! happened inside [`Session::open`], so the panel only has to reset its
//! displayed state and surface the error.

use crate::error::AppResult;
use crate::session::{Session, SessionOptions};
use crate::transport::ResourceManager;

const NOT_CONNECTED: &str = "Not connected.";

/// Main state of the controller dialog.
pub struct ControllerApp {
    manager: Box<dyn ResourceManager>,
    options: SessionOptions,
    session: Option<Session>,
    resource_input: String,
    frequency_input: String,
    identity_text: String,
    frequency_display: Option<f64>,
    status: Option<String>,
}

impl ControllerApp {
    pub fn new(manager: Box<dyn ResourceManager>, options: SessionOptions, resource: &str) -> Self {
        Self {
            manager,
            options,
            session: None,
            resource_input: resource.to_string(),
            frequency_input: String::new(),
            identity_text: NOT_CONNECTED.to_string(),
            frequency_display: None,
            status: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn identity_text(&self) -> &str {
        &self.identity_text
    }

    pub fn frequency_display(&self) -> Option<f64> {
        self.frequency_display
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn toggle_connection(&mut self) {
        self.status = None;
        if self.session.is_some() {
            self.disconnect();
        } else if let Err(e) = self.connect() {
            // Session::open already released any half-acquired handle.
            self.reset_display();
            self.status = Some(e.to_string());
        }
    }

    fn connect(&mut self) -> AppResult<()> {
        let mut session = Session::open(self.manager.as_ref(), &self.resource_input, &self.options)?;
        // Read the current frequency as part of connecting; if this fails
        // the session drops here and the handle is released.
        let hz = session.frequency()?;

        self.identity_text = session.identity().to_string();
        self.frequency_display = Some(hz);
        self.session = Some(session);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.reset_display();
    }

    fn reset_display(&mut self) {
        self.session = None;
        self.identity_text = NOT_CONNECTED.to_string();
        self.frequency_display = None;
        self.frequency_input.clear();
    }

    /// Apply the typed frequency: validate, set, read back, clear the entry.
    fn update_frequency(&mut self) {
        self.status = None;
        let text = self.frequency_input.trim().to_string();
        if text.is_empty() {
            return;
        }

        let hz: f64 = match text.parse() {
            Ok(hz) => hz,
            Err(_) => {
                self.status = Some(format!("'{text}' is not a valid frequency"));
                return;
            }
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.set_frequency(hz).and_then(|()| session.frequency()) {
            Ok(confirmed) => {
                self.frequency_display = Some(confirmed);
                self.frequency_input.clear();
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }
}

/// Strip everything a float literal cannot contain, the egui stand-in for a
/// numeric input validator.
fn sanitize_numeric(input: &mut String) {
    input.retain(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
}

impl eframe::App for ControllerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Resource");
                ui.add_enabled(
                    self.session.is_none(),
                    egui::TextEdit::singleline(&mut self.resource_input),
                );
                let toggle_label = if self.session.is_some() {
                    "Disconnect"
                } else {
                    "Connect"
                };
                if ui.button(toggle_label).clicked() {
                    self.toggle_connection();
                }
            });

            ui.label(self.identity_text.clone());

            if self.session.is_some() {
                ui.separator();
                ui.horizontal(|ui| {
                    ui.heading("Frequency");
                    if let Some(hz) = self.frequency_display {
                        ui.heading(format!("{hz:.6}"));
                    }
                });

                sanitize_numeric(&mut self.frequency_input);
                let entry = ui.add(
                    egui::TextEdit::singleline(&mut self.frequency_input)
                        .hint_text("New Frequency"),
                );
                if entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    self.update_frequency();
                }
            }

            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::RED, status);
            }
        });
    }
}

//! Prompt screen
//!
//! The session's prompt centered at the top, the capture devices listed
//! below it while one is being chosen, and a progress bar while a take is
//! recording or playing.

use eframe::egui::{self, Color32, RichText};

/// Display settings for the prompt screen
#[derive(Clone)]
pub struct PromptSettings {
    pub text_color: Color32,
    pub background: Color32,
    pub progress_color: Color32,
    pub text_size: f32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            text_color: Color32::BLACK,
            background: Color32::WHITE,
            progress_color: Color32::from_rgb(200, 40, 40),
            text_size: 28.0,
        }
    }
}

/// Prompt screen widget
#[derive(Default)]
pub struct PromptView {
    pub settings: PromptSettings,
}

impl PromptView {
    pub fn new() -> Self {
        Self::default()
    }

    fn text(&self, text: impl Into<String>) -> RichText {
        RichText::new(text)
            .size(self.settings.text_size)
            .color(self.settings.text_color)
    }

    pub fn show(&self, ui: &mut egui::Ui, prompt: &str, devices: &[String], progress: Option<f32>) {
        ui.painter()
            .rect_filled(ui.max_rect(), 0.0, self.settings.background);

        ui.vertical_centered(|ui| {
            ui.label(self.text(prompt));
        });

        if !devices.is_empty() {
            ui.add_space(self.settings.text_size);
            for line in device_lines(devices) {
                ui.label(self.text(line));
            }
        }

        if let Some(fraction) = progress {
            ui.add_space(self.settings.text_size);
            ui.add(
                egui::ProgressBar::new(fraction)
                    .fill(self.settings.progress_color)
                    .show_percentage(),
            );
        }
    }
}

/// Numbered device list entries, `"<index>: <name>"`
pub fn device_lines(devices: &[String]) -> Vec<String> {
    devices
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}: {}", i, name))
        .collect()
}

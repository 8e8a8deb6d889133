#![allow(dead_code)]

//! echo-rs - Record a take from a microphone and play it back
//!
//! Pick a capture device with a digit key, press 1 to record a few seconds
//! into memory, then 1 to play it back or 2 to record again.
//!
//! The audio devices run their callbacks on their own threads; the UI thread
//! drives the recording state machine and polls once per frame for the end
//! of a take.

use eframe::egui;

mod audio;
mod render;
mod session;
mod settings;
mod state;

use audio::CpalBackend;
use render::PromptView;
use session::Session;
use settings::AppSettings;

const DIGIT_KEYS: [egui::Key; 10] = [
    egui::Key::Num0,
    egui::Key::Num1,
    egui::Key::Num2,
    egui::Key::Num3,
    egui::Key::Num4,
    egui::Key::Num5,
    egui::Key::Num6,
    egui::Key::Num7,
    egui::Key::Num8,
    egui::Key::Num9,
];

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting echo-rs");

    let settings = AppSettings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_title("echo-rs"),
        ..Default::default()
    };

    eframe::run_native(
        "echo-rs",
        options,
        Box::new(move |_cc| Ok(Box::new(EchoApp::new(&settings)))),
    )
}

struct EchoApp {
    session: Session,
    view: PromptView,
}

impl EchoApp {
    fn new(settings: &AppSettings) -> Self {
        let backend = CpalBackend::new(settings.device_limit());

        Self {
            session: Session::new(Box::new(backend), settings.session_config()),
            view: PromptView::new(),
        }
    }
}

impl eframe::App for EchoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Keep polling for the end of a take even without input
        ctx.request_repaint();

        self.session.poll();

        let pressed: Vec<u8> = ctx.input(|i| {
            (0u8..)
                .zip(DIGIT_KEYS)
                .filter(|(_, key)| i.key_pressed(*key))
                .map(|(digit, _)| digit)
                .collect()
        });
        for digit in pressed {
            self.session.key_pressed(digit);
        }

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.small(format!("State: {}", self.session.state().name()));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let devices: &[String] = match self.session.state() {
                state::State::SelectingDevice { .. } => self.session.devices(),
                _ => &[],
            };
            self.view
                .show(ui, self.session.prompt(), devices, self.session.progress());
        });
    }
}

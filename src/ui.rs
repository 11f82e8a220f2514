use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::config::Config;
use crate::platform;

/// Room for a burst of events between frames; sends are try_send so the
/// producers shed load instead of blocking when the loop stalls.
pub const UI_QUEUE_DEPTH: usize = 64;

const WINDOW_SIZE: [f32; 2] = [360.0, 260.0];
const FLASH_DURATION: Duration = Duration::from_secs(1);

/// Everything other threads may ask of the overlay. Widget state is only
/// ever touched on the UI thread, inside `OverlayApp::update`.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Open at screen coordinates with the working indicator.
    OpenBusy { x: i32, y: i32 },
    /// Replace the indicator (or previous text) with the finished result.
    SetText(String),
    /// Toast without opening the overlay.
    Notify(String),
    /// Re-open showing whatever was displayed last.
    ShowLast,
    OpenSettings,
}

pub fn ui_channel() -> (Sender<UiEvent>, Receiver<UiEvent>) {
    crossbeam_channel::bounded(UI_QUEUE_DEPTH)
}

/// Drop the window a little below-right of the cursor like a context menu,
/// pulled back inside the monitor when it would hang off an edge.
fn clamp_to_monitor(x: f32, y: f32, size: [f32; 2], monitor: Option<egui::Vec2>) -> egui::Pos2 {
    let mut x = x + 12.0;
    let mut y = y + 12.0;
    if let Some(m) = monitor {
        if m.x > 0.0 && m.y > 0.0 {
            x = x.min(m.x - size[0]).max(0.0);
            y = y.min(m.y - size[1]).max(0.0);
        }
    }
    egui::pos2(x, y)
}

struct OverlayApp {
    rx: Receiver<UiEvent>,
    config: Arc<Mutex<Config>>,
    text: String,
    busy: bool,
    fonts_loaded: bool,
    flash: Option<(String, Instant)>,
    settings_open: bool,
    draft: Config,
}

impl OverlayApp {
    fn new(rx: Receiver<UiEvent>, config: Arc<Mutex<Config>>) -> Self {
        Self {
            rx,
            config,
            text: String::new(),
            busy: false,
            fonts_loaded: false,
            flash: None,
            settings_open: false,
            draft: Config::default(),
        }
    }

    fn apply(&mut self, ctx: &egui::Context, event: UiEvent) {
        match event {
            UiEvent::OpenBusy { x, y } => {
                self.busy = true;
                self.text.clear();
                let monitor = ctx.input(|i| i.viewport().monitor_size);
                let pos = clamp_to_monitor(x as f32, y as f32, WINDOW_SIZE, monitor);
                ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(pos));
                self.show(ctx);
            }
            UiEvent::SetText(text) => {
                self.busy = false;
                self.text = text;
                self.show(ctx);
            }
            UiEvent::Notify(message) => platform::toast(&message),
            UiEvent::ShowLast => self.show(ctx),
            UiEvent::OpenSettings => {
                self.draft = self.config.lock().unwrap().clone();
                self.settings_open = true;
                self.show(ctx);
            }
        }
    }

    fn show(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
        ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
    }

    fn hide(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
    }

    fn show_flash(&mut self, message: &str) {
        self.flash = Some((message.to_string(), Instant::now()));
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = true;
        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Base URL");
                    ui.text_edit_singleline(&mut self.draft.api_base_url);
                    ui.end_row();
                    ui.label("API key");
                    ui.add(egui::TextEdit::singleline(&mut self.draft.api_key).password(true));
                    ui.end_row();
                    ui.label("Model");
                    ui.text_edit_singleline(&mut self.draft.model);
                    ui.end_row();
                });
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        match self.draft.save() {
                            Ok(()) => {
                                *self.config.lock().unwrap() = self.draft.clone();
                                self.flash = Some(("Saved".to_string(), Instant::now()));
                                self.settings_open = false;
                                log::info!("config saved from settings panel");
                            }
                            Err(e) => {
                                log::error!("config save failed: {}", e);
                                self.flash = Some(("Save failed".to_string(), Instant::now()));
                            }
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        self.settings_open = false;
                    }
                });
            });
        if !open {
            self.settings_open = false;
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Wake up periodically so the queue drains even without user events
        ctx.request_repaint_after(Duration::from_millis(120));

        if !self.fonts_loaded {
            self.fonts_loaded = true;
            install_cjk_font(ctx);
        }

        while let Ok(event) = self.rx.try_recv() {
            self.apply(ctx, event);
        }

        // The close box and Alt+F4 hide the overlay; quitting belongs to
        // the tray menu.
        if ctx.input(|i| i.viewport().close_requested()) {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.hide(ctx);
        }

        egui::TopBottomPanel::top("bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("PopTrans");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Close").clicked() {
                        self.hide(ctx);
                    }
                    if ui.button("Copy").clicked() {
                        if platform::write_clipboard_string(&self.text) {
                            self.show_flash("Copied!");
                        } else {
                            self.show_flash("Copy failed");
                        }
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.busy {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Translating...");
                });
            } else {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.text)
                                .desired_rows(8)
                                .desired_width(f32::INFINITY),
                        );
                    });
            }
        });

        let flash_expired = self
            .flash
            .as_ref()
            .map_or(false, |(_, since)| since.elapsed() >= FLASH_DURATION);
        if flash_expired {
            self.flash = None;
        }
        if let Some((message, _)) = &self.flash {
            egui::Area::new(egui::Id::new("flash"))
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(message);
                    });
                });
        }

        if self.settings_open {
            self.settings_window(ctx);
        }
    }
}

fn install_cjk_font(ctx: &egui::Context) {
    let candidates = [
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\msyh.ttf",
        r"C:\Windows\Fonts\msyhbd.ttf",
        r"C:\Windows\Fonts\simsun.ttc",
        r"C:\Windows\Fonts\simhei.ttf",
    ];
    let mut loaded = None;
    for path in candidates {
        if let Ok(bytes) = fs::read(path) {
            log::info!("loaded CJK font: {}", path);
            loaded = Some(bytes);
            break;
        }
    }
    if let Some(bytes) = loaded {
        let mut fonts = egui::FontDefinitions::default();
        fonts.font_data.insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
        fonts.families.entry(egui::FontFamily::Proportional).or_default().insert(0, "cjk".to_owned());
        fonts.families.entry(egui::FontFamily::Monospace).or_default().insert(0, "cjk".to_owned());
        ctx.set_fonts(fonts);
    } else {
        log::warn!("no CJK font found; Chinese output may render as boxes");
    }
}

/// Runs the overlay event loop on the calling (main) thread until exit.
pub fn run_overlay(rx: Receiver<UiEvent>, config: Arc<Mutex<Config>>) {
    let app = OverlayApp::new(rx, config);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("PopTrans")
            .with_inner_size(WINDOW_SIZE)
            .with_decorations(false)
            .with_resizable(false)
            .with_always_on_top()
            .with_visible(false),
        ..Default::default()
    };
    match eframe::run_native("PopTrans", native_options, Box::new(|_cc| Box::new(app))) {
        Ok(()) => log::info!("UI event loop exited"),
        Err(e) => log::error!("UI event loop failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_queue_sheds_load_instead_of_blocking() {
        let (tx, _rx) = ui_channel();
        for _ in 0..UI_QUEUE_DEPTH {
            tx.try_send(UiEvent::ShowLast).unwrap();
        }
        assert!(tx.try_send(UiEvent::ShowLast).is_err());
    }

    #[test]
    fn clamp_keeps_window_inside_the_monitor() {
        let monitor = Some(egui::vec2(1920.0, 1080.0));

        // Plenty of room: lands just below-right of the cursor
        let pos = clamp_to_monitor(100.0, 100.0, WINDOW_SIZE, monitor);
        assert_eq!(pos, egui::pos2(112.0, 112.0));

        // Bottom-right corner: pulled back inside
        let pos = clamp_to_monitor(1900.0, 1070.0, WINDOW_SIZE, monitor);
        assert_eq!(pos, egui::pos2(1920.0 - WINDOW_SIZE[0], 1080.0 - WINDOW_SIZE[1]));

        // Negative coordinates never escape the origin
        let pos = clamp_to_monitor(-50.0, -50.0, WINDOW_SIZE, monitor);
        assert_eq!(pos, egui::pos2(0.0, 0.0));
    }

    #[test]
    fn clamp_without_monitor_info_just_offsets() {
        let pos = clamp_to_monitor(640.0, 480.0, WINDOW_SIZE, None);
        assert_eq!(pos, egui::pos2(652.0, 492.0));
    }
}

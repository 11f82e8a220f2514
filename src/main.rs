#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::sync::{mpsc, Arc, Mutex};
use std::thread;

mod api;
mod capture;
mod config;
mod coordinator;
mod error;
mod hotkey;
mod logger;
mod platform;
mod tray;
mod ui;

use api::HttpTranslator;
use capture::SelectionCapturer;
use coordinator::Coordinator;
use platform::{KeyboardCopySynthesizer, SystemClipboard};

fn main() {
    logger::init();
    log::info!("starting");

    let mut cfg = config::Config::load();
    cfg.apply_env_overrides();
    let cfg = Arc::new(Mutex::new(cfg));

    let (ui_tx, ui_rx) = ui::ui_channel();
    let (inbox_tx, inbox_rx) = mpsc::channel::<coordinator::Msg>();
    let (tray_tx, tray_rx) = mpsc::channel::<tray::TrayAction>();

    // Owns the blocking pool the translation calls run on.
    let runtime = tokio::runtime::Runtime::new().expect("tokio rt");

    let translator = Arc::new(HttpTranslator::new(Arc::clone(&cfg), runtime.handle().clone()));
    let capturer = SelectionCapturer::new(Arc::new(SystemClipboard), Arc::new(KeyboardCopySynthesizer));
    let coordinator = Coordinator::new(
        inbox_tx.clone(),
        capturer,
        translator,
        ui_tx.clone(),
        platform::cursor_position,
        runtime.handle().clone(),
    );
    let busy = coordinator.busy_flag();

    log::info!("spawning hotkey listener");
    hotkey::spawn_hotkey_listener(inbox_tx, busy);

    // Tray icon and its message pump stay on one thread; the handles are
    // not Send.
    thread::spawn(move || match tray::TrayHandle::new(tray_tx) {
        Ok(tray) => {
            log::info!("tray created");
            tray.pump_forever();
        }
        Err(e) => {
            log::error!("tray failed: {}", e);
            platform::toast(&format!("Tray failed: {}", e));
        }
    });

    // Tray actions map onto UI events; Quit ends the process here.
    {
        let ui_tx = ui_tx.clone();
        thread::spawn(move || {
            while let Ok(action) = tray_rx.recv() {
                match action {
                    tray::TrayAction::Quit => {
                        log::info!("quit requested from tray");
                        std::process::exit(0);
                    }
                    tray::TrayAction::OpenSettings => {
                        let _ = ui_tx.try_send(ui::UiEvent::OpenSettings);
                    }
                    tray::TrayAction::ShowWindow => {
                        let _ = ui_tx.try_send(ui::UiEvent::ShowLast);
                    }
                }
            }
        });
    }

    if cfg.lock().unwrap().api_key.is_empty() {
        platform::toast("No API key configured. Open Settings from the tray icon.");
    } else {
        platform::toast("Ready. Select text and press Alt+C.");
    }

    thread::spawn(move || coordinator.run(inbox_rx));

    // Main thread belongs to the UI event loop until the process exits.
    ui::run_overlay(ui_rx, cfg);
}

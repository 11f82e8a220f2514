use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use crate::api::Translator;
use crate::capture::SelectionCapturer;
use crate::error::TranslateError;
use crate::ui::UiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Capturing,
    Translating,
    Displaying,
}

/// Which hotkey fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Alt+C: snapshot the selection through the copy side-channel.
    Selection,
    /// Alt+Space: translate whatever is already on the clipboard.
    Clipboard,
}

pub enum Msg {
    HotkeyPressed(Trigger),
    Finished(Result<String, TranslateError>),
}

/// Owns the hotkey-to-overlay pipeline. Everything it collaborates with is
/// injected, so `main` decides lifetimes and tests can swap all of it.
///
/// State is mutated only on the thread running `run`; the hotkey listener
/// sees a derived busy flag and nothing else.
pub struct Coordinator {
    state: CoordinatorState,
    busy: Arc<AtomicBool>,
    inbox_tx: Sender<Msg>,
    capturer: SelectionCapturer,
    translator: Arc<dyn Translator>,
    ui_tx: crossbeam_channel::Sender<UiEvent>,
    cursor_pos: fn() -> (i32, i32),
    runtime: tokio::runtime::Handle,
}

impl Coordinator {
    pub fn new(
        inbox_tx: Sender<Msg>,
        capturer: SelectionCapturer,
        translator: Arc<dyn Translator>,
        ui_tx: crossbeam_channel::Sender<UiEvent>,
        cursor_pos: fn() -> (i32, i32),
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            state: CoordinatorState::Idle,
            busy: Arc::new(AtomicBool::new(false)),
            inbox_tx,
            capturer,
            translator,
            ui_tx,
            cursor_pos,
            runtime,
        }
    }

    /// Flag the hotkey listener checks before posting, so presses during
    /// the blocking capture phase get dropped instead of queued.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn run(mut self, inbox_rx: Receiver<Msg>) {
        while let Ok(msg) = inbox_rx.recv() {
            self.handle(msg);
        }
        log::info!("coordinator inbox closed, stopping");
    }

    pub fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::HotkeyPressed(trigger) => self.on_hotkey(trigger),
            Msg::Finished(result) => self.on_finished(result),
        }
    }

    fn on_hotkey(&mut self, trigger: Trigger) {
        if self.state != CoordinatorState::Idle {
            // Second layer of the single-flight guard; the listener's busy
            // check already drops most of these.
            log::debug!("hotkey {:?} while {:?}, dropped", trigger, self.state);
            return;
        }

        self.set_state(CoordinatorState::Capturing);
        let snapshot = match trigger {
            Trigger::Selection => self.capturer.capture(),
            Trigger::Clipboard => self.capturer.current(),
        };
        let Some(snapshot) = snapshot else {
            self.send_ui(UiEvent::Notify("Nothing selected to translate.".to_string()));
            self.set_state(CoordinatorState::Idle);
            return;
        };

        let (x, y) = (self.cursor_pos)();
        self.send_ui(UiEvent::OpenBusy { x, y });
        self.set_state(CoordinatorState::Translating);
        log::info!(
            "translating {} chars ({:?}, snapshot {} ms old)",
            snapshot.text.chars().count(),
            trigger,
            snapshot.captured_at.elapsed().as_millis()
        );

        let translator = Arc::clone(&self.translator);
        let inbox = self.inbox_tx.clone();
        self.runtime.spawn_blocking(move || {
            let result = catch_unwind(AssertUnwindSafe(|| translator.translate(&snapshot.text)))
                .unwrap_or_else(|_| {
                    Err(TranslateError::Unknown("translation task panicked".to_string()))
                });
            // The coordinator may already be gone during shutdown.
            let _ = inbox.send(Msg::Finished(result));
        });
    }

    fn on_finished(&mut self, result: Result<String, TranslateError>) {
        if self.state != CoordinatorState::Translating {
            log::warn!("stale translation result while {:?}, dropped", self.state);
            return;
        }
        self.set_state(CoordinatorState::Displaying);
        let text = match result {
            Ok(t) => t,
            Err(e) => {
                log::warn!("translation failed: {}", e);
                e.to_string()
            }
        };
        self.send_ui(UiEvent::SetText(text));
        self.set_state(CoordinatorState::Idle);
    }

    fn set_state(&mut self, next: CoordinatorState) {
        log::debug!("state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.busy.store(next != CoordinatorState::Idle, Ordering::SeqCst);
    }

    fn send_ui(&self, event: UiEvent) {
        // try_send so a wedged UI can never stall this thread in turn
        if let Err(e) = self.ui_tx.try_send(event) {
            log::warn!("UI queue full, dropping event: {}", e);
        }
    }
}

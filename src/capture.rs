use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long the target app gets to react, both before and after the
/// injected chord. 500 ms survives slow Electron apps without feeling
/// laggy; shorter values miss copies.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub text: String,
    pub captured_at: Instant,
}

pub trait Clipboard: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, text: &str) -> bool;
}

pub trait CopySynthesizer: Send + Sync {
    fn synthesize_copy(&self);
}

/// Reads "what is selected right now" through the clipboard side-channel:
/// save, inject a copy chord, compare, restore.
pub struct SelectionCapturer {
    clipboard: Arc<dyn Clipboard>,
    synthesizer: Arc<dyn CopySynthesizer>,
    settle: Duration,
}

impl SelectionCapturer {
    pub fn new(clipboard: Arc<dyn Clipboard>, synthesizer: Arc<dyn CopySynthesizer>) -> Self {
        Self { clipboard, synthesizer, settle: SETTLE_DELAY }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Unchanged clipboard content after the chord means no selection; the
    /// clipboard is then left exactly as found. Changed content is returned
    /// and the previous content written back. That write-back can race a
    /// copy the user performs in the same instant; the side-channel has no
    /// way to close that window.
    pub fn capture(&self) -> Option<Snapshot> {
        let previous = self.clipboard.read().unwrap_or_default();
        thread::sleep(self.settle);
        self.synthesizer.synthesize_copy();
        thread::sleep(self.settle);
        let candidate = self.clipboard.read().unwrap_or_default();

        if candidate == previous {
            log::debug!("capture: clipboard unchanged, nothing selected");
            return None;
        }
        if !self.clipboard.write(&previous) {
            log::warn!("capture: failed to restore previous clipboard content");
        }
        if candidate.trim().is_empty() {
            return None;
        }
        Some(Snapshot { text: candidate, captured_at: Instant::now() })
    }

    /// The clipboard as it already is, no injection, no restore needed.
    pub fn current(&self) -> Option<Snapshot> {
        let text = self.clipboard.read()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(Snapshot { text, captured_at: Instant::now() })
    }
}

#[cfg(test)]
pub(crate) mod testkit {
    use super::{Clipboard, CopySynthesizer};
    use std::sync::{Arc, Mutex};

    pub(crate) struct MemClipboard {
        content: Mutex<Option<String>>,
        writes: Mutex<Vec<String>>,
    }

    impl MemClipboard {
        pub(crate) fn new(initial: &str) -> Arc<Self> {
            Arc::new(Self {
                content: Mutex::new(Some(initial.to_string())),
                writes: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn content(&self) -> Option<String> {
            self.content.lock().unwrap().clone()
        }

        pub(crate) fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl Clipboard for MemClipboard {
        fn read(&self) -> Option<String> {
            self.content.lock().unwrap().clone()
        }

        fn write(&self, text: &str) -> bool {
            *self.content.lock().unwrap() = Some(text.to_string());
            self.writes.lock().unwrap().push(text.to_string());
            true
        }
    }

    /// Plays the target application: when the chord "arrives", the scripted
    /// text lands in the clipboard. `None` scripts an app that ignores it.
    pub(crate) struct ScriptedCopy {
        clipboard: Arc<MemClipboard>,
        lands: Option<String>,
    }

    impl ScriptedCopy {
        pub(crate) fn new(clipboard: &Arc<MemClipboard>, lands: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                clipboard: Arc::clone(clipboard),
                lands: lands.map(str::to_string),
            })
        }
    }

    impl CopySynthesizer for ScriptedCopy {
        fn synthesize_copy(&self) {
            if let Some(text) = &self.lands {
                *self.clipboard.content.lock().unwrap() = Some(text.clone());
            }
        }
    }
}

use crate::capture::{Clipboard, CopySynthesizer};

pub fn read_clipboard_string() -> Option<String> {
    #[cfg(windows)]
    {
        clipboard_win::get_clipboard_string().ok()
    }
    #[cfg(not(windows))]
    {
        None
    }
}

pub fn write_clipboard_string(s: &str) -> bool {
    #[cfg(windows)]
    {
        clipboard_win::set_clipboard_string(s).is_ok()
    }
    #[cfg(not(windows))]
    {
        let _ = s;
        false
    }
}

pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn read(&self) -> Option<String> {
        read_clipboard_string()
    }

    fn write(&self, text: &str) -> bool {
        write_clipboard_string(text)
    }
}

pub struct KeyboardCopySynthesizer;

impl CopySynthesizer for KeyboardCopySynthesizer {
    fn synthesize_copy(&self) {
        send_copy_chord();
    }
}

#[cfg(windows)]
fn send_copy_chord() {
    use windows::Win32::UI::Input::KeyboardAndMouse as km;

    fn key(vk: km::VIRTUAL_KEY, flags: km::KEYBD_EVENT_FLAGS) -> km::INPUT {
        km::INPUT {
            r#type: km::INPUT_KEYBOARD,
            Anonymous: km::INPUT_0 {
                ki: km::KEYBDINPUT {
                    wVk: vk,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    // Letter keys have no named constants; 'C' is its ASCII code.
    const VK_C: km::VIRTUAL_KEY = km::VIRTUAL_KEY(0x43);

    // The hotkey's Alt is usually still held; release it first or the
    // injected chord arrives as Ctrl+Alt+C.
    let inputs = [
        key(km::VK_MENU, km::KEYEVENTF_KEYUP),
        key(km::VK_CONTROL, km::KEYBD_EVENT_FLAGS(0)),
        key(VK_C, km::KEYBD_EVENT_FLAGS(0)),
        key(VK_C, km::KEYEVENTF_KEYUP),
        key(km::VK_CONTROL, km::KEYEVENTF_KEYUP),
    ];
    unsafe {
        let sent = km::SendInput(&inputs, std::mem::size_of::<km::INPUT>() as i32);
        if sent != inputs.len() as u32 {
            log::warn!("SendInput injected {} of {} events", sent, inputs.len());
        }
    }
}

#[cfg(not(windows))]
fn send_copy_chord() {}

/// Global cursor point in screen coordinates; origin when the OS refuses.
pub fn cursor_position() -> (i32, i32) {
    use mouse_position::mouse_position::Mouse;
    match Mouse::get_mouse_position() {
        Mouse::Position { x, y } => (x, y),
        Mouse::Error => {
            log::warn!("cursor position unavailable, falling back to origin");
            (0, 0)
        }
    }
}

pub fn toast(body: &str) {
    #[cfg(windows)]
    {
        let _ = winrt_notification::Toast::new("PopTrans")
            .title("PopTrans")
            .text1(body)
            .show();
    }
    #[cfg(not(windows))]
    {
        log::info!("notification: {}", body);
    }
}

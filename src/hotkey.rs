use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::coordinator::Msg;

/// Alt+C snapshots the selection, Alt+Space the clipboard. Registration
/// failures are surfaced and the app keeps running with whatever stuck.
#[cfg(windows)]
pub fn spawn_hotkey_listener(tx: Sender<Msg>, busy: Arc<AtomicBool>) {
    use std::sync::atomic::Ordering;
    use std::thread;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse as km;
    use windows::Win32::UI::WindowsAndMessaging as wm;

    use crate::coordinator::Trigger;

    const SELECTION_HOTKEY_ID: i32 = 1;
    const CLIPBOARD_HOTKEY_ID: i32 = 2;

    thread::spawn(move || unsafe {
        let alt = km::HOT_KEY_MODIFIERS(km::MOD_ALT.0 as u32);
        if km::RegisterHotKey(HWND(std::ptr::null_mut()), SELECTION_HOTKEY_ID, alt, b'C' as u32).is_err() {
            log::error!("RegisterHotKey Alt+C failed (already taken?)");
            crate::platform::toast("Failed to register Alt+C (already in use?)");
        } else {
            log::info!("RegisterHotKey Alt+C ok");
        }
        if km::RegisterHotKey(HWND(std::ptr::null_mut()), CLIPBOARD_HOTKEY_ID, alt, km::VK_SPACE.0 as u32).is_err() {
            log::error!("RegisterHotKey Alt+Space failed (already taken?)");
            crate::platform::toast("Failed to register Alt+Space (already in use?)");
        } else {
            log::info!("RegisterHotKey Alt+Space ok");
        }
        loop {
            let mut msg = wm::MSG::default();
            let got = wm::GetMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0);
            if got.0 == -1 {
                log::error!("GetMessageW returned -1, stopping hotkey loop");
                break;
            }
            if msg.message == wm::WM_HOTKEY {
                let trigger = match msg.wParam.0 as i32 {
                    SELECTION_HOTKEY_ID => Some(Trigger::Selection),
                    CLIPBOARD_HOTKEY_ID => Some(Trigger::Clipboard),
                    _ => None,
                };
                if let Some(trigger) = trigger {
                    // A press mid-request is dropped here, not queued behind
                    // the capture the coordinator is blocked in.
                    if busy.load(Ordering::SeqCst) {
                        log::debug!("hotkey {:?} ignored, request in flight", trigger);
                    } else {
                        let _ = tx.send(Msg::HotkeyPressed(trigger));
                    }
                }
            }
            let _ = wm::TranslateMessage(&msg);
            wm::DispatchMessageW(&msg);
        }
        let _ = km::UnregisterHotKey(HWND(std::ptr::null_mut()), SELECTION_HOTKEY_ID);
        let _ = km::UnregisterHotKey(HWND(std::ptr::null_mut()), CLIPBOARD_HOTKEY_ID);
    });
}

#[cfg(not(windows))]
pub fn spawn_hotkey_listener(_tx: Sender<Msg>, _busy: Arc<AtomicBool>) {
    // No global hook off Windows for now
}

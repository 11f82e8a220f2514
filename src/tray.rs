use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tray_icon as tri;
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

#[derive(Clone, Debug)]
pub enum TrayAction {
    Quit,
    OpenSettings,
    ShowWindow,
}

pub struct TrayHandle {
    #[allow(dead_code)]
    tray: TrayIcon,
    menu_event_rx: Receiver<MenuEvent>,
    tray_event_rx: Receiver<tri::TrayIconEvent>,
    quit_item: MenuItem,
    settings_item: MenuItem,
    action_tx: Sender<TrayAction>,
}

impl TrayHandle {
    pub fn new(action_tx: Sender<TrayAction>) -> anyhow::Result<Self> {
        let menu = Menu::new();
        // Plain ASCII labels to avoid shell/encoding quirks
        let settings = MenuItem::new("Settings...", true, None);
        let quit = MenuItem::new("Quit", true, None);
        let sep = PredefinedMenuItem::separator();
        menu.append_items(&[&settings, &sep, &quit])?;

        // 16x16 blue dot, drawn in code so there is no asset to ship
        let (icon_w, icon_h) = (16usize, 16usize);
        let mut rgba = vec![0u8; icon_w * icon_h * 4];
        for y in 0..icon_h {
            for x in 0..icon_w {
                let dx = x as f32 - 7.5;
                let dy = y as f32 - 7.5;
                if dx * dx + dy * dy <= 7.5 * 7.5 {
                    let i = (y * icon_w + x) * 4;
                    rgba[i] = 0x2E;
                    rgba[i + 1] = 0x86;
                    rgba[i + 2] = 0xDE;
                    rgba[i + 3] = 0xFF;
                }
            }
        }
        let icon = Icon::from_rgba(rgba, icon_w as u32, icon_h as u32)?;

        let tray = TrayIconBuilder::new()
            .with_tooltip("PopTrans - Alt+C translates the selection")
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()?;

        let menu_event_rx = MenuEvent::receiver().clone();
        let tray_event_rx = tri::TrayIconEvent::receiver().clone();

        Ok(Self { tray, menu_event_rx, tray_event_rx, quit_item: quit, settings_item: settings, action_tx })
    }

    fn pump(&self) {
        // Non-blocking poll of menu events
        while let Ok(event) = self.menu_event_rx.try_recv() {
            let id = event.id;
            if id == self.quit_item.id() {
                log::info!("tray: quit clicked");
                let _ = self.action_tx.send(TrayAction::Quit);
            } else if id == self.settings_item.id() {
                log::info!("tray: settings clicked");
                let _ = self.action_tx.send(TrayAction::OpenSettings);
            }
        }
        // A click on the icon itself re-opens the overlay
        while let Ok(event) = self.tray_event_rx.try_recv() {
            match event.click_type {
                tri::ClickType::Left | tri::ClickType::Double => {
                    log::info!("tray: clicked, showing overlay");
                    let _ = self.action_tx.send(TrayAction::ShowWindow);
                }
                _ => {}
            }
        }
    }

    /// Owns its thread: tray-icon handles are not Send, so the Windows
    /// message pump for the icon runs right here.
    pub fn pump_forever(&self) {
        #[cfg(windows)]
        {
            use windows::Win32::Foundation::HWND;
            use windows::Win32::UI::WindowsAndMessaging as wm;
            loop {
                unsafe {
                    let mut msg = wm::MSG::default();
                    while wm::PeekMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0, wm::PM_REMOVE).into() {
                        let _ = wm::TranslateMessage(&msg);
                        wm::DispatchMessageW(&msg);
                    }
                }
                self.pump();
                thread::sleep(Duration::from_millis(25));
            }
        }
        #[cfg(not(windows))]
        loop {
            self.pump();
            thread::sleep(Duration::from_millis(25));
        }
    }
}

use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager,
    hotkey::{Code, HotKey, Modifiers},
};

/// Global capture hotkey, polled from a blocking thread
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl HotkeyManager {
    /// Register Ctrl+Shift+S
    pub fn new() -> Result<Self> {
        Self::with_hotkey(Modifiers::CONTROL | Modifiers::SHIFT, Code::KeyS)
    }

    pub fn with_hotkey(modifiers: Modifiers, code: Code) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;

        let hotkey = HotKey::new(Some(modifiers), code);

        manager
            .register(hotkey)
            .context("Failed to register hotkey")?;

        Ok(Self { manager, hotkey })
    }

    /// Check if the hotkey was pressed (non-blocking)
    pub fn poll(&self) -> bool {
        let receiver = GlobalHotKeyEvent::receiver();
        match receiver.try_recv() {
            Ok(event) => {
                let is_match = event.id == self.hotkey.id();
                if !is_match {
                    tracing::trace!("ignoring hotkey event {:?}", event.id);
                }
                is_match
            }
            Err(_) => false,
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.hotkey);
    }
}

use crate::error::HostError;
use crate::host::Clipboard;
use std::cell::RefCell;
use std::rc::Rc;

/// The desktop clipboard, through arboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, HostError> {
        let inner = arboard::Clipboard::new().map_err(|e| HostError::new(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl Clipboard for SystemClipboard {
    fn get_text(&mut self) -> Result<String, HostError> {
        self.inner.get_text().map_err(|e| HostError::new(e.to_string()))
    }

    fn set_text(&mut self, text: &str) -> Result<(), HostError> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| HostError::new(e.to_string()))
    }
}

/// Process-local clipboard for headless use. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Rc<RefCell<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&mut self) -> Result<String, HostError> {
        Ok(self.contents())
    }

    fn set_text(&mut self, text: &str) -> Result<(), HostError> {
        *self.text.borrow_mut() = text.to_string();
        Ok(())
    }
}

/// The system clipboard when one is reachable, otherwise an in-memory stand-in.
pub fn default_clipboard() -> Box<dyn Clipboard> {
    match SystemClipboard::new() {
        Ok(clipboard) => Box::new(clipboard),
        Err(e) => {
            tracing::debug!("system clipboard unavailable: {}", e);
            Box::new(MemoryClipboard::new())
        }
    }
}

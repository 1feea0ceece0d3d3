use std::cell::RefCell;
use std::rc::Rc;

/// Transient status-bar messages.
pub trait StatusMessage {
    fn show(&mut self, message: &str, timeout_ms: u64, is_warning: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub message: String,
    pub is_warning: bool,
}

/// Collects status messages in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Rc<RefCell<Vec<StatusEntry>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<StatusEntry> {
        self.entries.borrow().clone()
    }

    pub fn last(&self) -> Option<StatusEntry> {
        self.entries.borrow().last().cloned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.is_warning)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl StatusMessage for MessageLog {
    fn show(&mut self, message: &str, _timeout_ms: u64, is_warning: bool) {
        self.entries.borrow_mut().push(StatusEntry {
            message: message.to_string(),
            is_warning,
        });
    }
}

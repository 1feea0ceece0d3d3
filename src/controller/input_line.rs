use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;

/// Command-line history, most recent first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Records `entry`, moving an existing copy to the front.
    pub fn push(&mut self, entry: &str) {
        if entry.is_empty() {
            return;
        }
        self.entries.retain(|e| e != entry);
        self.entries.push_front(entry.to_string());
        self.entries.truncate(self.limit);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Continue,
    Submit(String),
    Cancel,
}

/// Single-line text capture used for `:` and `/`/`?`.
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    prompt: char,
    text: String,
    history_index: Option<usize>,
    typed: String,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, prompt: char, prefill: &str) {
        self.prompt = prompt;
        self.text = prefill.to_string();
        self.typed = self.text.clone();
        self.history_index = None;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn display(&self) -> String {
        format!("{}{}", self.prompt, self.text)
    }

    pub fn handle_key(&mut self, key: &KeyEvent, history: &History) -> InputEvent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => InputEvent::Cancel,
            KeyCode::Char('c') | KeyCode::Char('[') if ctrl => InputEvent::Cancel,
            KeyCode::Enter => InputEvent::Submit(std::mem::take(&mut self.text)),
            KeyCode::Backspace => {
                if self.text.pop().is_none() {
                    return InputEvent::Cancel;
                }
                self.typed = self.text.clone();
                InputEvent::Continue
            }
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                self.typed.clear();
                InputEvent::Continue
            }
            KeyCode::Up => {
                let next = self.history_index.map_or(0, |i| i + 1);
                if let Some(entry) = history.get(next) {
                    self.history_index = Some(next);
                    self.text = entry.to_string();
                }
                InputEvent::Continue
            }
            KeyCode::Down => {
                match self.history_index {
                    Some(0) | None => {
                        self.history_index = None;
                        self.text = self.typed.clone();
                    }
                    Some(i) => {
                        self.history_index = Some(i - 1);
                        if let Some(entry) = history.get(i - 1) {
                            self.text = entry.to_string();
                        }
                    }
                }
                InputEvent::Continue
            }
            KeyCode::Char(c) if !ctrl => {
                self.text.push(c);
                self.typed = self.text.clone();
                InputEvent::Continue
            }
            KeyCode::Tab => {
                self.text.push('\t');
                self.typed = self.text.clone();
                InputEvent::Continue
            }
            _ => InputEvent::Continue,
        }
    }
}

use super::command_table::CommandId;
use super::input_line::{History, InputLine};
use super::mode::{CopyMode, Mode, Operator, VisualMode};
use super::state::{ControllerState, InsertSession};
use crate::config::Settings;
use crate::document_model::{MemoryClipboard, RegexFinder, RegisterStore};
use crate::error::{EngineError, ErrorKind};
use crate::host::{
    Buffer, CaretStyle, Clipboard, Finder, MacroRecorder, MessageLog, SelectionMode, StatusMessage,
};
use crossterm::event::KeyEvent;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// How long transient status messages stay up.
pub const STATUS_TIMEOUT_MS: u64 = 3000;

const HISTORY_LIMIT: usize = 50;

/// Work the engine needs the host to do on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    Write,
    Quit { force: bool },
    Shell(String),
    Highlight(String),
    ClearHighlight,
}

/// The engine's upward-facing surface.
pub trait CommandHandler {
    /// Interprets one key event. Returns `false` if the key meant nothing in the current mode.
    fn handle_keypress(&mut self, buffer: &mut dyn Buffer, key: KeyEvent) -> bool;

    /// Runs one logical command. Returns `true` when it was carried out.
    fn execute(&mut self, buffer: &mut dyn Buffer, command: CommandId) -> bool;

    /// Like [`execute`](Self::execute), looking the command up by name.
    fn execute_named(&mut self, buffer: &mut dyn Buffer, name: &str) -> bool;

    /// Runs one `:` line (without the leading colon).
    fn run_ex_command(&mut self, buffer: &mut dyn Buffer, line: &str);
}

/// One editor's vi engine.
///
/// A session owns all controller state and the register file; the buffer it edits is
/// passed in on every call.
pub struct Session {
    pub(crate) state: ControllerState,
    pub(crate) registers: RegisterStore,
    pub(crate) settings: Settings,
    pub(crate) finder: Box<dyn Finder>,
    pub(crate) status: Box<dyn StatusMessage>,
    pub(crate) recorder: Option<Box<dyn MacroRecorder>>,
    pub(crate) input: InputLine,
    pub(crate) search_history: History,
    pub(crate) command_history: History,
    pub(crate) requests: Vec<HostRequest>,
    pub(crate) user_commands: HashMap<String, Vec<String>>,
    pub(crate) ex_depth: usize,
}

pub struct SessionBuilder {
    settings: Settings,
    clipboard: Option<Box<dyn Clipboard>>,
    finder: Option<Box<dyn Finder>>,
    status: Option<Box<dyn StatusMessage>>,
    recorder: Option<Box<dyn MacroRecorder>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            clipboard: None,
            finder: None,
            status: None,
            recorder: None,
        }
    }
}

impl SessionBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn finder(mut self, finder: Box<dyn Finder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn status(mut self, status: Box<dyn StatusMessage>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn recorder(mut self, recorder: Box<dyn MacroRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn build(self) -> Session {
        let clipboard = self
            .clipboard
            .unwrap_or_else(|| Box::new(MemoryClipboard::new()));
        Session {
            state: ControllerState::new(),
            registers: RegisterStore::new(clipboard),
            settings: self.settings,
            finder: self.finder.unwrap_or_else(|| Box::new(RegexFinder::new())),
            status: self.status.unwrap_or_else(|| Box::new(MessageLog::new())),
            recorder: self.recorder,
            input: InputLine::new(),
            search_history: History::new(HISTORY_LIMIT),
            command_history: History::new(HISTORY_LIMIT),
            requests: Vec::new(),
            user_commands: HashMap::new(),
            ex_depth: 0,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        SessionBuilder::default().build()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn visual_mode(&self) -> VisualMode {
        self.state.visual_mode
    }

    pub fn repeat_count(&self) -> usize {
        self.state.repeat_count
    }

    pub fn register(&self) -> Option<char> {
        self.state.register
    }

    pub fn operator(&self) -> Option<Operator> {
        self.state.operator
    }

    pub fn copy_mode(&self) -> CopyMode {
        self.state.copy_mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn registers(&self) -> &RegisterStore {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterStore {
        &mut self.registers
    }

    pub fn search_history(&self) -> &History {
        &self.search_history
    }

    pub fn command_history(&self) -> &History {
        &self.command_history
    }

    /// Text of the `:` or `/` line being edited, if one is open.
    pub fn input_text(&self) -> Option<String> {
        match self.state.mode {
            Mode::Search | Mode::Command => Some(self.input.display()),
            _ => None,
        }
    }

    /// Hands queued host work over to the caller.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Defines `:name`, which runs each of `commands` as an ex line.
    pub fn register_user_command(&mut self, name: &str, commands: Vec<String>) {
        self.user_commands.insert(name.to_string(), commands);
    }

    /// Pushes the buffer-facing settings (tab width, file format) to `buffer`.
    pub fn apply_settings(&self, buffer: &mut dyn Buffer) {
        buffer.set_tab_width(self.settings.tabstop);
        buffer.set_file_format(self.settings.fileformat);
    }

    pub fn mode_label(&self) -> String {
        match self.state.mode {
            Mode::Insert => "-- INSERT --".to_string(),
            Mode::Overtype => "-- REPLACE --".to_string(),
            Mode::Select => "-- SELECT --".to_string(),
            Mode::Visual => match self.state.visual_mode {
                VisualMode::Char => "-- VISUAL --".to_string(),
                VisualMode::Line => "-- VISUAL LINE --".to_string(),
                VisualMode::Block => "-- VISUAL BLOCK --".to_string(),
            },
            Mode::Search | Mode::Command => self.input.display(),
            Mode::Normal | Mode::SetRegister | Mode::ReplaceChar | Mode::FindChar => String::new(),
        }
    }

    /// The partially typed command, as vim shows it in the corner of the status line.
    pub fn pending_keys(&self) -> String {
        let mut out = String::new();
        if let Some(r) = self.state.register {
            out.push('"');
            out.push(r);
        }
        if self.state.repeat_count > 0 {
            out.push_str(&self.state.repeat_count.to_string());
        }
        if let Some(op) = self.state.operator {
            out.push(op.key());
        }
        if self.state.pending_g {
            out.push('g');
        }
        match self.state.mode {
            Mode::SetRegister => out.push('"'),
            Mode::ReplaceChar => out.push('r'),
            Mode::FindChar => out.push(match (self.state.pending_find.forward, self.state.pending_find.before) {
                (true, false) => 'f',
                (false, false) => 'F',
                (true, true) => 't',
                (false, true) => 'T',
            }),
            _ => {}
        }
        out
    }

    /// Brings the mode back in line with a selection changed outside the engine.
    pub fn sync_selection(&mut self, buffer: &mut dyn Buffer) {
        let collapsed = buffer.anchor() == buffer.current_pos();
        match self.state.mode {
            Mode::Visual if collapsed => self.set_mode(buffer, Mode::Normal),
            Mode::Normal if !collapsed => {
                self.state.visual_mode = VisualMode::Char;
                self.set_mode(buffer, Mode::Visual);
            }
            _ => {}
        }
    }

    /// Every mode change goes through here.
    pub(crate) fn set_mode(&mut self, buffer: &mut dyn Buffer, mode: Mode) {
        let old = self.state.mode;
        if old == mode {
            return;
        }
        debug!("mode {:?} -> {:?}", old, mode);

        if !old.keeps_count() {
            self.state.repeat_count = 0;
        }
        if !(old.is_overlay() || mode.is_overlay()) {
            self.state.operator = None;
        }
        if matches!(
            mode,
            Mode::Search | Mode::FindChar | Mode::SetRegister | Mode::ReplaceChar | Mode::Command
        ) {
            self.state.last_mode = old;
        }

        if matches!(old, Mode::Visual | Mode::Select)
            && matches!(mode, Mode::Normal | Mode::Insert | Mode::Overtype)
        {
            let caret = buffer.current_pos();
            buffer.set_anchor(caret);
            buffer.set_selection_mode(SelectionMode::Stream);
        }
        if mode == Mode::Visual {
            buffer.set_selection_mode(self.state.visual_mode.selection_mode());
        }

        if old.is_text_entry() && !mode.is_text_entry() {
            buffer.end_undo();
        }
        if mode.is_text_entry() && !old.is_text_entry() {
            buffer.begin_undo();
            if self.state.insert.is_none() {
                self.state.insert = Some(InsertSession::new(1, false));
            }
        }
        buffer.set_overtype(mode == Mode::Overtype);
        buffer.set_caret_style(match mode {
            Mode::Insert | Mode::Select => CaretStyle::Line,
            _ => CaretStyle::Block,
        });

        self.state.mode = mode;
    }

    /// Leaves a single-key or input overlay, keeping the count and operator it interrupted.
    pub(crate) fn return_from_overlay(&mut self, buffer: &mut dyn Buffer) {
        let count = self.state.repeat_count;
        let operator = self.state.operator;
        let back = self.state.last_mode;
        self.set_mode(buffer, back);
        self.state.repeat_count = count;
        self.state.operator = operator;
    }

    pub(crate) fn report(&mut self, err: &EngineError) {
        match err.kind() {
            ErrorKind::HostFailure => error!("{}", err),
            ErrorKind::NotImplemented => info!("{}", err),
            ErrorKind::UserInput | ErrorKind::Parse => warn!("{}", err),
        }
        self.status.show(&err.to_string(), STATUS_TIMEOUT_MS, err.is_warning());
    }

    pub(crate) fn show_message(&mut self, message: &str) {
        self.status.show(message, STATUS_TIMEOUT_MS, false);
    }
}

impl CommandHandler for Session {
    fn handle_keypress(&mut self, buffer: &mut dyn Buffer, key: KeyEvent) -> bool {
        self.handle_key_event(buffer, key)
    }

    fn execute(&mut self, buffer: &mut dyn Buffer, command: CommandId) -> bool {
        match self.dispatch(buffer, command) {
            Ok(()) => true,
            Err(e) => {
                self.report(&e);
                self.state.clear_pending();
                false
            }
        }
    }

    fn execute_named(&mut self, buffer: &mut dyn Buffer, name: &str) -> bool {
        match name.parse::<CommandId>() {
            Ok(id) => self.execute(buffer, id),
            Err(e) => {
                self.report(&e);
                self.state.clear_pending();
                false
            }
        }
    }

    fn run_ex_command(&mut self, buffer: &mut dyn Buffer, line: &str) {
        if let Err(e) = self.run_ex(buffer, line) {
            self.report(&e);
            self.state.clear_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::TextBuffer;
    use crate::keys::parse_keys;

    fn feed(session: &mut Session, buffer: &mut TextBuffer, keys: &str) {
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(buffer, key);
        }
    }

    #[test]
    fn test_mode_labels() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc\ndef");
        assert_eq!(session.mode_label(), "");
        feed(&mut session, &mut buffer, "V");
        assert_eq!(session.mode_label(), "-- VISUAL LINE --");
        feed(&mut session, &mut buffer, "<Esc>i");
        assert_eq!(session.mode_label(), "-- INSERT --");
        feed(&mut session, &mut buffer, "<Esc>:se");
        assert_eq!(session.mode_label(), ":se");
    }

    #[test]
    fn test_pending_keys() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc");
        feed(&mut session, &mut buffer, "\"a3d");
        assert_eq!(session.pending_keys(), "\"a3d");
        feed(&mut session, &mut buffer, "<Esc>");
        assert_eq!(session.pending_keys(), "");
    }

    #[test]
    fn test_caret_style_follows_mode() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc");
        feed(&mut session, &mut buffer, "i");
        assert_eq!(buffer.caret_style(), CaretStyle::Line);
        feed(&mut session, &mut buffer, "<Esc>");
        assert_eq!(buffer.caret_style(), CaretStyle::Block);
        feed(&mut session, &mut buffer, "R");
        assert!(buffer.is_overtype());
        feed(&mut session, &mut buffer, "<Esc>");
        assert!(!buffer.is_overtype());
    }

    #[test]
    fn test_sync_selection() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abcdef");
        buffer.set_selection(0, 3);
        session.sync_selection(&mut buffer);
        assert_eq!(session.mode(), Mode::Visual);
        buffer.goto_pos(2);
        session.sync_selection(&mut buffer);
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_unknown_command_name() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("abc");
        assert!(!session.execute_named(&mut buffer, "frobnicate"));
        assert_eq!(log.warnings(), vec!["Unknown command: frobnicate".to_string()]);
        assert!(session.execute_named(&mut buffer, "right"));
        assert_eq!(buffer.current_pos(), 1);
    }

    #[test]
    fn test_apply_settings() {
        let mut settings = Settings::default();
        settings.set_option("ff=dos").unwrap();
        let session = Session::builder().settings(settings).build();
        let mut buffer = TextBuffer::from_text("a");
        session.apply_settings(&mut buffer);
        assert_eq!(buffer.eol(), "\r\n");
    }
}

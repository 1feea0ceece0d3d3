use super::command_table::CommandId;
use super::mode::{CopyMode, Mode, Operator, VisualMode};

/// Parameters of the last `f`/`F`/`t`/`T`, replayed by `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindState {
    pub ch: Option<char>,
    pub forward: bool,
    /// `t`/`T`: stop one short of the character.
    pub before: bool,
}

/// Bookkeeping for one stay in Insert or Overtype mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertSession {
    /// How many times the typed text lands in total.
    pub repeat: usize,
    /// Each extra repetition starts a new line (`o`/`O`).
    pub open_line: bool,
    pub typed: String,
}

impl InsertSession {
    pub fn new(repeat: usize, open_line: bool) -> Self {
        Self {
            repeat: repeat.max(1),
            open_line,
            typed: String::new(),
        }
    }
}

/// The most recent modifying command, as replayed by `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChange {
    pub command: CommandId,
    pub count: usize,
    pub operator: Option<Operator>,
    pub inserted: String,
    pub find: FindState,
    pub replace_char: Option<char>,
}

/// Per-session controller state.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub mode: Mode,
    pub last_mode: Mode,
    pub operator: Option<Operator>,
    pub visual_mode: VisualMode,
    pub repeat_count: usize,
    pub register: Option<char>,

    pub last_change: Option<LastChange>,
    pub replaying: bool,

    pub find: FindState,
    /// Direction chosen by `f`/`F`/`t`/`T` while waiting for the character.
    pub pending_find: FindState,
    pub replace_char: Option<char>,

    pub copy_mode: CopyMode,
    pub internal_buffer: String,

    pub insert: Option<InsertSession>,
    pub preferred_col: Option<usize>,
    pub search_backward: bool,
    pub pending_g: bool,
    /// First and last line of the most recent visual selection (`'<` and `'>`).
    pub last_visual: Option<(usize, usize)>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything a half-typed command left behind.
    pub fn clear_pending(&mut self) {
        self.operator = None;
        self.repeat_count = 0;
        self.register = None;
        self.pending_g = false;
    }

    pub fn push_count_digit(&mut self, digit: u32) {
        self.repeat_count = self
            .repeat_count
            .saturating_mul(10)
            .saturating_add(digit as usize)
            .min(999_999);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_digits_concatenate() {
        let mut state = ControllerState::new();
        state.push_count_digit(2);
        state.push_count_digit(3);
        assert_eq!(state.repeat_count, 23);
    }

    #[test]
    fn test_clear_pending() {
        let mut state = ControllerState::new();
        state.operator = Some(Operator::Delete);
        state.repeat_count = 4;
        state.register = Some('a');
        state.clear_pending();
        assert_eq!(state.operator, None);
        assert_eq!(state.repeat_count, 0);
        assert_eq!(state.register, None);
    }
}

use super::command_table::{CommandFlags, CommandId, Target};
use super::mode::{CopyMode, Mode, Operator, VisualMode};
use super::session::Session;
use super::state::LastChange;
use crate::document_model::movement;
use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, BufferOp, UndoGroup};
use tracing::{debug, trace};

impl Session {
    /// Resolves and runs one command: operator composition, counts, undo grouping,
    /// repeat bookkeeping and the resulting mode and caret.
    pub(crate) fn dispatch(&mut self, buffer: &mut dyn Buffer, command: CommandId) -> EngineResult<()> {
        let mut id = command;
        let mut flags = id.flags();
        let in_visual = matches!(self.state.mode, Mode::Visual | Mode::Select);
        debug!(
            "dispatch {} mode={:?} count={} operator={:?}",
            id, self.state.mode, self.state.repeat_count, self.state.operator
        );

        if in_visual {
            if !flags.intersects(CommandFlags::MOTION | CommandFlags::VISUAL_OK) {
                self.state.repeat_count = 0;
                return Err(EngineError::user(format!("{} is not available in visual mode", id)));
            }
            if let Some(mapped) = id.visual_substitute() {
                id = mapped;
                flags = id.flags();
            }
            let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
            self.state.last_visual = Some((
                buffer.line_from_position(anchor.min(caret)),
                buffer.line_from_position(anchor.max(caret)),
            ));
        }

        let mut composing = None;
        if let Some(op) = self.state.operator
            && !in_visual
            && id != CommandId::Cancel
        {
            if id == op.trigger() {
                id = op.line_command();
                flags = id.flags();
            } else {
                if op == Operator::Change
                    && let Some(mapped) = id.change_substitute()
                {
                    id = mapped;
                    flags = id.flags();
                }
                if !flags.contains(CommandFlags::MOTION) {
                    return Err(EngineError::user("operator must occur with a motion"));
                }
                if !flags.contains(CommandFlags::NO_OP_FLAG_RESET) {
                    composing = Some(op);
                }
            }
        }

        let raw_count = self.state.repeat_count;
        if !flags.contains(CommandFlags::KEEP_COUNT) {
            self.state.repeat_count = 0;
        }
        let times = if flags.contains(CommandFlags::REPEATABLE) {
            raw_count.max(1)
        } else {
            1
        };

        if flags.intersects(CommandFlags::COPY_CHARS | CommandFlags::COPY_LINES) {
            self.state.internal_buffer.clear();
            self.state.copy_mode = if flags.contains(CommandFlags::COPY_LINES) {
                CopyMode::Lines
            } else {
                CopyMode::Chars
            };
        }
        if !self.state.mode.is_text_entry() {
            self.state.insert = None;
        }

        let visual_op = if in_visual { Operator::from_trigger(id) } else { None };
        let records_change =
            flags.contains(CommandFlags::MODIFIES) || composing.is_some_and(|op| op != Operator::Yank);
        let modifies = records_change || visual_op.is_some_and(|op| op != Operator::Yank);
        if records_change && visual_op.is_none() && !self.state.replaying {
            self.state.last_change = Some(LastChange {
                command: id,
                count: raw_count,
                operator: composing,
                inserted: String::new(),
                find: self.state.find,
                replace_char: self.state.replace_char,
            });
        }

        let before = buffer.current_pos();
        let mut scope = UndoGroup::begin(buffer, modifies);
        let buffer: &mut dyn Buffer = &mut *scope;

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.suspend();
        }
        let result = self.run_target(buffer, id, flags, raw_count, times);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.resume();
        }
        result?;

        if let Some(op) = composing {
            self.commit_motion(buffer, op, id, flags, before)?;
        }
        if let Some(op) = visual_op {
            self.commit_visual(buffer, op)?;
        }

        if !flags.contains(CommandFlags::NO_OP_FLAG_RESET) || visual_op.is_some() {
            self.state.operator = None;
            self.state.register = None;
        }

        if matches!(self.state.mode, Mode::Visual | Mode::Select)
            && flags.contains(CommandFlags::CANCELS_VISUAL)
        {
            self.set_mode(buffer, Mode::Normal);
        }

        let enters_insert = (flags.contains(CommandFlags::ENTERS_INSERT)
            && !flags.contains(CommandFlags::DELAY_INSERT))
            || composing == Some(Operator::Change)
            || visual_op == Some(Operator::Change);
        if enters_insert && !self.state.mode.is_text_entry() {
            self.set_mode(buffer, Mode::Insert);
        }

        let caret = buffer.current_pos();
        if !self.is_selecting() {
            buffer.set_anchor(caret);
        }
        if modifies || flags.contains(CommandFlags::CHOOSE_CARET_X) {
            self.state.preferred_col = None;
        }
        if self.state.mode == Mode::Normal {
            self.clamp_caret(buffer);
        }
        buffer.scroll_to_caret();
        Ok(())
    }

    fn run_target(
        &mut self,
        buffer: &mut dyn Buffer,
        id: CommandId,
        flags: CommandFlags,
        raw_count: usize,
        times: usize,
    ) -> EngineResult<()> {
        match id.entry().target {
            Target::Special(handler) => {
                if flags.contains(CommandFlags::SPECIAL_REPEAT) {
                    handler(self, buffer, raw_count)
                } else {
                    for _ in 0..times {
                        handler(self, buffer, 1)?;
                    }
                    Ok(())
                }
            }
            Target::Delegate(op) => {
                for _ in 0..times {
                    self.run_buffer_op(buffer, op)?;
                }
                Ok(())
            }
        }
    }

    /// Runs `op` natively when the buffer offers it, else with the built-in fallback.
    pub(crate) fn run_buffer_op(&mut self, buffer: &mut dyn Buffer, op: BufferOp) -> EngineResult<()> {
        let native = buffer
            .execute_native(op)
            .map_err(|e| EngineError::host(op.name(), e))?;
        if !native {
            trace!("fallback for {}", op.name());
            movement::run_fallback(buffer, op)?;
        }
        Ok(())
    }

    /// Applies a pending operator to the span the motion just covered.
    fn commit_motion(
        &mut self,
        buffer: &mut dyn Buffer,
        op: Operator,
        id: CommandId,
        flags: CommandFlags,
        before: usize,
    ) -> EngineResult<()> {
        let after = buffer.current_pos();
        let start = before.min(after);
        self.state.internal_buffer.clear();

        if flags.contains(CommandFlags::LINEWISE) {
            self.state.copy_mode = CopyMode::Lines;
            let first = buffer.line_from_position(start);
            let last = buffer.line_from_position(before.max(after));
            buffer.set_current_pos(start);
            return self.apply_line_operator(buffer, op, first, last - first + 1);
        }
        self.state.copy_mode = CopyMode::Chars;

        let mut end = before.max(after);
        if flags.contains(CommandFlags::INCLUSIVE) {
            end = inclusive_end(buffer, end);
        }
        // A word motion that ran onto the next line stops at the end of the last word.
        if matches!(id, CommandId::WordRight | CommandId::BigWordRight) && after > before {
            let target_line = buffer.line_from_position(after);
            if target_line > buffer.line_from_position(before)
                && after <= movement::first_non_blank(buffer, target_line)
            {
                let prev_end = buffer.line_end_position(target_line - 1);
                if prev_end > start {
                    end = prev_end;
                }
            }
        }
        debug!("operator {:?} over {}..{}", op, start, end);

        match op {
            Operator::Yank => {
                self.copy_internal(buffer, start, end, false, false)?;
                buffer.set_current_pos(start);
            }
            Operator::Delete | Operator::Change => {
                if start < end {
                    self.copy_internal(buffer, start, end, true, false)?;
                }
                buffer.set_current_pos(start);
            }
            Operator::Indent | Operator::Dedent => {
                let first = buffer.line_from_position(start);
                let last = buffer.line_from_position(end);
                self.shift_lines(buffer, first, last, op == Operator::Indent)?;
            }
        }
        Ok(())
    }

    /// Applies an operator key pressed on a visual selection.
    fn commit_visual(&mut self, buffer: &mut dyn Buffer, op: Operator) -> EngineResult<()> {
        self.state.internal_buffer.clear();
        let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
        let start = anchor.min(caret);
        let end = anchor.max(caret);

        let (command, count) = match self.state.visual_mode {
            VisualMode::Line => {
                self.state.copy_mode = CopyMode::Lines;
                let first = buffer.line_from_position(start);
                let count = buffer.line_from_position(end) - first + 1;
                buffer.set_current_pos(buffer.position_from_line(first));
                self.apply_line_operator(buffer, op, first, count)?;
                (op.line_command(), count)
            }
            VisualMode::Char | VisualMode::Block => {
                self.state.copy_mode = CopyMode::Chars;
                let end = buffer.position_after(end);
                let mut chars = 0;
                let mut p = start;
                while p < end {
                    p = buffer.position_after(p);
                    chars += 1;
                }
                match op {
                    Operator::Yank => {
                        self.copy_internal(buffer, start, end, false, false)?;
                        buffer.set_current_pos(start);
                        (CommandId::LineCopy, chars)
                    }
                    Operator::Delete => {
                        self.copy_internal(buffer, start, end, true, false)?;
                        buffer.set_current_pos(start);
                        (CommandId::DeleteChar, chars)
                    }
                    Operator::Change => {
                        self.copy_internal(buffer, start, end, true, false)?;
                        buffer.set_current_pos(start);
                        (CommandId::Substitute, chars)
                    }
                    Operator::Indent | Operator::Dedent => {
                        let first = buffer.line_from_position(start);
                        let last = buffer.line_from_position(end.max(start + 1) - 1);
                        self.shift_lines(buffer, first, last, op == Operator::Indent)?;
                        (op.line_command(), last - first + 1)
                    }
                }
            }
        };

        if op != Operator::Yank && !self.state.replaying {
            self.state.last_change = Some(LastChange {
                command,
                count,
                operator: None,
                inserted: String::new(),
                find: self.state.find,
                replace_char: self.state.replace_char,
            });
        }
        Ok(())
    }

    /// Whether the anchor belongs to a live selection rather than trailing the caret.
    pub(crate) fn is_selecting(&self) -> bool {
        match self.state.mode {
            Mode::Visual | Mode::Select => true,
            Mode::Search | Mode::Command | Mode::FindChar | Mode::SetRegister | Mode::ReplaceChar => {
                matches!(self.state.last_mode, Mode::Visual | Mode::Select)
            }
            _ => false,
        }
    }

    /// Keeps the Normal-mode caret on a character rather than on a line terminator.
    pub(crate) fn clamp_caret(&self, buffer: &mut dyn Buffer) {
        let pos = buffer.current_pos();
        let line = buffer.line_from_position(pos);
        let start = buffer.position_from_line(line);
        let end = buffer.line_end_position(line);
        if pos >= end && end > start {
            buffer.goto_pos(buffer.position_before(end));
        }
    }
}

/// End of an inclusive span whose last character sits at `pos`, kept within its line.
pub(crate) fn inclusive_end(buffer: &dyn Buffer, pos: usize) -> usize {
    let line_end = buffer.line_end_position(buffer.line_from_position(pos));
    buffer.position_after(pos).min(line_end).max(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CommandHandler;
    use crate::document_model::TextBuffer;
    use crate::host::{MacroRecorder, MessageLog};
    use crate::keys::parse_keys;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(text: &str, keys: &str) -> (Session, TextBuffer) {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text(text);
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        (session, buffer)
    }

    #[test]
    fn test_delete_word() {
        let (_, buffer) = run("one two three", "dw");
        assert_eq!(buffer.text(), "two three");
    }

    #[test]
    fn test_count_before_and_inside_operator() {
        let (_, buffer) = run("a b c d e", "2dw");
        assert_eq!(buffer.text(), "c d e");
        let (_, buffer) = run("a b c d e", "d3w");
        assert_eq!(buffer.text(), "d e");
    }

    #[test]
    fn test_split_counts_concatenate() {
        let text = (1..=30).map(|i| format!("l{}", i)).collect::<Vec<_>>().join("\n");
        let (_, buffer) = run(&text, "2d3d");
        assert_eq!(buffer.line_count(), 7);
        assert_eq!(buffer.line_text(0), "l24");
    }

    #[test]
    fn test_dd_is_line_cut() {
        let (session, buffer) = run("first\nsecond\nthird", "dd");
        assert_eq!(buffer.text(), "second\nthird");
        assert_eq!(session.operator(), None);
    }

    #[test]
    fn test_operator_needs_motion() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("keep me");
        for key in parse_keys("dp").unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        assert_eq!(buffer.text(), "keep me");
        assert_eq!(log.warnings(), vec!["operator must occur with a motion".to_string()]);
        assert_eq!(session.operator(), None);
        assert_eq!(session.repeat_count(), 0);
    }

    #[test]
    fn test_word_delete_stops_at_line_end() {
        let (_, buffer) = run("foo bar\nbaz", "wdw");
        assert_eq!(buffer.text(), "foo \nbaz");
    }

    #[test]
    fn test_inclusive_and_linewise_motions() {
        let (_, buffer) = run("hello world", "de");
        assert_eq!(buffer.text(), " world");
        let (_, buffer) = run("hello world", "wd$");
        assert_eq!(buffer.text(), "hello ");
        let (_, buffer) = run("a\nb\nc\nd", "jdj");
        assert_eq!(buffer.text(), "a\nd");
        let (_, buffer) = run("a\nb\nc", "jdG");
        assert_eq!(buffer.text(), "a");
    }

    #[test]
    fn test_yank_motion_keeps_text_and_moves_to_start() {
        let (session, buffer) = run("alpha beta", "wyb");
        assert_eq!(buffer.text(), "alpha beta");
        assert_eq!(buffer.current_pos(), 0);
        assert_eq!(session.registers().unnamed_target(), '0');
    }

    #[test]
    fn test_change_word_enters_insert() {
        let (session, buffer) = run("foo bar", "cwxy<Esc>");
        assert_eq!(buffer.text(), "xy bar");
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(buffer.current_pos(), 1);
    }

    #[test]
    fn test_visual_rejects_non_visual_commands() {
        let (session, buffer) = run("abc", "vp");
        assert_eq!(buffer.text(), "abc");
        assert_eq!(session.mode(), Mode::Visual);
    }

    #[test]
    fn test_visual_x_deletes_selection() {
        let (session, buffer) = run("abcdef", "lvlx");
        assert_eq!(buffer.text(), "adef");
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_visual_change() {
        let (session, buffer) = run("abcdef", "vlcX<Esc>");
        assert_eq!(buffer.text(), "Xcdef");
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_normal_caret_stays_off_terminator() {
        let (_, buffer) = run("abc\ndef", "$");
        assert_eq!(buffer.current_pos(), 2);
    }

    #[test]
    fn test_repeat_count_motion() {
        let (_, buffer) = run("a b c d", "3w");
        assert_eq!(buffer.current_pos(), 6);
    }

    #[test]
    fn test_multi_repeat_is_one_undo_step() {
        let (_, buffer) = run("abcdef", "3xu");
        assert_eq!(buffer.text(), "abcdef");
    }

    #[derive(Clone, Default)]
    struct CountingRecorder(Rc<RefCell<(usize, usize)>>);

    impl MacroRecorder for CountingRecorder {
        fn suspend(&mut self) {
            self.0.borrow_mut().0 += 1;
        }
        fn resume(&mut self) {
            self.0.borrow_mut().1 += 1;
        }
    }

    #[test]
    fn test_recorder_suspended_around_execution() {
        let recorder = CountingRecorder::default();
        let mut session = Session::builder().recorder(Box::new(recorder.clone())).build();
        let mut buffer = TextBuffer::from_text("a b c");
        session.execute(&mut buffer, CommandId::WordRight);
        assert_eq!(*recorder.0.borrow(), (1, 1));
    }
}

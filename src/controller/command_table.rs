use super::operations::{
    edits, find_char, insert, lines, modes, motions, operators, paste, repeat, search,
};
use super::session::Session;
use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, BufferOp};
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Behaviour the dispatcher applies around a command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u32 {
        /// Honour a repeat count.
        const REPEATABLE      = 1 << 0;
        /// Changes the buffer: snapshot for `.` and run inside one undo group.
        const MODIFIES        = 1 << 1;
        const ENTERS_INSERT   = 1 << 2;
        const VISUAL_OK       = 1 << 3;
        const CANCELS_VISUAL  = 1 << 4;
        /// The handler receives the count itself instead of being looped.
        const SPECIAL_REPEAT  = 1 << 5;
        const DELAY_INSERT    = 1 << 6;
        /// Forget the remembered column for vertical motions.
        const CHOOSE_CARET_X  = 1 << 7;
        /// Keep operator and register pending after the command.
        const NO_OP_FLAG_RESET = 1 << 8;
        const MOTION          = 1 << 9;
        const COPY_CHARS      = 1 << 10;
        const COPY_LINES      = 1 << 11;
        /// Leave the typed count for the command that follows.
        const KEEP_COUNT      = 1 << 12;
        /// As a motion, makes an operator act on whole lines.
        const LINEWISE        = 1 << 13;
        /// As a motion, the destination character is part of the operated span.
        const INCLUSIVE       = 1 << 14;
    }
}

/// Signature shared by every "special" command.
pub type Handler = fn(&mut Session, &mut dyn Buffer, usize) -> EngineResult<()>;

#[derive(Clone, Copy)]
pub enum Target {
    Special(Handler),
    Delegate(BufferOp),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Special(_) => write!(f, "Special"),
            Target::Delegate(op) => write!(f, "Delegate({})", op.name()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    pub target: Target,
    pub flags: CommandFlags,
}

macro_rules! commands {
    ($($id:ident => $name:literal,)*) => {
        /// Every logical command the engine knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CommandId {
            $($id,)*
        }

        impl CommandId {
            pub const ALL: &'static [CommandId] = &[$(CommandId::$id,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(CommandId::$id => $name,)*
                }
            }
        }

        impl FromStr for CommandId {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(CommandId::$id),)*
                    _ => Err(EngineError::UnknownCommand(s.to_string())),
                }
            }
        }
    };
}

commands! {
    MoveLeft => "left",
    MoveRight => "right",
    BackspaceLeft => "backspace",
    SpaceRight => "space",
    LineDown => "line_down",
    LineUp => "line_up",
    WordRight => "word_right",
    WordLeft => "word_left",
    WordEnd => "word_end",
    BigWordRight => "big_word_right",
    BigWordLeft => "big_word_left",
    BigWordEnd => "big_word_end",
    LineStart => "line_start",
    FirstNonBlank => "first_non_blank",
    LineEnd => "line_end",
    NextLineStart => "next_line_start",
    PrevLineStart => "prev_line_start",
    DocumentStart => "document_start",
    DocumentEnd => "document_end",
    ParaUp => "para_up",
    ParaDown => "para_down",
    MatchBrace => "match_brace",
    PageDown => "page_down",
    PageUp => "page_up",
    HalfPageDown => "half_page_down",
    HalfPageUp => "half_page_up",
    FindCharForward => "find_char_forward",
    FindCharBackward => "find_char_backward",
    TillCharForward => "till_char_forward",
    TillCharBackward => "till_char_backward",
    RepeatFind => "repeat_find",
    RepeatFindReverse => "repeat_find_reverse",
    SearchForward => "search_forward",
    SearchBackward => "search_backward",
    SearchNext => "search_next",
    SearchPrev => "search_prev",
    SearchWordForward => "search_word_forward",
    SearchWordBackward => "search_word_backward",
    ChangeWord => "change_word",
    ChangeBigWord => "change_big_word",
    YankOperation => "yank_operation",
    DeleteOperation => "delete_operation",
    ChangeOperation => "change_operation",
    IndentOperation => "indent_operation",
    DedentOperation => "dedent_operation",
    LineCut => "line_cut",
    LineCopy => "line_copy",
    ChangeLine => "change_line",
    IndentLines => "indent_lines",
    DedentLines => "dedent_lines",
    JoinLines => "join_lines",
    DeleteChar => "delete_char",
    DeleteCharBefore => "delete_char_before",
    Substitute => "substitute",
    SubstituteLine => "substitute_line",
    DeleteToEnd => "delete_to_end",
    ChangeToEnd => "change_to_end",
    ToggleCase => "toggle_case",
    ReplaceChar => "replace_char",
    ReplaceWithChar => "replace_with_char",
    PasteAfter => "paste_after",
    PasteBefore => "paste_before",
    Undo => "undo",
    Redo => "redo",
    RepeatLast => "repeat_last",
    Insert => "insert",
    Append => "append",
    AppendEnd => "append_end",
    InsertLineStart => "insert_line_start",
    OpenBelow => "open_below",
    OpenAbove => "open_above",
    Overtype => "overtype",
    Cancel => "cancel",
    ToggleVisual => "visual",
    ToggleVisualLine => "visual_line",
    ToggleVisualBlock => "visual_block",
    VisualSwapEnds => "visual_swap_ends",
    SelectMode => "select",
    SetRegister => "set_register",
    CommandLine => "command_line",
}

impl CommandId {
    pub fn entry(self) -> CommandEntry {
        use CommandFlags as F;
        use CommandId::*;
        use Target::{Delegate, Special};

        let motion = F::MOTION | F::REPEATABLE | F::CHOOSE_CARET_X;
        let operator = F::KEEP_COUNT | F::NO_OP_FLAG_RESET | F::VISUAL_OK | F::CANCELS_VISUAL;
        let line_edit = F::MODIFIES | F::REPEATABLE | F::SPECIAL_REPEAT;
        let overlay = F::KEEP_COUNT | F::NO_OP_FLAG_RESET | F::VISUAL_OK;
        let enter_insert = F::MODIFIES | F::REPEATABLE | F::SPECIAL_REPEAT | F::ENTERS_INSERT;

        let (target, flags): (Target, CommandFlags) = match self {
            MoveLeft => (Special(motions::left), motion),
            MoveRight => (Special(motions::right), motion),
            BackspaceLeft => (Special(motions::backspace_left), motion),
            SpaceRight => (Special(motions::space_right), motion),
            LineDown => (Special(motions::line_down), F::MOTION | F::REPEATABLE | F::LINEWISE),
            LineUp => (Special(motions::line_up), F::MOTION | F::REPEATABLE | F::LINEWISE),
            WordRight => (Delegate(BufferOp::WordRight), motion),
            WordLeft => (Delegate(BufferOp::WordLeft), motion),
            WordEnd => (Delegate(BufferOp::WordEnd), motion | F::INCLUSIVE),
            BigWordRight => (Delegate(BufferOp::BigWordRight), motion),
            BigWordLeft => (Delegate(BufferOp::BigWordLeft), motion),
            BigWordEnd => (Delegate(BufferOp::BigWordEnd), motion | F::INCLUSIVE),
            LineStart => (Delegate(BufferOp::Home), F::MOTION | F::CHOOSE_CARET_X),
            FirstNonBlank => (Delegate(BufferOp::VcHome), F::MOTION | F::CHOOSE_CARET_X),
            LineEnd => (
                Special(motions::line_end),
                F::MOTION | F::REPEATABLE | F::SPECIAL_REPEAT | F::INCLUSIVE,
            ),
            NextLineStart => (Special(motions::next_line_start), motion | F::LINEWISE),
            PrevLineStart => (Special(motions::prev_line_start), motion | F::LINEWISE),
            DocumentStart => (
                Special(motions::document_start),
                motion | F::SPECIAL_REPEAT | F::LINEWISE,
            ),
            DocumentEnd => (
                Special(motions::document_end),
                motion | F::SPECIAL_REPEAT | F::LINEWISE,
            ),
            ParaUp => (Delegate(BufferOp::ParaUp), motion),
            ParaDown => (Delegate(BufferOp::ParaDown), motion),
            MatchBrace => (
                Delegate(BufferOp::MatchBrace),
                F::MOTION | F::CHOOSE_CARET_X | F::INCLUSIVE,
            ),
            PageDown => (Delegate(BufferOp::PageDown), F::MOTION | F::REPEATABLE),
            PageUp => (Delegate(BufferOp::PageUp), F::MOTION | F::REPEATABLE),
            HalfPageDown => (Delegate(BufferOp::HalfPageDown), F::MOTION | F::REPEATABLE),
            HalfPageUp => (Delegate(BufferOp::HalfPageUp), F::MOTION | F::REPEATABLE),
            FindCharForward => (Special(find_char::find_char_forward), overlay | F::MOTION),
            FindCharBackward => (Special(find_char::find_char_backward), overlay | F::MOTION),
            TillCharForward => (Special(find_char::till_char_forward), overlay | F::MOTION),
            TillCharBackward => (Special(find_char::till_char_backward), overlay | F::MOTION),
            RepeatFind => (Special(find_char::repeat_find), motion | F::SPECIAL_REPEAT),
            RepeatFindReverse => (
                Special(find_char::repeat_find_reverse),
                motion | F::SPECIAL_REPEAT,
            ),
            SearchForward => (Special(search::search_forward), overlay | F::MOTION),
            SearchBackward => (Special(search::search_backward), overlay | F::MOTION),
            SearchNext => (Special(search::search_next), motion | F::SPECIAL_REPEAT),
            SearchPrev => (Special(search::search_prev), motion | F::SPECIAL_REPEAT),
            SearchWordForward => (
                Special(search::search_word_forward),
                motion | F::SPECIAL_REPEAT,
            ),
            SearchWordBackward => (
                Special(search::search_word_backward),
                motion | F::SPECIAL_REPEAT,
            ),
            ChangeWord => (
                Special(motions::change_word),
                F::MOTION | F::REPEATABLE | F::SPECIAL_REPEAT,
            ),
            ChangeBigWord => (
                Special(motions::change_big_word),
                F::MOTION | F::REPEATABLE | F::SPECIAL_REPEAT,
            ),
            YankOperation => (Special(operators::yank_operation), operator),
            DeleteOperation => (Special(operators::delete_operation), operator),
            ChangeOperation => (
                Special(operators::change_operation),
                operator | F::ENTERS_INSERT | F::DELAY_INSERT,
            ),
            IndentOperation => (Special(operators::indent_operation), operator),
            DedentOperation => (Special(operators::dedent_operation), operator),
            LineCut => (Special(lines::line_cut), line_edit | F::COPY_LINES),
            LineCopy => (
                Special(lines::line_copy),
                F::REPEATABLE | F::SPECIAL_REPEAT | F::COPY_LINES,
            ),
            ChangeLine => (
                Special(lines::change_line),
                line_edit | F::COPY_LINES | F::ENTERS_INSERT,
            ),
            IndentLines => (Special(lines::indent_lines), line_edit),
            DedentLines => (Special(lines::dedent_lines), line_edit),
            JoinLines => (
                Special(lines::join_lines),
                line_edit | F::VISUAL_OK | F::CANCELS_VISUAL,
            ),
            DeleteChar => (
                Special(edits::delete_char),
                line_edit | F::COPY_CHARS | F::VISUAL_OK,
            ),
            DeleteCharBefore => (
                Special(edits::delete_char_before),
                line_edit | F::COPY_CHARS | F::VISUAL_OK,
            ),
            Substitute => (
                Special(edits::substitute),
                line_edit | F::COPY_CHARS | F::ENTERS_INSERT | F::VISUAL_OK,
            ),
            SubstituteLine => (
                Special(lines::change_line),
                line_edit | F::COPY_LINES | F::ENTERS_INSERT,
            ),
            DeleteToEnd => (Special(edits::delete_to_end), line_edit | F::COPY_CHARS),
            ChangeToEnd => (
                Special(edits::delete_to_end),
                line_edit | F::COPY_CHARS | F::ENTERS_INSERT,
            ),
            ToggleCase => (
                Special(edits::toggle_case),
                line_edit | F::VISUAL_OK | F::CANCELS_VISUAL,
            ),
            ReplaceChar => (Special(edits::replace_char), overlay),
            ReplaceWithChar => (
                Special(edits::replace_with_char),
                line_edit | F::VISUAL_OK | F::CANCELS_VISUAL,
            ),
            PasteAfter => (Special(paste::paste_after), line_edit),
            PasteBefore => (Special(paste::paste_before), line_edit),
            Undo => (Delegate(BufferOp::Undo), F::REPEATABLE | F::CHOOSE_CARET_X),
            Redo => (Delegate(BufferOp::Redo), F::REPEATABLE | F::CHOOSE_CARET_X),
            RepeatLast => (
                Special(repeat::repeat_last),
                F::REPEATABLE | F::SPECIAL_REPEAT | F::CHOOSE_CARET_X,
            ),
            Insert => (Special(insert::insert), enter_insert),
            Append => (Special(insert::append), enter_insert),
            AppendEnd => (Special(insert::append_end), enter_insert),
            InsertLineStart => (Special(insert::insert_line_start), enter_insert),
            OpenBelow => (Special(insert::open_below), enter_insert),
            OpenAbove => (Special(insert::open_above), enter_insert),
            Overtype => (
                Special(insert::overtype),
                F::MODIFIES | F::REPEATABLE | F::SPECIAL_REPEAT,
            ),
            Cancel => (Special(insert::cancel), F::VISUAL_OK | F::CANCELS_VISUAL),
            ToggleVisual => (Special(modes::toggle_visual), F::VISUAL_OK),
            ToggleVisualLine => (Special(modes::toggle_visual_line), F::VISUAL_OK),
            ToggleVisualBlock => (Special(modes::toggle_visual_block), F::VISUAL_OK),
            VisualSwapEnds => (Special(modes::visual_swap_ends), F::VISUAL_OK),
            SelectMode => (Special(modes::select_mode), F::empty()),
            SetRegister => (Special(modes::set_register), overlay),
            CommandLine => (Special(modes::command_line), F::VISUAL_OK),
        };
        CommandEntry { target, flags }
    }

    pub fn flags(self) -> CommandFlags {
        self.entry().flags
    }

    /// Normal-mode commands that mean something else on a visual selection.
    pub fn visual_substitute(self) -> Option<CommandId> {
        match self {
            CommandId::DeleteChar | CommandId::DeleteCharBefore => Some(CommandId::DeleteOperation),
            CommandId::Substitute => Some(CommandId::ChangeOperation),
            _ => None,
        }
    }

    /// `cw` changes to the end of the word rather than to the start of the next one.
    pub fn change_substitute(self) -> Option<CommandId> {
        match self {
            CommandId::WordRight => Some(CommandId::ChangeWord),
            CommandId::BigWordRight => Some(CommandId::ChangeBigWord),
            _ => None,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for &id in CommandId::ALL {
            assert_eq!(id.name().parse::<CommandId>().unwrap(), id);
        }
        assert!(matches!(
            "no_such_command".parse::<CommandId>(),
            Err(EngineError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_operators_keep_count() {
        for id in [
            CommandId::YankOperation,
            CommandId::DeleteOperation,
            CommandId::ChangeOperation,
            CommandId::FindCharForward,
            CommandId::SearchForward,
            CommandId::SetRegister,
        ] {
            assert!(id.flags().contains(CommandFlags::KEEP_COUNT), "{}", id);
            assert!(id.flags().contains(CommandFlags::NO_OP_FLAG_RESET), "{}", id);
        }
    }

    #[test]
    fn test_linewise_and_inclusive_motions() {
        assert!(CommandId::LineDown.flags().contains(CommandFlags::LINEWISE));
        assert!(CommandId::DocumentEnd.flags().contains(CommandFlags::LINEWISE));
        assert!(CommandId::WordEnd.flags().contains(CommandFlags::INCLUSIVE));
        assert!(CommandId::LineEnd.flags().contains(CommandFlags::INCLUSIVE));
        assert!(!CommandId::WordRight.flags().contains(CommandFlags::INCLUSIVE));
    }

    #[test]
    fn test_every_motion_is_motion_flagged() {
        for &id in CommandId::ALL {
            let flags = id.flags();
            if flags.intersects(CommandFlags::LINEWISE | CommandFlags::INCLUSIVE) {
                assert!(flags.contains(CommandFlags::MOTION), "{}", id);
            }
        }
    }

    #[test]
    fn test_substitutions() {
        assert_eq!(
            CommandId::DeleteChar.visual_substitute(),
            Some(CommandId::DeleteOperation)
        );
        assert_eq!(CommandId::WordRight.change_substitute(), Some(CommandId::ChangeWord));
        assert_eq!(CommandId::WordEnd.change_substitute(), None);
        assert!(matches!(CommandId::WordRight.entry().target, Target::Delegate(BufferOp::WordRight)));
    }
}

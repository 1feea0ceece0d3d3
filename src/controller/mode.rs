use crate::controller::command_table::CommandId;
use crate::host::SelectionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Select,
    Search,
    Command,
    Visual,
    SetRegister,
    ReplaceChar,
    Overtype,
    FindChar,
}

impl Mode {
    /// Modes that hand control back to the mode they were entered from.
    pub fn is_overlay(self) -> bool {
        matches!(self, Mode::Search | Mode::FindChar)
    }

    pub fn is_text_entry(self) -> bool {
        matches!(self, Mode::Insert | Mode::Overtype)
    }

    /// Leaving these modes keeps the pending repeat count.
    pub fn keeps_count(self) -> bool {
        matches!(self, Mode::Normal | Mode::Visual | Mode::FindChar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualMode {
    #[default]
    Char,
    Line,
    Block,
}

impl VisualMode {
    pub fn selection_mode(self) -> SelectionMode {
        match self {
            VisualMode::Char => SelectionMode::Stream,
            VisualMode::Line => SelectionMode::Lines,
            VisualMode::Block => SelectionMode::Rectangle,
        }
    }
}

/// An operator waiting for its motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Yank,
    Delete,
    Change,
    Indent,
    Dedent,
}

impl Operator {
    /// The command that started this operator; typing it again means "whole lines".
    pub fn trigger(self) -> CommandId {
        match self {
            Operator::Yank => CommandId::YankOperation,
            Operator::Delete => CommandId::DeleteOperation,
            Operator::Change => CommandId::ChangeOperation,
            Operator::Indent => CommandId::IndentOperation,
            Operator::Dedent => CommandId::DedentOperation,
        }
    }

    pub fn line_command(self) -> CommandId {
        match self {
            Operator::Yank => CommandId::LineCopy,
            Operator::Delete => CommandId::LineCut,
            Operator::Change => CommandId::ChangeLine,
            Operator::Indent => CommandId::IndentLines,
            Operator::Dedent => CommandId::DedentLines,
        }
    }

    pub fn from_trigger(id: CommandId) -> Option<Self> {
        match id {
            CommandId::YankOperation => Some(Operator::Yank),
            CommandId::DeleteOperation => Some(Operator::Delete),
            CommandId::ChangeOperation => Some(Operator::Change),
            CommandId::IndentOperation => Some(Operator::Indent),
            CommandId::DedentOperation => Some(Operator::Dedent),
            _ => None,
        }
    }

    pub fn key(self) -> char {
        match self {
            Operator::Yank => 'y',
            Operator::Delete => 'd',
            Operator::Change => 'c',
            Operator::Indent => '>',
            Operator::Dedent => '<',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    #[default]
    Chars,
    Lines,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip() {
        for op in [
            Operator::Yank,
            Operator::Delete,
            Operator::Change,
            Operator::Indent,
            Operator::Dedent,
        ] {
            assert_eq!(Operator::from_trigger(op.trigger()), Some(op));
        }
        assert_eq!(Operator::from_trigger(CommandId::WordRight), None);
    }

    #[test]
    fn test_overlay_modes() {
        assert!(Mode::Search.is_overlay());
        assert!(Mode::FindChar.is_overlay());
        assert!(!Mode::Command.is_overlay());
        assert!(Mode::FindChar.keeps_count());
        assert!(!Mode::Insert.keeps_count());
    }
}

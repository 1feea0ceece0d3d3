#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    InsertText { pos: usize, text: String },
    DeleteText { pos: usize, text: String },
}

impl UndoAction {
    /// Apply this action to raw document text
    pub fn apply_to_text(&self, target: &mut String) {
        match self {
            UndoAction::InsertText { pos, text } => {
                if *pos <= target.len() && target.is_char_boundary(*pos) {
                    target.insert_str(*pos, text);
                }
            }
            UndoAction::DeleteText { pos, text } => {
                let end = *pos + text.len();
                if end <= target.len() && target.is_char_boundary(*pos) && target.is_char_boundary(end) {
                    target.replace_range(*pos..end, "");
                }
            }
        }
    }

    pub fn reverse(&self) -> UndoAction {
        match self {
            UndoAction::InsertText { pos, text } => UndoAction::DeleteText {
                pos: *pos,
                text: text.clone(),
            },
            UndoAction::DeleteText { pos, text } => UndoAction::InsertText {
                pos: *pos,
                text: text.clone(),
            },
        }
    }

    fn pos(&self) -> usize {
        match self {
            UndoAction::InsertText { pos, .. } | UndoAction::DeleteText { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditGroup {
    pub actions: Vec<UndoAction>,
    pub cursor_before: usize,
}

impl EditGroup {
    pub fn new(cursor_pos: usize) -> Self {
        Self {
            actions: Vec::new(),
            cursor_before: cursor_pos,
        }
    }
}

/// Undo/redo history with nestable grouping.
///
/// Edits made while a group is open land in that group; edits made outside any group
/// are undone one at a time.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo_stack: Vec<EditGroup>,
    redo_stack: Vec<EditGroup>,
    open_group: Option<EditGroup>,
    depth: usize,
    max_groups: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open_group: None,
            depth: 0,
            max_groups: 1000,
        }
    }

    pub fn begin_group(&mut self, cursor_pos: usize) {
        if self.depth == 0 {
            self.open_group = Some(EditGroup::new(cursor_pos));
        }
        self.depth += 1;
    }

    pub fn end_group(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0
            && let Some(group) = self.open_group.take()
            && !group.actions.is_empty()
        {
            self.push_group(group);
        }
    }

    pub fn is_grouping(&self) -> bool {
        self.depth > 0
    }

    pub fn record(&mut self, action: UndoAction, cursor_pos: usize) {
        self.redo_stack.clear();
        match self.open_group.as_mut() {
            Some(group) => group.actions.push(action),
            None => {
                let mut group = EditGroup::new(cursor_pos);
                group.actions.push(action);
                self.push_group(group);
            }
        }
    }

    fn push_group(&mut self, group: EditGroup) {
        self.undo_stack.push(group);
        if self.undo_stack.len() > self.max_groups {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Reverts the newest group; returns where the cursor should go.
    pub fn undo(&mut self, text: &mut String) -> Option<usize> {
        let group = self.undo_stack.pop()?;
        for action in group.actions.iter().rev() {
            action.reverse().apply_to_text(text);
        }
        let cursor = group.cursor_before;
        self.redo_stack.push(group);
        Some(cursor)
    }

    pub fn redo(&mut self, text: &mut String) -> Option<usize> {
        let group = self.redo_stack.pop()?;
        for action in &group.actions {
            action.apply_to_text(text);
        }
        let cursor = group.actions.first().map(UndoAction::pos);
        self.undo_stack.push(group);
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ungrouped_edits_undo_individually() {
        let mut text = String::from("abc");
        let mut stack = UndoStack::new();

        let insert = UndoAction::InsertText { pos: 3, text: "d".to_string() };
        insert.apply_to_text(&mut text);
        stack.record(insert, 3);
        let delete = UndoAction::DeleteText { pos: 0, text: "a".to_string() };
        delete.apply_to_text(&mut text);
        stack.record(delete, 0);
        assert_eq!(text, "bcd");

        stack.undo(&mut text);
        assert_eq!(text, "abcd");
        stack.undo(&mut text);
        assert_eq!(text, "abc");
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_nested_groups_undo_as_one() {
        let mut text = String::from("one");
        let mut stack = UndoStack::new();

        stack.begin_group(0);
        stack.begin_group(0);
        for (pos, s) in [(3, " two"), (7, " three")] {
            let action = UndoAction::InsertText { pos, text: s.to_string() };
            action.apply_to_text(&mut text);
            stack.record(action, pos);
        }
        stack.end_group();
        assert!(stack.is_grouping());
        stack.end_group();

        assert_eq!(text, "one two three");
        assert_eq!(stack.undo(&mut text), Some(0));
        assert_eq!(text, "one");
        assert_eq!(stack.redo(&mut text), Some(3));
        assert_eq!(text, "one two three");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut text = String::from("x");
        let mut stack = UndoStack::new();
        let action = UndoAction::InsertText { pos: 1, text: "y".to_string() };
        action.apply_to_text(&mut text);
        stack.record(action, 1);
        stack.undo(&mut text);
        assert!(stack.can_redo());

        stack.record(UndoAction::InsertText { pos: 0, text: "z".to_string() }, 0);
        assert!(!stack.can_redo());
    }
}

use super::ex_command::{self, ExCommand, ExCommandDetail, ExContext, ExName, Substitution, SubstituteFlags};
use super::mode::Mode;
use super::operations::{lines, paste, search};
use super::session::{HostRequest, Session};
use crate::config::SettingChange;
use crate::document_model::movement::first_non_blank;
use crate::document_model::registers::is_register_name;
use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, BufferOp, CaseSensitivity, FindOptions, UndoGroup};
use crate::keys::parse_keys;
use crossterm::event::KeyEvent;
use tracing::debug;

/// User commands may call each other, up to this depth.
const MAX_EX_DEPTH: usize = 16;

/// Register text as `:registers` prints it, line breaks shown as `^J`.
fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("^J"),
            '\r' => out.push_str("^M"),
            '\t' => out.push_str("^I"),
            c => out.push(c),
        }
    }
    out
}

/// The optional `[x] [count]` arguments of `:d`, `:y` and `:pu`.
fn register_and_count(cmd: &ExCommandDetail) -> EngineResult<(Option<char>, Option<usize>)> {
    let mut register = None;
    let mut count = None;
    for arg in &cmd.args {
        if let Ok(n) = arg.parse::<usize>()
            && count.is_none()
        {
            count = Some(n.max(1));
            continue;
        }
        let mut chars = arg.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if register.is_none() && count.is_none() => {
                if !is_register_name(c) {
                    return Err(EngineError::InvalidRegister(c));
                }
                register = Some(c);
            }
            _ => return Err(EngineError::user(format!("E488: Trailing characters: {}", arg))),
        }
    }
    Ok((register, count))
}

/// Commands that edit lines or move the caret leave Visual mode; the rest keep the selection.
fn ends_selection(command: &ExCommand) -> bool {
    match command {
        ExCommand::Empty | ExCommand::Shell(_) => false,
        ExCommand::Named(detail) => !matches!(
            detail.name,
            ExName::Write
                | ExName::WriteQuit
                | ExName::Xit
                | ExName::Quit
                | ExName::Set
                | ExName::NoHlsearch
                | ExName::Registers
                | ExName::History
        ),
        _ => true,
    }
}

impl Session {
    /// Parses and runs one `:` line.
    pub(crate) fn run_ex(&mut self, buffer: &mut dyn Buffer, line: &str) -> EngineResult<()> {
        let text = line.trim().trim_start_matches(':');
        if self.ex_depth == 0 && !text.is_empty() {
            self.registers.set_last_command(text);
        }

        let mut ctx = ExContext::new(
            buffer.line_from_position(buffer.current_pos()),
            buffer.line_count(),
        );
        ctx.visual = self.state.last_visual;
        let command = ex_command::parse_with(text, &ctx, &self.user_commands)?;
        debug!("ex {:?}", command);
        if ends_selection(&command) && matches!(self.state.mode, Mode::Visual | Mode::Select) {
            self.set_mode(buffer, Mode::Normal);
        }

        match command {
            ExCommand::Empty => Ok(()),
            ExCommand::GotoLine(line) => {
                self.goto_line(buffer, line);
                Ok(())
            }
            ExCommand::GotoEnd => {
                let last = buffer.line_count().saturating_sub(1);
                self.goto_line(buffer, last);
                Ok(())
            }
            ExCommand::Shell(cmd) => {
                if cmd.is_empty() {
                    return Err(EngineError::user("E471: Argument required"));
                }
                self.requests.push(HostRequest::Shell(cmd));
                Ok(())
            }
            ExCommand::Substitute(sub) => self.substitute(buffer, &sub),
            ExCommand::Named(detail) => self.run_named(buffer, &detail),
            ExCommand::User(name) => self.run_user_command(buffer, &name),
        }
    }

    fn goto_line(&mut self, buffer: &mut dyn Buffer, line: usize) {
        buffer.goto_pos(first_non_blank(buffer, line));
        self.state.preferred_col = None;
        buffer.scroll_to_caret();
    }

    fn substitute(&mut self, buffer: &mut dyn Buffer, sub: &Substitution) -> EngineResult<()> {
        let pattern = if sub.pattern.is_empty() {
            self.registers.last_search().to_string()
        } else {
            sub.pattern.clone()
        };
        if pattern.is_empty() {
            return Err(EngineError::user("E35: No previous regular expression"));
        }
        let case = if sub.flags.contains(SubstituteFlags::MATCH_CASE) {
            CaseSensitivity::Sensitive
        } else if sub.flags.contains(SubstituteFlags::IGNORE_CASE) {
            CaseSensitivity::Insensitive
        } else {
            search::case_sensitivity(&self.settings)
        };
        let options = FindOptions {
            case,
            wrap: false,
            ..FindOptions::default()
        };

        let replaced = {
            let mut scope = UndoGroup::begin(buffer, true);
            self.finder.replace_all(
                &mut *scope,
                &pattern,
                &sub.replacement,
                (sub.range.start, sub.range.end),
                &options,
                !sub.flags.contains(SubstituteFlags::GLOBAL),
            )?
        };
        self.registers.set_last_search(&pattern);
        debug!("substituted {} matches of {:?}", replaced, pattern);
        if replaced == 0 {
            return Err(EngineError::PatternNotFound(pattern));
        }

        let last = sub.range.end.min(buffer.line_count().saturating_sub(1));
        self.goto_line(buffer, last);
        if replaced > 2 {
            self.show_message(&format!("{} substitutions", replaced));
        }
        Ok(())
    }

    fn run_named(&mut self, buffer: &mut dyn Buffer, cmd: &ExCommandDetail) -> EngineResult<()> {
        match cmd.name {
            ExName::Write => {
                if !cmd.args.is_empty() {
                    return Err(EngineError::NotImplemented(format!(":{} with a file name", cmd.typed)));
                }
                self.requests.push(HostRequest::Write);
            }
            ExName::WriteQuit | ExName::Xit => {
                if !cmd.args.is_empty() {
                    return Err(EngineError::NotImplemented(format!(":{} with a file name", cmd.typed)));
                }
                self.requests.push(HostRequest::Write);
                self.requests.push(HostRequest::Quit { force: cmd.forced });
            }
            ExName::Quit => self.requests.push(HostRequest::Quit { force: cmd.forced }),
            ExName::Delete | ExName::Yank => {
                let (register, count) = register_and_count(cmd)?;
                let (first, n) = span(buffer, cmd, count);
                let delete = cmd.name == ExName::Delete;
                self.state.register = register;
                let result = {
                    let mut scope = UndoGroup::begin(buffer, delete);
                    if delete {
                        self.cut_lines(&mut *scope, first, n)
                    } else {
                        self.copy_lines(&mut *scope, first, n)
                    }
                };
                self.state.register = None;
                result?;
            }
            ExName::Put => {
                let (register, _) = register_and_count(cmd)?;
                self.ex_put(buffer, register, cmd.end_line, cmd.forced)?;
            }
            ExName::Join => {
                let (_, count) = register_and_count(cmd)?;
                let (first, n) = span(buffer, cmd, count);
                let joins = if n > 1 { n - 1 } else { 1 };
                let mut scope = UndoGroup::begin(buffer, true);
                lines::join_span(&mut *scope, first, joins)?;
            }
            ExName::ShiftRight | ExName::ShiftLeft => {
                let (_, count) = register_and_count(cmd)?;
                let (first, n) = span(buffer, cmd, count);
                let last = first + n - 1;
                let mut scope = UndoGroup::begin(buffer, true);
                for _ in 0..cmd.typed.len() {
                    self.shift_lines(&mut *scope, first, last, cmd.name == ExName::ShiftRight)?;
                }
            }
            ExName::Set => self.ex_set(buffer, cmd)?,
            ExName::NoHlsearch => self.requests.push(HostRequest::ClearHighlight),
            ExName::Undo => self.run_buffer_op(buffer, BufferOp::Undo)?,
            ExName::Redo => self.run_buffer_op(buffer, BufferOp::Redo)?,
            ExName::Registers => self.show_registers(cmd),
            ExName::History => self.show_history(cmd),
            ExName::Normal => self.ex_normal(buffer, cmd)?,
        }
        Ok(())
    }

    fn ex_put(
        &mut self,
        buffer: &mut dyn Buffer,
        register: Option<char>,
        line: usize,
        above: bool,
    ) -> EngineResult<()> {
        let path = buffer.file_path();
        let mut text = self.registers.read(register, path.as_deref())?;
        if text.is_empty() {
            return Err(EngineError::user(format!(
                "E353: Nothing in register {}",
                register.unwrap_or('"')
            )));
        }
        if !text.ends_with(['\n', '\r']) {
            text.push_str(buffer.eol());
        }
        let target = if above { line } else { line + 1 };
        let mut scope = UndoGroup::begin(buffer, true);
        paste::put_lines(&mut *scope, &text, target).map_err(|e| EngineError::host("put", e))
    }

    fn ex_set(&mut self, buffer: &mut dyn Buffer, cmd: &ExCommandDetail) -> EngineResult<()> {
        if cmd.args.is_empty() {
            let all = self.settings.to_rc_lines().join("  ");
            self.show_message(&all);
            return Ok(());
        }
        let mut shown = Vec::new();
        let mut result = Ok(());
        for arg in &cmd.args {
            match self.settings.set_option(arg) {
                Ok(SettingChange::Query(text)) => shown.push(text),
                Ok(SettingChange::Changed(name)) => {
                    if name == "hlsearch" && !self.settings.hlsearch {
                        self.requests.push(HostRequest::ClearHighlight);
                    }
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.apply_settings(buffer);
        if !shown.is_empty() {
            self.show_message(&shown.join("  "));
        }
        result
    }

    fn show_registers(&mut self, cmd: &ExCommandDetail) {
        let wanted: Vec<char> = cmd.leftover.chars().filter(|c| !c.is_whitespace()).collect();
        let mut out = vec!["Type Name Content".to_string()];
        for (name, text) in self.registers.listing() {
            if !wanted.is_empty() && !wanted.contains(&name) {
                continue;
            }
            let kind = if text.ends_with(['\n', '\r']) { 'l' } else { 'c' };
            out.push(format!("  {}  \"{}   {}", kind, name, printable(&text)));
        }
        self.show_message(&out.join("\n"));
    }

    fn show_history(&mut self, cmd: &ExCommandDetail) {
        let (title, history) = match cmd.args.first().map(String::as_str) {
            Some("/" | "?" | "search" | "s") => ("search history", &self.search_history),
            _ => ("cmd history", &self.command_history),
        };
        let total = history.len();
        let mut out = vec![format!("      #  {}", title)];
        for (i, entry) in history.iter().collect::<Vec<_>>().into_iter().rev().enumerate() {
            let marker = if i + 1 == total { '>' } else { ' ' };
            out.push(format!("{}{:>6}  {}", marker, i + 1, entry));
        }
        let text = out.join("\n");
        self.show_message(&text);
    }

    /// `:norm {keys}`: types `keys` in Normal mode, once per line when given a range.
    fn ex_normal(&mut self, buffer: &mut dyn Buffer, cmd: &ExCommandDetail) -> EngineResult<()> {
        if cmd.leftover.is_empty() {
            return Err(EngineError::user("E471: Argument required"));
        }
        if self.ex_depth >= MAX_EX_DEPTH {
            return Err(EngineError::user("E169: Command too recursive"));
        }
        let keys = parse_keys(&cmd.leftover)?;
        let lines: Vec<Option<usize>> = if cmd.ranged {
            (cmd.start_line..=cmd.end_line).map(Some).collect()
        } else {
            vec![None]
        };

        self.ex_depth += 1;
        let result = self.type_keys(buffer, &keys, &lines);
        self.ex_depth -= 1;
        result
    }

    fn type_keys(&mut self, buffer: &mut dyn Buffer, keys: &[KeyEvent], lines: &[Option<usize>]) -> EngineResult<()> {
        let mut scope = UndoGroup::begin(buffer, true);
        let buffer: &mut dyn Buffer = &mut *scope;
        for line in lines {
            if let Some(line) = *line {
                if line >= buffer.line_count() {
                    break;
                }
                let start = buffer.position_from_line(line);
                buffer.goto_pos(start);
            }
            for key in keys {
                self.handle_key_event(buffer, *key);
            }
            self.reset_to_normal(buffer)?;
        }
        Ok(())
    }

    /// Abandons whatever mode a key sequence was left in.
    fn reset_to_normal(&mut self, buffer: &mut dyn Buffer) -> EngineResult<()> {
        match self.state.mode {
            Mode::Normal => {}
            Mode::Insert | Mode::Overtype => self.finish_insert(buffer)?,
            _ => self.set_mode(buffer, Mode::Normal),
        }
        self.state.clear_pending();
        Ok(())
    }

    fn run_user_command(&mut self, buffer: &mut dyn Buffer, name: &str) -> EngineResult<()> {
        if self.ex_depth >= MAX_EX_DEPTH {
            return Err(EngineError::user("E169: Command too recursive"));
        }
        let commands = self.user_commands.get(name).cloned().unwrap_or_default();
        debug!("user command {} ({} lines)", name, commands.len());
        self.ex_depth += 1;
        let result = commands.iter().try_for_each(|c| self.run_ex(buffer, c));
        self.ex_depth -= 1;
        result
    }
}

/// First line and line count for a ranged command. A count starts at the range's last line.
fn span(buffer: &dyn Buffer, cmd: &ExCommandDetail, count: Option<usize>) -> (usize, usize) {
    let last_line = buffer.line_count().saturating_sub(1);
    match count {
        Some(n) => {
            let first = cmd.end_line;
            (first, n.min(last_line - first + 1))
        }
        None => (cmd.start_line, cmd.end_line - cmd.start_line + 1),
    }
}

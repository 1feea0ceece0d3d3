use crate::config::Settings;
use crate::controller::command_table::CommandId;
use crate::controller::mode::Mode;
use crate::controller::session::{HostRequest, Session};
use crate::document_model::movement;
use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, CaseSensitivity, FindOptions, PatternDialect};
use tracing::debug;

/// Case handling for `/`, `n` and `:s` as the 'ignorecase' and 'smartcase' options ask.
pub(crate) fn case_sensitivity(settings: &Settings) -> CaseSensitivity {
    match (settings.ignorecase, settings.smartcase) {
        (false, _) => CaseSensitivity::Sensitive,
        (true, false) => CaseSensitivity::Insensitive,
        (true, true) => CaseSensitivity::Smart,
    }
}

fn open_prompt(session: &mut Session, buffer: &mut dyn Buffer, backward: bool) -> EngineResult<()> {
    session.state.search_backward = backward;
    session.input.open(if backward { '?' } else { '/' }, "");
    session.set_mode(buffer, Mode::Search);
    Ok(())
}

pub fn search_forward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    open_prompt(session, buffer, false)
}

pub fn search_backward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    open_prompt(session, buffer, true)
}

/// `n`: the last search, in its own direction.
pub fn search_next(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let from = buffer.current_pos();
    let backward = session.state.search_backward;
    run_search(session, buffer, from, count.max(1), backward)
}

/// `N`: the last search, the other way.
pub fn search_prev(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let from = buffer.current_pos();
    let backward = !session.state.search_backward;
    run_search(session, buffer, from, count.max(1), backward)
}

pub fn search_word_forward(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    search_word(session, buffer, count, false)
}

pub fn search_word_backward(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    search_word(session, buffer, count, true)
}

/// `*` and `#`: the keyword under the cursor, as a whole word.
fn search_word(session: &mut Session, buffer: &mut dyn Buffer, count: usize, backward: bool) -> EngineResult<()> {
    let Some((start, end)) = movement::word_under(buffer, buffer.current_pos()) else {
        return Err(EngineError::user("E348: No string under cursor"));
    };
    let pattern = format!(r"\<{}\>", regex::escape(&buffer.text_range(start, end)));
    session.registers.set_last_search(&pattern);
    session.search_history.push(&pattern);
    session.state.search_backward = backward;
    run_search(session, buffer, start, count.max(1), backward)
}

fn run_search(
    session: &mut Session,
    buffer: &mut dyn Buffer,
    from: usize,
    count: usize,
    backward: bool,
) -> EngineResult<()> {
    let pattern = session.registers.last_search().to_string();
    if pattern.is_empty() {
        return Err(EngineError::user("E35: No previous regular expression"));
    }
    let options = FindOptions {
        backward,
        case: case_sensitivity(&session.settings),
        match_word: false,
        dialect: PatternDialect::Regex,
        wrap: true,
    };
    debug!("search {:?} from {} x{} backward={}", pattern, from, count, backward);

    let mut pos = from;
    let mut wraps = 0;
    for _ in 0..count {
        let Some(found) = session.finder.find_next(buffer, &pattern, pos, &options)? else {
            return Err(EngineError::PatternNotFound(pattern));
        };
        if found.wrapped {
            wraps += 1;
            // Twice round the document: give up and leave the caret where it was.
            if wraps >= 2 {
                return Err(EngineError::user(format!("Search looped: {}", pattern)));
            }
        }
        pos = found.start;
    }

    buffer.set_current_pos(pos);
    if wraps > 0 {
        session.show_message(if backward {
            "search hit TOP, continuing at BOTTOM"
        } else {
            "search hit BOTTOM, continuing at TOP"
        });
    }
    if session.settings.hlsearch {
        session.requests.push(HostRequest::Highlight(pattern));
    }
    Ok(())
}

impl Session {
    /// Runs the pattern typed on the `/` or `?` line. An empty line repeats the last one.
    pub(crate) fn finish_search(&mut self, buffer: &mut dyn Buffer, text: String) -> EngineResult<()> {
        self.return_from_overlay(buffer);
        if !text.is_empty() {
            self.registers.set_last_search(&text);
            self.search_history.push(&text);
        }
        self.dispatch(buffer, CommandId::SearchNext)
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::{CommandHandler, HostRequest, Mode, Session};
    use crate::document_model::TextBuffer;
    use crate::host::{Buffer, MessageLog};
    use crate::keys::parse_keys;

    fn feed(session: &mut Session, buffer: &mut TextBuffer, keys: &str) {
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(buffer, key);
        }
    }

    #[test]
    fn test_search_and_repeat() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("one two one two");
        feed(&mut session, &mut buffer, "/two<CR>");
        assert_eq!(buffer.current_pos(), 4);
        assert_eq!(session.mode(), Mode::Normal);
        feed(&mut session, &mut buffer, "n");
        assert_eq!(buffer.current_pos(), 12);
        feed(&mut session, &mut buffer, "N");
        assert_eq!(buffer.current_pos(), 4);
        feed(&mut session, &mut buffer, "/<CR>");
        assert_eq!(buffer.current_pos(), 12);
        assert_eq!(session.search_history().get(0), Some("two"));
    }

    #[test]
    fn test_backward_search_wraps_with_message() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("one two one");
        feed(&mut session, &mut buffer, "?one<CR>");
        assert_eq!(buffer.current_pos(), 8);
        assert_eq!(
            log.last().unwrap().message,
            "search hit TOP, continuing at BOTTOM"
        );
    }

    #[test]
    fn test_pattern_not_found() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("abc");
        feed(&mut session, &mut buffer, "l/zzz<CR>");
        assert_eq!(buffer.current_pos(), 1);
        assert_eq!(log.warnings(), vec!["Pattern not found: zzz".to_string()]);
    }

    #[test]
    fn test_count_that_loops_twice_restores_caret() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("x abc");
        feed(&mut session, &mut buffer, "5/abc<CR>");
        assert_eq!(buffer.current_pos(), 0);
        assert_eq!(log.warnings(), vec!["Search looped: abc".to_string()]);
    }

    #[test]
    fn test_star_and_hash() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("foo bar foobar foo");
        feed(&mut session, &mut buffer, "*");
        assert_eq!(buffer.current_pos(), 15);
        feed(&mut session, &mut buffer, "#");
        assert_eq!(buffer.current_pos(), 0);
    }

    #[test]
    fn test_search_as_operator_motion() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("delete up to here");
        feed(&mut session, &mut buffer, "d/here<CR>");
        assert_eq!(buffer.text(), "here");
    }

    #[test]
    fn test_hlsearch_requests_highlight() {
        let mut session = Session::new();
        session.settings_mut().set_option("hls").unwrap();
        let mut buffer = TextBuffer::from_text("a b a");
        feed(&mut session, &mut buffer, "/b<CR>");
        assert_eq!(
            session.take_requests(),
            vec![HostRequest::Highlight("b".to_string())]
        );
    }

    #[test]
    fn test_cancelled_search_keeps_position() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc abc");
        feed(&mut session, &mut buffer, "/ab<Esc>");
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(buffer.current_pos(), 0);
    }
}

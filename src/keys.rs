/// Key notation - `<Esc>`-style key sequences as typed in `:normal` and on the command line
use crate::error::{EngineError, EngineResult};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

fn named_key(name: &str) -> Option<KeyEvent> {
    let code = match name.to_ascii_lowercase().as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "del" | "delete" => KeyCode::Delete,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        _ => return None,
    };
    Some(KeyEvent::new(code, KeyModifiers::NONE))
}

/// `<C-x>`, `<A-x>` and `<M-x>`.
fn modified_key(name: &str) -> EngineResult<Option<KeyEvent>> {
    let (modifier, rest) = match name.split_at_checked(2) {
        Some((prefix, rest)) if prefix.eq_ignore_ascii_case("c-") => (KeyModifiers::CONTROL, rest),
        Some((prefix, rest)) if prefix.eq_ignore_ascii_case("a-") || prefix.eq_ignore_ascii_case("m-") => {
            (KeyModifiers::ALT, rest)
        }
        _ => return Ok(None),
    };
    if let Some(mut key) = named_key(rest) {
        key.modifiers |= modifier;
        return Ok(Some(key));
    }
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let c = if modifier == KeyModifiers::CONTROL { c.to_ascii_lowercase() } else { c };
            Ok(Some(KeyEvent::new(KeyCode::Char(c), modifier)))
        }
        _ => Err(EngineError::user(format!("Invalid key: <{}>", name))),
    }
}

/// Parses a key sequence such as `dw`, `3x<Esc>` or `:s/a/b/<CR>`.
///
/// A `<...>` group that names no key is taken literally, character by character.
pub fn parse_keys(text: &str) -> EngineResult<Vec<KeyEvent>> {
    let mut keys = Vec::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest.find('>')
            && close > 1
        {
            let name = &rest[1..close];
            let key = match named_key(name) {
                Some(key) => Some(key),
                None => modified_key(name)?,
            };
            if let Some(key) = key {
                keys.push(key);
                rest = &rest[close + 1..];
                continue;
            }
        }
        keys.push(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        rest = &rest[c.len_utf8()..];
    }
    Ok(keys)
}

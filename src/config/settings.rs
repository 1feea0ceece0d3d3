use crate::error::{EngineError, EngineResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Unix,
    Mac,
    Dos,
}

impl FileFormat {
    pub fn terminator(self) -> &'static str {
        match self {
            FileFormat::Unix => "\n",
            FileFormat::Mac => "\r",
            FileFormat::Dos => "\r\n",
        }
    }

    /// Guesses the format from the first terminator in `text`.
    pub fn detect(text: &str) -> Self {
        match text.find(['\r', '\n']) {
            Some(i) if text[i..].starts_with("\r\n") => FileFormat::Dos,
            Some(i) if text[i..].starts_with('\r') => FileFormat::Mac,
            _ => FileFormat::Unix,
        }
    }
}

impl FromStr for FileFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unix" => Ok(FileFormat::Unix),
            "mac" => Ok(FileFormat::Mac),
            "dos" => Ok(FileFormat::Dos),
            _ => Err(EngineError::user(format!("Invalid fileformat: {}", s))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileFormat::Unix => "unix",
            FileFormat::Mac => "mac",
            FileFormat::Dos => "dos",
        };
        f.write_str(name)
    }
}

bitflags::bitflags! {
    /// Keys allowed to move the cursor across a line boundary ('whichwrap').
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WhichWrap: u16 {
        const BACKSPACE    = 1 << 0; // b
        const SPACE        = 1 << 1; // s
        const H            = 1 << 2; // h
        const L            = 1 << 3; // l
        const LEFT_ARROW   = 1 << 4; // <
        const RIGHT_ARROW  = 1 << 5; // >
        const TILDE        = 1 << 6; // ~
        const INSERT_LEFT  = 1 << 7; // [
        const INSERT_RIGHT = 1 << 8; // ]
    }
}

const WHICH_WRAP_CHARS: [(char, WhichWrap); 9] = [
    ('b', WhichWrap::BACKSPACE),
    ('s', WhichWrap::SPACE),
    ('h', WhichWrap::H),
    ('l', WhichWrap::L),
    ('<', WhichWrap::LEFT_ARROW),
    ('>', WhichWrap::RIGHT_ARROW),
    ('~', WhichWrap::TILDE),
    ('[', WhichWrap::INSERT_LEFT),
    (']', WhichWrap::INSERT_RIGHT),
];

impl FromStr for WhichWrap {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = WhichWrap::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut chars = part.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return Err(EngineError::user(format!("Invalid whichwrap flag: {}", part)));
            };
            match WHICH_WRAP_CHARS.iter().find(|(ch, _)| *ch == c) {
                Some((_, flag)) => flags |= *flag,
                None => return Err(EngineError::user(format!("Invalid whichwrap flag: {}", c))),
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for WhichWrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = WHICH_WRAP_CHARS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(c, _)| c.to_string())
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// Editor options recognised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ignorecase: bool,
    pub smartcase: bool,
    pub tabstop: usize,
    pub expandtab: bool,
    pub softtabstop: usize,
    pub fileformat: FileFormat,
    pub whichwrap: WhichWrap,
    pub hlsearch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignorecase: false,
            smartcase: false,
            tabstop: 8,
            expandtab: false,
            softtabstop: 0,
            fileformat: FileFormat::Unix,
            whichwrap: WhichWrap::BACKSPACE | WhichWrap::SPACE,
            hlsearch: false,
        }
    }
}

/// What a `:set` expression did, so the session can push changes to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Changed(&'static str),
    Query(String),
}

const BOOL_OPTIONS: [(&str, &str); 4] = [
    ("ignorecase", "ic"),
    ("smartcase", "scs"),
    ("expandtab", "et"),
    ("hlsearch", "hls"),
];

const VALUE_OPTIONS: [(&str, &str); 4] = [
    ("tabstop", "ts"),
    ("softtabstop", "sts"),
    ("fileformat", "ff"),
    ("whichwrap", "ww"),
];

fn canonical(name: &str) -> Option<&'static str> {
    BOOL_OPTIONS
        .iter()
        .chain(VALUE_OPTIONS.iter())
        .find(|(full, short)| name == *full || name == *short)
        .map(|(full, _)| *full)
}

impl Settings {
    fn bool_option(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "ignorecase" => Some(&mut self.ignorecase),
            "smartcase" => Some(&mut self.smartcase),
            "expandtab" => Some(&mut self.expandtab),
            "hlsearch" => Some(&mut self.hlsearch),
            _ => None,
        }
    }

    pub fn value_of(&self, name: &str) -> Option<String> {
        let value = match canonical(name)? {
            "ignorecase" => flag_text("ignorecase", self.ignorecase),
            "smartcase" => flag_text("smartcase", self.smartcase),
            "expandtab" => flag_text("expandtab", self.expandtab),
            "hlsearch" => flag_text("hlsearch", self.hlsearch),
            "tabstop" => format!("tabstop={}", self.tabstop),
            "softtabstop" => format!("softtabstop={}", self.softtabstop),
            "fileformat" => format!("fileformat={}", self.fileformat),
            "whichwrap" => format!("whichwrap={}", self.whichwrap),
            _ => return None,
        };
        Some(value)
    }

    /// Applies one vim-style option expression: `ic`, `noic`, `invic`, `ic!`, `ts=4`, `ts?`.
    pub fn set_option(&mut self, expr: &str) -> EngineResult<SettingChange> {
        let expr = expr.trim();

        if let Some((name, value)) = expr.split_once('=') {
            let name = canonical(name.trim())
                .ok_or_else(|| EngineError::user(format!("Unknown option: {}", name.trim())))?;
            self.set_value(name, value.trim())?;
            return Ok(SettingChange::Changed(name));
        }

        if let Some(name) = expr.strip_suffix('?') {
            return self
                .value_of(name)
                .map(SettingChange::Query)
                .ok_or_else(|| EngineError::user(format!("Unknown option: {}", name)));
        }

        let (name, toggle) = match expr.strip_suffix('!') {
            Some(name) => (name, true),
            None => (expr, false),
        };

        if let Some(full) = canonical(name) {
            if let Some(flag) = self.bool_option(full) {
                *flag = if toggle { !*flag } else { true };
                return Ok(SettingChange::Changed(full));
            }
            // `:set ts` shows the value, like vim
            return self
                .value_of(full)
                .map(SettingChange::Query)
                .ok_or_else(|| EngineError::user(format!("Unknown option: {}", name)));
        }

        let (negated, rest) = if let Some(rest) = name.strip_prefix("no") {
            (true, rest)
        } else if let Some(rest) = name.strip_prefix("inv") {
            (false, rest)
        } else {
            return Err(EngineError::user(format!("Unknown option: {}", name)));
        };

        let full = canonical(rest).ok_or_else(|| EngineError::user(format!("Unknown option: {}", name)))?;
        let flag = self
            .bool_option(full)
            .ok_or_else(|| EngineError::user(format!("Invalid argument: {}", name)))?;
        *flag = if negated { false } else { !*flag };
        Ok(SettingChange::Changed(full))
    }

    fn set_value(&mut self, name: &'static str, value: &str) -> EngineResult<()> {
        match name {
            "tabstop" => {
                let width = parse_number(name, value)?;
                if width == 0 {
                    return Err(EngineError::user("Argument must be positive: tabstop"));
                }
                self.tabstop = width;
            }
            "softtabstop" => self.softtabstop = parse_number(name, value)?,
            "fileformat" => self.fileformat = value.parse()?,
            "whichwrap" => self.whichwrap = value.parse()?,
            _ => {
                let flag = self
                    .bool_option(name)
                    .ok_or_else(|| EngineError::user(format!("Invalid argument: {}", name)))?;
                *flag = parse_bool(value)
                    .ok_or_else(|| EngineError::user(format!("Invalid argument: {}={}", name, value)))?;
            }
        }
        Ok(())
    }

    /// Width of one indent step: 'softtabstop' when set, otherwise 'tabstop'.
    pub fn indent_width(&self) -> usize {
        if self.softtabstop > 0 {
            self.softtabstop
        } else {
            self.tabstop.max(1)
        }
    }

    /// Text inserted for one indent step.
    pub fn indent_unit(&self) -> String {
        if self.expandtab {
            " ".repeat(self.indent_width())
        } else {
            "\t".to_string()
        }
    }

    /// All options as `set` lines, the format the rc loader reads back.
    pub fn to_rc_lines(&self) -> Vec<String> {
        BOOL_OPTIONS
            .iter()
            .chain(VALUE_OPTIONS.iter())
            .filter_map(|(name, _)| self.value_of(name))
            .map(|value| format!("set {}", value))
            .collect()
    }
}

fn flag_text(name: &str, on: bool) -> String {
    if on { name.to_string() } else { format!("no{}", name) }
}

fn parse_number(name: &str, value: &str) -> EngineResult<usize> {
    value
        .parse::<usize>()
        .map_err(|_| EngineError::user(format!("Number required after =: {}={}", name, value)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tabstop, 8);
        assert_eq!(settings.fileformat, FileFormat::Unix);
        assert!(settings.whichwrap.contains(WhichWrap::BACKSPACE));
        assert!(!settings.whichwrap.contains(WhichWrap::H));
    }

    #[test]
    fn test_boolean_forms() {
        let mut settings = Settings::default();
        settings.set_option("ic").unwrap();
        assert!(settings.ignorecase);
        settings.set_option("noignorecase").unwrap();
        assert!(!settings.ignorecase);
        settings.set_option("invic").unwrap();
        assert!(settings.ignorecase);
        settings.set_option("ic!").unwrap();
        assert!(!settings.ignorecase);
    }

    #[test]
    fn test_value_forms() {
        let mut settings = Settings::default();
        settings.set_option("ts=4").unwrap();
        settings.set_option("ff=dos").unwrap();
        settings.set_option("ww=h,l").unwrap();
        assert_eq!(settings.tabstop, 4);
        assert_eq!(settings.fileformat, FileFormat::Dos);
        assert_eq!(settings.whichwrap, WhichWrap::H | WhichWrap::L);
        assert_eq!(
            settings.set_option("ts?").unwrap(),
            SettingChange::Query("tabstop=4".to_string())
        );
    }

    #[test]
    fn test_invalid_options_are_user_errors() {
        let mut settings = Settings::default();
        assert!(settings.set_option("bogus").is_err());
        assert!(settings.set_option("ts=0").is_err());
        assert!(settings.set_option("ts=abc").is_err());
        assert!(settings.set_option("ff=amiga").is_err());
        assert!(settings.set_option("ww=q").is_err());
        assert!(settings.set_option("nots").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_indent_unit() {
        let mut settings = Settings::default();
        assert_eq!(settings.indent_unit(), "\t");
        settings.expandtab = true;
        settings.tabstop = 4;
        assert_eq!(settings.indent_unit(), "    ");
        settings.softtabstop = 2;
        assert_eq!(settings.indent_unit(), "  ");
    }

    #[test]
    fn test_detect_file_format() {
        assert_eq!(FileFormat::detect("a\r\nb"), FileFormat::Dos);
        assert_eq!(FileFormat::detect("a\rb"), FileFormat::Mac);
        assert_eq!(FileFormat::detect("a\nb"), FileFormat::Unix);
        assert_eq!(FileFormat::detect("plain"), FileFormat::Unix);
    }
}

use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, CaseSensitivity, FindMatch, FindOptions, Finder, PatternDialect};
use regex::{Regex, RegexBuilder};
use tracing::trace;

/// [`Finder`] backed by the `regex` crate.
///
/// Understands the vim word anchors `\<` and `\>` and, in replacements, `&` and `\1`..`\9`.
#[derive(Debug, Default)]
pub struct RegexFinder {
    cached: Option<(String, FindOptions, Regex)>,
}

impl RegexFinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&mut self, pattern: &str, options: &FindOptions) -> EngineResult<&Regex> {
        let hit = matches!(&self.cached, Some((p, o, _)) if p == pattern && o == options);
        if !hit {
            let regex = build_regex(pattern, options)?;
            self.cached = Some((pattern.to_string(), *options, regex));
        }
        match &self.cached {
            Some((_, _, regex)) => Ok(regex),
            None => Err(EngineError::InvalidPattern(pattern.to_string())),
        }
    }
}

pub fn build_regex(pattern: &str, options: &FindOptions) -> EngineResult<Regex> {
    if pattern.is_empty() {
        return Err(EngineError::user("E35: No previous regular expression"));
    }
    let mut body = match options.dialect {
        PatternDialect::Plain => regex::escape(pattern),
        PatternDialect::Regex => translate_pattern(pattern),
    };
    if options.match_word {
        body = format!(r"\b(?:{})\b", body);
    }
    let insensitive = match options.case {
        CaseSensitivity::Sensitive => false,
        CaseSensitivity::Insensitive => true,
        CaseSensitivity::Smart => !pattern.chars().any(char::is_uppercase),
    };
    RegexBuilder::new(&body)
        .case_insensitive(insensitive)
        .multi_line(true)
        .build()
        .map_err(|e| EngineError::InvalidPattern(e.to_string()))
}

fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('<') | Some('>') => out.push_str(r"\b"),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str(r"\\"),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a vim replacement string into `regex` expansion syntax.
pub fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("${0}"),
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

impl Finder for RegexFinder {
    fn find_next(
        &mut self,
        buffer: &dyn Buffer,
        pattern: &str,
        from: usize,
        options: &FindOptions,
    ) -> EngineResult<Option<FindMatch>> {
        let text = buffer.text_range(0, buffer.text_length());
        let regex = self.compile(pattern, options)?;
        trace!("find {:?} from {} backward={}", pattern, from, options.backward);

        let found = if options.backward {
            let mut before = None;
            let mut last = None;
            for m in regex.find_iter(&text) {
                if m.start() < from {
                    before = Some(m);
                }
                last = Some(m);
            }
            match before {
                Some(m) => Some((m, false)),
                None if options.wrap => last.map(|m| (m, true)),
                None => None,
            }
        } else {
            let start = buffer.position_after(from).min(text.len());
            match regex.find_at(&text, start) {
                Some(m) => Some((m, false)),
                None if options.wrap => regex.find(&text).map(|m| (m, true)),
                None => None,
            }
        };

        Ok(found.map(|(m, wrapped)| FindMatch {
            start: m.start(),
            end: m.end(),
            wrapped,
        }))
    }

    fn replace_all(
        &mut self,
        buffer: &mut dyn Buffer,
        pattern: &str,
        replacement: &str,
        lines: (usize, usize),
        options: &FindOptions,
        first_on_line_only: bool,
    ) -> EngineResult<usize> {
        let expansion = translate_replacement(replacement);
        let regex = self.compile(pattern, options)?.clone();
        let (first, last) = lines;
        let last = last.min(buffer.line_count().saturating_sub(1));
        let mut count = 0;

        for line in first..=last {
            let text = buffer.line_text(line);
            let hits = regex.find_iter(&text).count();
            if hits == 0 {
                continue;
            }
            let replaced = if first_on_line_only {
                count += 1;
                regex.replacen(&text, 1, expansion.as_str())
            } else {
                count += hits;
                regex.replace_all(&text, expansion.as_str())
            };
            let start = buffer.position_from_line(line);
            let end = buffer.line_end_position(line);
            buffer
                .replace_range(start, end, &replaced)
                .map_err(|e| EngineError::host("substitute", e))?;
        }
        Ok(count)
    }
}

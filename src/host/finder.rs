use super::Buffer;
use crate::error::EngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
    /// Insensitive unless the pattern contains an uppercase letter.
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternDialect {
    #[default]
    Regex,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub backward: bool,
    pub case: CaseSensitivity,
    pub match_word: bool,
    pub dialect: PatternDialect,
    pub wrap: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            backward: false,
            case: CaseSensitivity::Sensitive,
            match_word: false,
            dialect: PatternDialect::Regex,
            wrap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindMatch {
    pub start: usize,
    pub end: usize,
    /// The search passed the end (or start) of the document to reach this match.
    pub wrapped: bool,
}

/// Search and replace over a [`Buffer`].
pub trait Finder {
    /// Next match strictly after `from` (strictly before it when searching backward).
    fn find_next(
        &mut self,
        buffer: &dyn Buffer,
        pattern: &str,
        from: usize,
        options: &FindOptions,
    ) -> EngineResult<Option<FindMatch>>;

    /// Replaces matches on lines `first..=last`. Returns the number of replacements.
    fn replace_all(
        &mut self,
        buffer: &mut dyn Buffer,
        pattern: &str,
        replacement: &str,
        lines: (usize, usize),
        options: &FindOptions,
        first_on_line_only: bool,
    ) -> EngineResult<usize>;
}

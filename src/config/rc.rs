use super::settings::Settings;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const RC_FILE_NAME: &str = ".vibinderrc";

pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .vibinderrc in:
    /// 1. Current directory
    /// 2. Home directory (~/.vibinderrc)
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_rc = Path::new(&home).join(RC_FILE_NAME);
            if home_rc.exists() {
                return Some(home_rc);
            }
        }

        None
    }

    /// Load settings from the default RC location, falling back to defaults
    pub fn load_config() -> Settings {
        match Self::get_rc_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("could not read {}: {}", path.display(), e);
                Settings::default()
            }),
            None => Settings::default(),
        }
    }

    pub fn load_from(path: &Path) -> io::Result<Settings> {
        let content = fs::read_to_string(path)?;
        let mut settings = Settings::default();
        Self::parse_config_content(&content, &mut settings);
        debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write `settings` back out in the format `load_from` reads.
    pub fn save(path: &Path, settings: &Settings) -> io::Result<()> {
        let mut content = String::from("\" written by vi-binder\n");
        for line in settings.to_rc_lines() {
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(path, content)
    }

    /// Parse the content of an RC file
    pub fn parse_config_content(content: &str, settings: &mut Settings) {
        for line in content.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            Self::parse_config_line(line, settings);
        }
    }

    /// Parse a single configuration line
    fn parse_config_line(line: &str, settings: &mut Settings) {
        // Remove inline comments
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        // vim-style: set ts=4 et
        if let Some(stripped) = line.strip_prefix("set ") {
            for expr in stripped.split_whitespace() {
                if let Err(e) = settings.set_option(expr) {
                    warn!("ignoring rc setting '{}': {}", expr, e);
                }
            }
        }
        // key=value pairs; booleans take true/false/yes/no/1/0
        else if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            if let Err(e) = settings.set_option(&format!("{}={}", key, value)) {
                warn!("ignoring rc setting '{}': {}", line, e);
            }
        }
    }

    /// Generate a sample RC file content
    pub fn generate_sample_rc() -> String {
        r#"# vi-binder configuration file (.vibinderrc)
# Lines starting with # or " are comments

# Search
set ignorecase         # Case-insensitive search (or set noic)
set smartcase          # ...unless the pattern has uppercase letters

# Tab settings
set tabstop=4          # Display width of a tab
set expandtab          # Indent with spaces instead of tabs
set softtabstop=4      # Width of one indent step

# File format
set fileformat=unix    # Line endings: unix, dos, or mac

# Cursor wrapping across lines
set whichwrap=b,s,h,l

# Alternative key=value syntax:
# tabstop=4
# expandtab=true
# hlsearch=yes
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileFormat, WhichWrap};

    #[test]
    fn test_parse_vim_style_config() {
        let mut settings = Settings::default();
        let content = r#"
            set ic
            set expandtab
            set tabstop=4 sts=2
            set fileformat=dos
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert!(settings.ignorecase);
        assert!(settings.expandtab);
        assert_eq!(settings.tabstop, 4);
        assert_eq!(settings.softtabstop, 2);
        assert_eq!(settings.fileformat, FileFormat::Dos);
    }

    #[test]
    fn test_parse_key_value_config() {
        let mut settings = Settings::default();
        let content = r#"
            tabstop=2
            expandtab=true
            hlsearch=yes
            smartcase=false
            fileformat=mac
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert_eq!(settings.tabstop, 2);
        assert!(settings.expandtab);
        assert!(settings.hlsearch);
        assert!(!settings.smartcase);
        assert_eq!(settings.fileformat, FileFormat::Mac);
    }

    #[test]
    fn test_parse_mixed_config_with_comments() {
        let mut settings = Settings::default();
        let content = r#"
            # This is a comment
            set ic                 # Case-insensitive
            " This is also a comment

            tabstop=6              # Custom tab stop
            # set expandtab        # This is commented out
            set ww=h,l
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert!(settings.ignorecase);
        assert!(!settings.expandtab);
        assert_eq!(settings.tabstop, 6);
        assert_eq!(settings.whichwrap, WhichWrap::H | WhichWrap::L);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let mut settings = Settings::default();
        let content = r#"
            set tabstop=0          # Invalid: must be positive
            tabstop=invalid        # Invalid: not a number
            fileformat=invalid     # Invalid: unknown format
            unknown_setting=value  # Unknown setting
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RC_FILE_NAME);

        let mut settings = Settings::default();
        settings.set_option("ts=3").unwrap();
        settings.set_option("hls").unwrap();
        settings.set_option("ww=b,s,<,>").unwrap();
        RcLoader::save(&path, &settings).unwrap();

        let loaded = RcLoader::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_sample_rc_parses() {
        let mut settings = Settings::default();
        RcLoader::parse_config_content(&RcLoader::generate_sample_rc(), &mut settings);
        assert!(settings.expandtab);
        assert_eq!(settings.softtabstop, 4);
        assert!(settings.whichwrap.contains(WhichWrap::H));
    }
}

//! `overrunrc` configuration.
//!
//! Settings come from three layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the config file (`$XDG_CONFIG_HOME/overrun/overrunrc` or the platform
//!    equivalent, falling back to `~/.overrunrc`)
//! 3. environment variables
//!
//! | File line | Environment | Effect |
//! |-----------|-------------|--------|
//! | `shell=/bin/bash` | `OVERRUN_SHELL` | shell used for shell-mode commands |
//! | `verbose=on` | `OVERRUN_VERBOSE` | echo commands before running them |
//! | `warn_uncalled=off` | `OVERRUN_WARN` | warn about commands never run |
//! | `warn_unchecked=off` | `OVERRUN_WARN` | warn about failures never inspected |
//!
//! Each line is `name=value`.  Lines starting with `;` are comments.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use directories::{BaseDirs, ProjectDirs};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// 1-based line number; 0 for environment variables.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            f.write_str(&self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub shell: String,
    pub warn_uncalled: bool,
    pub warn_unchecked: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            shell: "/bin/sh".to_owned(),
            warn_uncalled: true,
            warn_unchecked: true,
            verbose: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string on top of the defaults.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let errors = config.apply_str(s);
        (config, errors)
    }

    /// Read and parse a config file on top of the defaults.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply config-file lines to `self`, returning errors for bad lines.
    pub fn apply_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                errors.push(ConfigError { line: i + 1, message: format!("expected name=value: {line}") });
                continue;
            };
            if let Err(message) = self.set(name.trim(), value.trim()) {
                errors.push(ConfigError { line: i + 1, message });
            }
        }
        errors
    }

    /// Apply `OVERRUN_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();
        let mut report = |var: &str, r: Result<(), String>| {
            if let Err(message) = r {
                errors.push(ConfigError { line: 0, message: format!("{var}: {message}") });
            }
        };
        if let Some(shell) = lookup("OVERRUN_SHELL") {
            report("OVERRUN_SHELL", self.set("shell", &shell));
        }
        if let Some(v) = lookup("OVERRUN_VERBOSE") {
            report("OVERRUN_VERBOSE", self.set("verbose", &v));
        }
        if let Some(v) = lookup("OVERRUN_WARN") {
            report("OVERRUN_WARN", self.set("warn", &v));
        }
        errors
    }

    /// Set one named option.  `warn` sets both warning switches.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "shell" => {
                if value.is_empty() {
                    return Err("shell must not be empty".to_owned());
                }
                self.shell = value.to_owned();
            }
            "verbose" => self.verbose = parse_bool(value)?,
            "warn_uncalled" => self.warn_uncalled = parse_bool(value)?,
            "warn_unchecked" => self.warn_unchecked = parse_bool(value)?,
            "warn" => {
                let on = parse_bool(value)?;
                self.warn_uncalled = on;
                self.warn_unchecked = on;
            }
            _ => return Err(format!("unknown setting: {name}")),
        }
        Ok(())
    }

    /// Defaults, then the user's config file, then the process environment.
    ///
    /// Problems are reported on stderr and otherwise ignored.
    pub fn from_environment() -> Self {
        let mut config = Config::new();
        if let Some(path) = find_user_config() {
            match std::fs::read_to_string(&path) {
                Ok(s) => {
                    for e in config.apply_str(&s) {
                        eprintln!("overrun: warning: {}: {e}", path.display());
                    }
                }
                Err(e) => eprintln!("overrun: warning: {}: {e}", path.display()),
            }
        }
        for e in config.apply_env(|k| std::env::var(k).ok()) {
            eprintln!("overrun: warning: {e}");
        }
        tracing::debug!(?config, "configuration loaded");
        config
    }

    /// Process-wide configuration, resolved on first use.
    pub fn global() -> &'static Config {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(Config::from_environment)
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(format!("invalid boolean: {value}")),
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Candidate config file locations, in search order.
pub fn config_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dirs) = ProjectDirs::from("", "", "overrun") {
        paths.push(dirs.config_dir().join("overrunrc"));
    }
    if let Some(base) = BaseDirs::new() {
        paths.push(base.home_dir().join(".overrunrc"));
    }
    paths
}

/// The first existing config file, if any.
pub fn find_user_config() -> Option<PathBuf> {
    config_candidates().into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.shell, "/bin/sh");
        assert!(c.warn_uncalled && c.warn_unchecked);
        assert!(!c.verbose);
    }

    #[test]
    fn name_value_lines() {
        let (c, errors) = Config::load_str("shell=/bin/bash\nverbose = on\n");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(c.shell, "/bin/bash");
        assert!(c.verbose);
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let (c, errors) = Config::load_str("; a comment\n\n   \n;; another\nwarn_uncalled=off\n");
        assert!(errors.is_empty());
        assert!(!c.warn_uncalled);
        assert!(c.warn_unchecked);
    }

    #[test]
    fn slash_commands_are_not_settings() {
        let (c, errors) = Config::load_str("/set verbose=on\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert!(errors[0].message.starts_with("unknown setting: /set"), "{}", errors[0].message);
        assert!(!c.verbose);
    }

    #[test]
    fn warn_sets_both() {
        let (c, _) = Config::load_str("warn=no");
        assert!(!c.warn_uncalled && !c.warn_unchecked);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let (c, errors) = Config::load_str("verbose=on\nbogus=1\nverbose=maybe\n/def x\nnoequals\n");
        assert!(c.verbose);
        let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 3, 4, 5]);
        assert_eq!(errors[0].to_string(), "line 2: unknown setting: bogus");
        assert_eq!(errors[1].message, "invalid boolean: maybe");
    }

    #[test]
    fn empty_shell_rejected() {
        let (c, errors) = Config::load_str("shell=");
        assert_eq!(c.shell, "/bin/sh");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn env_overrides_file() {
        let (mut c, _) = Config::load_str("shell=/bin/bash\nverbose=on\n");
        let env: HashMap<&str, &str> =
            [("OVERRUN_SHELL", "/bin/dash"), ("OVERRUN_VERBOSE", "0"), ("OVERRUN_WARN", "off")].into();
        let errors = c.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert!(errors.is_empty());
        assert_eq!(c.shell, "/bin/dash");
        assert!(!c.verbose);
        assert!(!c.warn_uncalled && !c.warn_unchecked);
    }

    #[test]
    fn bad_env_value_reported() {
        let mut c = Config::new();
        let errors = c.apply_env(|k| (k == "OVERRUN_WARN").then(|| "sometimes".to_owned()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 0);
        assert_eq!(errors[0].to_string(), "OVERRUN_WARN: invalid boolean: sometimes");
        assert!(c.warn_uncalled);
    }

    #[test]
    fn load_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "; overrunrc").unwrap();
        writeln!(file, "warn_unchecked=off").unwrap();
        let (c, errors) = Config::load_file(file.path()).unwrap();
        assert!(errors.is_empty());
        assert!(!c.warn_unchecked);
    }

    #[test]
    fn load_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_file(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn candidates_end_with_home_dotfile() {
        if let Some(last) = config_candidates().last() {
            assert!(last.ends_with(".overrunrc") || last.ends_with("overrunrc"));
        }
    }
}

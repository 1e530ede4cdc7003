//! Configuration store
//!
//! Runtime knobs such as `RATE_LIMIT_PER_MINUTE` live in a `.env`-style file.
//! [`EnvFileStore`] edits that file through an explicit get/set/persist
//! interface instead of patching text by hand: unrelated lines and comments
//! are kept as they are, and writes go through a temp file + rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Key/value configuration store
pub trait ConfigStore: Send + Sync {
    /// Current value for `key`, if set
    fn get(&self, key: &str) -> Option<String>;

    /// Set `key` to `value` (in memory until [`ConfigStore::persist`])
    fn set(&mut self, key: &str, value: &str);

    /// Remove `key`, returning its previous value
    fn remove(&mut self, key: &str) -> Option<String>;

    /// All entries in file order
    fn entries(&self) -> Vec<(String, String)>;

    /// Write pending changes to the backing medium
    fn persist(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
enum Line {
    Entry {
        key: String,
        value: String,
        /// Original text; `None` once the entry has been modified
        raw: Option<String>,
    },
    Other(String),
}

/// `.env` file backed store
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
    lines: Vec<Line>,
}

impl EnvFileStore {
    /// Open a store backed by `path`. A missing file is an empty store; it is
    /// created on the first [`ConfigStore::persist`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let lines = contents.lines().map(parse_line).collect();
        Ok(Self { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry {
                    raw: Some(raw), ..
                } => out.push_str(raw),
                Line::Entry { key, value, .. } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote_value(value));
                }
                Line::Other(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }
}

fn parse_line(text: &str) -> Line {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Other(text.to_string());
    }

    let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    match body.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Line::Entry {
            key: key.trim().to_string(),
            value: unquote_value(value.trim()),
            raw: Some(text.to_string()),
        },
        _ => Line::Other(text.to_string()),
    }
}

fn unquote_value(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
        {
            return inner.replace("\\\"", "\"").replace("\\\\", "\\");
        }
        if let Some(inner) = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\'));
    if needs_quotes {
        format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        value.to_string()
    }
}

impl ConfigStore for EnvFileStore {
    fn get(&self, key: &str) -> Option<String> {
        // Later assignments win, matching how dotenv files are loaded.
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k.as_str() == key => Some(value.clone()),
            _ => None,
        })
    }

    fn set(&mut self, key: &str, value: &str) {
        let existing = self.lines.iter_mut().rev().find_map(|line| match line {
            Line::Entry {
                key: k,
                value: v,
                raw,
            } if k.as_str() == key => Some((v, raw)),
            _ => None,
        });

        match existing {
            Some((current, raw)) => {
                if current.as_str() != value {
                    *current = value.to_string();
                    *raw = None;
                }
            }
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                raw: None,
            }),
        }
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let previous = self.get(key);
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k.as_str() == key));
        previous
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Entry { key, value, .. } => Some((key.clone(), value.clone())),
                Line::Other(_) => None,
            })
            .collect()
    }

    fn persist(&self) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
            AppError::Config(format!(
                "Failed to create temp file in {}: {}",
                dir.display(),
                e
            ))
        })?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            AppError::Config(format!(
                "Failed to write config file {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            path = %self.path.display(),
            entries = self.entries().len(),
            "Config file persisted"
        );

        Ok(())
    }
}

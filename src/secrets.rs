//! Runtime secret store.
//!
//! Secrets come from a `KEY=VALUE` file (dotenv syntax, `export ` prefix and
//! quoting allowed) and from the process environment. The environment wins
//! when both define a key. The file is never written back into the process
//! environment.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secrets file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", .path.display())]
    Syntax { path: PathBuf, line: usize, message: String },
}

#[derive(Debug, Default)]
pub struct SecretStore {
    file_values: BTreeMap<String, SecretString>,
    source: Option<PathBuf>,
}

impl SecretStore {
    /// A store backed only by the process environment.
    pub fn from_env() -> Self {
        SecretStore::default()
    }

    pub fn load_file(path: &Path) -> Result<Self, SecretError> {
        if !path.is_file() {
            return Err(SecretError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|source| SecretError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store = SecretStore::parse(BufReader::new(file), path)?;
        store.source = Some(path.to_path_buf());
        Ok(store)
    }

    fn parse(reader: impl BufRead, path: &Path) -> Result<Self, SecretError> {
        let mut file_values = BTreeMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SecretError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            match parse_assignment(&line) {
                Ok(Some((key, value))) => {
                    file_values.insert(key, SecretString::from(value));
                }
                Ok(None) => {}
                Err(message) => {
                    return Err(SecretError::Syntax {
                        path: path.to_path_buf(),
                        line: index + 1,
                        message,
                    });
                }
            }
        }
        Ok(SecretStore {
            file_values,
            source: None,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Non-blank value for `key`, environment first.
    pub fn get(&self, key: &str) -> Option<SecretString> {
        match std::env::var(key) {
            Ok(v) if !v.trim().is_empty() => Some(SecretString::from(v.trim().to_string())),
            _ => self
                .file_values
                .get(key)
                .map(|v| v.expose_secret().trim())
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.to_string())),
        }
    }
}

fn parse_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let without_export = trimmed
        .strip_prefix("export ")
        .map(|s| s.trim_start())
        .unwrap_or(trimmed);

    let (key, value_part) = without_export
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();

    if key.is_empty() {
        return Err("secret name cannot be empty".to_string());
    }
    if key.chars().any(|c| c.is_whitespace()) {
        return Err(format!("secret name contains whitespace: {}", key));
    }

    let value = parse_value(value_part)?;
    Ok(Some((key.to_string(), value)))
}

/// Parses one value: bare (trailing `#` comment stripped), `"double"` with
/// backslash escapes, or `'single'` taken literally.
pub fn parse_value(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    if let Some(rest) = trimmed.strip_prefix('"') {
        let (value, remainder) = take_double_quoted(rest)?;
        ensure_only_comment(remainder, "double")?;
        Ok(value)
    } else if let Some(rest) = trimmed.strip_prefix('\'') {
        let (value, remainder) = take_single_quoted(rest)?;
        ensure_only_comment(remainder, "single")?;
        Ok(value)
    } else {
        let value = trimmed.split('#').next().unwrap_or_default().trim_end();
        Ok(value.to_string())
    }
}

fn ensure_only_comment(remainder: &str, kind: &str) -> Result<(), String> {
    let remainder = remainder.trim();
    if remainder.is_empty() || remainder.starts_with('#') {
        Ok(())
    } else {
        Err(format!("unexpected characters after closing {} quote", kind))
    }
}

/// Reads up to the closing `"`; returns the unescaped value and the rest of
/// the input after the quote.
pub fn take_double_quoted(input: &str) -> Result<(String, &str), String> {
    let mut result = String::new();
    let mut escape = false;

    for (pos, ch) in input.char_indices() {
        if escape {
            result.push(match ch {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' => return Ok((result, &input[pos + 1..])),
            other => result.push(other),
        }
    }

    if escape {
        Err("unterminated escape sequence in double-quoted value".to_string())
    } else {
        Err("unterminated double-quoted value".to_string())
    }
}

pub fn take_single_quoted(input: &str) -> Result<(String, &str), String> {
    match input.find('\'') {
        Some(pos) => Ok((input[..pos].to_string(), &input[pos + 1..])),
        None => Err("unterminated single-quoted value".to_string()),
    }
}

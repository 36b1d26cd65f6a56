//! Parsing of the flat keyed files of a snapshot tree.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::ProviderError;

/// Reads the file at `path` into a `String`.
pub fn read_file(path: &Path) -> Result<String, ProviderError> {
    fs::read_to_string(path).map_err(|e| ProviderError::io(path, e))
}

/// Parses a single `u64` value from `content`.
pub fn parse_single_u64(content: &str) -> io::Result<u64> {
    content
        .trim_ascii_end()
        .parse()
        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))
}

/// Key-value pairs of a flat keyed file.
///
/// # Input format
/// ```text
/// key 123
/// other -4
/// list 1 2 3
/// ```
///
/// Empty lines and lines that do not contain a key and a value, separated by a space, are ignored.
/// If a key appears more than once, the last value wins.
pub struct KeyedContent<'a> {
    path: PathBuf,
    entries: FxHashMap<&'a str, &'a str>,
}

impl<'a> KeyedContent<'a> {
    /// Parses `content`, which has been read from `path`.
    ///
    /// The path is only used in error messages.
    pub fn parse(path: impl Into<PathBuf>, content: &'a str) -> Self {
        let mut entries = FxHashMap::with_capacity_and_hasher(16, FxBuildHasher);
        for line in content.lines() {
            if let Some((key, value)) = line.split_once(' ') {
                entries.insert(key, value.trim());
            }
        }
        Self {
            path: path.into(),
            entries,
        }
    }

    /// Gets the value of `key`, if present.
    pub fn get_opt<T: FromStr>(&self, key: &str) -> Result<Option<T>, ProviderError> {
        match self.entries.get(key) {
            Some(value) => self.parse_value(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Gets the value of `key`, which must be present.
    pub fn get<T: FromStr>(&self, key: &str) -> Result<T, ProviderError> {
        self.get_opt(key)?.ok_or_else(|| ProviderError::MissingKey {
            path: self.path.clone(),
            key: key.to_owned(),
        })
    }

    /// Gets a boolean flag: any non-zero integer is `true`.
    pub fn flag(&self, key: &str) -> Result<bool, ProviderError> {
        self.get::<i64>(key).map(|v| v != 0)
    }

    /// Gets a list of space-separated values.
    pub fn list<T: FromStr>(&self, key: &str) -> Result<Vec<T>, ProviderError> {
        let raw = self.entries.get(key).ok_or_else(|| ProviderError::MissingKey {
            path: self.path.clone(),
            key: key.to_owned(),
        })?;
        raw.split_ascii_whitespace()
            .map(|v| self.parse_value(key, v))
            .collect()
    }

    fn parse_value<T: FromStr>(&self, key: &str, value: &str) -> Result<T, ProviderError> {
        value.parse().map_err(|_| ProviderError::InvalidValue {
            path: self.path.clone(),
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }
}

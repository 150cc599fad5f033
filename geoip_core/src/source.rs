//! Data sources feeding [`IpManager`](crate::manager::IpManager).

use crate::config::SourceConfig;
use crate::constants::UNKNOWN_CODE;
use crate::errors::FetchError;
use crate::range::IntoCidr;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ordered `(cidr, payload)` pairs. Order only matters for identical prefixes (last wins).
pub type Dataset<C, T> = Vec<(C, T)>;

pub trait DataSource {
    type Cidr: IntoCidr;
    type Payload;

    fn fetch(&self) -> Result<Dataset<Self::Cidr, Self::Payload>, FetchError>;
}

/// A fixed in-memory table.
#[derive(Debug, Clone)]
pub struct StaticSource<C, T> {
    entries: Dataset<C, T>,
}

impl<C, T> StaticSource<C, T> {
    pub fn new(entries: Dataset<C, T>) -> Self {
        Self { entries }
    }
}

impl<C, T> FromIterator<(C, T)> for StaticSource<C, T> {
    fn from_iter<I: IntoIterator<Item = (C, T)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<C: IntoCidr + Clone, T: Clone> DataSource for StaticSource<C, T> {
    type Cidr = C;
    type Payload = T;

    fn fetch(&self) -> Result<Dataset<C, T>, FetchError> {
        Ok(self.entries.clone())
    }
}

/// Directory of per-country list files, one CIDR per line.
///
/// The payload of every line is taken from the file name: the part before the
/// first `-`, upper-cased (`cn-aggregated.txt` → `CN`). Blank lines and
/// comment lines are skipped. Subdirectories are walked too.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    config: SourceConfig,
}

impl DirectorySource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::from_config(SourceConfig::new(directory))
    }

    pub fn from_config(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Data files under the configured directory, siblings in file-name order.
    /// Symlinks are not followed, so a link back up the tree cannot loop.
    fn collect_files(&self) -> Result<Vec<PathBuf>, FetchError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.config.directory).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let at = e
                    .path()
                    .unwrap_or(self.config.directory.as_path())
                    .display()
                    .to_string();
                FetchError::with_source(format!("cannot walk {at}"), e)
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == self.config.extension.as_str())
            {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }

    fn read_file(&self, path: &Path, out: &mut Dataset<String, String>) -> Result<(), FetchError> {
        let text = fs::read_to_string(path).map_err(|e| {
            FetchError::with_source(format!("cannot read {}", path.display()), e)
        })?;
        let code = country_code(path);
        let before = out.len();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(self.config.comment_prefix.as_str()) {
                continue;
            }
            out.push((line.to_owned(), code.clone()));
        }
        debug!(
            "[FETCH] {} -> {} entries for {}",
            path.display(),
            out.len() - before,
            code
        );
        Ok(())
    }
}

impl DataSource for DirectorySource {
    type Cidr = String;
    type Payload = String;

    fn fetch(&self) -> Result<Dataset<String, String>, FetchError> {
        let files = self.collect_files()?;

        let mut dataset = Vec::new();
        for path in &files {
            self.read_file(path, &mut dataset)?;
        }
        info!(
            "[FETCH] {} entries from {} file(s) under {}",
            dataset.len(),
            files.len(),
            self.config.directory.display()
        );
        Ok(dataset)
    }
}

/// `cn-aggregated.txt` → `CN`, `us.txt` → `US`.
pub fn country_code(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match stem.split('-').next() {
        Some(code) if !code.is_empty() => code.to_uppercase(),
        _ => UNKNOWN_CODE.to_owned(),
    }
}

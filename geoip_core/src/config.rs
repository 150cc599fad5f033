//! Configuration for the file-backed data source

use crate::constants::{
    COMMENT_PREFIX, DEFAULT_DATA_EXT, ENV_COMMENT_PREFIX, ENV_DATA_DIR, ENV_DATA_EXT, ENV_PREFIX,
};
use crate::errors::FetchError;
use ::config::{Config, Environment};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Root directory walked for data files.
    pub directory: PathBuf,
    /// File extension (without the dot) of data files.
    pub extension: String,
    /// Lines starting with this prefix are skipped.
    pub comment_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            extension: DEFAULT_DATA_EXT.to_owned(),
            comment_prefix: COMMENT_PREFIX.to_owned(),
        }
    }
}

impl SourceConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Layer `GEOIP_*` environment variables over the defaults.
    ///
    /// `GEOIP_DATA_DIR` is required; `GEOIP_DATA_EXT` and
    /// `GEOIP_COMMENT_PREFIX` fall back to `txt` and `#`.
    pub fn from_env() -> Result<Self, FetchError> {
        let settings = Config::builder()
            .set_default("data_ext", DEFAULT_DATA_EXT)
            .and_then(|b| b.set_default("comment_prefix", COMMENT_PREFIX))
            .map_err(|e| FetchError::with_source("invalid config defaults", e))?
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| FetchError::with_source("cannot load configuration", e))?;

        let directory = settings
            .get_string("data_dir")
            .map_err(|e| FetchError::with_source(format!("{ENV_DATA_DIR} is not set"), e))?;
        let extension = settings
            .get_string("data_ext")
            .map_err(|e| FetchError::with_source(format!("invalid {ENV_DATA_EXT}"), e))?;
        let comment_prefix = settings
            .get_string("comment_prefix")
            .map_err(|e| FetchError::with_source(format!("invalid {ENV_COMMENT_PREFIX}"), e))?;

        let extension = extension.trim().trim_start_matches('.');
        Ok(Self {
            directory: PathBuf::from(directory),
            extension: if extension.is_empty() {
                DEFAULT_DATA_EXT.to_owned()
            } else {
                extension.to_owned()
            },
            comment_prefix,
        })
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tally_engine::{MatchParams, ParamsError};
use tally_import::LedgerProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Optional overrides for one ledger's [`LedgerProfile`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerSection {
    pub id_column: Option<String>,
    pub date_column: Option<String>,
    pub amount_column: Option<String>,
    pub vendor_column: Option<String>,
    pub date_format: Option<String>,
    pub day_first: Option<bool>,
    pub delimiter: Option<char>,
}

impl LedgerSection {
    fn apply(self, base: LedgerProfile) -> LedgerProfile {
        LedgerProfile {
            id_column: self.id_column.unwrap_or(base.id_column),
            date_column: self.date_column.unwrap_or(base.date_column),
            amount_column: self.amount_column.unwrap_or(base.amount_column),
            vendor_column: self.vendor_column.unwrap_or(base.vendor_column),
            date_format: self.date_format.or(base.date_format),
            day_first: self.day_first.unwrap_or(base.day_first),
            delimiter: self.delimiter.unwrap_or(base.delimiter),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    matching: MatchParams,
    internal: LedgerSection,
    bank: LedgerSection,
}

/// Effective configuration after defaults and file values are merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    pub matching: MatchParams,
    pub internal: LedgerProfile,
    pub bank: LedgerProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matching: MatchParams::default(),
            internal: LedgerProfile::internal(),
            bank: LedgerProfile::bank(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = Self {
            matching: file.matching,
            internal: file.internal.apply(LedgerProfile::internal()),
            bank: file.bank.apply(LedgerProfile::bank()),
        };
        config.matching.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

//! Policy store configuration

use serde::Deserialize;

use crate::error::{CalcError, Result};

/// Environment variable overriding the store path
pub const DB_PATH_ENV: &str = "POLICYCALC_DB";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
    pub map_size: usize,
    pub max_dbs: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: "policycalc.mdb".into(),
            map_size: 1 << 30,
            max_dbs: 4,
        }
    }
}

impl StoreConfig {
    pub fn with_path(path: &str) -> Self {
        StoreConfig { path: path.to_string(), ..Default::default() }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: StoreConfig = serde_json::from_str(s).map_err(|e| CalcError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults, with the path taken from `POLICYCALC_DB` when set
    pub fn from_env() -> Self {
        match std::env::var(DB_PATH_ENV) {
            Ok(p) if !p.is_empty() => Self::with_path(&p),
            _ => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(CalcError::Config("path is empty".into()));
        }
        // policies, ids, hidden, meta
        if self.max_dbs < 4 {
            return Err(CalcError::Config(format!("max_dbs {} < 4", self.max_dbs)));
        }
        if self.map_size == 0 {
            return Err(CalcError::Config("map_size is 0".into()));
        }
        Ok(())
    }
}

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::SprigError;
use crate::options::SessionOptions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SprigConfig {
    pub version: Option<u32>,
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    pub qualname: Option<String>,
    pub max_expansion_steps: Option<usize>,
    pub allow_pickle: Option<bool>,
    pub source_name: Option<String>,
    pub globals: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct SprigConfigLoad {
    pub config: SprigConfig,
    pub warnings: Vec<String>,
}

pub fn load_config_str(src: &str) -> Result<SprigConfigLoad, SprigError> {
    let value: toml::Value =
        toml::from_str(src).map_err(|e| SprigError::config(e.to_string()))?;
    let warnings = collect_unknown_keys(&value);
    let config: SprigConfig = value
        .try_into()
        .map_err(|e: toml::de::Error| SprigError::config(e.to_string()))?;
    config.validate()?;
    Ok(SprigConfigLoad { config, warnings })
}

pub fn load_config_path(path: &Path) -> Result<SprigConfigLoad, SprigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        SprigError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    load_config_str(&content).map_err(|err| err.with_source_name(Some(path.display().to_string())))
}

impl SprigConfig {
    pub fn apply(&self, options: &mut SessionOptions) -> Result<(), SprigError> {
        self.validate()?;
        let Some(session) = &self.session else {
            return Ok(());
        };
        if let Some(qualname) = &session.qualname {
            options.qualname = qualname.clone();
        }
        if let Some(steps) = session.max_expansion_steps {
            options.max_expansion_steps = steps;
        }
        if let Some(allow) = session.allow_pickle {
            options.allow_pickle = allow;
        }
        if let Some(name) = &session.source_name {
            options.source_name = Some(name.clone());
        }
        if let Some(globals) = &session.globals {
            for name in globals {
                if !options.globals.contains(name) {
                    options.globals.push(name.clone());
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), SprigError> {
        if let Some(version) = self.version {
            if version != 1 {
                return Err(SprigError::config(format!(
                    "unsupported config version: {}",
                    version
                )));
            }
        }
        if let Some(session) = &self.session {
            if session.qualname.as_deref().is_some_and(|q| q.trim().is_empty()) {
                return Err(SprigError::config("session.qualname must not be empty"));
            }
            if session.max_expansion_steps == Some(0) {
                return Err(SprigError::config(
                    "session.max_expansion_steps must be positive",
                ));
            }
        }
        Ok(())
    }
}

fn collect_unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(table) = value.as_table() else {
        return warnings;
    };
    for key in table.keys() {
        if !["version", "session"].contains(&key.as_str()) {
            warnings.push(format!("unknown key: {}", key));
        }
    }
    collect_unknown_keys_table(
        table,
        "session",
        &[
            "qualname",
            "max_expansion_steps",
            "allow_pickle",
            "source_name",
            "globals",
        ],
        &mut warnings,
    );
    warnings
}

fn collect_unknown_keys_table(
    table: &toml::value::Table,
    name: &str,
    allowed: &[&str],
    warnings: &mut Vec<String>,
) {
    let Some(subtable) = table.get(name).and_then(toml::Value::as_table) else {
        return;
    };
    for key in subtable.keys() {
        if !allowed.contains(&key.as_str()) {
            warnings.push(format!("unknown key: {}.{}", name, key));
        }
    }
}

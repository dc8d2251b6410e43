use std::env;

pub const DEFAULT_QUALNAME: &str = "__main__";
pub const DEFAULT_MAX_EXPANSION_STEPS: usize = 1000;

fn env_flag(name: &str) -> bool {
    let Ok(value) = env::var(name) else {
        return false;
    };
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_usize(name: &str) -> Option<usize> {
    let value = env::var(name).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a count", name, value);
            None
        }
    }
}

pub fn max_expansion_from_env() -> usize {
    env_usize("SPRIG_MAX_EXPANSION").unwrap_or(DEFAULT_MAX_EXPANSION_STEPS)
}

pub fn qualname_from_env() -> String {
    env::var("SPRIG_QUALNAME")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_QUALNAME.to_string())
}

pub fn no_pickle_from_env() -> bool {
    env_flag("SPRIG_NO_PICKLE")
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    pub qualname: String,
    pub max_expansion_steps: usize,
    /// When false, quoting a value without a literal is a compile error
    /// instead of a pickle fallback.
    pub allow_pickle: bool,
    pub source_name: Option<String>,
    pub globals: Vec<String>,
}

impl SessionOptions {
    pub fn with_qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = qualname.into();
        self
    }

    pub fn with_source_name(mut self, name: Option<String>) -> Self {
        self.source_name = name;
        self
    }

    pub fn with_max_expansion_steps(mut self, steps: usize) -> Self {
        self.max_expansion_steps = steps;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            qualname: qualname_from_env(),
            max_expansion_steps: max_expansion_from_env(),
            allow_pickle: !no_pickle_from_env(),
            source_name: None,
            globals: Vec::new(),
        }
    }
}

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::ast::Form;
use crate::error::SprigError;
use crate::munger::{force_munge, munge};

/// A compile-time callable: receives unevaluated argument forms and returns
/// the replacement form. Tags share the same shape with `[primary, extras..]`.
pub type MacroFn = Arc<dyn Fn(&[Form]) -> Result<Form, SprigError> + Send + Sync>;

pub const MACRO_NS: &str = "_macro_";
pub const TAG_SUFFIX: &str = "QzHASH_";
pub const QUALIFIER: &str = "..";

pub fn macro_fn<F>(f: F) -> MacroFn
where
    F: Fn(&[Form]) -> Result<Form, SprigError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn split_qualified(text: &str) -> Option<(&str, &str)> {
    let (module, path) = text.split_once(QUALIFIER)?;
    if module.is_empty() || path.is_empty() {
        return None;
    }
    Some((module, path))
}

#[derive(Clone)]
pub struct Namespace {
    name: String,
    macros: HashMap<String, MacroFn>,
    attrs: HashMap<String, MacroFn>,
    globals: BTreeSet<String>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            macros: HashMap::new(),
            attrs: HashMap::new(),
            globals: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn define_macro(&mut self, name: &str, f: MacroFn) {
        let key = munge(name);
        log::debug!("define macro {}..{}.{}", self.name, MACRO_NS, key);
        self.macros.insert(key, f);
    }

    pub fn define_macro_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Form]) -> Result<Form, SprigError> + Send + Sync + 'static,
    {
        self.define_macro(name, macro_fn(f));
    }

    pub fn define_tag(&mut self, name: &str, f: MacroFn) {
        let key = format!("{}{}", force_munge(name), TAG_SUFFIX);
        log::debug!("define tag {}..{}.{}", self.name, MACRO_NS, key);
        self.macros.insert(key, f);
    }

    pub fn define_attr(&mut self, path: &str, f: MacroFn) {
        self.attrs.insert(munge(path), f);
    }

    pub fn define_global(&mut self, name: &str) {
        self.globals.insert(munge(name));
    }

    pub fn remove_macro(&mut self, name: &str) -> Option<MacroFn> {
        self.macros.remove(&munge(name))
    }

    pub fn macro_fn(&self, munged: &str) -> Option<&MacroFn> {
        self.macros.get(munged)
    }

    pub fn has_macro(&self, munged: &str) -> bool {
        self.macros.contains_key(munged)
    }

    pub fn attr(&self, munged_path: &str) -> Option<&MacroFn> {
        self.attrs.get(munged_path)
    }

    pub fn is_global(&self, munged: &str) -> bool {
        self.globals.contains(munged)
    }

    pub fn macro_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("macros", &self.macro_names())
            .field("globals", &self.globals)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ModuleTable {
    modules: HashMap<String, Namespace>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleTable {
    pub fn new() -> Self {
        let mut modules = HashMap::new();
        let builtins = crate::builtins::builtins_namespace();
        modules.insert(builtins.name().to_string(), builtins);
        Self { modules }
    }

    pub fn get(&self, module: &str) -> Option<&Namespace> {
        self.modules.get(module)
    }

    pub fn ensure(&mut self, module: &str) -> &mut Namespace {
        self.modules
            .entry(module.to_string())
            .or_insert_with(|| Namespace::new(module))
    }

    pub fn macro_fn(&self, module: &str, munged: &str) -> Option<&MacroFn> {
        self.get(module)?.macro_fn(munged)
    }

    pub fn resolve_qualified(&self, qualified: &str) -> Result<&MacroFn, SprigError> {
        let (module, path) =
            split_qualified(qualified).ok_or_else(|| SprigError::resolve(qualified))?;
        let namespace = self
            .get(module)
            .ok_or_else(|| SprigError::resolve(qualified))?;
        let found = match path
            .strip_prefix(MACRO_NS)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            Some(name) => namespace.macro_fn(name),
            None => namespace.attr(path),
        };
        found.ok_or_else(|| SprigError::resolve(qualified))
    }
}

use crate::ast::{Form, Serialized};
use crate::compiler::Compiler;
use crate::config::SprigConfig;
use crate::error::SprigError;
use crate::expander::Expander;
use crate::namespace::{MacroFn, ModuleTable, Namespace};
use crate::options::SessionOptions;
use crate::reader::Reader;

#[derive(Debug)]
pub struct TranspileReport {
    pub code: String,
    pub forms: usize,
    pub error: Option<SprigError>,
    pub fallbacks: Vec<Serialized>,
}

impl TranspileReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct Session {
    pub(crate) modules: ModuleTable,
    pub(crate) options: SessionOptions,
    pub(crate) template_counter: u64,
    pub(crate) fallbacks: Vec<Serialized>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        let mut modules = ModuleTable::new();
        let active = modules.ensure(&options.qualname);
        for name in &options.globals {
            active.define_global(name);
        }
        Self {
            modules,
            options,
            template_counter: 0,
            fallbacks: Vec::new(),
        }
    }

    pub fn from_config(config: &SprigConfig) -> Result<Self, SprigError> {
        let mut options = SessionOptions::default();
        config.apply(&mut options)?;
        Ok(Self::with_options(options))
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn qualname(&self) -> &str {
        &self.options.qualname
    }

    pub fn set_qualname(&mut self, qualname: impl Into<String>) {
        self.options.qualname = qualname.into();
        self.modules.ensure(&self.options.qualname);
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleTable {
        &mut self.modules
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.modules.get(&self.options.qualname)
    }

    pub fn namespace_mut(&mut self) -> &mut Namespace {
        self.modules.ensure(&self.options.qualname)
    }

    pub fn define_macro(&mut self, name: &str, f: MacroFn) {
        self.namespace_mut().define_macro(name, f);
    }

    pub fn define_tag(&mut self, name: &str, f: MacroFn) {
        self.namespace_mut().define_tag(name, f);
    }

    pub fn define_global(&mut self, name: &str) {
        self.namespace_mut().define_global(name);
    }

    pub fn template_counter(&self) -> u64 {
        self.template_counter
    }

    pub fn fallbacks(&self) -> &[Serialized] {
        &self.fallbacks
    }

    pub fn take_fallbacks(&mut self) -> Vec<Serialized> {
        std::mem::take(&mut self.fallbacks)
    }

    pub fn reader<'s>(&'s mut self, source: &str) -> Reader<'s> {
        Reader::new(self, source)
    }

    pub fn read(&mut self, source: &str) -> Result<Vec<Form>, SprigError> {
        self.reader(source).read_all()
    }

    pub fn compile(&mut self, form: &Form) -> Result<String, SprigError> {
        let mut compiler = Compiler::new(&self.modules, &self.options.qualname, &self.options);
        let code = compiler
            .compile_form(form)
            .map_err(|err| err.with_source_name(self.options.source_name.clone()))?;
        self.fallbacks.extend(compiler.into_fallbacks());
        Ok(code)
    }

    fn expander(&self) -> Expander<'_> {
        Expander::new(
            &self.modules,
            &self.options.qualname,
            self.options.max_expansion_steps,
        )
    }

    pub fn macroexpand1(&self, form: Form) -> Result<(Form, bool), SprigError> {
        self.expander().macroexpand1(form)
    }

    pub fn macroexpand(&self, form: Form) -> Result<Form, SprigError> {
        self.expander().macroexpand(form)
    }

    pub fn expand_all(&self, form: Form) -> Result<Form, SprigError> {
        self.expander().expand_all(form)
    }

    pub fn transpile(&mut self, source: &str) -> Result<String, SprigError> {
        let report = self.transpile_report(source);
        match report.error {
            Some(err) => Err(err),
            None => Ok(report.code),
        }
    }

    /// Reads and compiles form by form. Forms compiled before an error are
    /// kept in the report.
    pub fn transpile_report(&mut self, source: &str) -> TranspileReport {
        let before = self.fallbacks.len();
        let mut chunks = Vec::new();
        let mut error = None;
        {
            let mut reader = self.reader(source);
            while let Some(next) = reader.next() {
                match next.and_then(|form| reader.compile(&form)) {
                    Ok(code) => chunks.push(code),
                    Err(err) => {
                        error = Some(err);
                        break;
                    }
                }
            }
        }
        if let Some(err) = &error {
            log::debug!("transpile stopped after {} form(s): {}", chunks.len(), err);
        }
        let mut code = chunks.join("\n\n");
        if !code.is_empty() {
            code.push('\n');
        }
        TranspileReport {
            code,
            forms: chunks.len(),
            error,
            fallbacks: self.fallbacks[before..].to_vec(),
        }
    }
}

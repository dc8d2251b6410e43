use sha2::{Digest, Sha256};

use crate::ast::{is_control_word, Atom, Form, Unquote, POSITIONAL, SEPARATOR, UNPACK};
use crate::builtins::{is_builtin, BUILTINS_MODULE};
use crate::error::SprigError;
use crate::munger::is_identifier_path;
use crate::namespace::{ModuleTable, QUALIFIER};

pub const MAYBE: &str = "QzMaybe_";
pub const GENSYM_PREFIX: &str = "_Qz";

const BASE32: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Generated-symbol name for `name`. Depends only on its arguments.
pub fn gensym(name: &str, source: &str, qualname: &str, counter: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(qualname.as_bytes());
    hasher.update([0u8]);
    hasher.update(counter.to_string().as_bytes());
    let digest = hasher.finalize();
    format!("{}{}__{}", GENSYM_PREFIX, base32_40(&digest[..5]), name)
}

fn base32_40(bytes: &[u8]) -> String {
    let bits = bytes
        .iter()
        .take(5)
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    (0..8)
        .rev()
        .map(|idx| BASE32[((bits >> (idx * 5)) & 0x1f) as usize] as char)
        .collect()
}

pub fn is_gensym(symbol: &str) -> bool {
    symbol.starts_with(GENSYM_PREFIX)
}

pub struct Template<'a> {
    qualname: &'a str,
    modules: &'a ModuleTable,
}

impl<'a> Template<'a> {
    pub fn new(qualname: &'a str, modules: &'a ModuleTable) -> Self {
        Self { qualname, modules }
    }

    fn is_known_macro(&self, symbol: &str) -> bool {
        self.modules
            .get(self.qualname)
            .is_some_and(|ns| ns.has_macro(symbol))
    }

    fn is_module_global(&self, symbol: &str) -> bool {
        self.modules
            .get(self.qualname)
            .is_some_and(|ns| ns.is_global(symbol))
    }

    pub fn qualify(&self, symbol: &str, invocation: bool) -> String {
        if !is_qualifiable(symbol) {
            return symbol.to_string();
        }
        let macro_head = invocation && self.is_known_macro(symbol);
        if !macro_head && is_builtin(symbol) && !self.is_module_global(symbol) {
            return format!("{}{}{}", BUILTINS_MODULE, QUALIFIER, symbol);
        }
        if macro_head || (invocation && !symbol.contains('.')) {
            return format!("{}{}{}.{}", self.qualname, QUALIFIER, MAYBE, symbol);
        }
        format!("{}{}{}", self.qualname, QUALIFIER, symbol)
    }

    pub fn quasiquote(&self, form: Form) -> Result<Form, SprigError> {
        self.template(form, false)
    }

    fn template(&self, form: Form, invocation: bool) -> Result<Form, SprigError> {
        match form {
            Form::Tuple(items) if !items.is_empty() => self.template_tuple(items),
            Form::Atom(Atom::Unquote(Unquote { splice, .. })) => {
                let mark = if splice { ",@" } else { "," };
                Err(SprigError::parse(format!(
                    "unquote {} outside of a tuple in a template",
                    mark
                )))
            }
            Form::Atom(Atom::Str(text)) if !is_control_word(&text) => {
                Ok(Form::quote(Form::str(self.qualify(&text, invocation))))
            }
            other => Ok(other),
        }
    }

    fn template_tuple(&self, items: Vec<Form>) -> Result<Form, SprigError> {
        let mut out = Vec::with_capacity(items.len() * 2 + 2);
        out.push(Form::str(""));
        out.push(Form::str(SEPARATOR));
        for (idx, item) in items.into_iter().enumerate() {
            match item {
                Form::Atom(Atom::Unquote(Unquote { splice, form })) => {
                    out.push(Form::str(if splice { UNPACK } else { POSITIONAL }));
                    out.push(*form);
                }
                other => {
                    out.push(Form::str(POSITIONAL));
                    out.push(self.template(other, idx == 0)?);
                }
            }
        }
        Ok(Form::Tuple(out))
    }
}

fn is_qualifiable(symbol: &str) -> bool {
    !(is_control_word(symbol)
        || symbol.starts_with('.')
        || symbol.ends_with('.')
        || symbol.contains(QUALIFIER)
        || matches!(symbol, "quote" | "lambda" | "__import__")
        || is_gensym(symbol)
        || !is_identifier_path(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_macro(module: &str, name: &str) -> ModuleTable {
        let mut table = ModuleTable::new();
        table
            .ensure(module)
            .define_macro_fn(name, |args| Ok(args[0].clone()));
        table
    }

    #[test]
    fn qualification_rules() {
        let table = table_with_macro("demo", "when");
        let t = Template::new("demo", &table);
        assert_eq!(t.qualify("when", true), "demo..QzMaybe_.when");
        assert_eq!(t.qualify("when", false), "demo..when");
        assert_eq!(t.qualify("print", true), "builtins..print");
        assert_eq!(t.qualify("frobnicate", true), "demo..QzMaybe_.frobnicate");
        assert_eq!(t.qualify("os.path", true), "demo..os.path");
        assert_eq!(t.qualify("x", false), "demo..x");
        for skipped in [":kw", ".method", "math.", "a..b", "quote", "lambda", "__import__"] {
            assert_eq!(t.qualify(skipped, true), skipped);
        }
    }

    #[test]
    fn module_globals_shadow_builtins() {
        let mut table = ModuleTable::new();
        table.ensure("demo").define_global("print");
        let t = Template::new("demo", &table);
        assert_eq!(t.qualify("print", false), "demo..print");
    }

    #[test]
    fn tuple_becomes_a_tuple_display() {
        let table = ModuleTable::new();
        let t = Template::new("demo", &table);
        let form = Form::tuple(vec![
            Form::str("f"),
            Form::str(":k"),
            Form::Atom(Atom::Unquote(Unquote {
                splice: true,
                form: Box::new(Form::str("xs")),
            })),
        ]);
        let expected = Form::tuple(vec![
            Form::str(""),
            Form::str(":"),
            Form::str(":?"),
            Form::quote(Form::str("demo..QzMaybe_.f")),
            Form::str(":?"),
            Form::str(":k"),
            Form::str(":*"),
            Form::str("xs"),
        ]);
        assert_eq!(t.quasiquote(form).unwrap(), expected);
    }

    #[test]
    fn bare_unquote_is_rejected() {
        let table = ModuleTable::new();
        let t = Template::new("demo", &table);
        let form = Form::Atom(Atom::Unquote(Unquote {
            splice: false,
            form: Box::new(Form::str("x")),
        }));
        assert!(matches!(t.quasiquote(form), Err(SprigError::Parse { .. })));
    }

    #[test]
    fn gensyms_are_reproducible() {
        let a = gensym("x", "`(a $#x)", "demo", 1);
        assert_eq!(a, gensym("x", "`(a $#x)", "demo", 1));
        assert_ne!(a, gensym("x", "`(a $#x)", "demo", 2));
        assert_ne!(a, gensym("x", "`(a $#x)", "other", 1));
        assert!(a.starts_with("_Qz"));
        assert!(a.ends_with("__x"));
        assert_eq!(a.len(), "_Qz".len() + 8 + "__x".len());
        assert!(is_gensym(&a));
    }

    #[test]
    fn base32_of_known_bytes() {
        assert_eq!(base32_40(&[0, 0, 0, 0, 0]), "AAAAAAAA");
        assert_eq!(base32_40(&[0xff; 5]), "77777777");
    }
}

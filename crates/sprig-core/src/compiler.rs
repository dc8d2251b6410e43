use crate::ast::{
    is_control_word, value_repr, Atom, Form, Serialized, POSITIONAL, POSITIONAL_ONLY, SEPARATOR,
    UNPACK, UNPACK_MAP,
};
use crate::error::SprigError;
use crate::expander::{Expander, Head, SpecialForm};
use crate::literal::{complex_literal, float_literal, py_bytes_repr, py_str_repr};
use crate::munger::is_identifier_path;
use crate::namespace::{split_qualified, ModuleTable};
use crate::options::SessionOptions;
use crate::pickle;
use crate::template::MAYBE;

const INDENT: usize = 2;

fn indent_rest(code: &str, width: usize) -> String {
    code.replace('\n', &format!("\n{}", " ".repeat(width)))
}

fn compile_err<T>(message: impl Into<String>) -> Result<T, SprigError> {
    Err(SprigError::compile(message))
}

#[derive(Debug, Default)]
struct Args {
    items: Vec<String>,
    has_keywords: bool,
}

pub struct Compiler<'a> {
    modules: &'a ModuleTable,
    qualname: &'a str,
    options: &'a SessionOptions,
    fallbacks: Vec<Serialized>,
}

impl<'a> Compiler<'a> {
    pub fn new(modules: &'a ModuleTable, qualname: &'a str, options: &'a SessionOptions) -> Self {
        Self {
            modules,
            qualname,
            options,
            fallbacks: Vec::new(),
        }
    }

    pub fn fallbacks(&self) -> &[Serialized] {
        &self.fallbacks
    }

    pub fn into_fallbacks(self) -> Vec<Serialized> {
        self.fallbacks
    }

    fn expander(&self) -> Expander<'a> {
        Expander::new(self.modules, self.qualname, self.options.max_expansion_steps)
    }

    pub fn compile_module(&mut self, forms: &[Form]) -> Result<String, SprigError> {
        let mut chunks = Vec::with_capacity(forms.len());
        for form in forms {
            chunks.push(self.compile_form(form)?);
        }
        let mut out = chunks.join("\n\n");
        out.push('\n');
        Ok(out)
    }

    pub fn compile_form(&mut self, form: &Form) -> Result<String, SprigError> {
        match form {
            Form::Tuple(items) if items.is_empty() => Ok("()".to_string()),
            Form::Tuple(_) => self.tuple(form),
            Form::Atom(atom) => self.atom(atom),
        }
    }

    fn tuple(&mut self, form: &Form) -> Result<String, SprigError> {
        let expander = self.expander();
        let expanded = expander.macroexpand(form.clone())?;
        let Form::Tuple(items) = &expanded else {
            return self.compile_form(&expanded);
        };
        if items.is_empty() {
            return Ok("()".to_string());
        }
        match expander.classify(&expanded)? {
            Head::Special(SpecialForm::Quote) => self.quote_form(&items[1..]),
            Head::Special(SpecialForm::Lambda) => self.lambda(&items[1..]),
            _ => self.call(items),
        }
    }

    fn quote_form(&mut self, args: &[Form]) -> Result<String, SprigError> {
        match args {
            [form] => self.quoted(form),
            _ => compile_err(format!("quote takes exactly one form, got {}", args.len())),
        }
    }

    pub fn quoted(&mut self, form: &Form) -> Result<String, SprigError> {
        match form {
            Form::Tuple(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.quoted(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match parts.len() {
                    0 => "()".to_string(),
                    1 => format!("({},)", parts[0]),
                    _ => format!("({})", parts.join(", ")),
                })
            }
            Form::Atom(Atom::Str(text)) => Ok(py_str_repr(text)),
            Form::Atom(atom) => self.atom(atom),
        }
    }

    fn atom(&mut self, atom: &Atom) -> Result<String, SprigError> {
        match atom {
            Atom::None => Ok("None".to_string()),
            Atom::Ellipsis => Ok("...".to_string()),
            Atom::Bool(true) => Ok("True".to_string()),
            Atom::Bool(false) => Ok("False".to_string()),
            Atom::Int(n) => Ok(n.to_string()),
            Atom::Float(x) => match float_literal(*x) {
                Some(code) => Ok(code),
                None => self.fallback(&Form::Atom(atom.clone())),
            },
            Atom::Complex { re, im } => match complex_literal(*re, *im) {
                Some(code) => Ok(code),
                None => self.fallback(&Form::Atom(atom.clone())),
            },
            Atom::Str(text) => Ok(self.symbol(text)),
            Atom::Bytes(bytes) => Ok(py_bytes_repr(bytes)),
            Atom::List(items) => {
                let parts = self.quoted_all(items)?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            Atom::Set(items) if items.is_empty() => Ok("set()".to_string()),
            Atom::Set(items) => {
                let parts = self.quoted_all(items)?;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            Atom::Dict(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    parts.push(format!("{}: {}", self.quoted(key)?, self.quoted(value)?));
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            Atom::Serialized(ser) => self.emit_payload(ser.clone()),
            Atom::Unquote(unquote) => compile_err(format!(
                "unquote {} outside of a template",
                if unquote.splice { ",@" } else { "," }
            )),
        }
    }

    fn quoted_all(&mut self, items: &[Form]) -> Result<Vec<String>, SprigError> {
        items.iter().map(|item| self.quoted(item)).collect()
    }

    fn fallback(&mut self, form: &Form) -> Result<String, SprigError> {
        let ser = Serialized {
            repr: value_repr(form),
            payload: pickle::dumps(form),
        };
        self.emit_payload(ser)
    }

    fn emit_payload(&mut self, ser: Serialized) -> Result<String, SprigError> {
        if !self.options.allow_pickle {
            return compile_err(format!("{} has no literal form", ser.repr));
        }
        log::warn!("{} has no literal form; emitting a pickle payload", ser.repr);
        let code = format!(
            "__import__('pickle').loads(  # {}\n    {}\n)",
            ser.repr.replace('\n', " "),
            py_bytes_repr(&ser.payload)
        );
        self.fallbacks.push(ser);
        Ok(code)
    }

    fn symbol(&self, text: &str) -> String {
        if is_control_word(text) {
            return py_str_repr(text);
        }
        if let Some((module, path)) = split_qualified(text) {
            let path = path
                .strip_prefix(MAYBE)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(path);
            if is_identifier_path(module) && is_identifier_path(path) {
                if module == self.qualname {
                    return path.to_string();
                }
                return format!("{}.{}", import_expr(module), path);
            }
            return text.to_string();
        }
        if let Some(module) = text.strip_suffix('.') {
            if is_identifier_path(module) {
                return import_expr(module);
            }
        }
        text.to_string()
    }

    fn call(&mut self, items: &[Form]) -> Result<String, SprigError> {
        let head = &items[0];
        let rest = &items[1..];
        match head.as_str() {
            Some("") => self.tuple_display(rest),
            Some(".") => compile_err("a bare . is not a method name"),
            Some(name) if name.len() > 1 && name.starts_with('.') && !name.starts_with("..") => {
                self.method_call(&name[1..], rest)
            }
            _ => {
                let callee = self.compile_form(head)?;
                let args = self.args(rest)?;
                Ok(format_call(&callee, &args.items))
            }
        }
    }

    fn method_call(&mut self, name: &str, rest: &[Form]) -> Result<String, SprigError> {
        let Some((receiver, args)) = rest.split_first() else {
            return compile_err(format!("method call .{} has no receiver", name));
        };
        if receiver.is_str(SEPARATOR) {
            return compile_err(format!("method call .{} has no receiver", name));
        }
        let mut target = self.compile_form(receiver)?;
        if matches!(
            receiver,
            Form::Atom(Atom::Int(_) | Atom::Float(_) | Atom::Complex { .. })
        ) {
            target = format!("({})", target);
        }
        let args = self.args(args)?;
        Ok(format_call(&format!("{}.{}", target, name), &args.items))
    }

    fn tuple_display(&mut self, rest: &[Form]) -> Result<String, SprigError> {
        let args = self.args(rest)?;
        if args.has_keywords {
            return compile_err("tuple display does not take keyword arguments");
        }
        if args.items.is_empty() {
            return Ok("()".to_string());
        }
        let mut out = String::from("(");
        for item in &args.items {
            out.push_str("\n  ");
            out.push_str(&indent_rest(item, INDENT));
            out.push(',');
        }
        out.push(')');
        Ok(out)
    }

    fn args(&mut self, rest: &[Form]) -> Result<Args, SprigError> {
        let split = rest.iter().position(|item| item.is_str(SEPARATOR));
        let (singles, pairs) = match split {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        let mut args = Args::default();
        let mut iter = singles.iter();
        while let Some(item) = iter.next() {
            if item.is_str(UNPACK) {
                let Some(target) = iter.next() else {
                    return compile_err("dangling :* marker in arguments");
                };
                args.items.push(format!("*{}", self.compile_form(target)?));
            } else {
                args.items.push(self.compile_form(item)?);
            }
        }
        if pairs.len() % 2 != 0 {
            return compile_err(format!(
                "dangling {} in keyword arguments",
                pairs[pairs.len() - 1]
            ));
        }
        let mut seen_map_unpack = false;
        for pair in pairs.chunks(2) {
            let (key, value) = (&pair[0], &pair[1]);
            let Some(key_text) = key.as_str() else {
                return compile_err(format!("keyword target {} is not a symbol", key));
            };
            match key_text {
                POSITIONAL => {
                    if args.has_keywords || seen_map_unpack {
                        return compile_err("positional argument follows keyword argument");
                    }
                    args.items.push(self.compile_form(value)?);
                }
                UNPACK => {
                    if seen_map_unpack {
                        return compile_err(":* unpacking follows :** unpacking");
                    }
                    args.items.push(format!("*{}", self.compile_form(value)?));
                }
                UNPACK_MAP => {
                    seen_map_unpack = true;
                    args.has_keywords = true;
                    args.items.push(format!("**{}", self.compile_form(value)?));
                }
                SEPARATOR => return compile_err("duplicate : separator in arguments"),
                _ if is_control_word(key_text) => {
                    return compile_err(format!("unknown argument marker {}", key_text));
                }
                _ if key_text.contains('.') || !is_identifier_path(key_text) => {
                    return compile_err(format!(
                        "keyword target {} must be a plain identifier",
                        key_text
                    ));
                }
                _ => {
                    args.has_keywords = true;
                    args.items
                        .push(format!("{}={}", key_text, self.compile_form(value)?));
                }
            }
        }
        Ok(args)
    }

    fn lambda(&mut self, rest: &[Form]) -> Result<String, SprigError> {
        let Some((params, body)) = rest.split_first() else {
            return compile_err("lambda requires a parameter tuple");
        };
        let Form::Tuple(params) = params else {
            return compile_err(format!("lambda parameters must be a tuple, got {}", params));
        };
        let params = self.params(params)?;
        let body = self.body(body)?;
        let head = if params.is_empty() {
            "(lambda :".to_string()
        } else {
            format!("(lambda {}:", params.join(", "))
        };
        Ok(format!(
            "{}\n{}{})",
            head,
            " ".repeat(INDENT),
            indent_rest(&body, INDENT)
        ))
    }

    /// Effects in order; the value of the last form.
    fn body(&mut self, forms: &[Form]) -> Result<String, SprigError> {
        match forms {
            [] => Ok("()".to_string()),
            [only] => self.compile_form(only),
            _ => {
                let parts = forms
                    .iter()
                    .map(|form| self.compile_form(form).map(|code| indent_rest(&code, 1)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})[-1]", parts.join(",\n ")))
            }
        }
    }

    fn params(&mut self, params: &[Form]) -> Result<Vec<String>, SprigError> {
        let split = params.iter().position(|item| item.is_str(SEPARATOR));
        let (singles, pairs) = match split {
            Some(idx) => (&params[..idx], &params[idx + 1..]),
            None => (params, &params[params.len()..]),
        };
        let mut out = Vec::new();
        let mut stars = 0;
        let mut slashes = 0;
        let mut map_star = false;
        for item in singles {
            match item.as_str() {
                Some(POSITIONAL_ONLY) => {
                    slashes += 1;
                    out.push("/".to_string());
                }
                Some(UNPACK) => {
                    stars += 1;
                    out.push("*".to_string());
                }
                Some(name) if !is_control_word(name) => out.push(name.to_string()),
                _ => return compile_err(format!("invalid parameter {}", item)),
            }
        }
        if pairs.iter().any(|item| item.is_str(SEPARATOR)) {
            return compile_err("duplicate : separator in parameters");
        }
        if pairs.len() % 2 != 0 {
            return compile_err("parameter pairs after : must come in twos");
        }
        for pair in pairs.chunks(2) {
            if map_star {
                return compile_err(":** parameter must be last");
            }
            let (key, value) = (&pair[0], &pair[1]);
            let value_text = value.as_str();
            match key.as_str() {
                Some(UNPACK) => {
                    stars += 1;
                    match value_text {
                        Some(POSITIONAL) => out.push("*".to_string()),
                        Some(name) if !is_control_word(name) => out.push(format!("*{}", name)),
                        _ => return compile_err(format!("invalid :* parameter {}", value)),
                    }
                }
                Some(UNPACK_MAP) => match value_text {
                    Some(name) if !is_control_word(name) => {
                        map_star = true;
                        out.push(format!("**{}", name));
                    }
                    _ => return compile_err(format!("invalid :** parameter {}", value)),
                },
                Some(POSITIONAL_ONLY) => {
                    if value_text != Some(POSITIONAL) {
                        return compile_err(":/ must be paired with :?");
                    }
                    slashes += 1;
                    out.push("/".to_string());
                }
                Some(name) if !is_control_word(name) => {
                    if value_text == Some(POSITIONAL) {
                        out.push(name.to_string());
                    } else {
                        out.push(format!("{}={}", name, self.compile_form(value)?));
                    }
                }
                _ => return compile_err(format!("invalid parameter {}", key)),
            }
        }
        if stars > 1 {
            return compile_err("more than one * in parameters");
        }
        if slashes > 1 {
            return compile_err("more than one / in parameters");
        }
        Ok(out)
    }
}

fn import_expr(module: &str) -> String {
    if module.contains('.') {
        format!("__import__({},fromlist='?')", py_str_repr(module))
    } else {
        format!("__import__({})", py_str_repr(module))
    }
}

fn format_call(callee: &str, args: &[String]) -> String {
    if args.is_empty() {
        return format!("{}()", callee);
    }
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| format!("\n{}{}", " ".repeat(INDENT), indent_rest(arg, INDENT)))
        .collect();
    format!("{}({})", callee, rendered.join(","))
}

use std::collections::HashSet;

use num::{BigInt, Num, ToPrimitive};
use once_cell::sync::Lazy;

use crate::ast::{Atom, Form};
use crate::error::SprigError;
use crate::literal::{decode_str_literal_code, parse_literal, py_str_repr};
use crate::namespace::{macro_fn, Namespace};

pub const BUILTINS_MODULE: &str = "builtins";

static BUILTIN_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
        "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
        "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval",
        "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
        "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance",
        "issubclass", "iter", "len", "license", "list", "locals", "map", "max",
        "memoryview", "min", "next", "object", "oct", "open", "ord", "pow", "print",
        "property", "quit", "range", "repr", "reversed", "round", "set", "setattr",
        "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type",
        "vars", "zip", "ArithmeticError", "AssertionError", "AttributeError",
        "BaseException", "BaseExceptionGroup", "BlockingIOError", "BrokenPipeError",
        "BufferError", "BytesWarning", "ChildProcessError", "ConnectionAbortedError",
        "ConnectionError", "ConnectionRefusedError", "ConnectionResetError",
        "DeprecationWarning", "EOFError", "Ellipsis", "EncodingWarning", "EnvironmentError",
        "Exception", "ExceptionGroup", "False", "FileExistsError", "FileNotFoundError",
        "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError", "ImportError",
        "ImportWarning", "IndentationError", "IndexError", "InterruptedError",
        "IsADirectoryError", "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError",
        "ModuleNotFoundError", "NameError", "None", "NotADirectoryError", "NotImplemented",
        "NotImplementedError", "OSError", "OverflowError", "PendingDeprecationWarning",
        "PermissionError", "ProcessLookupError", "RecursionError", "ReferenceError",
        "ResourceWarning", "RuntimeError", "RuntimeWarning", "StopAsyncIteration",
        "StopIteration", "SyntaxError", "SyntaxWarning", "SystemError", "SystemExit",
        "TabError", "TimeoutError", "True", "TypeError", "UnboundLocalError",
        "UnicodeDecodeError", "UnicodeEncodeError", "UnicodeError", "UnicodeTranslateError",
        "UnicodeWarning", "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
        "__build_class__", "__debug__", "__doc__", "__import__", "__loader__", "__name__",
        "__package__", "__spec__",
    ]
    .into_iter()
    .collect()
});

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(name)
}

fn text_of(form: &Form) -> Option<String> {
    let raw = form.as_str()?;
    Some(decode_str_literal_code(raw).unwrap_or_else(|| raw.to_string()))
}

fn primary<'a>(tag: &str, args: &'a [Form]) -> Result<&'a Form, SprigError> {
    args.first()
        .ok_or_else(|| SprigError::message(format!("{} requires an argument", tag)))
}

fn to_f64(tag: &str, form: &Form) -> Result<f64, SprigError> {
    match form {
        Form::Atom(Atom::Float(x)) => Ok(*x),
        Form::Atom(Atom::Int(n)) => n
            .to_f64()
            .ok_or_else(|| SprigError::message(format!("{}: {} is too large", tag, n))),
        Form::Atom(Atom::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        other => {
            let text = text_of(other).ok_or_else(|| {
                SprigError::message(format!("{}: cannot convert {}", tag, other))
            })?;
            parse_float_text(&text)
                .ok_or_else(|| SprigError::message(format!("{}: invalid number {:?}", tag, text)))
        }
    }
}

fn parse_float_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let unsigned = lower.trim_start_matches(['+', '-']);
    let negative = lower.starts_with('-');
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(x) = special {
        return Some(if negative { -x } else { x });
    }
    match parse_literal(trimmed)? {
        Atom::Float(x) => Some(x),
        Atom::Int(n) => n.to_f64(),
        _ => None,
    }
}

fn float_tag(args: &[Form]) -> Result<Form, SprigError> {
    let value = to_f64("float", primary("float", args)?)?;
    Ok(Form::float(value))
}

fn int_tag(args: &[Form]) -> Result<Form, SprigError> {
    let arg = primary("int", args)?;
    let radix = match args.get(1) {
        Some(Form::Atom(Atom::Int(n))) => n
            .to_u32()
            .filter(|r| (2..=36).contains(r))
            .ok_or_else(|| SprigError::message(format!("int: invalid base {}", n)))?,
        Some(other) => {
            return Err(SprigError::message(format!("int: invalid base {}", other)));
        }
        None => 10,
    };
    match arg {
        Form::Atom(Atom::Int(n)) => Ok(Form::Atom(Atom::Int(n.clone()))),
        Form::Atom(Atom::Float(x)) if x.is_finite() => {
            let truncated = format!("{:.0}", x.trunc());
            let n = BigInt::from_str_radix(&truncated, 10)
                .map_err(|e| SprigError::message(format!("int: {}", e)))?;
            Ok(Form::Atom(Atom::Int(n)))
        }
        Form::Atom(Atom::Bool(b)) => Ok(Form::int(i64::from(*b))),
        other => {
            let text = text_of(other)
                .ok_or_else(|| SprigError::message(format!("int: cannot convert {}", other)))?;
            let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
            BigInt::from_str_radix(&cleaned, radix)
                .map(|n| Form::Atom(Atom::Int(n)))
                .map_err(|_| {
                    SprigError::message(format!("int: invalid literal {:?} for base {}", text, radix))
                })
        }
    }
}

fn complex_tag(args: &[Form]) -> Result<Form, SprigError> {
    let arg = primary("complex", args)?;
    if let Some(imag) = args.get(1) {
        let re = to_f64("complex", arg)?;
        let im = to_f64("complex", imag)?;
        return Ok(Form::Atom(Atom::Complex { re, im }));
    }
    if let Form::Atom(Atom::Complex { re, im }) = arg {
        return Ok(Form::Atom(Atom::Complex { re: *re, im: *im }));
    }
    if let Some(text) = text_of(arg) {
        if let Some(Atom::Complex { re, im }) = parse_literal(text.trim()) {
            return Ok(Form::Atom(Atom::Complex { re, im }));
        }
    }
    let re = to_f64("complex", arg)?;
    Ok(Form::Atom(Atom::Complex { re, im: 0.0 }))
}

fn bytes_tag(args: &[Form]) -> Result<Form, SprigError> {
    match primary("bytes", args)? {
        Form::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let byte = match item {
                    Form::Atom(Atom::Int(n)) => n.to_u8(),
                    _ => None,
                }
                .ok_or_else(|| {
                    SprigError::message(format!("bytes: {} is not in range(0, 256)", item))
                })?;
                out.push(byte);
            }
            Ok(Form::Atom(Atom::Bytes(out)))
        }
        Form::Atom(Atom::Bytes(bytes)) => Ok(Form::Atom(Atom::Bytes(bytes.clone()))),
        other => {
            let text = text_of(other)
                .ok_or_else(|| SprigError::message(format!("bytes: cannot convert {}", other)))?;
            Ok(Form::Atom(Atom::Bytes(text.into_bytes())))
        }
    }
}

fn items_of<'a>(tag: &str, form: &'a Form) -> Result<&'a [Form], SprigError> {
    match form {
        Form::Tuple(items) => Ok(items),
        Form::Atom(Atom::List(items)) | Form::Atom(Atom::Set(items)) => Ok(items),
        other => Err(SprigError::message(format!(
            "{}: expected a tuple, got {}",
            tag, other
        ))),
    }
}

fn list_tag(args: &[Form]) -> Result<Form, SprigError> {
    let items = items_of("list", primary("list", args)?)?;
    Ok(Form::Atom(Atom::List(items.to_vec())))
}

fn set_tag(args: &[Form]) -> Result<Form, SprigError> {
    let items = items_of("set", primary("set", args)?)?;
    let mut unique: Vec<Form> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    Ok(Form::Atom(Atom::Set(unique)))
}

fn dict_tag(args: &[Form]) -> Result<Form, SprigError> {
    let items = items_of("dict", primary("dict", args)?)?;
    if items.len() % 2 != 0 {
        return Err(SprigError::message("dict: expected key/value pairs"));
    }
    let mut entries: Vec<(Form, Form)> = Vec::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        let (key, value) = (pair[0].clone(), pair[1].clone());
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }
    Ok(Form::Atom(Atom::Dict(entries)))
}

fn str_tag(args: &[Form]) -> Result<Form, SprigError> {
    let arg = primary("str", args)?;
    let text = text_of(arg).unwrap_or_else(|| arg.to_lissp());
    Ok(Form::str(format!("({})", py_str_repr(&text))))
}

pub fn builtins_namespace() -> Namespace {
    let mut ns = Namespace::new(BUILTINS_MODULE);
    ns.define_attr("float", macro_fn(float_tag));
    ns.define_attr("int", macro_fn(int_tag));
    ns.define_attr("complex", macro_fn(complex_tag));
    ns.define_attr("bytes", macro_fn(bytes_tag));
    ns.define_attr("list", macro_fn(list_tag));
    ns.define_attr("set", macro_fn(set_tag));
    ns.define_attr("dict", macro_fn(dict_tag));
    ns.define_attr("str", macro_fn(str_tag));
    ns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(text: &str) -> Form {
        Form::str(format!("({})", py_str_repr(text)))
    }

    #[test]
    fn float_accepts_special_values() {
        assert_eq!(float_tag(&[lit("inf")]).unwrap(), Form::float(f64::INFINITY));
        assert_eq!(float_tag(&[lit("-1e3")]).unwrap(), Form::float(-1000.0));
        assert!(float_tag(&[lit("x")]).is_err());
    }

    #[test]
    fn int_honours_the_base_extra() {
        let n = int_tag(&[lit("ff"), Form::int(16)]).unwrap();
        assert_eq!(n, Form::int(255));
        assert_eq!(int_tag(&[Form::float(-2.7)]).unwrap(), Form::int(-2));
    }

    #[test]
    fn containers_from_tuples() {
        let items = Form::tuple(vec![Form::int(1), Form::int(1), Form::int(2)]);
        assert_eq!(
            set_tag(&[items.clone()]).unwrap(),
            Form::Atom(Atom::Set(vec![Form::int(1), Form::int(2)]))
        );
        assert!(dict_tag(&[items]).is_err());
        assert_eq!(
            bytes_tag(&[Form::tuple(vec![Form::int(104), Form::int(105)])]).unwrap(),
            Form::Atom(Atom::Bytes(b"hi".to_vec()))
        );
    }

    #[test]
    fn str_renders_surface_text() {
        let form = Form::tuple(vec![Form::str("a"), Form::int(1)]);
        assert_eq!(str_tag(&[form]).unwrap(), Form::str("('(a 1)')"));
    }

    #[test]
    fn builtin_names() {
        assert!(is_builtin("print"));
        assert!(!is_builtin("double"));
    }
}

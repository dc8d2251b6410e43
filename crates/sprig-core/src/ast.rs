use std::fmt;

use num::BigInt;

use crate::literal::{py_bytes_repr, py_complex_repr, py_float_repr, py_str_repr};

pub const SEPARATOR: &str = ":";
pub const POSITIONAL: &str = ":?";
pub const UNPACK: &str = ":*";
pub const UNPACK_MAP: &str = ":**";
pub const POSITIONAL_ONLY: &str = ":/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub index: usize,
}

impl Span {
    pub fn new(line: usize, col: usize, index: usize) -> Self {
        Self { line, col, index }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            line: 1,
            col: 1,
            index: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Form {
    Atom(Atom),
    Tuple(Vec<Form>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    None,
    Ellipsis,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Complex { re: f64, im: f64 },
    /// Identifiers, qualified identifiers, module handles, control words,
    /// fragments and string-literal code all share this variant.
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Form>),
    Set(Vec<Form>),
    Dict(Vec<(Form, Form)>),
    Serialized(Serialized),
    Unquote(Unquote),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Serialized {
    pub repr: String,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unquote {
    pub splice: bool,
    pub form: Box<Form>,
}

impl Form {
    pub fn str(text: impl Into<String>) -> Self {
        Form::Atom(Atom::Str(text.into()))
    }

    pub fn int(value: i64) -> Self {
        Form::Atom(Atom::Int(BigInt::from(value)))
    }

    pub fn float(value: f64) -> Self {
        Form::Atom(Atom::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Form::Atom(Atom::Bool(value))
    }

    pub fn none() -> Self {
        Form::Atom(Atom::None)
    }

    pub fn tuple(items: Vec<Form>) -> Self {
        Form::Tuple(items)
    }

    pub fn quote(form: Form) -> Self {
        Form::Tuple(vec![Form::str("quote"), form])
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Form::Atom(Atom::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Form]> {
        match self {
            Form::Tuple(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn is_str(&self, expected: &str) -> bool {
        self.as_str() == Some(expected)
    }

    pub fn is_control(&self) -> bool {
        self.as_str().is_some_and(is_control_word)
    }

    pub fn is_atomic(&self) -> bool {
        match self {
            Form::Tuple(items) => items.is_empty(),
            Form::Atom(_) => true,
        }
    }

    pub fn has_literal_rendering(&self) -> bool {
        match self {
            Form::Tuple(items) => items.iter().all(Form::has_literal_rendering),
            Form::Atom(atom) => atom.has_literal_rendering(),
        }
    }

    pub fn to_lissp(&self) -> String {
        self.to_string()
    }
}

impl Atom {
    pub fn has_literal_rendering(&self) -> bool {
        match self {
            Atom::Float(x) => x.is_finite(),
            Atom::Complex { re, im } => re.is_finite() && im.is_finite(),
            Atom::List(items) | Atom::Set(items) => items.iter().all(Form::has_literal_rendering),
            Atom::Dict(entries) => entries
                .iter()
                .all(|(k, v)| k.has_literal_rendering() && v.has_literal_rendering()),
            Atom::Serialized(_) | Atom::Unquote(_) => false,
            _ => true,
        }
    }
}

pub fn is_control_word(text: &str) -> bool {
    text.starts_with(':')
}

impl From<Atom> for Form {
    fn from(atom: Atom) -> Self {
        Form::Atom(atom)
    }
}

impl From<&str> for Form {
    fn from(text: &str) -> Self {
        Form::str(text)
    }
}

impl From<i64> for Form {
    fn from(value: i64) -> Self {
        Form::int(value)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Tuple(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Form::Atom(atom) => write!(f, "{}", atom),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::None => write!(f, "None"),
            Atom::Ellipsis => write!(f, "..."),
            Atom::Bool(true) => write!(f, "True"),
            Atom::Bool(false) => write!(f, "False"),
            Atom::Int(n) => write!(f, "{}", n),
            Atom::Float(x) => write!(f, "{}", py_float_repr(*x)),
            Atom::Complex { re, im } => write!(f, "{}", py_complex_repr(*re, *im)),
            Atom::Str(s) => {
                if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '|') {
                    write!(f, "|{}|", s.replace('|', "||"))
                } else {
                    write!(f, "{}", s)
                }
            }
            Atom::Bytes(bytes) => write!(f, "{}", py_bytes_repr(bytes)),
            Atom::List(items) => write_seq(f, "[", items, "]"),
            Atom::Set(items) => write_seq(f, "{", items, "}"),
            Atom::Dict(entries) => {
                write!(f, "{{")?;
                for (idx, (k, v)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Atom::Serialized(ser) => write!(f, "{}", ser.repr),
            Atom::Unquote(unquote) => {
                let mark = if unquote.splice { ",@" } else { "," };
                write!(f, "{}{}", mark, unquote.form)
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Form], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

pub fn value_repr(form: &Form) -> String {
    match form {
        Form::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(value_repr).collect();
            if parts.len() == 1 {
                format!("({},)", parts[0])
            } else {
                format!("({})", parts.join(", "))
            }
        }
        Form::Atom(Atom::Str(s)) => py_str_repr(s),
        Form::Atom(Atom::List(items)) => {
            let parts: Vec<String> = items.iter().map(value_repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Form::Atom(Atom::Set(items)) => {
            if items.is_empty() {
                return "set()".to_string();
            }
            let parts: Vec<String> = items.iter().map(value_repr).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Form::Atom(Atom::Dict(entries)) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", value_repr(k), value_repr(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Form::Atom(atom) => atom.to_string(),
    }
}

use crate::ast::{Atom, Form};
use crate::literal::py_float_repr;

const MARK: u8 = b'(';
const STOP: u8 = b'.';

pub fn dumps(form: &Form) -> Vec<u8> {
    let mut out = Vec::new();
    write_form(&mut out, form);
    out.push(STOP);
    out
}

fn write_form(out: &mut Vec<u8>, form: &Form) {
    match form {
        Form::Tuple(items) => {
            out.push(MARK);
            for item in items {
                write_form(out, item);
            }
            out.push(b't');
        }
        Form::Atom(atom) => write_atom(out, atom),
    }
}

fn write_atom(out: &mut Vec<u8>, atom: &Atom) {
    match atom {
        Atom::None => out.push(b'N'),
        Atom::Ellipsis => global(out, "builtins", "Ellipsis"),
        Atom::Bool(flag) => out.extend_from_slice(if *flag { b"I01\n" } else { b"I00\n" }),
        Atom::Int(n) => {
            out.push(b'I');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'\n');
        }
        Atom::Float(x) => float(out, *x),
        Atom::Complex { re, im } => {
            global(out, "builtins", "complex");
            out.push(MARK);
            float(out, *re);
            float(out, *im);
            out.extend_from_slice(b"tR");
        }
        Atom::Str(text) => unicode(out, text),
        Atom::Bytes(bytes) => encoded_bytes(out, bytes),
        Atom::List(items) => {
            out.push(MARK);
            for item in items {
                write_form(out, item);
            }
            out.push(b'l');
        }
        Atom::Set(items) => {
            global(out, "builtins", "set");
            out.push(MARK);
            out.push(MARK);
            for item in items {
                write_form(out, item);
            }
            out.extend_from_slice(b"ltR");
        }
        Atom::Dict(entries) => {
            out.push(MARK);
            for (key, value) in entries {
                write_form(out, key);
                write_form(out, value);
            }
            out.push(b'd');
        }
        // Nested payloads are unpickled in place.
        Atom::Serialized(ser) => {
            global(out, "pickle", "loads");
            out.push(MARK);
            encoded_bytes(out, &ser.payload);
            out.extend_from_slice(b"tR");
        }
        Atom::Unquote(_) => unicode(out, &atom.to_string()),
    }
}

fn global(out: &mut Vec<u8>, module: &str, name: &str) {
    out.push(b'c');
    out.extend_from_slice(module.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(name.as_bytes());
    out.push(b'\n');
}

fn float(out: &mut Vec<u8>, x: f64) {
    out.push(b'F');
    out.extend_from_slice(py_float_repr(x).as_bytes());
    out.push(b'\n');
}

fn unicode(out: &mut Vec<u8>, text: &str) {
    out.push(b'V');
    raw_unicode_escape(out, text.chars());
    out.push(b'\n');
}

/// `bytes` has no protocol 0 opcode; it goes through `_codecs.encode`.
fn encoded_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    global(out, "_codecs", "encode");
    out.push(MARK);
    out.push(b'V');
    raw_unicode_escape(out, bytes.iter().map(|b| char::from(*b)));
    out.push(b'\n');
    unicode(out, "latin1");
    out.extend_from_slice(b"tR");
}

fn raw_unicode_escape(out: &mut Vec<u8>, chars: impl Iterator<Item = char>) {
    for ch in chars {
        let code = ch as u32;
        match ch {
            '\\' | '\0' | '\n' | '\r' | '\u{1a}' => {
                out.extend_from_slice(format!("\\u{:04x}", code).as_bytes())
            }
            _ if code <= 0xff => out.push(code as u8),
            _ if code <= 0xffff => out.extend_from_slice(format!("\\u{:04x}", code).as_bytes()),
            _ => out.extend_from_slice(format!("\\U{:08x}", code).as_bytes()),
        }
    }
}

use num::{BigInt, Num};

use crate::ast::Atom;

pub fn py_str_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if is_printable(c) => out.push(c),
            c => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
        }
    }
    out.push(quote);
    out
}

fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    !(ch.is_control() || ch.is_whitespace() || ('\u{e000}'..='\u{f8ff}').contains(&ch))
}

pub fn py_bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push(quote as char);
    out
}

/// `repr(float)`; non-finite values come out as `inf`, `-inf` and `nan`,
/// which are not valid literals.
pub fn py_float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let sci = format!("{:e}", x);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if (-4..16).contains(&exponent) {
        let point = exponent + 1;
        if point <= 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-point) as usize));
            out.push_str(&digits);
        } else if point as usize >= digits.len() {
            out.push_str(&digits);
            out.extend(std::iter::repeat('0').take(point as usize - digits.len()));
            out.push_str(".0");
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            out.push_str(int_part);
            out.push('.');
            out.push_str(frac_part);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        out.push_str(&format!("e{}{:02}", sign, exponent.abs()));
    }
    out
}

pub fn float_literal(x: f64) -> Option<String> {
    x.is_finite().then(|| py_float_repr(x))
}

fn complex_part(x: f64) -> String {
    let repr = py_float_repr(x);
    match repr.strip_suffix(".0") {
        Some(short) => short.to_string(),
        None => repr,
    }
}

pub fn py_complex_repr(re: f64, im: f64) -> String {
    if re == 0.0 && re.is_sign_positive() {
        return format!("{}j", complex_part(im));
    }
    let imag = complex_part(im);
    let sign = if imag.starts_with('-') { "" } else { "+" };
    format!("({}{}{}j)", complex_part(re), sign, imag)
}

pub fn complex_literal(re: f64, im: f64) -> Option<String> {
    (re.is_finite() && im.is_finite()).then(|| py_complex_repr(re, im))
}

pub fn parse_literal(token: &str) -> Option<Atom> {
    match token {
        "True" => return Some(Atom::Bool(true)),
        "False" => return Some(Atom::Bool(false)),
        "None" => return Some(Atom::None),
        "..." => return Some(Atom::Ellipsis),
        _ => {}
    }
    let (negative, body) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if let Some(n) = parse_int(body) {
        return Some(Atom::Int(if negative { -n } else { n }));
    }
    if let Some(x) = parse_float(body) {
        return Some(Atom::Float(if negative { -x } else { x }));
    }
    if let Some(im) = parse_imaginary(body) {
        let im = if negative { -im } else { im };
        return Some(Atom::Complex { re: 0.0, im });
    }
    parse_complex(token)
}

fn parse_int(body: &str) -> Option<BigInt> {
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, lower.as_str())
    };
    let digits = if radix != 10 {
        digits.strip_prefix('_').unwrap_or(digits)
    } else {
        digits
    };
    if !valid_digit_part(digits, |c| c.is_digit(radix)) {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if radix == 10 && cleaned.len() > 1 && cleaned.starts_with('0') {
        if cleaned.chars().all(|c| c == '0') {
            return Some(BigInt::from(0));
        }
        return None;
    }
    BigInt::from_str_radix(&cleaned, radix).ok()
}

fn valid_digit_part(text: &str, is_digit: impl Fn(char) -> bool) -> bool {
    if text.is_empty() || text.starts_with('_') || text.ends_with('_') || text.contains("__") {
        return false;
    }
    text.chars().all(|c| c == '_' || is_digit(c))
}

fn parse_float(body: &str) -> Option<f64> {
    let lower = body.to_ascii_lowercase();
    let (mantissa, exponent) = match lower.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (lower.as_str(), None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    if frac_part.is_none() && exponent.is_none() {
        return None;
    }
    let is_dec = |c: char| c.is_ascii_digit();
    if !int_part.is_empty() && !valid_digit_part(int_part, is_dec) {
        return None;
    }
    if let Some(frac) = frac_part {
        if !frac.is_empty() && !valid_digit_part(frac, is_dec) {
            return None;
        }
        if int_part.is_empty() && frac.is_empty() {
            return None;
        }
    } else if int_part.is_empty() {
        return None;
    }
    if let Some(exp) = exponent {
        let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if !valid_digit_part(digits, is_dec) {
            return None;
        }
    }
    let cleaned: String = lower.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

fn parse_imaginary(body: &str) -> Option<f64> {
    let number = body.strip_suffix(['j', 'J'])?;
    if number.is_empty() {
        return None;
    }
    if let Some(x) = parse_float(number) {
        return Some(x);
    }
    let lower = number.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return None;
    }
    if !valid_digit_part(number, |c| c.is_ascii_digit()) {
        return None;
    }
    let cleaned: String = number.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

fn parse_complex(token: &str) -> Option<Atom> {
    if !token.ends_with(['j', 'J']) {
        return None;
    }
    let bytes = token.as_bytes();
    let split = (1..bytes.len()).rev().find(|&idx| {
        matches!(bytes[idx], b'+' | b'-') && !matches!(bytes[idx - 1], b'e' | b'E')
    })?;
    let (real_text, imag_text) = token.split_at(split);
    let real = match parse_literal(real_text)? {
        Atom::Int(n) => n.to_string().parse::<f64>().ok()?,
        Atom::Float(x) => x,
        _ => return None,
    };
    let negative = imag_text.starts_with('-');
    let im = parse_imaginary(&imag_text[1..])?;
    Some(Atom::Complex {
        re: real,
        im: if negative { -im } else { im },
    })
}

pub fn decode_string_body(body: &str, raw: bool) -> Result<String, String> {
    if raw {
        return Ok(body.to_string());
    }
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        idx += 1;
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(&esc) = chars.get(idx) else {
            return Err("dangling backslash at end of string".to_string());
        };
        idx += 1;
        match esc {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                let mut taken = 1;
                while taken < 3 {
                    match chars.get(idx).and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            idx += 1;
                            taken += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or("invalid octal escape")?);
            }
            'x' | 'u' | 'U' => {
                let width = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.iter().skip(idx).take(width).collect();
                if hex.len() != width || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("truncated \\{} escape", esc));
                }
                idx += width;
                let code = u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("invalid code point \\{}{}", esc, hex))?;
                out.push(decoded);
            }
            other => return Err(format!("unknown escape \\{}", other)),
        }
    }
    Ok(out)
}

pub fn decode_str_literal_code(code: &str) -> Option<String> {
    let inner = code
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(code);
    let quote = inner.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let body = inner.strip_prefix(quote)?.strip_suffix(quote)?;
    decode_string_body(body, false).ok()
}

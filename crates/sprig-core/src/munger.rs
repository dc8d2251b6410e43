use std::collections::HashMap;

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

pub const ESCAPE_PREFIX: &str = "Qz";

const ESCAPES: &[(char, &str)] = &[
    ('!', "BANG"),
    ('"', "QUOT"),
    ('#', "HASH"),
    ('$', "DOLR"),
    ('%', "PCENT"),
    ('&', "ET"),
    ('\'', "APOS"),
    ('(', "LPAR"),
    (')', "RPAR"),
    ('*', "STAR"),
    ('+', "PLUS"),
    (',', "COMMA"),
    ('-', "H"),
    ('.', "DOT"),
    ('/', "SOL"),
    (':', "COLON"),
    (';', "SEMI"),
    ('<', "LT"),
    ('=', "EQ"),
    ('>', "GT"),
    ('?', "QUERY"),
    ('@', "AT"),
    ('[', "LSQB"),
    ('\\', "BSOL"),
    (']', "RSQB"),
    ('^', "HAT"),
    ('`', "GRAVE"),
    ('{', "LCUB"),
    ('|', "VERT"),
    ('}', "RCUB"),
    ('~', "TILDE"),
    (' ', "SPACE"),
];

const DIGITS: [&str; 10] = [
    "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE",
];

static BY_CHAR: Lazy<HashMap<char, &'static str>> =
    Lazy::new(|| ESCAPES.iter().copied().collect());

static BY_NAME: Lazy<HashMap<&'static str, char>> =
    Lazy::new(|| ESCAPES.iter().map(|(ch, name)| (*name, *ch)).collect());

pub fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

pub fn is_identifier_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_continue),
        _ => false,
    }
}

pub fn is_identifier_path(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_identifier)
}

pub fn munge(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized
        .split('.')
        .map(munge_part)
        .collect::<Vec<_>>()
        .join(".")
}

/// Munges every character, dots included. Tag names go through this.
pub fn force_munge(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    munge_part(&normalized)
}

fn munge_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for (idx, ch) in part.chars().enumerate() {
        let legal = if idx == 0 {
            is_identifier_start(ch)
        } else {
            is_identifier_continue(ch)
        };
        if legal {
            out.push(ch);
        } else {
            push_escape(&mut out, ch);
        }
    }
    out
}

fn push_escape(out: &mut String, ch: char) {
    out.push_str(ESCAPE_PREFIX);
    if let Some(digit) = ch.to_digit(10).filter(|_| ch.is_ascii_digit()) {
        out.push_str("DIGITx");
        out.push_str(DIGITS[digit as usize]);
    } else if let Some(name) = BY_CHAR.get(&ch) {
        out.push_str(name);
    } else {
        out.push_str(&format!("U{:X}", ch as u32));
    }
    out.push('_');
}

pub fn demunge(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(ESCAPE_PREFIX) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + ESCAPE_PREFIX.len()..];
        match after.find('_').and_then(|end| {
            decode_escape(&after[..end]).map(|ch| (ch, end))
        }) {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(ESCAPE_PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_escape(name: &str) -> Option<char> {
    if let Some(ch) = BY_NAME.get(name) {
        return Some(*ch);
    }
    if let Some(digit) = name.strip_prefix("DIGITx") {
        let value = DIGITS.iter().position(|d| *d == digit)?;
        return char::from_digit(value as u32, 10);
    }
    let hex = name.strip_prefix('U')?;
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    char::from_u32(u32::from_str_radix(hex, 16).ok()?)
}

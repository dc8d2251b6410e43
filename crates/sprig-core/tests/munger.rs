use std::collections::HashSet;

use rstest::rstest;
use sprig_core::munger::is_identifier_path;
use sprig_core::{demunge, force_munge, munge};

fn printable_ascii() -> impl Iterator<Item = char> {
    (' '..='~').filter(|ch| *ch != '_')
}

#[test]
fn every_printable_character_round_trips() {
    for ch in printable_ascii() {
        let text = format!("{}x{}", ch, ch);
        let munged = force_munge(&text);
        assert!(is_identifier_path(&munged), "{:?} -> {:?}", text, munged);
        assert_eq!(demunge(&munged), text, "{:?}", munged);
    }
}

#[test]
fn distinct_symbols_stay_distinct() {
    let mut seen = HashSet::new();
    for a in printable_ascii() {
        for b in printable_ascii() {
            let text: String = [a, b].iter().collect();
            assert!(seen.insert(force_munge(&text)), "collision for {:?}", text);
        }
    }
}

#[test]
fn munged_names_never_gain_a_leading_underscore() {
    for ch in printable_ascii() {
        let munged = force_munge(&ch.to_string());
        assert!(!munged.starts_with('_'), "{:?}", munged);
    }
}

#[test]
fn identifiers_are_left_alone() {
    for name in ["x", "foo_bar", "_private", "Ünïcode", "os.path.join", "x1"] {
        assert_eq!(munge(name), name);
    }
}

#[rstest]
#[case("+", "QzPLUS_")]
#[case("<=", "QzLT_QzEQ_")]
#[case("%", "QzPCENT_")]
#[case("&", "QzET_")]
#[case("a b", "aQzSPACE_b")]
#[case("9", "QzDIGITxNINE_")]
#[case("set!", "setQzBANG_")]
#[case("*args*", "QzSTAR_argsQzSTAR_")]
fn escapes_use_readable_names(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(munge(text), expected);
    assert_eq!(demunge(expected), text);
}

#[test]
fn demunge_leaves_unknown_escapes_alone() {
    assert_eq!(demunge("QzNOPE_x"), "QzNOPE_x");
    assert_eq!(demunge("Qz"), "Qz");
    assert_eq!(demunge("QzUZZ_"), "QzUZZ_");
}

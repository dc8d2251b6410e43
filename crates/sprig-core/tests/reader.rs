#[path = "common/mod.rs"]
mod common;

use common::{call, read_one, session, sym};
use rstest::rstest;
use sprig_core::ast::{Atom, Form};
use sprig_core::namespace::macro_fn;
use sprig_core::SprigError;

#[rstest]
#[case("True", Atom::Bool(true))]
#[case("False", Atom::Bool(false))]
#[case("None", Atom::None)]
#[case("...", Atom::Ellipsis)]
#[case("42", Atom::Int(42.into()))]
#[case("-0x1F", Atom::Int((-31).into()))]
#[case("0b_101", Atom::Int(5.into()))]
#[case("1_000", Atom::Int(1000.into()))]
#[case("1.5", Atom::Float(1.5))]
#[case("-2e-3", Atom::Float(-0.002))]
#[case("3j", Atom::Complex { re: 0.0, im: 3.0 })]
#[case("1-2j", Atom::Complex { re: 1.0, im: -2.0 })]
fn primitive_tokens_read_as_literals(#[case] source: &str, #[case] expected: Atom) {
    let mut session = session("demo");
    assert_eq!(read_one(&mut session, source), Form::Atom(expected));
}

#[rstest]
#[case("foo-bar", "fooQzH_bar")]
#[case("0123", "QzDIGITxZERO_123")]
#[case("math.", "math.")]
#[case("math..pi", "math..pi")]
#[case(".upper", ".upper")]
#[case(r"\42", "QzDIGITxFOUR_2")]
#[case(r"\True", "True")]
fn other_bare_tokens_are_munged_symbols(#[case] source: &str, #[case] expected: &str) {
    let mut session = session("demo");
    assert_eq!(read_one(&mut session, source), sym(expected));
}

#[test]
fn strings_read_as_literal_code() {
    let mut session = session("demo");
    assert_eq!(read_one(&mut session, r#""hi""#), sym("('hi')"));
    assert_eq!(read_one(&mut session, r#""a\nb""#), sym(r"('a\nb')"));
    assert_eq!(read_one(&mut session, r#"#"a\nb""#), sym(r"('a\\nb')"));
    assert_eq!(read_one(&mut session, "\"two\nlines\""), sym(r"('two\nlines')"));
}

#[test]
fn fragments_and_control_words_pass_through() {
    let mut session = session("demo");
    assert_eq!(read_one(&mut session, "|x[0]||y|"), sym("x[0]|y"));
    assert_eq!(read_one(&mut session, ":sep"), sym(":sep"));
    assert_eq!(read_one(&mut session, ":foo-bar"), sym(":foo-bar"));
}

#[test]
fn quote_and_discard() {
    let mut session = session("demo");
    assert_eq!(
        read_one(&mut session, "'(a b)"),
        Form::quote(call(vec![sym("a"), sym("b")]))
    );
    assert_eq!(
        read_one(&mut session, "(a _#b ; note\n c)"),
        call(vec![sym("a"), sym("c")])
    );
    assert_eq!(
        read_one(&mut session, "(a _#_#b c d)"),
        call(vec![sym("a"), sym("d")])
    );
    assert!(session.read("(a _#)").is_err());
}

#[test]
fn templates_build_tuple_displays() {
    let mut session = session("demo");
    let form = read_one(&mut session, "`(f ,x ,@ys)");
    assert_eq!(
        form,
        call(vec![
            sym(""),
            sym(":"),
            sym(":?"),
            Form::quote(sym("demo..QzMaybe_.f")),
            sym(":?"),
            sym("x"),
            sym(":*"),
            sym("ys"),
        ])
    );
    assert_eq!(session.template_counter(), 1);
}

fn gensym_in(form: &Form) -> String {
    let items = form.as_tuple().expect("template tuple");
    let quoted = items[5].as_tuple().expect("quoted gensym");
    quoted[1].as_str().expect("gensym string").to_string()
}

#[test]
fn gensyms_are_reproducible_across_fresh_sessions() {
    let source = "`(a $#x)";
    let first = gensym_in(&read_one(&mut session("demo"), source));
    let second = gensym_in(&read_one(&mut session("demo"), source));
    assert_eq!(first, second);
    assert!(first.starts_with("_Qz") && first.ends_with("__x"));
}

#[test]
fn gensyms_differ_between_templates_in_one_session() {
    let mut session = session("demo");
    let forms = common::parse_forms(&mut session, "`(a $#x) `(a $#x)");
    assert_ne!(gensym_in(&forms[0]), gensym_in(&forms[1]));
    let again = common::parse_forms(&mut session, "`(a $#x)");
    assert_ne!(gensym_in(&forms[0]), gensym_in(&again[0]));
}

#[test]
fn one_placeholder_is_one_name_within_a_template() {
    let mut session = session("demo");
    let form = read_one(&mut session, "`(a $#x $#x)");
    let items = form.as_tuple().unwrap();
    assert_eq!(items[5], items[7]);
}

#[test]
fn gensyms_depend_on_the_module() {
    let a = gensym_in(&read_one(&mut session("demo"), "`(a $#x)"));
    let b = gensym_in(&read_one(&mut session("other"), "`(a $#x)"));
    assert_ne!(a, b);
}

#[test]
fn unquote_outside_a_template_is_a_parse_error() {
    let mut session = session("demo");
    let err = session.read("(a ,b)").unwrap_err();
    assert!(matches!(err, SprigError::Parse { .. }));
    assert_eq!(err.span().map(|s| (s.line, s.col)), Some((1, 4)));
}

#[test]
fn unquote_directly_under_a_template_is_rejected() {
    let mut session = session("demo");
    assert!(matches!(
        session.read("`,x").unwrap_err(),
        SprigError::Parse { .. }
    ));
}

#[test]
fn unbalanced_delimiters() {
    let mut session = session("demo");
    let err = session.read("(a (b)").unwrap_err();
    assert!(err.to_string().contains("unclosed"));
    assert_eq!(err.span().map(|s| s.col), Some(1));
    assert_eq!(err.source_name(), Some("test.lissp"));
    let err = session.read("a)").unwrap_err();
    assert!(err.to_string().contains("unmatched"));
}

#[test]
fn unquote_markers_stay_in_nested_tuples() {
    let mut session = session("demo");
    let form = read_one(&mut session, "`(a (b ,c))");
    let items = form.as_tuple().unwrap();
    let inner = items[5].as_tuple().unwrap();
    assert_eq!(inner[0], sym(""));
    assert_eq!(inner[5], sym("c"));
}

#[test]
fn named_tags_resolve_in_the_active_module() {
    let mut session = session("demo");
    session.define_tag(
        "twice",
        macro_fn(|args| Ok(call(vec![args[0].clone(), args[0].clone()]))),
    );
    assert_eq!(
        read_one(&mut session, "twice#5"),
        call(vec![Form::int(5), Form::int(5)])
    );
}

#[test]
fn extras_follow_the_primary_argument() {
    let mut session = session("demo");
    assert_eq!(
        read_one(&mut session, r#"builtins..int# !16 "ff""#),
        Form::int(255)
    );
}

#[test]
fn bang_outside_a_tag_is_a_symbol_character() {
    let mut session = session("demo");
    assert_eq!(
        read_one(&mut session, "(!= a b)"),
        call(vec![sym("QzBANG_QzEQ_"), sym("a"), sym("b")])
    );
    assert_eq!(read_one(&mut session, "!"), sym("QzBANG_"));
    assert_eq!(read_one(&mut session, "!16"), sym("QzBANG_16"));
    assert_eq!(
        read_one(&mut session, "(! x)"),
        call(vec![sym("QzBANG_"), sym("x")])
    );
}

#[test]
fn qualified_tags_reach_module_attributes() {
    let mut session = session("demo");
    session
        .modules_mut()
        .ensure("util")
        .define_attr("neg", macro_fn(|args| Ok(call(vec![sym("-"), args[0].clone()]))));
    assert_eq!(
        read_one(&mut session, "util..neg#x"),
        call(vec![sym("-"), sym("x")])
    );
}

#[test]
fn non_literal_tag_results_are_serialized() {
    let mut session = session("demo");
    let form = read_one(&mut session, r#"builtins..float#"inf""#);
    match form {
        Form::Atom(Atom::Serialized(ser)) => {
            assert_eq!(ser.repr, "inf");
            assert_eq!(ser.payload, b"Finf\n.");
        }
        other => panic!("expected a serialized atom, got {:?}", other),
    }
}

#[test]
fn unknown_tags_name_the_missing_callable() {
    let mut session = session("demo");
    let err = session.read("nope#1").unwrap_err();
    match err {
        SprigError::Resolve { name, .. } => assert_eq!(name, "demo.._macro_.nopeQzHASH_"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn failing_tags_keep_their_cause() {
    let mut session = session("demo");
    session.define_tag("bad", macro_fn(|_| Err(SprigError::message("no good"))));
    let err = session.read("bad#1").unwrap_err();
    assert!(matches!(err, SprigError::Macro { ref name, .. } if name == "demo.._macro_.badQzHASH_"));
    assert_eq!(err.root_cause().to_string(), "no good");
}

#[test]
fn inject_turns_text_into_code() {
    let mut session = session("demo");
    assert_eq!(read_one(&mut session, r#".#"x[0]""#), sym("x[0]"));
    assert_eq!(read_one(&mut session, ".#(print 1)"), sym("print(\n  1)"));
    assert_eq!(read_one(&mut session, ".#7"), Form::int(7));
}

#[test]
fn reader_is_lazy_and_stops_after_an_error() {
    let mut session = session("demo");
    let mut reader = session.reader("(a) (b \"oops");
    assert_eq!(reader.next().unwrap().unwrap(), call(vec![sym("a")]));
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}

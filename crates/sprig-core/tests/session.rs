#[path = "common/mod.rs"]
mod common;

use common::{session, transpile};
use sprig_core::config::load_config_str;
use sprig_core::error::ERROR_TAG;
use sprig_core::namespace::macro_fn;
use sprig_core::{format_error, Form, Session, SprigError};

#[test]
fn report_keeps_forms_compiled_before_an_error() {
    let mut session = session("demo");
    let report = session.transpile_report("(f 1) (g 2) (h :* )");
    assert!(!report.is_ok());
    assert_eq!(report.forms, 2);
    assert_eq!(report.code, "f(\n  1)\n\ng(\n  2)\n");
    assert!(matches!(report.error, Some(SprigError::Compile { .. })));
}

#[test]
fn report_stops_at_read_errors_too() {
    let mut session = session("demo");
    let report = session.transpile_report("(f 1) (g");
    assert_eq!(report.forms, 1);
    assert_eq!(report.code, "f(\n  1)\n");
    assert!(matches!(report.error, Some(SprigError::Parse { .. })));
}

#[test]
fn empty_source_compiles_to_nothing() {
    let mut session = session("demo");
    assert_eq!(transpile(&mut session, ""), "");
    assert_eq!(transpile(&mut session, "; only a comment\n"), "");
}

#[test]
fn macros_defined_between_buffers_apply_to_later_buffers() {
    let mut session = session("demo");
    assert_eq!(transpile(&mut session, "(twice 2)"), "twice(\n  2)\n");
    session.define_macro(
        "twice",
        macro_fn(|args| {
            Ok(Form::tuple(vec![
                Form::str("operator..mul"),
                args[0].clone(),
                Form::int(2),
            ]))
        }),
    );
    assert_eq!(
        transpile(&mut session, "(twice 2)"),
        "__import__('operator').mul(\n  2,\n  2)\n"
    );
}

#[test]
fn template_counter_advances_across_buffers() {
    let mut session = session("demo");
    session.read("`a `b").unwrap();
    session.read("`c").unwrap();
    assert_eq!(session.template_counter(), 3);
}

#[test]
fn switching_modules_changes_qualification() {
    let mut session = session("demo");
    session.set_qualname("pkg.mod");
    assert_eq!(session.qualname(), "pkg.mod");
    assert_eq!(transpile(&mut session, "`x"), "'pkg.mod..x'\n");
    assert_eq!(transpile(&mut session, "pkg.mod..x"), "x\n");
    assert_eq!(
        transpile(&mut session, "demo..x"),
        "__import__('demo').x\n"
    );
}

#[test]
fn take_fallbacks_drains_the_session() {
    let mut session = session("demo");
    transpile(&mut session, r#"builtins..float#"nan""#);
    let taken = session.take_fallbacks();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].repr, "nan");
    assert!(session.fallbacks().is_empty());
}

#[test]
fn sessions_from_config() {
    let load = load_config_str(
        r#"
version = 1

[session]
qualname = "app.main"
max_expansion_steps = 2
globals = ["print"]
"#,
    )
    .unwrap();
    let mut session = Session::from_config(&load.config).unwrap();
    assert_eq!(session.qualname(), "app.main");
    assert_eq!(session.options().max_expansion_steps, 2);
    assert!(session.namespace().unwrap().is_global("print"));
    assert_eq!(transpile(&mut session, "`print"), "'app.main..print'\n");
}

#[test]
fn crate_level_transpile_uses_a_fresh_session() {
    let code = sprig_core::transpile("(print 1)", "demo").unwrap();
    assert_eq!(code, "print(\n  1)\n");
}

#[test]
fn formatted_errors_point_at_the_source() {
    let mut session = session("demo");
    let source = "(a ,b)";
    let err = session.read(source).unwrap_err();
    let lines = format_error(&err, Some(source));
    assert!(lines[0].starts_with(ERROR_TAG));
    assert!(lines[0].contains("Parse error"));
    assert_eq!(lines[1], "  at test.lissp:1:4");
    assert_eq!(lines[2], "  | (a ,b)");
    assert_eq!(lines[3], "  |    ^");
}

#[test]
fn formatted_macro_errors_list_their_causes() {
    let mut session = session("demo");
    session.define_macro("boom", macro_fn(|_| Err(SprigError::message("kaboom"))));
    let err = session.transpile("(boom)").unwrap_err();
    let lines = format_error(&err, None);
    assert!(lines[0].contains("demo.._macro_.boom"));
    assert_eq!(lines[1], "  caused by: kaboom");
}

#[test]
fn compile_errors_point_at_their_top_level_form() {
    let mut session = session("demo");
    let source = "(f 1)\n  ; bad call\n  (g :*)";
    let err = session.transpile(source).unwrap_err();
    assert!(matches!(err, SprigError::Compile { .. }));
    assert_eq!(err.span().map(|s| (s.line, s.col)), Some((3, 3)));
    let lines = format_error(&err, Some(source));
    assert_eq!(lines[1], "  at test.lissp:3:3");
    assert_eq!(lines[2], "  |   (g :*)");
    assert_eq!(lines[3], "  |   ^");
}

#[test]
fn macro_errors_point_at_their_top_level_form() {
    let mut session = session("demo");
    session.define_macro("boom", macro_fn(|_| Err(SprigError::message("kaboom"))));
    let report = session.transpile_report("(ok)\n(f (boom))");
    let err = report.error.expect("macro failure");
    assert!(matches!(err, SprigError::Macro { .. }));
    assert_eq!(err.span().map(|s| (s.line, s.col)), Some((2, 1)));
}

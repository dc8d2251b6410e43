#![allow(dead_code)]

use sprig_core::ast::Form;
use sprig_core::options::SessionOptions;
use sprig_core::session::Session;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Session with a fixed module name, independent of the environment.
pub fn session(qualname: &str) -> Session {
    init_logging();
    let options = SessionOptions {
        qualname: qualname.to_string(),
        max_expansion_steps: 1000,
        allow_pickle: true,
        source_name: Some("test.lissp".to_string()),
        globals: Vec::new(),
    };
    Session::with_options(options)
}

pub fn parse_forms(session: &mut Session, source: &str) -> Vec<Form> {
    session
        .read(source)
        .unwrap_or_else(|e| panic!("failed to read {:?}: {}", source, e))
}

pub fn read_one(session: &mut Session, source: &str) -> Form {
    let mut forms = parse_forms(session, source);
    assert_eq!(forms.len(), 1, "expected one form in {:?}", source);
    forms.remove(0)
}

pub fn transpile(session: &mut Session, source: &str) -> String {
    session
        .transpile(source)
        .unwrap_or_else(|e| panic!("failed to transpile {:?}: {}", source, e))
}

pub fn sym(text: &str) -> Form {
    Form::str(text)
}

pub fn call(items: Vec<Form>) -> Form {
    Form::tuple(items)
}

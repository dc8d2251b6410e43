pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod error;
pub mod expander;
pub mod lexer;
pub mod literal;
pub mod munger;
pub mod namespace;
pub mod options;
pub mod pickle;
pub mod reader;
pub mod session;
pub mod template;

pub use ast::{Atom, Form, Span};
pub use compiler::Compiler;
pub use error::{format_error, SprigError};
pub use expander::Expander;
pub use munger::{demunge, force_munge, munge};
pub use namespace::{macro_fn, MacroFn, ModuleTable, Namespace};
pub use options::SessionOptions;
pub use reader::Reader;
pub use session::{Session, TranspileReport};

pub fn transpile(source: &str, qualname: &str) -> Result<String, SprigError> {
    let options = SessionOptions::default().with_qualname(qualname);
    Session::with_options(options).transpile(source)
}

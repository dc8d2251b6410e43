use crate::ast::Span;
use thiserror::Error;

pub const ERROR_TAG: &str = "\x1b[31m[ERROR]\x1b[0m";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorContext {
    pub span: Option<Span>,
    pub source_name: Option<String>,
}

impl ErrorContext {
    fn set_span(&mut self, span: Span) {
        if self.span.is_none() {
            self.span = Some(span);
        }
    }

    fn set_source_name(&mut self, name: Option<String>) {
        if self.source_name.is_none() {
            self.source_name = name;
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum SprigError {
    #[error("Lexical error: {message}")]
    Lex {
        message: String,
        context: ErrorContext,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        context: ErrorContext,
    },

    #[error("Unresolved name: {name}")]
    Resolve { name: String, context: ErrorContext },

    #[error("Macro {name} failed: {source}")]
    Macro {
        name: String,
        source: Box<SprigError>,
        context: ErrorContext,
    },

    #[error("Expansion of {name} exceeded {limit} steps")]
    ExpansionLimit {
        name: String,
        limit: usize,
        context: ErrorContext,
    },

    #[error("Compile error: {message}")]
    Compile {
        message: String,
        context: ErrorContext,
    },

    #[error("Config error: {message}")]
    Config {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    Message {
        message: String,
        context: ErrorContext,
    },
}

impl SprigError {
    pub fn lex(message: impl Into<String>) -> Self {
        SprigError::Lex {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        SprigError::Parse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn resolve(name: impl Into<String>) -> Self {
        SprigError::Resolve {
            name: name.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn macro_failure(name: impl Into<String>, source: SprigError) -> Self {
        SprigError::Macro {
            name: name.into(),
            source: Box::new(source),
            context: ErrorContext::default(),
        }
    }

    pub fn expansion_limit(name: impl Into<String>, limit: usize) -> Self {
        SprigError::ExpansionLimit {
            name: name.into(),
            limit,
            context: ErrorContext::default(),
        }
    }

    pub fn compile(message: impl Into<String>) -> Self {
        SprigError::Compile {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SprigError::Config {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        SprigError::Message {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.context_mut().set_span(span);
        self
    }

    pub fn with_source_name(mut self, name: Option<String>) -> Self {
        self.context_mut().set_source_name(name);
        self
    }

    pub fn span(&self) -> Option<Span> {
        self.context_ref().span
    }

    pub fn source_name(&self) -> Option<&str> {
        self.context_ref().source_name.as_deref()
    }

    /// Innermost error of a chain of macro failures.
    pub fn root_cause(&self) -> &SprigError {
        match self {
            SprigError::Macro { source, .. } => source.root_cause(),
            other => other,
        }
    }

    fn context_ref(&self) -> &ErrorContext {
        match self {
            SprigError::Lex { context, .. }
            | SprigError::Parse { context, .. }
            | SprigError::Resolve { context, .. }
            | SprigError::Macro { context, .. }
            | SprigError::ExpansionLimit { context, .. }
            | SprigError::Compile { context, .. }
            | SprigError::Config { context, .. }
            | SprigError::Message { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            SprigError::Lex { context, .. }
            | SprigError::Parse { context, .. }
            | SprigError::Resolve { context, .. }
            | SprigError::Macro { context, .. }
            | SprigError::ExpansionLimit { context, .. }
            | SprigError::Compile { context, .. }
            | SprigError::Config { context, .. }
            | SprigError::Message { context, .. } => context,
        }
    }
}

pub fn format_error(err: &SprigError, source: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("{} {}", ERROR_TAG, err));
    let mut cause = err;
    while let SprigError::Macro { source: inner, .. } = cause {
        cause = inner;
        lines.push(format!("  caused by: {}", cause));
    }
    if let Some(location) = format_error_location(err.source_name(), err.span()) {
        lines.push(format!("  at {}", location));
    }
    if let (Some(src), Some(span)) = (source, err.span()) {
        if let Some(snippet) = format_source_snippet(src, span) {
            lines.extend(snippet);
        }
    }
    lines
}

fn format_error_location(file: Option<&str>, span: Option<Span>) -> Option<String> {
    let file_name = file.unwrap_or("<source>");
    match span {
        Some(span) => Some(format!("{}:{}:{}", file_name, span.line, span.col)),
        None => file.map(|f| f.to_string()),
    }
}

fn format_source_snippet(source: &str, span: Span) -> Option<Vec<String>> {
    if span.line == 0 {
        return None;
    }
    let line = source.lines().nth(span.line.saturating_sub(1))?;
    let mut lines = Vec::new();
    lines.push(format!("  | {}", line));
    let mut marker = String::from("  | ");
    marker.extend(std::iter::repeat(' ').take(span.col.saturating_sub(1)));
    marker.push('^');
    lines.push(marker);
    Some(lines)
}

impl From<String> for SprigError {
    fn from(s: String) -> Self {
        SprigError::message(s)
    }
}

impl From<&str> for SprigError {
    fn from(s: &str) -> Self {
        SprigError::message(s.to_string())
    }
}

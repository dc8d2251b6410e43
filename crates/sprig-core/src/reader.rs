use std::iter::Peekable;

use crate::ast::{value_repr, Atom, Form, Serialized, Span, Unquote};
use crate::compiler::Compiler;
use crate::error::SprigError;
use crate::lexer::{BuiltinTag, Lexer, Token, TokenKind};
use crate::literal::{decode_str_literal_code, decode_string_body, parse_literal, py_str_repr};
use crate::munger::{force_munge, munge};
use crate::namespace::{MacroFn, MACRO_NS, QUALIFIER, TAG_SUFFIX};
use crate::pickle;
use crate::session::Session;
use crate::template::{gensym, Template};

enum Item {
    Form(Form),
    Close(Span),
    Eof,
}

pub struct Reader<'s> {
    session: &'s mut Session,
    tokens: Peekable<Lexer>,
    source: String,
    template_stack: Vec<u64>,
    template_depth: usize,
    form_start: Option<Span>,
    failed: bool,
}

impl<'s> Reader<'s> {
    pub fn new(session: &'s mut Session, source: &str) -> Self {
        Self {
            session,
            tokens: Lexer::new(source).peekable(),
            source: source.to_string(),
            template_stack: Vec::new(),
            template_depth: 0,
            form_start: None,
            failed: false,
        }
    }

    pub fn session(&mut self) -> &mut Session {
        &mut *self.session
    }

    pub fn read_all(&mut self) -> Result<Vec<Form>, SprigError> {
        self.collect()
    }

    /// Compiles a form with the reader's session, so reading and compiling
    /// can interleave form by form. Errors without a location point at the
    /// start of the last top-level form read.
    pub fn compile(&mut self, form: &Form) -> Result<String, SprigError> {
        let start = self.form_start;
        self.session.compile(form).map_err(|err| match start {
            Some(span) => err.with_span(span),
            None => err,
        })
    }

    fn qualname(&self) -> &str {
        &self.session.options.qualname
    }

    fn locate(&self, err: SprigError, span: Span) -> SprigError {
        err.with_span(span)
            .with_source_name(self.session.options.source_name.clone())
    }

    fn parse_err<T>(&self, message: impl Into<String>, span: Span) -> Result<T, SprigError> {
        Err(self.locate(SprigError::parse(message), span))
    }

    fn next_token(&mut self) -> Result<Option<Token>, SprigError> {
        loop {
            match self.tokens.next() {
                None => return Ok(None),
                Some(Err(err)) => {
                    return Err(err.with_source_name(self.session.options.source_name.clone()))
                }
                Some(Ok(token)) if token.kind == TokenKind::Comment => continue,
                Some(Ok(token)) => return Ok(Some(token)),
            }
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        while matches!(self.tokens.peek(), Some(Ok(token)) if token.kind == TokenKind::Comment) {
            self.tokens.next();
        }
        match self.tokens.peek() {
            Some(Ok(token)) => Some(&*token),
            _ => None,
        }
    }

    fn peek_is_extra(&mut self) -> bool {
        self.peek_token()
            .is_some_and(|token| token.kind == TokenKind::Extra)
    }

    fn read_item(&mut self) -> Result<Item, SprigError> {
        let Some(token) = self.next_token()? else {
            return Ok(Item::Eof);
        };
        let span = token.span;
        let form = match token.kind {
            TokenKind::Open => self.read_tuple(span)?,
            TokenKind::Close => return Ok(Item::Close(span)),
            TokenKind::String { raw } => {
                let text = decode_string_body(&token.text, raw)
                    .map_err(|message| self.locate(SprigError::lex(message), span))?;
                Form::str(format!("({})", py_str_repr(&text)))
            }
            TokenKind::Fragment | TokenKind::Control => Form::str(token.text),
            TokenKind::Bare => self.bare(&token),
            TokenKind::Builtin(tag) => return self.read_builtin(tag, span),
            TokenKind::Tag => self.read_tag(&token)?,
            TokenKind::Extra => self.bang_symbol(span),
            TokenKind::Comment => return self.read_item(),
        };
        Ok(Item::Form(form))
    }

    fn read_tuple(&mut self, open: Span) -> Result<Form, SprigError> {
        let mut items = Vec::new();
        loop {
            match self.read_item()? {
                Item::Form(form) => items.push(form),
                Item::Close(_) => return Ok(Form::Tuple(items)),
                Item::Eof => return self.parse_err("unclosed '('", open),
            }
        }
    }

    fn read_arg(&mut self, prefix: &str, span: Span) -> Result<Form, SprigError> {
        match self.read_item()? {
            Item::Form(form) => Ok(form),
            Item::Close(_) | Item::Eof => {
                self.parse_err(format!("{} is missing its argument", prefix), span)
            }
        }
    }

    fn bare(&self, token: &Token) -> Form {
        if !token.escaped() {
            if let Some(atom) = parse_literal(&token.text) {
                return Form::Atom(atom);
            }
        }
        Form::str(munge(&token.text))
    }

    fn bang_symbol(&mut self, bang: Span) -> Form {
        let adjacent = match self.tokens.peek() {
            Some(Ok(next)) if next.kind == TokenKind::Bare && next.span.index == bang.index + 1 => {
                Some(next.text.clone())
            }
            _ => None,
        };
        let mut text = String::from("!");
        if let Some(rest) = adjacent {
            self.tokens.next();
            text.push_str(&rest);
        }
        Form::str(munge(&text))
    }

    fn read_builtin(&mut self, tag: BuiltinTag, span: Span) -> Result<Item, SprigError> {
        let form = match tag {
            BuiltinTag::Quote => Form::quote(self.read_arg("'", span)?),
            BuiltinTag::Template => self.read_template(span)?,
            BuiltinTag::Unquote | BuiltinTag::Splice => {
                if self.template_depth == 0 {
                    return self.parse_err(
                        format!("unquote {} outside of a template", tag.surface()),
                        span,
                    );
                }
                self.template_depth -= 1;
                let form = self.read_arg(tag.surface(), span);
                self.template_depth += 1;
                Form::Atom(Atom::Unquote(Unquote {
                    splice: tag == BuiltinTag::Splice,
                    form: Box::new(form?),
                }))
            }
            BuiltinTag::Gensym => {
                let form = self.read_arg("$#", span)?;
                let Some(name) = form.as_str() else {
                    return self.parse_err(format!("$# expects a symbol, got {}", form), span);
                };
                let counter = self
                    .template_stack
                    .last()
                    .copied()
                    .unwrap_or(self.session.template_counter);
                Form::str(gensym(name, &self.source, self.qualname(), counter))
            }
            BuiltinTag::Inject => {
                let form = self.read_arg(".#", span)?;
                self.inject(form).map_err(|err| self.locate(err, span))?
            }
            BuiltinTag::Discard => {
                let dropped = self.read_arg("_#", span)?;
                log::debug!("discarded {} at {}", dropped, span);
                return self.read_item();
            }
        };
        Ok(Item::Form(form))
    }

    fn read_template(&mut self, span: Span) -> Result<Form, SprigError> {
        self.session.template_counter += 1;
        self.template_stack.push(self.session.template_counter);
        self.template_depth += 1;
        let form = self.read_arg("`", span);
        self.template_depth -= 1;
        self.template_stack.pop();
        let form = form?;
        Template::new(&self.session.options.qualname, &self.session.modules)
            .quasiquote(form)
            .map_err(|err| self.locate(err, span))
    }

    fn inject(&mut self, form: Form) -> Result<Form, SprigError> {
        match form.as_str().map(decode_str_literal_code) {
            Some(Some(text)) => return Ok(Form::str(text)),
            Some(None) => return Ok(form),
            None => {}
        }
        if matches!(&form, Form::Atom(atom) if atom.has_literal_rendering()) {
            return Ok(form);
        }
        let mut compiler = Compiler::new(
            &self.session.modules,
            &self.session.options.qualname,
            &self.session.options,
        );
        let code = compiler.compile_form(&form)?;
        let fallbacks = compiler.into_fallbacks();
        self.session.fallbacks.extend(fallbacks);
        Ok(Form::str(code))
    }

    fn read_tag(&mut self, token: &Token) -> Result<Form, SprigError> {
        let span = token.span;
        let mut extras = Vec::new();
        while self.peek_is_extra() {
            let bang = self.next_token()?.map(|t| t.span).unwrap_or(span);
            extras.push(self.read_arg("!", bang)?);
        }
        let primary = self.read_arg(&format!("{}#", token.text), span)?;
        let (name, callable) = self
            .resolve_tag(&token.text)
            .map_err(|err| self.locate(err, span))?;
        let mut args = Vec::with_capacity(extras.len() + 1);
        args.push(primary);
        args.extend(extras);
        log::debug!("tag {} with {} argument(s) at {}", name, args.len(), span);
        let result = callable(args.as_slice())
            .map_err(|err| self.locate(SprigError::macro_failure(name.clone(), err), span))?;
        Ok(self.serialize_if_needed(result, &name))
    }

    fn resolve_tag(&self, text: &str) -> Result<(String, MacroFn), SprigError> {
        if text.contains(QUALIFIER) {
            let name = munge(text);
            let callable = self.session.modules.resolve_qualified(&name)?.clone();
            return Ok((name, callable));
        }
        let key = format!("{}{}", force_munge(text), TAG_SUFFIX);
        let name = format!("{}{}{}.{}", self.qualname(), QUALIFIER, MACRO_NS, key);
        let callable = self
            .session
            .modules
            .macro_fn(self.qualname(), &key)
            .cloned()
            .ok_or_else(|| SprigError::resolve(name.clone()))?;
        Ok((name, callable))
    }

    fn serialize_if_needed(&self, result: Form, tag: &str) -> Form {
        let opaque = matches!(
            &result,
            Form::Atom(atom) if !atom.has_literal_rendering() && !matches!(atom, Atom::Serialized(_))
        );
        if !opaque {
            return result;
        }
        let repr = value_repr(&result);
        log::warn!("tag {} produced {} which has no literal form; serializing", tag, repr);
        Form::Atom(Atom::Serialized(Serialized {
            repr,
            payload: pickle::dumps(&result),
        }))
    }
}

impl Iterator for Reader<'_> {
    type Item = Result<Form, SprigError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.form_start = self.peek_token().map(|token| token.span);
        let item = match self.read_item() {
            Ok(Item::Form(form)) => Ok(form),
            Ok(Item::Eof) => return None,
            Ok(Item::Close(span)) => self.parse_err("unmatched ')'", span),
            Err(err) => Err(err),
        };
        if item.is_err() {
            self.failed = true;
            self.template_stack.clear();
            self.template_depth = 0;
        }
        Some(item)
    }
}

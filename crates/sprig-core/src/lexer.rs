use std::fmt;

use crate::ast::Span;
use crate::error::SprigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinTag {
    Quote,
    Template,
    Unquote,
    Splice,
    Gensym,
    Inject,
    Discard,
}

impl BuiltinTag {
    pub fn surface(self) -> &'static str {
        match self {
            BuiltinTag::Quote => "'",
            BuiltinTag::Template => "`",
            BuiltinTag::Unquote => ",",
            BuiltinTag::Splice => ",@",
            BuiltinTag::Gensym => "$#",
            BuiltinTag::Inject => ".#",
            BuiltinTag::Discard => "_#",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Open,
    Close,
    String { raw: bool },
    Fragment,
    Comment,
    Control,
    Tag,
    Builtin(BuiltinTag),
    /// A leading `!`. Marks an extra only while a tag collects arguments.
    Extra,
    Bare,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Processed text: string bodies without quotes, fragments with `||`
    /// collapsed, bare and control runs with escapes stripped, tag names
    /// without the trailing `#`.
    pub text: String,
    pub source: String,
    pub span: Span,
}

impl Token {
    pub fn escaped(&self) -> bool {
        matches!(self.kind, TokenKind::Bare | TokenKind::Control | TokenKind::Tag)
            && self.source.contains('\\')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    col: usize,
    failed: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            col: 1,
            failed: false,
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn current_char(&self) -> char {
        self.chars.get(self.index).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.chars.get(self.index) {
            self.index += 1;
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
            index: self.index,
        }
    }

    fn lex_err<T>(&self, message: impl Into<String>, span: Span) -> Result<T, SprigError> {
        Err(SprigError::lex(message).with_span(span))
    }

    fn skip_ws(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn token(&self, kind: TokenKind, text: String, start: Span) -> Token {
        Token {
            kind,
            text,
            source: self.chars[start.index..self.index].iter().collect(),
            span: start,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, SprigError> {
        self.skip_ws();
        if self.eof() {
            return Ok(None);
        }
        let start = self.current_span();
        let ch = self.current_char();
        let next = self.peek_char();
        let token = match (ch, next) {
            ('(', _) => {
                self.advance();
                self.token(TokenKind::Open, "(".into(), start)
            }
            (')', _) => {
                self.advance();
                self.token(TokenKind::Close, ")".into(), start)
            }
            ('"', _) => self.read_string(start, false)?,
            ('#', Some('"')) => {
                self.advance();
                self.read_string(start, true)?
            }
            ('|', _) => self.read_fragment(start)?,
            (';', _) => self.read_comment(start),
            ('\'', _) => self.builtin(BuiltinTag::Quote, 1, start),
            ('`', _) => self.builtin(BuiltinTag::Template, 1, start),
            (',', Some('@')) => self.builtin(BuiltinTag::Splice, 2, start),
            (',', _) => self.builtin(BuiltinTag::Unquote, 1, start),
            ('$', Some('#')) => self.builtin(BuiltinTag::Gensym, 2, start),
            ('.', Some('#')) => self.builtin(BuiltinTag::Inject, 2, start),
            ('_', Some('#')) => self.builtin(BuiltinTag::Discard, 2, start),
            ('!', _) => {
                self.advance();
                self.token(TokenKind::Extra, "!".into(), start)
            }
            (':', _) => {
                let (text, _) = self.read_run(start, false)?;
                self.token(TokenKind::Control, text, start)
            }
            _ => {
                let (text, tagged) = self.read_run(start, true)?;
                let kind = if tagged { TokenKind::Tag } else { TokenKind::Bare };
                self.token(kind, text, start)
            }
        };
        Ok(Some(token))
    }

    fn builtin(&mut self, tag: BuiltinTag, width: usize, start: Span) -> Token {
        for _ in 0..width {
            self.advance();
        }
        self.token(TokenKind::Builtin(tag), tag.surface().into(), start)
    }

    fn read_string(&mut self, start: Span, raw: bool) -> Result<Token, SprigError> {
        self.advance();
        let mut body = String::new();
        loop {
            if self.eof() {
                return self.lex_err("unterminated string", start);
            }
            let ch = self.current_char();
            if ch == '"' {
                self.advance();
                break;
            }
            if ch == '\\' {
                body.push(ch);
                self.advance();
                if self.eof() {
                    return self.lex_err("unterminated string", start);
                }
            }
            body.push(self.current_char());
            self.advance();
        }
        Ok(self.token(TokenKind::String { raw }, body, start))
    }

    fn read_fragment(&mut self, start: Span) -> Result<Token, SprigError> {
        self.advance();
        let mut text = String::new();
        loop {
            if self.eof() {
                return self.lex_err("unterminated fragment", start);
            }
            let ch = self.current_char();
            self.advance();
            if ch == '|' {
                if !self.eof() && self.current_char() == '|' {
                    text.push('|');
                    self.advance();
                    continue;
                }
                break;
            }
            text.push(ch);
        }
        Ok(self.token(TokenKind::Fragment, text, start))
    }

    fn read_comment(&mut self, start: Span) -> Token {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            while !self.eof() && self.current_char() != '\n' {
                line.push(self.current_char());
                self.advance();
            }
            lines.push(line);
            let resume = (self.index, self.line, self.col);
            self.skip_ws();
            if self.eof() || self.current_char() != ';' {
                (self.index, self.line, self.col) = resume;
                break;
            }
        }
        self.token(TokenKind::Comment, lines.join("\n"), start)
    }

    fn read_run(&mut self, start: Span, allow_tag: bool) -> Result<(String, bool), SprigError> {
        let mut text = String::new();
        while !self.eof() {
            let ch = self.current_char();
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | ';') {
                break;
            }
            if ch == '\\' {
                let escape_at = self.current_span();
                self.advance();
                if self.eof() {
                    return self.lex_err("trailing backslash escapes nothing", escape_at);
                }
                text.push(self.current_char());
                self.advance();
                continue;
            }
            if ch == '#' && allow_tag && !text.is_empty() {
                self.advance();
                return Ok((text, true));
            }
            text.push(ch);
            self.advance();
        }
        if text.is_empty() {
            return self.lex_err("empty token", start);
        }
        Ok((text, false))
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, SprigError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, SprigError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn classifies_builtin_prefixes() {
        assert_eq!(
            kinds("'a `b ,c ,@d $#e .#f _#g"),
            vec![
                TokenKind::Builtin(BuiltinTag::Quote),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Template),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Unquote),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Splice),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Gensym),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Inject),
                TokenKind::Bare,
                TokenKind::Builtin(BuiltinTag::Discard),
                TokenKind::Bare,
            ]
        );
    }

    #[test]
    fn tag_ends_at_hash() {
        let tokens = tokenize("foo#bar builtins..float#").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Tag);
        assert_eq!(tokens[0].text, "foo");
        assert_eq!(tokens[1].text, "bar");
        assert_eq!(tokens[2].kind, TokenKind::Tag);
        assert_eq!(tokens[2].text, "builtins..float");
    }

    #[test]
    fn escapes_are_stripped_from_bare_runs() {
        let tokens = tokenize(r"a\ b \\ x\#").unwrap();
        assert_eq!(tokens[0].text, "a b");
        assert!(tokens[0].escaped());
        assert_eq!(tokens[1].text, "\\");
        assert_eq!(tokens[2].kind, TokenKind::Bare);
        assert_eq!(tokens[2].text, "x#");
    }

    #[test]
    fn strings_keep_escape_pairs() {
        let tokens = tokenize(r#""a\"b" #"c\d""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String { raw: false });
        assert_eq!(tokens[0].text, r#"a\"b"#);
        assert_eq!(tokens[1].kind, TokenKind::String { raw: true });
        assert_eq!(tokens[1].text, r"c\d");
    }

    #[test]
    fn fragments_double_their_bars() {
        let tokens = tokenize("|a||b|").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Fragment);
        assert_eq!(tokens[0].text, "a|b");
    }

    #[test]
    fn adjacent_comments_coalesce() {
        let tokens = tokenize(";; one\n  ;; two\n(x)\n; three").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, ";; one\n;; two");
        assert_eq!(tokens[1].kind, TokenKind::Open);
        assert_eq!(tokens[4].text, "; three");
    }

    #[test]
    fn spans_are_one_based() {
        let tokens = tokenize("(a\n  b)").unwrap();
        assert_eq!(tokens[2].span, Span::new(2, 3, 5));
    }

    #[test]
    fn unterminated_string_is_anchored_at_its_start() {
        let mut lexer = Lexer::new("(a \"oops");
        let results: Vec<_> = lexer.by_ref().collect();
        let err = results.last().unwrap().as_ref().unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
        assert_eq!(err.span(), Some(Span::new(1, 4, 3)));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn trailing_backslash_is_an_error() {
        assert!(tokenize("abc\\").is_err());
        assert!(tokenize("|open").is_err());
    }
}

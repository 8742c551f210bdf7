//! SQL tokenizer
//!
//! A small, lossless SQLite-flavoured lexer. Concatenating the text of every
//! token reproduces the input exactly. String literals, quoted identifiers
//! and comments are single tokens, so keyword and separator checks never look
//! inside them.
//!
//! The lexer never fails: an unterminated literal or block comment runs to
//! the end of the input, which matches how SQLite scans comments and leaves
//! unterminated literals for the engine to reject.

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    /// `-- ...` up to (not including) the newline.
    LineComment,
    /// `/* ... */`, or to end of input when unterminated.
    BlockComment,
    /// Bare identifier or keyword.
    Word,
    /// `"ident"`, `` `ident` `` or `[ident]`.
    QuotedIdent,
    /// `'text'` with `''` escapes.
    StringLit,
    Number,
    /// `?`, `?NNN`, `:name`, `@name`, `$name`.
    Parameter,
    Semicolon,
    LParen,
    RParen,
    Comma,
    /// Any other punctuation, one character per token.
    Operator,
}

/// A token borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source.
    pub start: usize,
}

impl<'a> Token<'a> {
    /// Byte offset one past the end of the token.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// True for a bare word equal to `keyword`, ignoring ASCII case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Identifier name with quoting removed, for words and quoted identifiers.
    pub fn identifier(&self) -> Option<String> {
        match self.kind {
            TokenKind::Word => Some(self.text.to_string()),
            TokenKind::QuotedIdent => {
                let text = self.text;
                let open = text.chars().next()?;
                let close = match open {
                    '[' => ']',
                    other => other,
                };
                let inner = text.strip_prefix(open)?;
                let inner = inner.strip_suffix(close).unwrap_or(inner);
                if open == '[' {
                    Some(inner.to_string())
                } else {
                    let doubled: String = [close, close].iter().collect();
                    Some(inner.replace(&doubled, &close.to_string()))
                }
            }
            _ => None,
        }
    }
}

/// Split `sql` into tokens.
pub fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < sql.len() {
        let rest = &sql[pos..];
        // Every arm advances by at least one full character.
        let (kind, len) = match rest.chars().next() {
            Some(c) if c.is_whitespace() => (
                TokenKind::Whitespace,
                scan_while(rest, |c| c.is_whitespace()),
            ),
            Some('-') if rest.starts_with("--") => (
                TokenKind::LineComment,
                rest.find('\n').unwrap_or(rest.len()),
            ),
            Some('/') if rest.starts_with("/*") => (
                TokenKind::BlockComment,
                rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len()),
            ),
            Some('\'') => (TokenKind::StringLit, scan_quoted(rest, '\'')),
            Some('"') => (TokenKind::QuotedIdent, scan_quoted(rest, '"')),
            Some('`') => (TokenKind::QuotedIdent, scan_quoted(rest, '`')),
            Some('[') => (
                TokenKind::QuotedIdent,
                rest.find(']').map(|i| i + 1).unwrap_or(rest.len()),
            ),
            Some(';') => (TokenKind::Semicolon, 1),
            Some('(') => (TokenKind::LParen, 1),
            Some(')') => (TokenKind::RParen, 1),
            Some(',') => (TokenKind::Comma, 1),
            Some('?') => (
                TokenKind::Parameter,
                1 + scan_while(&rest[1..], |c| c.is_ascii_digit()),
            ),
            Some(c @ (':' | '@' | '$')) if rest[c.len_utf8()..].starts_with(is_word_char) => (
                TokenKind::Parameter,
                1 + scan_while(&rest[1..], is_word_char),
            ),
            Some(c) if c.is_ascii_digit() => (TokenKind::Number, scan_number(rest)),
            Some('.') if bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()) => {
                (TokenKind::Number, scan_number(rest))
            }
            Some(c) if is_word_start(c) => (TokenKind::Word, scan_while(rest, is_word_char)),
            Some(c) => (TokenKind::Operator, c.len_utf8()),
            None => break,
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
            start: pos,
        });
        pos += len;
    }

    tokens
}

/// Tokens that are not whitespace or comments.
pub fn significant<'a>(tokens: &[Token<'a>]) -> Vec<Token<'a>> {
    tokens.iter().filter(|t| !t.is_trivia()).copied().collect()
}

/// Rebuild the text with every comment replaced by a single space.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for token in tokenize(sql) {
        if token.is_comment() {
            out.push(' ');
        } else {
            out.push_str(token.text);
        }
    }
    out
}

/// Number of non-empty statements separated by `;`.
pub fn count_statements(sql: &str) -> usize {
    let mut count = 0;
    let mut pending = false;
    for token in tokenize(sql) {
        match token.kind {
            TokenKind::Semicolon => {
                if pending {
                    count += 1;
                }
                pending = false;
            }
            _ if token.is_trivia() => {}
            _ => pending = true,
        }
    }
    if pending {
        count += 1;
    }
    count
}

/// Parenthesis depth before each token of `tokens`.
///
/// Unbalanced closing parentheses clamp at zero.
pub fn depths(tokens: &[Token<'_>]) -> Vec<usize> {
    let mut depth = 0usize;
    tokens
        .iter()
        .map(|t| {
            let before = depth;
            match t.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            if t.kind == TokenKind::RParen {
                depth
            } else {
                before
            }
        })
        .collect()
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

fn scan_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !pred(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Length of a literal opened by `quote`, where a doubled quote is an escape.
fn scan_quoted(s: &str, quote: char) -> usize {
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            if matches!(chars.peek(), Some((_, next)) if *next == quote) {
                chars.next();
                continue;
            }
            return i + c.len_utf8();
        }
    }
    s.len()
}

fn scan_number(s: &str) -> usize {
    let hex = s.starts_with("0x") || s.starts_with("0X");
    let mut prev = '\0';
    for (i, c) in s.char_indices() {
        let exponent_sign = (c == '+' || c == '-') && !hex && (prev == 'e' || prev == 'E');
        if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign) {
            return i;
        }
        prev = c;
    }
    s.len()
}

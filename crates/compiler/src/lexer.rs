//! Lexer for the C subset.
//!
//! Produces a flat token stream with source positions. Positions follow the
//! cursor: a token is stamped with the line and column reached *after* its
//! last character was consumed (tabs advance the column by four). `#` lines
//! are swallowed as preprocessor directives; `//` and `/* ... */` comments
//! are skipped.

use std::collections::HashMap;
use std::sync::LazyLock;

const TAB_WIDTH: usize = 4;
const LONGEST_OPERATOR: usize = 3;

/// Closed set of token kinds. Identifiers and integer literals carry their
/// spelling; everything else is a bare tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Int,
    Void,
    Return,
    If,
    Else,
    Goto,
    While,
    Do,
    For,
    Break,
    Continue,
    Static,
    Extern,

    Identifier(String),
    IntLiteral(String),

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,
    Colon,
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    Ampersand,
    Bar,
    Caret,
    Tilde,
    Bang,
    AmpersandEqual,
    BarEqual,
    CaretEqual,
    AmpersandAmpersand,
    BarBar,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    Equal,
    LessLess,
    GreaterGreater,
    LessLessEqual,
    GreaterGreaterEqual,
    PlusPlus,
    MinusMinus,
}

impl TokenKind {
    /// Source spelling of the token.
    pub fn lexeme(&self) -> &str {
        match self {
            TokenKind::Int => "int",
            TokenKind::Void => "void",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Goto => "goto",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Static => "static",
            TokenKind::Extern => "extern",
            TokenKind::Identifier(name) => name,
            TokenKind::IntLiteral(value) => value,
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Question => "?",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::SlashEqual => "/=",
            TokenKind::PercentEqual => "%=",
            TokenKind::Ampersand => "&",
            TokenKind::Bar => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Bang => "!",
            TokenKind::AmpersandEqual => "&=",
            TokenKind::BarEqual => "|=",
            TokenKind::CaretEqual => "^=",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::BarBar => "||",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::LessLess => "<<",
            TokenKind::GreaterGreater => ">>",
            TokenKind::LessLessEqual => "<<=",
            TokenKind::GreaterGreaterEqual => ">>=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
        }
    }

    /// Human-readable form for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::IntLiteral(value) => format!("constant '{}'", value),
            other => format!("'{}'", other.lexeme()),
        }
    }

    /// Declaration specifiers: the type keyword plus storage classes.
    pub fn is_specifier(&self) -> bool {
        matches!(self, TokenKind::Int | TokenKind::Static | TokenKind::Extern)
    }
}

/// A token with the cursor position reached after consuming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub line: usize,
    pub offset: usize,
    pub kind: TokenKind,
}

static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    HashMap::from([
        ("int", TokenKind::Int),
        ("void", TokenKind::Void),
        ("return", TokenKind::Return),
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("goto", TokenKind::Goto),
        ("while", TokenKind::While),
        ("do", TokenKind::Do),
        ("for", TokenKind::For),
        ("break", TokenKind::Break),
        ("continue", TokenKind::Continue),
        ("static", TokenKind::Static),
        ("extern", TokenKind::Extern),
    ])
});

static PUNCTUATORS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    HashMap::from([
        ("(", TokenKind::LeftParen),
        (")", TokenKind::RightParen),
        ("{", TokenKind::LeftBrace),
        ("}", TokenKind::RightBrace),
        (";", TokenKind::Semicolon),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        ("?", TokenKind::Question),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("+=", TokenKind::PlusEqual),
        ("-=", TokenKind::MinusEqual),
        ("*=", TokenKind::StarEqual),
        ("/=", TokenKind::SlashEqual),
        ("%=", TokenKind::PercentEqual),
        ("&", TokenKind::Ampersand),
        ("|", TokenKind::Bar),
        ("^", TokenKind::Caret),
        ("~", TokenKind::Tilde),
        ("!", TokenKind::Bang),
        ("&=", TokenKind::AmpersandEqual),
        ("|=", TokenKind::BarEqual),
        ("^=", TokenKind::CaretEqual),
        ("&&", TokenKind::AmpersandAmpersand),
        ("||", TokenKind::BarBar),
        ("<", TokenKind::Less),
        (">", TokenKind::Greater),
        ("<=", TokenKind::LessEqual),
        (">=", TokenKind::GreaterEqual),
        ("==", TokenKind::EqualEqual),
        ("!=", TokenKind::BangEqual),
        ("=", TokenKind::Equal),
        ("<<", TokenKind::LessLess),
        (">>", TokenKind::GreaterGreater),
        ("<<=", TokenKind::LessLessEqual),
        (">>=", TokenKind::GreaterGreaterEqual),
        ("++", TokenKind::PlusPlus),
        ("--", TokenKind::MinusMinus),
    ])
});

/// Lexical errors. Positions are the cursor after the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    InvalidCharacter { line: usize, offset: usize, ch: char },
    InvalidNumber { line: usize, offset: usize, value: String },
    UnexpectedEof { context: String },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::InvalidCharacter { line, offset, ch } => {
                write!(f, "invalid character '{}' @ {}:{}", ch, line, offset)
            }
            LexError::InvalidNumber { line, offset, value } => {
                write!(f, "invalid number '{}' @ {}:{}", value, line, offset)
            }
            LexError::UnexpectedEof { context } => {
                write!(f, "unexpected EOF in {}", context)
            }
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            idx: 0,
            line: 1,
            offset: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.chars.len() - self.idx
    }

    fn advance_position(&mut self, ch: char) {
        match ch {
            '\n' => {
                self.line += 1;
                self.offset = 0;
            }
            '\t' => self.offset += TAB_WIDTH,
            _ => self.offset += 1,
        }
    }

    fn eat(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.idx)?;
        self.idx += 1;
        self.advance_position(ch);
        Some(ch)
    }

    fn eat_n(&mut self, n: usize) -> Result<Option<String>, LexError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        if self.remaining() < n {
            return Err(LexError::UnexpectedEof {
                context: format!("eat({})", n),
            });
        }
        let mut chars = String::with_capacity(n);
        for _ in 0..n {
            let ch = self.chars[self.idx];
            self.idx += 1;
            self.advance_position(ch);
            chars.push(ch);
        }
        Ok(Some(chars))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_n(&self, n: usize) -> Result<Option<String>, LexError> {
        if n > 1 && self.remaining() < n {
            return Err(LexError::UnexpectedEof {
                context: format!("peek({})", n),
            });
        }
        if self.remaining() == 0 {
            return Ok(None);
        }
        Ok(Some(self.chars[self.idx..self.idx + n].iter().collect()))
    }

    /// Consume a `#` line to its end. No macro expansion, no includes.
    fn directive(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.eat();
        }
    }

    fn single_line_comment(&mut self) {
        // second '/'
        self.eat();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.eat();
        }
    }

    fn multi_line_comment(&mut self) -> Result<(), LexError> {
        // '*' after the opening slash
        self.eat();
        loop {
            match self.peek_n(2)? {
                Some(two) if two != "*/" => {
                    self.eat();
                }
                _ => break,
            }
        }
        self.eat_n(2)?;
        Ok(())
    }

    fn number(&mut self, first: char) -> Result<Token, LexError> {
        let mut value = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.eat();
            } else {
                break;
            }
        }

        if value.chars().all(|c| c.is_ascii_digit()) {
            Ok(Token {
                line: self.line,
                offset: self.offset,
                kind: TokenKind::IntLiteral(value),
            })
        } else {
            Err(LexError::InvalidNumber {
                line: self.line,
                offset: self.offset,
                value,
            })
        }
    }

    fn identifier_or_keyword(&mut self, first: char) -> Token {
        let mut value = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.eat();
            } else {
                break;
            }
        }

        let kind = match KEYWORDS.get(value.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Identifier(value),
        };
        Token {
            line: self.line,
            offset: self.offset,
            kind,
        }
    }

    /// Greedy longest-match over the punctuator table: probe the lead
    /// character plus two, plus one, then the lead alone. Running out of
    /// input during a probe just means trying the shorter form.
    fn operator(&mut self, first: char) -> Result<Token, LexError> {
        for extra in (1..LONGEST_OPERATOR).rev() {
            let Ok(Some(rest)) = self.peek_n(extra) else {
                continue;
            };
            let candidate = format!("{}{}", first, rest);
            if let Some(kind) = PUNCTUATORS.get(candidate.as_str()) {
                self.eat_n(extra)?;
                return Ok(Token {
                    line: self.line,
                    offset: self.offset,
                    kind: kind.clone(),
                });
            }
        }

        let single = first.to_string();
        match PUNCTUATORS.get(single.as_str()) {
            Some(kind) => Ok(Token {
                line: self.line,
                offset: self.offset,
                kind: kind.clone(),
            }),
            None => unreachable!("operator() called on non-punctuator '{}'", first),
        }
    }

    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.eat() {
            if ch.is_whitespace() {
                continue;
            } else if ch == '#' {
                self.directive();
            } else if ch == '/' && self.peek() == Some('/') {
                self.single_line_comment();
            } else if ch == '/' && self.peek() == Some('*') {
                self.multi_line_comment()?;
            } else if ch.is_ascii_digit() {
                tokens.push(self.number(ch)?);
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                tokens.push(self.identifier_or_keyword(ch));
            } else if PUNCTUATORS.contains_key(ch.to_string().as_str()) {
                tokens.push(self.operator(ch)?);
            } else {
                return Err(LexError::InvalidCharacter {
                    line: self.line,
                    offset: self.offset,
                    ch,
                });
            }
        }
        Ok(tokens)
    }
}

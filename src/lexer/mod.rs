use logos::Logos;

use crate::ast::Span;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum Token {
    // Keywords
    #[token("var")]
    Var,
    #[token("val")]
    Val,
    #[token("def")]
    Def,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Assign,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Short human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Int(n) => format!("integer {n}"),
            Token::Float(n) => format!("float {n}"),
            Token::Str(s) => format!("string \"{s}\""),
            other => format!("'{}'", other.lexeme()),
        }
    }

    fn lexeme(&self) -> &'static str {
        match self {
            Token::Var => "var",
            Token::Val => "val",
            Token::Def => "def",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Return => "return",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Assign => "=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::EqualEqual => "==",
            Token::NotEqual => "!=",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Float(_) | Token::Int(_) | Token::Str(_) | Token::Ident(_) => "literal",
        }
    }
}

/// Reserved words cannot be used as variable, parameter or function names.
pub const KEYWORDS: &[&str] = &[
    "var", "val", "def", "if", "else", "while", "return", "true", "false", "null",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Strip the quotes and resolve `\n`, `\t`, `\"` and `\\`. Unknown escapes are rejected.
fn unescape(raw: &str) -> Option<String> {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }
    Some(out)
}

/// Lex source code into a stream of tokens with spans.
/// Stops at the first unrecognised character and reports where it was.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => tokens.push((token, Span { start: range.start, end: range.end })),
            Err(()) => {
                let snippet = source[range.clone()].to_string();
                return Err(LexError {
                    position: range.start,
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad_token: &str) -> String {
    if bad_token.starts_with('"') {
        "Close the string with '\"' on the same line; valid escapes are \\n \\t \\r \\\" \\\\".to_string()
    } else if bad_token == "&" {
        "Use '&&' for logical and".to_string()
    } else if bad_token == "|" {
        "Use '||' for logical or".to_string()
    } else if bad_token == "'" {
        "Strings use double quotes: \"...\"".to_string()
    } else {
        format!("Unexpected character(s): '{bad_token}'")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_function_header() {
        let tokens = kinds("def add(x: Int, y: Int): Int {");
        assert_eq!(
            tokens,
            vec![
                Token::Def,
                Token::Ident("add".into()),
                Token::LParen,
                Token::Ident("x".into()),
                Token::Colon,
                Token::Ident("Int".into()),
                Token::Comma,
                Token::Ident("y".into()),
                Token::Colon,
                Token::Ident("Int".into()),
                Token::RParen,
                Token::Colon,
                Token::Ident("Int".into()),
                Token::LBrace,
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        assert_eq!(kinds("42 3.5"), vec![Token::Int(42), Token::Float(3.5)]);
    }

    #[test]
    fn lex_two_char_operators() {
        assert_eq!(
            kinds("<= >= == != && || < ! ="),
            vec![
                Token::LessEqual,
                Token::GreaterEqual,
                Token::EqualEqual,
                Token::NotEqual,
                Token::AndAnd,
                Token::OrOr,
                Token::Less,
                Token::Bang,
                Token::Assign,
            ]
        );
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(kinds(r#""a\n\"b\"""#), vec![Token::Str("a\n\"b\"".to_string())]);
    }

    #[test]
    fn lex_keyword_prefix_is_identifier() {
        assert_eq!(kinds("variable"), vec![Token::Ident("variable".into())]);
        assert_eq!(kinds("var"), vec![Token::Var]);
    }

    #[test]
    fn lex_comment_ignored() {
        let tokens = kinds("// a comment\nval x = 1");
        assert_eq!(tokens[0], Token::Val);
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn lex_spans_are_byte_ranges() {
        let tokens = lex("val  x").unwrap();
        assert_eq!(tokens[1].1, Span { start: 5, end: 6 });
    }

    #[test]
    fn lex_error_reports_position() {
        let err = lex("val x = 1 & 2").unwrap_err();
        assert_eq!(err.position, 10);
        assert_eq!(err.snippet, "&");
        assert!(err.suggestion.contains("&&"));
    }

    #[test]
    fn keywords_are_reserved() {
        assert!(is_keyword("while"));
        assert!(!is_keyword("whilst"));
    }
}

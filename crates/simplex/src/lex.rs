//! Token definitions and the lexing entry point.

use logos::Logos;

use crate::{
    error::SimplexError,
    location::{CodeRange, LineIndex},
};

fn unescape(slice: &str) -> Option<String> {
    // Strip the surrounding quotes, then process escapes.
    let inner = &slice[1..slice.len() - 1];
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
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// A lexical token of the Simplex surface syntax.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Token {
    // keywords
    #[token("let")]
    Let,
    #[token("fun")]
    Fun,
    #[token("meth")]
    Meth,
    #[token("data")]
    Data,
    #[token("product")]
    Product,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("lambda")]
    Lambda,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Name(String),
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    StringLit(String),

    // operators and punctuation
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
    #[token("^")]
    Caret,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token(":=")]
    Walrus,
    #[token("=")]
    Eq,
    #[token("->")]
    Arrow,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

impl Token {
    /// Short human-readable description used in parse error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Name(name) => format!("name `{name}`"),
            Self::IntLit(v) => format!("integer literal `{v}`"),
            Self::FloatLit(v) => format!("float literal `{v}`"),
            Self::StringLit(_) => "string literal".to_owned(),
            other => format!("`{}`", token_text(other)),
        }
    }
}

fn token_text(token: &Token) -> &'static str {
    match token {
        Token::Let => "let",
        Token::Fun => "fun",
        Token::Meth => "meth",
        Token::Data => "data",
        Token::Product => "product",
        Token::If => "if",
        Token::Then => "then",
        Token::Elif => "elif",
        Token::Else => "else",
        Token::While => "while",
        Token::For => "for",
        Token::In => "in",
        Token::Lambda => "lambda",
        Token::And => "and",
        Token::Or => "or",
        Token::True => "true",
        Token::False => "false",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::Caret => "^",
        Token::EqEq => "==",
        Token::BangEq => "!=",
        Token::Le => "<=",
        Token::Ge => ">=",
        Token::Lt => "<",
        Token::Gt => ">",
        Token::Bang => "!",
        Token::Walrus => ":=",
        Token::Eq => "=",
        Token::Arrow => "->",
        Token::Dot => ".",
        Token::Comma => ",",
        Token::Semicolon => ";",
        Token::Colon => ":",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::LBrace => "{",
        Token::RBrace => "}",
        Token::Name(_) | Token::IntLit(_) | Token::FloatLit(_) | Token::StringLit(_) => "literal",
    }
}

/// Lexes a whole source file into `(token, position)` pairs.
///
/// Positions are 1-based line/column of the token's first character.
pub(crate) fn lex(source: &str) -> Result<Vec<(Token, CodeRange)>, SimplexError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        let position = index.position(span.start);
        match result {
            Ok(token) => tokens.push((token, position)),
            Err(()) => {
                let snippet: String = source[span.clone()].chars().take(10).collect();
                return Err(SimplexError::parser(
                    format!("unrecognized input starting at `{snippet}`"),
                    position,
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).expect("lexes").into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords_beat_names() {
        assert_eq!(kinds("let letter"), vec![Token::Let, Token::Name("letter".to_owned())]);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            kinds("3 3.5 2e3"),
            vec![Token::IntLit(3), Token::FloatLit(3.5), Token::FloatLit(2000.0)]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(kinds(r#""a\nb""#), vec![Token::StringLit("a\nb".to_owned())]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n/* block\n comment */ 2"),
            vec![Token::IntLit(1), Token::IntLit(2)]
        );
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("== != <= >= := ->"),
            vec![Token::EqEq, Token::BangEq, Token::Le, Token::Ge, Token::Walrus, Token::Arrow]
        );
    }

    #[test]
    fn positions_track_lines() {
        let tokens = lex("a\n  b").expect("lexes");
        assert_eq!(tokens[0].1, CodeRange::new(1, 1));
        assert_eq!(tokens[1].1, CodeRange::new(2, 3));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex("\"abc").expect_err("must fail");
        assert_eq!(err.kind, crate::error::ErrorKind::Parser);
    }
}

//! Lexer for the query language.
//!
//! Tokenizes query text into a sequence of tokens with span information.
//! Keywords (`by`, `on`, `bool`, aggregation names, ...) are contextual in
//! this grammar, so they are produced as plain identifiers and recognized by
//! the parser. Any character no rule can claim becomes an [`Token::Unknown`]
//! token rather than a lexing failure; the parser turns those into error
//! nodes so a tree is always produced.

use chumsky::prelude::*;

/// A token of the query language.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    /// An identifier. Colons are allowed for recording-rule style names.
    Ident(&'src str),
    /// A number literal, including decimals and scientific notation.
    Number(&'src str),
    /// A duration literal such as `5m`, `90s` or `1h30m`.
    Duration(&'src str),
    /// A string literal, quotes included, in any of the three quote styles.
    Str(&'src str),

    // Matching and comparison operators
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    Neq,
    /// `=~`
    EqRegex,
    /// `!~`
    NeqRegex,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,

    // Arithmetic operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `^`
    Caret,

    // Delimiters
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `@`
    At,

    /// A character no other rule could claim.
    Unknown(&'src str),
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(s) => write!(f, "{}", s),
            Token::Duration(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "{}", s),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::Neq => write!(f, "!="),
            Token::EqRegex => write!(f, "=~"),
            Token::NeqRegex => write!(f, "!~"),
            Token::Gt => write!(f, ">"),
            Token::Lt => write!(f, "<"),
            Token::Ge => write!(f, ">="),
            Token::Le => write!(f, "<="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Caret => write!(f, "^"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::At => write!(f, "@"),
            Token::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Create a lexer for the query language.
///
/// Returns a parser that tokenizes the input string into a sequence of
/// tokens with span information, skipping whitespace and `#` comments.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    // Identifiers: metric, label and function names. Colons are legal so
    // recording-rule names like `job:requests:rate5m` lex as one token.
    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_' || *c == ':')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
                .repeated(),
        )
        .to_slice()
        .map(Token::Ident);

    // Durations: one or more number+unit groups, e.g. 5m, 500ms, 1h30m.
    // "ms" must be tried before "m".
    let duration = text::digits(10)
        .then(choice((
            just("ms"),
            just("s"),
            just("m"),
            just("h"),
            just("d"),
            just("w"),
            just("y"),
        )))
        .repeated()
        .at_least(1)
        .to_slice()
        .map(Token::Duration);

    // Numbers: integers, decimals and scientific notation.
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .then(
            one_of("eE")
                .then(one_of("+-").or_not())
                .then(text::digits(10))
                .or_not(),
        )
        .to_slice()
        .map(Token::Number);

    // String literals keep their surrounding quotes; one layer is stripped
    // during lowering. Double and single quoted strings support backslash
    // escapes, backticks are raw.
    let double_quoted = just('"')
        .then(
            choice((just('\\').then(any()).ignored(), none_of("\"\\").ignored()))
                .repeated(),
        )
        .then(just('"'))
        .to_slice();
    let single_quoted = just('\'')
        .then(
            choice((just('\\').then(any()).ignored(), none_of("'\\").ignored()))
                .repeated(),
        )
        .then(just('\''))
        .to_slice();
    let backtick_quoted = just('`').then(none_of('`').repeated()).then(just('`')).to_slice();
    let string_lit = choice((double_quoted, single_quoted, backtick_quoted)).map(Token::Str);

    // Symbols (multi-char first, then single-char)
    let symbol = choice((
        just("=~").to(Token::EqRegex),
        just("!~").to(Token::NeqRegex),
        just("==").to(Token::EqEq),
        just("!=").to(Token::Neq),
        just(">=").to(Token::Ge),
        just("<=").to(Token::Le),
        just('=').to(Token::Eq),
        just('>').to(Token::Gt),
        just('<').to(Token::Lt),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('^').to(Token::Caret),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just(',').to(Token::Comma),
        just('@').to(Token::At),
    ));

    // Comments: # ... until newline
    let comment = just('#')
        .then(any().and_is(just('\n').not()).repeated())
        .ignored();

    // Fallback: claim a single character so lexing itself never fails.
    let unknown = any().to_slice().map(Token::Unknown);

    // A single token with span
    let token = choice((string_lit, duration, number, ident, symbol, unknown))
        .map_with(|tok, e| (tok, e.span()));

    token
        .padded_by(comment.padded().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.padded().repeated())
        .padded()
        .then_ignore(end())
}

/// Lex a source string into tokens.
///
/// Returns Ok with the token list on success, or Err with the parse errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}

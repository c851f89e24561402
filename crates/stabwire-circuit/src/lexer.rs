//! Lexer for a single circuit line.

use logos::Logos;

/// Tokens of one instruction line.
///
/// Line splitting happens before lexing because the line delimiter is chosen
/// per request; whatever whitespace remains inside a line is skipped.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\x0B\x0C]+")]
pub enum Token {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Mnemonic(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Mnemonic(s) => write!(f, "'{s}'"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::Comma => write!(f, "','"),
        }
    }
}

/// Tokenize one line, reporting the first invalid slice.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => {
                let slice = &line[lexer.span()];
                return Err(format!("Invalid token: '{slice}'"));
            }
        }
    }

    Ok(tokens)
}

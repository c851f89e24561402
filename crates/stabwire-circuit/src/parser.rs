//! Parser for circuit text.

use crate::circuit::{Circuit, Instruction, OpCode};
use crate::dialect::Dialect;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Token, tokenize};

/// Parse circuit text whose lines are separated by `delimiter`.
///
/// Checks op codes and operand counts only; call [`Circuit::validate`] for
/// register rules.
pub fn parse(text: &str, delimiter: char) -> ParseResult<Circuit> {
    check_delimiter(delimiter)?;

    let mut circuit = Circuit::new();
    for (idx, line) in text.split(delimiter).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parser = LineParser::new(line, idx + 1)?;
        circuit.push(parser.parse_instruction()?);
    }
    Ok(circuit)
}

/// Parse a program as it arrives on the wire: dialect name, text and the
/// numeric code point of the line delimiter.
pub fn parse_program(dialect: &str, text: &str, delimiter_code: u32) -> ParseResult<Circuit> {
    let _dialect: Dialect = dialect.parse()?;
    let delimiter = delimiter_from_code(delimiter_code)?;
    parse(text, delimiter)
}

/// Convert a delimiter code point to a usable delimiter character.
pub fn delimiter_from_code(code: u32) -> ParseResult<char> {
    let delimiter = char::from_u32(code).ok_or(ParseError::InvalidDelimiter(code))?;
    check_delimiter(delimiter)?;
    Ok(delimiter)
}

fn check_delimiter(delimiter: char) -> ParseResult<()> {
    if delimiter.is_alphanumeric() || matches!(delimiter, '_' | ',' | ' ') {
        return Err(ParseError::InvalidDelimiter(u32::from(delimiter)));
    }
    Ok(())
}

/// Parser state for one line.
struct LineParser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl LineParser {
    fn new(source: &str, line: usize) -> ParseResult<Self> {
        let tokens =
            tokenize(source).map_err(|message| ParseError::LexerError { line, message })?;
        Ok(Self {
            tokens,
            pos: 0,
            line,
        })
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn found(token: Option<&Token>) -> String {
        token.map_or_else(|| "end of line".to_string(), ToString::to_string)
    }

    fn parse_instruction(&mut self) -> ParseResult<Instruction> {
        let mnemonic = match self.advance() {
            Some(Token::Mnemonic(m)) => m,
            other => {
                return Err(ParseError::UnexpectedToken {
                    line: self.line,
                    expected: "instruction".into(),
                    found: Self::found(other.as_ref()),
                });
            }
        };

        let op = OpCode::from_mnemonic(&mnemonic).ok_or_else(|| {
            ParseError::UnknownInstruction {
                line: self.line,
                mnemonic: mnemonic.clone(),
            }
        })?;

        let operands = self.parse_operands()?;
        if operands.len() != op.arity() {
            return Err(ParseError::WrongOperandCount {
                line: self.line,
                mnemonic,
                expected: op.arity(),
                got: operands.len(),
            });
        }

        let inst = match op {
            OpCode::Init => Instruction::Init {
                qubits: operands[0],
            },
            OpCode::Gate(gate) => Instruction::Gate {
                gate,
                qubit: operands[0],
            },
            OpCode::Cnot => Instruction::Cnot {
                control: operands[0],
                target: operands[1],
            },
            OpCode::Measure => Instruction::Measure {
                qubit: operands[0],
            },
        };
        Ok(inst)
    }

    /// Comma separated integer list, possibly empty.
    fn parse_operands(&mut self) -> ParseResult<Vec<usize>> {
        let mut operands = Vec::new();
        if self.pos >= self.tokens.len() {
            return Ok(operands);
        }

        loop {
            operands.push(self.expect_int()?);
            match self.advance() {
                None => return Ok(operands),
                Some(Token::Comma) => {}
                Some(other) => {
                    return Err(ParseError::UnexpectedToken {
                        line: self.line,
                        expected: "','".into(),
                        found: other.to_string(),
                    });
                }
            }
        }
    }

    fn expect_int(&mut self) -> ParseResult<usize> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => {
                usize::try_from(v).map_err(|_| ParseError::LexerError {
                    line: self.line,
                    message: format!("Integer {v} does not fit a qubit index"),
                })
            }
            other => Err(ParseError::UnexpectedToken {
                line: self.line,
                expected: "qubit index".into(),
                found: Self::found(other.as_ref()),
            }),
        }
    }
}

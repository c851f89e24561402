//! Error types for the circuit language.

use thiserror::Error;

/// Errors that can occur while parsing or validating a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The dialect name is not known.
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    /// The line delimiter cannot be used to separate instructions.
    #[error("Invalid line delimiter: code point {0}")]
    InvalidDelimiter(u32),

    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// The op code is not part of the dialect.
    #[error("Unknown instruction at line {line}: '{mnemonic}'")]
    UnknownInstruction { line: usize, mnemonic: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Wrong number of operands.
    #[error("Instruction '{mnemonic}' at line {line} expects {expected} operands, got {got}")]
    WrongOperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        got: usize,
    },

    /// `init` appears more than once.
    #[error("Duplicate init at instruction {index}")]
    DuplicateInit { index: usize },

    /// `init` is not the first instruction.
    #[error("init must be the first instruction, found at instruction {index}")]
    InitNotFirst { index: usize },

    /// Qubits are referenced but no register is known.
    #[error("Circuit references qubits but declares no register with init")]
    MissingInit,

    /// Qubit index out of range.
    #[error("Qubit {qubit} out of range at instruction {index} (register size {size})")]
    QubitOutOfRange {
        index: usize,
        qubit: usize,
        size: usize,
    },

    /// A two-qubit instruction names the same qubit twice.
    #[error("Control and target are both qubit {qubit} at instruction {index}")]
    SameControlTarget { index: usize, qubit: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

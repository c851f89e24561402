//! Circuit language for stabwire
//!
//! A line-oriented instruction language for stabilizer circuits. Each line is
//! an op code followed by comma separated qubit indices; the line delimiter is
//! chosen per request and travels next to the text as a code point.
//!
//! # Instructions (`chpext` dialect)
//!
//! | Op code | Operands | Meaning |
//! |---------|----------|---------|
//! | `init` | count | declare a register of `count` qubits in \|0⟩ |
//! | `i`, `x`, `y`, `z` | qubit | identity or Pauli |
//! | `h` | qubit | Hadamard |
//! | `p` | qubit | phase gate S |
//! | `c` | control,target | CNOT |
//! | `m` | qubit | measure, append one outcome bit |
//!
//! # Example
//!
//! ```rust
//! use stabwire_circuit::{Circuit, parse};
//!
//! let mut circuit = Circuit::with_qubits(2);
//! circuit.h(0).cnot(0, 1).measure(0).measure(1);
//!
//! let text = circuit.to_text('\n');
//! assert_eq!(text, "init 2\nh 0\nc 0,1\nm 0\nm 1\n");
//!
//! let parsed = parse(&text, '\n').unwrap();
//! assert_eq!(parsed, circuit);
//! assert!(parsed.validate(None).is_ok());
//! assert_eq!(parsed.measurement_count(), 2);
//! ```

mod circuit;
mod dialect;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use circuit::{Circuit, Gate, Instruction, OpCode};
pub use dialect::Dialect;
pub use emitter::emit;
pub use error::{ParseError, ParseResult};
pub use parser::{delimiter_from_code, parse, parse_program};

/// Conventional line delimiter code point (`'\n'`).
pub const DEFAULT_DELIMITER: u32 = 10;

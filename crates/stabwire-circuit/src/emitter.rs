//! Emitter for wire circuit text.

use std::fmt::Write;

use crate::circuit::Circuit;

/// Emit a circuit as wire text, one instruction per line, every line
/// terminated by `delimiter`.
pub fn emit(circuit: &Circuit, delimiter: char) -> String {
    let mut output = String::with_capacity(circuit.len() * 6);
    for inst in circuit.instructions() {
        // Writing to a String cannot fail.
        let _ = write!(output, "{inst}");
        output.push(delimiter);
    }
    output
}

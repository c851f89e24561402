//! Circuit representation and validation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ParseError, ParseResult};

/// Single-qubit Clifford operations of the chpext dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// Identity (`i`).
    I,
    /// Hadamard (`h`).
    H,
    /// Phase, S = diag(1, i) (`p`).
    P,
    /// Pauli X (`x`).
    X,
    /// Pauli Y (`y`).
    Y,
    /// Pauli Z (`z`).
    Z,
}

impl Gate {
    /// Wire mnemonic of this gate.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Gate::I => "i",
            Gate::H => "h",
            Gate::P => "p",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
        }
    }

    /// Pauli operator selected by a two-bit message, in superdense coding order.
    ///
    /// `0 → I`, `1 → X`, `2 → Z`, `3 → Y`; larger values wrap.
    pub fn pauli_for_index(index: u8) -> Gate {
        match index & 0b11 {
            0 => Gate::I,
            1 => Gate::X,
            2 => Gate::Z,
            _ => Gate::Y,
        }
    }
}

/// Instruction op codes, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Init,
    Gate(Gate),
    Cnot,
    Measure,
}

impl OpCode {
    /// Look up an op code by mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let op = match mnemonic {
            "init" => OpCode::Init,
            "i" => OpCode::Gate(Gate::I),
            "h" => OpCode::Gate(Gate::H),
            "p" => OpCode::Gate(Gate::P),
            "x" => OpCode::Gate(Gate::X),
            "y" => OpCode::Gate(Gate::Y),
            "z" => OpCode::Gate(Gate::Z),
            "c" => OpCode::Cnot,
            "m" => OpCode::Measure,
            _ => return None,
        };
        Some(op)
    }

    /// Wire mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Init => "init",
            OpCode::Gate(gate) => gate.mnemonic(),
            OpCode::Cnot => "c",
            OpCode::Measure => "m",
        }
    }

    /// Number of operands the op code takes.
    pub fn arity(self) -> usize {
        match self {
            OpCode::Cnot => 2,
            OpCode::Init | OpCode::Gate(_) | OpCode::Measure => 1,
        }
    }
}

/// A single circuit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Declare a register of `qubits` qubits, all in |0⟩.
    Init { qubits: usize },
    /// Apply a single-qubit gate.
    Gate { gate: Gate, qubit: usize },
    /// Controlled-X.
    Cnot { control: usize, target: usize },
    /// Measure in the computational basis, appending one outcome bit.
    Measure { qubit: usize },
}

impl Instruction {
    /// The op code of this instruction.
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Init { .. } => OpCode::Init,
            Instruction::Gate { gate, .. } => OpCode::Gate(*gate),
            Instruction::Cnot { .. } => OpCode::Cnot,
            Instruction::Measure { .. } => OpCode::Measure,
        }
    }

    /// Qubit indices this instruction acts on.
    pub fn qubits(&self) -> Vec<usize> {
        match *self {
            Instruction::Init { .. } => Vec::new(),
            Instruction::Gate { qubit, .. } | Instruction::Measure { qubit } => vec![qubit],
            Instruction::Cnot { control, target } => vec![control, target],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Init { qubits } => write!(f, "init {qubits}"),
            Instruction::Gate { gate, qubit } => write!(f, "{} {qubit}", gate.mnemonic()),
            Instruction::Cnot { control, target } => write!(f, "c {control},{target}"),
            Instruction::Measure { qubit } => write!(f, "m {qubit}"),
        }
    }
}

/// An ordered list of instructions.
///
/// Builder methods never fail; call [`Circuit::validate`] before sending a
/// circuit anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a circuit that starts with `init qubits`.
    pub fn with_qubits(qubits: usize) -> Self {
        let mut circuit = Self::new();
        circuit.push(Instruction::Init { qubits });
        circuit
    }

    /// Build a circuit from instructions.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// The instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Append all instructions of another circuit.
    pub fn append(&mut self, other: &Circuit) -> &mut Self {
        self.instructions.extend_from_slice(&other.instructions);
        self
    }

    /// Append `init qubits`.
    pub fn init(&mut self, qubits: usize) -> &mut Self {
        self.push(Instruction::Init { qubits })
    }

    /// Apply a single-qubit gate.
    pub fn gate(&mut self, gate: Gate, qubit: usize) -> &mut Self {
        self.push(Instruction::Gate { gate, qubit })
    }

    pub fn id(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::I, qubit)
    }

    pub fn h(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::H, qubit)
    }

    pub fn p(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::P, qubit)
    }

    pub fn x(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::X, qubit)
    }

    pub fn y(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::Y, qubit)
    }

    pub fn z(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::Z, qubit)
    }

    /// Apply CNOT with the given control and target.
    pub fn cnot(&mut self, control: usize, target: usize) -> &mut Self {
        self.push(Instruction::Cnot { control, target })
    }

    /// Measure one qubit.
    pub fn measure(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::Measure { qubit })
    }

    /// Measure every qubit of the declared register, in index order.
    ///
    /// Does nothing if the circuit has no `init`.
    pub fn measure_all(&mut self) -> &mut Self {
        if let Some(n) = self.declared_qubits() {
            for q in 0..n {
                self.measure(q);
            }
        }
        self
    }

    /// Register size declared by `init`, if any.
    pub fn declared_qubits(&self) -> Option<usize> {
        self.instructions.iter().find_map(|inst| match inst {
            Instruction::Init { qubits } => Some(*qubits),
            _ => None,
        })
    }

    /// Size of the register the circuit touches.
    ///
    /// The `init` declaration if present, otherwise one past the highest
    /// referenced index.
    pub fn qubit_count(&self) -> usize {
        self.declared_qubits().unwrap_or_else(|| {
            self.instructions
                .iter()
                .flat_map(Instruction::qubits)
                .max()
                .map_or(0, |q| q + 1)
        })
    }

    /// Number of `m` instructions, which is the length of the result.
    pub fn measurement_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|inst| matches!(inst, Instruction::Measure { .. }))
            .count()
    }

    /// Check the structural rules of the language.
    ///
    /// `register` is the size of an already existing register the circuit
    /// will run against (a named state). When the circuit has its own `init`,
    /// that declaration wins.
    pub fn validate(&self, register: Option<usize>) -> ParseResult<()> {
        let mut size = register;

        for (index, inst) in self.instructions.iter().enumerate() {
            match *inst {
                Instruction::Init { qubits } => {
                    if index != 0 {
                        let duplicate = self.instructions[..index]
                            .iter()
                            .any(|i| matches!(i, Instruction::Init { .. }));
                        return Err(if duplicate {
                            ParseError::DuplicateInit { index }
                        } else {
                            ParseError::InitNotFirst { index }
                        });
                    }
                    size = Some(qubits);
                }
                Instruction::Cnot { control, target } if control == target => {
                    return Err(ParseError::SameControlTarget {
                        index,
                        qubit: control,
                    });
                }
                _ => {}
            }

            for qubit in inst.qubits() {
                let size = size.ok_or(ParseError::MissingInit)?;
                if qubit >= size {
                    return Err(ParseError::QubitOutOfRange { index, qubit, size });
                }
            }
        }

        Ok(())
    }

    /// Render the circuit as wire text, ending every line with `delimiter`.
    pub fn to_text(&self, delimiter: char) -> String {
        crate::emitter::emit(self, delimiter)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let mut circuit = Circuit::with_qubits(3);
        circuit.h(1).cnot(1, 2).x(0).measure(0);

        assert_eq!(circuit.len(), 5);
        assert_eq!(circuit.declared_qubits(), Some(3));
        assert_eq!(circuit.measurement_count(), 1);
        assert_eq!(circuit.qubit_count(), 3);
        assert!(circuit.validate(None).is_ok());
    }

    #[test]
    fn test_measure_all() {
        let mut circuit = Circuit::with_qubits(4);
        circuit.measure_all();
        assert_eq!(circuit.measurement_count(), 4);

        let mut no_init = Circuit::new();
        no_init.measure_all();
        assert!(no_init.is_empty());
    }

    #[test]
    fn test_validate_missing_init() {
        let mut circuit = Circuit::new();
        circuit.measure(0);
        assert_eq!(circuit.validate(None), Err(ParseError::MissingInit));
        assert!(circuit.validate(Some(1)).is_ok());
        assert_eq!(circuit.qubit_count(), 1);
    }

    #[test]
    fn test_validate_out_of_range() {
        let mut circuit = Circuit::with_qubits(2);
        circuit.h(2);
        assert_eq!(
            circuit.validate(None),
            Err(ParseError::QubitOutOfRange {
                index: 1,
                qubit: 2,
                size: 2
            })
        );
    }

    #[test]
    fn test_validate_init_placement() {
        let mut late = Circuit::new();
        late.push(Instruction::Init { qubits: 1 });
        late.h(0).push(Instruction::Init { qubits: 2 });
        assert_eq!(late.validate(None), Err(ParseError::DuplicateInit { index: 2 }));

        let mut second = Circuit::new();
        second.id(0).push(Instruction::Init { qubits: 1 });
        assert_eq!(
            second.validate(Some(1)),
            Err(ParseError::InitNotFirst { index: 1 })
        );
    }

    #[test]
    fn test_validate_same_control_target() {
        let mut circuit = Circuit::with_qubits(2);
        circuit.cnot(1, 1);
        assert!(matches!(
            circuit.validate(None),
            Err(ParseError::SameControlTarget { index: 1, qubit: 1 })
        ));
    }

    #[test]
    fn test_init_overrides_register() {
        let mut circuit = Circuit::with_qubits(5);
        circuit.h(4);
        assert!(circuit.validate(Some(2)).is_ok());
    }

    #[test]
    fn test_empty_circuit_is_valid() {
        assert!(Circuit::new().validate(None).is_ok());
        assert_eq!(Circuit::new().measurement_count(), 0);
    }

    #[test]
    fn test_pauli_for_index() {
        assert_eq!(Gate::pauli_for_index(0), Gate::I);
        assert_eq!(Gate::pauli_for_index(1), Gate::X);
        assert_eq!(Gate::pauli_for_index(2), Gate::Z);
        assert_eq!(Gate::pauli_for_index(3), Gate::Y);
    }

    #[test]
    fn test_opcode_lookup() {
        for name in ["init", "i", "h", "p", "x", "y", "z", "c", "m"] {
            let op = OpCode::from_mnemonic(name).unwrap();
            assert_eq!(op.mnemonic(), name);
        }
        assert!(OpCode::from_mnemonic("cx").is_none());
        assert_eq!(OpCode::Cnot.arity(), 2);
    }
}

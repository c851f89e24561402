//! Stabilizer simulation engine.
//!
//! Circuits arrive already parsed and validated; the engine only executes
//! them against a register and collects measurement outcomes.

pub mod chp;

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use stabwire_circuit::{Circuit, Gate, Instruction};
use stabwire_proto::{KIND_CHP_STATE, Outcomes};

use crate::error::ServerError;

pub use chp::{MeasureOutcome, Tableau};

/// Representation used for the states of one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// CHP stabilizer tableau.
    Chp,
}

impl StateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Chp => KIND_CHP_STATE,
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            KIND_CHP_STATE => Ok(StateKind::Chp),
            other => Err(ServerError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Run a circuit on `tableau`, returning one outcome per `m`.
///
/// `init n` replaces the register with `n` fresh qubits in |0⟩.
pub fn execute<R: Rng + ?Sized>(tableau: &mut Tableau, circuit: &Circuit, rng: &mut R) -> Outcomes {
    let mut bits = Vec::with_capacity(circuit.measurement_count());

    for inst in circuit.instructions() {
        match *inst {
            Instruction::Init { qubits } => *tableau = Tableau::new(qubits),
            Instruction::Gate { gate, qubit } => match gate {
                Gate::I => {}
                Gate::H => tableau.h(qubit),
                Gate::P => tableau.s(qubit),
                Gate::X => tableau.x(qubit),
                Gate::Y => tableau.y(qubit),
                Gate::Z => tableau.z(qubit),
            },
            Instruction::Cnot { control, target } => tableau.cnot(control, target),
            Instruction::Measure { qubit } => {
                let outcome = tableau.measure(qubit, rng);
                trace!(qubit, ?outcome, "measured");
                bits.push(outcome.bit());
            }
        }
    }

    Outcomes::from_bits(bits)
}

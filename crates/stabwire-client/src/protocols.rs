//! Measurement-conditioned protocols built on a [`Session`].
//!
//! Each protocol owns the system (and state) it creates and releases them
//! on every exit path. A cleanup failure after an earlier error is logged
//! and the earlier error is returned.

use std::fmt;
use tracing::{debug, info, warn};

use stabwire_circuit::{Circuit, Gate};
use stabwire_proto::{Outcomes, StateId, SystemId};

use crate::error::{CallError, CallResult};
use crate::session::Session;
use crate::transport::Transport;

/// Lifecycle of one protocol run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Uncreated,
    SystemCreated,
    StateCreated,
    Measured,
    Deleted,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Deleted | Phase::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Uncreated, SystemCreated) => true,
            (SystemCreated | StateCreated, StateCreated) => true,
            (SystemCreated | StateCreated | Measured, Measured | Deleted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uncreated => "uncreated",
            Phase::SystemCreated => "system-created",
            Phase::StateCreated => "state-created",
            Phase::Measured => "measured",
            Phase::Deleted => "deleted",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Phase tracker plus the resources a run must release.
struct Run {
    protocol: &'static str,
    phase: Phase,
    system: Option<SystemId>,
    state: Option<StateId>,
}

impl Run {
    fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            phase: Phase::Uncreated,
            system: None,
            state: None,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "{}: {} -> {next}",
            self.protocol,
            self.phase
        );
        debug!(protocol = self.protocol, from = %self.phase, to = %next, "phase");
        self.phase = next;
    }

    fn system(&self) -> CallResult<&SystemId> {
        self.system
            .as_ref()
            .ok_or_else(|| CallError::Usage(format!("{}: no system yet", self.protocol)))
    }

    async fn create_system<T: Transport>(&mut self, session: &mut Session<T>, kind: &str) -> CallResult<SystemId> {
        let id = session.create_system(kind).await?;
        self.system = Some(id.clone());
        self.advance(Phase::SystemCreated);
        Ok(id)
    }

    async fn create_state<T: Transport>(&mut self, session: &mut Session<T>, circuit: &Circuit) -> CallResult<StateId> {
        let system = self.system()?.clone();
        let id = session.create_state(&system, circuit).await?;
        self.state = Some(id.clone());
        self.advance(Phase::StateCreated);
        Ok(id)
    }

    /// Release everything in reverse order of creation.
    async fn release<T: Transport>(&mut self, session: &mut Session<T>) -> CallResult<()> {
        let mut first_error = None;
        if let (Some(system), Some(state)) = (&self.system, self.state.take()) {
            if let Err(e) = session.delete_state(system, &state).await {
                first_error.get_or_insert(e);
            }
        }
        if let Some(system) = self.system.take() {
            if let Err(e) = session.delete_system(&system).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release resources and settle the outcome of the run.
    async fn finish<T: Transport, R>(mut self, session: &mut Session<T>, outcome: CallResult<R>) -> CallResult<R> {
        match outcome {
            Ok(value) => {
                if let Err(e) = self.release(session).await {
                    self.advance(Phase::Failed);
                    return Err(e);
                }
                self.advance(Phase::Deleted);
                Ok(value)
            }
            Err(e) => {
                let from = self.phase;
                self.advance(Phase::Failed);
                warn!(protocol = self.protocol, phase = %from, error = %e, "protocol failed");
                if let Err(cleanup) = self.release(session).await {
                    warn!(protocol = self.protocol, error = %cleanup, "cleanup failed");
                }
                Err(e)
            }
        }
    }
}

/// A two-bit message, `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TwoBits(u8);

impl TwoBits {
    pub fn new(value: u8) -> Option<Self> {
        (value < 4).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Pauli applied to the sender's half of the pair.
    pub fn encoding_gate(self) -> Gate {
        Gate::pauli_for_index(self.0)
    }

    /// Bits in measurement order, high bit first.
    pub fn to_outcomes(self) -> Outcomes {
        Outcomes::from_bits(vec![self.0 & 0b10 != 0, self.0 & 0b01 != 0])
    }
}

impl TryFrom<u8> for TwoBits {
    type Error = CallError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| CallError::Usage(format!("message must be 0..=3, got {value}")))
    }
}

impl fmt::Display for TwoBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02b}", self.0)
    }
}

/// Pauli corrections on the receiving qubit after a Bell measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Corrections {
    pub x: bool,
    pub z: bool,
}

impl Corrections {
    /// Corrections on qubit 2 followed by its measurement.
    pub fn circuit(self) -> Circuit {
        let mut circuit = Circuit::new();
        if self.x {
            circuit.x(2);
        }
        if self.z {
            circuit.z(2);
        }
        circuit.measure(2);
        circuit
    }
}

impl fmt::Display for Corrections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.x, self.z) {
            (false, false) => f.write_str("none"),
            (true, false) => f.write_str("X"),
            (false, true) => f.write_str("Z"),
            (true, true) => f.write_str("X,Z"),
        }
    }
}

/// Branching rule for teleportation.
///
/// The second Bell bit selects `X`, the first selects `Z`.
pub fn corrections(bell: &Outcomes) -> Corrections {
    Corrections {
        x: bell.bit(1) == Some(true),
        z: bell.bit(0) == Some(true),
    }
}

/// What happened during one teleportation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeleportReport {
    pub payload: bool,
    pub bell: Outcomes,
    pub corrections: Corrections,
    pub received: bool,
}

impl TeleportReport {
    pub fn succeeded(&self) -> bool {
        self.payload == self.received
    }
}

fn qrng_circuit(qubits: usize) -> Circuit {
    let mut circuit = Circuit::with_qubits(qubits);
    for q in 0..qubits {
        circuit.h(q).measure(q);
    }
    circuit
}

fn superdense_circuit(message: TwoBits) -> Circuit {
    let mut circuit = Circuit::with_qubits(2);
    circuit
        .h(0)
        .cnot(0, 1)
        .gate(message.encoding_gate(), 0)
        .cnot(0, 1)
        .h(0)
        .measure(0)
        .measure(1);
    circuit
}

fn teleport_init(payload: bool) -> Circuit {
    let mut circuit = Circuit::with_qubits(3);
    circuit
        .h(1)
        .cnot(1, 2)
        .gate(if payload { Gate::X } else { Gate::I }, 0);
    circuit
}

fn bell_measurement() -> Circuit {
    let mut circuit = Circuit::new();
    circuit.cnot(0, 1).h(0).measure(0).measure(1);
    circuit
}

/// `qubits` uniformly random bits from Hadamard-then-measure.
pub async fn qrng<T: Transport>(session: &mut Session<T>, kind: &str, qubits: usize) -> CallResult<Outcomes> {
    if qubits == 0 {
        return Err(CallError::Usage("qrng needs at least one qubit".into()));
    }
    let mut run = Run::new("qrng");
    let outcome: CallResult<Outcomes> = async {
        let system = run.create_system(session, kind).await?;
        let bits = session.compute_result(&system, &qrng_circuit(qubits)).await?;
        run.advance(Phase::Measured);
        Ok(bits)
    }
    .await;
    run.finish(session, outcome).await
}

/// Send two classical bits through one shared Bell pair.
pub async fn superdense<T: Transport>(session: &mut Session<T>, kind: &str, message: TwoBits) -> CallResult<Outcomes> {
    let mut run = Run::new("superdense");
    let outcome: CallResult<Outcomes> = async {
        let system = run.create_system(session, kind).await?;
        let decoded = session
            .compute_result(&system, &superdense_circuit(message))
            .await?;
        run.advance(Phase::Measured);
        Ok(decoded)
    }
    .await;
    let decoded = run.finish(session, outcome).await?;
    info!(sent = %message, received = %decoded, "superdense coding");
    Ok(decoded)
}

/// Teleport `payload` from qubit 0 to qubit 2 on a named state.
pub async fn teleport<T: Transport>(session: &mut Session<T>, kind: &str, payload: bool) -> CallResult<TeleportReport> {
    let mut run = Run::new("teleport");
    let outcome: CallResult<TeleportReport> = async {
        let system = run.create_system(session, kind).await?;
        let state = run.create_state(session, &teleport_init(payload)).await?;

        let bell = session
            .measure_state(&system, &state, &bell_measurement())
            .await?;
        run.advance(Phase::Measured);

        let fix = corrections(&bell);
        let received = session
            .measure_state(&system, &state, &fix.circuit())
            .await?;
        run.advance(Phase::Measured);

        let received = received
            .bit(0)
            .ok_or_else(|| CallError::Protocol("empty outcome for qubit 2".into()))?;
        Ok(TeleportReport {
            payload,
            bell,
            corrections: fix,
            received,
        })
    }
    .await;
    let report = run.finish(session, outcome).await?;
    info!(
        payload = report.payload,
        bell = %report.bell,
        corrections = %report.corrections,
        received = report.received,
        "teleportation"
    );
    Ok(report)
}

//! A lock-step session over one channel, with a ledger of live ids.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stabwire_circuit::{Circuit, Dialect, delimiter_from_code};
use stabwire_proto::{Call, Handler, Outcomes, Program, Response, ResultExt, StateId, SystemId};

use crate::config::ClientConfig;
use crate::error::{CallError, CallResult};
use crate::transport::{LoopbackTransport, TcpTransport, Transport};

/// A named state the session created and has not yet deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LiveState {
    system: SystemId,
    state: StateId,
    qubits: usize,
}

/// Client side of one channel.
///
/// Every id the server hands out is recorded until it is deleted, so
/// [`Session::close`] can release whatever an interrupted run left behind.
/// Circuits are validated locally before they are sent.
pub struct Session<T: Transport> {
    transport: T,
    delimiter: char,
    delimiter_code: u32,
    systems: Vec<SystemId>,
    states: Vec<LiveState>,
}

impl Session<TcpTransport> {
    /// Connect over TCP using `config`.
    pub async fn connect(config: &ClientConfig) -> CallResult<Self> {
        let transport = TcpTransport::connect(config.address.as_str(), config.timeout()).await?;
        info!(address = %config.address, "session opened");
        Self::with_delimiter(transport, config.delimiter)
    }
}

impl Session<LoopbackTransport> {
    /// Session against an in-process handler.
    pub fn loopback(handler: Arc<dyn Handler>) -> Self {
        Self::new(LoopbackTransport::new(handler))
    }
}

impl<T: Transport> Session<T> {
    /// Session using `'\n'` as the line delimiter.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            delimiter: '\n',
            delimiter_code: u32::from('\n'),
            systems: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Session sending circuit text split on the code point `code`.
    pub fn with_delimiter(transport: T, code: u32) -> CallResult<Self> {
        let delimiter = delimiter_from_code(code)?;
        Ok(Self {
            transport,
            delimiter,
            delimiter_code: code,
            systems: Vec::new(),
            states: Vec::new(),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Systems created and not yet deleted.
    pub fn live_systems(&self) -> &[SystemId] {
        &self.systems
    }

    /// `(system, state)` pairs created and not yet deleted.
    pub fn live_states(&self) -> Vec<(SystemId, StateId)> {
        self.states
            .iter()
            .map(|s| (s.system.clone(), s.state.clone()))
            .collect()
    }

    /// Send one call and wait for its reply.
    pub async fn call(&mut self, call: Call) -> CallResult<Value> {
        let method = call.method();
        let request = call.into_request().encode()?;
        debug!(%method, channel = %self.transport.describe(), "request");

        let reply = self.transport.round_trip(request).await?;
        Response::decode(&reply).map_err(|e| {
            debug!(%method, error = %e, "call failed");
            CallError::from(e)
        })
    }

    pub async fn create_system(&mut self, kind: &str) -> CallResult<SystemId> {
        let id: SystemId = self
            .call(Call::CreateSystem { kind: kind.to_string() })
            .await?
            .typed("system id")?;
        debug!(system = %id, kind, "system created");
        self.systems.push(id.clone());
        Ok(id)
    }

    /// Create a named state by running `circuit`, which must start with `init`.
    pub async fn create_state(&mut self, system: &SystemId, circuit: &Circuit) -> CallResult<StateId> {
        circuit.validate(None)?;
        let qubits = circuit.qubit_count();
        let program = self.program(circuit);
        let id: StateId = self
            .call(Call::CreateState {
                system: system.clone(),
                program,
            })
            .await?
            .typed("state id")?;
        debug!(system = %system, state = %id, qubits, "state created");
        self.states.push(LiveState {
            system: system.clone(),
            state: id.clone(),
            qubits,
        });
        Ok(id)
    }

    /// Run `circuit` on a fresh register and return its outcomes.
    pub async fn compute_result(&mut self, system: &SystemId, circuit: &Circuit) -> CallResult<Outcomes> {
        circuit.validate(None)?;
        let program = self.program(circuit);
        let outcomes = self
            .call(Call::ComputeResult {
                system: system.clone(),
                program,
            })
            .await?
            .outcomes()?;
        expect_len(&outcomes, circuit.measurement_count())?;
        Ok(outcomes)
    }

    /// Run `circuit` on a named state and return its outcomes.
    pub async fn measure_state(
        &mut self,
        system: &SystemId,
        state: &StateId,
        circuit: &Circuit,
    ) -> CallResult<Outcomes> {
        let program = self.checked_program(system, state, circuit)?;
        let outcomes = self
            .call(Call::MeasureState {
                system: system.clone(),
                state: state.clone(),
                program,
            })
            .await?
            .outcomes()?;
        self.track_reinit(system, state, circuit);
        expect_len(&outcomes, circuit.measurement_count())?;
        Ok(outcomes)
    }

    /// Run `circuit` on a named state, discarding outcomes.
    pub async fn modify_state(&mut self, system: &SystemId, state: &StateId, circuit: &Circuit) -> CallResult<()> {
        let program = self.checked_program(system, state, circuit)?;
        self.call(Call::ModifyState {
            system: system.clone(),
            state: state.clone(),
            program,
        })
        .await?
        .unit()?;
        self.track_reinit(system, state, circuit);
        Ok(())
    }

    pub async fn delete_state(&mut self, system: &SystemId, state: &StateId) -> CallResult<()> {
        let result = self
            .call(Call::DeleteState {
                system: system.clone(),
                state: state.clone(),
            })
            .await
            .and_then(|v| v.unit().map_err(CallError::from));
        // The server refusing the id means it is gone either way.
        if !matches!(result, Err(CallError::Transport(_))) {
            self.states
                .retain(|s| !(s.system == *system && s.state == *state));
        }
        if result.is_ok() {
            debug!(system = %system, state = %state, "state deleted");
        }
        result
    }

    /// Delete a system and with it every state it holds.
    pub async fn delete_system(&mut self, system: &SystemId) -> CallResult<()> {
        let result = self
            .call(Call::DeleteSystem {
                system: system.clone(),
            })
            .await
            .and_then(|v| v.unit().map_err(CallError::from));
        if !matches!(result, Err(CallError::Transport(_))) {
            self.systems.retain(|s| s != system);
            self.states.retain(|s| s.system != *system);
        }
        if result.is_ok() {
            debug!(system = %system, "system deleted");
        }
        result
    }

    /// Delete every live state, then every live system.
    ///
    /// Keeps going after failures and returns the first one. The ledger is
    /// empty afterwards whatever the outcome.
    pub async fn close(&mut self) -> CallResult<()> {
        let mut first_error = None;

        for live in std::mem::take(&mut self.states) {
            if let Err(e) = self.delete_state(&live.system, &live.state).await {
                warn!(system = %live.system, state = %live.state, error = %e, "failed to delete state");
                first_error.get_or_insert(e);
            }
        }
        for system in std::mem::take(&mut self.systems) {
            if let Err(e) = self.delete_system(&system).await {
                warn!(system = %system, error = %e, "failed to delete system");
                first_error.get_or_insert(e);
            }
        }
        self.states.clear();
        self.systems.clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn program(&self, circuit: &Circuit) -> Program {
        Program::new(Dialect::ChpExt, circuit.to_text(self.delimiter), self.delimiter_code)
    }

    /// Validate against the tracked register size, when the state is ours.
    fn checked_program(&self, system: &SystemId, state: &StateId, circuit: &Circuit) -> CallResult<Program> {
        let register = self
            .states
            .iter()
            .find(|s| s.system == *system && s.state == *state)
            .map(|s| s.qubits);
        match register {
            Some(size) => circuit.validate(Some(size))?,
            // Unknown to the ledger: the register size is the server's call,
            // but every other rule still holds.
            None => circuit.validate(Some(usize::MAX))?,
        }
        Ok(self.program(circuit))
    }

    fn track_reinit(&mut self, system: &SystemId, state: &StateId, circuit: &Circuit) {
        if let Some(qubits) = circuit.declared_qubits() {
            if let Some(live) = self
                .states
                .iter_mut()
                .find(|s| s.system == *system && s.state == *state)
            {
                live.qubits = qubits;
            }
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if !self.systems.is_empty() || !self.states.is_empty() {
            warn!(
                systems = self.systems.len(),
                states = self.states.len(),
                "session dropped with live ids"
            );
        }
    }
}

fn expect_len(outcomes: &Outcomes, expected: usize) -> CallResult<()> {
    if outcomes.len() != expected {
        return Err(CallError::Protocol(format!(
            "expected {expected} outcomes, got {}",
            outcomes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    use crate::error::TransportError;

    /// Replays canned replies and records what was sent.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<&'static str>,
        sent: Vec<String>,
    }

    impl Scripted {
        fn new(replies: &[&'static str]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
            self.sent.push(String::from_utf8_lossy(&request).into_owned());
            let reply = self.replies.pop_front().ok_or(TransportError::Closed)?;
            Ok(format!("{reply}\0").into_bytes())
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn bell_init() -> Circuit {
        let mut c = Circuit::with_qubits(2);
        c.h(0).cnot(0, 1);
        c
    }

    #[tokio::test]
    async fn test_string_handles_are_sent_back_verbatim() {
        let mut session = Session::new(Scripted::new(&[
            r#"{"result":"sys-a"}"#,
            r#"{"result":"st-1"}"#,
            r#"{"result":"11"}"#,
        ]));
        let system = session.create_system("chp_state").await.unwrap();
        let state = session.create_state(&system, &bell_init()).await.unwrap();
        let mut measure = Circuit::new();
        measure.measure(0).measure(1);
        let out = session.measure_state(&system, &state, &measure).await.unwrap();
        assert_eq!(out.to_string(), "11");

        let sent = &session.transport().sent;
        assert!(sent[1].contains(r#""parameters":["sys-a","chpext","init 2\nh 0\nc 0,1\n",10]"#));
        assert!(sent[2].contains(r#"["sys-a","st-1","chpext","m 0\nm 1\n",10]"#));
    }

    #[tokio::test]
    async fn test_usage_error_sends_nothing() {
        let mut session = Session::new(Scripted::new(&[r#"{"result":0}"#]));
        let system = session.create_system("chp_state").await.unwrap();

        let mut bad = Circuit::with_qubits(1);
        bad.h(3);
        let err = session.compute_result(&system, &bad).await.unwrap_err();
        assert!(matches!(err, CallError::Usage(_)));

        let mut unsized_register = Circuit::new();
        unsized_register.measure(0);
        let err = session.compute_result(&system, &unsized_register).await.unwrap_err();
        assert!(matches!(err, CallError::Usage(_)));
        assert_eq!(session.transport().sent.len(), 1);
    }

    #[tokio::test]
    async fn test_register_size_is_tracked() {
        let mut session = Session::new(Scripted::new(&[
            r#"{"result":0}"#,
            r#"{"result":0}"#,
            r#"{"result":null}"#,
        ]));
        let system = session.create_system("chp_state").await.unwrap();
        let state = session.create_state(&system, &bell_init()).await.unwrap();

        let mut wide = Circuit::new();
        wide.x(4);
        let err = session.modify_state(&system, &state, &wide).await.unwrap_err();
        assert!(matches!(err, CallError::Usage(_)));

        let mut regrow = Circuit::with_qubits(5);
        regrow.x(4);
        session.modify_state(&system, &state, &regrow).await.unwrap();
        assert_eq!(session.states[0].qubits, 5);
    }

    #[tokio::test]
    async fn test_reply_shapes() {
        let mut session = Session::new(Scripted::new(&[
            r#"{"result":[1]}"#,
            r#"{"nothing":1}"#,
            r#"{"error":"Unknown state kind: x"}"#,
            r#"{"error":true,"result":"legacy diag"}"#,
        ]));
        let err = session.create_system("chp_state").await.unwrap_err();
        assert!(matches!(err, CallError::Protocol(_)), "{err:?}");
        let err = session.create_system("chp_state").await.unwrap_err();
        assert!(matches!(err, CallError::Protocol(_)), "{err:?}");
        let err = session.create_system("x").await.unwrap_err();
        assert!(matches!(err, CallError::Server(ref m) if m == "Unknown state kind: x"));
        let err = session.create_system("chp_state").await.unwrap_err();
        assert!(matches!(err, CallError::Server(ref m) if m == "legacy diag"));
        assert!(session.live_systems().is_empty());
    }

    #[tokio::test]
    async fn test_outcome_count_checked() {
        let mut session = Session::new(Scripted::new(&[r#"{"result":0}"#, r#"{"result":"1"}"#]));
        let system = session.create_system("chp_state").await.unwrap();
        let mut two = Circuit::with_qubits(2);
        two.measure_all();
        let err = session.compute_result(&system, &two).await.unwrap_err();
        assert!(matches!(err, CallError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_close_deletes_states_before_systems() {
        let mut session = Session::new(Scripted::new(&[
            r#"{"result":7}"#,
            r#"{"result":1}"#,
            r#"{"result":null}"#,
            r#"{"error":"System not found: 7"}"#,
        ]));
        let system = session.create_system("chp_state").await.unwrap();
        session.create_state(&system, &bell_init()).await.unwrap();

        let err = session.close().await.unwrap_err();
        assert!(err.is_server());
        assert!(session.live_systems().is_empty());
        assert!(session.live_states().is_empty());

        let sent = &session.transport().sent;
        assert!(sent[2].starts_with(r#"{"method":"delete_state","parameters":[7,1]}"#));
        assert!(sent[3].starts_with(r#"{"method":"delete_system","parameters":[7]}"#));
    }

    #[test]
    fn test_bad_delimiter_is_usage() {
        let err = Session::with_delimiter(Scripted::default(), u32::from('h'))
            .err()
            .unwrap();
        assert!(matches!(err, CallError::Usage(_)));
    }
}

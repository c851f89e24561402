//! Method dispatch: decoded calls in, JSON results out.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use stabwire_circuit::{Circuit, delimiter_from_code, parse};
use stabwire_proto::{Call, Handler, Program, Request, Response, StateId, SystemId};

use crate::config::EngineConfig;
use crate::engine::StateKind;
use crate::error::{Result, ServerError};
use crate::registry::{StateKey, SystemKey, SystemRegistry};

/// Routes calls to the registry and turns every outcome into a reply.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SystemRegistry>,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(Arc::new(SystemRegistry::new(config)))
    }

    pub fn with_registry(registry: Arc<SystemRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SystemRegistry> {
        &self.registry
    }

    /// Decode, execute and answer one framed request.
    pub async fn handle_request(&self, bytes: &[u8]) -> Response {
        let outcome = match Request::decode(bytes) {
            Ok(request) => match Call::from_request(&request) {
                Ok(call) => self.dispatch(call).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(result) => Response::success(result),
            Err(e) => {
                debug!(error = %e, "request failed");
                Response::failure(e.to_string())
            }
        }
    }

    /// Execute one typed call.
    #[instrument(skip_all, fields(method = %call.method()))]
    pub async fn dispatch(&self, call: Call) -> Result<Value> {
        match call {
            Call::CreateSystem { kind } => {
                let kind: StateKind = kind.parse()?;
                let id = self.registry.create_system(kind).await;
                Ok(Value::from(id))
            }
            Call::CreateState { system, program } => {
                let circuit = self.compile(&program, None)?;
                let key = self
                    .registry
                    .with_system(system_key(&system)?, |sys| Ok(sys.create_state(&circuit)))
                    .await?;
                Ok(Value::from(key))
            }
            Call::ComputeResult { system, program } => {
                let circuit = self.compile(&program, None)?;
                let outcomes = self
                    .registry
                    .with_system(system_key(&system)?, |sys| Ok(sys.compute_result(&circuit)))
                    .await?;
                Ok(Value::from(outcomes.to_string()))
            }
            Call::MeasureState {
                system,
                state,
                program,
            } => {
                let outcomes = self.run_on_state(&system, &state, &program).await?;
                Ok(Value::from(outcomes.to_string()))
            }
            Call::ModifyState {
                system,
                state,
                program,
            } => {
                self.run_on_state(&system, &state, &program).await?;
                Ok(Value::Null)
            }
            Call::DeleteState { system, state } => {
                let (sys_key, state_key) = (system_key(&system)?, state_key(&system, &state)?);
                self.registry
                    .with_system(sys_key, |sys| sys.delete_state(state_key))
                    .await?;
                Ok(Value::Null)
            }
            Call::DeleteSystem { system } => {
                self.registry.delete_system(system_key(&system)?).await?;
                Ok(Value::Null)
            }
        }
    }

    async fn run_on_state(
        &self,
        system: &SystemId,
        state: &StateId,
        program: &Program,
    ) -> Result<stabwire_proto::Outcomes> {
        let (sys_key, state_key) = (system_key(system)?, state_key(system, state)?);
        self.registry
            .with_system(sys_key, |sys| {
                let size = sys.state_size(state_key)?;
                let circuit = self.compile(program, Some(size))?;
                sys.run_on_state(state_key, &circuit)
            })
            .await
    }

    /// Parse and validate a program against an optional existing register.
    fn compile(&self, program: &Program, register: Option<usize>) -> Result<Circuit> {
        let delimiter = delimiter_from_code(program.delimiter)?;
        let circuit = parse(&program.text, delimiter)?;
        circuit.validate(register)?;

        let max = self.registry.engine_config().max_qubits;
        if let Some(requested) = circuit.declared_qubits() {
            if requested > max {
                warn!(requested, max, "register too large");
                return Err(ServerError::TooManyQubits { requested, max });
            }
        }
        Ok(circuit)
    }
}

fn system_key(id: &SystemId) -> Result<SystemKey> {
    id.as_u64()
        .ok_or_else(|| ServerError::SystemNotFound(id.to_string()))
}

fn state_key(system: &SystemId, id: &StateId) -> Result<StateKey> {
    id.as_u64().ok_or_else(|| ServerError::StateNotFound {
        system: system.to_string(),
        state: id.to_string(),
    })
}

#[async_trait]
impl Handler for Dispatcher {
    async fn handle(&self, request: &[u8]) -> Vec<u8> {
        self.handle_request(request).await.encode()
    }
}

//! Protocol methods and their typed parameter lists.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use stabwire_circuit::Dialect;

use crate::error::{CodecError, CodecResult};
use crate::handle::{StateId, SystemId};
use crate::message::Request;

/// Methods of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CreateSystem,
    CreateState,
    ComputeResult,
    MeasureState,
    ModifyState,
    DeleteState,
    DeleteSystem,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::CreateSystem,
        Method::CreateState,
        Method::ComputeResult,
        Method::MeasureState,
        Method::ModifyState,
        Method::DeleteState,
        Method::DeleteSystem,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::CreateSystem => "create_system",
            Method::CreateState => "create_state",
            Method::ComputeResult => "compute_result",
            Method::MeasureState => "measure_state",
            Method::ModifyState => "modify_state",
            Method::DeleteState => "delete_state",
            Method::DeleteSystem => "delete_system",
        }
    }

    /// Names of the positional parameters.
    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Method::CreateSystem => &["kind"],
            Method::CreateState | Method::ComputeResult => {
                &["system_id", "dialect", "circuit", "delimiter"]
            }
            Method::MeasureState | Method::ModifyState => {
                &["system_id", "state_id", "dialect", "circuit", "delimiter"]
            }
            Method::DeleteState => &["system_id", "state_id"],
            Method::DeleteSystem => &["system_id"],
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CodecError::UnknownMethod(s.to_string()))
    }
}

/// Circuit text together with its dialect and line delimiter code point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub dialect: Dialect,
    pub text: String,
    pub delimiter: u32,
}

impl Program {
    pub fn new(dialect: Dialect, text: impl Into<String>, delimiter: u32) -> Self {
        Self {
            dialect,
            text: text.into(),
            delimiter,
        }
    }

    /// Program in the default dialect with `'\n'` as delimiter.
    pub fn chpext(text: impl Into<String>) -> Self {
        Self::new(Dialect::ChpExt, text, stabwire_circuit::DEFAULT_DELIMITER)
    }

    fn push_values(&self, params: &mut Vec<Value>) {
        params.push(Value::from(self.dialect.as_str()));
        params.push(Value::from(self.text.as_str()));
        params.push(Value::from(self.delimiter));
    }
}

/// A fully typed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSystem {
        kind: String,
    },
    CreateState {
        system: SystemId,
        program: Program,
    },
    ComputeResult {
        system: SystemId,
        program: Program,
    },
    MeasureState {
        system: SystemId,
        state: StateId,
        program: Program,
    },
    ModifyState {
        system: SystemId,
        state: StateId,
        program: Program,
    },
    DeleteState {
        system: SystemId,
        state: StateId,
    },
    DeleteSystem {
        system: SystemId,
    },
}

impl Call {
    pub fn method(&self) -> Method {
        match self {
            Call::CreateSystem { .. } => Method::CreateSystem,
            Call::CreateState { .. } => Method::CreateState,
            Call::ComputeResult { .. } => Method::ComputeResult,
            Call::MeasureState { .. } => Method::MeasureState,
            Call::ModifyState { .. } => Method::ModifyState,
            Call::DeleteState { .. } => Method::DeleteState,
            Call::DeleteSystem { .. } => Method::DeleteSystem,
        }
    }

    /// Positional parameter list in wire order.
    pub fn parameters(&self) -> Vec<Value> {
        let mut params = Vec::with_capacity(5);
        match self {
            Call::CreateSystem { kind } => params.push(Value::from(kind.as_str())),
            Call::CreateState { system, program } | Call::ComputeResult { system, program } => {
                params.push(system.to_value());
                program.push_values(&mut params);
            }
            Call::MeasureState {
                system,
                state,
                program,
            }
            | Call::ModifyState {
                system,
                state,
                program,
            } => {
                params.push(system.to_value());
                params.push(state.to_value());
                program.push_values(&mut params);
            }
            Call::DeleteState { system, state } => {
                params.push(system.to_value());
                params.push(state.to_value());
            }
            Call::DeleteSystem { system } => params.push(system.to_value()),
        }
        params
    }

    pub fn into_request(self) -> Request {
        Request {
            method: self.method().as_str().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Check method name, arity and parameter types of a decoded request.
    pub fn from_request(request: &Request) -> CodecResult<Self> {
        let method: Method = request.method.parse()?;
        let args = Params::new(method, &request.parameters)?;

        let call = match method {
            Method::CreateSystem => Call::CreateSystem { kind: args.get(0)? },
            Method::CreateState => Call::CreateState {
                system: args.get(0)?,
                program: args.program(1)?,
            },
            Method::ComputeResult => Call::ComputeResult {
                system: args.get(0)?,
                program: args.program(1)?,
            },
            Method::MeasureState => Call::MeasureState {
                system: args.get(0)?,
                state: args.get(1)?,
                program: args.program(2)?,
            },
            Method::ModifyState => Call::ModifyState {
                system: args.get(0)?,
                state: args.get(1)?,
                program: args.program(2)?,
            },
            Method::DeleteState => Call::DeleteState {
                system: args.get(0)?,
                state: args.get(1)?,
            },
            Method::DeleteSystem => Call::DeleteSystem {
                system: args.get(0)?,
            },
        };
        Ok(call)
    }
}

/// Positional parameters of one request, arity already checked.
struct Params<'a> {
    method: Method,
    values: &'a [Value],
}

impl<'a> Params<'a> {
    fn new(method: Method, values: &'a [Value]) -> CodecResult<Self> {
        let expected = method.parameter_names().len();
        if values.len() != expected {
            return Err(CodecError::InvalidParameters {
                method: method.as_str().to_string(),
                reason: format!("expected {expected} parameters, got {}", values.len()),
            });
        }
        Ok(Self { method, values })
    }

    fn invalid(&self, index: usize, reason: impl fmt::Display) -> CodecError {
        CodecError::InvalidParameters {
            method: self.method.as_str().to_string(),
            reason: format!("{}: {reason}", self.method.parameter_names()[index]),
        }
    }

    fn get<T: DeserializeOwned>(&self, index: usize) -> CodecResult<T> {
        T::deserialize(&self.values[index]).map_err(|e| self.invalid(index, e))
    }

    fn program(&self, start: usize) -> CodecResult<Program> {
        let dialect: String = self.get(start)?;
        let dialect = dialect.parse().map_err(|e| self.invalid(start, e))?;
        Ok(Program {
            dialect,
            text: self.get(start + 1)?,
            delimiter: self.get(start + 2)?,
        })
    }
}

//! Wire protocol for stabwire
//!
//! Every message is a JSON text followed by one NUL byte. A request names a
//! method and carries a positional parameter list; a reply carries either a
//! `result` or an `error`.
//!
//! | Method | Parameters | Result |
//! |--------|------------|--------|
//! | `create_system` | `[kind]` | system id |
//! | `create_state` | `[system, dialect, text, delimiter]` | state id |
//! | `compute_result` | `[system, dialect, text, delimiter]` | bit string |
//! | `measure_state` | `[system, state, dialect, text, delimiter]` | bit string |
//! | `modify_state` | `[system, state, dialect, text, delimiter]` | null |
//! | `delete_state` | `[system, state]` | null |
//! | `delete_system` | `[system]` | null |
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use stabwire_proto::{Call, Request, Response};
//!
//! let request = Call::CreateSystem { kind: "chp_state".into() }.into_request();
//! let bytes = request.encode().unwrap();
//! assert_eq!(bytes, b"{\"method\":\"create_system\",\"parameters\":[\"chp_state\"]}\0");
//!
//! let reply = Response::success(json!(0)).encode();
//! assert_eq!(Response::decode(&reply).unwrap(), json!(0));
//! ```

mod call;
mod error;
pub mod frame;
mod handle;
mod handler;
mod message;
mod outcome;

pub use call::{Call, Method, Program};
pub use error::{CodecError, CodecResult, FrameError};
pub use handle::{StateId, SystemId};
pub use handler::Handler;
pub use message::{Request, Response, ResultExt};
pub use outcome::Outcomes;

/// Representation kind for a CHP stabilizer tableau.
pub const KIND_CHP_STATE: &str = "chp_state";

//! Request and response messages.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult, FrameError};
use crate::frame::{TERMINATOR, strip_terminator};
use crate::outcome::Outcomes;

/// A call as it travels on the wire: `{"method": ..., "parameters": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl Request {
    /// JSON text followed by the NUL terminator.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(TERMINATOR);
        Ok(bytes)
    }

    /// Decode one framed request. The terminator is required.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let body = strip_terminator(bytes).ok_or(FrameError::MissingTerminator)?;
        Ok(serde_json::from_slice(body)?)
    }
}

/// A reply: either a result value or an error diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Failure(String),
}

impl Response {
    pub fn success(result: impl Into<Value>) -> Self {
        Response::Success(result.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Response::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Reply as a JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        match self {
            Response::Success(result) => object.insert("result".into(), result.clone()),
            Response::Failure(message) => object.insert("error".into(), Value::from(message.as_str())),
        };
        Value::Object(object)
    }

    /// JSON text followed by the NUL terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_json().to_string().into_bytes();
        bytes.push(TERMINATOR);
        bytes
    }

    /// Decode a reply into its result value.
    ///
    /// A trailing terminator is optional. An `error` field wins over
    /// `result`, and the older `{"error": true, "result": "<diag>"}` form
    /// is read as an error with the result text as diagnostic.
    pub fn decode(bytes: &[u8]) -> CodecResult<Value> {
        let body = strip_terminator(bytes).unwrap_or(bytes);
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| CodecError::MalformedReply(format!("not JSON: {e}")))?;
        let Value::Object(mut object) = value else {
            return Err(CodecError::MalformedReply("reply is not a JSON object".into()));
        };

        match object.remove("error") {
            None | Some(Value::Null | Value::Bool(false)) => {}
            Some(Value::Bool(true)) => {
                let diagnostic = match object.remove("result") {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => "unspecified server error".to_string(),
                    Some(other) => other.to_string(),
                };
                return Err(CodecError::Server(diagnostic));
            }
            Some(Value::String(s)) => return Err(CodecError::Server(s)),
            Some(other) => return Err(CodecError::Server(other.to_string())),
        }

        object
            .remove("result")
            .ok_or_else(|| CodecError::MalformedReply("reply has neither result nor error".into()))
    }
}

/// Typed views of a decoded result value.
pub trait ResultExt {
    /// Deserialize the result, reporting shape mismatches as malformed replies.
    fn typed<T: DeserializeOwned>(self, what: &str) -> CodecResult<T>;

    /// A bit string of measurement outcomes.
    fn outcomes(self) -> CodecResult<Outcomes>;

    /// A result that carries no data.
    ///
    /// `null` and `true` mean success; `false` is a server-side refusal.
    fn unit(self) -> CodecResult<()>;
}

impl ResultExt for Value {
    fn typed<T: DeserializeOwned>(self, what: &str) -> CodecResult<T> {
        let shown = self.to_string();
        serde_json::from_value(self)
            .map_err(|_| CodecError::MalformedReply(format!("expected {what}, got {shown}")))
    }

    fn outcomes(self) -> CodecResult<Outcomes> {
        match self {
            Value::String(s) => s.parse(),
            other => Err(CodecError::MalformedReply(format!(
                "expected outcome string, got {other}"
            ))),
        }
    }

    fn unit(self) -> CodecResult<()> {
        match self {
            Value::Null | Value::Bool(true) => Ok(()),
            Value::Bool(false) => Err(CodecError::Server("request refused".into())),
            other => Err(CodecError::MalformedReply(format!(
                "expected null, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_encoding() {
        let request = Request {
            method: "create_system".into(),
            parameters: vec![json!("chp_state")],
        };
        let bytes = request.encode().unwrap();
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(bytes.iter().filter(|b| **b == 0).count(), 1);
        assert_eq!(Request::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_request_needs_terminator() {
        let err = Request::decode(br#"{"method":"create_system","parameters":[]}"#).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Frame(FrameError::MissingTerminator)
        ));
    }

    #[test]
    fn test_request_missing_parameters_defaults_empty() {
        let request = Request::decode(b"{\"method\":\"delete_system\"}\0").unwrap();
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_response_success() {
        let bytes = Response::success("0101").encode();
        assert_eq!(bytes, b"{\"result\":\"0101\"}\0");
        assert_eq!(Response::decode(&bytes).unwrap(), json!("0101"));
    }

    #[test]
    fn test_null_result_is_present() {
        let bytes = Response::success(Value::Null).encode();
        assert_eq!(Response::decode(&bytes).unwrap(), Value::Null);
    }

    #[test]
    fn test_response_failure() {
        let bytes = Response::failure("no such system: 9").encode();
        let err = Response::decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Server(ref m) if m == "no such system: 9"));
    }

    #[test]
    fn test_legacy_error_form() {
        let err = Response::decode(br#"{"error": true, "result": "bad qubit"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Server(ref m) if m == "bad qubit"));

        let ok = Response::decode(br#"{"error": false, "result": 5}"#).unwrap();
        assert_eq!(ok, json!(5));
    }

    #[test]
    fn test_malformed_replies() {
        for bytes in [&b"{}"[..], b"[1,2]", b"not json", b"\"result\""] {
            let err = Response::decode(bytes).unwrap_err();
            assert!(matches!(err, CodecError::MalformedReply(_)), "{bytes:?}");
        }
    }

    #[test]
    fn test_result_views() {
        assert_eq!(json!("10").outcomes().unwrap().to_string(), "10");
        assert!(json!(10).outcomes().is_err());
        assert!(json!("12").outcomes().is_err());

        assert!(Value::Null.unit().is_ok());
        assert!(json!(true).unit().is_ok());
        assert!(json!(false).unit().unwrap_err().is_server_error());
        assert!(json!("x").unit().is_err());

        let n: u64 = json!(7).typed("id").unwrap();
        assert_eq!(n, 7);
        assert!(json!(null).typed::<u64>("id").is_err());
    }
}

//! Opaque identifiers issued by the server.
//!
//! A handle can only be obtained by decoding a server reply, and is sent back
//! exactly as it was received. The client never looks inside.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Wire form of an identifier: a JSON integer or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum RawHandle {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawHandle::Unsigned(v) => write!(f, "{v}"),
            RawHandle::Signed(v) => write!(f, "{v}"),
            RawHandle::Text(s) => write!(f, "{s:?}"),
        }
    }
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(RawHandle);

        impl $name {
            /// JSON value to send back on the wire.
            pub fn to_value(&self) -> Value {
                match &self.0 {
                    RawHandle::Unsigned(v) => Value::from(*v),
                    RawHandle::Signed(v) => Value::from(*v),
                    RawHandle::Text(s) => Value::from(s.as_str()),
                }
            }

            /// The numeric form, when the issuer used non-negative integers.
            pub fn as_u64(&self) -> Option<u64> {
                match self.0 {
                    RawHandle::Unsigned(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

handle_type! {
    /// Identifier of a simulator instance.
    SystemId
}

handle_type! {
    /// Identifier of a named state inside one system.
    StateId
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_handle_is_verbatim() {
        let id: SystemId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id.to_value(), json!(42));
        assert_eq!(id.as_u64(), Some(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_string_handle_is_verbatim() {
        let id: StateId = serde_json::from_value(json!("st-7")).unwrap();
        assert_eq!(id.to_value(), json!("st-7"));
        assert_eq!(id.as_u64(), None);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("st-7"));
    }

    #[test]
    fn test_other_shapes_rejected() {
        assert!(serde_json::from_value::<SystemId>(json!(null)).is_err());
        assert!(serde_json::from_value::<SystemId>(json!({"id": 1})).is_err());
        assert!(serde_json::from_value::<SystemId>(json!(1.5)).is_err());
    }
}

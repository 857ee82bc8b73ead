//! MQTT topic value type.
//!
//! A topic identifies a publish/subscribe target. The broker interprets `/`
//! as a level separator and `+`/`#` as subscription wildcards; this crate
//! performs no filter matching itself (see
//! [`Client::subscribe_with`](crate::Client::subscribe_with)).

use crate::types::MessageId;

/// A publish/subscribe target.
///
/// The caller owns the topic; the client only writes the [`id`](Topic::id)
/// field as a side effect of subscribe/unsubscribe, storing the message id
/// the engine assigned to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// Topic name. Must be non-empty for every operation.
    pub name: String,
    /// Whether messages published to this topic ask the broker to retain them.
    pub retain: bool,
    /// Engine-assigned id of the last subscribe/unsubscribe request.
    pub id: MessageId,
}

impl Topic {
    /// Creates a topic with the retain flag cleared.
    pub fn new(name: impl Into<String>) -> Self {
        Topic {
            name: name.into(),
            retain: false,
            id: 0,
        }
    }

    /// Creates a topic whose publications ask the broker to retain the last
    /// message.
    pub fn retained(name: impl Into<String>) -> Self {
        Topic {
            name: name.into(),
            retain: true,
            id: 0,
        }
    }

    /// Returns true if the name contains MQTT subscription wildcards
    /// (`+` or `#`).
    pub fn has_wildcards(&self) -> bool {
        self.name.contains(['+', '#'])
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Topic::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Topic::new(name)
    }
}

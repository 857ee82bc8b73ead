//! Common types for the client API.

/// Message id assigned by the engine to publish/subscribe/unsubscribe
/// requests, echoed back in the corresponding acknowledgment events.
pub type MessageId = i32;

/// MQTT delivery guarantee level, implemented entirely by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QoS {
    /// Level 0: fire and forget.
    AtMostOnce,
    /// Level 1: delivered at least once, duplicates possible.
    AtLeastOnce,
    /// Level 2: delivered exactly once.
    ExactlyOnce,
}

impl QoS {
    /// Returns the numeric level (0, 1 or 2) used on the wire and in the C API.
    pub fn value(self) -> i32 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }

    /// Converts a numeric level back into a `QoS`, if valid.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

/// MQTT protocol version requested at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// MQTT 3.1.
    V31,
    /// MQTT 3.1.1.
    V311,
    /// MQTT 5.
    #[default]
    V5,
}

/// Whether the broker preserves or discards the client's session state
/// (subscriptions and queued messages) across disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    /// Preserve subscriptions and messages on disconnect.
    Preserve,
    /// Start clean and discard everything on disconnect.
    #[default]
    Cleanup,
}

/// Connection status of a [`Client`](crate::Client).
///
/// Requests never change the status; only the asynchronous engine events do,
/// except `InDefect` which is set once at construction when the engine could
/// not be brought up and is terminal for the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Not connected to the broker (initial state).
    Disconnected = 0,
    /// Connected to the broker.
    Connected = 1,
    /// Fatal construction failure; the client refuses engine interaction.
    InDefect = 2,
}

impl Status {
    pub(crate) fn from_u8(value: u8) -> Status {
        match value {
            1 => Status::Connected,
            2 => Status::InDefect,
            _ => Status::Disconnected,
        }
    }
}

/// Version information for the wrapper and the wrapped engine library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Engine library version as (major, minor, revision).
    pub library: [i32; 3],
    /// Version of this crate.
    pub wrapper: &'static str,
    /// Protocol version the client was configured with.
    pub protocol: Protocol,
}

impl Version {
    pub(crate) fn new(library: [i32; 3], protocol: Protocol) -> Self {
        Version {
            library,
            wrapper: env!("CARGO_PKG_VERSION"),
            protocol,
        }
    }
}

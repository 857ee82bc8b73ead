//! Received-message view and copy-out helpers.

use crate::error::Result;
use crate::types::{MessageId, QoS};

/// A message delivered by the engine to a reception callback.
///
/// This is a transient view over engine-owned memory: the topic and payload
/// borrows are valid only for the duration of the callback invocation, after
/// which the engine frees them. Use [`store`](Message::store),
/// [`to_vec`](Message::to_vec) or plain `to_owned()` on the fields to capture
/// data that must outlive the callback.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    /// Topic the message was published on.
    pub topic: &'a str,
    /// Raw payload bytes.
    pub payload: &'a [u8],
    /// Delivery guarantee the message was sent with.
    pub qos: QoS,
    /// Whether the broker flagged the message as retained.
    pub retain: bool,
    /// Engine-assigned message id.
    pub mid: MessageId,
}

impl<'a> Message<'a> {
    /// Creates a message view. Engine backends and test doubles build these
    /// when dispatching a reception event.
    pub fn new(
        topic: &'a str,
        payload: &'a [u8],
        qos: QoS,
        retain: bool,
        mid: MessageId,
    ) -> Self {
        Message {
            topic,
            payload,
            qos,
            retain,
            mid,
        }
    }

    /// Interprets the payload as UTF-8 text.
    pub fn payload_str(&self) -> Result<&'a str> {
        Ok(std::str::from_utf8(self.payload)?)
    }

    /// Copies the payload into `buffer`, replacing its previous content.
    /// Returns the new buffer length.
    pub fn store(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.clear();
        self.append_to(buffer)
    }

    /// Appends the payload to `buffer`, keeping its previous content.
    /// Returns the new buffer length.
    pub fn append_to(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.extend_from_slice(self.payload);
        buffer.len()
    }

    /// Returns an owned copy of the payload.
    pub fn to_vec(&self) -> Vec<u8> {
        self.payload.to_vec()
    }
}

//! The engine seam.
//!
//! The [`Client`](crate::Client) delegates the entire MQTT protocol (wire
//! format, TCP/TLS transport, QoS retries, reconnection and the network loop
//! thread) to an engine behind the [`Engine`] trait. The shipped backend is
//! libmosquitto (feature `mosquitto`); tests inject their own implementation
//! through [`Client::with_engine`](crate::Client::with_engine).
//!
//! Events flow the other way through [`EventSink`]: the engine's loop thread
//! calls the sink it was bound to, and the client translates those calls into
//! user callbacks.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::message::Message;
use crate::types::{MessageId, QoS};

/// Broker connection parameters, consumed once per connect request.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Broker host name or IP address.
    pub address: String,
    /// Broker TCP port.
    pub port: u16,
    /// Keep-alive interval handed to the engine, in whole seconds.
    pub keepalive: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            address: "localhost".to_string(),
            port: 1883,
            keepalive: Duration::from_secs(60),
        }
    }
}

impl ConnectOptions {
    /// Creates options for the given broker address with the default port
    /// (1883) and keep-alive (60 s).
    pub fn new(address: impl Into<String>) -> Self {
        ConnectOptions {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Sets the broker TCP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the keep-alive interval.
    pub fn keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }
}

/// Receiver for the six engine events.
///
/// Implementations must tolerate being called from the engine's network loop
/// thread, concurrently with the owning thread's use of the client.
pub trait EventSink: Send + Sync {
    /// The broker answered a connect request with reason code `rc`
    /// (0 means accepted).
    fn on_connected(&self, rc: i32);
    /// The connection ended; `rc` 0 means a client-requested disconnect.
    fn on_disconnected(&self, rc: i32);
    /// A publish request completed its QoS handshake.
    fn on_published(&self, mid: MessageId);
    /// The broker acknowledged a subscribe request, granting one QoS level
    /// per requested filter.
    fn on_subscribed(&self, mid: MessageId, granted_qos: &[i32]);
    /// The broker acknowledged an unsubscribe request.
    fn on_unsubscribed(&self, mid: MessageId);
    /// An incoming message. The view is only valid for this call.
    fn on_message(&self, message: Message<'_>);
}

/// One handle to a native (or test) MQTT client engine.
///
/// All methods submit requests and return as soon as the engine accepts or
/// rejects them; outcomes arrive later through the bound [`EventSink`].
pub trait Engine: Send {
    /// Binds the sink that receives every engine event. The engine must keep
    /// the sink alive for as long as callbacks may fire, i.e. until the
    /// engine itself is dropped.
    fn bind(&mut self, sink: Arc<dyn EventSink>);

    /// Submits a non-blocking connect request.
    fn connect(&mut self, options: &ConnectOptions) -> Result<()>;

    /// Starts the engine's background network loop thread.
    fn start(&mut self) -> Result<()>;

    /// Requests a disconnect; completion arrives via
    /// [`EventSink::on_disconnected`].
    fn disconnect(&mut self) -> Result<()>;

    /// Submits a subscribe request and returns its engine-assigned id.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId>;

    /// Submits an unsubscribe request and returns its engine-assigned id.
    fn unsubscribe(&mut self, topic: &str) -> Result<MessageId>;

    /// Submits a publish request and returns its engine-assigned id.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<MessageId>;

    /// Returns the engine library version as (major, minor, revision).
    fn library_version(&self) -> [i32; 3];
}

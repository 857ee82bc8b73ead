//! Safe, idiomatic Rust bindings for the Eclipse Mosquitto MQTT client
//! library.
//!
//! This crate wraps the libmosquitto C API as an RAII [`Client`] with
//! callback dispatch and convenient publish/subscribe methods. There is no
//! protocol implementation here: the MQTT wire protocol, TCP transport,
//! QoS retry tracking, reconnection and the network loop thread all live in
//! the wrapped engine. The crate's job is argument marshaling, error-code
//! translation and routing engine events to your callbacks.
//!
//! # Features
//!
//! - **RAII lifecycle**: dropping a [`Client`] disconnects, stops the loop
//!   thread, frees the handle and (for the last client) tears down the
//!   global library state.
//! - **Two callback layers**: per-call closures for connection and per-topic
//!   reception, with an [`EventHandler`] strategy as the fallback for
//!   everything else.
//! - **Injectable engine**: the [`engine::Engine`] trait decouples the
//!   facade from libmosquitto, so tests drive the full dispatch contract
//!   with a test double and no broker.
//!
//! The libmosquitto backend is behind the `mosquitto` feature and needs the
//! system library at link time.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "mosquitto")]
//! # fn demo() -> mosq_rs::Result<()> {
//! use mosq_rs::{Client, ClientSettings, ConnectOptions, QoS, Topic};
//!
//! let mut client = Client::new(ClientSettings::new("kitchen-sensor"));
//! client.connect(&ConnectOptions::new("localhost").port(1883))?;
//!
//! // Outcomes are asynchronous: wait for the connected event before
//! // subscribing (e.g. poll `client.status()` or use `connect_with`).
//! let mut topic = Topic::new("home/kitchen/temperature");
//! client.subscribe_with(&mut topic, QoS::AtLeastOnce, Box::new(|msg| {
//!     println!("{}: {:?}", msg.topic, msg.payload_str());
//! }))?;
//!
//! client.publish(&Topic::new("home/kitchen/announce"), "online", QoS::AtMostOnce)?;
//! # Ok(())
//! # }
//! # fn main() {}
//! ```
//!
//! # Concurrency
//!
//! Engine events are delivered on the engine's background loop thread,
//! concurrently with the owning thread's use of the client. Callback storage
//! is internally synchronized and the status is atomic, but callbacks must
//! not block for long: they run on the thread the engine uses for all
//! network I/O.

#![warn(missing_docs)]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(feature = "mosquitto")]
mod mosquitto;
#[cfg(feature = "mosquitto")]
mod sys;

pub mod client;
pub mod engine;
pub mod error;
pub mod message;
pub mod topic;
pub mod types;

pub use client::{
    Client, ClientSettings, ConnectionCallback, EventHandler, LogHandler, ReceptionCallback,
    MAX_CLIENT_ID_LEN,
};
pub use engine::{ConnectOptions, Engine, EventSink};
pub use error::{Error, Result};
pub use message::Message;
pub use topic::Topic;
pub use types::{MessageId, Protocol, QoS, Session, Status, Version};

//! The MQTT client facade.
//!
//! [`Client`] owns exactly one engine handle, registers itself as the
//! [`EventSink`] for that engine, and re-dispatches engine events to either a
//! per-call closure or the [`EventHandler`] strategy chosen at construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::{ConnectOptions, Engine, EventSink};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::topic::Topic;
use crate::types::{MessageId, Protocol, QoS, Session, Status, Version};

/// Longest client id accepted by MQTT 3.1 brokers, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 23;

/// Settings consumed once when constructing a [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Client identifier, unique per broker. Leave empty to let the engine
    /// auto-generate one; otherwise the length must be 1..=23 bytes.
    pub client_id: String,
    /// MQTT protocol version to speak.
    pub protocol: Protocol,
    /// Session cleanup policy announced to the broker.
    pub session: Session,
}

impl ClientSettings {
    /// Creates settings for the given client id with the default protocol
    /// (MQTT 5) and session policy (cleanup).
    pub fn new(client_id: impl Into<String>) -> Self {
        ClientSettings {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// Sets the protocol version.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the session cleanup policy.
    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }
}

/// Callback invoked with the engine reason code when the connection is
/// established or lost (0 means success/requested).
pub type ConnectionCallback = Box<dyn Fn(i32) + Send + Sync + 'static>;

/// Callback invoked with each message received on one subscribed topic.
pub type ReceptionCallback = Box<dyn Fn(Message<'_>) + Send + Sync + 'static>;

/// Fallback receiver for engine events that no per-call closure handles.
///
/// All methods default to doing nothing, so an implementation overrides only
/// the events it cares about. The handler runs on the engine's network loop
/// thread.
pub trait EventHandler: Send + Sync {
    /// Connection outcome arrived and no connection closure was stored.
    fn on_connected(&self, rc: i32) {
        let _ = rc;
    }

    /// The connection ended and no disconnection closure was stored.
    fn on_disconnected(&self, rc: i32) {
        let _ = rc;
    }

    /// A publish request completed its delivery handshake.
    fn on_published(&self, mid: MessageId) {
        let _ = mid;
    }

    /// The broker acknowledged a subscribe request.
    fn on_subscribed(&self, mid: MessageId, granted_qos: &[i32]) {
        let _ = (mid, granted_qos);
    }

    /// The broker acknowledged an unsubscribe request.
    fn on_unsubscribed(&self, mid: MessageId) {
        let _ = mid;
    }

    /// A message arrived on a topic with no registered reception callback.
    fn on_message(&self, message: Message<'_>) {
        let _ = message;
    }
}

/// Default [`EventHandler`] that reports every event through the `log` facade.
#[derive(Debug, Default)]
pub struct LogHandler;

impl EventHandler for LogHandler {
    fn on_connected(&self, rc: i32) {
        log::debug!("connected, rc={rc}");
    }

    fn on_disconnected(&self, rc: i32) {
        log::debug!("disconnected, rc={rc}");
    }

    fn on_published(&self, mid: MessageId) {
        log::debug!("published, mid={mid}");
    }

    fn on_subscribed(&self, mid: MessageId, granted_qos: &[i32]) {
        log::debug!("subscribed, mid={mid}, granted={granted_qos:?}");
    }

    fn on_unsubscribed(&self, mid: MessageId) {
        log::debug!("unsubscribed, mid={mid}");
    }

    fn on_message(&self, message: Message<'_>) {
        log::debug!(
            "unhandled message on '{}' ({} bytes)",
            message.topic,
            message.payload.len()
        );
    }
}

/// Callback storage shared with the engine's loop thread.
#[derive(Default)]
struct Callbacks {
    reception: HashMap<String, Arc<dyn Fn(Message<'_>) + Send + Sync>>,
    connection: Option<Arc<dyn Fn(i32) + Send + Sync>>,
    disconnection: Option<Arc<dyn Fn(i32) + Send + Sync>>,
}

/// State shared between the client and the engine callbacks.
pub(crate) struct ClientState {
    status: AtomicU8,
    callbacks: Mutex<Callbacks>,
    handler: Box<dyn EventHandler>,
    last_error: Mutex<Option<Error>>,
}

impl ClientState {
    fn new(handler: Box<dyn EventHandler>) -> Self {
        ClientState {
            status: AtomicU8::new(Status::Disconnected as u8),
            callbacks: Mutex::new(Callbacks::default()),
            handler,
            last_error: Mutex::new(None),
        }
    }

    fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: Status) {
        self.status.store(status as u8, Ordering::Release);
    }

    fn record(&self, error: &Error) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(error.clone());
        }
    }

    /// Records the error as the most recent failure and hands it back.
    fn reject(&self, error: Error) -> Error {
        self.record(&error);
        error
    }

    fn last_error(&self) -> Option<Error> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }
}

impl EventSink for ClientState {
    fn on_connected(&self, rc: i32) {
        log::trace!("engine event: connected, rc={rc}");
        if rc == 0 {
            self.set_status(Status::Connected);
        }
        // A fresh connection carries no subscriptions, so every reception
        // callback belongs to a dead subscription now.
        let callback = match self.callbacks.lock() {
            Ok(mut guard) => {
                guard.reception.clear();
                guard.connection.clone()
            }
            Err(_) => None,
        };
        match callback {
            Some(callback) => (*callback)(rc),
            None => self.handler.on_connected(rc),
        }
    }

    fn on_disconnected(&self, rc: i32) {
        log::trace!("engine event: disconnected, rc={rc}");
        self.set_status(Status::Disconnected);
        // Drop the stored closures so nothing stale fires after a later
        // reconnect.
        let callback = match self.callbacks.lock() {
            Ok(mut guard) => {
                let callback = guard.disconnection.take();
                guard.connection = None;
                guard.reception.clear();
                callback
            }
            Err(_) => None,
        };
        match callback {
            Some(callback) => (*callback)(rc),
            None => self.handler.on_disconnected(rc),
        }
    }

    fn on_published(&self, mid: MessageId) {
        log::trace!("engine event: published, mid={mid}");
        self.handler.on_published(mid);
    }

    fn on_subscribed(&self, mid: MessageId, granted_qos: &[i32]) {
        log::trace!("engine event: subscribed, mid={mid}");
        self.handler.on_subscribed(mid, granted_qos);
    }

    fn on_unsubscribed(&self, mid: MessageId) {
        log::trace!("engine event: unsubscribed, mid={mid}");
        self.handler.on_unsubscribed(mid);
    }

    fn on_message(&self, message: Message<'_>) {
        log::trace!(
            "engine event: message on '{}' ({} bytes)",
            message.topic,
            message.payload.len()
        );
        // Exact name match only; messages granted by a wildcard filter carry
        // their concrete topic name and fall through to the handler.
        let callback = self
            .callbacks
            .lock()
            .ok()
            .and_then(|guard| guard.reception.get(message.topic).cloned());
        match callback {
            Some(callback) => (*callback)(message),
            None => self.handler.on_message(message),
        }
    }
}

/// An asynchronous MQTT client wrapping one native engine handle.
///
/// The client performs no protocol work itself: connect, QoS handshakes,
/// reconnection and the network loop all belong to the engine. Methods submit
/// requests; outcomes arrive later on the engine's loop thread through the
/// stored closures or the [`EventHandler`].
///
/// A client whose engine could not be brought up stays constructible but
/// reports [`Status::InDefect`] and refuses every engine interaction; the
/// only remedy is constructing a new one.
///
/// ```no_run
/// # #[cfg(feature = "mosquitto")]
/// # fn demo() -> mosq_rs::Result<()> {
/// use mosq_rs::{Client, ClientSettings, ConnectOptions, QoS, Topic};
///
/// let mut client = Client::new(ClientSettings::new("sensor-gw"));
/// client.connect_with(
///     &ConnectOptions::new("localhost"),
///     Some(Box::new(|rc| println!("connected, rc={rc}"))),
///     None,
/// )?;
///
/// let mut topic = Topic::new("sensors/kitchen/temperature");
/// client.subscribe_with(&mut topic, QoS::AtLeastOnce, Box::new(|msg| {
///     println!("{}: {:?}", msg.topic, msg.payload_str());
/// }))?;
///
/// client.publish(&Topic::new("sensors/announce"), "hello", QoS::AtMostOnce)?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    engine: Option<Box<dyn Engine>>,
    state: Arc<ClientState>,
    version: Version,
}

#[cfg(feature = "mosquitto")]
impl Client {
    /// Creates a libmosquitto-backed client with the default [`LogHandler`].
    pub fn new(settings: ClientSettings) -> Client {
        Self::with_handler(settings, Box::new(LogHandler))
    }

    /// Creates a libmosquitto-backed client with a custom event handler.
    pub fn with_handler(settings: ClientSettings, handler: Box<dyn EventHandler>) -> Client {
        Self::with_engine(settings, handler, crate::mosquitto::MosquittoEngine::create)
    }
}

impl Client {
    /// Creates a client over an injected engine.
    ///
    /// The factory runs only after the settings pass validation, so a client
    /// id longer than [`MAX_CLIENT_ID_LEN`] bytes never touches the engine:
    /// the error is recorded, the status becomes [`Status::InDefect`] and the
    /// client is returned without a handle. An empty client id means
    /// "auto-generate".
    pub fn with_engine<F>(
        settings: ClientSettings,
        handler: Box<dyn EventHandler>,
        make_engine: F,
    ) -> Client
    where
        F: FnOnce(&ClientSettings) -> Result<Box<dyn Engine>>,
    {
        let state = Arc::new(ClientState::new(handler));

        if settings.client_id.len() > MAX_CLIENT_ID_LEN {
            state.record(&Error::invalid_argument(format!(
                "client id must be at most {} bytes, got {}",
                MAX_CLIENT_ID_LEN,
                settings.client_id.len()
            )));
            state.set_status(Status::InDefect);
            return Client {
                engine: None,
                state,
                version: Version::new([0, 0, 0], settings.protocol),
            };
        }

        match make_engine(&settings) {
            Ok(mut engine) => {
                engine.bind(state.clone());
                let version = Version::new(engine.library_version(), settings.protocol);
                Client {
                    engine: Some(engine),
                    state,
                    version,
                }
            }
            Err(error) => {
                log::error!("engine construction failed: {error}");
                state.record(&error);
                state.set_status(Status::InDefect);
                Client {
                    engine: None,
                    state,
                    version: Version::new([0, 0, 0], settings.protocol),
                }
            }
        }
    }

    /// Returns the current connection status.
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Returns the most recently recorded failure.
    ///
    /// This reflects the latest failed operation on this client, not a
    /// specific call site; callers issuing operations from several threads
    /// cannot attribute it reliably.
    pub fn last_error(&self) -> Option<Error> {
        self.state.last_error()
    }

    /// Returns wrapper and engine library version information.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Submits a non-blocking connect request and starts the engine's
    /// network loop.
    ///
    /// Returns `Ok` once the request is accepted; the actual outcome arrives
    /// later through [`EventHandler::on_connected`] (or the closure given to
    /// [`connect_with`](Client::connect_with)). A no-op when already
    /// connected.
    pub fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        self.connect_impl(options, None, None)
    }

    /// Like [`connect`](Client::connect), but stores closures invoked with
    /// the engine reason code on connection and disconnection.
    ///
    /// Both slots are overwritten unconditionally, `None` clearing any
    /// closure stored by an earlier call.
    pub fn connect_with(
        &mut self,
        options: &ConnectOptions,
        on_connected: Option<ConnectionCallback>,
        on_disconnected: Option<ConnectionCallback>,
    ) -> Result<()> {
        self.connect_impl(options, on_connected, on_disconnected)
    }

    fn connect_impl(
        &mut self,
        options: &ConnectOptions,
        on_connected: Option<ConnectionCallback>,
        on_disconnected: Option<ConnectionCallback>,
    ) -> Result<()> {
        if self.state.status() == Status::Connected {
            return Ok(());
        }
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(self.state.reject(Error::NotInitialized)),
        };

        if let Ok(mut guard) = self.state.callbacks.lock() {
            guard.connection = on_connected.map(Arc::from);
            guard.disconnection = on_disconnected.map(Arc::from);
        }

        log::debug!("connect request to {}:{}", options.address, options.port);
        engine
            .connect(options)
            .map_err(|error| self.state.reject(error))?;
        engine.start().map_err(|error| self.state.reject(error))?;
        Ok(())
    }

    /// Requests a disconnect from the broker.
    ///
    /// The disconnection closure or [`EventHandler::on_disconnected`] fires
    /// asynchronously once the engine confirms.
    pub fn disconnect(&mut self) -> Result<()> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(self.state.reject(Error::NotInitialized)),
        };
        log::debug!("disconnect request");
        engine
            .disconnect()
            .map_err(|error| self.state.reject(error))
    }

    /// Subscribes to a topic, leaving any previously registered reception
    /// callback for that name untouched.
    ///
    /// The engine-assigned request id is stored into `topic.id`. No ordering
    /// is enforced with respect to the connection: subscribing while
    /// disconnected surfaces the engine's error.
    pub fn subscribe(&mut self, topic: &mut Topic, qos: QoS) -> Result<()> {
        self.subscribe_impl(topic, qos, None)
    }

    /// Subscribes to a topic and registers a reception callback for it,
    /// overwriting any prior callback under the exact same name.
    ///
    /// Dispatch matches the incoming message's topic name against registered
    /// names as exact strings; MQTT wildcard filters are not expanded, so
    /// messages granted by a `+`/`#` subscription arrive under their concrete
    /// topic name and reach [`EventHandler::on_message`] instead.
    pub fn subscribe_with(
        &mut self,
        topic: &mut Topic,
        qos: QoS,
        on_message: ReceptionCallback,
    ) -> Result<()> {
        self.subscribe_impl(topic, qos, Some(on_message))
    }

    fn subscribe_impl(
        &mut self,
        topic: &mut Topic,
        qos: QoS,
        on_message: Option<ReceptionCallback>,
    ) -> Result<()> {
        if topic.name.is_empty() {
            return Err(self
                .state
                .reject(Error::invalid_argument("topic name must not be empty")));
        }
        if on_message.is_some() && topic.has_wildcards() {
            log::warn!(
                "reception callback registered for wildcard filter '{}': matching \
                 messages carry their concrete topic name and will reach the \
                 generic handler instead",
                topic.name
            );
        }
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(self.state.reject(Error::NotInitialized)),
        };

        let mid = engine
            .subscribe(&topic.name, qos)
            .map_err(|error| self.state.reject(error))?;
        topic.id = mid;
        log::debug!("subscribe request '{}', mid={mid}", topic.name);

        if let Some(callback) = on_message {
            if let Ok(mut guard) = self.state.callbacks.lock() {
                guard.reception.insert(topic.name.clone(), Arc::from(callback));
            }
        }
        Ok(())
    }

    /// Unsubscribes from a topic and removes its reception callback.
    ///
    /// The engine-assigned request id is stored into `topic.id`.
    pub fn unsubscribe(&mut self, topic: &mut Topic) -> Result<()> {
        if topic.name.is_empty() {
            return Err(self
                .state
                .reject(Error::invalid_argument("topic name must not be empty")));
        }
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(self.state.reject(Error::NotInitialized)),
        };

        let mid = engine
            .unsubscribe(&topic.name)
            .map_err(|error| self.state.reject(error))?;
        topic.id = mid;
        log::debug!("unsubscribe request '{}', mid={mid}", topic.name);

        if let Ok(mut guard) = self.state.callbacks.lock() {
            guard.reception.remove(&topic.name);
        }
        Ok(())
    }

    /// Publishes a payload on a topic with the topic's retain flag.
    ///
    /// Accepts anything byte-like (`&str`, `String`, `&[u8]`, `Vec<u8>`).
    /// `Ok` means the send request was accepted; for QoS 1/2 the delivery
    /// acknowledgment arrives later via [`EventHandler::on_published`].
    pub fn publish(
        &mut self,
        topic: &Topic,
        payload: impl AsRef<[u8]>,
        qos: QoS,
    ) -> Result<()> {
        if topic.name.is_empty() {
            return Err(self
                .state
                .reject(Error::invalid_argument("topic name must not be empty")));
        }
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(self.state.reject(Error::NotInitialized)),
        };

        let payload = payload.as_ref();
        let mid = engine
            .publish(&topic.name, payload, qos, topic.retain)
            .map_err(|error| self.state.reject(error))?;
        log::trace!(
            "publish request '{}' ({} bytes), mid={mid}",
            topic.name,
            payload.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("status", &self.status())
            .field("version", &self.version)
            .field("has_engine", &self.engine.is_some())
            .finish()
    }
}

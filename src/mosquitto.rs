//! The libmosquitto engine backend.
//!
//! One [`MosquittoEngine`] wraps one `struct mosquitto` handle. The sink
//! bound through [`Engine::bind`] is boxed and handed to the library as the
//! opaque user-data pointer; the six trampolines recover it and forward each
//! event. The box is released only after `mosquitto_destroy`, so the pointer
//! stays valid for the whole life of the handle.

use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::{Arc, Mutex};

use libc::{c_int, c_void};

use crate::client::ClientSettings;
use crate::engine::{ConnectOptions, Engine, EventSink};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::sys;
use crate::types::{MessageId, Protocol, QoS, Session};

/// Number of live engine handles sharing the global library state.
static LIB_REFS: Mutex<usize> = Mutex::new(0);

/// Refcounted ownership of the process-wide mosquitto library state.
///
/// The first guard acquired calls `mosquitto_lib_init`, the last one dropped
/// calls `mosquitto_lib_cleanup`. Every engine handle owns one guard, so the
/// refcount always equals the number of live handles.
struct LibGuard;

impl LibGuard {
    fn acquire() -> Result<LibGuard> {
        let mut refs = LIB_REFS.lock().unwrap_or_else(|e| e.into_inner());
        if *refs == 0 {
            let rc = unsafe { sys::mosquitto_lib_init() };
            if rc != sys::MOSQ_ERR_SUCCESS {
                return Err(Error::EngineInitFailed(strerror(rc)));
            }
            log::debug!("mosquitto library initialized");
        }
        *refs += 1;
        Ok(LibGuard)
    }
}

impl Drop for LibGuard {
    fn drop(&mut self) {
        let mut refs = LIB_REFS.lock().unwrap_or_else(|e| e.into_inner());
        *refs -= 1;
        if *refs == 0 {
            unsafe { sys::mosquitto_lib_cleanup() };
            log::debug!("mosquitto library cleaned up");
        }
    }
}

/// Translates a native return code through `mosquitto_strerror`.
fn strerror(rc: c_int) -> String {
    unsafe { CStr::from_ptr(sys::mosquitto_strerror(rc)) }
        .to_string_lossy()
        .into_owned()
}

fn check(rc: c_int) -> Result<()> {
    if rc == sys::MOSQ_ERR_SUCCESS {
        Ok(())
    } else {
        Err(Error::engine(rc, strerror(rc)))
    }
}

/// Recovers the bound sink from the opaque user-data pointer.
///
/// The pointer is set in [`Engine::bind`] before any callback can fire and
/// released after `mosquitto_destroy`; a null here is a programming-invariant
/// violation, not a runtime condition.
unsafe fn recover<'a>(obj: *mut c_void) -> &'a Arc<dyn EventSink> {
    assert!(!obj.is_null(), "engine callback fired without a bound sink");
    &*(obj as *const Arc<dyn EventSink>)
}

unsafe extern "C" fn on_connect(_mosq: *mut sys::mosquitto, obj: *mut c_void, rc: c_int) {
    recover(obj).on_connected(rc);
}

unsafe extern "C" fn on_disconnect(_mosq: *mut sys::mosquitto, obj: *mut c_void, rc: c_int) {
    recover(obj).on_disconnected(rc);
}

unsafe extern "C" fn on_publish(_mosq: *mut sys::mosquitto, obj: *mut c_void, mid: c_int) {
    recover(obj).on_published(mid);
}

unsafe extern "C" fn on_subscribe(
    _mosq: *mut sys::mosquitto,
    obj: *mut c_void,
    mid: c_int,
    qos_count: c_int,
    granted_qos: *const c_int,
) {
    let granted = if granted_qos.is_null() || qos_count <= 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(granted_qos, qos_count as usize)
    };
    recover(obj).on_subscribed(mid, granted);
}

unsafe extern "C" fn on_unsubscribe(_mosq: *mut sys::mosquitto, obj: *mut c_void, mid: c_int) {
    recover(obj).on_unsubscribed(mid);
}

unsafe extern "C" fn on_message(
    _mosq: *mut sys::mosquitto,
    obj: *mut c_void,
    message: *const sys::mosquitto_message,
) {
    let sink = recover(obj);
    if message.is_null() {
        return;
    }
    let message = &*message;

    let topic = if message.topic.is_null() {
        ""
    } else {
        match CStr::from_ptr(message.topic).to_str() {
            Ok(topic) => topic,
            Err(_) => {
                log::warn!("dropping received message with non-UTF-8 topic name");
                return;
            }
        }
    };
    let payload = if message.payload.is_null() || message.payloadlen <= 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(message.payload as *const u8, message.payloadlen as usize)
    };
    let qos = QoS::from_value(message.qos).unwrap_or(QoS::AtMostOnce);

    sink.on_message(Message::new(topic, payload, qos, message.retain, message.mid));
}

/// One handle to the mosquitto client engine.
pub(crate) struct MosquittoEngine {
    handle: *mut sys::mosquitto,
    sink: Option<*mut Arc<dyn EventSink>>,
    _lib: LibGuard,
}

impl MosquittoEngine {
    /// Engine factory for [`Client::with_engine`](crate::Client::with_engine):
    /// initializes the library (refcounted) and allocates one handle with the
    /// requested identity, session policy and protocol version.
    pub(crate) fn create(settings: &ClientSettings) -> Result<Box<dyn Engine>> {
        let lib = LibGuard::acquire()?;

        // An empty id asks the library to generate one, which it only does
        // for clean sessions; that restriction is the engine's to report.
        let id = if settings.client_id.is_empty() {
            None
        } else {
            Some(CString::new(settings.client_id.as_str())?)
        };
        let id_ptr = id.as_ref().map_or(ptr::null(), |id| id.as_ptr());
        let clean_session = matches!(settings.session, Session::Cleanup);

        let handle = unsafe { sys::mosquitto_new(id_ptr, clean_session, ptr::null_mut()) };
        if handle.is_null() {
            return Err(Error::OutOfMemory);
        }

        let protocol = match settings.protocol {
            Protocol::V31 => sys::MQTT_PROTOCOL_V31,
            Protocol::V311 => sys::MQTT_PROTOCOL_V311,
            Protocol::V5 => sys::MQTT_PROTOCOL_V5,
        };
        let rc = unsafe {
            sys::mosquitto_int_option(handle, sys::MOSQ_OPT_PROTOCOL_VERSION, protocol)
        };
        if rc != sys::MOSQ_ERR_SUCCESS {
            unsafe { sys::mosquitto_destroy(handle) };
            return Err(Error::engine(rc, strerror(rc)));
        }

        Ok(Box::new(MosquittoEngine {
            handle,
            sink: None,
            _lib: lib,
        }))
    }
}

impl Engine for MosquittoEngine {
    fn bind(&mut self, sink: Arc<dyn EventSink>) {
        // The Arc is boxed to get a thin pointer through the C void*.
        let context = Box::into_raw(Box::new(sink));
        unsafe {
            sys::mosquitto_user_data_set(self.handle, context as *mut c_void);
            sys::mosquitto_connect_callback_set(self.handle, Some(on_connect));
            sys::mosquitto_disconnect_callback_set(self.handle, Some(on_disconnect));
            sys::mosquitto_publish_callback_set(self.handle, Some(on_publish));
            sys::mosquitto_subscribe_callback_set(self.handle, Some(on_subscribe));
            sys::mosquitto_unsubscribe_callback_set(self.handle, Some(on_unsubscribe));
            sys::mosquitto_message_callback_set(self.handle, Some(on_message));
        }
        if let Some(old) = self.sink.replace(context) {
            unsafe { drop(Box::from_raw(old)) };
        }
    }

    fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        let host = CString::new(options.address.as_str())?;
        let keepalive = options.keepalive.as_secs().min(c_int::MAX as u64) as c_int;
        check(unsafe {
            sys::mosquitto_connect_async(
                self.handle,
                host.as_ptr(),
                c_int::from(options.port),
                keepalive,
            )
        })
    }

    fn start(&mut self) -> Result<()> {
        check(unsafe { sys::mosquitto_loop_start(self.handle) })
    }

    fn disconnect(&mut self) -> Result<()> {
        check(unsafe { sys::mosquitto_disconnect(self.handle) })
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId> {
        let topic = CString::new(topic)?;
        let mut mid: c_int = 0;
        check(unsafe {
            sys::mosquitto_subscribe(self.handle, &mut mid, topic.as_ptr(), qos.value())
        })?;
        Ok(mid)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<MessageId> {
        let topic = CString::new(topic)?;
        let mut mid: c_int = 0;
        check(unsafe { sys::mosquitto_unsubscribe(self.handle, &mut mid, topic.as_ptr()) })?;
        Ok(mid)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<MessageId> {
        let topic = CString::new(topic)?;
        let len = c_int::try_from(payload.len()).map_err(|_| {
            Error::invalid_argument("payload exceeds the engine's maximum length")
        })?;
        let data = if payload.is_empty() {
            ptr::null()
        } else {
            payload.as_ptr() as *const c_void
        };
        let mut mid: c_int = 0;
        check(unsafe {
            sys::mosquitto_publish(
                self.handle,
                &mut mid,
                topic.as_ptr(),
                len,
                data,
                qos.value(),
                retain,
            )
        })?;
        Ok(mid)
    }

    fn library_version(&self) -> [i32; 3] {
        let mut version = [0 as c_int; 3];
        unsafe {
            sys::mosquitto_lib_version(&mut version[0], &mut version[1], &mut version[2]);
        }
        version
    }
}

impl Drop for MosquittoEngine {
    fn drop(&mut self) {
        // Scoped release: request disconnect regardless of status, stop the
        // loop thread, then free the handle. Return codes are unobservable
        // from a destructor.
        unsafe {
            sys::mosquitto_disconnect(self.handle);
            sys::mosquitto_loop_stop(self.handle, true);
            sys::mosquitto_destroy(self.handle);
        }
        // Released after the handle, so no callback can see it dangle.
        if let Some(context) = self.sink.take() {
            unsafe { drop(Box::from_raw(context)) };
        }
    }
}

// The handle is only reached through &mut self or the library's own
// internally synchronized loop thread.
unsafe impl Send for MosquittoEngine {}

//! Raw FFI declarations for the libmosquitto C API.
//!
//! Hand-written against `mosquitto.h`; the subset declared here covers
//! library lifecycle, handle lifecycle, the six callback slots and the
//! request submitters. See <https://mosquitto.org/api/files/mosquitto-h.html>.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void};

/// Return code for a successful call.
pub const MOSQ_ERR_SUCCESS: c_int = 0;

/// `MOSQ_OPT_PROTOCOL_VERSION` for `mosquitto_int_option`.
pub const MOSQ_OPT_PROTOCOL_VERSION: c_int = 1;

/// Protocol version values accepted by `MOSQ_OPT_PROTOCOL_VERSION`.
pub const MQTT_PROTOCOL_V31: c_int = 3;
/// MQTT 3.1.1.
pub const MQTT_PROTOCOL_V311: c_int = 4;
/// MQTT 5.
pub const MQTT_PROTOCOL_V5: c_int = 5;

/// Opaque mosquitto client handle.
#[repr(C)]
pub struct mosquitto {
    _private: [u8; 0],
}

/// Message structure handed to the message callback. Owned by the library;
/// valid only for the duration of the callback.
#[repr(C)]
pub struct mosquitto_message {
    /// Message id.
    pub mid: c_int,
    /// Null-terminated topic name.
    pub topic: *mut c_char,
    /// Payload bytes (the library appends a trailing null byte).
    pub payload: *mut c_void,
    /// Payload length in bytes.
    pub payloadlen: c_int,
    /// Quality of service the message was delivered with.
    pub qos: c_int,
    /// Retained-message flag.
    pub retain: bool,
}

pub type connect_callback =
    unsafe extern "C" fn(mosq: *mut mosquitto, obj: *mut c_void, rc: c_int);
pub type disconnect_callback =
    unsafe extern "C" fn(mosq: *mut mosquitto, obj: *mut c_void, rc: c_int);
pub type publish_callback =
    unsafe extern "C" fn(mosq: *mut mosquitto, obj: *mut c_void, mid: c_int);
pub type subscribe_callback = unsafe extern "C" fn(
    mosq: *mut mosquitto,
    obj: *mut c_void,
    mid: c_int,
    qos_count: c_int,
    granted_qos: *const c_int,
);
pub type unsubscribe_callback =
    unsafe extern "C" fn(mosq: *mut mosquitto, obj: *mut c_void, mid: c_int);
pub type message_callback = unsafe extern "C" fn(
    mosq: *mut mosquitto,
    obj: *mut c_void,
    message: *const mosquitto_message,
);

extern "C" {
    pub fn mosquitto_lib_init() -> c_int;
    pub fn mosquitto_lib_cleanup() -> c_int;
    pub fn mosquitto_lib_version(
        major: *mut c_int,
        minor: *mut c_int,
        revision: *mut c_int,
    ) -> c_int;

    pub fn mosquitto_new(
        id: *const c_char,
        clean_session: bool,
        obj: *mut c_void,
    ) -> *mut mosquitto;
    pub fn mosquitto_destroy(mosq: *mut mosquitto);
    pub fn mosquitto_user_data_set(mosq: *mut mosquitto, obj: *mut c_void);
    pub fn mosquitto_int_option(mosq: *mut mosquitto, option: c_int, value: c_int) -> c_int;

    pub fn mosquitto_connect_async(
        mosq: *mut mosquitto,
        host: *const c_char,
        port: c_int,
        keepalive: c_int,
    ) -> c_int;
    pub fn mosquitto_disconnect(mosq: *mut mosquitto) -> c_int;
    pub fn mosquitto_loop_start(mosq: *mut mosquitto) -> c_int;
    pub fn mosquitto_loop_stop(mosq: *mut mosquitto, force: bool) -> c_int;

    pub fn mosquitto_publish(
        mosq: *mut mosquitto,
        mid: *mut c_int,
        topic: *const c_char,
        payloadlen: c_int,
        payload: *const c_void,
        qos: c_int,
        retain: bool,
    ) -> c_int;
    pub fn mosquitto_subscribe(
        mosq: *mut mosquitto,
        mid: *mut c_int,
        sub: *const c_char,
        qos: c_int,
    ) -> c_int;
    pub fn mosquitto_unsubscribe(
        mosq: *mut mosquitto,
        mid: *mut c_int,
        sub: *const c_char,
    ) -> c_int;

    pub fn mosquitto_strerror(mosq_errno: c_int) -> *const c_char;

    pub fn mosquitto_connect_callback_set(mosq: *mut mosquitto, cb: Option<connect_callback>);
    pub fn mosquitto_disconnect_callback_set(
        mosq: *mut mosquitto,
        cb: Option<disconnect_callback>,
    );
    pub fn mosquitto_publish_callback_set(mosq: *mut mosquitto, cb: Option<publish_callback>);
    pub fn mosquitto_subscribe_callback_set(mosq: *mut mosquitto, cb: Option<subscribe_callback>);
    pub fn mosquitto_unsubscribe_callback_set(
        mosq: *mut mosquitto,
        cb: Option<unsubscribe_callback>,
    );
    pub fn mosquitto_message_callback_set(mosq: *mut mosquitto, cb: Option<message_callback>);
}

//! Subscribes to a topic on a local broker and prints every message.
//!
//! Run with: `cargo run --example subscribe --features mosquitto`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use mosq_rs::{Client, ClientSettings, ConnectOptions, QoS, Result, Topic};

fn main() -> Result<()> {
    env_logger::init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let mut client = Client::new(ClientSettings::new("mosq-rs-subscriber"));
    println!("[OK] Client created (engine {:?})", client.version().library);

    // The connect request is non-blocking; the closure signals the owning
    // thread once the broker answers.
    let (tx, rx) = mpsc::channel();
    client.connect_with(
        &ConnectOptions::new("localhost"),
        Some(Box::new(move |rc| {
            let _ = tx.send(rc);
        })),
        None,
    )?;

    let rc = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("no connection outcome within 10 s");
    if rc != 0 {
        eprintln!("Broker refused the connection, rc={rc}");
        return Ok(());
    }
    println!("[OK] Connected to broker");

    // Subscriptions do not survive a reconnect; a long-lived program would
    // re-subscribe from the connection closure's signal.
    let mut topic = Topic::new("Example/Input");
    client.subscribe_with(
        &mut topic,
        QoS::AtMostOnce,
        Box::new(|msg| {
            println!(
                "Received on '{}': {}",
                msg.topic,
                msg.payload_str().unwrap_or("<non-utf8 payload>")
            );
        }),
    )?;
    println!("[OK] Subscribed to '{topic}' (mid={})", topic.id);

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    client.disconnect()?;
    println!("Bye");
    Ok(())
}

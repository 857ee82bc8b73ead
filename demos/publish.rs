//! Publishes a counter to a topic on a local broker once per second.
//!
//! Run with: `cargo run --example publish --features mosquitto`

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

    let mut client = Client::new(ClientSettings::new("mosq-rs-publisher"));
    println!("[OK] Client created (engine {:?})", client.version().library);

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

    let topic = Topic::new("Example/Output");
    let mut counter = 0u64;
    while running.load(Ordering::SeqCst) {
        let payload = format!("tick {counter}");
        client.publish(&topic, &payload, QoS::AtLeastOnce)?;
        println!("Published '{payload}' on '{topic}'");
        counter += 1;
        std::thread::sleep(Duration::from_secs(1));
    }

    client.disconnect()?;
    println!("Bye");
    Ok(())
}

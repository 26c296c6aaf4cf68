//! Client for the echo-server example: sends ten `say` commands and prints
//! the replies.

use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use braid::codec::Value;
use braid::frame::line_frames;
use braid::peer::{wrap_command, CommandDispatcher, Initiator};
use braid::transport::NetKind;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8972".to_string());

    let (tx, rx) = mpsc::channel::<String>();
    let tx = Mutex::new(tx);
    let dispatcher = CommandDispatcher::new().command("reply", move |_channel, body| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(String::from_utf8_lossy(&body).into_owned());
        }
        Ok(())
    });

    let client = Initiator::new()
        .with_frame_fn(line_frames())
        .with_dial_timeout(Duration::from_secs(3))
        .with_handler(dispatcher);
    client.dial(NetKind::Tcp, &addr)?;

    for i in 0..10 {
        let payload = format!("hello {i}");
        client.write(Value::Bytes(wrap_command("say", payload.as_bytes())?))?;
    }

    for _ in 0..10 {
        println!("reply: {}", rx.recv_timeout(Duration::from_secs(5))?);
    }

    client.stop();
    Ok(())
}

//! Line-framed echo server: answers every `say` command with a `reply`.
//!
//! Run with:
//!   cargo run --example echo-server -- 127.0.0.1:8972
//!
//! In another terminal:
//!   cargo run --example echo-client -- 127.0.0.1:8972

use std::sync::Arc;

use braid::frame::{line_frames, FrameChannel};
use braid::peer::{wrap_command, Acceptor, CommandDispatcher};
use braid::transport::NetKind;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8972".to_string());

    let dispatcher = CommandDispatcher::new()
        .command("say", |channel, body| {
            eprintln!("received: {}", String::from_utf8_lossy(&body));
            let reply = wrap_command("reply", &body)?;
            channel.write_frame(&reply)?;
            Ok(())
        })
        .on_connected(|conn| eprintln!("connected: {}", conn.peer_label()))
        .on_disconnected(|conn| eprintln!("disconnected: {}", conn.peer_label()));

    let server = Arc::new(
        Acceptor::new()
            .with_frame_fn(line_frames())
            .with_handler(dispatcher),
    );

    let stopper = Arc::clone(&server);
    ctrlc::set_handler(move || stopper.stop())?;

    eprintln!("listening on {addr}");
    server.serve(NetKind::Tcp, &addr)?;
    Ok(())
}

//! Full-stack echo: line frames, a string codec, and command-tag routing
//! between an acceptor and an initiator.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use braid::codec::{CodecChain, StringCodec, Value};
use braid::frame::line_frames;
use braid::peer::{
    wrap_command, write_value, Acceptor, CommandDispatcher, Initiator, PeerError,
};
use braid::transport::NetKind;

fn echo_server() -> Arc<Acceptor> {
    let dispatcher = CommandDispatcher::new().command("say", |channel, body| {
        let reply = wrap_command("reply", &body)?;
        let reply = String::from_utf8(reply.to_vec())
            .map_err(|err| PeerError::Handler(err.to_string()))?;
        write_value(
            &CodecChain::new().with(StringCodec),
            channel.as_ref(),
            Value::Text(reply),
        )
    });

    Arc::new(
        Acceptor::new()
            .with_frame_fn(line_frames())
            .with_chain(CodecChain::new().with(StringCodec))
            .with_handler(dispatcher),
    )
}

fn reply_client(tx: mpsc::Sender<String>) -> Initiator {
    let tx = Mutex::new(tx);
    let dispatcher = CommandDispatcher::new().command("reply", move |_channel, body| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(String::from_utf8_lossy(&body).into_owned());
        }
        Ok(())
    });

    Initiator::new()
        .with_frame_fn(line_frames())
        .with_chain(CodecChain::new().with(StringCodec))
        .with_dial_timeout(Duration::from_secs(3))
        .with_handler(dispatcher)
}

fn wait_for_addr(server: &Acceptor) -> String {
    let start = Instant::now();
    loop {
        if let Some(addr) = server.local_addr() {
            return addr;
        }
        assert!(start.elapsed() < Duration::from_secs(2), "server never bound");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn say_hello_roundtrip(kind: NetKind, addr: &str) {
    let server = echo_server();
    let serving = Arc::clone(&server);
    let serve_addr = addr.to_string();
    let serve_thread = std::thread::spawn(move || serving.serve(kind, &serve_addr));
    let addr = wait_for_addr(&server);

    let (tx, rx) = mpsc::channel();
    let client = reply_client(tx);
    client.dial(kind, &addr).unwrap();

    let say = wrap_command("say", b"hello").unwrap();
    client
        .write(Value::Text(String::from_utf8(say.to_vec()).unwrap()))
        .unwrap();

    let reply = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(reply, "hello");

    // Exactly once: no second delivery follows.
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

    client.stop();
    server.stop();
    assert!(serve_thread.join().unwrap().is_ok());
}

#[test]
fn say_reply_echo_over_tcp() {
    say_hello_roundtrip(NetKind::Tcp, "127.0.0.1:0");
}

#[cfg(unix)]
#[test]
fn say_reply_echo_over_unix() {
    let dir = std::env::temp_dir().join(format!(
        "braid-echo-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let sock = dir.join("echo.sock");

    say_hello_roundtrip(NetKind::Unix, sock.to_str().unwrap());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn many_messages_arrive_in_order() {
    let server = echo_server();
    let serving = Arc::clone(&server);
    let serve_thread =
        std::thread::spawn(move || serving.serve(NetKind::Tcp, "127.0.0.1:0"));
    let addr = wait_for_addr(&server);

    let (tx, rx) = mpsc::channel();
    let client = reply_client(tx);
    client.dial(NetKind::Tcp, &addr).unwrap();

    for i in 0..64 {
        let say = wrap_command("say", format!("msg-{i}").as_bytes()).unwrap();
        client
            .write(Value::Text(String::from_utf8(say.to_vec()).unwrap()))
            .unwrap();
    }

    for i in 0..64 {
        let reply = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(reply, format!("msg-{i}"));
    }

    client.stop();
    server.stop();
    assert!(serve_thread.join().unwrap().is_ok());
}

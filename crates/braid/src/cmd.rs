use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use braid_codec::Value;
use braid_frame::{line_frames, FrameChannel};
use braid_peer::{wrap_command, Acceptor, CommandDispatcher, Initiator};
use braid_transport::NetKind;
use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::exit::{CliError, CliResult, FAILURE, TIMEOUT};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a line-framed echo server answering `say` commands with `reply`.
    Serve(ServeArgs),
    /// Dial a server, send `say` commands, print the replies.
    Send(SendArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Network kind: tcp, tcp4, tcp6, or unix.
    #[arg(long, default_value = "tcp")]
    network: String,

    /// Listen address (host:port for tcp, socket path for unix).
    addr: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Network kind: tcp, tcp4, tcp6, or unix.
    #[arg(long, default_value = "tcp")]
    network: String,

    /// Server address (host:port for tcp, socket path for unix).
    addr: String,

    /// Message payload for each `say` command.
    #[arg(long, short)]
    message: String,

    /// How many times to send the message.
    #[arg(long, default_value_t = 1)]
    count: u32,
}

pub fn run(command: Command) -> CliResult<()> {
    match command {
        Command::Serve(args) => serve(args),
        Command::Send(args) => send(args),
    }
}

fn serve(args: ServeArgs) -> CliResult<()> {
    let kind: NetKind = args.network.parse()?;

    let dispatcher = CommandDispatcher::new()
        .command("say", |channel, body| {
            info!(payload = %String::from_utf8_lossy(&body), "say");
            let reply = wrap_command("reply", &body)?;
            channel.write_frame(&reply)?;
            Ok(())
        })
        .on_connected(|conn| info!(peer = conn.peer_label(), "peer connected"))
        .on_disconnected(|conn| info!(peer = conn.peer_label(), "peer disconnected"))
        .on_error(|err| warn!(%err, "session error"));

    let server = Arc::new(
        Acceptor::new()
            .with_frame_fn(line_frames())
            .with_handler(dispatcher),
    );

    let stopper = Arc::clone(&server);
    ctrlc::set_handler(move || stopper.stop())
        .map_err(|err| CliError::new(FAILURE, format!("failed to install signal handler: {err}")))?;

    server.serve(kind, &args.addr)?;
    Ok(())
}

fn send(args: SendArgs) -> CliResult<()> {
    let kind: NetKind = args.network.parse()?;

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
    client.dial(kind, &args.addr)?;

    for _ in 0..args.count {
        client.write(Value::Bytes(wrap_command("say", args.message.as_bytes())?))?;
    }

    for _ in 0..args.count {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(reply) => println!("{reply}"),
            Err(_) => {
                client.stop();
                return Err(CliError::new(TIMEOUT, "timed out waiting for reply"));
            }
        }
    }

    client.stop();
    Ok(())
}

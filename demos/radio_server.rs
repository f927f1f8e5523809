//! Minimal ICY radio server
//!
//! Run with: cargo run --example radio_server -- [BIND_ADDR] [FILE.mp3]
//!
//! Without a file, a synthetic MP3 stream (silent frames) is broadcast on
//! channel 1 with a rotating title. With a file, it is looped through a
//! [`FileFeeder`] at real-time pace.
//!
//! ## Listening
//!
//!   curl -H 'Icy-MetaData: 1' http://localhost:8000/ --output - | xxd | head
//!   mpv http://localhost:8000/
//!   vlc http://localhost:8000/
//!
//! # Architecture
//!
//! ```text
//!   feeder task ──write()──▶ BroadcastBuffer ◀──cursor── ListenSession ──▶ TCP
//!                                  ▲
//!                                  └──────────cursor── ListenSession ──▶ TCP
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use radiocast::{
    AudioFormat, BroadcastBuffer, BroadcastRegistry, ClientSink, FeederConfig, FileFeeder,
    ListenSession, ListenerContext, SessionConfig, SessionError, SharedFileRegistry, StreamKey,
    WriterSink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// 128 kbps, 44.1 kHz MPEG-1 Layer III frame: header + silent payload
const FRAME_LEN: usize = 417;
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

const TITLES: &[&str] = &[
    "Test Card - Silence No. 1",
    "Test Card - Silence No. 2",
    "Test Card - Silence No. 3",
];

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Broadcast silent MP3 frames at real-time pace, rotating the title
async fn synthetic_feed(buffer: Arc<BroadcastBuffer>) {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);

    let frame_time = Duration::from_secs_f64(1152.0 / 44_100.0);
    let mut ticker = tokio::time::interval(frame_time);
    let mut frames: u64 = 0;

    loop {
        ticker.tick().await;

        // ~10 seconds per title
        if frames % 383 == 0 {
            let title = TITLES[(frames / 383) as usize % TITLES.len()];
            buffer.set_title(title);
            tracing::info!(title = title, "Title changed");
        }

        if buffer.write(&frame).is_err() {
            tracing::info!("Broadcast stopped, synthetic feed exiting");
            return;
        }
        frames += 1;
    }
}

/// Loop a file into the broadcast until it stops
async fn file_feed(buffer: Arc<BroadcastBuffer>, path: PathBuf) -> radiocast::Result<()> {
    let files = Arc::new(SharedFileRegistry::new());
    let feeder = FileFeeder::new(Arc::clone(&buffer), FeederConfig::default());
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    while !buffer.is_stopped() {
        let mut stream = files.open(&path).await?;
        let fed = feeder.feed(&mut stream, Some(&title)).await?;
        if fed == 0 {
            tracing::warn!(path = %path.display(), "File is empty, stopping feed");
            break;
        }
    }

    Ok(())
}

/// Read request headers up to the blank line
async fn read_request_headers(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
) -> std::io::Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    let mut line = String::new();

    // Request line
    reader.read_line(&mut line).await?;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(headers)
}

async fn handle_listener(
    socket: TcpStream,
    peer: SocketAddr,
    buffer: Arc<BroadcastBuffer>,
) -> std::io::Result<()> {
    let (read_half, write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);
    let headers = read_request_headers(&mut reader).await?;

    let ctx = ListenerContext::new(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
        .with_peer(peer)
        .with_request_headers(headers.iter().map(|(n, v)| (n.as_str(), v.as_str())));

    let config = SessionConfig::default().metadata_interval(16_000);
    let mut session = match ListenSession::open(&buffer, WriterSink::new(write_half), ctx, config)
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Refusing listener");
            return Ok(());
        }
    };

    let mut response = String::from("HTTP/1.0 200 OK\r\n");
    for (name, value) in session.response_headers() {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    session.sink_mut().write(Bytes::from(response)).await?;

    match session.run().await {
        Ok(stats) => {
            tracing::info!(
                peer = %peer,
                bytes = stats.bytes_sent,
                underruns = stats.underruns,
                "Listener finished"
            );
        }
        Err(SessionError::ClientDisconnected(_)) => {
            tracing::info!(peer = %peer, stats = ?session.stats(), "Listener disconnected");
        }
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Listener session failed");
        }
    }

    Ok(())
}

fn print_usage() {
    eprintln!("Usage: radio_server [BIND_ADDR] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8000)");
    eprintln!("  FILE         MP3 file to loop (default: synthetic silence)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr: SocketAddr = match args.get(1) {
        Some(addr) => addr.replace("localhost", "127.0.0.1").parse()?,
        None => SocketAddr::from(([0, 0, 0, 0], 8000)),
    };
    let file = args.get(2).map(PathBuf::from);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("radiocast=debug".parse()?)
                .add_directive("radio_server=debug".parse()?),
        )
        .init();

    let registry = Arc::new(BroadcastRegistry::new());
    let _cleanup = registry.spawn_cleanup_task();

    let key = StreamKey::new(1, AudioFormat::default());
    let buffer = registry.start_broadcast(key).await?;

    match file {
        Some(path) => {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                if let Err(e) = file_feed(buffer, path).await {
                    tracing::error!(error = %e, "File feed failed");
                }
            });
        }
        None => {
            tokio::spawn(synthetic_feed(Arc::clone(&buffer)));
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    println!("Broadcasting {} on http://{}/", key, bind_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let buffer = Arc::clone(&buffer);
                tokio::spawn(async move {
                    if let Err(e) = handle_listener(socket, peer, buffer).await {
                        tracing::debug!(peer = %peer, error = %e, "Connection error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                registry.stop_broadcast(&key).await?;
                break;
            }
        }
    }

    Ok(())
}

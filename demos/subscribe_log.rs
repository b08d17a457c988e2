//! Subscribe to console log entries.
//!
//! Demonstrates:
//! - Creating an Engine over a transport
//! - Sending a typed command (`session.status`)
//! - Registering a context-independent listener for `log.entryAdded`
//! - Watching the fault sink
//!
//! Without `--url` the remote end is simulated in-process.
//!
//! Usage:
//!   cargo run --example subscribe_log
//!   cargo run --example subscribe_log -- --url ws://127.0.0.1:9222/session
//!   cargo run --example subscribe_log -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use bidi_engine::codec::LogEntry;
use bidi_engine::protocol::SessionStatus;
use bidi_engine::{
    BidiEvent, Engine, EngineConfig, EventEnvelope, EventKind, MemoryTransport, Result, Scope,
    Transport, WebSocketOptions, WebSocketTransport,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    url: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let url = args
            .iter()
            .position(|a| a == "--url")
            .and_then(|i| args.get(i + 1).cloned());
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            url,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "bidi_engine=debug"
    } else {
        "bidi_engine=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== subscribe_log ===\n");

    let transport: Arc<dyn Transport> = match &args.url {
        Some(url) => {
            println!("[Setup] Connecting to {url}...");
            let options = WebSocketOptions::new(url)?;
            Arc::new(WebSocketTransport::connect(&options).await?)
        }
        None => {
            println!("[Setup] Using simulated remote end");
            let memory = Arc::new(MemoryTransport::new());
            tokio::spawn(simulate_remote(Arc::clone(&memory)));
            memory
        }
    };

    let engine = Engine::new(transport, EngineConfig::default())?;

    // ========================================================================
    // Status
    // ========================================================================

    let status = engine.send(SessionStatus {}).await?;
    println!("[Status] ready={} message={:?}\n", status.ready, status.message);

    // ========================================================================
    // Listen
    // ========================================================================

    let mut faults = engine.faults();
    tokio::spawn(async move {
        while let Ok(fault) = faults.recv().await {
            println!("[Fault] {fault}");
        }
    });

    let handle = engine
        .add_listener(EventKind::LogEntryAdded, Scope::Global, print_entry)
        .await?;
    println!("[Listen] Subscribed to {}\n", EventKind::LogEntryAdded);

    if args.url.is_some() {
        println!("Press Ctrl+C to exit...");
        tokio::signal::ctrl_c().await.ok();
    } else {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    engine.remove_listener(handle).await?;
    println!("\n[Done] Unsubscribed");
    Ok(())
}

fn print_entry(envelope: &EventEnvelope) {
    let BidiEvent::LogEntryAdded(entry) = &envelope.event else {
        return;
    };

    let context = envelope
        .context
        .context
        .as_ref()
        .map_or("-", |c| c.as_str());
    let kind = match entry {
        LogEntry::Console(_) => "console",
        LogEntry::Javascript(_) => "javascript",
        LogEntry::Generic(_) => "generic",
    };

    println!(
        "[Log] {:?} {kind} ctx={context}: {}",
        entry.level(),
        entry.text().unwrap_or_default()
    );
}

// ============================================================================
// Simulated Remote End
// ============================================================================

/// Answers every command and emits a few log entries after subscribing.
async fn simulate_remote(transport: Arc<MemoryTransport>) {
    while let Some(frame) = transport.next_sent_json().await {
        let id = frame["id"].clone();
        let result = match frame["method"].as_str() {
            Some("session.status") => json!({ "ready": true, "message": "simulated" }),
            Some("session.subscribe") => json!({ "subscription": "sub-demo" }),
            _ => json!({}),
        };
        transport.inject_json(&json!({ "type": "success", "id": id, "result": result }));

        if frame["method"] == "session.subscribe" {
            // Let the engine attach the listener first
            tokio::time::sleep(Duration::from_millis(20)).await;
            for (level, text) in [("info", "page loaded"), ("warn", "slow script"), ("error", "oops")] {
                transport.inject_json(&json!({
                    "type": "event",
                    "method": "log.entryAdded",
                    "params": {
                        "type": "console",
                        "level": level,
                        "source": { "realm": "r-1", "context": "ctx-1" },
                        "text": text,
                        "timestamp": 1_700_000_000_000u64,
                        "method": "log",
                        "args": [{ "type": "string", "value": text }]
                    }
                }));
            }
            // Unsolicited fault, shown on the fault sink
            transport.inject_json(&json!({
                "type": "error",
                "id": null,
                "error": "unknown error",
                "message": "simulated fault"
            }));
        }
    }
}

//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited `CommandEnvelope` JSON from stdin and writes
//! `ResponseEnvelope` and `EventEnvelope` lines to stdout. Stdout carries
//! nothing else; diagnostics go to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

use crate::error::TrackerError;
use crate::host::channel::{HostCommandClient, command_channel};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::split::TaskSplitter;
use crate::tracker::Tracker;

const REQUEST_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 128;

type SharedStdout = Arc<Mutex<BufWriter<tokio::io::Stdout>>>;

/// Run the bridge until stdin closes or `runtime.stop` arrives.
///
/// The reader runs on the current task; the router server and the event
/// forwarder are spawned. Dropping the client at the end of the reader lets
/// the server drain and exit.
pub async fn run_stdio_bridge(
    tracker: Arc<Tracker>,
    splitter: Arc<dyn TaskSplitter>,
) -> crate::Result<()> {
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, tracker, splitter);
    let writer: SharedStdout = Arc::new(Mutex::new(BufWriter::new(tokio::io::stdout())));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(error = %e, "event write failed; stopping event forwarder");
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to serialize event envelope"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let reader_result = run_reader(client, Arc::clone(&writer)).await;

    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

async fn run_reader(client: HostCommandClient, writer: SharedStdout) -> crate::Result<()> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| TrackerError::Channel(format!("failed to read from stdin: {e}")))?;
        if bytes_read == 0 {
            tracing::info!("stdin closed; shutting down stdio bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable command envelope on stdin");
                write_response(&writer, &parse_error_response(&e)).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let request_id = envelope.request_id.clone();
        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "host command dispatch failed");
                ResponseEnvelope::failure(request_id, &e)
            }
        };
        write_response(&writer, &response).await?;

        if is_stop {
            tracing::info!("runtime.stop received; shutting down stdio bridge");
            break;
        }
    }

    Ok(())
}

fn parse_error_response(err: &serde_json::Error) -> ResponseEnvelope {
    ResponseEnvelope::failure(
        "parse-error",
        &TrackerError::InvalidArgument(format!("failed to parse command envelope: {err}")),
    )
}

async fn write_response(writer: &SharedStdout, response: &ResponseEnvelope) -> crate::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| TrackerError::Channel(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

async fn write_line(writer: &mut BufWriter<tokio::io::Stdout>, json: &str) -> crate::Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| TrackerError::Channel(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| TrackerError::Channel(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| TrackerError::Channel(format!("failed to flush stdout: {e}")))
}

//! Line-delimited JSON-RPC over a byte stream

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::ErrorCode;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::Server;
use super::protocol::{self, Response};
use crate::errors::{McpError, ServerError};

/// Read requests line by line, handling each one concurrently.
///
/// Only I/O errors on either stream end serving; malformed lines are answered
/// and skipped.
///
/// Responses are written as their handlers finish, so they may be out of
/// order. Once the input ends, outstanding requests are drained before
/// returning.
pub(super) async fn serve<R, W>(
    server: Arc<Server>,
    reader: R,
    mut writer: W,
    cancellation_token: CancellationToken,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    // Bytes of the line being read, kept across `select!` iterations
    let mut line = Vec::new();
    let mut tasks: JoinSet<Option<Response>> = JoinSet::new();
    // Request ids of running handlers, for reporting panics
    let mut pending: HashMap<task::Id, Value> = HashMap::new();
    let mut reading = true;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!(pending = tasks.len(), "Shutting down");
                tasks.shutdown().await;
                break;
            }
            read = reader.read_until(b'\n', &mut line), if reading => {
                if read? == 0 {
                    debug!(pending = tasks.len(), "End of input");
                    reading = false;
                    if tasks.is_empty() {
                        break;
                    }
                    continue;
                }

                // Invalid UTF-8 is replaced so the line still gets a parse error response
                let text = String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string();
                line.clear();
                if text.trim().is_empty() {
                    continue;
                }
                match protocol::parse_line(&text) {
                    Ok(request) => {
                        let id = (!request.is_notification()).then(|| request.id());
                        let server = server.clone();
                        let handle = tasks.spawn(async move { protocol::handle(&server, request).await });
                        if let Some(id) = id {
                            pending.insert(handle.id(), id);
                        }
                    }
                    Err(response) => write_response(&mut writer, &response).await?,
                }
            }
            Some(joined) = tasks.join_next_with_id() => {
                let response = match joined {
                    Ok((task_id, response)) => {
                        pending.remove(&task_id);
                        response
                    }
                    Err(join_error) => {
                        error!(%join_error, "Request handler failed");
                        pending.remove(&join_error.id()).map(|id| {
                            Response::error(
                                id,
                                McpError::new(
                                    ErrorCode::INTERNAL_ERROR,
                                    "Internal error while handling request",
                                    None,
                                ),
                            )
                        })
                    }
                };
                if let Some(response) = response {
                    write_response(&mut writer, &response).await?;
                }
                if !reading && tasks.is_empty() {
                    break;
                }
            }
        }
    }

    writer.flush().await?;
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(error) => {
            error!(%error, id = %response.id, "Failed to serialize response");
            return Ok(());
        }
    };
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

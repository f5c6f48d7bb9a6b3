//! WebSocket handler for line-by-line bulk shortening.

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::pipeline::inbox::Inbox;
use crate::pipeline::pool::run_pool;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Upgrades to a WebSocket that shortens one CSV line per text message.
///
/// # Endpoint
///
/// `GET /api/fast-bulk`
///
/// Each text frame may carry one or more `<url><delim><0|1>` lines. A `URI,QR`
/// header line is ignored. Every other line gets one reply of the form
/// `URI,short_URI,QR,message,validation_status`. Lines are processed
/// concurrently, so replies may arrive out of order.
pub async fn fast_bulk_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    let ip = client_ip(&headers, addr, state.behind_proxy);
    ws.on_upgrade(move |socket| handle_socket(socket, state, ip))
}

async fn handle_socket(socket: WebSocket, state: AppState, ip: String) {
    tracing::info!(ip = %ip, "Fast bulk connected");

    let (mut sink, mut stream) = socket.split();
    let concurrency = state.fast_bulk_concurrency.max(1);

    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(concurrency * 4);
    let send_task = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            if sink.send(Message::Text(reply.into())).await.is_err() {
                tracing::debug!("Fast bulk sink closed");
                break;
            }
        }
    });

    let (line_tx, line_rx) = mpsc::channel::<String>(concurrency * 4);
    let bulk = state.bulk_service.clone();
    let work_task = tokio::spawn(run_pool(
        Inbox::new(line_rx),
        concurrency,
        "fast_bulk",
        move |line: String| {
            let bulk = bulk.clone();
            let reply_tx = reply_tx.clone();
            let ip = ip.clone();
            async move {
                if let Some(reply) = bulk.process_line(&line, Some(ip)).await {
                    let _ = reply_tx.send(reply).await;
                }
            }
        },
    ));

    let mut received = 0usize;
    'receive: while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                for line in text.as_str().lines() {
                    received += 1;
                    if line_tx.send(line.to_string()).await.is_err() {
                        break 'receive;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Fast bulk receive error");
                break;
            }
        }
    }

    // Let in-flight lines finish so their replies are still sent.
    drop(line_tx);
    if let Err(e) = work_task.await {
        tracing::error!(error = %e, "Fast bulk worker failed");
    }
    if let Err(e) = send_task.await {
        tracing::error!(error = %e, "Fast bulk sender failed");
    }

    tracing::info!(lines = received, "Fast bulk disconnected");
}

//! Fan-out of server messages to the connections of a document
//!
//! Delivery is best effort: closed connections are skipped and nothing is
//! retried. Each message is serialized once per fan-out and the recipients
//! share the resulting buffer.

use crate::protocol::ServerMessage;
use crate::state::Registry;
use crate::ws::Connection;
use axum::extract::ws::Utf8Bytes;

/// Deliver to a single connection. Returns false if it was dropped.
pub fn send_to(connection: &Connection, msg: &ServerMessage) -> bool {
    match msg.to_json() {
        Some(json) => deliver(connection, json.into()),
        None => false,
    }
}

/// Deliver to every connection bound to the document. Returns the number of
/// connections the message was queued for.
pub fn send_to_all(registry: &Registry, document_id: &str, msg: &ServerMessage) -> usize {
    fan_out(registry, document_id, None, msg)
}

/// Deliver to every connection bound to the document except `excluding`
pub fn send_to_others(
    registry: &Registry,
    document_id: &str,
    excluding: &Connection,
    msg: &ServerMessage,
) -> usize {
    fan_out(registry, document_id, Some(excluding), msg)
}

fn fan_out(
    registry: &Registry,
    document_id: &str,
    excluding: Option<&Connection>,
    msg: &ServerMessage,
) -> usize {
    let Some(json) = msg.to_json() else {
        return 0;
    };
    let frame = Utf8Bytes::from(json);

    registry
        .connections_of(document_id)
        .iter()
        .filter(|conn| excluding.map_or(true, |ex| ex != *conn))
        .filter(|conn| deliver(conn, frame.clone()))
        .count()
}

fn deliver(connection: &Connection, frame: Utf8Bytes) -> bool {
    if !connection.is_open() {
        tracing::debug!("Skipping closed connection {}", connection.id());
        return false;
    }
    connection.send(frame)
}

//! Connection event handlers
//!
//! Transport-independent entry points for connect, message and disconnect.
//! Replies go through the connection's outbound queue so they stay ordered
//! with broadcasts triggered by other connections.
//!
//! Validation order for every message: decode, check the payload's document
//! id against the bound one, dispatch by kind, then check the join state.

use crate::broadcast;
use crate::error::{CollabError, CollabResult};
use crate::protocol::{CommentPayload, EditPayload, Inbound, JoinPayload, ServerMessage};
use crate::state::{AppState, Unbound};
use crate::types::{Comment, DocumentId};

use super::Connection;

/// Path prefix that WebSocket editor connections are served under
pub const EDITOR_PATH_PREFIX: &str = "/ws/editor/";

/// Extract the document id from the final segment of the target path
pub fn document_id_from_path(path: &str) -> CollabResult<DocumentId> {
    if !path.contains(EDITOR_PATH_PREFIX) {
        return Err(CollabError::MissingDocumentId(path.to_string()));
    }

    match path.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id.to_string()),
        _ => {
            tracing::warn!("Document ID is missing from URI path: {}", path);
            Err(CollabError::MissingDocumentId(path.to_string()))
        }
    }
}

/// Bind a new connection to the document named by its path. On failure the
/// connection is closed and no session is created.
pub fn on_connect(state: &AppState, conn: &Connection, path: &str) -> CollabResult<DocumentId> {
    match document_id_from_path(path) {
        Ok(document_id) => {
            state.registry.bind(conn, &document_id);
            tracing::info!(
                "Session {} connected for document {}. Awaiting 'join' message.",
                conn.id(),
                document_id
            );
            Ok(document_id)
        }
        Err(e) => {
            tracing::warn!("Connection attempt with invalid URI path: {}", path);
            close_for(conn, &e);
            Err(e)
        }
    }
}

/// Handle one raw text frame. Errors are reported to the sender only.
pub async fn on_message(state: &AppState, conn: &Connection, raw: &str) {
    let result = match Inbound::decode(raw) {
        Ok(msg) => handle_message(state, conn, msg).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        match &e {
            CollabError::StoreUnavailable(source) => {
                tracing::error!("Store failure for session {}: {}", conn.id(), source)
            }
            _ => tracing::warn!("Rejected message from session {}: {}", conn.id(), e),
        }
        broadcast::send_to(conn, &ServerMessage::error(&e));
        close_for(conn, &e);
    }
}

/// Dispatch a decoded message for a connection
pub async fn handle_message(state: &AppState, conn: &Connection, msg: Inbound) -> CollabResult<()> {
    let document_id = state
        .registry
        .document_of(conn.id())
        .ok_or_else(|| CollabError::UnknownConnection(conn.id().clone()))?;

    if let Some(requested) = msg.document_id() {
        if requested != document_id {
            return Err(CollabError::DocumentMismatch {
                bound: document_id,
                requested: requested.to_string(),
            });
        }
    }

    match msg {
        Inbound::Join(payload) => handle_join(state, conn, &document_id, payload).await,
        Inbound::Edit(payload) => handle_edit(state, conn, &document_id, payload).await,
        Inbound::Comment(payload) => handle_comment(state, conn, &document_id, payload),
        Inbound::Unknown(kind) => Err(CollabError::MalformedMessage(format!(
            "Unknown message type: {}",
            kind
        ))),
    }
}

async fn handle_join(
    state: &AppState,
    conn: &Connection,
    document_id: &str,
    payload: JoinPayload,
) -> CollabResult<()> {
    if state.registry.name_of(conn.id()).is_some() {
        return Err(CollabError::AlreadyJoined(document_id.to_string()));
    }
    let username = payload.username();
    if username.trim().is_empty() {
        return Err(CollabError::InvalidName);
    }

    // Load before touching the registry so a store failure leaves no trace
    let doc = state.documents.fetch_or_create(document_id).await?;
    state.registry.set_name(conn.id(), username)?;
    tracing::info!(
        "User '{}' (session {}) joined document '{}'",
        username,
        conn.id(),
        document_id
    );

    let initial = ServerMessage::InitialData {
        content: doc.content,
        collaborators: state.registry.collaborators(document_id),
        comments: state.comments.snapshot(document_id),
    };
    broadcast::send_to(conn, &initial);
    broadcast_collaborators(state, document_id);
    Ok(())
}

async fn handle_edit(
    state: &AppState,
    conn: &Connection,
    document_id: &str,
    payload: EditPayload,
) -> CollabResult<()> {
    let editor = state
        .registry
        .name_of(conn.id())
        .ok_or(CollabError::NotJoined("edit"))?;

    state.documents.replace(document_id, &payload.content).await?;

    let update = ServerMessage::ContentUpdate {
        content: payload.content,
        editor: editor.clone(),
    };
    let delivered = broadcast::send_to_others(&state.registry, document_id, conn, &update);
    tracing::debug!(
        "Document {} updated by '{}'. Broadcast to {} others.",
        document_id,
        editor,
        delivered
    );
    Ok(())
}

fn handle_comment(
    state: &AppState,
    conn: &Connection,
    document_id: &str,
    payload: CommentPayload,
) -> CollabResult<()> {
    let author = state
        .registry
        .name_of(conn.id())
        .ok_or(CollabError::NotJoined("comment"))?;

    if payload.comment.text.trim().is_empty() {
        tracing::debug!("Ignoring empty comment from {} on {}", author, document_id);
        return Ok(());
    }

    let comment = Comment::now(author, payload.comment.text);
    tracing::info!(
        "User '{}' added comment to document '{}'",
        comment.author,
        document_id
    );
    state.comments.append(document_id, comment.clone());
    broadcast::send_to_all(
        &state.registry,
        document_id,
        &ServerMessage::NewComment { comment },
    );
    Ok(())
}

/// Unbind a connection that has gone away, whatever the cause, and tell the
/// remaining collaborators.
pub fn on_disconnect(state: &AppState, conn: &Connection, reason: &str) -> Option<Unbound> {
    let unbound = state.registry.unbind(conn.id());

    match &unbound {
        Some(u) => {
            tracing::info!(
                "Session {} (User: {}) disconnected. Reason: {}. Doc ID: {}",
                conn.id(),
                u.name.as_deref().unwrap_or("N/A"),
                reason,
                u.document_id
            );
            if !u.session_closed {
                broadcast_collaborators(state, &u.document_id);
            }
        }
        None => tracing::debug!(
            "Session {} disconnected without a bound document. Reason: {}",
            conn.id(),
            reason
        ),
    }

    unbound
}

fn broadcast_collaborators(state: &AppState, document_id: &str) {
    let collaborators = state.registry.collaborators(document_id);
    tracing::debug!(
        "Broadcasting collaborators update for doc {}: {:?}",
        document_id,
        collaborators
    );
    broadcast::send_to_all(
        &state.registry,
        document_id,
        &ServerMessage::CollaboratorsUpdate { collaborators },
    );
}

fn close_for(conn: &Connection, err: &CollabError) {
    if let Some((code, reason)) = err.close_code() {
        conn.close(code, reason);
    }
}

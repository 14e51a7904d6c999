use crate::error::{CollabError, CollabResult};
use crate::types::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub document_id: Option<DocumentId>,
    /// Missing or null usernames are rejected the same way as empty ones
    #[serde(default)]
    pub username: Option<String>,
}

impl JoinPayload {
    /// Requested display name, empty when the client sent none
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditPayload {
    pub document_id: Option<DocumentId>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub document_id: Option<DocumentId>,
    pub comment: CommentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommentBody {
    /// Older clients send the text under `comment`
    #[serde(default, alias = "comment")]
    pub text: String,
}

/// Inbound client message, decoded once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Join(JoinPayload),
    Edit(EditPayload),
    Comment(CommentPayload),
    Unknown(String),
}

/// `{type, payload}` envelope shared by every inbound message
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

impl Inbound {
    /// Decode a raw text frame. Unknown kinds decode successfully so the
    /// handler can report them; structural problems are `MalformedMessage`.
    pub fn decode(raw: &str) -> CollabResult<Self> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| CollabError::MalformedMessage(format!("Invalid JSON format: {}", e)))?;

        match envelope.kind.as_str() {
            "join" => payload(&envelope).map(Inbound::Join),
            "edit" => payload(&envelope).map(Inbound::Edit),
            "comment" => payload(&envelope).map(Inbound::Comment),
            _ => Ok(Inbound::Unknown(envelope.kind)),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Inbound::Join(_) => "join",
            Inbound::Edit(_) => "edit",
            Inbound::Comment(_) => "comment",
            Inbound::Unknown(kind) => kind.as_str(),
        }
    }

    /// Document id named in the payload, if the client sent one
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Inbound::Join(p) => p.document_id.as_deref(),
            Inbound::Edit(p) => p.document_id.as_deref(),
            Inbound::Comment(p) => p.document_id.as_deref(),
            Inbound::Unknown(_) => None,
        }
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> CollabResult<T> {
    T::deserialize(&envelope.payload).map_err(|e| {
        CollabError::MalformedMessage(format!("Invalid {} payload: {}", envelope.kind, e))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once to a connection after it joins
    InitialData {
        content: String,
        collaborators: Vec<String>,
        comments: Vec<Comment>,
    },
    /// Sent to everyone except the editor
    ContentUpdate { content: String, editor: String },
    CollaboratorsUpdate { collaborators: Vec<String> },
    NewComment { comment: Comment },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(err: &CollabError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize server message: {}", e);
                None
            }
        }
    }
}

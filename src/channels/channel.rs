//! Channel trait and the transport-neutral event/response types.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Free text, including slash commands and menu-button labels.
    Text(String),
    /// A photo upload. Only the transport's file id is kept.
    Photo { file_id: String },
    /// A button press carrying its token.
    Callback {
        query_id: String,
        data: String,
        message_id: Option<i64>,
    },
}

/// An event received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    /// Name of the channel that produced the event.
    pub channel: String,
    pub user_id: i64,
    /// Display name, if the transport provides one.
    pub user_name: Option<String>,
    /// Where replies go.
    pub chat_id: String,
    pub kind: EventKind,
    pub received_at: DateTime<Utc>,
}

impl IncomingEvent {
    pub fn new(channel: impl Into<String>, user_id: i64, chat_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            channel: channel.into(),
            user_id,
            user_name: None,
            chat_id: chat_id.into(),
            kind,
            received_at: Utc::now(),
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

/// A labeled button that sends `token` back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Keyboard attached to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<Button>>),
    /// Persistent menu whose labels arrive back as plain text.
    Menu(Vec<Vec<String>>),
}

impl Keyboard {
    /// All inline tokens, row by row.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Keyboard::Inline(rows) => rows
                .iter()
                .flat_map(|row| row.iter().map(|b| b.token.as_str()))
                .collect(),
            Keyboard::Menu(_) => Vec::new(),
        }
    }

    /// All visible labels, row by row.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Keyboard::Inline(rows) => rows
                .iter()
                .flat_map(|row| row.iter().map(|b| b.label.as_str()))
                .collect(),
            Keyboard::Menu(rows) => rows.iter().flatten().map(String::as_str).collect(),
        }
    }
}

/// How a file is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Document,
    Photo,
}

/// A file sent to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// A response to send back through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    pub keyboard: Option<Keyboard>,
    pub attachment: Option<Attachment>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            keyboard: None,
            attachment: None,
        }
    }

    pub fn document(attachment: Attachment) -> Self {
        Self {
            content: String::new(),
            keyboard: None,
            attachment: Some(attachment),
        }
    }

    pub fn photo(attachment: Attachment) -> Self {
        Self::document(Attachment {
            kind: AttachmentKind::Photo,
            ..attachment
        })
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Stream of incoming events.
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// A transport the bot talks through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening. Events arrive on the returned stream.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a response to the chat the event came from.
    async fn respond(
        &self,
        event: &IncomingEvent,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn acknowledge(&self, _event: &IncomingEvent) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

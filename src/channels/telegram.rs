//! Telegram channel — long-polls the Bot API for messages and button presses.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{
    Attachment, AttachmentKind, Channel, EventKind, EventStream, IncomingEvent, Keyboard,
    OutgoingResponse,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Send a text message with an optional keyboard.
    /// Long messages are split; the keyboard rides on the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(kb) = keyboard {
                    body["reply_markup"] = reply_markup(kb);
                }
            }
            self.post_text("sendMessage", body).await?;
        }
        Ok(())
    }

    /// Replace the text and inline keyboard of a message the bot sent earlier.
    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(kb @ Keyboard::Inline(_)) = keyboard {
            body["reply_markup"] = reply_markup(kb);
        }
        self.post_text("editMessageText", body).await
    }

    /// POST a text-bearing request, Markdown first with plain-text fallback.
    async fn post_text(&self, method: &str, body: Value) -> Result<(), ChannelError> {
        let mut markdown_body = body.clone();
        markdown_body["parse_mode"] = Value::String("Markdown".into());

        let markdown_resp = self
            .client
            .post(self.api_url(method))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        let markdown_err = markdown_resp.text().await.unwrap_or_default();
        tracing::warn!(
            status = ?markdown_status,
            method,
            error = %markdown_err,
            "Telegram rejected Markdown; retrying as plain text"
        );

        let plain_resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "{method} failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }

    /// Upload an in-memory file as a document or a photo.
    pub async fn send_file(
        &self,
        chat_id: &str,
        attachment: Attachment,
    ) -> Result<(), ChannelError> {
        let (method, field) = match attachment.kind {
            AttachmentKind::Document => ("sendDocument", "document"),
            AttachmentKind::Photo => ("sendPhoto", "photo"),
        };
        let file_name = attachment.file_name;
        let part = Part::bytes(attachment.bytes).file_name(file_name.clone());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field, part);

        if let Some(cap) = attachment.caption {
            form = form.text("caption", cap).text("parse_mode", "Markdown");
        }

        let send_failed = |reason: String| ChannelError::SendFailed {
            name: "telegram".into(),
            reason,
        };

        let resp = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!("{method} failed: {err}")));
        }

        tracing::info!(method, "Telegram file sent to {chat_id}: {file_name}");
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update) else {
                        tracing::debug!("Telegram: skipping unsupported update");
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        event: &IncomingEvent,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = event.chat_id.as_str();
        if chat_id.is_empty() {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "Event has no chat_id".into(),
            });
        }

        if let Some(attachment) = response.attachment {
            self.send_file(chat_id, attachment).await?;
            if response.content.is_empty() {
                return Ok(());
            }
        }

        // Button presses edit the message that carried the buttons.
        if let EventKind::Callback {
            message_id: Some(message_id),
            ..
        } = &event.kind
        {
            let editable = !matches!(response.keyboard, Some(Keyboard::Menu(_)))
                && response.content.len() <= TELEGRAM_MAX_MESSAGE_LENGTH;
            if editable {
                match self
                    .edit_message(chat_id, *message_id, &response.content, response.keyboard.as_ref())
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(e) => tracing::debug!("Telegram edit failed, sending new message: {e}"),
                }
            }
        }

        self.send_message(chat_id, &response.content, response.keyboard.as_ref())
            .await
    }

    async fn acknowledge(&self, event: &IncomingEvent) -> Result<(), ChannelError> {
        let EventKind::Callback { query_id, .. } = &event.kind else {
            return Ok(());
        };
        self.client
            .post(self.api_url("answerCallbackQuery"))
            .json(&serde_json::json!({ "callback_query_id": query_id }))
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

/// Render a keyboard as a Bot API `reply_markup` object.
fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.token }))
                        .collect()
                })
                .collect();
            serde_json::json!({ "inline_keyboard": rows })
        }
        Keyboard::Menu(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|l| serde_json::json!({ "text": l })).collect())
                .collect();
            serde_json::json!({ "keyboard": rows, "resize_keyboard": true })
        }
    }
}

/// Turn one `getUpdates` entry into an event. Returns `None` for update
/// types the bot does not handle.
fn parse_update(update: &Value) -> Option<IncomingEvent> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(Value::as_i64)?;
        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .unwrap_or(user_id);
        let kind = EventKind::Callback {
            query_id: query.get("id").and_then(Value::as_str)?.to_string(),
            data: query
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            message_id: message
                .and_then(|m| m.get("message_id"))
                .and_then(Value::as_i64),
        };
        return Some(with_name(
            IncomingEvent::new("telegram", user_id, chat_id.to_string(), kind),
            from,
        ));
    }

    let message = update.get("message")?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;

    let kind = if let Some(text) = message.get("text").and_then(Value::as_str) {
        EventKind::Text(text.to_string())
    } else if let Some(sizes) = message.get("photo").and_then(Value::as_array) {
        // Sizes are ordered smallest first; keep the largest.
        let file_id = sizes
            .last()
            .and_then(|p| p.get("file_id"))
            .and_then(Value::as_str)?;
        EventKind::Photo {
            file_id: file_id.to_string(),
        }
    } else {
        return None;
    };

    Some(with_name(
        IncomingEvent::new("telegram", user_id, chat_id.to_string(), kind),
        from,
    ))
}

fn with_name(event: IncomingEvent, from: &Value) -> IncomingEvent {
    let name = from
        .get("first_name")
        .or_else(|| from.get("username"))
        .and_then(Value::as_str);
    match name {
        Some(name) => event.with_user_name(name),
        None => event,
    }
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

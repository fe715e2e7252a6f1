//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Plain lines are sent as text. A line starting with `:` presses the button
//! with that token (`:boat:Orca`, `:back`), and `!photo <id>` simulates a
//! photo upload.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    AttachmentKind, Channel, EventKind, EventStream, IncomingEvent, Keyboard, OutgoingResponse,
};
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    user_id: i64,
}

impl CliChannel {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Interpret one input line.
fn parse_line(line: &str) -> Option<EventKind> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(token) = line.strip_prefix(':') {
        return Some(EventKind::Callback {
            query_id: String::new(),
            data: token.to_string(),
            message_id: None,
        });
    }
    if let Some(file_id) = line.strip_prefix("!photo") {
        let file_id = file_id.trim();
        return Some(EventKind::Photo {
            file_id: if file_id.is_empty() {
                "cli-photo".to_string()
            } else {
                file_id.to_string()
            },
        });
    }
    Some(EventKind::Text(line.to_string()))
}

/// Render a keyboard as text lines.
fn render_keyboard(keyboard: &Keyboard) -> String {
    match keyboard {
        Keyboard::Inline(rows) => rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| format!("[{}] :{}", b.label, b.token))
                    .collect::<Vec<_>>()
                    .join("   ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Keyboard::Menu(rows) => rows
            .iter()
            .map(|row| row.iter().map(|l| format!("[{l}]")).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(kind) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        let event = IncomingEvent::new("cli", user_id, user_id.to_string(), kind)
                            .with_user_name("local-user");
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _event: &IncomingEvent,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if let Some(attachment) = &response.attachment {
            let path = std::env::temp_dir().join(&attachment.file_name);
            tokio::fs::write(&path, &attachment.bytes)
                .await
                .map_err(|e| ChannelError::SendFailed {
                    name: "cli".into(),
                    reason: e.to_string(),
                })?;
            let icon = match attachment.kind {
                AttachmentKind::Document => "📎",
                AttachmentKind::Photo => "🖼",
            };
            println!("\n{icon} {} written to {}", attachment.file_name, path.display());
            if let Some(caption) = &attachment.caption {
                println!("{caption}");
            }
        }
        if !response.content.is_empty() {
            println!("\n{}", response.content);
        }
        if let Some(kb) = &response.keyboard {
            println!("{}", render_keyboard(kb));
        }
        println!();
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

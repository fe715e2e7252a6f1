//! Bot router — access control, global commands, main menu screens, and
//! delegation of report-flow events to the engine.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::access::AllowList;
use crate::analytics::{self, Analytics};
use crate::channels::{Channel, EventKind, IncomingEvent, OutgoingResponse};
use crate::error::Result;
use crate::report::keyboards::{
    MENU_ANALYTICS, MENU_HELP, MENU_HISTORY, MENU_NEW_REPORT, main_menu_keyboard,
};
use crate::report::{ReportEngine, StepInput};

pub const ACCESS_DENIED: &str = "⛔ You don't have access to this bot.\nContact the administrator.";

pub const HELP_TEXT: &str = "ℹ️ *Fuel Report Bot*

*Commands:*
/start - Start the bot
/help - Show help
/report - New report
/cancel - Cancel current action

*How to fill a report:*
1. Press \"📝 New Report\"
2. Select captain, boat, program and pier
3. Enter dates
4. Enter fuel data
5. Optionally add photos
6. Confirm submission

*Navigation:*
• ⬅️ Back - return to previous step
• ❌ Cancel - cancel filling
• ⏭ Skip - skip optional field";

const MENU_HINT: &str = "Use the menu below to choose an action.";

/// A global command or main-menu button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Report,
    Cancel,
    History,
    Analytics,
}

impl Command {
    /// Recognize a command, ignoring arguments and a `@botname` suffix.
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text {
            MENU_NEW_REPORT => return Some(Self::Report),
            MENU_HELP => return Some(Self::Help),
            MENU_HISTORY => return Some(Self::History),
            MENU_ANALYTICS => return Some(Self::Analytics),
            _ => {}
        }
        let word = text.split_whitespace().next()?;
        let command = word.split('@').next().unwrap_or(word);
        match command {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/report" => Some(Self::Report),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

fn greeting(name: Option<&str>) -> String {
    let name = name.unwrap_or("captain");
    format!(
        "👋 Hello, {name}!\n\n🚤 *Fuel Report Bot*\n\nThis bot helps you fill out fuel reports.\n\nChoose an action:"
    )
}

pub struct Bot {
    engine: ReportEngine,
    analytics: Analytics,
    access: AllowList,
}

impl Bot {
    pub fn new(engine: ReportEngine, analytics: Analytics, access: AllowList) -> Self {
        Self {
            engine,
            analytics,
            access,
        }
    }

    pub fn engine(&self) -> &ReportEngine {
        &self.engine
    }

    /// Produce the responses for one inbound event, in send order.
    pub async fn handle(&self, event: &IncomingEvent) -> Vec<OutgoingResponse> {
        let user_id = event.user_id;
        if !self.access.is_allowed(user_id) {
            tracing::warn!(user_id, channel = %event.channel, "Access denied");
            return vec![OutgoingResponse::text(ACCESS_DENIED)];
        }

        match &event.kind {
            EventKind::Text(text) => match Command::parse(text) {
                Some(command) => self.command(event, command).await,
                None => self.flow(user_id, StepInput::from_text(text)).await,
            },
            EventKind::Photo { file_id } => {
                self.flow(
                    user_id,
                    StepInput::Photo {
                        file_id: file_id.clone(),
                    },
                )
                .await
            }
            EventKind::Callback { data, .. } if analytics::is_analytics_token(data) => {
                self.analytics.handle(data, Local::now().date_naive()).await
            }
            EventKind::Callback { data, .. } => {
                match self.engine.handle(user_id, &StepInput::from_token(data)).await {
                    Some(outcome) => vec![outcome.into_response()],
                    None => {
                        tracing::debug!(user_id, data = %data, "Ignoring stale button");
                        Vec::new()
                    }
                }
            }
        }
    }

    async fn command(&self, event: &IncomingEvent, command: Command) -> Vec<OutgoingResponse> {
        let user_id = event.user_id;
        tracing::debug!(user_id, ?command, "Command");
        let response = match command {
            Command::Start => {
                self.engine.sessions().destroy(user_id).await;
                let name = event
                    .user_name
                    .as_deref()
                    .or_else(|| self.access.user(user_id).map(|u| u.name.as_str()))
                    .filter(|n| !n.is_empty());
                OutgoingResponse::text(greeting(name))
                    .with_keyboard(main_menu_keyboard())
            }
            Command::Help => OutgoingResponse::text(HELP_TEXT),
            Command::Report => self.engine.start(user_id).await,
            Command::Cancel => self.engine.cancel(user_id).await,
            Command::History => self.analytics.history(user_id).await,
            Command::Analytics => self.analytics.menu(),
        };
        vec![response]
    }

    async fn flow(&self, user_id: i64, input: StepInput) -> Vec<OutgoingResponse> {
        match self.engine.handle(user_id, &input).await {
            Some(outcome) => vec![outcome.into_response()],
            None => vec![OutgoingResponse::text(MENU_HINT).with_keyboard(main_menu_keyboard())],
        }
    }

    /// Acknowledge one event, then send its responses in order.
    async fn serve(&self, channel: &dyn Channel, event: &IncomingEvent) {
        if let Err(e) = channel.acknowledge(event).await {
            tracing::debug!("Failed to acknowledge event: {e}");
        }
        for response in self.handle(event).await {
            if let Err(e) = channel.respond(event, response).await {
                tracing::error!(user_id = event.user_id, "Failed to send response: {e}");
            }
        }
    }

    /// Serve events from `channel` until it ends or Ctrl+C.
    ///
    /// Each event runs on its own task. A user's task waits for that
    /// user's previous task, so one user's events are applied in delivery
    /// order while different users proceed in parallel.
    pub async fn run(self: Arc<Self>, channel: Arc<dyn Channel>) -> Result<()> {
        let mut events = channel.start().await?;
        tracing::info!(channel = channel.name(), "Bot ready and listening");

        let mut in_flight: HashMap<i64, JoinHandle<()>> = HashMap::new();
        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => event,
                    None => {
                        tracing::info!("Channel stream ended, shutting down...");
                        break;
                    }
                },
            };

            in_flight.retain(|_, task| !task.is_finished());
            let user_id = event.user_id;
            let previous = in_flight.remove(&user_id);
            let bot = Arc::clone(&self);
            let channel = Arc::clone(&channel);
            let task = tokio::spawn(async move {
                if let Some(previous) = previous {
                    if let Err(e) = previous.await {
                        tracing::error!(user_id, "Previous event task failed: {e}");
                    }
                }
                bot.serve(channel.as_ref(), &event).await;
            });
            in_flight.insert(user_id, task);
        }

        for (user_id, task) in in_flight {
            if let Err(e) = task.await {
                tracing::error!(user_id, "Event task failed: {e}");
            }
        }
        channel.shutdown().await?;
        Ok(())
    }
}

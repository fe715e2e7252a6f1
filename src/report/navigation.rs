//! Back and cancel.

use super::dispatcher::{Dispatcher, Outcome, SessionEnd};
use super::keyboards;
use super::prompts;
use super::session::Session;
use crate::channels::OutgoingResponse;

/// Terminal outcome for a cancelled session.
pub fn cancelled() -> Outcome {
    Outcome::Terminal {
        end: SessionEnd::Cancelled,
        response: OutgoingResponse::text(prompts::CANCELLED)
            .with_keyboard(keyboards::main_menu_keyboard()),
    }
}

impl Dispatcher {
    /// Return to the previous step, keeping the value already stored for it.
    /// At the first step, back means cancel.
    pub(crate) async fn back(&self, session: &mut Session) -> Outcome {
        let from = session.current_step();
        let Some(previous) = session.history.pop() else {
            tracing::info!(user_id = session.user_id, "Back at first step; cancelling report");
            return cancelled();
        };

        tracing::info!(user_id = session.user_id, %from, to = %previous, "Report step back");

        let preface = session
            .draft
            .current_value(previous)
            .map(|v| prompts::current_value_line(&v));
        Outcome::Continue {
            step: previous,
            response: self.render(previous, &session.draft, preface).await,
        }
    }
}

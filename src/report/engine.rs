//! Report engine — the entry point the bot calls into. Owns the session
//! registry and runs each input under the user's lock.

use std::sync::Arc;

use super::dispatcher::{Dispatcher, Outcome};
use super::input::StepInput;
use super::navigation;
use super::prompts;
use super::session::{Session, SessionRegistry};
use super::step::Step;
use crate::channels::OutgoingResponse;
use crate::dictionary::OptionSource;
use crate::store::ReportStore;

pub struct ReportEngine {
    sessions: Arc<SessionRegistry>,
    dispatcher: Dispatcher,
}

impl ReportEngine {
    pub fn new(
        options: Arc<dyn OptionSource>,
        store: Arc<dyn ReportStore>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            sessions,
            dispatcher: Dispatcher::new(options, store),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Start a fresh report, replacing any session the user already has.
    pub async fn start(&self, user_id: i64) -> OutgoingResponse {
        let mut slot = self.sessions.lock(user_id).await;
        if slot.is_some() {
            tracing::info!(user_id, "Discarding unfinished report for a new one");
        }
        let session = Session::new(user_id);
        let response = self
            .dispatcher
            .render(
                Step::FIRST,
                &session.draft,
                Some(prompts::NEW_REPORT_HEADER.to_string()),
            )
            .await;
        *slot = Some(session);
        tracing::info!(user_id, "Report session started");
        response
    }

    /// Feed an input to the user's session. Returns `None` when the user has
    /// no session and the input means nothing outside one.
    pub async fn handle(&self, user_id: i64, input: &StepInput) -> Option<Outcome> {
        let mut slot = self.sessions.lock(user_id).await;
        let outcome = match (*slot).as_mut() {
            Some(session) => {
                let outcome = self.dispatcher.handle(session, input).await;
                if let Outcome::Terminal { end, .. } = &outcome {
                    tracing::info!(user_id, ?end, "Report session ended");
                    *slot = None;
                }
                Some(outcome)
            }
            None => match input {
                StepInput::Cancel => Some(navigation::cancelled()),
                _ => {
                    tracing::debug!(user_id, ?input, "No active report session");
                    None
                }
            },
        };

        let ended = slot.is_none();
        drop(slot);
        if ended {
            self.sessions.release(user_id).await;
        }
        outcome
    }

    /// Drop the user's session, if any, and return the cancel notice.
    pub async fn cancel(&self, user_id: i64) -> OutgoingResponse {
        self.sessions.destroy(user_id).await;
        navigation::cancelled().into_response()
    }

    pub async fn is_active(&self, user_id: i64) -> bool {
        self.sessions.is_active(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::dictionary::Dictionaries;
    use crate::report::SessionEnd;
    use crate::store::LibSqlBackend;

    async fn engine() -> (ReportEngine, Arc<LibSqlBackend>) {
        let dictionaries = Dictionaries {
            captains: vec!["Alice".into(), "Bob".into()],
            boats: vec!["Orca".into()],
            programs: vec!["Snorkel".into(), "N/A".into(), "Island Tour".into()],
            piers: vec!["Dock1".into()],
        };
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let engine = ReportEngine::new(
            Arc::new(dictionaries),
            Arc::clone(&store) as Arc<dyn ReportStore>,
            SessionRegistry::new(),
        );
        (engine, store)
    }

    fn pick(token: &str) -> StepInput {
        StepInput::from_token(token)
    }

    fn text(s: &str) -> StepInput {
        StepInput::Text(s.into())
    }

    fn step_of(outcome: &Outcome) -> Step {
        match outcome {
            Outcome::Continue { step, .. } => *step,
            Outcome::Terminal { .. } => panic!("session ended unexpectedly"),
        }
    }

    #[tokio::test]
    async fn start_renders_first_step() {
        let (engine, _) = engine().await;
        let response = engine.start(1).await;
        assert!(response.content.starts_with("📝 *New Fuel Report*"));
        assert!(response.content.contains("Select captain"));
        let tokens = response.keyboard.unwrap().tokens().join(",");
        assert!(tokens.contains("captain:Alice"));
        assert!(engine.is_active(1).await);
    }

    #[tokio::test]
    async fn input_without_session_is_ignored() {
        let (engine, _) = engine().await;
        assert!(engine.handle(1, &text("hello")).await.is_none());
        assert!(engine.handle(1, &pick("boat:Orca")).await.is_none());
    }

    #[tokio::test]
    async fn finished_and_stray_users_leave_no_slots() {
        let (engine, _) = engine().await;
        engine.handle(1, &text("hello")).await;
        engine.handle(2, &StepInput::Cancel).await;
        engine.start(3).await;
        engine.handle(3, &StepInput::Back).await.unwrap();
        engine.start(4).await;
        engine.cancel(4).await;
        assert_eq!(engine.sessions().tracked_users().await, 0);
    }

    #[tokio::test]
    async fn cancel_without_session_still_confirms() {
        let (engine, _) = engine().await;
        let outcome = engine.handle(1, &StepInput::Cancel).await.unwrap();
        assert!(outcome.is_terminal());
        assert!(outcome.response().content.contains("Filling cancelled"));
    }

    #[tokio::test]
    async fn invalid_speed_keeps_step_and_draft() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        for token in ["captain:Alice", "boat:Orca", "program:Snorkel", "pier:Dock1"] {
            engine.handle(1, &pick(token)).await.unwrap();
        }
        for _ in 0..3 {
            engine.handle(1, &text("10.01.2026")).await.unwrap();
        }
        let before = engine.sessions().get(1).await.unwrap().draft;

        let outcome = engine.handle(1, &text("abc")).await.unwrap();
        assert_eq!(step_of(&outcome), Step::MaxSpeed);
        assert!(outcome.response().content.starts_with("❌ Enter a whole number"));
        let tokens = outcome.response().keyboard.as_ref().unwrap().tokens();
        assert_eq!(tokens, vec!["back", "cancel"]);
        assert_eq!(engine.sessions().get(1).await.unwrap().draft, before);
    }

    #[tokio::test]
    async fn unknown_option_rejected() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        let outcome = engine.handle(1, &pick("captain:Mallory")).await.unwrap();
        assert_eq!(step_of(&outcome), Step::Captain);
        assert!(outcome.response().content.contains("Unknown option: Mallory"));
    }

    #[tokio::test]
    async fn stale_button_rerenders_current_step() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        engine.handle(1, &pick("captain:Alice")).await.unwrap();

        // A captain button pressed again after moving on to the boat step.
        let outcome = engine.handle(1, &pick("captain:Bob")).await.unwrap();
        assert_eq!(step_of(&outcome), Step::Boat);
        assert!(outcome.response().content.starts_with("🚤 *Select boat:*"));
        let session = engine.sessions().get(1).await.unwrap();
        assert_eq!(session.draft.captain.as_deref(), Some("Alice"));
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn back_keeps_value_and_shows_it() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        engine.handle(1, &pick("captain:Alice")).await.unwrap();
        engine.handle(1, &pick("boat:Orca")).await.unwrap();

        let outcome = engine.handle(1, &StepInput::Back).await.unwrap();
        assert_eq!(step_of(&outcome), Step::Boat);
        assert!(outcome.response().content.contains("Current value: *Orca*"));
        let session = engine.sessions().get(1).await.unwrap();
        assert_eq!(session.draft.boat.as_deref(), Some("Orca"));
    }

    #[tokio::test]
    async fn back_at_first_step_cancels() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        let outcome = engine.handle(1, &StepInput::Back).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Terminal {
                end: SessionEnd::Cancelled,
                ..
            }
        ));
        assert!(!engine.is_active(1).await);
    }

    #[tokio::test]
    async fn fuel_used_reports_remaining() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        for token in ["captain:Alice", "boat:Orca", "program:Snorkel", "pier:Dock1"] {
            engine.handle(1, &pick(token)).await.unwrap();
        }
        for input in ["10.01.2026", "10.01.2026", "10.01.2026", "30", "50", "200"] {
            engine.handle(1, &text(input)).await.unwrap();
        }
        let outcome = engine.handle(1, &text("80")).await.unwrap();
        assert_eq!(step_of(&outcome), Step::Mileage);
        assert!(outcome
            .response()
            .content
            .contains("📊 Remaining: *120* L (calculated automatically)"));
        let draft = engine.sessions().get(1).await.unwrap().draft;
        assert_eq!(draft.gasoline_left, dec!(120));
    }

    #[tokio::test]
    async fn restart_replaces_session() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        engine.handle(1, &pick("captain:Alice")).await.unwrap();
        engine.start(1).await;
        let session = engine.sessions().get(1).await.unwrap();
        assert!(session.draft.captain.is_none());
        assert_eq!(session.current_step(), Step::Captain);
    }

    #[tokio::test]
    async fn engine_cancel_clears_session() {
        let (engine, _) = engine().await;
        engine.start(1).await;
        let response = engine.cancel(1).await;
        assert!(response.content.contains("Filling cancelled"));
        assert!(!engine.is_active(1).await);
    }

    #[tokio::test]
    async fn missing_option_list_keeps_navigation() {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let engine = ReportEngine::new(
            Arc::new(Dictionaries::default()),
            store as Arc<dyn ReportStore>,
            SessionRegistry::new(),
        );
        let response = engine.start(1).await;
        assert!(response.content.contains("No captains configured"));
        assert_eq!(response.keyboard.unwrap().tokens(), vec!["back", "cancel"]);
    }
}

//! Review step: submit, discard, or restart editing.

use super::dispatcher::{Dispatcher, Outcome, SessionEnd};
use super::input::StepInput;
use super::keyboards;
use super::model::{ReportDraft, ReportRecord};
use super::navigation;
use super::prompts;
use super::session::Session;
use super::step::Step;
use crate::channels::OutgoingResponse;
use crate::error::ReportError;

/// The review prompt: summary, question, and confirm keyboard.
pub fn review(draft: &ReportDraft, preface: Option<String>) -> OutgoingResponse {
    let mut content = String::new();
    if let Some(preface) = preface {
        content.push_str(&preface);
        content.push_str("\n\n");
    }
    content.push_str(&prompts::summary(draft));
    content.push_str("\n\n");
    content.push_str(prompts::CONFIRM_QUESTION);
    OutgoingResponse::text(content).with_keyboard(keyboards::confirm_keyboard())
}

impl Dispatcher {
    pub(crate) async fn confirm(&self, session: &mut Session, input: &StepInput) -> Outcome {
        let choice = match input {
            StepInput::Selection { prefix, value } if prefix == "confirm" => value.as_str(),
            _ => "",
        };

        match choice {
            "yes" => self.submit(session).await,
            "no" => {
                tracing::info!(user_id = session.user_id, "Report discarded at review");
                navigation::cancelled()
            }
            "edit" => {
                session.history.reset(Step::FIRST);
                tracing::info!(user_id = session.user_id, "Report reopened for editing");
                Outcome::Continue {
                    step: Step::FIRST,
                    response: self
                        .render(Step::FIRST, &session.draft, Some(prompts::EDIT_HEADER.to_string()))
                        .await,
                }
            }
            _ => Outcome::Continue {
                step: Step::Confirm,
                response: review(&session.draft, None),
            },
        }
    }

    async fn submit(&self, session: &mut Session) -> Outcome {
        let user_id = session.user_id;
        let result = match ReportRecord::from_draft(user_id, &session.draft) {
            Ok(record) => self
                .store
                .insert_report(&record)
                .await
                .map_err(ReportError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                tracing::info!(user_id, report_id = report.id, "Report submitted");
                Outcome::Terminal {
                    end: SessionEnd::Submitted {
                        report_id: report.id,
                    },
                    response: OutgoingResponse::text(prompts::SAVED)
                        .with_keyboard(keyboards::main_menu_keyboard()),
                }
            }
            Err(e) => {
                tracing::warn!(user_id, "Report submission failed: {e}");
                let reason = e.to_string();
                Outcome::Terminal {
                    response: OutgoingResponse::text(prompts::save_error(&reason))
                        .with_keyboard(keyboards::main_menu_keyboard()),
                    end: SessionEnd::SubmitFailed { reason },
                }
            }
        }
    }
}

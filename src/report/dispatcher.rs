//! Step dispatcher — validates input for the current step, stores the value,
//! and advances the session.

use std::sync::Arc;

use chrono::Local;

use super::input::{self, StepInput};
use super::keyboards;
use super::model::{FieldValue, ReportDraft};
use super::navigation;
use super::prompts;
use super::session::Session;
use super::step::{FieldDef, InputKind, Step};
use crate::channels::{Keyboard, OutgoingResponse};
use crate::dictionary::{OptionList, OptionSource};
use crate::error::{DictionaryError, InputError};
use crate::store::ReportStore;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Cancelled,
    Submitted { report_id: i64 },
    SubmitFailed { reason: String },
}

/// Result of feeding one input to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The session continues at `step`.
    Continue {
        step: Step,
        response: OutgoingResponse,
    },
    /// The session is over and must be destroyed.
    Terminal {
        end: SessionEnd,
        response: OutgoingResponse,
    },
}

impl Outcome {
    pub fn response(&self) -> &OutgoingResponse {
        match self {
            Self::Continue { response, .. } | Self::Terminal { response, .. } => response,
        }
    }

    pub fn into_response(self) -> OutgoingResponse {
        match self {
            Self::Continue { response, .. } | Self::Terminal { response, .. } => response,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}

/// Why an input was not accepted.
enum Rejection {
    /// Malformed or disallowed value; shown to the user.
    Invalid(InputError),
    /// Input meant for some other step (a stale button); the step is
    /// re-rendered without comment.
    Unroutable,
    /// The option list could not be read.
    Options(DictionaryError),
}

/// Drives sessions through the step catalog.
pub struct Dispatcher {
    pub(crate) options: Arc<dyn OptionSource>,
    pub(crate) store: Arc<dyn ReportStore>,
}

impl Dispatcher {
    pub fn new(options: Arc<dyn OptionSource>, store: Arc<dyn ReportStore>) -> Self {
        Self { options, store }
    }

    /// Feed one input to a session.
    pub async fn handle(&self, session: &mut Session, input: &StepInput) -> Outcome {
        session.touch();

        match input {
            StepInput::Cancel => {
                tracing::info!(user_id = session.user_id, step = %session.current_step(), "Report cancelled");
                return navigation::cancelled();
            }
            StepInput::Back => return self.back(session).await,
            _ => {}
        }

        let step = session.current_step();
        let Some(def) = step.field() else {
            return self.confirm(session, input).await;
        };

        match self.validate(def, input).await {
            Ok(value) => self.advance(session, def, value).await,
            Err(Rejection::Invalid(err)) => {
                tracing::debug!(user_id = session.user_id, %step, %err, "Input rejected");
                Outcome::Continue {
                    step,
                    response: self.render(step, &session.draft, Some(err.to_string())).await,
                }
            }
            Err(Rejection::Unroutable) => {
                tracing::debug!(user_id = session.user_id, %step, ?input, "Input not for this step; re-rendering");
                Outcome::Continue {
                    step,
                    response: self.render(step, &session.draft, None).await,
                }
            }
            Err(Rejection::Options(e)) => {
                tracing::warn!(user_id = session.user_id, %step, "Option list unavailable: {e}");
                Outcome::Continue {
                    step,
                    response: options_unavailable(&e),
                }
            }
        }
    }

    async fn validate(&self, def: &FieldDef, input: &StepInput) -> Result<FieldValue, Rejection> {
        let for_this_step = |prefix: &str| prefix == def.prefix;

        match def.kind {
            InputKind::Choice(list) => match input {
                StepInput::Selection { prefix, value } if for_this_step(prefix) => {
                    let options = self.options.options(list).await.map_err(Rejection::Options)?;
                    if options.iter().any(|o| o == value) {
                        Ok(FieldValue::Text(value.clone()))
                    } else {
                        Err(Rejection::Invalid(InputError::UnknownOption(value.clone())))
                    }
                }
                StepInput::Text(_) | StepInput::Photo { .. } => {
                    Err(Rejection::Invalid(InputError::ChooseOption))
                }
                _ => Err(Rejection::Unroutable),
            },
            InputKind::Date => match input {
                StepInput::Selection { prefix, value } if for_this_step(prefix) => {
                    input::parse_iso_date(value)
                        .map(FieldValue::Date)
                        .ok_or(Rejection::Invalid(InputError::InvalidDate))
                }
                StepInput::Text(text) => input::parse_date(text)
                    .map(FieldValue::Date)
                    .ok_or(Rejection::Invalid(InputError::InvalidDate)),
                StepInput::Photo { .. } => Err(Rejection::Invalid(InputError::InvalidDate)),
                _ => Err(Rejection::Unroutable),
            },
            InputKind::Integer => match input {
                StepInput::Text(text) => input::parse_integer(text)
                    .map(FieldValue::Integer)
                    .ok_or(Rejection::Invalid(InputError::NotAnInteger)),
                StepInput::Photo { .. } => Err(Rejection::Invalid(InputError::NotAnInteger)),
                _ => Err(Rejection::Unroutable),
            },
            InputKind::Decimal => match input {
                StepInput::Text(text) => input::parse_decimal(text)
                    .map(FieldValue::Decimal)
                    .ok_or(Rejection::Invalid(InputError::NotANumber)),
                StepInput::Photo { .. } => Err(Rejection::Invalid(InputError::NotANumber)),
                _ => Err(Rejection::Unroutable),
            },
            InputKind::OptionalDecimal => match input {
                StepInput::Skip { prefix } if for_this_step(prefix) => Ok(FieldValue::Skipped),
                StepInput::Text(text) => input::parse_decimal(text)
                    .map(FieldValue::Decimal)
                    .ok_or(Rejection::Invalid(InputError::NotANumberOrSkip)),
                StepInput::Photo { .. } => Err(Rejection::Invalid(InputError::NotANumberOrSkip)),
                _ => Err(Rejection::Unroutable),
            },
            InputKind::PhotoOrSkip => match input {
                StepInput::Skip { prefix } if for_this_step(prefix) => Ok(FieldValue::Skipped),
                StepInput::Photo { file_id } => Ok(FieldValue::Photo(file_id.clone())),
                StepInput::Text(_) => Err(Rejection::Invalid(InputError::PhotoExpected)),
                _ => Err(Rejection::Unroutable),
            },
        }
    }

    async fn advance(&self, session: &mut Session, def: &FieldDef, value: FieldValue) -> Outcome {
        let next = def.next_step(&value);
        let mut preface = prompts::acknowledgement(def, &value);
        session.draft.apply(def.step, value);
        if def.step == Step::GasolineUsed {
            preface.push('\n');
            preface.push_str(&prompts::remaining_line(session.draft.gasoline_left));
        }
        session.history.push(next);

        tracing::info!(user_id = session.user_id, from = %def.step, to = %next, "Report step advanced");

        Outcome::Continue {
            step: next,
            response: self.render(next, &session.draft, Some(preface)).await,
        }
    }

    /// Prompt and keyboard for a step, with an optional line above it.
    pub(crate) async fn render(
        &self,
        step: Step,
        draft: &ReportDraft,
        preface: Option<String>,
    ) -> OutgoingResponse {
        let Some(def) = step.field() else {
            return super::finalize::review(draft, preface);
        };

        let keyboard = match self.keyboard_for(def).await {
            Ok(keyboard) => keyboard,
            Err(e) => {
                tracing::warn!(%step, "Option list unavailable: {e}");
                return options_unavailable(&e);
            }
        };

        let body = prompts::step_prompt(def);
        let content = match preface {
            Some(preface) => format!("{preface}\n\n{body}"),
            None => body,
        };
        OutgoingResponse::text(content).with_keyboard(keyboard)
    }

    async fn keyboard_for(&self, def: &FieldDef) -> Result<Keyboard, DictionaryError> {
        Ok(match def.kind {
            InputKind::Choice(list) => {
                let options = self.options.options(list).await?;
                let columns = if list == OptionList::Piers { 3 } else { 2 };
                keyboards::selection_keyboard(&options, def.prefix, columns)
            }
            InputKind::Date => keyboards::date_keyboard(def.prefix, Local::now().date_naive()),
            InputKind::Integer | InputKind::Decimal => keyboards::navigation_keyboard(),
            InputKind::OptionalDecimal => keyboards::skip_keyboard(def.prefix),
            InputKind::PhotoOrSkip => keyboards::photo_keyboard(def.prefix),
        })
    }
}

fn options_unavailable(e: &DictionaryError) -> OutgoingResponse {
    OutgoingResponse::text(format!("❌ {e}\n\nPlease contact the administrator."))
        .with_keyboard(keyboards::navigation_keyboard())
}

//! Fuel report conversation — step catalog, per-user sessions, and the
//! dispatcher that drives a draft from the first question to submission.

pub mod dispatcher;
pub mod engine;
pub mod finalize;
pub mod input;
pub mod keyboards;
pub mod model;
pub mod navigation;
pub mod prompts;
pub mod session;
pub mod step;

pub use dispatcher::{Dispatcher, Outcome, SessionEnd};
pub use engine::ReportEngine;
pub use input::StepInput;
pub use model::{FieldValue, FuelReport, ReportDraft, ReportRecord};
pub use session::{History, Session, SessionRegistry, spawn_eviction_task};
pub use step::{FIELDS, FieldDef, InputKind, PRIVATE_TOUR_SENTINEL, Step, Transition};

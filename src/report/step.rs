//! Report steps and the field catalog.
//!
//! Every data-collecting step has one [`FieldDef`]: its prompt, how its
//! input is parsed, the callback prefix its buttons carry, and where the
//! flow goes next. The flow is linear except after the program step, where
//! the private-tour sentinel routes through [`Step::PrivateProgram`].

use serde::{Deserialize, Serialize};

use super::model::FieldValue;
use crate::dictionary::OptionList;

/// Program value marking a private tour.
pub const PRIVATE_TOUR_SENTINEL: &str = "N/A";

/// The states of a report session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Captain,
    Boat,
    Program,
    PrivateProgram,
    Pier,
    DepartureDate,
    ReturnDate,
    RefillDate,
    MaxSpeed,
    GasolineRefuel,
    TotalGasoline,
    GasolineUsed,
    Mileage,
    MileagePhoto,
    BillPhoto,
    Confirm,
}

impl Step {
    /// Where every session starts, and where editing restarts.
    pub const FIRST: Step = Step::Captain;

    pub const ALL: [Step; 16] = [
        Step::Captain,
        Step::Boat,
        Step::Program,
        Step::PrivateProgram,
        Step::Pier,
        Step::DepartureDate,
        Step::ReturnDate,
        Step::RefillDate,
        Step::MaxSpeed,
        Step::GasolineRefuel,
        Step::TotalGasoline,
        Step::GasolineUsed,
        Step::Mileage,
        Step::MileagePhoto,
        Step::BillPhoto,
        Step::Confirm,
    ];

    /// The field collected at this step. `None` for [`Step::Confirm`].
    pub fn field(&self) -> Option<&'static FieldDef> {
        FIELDS.iter().find(|f| f.step == *self)
    }

    /// Whether this is the review step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirm)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Captain => "captain",
            Self::Boat => "boat",
            Self::Program => "program",
            Self::PrivateProgram => "private_program",
            Self::Pier => "pier",
            Self::DepartureDate => "departure_date",
            Self::ReturnDate => "return_date",
            Self::RefillDate => "refill_date",
            Self::MaxSpeed => "max_speed",
            Self::GasolineRefuel => "gasoline_refuel",
            Self::TotalGasoline => "total_gasoline",
            Self::GasolineUsed => "gasoline_used",
            Self::Mileage => "mileage",
            Self::MileagePhoto => "mileage_photo",
            Self::BillPhoto => "bill_photo",
            Self::Confirm => "confirm",
        };
        write!(f, "{s}")
    }
}

/// How a step reads its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Pick from a dictionary list.
    Choice(OptionList),
    /// Type DD.MM.YYYY or press a calendar button.
    Date,
    /// Whole number.
    Integer,
    /// Non-negative decimal quantity.
    Decimal,
    /// Non-negative decimal, or skip.
    OptionalDecimal,
    /// Photo upload, or skip.
    PhotoOrSkip,
}

impl InputKind {
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::OptionalDecimal | Self::PhotoOrSkip)
    }
}

/// Next-step rule attached to a field.
#[derive(Clone, Copy)]
pub enum Transition {
    To(Step),
    Branch(fn(&FieldValue) -> Step),
}

impl Transition {
    pub fn next(&self, value: &FieldValue) -> Step {
        match self {
            Self::To(step) => *step,
            Self::Branch(route) => route(value),
        }
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::To(step) => write!(f, "To({step})"),
            Self::Branch(_) => f.write_str("Branch(..)"),
        }
    }
}

/// Declarative description of one data-collecting step.
#[derive(Debug)]
pub struct FieldDef {
    pub step: Step,
    /// Short name used in acknowledgements ("✅ Boat: *Orca*").
    pub label: &'static str,
    /// Heading of the step prompt.
    pub title: &'static str,
    /// Instruction line under the heading.
    pub hint: Option<&'static str>,
    /// Callback prefix of this step's buttons.
    pub prefix: &'static str,
    pub kind: InputKind,
    pub transition: Transition,
}

impl FieldDef {
    pub fn next_step(&self, value: &FieldValue) -> Step {
        self.transition.next(value)
    }
}

fn after_program(value: &FieldValue) -> Step {
    match value {
        FieldValue::Text(program) if program == PRIVATE_TOUR_SENTINEL => Step::PrivateProgram,
        _ => Step::Pier,
    }
}

const DATE_HINT: &str = "Enter date (DD.MM.YYYY) or select a date:";
const LITERS_HINT: &str = "Enter liters:";
const PHOTO_HINT: &str = "Send photo or press 'No photo':";

/// The field catalog, in flow order.
pub static FIELDS: [FieldDef; 15] = [
    FieldDef {
        step: Step::Captain,
        label: "Captain",
        title: "👨‍✈️ *Select captain:*",
        hint: None,
        prefix: "captain",
        kind: InputKind::Choice(OptionList::Captains),
        transition: Transition::To(Step::Boat),
    },
    FieldDef {
        step: Step::Boat,
        label: "Boat",
        title: "🚤 *Select boat:*",
        hint: None,
        prefix: "boat",
        kind: InputKind::Choice(OptionList::Boats),
        transition: Transition::To(Step::Program),
    },
    FieldDef {
        step: Step::Program,
        label: "Program",
        title: "🏝 *Select program:*",
        hint: None,
        prefix: "program",
        kind: InputKind::Choice(OptionList::Programs),
        transition: Transition::Branch(after_program),
    },
    FieldDef {
        step: Step::PrivateProgram,
        label: "Private tour",
        title: "🏝 *Select private tour route:*",
        hint: None,
        prefix: "private_program",
        kind: InputKind::Choice(OptionList::PrivatePrograms),
        transition: Transition::To(Step::Pier),
    },
    FieldDef {
        step: Step::Pier,
        label: "Pier",
        title: "⚓ *Select pier:*",
        hint: None,
        prefix: "pier",
        kind: InputKind::Choice(OptionList::Piers),
        transition: Transition::To(Step::DepartureDate),
    },
    FieldDef {
        step: Step::DepartureDate,
        label: "Departure",
        title: "📅 *Departure date:*",
        hint: Some(DATE_HINT),
        prefix: "departure",
        kind: InputKind::Date,
        transition: Transition::To(Step::ReturnDate),
    },
    FieldDef {
        step: Step::ReturnDate,
        label: "Return",
        title: "📅 *Return date:*",
        hint: Some(DATE_HINT),
        prefix: "return",
        kind: InputKind::Date,
        transition: Transition::To(Step::RefillDate),
    },
    FieldDef {
        step: Step::RefillDate,
        label: "Refill",
        title: "📅 *Refill date:*",
        hint: Some(DATE_HINT),
        prefix: "refill",
        kind: InputKind::Date,
        transition: Transition::To(Step::MaxSpeed),
    },
    FieldDef {
        step: Step::MaxSpeed,
        label: "Speed",
        title: "⚡ *Max speed:*",
        hint: Some("Enter a number:"),
        prefix: "max_speed",
        kind: InputKind::Integer,
        transition: Transition::To(Step::GasolineRefuel),
    },
    FieldDef {
        step: Step::GasolineRefuel,
        label: "Refueled",
        title: "⛽ *Fuel refilled:*",
        hint: Some(LITERS_HINT),
        prefix: "gasoline_refuel",
        kind: InputKind::Decimal,
        transition: Transition::To(Step::TotalGasoline),
    },
    FieldDef {
        step: Step::TotalGasoline,
        label: "Total",
        title: "⛽ *Total fuel on boat:*",
        hint: Some(LITERS_HINT),
        prefix: "total_gasoline",
        kind: InputKind::Decimal,
        transition: Transition::To(Step::GasolineUsed),
    },
    FieldDef {
        step: Step::GasolineUsed,
        label: "Used",
        title: "⛽ *Fuel used:*",
        hint: Some(LITERS_HINT),
        prefix: "gasoline_used",
        kind: InputKind::Decimal,
        transition: Transition::To(Step::Mileage),
    },
    FieldDef {
        step: Step::Mileage,
        label: "Mileage",
        title: "🛣 *Mileage (optional):*",
        hint: Some("Enter mileage or press 'Skip':"),
        prefix: "mileage",
        kind: InputKind::OptionalDecimal,
        transition: Transition::To(Step::MileagePhoto),
    },
    FieldDef {
        step: Step::MileagePhoto,
        label: "Odometer photo",
        title: "📷 *Odometer photo (optional):*",
        hint: Some(PHOTO_HINT),
        prefix: "mileage_photo",
        kind: InputKind::PhotoOrSkip,
        transition: Transition::To(Step::BillPhoto),
    },
    FieldDef {
        step: Step::BillPhoto,
        label: "Receipt photo",
        title: "📷 *Receipt photo (optional):*",
        hint: Some(PHOTO_HINT),
        prefix: "bill_photo",
        kind: InputKind::PhotoOrSkip,
        transition: Transition::To(Step::Confirm),
    },
];

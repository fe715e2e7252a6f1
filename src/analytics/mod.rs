//! Analytics screens: statistics by boat, captain and program, rankings,
//! recent reports, period summaries and CSV exports.
//!
//! Screens are driven by callback tokens:
//! - `analytics:menu`, `analytics:export`
//! - `analytics:<kind>` asks for a period, `analytics:<kind>:<period>` renders
//! - `export:<kind>` sends a CSV document
//! - `report_img:<kind>` sends a table rendered as a PNG photo
//! - `main_menu` returns to the reply-keyboard menu

pub mod export;
pub mod image;
pub mod period;
pub mod render;

use std::sync::Arc;

use chrono::NaiveDate;

pub use export::ExportKind;
pub use self::image::ImageReport;
pub use period::Period;

use crate::channels::{Button, Keyboard, OutgoingResponse};
use crate::error::ReportError;
use crate::report::keyboards::main_menu_keyboard;
use crate::store::{DateRange, GroupBy, ReportStore};

pub const MENU_TEXT: &str = "📊 *Analytics & Reports*\n\nSelect analytics type:";

/// Reports listed on the history screen.
pub const HISTORY_LIMIT: usize = 5;

/// Whether a callback token belongs to the analytics screens.
pub fn is_analytics_token(token: &str) -> bool {
    token == "main_menu"
        || token.starts_with("analytics:")
        || token.starts_with("export:")
        || token.starts_with("report_img:")
}

/// A statistics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Boats,
    Captains,
    Programs,
    Ranking,
    Reports,
    Summary,
}

impl StatKind {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "boats" => Some(Self::Boats),
            "captains" => Some(Self::Captains),
            "programs" => Some(Self::Programs),
            "ranking" => Some(Self::Ranking),
            "reports" => Some(Self::Reports),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Boats => "boats",
            Self::Captains => "captains",
            Self::Programs => "programs",
            Self::Ranking => "ranking",
            Self::Reports => "reports",
            Self::Summary => "summary",
        }
    }

    /// Screens that need a bounded range fall back to three months for
    /// "all time".
    fn needs_range(&self) -> bool {
        matches!(self, Self::Reports | Self::Summary)
    }
}

/// A decoded analytics token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsAction {
    Menu,
    ExportMenu,
    PickPeriod(StatKind),
    Show(StatKind, Period),
    Export(ExportKind),
    Image(ImageReport),
    MainMenu,
    Unknown,
}

impl AnalyticsAction {
    pub fn parse(token: &str) -> Self {
        if token == "main_menu" {
            return Self::MainMenu;
        }
        if let Some(kind) = token.strip_prefix("export:") {
            return ExportKind::parse(kind).map_or(Self::Unknown, Self::Export);
        }
        if let Some(kind) = token.strip_prefix("report_img:") {
            return ImageReport::parse(kind).map_or(Self::Unknown, Self::Image);
        }
        let Some(rest) = token.strip_prefix("analytics:") else {
            return Self::Unknown;
        };
        let mut parts = rest.splitn(2, ':');
        let action = parts.next().unwrap_or_default();
        let period = parts.next();
        match (action, period) {
            ("menu", _) => Self::Menu,
            ("export", _) => Self::ExportMenu,
            (kind, None) => StatKind::parse(kind).map_or(Self::Unknown, Self::PickPeriod),
            (kind, Some(code)) => match (StatKind::parse(kind), Period::parse(code)) {
                (Some(kind), Some(period)) => Self::Show(kind, period),
                _ => Self::Unknown,
            },
        }
    }
}

// ── Keyboards ───────────────────────────────────────────────────────

pub fn menu_keyboard() -> Keyboard {
    let mut rows = vec![
        vec![
            Button::new("📊 Daily", "report_img:daily"),
            Button::new("📈 Weekly", "report_img:weekly"),
            Button::new("📅 Monthly", "report_img:monthly"),
        ],
        vec![
            Button::new("🚤 Boat Table", "report_img:boats"),
            Button::new("👨‍✈️ Captain Table", "report_img:captains"),
        ],
    ];
    let screens = [
        ("🚤 By Boats", "analytics:boats"),
        ("👨‍✈️ By Captains", "analytics:captains"),
        ("🏝 By Programs", "analytics:programs"),
        ("🏆 Efficiency Ranking", "analytics:ranking"),
        ("📋 Recent Reports", "analytics:reports"),
        ("📈 Period Summary", "analytics:summary"),
        ("📥 Export CSV", "analytics:export"),
        ("🏠 Main Menu", "main_menu"),
    ];
    rows.extend(
        screens
            .into_iter()
            .map(|(label, token)| vec![Button::new(label, token)]),
    );
    Keyboard::Inline(rows)
}

fn daily_image_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("📊 Yesterday's Report", "report_img:daily_yesterday")],
        vec![Button::new("⬅️ Analytics Menu", "analytics:menu")],
    ])
}

pub fn period_keyboard(kind: StatKind) -> Keyboard {
    let button = |p: Period| Button::new(p.label(), format!("analytics:{}:{}", kind.code(), p.code()));
    Keyboard::Inline(vec![
        vec![button(Period::Week), button(Period::Month)],
        vec![button(Period::ThisMonth), button(Period::ThreeMonths)],
        vec![button(Period::All)],
        vec![Button::new("⬅️ Back", "analytics:menu")],
    ])
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("⬅️ Analytics Menu", "analytics:menu")],
        vec![Button::new("🏠 Main Menu", "main_menu")],
    ])
}

pub fn export_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("📋 All Reports", "export:reports")],
        vec![Button::new("🚤 Boat Statistics", "export:boats")],
        vec![Button::new("👨‍✈️ Captain Statistics", "export:captains")],
        vec![Button::new("⬅️ Back", "analytics:menu")],
    ])
}

// ── Screens ─────────────────────────────────────────────────────────

/// Serves the analytics screens from the report store.
pub struct Analytics {
    store: Arc<dyn ReportStore>,
}

impl Analytics {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    pub fn menu(&self) -> OutgoingResponse {
        OutgoingResponse::text(MENU_TEXT).with_keyboard(menu_keyboard())
    }

    /// The user's latest reports.
    pub async fn history(&self, user_id: i64) -> OutgoingResponse {
        match self.store.list_reports_by_user(user_id, HISTORY_LIMIT).await {
            Ok(reports) => OutgoingResponse::text(render::history(&reports)),
            Err(e) => {
                tracing::error!(user_id, "Failed to load history: {e}");
                OutgoingResponse::text(format!("❌ Failed to load history: {e}"))
            }
        }
    }

    /// Answer an analytics callback token. `today` anchors the periods.
    pub async fn handle(&self, token: &str, today: NaiveDate) -> Vec<OutgoingResponse> {
        match AnalyticsAction::parse(token) {
            AnalyticsAction::Menu => vec![self.menu()],
            AnalyticsAction::ExportMenu => vec![
                OutgoingResponse::text(
                    "📥 *Export to CSV*\n\nSelect what to export:\n_(Files can be imported to Google Sheets)_",
                )
                .with_keyboard(export_keyboard()),
            ],
            AnalyticsAction::PickPeriod(kind) => vec![
                OutgoingResponse::text("📅 *Select period:*").with_keyboard(period_keyboard(kind)),
            ],
            AnalyticsAction::Show(kind, period) => {
                let text = match self.stat_text(kind, period, today).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(token, "Analytics query failed: {e}");
                        format!("❌ Failed to load analytics: {e}")
                    }
                };
                vec![OutgoingResponse::text(text).with_keyboard(back_keyboard())]
            }
            AnalyticsAction::Export(kind) => match self.export(kind, today).await {
                Ok(response) => {
                    tracing::info!(kind = kind.code(), "CSV export generated");
                    vec![
                        response,
                        OutgoingResponse::text(
                            "✅ File sent!\n\nTo import to Google Sheets:\n1. Open Google Sheets\n2. File → Import\n3. Upload the CSV file\n4. Select 'Replace spreadsheet' or 'Insert new sheet'",
                        )
                        .with_keyboard(back_keyboard()),
                    ]
                }
                Err(e) => {
                    tracing::error!(kind = kind.code(), "CSV export failed: {e}");
                    vec![
                        OutgoingResponse::text(format!("❌ Export error: {e}"))
                            .with_keyboard(back_keyboard()),
                    ]
                }
            },
            AnalyticsAction::Image(report) => match self.image(report, today).await {
                Ok(response) => {
                    tracing::info!(report = report.code(), "Image report generated");
                    let keyboard = if report == ImageReport::Daily {
                        daily_image_keyboard()
                    } else {
                        back_keyboard()
                    };
                    vec![
                        response,
                        OutgoingResponse::text(
                            "✅ Report generated!\n\nForward the image above to your management.",
                        )
                        .with_keyboard(keyboard),
                    ]
                }
                Err(e) => {
                    tracing::error!(report = report.code(), "Image report failed: {e}");
                    vec![
                        OutgoingResponse::text(format!("❌ Error generating report: {e}"))
                            .with_keyboard(back_keyboard()),
                    ]
                }
            },
            AnalyticsAction::MainMenu => vec![
                OutgoingResponse::text(
                    "🏠 *Main Menu*\n\nChoose an action using the buttons below:",
                ),
                OutgoingResponse::text("Choose an action:").with_keyboard(main_menu_keyboard()),
            ],
            AnalyticsAction::Unknown => {
                tracing::debug!(token, "Unknown analytics token");
                vec![OutgoingResponse::text("Unknown action").with_keyboard(back_keyboard())]
            }
        }
    }

    async fn stat_text(
        &self,
        kind: StatKind,
        period: Period,
        today: NaiveDate,
    ) -> Result<String, ReportError> {
        let range = match period.range(today) {
            None if kind.needs_range() => Period::ThreeMonths.range(today),
            range => range,
        };
        let bounded = range.unwrap_or_else(|| DateRange::new(today, today));

        let text = match kind {
            StatKind::Boats => {
                let stats = self.store.group_stats(GroupBy::Boat, range).await?;
                render::boats(&stats, range.as_ref())
            }
            StatKind::Captains => {
                let stats = self.store.group_stats(GroupBy::Captain, range).await?;
                render::captains(&stats, range.as_ref())
            }
            StatKind::Programs => {
                let stats = self.store.group_stats(GroupBy::Program, range).await?;
                render::programs(&stats, range.as_ref())
            }
            StatKind::Ranking => {
                let boats = self.store.group_stats(GroupBy::Boat, range).await?;
                let captains = self.store.group_stats(GroupBy::Captain, range).await?;
                render::ranking(&boats, &captains, range.as_ref())
            }
            StatKind::Reports => {
                let reports = self.store.list_reports_in_range(bounded).await?;
                render::recent_reports(&reports, &bounded)
            }
            StatKind::Summary => {
                let summary = self.store.period_summary(bounded).await?;
                render::summary(&summary, &bounded)
            }
        };
        Ok(text)
    }

    async fn export(&self, kind: ExportKind, today: NaiveDate) -> Result<OutgoingResponse, ReportError> {
        let bytes = match kind {
            ExportKind::Reports => {
                let reports = self.store.list_all_reports(usize::MAX).await?;
                export::reports_csv(&reports)?
            }
            ExportKind::Boats => {
                let stats = self.store.group_stats(GroupBy::Boat, None).await?;
                export::stats_csv("Boat", &stats)?
            }
            ExportKind::Captains => {
                let stats = self.store.group_stats(GroupBy::Captain, None).await?;
                export::stats_csv("Captain", &stats)?
            }
        };
        Ok(OutgoingResponse::document(export::attachment(kind, bytes, today)))
    }

    async fn image(&self, report: ImageReport, today: NaiveDate) -> Result<OutgoingResponse, ReportError> {
        let table = match (report, report.range(today)) {
            (ImageReport::Daily | ImageReport::Yesterday, Some(range)) => {
                let reports = self.store.list_reports_in_range(range).await?;
                image::daily_table(range.start, &reports)?
            }
            (ImageReport::Weekly, Some(range)) => {
                let reports = self.store.list_reports_in_range(range).await?;
                image::period_table("Weekly Report", &range, &reports)?
            }
            (ImageReport::Monthly, Some(range)) => {
                let reports = self.store.list_reports_in_range(range).await?;
                image::period_table("Monthly Report", &range, &reports)?
            }
            (ImageReport::Captains, _) => {
                let mut stats = self.store.group_stats(GroupBy::Captain, None).await?;
                stats.sort_by(|a, b| b.trips.cmp(&a.trips));
                image::stats_table("Captain Summary - All Time", "Captain", &stats)?
            }
            (_, range) => {
                let mut stats = self.store.group_stats(GroupBy::Boat, range).await?;
                stats.sort_by(|a, b| a.avg_fuel_used.cmp(&b.avg_fuel_used));
                image::stats_table("Boat Summary - All Time", "Boat", &stats)?
            }
        };
        let bytes = image::render_png(&table)?;
        Ok(OutgoingResponse::photo(image::attachment(report, bytes, today)))
    }
}

//! Table reports rendered as PNG images, ready to forward to management.
//!
//! Text is drawn with the 8x8 bitmap font from `font8x8`, scaled up. Only
//! ASCII and Latin-1 have glyphs; anything else renders as `?`.

use std::io::Cursor;

use chrono::{Datelike, Duration, NaiveDate};
use font8x8::legacy::{BASIC_LEGACY, LATIN_LEGACY};
use image::{ImageFormat, Rgb, RgbImage};
use rust_decimal::Decimal;

use crate::channels::{Attachment, AttachmentKind};
use crate::error::ReportError;
use crate::report::FuelReport;
use crate::store::{DateRange, GroupStats, checked_total};

/// Which image report to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageReport {
    Daily,
    Yesterday,
    Weekly,
    Monthly,
    Boats,
    Captains,
}

impl ImageReport {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "daily" => Some(Self::Daily),
            "daily_yesterday" => Some(Self::Yesterday),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "boats" => Some(Self::Boats),
            "captains" => Some(Self::Captains),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Yesterday => "daily_yesterday",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Boats => "boats",
            Self::Captains => "captains",
        }
    }

    /// Departure dates covered. Statistics tables cover all time.
    pub fn range(&self, today: NaiveDate) -> Option<DateRange> {
        match self {
            Self::Daily => Some(DateRange::new(today, today)),
            Self::Yesterday => {
                let day = today - Duration::days(1);
                Some(DateRange::new(day, day))
            }
            Self::Weekly => Some(DateRange::new(today - Duration::days(6), today)),
            Self::Monthly => Some(DateRange::new(today.with_day0(0)?, today)),
            Self::Boats | Self::Captains => None,
        }
    }

    pub fn caption(&self, today: NaiveDate) -> String {
        let caption = match self {
            Self::Daily => "📊 Daily Fuel Report".to_string(),
            Self::Yesterday => {
                let day = today - Duration::days(1);
                format!("📊 Report for {}", day.format("%d.%m.%Y"))
            }
            Self::Weekly => "📈 Weekly Fuel Report (Last 7 days)".to_string(),
            Self::Monthly => "📅 Monthly Fuel Report".to_string(),
            Self::Boats => "🚤 Boat Summary".to_string(),
            Self::Captains => "👨‍✈️ Captain Summary".to_string(),
        };
        format!("{caption}\n\n_Ready to forward to management_")
    }

    pub fn file_name(&self, today: NaiveDate) -> String {
        format!("report_{}_{}.png", self.code(), today.format("%Y%m%d"))
    }
}

/// A titled table with an optional bold totals row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub summary: Option<Vec<String>>,
}

fn whole(value: Decimal) -> String {
    value.round_dp(0).normalize().to_string()
}

fn one_place(value: Decimal) -> String {
    format!("{:.1}", value.round_dp(1))
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Program cell, with the private route squeezed in after the sentinel.
fn program_cell(report: &FuelReport, max_chars: usize) -> String {
    let record = &report.record;
    match &record.private_program {
        Some(route) => format!("N/A->{}", clip(route, max_chars.saturating_sub(5))),
        None => clip(&record.program, max_chars),
    }
}

fn span_title(prefix: &str, range: &DateRange) -> String {
    if range.start == range.end {
        format!("{prefix} - {}", range.start.format("%d.%m.%Y"))
    } else {
        format!(
            "{prefix} - {} to {}",
            range.start.format("%d.%m"),
            range.end.format("%d.%m.%Y")
        )
    }
}

/// One day's trips with fuel left.
pub fn daily_table(day: NaiveDate, reports: &[FuelReport]) -> Result<Table, ReportError> {
    let headers = vec!["Captain", "Boat", "Program", "Refuel", "Used", "Left", "Speed"];
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            vec![
                r.record.captain.clone(),
                r.record.boat.clone(),
                program_cell(r, 12),
                whole(r.record.gasoline_refuel),
                whole(r.record.gasoline_used),
                whole(r.record.gasoline_left),
                r.record.max_speed.to_string(),
            ]
        })
        .collect();
    let title = format!("Daily Report - {}", day.format("%d.%m.%Y"));

    if rows.is_empty() {
        return Ok(Table {
            title,
            rows: vec![placeholder_row("No reports", headers.len())],
            headers,
            summary: None,
        });
    }
    let (refuel, used) = fuel_totals(reports)?;
    Ok(Table {
        title,
        summary: Some(vec![
            "TOTAL".into(),
            format!("{} trips", rows.len()),
            String::new(),
            whole(refuel),
            whole(used),
            String::new(),
            String::new(),
        ]),
        headers,
        rows,
    })
}

/// Trips over a span of days. `prefix` starts the title.
pub fn period_table(
    prefix: &str,
    range: &DateRange,
    reports: &[FuelReport],
) -> Result<Table, ReportError> {
    let headers = vec!["Date", "Captain", "Boat", "Program", "Refuel", "Used", "Speed"];
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            vec![
                r.record.departure_date.format("%d.%m").to_string(),
                r.record.captain.clone(),
                clip(&r.record.boat, 8),
                program_cell(r, 10),
                whole(r.record.gasoline_refuel),
                whole(r.record.gasoline_used),
                r.record.max_speed.to_string(),
            ]
        })
        .collect();
    let title = span_title(prefix, range);

    if rows.is_empty() {
        return Ok(Table {
            title,
            rows: vec![placeholder_row("No data", headers.len())],
            headers,
            summary: None,
        });
    }
    let (refuel, used) = fuel_totals(reports)?;
    Ok(Table {
        title,
        summary: Some(vec![
            "TOTAL".into(),
            format!("{} trips", rows.len()),
            String::new(),
            String::new(),
            whole(refuel),
            whole(used),
            String::new(),
        ]),
        headers,
        rows,
    })
}

/// Per-boat or per-captain statistics, in the order given.
pub fn stats_table(
    title: &str,
    name_header: &'static str,
    stats: &[GroupStats],
) -> Result<Table, ReportError> {
    let headers = vec![name_header, "Trips", "Avg Used", "Total Used", "Avg Speed"];
    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.trips.to_string(),
                one_place(s.avg_fuel_used),
                whole(s.total_fuel_used),
                whole(s.avg_speed),
            ]
        })
        .collect();

    if rows.is_empty() {
        return Ok(Table {
            title: title.to_string(),
            rows: vec![placeholder_row("No data", headers.len())],
            headers,
            summary: None,
        });
    }
    let trips: usize = stats.iter().map(|s| s.trips).sum();
    let fuel = checked_total(stats.iter().map(|s| s.total_fuel_used), "fuel used")?;
    Ok(Table {
        title: title.to_string(),
        summary: Some(vec![
            "TOTAL".into(),
            trips.to_string(),
            String::new(),
            whole(fuel),
            String::new(),
        ]),
        headers,
        rows,
    })
}

fn placeholder_row(label: &str, columns: usize) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(std::iter::repeat_n("-".to_string(), columns.saturating_sub(1)))
        .collect()
}

fn fuel_totals(reports: &[FuelReport]) -> Result<(Decimal, Decimal), ReportError> {
    let refuel = checked_total(reports.iter().map(|r| r.record.gasoline_refuel), "refuel")?;
    let used = checked_total(reports.iter().map(|r| r.record.gasoline_used), "fuel used")?;
    Ok((refuel, used))
}

// ── Rendering ───────────────────────────────────────────────────────

const TITLE_BG: Rgb<u8> = Rgb([0x0d, 0x3d, 0x4d]);
const HEADER_BG: Rgb<u8> = Rgb([0x1a, 0x5f, 0x7a]);
const LIGHT_TEXT: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const ROW_EVEN_BG: Rgb<u8> = Rgb([0xf8, 0xf9, 0xfa]);
const ROW_ODD_BG: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const ROW_TEXT: Rgb<u8> = Rgb([0x21, 0x25, 0x29]);
const SUMMARY_BG: Rgb<u8> = Rgb([0xe8, 0xf4, 0xf8]);
const BORDER: Rgb<u8> = Rgb([0xde, 0xe2, 0xe6]);

const GLYPH_PX: u32 = 8;
const TEXT_SCALE: u32 = 2;
const TITLE_SCALE: u32 = 3;
const CELL_PADDING: u32 = 12;
const TITLE_HEIGHT: u32 = 50;
const HEADER_HEIGHT: u32 = 45;
const ROW_HEIGHT: u32 = 40;
const MIN_COLUMN: u32 = 80;
const MAX_COLUMN: u32 = 280;

fn glyph(c: char) -> [u8; 8] {
    let code = c as usize;
    match code {
        0..=0x7f => BASIC_LEGACY[code],
        0xa0..=0xff => LATIN_LEGACY[code - 0xa0],
        _ => BASIC_LEGACY[usize::from(b'?')],
    }
}

fn text_width(text: &str, scale: u32) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    chars.saturating_mul(GLYPH_PX * scale)
}

fn is_numeric(cell: &str) -> bool {
    let digits: String = cell.chars().filter(|c| *c != '.' && *c != '-').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

struct Canvas {
    image: RgbImage,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, ROW_ODD_BG),
        }
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        let x_end = x.saturating_add(w).min(self.image.width());
        let y_end = y.saturating_add(h).min(self.image.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, color);
            }
        }
    }

    fn text(&mut self, x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
        let advance = GLYPH_PX * scale;
        for (i, c) in (0u32..).zip(text.chars()) {
            let left = x.saturating_add(i.saturating_mul(advance));
            for (row, bits) in (0u32..).zip(glyph(c)) {
                for col in 0..GLYPH_PX {
                    if (bits >> col) & 1 == 1 {
                        self.fill(left + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
        }
    }

    /// Draw a row of cells. Numbers after the first column sit right.
    fn cells(&mut self, y: u32, height: u32, widths: &[u32], cells: &[String], color: Rgb<u8>) {
        let glyph_h = GLYPH_PX * TEXT_SCALE;
        let text_y = y + height.saturating_sub(glyph_h) / 2;
        let mut x = 0;
        for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
            let fits = (width.saturating_sub(2 * CELL_PADDING) / (GLYPH_PX * TEXT_SCALE)) as usize;
            let cell = clip(cell, fits);
            let text_x = if i > 0 && is_numeric(&cell) {
                x + width - CELL_PADDING - text_width(&cell, TEXT_SCALE)
            } else {
                x + CELL_PADDING
            };
            self.text(text_x, text_y, &cell, TEXT_SCALE, color);
            if i + 1 < widths.len() {
                self.fill(x + width, y, 1, height, BORDER);
            }
            x += width;
        }
    }
}

fn column_widths(table: &Table) -> Vec<u32> {
    (0..table.headers.len())
        .map(|col| {
            let header = text_width(table.headers[col], TEXT_SCALE);
            let widest = table
                .rows
                .iter()
                .chain(table.summary.iter())
                .filter_map(|row| row.get(col))
                .map(|cell| text_width(cell, TEXT_SCALE))
                .fold(header, u32::max);
            widest.saturating_add(2 * CELL_PADDING).clamp(MIN_COLUMN, MAX_COLUMN)
        })
        .collect()
}

/// Render a table to PNG bytes.
pub fn render_png(table: &Table) -> Result<Vec<u8>, ReportError> {
    let mut widths = column_widths(table);
    let title_w = text_width(&table.title, TITLE_SCALE) + 2 * CELL_PADDING;
    let columns_w: u32 = widths.iter().sum();
    if title_w > columns_w {
        if let Some(last) = widths.last_mut() {
            *last += title_w - columns_w;
        }
    }
    let width = widths.iter().sum::<u32>().max(title_w);
    let body_rows = u32::try_from(table.rows.len() + usize::from(table.summary.is_some()))
        .map_err(|e| ReportError::Image(e.to_string()))?;
    let height = TITLE_HEIGHT + HEADER_HEIGHT + body_rows * ROW_HEIGHT + 2;

    let mut canvas = Canvas::new(width, height);

    canvas.fill(0, 0, width, TITLE_HEIGHT, TITLE_BG);
    let title_h = GLYPH_PX * TITLE_SCALE;
    canvas.text(
        width.saturating_sub(text_width(&table.title, TITLE_SCALE)) / 2,
        (TITLE_HEIGHT - title_h) / 2,
        &table.title,
        TITLE_SCALE,
        LIGHT_TEXT,
    );

    let mut y = TITLE_HEIGHT;
    canvas.fill(0, y, width, HEADER_HEIGHT, HEADER_BG);
    let glyph_h = GLYPH_PX * TEXT_SCALE;
    let mut x = 0;
    for (i, (header, &w)) in table.headers.iter().zip(&widths).enumerate() {
        let text_x = x + w.saturating_sub(text_width(header, TEXT_SCALE)) / 2;
        canvas.text(text_x, y + (HEADER_HEIGHT - glyph_h) / 2, header, TEXT_SCALE, LIGHT_TEXT);
        if i + 1 < widths.len() {
            canvas.fill(x + w, y, 1, HEADER_HEIGHT, BORDER);
        }
        x += w;
    }
    y += HEADER_HEIGHT;

    for (i, row) in table.rows.iter().enumerate() {
        let bg = if i % 2 == 0 { ROW_EVEN_BG } else { ROW_ODD_BG };
        canvas.fill(0, y, width, ROW_HEIGHT, bg);
        canvas.cells(y, ROW_HEIGHT, &widths, row, ROW_TEXT);
        canvas.fill(0, y + ROW_HEIGHT - 1, width, 1, BORDER);
        y += ROW_HEIGHT;
    }

    if let Some(summary) = &table.summary {
        canvas.fill(0, y, width, ROW_HEIGHT, SUMMARY_BG);
        canvas.cells(y, ROW_HEIGHT, &widths, summary, ROW_TEXT);
    }

    // Outer frame, two pixels wide.
    canvas.fill(0, 0, width, 2, BORDER);
    canvas.fill(0, height - 2, width, 2, BORDER);
    canvas.fill(0, 0, 2, height, BORDER);
    canvas.fill(width - 2, 0, 2, height, BORDER);

    let mut out = Cursor::new(Vec::new());
    canvas
        .image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ReportError::Image(e.to_string()))?;
    Ok(out.into_inner())
}

/// Wrap a rendered table as a photo for the channel.
pub fn attachment(report: ImageReport, bytes: Vec<u8>, today: NaiveDate) -> Attachment {
    Attachment {
        kind: AttachmentKind::Photo,
        file_name: report.file_name(today),
        bytes,
        caption: Some(report.caption(today)),
    }
}

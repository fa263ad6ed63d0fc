use std::collections::HashMap;

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::Target;

/// Schedule table on the booking page.
pub const SCHEDULE_TABLE: &str = "table.time--table";

// Status icons are SVGs keyed by aria-label: 予約可能 = bookable,
// 休 / × = closed that day.
const HEADER_DAY_ROW: &str = "tr#height_headday";
const AVAILABLE_ICON: &str = r#"svg[aria-label="予約可能"]"#;
const CLOSED_ICONS: &str = r#"svg[aria-label="休"], svg[aria-label="×"]"#;

const HEADER_ROW_IDS: [&str; 2] = ["height_head", "height_headday"];

static TABLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(SCHEDULE_TABLE).unwrap());
static HEADER_ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(HEADER_DAY_ROW).unwrap());
static ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static LOCATION_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("th a").unwrap());
static CATEGORY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("th.main_color").unwrap());
static AVAILABLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(AVAILABLE_ICON).unwrap());
static CLOSED_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(CLOSED_ICONS).unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2}/\d{2})").unwrap());

/// One bookable cell found in the schedule table. `date` keeps the MM/DD
/// extracted from the header column, e.g. "07/30".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub location: String,
    pub category: String,
    pub date: String,
    pub available: bool,
}

/// Scans a snapshot of the booking page for bookable cells matching the
/// target. Pure on purpose: `today` is passed in so the past-date cutoff is
/// deterministic under test.
pub fn extract_slots(page_html: &str, target: &Target, today: NaiveDate) -> Vec<Slot> {
    let document = Html::parse_document(page_html);
    let mut slots = Vec::new();

    let Some(table) = document.select(&TABLE_SEL).next() else {
        return slots;
    };
    let Some(header_row) = table.select(&HEADER_ROW_SEL).next() else {
        return slots;
    };

    let dates = header_dates(header_row);

    for row in table.select(&ROW_SEL) {
        if row.value().id().is_some_and(|id| HEADER_ROW_IDS.contains(&id)) {
            continue;
        }

        let location = first_text(row, &LOCATION_SEL);
        if location != target.location {
            continue;
        }
        let category = first_text(row, &CATEGORY_SEL);
        if category != target.category {
            continue;
        }

        for (index, cell) in row_cells(row).enumerate() {
            if !has_classes(cell, &["tdSelect", "enable"]) {
                continue;
            }
            if cell.select(&AVAILABLE_SEL).next().is_none() {
                continue;
            }
            let Some(date) = dates.get(&index) else {
                continue;
            };
            let Some(slot_date) = resolve_date(date, today) else {
                continue;
            };
            if slot_date < today {
                continue;
            }
            if cell.select(&CLOSED_SEL).next().is_some() {
                continue;
            }

            slots.push(Slot {
                location: location.clone(),
                category: category.clone(),
                date: date.clone(),
                available: true,
            });
        }
    }

    slots
}

/// Date of "today" in Japan Standard Time. JST is UTC+9 with no DST.
pub fn today_in_tokyo() -> NaiveDate {
    let jst = FixedOffset::east_opt(9 * 3600).unwrap();
    Utc::now().with_timezone(&jst).date_naive()
}

/// Comma-separated slot dates for log lines and notification alt text.
pub fn date_summary(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|s| s.date.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps cell index to the "MM/DD" shown in that header column. Columns
/// without a date (the corner cells) are absent from the map.
fn header_dates(header_row: ElementRef<'_>) -> HashMap<usize, String> {
    let mut dates = HashMap::new();
    for (index, cell) in row_cells(header_row).enumerate() {
        if let Some(captures) = DATE_RE.captures(&cell_text(cell)) {
            dates.insert(index, captures[1].to_string());
        }
    }
    dates
}

/// All `th`/`td` children of the row in DOM order, matching how the page
/// itself indexes `row.cells`.
fn row_cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn first_text(row: ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector).next().map(cell_text).unwrap_or_default()
}

fn has_classes(cell: ElementRef<'_>, wanted: &[&str]) -> bool {
    wanted
        .iter()
        .all(|w| cell.value().classes().any(|c| c == *w))
}

/// Resolves a display date against `today`, rolling into the next year when
/// the shown month has already wrapped around.
fn resolve_date(display: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (month, day) = display.split_once('/')?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let year = if month < today.month() {
        today.year() + 1
    } else {
        today.year()
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

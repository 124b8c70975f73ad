use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::engine::status::fold;

pub const OFF: &str = "off";

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Accepts English names (full or abbreviated) and Turkish names with or
/// without diacritics.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match fold(raw).as_str() {
        "monday" | "mon" | "pazartesi" => Some(Weekday::Mon),
        "tuesday" | "tue" | "sali" => Some(Weekday::Tue),
        "wednesday" | "wed" | "carsamba" => Some(Weekday::Wed),
        "thursday" | "thu" | "persembe" => Some(Weekday::Thu),
        "friday" | "fri" | "cuma" => Some(Weekday::Fri),
        "saturday" | "sat" | "cumartesi" => Some(Weekday::Sat),
        "sunday" | "sun" | "pazar" => Some(Weekday::Sun),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Parses `HH:MM-HH:MM`.
    pub fn parse(raw: &str) -> Option<TimeRange> {
        let (start, end) = raw.trim().split_once('-')?;
        Some(TimeRange {
            start: NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?,
            end: NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?,
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEntry {
    Off,
    Shift(TimeRange),
}

impl DayEntry {
    pub fn parse(raw: &str) -> Option<DayEntry> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(OFF) || trimmed.eq_ignore_ascii_case("izin") {
            return Some(DayEntry::Off);
        }
        TimeRange::parse(trimmed).map(DayEntry::Shift)
    }
}

impl fmt::Display for DayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayEntry::Off => f.write_str(OFF),
            DayEntry::Shift(range) => range.fmt(f),
        }
    }
}

/// Weekday → shift range or "off". Entries may be missing while a
/// schedule is still being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Rotation {
    days: [Option<DayEntry>; 7],
}

impl Rotation {
    pub fn get(&self, day: Weekday) -> Option<DayEntry> {
        self.days[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, day: Weekday, entry: DayEntry) {
        self.days[day.num_days_from_monday() as usize] = Some(entry);
    }

    pub fn assigned(&self) -> impl Iterator<Item = (Weekday, DayEntry)> + '_ {
        WEEKDAYS
            .iter()
            .filter_map(move |day| self.get(*day).map(|entry| (*day, entry)))
    }

    pub fn missing(&self) -> Vec<Weekday> {
        WEEKDAYS
            .iter()
            .copied()
            .filter(|day| self.get(*day).is_none())
            .collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for Rotation {
    type Error = String;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut rotation = Rotation::default();
        for (key, value) in raw {
            let day = parse_weekday(&key).ok_or_else(|| format!("unknown weekday {key:?}"))?;
            if rotation.get(day).is_some() {
                return Err(format!("weekday {key:?} given twice"));
            }
            let entry = DayEntry::parse(&value)
                .ok_or_else(|| format!("{key}: expected \"off\" or HH:MM-HH:MM, got {value:?}"))?;
            rotation.set(day, entry);
        }
        Ok(rotation)
    }
}

impl From<Rotation> for BTreeMap<String, String> {
    fn from(rotation: Rotation) -> Self {
        rotation
            .assigned()
            .map(|(day, entry)| (weekday_key(day).to_string(), entry.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Schedule {
    Fixed {
        start_time: NaiveTime,
        end_time: NaiveTime,
        #[schema(value_type = Option<String>, example = "Sun")]
        off_day: Option<Weekday>,
    },
    Rotating {
        #[schema(value_type = Object, example = json!({"monday": "09:00-17:00", "sunday": "off"}))]
        days: Rotation,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShiftAssignment {
    pub staff_id: i32,
    pub schedule: Schedule,
    pub updated_by: i32,
    pub updated_at: DateTime<Utc>,
}

/// One day's worked shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShiftRecord {
    pub id: i32,
    pub staff_id: i32,
    pub work_date: NaiveDate,
    pub scheduled_start: Option<NaiveDateTime>,
    pub scheduled_end: Option<NaiveDateTime>,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OffReason {
    RestDay,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedWindow {
    Scheduled { start: NaiveDateTime, end: NaiveDateTime },
    Off {
        reason: OffReason,
        leave_id: Option<i32>,
    },
    /// No entry exists for the day; distinct from a rest day.
    Unscheduled,
}

impl ExpectedWindow {
    pub fn is_off(&self) -> bool {
        matches!(self, ExpectedWindow::Off { .. })
    }

    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self {
            ExpectedWindow::Scheduled { start, end } => Some((*start, *end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleWarning {
    /// Every weekday carries a shift.
    Overtime,
    /// Two or more weekdays are off.
    Understaffing { off_days: usize },
    IncompleteRotation { missing: Vec<String> },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleSaved {
    pub assignment: ShiftAssignment,
    pub warnings: Vec<ScheduleWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Start,
    End,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleShiftRequest {
    pub action: ToggleAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveScheduleRequest {
    pub schedule: Schedule,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentShift {
    pub staff_id: i32,
    pub active: Option<ShiftRecord>,
    pub today: ExpectedWindow,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StaffQuery {
    pub staff: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExpectedQuery {
    pub staff: Option<i32>,
    pub date: Option<NaiveDate>,
}

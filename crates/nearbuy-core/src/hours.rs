//! Parsing of free-text opening hours like `"10:00 AM - 9:00 PM"`.
//!
//! All comparisons happen on a single calendar day. A range whose close is
//! not after its open (overnight hours such as `"6 PM - 2 AM"`) never counts
//! as open.

use chrono::NaiveTime;

const CLOCK_FORMATS: [&str; 5] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p", "%I:%M:%S %p"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl OpenHours {
    /// Parses `"<open> - <close>"`. The first `-` splits the two times.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (open, close) = raw.split_once('-')?;
        Some(Self {
            open: parse_clock(open)?,
            close: parse_clock(close)?,
        })
    }

    /// True when `now` falls strictly between open and close.
    #[must_use]
    pub fn is_open_at(&self, now: NaiveTime) -> bool {
        now > self.open && now < self.close
    }

    /// Checks the shop's hours against a requested window.
    ///
    /// With both bounds the intervals must overlap (and `from < to`); with only
    /// `from` the shop must close after it; with only `to` it must open before
    /// it. No bounds never matches.
    #[must_use]
    pub fn overlaps(&self, from: Option<NaiveTime>, to: Option<NaiveTime>) -> bool {
        match (from, to) {
            (Some(from), Some(to)) => from < to && self.open < to && self.close > from,
            (Some(from), None) => self.close > from,
            (None, Some(to)) => self.open < to,
            (None, None) => false,
        }
    }
}

/// Parses a wall-clock time in 24h or 12h notation, e.g. `21:00`, `9:30 pm`,
/// `9PM`.
#[must_use]
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim().to_ascii_uppercase();
    if s.is_empty() {
        return None;
    }

    if let Some(t) = CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&s, fmt).ok())
    {
        return Some(t);
    }

    // Bare hour with meridiem: "9 PM", "9PM".
    let digits_end = s.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let (hour, meridiem) = s.split_at(digits_end);
    let meridiem = meridiem.trim();
    if meridiem != "AM" && meridiem != "PM" {
        return None;
    }
    NaiveTime::parse_from_str(&format!("{hour}:00 {meridiem}"), "%I:%M %p").ok()
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar date where any of year, month and day may be unknown.
///
/// "Sometime in 2018" is `PartialDate { year: Some(2018), .. }` and is not the
/// same thing as January 1, 2018.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl PartialDate {
    pub fn new(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn year(year: i32) -> Self {
        Self::new(Some(year), None, None)
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self::new(Some(year), Some(month), Some(day))
    }

    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; `/` is accepted as separator too.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split(['-', '/']);

        let year = Some(parts.next()?.trim().parse::<i32>().ok()?);
        let month = match parts.next() {
            Some(part) => Some(part.trim().parse::<u32>().ok().filter(|m| (1..=12).contains(m))?),
            None => None,
        };
        let day = match parts.next() {
            Some(part) => Some(part.trim().parse::<u32>().ok().filter(|d| (1..=31).contains(d))?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self { year, month, day })
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }

    // unknown month or day counts as 1
    pub fn to_date_time(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year?, self.month.unwrap_or(1), self.day.unwrap_or(1))?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<PartialDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<PartialDate>,
}

impl Entry {
    pub fn is_currently_reading(&self) -> bool {
        self.finish.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingState {
    NeverRead,
    CurrentlyReading,
    FinishedAtLeastOnce,
    FinishedMultipleTimes,
}

/// Reading history of one person with one book.
///
/// Handles precise and imprecise memories alike: "I've read this before",
/// "I read this in 2018", "I'm reading this now", "June 28 through July 3, 2021".
///
/// Setting `multiple_readings` forces `has_read`; the reverse never clears it.
/// `start_reading` and `finish_reading` never leave two sessions open, but a
/// decoded payload is taken as-is and may carry several.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ReadingHistoryRecord", into = "ReadingHistoryRecord")]
pub struct ReadingHistory {
    has_read: bool,
    multiple_readings: bool,
    entries: Option<Vec<Entry>>,
}

impl ReadingHistory {
    pub fn new(has_read: bool, multiple_readings: bool, entries: Option<Vec<Entry>>) -> Self {
        Self {
            has_read: has_read || multiple_readings,
            multiple_readings,
            entries,
        }
    }

    pub fn has_read(&self) -> bool {
        self.has_read
    }

    pub fn set_has_read(&mut self, has_read: bool) {
        self.has_read = has_read || self.multiple_readings;
    }

    pub fn multiple_readings(&self) -> bool {
        self.multiple_readings
    }

    pub fn set_multiple_readings(&mut self, multiple_readings: bool) {
        self.multiple_readings = multiple_readings;
        if multiple_readings {
            self.has_read = true;
        }
    }

    pub fn entries(&self) -> Option<&[Entry]> {
        self.entries.as_deref()
    }

    pub fn is_currently_reading(&self) -> bool {
        self.entries
            .iter()
            .flatten()
            .any(|entry| entry.is_currently_reading())
    }

    pub fn start_reading(&mut self, start: Option<PartialDate>) {
        if self.is_currently_reading() {
            return;
        }

        self.entries
            .get_or_insert_with(Vec::new)
            .push(Entry { start, finish: None });

        debug_assert!(self.is_currently_reading());
    }

    /// Closes the earliest open session, or records a finished session with an
    /// unknown start when none is open.
    ///
    /// Sessions are assumed to be finished in the order they were started.
    /// An empty `finish` still marks the book finished, just not when.
    pub fn finish_reading(&mut self, finish: PartialDate) {
        let entries = self.entries.get_or_insert_with(Vec::new);

        match entries.iter_mut().find(|entry| entry.is_currently_reading()) {
            Some(entry) => entry.finish = Some(finish),
            None => entries.push(Entry {
                start: None,
                finish: Some(finish),
            }),
        }
    }

    pub fn state(&self) -> ReadingState {
        if self.is_currently_reading() {
            return ReadingState::CurrentlyReading;
        }

        let finished = self
            .entries
            .iter()
            .flatten()
            .filter(|entry| entry.finish.is_some())
            .count();

        if self.multiple_readings || finished > 1 {
            ReadingState::FinishedMultipleTimes
        } else if self.has_read || finished == 1 {
            ReadingState::FinishedAtLeastOnce
        } else {
            ReadingState::NeverRead
        }
    }
}

// wire shape of `ReadingHistory`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingHistoryRecord {
    #[serde(default)]
    has_read: bool,
    #[serde(default)]
    multiple_readings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<Entry>>,
}

impl From<ReadingHistoryRecord> for ReadingHistory {
    fn from(val: ReadingHistoryRecord) -> Self {
        ReadingHistory::new(val.has_read, val.multiple_readings, val.entries)
    }
}

impl From<ReadingHistory> for ReadingHistoryRecord {
    fn from(val: ReadingHistory) -> Self {
        ReadingHistoryRecord {
            has_read: val.has_read,
            multiple_readings: val.multiple_readings,
            entries: val.entries,
        }
    }
}

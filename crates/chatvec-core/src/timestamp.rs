//! Fuzzy recognition of standalone date/time lines.
//!
//! Chat exports interleave message text with header lines such as
//! `"Monday, January 6, 2025"`, `"[10:01 AM]"` or `"6/1/25 10:01"`.
//! [`TimestampParser`] decides whether a line is one of those.
//!
//! The parser is lenient: it tokenizes the line and skips words it does
//! not understand, so `"Sent on Jan 5th, 2024"` is recognized. Bare
//! numbers are not enough on their own; at least one clock time, numeric
//! date, month name, or weekday must be present. Recognition is a pure
//! function of the input text: missing components are never filled in
//! from the current date.
//!
//! Lines outside the length bounds or with too many digits are rejected
//! before any tokenizing happens, which keeps long content lines that
//! merely mention numbers out of the parser entirely.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{4})-(\d{1,2})-(\d{1,2})(?:t(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?)?(?:z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("iso date pattern compiles")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,4})([/.-])(\d{1,2})(?:[/.-](\d{1,4}))?$")
        .expect("numeric date pattern compiles")
});

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?(a\.?m\.?|p\.?m\.?)?$")
        .expect("clock pattern compiles")
});

static HOUR_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(a\.?m\.?|p\.?m\.?)$").expect("hour pattern compiles")
});

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,4})(?:st|nd|rd|th)?$").expect("ordinal pattern compiles")
});

const MONTHS: [(&str, u32); 13] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("sept", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Month and weekday words that are also ordinary English. They only
/// count as evidence when a number appears on the same line.
const AMBIGUOUS_WORDS: [&str; 6] = ["may", "march", "mar", "sat", "sun", "wed"];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Length, digit, and calendar bounds applied to timestamp candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampBounds {
    /// Shortest line (in chars) considered a candidate.
    pub min_len: usize,
    /// Longest line (in chars) considered a candidate.
    pub max_len: usize,
    /// Most ASCII digits a candidate may contain.
    pub max_digits: usize,
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for TimestampBounds {
    fn default() -> Self {
        Self {
            min_len: 4,
            max_len: 50,
            max_digits: 8,
            min_year: 1900,
            max_year: 2100,
        }
    }
}

/// The components a recognized timestamp line carried.
///
/// Only what appeared in the text is set; nothing is defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsedTimestamp {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub time: Option<NaiveTime>,
}

/// Recognizes timestamp lines within configured bounds.
#[derive(Debug, Clone, Default)]
pub struct TimestampParser {
    bounds: TimestampBounds,
}

impl TimestampParser {
    pub fn new(bounds: TimestampBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &TimestampBounds {
        &self.bounds
    }

    /// Whether `line` passes the cheap length and digit-count gates.
    pub fn is_candidate(&self, line: &str) -> bool {
        let len = line.chars().count();
        if len < self.bounds.min_len || len > self.bounds.max_len {
            return false;
        }
        line.chars().filter(|c| c.is_ascii_digit()).count() <= self.bounds.max_digits
    }

    /// Whether `line` is a standalone timestamp.
    pub fn recognizes(&self, line: &str) -> bool {
        self.parse(line).is_some()
    }

    /// Parse `line` as a timestamp. Returns `None` for non-candidates,
    /// for lines without date/time evidence, for impossible dates or
    /// clock times, and for years outside the configured range.
    pub fn parse(&self, line: &str) -> Option<ParsedTimestamp> {
        if !self.is_candidate(line) {
            return None;
        }

        let mut acc = Accumulator::default();
        for raw in line.split(|c: char| c.is_whitespace() || c == ',') {
            let token = clean_token(raw);
            if !token.is_empty() {
                acc.feed(&token);
            }
        }
        acc.finish(&self.bounds)
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: u32,
    second: u32,
    /// `Some(true)` for pm, `Some(false)` for am.
    pm: Option<bool>,
    /// A bare small number seen right before a meridiem word ("5 pm").
    pending_hour: Option<u32>,
    evidence: bool,
    weak_evidence: bool,
    saw_number: bool,
}

impl Accumulator {
    fn feed(&mut self, token: &str) {
        let previous_number = self.pending_hour.take();

        if let Some(caps) = ISO_DATE.captures(token) {
            self.evidence = true;
            self.set_date(
                caps[1].parse().ok(),
                caps[2].parse().ok(),
                caps[3].parse().ok(),
            );
            if let (Some(h), Some(m)) = (caps.get(4), caps.get(5)) {
                self.set_time(
                    h.as_str().parse().ok(),
                    m.as_str().parse().ok(),
                    caps.get(6).and_then(|s| s.as_str().parse().ok()),
                );
            }
            return;
        }

        if let Some(caps) = CLOCK.captures(token) {
            self.evidence = true;
            self.set_time(
                caps[1].parse().ok(),
                caps[2].parse().ok(),
                caps.get(3).and_then(|s| s.as_str().parse().ok()),
            );
            if let Some(mer) = caps.get(4) {
                self.pm.get_or_insert(is_pm(mer.as_str()));
            }
            return;
        }

        if let Some(caps) = HOUR_MERIDIEM.captures(token) {
            self.evidence = true;
            self.set_time(caps[1].parse().ok(), Some(0), None);
            self.pm.get_or_insert(is_pm(&caps[2]));
            return;
        }

        if let Some(caps) = NUMERIC_DATE.captures(token) {
            self.feed_numeric_date(&caps);
            return;
        }

        let lower = token.to_lowercase();

        if let Some(pm) = meridiem(&lower) {
            if self.hour.is_none() {
                if let Some(h) = previous_number {
                    self.evidence = true;
                    self.set_time(Some(h), Some(0), None);
                    // The number was provisionally taken as a day.
                    if self.day == Some(h) {
                        self.day = None;
                    }
                }
            }
            if self.hour.is_some() {
                self.pm.get_or_insert(pm);
            }
            return;
        }

        if let Some(month) = month_from_word(&lower) {
            self.note_word_evidence(&lower);
            self.month.get_or_insert(month);
            return;
        }

        if is_weekday(&lower) {
            self.note_word_evidence(&lower);
            return;
        }

        if let Some(caps) = ORDINAL.captures(token) {
            let digits = caps[1].len();
            let Ok(value) = caps[1].parse::<u32>() else {
                return;
            };
            self.saw_number = true;
            if digits == 4 {
                if self.year.is_none() {
                    self.year = Some(value as i32);
                }
            } else if (1..=31).contains(&value) {
                if self.day.is_none() {
                    self.day = Some(value);
                }
                if value <= 12 {
                    self.pending_hour = Some(value);
                }
            }
        }
        // Anything else is a word the fuzzy parse skips.
    }

    fn feed_numeric_date(&mut self, caps: &regex::Captures<'_>) {
        let first = &caps[1];
        let sep = &caps[2];
        let Some(third) = caps.get(4) else {
            // Two-part form: only "M/D" is a date; "3.5" or "10-12" are not.
            if sep == "/" && first.len() <= 2 {
                self.evidence = true;
                self.set_date(None, first.parse().ok(), caps[3].parse().ok());
            }
            return;
        };

        let a: u32 = first.parse().unwrap_or(0);
        let b: u32 = caps[3].parse().unwrap_or(0);
        let c: u32 = third.as_str().parse().unwrap_or(0);

        self.evidence = true;
        if first.len() == 4 {
            self.set_date(Some(a as i32), Some(b), Some(c));
            return;
        }
        let year = match third.as_str().len() {
            4 => c as i32,
            1 | 2 => pivot_two_digit_year(c),
            _ => {
                // "12/05/123" has no sensible reading.
                self.year = Some(i32::MIN);
                return;
            }
        };
        if a > 12 {
            self.set_date(Some(year), Some(b), Some(a));
        } else {
            self.set_date(Some(year), Some(a), Some(b));
        }
    }

    fn note_word_evidence(&mut self, lower: &str) {
        if AMBIGUOUS_WORDS.contains(&lower.trim_end_matches('.')) {
            self.weak_evidence = true;
        } else {
            self.evidence = true;
        }
    }

    fn set_date(&mut self, year: Option<i32>, month: Option<u32>, day: Option<u32>) {
        if let Some(y) = year {
            self.year = Some(y);
        }
        if let Some(m) = month {
            self.month = Some(m);
        }
        if let Some(d) = day {
            self.day = Some(d);
        }
    }

    fn set_time(&mut self, hour: Option<u32>, minute: Option<u32>, second: Option<u32>) {
        if self.hour.is_some() {
            return;
        }
        self.hour = Some(hour.unwrap_or(u32::MAX));
        self.minute = minute.unwrap_or(u32::MAX);
        self.second = second.unwrap_or(0);
    }

    fn finish(self, bounds: &TimestampBounds) -> Option<ParsedTimestamp> {
        if !(self.evidence || (self.weak_evidence && self.saw_number)) {
            return None;
        }

        if let Some(year) = self.year {
            if year < bounds.min_year || year > bounds.max_year {
                return None;
            }
        }

        if self.month.is_some() {
            // Year 2000 is a leap year, so "Feb 29" without a year passes.
            NaiveDate::from_ymd_opt(
                self.year.unwrap_or(2000),
                self.month.unwrap_or(1),
                self.day.unwrap_or(1),
            )?;
        } else if let Some(day) = self.day {
            if !(1..=31).contains(&day) {
                return None;
            }
        }

        let time = match self.hour {
            None => None,
            Some(hour) => {
                let hour = match self.pm {
                    None => hour,
                    Some(_) if hour > 12 => return None,
                    Some(true) => hour % 12 + 12,
                    Some(false) => hour % 12,
                };
                Some(NaiveTime::from_hms_opt(hour, self.minute, self.second)?)
            }
        };

        Some(ParsedTimestamp {
            year: self.year,
            month: self.month,
            day: self.day,
            time,
        })
    }
}

/// Strip wrapping punctuation such as `[10:01]`, `(Mon)` or `Jan.`.
fn clean_token(raw: &str) -> String {
    raw.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')' | ';' | '"' | '\'' | '|'))
        .trim_end_matches(':')
        .to_string()
}

fn meridiem(lower: &str) -> Option<bool> {
    match lower.trim_end_matches('.') {
        "am" | "a.m" => Some(false),
        "pm" | "p.m" => Some(true),
        _ => None,
    }
}

fn is_pm(s: &str) -> bool {
    s.to_ascii_lowercase().starts_with('p')
}

fn month_from_word(lower: &str) -> Option<u32> {
    let word = lower.trim_end_matches('.');
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == word || (word.len() == 3 && name.starts_with(word)))
        .map(|(_, n)| *n)
}

fn is_weekday(lower: &str) -> bool {
    let word = lower.trim_end_matches('.');
    if word.len() < 3 {
        return false;
    }
    WEEKDAYS.iter().any(|name| {
        *name == word
            || (word.len() <= 5 && name.starts_with(word) && matches!(word.len(), 3 | 4 | 5))
    })
}

fn pivot_two_digit_year(y: u32) -> i32 {
    if y < 69 {
        2000 + y as i32
    } else {
        1900 + y as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TimestampParser {
        TimestampParser::default()
    }

    fn time(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn clock_time_alone() {
        let p = parser().parse("10:01").unwrap();
        assert_eq!(p.time, time(10, 1));
        assert_eq!(p.year, None);
    }

    #[test]
    fn bracketed_clock_with_meridiem() {
        assert_eq!(parser().parse("[10:01 PM]").unwrap().time, time(22, 1));
        assert_eq!(parser().parse("12:30am").unwrap().time, time(0, 30));
        assert_eq!(parser().parse("at 5 pm").unwrap().time, time(17, 0));
        assert_eq!(parser().parse("0:30 am").unwrap().time, time(0, 30));
        assert_eq!(parser().parse("0:30 pm").unwrap().time, time(12, 30));
    }

    #[test]
    fn short_numeric_date_with_clock() {
        let p = parser().parse("6/1/25 10:01").unwrap();
        assert_eq!(p.time, time(10, 1));
        assert_eq!(p.year, Some(2025));
        assert!(parser().parse("06/01/2025 10:01").is_none());
    }

    #[test]
    fn long_form_date_header() {
        let p = parser().parse("Monday, January 6, 2025").unwrap();
        assert_eq!(p.year, Some(2025));
        assert_eq!(p.month, Some(1));
        assert_eq!(p.day, Some(6));
    }

    #[test]
    fn iso_and_numeric_dates() {
        let p = parser().parse("2024-02-29").unwrap();
        assert_eq!((p.year, p.month, p.day), (Some(2024), Some(2), Some(29)));
        assert!(parser().parse("2023-02-29").is_none());

        let p = parser().parse("Feb 29 13:45").unwrap();
        assert_eq!(p.time, time(13, 45));

        let p = parser().parse("25/12/2023").unwrap();
        assert_eq!((p.month, p.day), (Some(12), Some(25)));

        let p = parser().parse("3/4/99").unwrap();
        assert_eq!((p.year, p.month, p.day), (Some(1999), Some(3), Some(4)));
    }

    #[test]
    fn fuzzy_skips_surrounding_words() {
        let p = parser().parse("Sent on Jan 5th, 2024").unwrap();
        assert_eq!((p.year, p.month, p.day), (Some(2024), Some(1), Some(5)));
    }

    #[test]
    fn words_and_bare_numbers_are_not_timestamps() {
        assert!(parser().parse("hello there").is_none());
        assert!(parser().parse("call me in 5").is_none());
        assert!(parser().parse("version 3.5").is_none());
    }

    #[test]
    fn impossible_values_fail_open() {
        assert!(parser().parse("12:75").is_none());
        assert!(parser().parse("25:00").is_none());
        assert!(parser().parse("February 30, 2023").is_none());
        assert!(parser().parse("13:00 pm").is_none());
    }

    #[test]
    fn years_outside_range_rejected() {
        assert!(parser().parse("March 1850").is_none());
        assert!(parser().parse("June 3000").is_none());
        assert!(parser().parse("March 1900").is_some());
        assert!(parser().parse("March 2100").is_some());
    }

    #[test]
    fn length_and_digit_gates() {
        let p = parser();
        assert!(!p.is_candidate("1:5"));
        assert!(p.is_candidate("1:05"));
        assert!(!p.is_candidate(&"Monday ".repeat(8)));
        assert!(!p.is_candidate("2024-01-05 10:01:30"));
        assert!(p.parse("2024-01-05 10:01:30").is_none());
    }

    #[test]
    fn custom_bounds_apply() {
        let p = TimestampParser::new(TimestampBounds {
            min_year: 2000,
            max_year: 2010,
            ..TimestampBounds::default()
        });
        assert!(p.parse("May 4, 2005").is_some());
        assert!(p.parse("May 4, 2015").is_none());
    }

    #[test]
    fn ambiguous_words_need_a_number() {
        assert!(parser().parse("I may go").is_none());
        assert!(parser().parse("the sun is out").is_none());
        assert!(parser().parse("May 4").is_some());
        assert!(parser().parse("Sat 10").is_some());
    }

    #[test]
    fn weekday_alone_is_a_header() {
        assert!(parser().parse("Tuesday").is_some());
        assert!(parser().parse("Tue.").is_some());
    }
}

//! Temporal values: natural-language resolution, then a strict parse.
//!
//! A [`TemporalResolver`] turns free text ("fifteen minutes shy of midnight",
//! "July 4th of 1968") into canonical text. [`parse_temporal`] then parses
//! that text with the fixed formats from `llmbind_core::shape`; a resolver
//! that emits anything else fails the strict stage.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use llmbind_core::error::ParseError;
use llmbind_core::shape::{ParsedValue, ValueKind, DATE_FORMAT, DATE_TIME_FORMAT, TIME_FORMAT};
use regex_lite::{Captures, Regex};

/// Replaceable natural-language resolution strategy.
pub trait TemporalResolver: Send + Sync {
    /// Canonical text for `kind` (`%Y-%m-%d`, `%H:%M:%S` or
    /// `%Y-%m-%dT%H:%M:%S`), or `None` when nothing in `text` resolves.
    fn resolve(&self, text: &str, kind: ValueKind) -> Option<String>;
}

/// Resolve `text` with `resolver`, then parse strictly.
pub fn parse_temporal(
    text: &str,
    kind: ValueKind,
    resolver: &dyn TemporalResolver,
) -> Result<ParsedValue, ParseError> {
    let target = kind.to_string();
    let canonical = resolver.resolve(text, kind).ok_or_else(|| {
        ParseError::new(&target, format!("no {kind} expression found in '{}'", text.trim()))
    })?;

    let strict = |e: chrono::ParseError| {
        ParseError::new(&target, format!("resolved to '{canonical}', which is not a valid {kind}: {e}"))
    };

    match kind {
        ValueKind::Date => NaiveDate::parse_from_str(&canonical, DATE_FORMAT)
            .map(ParsedValue::Date)
            .map_err(strict),
        ValueKind::Time => NaiveTime::parse_from_str(&canonical, TIME_FORMAT)
            .map(ParsedValue::Time)
            .map_err(strict),
        ValueKind::DateTime => NaiveDateTime::parse_from_str(&canonical, DATE_TIME_FORMAT)
            .map(ParsedValue::DateTime)
            .map_err(strict),
        other => Err(ParseError::new(&target, format!("{other} is not a temporal kind"))),
    }
}

const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const ANCHOR: &str = r"midnight|noon|midday|\d{1,2}(?::\d{2})?(?:\s*[ap]\.?m\b\.?)?";

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

static ISO_DATE_TIME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"\b(\d{4})-(\d{1,2})-(\d{1,2})[T\s](\d{1,2}):(\d{2})(?::(\d{2}))?")
});
static ISO_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b(\d{4})-(\d{1,2})-(\d{1,2})"));
static SLASH_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"));
static MONTH_FIRST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s*(?:of\s+)?(\d{{4}}))?"
    ))
});
static DAY_FIRST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b\.?(?:,?\s*(\d{{4}}))?"
    ))
});
static YEAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b(1[5-9]\d{2}|2[01]\d{2})\b"));
static RELATIVE_DAY: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\b(today|tomorrow|yesterday)\b"));

static MINUTE_OFFSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\b([a-z0-9]+(?:[\s-][a-z0-9]+)?)\s+minutes?\s+(before|to|shy\s+of|short\s+of|till|until|past|after)\s+({ANCHOR})"
    ))
});
static QUARTER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(&format!(r"(?i)\b(quarter|half)\s+(past|after|to|before|till)\s+({ANCHOR})"))
});
static CLOCK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r"(?i)\b(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([ap])\.?m\b\.?)?")
});
static HOUR_MERIDIEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\b(\d{1,2})\s*([ap])\.?m\b"));
static MIDNIGHT_NOON: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?i)\b(midnight|noon|midday)\b"));

fn captures<'t>(pattern: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    pattern.as_ref()?.captures(text)
}

fn group<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

/// Named days that pin a month and day; the year comes from context.
/// Longer names first so "indian independence day" wins over
/// "independence day".
const HOLIDAYS: &[(&str, u32, u32)] = &[
    ("indian independence day", 8, 15),
    ("independence day", 7, 4),
    ("christmas eve", 12, 24),
    ("christmas", 12, 25),
    ("new year's eve", 12, 31),
    ("new years eve", 12, 31),
    ("new year's day", 1, 1),
    ("new years day", 1, 1),
    ("halloween", 10, 31),
    ("valentine's day", 2, 14),
];

/// Rule-based resolver for common English date and time phrases.
///
/// Phrases without a year borrow one from elsewhere in the text, falling
/// back to the reference date's year. Relative days (`today`, `tomorrow`)
/// are computed from the reference date.
#[derive(Debug, Clone)]
pub struct HeuristicResolver {
    reference: NaiveDate,
}

impl HeuristicResolver {
    /// A resolver anchored at the local current date.
    pub fn new() -> Self {
        Self::with_reference(Local::now().date_naive())
    }

    pub fn with_reference(reference: NaiveDate) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn resolve_date(&self, text: &str) -> Option<NaiveDate> {
        if let Some(c) = captures(&ISO_DATE, text) {
            return NaiveDate::from_ymd_opt(group(&c, 1)?, group(&c, 2)?, group(&c, 3)?);
        }
        if let Some(c) = captures(&SLASH_DATE, text) {
            return NaiveDate::from_ymd_opt(group(&c, 3)?, group(&c, 1)?, group(&c, 2)?);
        }
        if let Some(c) = captures(&MONTH_FIRST, text) {
            let month = month_number(c.get(1)?.as_str())?;
            let year = group(&c, 3).unwrap_or_else(|| self.contextual_year(text));
            return NaiveDate::from_ymd_opt(year, month, group(&c, 2)?);
        }
        if let Some(c) = captures(&DAY_FIRST, text) {
            let month = month_number(c.get(2)?.as_str())?;
            let year = group(&c, 3).unwrap_or_else(|| self.contextual_year(text));
            return NaiveDate::from_ymd_opt(year, month, group(&c, 1)?);
        }

        let lower = text.to_lowercase().replace('\u{2019}', "'");
        if let Some((_, month, day)) = HOLIDAYS.iter().find(|(name, _, _)| lower.contains(name)) {
            return NaiveDate::from_ymd_opt(self.contextual_year(text), *month, *day);
        }

        let c = captures(&RELATIVE_DAY, text)?;
        let offset = match c.get(1)?.as_str().to_lowercase().as_str() {
            "tomorrow" => 1,
            "yesterday" => -1,
            _ => 0,
        };
        self.reference.checked_add_signed(Duration::days(offset))
    }

    pub fn resolve_time(&self, text: &str) -> Option<NaiveTime> {
        if let Some(c) = captures(&ISO_DATE_TIME, text) {
            return NaiveTime::from_hms_opt(group(&c, 4)?, group(&c, 5)?, group(&c, 6).unwrap_or(0));
        }
        if let Some(c) = captures(&MINUTE_OFFSET, text) {
            if let Some(minutes) = minutes_phrase(c.get(1)?.as_str()) {
                return offset_time(c.get(2)?.as_str(), minutes, c.get(3)?.as_str());
            }
        }
        if let Some(c) = captures(&QUARTER, text) {
            let minutes = if c.get(1)?.as_str().eq_ignore_ascii_case("half") { 30 } else { 15 };
            return offset_time(c.get(2)?.as_str(), minutes, c.get(3)?.as_str());
        }
        if let Some(c) = captures(&CLOCK, text) {
            let hour = with_meridiem(group(&c, 1)?, c.get(4).map(|m| m.as_str()))?;
            let second = group(&c, 3).unwrap_or(0);
            return NaiveTime::from_hms_opt(hour, group(&c, 2)?, second);
        }
        if let Some(c) = captures(&HOUR_MERIDIEM, text) {
            let hour = with_meridiem(group(&c, 1)?, c.get(2).map(|m| m.as_str()))?;
            return NaiveTime::from_hms_opt(hour, 0, 0);
        }
        let c = captures(&MIDNIGHT_NOON, text)?;
        let minutes = anchor_minutes(c.get(1)?.as_str(), false)?;
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
    }

    pub fn resolve_date_time(&self, text: &str) -> Option<NaiveDateTime> {
        if let Some(c) = captures(&ISO_DATE_TIME, text) {
            let date = NaiveDate::from_ymd_opt(group(&c, 1)?, group(&c, 2)?, group(&c, 3)?)?;
            let time = NaiveTime::from_hms_opt(group(&c, 4)?, group(&c, 5)?, group(&c, 6).unwrap_or(0))?;
            return Some(date.and_time(time));
        }
        Some(self.resolve_date(text)?.and_time(self.resolve_time(text)?))
    }

    fn contextual_year(&self, text: &str) -> i32 {
        captures(&YEAR, text)
            .and_then(|c| group(&c, 1))
            .unwrap_or_else(|| self.reference.year())
    }
}

impl Default for HeuristicResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalResolver for HeuristicResolver {
    fn resolve(&self, text: &str, kind: ValueKind) -> Option<String> {
        match kind {
            ValueKind::Date => self.resolve_date(text).map(|d| d.format(DATE_FORMAT).to_string()),
            ValueKind::Time => self.resolve_time(text).map(|t| t.format(TIME_FORMAT).to_string()),
            ValueKind::DateTime => self
                .resolve_date_time(text)
                .map(|dt| dt.format(DATE_TIME_FORMAT).to_string()),
            _ => None,
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// 12-hour clock to 24-hour; `None` meridiem leaves the hour as written.
fn with_meridiem(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem.map(|m| m.to_ascii_lowercase()) {
        None => (hour < 24).then_some(hour),
        Some(m) if (1..=12).contains(&hour) => Some(match (m.as_str(), hour) {
            ("a", 12) => 0,
            ("p", 12) => 12,
            ("p", h) => h + 12,
            (_, h) => h,
        }),
        Some(_) => None,
    }
}

/// Minutes since midnight for an anchor. Midnight counts as 24:00 when
/// something is measured backwards from it.
fn anchor_minutes(anchor: &str, backwards: bool) -> Option<u32> {
    let anchor = anchor.trim().to_lowercase();
    match anchor.as_str() {
        "midnight" => return Some(if backwards { 24 * 60 } else { 0 }),
        "noon" | "midday" => return Some(12 * 60),
        _ => {}
    }

    let digits_end = anchor
        .find(|c: char| !c.is_ascii_digit() && c != ':')
        .unwrap_or(anchor.len());
    let (clock, rest) = anchor.split_at(digits_end);
    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse().ok()?, 0),
    };
    let meridiem = rest.trim().chars().next().map(|c| c.to_string());
    let hour = with_meridiem(hour, meridiem.as_deref())?;
    (minute < 60).then_some(hour * 60 + minute)
}

fn offset_time(direction: &str, minutes: u32, anchor: &str) -> Option<NaiveTime> {
    let direction = direction.to_lowercase();
    let backwards = !matches!(direction.as_str(), "past" | "after");
    let base = anchor_minutes(anchor, backwards)? as i64;
    let total = if backwards {
        base - minutes as i64
    } else {
        base + minutes as i64
    };
    let total = total.rem_euclid(24 * 60) as u32;
    NaiveTime::from_hms_opt(total / 60, total % 60, 0)
}

/// "fifteen", "twenty-five", "just 10" (the last word carries the number).
fn minutes_phrase(phrase: &str) -> Option<u32> {
    let words: Vec<String> = phrase
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    if let [tens, ones] = words.as_slice() {
        if let (Some(t), Some(o)) = (tens_word(tens), unit_word(ones)) {
            if (1..10).contains(&o) {
                return Some(t + o);
            }
        }
    }

    let last = words.last()?;
    last.parse::<u32>()
        .ok()
        .or_else(|| unit_word(last))
        .or_else(|| tens_word(last))
        .filter(|m| *m < 24 * 60)
}

fn unit_word(word: &str) -> Option<u32> {
    const UNITS: [&str; 20] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen",
    ];
    UNITS.iter().position(|u| *u == word).map(|p| p as u32)
}

fn tens_word(word: &str) -> Option<u32> {
    match word {
        "twenty" => Some(20),
        "thirty" => Some(30),
        "forty" => Some(40),
        "fifty" => Some(50),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> HeuristicResolver {
        HeuristicResolver::with_reference(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    const EVENING_OF_1968: &str = "The tranquility pervaded the evening of 1968, just fifteen minutes \
        shy of midnight, following the celebrations of Independence Day.";

    #[test]
    fn holiday_with_contextual_year() {
        let r = resolver();
        assert_eq!(r.resolve_date(EVENING_OF_1968), Some(date(1968, 7, 4)));
        assert_eq!(
            r.resolve_date("In 1968, amidst the fading echoes of Indian Independence Day"),
            Some(date(1968, 8, 15))
        );
    }

    #[test]
    fn minutes_shy_of_midnight() {
        assert_eq!(resolver().resolve_time(EVENING_OF_1968), Some(time(23, 45, 0)));
    }

    #[test]
    fn date_time_combines_both() {
        let dt = resolver().resolve_date_time(EVENING_OF_1968).unwrap();
        assert_eq!(dt, date(1968, 7, 4).and_time(time(23, 45, 0)));
    }

    #[test]
    fn written_dates() {
        let r = resolver();
        assert_eq!(r.resolve_date("born on July 4th of 1968"), Some(date(1968, 7, 4)));
        assert_eq!(r.resolve_date("March 5, 2021"), Some(date(2021, 3, 5)));
        assert_eq!(r.resolve_date("the 25th of December 1999"), Some(date(1999, 12, 25)));
        assert_eq!(r.resolve_date("12/31/2020"), Some(date(2020, 12, 31)));
        assert_eq!(r.resolve_date("2021-03-05"), Some(date(2021, 3, 5)));
    }

    #[test]
    fn missing_year_uses_reference() {
        assert_eq!(resolver().resolve_date("on Christmas"), Some(date(2024, 12, 25)));
        assert_eq!(resolver().resolve_date("Sept 1"), Some(date(2024, 9, 1)));
    }

    #[test]
    fn relative_days() {
        let r = resolver();
        assert_eq!(r.resolve_date("tomorrow"), Some(date(2024, 3, 11)));
        assert_eq!(r.resolve_date("Yesterday evening"), Some(date(2024, 3, 9)));
    }

    #[test]
    fn clock_forms() {
        let r = resolver();
        assert_eq!(r.resolve_time("at 7:30 pm"), Some(time(19, 30, 0)));
        assert_eq!(r.resolve_time("23:45:10"), Some(time(23, 45, 10)));
        assert_eq!(r.resolve_time("12 a.m."), Some(time(0, 0, 0)));
        assert_eq!(r.resolve_time("around 9am"), Some(time(9, 0, 0)));
        assert_eq!(r.resolve_time("at noon"), Some(time(12, 0, 0)));
        assert_eq!(r.resolve_time("midnight"), Some(time(0, 0, 0)));
    }

    #[test]
    fn offsets_and_quarters() {
        let r = resolver();
        assert_eq!(r.resolve_time("twenty-five minutes past 3 pm"), Some(time(15, 25, 0)));
        assert_eq!(r.resolve_time("10 minutes to noon"), Some(time(11, 50, 0)));
        assert_eq!(r.resolve_time("quarter to 5:00 pm"), Some(time(16, 45, 0)));
        assert_eq!(r.resolve_time("half past midnight"), Some(time(0, 30, 0)));
    }

    #[test]
    fn nothing_to_resolve() {
        let r = resolver();
        assert_eq!(r.resolve_date("no dates here"), None);
        assert_eq!(r.resolve_time("no times here"), None);
        assert_eq!(r.resolve_date_time("1968 and nothing else"), None);
    }

    #[test]
    fn parse_temporal_strict_stage() {
        let r = resolver();
        assert_eq!(
            parse_temporal(EVENING_OF_1968, ValueKind::Time, &r).unwrap(),
            ParsedValue::Time(time(23, 45, 0))
        );
        let err = parse_temporal("sometime", ValueKind::Date, &r).unwrap_err();
        assert_eq!(err.target, "date");
    }

    struct Fixed(&'static str);

    impl TemporalResolver for Fixed {
        fn resolve(&self, _text: &str, _kind: ValueKind) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn resolver_output_must_be_canonical() {
        let err = parse_temporal("whatever", ValueKind::Date, &Fixed("July 4 1968")).unwrap_err();
        assert!(err.reason.contains("not a valid date"));
        assert_eq!(
            parse_temporal("whatever", ValueKind::Date, &Fixed("1968-07-04")).unwrap(),
            ParsedValue::Date(date(1968, 7, 4))
        );
    }

    #[test]
    fn canonical_output_resolves_to_itself() {
        let r = resolver();
        for (text, kind) in [
            ("1968-07-04", ValueKind::Date),
            ("23:45:00", ValueKind::Time),
            ("1968-07-04T23:45:00", ValueKind::DateTime),
        ] {
            assert_eq!(r.resolve(text, kind).as_deref(), Some(text));
        }
    }

    #[test]
    fn time_taken_from_full_timestamp() {
        assert_eq!(resolver().resolve_time("2024-01-02T10:30:00"), Some(time(10, 30, 0)));
    }
}

//! Normalisation des dates sources
//!
//! Les valeurs sans décalage sont interprétées à l'heure de Taipei (+08:00).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

const TAIPEI_OFFSET_SECS: i32 = 8 * 3600;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Fuseau +08:00
pub fn taipei() -> FixedOffset {
    // 8h est toujours dans les bornes acceptées
    FixedOffset::east_opt(TAIPEI_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Instant courant à +08:00
pub fn now_taipei() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&taipei())
}

/// Interprète une date dans l'un des formats publiés
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return localize(naive);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return localize(date.and_hms_opt(0, 0, 0)?);
        }
    }
    parse_roc_date(raw).and_then(|d| localize(d.and_hms_opt(0, 0, 0)?))
}

/// Date du calendrier ROC (`1130512` -> 2024-05-12, année + 1911)
pub fn parse_roc_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !(6..=7).contains(&raw.len()) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = raw.split_at(raw.len() - 4);
    let year: i32 = year.parse().ok()?;
    let month: u32 = rest[..2].parse().ok()?;
    let day: u32 = rest[2..].parse().ok()?;
    NaiveDate::from_ymd_opt(year + 1911, month, day)
}

/// Date ROC à minuit, heure de Taipei
pub fn parse_roc_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    localize(parse_roc_date(raw)?.and_hms_opt(0, 0, 0)?)
}

fn localize(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    taipei().from_local_datetime(&naive).single()
}

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp encodings seen in GPX exports, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `2020-01-02T15:04:05Z`, `2020-01-02T15:04:05.123+02:00`
    Rfc3339,
    /// `2020-01-02T15:04:05.000Z`
    MillisZulu,
    /// `2020-01-02T15:04:05-0700`, `2020-01-02T15:04:05.123+0200`
    CompactOffset,
    /// `2020-01-02 15:04:05+07:00`
    SpaceOffset,
}

const LAYOUTS: [Layout; 4] = [
    Layout::Rfc3339,
    Layout::MillisZulu,
    Layout::CompactOffset,
    Layout::SpaceOffset,
];

impl Layout {
    fn parse(self, text: &str) -> Option<DateTime<Utc>> {
        match self {
            Layout::Rfc3339 if has_rfc3339_shape(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Layout::Rfc3339 => None,
            Layout::MillisZulu => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.3fZ")
                .ok()
                .map(|t| t.and_utc()),
            Layout::CompactOffset => DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Layout::SpaceOffset => DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%:z")
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%SZ")
                        .ok()
                        .map(|t| t.and_utc().fixed_offset())
                })
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// `parse_from_rfc3339` also takes a lowercase `t`/`z`, a space separator and
/// offsets without a colon. Only the uppercase `T` form with `Z` or `+hh:mm`
/// counts here; the other shapes go through their own layouts.
fn has_rfc3339_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.get(10) != Some(&b'T') {
        return false;
    }
    if bytes.last() == Some(&b'Z') {
        return true;
    }
    match bytes.len().checked_sub(6).map(|start| &bytes[start..]) {
        Some([sign, h1, h2, b':', m1, m2]) => {
            matches!(*sign, b'+' | b'-') && [h1, h2, m1, m2].iter().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Parses `text` with the first matching layout. Returns `None` when nothing
/// matches; callers drop such points rather than guessing a time.
pub fn normalize(text: &str) -> Option<DateTime<Utc>> {
    LAYOUTS.iter().find_map(|layout| layout.parse(text))
}

use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Audit rows are stored as `TIMESTAMP` (no zone), always in UTC.
pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn unix_millis(value: OffsetDateTime) -> i128 {
    value.unix_timestamp_nanos() / 1_000_000
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn sample() -> OffsetDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms_milli(10, 20, 30, 250).unwrap();
        PrimitiveDateTime::new(date, time).assume_utc()
    }

    #[test]
    fn to_primitive_utc_normalizes_offset() {
        let shifted = sample().to_offset(UtcOffset::from_hms(3, 0, 0).unwrap());
        let primitive = to_primitive_utc(shifted);
        assert_eq!(primitive.hour(), 10);
        assert_eq!(primitive.minute(), 20);
    }

    #[test]
    fn unix_millis_keeps_millisecond_precision() {
        assert_eq!(unix_millis(sample()), 1_735_813_230_250);
    }

    #[test]
    fn format_offset_preserves_offset() {
        let whole = sample().replace_millisecond(0).unwrap();
        let shifted = whole.to_offset(UtcOffset::from_hms(3, 0, 0).unwrap());
        assert_eq!(format_offset(shifted), "2025-01-02T13:20:30+03:00");
    }
}

//! Timeout parsing and Go-style duration formatting.
//!
//! Input uses the `humantime` grammar (`5m`, `1h30m`, `2h 15min`, `90s`). The
//! CRD field is a Go `metav1.Duration`, so values written to the wire use the
//! Go `time.Duration` string form (`5m0s`, `1h30m0s`, `1.5s`, `250ms`).

use std::time::Duration;

use keel_core::{KeelError, KeelResult};

pub fn parse_timeout(text: &str) -> KeelResult<Duration> {
    humantime::parse_duration(text.trim()).map_err(|e| KeelError::InvalidDuration {
        text: text.to_string(),
        reason: e.to_string(),
    })
}

pub fn format_go_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", scaled(nanos, 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", scaled(nanos, 1_000_000, 6));
    }
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let secs = match d.subsec_nanos() {
        0 => s.to_string(),
        sub => format!("{}.{}", s, format!("{:09}", sub).trim_end_matches('0')),
    };
    if h > 0 {
        format!("{}h{}m{}s", h, m, secs)
    } else if m > 0 {
        format!("{}m{}s", m, secs)
    } else {
        format!("{}s", secs)
    }
}

fn scaled(nanos: u128, unit: u128, digits: usize) -> String {
    let (whole, rem) = (nanos / unit, nanos % unit);
    if rem == 0 {
        whole.to_string()
    } else {
        let frac = format!("{:0width$}", rem, width = digits);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_forms() {
        assert_eq!(parse_timeout("5m").expect("5m"), Duration::from_secs(300));
        assert_eq!(parse_timeout("1h30m").expect("1h30m"), Duration::from_secs(5400));
        assert_eq!(parse_timeout("2h 15min").expect("spaced"), Duration::from_secs(8100));
        assert_eq!(parse_timeout(" 90s ").expect("trimmed"), Duration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["abc", "5", "m5", "-5m", ""] {
            match parse_timeout(bad) {
                Err(KeelError::InvalidDuration { text, .. }) => assert_eq!(text, bad),
                other => panic!("{bad:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn formats_like_go() {
        assert_eq!(format_go_duration(Duration::ZERO), "0s");
        assert_eq!(format_go_duration(Duration::from_secs(300)), "5m0s");
        assert_eq!(format_go_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_go_duration(Duration::from_secs(7200)), "2h0m0s");
        assert_eq!(format_go_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_go_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_go_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_go_duration(Duration::from_nanos(42)), "42ns");
    }

    #[test]
    fn formatted_output_parses_back() {
        for secs in [1u64, 59, 60, 61, 3599, 3600, 86_400] {
            let d = Duration::from_secs(secs);
            assert_eq!(parse_timeout(&format_go_duration(d)).expect("reparse"), d);
        }
    }
}

//! Table-driven response header parsing
//!
//! Each response type declares a table mapping a canonical (lowercase) header
//! name to a setter. The whole header block is applied at once after the
//! response arrives; headers missing from the table are ignored.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Stores one header value into a target
pub(crate) type Setter<T> = fn(&mut T, &str);

/// Header name to setter table
pub(crate) type HeaderTable<T> = &'static [(&'static str, Setter<T>)];

/// Apply every recognized header in `headers` to `target`
pub(crate) fn apply<T: 'static>(headers: &HeaderMap, table: HeaderTable<T>, target: &mut T) {
    for (name, set) in table {
        let value = headers
            .get(*name)
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok());
        if let Some(value) = value {
            set(target, value.trim());
        }
    }
}

/// Build a default value and apply `table` to it
pub(crate) fn parse<T: Default + 'static>(headers: &HeaderMap, table: HeaderTable<T>) -> T {
    let mut target = T::default();
    apply(headers, table, &mut target);
    target
}

pub(crate) fn parse_u64(value: &str) -> Option<u64> {
    value.parse().ok()
}

/// Cloud Files sends "True"/"False"
pub(crate) fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Parse an HTTP-date such as `Wed, 21 Oct 2015 07:28:00 GMT`
pub(crate) fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// ETags are sometimes quoted
pub(crate) fn unquote(value: &str) -> String {
    value.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[derive(Default)]
    struct Sample {
        count: u64,
        enabled: bool,
    }

    const SAMPLE: HeaderTable<Sample> = &[
        ("x-count", |p: &mut Sample, v: &str| p.count = parse_u64(v).unwrap_or(0)),
        ("x-enabled", |p: &mut Sample, v: &str| p.enabled = parse_bool(v)),
    ];

    #[test]
    fn test_apply_table() {
        let mut headers = HeaderMap::new();
        headers.insert("x-count", HeaderValue::from_static(" 42 "));
        headers.insert("x-enabled", HeaderValue::from_static("True"));
        headers.insert("x-unrelated", HeaderValue::from_static("ignored"));

        let sample: Sample = parse(&headers, SAMPLE);
        assert_eq!(sample.count, 42);
        assert!(sample.enabled);
    }

    #[test]
    fn test_apply_accepts_utf8_values() {
        #[derive(Default)]
        struct Named {
            name: String,
        }
        const NAMED: HeaderTable<Named> =
            &[("x-name", |n: &mut Named, v: &str| n.name = v.to_string())];

        let mut headers = HeaderMap::new();
        headers.insert("x-name", HeaderValue::from_bytes("Zürich".as_bytes()).unwrap());

        let named: Named = parse(&headers, NAMED);
        assert_eq!(named.name, "Zürich");
    }

    #[test]
    fn test_missing_headers_keep_defaults() {
        let sample: Sample = parse(&HeaderMap::new(), SAMPLE);
        assert_eq!(sample.count, 0);
        assert!(!sample.enabled);
    }

    #[test]
    fn test_http_date() {
        let date = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(date.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("abc"), "abc");
    }
}

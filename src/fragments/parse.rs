//! # Fragment document parser.
//!
//! ```yaml
//! topics:
//!   access-log:
//!     topic: web-access       # required
//!     type: kafkalog          # required
//!     broker: kafka           # required
//!     retention: 24h          # optional; bare numbers are hours
//!     ack: -1                 # optional; -1 (default), 0 or 1
//! ```
//!
//! ## Rules
//! - scalars may be written quoted or unquoted (`ack: -1` and `ack: "-1"` are equal);
//! - the first invalid topic rejects the whole document;
//! - `type` and `broker` are only checked for presence here, the compiler resolves them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::model::{AckLevel, Topic};
use crate::error::FragmentError;

/// One `<number><unit>` segment of a duration.
static DURATION_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("duration segment regex")
});

#[derive(Debug, Default, Deserialize)]
struct RawFragment {
    #[serde(default)]
    topics: BTreeMap<String, Option<RawTopic>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTopic {
    topic: Option<Scalar>,
    #[serde(rename = "type")]
    kind: Option<Scalar>,
    broker: Option<Scalar>,
    retention: Option<Scalar>,
    ack: Option<Scalar>,
}

/// Any YAML scalar, read back as text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

fn text(value: &Option<Scalar>) -> String {
    value.as_ref().map(Scalar::to_string).unwrap_or_default()
}

/// Parses a fragment document into its topics.
pub fn parse(data: &str) -> Result<BTreeMap<String, Topic>, FragmentError> {
    let raw: RawFragment = serde_yaml::from_str(data)?;
    if raw.topics.is_empty() {
        return Err(FragmentError::NoTopics);
    }
    raw.topics
        .into_iter()
        .map(|(name, topic)| {
            let topic = build_topic(&name, topic.unwrap_or_default())?;
            Ok((name, topic))
        })
        .collect()
}

/// Reads and parses a fragment file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, Topic>, FragmentError> {
    let data = std::fs::read_to_string(path)?;
    parse(&data)
}

fn build_topic(name: &str, raw: RawTopic) -> Result<Topic, FragmentError> {
    let missing = |field| FragmentError::MissingField {
        topic: name.to_string(),
        field,
    };
    let topic = text(&raw.topic);
    if topic.is_empty() {
        return Err(missing("topic"));
    }
    let kind = text(&raw.kind);
    if kind.is_empty() {
        return Err(missing("type"));
    }
    let broker = text(&raw.broker);
    if broker.is_empty() {
        return Err(missing("broker"));
    }
    let retention = parse_retention(name, &text(&raw.retention))?;
    let ack = parse_ack(name, &text(&raw.ack))?;

    Ok(Topic {
        topic,
        kind,
        broker,
        retention,
        ack,
    })
}

/// Parses a retention value.
///
/// - `""` → `Ok(None)` (no explicit retention)
/// - a duration (`"24h"`, `"90m"`, `"1h30m"`, `"1.5h"`) → that duration
/// - a bare number (`"24"`) → that many hours
/// - zero or negative → [`FragmentError::NonPositiveRetention`]
///
/// # Example
/// ```
/// use std::time::Duration;
/// use feedvisor::fragments::parse_retention;
///
/// assert_eq!(parse_retention("app", "").unwrap(), None);
/// assert_eq!(parse_retention("app", "24").unwrap(), Some(Duration::from_secs(24 * 3600)));
/// assert!(parse_retention("app", "-1h").is_err());
/// ```
pub fn parse_retention(topic: &str, value: &str) -> Result<Option<Duration>, FragmentError> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = parse_duration(value).or_else(|| parse_duration(&format!("{value}h")));
    match parsed {
        None => Err(FragmentError::InvalidRetention {
            topic: topic.to_string(),
            value: value.to_string(),
        }),
        Some((negative, d)) if negative || d.is_zero() => Err(FragmentError::NonPositiveRetention {
            topic: topic.to_string(),
            value: value.to_string(),
        }),
        Some((_, d)) => Ok(Some(d)),
    }
}

fn parse_ack(topic: &str, value: &str) -> Result<i64, FragmentError> {
    if value.is_empty() {
        return Ok(AckLevel::default().level());
    }
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(AckLevel::from_level)
        .map(AckLevel::level)
        .ok_or_else(|| FragmentError::UnknownAck {
            topic: topic.to_string(),
            value: value.to_string(),
        })
}

/// Parses a signed sequence of `<number><unit>` segments.
///
/// Returns `(negative, magnitude)`; `None` if the text is not a duration.
fn parse_duration(s: &str) -> Option<(bool, Duration)> {
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Some((negative, Duration::ZERO));
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = DURATION_SEGMENT.captures(rest)?;
        let consumed = caps.get(0)?.end();
        let unit = unit_nanos(caps.get(2)?.as_str())?;

        let number = caps.get(1)?.as_str();
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut nanos = whole.checked_mul(unit)?;
        if !frac.is_empty() {
            let scale = 10u128.checked_pow(u32::try_from(frac.len()).ok()?)?;
            let frac: u128 = frac.parse().ok()?;
            nanos = nanos.checked_add(frac.checked_mul(unit)? / scale)?;
        }
        total = total.checked_add(nanos)?;
        rest = &rest[consumed..];
    }

    let secs = u64::try_from(total / 1_000_000_000).ok()?;
    let subsec = u32::try_from(total % 1_000_000_000).ok()?;
    Some((negative, Duration::new(secs, subsec)))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_parse_two_topics_with_defaults() {
        let data = r#"
topics:
  componenta:
    topic: TOPIC
    type: TYPE
    broker: BROKER
    retention: 24h
    ack: -1
  componenta2:
    topic: TOPIC2
    type: TYPE2
    broker: BROKER2
"#;
        let topics = parse(data).unwrap();
        assert_eq!(topics.len(), 2);

        let a = &topics["componenta"];
        assert_eq!(a.topic, "TOPIC");
        assert_eq!(a.kind, "TYPE");
        assert_eq!(a.broker, "BROKER");
        assert_eq!(a.retention, Some(24 * HOUR));
        assert_eq!(a.ack, -1);

        let b = &topics["componenta2"];
        assert_eq!(b.topic, "TOPIC2");
        assert_eq!(b.retention, None);
        assert_eq!(b.ack, -1);
    }

    #[test]
    fn test_quoted_and_unquoted_scalars_are_equal() {
        let data = "topics:\n  a: {topic: t, type: kafkalog, broker: kafka, ack: \"1\", retention: \"48\"}\n  b: {topic: t, type: kafkalog, broker: kafka, ack: 1, retention: 48}\n";
        let topics = parse(data).unwrap();
        assert_eq!(topics["a"].ack, 1);
        assert_eq!(topics["a"], topics["b"]);
        assert_eq!(topics["b"].retention, Some(48 * HOUR));
    }

    #[test]
    fn test_document_without_topics_is_rejected() {
        assert!(matches!(parse("topics: {}"), Err(FragmentError::NoTopics)));
        assert!(matches!(parse("other: 1"), Err(FragmentError::NoTopics)));
        assert!(matches!(parse("topics: [1, 2"), Err(FragmentError::Yaml(_))));
    }

    #[test]
    fn test_missing_fields_are_named() {
        let err = parse("topics:\n  a: {type: kafkalog, broker: kafka}\n").unwrap_err();
        assert!(matches!(err, FragmentError::MissingField { field: "topic", .. }));

        let err = parse("topics:\n  a: {topic: t, broker: kafka}\n").unwrap_err();
        assert!(matches!(err, FragmentError::MissingField { field: "type", .. }));

        let err = parse("topics:\n  a: {topic: t, type: kafkalog, broker: \"\"}\n").unwrap_err();
        assert!(matches!(err, FragmentError::MissingField { field: "broker", .. }));

        let err = parse("topics:\n  a:\n").unwrap_err();
        assert!(matches!(err, FragmentError::MissingField { field: "topic", .. }));
    }

    #[test]
    fn test_unknown_ack_is_rejected() {
        let err = parse("topics:\n  a: {topic: t, type: kafkalog, broker: kafka, ack: 2}\n")
            .unwrap_err();
        assert_eq!(err.as_label(), "fragment_unknown_ack");

        let err = parse("topics:\n  a: {topic: t, type: kafkalog, broker: kafka, ack: all}\n")
            .unwrap_err();
        assert_eq!(err.as_label(), "fragment_unknown_ack");
    }

    #[test]
    fn test_retention_rules() {
        assert_eq!(parse_retention("t", "").unwrap(), None);
        assert_eq!(parse_retention("t", "24").unwrap(), Some(24 * HOUR));
        assert_eq!(parse_retention("t", "24h").unwrap(), Some(24 * HOUR));
        assert_eq!(
            parse_retention("t", "1h30m").unwrap(),
            Some(Duration::from_secs(5400))
        );
        assert_eq!(
            parse_retention("t", "1.5h").unwrap(),
            Some(Duration::from_secs(5400))
        );
        assert_eq!(
            parse_retention("t", "500ms").unwrap(),
            Some(Duration::from_millis(500))
        );

        let err = parse_retention("t", "-1h").unwrap_err();
        assert_eq!(err.as_label(), "fragment_non_positive_retention");
        let err = parse_retention("t", "0").unwrap_err();
        assert_eq!(err.as_label(), "fragment_non_positive_retention");
        let err = parse_retention("t", "forever").unwrap_err();
        assert_eq!(err.as_label(), "fragment_invalid_retention");
    }

    #[test]
    fn test_duration_grammar() {
        assert_eq!(parse_duration("2m3s"), Some((false, Duration::from_secs(123))));
        assert_eq!(parse_duration("-2s"), Some((true, Duration::from_secs(2))));
        assert_eq!(parse_duration(".5s"), Some((false, Duration::from_millis(500))));
        assert_eq!(parse_duration("10us"), Some((false, Duration::from_micros(10))));
        assert_eq!(parse_duration("1"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("-"), None);
        assert_eq!(parse_duration("1d"), None);
    }

    #[test]
    fn test_parse_file_reports_io_errors() {
        let err = parse_file("/no/such/kafkafeeder.yaml").unwrap_err();
        assert_eq!(err.as_label(), "fragment_io");
    }
}

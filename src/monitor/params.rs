//! String-keyed monitor configuration.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Options for a single poll, as read from a poller configuration.
///
/// Keys are free-form; each monitor reads the ones it understands
/// (`retry`, `timeout` in milliseconds, `port`) and ignores the rest. A value
/// that does not parse, or is out of range for its accessor, yields the
/// accessor's default.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use snmp_poller::monitor::MonitorParameters;
///
/// let params: MonitorParameters = [("retry", "3"), ("timeout", "oops")].into_iter().collect();
/// assert_eq!(params.retry(0), 3);
/// assert_eq!(params.timeout(Duration::from_millis(800)), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorParameters {
    values: HashMap<String, String>,
}

impl MonitorParameters {
    /// Empty parameter set; every accessor returns its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of keys set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Integer value of `key`, or `default`.
    pub fn int(&self, key: &str, default: i64) -> i64 {
        self.parsed(key).unwrap_or(default)
    }

    /// `retry`: resends after the first attempt.
    pub fn retry(&self, default: u32) -> u32 {
        self.parsed("retry").unwrap_or(default)
    }

    /// `timeout`, in milliseconds.
    pub fn timeout(&self, default: Duration) -> Duration {
        self.parsed::<u64>("timeout")
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    /// `port`.
    pub fn port(&self, default: u16) -> u16 {
        self.parsed("port").unwrap_or(default)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.trim().parse().ok()
    }

    /// Build from `key=value` strings, as given on a command line.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment.as_ref())?;
            params.insert(key, value);
        }
        Ok(params)
    }
}

/// Split `key=value`. The key must be non-empty; the value may be.
pub fn parse_assignment(s: &str) -> Result<(&str, &str)> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(Error::invalid_argument(format!(
            "expected key=value, got {:?}",
            s
        ))),
    }
}

impl<K, V> FromIterator<(K, V)> for MonitorParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for MonitorParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let params = MonitorParameters::new();
        assert_eq!(params.retry(2), 2);
        assert_eq!(params.port(110), 110);
        assert_eq!(params.int("anything", -5), -5);
        assert_eq!(
            params.timeout(Duration::from_millis(800)),
            Duration::from_millis(800)
        );
    }

    #[test]
    fn test_unparsable_falls_back() {
        let params = MonitorParameters::new()
            .with("retry", "-1")
            .with("port", "70000")
            .with("timeout", "soon");
        assert_eq!(params.retry(2), 2);
        assert_eq!(params.port(143), 143);
        assert_eq!(
            params.timeout(Duration::from_secs(3)),
            Duration::from_secs(3)
        );
        assert_eq!(params.int("retry", 0), -1);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let params = MonitorParameters::new().with("timeout", " 50 ");
        assert_eq!(params.timeout(Duration::ZERO), Duration::from_millis(50));
    }

    #[test]
    fn test_from_assignments() {
        let params = MonitorParameters::from_assignments(["retry=1", "port = 1110", "note="]).unwrap();
        assert_eq!(params.retry(0), 1);
        assert_eq!(params.port(0), 1110);
        assert_eq!(params.get("note"), Some(""));

        let err = MonitorParameters::from_assignments(["retry"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(MonitorParameters::from_assignments(["=5"]).is_err());
    }
}

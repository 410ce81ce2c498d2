use super::{nanos, ModelError};
use crate::codec::{self, CodecError, Distribution};
use crate::status::StatusCode;
use crate::threshold::LatencySummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Latency at a given percentile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyDistribution {
    pub percentage: i32,
    #[serde(with = "nanos")]
    pub latency: Duration,
}

/// One histogram bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket mark in seconds.
    pub mark: f64,
    pub count: u64,
    /// Share of results in the bucket, as a decimal fraction.
    pub frequency: f64,
}

/// Load generator options the run was executed with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(rename = "cname", default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qps: Option<u64>,
    /// Test duration, nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(rename = "dialTimeout", default, skip_serializing_if = "Option::is_none")]
    pub dial_timeout: Option<u64>,
    #[serde(
        rename = "keepAlice",
        alias = "keepalive",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub keepalive_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Text columns of a stored run.
///
/// Produced by [`Run::encode_columns`] immediately before a write and handed
/// by value to [`Run::decode_columns`] immediately after a read, so the
/// encoded form never outlives the storage call that needed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunColumns {
    pub error_dist: String,
    pub status_code_dist: String,
    pub options: String,
}

/// One execution of a load test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "testID", default)]
    pub test_id: i64,
    #[serde(default)]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, with = "nanos")]
    pub total: Duration,
    #[serde(default, with = "nanos")]
    pub average: Duration,
    #[serde(default, with = "nanos")]
    pub fastest: Duration,
    #[serde(default, with = "nanos")]
    pub slowest: Duration,
    #[serde(default)]
    pub rps: f64,
    #[serde(default)]
    pub status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    #[serde(
        rename = "errorDistribution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_dist: Option<Distribution>,
    #[serde(
        rename = "statusCodeDistribution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code_dist: Option<Distribution>,
    #[serde(rename = "latencyDistribution", default)]
    pub latency_distribution: Vec<LatencyDistribution>,
    #[serde(default)]
    pub histogram: Vec<Bucket>,
}

impl Run {
    pub fn new(test_id: i64) -> Self {
        Self {
            test_id,
            ..Default::default()
        }
    }

    /// True when the error distribution has at least one entry.
    pub fn has_errors(&self) -> bool {
        self.error_dist.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Aggregates compared against test thresholds: the run average plus the
    /// 50th, 95th and 99th percentile entries of the latency distribution
    /// (zero when a percentile is missing).
    pub fn latency_summary(&self) -> LatencySummary {
        let percentile = |p: i32| {
            self.latency_distribution
                .iter()
                .find(|l| l.percentage == p)
                .map(|l| l.latency)
                .unwrap_or_default()
        };
        LatencySummary {
            mean: self.average,
            median: percentile(50),
            p95: percentile(95),
            p99: percentile(99),
        }
    }

    /// Validate the test reference and derive the run status: a run with any
    /// recorded error is a failed run.
    pub fn prepare_write(&mut self) -> Result<(), ModelError> {
        if self.test_id <= 0 {
            return Err(ModelError::MissingParent {
                child: "run",
                parent: "test",
            });
        }
        self.status = if self.has_errors() {
            StatusCode::Fail
        } else {
            StatusCode::Ok
        };
        Ok(())
    }

    /// Encode the transient maps into their stored text form.
    pub fn encode_columns(&self) -> Result<RunColumns, CodecError> {
        let options = match &self.options {
            Some(o) => codec::encode_value("options", o)?,
            None => String::new(),
        };
        Ok(RunColumns {
            error_dist: codec::encode_distribution("error_dist", self.error_dist.as_ref())?,
            status_code_dist: codec::encode_distribution(
                "status_code_dist",
                self.status_code_dist.as_ref(),
            )?,
            options,
        })
    }

    /// Populate the in-memory maps from freshly read columns. The columns
    /// are consumed; only the decoded form remains visible.
    pub fn decode_columns(&mut self, columns: RunColumns) -> Result<(), CodecError> {
        self.error_dist = codec::decode_distribution("error_dist", &columns.error_dist)?;
        self.status_code_dist =
            codec::decode_distribution("status_code_dist", &columns.status_code_dist)?;
        self.options = codec::decode_value("options", &columns.options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(pairs: &[(&str, u64)]) -> Distribution {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn write_requires_test() {
        let mut r = Run::new(0);
        assert_eq!(
            r.prepare_write(),
            Err(ModelError::MissingParent {
                child: "run",
                parent: "test"
            })
        );
    }

    #[test]
    fn status_follows_error_distribution() {
        let mut r = Run::new(1);
        r.status = StatusCode::Fail;
        r.error_dist = Some(Distribution::new());
        r.prepare_write().unwrap();
        assert_eq!(r.status, StatusCode::Ok);

        r.error_dist = Some(dist(&[("rpc error: unavailable", 3)]));
        r.prepare_write().unwrap();
        assert_eq!(r.status, StatusCode::Fail);
        assert!(r.has_errors());
    }

    #[test]
    fn columns_round_trip() {
        let mut r = Run::new(1);
        r.error_dist = Some(dist(&[("foo", 1), ("bar", 2)]));
        r.status_code_dist = Some(dist(&[("OK", 10), ("Unavailable", 2)]));
        r.options = Some(Options {
            call: Some("helloworld.Greeter.SayHello".into()),
            n: Some(200),
            c: Some(50),
            ..Default::default()
        });

        let columns = r.encode_columns().unwrap();
        assert_eq!(columns.error_dist, r#"{"bar":2,"foo":1}"#);

        let mut loaded = Run::new(1);
        loaded.decode_columns(columns).unwrap();
        assert_eq!(loaded.error_dist, r.error_dist);
        assert_eq!(loaded.status_code_dist, r.status_code_dist);
        assert_eq!(loaded.options, r.options);
    }

    #[test]
    fn empty_maps_encode_to_empty_columns_and_read_back_absent() {
        let mut r = Run::new(1);
        r.error_dist = Some(Distribution::new());
        let columns = r.encode_columns().unwrap();
        assert_eq!(columns, RunColumns::default());

        let mut loaded = Run::new(1);
        loaded.decode_columns(columns).unwrap();
        assert_eq!(loaded.error_dist, None);
        assert_eq!(loaded.status_code_dist, None);
        assert_eq!(loaded.options, None);
    }

    #[test]
    fn corrupt_column_fails_decode() {
        let mut loaded = Run::new(1);
        let err = loaded
            .decode_columns(RunColumns {
                status_code_dist: "{\"OK\":".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("status_code_dist"));
    }

    #[test]
    fn latency_summary_picks_percentiles() {
        let mut r = Run::new(1);
        r.average = Duration::from_millis(7);
        r.latency_distribution = [10, 50, 95, 99]
            .iter()
            .map(|p| LatencyDistribution {
                percentage: *p,
                latency: Duration::from_millis(*p as u64),
            })
            .collect();
        let s = r.latency_summary();
        assert_eq!(s.mean, Duration::from_millis(7));
        assert_eq!(s.median, Duration::from_millis(50));
        assert_eq!(s.p95, Duration::from_millis(95));
        assert_eq!(s.p99, Duration::from_millis(99));

        let empty = Run::new(1).latency_summary();
        assert_eq!(empty, LatencySummary::default());
    }

    #[test]
    fn options_keepalive_wire_key() {
        let o: Options = serde_json::from_str(r#"{"keepAlice": 5, "dialTimeout": 2}"#).unwrap();
        assert_eq!(o.keepalive_time, Some(5));
        assert_eq!(o.dial_timeout, Some(2));

        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["keepAlice"], 5);
        assert!(v.get("keepalive").is_none());

        let o: Options = serde_json::from_str(r#"{"keepalive": 7}"#).unwrap();
        assert_eq!(o.keepalive_time, Some(7));
    }
}

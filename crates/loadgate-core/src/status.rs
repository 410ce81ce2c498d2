//! Pass/fail status shared by tests, thresholds and runs.
//!
//! Decoding is lenient: anything that is not `"fail"` (in any
//! case) is read back as [`StatusCode::Ok`]. Unknown status text is never
//! rejected, only defaulted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusCode {
    #[default]
    Ok,
    Fail,
}

impl StatusCode {
    /// Canonical textual form: `"ok"` or `"fail"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Fail => "fail",
            StatusCode::Ok => "ok",
        }
    }

    /// Case-insensitive parse; `"fail"` maps to `Fail`, everything else to `Ok`.
    pub fn from_str_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("fail") {
            StatusCode::Fail
        } else {
            StatusCode::Ok
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, StatusCode::Fail)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StatusCode {
    fn from(s: &str) -> Self {
        Self::from_str_lenient(s)
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Non-string JSON (null, numbers) also falls back to Ok.
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => Self::from_str_lenient(&s),
            _ => StatusCode::Ok,
        })
    }
}

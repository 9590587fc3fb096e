// ── Typed response schemas ──
//
// The control protocol's responses are loosely-typed frames; this module
// pins an explicit schema per read command (`stats`, `summary`, `pools`)
// and fails closed on mismatch instead of propagating missing fields.
// Numeric fields arrive as numbers from some firmwares and as quoted
// strings from others, so they decode through a tolerant helper.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Error;

// ── Envelope ────────────────────────────────────────────────────────

/// The leading `STATUS` section every response carries.
/// `flag` is `"S"` for success, `"E"` for a device-level rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusLine {
    #[serde(rename = "STATUS")]
    pub flag: String,
    #[serde(rename = "Msg", default)]
    pub msg: Option<String>,
    #[serde(rename = "Code", default)]
    pub code: Option<i64>,
}

impl StatusLine {
    pub fn is_success(&self) -> bool {
        self.flag == "S"
    }
}

// ── Command payloads ────────────────────────────────────────────────

/// One entry of the `summary` payload: whole-device hashing totals.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    #[serde(rename = "Elapsed", default)]
    pub elapsed_secs: Option<u64>,
    #[serde(rename = "GHS 5s", deserialize_with = "flex_f64")]
    pub ghs_5s: f64,
    #[serde(rename = "GHS av", default, deserialize_with = "flex_f64_opt")]
    pub ghs_avg: Option<f64>,
    #[serde(rename = "Accepted", default)]
    pub accepted: Option<u64>,
    #[serde(rename = "Rejected", default)]
    pub rejected: Option<u64>,
    #[serde(rename = "Power", default, deserialize_with = "flex_f64_opt")]
    pub power_w: Option<f64>,
}

/// One entry of the `stats` payload: thermals, fans, and power draw.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsEntry {
    #[serde(rename = "temp1", default, deserialize_with = "flex_f64_opt")]
    pub temp_inlet_c: Option<f64>,
    #[serde(rename = "temp2", default, deserialize_with = "flex_f64_opt")]
    pub temp_outlet_c: Option<f64>,
    #[serde(rename = "temp3", default, deserialize_with = "flex_f64_opt")]
    pub temp_chip_c: Option<f64>,
    #[serde(rename = "fan1", default)]
    pub fan1_rpm: Option<u32>,
    #[serde(rename = "fan2", default)]
    pub fan2_rpm: Option<u32>,
    #[serde(rename = "power", default, deserialize_with = "flex_f64_opt")]
    pub power_w: Option<f64>,
}

impl StatsEntry {
    /// Fastest reported fan, if any fan is reported at all.
    pub fn fan_rpm(&self) -> Option<u32> {
        match (self.fan1_rpm, self.fan2_rpm) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

/// One entry of the `pools` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEntry {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Priority", default)]
    pub priority: Option<u32>,
    #[serde(rename = "Accepted", default)]
    pub accepted: Option<u64>,
    #[serde(rename = "Rejected", default)]
    pub rejected: Option<u64>,
}

// ── Per-command response types ──────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    #[serde(rename = "STATUS")]
    pub status: Vec<StatusLine>,
    #[serde(rename = "SUMMARY")]
    pub summary: Vec<Summary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "STATUS")]
    pub status: Vec<StatusLine>,
    #[serde(rename = "STATS")]
    pub stats: Vec<StatsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolsResponse {
    #[serde(rename = "STATUS")]
    pub status: Vec<StatusLine>,
    #[serde(rename = "POOLS")]
    pub pools: Vec<PoolEntry>,
}

// ── Decoding ────────────────────────────────────────────────────────

/// Decode a raw response value into a typed per-command schema,
/// rejecting device-level error statuses and empty payloads.
fn decode_envelope<T>(value: &Value, expect: &str) -> Result<T, Error>
where
    T: for<'de> Deserialize<'de>,
{
    check_status(value)?;
    if value.get(expect).is_none() {
        return Err(Error::decode(
            format!("response missing `{expect}` section"),
            &value.to_string(),
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| Error::decode(format!("`{expect}` schema mismatch: {e}"), &value.to_string()))
}

/// Inspect the `STATUS` section alone: `Rejected` on an `"E"` flag,
/// `Decode` when the section is missing or malformed.
pub fn check_status(value: &Value) -> Result<(), Error> {
    let status: Vec<StatusLine> = value
        .get("STATUS")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| Error::decode(format!("malformed STATUS section: {e}"), &value.to_string()))?
        .ok_or_else(|| Error::decode("response missing STATUS section", &value.to_string()))?;

    let Some(line) = status.first() else {
        return Err(Error::decode("empty STATUS section", &value.to_string()));
    };
    if line.is_success() {
        Ok(())
    } else {
        Err(Error::Rejected {
            message: line.msg.clone().unwrap_or_else(|| "unspecified".into()),
        })
    }
}

pub fn decode_summary(value: &Value) -> Result<SummaryResponse, Error> {
    let resp: SummaryResponse = decode_envelope(value, "SUMMARY")?;
    if resp.summary.is_empty() {
        return Err(Error::decode("empty SUMMARY payload", &value.to_string()));
    }
    Ok(resp)
}

pub fn decode_stats(value: &Value) -> Result<StatsResponse, Error> {
    let resp: StatsResponse = decode_envelope(value, "STATS")?;
    if resp.stats.is_empty() {
        return Err(Error::decode("empty STATS payload", &value.to_string()));
    }
    Ok(resp)
}

pub fn decode_pools(value: &Value) -> Result<PoolsResponse, Error> {
    decode_envelope(value, "POOLS")
}

// ── Tolerant numeric decoding ───────────────────────────────────────

fn parse_flex(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flex_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(de)?;
    parse_flex(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected number or numeric string, got {value}")))
}

fn flex_f64_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(de)?;
    if value.is_null() {
        return Ok(None);
    }
    parse_flex(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("expected number or numeric string, got {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ok_status() -> Value {
        json!([{ "STATUS": "S", "Msg": "ok", "Code": 11 }])
    }

    #[test]
    fn decode_summary_with_string_hashrate() {
        let value = json!({
            "STATUS": ok_status(),
            "SUMMARY": [{ "Elapsed": 3600, "GHS 5s": "13500.72", "Accepted": 42 }]
        });
        let resp = decode_summary(&value).unwrap();
        assert!((resp.summary[0].ghs_5s - 13500.72).abs() < f64::EPSILON);
        assert_eq!(resp.summary[0].accepted, Some(42));
    }

    #[test]
    fn decode_summary_requires_hashrate() {
        let value = json!({
            "STATUS": ok_status(),
            "SUMMARY": [{ "Elapsed": 3600 }]
        });
        let err = decode_summary(&value).unwrap_err();
        assert!(err.is_decode(), "expected decode failure, got {err:?}");
    }

    #[test]
    fn decode_stats_reads_thermals() {
        let value = json!({
            "STATUS": ok_status(),
            "STATS": [{ "temp1": 52.0, "temp2": 68.5, "temp3": "81", "fan1": 5640, "fan2": 5700, "power": 3250 }]
        });
        let resp = decode_stats(&value).unwrap();
        let entry = &resp.stats[0];
        assert_eq!(entry.temp_chip_c, Some(81.0));
        assert_eq!(entry.fan_rpm(), Some(5700));
        assert_eq!(entry.power_w, Some(3250.0));
    }

    #[test]
    fn error_status_maps_to_rejected() {
        let value = json!({
            "STATUS": [{ "STATUS": "E", "Msg": "Invalid command", "Code": 14 }]
        });
        let err = check_status(&value).unwrap_err();
        assert!(
            matches!(err, Error::Rejected { ref message } if message == "Invalid command"),
            "got {err:?}"
        );
    }

    #[test]
    fn missing_section_fails_closed() {
        let value = json!({ "STATUS": ok_status() });
        assert!(decode_stats(&value).is_err());
        assert!(decode_summary(&value).is_err());
        assert!(decode_pools(&value).is_err());
    }

    #[test]
    fn empty_pools_payload_is_valid() {
        let value = json!({ "STATUS": ok_status(), "POOLS": [] });
        let resp = decode_pools(&value).unwrap();
        assert!(resp.pools.is_empty());
    }
}

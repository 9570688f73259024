//! Data model shared by the engine, the storage layer and the HTTP surface.

use serde::{Deserialize, Serialize};

/// One detected signal source and its measured strength.
///
/// On the wire this is `{ "bssid": "...", "rssi": -60 }`, the shape mobile
/// clients report. Ids are not unique within a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalObservation {
    #[serde(rename = "bssid")]
    pub id: String,
    #[serde(rename = "rssi")]
    pub strength: i32,
}

impl SignalObservation {
    pub fn new(id: impl Into<String>, strength: i32) -> Self {
        Self { id: id.into(), strength }
    }
}

/// Ordered observations describing "where am I now".
pub type QueryFingerprint = Vec<SignalObservation>;

/// A stored fingerprint tied to a known position label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: i64,
    pub label: String,
    pub fingerprint: Vec<SignalObservation>,
}

impl ReferenceRecord {
    pub fn new(id: i64, label: impl Into<String>, fingerprint: Vec<SignalObservation>) -> Self {
        Self { id, label: label.into(), fingerprint }
    }
}

/// Similarity of one reference record to the query. Only built for records
/// sharing at least one signal with the query, so `overlap_count >= 1` and
/// both derived floats are finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub record_id: i64,
    pub label: String,
    pub overlap_count: usize,
    pub strength_diff_sum: u64,
    pub average_diff: f64,
    /// `average_diff / overlap_count`; lower is a better match.
    pub ratio: f64,
}

/// Majority-vote result of one estimation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEstimate {
    #[serde(rename = "Position")]
    pub label: String,
    #[serde(rename = "k_count")]
    pub vote_count: usize,
}

impl PositionEstimate {
    /// Label reported when no reference record matched.
    pub const NOT_FOUND: &'static str = "not found";

    pub fn not_found() -> Self {
        Self { label: Self::NOT_FOUND.to_string(), vote_count: 0 }
    }

    pub fn is_found(&self) -> bool {
        self.vote_count > 0
    }
}

impl Default for PositionEstimate {
    fn default() -> Self {
        Self::not_found()
    }
}

/// Request body accepted by the `/test`, `/add` and `/findPosition` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReport {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub wifi_data: Vec<SignalObservation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_uses_wire_names() {
        let obs: SignalObservation =
            serde_json::from_str(r#"{"bssid":"aa:bb:cc:dd:ee:ff","rssi":-61}"#).unwrap();
        assert_eq!(obs, SignalObservation::new("aa:bb:cc:dd:ee:ff", -61));
        let back = serde_json::to_value(&obs).unwrap();
        assert_eq!(back["bssid"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(back["rssi"], -61);
    }

    #[test]
    fn test_estimate_response_shape() {
        let est = PositionEstimate { label: "room-101".into(), vote_count: 3 };
        let v = serde_json::to_value(&est).unwrap();
        assert_eq!(v["Position"], "room-101");
        assert_eq!(v["k_count"], 3);
        assert!(!PositionEstimate::default().is_found());
        assert_eq!(PositionEstimate::default().label, "not found");
    }

    #[test]
    fn test_report_fields_default_when_missing() {
        let report: PositionReport =
            serde_json::from_str(r#"{"wifi_data":[{"bssid":"w1","rssi":-50}]}"#).unwrap();
        assert!(report.position.is_empty());
        assert!(report.password.is_empty());
        assert_eq!(report.wifi_data.len(), 1);
    }
}

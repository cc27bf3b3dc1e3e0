use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Polling mode for a sport: in-play or upcoming matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Live,
    PreMatch,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => write!(f, "Live"),
            Mode::PreMatch => write!(f, "PreMatch"),
        }
    }
}

/// One polling identity: a sport name plus the mode it is polled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportMode {
    pub sport: String,
    pub mode: Mode,
}

/// Market criterion attached to a bet offer or outcome.
///
/// The upstream payload carries these as free-form maps; the fields the
/// pipeline actually reads are typed here and everything else lands in
/// `extra` so nothing is lost when a record is re-serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_label: Option<String>,
    /// Selection index/indices within the market (e.g. set number).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Criterion {
    /// True when the upstream sent no criterion at all (empty map).
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.english_label.is_none()
            && self.order.is_empty()
            && self.participant.is_none()
            && self.extra.is_empty()
    }
}

/// One segment of the upstream navigation path (sport / region / league).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Event envelope as returned by the upstream listing and detail calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: i64,
    #[serde(default)]
    pub home_name: String,
    #[serde(default)]
    pub away_name: String,
    /// Scheduled start, ISO-8601.
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

/// One raw selection inside a bet offer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutcome {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub bet_offer_id: i64,
    /// Upstream type tag, e.g. "OT_HOME" or "OT_OVER".
    #[serde(rename = "type", default)]
    pub outcome_type: String,
    /// Scaled x1000 by the upstream source.
    #[serde(default)]
    pub line: f64,
    /// Scaled x1000 by the upstream source.
    #[serde(default)]
    pub odds: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub criterion: Criterion,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One bookmaker market: a suspension flag plus its selections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBetOffer {
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub outcomes: Vec<RawOutcome>,
    #[serde(default)]
    pub criterion: Criterion,
}

/// Detail payload for a single match: its event plus all open markets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatchPayload {
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub bet_offers: Vec<RawBetOffer>,
}

/// Listing response: an array of envelopes, each nesting one event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListing {
    #[serde(default)]
    pub events: Vec<ListedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedEvent {
    pub event: RawEvent,
}

/// Lifecycle status of a match at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    PreMatch,
    Live,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::PreMatch => write!(f, "PreMatch"),
            MatchStatus::Live => write!(f, "Live"),
        }
    }
}

/// A classified outcome joined with the numeric fields of its raw source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOutcome {
    /// English label of the originating offer's criterion.
    pub type_name: String,
    /// Canonical bet-type code, e.g. "AH1" or "1HO".
    #[serde(rename = "type")]
    pub code: String,
    pub line: f64,
    pub odds: f64,
    #[serde(rename = "betOfferId")]
    pub bet_offer_id: i64,
    pub id: i64,
    pub criterion: Criterion,
    pub path: Vec<PathSegment>,
}

/// One normalized match as produced by the processor, append-only persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub event_id: i64,
    pub match_name: String,
    /// Scheduled start, unix seconds.
    pub start_time: i64,
    pub home_team: String,
    pub away_team: String,
    pub sport: String,
    pub league: String,
    pub country: String,
    pub outcomes: Vec<CanonicalOutcome>,
    /// Capture timestamp, unix seconds.
    pub time: i64,
    #[serde(rename = "type")]
    pub status: MatchStatus,
}

/// One poll cycle's result set for a single SportMode, keyed by event id.
pub type Batch = HashMap<String, MatchRecord>;

/// Parse an upstream ISO-8601 start time.
pub fn parse_start(start: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_roundtrip_keeps_unknown_fields() {
        let json = r#"{
            "label": "Totaal aantal goals",
            "englishLabel": "Total Goals",
            "order": [0],
            "occurrenceType": "GOALS",
            "lifetime": "FULL_TIME"
        }"#;

        let criterion: Criterion = serde_json::from_str(json).unwrap();
        assert_eq!(criterion.english_label.as_deref(), Some("Total Goals"));
        assert_eq!(criterion.order, vec![0]);
        assert_eq!(
            criterion.extra.get("occurrenceType"),
            Some(&Value::String("GOALS".into()))
        );

        let back = serde_json::to_value(&criterion).unwrap();
        assert_eq!(back["lifetime"], "FULL_TIME");
    }

    #[test]
    fn test_criterion_is_empty() {
        assert!(Criterion::default().is_empty());

        let with_label = Criterion {
            english_label: Some("Match Odds".into()),
            ..Default::default()
        };
        assert!(!with_label.is_empty());
    }

    #[test]
    fn test_match_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::PreMatch).unwrap(),
            "\"PreMatch\""
        );
        assert_eq!(serde_json::to_string(&MatchStatus::Live).unwrap(), "\"Live\"");
    }

    #[test]
    fn test_detail_payload_decoding() {
        let json = r#"{
            "events": [{
                "id": 1006,
                "homeName": "Alcaraz, Carlos",
                "awayName": "Sinner, Jannik",
                "start": "2026-08-08T18:00:00Z",
                "sport": "TENNIS",
                "group": "ATP Cincinnati"
            }],
            "betOffers": [{
                "suspended": false,
                "criterion": {"englishLabel": "Match Odds", "order": [0]},
                "outcomes": [{
                    "id": 9001,
                    "betOfferId": 501,
                    "type": "OT_ONE",
                    "odds": 1850,
                    "status": "OPEN"
                }]
            }]
        }"#;

        let payload: RawMatchPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.events[0].home_name, "Alcaraz, Carlos");
        assert_eq!(payload.bet_offers[0].outcomes[0].odds, 1850.0);
        assert_eq!(payload.bet_offers[0].outcomes[0].outcome_type, "OT_ONE");
    }
}

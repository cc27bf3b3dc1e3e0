//! Turns one raw match detail payload into a normalized `MatchRecord` and
//! appends the record to the per-match audit trail.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::models::{parse_start, CanonicalOutcome, MatchRecord, MatchStatus, RawMatchPayload};
use crate::pipeline::classify::classify;

/// A match is considered in-play once its scheduled start is this far in
/// the past.
const LIVE_GRACE_SECS: i64 = 10 * 60;

/// Outcome status gate: anything else is not offerable right now.
const STATUS_OPEN: &str = "OPEN";

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("detail payload contains no event")]
    MissingEvent,

    #[error("unparsable start time {start:?}: {source}")]
    BadStartTime {
        start: String,
        source: chrono::ParseError,
    },
}

/// Stateless per-match normalizer. The only side effect is the audit write.
pub struct MatchProcessor {
    data_dir: PathBuf,
}

impl MatchProcessor {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Normalize one detail payload.
    ///
    /// Suspended offers are skipped whole; within open offers, only outcomes
    /// whose own status is OPEN and whose offer carries a criterion are
    /// considered, and of those only the classifiable ones survive. A failed
    /// audit write is logged and swallowed — it never invalidates the
    /// in-memory record.
    pub fn process(&self, payload: &RawMatchPayload) -> Result<MatchRecord, ProcessError> {
        let event = payload.events.first().ok_or(ProcessError::MissingEvent)?;

        let start = parse_start(&event.start).map_err(|source| ProcessError::BadStartTime {
            start: event.start.clone(),
            source,
        })?;
        let start_time = start.timestamp();
        let now = Utc::now().timestamp();
        let status = if start_time <= now - LIVE_GRACE_SECS {
            MatchStatus::Live
        } else {
            MatchStatus::PreMatch
        };

        let sport = title_case(&event.sport);

        // Tennis feeds use "Lastname, Firstname" participants and carry no
        // usable league; other sports pass through as-is. Upstream behaves
        // this way and downstream consumers rely on it.
        let (home_team, away_team, league) = if event.sport.eq_ignore_ascii_case("tennis") {
            (
                reorder_name(&event.home_name),
                reorder_name(&event.away_name),
                "Unknown".to_string(),
            )
        } else {
            (
                event.home_name.clone(),
                event.away_name.clone(),
                event.group.clone(),
            )
        };
        let match_name = format!("{} vs {}", home_team, away_team);

        let mut outcomes = Vec::new();
        for offer in &payload.bet_offers {
            if offer.suspended {
                continue;
            }
            for outcome in &offer.outcomes {
                if outcome.status != STATUS_OPEN {
                    continue;
                }
                if offer.criterion.is_empty() {
                    continue;
                }
                // Classification sees the original participant names, not the
                // reordered display names.
                if let Some(code) = classify(
                    outcome,
                    &offer.criterion,
                    &event.home_name,
                    &event.away_name,
                    &sport,
                ) {
                    outcomes.push(CanonicalOutcome {
                        type_name: offer.criterion.english_label.clone().unwrap_or_default(),
                        code,
                        line: outcome.line / 1000.0,
                        odds: outcome.odds / 1000.0,
                        bet_offer_id: outcome.bet_offer_id,
                        id: outcome.id,
                        criterion: offer.criterion.clone(),
                        path: event.path.clone(),
                    });
                }
            }
        }

        let record = MatchRecord {
            event_id: event.id,
            match_name,
            start_time,
            home_team,
            away_team,
            sport,
            league,
            country: "Unknown".to_string(),
            outcomes,
            time: now,
            status,
        };

        if let Err(e) = self.append_audit(&record) {
            warn!(match_name = %record.match_name, error = %e, "audit write failed");
        }

        Ok(record)
    }

    /// Append one record as a JSON line to the match's audit file. The file
    /// is opened and closed per record.
    fn append_audit(&self, record: &MatchRecord) -> Result<()> {
        let name = record.match_name.replace('/', "");
        let path = self.data_dir.join(format!("{name}.jsonl"));

        let line = serde_json::to_string(record).context("Failed to serialize match record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit file {:?}", path))?;
        writeln!(file, "{line}").context("Failed to append audit record")?;

        Ok(())
    }
}

/// "Lastname, Firstname" -> "Firstname Lastname"; anything without a comma
/// passes through unchanged.
fn reorder_name(name: &str) -> String {
    match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => name.to_string(),
    }
}

/// Capitalize each whitespace-separated word ("TENNIS" -> "Tennis").
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, RawBetOffer, RawEvent, RawOutcome};
    use chrono::{Duration, SecondsFormat};

    fn event(home: &str, away: &str, sport: &str, start_offset: Duration) -> RawEvent {
        RawEvent {
            id: 1006,
            home_name: home.to_string(),
            away_name: away.to_string(),
            start: (Utc::now() + start_offset).to_rfc3339_opts(SecondsFormat::Secs, true),
            sport: sport.to_string(),
            group: "Eredivisie".to_string(),
            path: Vec::new(),
        }
    }

    fn match_odds_offer(status: &str, suspended: bool) -> RawBetOffer {
        RawBetOffer {
            suspended,
            criterion: Criterion {
                english_label: Some("Match Odds".to_string()),
                order: vec![0],
                ..Default::default()
            },
            outcomes: vec![RawOutcome {
                id: 9001,
                bet_offer_id: 501,
                outcome_type: "OT_ONE".to_string(),
                line: 0.0,
                odds: 1850.0,
                status: status.to_string(),
                ..Default::default()
            }],
        }
    }

    fn processor() -> (MatchProcessor, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (MatchProcessor::new(dir.path()), dir)
    }

    #[test]
    fn test_missing_event_is_rejected() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload::default();
        assert!(matches!(
            processor.process(&payload),
            Err(ProcessError::MissingEvent)
        ));
    }

    #[test]
    fn test_bad_start_time_is_rejected() {
        let (processor, _dir) = processor();
        let mut ev = event("A", "B", "TENNIS", Duration::hours(1));
        ev.start = "tomorrow-ish".to_string();
        let payload = RawMatchPayload {
            events: vec![ev],
            bet_offers: Vec::new(),
        };
        assert!(matches!(
            processor.process(&payload),
            Err(ProcessError::BadStartTime { .. })
        ));
    }

    #[test]
    fn test_lifecycle_status_derivation() {
        let (processor, _dir) = processor();

        let upcoming = RawMatchPayload {
            events: vec![event("A", "B", "TENNIS", Duration::hours(2))],
            bet_offers: Vec::new(),
        };
        assert_eq!(
            processor.process(&upcoming).unwrap().status,
            MatchStatus::PreMatch
        );

        let started = RawMatchPayload {
            events: vec![event("A", "B", "TENNIS", Duration::hours(-1))],
            bet_offers: Vec::new(),
        };
        assert_eq!(processor.process(&started).unwrap().status, MatchStatus::Live);

        // Inside the ten-minute grace window a match still reports PreMatch.
        let just_started = RawMatchPayload {
            events: vec![event("A", "B", "TENNIS", Duration::minutes(-5))],
            bet_offers: Vec::new(),
        };
        assert_eq!(
            processor.process(&just_started).unwrap().status,
            MatchStatus::PreMatch
        );
    }

    #[test]
    fn test_tennis_names_reordered_and_league_unknown() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload {
            events: vec![event(
                "Alcaraz, Carlos",
                "Sinner, Jannik",
                "TENNIS",
                Duration::hours(1),
            )],
            bet_offers: Vec::new(),
        };

        let record = processor.process(&payload).unwrap();
        assert_eq!(record.home_team, "Carlos Alcaraz");
        assert_eq!(record.away_team, "Jannik Sinner");
        assert_eq!(record.match_name, "Carlos Alcaraz vs Jannik Sinner");
        assert_eq!(record.sport, "Tennis");
        assert_eq!(record.league, "Unknown");
    }

    #[test]
    fn test_football_names_and_league_pass_through() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload {
            events: vec![event("Ajax", "PSV", "FOOTBALL", Duration::hours(1))],
            bet_offers: Vec::new(),
        };

        let record = processor.process(&payload).unwrap();
        assert_eq!(record.home_team, "Ajax");
        assert_eq!(record.sport, "Football");
        assert_eq!(record.league, "Eredivisie");
    }

    #[test]
    fn test_suspended_offers_are_skipped_whole() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload {
            events: vec![event("A, B", "C, D", "TENNIS", Duration::hours(1))],
            bet_offers: vec![match_odds_offer("OPEN", true)],
        };

        let record = processor.process(&payload).unwrap();
        assert!(record.outcomes.is_empty());
    }

    #[test]
    fn test_non_open_outcomes_are_excluded() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload {
            events: vec![event("A, B", "C, D", "TENNIS", Duration::hours(1))],
            bet_offers: vec![match_odds_offer("SUSPENDED", false)],
        };

        let record = processor.process(&payload).unwrap();
        assert!(record.outcomes.is_empty());
    }

    #[test]
    fn test_offers_without_criterion_are_excluded() {
        let (processor, _dir) = processor();
        let mut offer = match_odds_offer("OPEN", false);
        offer.criterion = Criterion::default();
        let payload = RawMatchPayload {
            events: vec![event("A, B", "C, D", "TENNIS", Duration::hours(1))],
            bet_offers: vec![offer],
        };

        let record = processor.process(&payload).unwrap();
        assert!(record.outcomes.is_empty());
    }

    #[test]
    fn test_open_outcome_is_classified_and_descaled() {
        let (processor, _dir) = processor();
        let payload = RawMatchPayload {
            events: vec![event(
                "Alcaraz, Carlos",
                "Sinner, Jannik",
                "TENNIS",
                Duration::hours(1),
            )],
            bet_offers: vec![match_odds_offer("OPEN", false)],
        };

        let record = processor.process(&payload).unwrap();
        assert_eq!(record.outcomes.len(), 1);
        let outcome = &record.outcomes[0];
        assert_eq!(outcome.code, "1");
        assert_eq!(outcome.type_name, "Match Odds");
        assert_eq!(outcome.odds, 1.85);
        assert_eq!(outcome.bet_offer_id, 501);
    }

    #[test]
    fn test_audit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let processor = MatchProcessor::new(dir.path());
        let payload = RawMatchPayload {
            events: vec![event(
                "Alcaraz, Carlos",
                "Sinner, Jannik",
                "TENNIS",
                Duration::hours(1),
            )],
            bet_offers: vec![match_odds_offer("OPEN", false)],
        };

        let first = processor.process(&payload).unwrap();
        let second = processor.process(&payload).unwrap();

        let path = dir
            .path()
            .join(format!("{}.jsonl", first.match_name));
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let decoded: MatchRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded, first);
        let decoded: MatchRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(decoded, second);
    }

    #[test]
    fn test_audit_write_failure_is_swallowed() {
        // Nonexistent directory: the write fails but processing succeeds.
        let processor = MatchProcessor::new("/nonexistent/odds_data");
        let payload = RawMatchPayload {
            events: vec![event("A", "B", "FOOTBALL", Duration::hours(1))],
            bet_offers: Vec::new(),
        };
        assert!(processor.process(&payload).is_ok());
    }

    #[test]
    fn test_reorder_name() {
        assert_eq!(reorder_name("Alcaraz, Carlos"), "Carlos Alcaraz");
        assert_eq!(reorder_name("Ajax"), "Ajax");
        assert_eq!(reorder_name("van de Zandschulp,Botic"), "Botic van de Zandschulp");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("TENNIS"), "Tennis");
        assert_eq!(title_case("football"), "Football");
        assert_eq!(title_case("ice hockey"), "Ice Hockey");
    }
}

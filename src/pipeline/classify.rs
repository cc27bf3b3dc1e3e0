//! Outcome classification: noisy bookmaker market labels to canonical
//! bet-type codes.
//!
//! Each sport gets an ordered table of rules evaluated top to bottom with
//! first-match-wins. A rule can decline (label belongs to another family),
//! match, or reject the label outright — a reject stops the scan, so a label
//! that names a known family but fails that family's stricter checks never
//! leaks into a later rule. Anything unmatched is dropped, by policy: the
//! taxonomy is best-effort, not exhaustive.

use crate::models::{Criterion, RawOutcome};

/// Result of testing one label rule.
enum RuleOutcome {
    /// The label belongs to a different family; keep scanning.
    NotApplicable,
    /// The label matched this family but fails its constraints; drop it.
    Reject,
    /// Matched. For tennis this is a base code awaiting a selection suffix,
    /// for football it is the complete canonical code.
    Match(String),
}

/// Classify one raw outcome against its offer's criterion.
///
/// Returns the canonical bet-type code, or `None` when the outcome is not
/// representable in the taxonomy. `None` is the normal path for exotic
/// markets, not an error.
pub fn classify(
    outcome: &RawOutcome,
    offer_criterion: &Criterion,
    home: &str,
    away: &str,
    sport: &str,
) -> Option<String> {
    let label = offer_criterion
        .english_label
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    // Sub-range markets ("Total Goals: 2-3") are never representable.
    if label.contains(':') {
        return None;
    }

    match sport.to_lowercase().as_str() {
        "tennis" => classify_tennis(&label, &offer_criterion.order, &outcome.outcome_type),
        "football" => classify_football(&label, outcome, home, away),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tennis
// ---------------------------------------------------------------------------

type TennisRule = fn(&str, &[i64]) -> RuleOutcome;

/// Ordered: handicap labels must be claimed before the set-winner family can
/// see the word "set".
const TENNIS_RULES: &[TennisRule] = &[
    tennis_handicap,
    tennis_match_winner,
    tennis_set_winner,
    tennis_totals,
];

fn classify_tennis(label: &str, order: &[i64], outcome_type: &str) -> Option<String> {
    for rule in TENNIS_RULES {
        match rule(label, order) {
            RuleOutcome::NotApplicable => continue,
            RuleOutcome::Reject => return None,
            RuleOutcome::Match(base) => return selection_suffix(&base, outcome_type),
        }
    }
    None
}

/// Append the selection suffix derived from the outcome's own type tag.
fn selection_suffix(base: &str, outcome_type: &str) -> Option<String> {
    match outcome_type {
        "OT_ONE" | "OT_HOME" => Some(format!("{base}1")),
        "OT_TWO" | "OT_AWAY" => Some(format!("{base}2")),
        "OT_OVER" => Some(format!("{base}O")),
        "OT_UNDER" => Some(format!("{base}U")),
        // A draw only exists on the match-winner market; on any other base
        // code it silently produces nothing.
        "OT_CROSS" if base.is_empty() => Some("X".to_string()),
        _ => None,
    }
}

fn tennis_handicap(label: &str, order: &[i64]) -> RuleOutcome {
    if !label.contains("handicap") {
        return RuleOutcome::NotApplicable;
    }
    if label.contains("game") && order == [0] {
        if only_allowed_words(label, &["game", "handicap"]) {
            RuleOutcome::Match("GAH".to_string())
        } else {
            RuleOutcome::Reject
        }
    } else if label.contains("set") && order == [0] {
        if only_allowed_words(label, &["set", "handicap"]) {
            RuleOutcome::Match("AH".to_string())
        } else {
            RuleOutcome::Reject
        }
    } else {
        RuleOutcome::Reject
    }
}

fn tennis_match_winner(label: &str, order: &[i64]) -> RuleOutcome {
    if !(label.contains("match odds") || label == "noteringen wedstrijd") {
        return RuleOutcome::NotApplicable;
    }
    if order == [0] && only_allowed_words(label, &["match", "odds", "noteringen", "wedstrijd"]) {
        RuleOutcome::Match(String::new())
    } else {
        RuleOutcome::Reject
    }
}

fn tennis_set_winner(label: &str, order: &[i64]) -> RuleOutcome {
    if !label.contains("set")
        || label.contains("game")
        || label.contains("point")
        || label.contains("total")
    {
        return RuleOutcome::NotApplicable;
    }
    if let [n @ 1..=5] = order {
        let n_word = n.to_string();
        if only_allowed_words(label, &["set", n_word.as_str()]) {
            return RuleOutcome::Match(format!("{n}H"));
        }
    }
    RuleOutcome::Reject
}

fn tennis_totals(label: &str, order: &[i64]) -> RuleOutcome {
    if !label.contains("total") {
        return RuleOutcome::NotApplicable;
    }
    if label.contains("games") && order == [0] {
        RuleOutcome::Match("G".to_string())
    } else if label.contains("sets") && order == [0] {
        RuleOutcome::Match(String::new())
    } else if label.contains("games") && label.contains("set") {
        if let [n @ 1..=5] = order {
            RuleOutcome::Match(format!("{n}HG"))
        } else {
            RuleOutcome::Reject
        }
    } else {
        RuleOutcome::Reject
    }
}

// ---------------------------------------------------------------------------
// Football
// ---------------------------------------------------------------------------

/// Per-outcome context the football rules read in addition to the offer
/// label: the outcome's own criterion fields and the participant names.
struct FootballCtx<'a> {
    /// Short selection label from the outcome's criterion ("1", "X", "2").
    outcome_label: Option<&'a str>,
    /// Lowercased english label of the outcome's criterion.
    outcome_english: String,
    participant: String,
    home: String,
    away: String,
}

type FootballRule = fn(&str, &FootballCtx<'_>) -> RuleOutcome;

/// Ordered: exact 1X2 labels first, totals before handicap so a combined
/// "asian total" label is claimed by the totals family.
const FOOTBALL_RULES: &[FootballRule] = &[
    football_match_1x2,
    football_first_half_1x2,
    football_second_half_1x2,
    football_totals,
    football_handicap,
];

fn classify_football(label: &str, outcome: &RawOutcome, home: &str, away: &str) -> Option<String> {
    let ctx = FootballCtx {
        outcome_label: outcome.criterion.label.as_deref(),
        outcome_english: outcome
            .criterion
            .english_label
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        participant: outcome
            .criterion
            .participant
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        home: home.to_lowercase(),
        away: away.to_lowercase(),
    };

    for rule in FOOTBALL_RULES {
        match rule(label, &ctx) {
            RuleOutcome::NotApplicable => continue,
            RuleOutcome::Reject => return None,
            RuleOutcome::Match(code) => return Some(code),
        }
    }
    None
}

fn football_match_1x2(label: &str, ctx: &FootballCtx) -> RuleOutcome {
    if !(label == "full time" || label == "1x2") {
        return RuleOutcome::NotApplicable;
    }
    match ctx.outcome_label {
        Some(selection) => RuleOutcome::Match(selection.to_string()),
        None => RuleOutcome::Reject,
    }
}

fn football_first_half_1x2(label: &str, ctx: &FootballCtx) -> RuleOutcome {
    if !(label == "first half 1x2" || label == "half time") {
        return RuleOutcome::NotApplicable;
    }
    match ctx.outcome_label {
        Some(selection) => RuleOutcome::Match(format!("1H{selection}")),
        None => RuleOutcome::Reject,
    }
}

fn football_second_half_1x2(label: &str, ctx: &FootballCtx) -> RuleOutcome {
    if label != "2nd half 1x2" {
        return RuleOutcome::NotApplicable;
    }
    match ctx.outcome_label {
        Some(selection) => RuleOutcome::Match(format!("2H{selection}")),
        None => RuleOutcome::Reject,
    }
}

fn football_totals(label: &str, ctx: &FootballCtx) -> RuleOutcome {
    if !(label.contains("total goals") || label.contains("asian total")) {
        return RuleOutcome::NotApplicable;
    }

    let prefix = if label.contains("first half")
        || label.contains("1e helft")
        || label.contains("1st half")
    {
        "1H"
    } else if label.contains("2nd half") || label.contains("2e helft") {
        "2H"
    } else {
        ""
    };

    // "by <team>" / "door <team>" marks a per-team total.
    if label.contains("by") || label.contains("door") {
        let team = if label.contains(&ctx.home) {
            Some("H")
        } else if label.contains(&ctx.away) {
            Some("A")
        } else {
            None
        };
        if let Some(team) = team {
            if ctx.outcome_english.contains("over") {
                return RuleOutcome::Match(format!("{prefix}T{team}O"));
            }
            if ctx.outcome_english.contains("under") {
                return RuleOutcome::Match(format!("{prefix}T{team}U"));
            }
        }
        RuleOutcome::Reject
    } else if ctx.outcome_english.contains("over") {
        RuleOutcome::Match(format!("{prefix}O"))
    } else if ctx.outcome_english.contains("under") {
        RuleOutcome::Match(format!("{prefix}U"))
    } else {
        RuleOutcome::Reject
    }
}

fn football_handicap(label: &str, ctx: &FootballCtx) -> RuleOutcome {
    // The 3-way handicap variant has no counterpart in the taxonomy.
    if !label.contains("handicap") || label.contains('3') {
        return RuleOutcome::NotApplicable;
    }

    let prefix = if label.contains("1st half")
        || label.contains("1e helft")
        || label.contains("first half")
    {
        "1H"
    } else if label.contains("2nd half")
        || label.contains("2e helft")
        || label.contains("second half")
    {
        "2H"
    } else {
        ""
    };

    if ctx.participant == ctx.home {
        RuleOutcome::Match(format!("{prefix}AH1"))
    } else if ctx.participant == ctx.away {
        RuleOutcome::Match(format!("{prefix}AH2"))
    } else {
        RuleOutcome::Reject
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// True when every whitespace-separated token of `label` appears in the
/// allow-list. An empty label passes trivially.
fn only_allowed_words(label: &str, allowed: &[&str]) -> bool {
    label.split_whitespace().all(|word| allowed.contains(&word))
}

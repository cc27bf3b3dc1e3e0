//! Read-only viewer over the audit directory: an index of captured matches
//! and a per-match page showing the latest captured odds.

use askama::Template;
use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::DateTime;
use oddsfeed::models::MatchRecord;
use std::path::PathBuf;
use tower_http::services::ServeDir;

// Custom filters for formatting
mod filters {
    pub fn format_odds(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}", value))
    }

    pub fn format_line(value: &f64) -> ::askama::Result<String> {
        if *value == 0.0 {
            Ok("-".to_string())
        } else {
            Ok(format!("{:.1}", value))
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    matches: Vec<String>,
}

struct OutcomeRow {
    code: String,
    label: String,
    line: f64,
    odds: f64,
}

struct PeriodSection {
    title: String,
    rows: Vec<OutcomeRow>,
}

#[derive(Template)]
#[template(path = "match.html")]
struct MatchTemplate {
    match_name: String,
    sport: String,
    league: String,
    status: String,
    start: String,
    captured: String,
    sections: Vec<PeriodSection>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

#[derive(Clone)]
struct ViewerState {
    data_dir: PathBuf,
}

async fn index(State(state): State<ViewerState>) -> impl IntoResponse {
    let mut matches = Vec::new();

    if let Ok(entries) = std::fs::read_dir(&state.data_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    matches.push(stem.to_string());
                }
            }
        }
    }
    matches.sort();

    HtmlTemplate(IndexTemplate { matches })
}

async fn match_page(
    UrlPath(name): UrlPath<String>,
    State(state): State<ViewerState>,
) -> Response {
    // The name maps straight to a file; keep it inside the data directory.
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return (StatusCode::NOT_FOUND, "No such match").into_response();
    }

    let path = state.data_dir.join(format!("{name}.jsonl"));
    let record = match load_latest_record(&path) {
        Some(record) => record,
        None => return (StatusCode::NOT_FOUND, "No such match").into_response(),
    };

    HtmlTemplate(MatchTemplate {
        match_name: record.match_name.clone(),
        sport: record.sport.clone(),
        league: record.league.clone(),
        status: record.status.to_string(),
        start: format_timestamp(record.start_time),
        captured: format_timestamp(record.time),
        sections: group_by_period(&record),
    })
    .into_response()
}

/// The audit file is append-only; the last line is the freshest capture.
fn load_latest_record(path: &std::path::Path) -> Option<MatchRecord> {
    let content = std::fs::read_to_string(path).ok()?;
    let line = content.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

/// Split outcomes into full-match, first-half, and second-half sections by
/// canonical-code prefix.
fn group_by_period(record: &MatchRecord) -> Vec<PeriodSection> {
    let mut full = Vec::new();
    let mut first_half = Vec::new();
    let mut second_half = Vec::new();

    for outcome in &record.outcomes {
        let (period, code) = if let Some(rest) = outcome.code.strip_prefix("1H") {
            (&mut first_half, rest)
        } else if let Some(rest) = outcome.code.strip_prefix("2H") {
            (&mut second_half, rest)
        } else {
            (&mut full, outcome.code.as_str())
        };
        period.push(OutcomeRow {
            code: code.to_string(),
            label: outcome.type_name.clone(),
            line: outcome.line,
            odds: outcome.odds,
        });
    }

    let mut sections = Vec::new();
    for (title, mut rows) in [
        ("Match", full),
        ("1st Half", first_half),
        ("2nd Half", second_half),
    ] {
        if rows.is_empty() {
            continue;
        }
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        sections.push(PeriodSection {
            title: title.to_string(),
            rows,
        });
    }
    sections
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let data_dir = std::env::var("ODDS_DATA_DIR").unwrap_or_else(|_| "./odds_data".to_string());
    println!("Serving odds from {}", data_dir);
    println!("\nStarting web server at http://127.0.0.1:3000");
    println!("Press Ctrl+C to stop\n");

    let app = Router::new()
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(index))
        .route("/match/:name", get(match_page))
        .with_state(ViewerState {
            data_dir: PathBuf::from(data_dir),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}

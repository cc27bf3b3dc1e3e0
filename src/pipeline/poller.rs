//! One continuous polling loop per configured (sport, mode) pair.
//!
//! Each cycle lists the sport's matches, fans out one bounded fetch+process
//! unit per listed match, aggregates the survivors into a batch and hands the
//! batch to the distribution channel. Per-match failures only shrink the
//! batch; a listing failure skips the whole cycle. The loop runs until the
//! shared cancellation token fires.

use std::sync::Arc;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{FetchError, KambiClient};
use crate::config::PollingConfig;
use crate::models::{parse_start, Batch, EventListing, RawEvent, SportMode};
use crate::pipeline::process::MatchProcessor;

/// Matches scheduled further out than this are not worth a detail fetch.
const LISTING_HORIZON_HOURS: i64 = 24;

/// Run the polling loop for one SportMode until cancelled.
pub async fn run_sport_poller(
    sm: SportMode,
    client: Arc<KambiClient>,
    processor: Arc<MatchProcessor>,
    batches: mpsc::Sender<Batch>,
    polling: PollingConfig,
    cancel: CancellationToken,
) {
    info!(sport = %sm.sport, mode = %sm.mode, "poller started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match client.list_matches(&sm).await {
            Ok(listing) => {
                let events = filter_listing(listing, &sm, Utc::now());
                debug!(sport = %sm.sport, mode = %sm.mode, candidates = events.len(), "listing filtered");

                let batch = fetch_batch(events, &client, &processor, &cancel).await;
                let matches = batch.len();

                // Blocks when the queue is full: back-pressure from a slow
                // consumer deliberately throttles the poll cadence.
                if batches.send(batch).await.is_err() {
                    info!(sport = %sm.sport, mode = %sm.mode, "batch queue closed, stopping");
                    break;
                }
                info!(sport = %sm.sport, mode = %sm.mode, matches, "published batch");
            }
            Err(e) => {
                // No partial publish: the whole cycle is abandoned.
                warn!(sport = %sm.sport, mode = %sm.mode, error = %e, "listing failed, skipping cycle");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(polling.interval(sm.mode)) => {}
        }
    }

    info!(sport = %sm.sport, mode = %sm.mode, "poller stopped");
}

/// Keep only events worth fetching: the right sport, starting inside the
/// horizon, and not an esports mirror of the real thing. Runs before any
/// detail fetch so rejected matches never consume fetch permits.
pub fn filter_listing(listing: EventListing, sm: &SportMode, now: DateTime<Utc>) -> Vec<RawEvent> {
    let horizon = now + Duration::hours(LISTING_HORIZON_HOURS);

    listing
        .events
        .into_iter()
        .map(|envelope| envelope.event)
        .filter(|event| {
            if !event.sport.eq_ignore_ascii_case(&sm.sport) {
                return false;
            }
            // Unparsable starts pass through here; the processor rejects them.
            if let Ok(start) = parse_start(&event.start) {
                if start.with_timezone(&Utc) >= horizon {
                    return false;
                }
            }
            let home = event.home_name.to_lowercase();
            let away = event.away_name.to_lowercase();
            !home.contains("esport") && !away.contains("esport")
        })
        .collect()
}

/// Fan out one fetch+process unit per event and wait for all of them.
///
/// Outbound concurrency is bounded by the client's permit pool, not here.
/// Successful records race to insert under the batch lock; everything else
/// is logged and dropped.
async fn fetch_batch(
    events: Vec<RawEvent>,
    client: &KambiClient,
    processor: &MatchProcessor,
    cancel: &CancellationToken,
) -> Batch {
    let batch = Mutex::new(Batch::new());

    stream::iter(events)
        .for_each_concurrent(None, |event| {
            let batch = &batch;
            async move {
                // Checked before each unit starts; in-flight fetches are
                // bounded by their own timeout and left to finish.
                if cancel.is_cancelled() {
                    return;
                }
                match client.fetch_match(event.id, cancel).await {
                    Ok(payload) => match processor.process(&payload) {
                        Ok(record) => {
                            let mut map = batch.lock().expect("batch map lock poisoned");
                            map.insert(record.event_id.to_string(), record);
                        }
                        Err(e) => {
                            warn!(match_id = event.id, error = %e, "dropping malformed match")
                        }
                    },
                    Err(FetchError::NotFound) => {
                        debug!(match_id = event.id, "match no longer offered upstream")
                    }
                    Err(FetchError::Cancelled) => {}
                    Err(e) => warn!(match_id = event.id, error = %e, "fetch failed"),
                }
            }
        })
        .await;

    batch.into_inner().expect("batch map lock poisoned")
}

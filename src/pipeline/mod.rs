//! The update pipeline: classification, per-match processing, per-sport
//! polling, and the bounded batch hand-off to the relay.

pub mod classify;
pub mod poller;
pub mod process;

pub use poller::run_sport_poller;
pub use process::{MatchProcessor, ProcessError};

use tokio::sync::mpsc;

use crate::models::Batch;

/// Build the bounded queue carrying completed batches from the pollers to
/// the consumer. The queue decouples poll cadence from consumption; a full
/// queue blocks publishers, so callers size the capacity to at least the
/// number of concurrently polling tasks.
pub fn distribution_channel(capacity: usize) -> (mpsc::Sender<Batch>, mpsc::Receiver<Batch>) {
    mpsc::channel(capacity)
}

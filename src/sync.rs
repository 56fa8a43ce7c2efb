use crate::consul::Publish;
use crate::detector::{ChangeDetector, PollOutcome};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub uploads: u64,
    pub failed_uploads: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: PollOutcome) {
        self.ticks += 1;
        match outcome {
            PollOutcome::Published => self.uploads += 1,
            PollOutcome::PublishFailed => self.failed_uploads += 1,
            _ => {}
        }
    }
}

/// Poll the watched file every `interval` until `shutdown` resolves.
///
/// The first tick runs immediately. The interval is measured from the end of
/// one tick, so a slow upload stretches the period. A tick in progress is
/// always completed before shutdown is honoured.
pub async fn run<P, F>(
    detector: &mut ChangeDetector,
    publisher: &P,
    interval: Duration,
    shutdown: F,
) -> SyncStats
where
    P: Publish + ?Sized,
    F: Future<Output = ()>,
{
    let mut stats = SyncStats::default();
    tokio::pin!(shutdown);

    loop {
        let outcome = detector.poll(publisher).await;
        stats.record(outcome);
        debug!(?outcome, tick = stats.ticks, "Poll tick finished");

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(
        ticks = stats.ticks,
        uploads = stats.uploads,
        failed_uploads = stats.failed_uploads,
        "Stopped watching {}",
        detector.target().path().display()
    );
    stats
}

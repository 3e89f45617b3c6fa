use super::{BatchPipeline, CandidatePolicy};
use crate::error::{AnalystError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Run the batch every `period` until `shutdown` resolves.
///
/// The first run starts immediately. A run that outlasts the period delays
/// the next tick instead of queueing a burst of catch-up runs; overlapping
/// runs from other processes are tolerated by the idempotent upsert.
/// A zero period is rejected.
pub async fn run_every<F>(
    pipeline: &BatchPipeline,
    policy: CandidatePolicy,
    period: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    if period.is_zero() {
        return Err(AnalystError::Validation(
            "schedule period must be positive".into(),
        ));
    }

    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(policy = %policy, period_secs = period.as_secs(), "Scheduler started");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Scheduler stopping");
                break;
            }
            _ = timer.tick() => {
                match pipeline.run(policy).await {
                    Ok(outcomes) => info!(evaluated = outcomes.len(), "Scheduled run complete"),
                    Err(e) => error!("Scheduled run failed: {}", e),
                }
            }
        }
    }
    Ok(())
}

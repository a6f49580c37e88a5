use std::time::Duration;

use bounded_retry::{retry, RetryPolicy};
use cloud_sdk::{EventScheduler, Side};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::CheckResult;
use crate::schedule::burn_in;

/// Per-device budget for posting the burn-in schedule.
pub const BURN_IN_RETRY: RetryPolicy = RetryPolicy::Deadline {
    max_elapsed: Duration::from_secs(120),
    sleep_between: Duration::from_secs(1),
};

#[derive(Debug)]
pub struct BurnInResult {
    pub device_id: String,
    pub result: CheckResult<()>,
}

/// Posts the burn-in schedule starting at `start` to both sides of every
/// device, one device after another. A device that fails does not stop the
/// rest.
pub async fn post_burn_in<S>(
    scheduler: &S,
    device_ids: &[String],
    start: OffsetDateTime,
    policy: RetryPolicy,
) -> Vec<BurnInResult>
where
    S: EventScheduler + ?Sized,
{
    let events = burn_in(start);
    let mut results = Vec::with_capacity(device_ids.len());

    for device_id in device_ids {
        let result = retry(policy, || async {
            for side in Side::BOTH {
                scheduler.put_side_events(device_id, side, &events).await?;
            }
            CheckResult::Ok(())
        })
        .await;

        match &result {
            Ok(()) => info!(%device_id, %start, "burn-in scheduled"),
            Err(err) => warn!(%device_id, error = %err, "burn-in scheduling failed"),
        }
        results.push(BurnInResult {
            device_id: device_id.clone(),
            result,
        });
    }
    results
}

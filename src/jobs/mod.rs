//! Background jobs: the cadence scheduler and the two batch engines

mod scheduler;
pub mod subscriptions;
pub mod traffic;

pub use scheduler::Scheduler;
pub use subscriptions::SubscriptionCheck;
pub use traffic::TrafficReset;

use std::future::Future;

use crate::prelude::*;

/// Upper bound on any single store call made from a batch job.
const OP_TIMEOUT: Duration = Duration::from_secs(20);

/// Runs one store operation under the jobs' bounded deadline.
async fn with_deadline<T>(op: impl Future<Output = Result<T>>) -> Result<T> {
  time::timeout(OP_TIMEOUT, op).await.map_err(|_| Error::Deadline)?
}

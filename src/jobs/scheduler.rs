use std::future::Future;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::prelude::*;

type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
struct Task {
  name: String,
  every: Duration,
  run: Job,
}

/// Fires registered jobs on fixed cadences until stopped. Knows nothing
/// about what the jobs do; engines know nothing about cadences.
pub struct Scheduler {
  tasks: Vec<Task>,
  shutdown: CancellationToken,
}

impl Scheduler {
  pub fn new() -> Self {
    Self { tasks: Vec::new(), shutdown: CancellationToken::new() }
  }

  /// Registers a named job with a `humantime` cadence ("1day", "7days").
  /// A cadence that does not parse is logged and the job is left
  /// unscheduled; startup continues.
  pub fn register<F, Fut>(&mut self, name: &str, cadence: &str, job: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let every = match humantime::parse_duration(cadence) {
      Ok(every) if !every.is_zero() => every,
      Ok(_) => {
        warn!("Task `{name}` has zero cadence, not scheduled");
        return;
      }
      Err(err) => {
        warn!("Task `{name}` has invalid cadence `{cadence}`, not scheduled: {err}");
        return;
      }
    };

    self.tasks.push(Task {
      name: name.to_owned(),
      every,
      run: Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(job()) }),
    });
  }

  /// Spawns one timer loop per registered task. Each task first fires a
  /// full cadence after start.
  pub fn start(&mut self) {
    for task in &self.tasks {
      let task = task.clone();
      let shutdown = self.shutdown.clone();

      tokio::spawn(async move {
        let first = time::Instant::now() + task.every;
        let mut timer = time::interval_at(first, task.every);

        loop {
          tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = timer.tick() => {}
          }

          // shutdown is only observed between runs, so a job in
          // progress always finishes
          debug!("Running task `{}`", task.name);
          (task.run)().await;
        }
      });
    }

    info!("Scheduler started with {} tasks", self.tasks.len());
  }

  /// Halts future firings without interrupting a job already running.
  pub fn stop(&mut self) {
    self.shutdown.cancel();
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.tasks.len()
  }
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new()
  }
}

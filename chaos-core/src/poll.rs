//! Convergence poller.
//!
//! Every scenario phase has the same shape: observe a derived quantity every
//! `interval` until a predicate over it holds, or give up after `deadline`.
//! The poller owns that loop; callers supply the observation, the predicate
//! and an optional per-tick hook (availability bookkeeping, progress).
//!
//! The first observation is taken unconditionally, so an already-true
//! predicate converges at elapsed ~0 whatever the deadline. Deadline
//! accounting is wall-clock from a monotonic start; a slow observation is
//! not subtracted from anything and cannot be cancelled mid-flight.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Outcome of one polling window.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult<O> {
    /// True if the predicate held before the deadline.
    pub converged: bool,
    /// Time from the start of polling to the final decision.
    pub elapsed: Duration,
    /// Number of observations taken.
    pub ticks: u32,
    /// The last observation: the converging one, or the last one seen
    /// before the deadline.
    pub observation: O,
}

/// Passed to the per-tick hook after each non-converging observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based index of the observation that just failed the predicate.
    pub number: u32,
    /// Elapsed time after the sleep that followed it.
    pub elapsed: Duration,
}

/// Fixed-interval poller with a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    deadline: Duration,
}

impl Poller {
    /// Poll every `interval` for at most `deadline`.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Observe until `predicate` holds or the deadline passes.
    pub async fn poll_until<O, E, Obs, Fut, P>(
        &self,
        observe: Obs,
        predicate: P,
    ) -> Result<PollResult<O>, E>
    where
        Obs: FnMut() -> Fut,
        Fut: Future<Output = Result<O, E>>,
        P: FnMut(&O) -> bool,
    {
        self.poll_until_with(observe, predicate, |_, _| {}).await
    }

    /// Like [`Poller::poll_until`], calling `on_tick` after the sleep that
    /// follows every observation that did not satisfy the predicate.
    ///
    /// An error from `observe` aborts polling and is returned as is.
    pub async fn poll_until_with<O, E, Obs, Fut, P, T>(
        &self,
        mut observe: Obs,
        mut predicate: P,
        mut on_tick: T,
    ) -> Result<PollResult<O>, E>
    where
        Obs: FnMut() -> Fut,
        Fut: Future<Output = Result<O, E>>,
        P: FnMut(&O) -> bool,
        T: FnMut(&O, Tick),
    {
        let start = Instant::now();
        let mut ticks = 1;
        let mut observation = observe().await?;

        loop {
            if predicate(&observation) {
                let elapsed = start.elapsed();
                debug!(ticks, elapsed_secs = elapsed.as_secs(), "converged");
                return Ok(PollResult {
                    converged: true,
                    elapsed,
                    ticks,
                    observation,
                });
            }

            if start.elapsed() >= self.deadline {
                break;
            }

            tokio::time::sleep(self.interval).await;

            let tick = Tick {
                number: ticks,
                elapsed: start.elapsed(),
            };
            debug!(tick = tick.number, elapsed_secs = tick.elapsed.as_secs(), "not converged");
            on_tick(&observation, tick);

            if start.elapsed() >= self.deadline {
                break;
            }

            observation = observe().await?;
            ticks += 1;
        }

        let elapsed = start.elapsed();
        debug!(ticks, elapsed_secs = elapsed.as_secs(), "deadline reached");
        Ok(PollResult {
            converged: false,
            elapsed,
            ticks,
            observation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_types::AvailabilityWindow;
    use std::convert::Infallible;

    fn counting(n: &mut u32) -> impl std::future::Future<Output = Result<u32, Infallible>> {
        *n += 1;
        std::future::ready(Ok(*n))
    }

    #[tokio::test(start_paused = true)]
    async fn always_true_converges_immediately() {
        for (interval, deadline) in [(10, 300), (1, 1), (30, 0)] {
            let poller = Poller::new(Duration::from_secs(interval), Duration::from_secs(deadline));
            let mut ticked = false;

            let result = poller
                .poll_until_with(
                    || async { Ok::<_, Infallible>(()) },
                    |_| true,
                    |_, _| ticked = true,
                )
                .await
                .unwrap();

            assert!(result.converged);
            assert_eq!(result.ticks, 1);
            assert_eq!(result.elapsed, Duration::ZERO);
            assert!(!ticked);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_false_stops_at_deadline() {
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(30));
        let mut n = 0;
        let mut hook_calls = 0;

        let result = poller
            .poll_until_with(
                || {
                    n += 1;
                    let v = n;
                    async move { Ok::<_, Infallible>(v) }
                },
                |_| false,
                |_, _| hook_calls += 1,
            )
            .await
            .unwrap();

        assert!(!result.converged);
        assert!(result.elapsed >= Duration::from_secs(30));
        // Observations at t = 0, 5, 10, 15, 20, 25
        assert_eq!(result.ticks, 6);
        assert_eq!(result.observation, 6);
        assert_eq!(hook_calls, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_observes_once() {
        let poller = Poller::new(Duration::from_secs(5), Duration::ZERO);
        let mut n = 0;

        let result = poller
            .poll_until(|| counting(&mut n), |_| false)
            .await
            .unwrap();

        assert!(!result.converged);
        assert_eq!(result.ticks, 1);
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_on_later_tick() {
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(180));
        let mut n = 0;

        let result = poller
            .poll_until(|| counting(&mut n), |v| *v >= 3)
            .await
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.ticks, 3);
        assert_eq!(result.observation, 3);
        assert_eq!(result.elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_elapsed_strictly_increases() {
        let poller = Poller::new(Duration::from_secs(10), Duration::from_secs(60));
        let mut seen: Vec<Tick> = Vec::new();

        poller
            .poll_until_with(
                || async { Ok::<_, Infallible>(()) },
                |_| false,
                |_, tick| seen.push(tick),
            )
            .await
            .unwrap();

        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[1].elapsed > pair[0].elapsed);
            assert_eq!(pair[1].number, pair[0].number + 1);
        }
        assert!(seen.iter().all(|t| t.elapsed <= Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn observation_error_aborts() {
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(60));
        let mut n = 0;

        let result: Result<PollResult<u32>, String> = poller
            .poll_until(
                || {
                    n += 1;
                    let v = n;
                    async move {
                        if v == 2 {
                            Err("AccessDenied".to_string())
                        } else {
                            Ok(v)
                        }
                    }
                },
                |_| false,
            )
            .await;

        assert_eq!(result.unwrap_err(), "AccessDenied");
        assert_eq!(n, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hook_accumulates_availability() {
        // (healthy count, probe result) per tick
        let script: [(u32, bool); 4] = [(2, true), (2, false), (2, true), (1, true)];
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(180));
        let mut i = 0;
        let mut window = AvailabilityWindow::new();

        let result = poller
            .poll_until_with(
                || {
                    let obs = script[i];
                    i += 1;
                    async move { Ok::<_, Infallible>(obs) }
                },
                |&(healthy, _): &(u32, bool)| healthy < 2,
                |&(_, available): &(u32, bool), _| window.record(available),
            )
            .await
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.ticks, 4);
        // The converging observation's sample is not recorded
        assert_eq!(window.checks(), 3);
        assert_eq!(window.successes(), 2);
    }
}

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Shape of the bounded, jittered polling loop that gates persistence.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Poll rounds before giving up, before the round jitter is added.
    pub base_check_count: u32,
    /// Base sleep between saturated rounds.
    pub base_delay: Duration,
    /// Upper bound of the extra rounds drawn once per run.
    pub round_jitter: u32,
    /// Upper bound of the extra sleep drawn fresh each round.
    pub sleep_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_check_count: 3,
            base_delay: Duration::ZERO,
            round_jitter: 3,
            sleep_jitter: Duration::from_millis(1500),
        }
    }
}

/// Terminal state of one controller run. Both variants let the caller
/// proceed: the controller is advisory backpressure, not a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffOutcome {
    /// A round observed the system unsaturated; `rounds` probes were made.
    Cleared { rounds: u32 },
    /// Every round observed saturation; the caller proceeds anyway so the
    /// worst-case added latency stays bounded against the platform timeout.
    Exhausted { rounds: u32 },
}

enum State {
    Polling { round: u32 },
    Done(BackoffOutcome),
}

/// Runs the throttle probe up to `base_check_count + jitter` times, sleeping
/// with fresh jitter between saturated rounds.
///
/// Both jitters stagger concurrent invocations so they do not re-poll in
/// lockstep after observing saturation simultaneously.
pub struct BackoffController {
    policy: BackoffPolicy,
    max_rounds: u32,
}

impl BackoffController {
    /// Draws the round-count jitter once for this run.
    pub fn new(policy: BackoffPolicy) -> Self {
        let extra = rand::thread_rng().gen_range(0..=policy.round_jitter);
        Self {
            max_rounds: policy.base_check_count + extra,
            policy,
        }
    }

    /// Fixed round count, for callers that need determinism.
    pub fn with_max_rounds(policy: BackoffPolicy, max_rounds: u32) -> Self {
        Self { policy, max_rounds }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Polls `saturated` until it clears or the round budget is exhausted.
    /// Rounds are strictly sequential; round k+1 never starts before round
    /// k's sleep completes.
    pub async fn run<F, Fut>(&self, mut saturated: F) -> BackoffOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut state = State::Polling { round: 0 };
        loop {
            state = match state {
                State::Polling { round } if round >= self.max_rounds => {
                    State::Done(BackoffOutcome::Exhausted { rounds: round })
                }
                State::Polling { round } => {
                    if saturated().await {
                        let delay = self.jittered_delay();
                        tracing::info!(
                            round = round + 1,
                            max_rounds = self.max_rounds,
                            delay_ms = delay.as_millis() as u64,
                            "downstream saturated, deferring"
                        );
                        tokio::time::sleep(delay).await;
                        State::Polling { round: round + 1 }
                    } else {
                        State::Done(BackoffOutcome::Cleared { rounds: round + 1 })
                    }
                }
                State::Done(outcome) => return outcome,
            };
        }
    }

    fn jittered_delay(&self) -> Duration {
        let bound = self.policy.sleep_jitter.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=bound);
        self.policy.base_delay + Duration::from_millis(jitter)
    }
}

//! Adaptive concurrency control
//!
//! This module handles:
//! - Sizing the baseline concurrency from host CPU count and memory
//! - Adjusting batch size and inter-batch delay from each batch's error rate

use std::time::Duration;

use sysinfo::System;

/// Error rate above which the crawl backs off
const BACKOFF_ERROR_RATE: f64 = 0.3;

/// Error rate below which the crawl speeds back up
const RECOVERY_ERROR_RATE: f64 = 0.1;

/// Delay added per consecutive bad batch
const BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Delay removed per good batch
const RECOVERY_STEP: Duration = Duration::from_millis(500);

/// Lowest baseline ever derived from the host
pub const MIN_BASELINE_CONCURRENCY: usize = 200;

const GIB: u64 = 1024 * 1024 * 1024;

/// Derives the baseline concurrency for a host
///
/// More memory allows more sockets per core; the result is never below
/// [`MIN_BASELINE_CONCURRENCY`].
pub fn baseline_concurrency(cpus: usize, total_memory_bytes: u64) -> usize {
    let per_cpu = if total_memory_bytes >= 64 * GIB {
        25
    } else if total_memory_bytes >= 32 * GIB {
        15
    } else {
        10
    };

    cpus.saturating_mul(per_cpu).max(MIN_BASELINE_CONCURRENCY)
}

/// Queries the host and derives its baseline concurrency
pub fn detect_baseline_concurrency() -> usize {
    let cpus = num_cpus::get();
    let mut system = System::new();
    system.refresh_memory();
    let memory = system.total_memory();

    let baseline = baseline_concurrency(cpus, memory);
    tracing::info!(
        "Host has {} CPUs and {:.1} GiB memory; baseline concurrency {}",
        cpus,
        memory as f64 / GIB as f64,
        baseline
    );
    baseline
}

/// Summary of one completed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// URLs fetched in the batch
    pub size: usize,

    /// Fetches that ended in an error
    pub errors: usize,

    /// Whether any fetch came back as 429 or 503
    pub rate_limited: bool,
}

impl BatchOutcome {
    pub fn error_rate(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.errors as f64 / self.size as f64
        }
    }
}

/// Multiplicative-decrease / multiplicative-increase batch sizer
///
/// Starts at the baseline. A bad batch halves the concurrency and grows the
/// inter-batch delay by one second per consecutive bad batch; a clean batch
/// grows concurrency by 20% back toward the baseline and trims the delay.
#[derive(Debug, Clone)]
pub struct AdaptiveThrottle {
    baseline: usize,
    min_concurrency: usize,
    max_backoff: Duration,
    concurrency: usize,
    delay: Duration,
    streak: u32,
}

impl AdaptiveThrottle {
    pub fn new(baseline: usize, min_concurrency: usize, max_backoff: Duration) -> Self {
        let baseline = baseline.max(1);
        Self {
            baseline,
            min_concurrency: min_concurrency.clamp(1, baseline),
            max_backoff,
            concurrency: baseline,
            delay: Duration::ZERO,
            streak: 0,
        }
    }

    /// Current batch size
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Current inter-batch delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Consecutive bad batches, decayed by good ones
    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn baseline(&self) -> usize {
        self.baseline
    }

    /// Folds a finished batch into the policy
    pub fn observe(&mut self, outcome: BatchOutcome) {
        if outcome.size == 0 {
            return;
        }

        let error_rate = outcome.error_rate();

        if outcome.rate_limited || error_rate > BACKOFF_ERROR_RATE {
            self.streak = self.streak.saturating_add(1);
            self.concurrency = (self.concurrency / 2).max(self.min_concurrency);
            self.delay = BACKOFF_STEP.saturating_mul(self.streak).min(self.max_backoff);

            tracing::warn!(
                "Backing off: error rate {:.0}%{}, concurrency {}, delay {}ms",
                error_rate * 100.0,
                if outcome.rate_limited { " (rate limited)" } else { "" },
                self.concurrency,
                self.delay.as_millis()
            );
        } else if error_rate < RECOVERY_ERROR_RATE {
            self.streak = self.streak.saturating_sub(1);

            if self.concurrency < self.baseline || !self.delay.is_zero() {
                // Concurrency may already sit at the floor when it equals the baseline
                if self.concurrency < self.baseline {
                    let grown = (self.concurrency as f64 * 1.2).floor() as usize;
                    self.concurrency = grown.max(self.concurrency + 1).min(self.baseline);
                }
                self.delay = self.delay.saturating_sub(RECOVERY_STEP);

                tracing::debug!(
                    "Recovering: concurrency {}, delay {}ms",
                    self.concurrency,
                    self.delay.as_millis()
                );
            }
        }
    }
}

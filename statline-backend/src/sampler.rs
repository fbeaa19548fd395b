//! Smoothed tick-rate estimate without an external profiling service.
//!
//! A background task ticks at the nominal rate; each tick measures the
//! wall-clock interval since the previous one. Scheduling delay stretches
//! the interval, which shows up as a rate below nominal.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Nominal tick rate, also the cold-start default and the theoretical max.
pub const NOMINAL_TPS: f64 = 20.0;

const TICK_PERIOD: Duration = Duration::from_millis(50);
const WINDOW_SIZE: usize = 11;
const MIN_INTERVAL: Duration = Duration::from_micros(1);

pub type SharedSampler = Arc<RwLock<TickSampler>>;

pub struct TickSampler {
    last_tick: Option<Instant>,
    samples: VecDeque<f64>,
}

impl TickSampler {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            samples: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn on_tick(&mut self) {
        self.record_tick(Instant::now());
    }

    pub(crate) fn record_tick(&mut self, now: Instant) {
        let Some(last) = self.last_tick.replace(now) else {
            return;
        };

        // A stalled clock reads as a zero interval; clamp before dividing.
        let elapsed = now.saturating_duration_since(last).max(MIN_INTERVAL);
        let rate = 1.0 / elapsed.as_secs_f64();
        if rate > NOMINAL_TPS {
            // clock or scheduling anomaly, not a real rate
            return;
        }

        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(rate);
    }

    /// Mean of the rolling window, or the nominal rate before any
    /// sample has been accepted.
    pub fn tps(&self) -> f64 {
        if self.samples.is_empty() {
            return NOMINAL_TPS;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn tps_string(&self) -> String {
        format!("{:.2}", self.tps())
    }
}

impl Default for TickSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the sampler at the nominal rate until shutdown is signalled.
pub fn spawn_tick_task(sampler: SharedSampler, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => sampler.write().await.on_tick(),
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("tick sampler stopped");
    })
}

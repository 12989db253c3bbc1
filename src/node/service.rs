//! Season node service
//!
//! Drives the block producer from a periodic tick. The producer sits behind
//! one async mutex, so production steps never interleave; every tick's
//! telemetry is also published to a watch channel that readers consult
//! without taking that lock.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::SimClock;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::events::EventBus;
use crate::ledger::MemoryLedger;
use crate::mining::{BlockProducer, Entropy, TelemetrySnapshot, TickReport};

/// Producer type run by the node
pub type SeasonProducer = BlockProducer<MemoryLedger, Box<dyn Entropy + Send>>;

/// Shared access to a running season
#[derive(Clone)]
pub struct NodeHandle {
    producer: Arc<Mutex<SeasonProducer>>,
    clock: Arc<SimClock>,
    telemetry: Arc<watch::Sender<TelemetrySnapshot>>,
    events: EventBus,
}

impl NodeHandle {
    /// Current game time
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Telemetry published by the latest tick
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.borrow().clone()
    }

    pub fn watch_telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run one production tick at the current game time
    pub async fn tick(&self) -> TickReport {
        let mut producer = self.producer.lock().await;
        let report = producer.tick(self.clock.now_ms());
        self.telemetry.send_replace(report.telemetry.clone());
        report
    }

    /// Run `f` with exclusive access to the producer and the current game time
    pub async fn with_producer<R>(&self, f: impl FnOnce(&mut SeasonProducer, u64) -> R) -> R {
        let mut producer = self.producer.lock().await;
        f(&mut producer, self.clock.now_ms())
    }
}

/// A configured season ready to run
pub struct SeasonNode {
    handle: NodeHandle,
    tick_interval: Duration,
}

impl SeasonNode {
    pub fn new(config: &SimConfig, entropy: Box<dyn Entropy + Send>) -> Result<Self, ConfigError> {
        config.validate()?;

        let clock = SimClock::new(&config.clock);
        let events = EventBus::new();
        let producer = BlockProducer::new(
            config.emission.clone(),
            config.production.clone(),
            MemoryLedger::new(config.ledger.clone()),
            entropy,
            events.clone(),
            clock.now_ms(),
        )?;
        let (telemetry, _) = watch::channel(producer.telemetry(clock.now_ms()));

        info!(
            "Season node ready: tick {} ms, clock x{}",
            config.production.tick_interval_ms,
            clock.acceleration()
        );

        Ok(Self {
            handle: NodeHandle {
                producer: Arc::new(Mutex::new(producer)),
                clock: Arc::new(clock),
                telemetry: Arc::new(telemetry),
                events,
            },
            tick_interval: Duration::from_millis(config.production.tick_interval_ms),
        })
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle.clone()
    }

    /// Tick until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut announced_end = false;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.handle.tick().await;
                    if report.telemetry.season_ended && !announced_end {
                        announced_end = true;
                        info!("Season concluded; publishing telemetry only");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Block production stopped");
    }
}

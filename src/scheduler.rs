//! Periodic execution contexts on the tokio runtime.
//!
//! One task per cadence. Each task does its tick's work inline, so a tick
//! never overlaps its successor; ticks missed while the work ran late are
//! skipped rather than bunched up.
//!
//! The coarse task never talks to the sink. It writes each closed window
//! into a `watch` channel and a separate publisher task delivers the newest
//! value, so a slow or unreachable sink cannot stall aggregation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::config::WindowsConfig;
use crate::schedule::{DailyResetGate, until_next_midnight};
use crate::station::{WeatherSnapshot, WeatherStation};
use crate::traits::{Clock, SnapshotSink, WeatherSensors};

/// Shortest sleep of the daily task, so an early wake-up cannot spin.
const MIN_DAILY_WAIT: Duration = Duration::from_secs(1);

/// Fine and coarse cadences. Fixed for the lifetime of the tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub sample_every: Duration,
    pub window: Duration,
}

impl Cadence {
    pub fn new(sample_every: Duration, window: Duration) -> Self {
        Self {
            sample_every,
            window,
        }
    }
}

impl From<&WindowsConfig> for Cadence {
    fn from(config: &WindowsConfig) -> Self {
        Self::new(config.sample_interval(), config.window())
    }
}

/// Handle to the running station tasks.
#[derive(Debug)]
pub struct StationTasks {
    snapshots: watch::Receiver<Option<WeatherSnapshot>>,
    handles: Vec<JoinHandle<()>>,
}

impl StationTasks {
    /// A fresh receiver that sees every subsequent window close.
    pub fn subscribe(&self) -> watch::Receiver<Option<WeatherSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait for the next window to close. `None` once the tasks are gone.
    pub async fn next_snapshot(&mut self) -> Option<WeatherSnapshot> {
        self.snapshots.changed().await.ok()?;
        self.snapshots.borrow_and_update().clone()
    }

    /// Stop every task. Pulse handlers keep working; nothing drains them.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
        debug!("Station tasks stopped");
    }
}

/// Spawn the sampling, window, daily reset and publisher tasks.
///
/// Must be called from within a tokio runtime.
pub fn spawn_station<S, K, C>(
    station: Arc<WeatherStation>,
    sensors: S,
    sink: Arc<K>,
    clock: Arc<C>,
    cadence: Cadence,
) -> StationTasks
where
    S: WeatherSensors + 'static,
    K: SnapshotSink + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = watch::channel(None);

    info!(
        "Starting station tasks: sample every {:?}, window {:?}",
        cadence.sample_every, cadence.window
    );

    let handles = vec![
        tokio::spawn(run_sampling(
            Arc::clone(&station),
            sensors,
            cadence.sample_every,
        )),
        tokio::spawn(run_windows(
            Arc::clone(&station),
            Arc::clone(&clock),
            cadence.window,
            tx,
        )),
        tokio::spawn(run_daily_reset(station, clock)),
        tokio::spawn(run_publisher(sink, rx.clone())),
    ];

    StationTasks {
        snapshots: rx,
        handles,
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    // first tick one period from now, not immediately
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn run_sampling<S: WeatherSensors + 'static>(
    station: Arc<WeatherStation>,
    mut sensors: S,
    every: Duration,
) {
    let mut ticker = ticker(every);
    loop {
        ticker.tick().await;
        // reads may block for a probe conversion, so they run off the async workers
        let station = Arc::clone(&station);
        let read = tokio::task::spawn_blocking(move || {
            station.sample(&mut sensors);
            sensors
        });
        sensors = match read.await {
            Ok(sensors) => sensors,
            Err(e) => {
                error!("Sensor read failed to complete, sampling stopped: {}", e);
                return;
            }
        };
    }
}

async fn run_windows<C: Clock>(
    station: Arc<WeatherStation>,
    clock: Arc<C>,
    window: Duration,
    tx: watch::Sender<Option<WeatherSnapshot>>,
) {
    let mut ticker = ticker(window);
    let mut opened_ms = clock.monotonic_ms();
    loop {
        ticker.tick().await;
        let Some(snapshot) = close_window(&station, clock.as_ref(), &mut opened_ms) else {
            continue;
        };
        tx.send_replace(Some(snapshot));
    }
}

/// Close the window opened at `opened_ms`, using the measured monotonic
/// length rather than the nominal one. Returns `None` and leaves the window
/// open if no time has passed.
pub fn close_window<C: Clock + ?Sized>(
    station: &WeatherStation,
    clock: &C,
    opened_ms: &mut u64,
) -> Option<WeatherSnapshot> {
    let now_ms = clock.monotonic_ms();
    let elapsed = Duration::from_millis(now_ms.saturating_sub(*opened_ms));
    if elapsed.is_zero() {
        warn!("Window tick with no elapsed monotonic time, keeping window open");
        return None;
    }
    *opened_ms = now_ms;
    Some(station.close_window(elapsed, clock.now_utc()))
}

async fn run_daily_reset<C: Clock>(station: Arc<WeatherStation>, clock: Arc<C>) {
    let mut gate = DailyResetGate::new(clock.now_local().date_naive());
    loop {
        let wait = until_next_midnight(&clock.now_local()).max(MIN_DAILY_WAIT);
        debug!("Next daily rain reset in {:?}", wait);
        tokio::time::sleep(wait).await;
        reset_if_new_day(&station, clock.as_ref(), &mut gate);
    }
}

/// Reset the daily rain count if the local date has moved past the last
/// reset. Returns whether a reset happened.
pub fn reset_if_new_day<C: Clock + ?Sized>(
    station: &WeatherStation,
    clock: &C,
    gate: &mut DailyResetGate,
) -> bool {
    let today = clock.now_local().date_naive();
    if !gate.should_reset(today) {
        debug!("Daily reset already done for {}", today);
        return false;
    }
    station.reset_daily_rain();
    true
}

async fn run_publisher<K: SnapshotSink>(
    sink: Arc<K>,
    mut rx: watch::Receiver<Option<WeatherSnapshot>>,
) {
    while rx.changed().await.is_ok() {
        let latest = rx.borrow_and_update().clone();
        let Some(snapshot) = latest else {
            continue;
        };
        match sink.publish(&snapshot).await {
            Ok(()) => debug!("Published snapshot observed at {:?}", snapshot.observed_at),
            Err(e) => error!("Failed to publish snapshot: {:#}", e),
        }
    }
}

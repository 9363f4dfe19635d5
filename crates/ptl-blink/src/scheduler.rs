//! Blink scheduler.
//!
//! The scheduler drives at most one blink job through the expander bus. It
//! is ticked on a short fixed cadence and decides from the current time what
//! to write next.
//!
//! # States
//!
//! - `Idle`: no job; nothing is written.
//! - `Start`: a job was just triggered; the next tick blanks every line.
//! - `High`: the target line is held high (dark) and is pulled low once the
//!   dark phase has elapsed.
//! - `Low`: the target line is held low (lit) and goes back high once the
//!   fill time has elapsed.
//!
//! ```text
//!            trigger()
//!   Idle ──────────────► Start ──blank──► High ◄──fill elapsed── Low
//!    ▲                                     │                      ▲
//!    │ duration elapsed                    └──dark phase elapsed──┘
//!    └──────────────────── (any state)
//! ```
//!
//! A fresh job lights its pin on the first tick after the blank, so a scan
//! gets visible feedback without waiting out a dark phase.
//!
//! # Sweep
//!
//! A sweep job walks every index from its start pin up to and including the
//! broadcast index, one full job per index. Writes during a sweep use
//! [`WriteMode::Diagnostic`], so a missing bus moves the sweep forward
//! instead of going dark.
//!
//! # Preemption
//!
//! A new trigger replaces the running job in place. The previous target is
//! not restored; the new job's blank is the only thing that clears it.

use crate::config::BlinkConfig;
use ptl_core::{LineLevel, PinAddress};
use ptl_hardware::{ExpanderChip, PinExpanderBus, Result, WriteMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Phase of the active blink job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkState {
    /// No job.
    Idle,

    /// Job triggered, not yet started.
    Start,

    /// Target line high (dark), waiting to light.
    High,

    /// Target line low (lit), waiting to go dark.
    Low,
}

impl fmt::Display for BlinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Start => "Start",
            Self::High => "High",
            Self::Low => "Low",
        };
        write!(f, "{}", name)
    }
}

/// A request to start a job, delivered through a [`BlinkHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkRequest {
    pub pin: PinAddress,
    pub sweep: bool,
}

/// Cross-task trigger for a running scheduler.
///
/// Requests are latched in a single slot and applied at the scheduler's next
/// tick; a later request replaces an unapplied one.
#[derive(Debug, Clone, Default)]
pub struct BlinkHandle {
    pending: Arc<Mutex<Option<BlinkRequest>>>,
}

impl BlinkHandle {
    /// Blink one pin, or every pin with the broadcast index.
    pub fn trigger(&self, pin: PinAddress) {
        self.submit(BlinkRequest { pin, sweep: false });
    }

    /// Walk every index from `start`, one job each.
    pub fn sweep(&self, start: PinAddress) {
        self.submit(BlinkRequest {
            pin: start,
            sweep: true,
        });
    }

    fn submit(&self, request: BlinkRequest) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(request);
    }

    fn take(&self) -> Option<BlinkRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[derive(Debug, Clone, Copy)]
struct BlinkJob {
    target: PinAddress,
    state: BlinkState,
    started_at: u64,
    last_toggle: Option<u64>,
    sweep: bool,
}

impl BlinkJob {
    fn idle() -> Self {
        Self {
            target: PinAddress::ALL,
            state: BlinkState::Idle,
            started_at: 0,
            last_toggle: None,
            sweep: false,
        }
    }

    /// Whether `phase_ms` has passed since the last toggle.
    fn phase_elapsed(&self, now: u64, phase_ms: u64) -> bool {
        self.last_toggle
            .is_none_or(|at| now.saturating_sub(at) > phase_ms)
    }
}

/// Time-driven blink state machine over a [`PinExpanderBus`].
///
/// # Examples
///
/// ```
/// use ptl_blink::{BlinkConfig, BlinkScheduler, BlinkState};
/// use ptl_hardware::{BusSlot, PinExpanderBus};
/// use ptl_hardware::mock::MockExpander;
/// use ptl_core::PinAddress;
///
/// #[tokio::main]
/// async fn main() -> ptl_hardware::Result<()> {
///     let (chip0, _) = MockExpander::new();
///     let (chip1, _) = MockExpander::new();
///     let bus = PinExpanderBus::new(BusSlot::probe(chip0).await, BusSlot::probe(chip1).await);
///
///     let mut scheduler = BlinkScheduler::new(bus, BlinkConfig::default());
///     scheduler.trigger(PinAddress::new(3), false);
///     scheduler.tick(0).await?;
///
///     assert_eq!(scheduler.state(), BlinkState::Low);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct BlinkScheduler<C> {
    bus: PinExpanderBus<C>,
    config: BlinkConfig,
    job: BlinkJob,
    handle: BlinkHandle,
}

impl<C: ExpanderChip> BlinkScheduler<C> {
    pub fn new(bus: PinExpanderBus<C>, config: BlinkConfig) -> Self {
        Self {
            bus,
            config,
            job: BlinkJob::idle(),
            handle: BlinkHandle::default(),
        }
    }

    /// Handle for triggering jobs from other tasks.
    pub fn handle(&self) -> BlinkHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> BlinkState {
        self.job.state
    }

    pub fn target(&self) -> PinAddress {
        self.job.target
    }

    pub fn is_sweeping(&self) -> bool {
        self.job.sweep
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    pub fn bus(&self) -> &PinExpanderBus<C> {
        &self.bus
    }

    fn mode(&self) -> WriteMode {
        if self.job.sweep {
            WriteMode::Diagnostic
        } else {
            WriteMode::Normal
        }
    }

    /// Replace the running job.
    ///
    /// Takes effect on the next [`tick`](Self::tick). The previous target
    /// keeps whatever level it was last driven to.
    pub fn trigger(&mut self, pin: PinAddress, sweep: bool) {
        debug!(%pin, sweep, "Blink triggered");
        self.job.target = pin;
        self.job.state = BlinkState::Start;
        self.job.sweep = sweep;
    }

    /// Drive every line dark.
    pub async fn blank(&mut self) -> Result<()> {
        let all = self.bus.all_pins();
        self.bus.set_pin(all, LineLevel::DARK, WriteMode::Normal).await?;
        Ok(())
    }

    /// Drive `pin` and follow a diagnostic redirect if one happened.
    async fn drive(&mut self, level: LineLevel) -> Result<()> {
        let effective = self.bus.set_pin(self.job.target, level, self.mode()).await?;
        self.job.target = effective;
        Ok(())
    }

    /// Advance the job to time `now_ms`.
    ///
    /// Steps are checked in order within one tick: start, expiry, then the
    /// lit and dark phases.
    ///
    /// # Errors
    ///
    /// Returns an error if a present expander rejects a write. The job state
    /// is left where the failed write would have moved it from.
    pub async fn tick(&mut self, now_ms: u64) -> Result<()> {
        if let Some(request) = self.handle.take() {
            self.trigger(request.pin, request.sweep);
        }

        if self.job.state == BlinkState::Start {
            info!(pin = %self.job.target, sweep = self.job.sweep, "Starting to blink");
            self.job.started_at = now_ms;
            self.job.last_toggle = None;
            self.job.state = BlinkState::High;
            self.blank().await?;
        }

        if self.job.state != BlinkState::Idle
            && now_ms.saturating_sub(self.job.started_at) > self.config.duration_ms
        {
            if self.job.sweep {
                self.job.target = self.job.target.next();
                self.job.state = BlinkState::Start;
            }
            if !self.job.sweep || self.job.target > self.bus.all_pins() {
                debug!(pin = %self.job.target, "Blink finished");
                self.job.state = BlinkState::Idle;
                self.job.sweep = false;
                self.blank().await?;
            }
        }

        if self.job.state == BlinkState::Low && self.job.phase_elapsed(now_ms, self.config.fill_ms) {
            self.drive(LineLevel::DARK).await?;
            self.job.last_toggle = Some(now_ms);
            self.job.state = BlinkState::High;
        }

        if self.job.state == BlinkState::High
            && self.job.phase_elapsed(now_ms, self.config.dark_ms())
        {
            self.drive(LineLevel::LIT).await?;
            self.job.last_toggle = Some(now_ms);
            self.job.state = BlinkState::Low;
        }

        Ok(())
    }

    /// Blank every line, then tick forever on the configured cadence.
    pub async fn run(mut self) {
        if let Err(e) = self.blank().await {
            warn!("Initial blank failed: {}", e);
        }

        let epoch = Instant::now();
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
            self.config.tick_ms.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now_ms = epoch.elapsed().as_millis() as u64;
            if let Err(e) = self.tick(now_ms).await {
                warn!("Blink tick failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptl_hardware::BusSlot;
    use ptl_hardware::mock::{MockExpander, MockExpanderHandle};

    async fn scheduler() -> (BlinkScheduler<MockExpander>, MockExpanderHandle) {
        let (chip0, handle0) = MockExpander::new();
        let (chip1, _) = MockExpander::new();
        let bus = PinExpanderBus::new(BusSlot::probe(chip0).await, BusSlot::probe(chip1).await);
        (BlinkScheduler::new(bus, BlinkConfig::default()), handle0)
    }

    #[tokio::test]
    async fn test_idle_tick_writes_nothing() {
        let (mut scheduler, handle) = scheduler().await;
        scheduler.tick(0).await.unwrap();
        scheduler.tick(5_000).await.unwrap();

        assert_eq!(scheduler.state(), BlinkState::Idle);
        assert_eq!(handle.write_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_request_applied_on_tick() {
        let (mut scheduler, _) = scheduler().await;
        let handle = scheduler.handle();

        handle.trigger(PinAddress::new(7));
        assert_eq!(scheduler.state(), BlinkState::Idle);

        scheduler.tick(0).await.unwrap();
        assert_eq!(scheduler.target(), PinAddress::new(7));
        assert_eq!(scheduler.state(), BlinkState::Low);
    }

    #[tokio::test]
    async fn test_latest_handle_request_wins() {
        let (mut scheduler, _) = scheduler().await;
        let handle = scheduler.handle();

        handle.trigger(PinAddress::new(1));
        handle.sweep(PinAddress::new(2));
        scheduler.tick(0).await.unwrap();

        assert_eq!(scheduler.target(), PinAddress::new(2));
        assert!(scheduler.is_sweeping());
    }

    #[tokio::test]
    async fn test_first_tick_blanks_then_lights() {
        let (mut scheduler, handle) = scheduler().await;
        scheduler.trigger(PinAddress::new(2), false);
        scheduler.tick(100).await.unwrap();

        use ptl_hardware::LineGroup;
        use ptl_hardware::mock::ExpanderWrite;
        assert_eq!(
            handle.writes(),
            vec![
                ExpanderWrite::Group {
                    group: LineGroup::Gpio,
                    level: LineLevel::High
                },
                ExpanderWrite::Group {
                    group: LineGroup::Gpo,
                    level: LineLevel::High
                },
                ExpanderWrite::Line {
                    group: LineGroup::Gpio,
                    offset: 2,
                    level: LineLevel::Low
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let (mut scheduler, handle) = scheduler().await;
        handle.fail_writes(true);
        scheduler.trigger(PinAddress::new(0), false);

        assert!(scheduler.tick(0).await.is_err());
    }
}

//! Progressive reveal of the map after a picker change.
//!
//! The map draws a growing prefix of the displayed collection, one slice per
//! tick, until everything is visible. [`RevealProgress`] is the pure schedule
//! and lives in the coordinator state. The ticker that drives it is
//! [`RevealTimer`] (behind the `timer` feature), a tokio interval task that
//! posts [`Event::RevealTick`] into the host's event channel.
//!
//! Every tick carries the generation of the reveal that started it. A new
//! picker change bumps the generation, so ticks that were already in flight
//! for an older reveal are recognized as stale and dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "timer")]
use crate::coordinator::Event;

/// What the host should do with its reveal ticker after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Leave the ticker as it is
    None,
    /// (Re)start ticking for this generation, replacing any running ticker
    Start { generation: u64, interval: Duration },
    /// Stop the ticker
    Cancel,
}

/// Schedule of one reveal: how many features are drawn after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealProgress {
    pub generation: u64,
    /// Size of the collection being revealed
    pub total: usize,
    /// Number of slices the collection is split into
    pub slices: usize,
    /// Ticks elapsed, starting at 1 when the first slice is drawn
    pub tick: usize,
}

impl RevealProgress {
    /// Begin a reveal with its first slice already drawn.
    pub fn new(generation: u64, total: usize, slices: usize) -> Self {
        Self {
            generation,
            total,
            slices: slices.max(1),
            tick: 1,
        }
    }

    /// Number of ticks until the whole collection is visible.
    pub fn ticks(&self) -> usize {
        if self.total >= self.slices {
            self.slices
        } else {
            self.total
        }
    }

    /// Features drawn after `tick` ticks. Collections smaller than the slice
    /// count grow by one per tick.
    pub fn count_at(&self, tick: usize) -> usize {
        let count = if self.total >= self.slices {
            tick.saturating_mul(self.total) / self.slices
        } else {
            tick
        };
        count.min(self.total)
    }

    /// Features currently drawn.
    pub fn visible(&self) -> usize {
        self.count_at(self.tick)
    }

    pub fn is_complete(&self) -> bool {
        self.tick >= self.ticks()
    }

    /// Advance one tick. Returns true once everything is visible.
    pub fn advance(&mut self) -> bool {
        if !self.is_complete() {
            self.tick += 1;
        }
        self.is_complete()
    }
}

// ============================================================================
// Ticker
// ============================================================================

/// Cancellable interval task feeding reveal ticks into an event channel.
///
/// Must be used from within a tokio runtime. At most one ticker runs at a
/// time: starting a new one aborts the previous one, and dropping the timer
/// aborts whatever is running.
#[cfg(feature = "timer")]
#[derive(Debug, Default)]
pub struct RevealTimer {
    handle: Option<tokio::task::AbortHandle>,
}

#[cfg(feature = "timer")]
impl RevealTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a ticker posting `Event::RevealTick { generation }` every
    /// `interval` until cancelled or the receiver is gone.
    pub fn start(
        &mut self,
        generation: u64,
        interval: Duration,
        events: tokio::sync::mpsc::UnboundedSender<Event>,
    ) {
        self.cancel();
        let period = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick of a tokio interval completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if events.send(Event::RevealTick { generation }).is_err() {
                    break;
                }
            }
        });
        log::debug!("[Reveal] Started ticker for generation {}", generation);
        self.handle = Some(task.abort_handle());
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("[Reveal] Ticker cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Carry out a command returned by the coordinator.
    pub fn apply(
        &mut self,
        command: TimerCommand,
        events: &tokio::sync::mpsc::UnboundedSender<Event>,
    ) {
        match command {
            TimerCommand::None => {}
            TimerCommand::Start {
                generation,
                interval,
            } => self.start(generation, interval, events.clone()),
            TimerCommand::Cancel => self.cancel(),
        }
    }
}

#[cfg(feature = "timer")]
impl Drop for RevealTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenth_per_tick() {
        let mut progress = RevealProgress::new(1, 25, 10);
        assert_eq!(progress.ticks(), 10);
        assert_eq!(progress.visible(), 2);
        assert!(!progress.advance());
        assert_eq!(progress.visible(), 5);
        while !progress.advance() {}
        assert_eq!(progress.visible(), 25);
        assert_eq!(progress.tick, 10);
        // Advancing past the end is harmless
        assert!(progress.advance());
        assert_eq!(progress.visible(), 25);
    }

    #[test]
    fn test_small_collections_grow_by_one() {
        let mut progress = RevealProgress::new(1, 3, 10);
        assert_eq!(progress.ticks(), 3);
        assert_eq!(progress.visible(), 1);
        progress.advance();
        assert_eq!(progress.visible(), 2);
        assert!(progress.advance());
        assert_eq!(progress.visible(), 3);
    }

    #[test]
    fn test_prefix_is_monotonic() {
        let progress = RevealProgress::new(1, 97, 10);
        let counts: Vec<usize> = (1..=progress.ticks()).map(|t| progress.count_at(t)).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(counts.last(), Some(&97));
    }

    #[test]
    fn test_single_item_is_complete_immediately() {
        let progress = RevealProgress::new(1, 1, 10);
        assert!(progress.is_complete());
        assert_eq!(progress.visible(), 1);
    }

    #[cfg(feature = "timer")]
    mod timer {
        use super::super::*;
        use tokio::sync::mpsc;

        #[tokio::test(start_paused = true)]
        async fn test_ticks_until_cancelled() {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut timer = RevealTimer::new();
            timer.start(7, Duration::from_millis(10), tx.clone());
            assert!(timer.is_active());

            for _ in 0..3 {
                let event = rx.recv().await.unwrap();
                assert_eq!(event, Event::RevealTick { generation: 7 });
            }

            timer.cancel();
            assert!(!timer.is_active());
            drop(tx);
            let mut extra = 0;
            while rx.recv().await.is_some() {
                extra += 1;
            }
            assert!(extra <= 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_restart_replaces_previous_ticker() {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut timer = RevealTimer::new();
            timer.apply(
                TimerCommand::Start {
                    generation: 1,
                    interval: Duration::from_millis(10),
                },
                &tx,
            );
            timer.apply(
                TimerCommand::Start {
                    generation: 2,
                    interval: Duration::from_millis(10),
                },
                &tx,
            );
            for _ in 0..3 {
                assert_eq!(rx.recv().await, Some(Event::RevealTick { generation: 2 }));
            }
            timer.apply(TimerCommand::Cancel, &tx);
            assert!(!timer.is_active());
        }
    }
}

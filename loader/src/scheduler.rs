/// Timer scheduler feeding [`LoaderEvent`]s into the single control loop.
///
/// Each timer is a small tokio task that sleeps and then sends its event on the
/// shared channel; it never touches loader state itself. Cancelling aborts the
/// task, so no further events are produced by it. Events already queued in the
/// channel are filtered out by the controller once it has left `Polling`.
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};

use crate::event::LoaderEvent;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

pub struct Scheduler {
    tx: mpsc::UnboundedSender<LoaderEvent>,
    timers: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl Scheduler {
    pub fn new(tx: mpsc::UnboundedSender<LoaderEvent>) -> Self {
        Self {
            tx,
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Sends `event` every `period`, the first time one `period` from now.
    pub fn schedule_periodic(&mut self, period: Duration, event: LoaderEvent) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
        self.insert(task)
    }

    /// Sends `event` once after `delay`.
    pub fn schedule_once(&mut self, delay: Duration, event: LoaderEvent) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(event);
        });
        self.insert(task)
    }

    /// Stops one timer. Returns `false` if it was already cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.timers.remove(&handle) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Stops every live timer and returns how many were stopped.
    pub fn cancel_all(&mut self) -> usize {
        let handles: Vec<TimerHandle> = self.timers.keys().copied().collect();
        handles.into_iter().filter(|h| self.cancel(*h)).count()
    }

    /// Number of timers that have been scheduled and not cancelled.
    /// Finished one-shot timers still count until cancelled.
    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.timers.len()
    }

    fn insert(&mut self, task: JoinHandle<()>) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(handle, task);
        handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }
}

//! Timer expiry for timed zone additions (spec.md §3, §8 property 4).
//!
//! Timers never call back into `RuntimeCore` directly — doing so would
//! reintroduce the internal locking the actor design in `runtime.rs` exists
//! to avoid. Instead each timer is an independent `tokio::time::sleep_until`
//! task that, on firing, sends an expiry message into the same command
//! channel ordinary requests use, so expiry is serialized exactly like any
//! other mutation.
//!
//! Cancelling a timer (e.g. the same element is re-added permanently before
//! it expires) doesn't abort the sleeping task — it just bumps a per-key
//! generation counter. A stale task that fires after cancellation carries
//! the generation it was spawned with; the dispatcher compares that against
//! the current generation and drops the message if they don't match.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Tracks the current generation for each timed key and spawns the sleep
/// tasks that deliver expiry messages.
#[derive(Clone)]
pub struct Scheduler<M> {
    generations: Arc<Mutex<HashMap<String, u64>>>,
    sender: mpsc::UnboundedSender<M>,
}

/// Locks `generations`, recovering the inner map if a prior holder panicked
/// while holding the lock instead of poisoning every later caller.
fn lock_generations(generations: &Mutex<HashMap<String, u64>>) -> MutexGuard<'_, HashMap<String, u64>> {
    generations.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<M: Send + 'static> Scheduler<M> {
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<M>) -> Self {
        Self {
            generations: Arc::new(Mutex::new(HashMap::new())),
            sender,
        }
    }

    /// Schedules `key` to expire after `duration`, invoking `make_message`
    /// with `(key, generation)` to build the channel message once the timer
    /// actually fires. Replaces any existing timer for the same key and
    /// invalidates it via the generation bump.
    pub fn schedule<F>(&self, key: impl Into<String>, duration: Duration, make_message: F)
    where
        F: FnOnce(String, u64) -> M + Send + 'static,
    {
        let key = key.into();
        let generation = {
            let mut generations = lock_generations(&self.generations);
            let gen = generations.entry(key.clone()).or_insert(0);
            *gen += 1;
            *gen
        };

        let sender = self.sender.clone();
        let deadline = Instant::now() + duration;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = sender.send(make_message(key, generation));
        });
    }

    /// Cancels any pending timer for `key` by bumping its generation, so a
    /// task already in flight for it will be dropped as stale when it fires.
    pub fn cancel(&self, key: &str) {
        let mut generations = lock_generations(&self.generations);
        if let Some(gen) = generations.get_mut(key) {
            *gen += 1;
        }
    }

    /// Cancels every currently tracked timer — used by `reload`/`completeReload`
    /// (spec.md §4.3's `cancelAll`).
    pub fn cancel_all(&self) {
        let mut generations = lock_generations(&self.generations);
        for gen in generations.values_mut() {
            *gen += 1;
        }
    }

    /// Whether `(key, generation)` is still current — call this when an
    /// expiry message is received before acting on it.
    #[must_use]
    pub fn is_current(&self, key: &str, generation: u64) -> bool {
        let generations = lock_generations(&self.generations);
        generations.get(key).is_some_and(|g| *g == generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Msg {
        Expire(String, u64),
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_and_delivers_current_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        scheduler.schedule("eth0", StdDuration::from_secs(5), |k, g| Msg::Expire(k, g));

        tokio::time::advance(StdDuration::from_secs(6)).await;
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, Msg::Expire("eth0".to_owned(), 1));
        assert!(scheduler.is_current("eth0", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_invalidates_the_pending_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler: Scheduler<Msg> = Scheduler::new(tx);
        scheduler.schedule("eth0", StdDuration::from_secs(5), |k, g| Msg::Expire(k, g));
        scheduler.cancel("eth0");
        assert!(!scheduler.is_current("eth0", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_invalidates_every_pending_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler: Scheduler<Msg> = Scheduler::new(tx);
        scheduler.schedule("eth0", StdDuration::from_secs(5), |k, g| Msg::Expire(k, g));
        scheduler.schedule("eth1", StdDuration::from_secs(5), |k, g| Msg::Expire(k, g));

        scheduler.cancel_all();

        assert!(!scheduler.is_current("eth0", 1));
        assert!(!scheduler.is_current("eth1", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_bumps_the_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        scheduler.schedule("eth0", StdDuration::from_secs(5), |k, g| Msg::Expire(k, g));
        scheduler.schedule("eth0", StdDuration::from_secs(10), |k, g| Msg::Expire(k, g));

        tokio::time::advance(StdDuration::from_secs(6)).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first, Msg::Expire("eth0".to_owned(), 1));
        assert!(!scheduler.is_current("eth0", 1));

        tokio::time::advance(StdDuration::from_secs(5)).await;
        let second = rx.recv().await.unwrap();
        assert_eq!(second, Msg::Expire("eth0".to_owned(), 2));
        assert!(scheduler.is_current("eth0", 2));
    }
}

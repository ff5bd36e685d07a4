use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Coalesces bursts of calls under one key into a single delayed action.
///
/// Each `schedule` aborts the timer previously armed under the same key. The action
/// runs on the timer task once the delay elapses, so it should only kick off work
/// (e.g. spawn a lookup) rather than await it. Must be used inside a Tokio runtime.
pub struct DebounceScheduler<K> {
    timers: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K> DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut timers = self.timers();

        if let Some(previous) = timers.remove(&key) {
            if !previous.is_finished() {
                debug!("Superseding pending timer for {:?}", key);
            }
            previous.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        timers.insert(key, handle);
    }

    /// Remove a pending timer without firing it. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.timers().remove(key) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                if pending {
                    debug!("Cancelled pending timer for {:?}", key);
                }
                pending
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.timers().drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.timers()
            .get(key)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<K, JoinHandle<()>>> {
        // A panicking action cannot leave the map half-updated
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K> Default for DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for DebounceScheduler<K> {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let make = move |value: &str| -> Box<dyn FnOnce() + Send> {
            let sink = Arc::clone(&sink);
            let value = value.to_string();
            Box::new(move || sink.lock().unwrap().push(value))
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_value() {
        let scheduler = DebounceScheduler::new();
        let (fired, action) = recorder();

        for text in ["J", "Jo", "Joh", "John"] {
            scheduler.schedule("patient", Duration::from_millis(300), action(text));
            sleep(Duration::from_millis(100)).await;
        }

        assert!(fired.lock().unwrap().is_empty());

        sleep(Duration::from_millis(250)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["John".to_string()]);
        assert!(!scheduler.is_pending(&"patient"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let scheduler = DebounceScheduler::new();
        let (fired, action) = recorder();

        scheduler.schedule("patient", Duration::from_millis(300), action("Joh"));
        scheduler.schedule("doctor", Duration::from_millis(300), action("Ho"));

        sleep(Duration::from_millis(301)).await;

        let mut values = fired.lock().unwrap().clone();
        values.sort();
        assert_eq!(values, vec!["Ho".to_string(), "Joh".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let scheduler = DebounceScheduler::new();
        let (fired, action) = recorder();

        scheduler.schedule("doctor", Duration::from_millis(300), action("House"));
        assert!(scheduler.is_pending(&"doctor"));
        assert!(scheduler.cancel(&"doctor"));

        sleep(Duration::from_secs(1)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(!scheduler.cancel(&"doctor"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_clears_every_key() {
        let scheduler = DebounceScheduler::new();
        let (fired, action) = recorder();

        scheduler.schedule(1u8, Duration::from_millis(300), action("a"));
        scheduler.schedule(2u8, Duration::from_millis(300), action("b"));
        scheduler.cancel_all();

        sleep(Duration::from_secs(1)).await;
        assert!(fired.lock().unwrap().is_empty());
    }
}

//! Progress reporting for long-running recognition
//!
//! Values are percentages (0-100) and never go backwards within a run: a
//! reporter drops any value that is not greater than the last one it
//! delivered since [`ProgressReporter::begin`].

use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Callback invoked with each new progress percentage
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Delivers monotonically non-decreasing progress values to the caller
#[derive(Clone, Default)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Serializes deliveries across threads. Reentrant so a callback may
    /// report on the same reporter.
    delivery: ReentrantMutex<()>,
    /// Last accepted value, None until the first report of a run
    last: Mutex<Option<u8>>,
    callback: Option<ProgressCallback>,
    sender: Option<watch::Sender<u8>>,
}

impl ProgressReporter {
    /// Reporter that discards all progress
    pub fn silent() -> Self {
        Self::default()
    }

    /// Reporter that invokes a callback
    pub fn from_callback(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                callback: Some(Arc::new(callback)),
                ..Default::default()
            }),
        }
    }

    /// Reporter that publishes into a watch channel
    /// Returns the reporter and a receiver starting at 0
    pub fn channel() -> (Self, watch::Receiver<u8>) {
        let (sender, receiver) = watch::channel(0);
        let reporter = Self {
            inner: Arc::new(Inner {
                sender: Some(sender),
                ..Default::default()
            }),
        };
        (reporter, receiver)
    }

    /// Start a new run: forget the last value so the next report, usually
    /// 0, is delivered again
    pub fn begin(&self) {
        let _delivery = self.inner.delivery.lock();
        *self.inner.last.lock() = None;
        if let Some(sender) = &self.inner.sender {
            sender.send_replace(0);
        }
    }

    /// Report a progress percentage (clamped to 100)
    ///
    /// The callback runs without the state lock held. A callback that blocks
    /// on another thread reporting to this reporter still deadlocks.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);

        let _delivery = self.inner.delivery.lock();
        {
            let mut last = self.inner.last.lock();
            if matches!(*last, Some(previous) if percent <= previous) {
                return;
            }
            *last = Some(percent);
        }

        if let Some(callback) = &self.inner.callback {
            callback(percent);
        }
        if let Some(sender) = &self.inner.sender {
            // A nested report from the callback may already have sent more
            sender.send_if_modified(|current| {
                if percent > *current {
                    *current = percent;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Last delivered value
    pub fn last(&self) -> Option<u8> {
        *self.inner.last.lock()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .field("callback", &self.inner.callback.is_some())
            .field("channel", &self.inner.sender.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_never_decrease() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::from_callback(move |p| sink.lock().push(p));

        for value in [0, 10, 5, 10, 40, 39, 100, 80] {
            reporter.report(value);
        }

        assert_eq!(*seen.lock(), vec![0, 10, 40, 100]);
        assert_eq!(reporter.last(), Some(100));
    }

    #[test]
    fn test_values_clamped_to_100() {
        let reporter = ProgressReporter::silent();
        reporter.report(250);
        assert_eq!(reporter.last(), Some(100));
    }

    #[test]
    fn test_begin_starts_new_run() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::from_callback(move |p| sink.lock().push(p));

        for _ in 0..2 {
            reporter.begin();
            for value in [0, 50, 100] {
                reporter.report(value);
            }
        }

        assert_eq!(*seen.lock(), vec![0, 50, 100, 0, 50, 100]);
    }

    #[test]
    fn test_begin_resets_channel() {
        let (reporter, receiver) = ProgressReporter::channel();
        reporter.report(100);
        reporter.begin();
        assert_eq!(*receiver.borrow(), 0);
        reporter.report(30);
        assert_eq!(*receiver.borrow(), 30);
    }

    #[test]
    fn test_callback_may_report_on_same_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<ProgressReporter>>> = Arc::new(Mutex::new(None));

        let sink = seen.clone();
        let handle = slot.clone();
        let reporter = ProgressReporter::from_callback(move |p| {
            sink.lock().push(p);
            if p == 10 {
                let nested = handle.lock().clone();
                if let Some(nested) = nested {
                    nested.report(20);
                }
            }
        });
        *slot.lock() = Some(reporter.clone());

        reporter.report(10);
        reporter.report(15);

        assert_eq!(*seen.lock(), vec![10, 20]);
        assert_eq!(reporter.last(), Some(20));
    }

    #[test]
    fn test_channel_receives_latest() {
        let (reporter, receiver) = ProgressReporter::channel();
        assert_eq!(*receiver.borrow(), 0);

        reporter.report(30);
        reporter.report(20);
        assert_eq!(*receiver.borrow(), 30);
    }

    #[test]
    fn test_clones_share_state() {
        let reporter = ProgressReporter::silent();
        let clone = reporter.clone();
        reporter.report(60);
        clone.report(50);
        assert_eq!(clone.last(), Some(60));
    }
}

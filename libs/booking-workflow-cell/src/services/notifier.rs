use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::models::{Notification, Severity};

pub type NotificationReceiver = broadcast::Receiver<Notification>;

/// The single user-facing outcome channel of the workflow.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

fn log_notification(notification: &Notification) {
    match notification.severity {
        Severity::Error => error!("{}: {}", notification.title, notification.message),
        Severity::Success | Severity::Info => {
            info!("{}: {}", notification.title, notification.message)
        }
    }
}

/// Logs notifications and does nothing else. Useful for headless runs.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);
    }
}

/// Fans notifications out to every subscribed presentation layer.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        log_notification(&notification);

        if let Err(e) = self.sender.send(notification) {
            // Nobody listening, the log line above is the only trace
            debug!("No notification subscribers: {}", e);
        }
    }
}

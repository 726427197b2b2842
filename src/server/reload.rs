// src/server/reload.rs

use tokio::sync::broadcast;
use tracing::debug;

/// What connected browsers should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Full page refresh.
    Reload,
    /// Swap stylesheets without reloading the page.
    InjectCss,
}

impl ReloadSignal {
    /// SSE event name understood by the client script.
    pub fn event_name(self) -> &'static str {
        match self {
            ReloadSignal::Reload => "reload",
            ReloadSignal::InjectCss => "css",
        }
    }
}

/// Broadcast hub between build steps and connected browsers.
///
/// Cloning is cheap; every clone feeds the same channel.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Send `signal` to every connected browser. Returns how many received it.
    pub fn send(&self, signal: ReloadSignal) -> usize {
        // No subscribers is not an error: nobody has the page open yet.
        let delivered = self.tx.send(signal).unwrap_or(0);
        debug!(event = signal.event_name(), delivered, "reload signal");
        delivered
    }

    pub fn reload(&self) -> usize {
        self.send(ReloadSignal::Reload)
    }

    pub fn inject_css(&self) -> usize {
        self.send(ReloadSignal::InjectCss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_signals_in_order() {
        let hub = ReloadHub::default();
        let mut rx = hub.subscribe();

        assert_eq!(hub.inject_css(), 1);
        assert_eq!(hub.reload(), 1);

        assert_eq!(rx.recv().await.unwrap(), ReloadSignal::InjectCss);
        assert_eq!(rx.recv().await.unwrap(), ReloadSignal::Reload);
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        let hub = ReloadHub::default();
        assert_eq!(hub.reload(), 0);
    }
}

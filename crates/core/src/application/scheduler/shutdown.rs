// Scheduler Shutdown Token

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Cooperative shutdown signal, observed between discrete steps
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal (also returns if the sender is gone)
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleep for `duration` unless shutdown arrives first.
    /// Returns true if shutdown was observed.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = sleep(duration) => self.is_shutdown(),
            _ = self.wait() => true,
        }
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to all schedulers and monitors
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    /// Additional token for a task spawned after the channel was created
    pub fn subscribe(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_after_shutdown_already_sent() {
        let (tx, mut token) = shutdown_channel();
        tx.shutdown();
        token.wait().await;
        // A second wait must not hang once the flag is set
        token.wait().await;
        assert!(token.is_shutdown());
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_shutdown() {
        let (tx, mut token) = shutdown_channel();
        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(3600)).await });
        tx.shutdown();
        assert!(sleeper.await.unwrap());
    }

    #[tokio::test]
    async fn test_sleep_completes_without_shutdown() {
        let (_tx, mut token) = shutdown_channel();
        assert!(!token.sleep(Duration::from_millis(1)).await);
    }
}

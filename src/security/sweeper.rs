//! Background pruning of idle rate windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::security::rate_limit::RequestGate;

/// Sweep idle windows every `interval` until shutdown is signalled.
pub async fn run_sweeper(gate: Arc<RequestGate>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = gate.sweep_idle();
                if removed > 0 {
                    tracing::debug!(removed, remaining = gate.tracked_clients(), "Swept idle rate windows");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate window sweeper stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RateLimitConfig;
    use crate::observability::security_events::testing::RecordingSink;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_prunes_and_stops() {
        let clock = Arc::new(ManualClock::default());
        let gate = Arc::new(RequestGate::new(
            &RateLimitConfig::default(),
            clock.clone(),
            Arc::new(RecordingSink::default()),
        ));
        gate.admit("a").unwrap();
        clock.advance(chrono::Duration::seconds(61));

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(run_sweeper(gate.clone(), Duration::from_secs(1), rx));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(gate.tracked_clients(), 0);

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}

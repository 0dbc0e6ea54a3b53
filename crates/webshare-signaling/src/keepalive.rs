//! Keepalive supervisor: reclaims connections whose transport died silently.

use crate::hub::SignalingHub;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic sweep. Each tick closes connections that did not answer
/// the previous probe and probes the rest.
pub fn spawn(hub: SignalingHub, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip first immediate tick

        loop {
            ticker.tick().await;
            let reclaimed = hub.sweep().await;
            if reclaimed > 0 {
                tracing::info!(reclaimed, "Keepalive sweep reclaimed connections");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Outbound;

    #[tokio::test(start_paused = true)]
    async fn silent_connection_is_closed_after_two_ticks() {
        let hub = SignalingHub::default();
        let (quiet, mut quiet_rx) = hub.connect().await;
        let (answering, mut answering_rx) = hub.connect().await;
        let task = spawn(hub.clone(), Duration::from_secs(30));

        assert_eq!(quiet_rx.recv().await, Some(Outbound::Probe));
        assert_eq!(answering_rx.recv().await, Some(Outbound::Probe));
        hub.mark_alive(answering).await;

        assert_eq!(quiet_rx.recv().await, Some(Outbound::Close));
        assert_eq!(answering_rx.recv().await, Some(Outbound::Probe));
        assert!(!hub.disconnect(quiet).await);
        assert!(hub.disconnect(answering).await);

        task.abort();
    }
}

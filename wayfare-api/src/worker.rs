use std::sync::Arc;
use tokio::sync::RwLock;
use wayfare_booking::wizard::WizardManager;
use wayfare_catalog::ledger::CapacityLedger;

/// Periodically releases expired capacity holds and abandons idle wizard
/// sessions.
pub fn start_maintenance_worker(
    ledger: Arc<CapacityLedger>,
    wizards: Arc<RwLock<WizardManager>>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let released = ledger.sweep_expired();
            if released > 0 {
                tracing::info!("Released {} expired capacity holds", released);
            }

            let abandoned = wizards.write().await.sweep_idle();
            if abandoned > 0 {
                tracing::info!("Abandoned {} idle wizard sessions", abandoned);
            }
        }
    })
}

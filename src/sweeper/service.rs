use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::sweeper::engine::Sweeper;

/// Schedule for the background checks: sweeps hourly, upcoming-expiration
/// reports every six hours by default.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub sweep_interval: Duration,
    pub upcoming_interval: Duration,
    pub horizon_days: i64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600),
            upcoming_interval: Duration::from_secs(21600),
            horizon_days: 3,
        }
    }
}

/// Handle to a running sweep service. Dropping it leaves the task running;
/// call `stop` for a clean shutdown.
pub struct SweepHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweepHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.join.await {
            warn!("Sweep task did not shut down cleanly: {}", e);
        }
    }
}

/// Timer-driven background runner for [`Sweeper`].
///
/// Everything runs on one task: ticks are handled sequentially, so a slow
/// sweep can never overlap the next one or the upcoming scan. Missed cycles
/// are not retried; the next tick re-evaluates full current state.
pub struct SweepService {
    sweeper: Arc<Sweeper>,
    schedule: Schedule,
}

impl SweepService {
    pub fn new(sweeper: Arc<Sweeper>, schedule: Schedule) -> Self {
        Self { sweeper, schedule }
    }

    /// Run an immediate sweep and upcoming report, then keep both on their
    /// intervals until the returned handle is stopped.
    pub fn start(self) -> SweepHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let Schedule {
            sweep_interval,
            upcoming_interval,
            horizon_days,
        } = self.schedule;
        let sweeper = self.sweeper;

        let join = tokio::spawn(async move {
            info!(
                "Verificação periódica iniciada (sweep: {}s, avisos: {}s)",
                sweep_interval.as_secs(),
                upcoming_interval.as_secs()
            );

            sweeper.sweep().await;
            Self::report_upcoming(&sweeper, horizon_days).await;

            let mut sweep_tick = tokio::time::interval(sweep_interval);
            let mut upcoming_tick = tokio::time::interval(upcoming_interval);
            sweep_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            upcoming_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Both intervals fire immediately once; the initial pass above
            // already covered that.
            sweep_tick.tick().await;
            upcoming_tick.tick().await;

            loop {
                tokio::select! {
                    _ = sweep_tick.tick() => {
                        sweeper.sweep().await;
                    }
                    _ = upcoming_tick.tick() => {
                        Self::report_upcoming(&sweeper, horizon_days).await;
                    }
                    _ = stop_rx.changed() => {
                        info!("Verificação periódica encerrada");
                        break;
                    }
                }
            }
        });

        SweepHandle { stop_tx, join }
    }

    async fn report_upcoming(sweeper: &Sweeper, horizon_days: i64) {
        let upcoming = sweeper.upcoming_expirations(horizon_days).await;
        if upcoming.is_empty() {
            return;
        }

        info!("{} usuários com acesso expirando em breve:", upcoming.len());
        for entry in &upcoming {
            info!(
                "- {} ({}): {} dias restantes",
                entry.name.as_deref().unwrap_or("Sem nome"),
                entry.email,
                entry.days_left
            );
        }
    }
}

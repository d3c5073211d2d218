//! Periodic refresh loop

use std::future::Future;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::SyncEngine;
use crate::db::LocalSlots;
use crate::remote::RemoteStore;

/// Tells the refresh loop whether anyone is looking at the records
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    sender: watch::Sender<bool>,
}

impl ActivityHandle {
    pub fn pause(&self) {
        self.set_active(false);
    }

    pub fn resume(&self) {
        self.set_active(true);
    }

    pub fn set_active(&self, active: bool) {
        self.sender.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.sender.borrow()
    }
}

pub fn activity_channel(initially_active: bool) -> (ActivityHandle, watch::Receiver<bool>) {
    let (sender, receiver) = watch::channel(initially_active);
    (ActivityHandle { sender }, receiver)
}

/// Tick `engine` every refresh interval until `shutdown` resolves or the
/// activity handle is dropped.
///
/// The first tick fires one interval after start; callers wanting an
/// immediate refresh tick once themselves. While inactive no ticks fire, and
/// the interval restarts on resume.
pub async fn run_periodic<R, S>(
    engine: &SyncEngine<R, S>,
    mut activity: watch::Receiver<bool>,
    shutdown: impl Future<Output = ()>,
) where
    R: RemoteStore,
    S: LocalSlots,
{
    let period = engine.settings().refresh_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::debug!("Refreshing every {}s", period.as_secs());

    loop {
        let active = *activity.borrow_and_update();
        if active {
            tokio::select! {
                () = &mut shutdown => break,
                changed = activity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let outcome = engine.tick().await;
                    tracing::debug!(?outcome, "Periodic sync finished");
                }
            }
        } else {
            tracing::debug!("Periodic sync paused");
            tokio::select! {
                () = &mut shutdown => break,
                changed = activity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *activity.borrow() {
                        tracing::debug!("Periodic sync resumed");
                        ticker.reset();
                    }
                }
            }
        }
    }

    tracing::debug!("Periodic sync stopped");
}

//! Per-user auto-wipe timers.
//!
//! Replaces an ad-hoc global interval list with a task map keyed by user
//! id: installing a schedule for a user always cancels the superseded
//! timer first, so a stale interval can never fire. Timers are
//! process-local and rehydrated from stored settings at startup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::accounting::StorageAccounting;
use crate::storage::{Database, DatabaseError};

pub struct WipeScheduler {
    accounting: StorageAccounting,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl WipeScheduler {
    pub fn new(accounting: StorageAccounting) -> Self {
        Self {
            accounting,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Install a recurring wipe for the user, replacing any existing timer.
    pub fn schedule(&self, user_id: &str, interval: Duration) {
        let accounting = self.accounting.clone();
        let uid = user_id.to_string();

        let handle = tokio::spawn({
            let uid = uid.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // interval fires immediately; skip the first tick
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    match accounting.wipe(&uid).await {
                        Ok(count) => info!(user_id = %uid, count, "auto-wipe completed"),
                        Err(e) => warn!(user_id = %uid, error = %e, "auto-wipe failed"),
                    }
                }
            }
        });

        let mut tasks = self.tasks.lock().expect("wipe scheduler lock poisoned");
        if let Some(stale) = tasks.insert(uid, handle) {
            stale.abort();
        }
    }

    /// Cancel the user's timer, if any.
    pub fn cancel(&self, user_id: &str) {
        let mut tasks = self.tasks.lock().expect("wipe scheduler lock poisoned");
        if let Some(handle) = tasks.remove(user_id) {
            handle.abort();
        }
    }

    pub fn is_scheduled(&self, user_id: &str) -> bool {
        self.tasks
            .lock()
            .expect("wipe scheduler lock poisoned")
            .contains_key(user_id)
    }

    /// Re-derive timers from persisted per-user settings. Called once at
    /// startup; returns how many timers were installed.
    pub fn rehydrate(&self, db: &Database) -> Result<usize, DatabaseError> {
        let mut installed = 0;
        for user in db.get_all_users()? {
            let auto_wipe = &user.settings.auto_wipe;
            if auto_wipe.enabled && auto_wipe.interval_secs > 0 {
                self.schedule(&user.id, Duration::from_secs(auto_wipe.interval_secs));
                installed += 1;
            }
        }
        Ok(installed)
    }

    /// Abort every timer (process shutdown).
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().expect("wipe scheduler lock poisoned");
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

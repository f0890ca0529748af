use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::diff::{compare_snapshots, ChangeSet};
use crate::farm::{FarmSnapshot, IngestError, RawSnapshot};

pub struct DashboardSettings {
    pub name: String,
}

/// Result of feeding one raw snapshot through the dashboard.
#[derive(Debug, Clone)]
pub struct Refresh {
    pub snapshot: Arc<FarmSnapshot>,
    pub refreshed_at: DateTime<Utc>,
    /// `None` on the first load, or when the comparison failed and the
    /// notification cycle was skipped.
    pub changes: Option<ChangeSet>,
}

impl Refresh {
    pub fn is_significant(&self) -> bool {
        self.changes
            .as_ref()
            .is_some_and(|changes| changes.has_significant_changes)
    }
}

/// Owns the one previous snapshot kept for diffing; nothing older survives.
pub struct Dashboard {
    settings: DashboardSettings,
    previous: Option<Arc<FarmSnapshot>>,
    refreshes: u64,
}

impl Dashboard {
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings,
            previous: None,
            refreshes: 0,
        }
    }

    pub fn refresh(&mut self, raw: &RawSnapshot) -> Result<Refresh, IngestError> {
        let snapshot = Arc::new(FarmSnapshot::from_raw(raw)?);
        Ok(self.accept(snapshot))
    }

    /// Replaces the retained snapshot and diffs against the one it replaces.
    pub fn accept(&mut self, snapshot: Arc<FarmSnapshot>) -> Refresh {
        let previous = self.previous.replace(snapshot.clone());
        self.refreshes += 1;

        let changes = previous.and_then(|old| match compare_snapshots(&old, &snapshot) {
            Ok(changes) => Some(changes),
            Err(err) => {
                warn!(dashboard = %self.settings.name, error = %err, "skipping change notification");
                None
            }
        });

        info!(
            dashboard = %self.settings.name,
            refresh = self.refreshes,
            animals = snapshot.animals.len(),
            pastures = snapshot.pastures.len(),
            significant = changes.as_ref().is_some_and(|c| c.has_significant_changes),
            "dashboard refreshed"
        );

        Refresh {
            snapshot,
            refreshed_at: Utc::now(),
            changes,
        }
    }

    pub fn current(&self) -> Option<&Arc<FarmSnapshot>> {
        self.previous.as_ref()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }
}

pub mod analysis;
pub mod config;
pub mod diff;
pub mod engine;
pub mod farm;
pub mod livestock;
pub mod normalize;
pub mod pasture;
pub mod snapshot;
pub mod web;

pub use config::DashboardConfig;
pub use diff::{compare_snapshots, ChangeSet, DiffError};
pub use engine::{Dashboard, DashboardSettings, Refresh};
pub use farm::{DataSource, FarmSnapshot, FarmStatistics, IngestError, RawSnapshot};
pub use livestock::{Animal, AnimalRef};
pub use pasture::{Husbandry, Pasture};
pub use snapshot::{SnapshotError, SnapshotLoader, SnapshotWriter};

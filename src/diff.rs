//! Change detection between two snapshots of farm state.
//!
//! Two parses of the same save jitter in their floats, so animal updates are
//! only reported once a field crosses a noise threshold.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::analysis::Warning;
use crate::farm::{FarmSnapshot, GameTime};
use crate::livestock::AnimalRef;
use crate::pasture::Pasture;

pub const HEALTH_CHANGE_THRESHOLD: f64 = 15.0;
pub const AGE_NOISE_MONTHS: f64 = 0.05;
pub const AGE_JUMP_MONTHS: f64 = 0.5;
pub const LOW_FOOD_LEVEL: f64 = 100.0;
pub const SHARP_DROP: f64 = 50.0;
pub const SHARP_DROP_CEILING: f64 = 200.0;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("pasture id '{0}' appears more than once")]
    DuplicatePasture(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum FieldChange {
    Health { from: f64, to: f64 },
    Age { from: f64, to: f64 },
    Pregnancy { from: bool, to: bool },
    Lactation { from: bool, to: bool },
    Location { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimalUpdate {
    pub animal: AnimalRef,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LivestockChanges {
    pub added: Vec<AnimalRef>,
    pub removed: Vec<AnimalRef>,
    pub updated: Vec<AnimalUpdate>,
}

impl LivestockChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastureWarning {
    pub pasture_id: String,
    pub pasture_name: String,
    pub warning: Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningChanges {
    pub new_warnings: Vec<PastureWarning>,
    pub resolved_warnings: Vec<PastureWarning>,
}

impl WarningChanges {
    pub fn is_empty(&self) -> bool {
        self.new_warnings.is_empty() && self.resolved_warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodLevelChangeKind {
    BelowThreshold,
    SharpDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLevelChange {
    pub pasture_id: String,
    pub pasture_name: String,
    pub kind: FoodLevelChangeKind,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountChange {
    pub before: usize,
    pub after: usize,
    pub changed: bool,
}

impl CountChange {
    fn new(before: usize, after: usize) -> Self {
        Self {
            before,
            after,
            changed: before != after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatisticsChanges {
    pub livestock: CountChange,
    pub pastures: CountChange,
    pub farms: CountChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameTimeChange {
    pub from: GameTime,
    pub to: GameTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub livestock: LivestockChanges,
    pub warnings: WarningChanges,
    pub food_levels: Vec<FoodLevelChange>,
    pub statistics: StatisticsChanges,
    pub game_time: Option<GameTimeChange>,
    pub has_significant_changes: bool,
}

fn index_by_id(animals: &[AnimalRef]) -> HashMap<&str, &AnimalRef> {
    let mut index = HashMap::with_capacity(animals.len());
    for animal in animals.iter().filter(|animal| animal.has_id()) {
        if index.contains_key(animal.id.as_str()) {
            warn!(id = %animal.id, "duplicate animal id; keeping first occurrence");
            continue;
        }
        index.insert(animal.id.as_str(), animal);
    }
    index
}

fn animal_changes(old: &AnimalRef, new: &AnimalRef) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if (old.health - new.health).abs() > HEALTH_CHANGE_THRESHOLD {
        changes.push(FieldChange::Health {
            from: old.health,
            to: new.health,
        });
    }
    let aged = new.age - old.age;
    if aged > AGE_NOISE_MONTHS && aged <= AGE_JUMP_MONTHS {
        changes.push(FieldChange::Age {
            from: old.age,
            to: new.age,
        });
    }
    if old.is_pregnant != new.is_pregnant {
        changes.push(FieldChange::Pregnancy {
            from: old.is_pregnant,
            to: new.is_pregnant,
        });
    }
    if old.is_lactating != new.is_lactating {
        changes.push(FieldChange::Lactation {
            from: old.is_lactating,
            to: new.is_lactating,
        });
    }
    if old.location != new.location && (!old.location.is_empty() || !new.location.is_empty()) {
        changes.push(FieldChange::Location {
            from: old.location.clone(),
            to: new.location.clone(),
        });
    }
    changes
}

/// Animals without an id take no part in the comparison.
pub fn compare_livestock(old: &[AnimalRef], new: &[AnimalRef]) -> LivestockChanges {
    let old_index = index_by_id(old);
    let new_index = index_by_id(new);
    let mut changes = LivestockChanges::default();
    let mut seen = HashSet::new();

    for animal in new.iter().filter(|animal| animal.has_id()) {
        if !seen.insert(animal.id.as_str()) {
            continue;
        }
        match old_index.get(animal.id.as_str()) {
            None => changes.added.push(animal.clone()),
            Some(previous) => {
                let fields = animal_changes(previous, animal);
                if !fields.is_empty() {
                    changes.updated.push(AnimalUpdate {
                        animal: animal.clone(),
                        changes: fields,
                    });
                }
            }
        }
    }

    seen.clear();
    for animal in old.iter().filter(|animal| animal.has_id()) {
        if seen.insert(animal.id.as_str()) && !new_index.contains_key(animal.id.as_str()) {
            changes.removed.push(animal.clone());
        }
    }
    changes
}

fn keyed_warnings(pastures: &[Pasture]) -> Vec<(String, PastureWarning)> {
    let mut seen = HashSet::new();
    pastures
        .iter()
        .flat_map(|pasture| {
            pasture.all_warnings.iter().map(move |warning| {
                (
                    warning.key(&pasture.id),
                    PastureWarning {
                        pasture_id: pasture.id.clone(),
                        pasture_name: pasture.name.clone(),
                        warning: warning.clone(),
                    },
                )
            })
        })
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect()
}

pub fn compare_warnings(old: &[Pasture], new: &[Pasture]) -> WarningChanges {
    let old_warnings = keyed_warnings(old);
    let new_warnings = keyed_warnings(new);
    let old_keys: BTreeSet<&str> = old_warnings.iter().map(|(key, _)| key.as_str()).collect();
    let new_keys: BTreeSet<&str> = new_warnings.iter().map(|(key, _)| key.as_str()).collect();

    WarningChanges {
        new_warnings: new_warnings
            .iter()
            .filter(|(key, _)| !old_keys.contains(key.as_str()))
            .map(|(_, warning)| warning.clone())
            .collect(),
        resolved_warnings: old_warnings
            .iter()
            .filter(|(key, _)| !new_keys.contains(key.as_str()))
            .map(|(_, warning)| warning.clone())
            .collect(),
    }
}

fn index_pastures(pastures: &[Pasture]) -> Result<HashMap<&str, &Pasture>, DiffError> {
    let mut index = HashMap::with_capacity(pastures.len());
    for pasture in pastures {
        if index.insert(pasture.id.as_str(), pasture).is_some() {
            return Err(DiffError::DuplicatePasture(pasture.id.clone()));
        }
    }
    Ok(index)
}

pub fn compare_food_levels(
    old: &[Pasture],
    new: &[Pasture],
) -> Result<Vec<FoodLevelChange>, DiffError> {
    let old_index = index_pastures(old)?;
    index_pastures(new)?;

    let mut changes = Vec::new();
    for pasture in new {
        let Some(previous) = old_index.get(pasture.id.as_str()) else {
            continue;
        };
        let from = previous.food_level();
        let to = pasture.food_level();
        let mut push = |kind| {
            changes.push(FoodLevelChange {
                pasture_id: pasture.id.clone(),
                pasture_name: pasture.name.clone(),
                kind,
                from,
                to,
            })
        };
        if from >= LOW_FOOD_LEVEL && to < LOW_FOOD_LEVEL {
            push(FoodLevelChangeKind::BelowThreshold);
        }
        if from - to > SHARP_DROP && to < SHARP_DROP_CEILING {
            push(FoodLevelChangeKind::SharpDrop);
        }
    }
    Ok(changes)
}

pub fn compare_statistics(old: &FarmSnapshot, new: &FarmSnapshot) -> StatisticsChanges {
    StatisticsChanges {
        livestock: CountChange::new(old.animals.len(), new.animals.len()),
        pastures: CountChange::new(old.pastures.len(), new.pastures.len()),
        farms: CountChange::new(old.player_farms.len(), new.player_farms.len()),
    }
}

pub fn compare_snapshots(old: &FarmSnapshot, new: &FarmSnapshot) -> Result<ChangeSet, DiffError> {
    let food_levels = compare_food_levels(&old.pastures, &new.pastures)?;
    let livestock = compare_livestock(&old.animals, &new.animals);
    let warnings = compare_warnings(&old.pastures, &new.pastures);
    let statistics = compare_statistics(old, new);
    let game_time = (old.game_time != new.game_time).then(|| GameTimeChange {
        from: old.game_time.clone(),
        to: new.game_time.clone(),
    });

    let has_significant_changes = !livestock.is_empty()
        || !warnings.is_empty()
        || !food_levels.is_empty()
        || game_time.is_some()
        || statistics.livestock.changed
        || statistics.pastures.changed;

    Ok(ChangeSet {
        livestock,
        warnings,
        food_levels,
        statistics,
        game_time,
        has_significant_changes,
    })
}

//! Rule battery run over one pasture's herd.
//!
//! Checks run in a fixed order and only read their inputs, so identical
//! inputs always give an identical warning list.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::reports::{ConditionReport, FoodReport, Telemetry};
use crate::livestock::AnimalRef;

const FOOD_WARNING_RATIO: f64 = 0.20;
const FOOD_DANGER_RATIO: f64 = 0.10;
const LOW_HEALTH: f64 = 70.0;
const CRITICAL_HEALTH: f64 = 20.0;
const PRODUCTION_NOTICE_COWS: usize = 5;
const WASTE_COLLECTION_LEVEL: f64 = 500.0;
const BREEDING_MIN_FEMALES: usize = 10;
const BREEDING_RATIO_LIMIT: f64 = 20.0;
const OLD_AGE_FRACTION: f64 = 0.8;
const OLD_HERD_SHARE: f64 = 0.3;
const OFFSPRING_AGE_MONTHS: f64 = 12.0;
const MILK_GAIN_PER_MOTHER: f64 = 15.0;
const BIRTH_DUE_MONTHS: f64 = 1.0;
const BIRTH_NAMES_SHOWN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Food,
    Water,
    Health,
    Production,
    Maintenance,
    Breeding,
    Age,
    DairyOptimization,
    Birth,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::Food => "food",
            WarningKind::Water => "water",
            WarningKind::Health => "health",
            WarningKind::Production => "production",
            WarningKind::Maintenance => "maintenance",
            WarningKind::Breeding => "breeding",
            WarningKind::Age => "age",
            WarningKind::DairyOptimization => "dairy_optimization",
            WarningKind::Birth => "birth",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            WarningKind::Food => "bi-basket",
            WarningKind::Water => "bi-droplet",
            WarningKind::Health => "bi-heart-pulse",
            WarningKind::Production => "bi-graph-up",
            WarningKind::Maintenance => "bi-tools",
            WarningKind::Breeding => "bi-gender-ambiguous",
            WarningKind::Age => "bi-hourglass-split",
            WarningKind::DairyOptimization => "bi-cup-straw",
            WarningKind::Birth => "bi-calendar-heart",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotherOffspring {
    pub mother: AnimalRef,
    pub potential_offspring: Vec<AnimalRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthDue {
    pub animal: AnimalRef,
    pub gestation_months: f64,
    pub progress: f64,
    pub months_remaining: f64,
}

/// Per-kind payload so a renderer can draw a breakdown without recomputing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WarningDetails {
    FoodLevel {
        total_mixed_ration: f64,
        capacity: f64,
        percent: f64,
    },
    DataUnavailable {
        animal_count: usize,
    },
    Health {
        low_health: usize,
        critical: usize,
    },
    Production {
        lactating_cows: usize,
        daily_milk: f64,
    },
    Maintenance {
        manure: f64,
        slurry: f64,
        liquid_manure: f64,
        total: f64,
    },
    Breeding {
        males: usize,
        females: usize,
        ratio: f64,
    },
    Age {
        old_animals: usize,
        herd_size: usize,
        percent: f64,
    },
    DairyOptimization {
        pairs: Vec<MotherOffspring>,
        estimated_gain_per_day: f64,
    },
    Birth {
        due: Vec<BirthDue>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_animals: Vec<AnimalRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<WarningDetails>,
}

impl Warning {
    pub fn new(kind: WarningKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            icon: kind.icon().to_string(),
            affected_animals: Vec::new(),
            details: None,
        }
    }

    pub fn with_animals(mut self, animals: Vec<AnimalRef>) -> Self {
        self.affected_animals = animals;
        self
    }

    pub fn with_details(mut self, details: WarningDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Identity used when diffing two rebuilds of the same pasture.
    pub fn key(&self, pasture_id: &str) -> String {
        format!(
            "{}-{}-{}",
            pasture_id,
            self.kind.as_str(),
            self.message.to_lowercase()
        )
    }
}

/// Species an animal type belongs to; cows and bulls are one species.
pub fn species(kind: &str) -> &str {
    match kind {
        "BULL" => "COW",
        other => other,
    }
}

/// Life expectancy in months per animal type.
pub fn life_expectancy_months(kind: &str) -> f64 {
    match kind {
        "COW" | "BULL" => 180.0,
        "PIG" => 120.0,
        "SHEEP" => 144.0,
        "GOAT" => 180.0,
        "CHICKEN" => 96.0,
        "HORSE" => 360.0,
        _ => 180.0,
    }
}

/// Gestation length in months per animal type.
pub fn gestation_months(kind: &str) -> f64 {
    match kind {
        "COW" | "BULL" => 9.0,
        "PIG" => 4.0,
        "SHEEP" | "GOAT" => 5.0,
        "HORSE" => 11.0,
        "CHICKEN" => 1.0,
        _ => 9.0,
    }
}

/// Coarse gestation progress from the reproduction value (fraction, 1.0 = 100 %).
pub fn gestation_progress(reproduction: f64) -> f64 {
    let percent = reproduction * 100.0;
    if percent > 80.0 {
        0.8
    } else if percent > 60.0 {
        0.6
    } else if percent > 40.0 {
        0.4
    } else {
        0.2
    }
}

pub fn calculate_all_pasture_warnings(
    pasture_label: &str,
    animals: &[AnimalRef],
    condition: &Telemetry<ConditionReport>,
    food: &Telemetry<FoodReport>,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    check_food_and_water(animals, food, &mut warnings);
    warnings.extend(check_health(animals));
    warnings.extend(check_production(animals, condition.data()));
    warnings.extend(check_maintenance(food.data()));
    warnings.extend(check_breeding(animals));
    warnings.extend(check_age(animals));
    warnings.extend(check_dairy_optimization(animals));
    warnings.extend(check_birth_due(animals));
    debug!(
        pasture = pasture_label,
        animals = animals.len(),
        warnings = warnings.len(),
        "pasture warnings computed"
    );
    warnings
}

fn check_food_and_water(
    animals: &[AnimalRef],
    food: &Telemetry<FoodReport>,
    warnings: &mut Vec<Warning>,
) {
    let Some(report) = food.measured() else {
        if !animals.is_empty() {
            let details = WarningDetails::DataUnavailable {
                animal_count: animals.len(),
            };
            warnings.push(
                Warning::new(
                    WarningKind::Food,
                    Severity::Danger,
                    "Food data unavailable - check feed levels immediately",
                )
                .with_details(details.clone()),
            );
            warnings.push(
                Warning::new(
                    WarningKind::Water,
                    Severity::Danger,
                    "Water data unavailable - check water supply immediately",
                )
                .with_details(details),
            );
        }
        return;
    };

    // Thresholds are relative to capacity.
    let level = report.total_mixed_ration;
    let capacity = report.total_capacity;
    if capacity <= 0.0 {
        return;
    }
    let ratio = level / capacity;
    let (severity, message) = if ratio < FOOD_DANGER_RATIO {
        (Severity::Danger, "Food level critical")
    } else if ratio < FOOD_WARNING_RATIO {
        (Severity::Warning, "Food level low")
    } else {
        return;
    };
    warnings.push(
        Warning::new(WarningKind::Food, severity, message).with_details(
            WarningDetails::FoodLevel {
                total_mixed_ration: level,
                capacity,
                percent: (ratio * 100.0).round(),
            },
        ),
    );
}

fn check_health(animals: &[AnimalRef]) -> Option<Warning> {
    let low: Vec<AnimalRef> = animals
        .iter()
        .filter(|animal| animal.health < LOW_HEALTH)
        .cloned()
        .collect();
    if low.is_empty() {
        return None;
    }
    let critical = low
        .iter()
        .filter(|animal| animal.health < CRITICAL_HEALTH)
        .count();
    let severity = if critical > 0 {
        Severity::Danger
    } else {
        Severity::Warning
    };
    let message = format!(
        "{} animals with low health ({} critical)",
        low.len(),
        critical
    );
    let details = WarningDetails::Health {
        low_health: low.len(),
        critical,
    };
    Some(
        Warning::new(WarningKind::Health, severity, message)
            .with_animals(low)
            .with_details(details),
    )
}

fn check_production(animals: &[AnimalRef], condition: &ConditionReport) -> Option<Warning> {
    let lactating_cows = animals
        .iter()
        .filter(|animal| animal.is_type("COW") && animal.is_lactating)
        .count();
    if lactating_cows <= PRODUCTION_NOTICE_COWS {
        return None;
    }
    let daily_milk = condition.milk;
    Some(
        Warning::new(
            WarningKind::Production,
            Severity::Info,
            format!("{lactating_cows} lactating cows in production"),
        )
        .with_details(WarningDetails::Production {
            lactating_cows,
            daily_milk,
        }),
    )
}

fn check_maintenance(food: &FoodReport) -> Option<Warning> {
    let total = food.waste_storage();
    if total <= WASTE_COLLECTION_LEVEL {
        return None;
    }
    Some(
        Warning::new(
            WarningKind::Maintenance,
            Severity::Warning,
            "Manure and slurry waiting to be collected",
        )
        .with_details(WarningDetails::Maintenance {
            manure: food.manure,
            slurry: food.slurry,
            liquid_manure: food.liquid_manure,
            total,
        }),
    )
}

fn check_breeding(animals: &[AnimalRef]) -> Option<Warning> {
    let males = animals.iter().filter(|animal| animal.is_male()).count();
    let females = animals.iter().filter(|animal| animal.is_female()).count();
    if males == 0 || females <= BREEDING_MIN_FEMALES {
        return None;
    }
    let ratio = females as f64 / males as f64;
    if ratio <= BREEDING_RATIO_LIMIT {
        return None;
    }
    Some(
        Warning::new(
            WarningKind::Breeding,
            Severity::Info,
            format!("{females} females per {males} males (ratio {ratio:.1}:1)"),
        )
        .with_details(WarningDetails::Breeding {
            males,
            females,
            ratio,
        }),
    )
}

fn check_age(animals: &[AnimalRef]) -> Option<Warning> {
    if animals.is_empty() {
        return None;
    }
    let old: Vec<AnimalRef> = animals
        .iter()
        .filter(|animal| animal.age > life_expectancy_months(&animal.kind) * OLD_AGE_FRACTION)
        .cloned()
        .collect();
    let share = old.len() as f64 / animals.len() as f64;
    if share <= OLD_HERD_SHARE {
        return None;
    }
    let percent = (share * 100.0).round();
    let details = WarningDetails::Age {
        old_animals: old.len(),
        herd_size: animals.len(),
        percent,
    };
    Some(
        Warning::new(
            WarningKind::Age,
            Severity::Warning,
            format!(
                "{} of {} animals are nearing the end of their life expectancy ({percent}%)",
                old.len(),
                animals.len()
            ),
        )
        .with_animals(old)
        .with_details(details),
    )
}

fn is_dairy_mother(animal: &AnimalRef) -> bool {
    animal.is_lactating
        && (animal.is_type("COW") || animal.is_type("GOAT") || animal.is_type("SHEEP"))
}

fn check_dairy_optimization(animals: &[AnimalRef]) -> Option<Warning> {
    let pairs: Vec<MotherOffspring> = animals
        .iter()
        .filter(|animal| is_dairy_mother(animal))
        .filter_map(|mother| {
            let potential_offspring: Vec<AnimalRef> = animals
                .iter()
                .filter(|young| {
                    species(&young.kind) == species(&mother.kind)
                        && young.age < OFFSPRING_AGE_MONTHS
                        && !young.is_lactating
                        && young.id != mother.id
                })
                .cloned()
                .collect();
            (!potential_offspring.is_empty()).then(|| MotherOffspring {
                mother: mother.clone(),
                potential_offspring,
            })
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let estimated_gain_per_day = pairs.len() as f64 * MILK_GAIN_PER_MOTHER;
    let mothers: Vec<AnimalRef> = pairs.iter().map(|pair| pair.mother.clone()).collect();
    Some(
        Warning::new(
            WarningKind::DairyOptimization,
            Severity::Info,
            format!(
                "{} lactating mothers share the pasture with young animals; separating them could add about {estimated_gain_per_day:.0} L of milk per day",
                pairs.len()
            ),
        )
        .with_animals(mothers)
        .with_details(WarningDetails::DairyOptimization {
            pairs,
            estimated_gain_per_day,
        }),
    )
}

fn check_birth_due(animals: &[AnimalRef]) -> Option<Warning> {
    let due: Vec<BirthDue> = animals
        .iter()
        .filter(|animal| animal.is_pregnant)
        .filter_map(|animal| {
            let gestation = gestation_months(&animal.kind);
            let progress = gestation_progress(animal.reproduction);
            let months_remaining = gestation * (1.0 - progress);
            (months_remaining <= BIRTH_DUE_MONTHS).then(|| BirthDue {
                animal: animal.clone(),
                gestation_months: gestation,
                progress,
                months_remaining,
            })
        })
        .collect();
    if due.is_empty() {
        return None;
    }
    let listed = due
        .iter()
        .take(BIRTH_NAMES_SHOWN)
        .map(|entry| entry.animal.display_name())
        .collect::<Vec<_>>()
        .join(", ");
    let overflow = due.len().saturating_sub(BIRTH_NAMES_SHOWN);
    let message = if overflow > 0 {
        format!(
            "{} animals expected to give birth within a month: {listed} and {overflow} more",
            due.len()
        )
    } else {
        format!(
            "{} animals expected to give birth within a month: {listed}",
            due.len()
        )
    };
    let affected = due.iter().map(|entry| entry.animal.clone()).collect();
    Some(
        Warning::new(WarningKind::Birth, Severity::Warning, message)
            .with_animals(affected)
            .with_details(WarningDetails::Birth { due }),
    )
}

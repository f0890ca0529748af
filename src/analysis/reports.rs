//! Per-building condition and food reports.
//!
//! Both reports come in two flavours: measured from live telemetry, or
//! estimated from the animal list. [`Telemetry`] keeps the distinction in the
//! type so an estimate cannot silently stand in for ground truth. At the JSON
//! boundary it flattens back into the report with a `hasRealData` flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::livestock::AnimalRef;
use crate::normalize::{normalize_numeric_value, FieldLookup, RawRecord};

pub type FillLevels = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry<T> {
    Measured(T),
    Estimated(T),
}

impl<T> Telemetry<T> {
    pub fn is_measured(&self) -> bool {
        matches!(self, Telemetry::Measured(_))
    }

    pub fn data(&self) -> &T {
        match self {
            Telemetry::Measured(data) | Telemetry::Estimated(data) => data,
        }
    }

    pub fn measured(&self) -> Option<&T> {
        match self {
            Telemetry::Measured(data) => Some(data),
            Telemetry::Estimated(_) => None,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Telemetry::Measured(data) | Telemetry::Estimated(data) => data,
        }
    }
}

#[derive(Serialize)]
struct TaggedRef<'a, T> {
    #[serde(flatten)]
    data: &'a T,
    #[serde(rename = "hasRealData")]
    has_real_data: bool,
}

#[derive(Deserialize)]
struct Tagged<T> {
    #[serde(flatten)]
    data: T,
    #[serde(rename = "hasRealData", default)]
    has_real_data: bool,
}

impl<T: Serialize> Serialize for Telemetry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaggedRef {
            data: self.data(),
            has_real_data: self.is_measured(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Telemetry<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tagged = Tagged::<T>::deserialize(deserializer)?;
        Ok(if tagged.has_real_data {
            Telemetry::Measured(tagged.data)
        } else {
            Telemetry::Estimated(tagged.data)
        })
    }
}

/// Live production/storage figures reported for one husbandry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HusbandryData {
    /// Fraction, `1.0` = 100 %.
    pub productivity: Option<f64>,
    pub milk: Option<f64>,
    pub straw: Option<f64>,
    pub manure: Option<f64>,
    pub slurry: Option<f64>,
    pub pallets: Option<f64>,
    pub eggs: Option<f64>,
    pub wool: Option<f64>,
    pub water: Option<f64>,
    pub food: Option<f64>,
    pub food_capacity: Option<f64>,
    pub storage_data: Option<FillLevels>,
    pub fill_levels: Option<FillLevels>,
    /// Mixed ration reported directly under the `FORAGE` key.
    pub forage: Option<f64>,
}

impl HusbandryData {
    pub fn from_record(record: &RawRecord) -> Self {
        Self {
            productivity: record.optional_number(&["productivity"]),
            milk: record.optional_number(&["milk", "MILK"]),
            straw: record.optional_number(&["straw"]),
            manure: record.optional_number(&["manure"]),
            slurry: record.optional_number(&["slurry", "liquidManure"]),
            pallets: record.optional_number(&["pallets"]),
            eggs: record.optional_number(&["eggs"]),
            wool: record.optional_number(&["wool"]),
            water: record.optional_number(&["water"]),
            food: record.optional_number(&["food"]),
            food_capacity: record.optional_number(&["foodCapacity", "capacity"]),
            storage_data: record.object(&["storageData"]).map(fill_levels_from),
            fill_levels: record.object(&["fillLevels"]).map(fill_levels_from),
            forage: record.optional_number(&["FORAGE"]),
        }
    }

    fn production_fields(&self) -> [Option<f64>; 10] {
        [
            self.productivity,
            self.milk,
            self.straw,
            self.manure,
            self.slurry,
            self.pallets,
            self.eggs,
            self.wool,
            self.water,
            self.food,
        ]
    }

    fn has_production_telemetry(&self) -> bool {
        self.production_fields()
            .iter()
            .any(|value| value.is_some_and(|v| v > 0.0))
    }

    fn has_storage_telemetry(&self) -> bool {
        self.storage_data.is_some() || self.fill_levels.is_some() || self.forage.is_some()
    }
}

/// Fill type names are upper-cased so `hay` and `HAY` land on the same key.
pub fn fill_levels_from(record: &RawRecord) -> FillLevels {
    record
        .iter()
        .map(|(key, value)| (key.trim().to_ascii_uppercase(), normalize_numeric_value(value)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionReport {
    pub productivity: f64,
    pub milk: f64,
    pub straw: f64,
    pub manure: f64,
    pub slurry: f64,
    pub pallets: f64,
    pub eggs: f64,
    pub wool: f64,
    pub water: f64,
    pub food: f64,
}

const MILK_PER_LACTATING_COW: f64 = 20.0;
const STRAW_PER_ANIMAL: f64 = 1.0;

fn manure_per_day(kind: &str) -> f64 {
    match kind {
        "COW" => 3.0,
        "PIG" => 2.0,
        _ => 1.0,
    }
}

pub fn calculate_condition_report(
    animals: &[AnimalRef],
    husbandry: Option<&HusbandryData>,
) -> Telemetry<ConditionReport> {
    if let Some(data) = husbandry.filter(|data| data.has_production_telemetry()) {
        let read = |value: Option<f64>| value.unwrap_or(0.0).max(0.0);
        return Telemetry::Measured(ConditionReport {
            productivity: (read(data.productivity) * 100.0).clamp(0.0, 100.0),
            milk: read(data.milk),
            straw: read(data.straw),
            manure: read(data.manure),
            slurry: read(data.slurry),
            pallets: read(data.pallets),
            eggs: read(data.eggs),
            wool: read(data.wool),
            water: read(data.water),
            food: read(data.food),
        });
    }

    let scored: Vec<f64> = animals
        .iter()
        .filter_map(|animal| animal.genetics.map(|g| g.productivity * 100.0))
        .collect();
    let productivity = if !scored.is_empty() {
        scored.iter().sum::<f64>() / scored.len() as f64
    } else if animals.is_empty() {
        0.0
    } else {
        100.0
    };
    let lactating_cows = animals
        .iter()
        .filter(|animal| animal.is_type("COW") && animal.is_lactating)
        .count() as f64;

    Telemetry::Estimated(ConditionReport {
        productivity: productivity.clamp(0.0, 100.0),
        milk: lactating_cows * MILK_PER_LACTATING_COW,
        straw: animals.len() as f64 * STRAW_PER_ANIMAL,
        manure: animals
            .iter()
            .map(|animal| manure_per_day(&animal.kind))
            .sum(),
        ..ConditionReport::default()
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodReport {
    pub total_capacity: f64,
    pub available_food: f64,
    pub total_mixed_ration: f64,
    pub hay: f64,
    pub silage: f64,
    pub grass: f64,
    pub straw: f64,
    pub water: f64,
    pub slurry: f64,
    pub liquid_manure: f64,
    pub milk: f64,
    pub manure: f64,
    pub meadow: f64,
}

impl FoodReport {
    /// Manure, slurry and liquid manure waiting to be collected.
    pub fn waste_storage(&self) -> f64 {
        self.manure + self.slurry + self.liquid_manure
    }
}

/// Fill-type lookup that prefers farm-wide totals over a single building.
struct FillSource<'a> {
    totals: Option<&'a FillLevels>,
    building: FillLevels,
}

impl FillSource<'_> {
    fn level(&self, names: &[&str]) -> f64 {
        names
            .iter()
            .find_map(|name| {
                self.totals
                    .and_then(|totals| totals.get(*name))
                    .or_else(|| self.building.get(*name))
            })
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    }

    fn has(&self, name: &str) -> bool {
        self.totals.is_some_and(|totals| totals.contains_key(name))
            || self.building.contains_key(name)
    }
}

pub fn calculate_food_report(
    husbandry: Option<&HusbandryData>,
    husbandry_totals: Option<&FillLevels>,
) -> Telemetry<FoodReport> {
    let Some(data) = husbandry.filter(|data| data.has_storage_telemetry()) else {
        return Telemetry::Estimated(FoodReport::default());
    };

    let mut building = FillLevels::new();
    for levels in [&data.storage_data, &data.fill_levels].into_iter().flatten() {
        for (name, amount) in levels {
            building.entry(name.clone()).or_insert(*amount);
        }
    }
    if let Some(forage) = data.forage {
        building.entry("FORAGE".to_string()).or_insert(forage);
    }
    let source = FillSource {
        totals: husbandry_totals.filter(|totals| !totals.is_empty()),
        building,
    };

    let hay = source.level(&["HAY", "DRYGRASS_WINDROW"]);
    let silage = source.level(&["SILAGE"]);
    let grass = source.level(&["GRASS_WINDROW", "GRASS"]);
    let meadow = source.level(&["MEADOW"]);
    let forage = source.level(&["FORAGE", "TOTALMIXEDRATION"]);
    let available_food = forage + hay + silage + grass;
    let total_mixed_ration = if source.has("FORAGE") || source.has("TOTALMIXEDRATION") {
        forage
    } else {
        available_food
    };

    Telemetry::Measured(FoodReport {
        total_capacity: data.food_capacity.unwrap_or(0.0).max(0.0),
        available_food,
        total_mixed_ration,
        hay,
        silage,
        grass,
        straw: source.level(&["STRAW"]),
        water: source.level(&["WATER"]),
        slurry: source.level(&["SLURRY"]),
        liquid_manure: source.level(&["LIQUIDMANURE"]),
        milk: source.level(&["MILK"]),
        manure: source.level(&["MANURE"]),
        meadow,
    })
}

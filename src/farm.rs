use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::reports::fill_levels_from;
use crate::analysis::{calculate_animal_value, Severity};
use crate::livestock::{Animal, AnimalRef};
use crate::normalize::{FieldLookup, RawRecord};
use crate::pasture::{Husbandry, Pasture};

pub const HUSBANDRY_LOCATION_TYPE: &str = "husbandry";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Savegame,
    LiveApi,
}

impl DataSource {
    /// Location and location type for animals that match no building.
    pub fn unhoused_location(self) -> (&'static str, &'static str) {
        match self {
            DataSource::Savegame => ("Unknown", "Unknown"),
            DataSource::LiveApi => ("Farm Field", "Open Range"),
        }
    }
}

/// Flattened records as produced by the save-file parser or the live API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    #[serde(default)]
    pub source: DataSource,
    #[serde(default)]
    pub game_time: RawRecord,
    #[serde(default)]
    pub farms: Vec<Value>,
    #[serde(default)]
    pub husbandries: Vec<Value>,
    /// Required; a snapshot without an animal list is structurally invalid.
    #[serde(default)]
    pub animals: Option<Value>,
    #[serde(default)]
    pub husbandry_totals: Option<RawRecord>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("snapshot has no animal list")]
    MissingAnimals,
    #[error("snapshot section '{0}' must be an array")]
    NotAnArray(String),
    #[error("record {index} in '{section}' is not an object")]
    InvalidRecord { section: String, index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTime {
    pub day: i64,
    /// Milliseconds into the current day, as stored in `environment.xml`.
    pub time: f64,
}

impl GameTime {
    pub fn from_record(record: &RawRecord) -> Self {
        Self {
            day: record.number(&["currentDay", "day"]) as i64,
            time: record.number(&["dayTime", "time"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: String,
    pub name: String,
    pub money: f64,
    pub loan: f64,
}

impl Farm {
    pub fn from_record(record: &RawRecord) -> Self {
        Self {
            id: record.text(&["farmId", "id"]),
            name: record.text(&["name"]),
            money: record.number(&["money"]),
            loan: record.number(&["loan"]),
        }
    }
}

/// One complete capture of farm state, rebuilt wholesale on every load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSnapshot {
    pub animals: Vec<AnimalRef>,
    pub pastures: Vec<Pasture>,
    pub player_farms: Vec<Farm>,
    pub game_time: GameTime,
}

fn records<'a>(section: &str, values: &'a [Value]) -> Result<Vec<&'a RawRecord>, IngestError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.as_object().ok_or_else(|| IngestError::InvalidRecord {
                section: section.to_string(),
                index,
            })
        })
        .collect()
}

fn array<'a>(section: &str, value: &'a Value) -> Result<&'a [Value], IngestError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| IngestError::NotAnArray(section.to_string()))
}

impl FarmSnapshot {
    pub fn from_raw(raw: &RawSnapshot) -> Result<Self, IngestError> {
        let loose = array("animals", raw.animals.as_ref().ok_or(IngestError::MissingAnimals)?)?;
        let loose = records("animals", loose)?;
        let totals = raw.husbandry_totals.as_ref().map(fill_levels_from);

        let mut husbandries = Vec::with_capacity(raw.husbandries.len());
        let mut herds: Vec<Vec<AnimalRef>> = Vec::with_capacity(raw.husbandries.len());
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut animals: Vec<AnimalRef> = Vec::new();

        for (index, record) in records("husbandries", &raw.husbandries)?.into_iter().enumerate() {
            let mut husbandry = Husbandry::from_record(record);
            if husbandry.id.is_empty() {
                husbandry.id = format!("husbandry-{index}");
            }
            if by_id.contains_key(&husbandry.id) {
                warn!(id = %husbandry.id, "duplicate husbandry id; loose animals match the first");
            } else {
                by_id.insert(husbandry.id.clone(), index);
            }

            let nested = match record.get("animals") {
                Some(value) => records("husbandries.animals", array("husbandries.animals", value)?)?,
                None => Vec::new(),
            };
            let herd: Vec<AnimalRef> = nested
                .into_iter()
                .enumerate()
                .map(|(position, animal)| {
                    let fallback = format!("{}-{}", husbandry.id, position);
                    Arc::new(
                        Animal::from_record(animal, Some(fallback))
                            .with_location(husbandry.name.clone(), HUSBANDRY_LOCATION_TYPE),
                    )
                })
                .collect();
            animals.extend(herd.iter().cloned());
            herds.push(herd);
            husbandries.push(husbandry);
        }

        let (field, field_kind) = raw.source.unhoused_location();
        for record in loose {
            let building = record.text(&["husbandryId", "placeableId"]);
            let animal = Animal::from_record(record, None);
            let animal = match by_id.get(&building) {
                Some(&index) if !building.is_empty() => {
                    let animal = Arc::new(animal.with_location(
                        husbandries[index].name.clone(),
                        HUSBANDRY_LOCATION_TYPE,
                    ));
                    herds[index].push(animal.clone());
                    animal
                }
                _ => Arc::new(animal.with_location(field, field_kind)),
            };
            animals.push(animal);
        }

        let pastures: Vec<Pasture> = husbandries
            .iter()
            .zip(herds)
            .map(|(husbandry, herd)| Pasture::build(husbandry, herd, totals.as_ref()))
            .collect();
        let player_farms = records("farms", &raw.farms)?
            .into_iter()
            .map(Farm::from_record)
            .collect();

        debug!(
            animals = animals.len(),
            pastures = pastures.len(),
            "snapshot ingested"
        );

        Ok(Self {
            animals,
            pastures,
            player_farms,
            game_time: GameTime::from_record(&raw.game_time),
        })
    }

    pub fn animal(&self, id: &str) -> Option<&AnimalRef> {
        self.animals.iter().find(|animal| animal.id == id)
    }

    pub fn pasture(&self, id: &str) -> Option<&Pasture> {
        self.pastures.iter().find(|pasture| pasture.id == id)
    }

    pub fn statistics(&self) -> FarmStatistics {
        let mut by_type: BTreeMap<String, TypeSummary> = BTreeMap::new();
        let mut total_value = 0;
        for animal in &self.animals {
            let value = calculate_animal_value(animal).value;
            total_value += value;
            let entry = by_type.entry(animal.kind.clone()).or_default();
            entry.count += 1;
            entry.value += value;
        }

        let mut warning_counts = WarningCounts::default();
        for warning in self.pastures.iter().flat_map(|p| &p.all_warnings) {
            match warning.severity {
                Severity::Info => warning_counts.info += 1,
                Severity::Warning => warning_counts.warning += 1,
                Severity::Danger => warning_counts.danger += 1,
            }
        }

        FarmStatistics {
            total_animals: self.animals.len(),
            total_value,
            by_type,
            pasture_count: self.pastures.len(),
            warning_counts,
            money: self.player_farms.iter().map(|farm| farm.money).sum(),
            loan: self.player_farms.iter().map(|farm| farm.loan).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub count: usize,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarningCounts {
    pub info: usize,
    pub warning: usize,
    pub danger: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmStatistics {
    pub total_animals: usize,
    pub total_value: u64,
    pub by_type: BTreeMap<String, TypeSummary>,
    pub pasture_count: usize,
    pub warning_counts: WarningCounts,
    pub money: f64,
    pub loan: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSnapshot {
        serde_json::from_value(value).expect("raw snapshot")
    }

    #[test]
    fn missing_animal_list_is_rejected() {
        let err = FarmSnapshot::from_raw(&raw(json!({"husbandries": []}))).unwrap_err();
        assert!(matches!(err, IngestError::MissingAnimals));
    }

    #[test]
    fn non_object_records_are_rejected() {
        let err = FarmSnapshot::from_raw(&raw(json!({"animals": [1]}))).unwrap_err();
        assert!(matches!(err, IngestError::InvalidRecord { index: 0, .. }));
        let err = FarmSnapshot::from_raw(&raw(json!({"animals": {}}))).unwrap_err();
        assert!(matches!(err, IngestError::NotAnArray(_)));
    }

    #[test]
    fn empty_animal_list_is_valid() {
        let snapshot = FarmSnapshot::from_raw(&raw(json!({"animals": []}))).unwrap();
        assert!(snapshot.animals.is_empty());
        assert!(snapshot.pastures.is_empty());
    }

    #[test]
    fn animals_are_matched_to_buildings() {
        let snapshot = FarmSnapshot::from_raw(&raw(json!({
            "source": "live_api",
            "gameTime": {"currentDay": "12", "dayTime": 3600000},
            "farms": [{"farmId": 1, "name": "Green Acres", "money": "150000.5", "loan": 0}],
            "husbandries": [{
                "id": "h1",
                "name": "Dairy",
                "filename": "cowBarnLarge.xml",
                "animals": [{"subType": "COW_HOLSTEIN", "gender": "female"}]
            }],
            "animals": [
                {"id": "x1", "subType": "COW_ANGUS", "husbandryId": "h1"},
                {"id": "x2", "subType": "SHEEP_LANDRACE"}
            ]
        })))
        .unwrap();

        assert_eq!(snapshot.game_time.day, 12);
        assert_eq!(snapshot.player_farms[0].money, 150000.5);
        assert_eq!(snapshot.animals.len(), 3);
        let dairy = snapshot.pasture("h1").expect("pasture");
        assert_eq!(dairy.animal_count, 2);
        assert_eq!(dairy.capacity, 180);
        assert_eq!(dairy.animals[0].id, "h1-0");
        assert_eq!(dairy.animals[0].location, "Dairy");
        assert!(Arc::ptr_eq(&dairy.animals[1], snapshot.animal("x1").unwrap()));
        let stray = snapshot.animal("x2").unwrap();
        assert_eq!(stray.location, "Farm Field");
        assert_eq!(stray.location_type, "Open Range");
    }

    #[test]
    fn savegame_strays_are_unknown() {
        let snapshot =
            FarmSnapshot::from_raw(&raw(json!({"animals": [{"subType": "PIG_LANDRACE"}]})))
                .unwrap();
        assert_eq!(snapshot.animals[0].location, "Unknown");
        assert!(!snapshot.animals[0].has_id());
    }

    #[test]
    fn statistics_group_by_type() {
        let snapshot = FarmSnapshot::from_raw(&raw(json!({
            "farms": [{"id": 1, "money": 1000}, {"id": 2, "money": 500, "loan": 200}],
            "animals": [
                {"id": "a", "subType": "COW_HOLSTEIN", "age": 24, "weight": 595},
                {"id": "b", "subType": "COW_HOLSTEIN", "age": 24, "weight": 595},
                {"id": "c", "subType": "GOAT"}
            ]
        })))
        .unwrap();
        let stats = snapshot.statistics();
        assert_eq!(stats.total_animals, 3);
        assert_eq!(stats.by_type["COW"].count, 2);
        assert_eq!(stats.by_type["COW"].value, 4500);
        assert_eq!(stats.money, 1500.0);
        assert_eq!(stats.loan, 200.0);
    }
}

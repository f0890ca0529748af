use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::normalize::{FieldLookup, RawRecord};

pub const NO_PARENT: &str = "-1";

pub type AnimalRef = Arc<Animal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

/// Trait multipliers; `1.0` is the breed baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genetics {
    pub metabolism: f64,
    pub quality: f64,
    pub health: f64,
    pub fertility: f64,
    pub productivity: f64,
}

impl Default for Genetics {
    fn default() -> Self {
        Self {
            metabolism: 1.0,
            quality: 1.0,
            health: 1.0,
            fertility: 1.0,
            productivity: 1.0,
        }
    }
}

impl Genetics {
    fn from_record(record: &RawRecord) -> Self {
        Self {
            metabolism: record.number_or(&["metabolism"], 1.0),
            quality: record.number_or(&["quality"], 1.0),
            health: record.number_or(&["health"], 1.0),
            fertility: record.number_or(&["fertility"], 1.0),
            productivity: record.number_or(&["productivity"], 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    /// Empty when the source carried no identifier; such animals are never diffed.
    pub id: String,
    pub name: String,
    pub sub_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Months. Fractional values occur in live telemetry.
    pub age: f64,
    pub health: f64,
    pub weight: f64,
    pub gender: Gender,
    pub is_parent: bool,
    pub is_pregnant: bool,
    pub is_lactating: bool,
    pub reproduction: f64,
    pub months_since_last_birth: i64,
    pub mother_id: String,
    pub father_id: String,
    pub farm_id: String,
    pub variation: i64,
    pub location: String,
    pub location_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genetics: Option<Genetics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirt: Option<f64>,
}

/// Breed tag prefix before the first underscore (`COW_HOLSTEIN` -> `COW`).
pub fn type_of(sub_type: &str) -> &str {
    sub_type.split('_').next().unwrap_or(sub_type)
}

impl Animal {
    pub fn new(id: impl Into<String>, sub_type: impl Into<String>) -> Self {
        let sub_type = sub_type.into().trim().to_ascii_uppercase();
        Self {
            id: id.into(),
            name: String::new(),
            kind: type_of(&sub_type).to_string(),
            sub_type,
            age: 0.0,
            health: 100.0,
            weight: 0.0,
            gender: Gender::Unknown,
            is_parent: false,
            is_pregnant: false,
            is_lactating: false,
            reproduction: 0.0,
            months_since_last_birth: 0,
            mother_id: NO_PARENT.to_string(),
            father_id: NO_PARENT.to_string(),
            farm_id: String::new(),
            variation: 0,
            location: String::new(),
            location_type: String::new(),
            genetics: None,
            fitness: None,
            riding: None,
            dirt: None,
        }
    }

    /// Builds an animal from a flattened save-game or live-API record.
    ///
    /// `fallback_id` is used when the record carries neither a
    /// RealisticLivestock `uniqueId` nor a plain `id`.
    pub fn from_record(record: &RawRecord, fallback_id: Option<String>) -> Self {
        let mut id = record.text(&["uniqueId", "id"]);
        if id.is_empty() {
            id = fallback_id.unwrap_or_default();
        }
        let sub_type = record.text(&["subType", "subtype", "type"]);
        let mut animal = Animal::new(id, sub_type);
        animal.name = record.text(&["name"]);
        animal.age = record.number(&["age"]).max(0.0);
        animal.health = record.number_or(&["health"], 100.0).clamp(0.0, 100.0);
        animal.weight = record.number(&["weight"]).max(0.0);
        animal.gender = Gender::parse(&record.text(&["gender"]));
        animal.is_parent = record.flag(&["isParent"]);
        animal.is_pregnant = record.flag(&["isPregnant"]);
        animal.is_lactating = record.flag(&["isLactating"]);
        animal.reproduction = record.number(&["reproduction"]).max(0.0);
        animal.months_since_last_birth = record.number(&["monthsSinceLastBirth"]) as i64;
        animal.mother_id = parent_id(record.text(&["motherId"]));
        animal.father_id = parent_id(record.text(&["fatherId"]));
        animal.farm_id = record.text(&["farmId"]);
        animal.variation = record.number(&["variation"]) as i64;
        animal.genetics = record.object(&["genetics"]).map(Genetics::from_record);
        animal.fitness = record.optional_number(&["fitness"]);
        animal.riding = record.optional_number(&["riding"]);
        animal.dirt = record.optional_number(&["dirt"]);
        animal
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn is_female(&self) -> bool {
        self.gender == Gender::Female
    }

    pub fn is_male(&self) -> bool {
        self.gender == Gender::Male
    }

    pub fn is_type(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.id.is_empty() {
            &self.id
        } else {
            &self.sub_type
        }
    }

    pub fn with_location(mut self, location: impl Into<String>, kind: impl Into<String>) -> Self {
        self.location = location.into();
        self.location_type = kind.into();
        self
    }
}

fn parent_id(raw: String) -> String {
    if raw.is_empty() || raw == "0" {
        NO_PARENT.to_string()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn type_is_prefix_of_sub_type() {
        assert_eq!(Animal::new("1", "COW_HOLSTEIN").kind, "COW");
        assert_eq!(Animal::new("2", "goat").kind, "GOAT");
        assert_eq!(Animal::new("3", "").kind, "");
    }

    #[test]
    fn record_fields_are_normalized() {
        let raw = record(json!({
            "uniqueId": " RL-0001 ",
            "name": "Daisy",
            "subType": "COW_HOLSTEIN",
            "age": "26",
            "health": "101",
            "weight": 612.5,
            "gender": "FEMALE",
            "isPregnant": "true",
            "isLactating": 1,
            "motherId": "",
            "genetics": {"quality": "1.2", "productivity": 0.9}
        }));
        let animal = Animal::from_record(&raw, None);
        assert_eq!(animal.id, "RL-0001");
        assert_eq!(animal.kind, "COW");
        assert_eq!(animal.age, 26.0);
        assert_eq!(animal.health, 100.0);
        assert_eq!(animal.gender, Gender::Female);
        assert!(animal.is_pregnant);
        assert!(animal.is_lactating);
        assert!(!animal.is_parent);
        assert_eq!(animal.mother_id, NO_PARENT);
        let genetics = animal.genetics.expect("genetics parsed");
        assert_eq!(genetics.quality, 1.2);
        assert_eq!(genetics.productivity, 0.9);
        assert_eq!(genetics.fertility, 1.0);
    }

    #[test]
    fn fallback_id_only_when_missing() {
        let raw = record(json!({"subType": "PIG_LANDRACE"}));
        assert_eq!(Animal::from_record(&raw, Some("barn-3".into())).id, "barn-3");
        assert!(!Animal::from_record(&raw, None).has_id());
    }

    #[test]
    fn missing_health_defaults_to_full() {
        let raw = record(json!({"id": "7", "subType": "COW_HOLSTEIN"}));
        assert_eq!(Animal::from_record(&raw, None).health, 100.0);
        let raw = record(json!({"id": "8", "subType": "COW_HOLSTEIN", "health": ""}));
        assert_eq!(Animal::from_record(&raw, None).health, 0.0);
    }
}

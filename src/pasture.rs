use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{
    calculate_all_pasture_warnings, calculate_animal_value, calculate_condition_report,
    calculate_food_report, calculate_milk_production, estimate_capacity, ConditionReport,
    FillLevels, FoodReport, HusbandryData, MilkProduction, Telemetry, Warning,
};
use crate::livestock::AnimalRef;
use crate::normalize::{FieldLookup, RawRecord};

/// A livestock building as read from `placeables.xml` or the live API,
/// without its animals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Husbandry {
    pub id: String,
    pub name: String,
    pub farm_id: String,
    pub type_name: String,
    pub capacity: Option<u32>,
    pub data: Option<HusbandryData>,
}

impl Husbandry {
    pub fn from_record(record: &RawRecord) -> Self {
        let type_name = record.text(&["filename", "typeName", "type"]);
        let id = record.text(&["uniqueId", "id"]);
        let mut name = record.text(&["name"]);
        if name.is_empty() {
            name = if type_name.is_empty() {
                id.clone()
            } else {
                type_name.clone()
            };
        }
        let capacity = record
            .optional_number(&["maxNumAnimals", "capacity"])
            .filter(|value| *value > 0.0)
            .map(|value| value.round() as u32);
        Self {
            id,
            name,
            farm_id: record.text(&["farmId"]),
            type_name,
            capacity,
            data: record
                .object(&["husbandryData", "husbandry"])
                .map(HusbandryData::from_record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pasture {
    pub id: String,
    pub name: String,
    pub farm_id: String,
    pub type_name: String,
    pub animals: Vec<AnimalRef>,
    pub animal_count: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub avg_health: f64,
    pub condition_report: Telemetry<ConditionReport>,
    pub food_report: Telemetry<FoodReport>,
    #[serde(rename = "milkProductionData")]
    pub milk_production: MilkProduction,
    pub all_warnings: Vec<Warning>,
    pub capacity: u32,
}

impl Pasture {
    /// Builds the aggregate from scratch; pastures are never patched in place.
    pub fn build(
        husbandry: &Husbandry,
        animals: Vec<AnimalRef>,
        husbandry_totals: Option<&FillLevels>,
    ) -> Self {
        let data = husbandry.data.as_ref();
        let condition_report = calculate_condition_report(&animals, data);
        let food_report = calculate_food_report(data, husbandry_totals);
        let milk_production = calculate_milk_production(&husbandry.name, &animals);
        let all_warnings = calculate_all_pasture_warnings(
            &husbandry.name,
            &animals,
            &condition_report,
            &food_report,
        );
        let capacity = husbandry
            .capacity
            .unwrap_or_else(|| estimate_capacity(&husbandry.type_name));

        debug!(
            pasture = %husbandry.name,
            animals = animals.len(),
            measured_food = food_report.is_measured(),
            "pasture rebuilt"
        );

        Self {
            id: husbandry.id.clone(),
            name: husbandry.name.clone(),
            farm_id: husbandry.farm_id.clone(),
            type_name: husbandry.type_name.clone(),
            animal_count: animals.len(),
            male_count: animals.iter().filter(|animal| animal.is_male()).count(),
            female_count: animals.iter().filter(|animal| animal.is_female()).count(),
            avg_health: average_health(&animals),
            animals,
            condition_report,
            food_report,
            milk_production,
            all_warnings,
            capacity,
        }
    }

    /// Re-runs the warning battery against the stored animals and reports.
    pub fn recompute_warnings(&self) -> Vec<Warning> {
        calculate_all_pasture_warnings(
            &self.name,
            &self.animals,
            &self.condition_report,
            &self.food_report,
        )
    }

    pub fn total_value(&self) -> u64 {
        self.animals
            .iter()
            .map(|animal| calculate_animal_value(animal).value)
            .sum()
    }

    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.animal_count as f64 / self.capacity as f64
        }
    }

    pub fn food_level(&self) -> f64 {
        self.food_report.data().total_mixed_ration
    }
}

fn average_health(animals: &[AnimalRef]) -> f64 {
    if animals.is_empty() {
        return 0.0;
    }
    (animals.iter().map(|animal| animal.health).sum::<f64>() / animals.len() as f64).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livestock::{Animal, Gender};
    use serde_json::json;
    use std::sync::Arc;

    fn herd() -> Vec<AnimalRef> {
        let mut a = Animal::new("a", "COW_HOLSTEIN");
        a.gender = Gender::Female;
        a.health = 91.0;
        let mut b = Animal::new("b", "COW_HOLSTEIN");
        b.gender = Gender::Male;
        b.health = 80.0;
        vec![Arc::new(a), Arc::new(b)]
    }

    #[test]
    fn husbandry_record_defaults() {
        let record = json!({
            "id": 12,
            "filename": "data/placeables/cowBarnSmall.xml",
            "farmId": 1
        })
        .as_object()
        .cloned()
        .unwrap();
        let husbandry = Husbandry::from_record(&record);
        assert_eq!(husbandry.id, "12");
        assert_eq!(husbandry.name, "data/placeables/cowBarnSmall.xml");
        assert_eq!(husbandry.capacity, None);
        assert!(husbandry.data.is_none());
    }

    #[test]
    fn aggregate_counts_and_estimated_capacity() {
        let husbandry = Husbandry {
            id: "7".into(),
            name: "North Barn".into(),
            type_name: "cowBarnSmall".into(),
            ..Husbandry::default()
        };
        let pasture = Pasture::build(&husbandry, herd(), None);
        assert_eq!(pasture.animal_count, 2);
        assert_eq!(pasture.male_count, 1);
        assert_eq!(pasture.female_count, 1);
        assert_eq!(pasture.avg_health, 86.0);
        assert_eq!(pasture.capacity, 45);
        assert!(!pasture.food_report.is_measured());
        assert!((pasture.occupancy() - 2.0 / 45.0).abs() < 1e-12);
    }

    #[test]
    fn animals_are_shared_not_copied() {
        let animals = herd();
        let husbandry = Husbandry {
            capacity: Some(10),
            ..Husbandry::default()
        };
        let pasture = Pasture::build(&husbandry, animals.clone(), None);
        assert!(Arc::ptr_eq(&pasture.animals[0], &animals[0]));
        assert_eq!(pasture.capacity, 10);
    }

    #[test]
    fn rebuilding_warnings_is_idempotent() {
        let husbandry = Husbandry::default();
        let pasture = Pasture::build(&husbandry, herd(), None);
        assert_eq!(pasture.recompute_warnings(), pasture.all_warnings);
        assert_eq!(pasture.recompute_warnings(), pasture.recompute_warnings());
    }
}

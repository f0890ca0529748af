use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::livestock::{Animal, AnimalRef};

/// Minimum age in months before a dairy animal counts as producing.
pub const MILKING_AGE_MONTHS: f64 = 18.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkProduction {
    pub lactating_cows: usize,
    /// Litres per in-game hour.
    pub hourly_production: f64,
    /// Always zero: the game API does not expose a trustworthy storage level.
    pub estimated_storage: f64,
    pub avg_productivity: f64,
}

/// Daily litres for a producing animal of this breed at full health.
pub fn daily_milk_rate(sub_type: &str) -> f64 {
    if sub_type.contains("HOLSTEIN") {
        200.0
    } else if sub_type.contains("BRAHMAN") || sub_type.contains("ANGUS") {
        100.0
    } else if sub_type.contains("COW") {
        150.0
    } else if sub_type.contains("GOAT") {
        30.0
    } else {
        0.0
    }
}

/// Only the explicit lactation flag counts; lactation is never inferred.
pub fn is_milk_producer(animal: &Animal) -> bool {
    (animal.sub_type.contains("COW") || animal.sub_type.contains("GOAT"))
        && animal.is_female()
        && animal.age >= MILKING_AGE_MONTHS
        && animal.is_lactating
}

pub fn calculate_milk_production(pasture_label: &str, animals: &[AnimalRef]) -> MilkProduction {
    let producers: Vec<&AnimalRef> = animals
        .iter()
        .filter(|animal| is_milk_producer(animal))
        .collect();

    let daily: f64 = producers
        .iter()
        .map(|animal| daily_milk_rate(&animal.sub_type) * animal.health / 100.0)
        .sum();
    let avg_productivity = if producers.is_empty() {
        0.0
    } else {
        producers
            .iter()
            .map(|animal| animal.genetics.map(|g| g.productivity).unwrap_or(1.0) * 100.0)
            .sum::<f64>()
            / producers.len() as f64
    };

    debug!(
        pasture = pasture_label,
        producers = producers.len(),
        daily_litres = daily,
        "estimated milk production"
    );

    MilkProduction {
        lactating_cows: producers.len(),
        hourly_production: daily / 24.0,
        estimated_storage: 0.0,
        avg_productivity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livestock::Gender;
    use std::sync::Arc;

    fn dairy(id: &str, sub_type: &str, lactating: bool) -> AnimalRef {
        let mut animal = Animal::new(id, sub_type);
        animal.gender = Gender::Female;
        animal.age = 30.0;
        animal.is_lactating = lactating;
        Arc::new(animal)
    }

    #[test]
    fn three_lactating_holsteins_in_ten() {
        let herd: Vec<AnimalRef> = (0..10)
            .map(|i| dairy(&format!("c{i}"), "COW_HOLSTEIN", i < 3))
            .collect();
        let milk = calculate_milk_production("Barn", &herd);
        assert_eq!(milk.lactating_cows, 3);
        assert!((milk.hourly_production - 25.0).abs() < 1e-9);
        assert_eq!(milk.estimated_storage, 0.0);
        assert_eq!(milk.avg_productivity, 100.0);
    }

    #[test]
    fn young_male_and_unflagged_animals_do_not_count() {
        let mut calf = Animal::new("calf", "COW_ANGUS");
        calf.gender = Gender::Female;
        calf.age = 17.0;
        calf.is_lactating = true;
        let mut bull = Animal::new("bull", "COW_ANGUS");
        bull.gender = Gender::Male;
        bull.age = 40.0;
        bull.is_lactating = true;
        let herd = vec![
            Arc::new(calf),
            Arc::new(bull),
            dairy("dry", "COW_ANGUS", false),
            dairy("sheep", "SHEEP_LANDRACE", true),
        ];
        let milk = calculate_milk_production("Pasture", &herd);
        assert_eq!(milk.lactating_cows, 0);
        assert_eq!(milk.hourly_production, 0.0);
        assert_eq!(milk.avg_productivity, 0.0);
    }

    #[test]
    fn health_scales_output_but_never_storage() {
        let mut goat = Animal::new("g", "GOAT");
        goat.gender = Gender::Female;
        goat.age = 24.0;
        goat.health = 50.0;
        goat.is_lactating = true;
        let milk = calculate_milk_production("Goats", &[Arc::new(goat)]);
        assert!((milk.hourly_production - 15.0 / 24.0).abs() < 1e-9);
        assert_eq!(milk.estimated_storage, 0.0);
    }
}

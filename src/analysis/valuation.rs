//! Market value estimate for a single animal.
//!
//! The age curves are piecewise-linear between fixed breakpoints. Golden-value
//! tests depend on the exact value at each breakpoint, so the tables here are
//! not to be smoothed.

use serde::Serialize;

use crate::livestock::{type_of, Animal};

/// Age (months) at which an animal may first reproduce.
pub const REPRODUCTION_MIN_AGE_MONTHS: f64 = 12.0;
const WEIGHT_RAMP_FACTOR: f64 = 1.5;
const TARGET_WEIGHT_SCALE: f64 = 0.85;
const VALUE_FLOOR_FRACTION: f64 = 0.05;
const PREGNANCY_BONUS: f64 = 0.25;
const LACTATION_BONUS: f64 = 0.15;

const DEFAULT_BASE_VALUE: f64 = 2500.0;
const DEFAULT_TARGET_WEIGHT: f64 = 100.0;
const DEFAULT_MIN_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreedProfile {
    pub base_value: f64,
    pub target_weight: f64,
    pub min_weight: f64,
}

const fn profile(base_value: f64, target_weight: f64, min_weight: f64) -> BreedProfile {
    BreedProfile {
        base_value,
        target_weight,
        min_weight,
    }
}

const BREEDS: &[(&str, BreedProfile)] = &[
    ("COW_HOLSTEIN", profile(2500.0, 700.0, 40.0)),
    ("COW_SWISS_BROWN", profile(2400.0, 650.0, 40.0)),
    ("COW_ANGUS", profile(2800.0, 800.0, 35.0)),
    ("COW_LIMOUSIN", profile(3000.0, 850.0, 40.0)),
    ("COW_BRAHMAN", profile(2600.0, 750.0, 30.0)),
    ("COW_WATERBUFFALO", profile(2700.0, 700.0, 35.0)),
    ("BULL_HOLSTEIN", profile(3000.0, 1000.0, 45.0)),
    ("BULL_SWISS_BROWN", profile(3100.0, 950.0, 45.0)),
    ("BULL_ANGUS", profile(3300.0, 1000.0, 40.0)),
    ("BULL_LIMOUSIN", profile(3500.0, 1100.0, 45.0)),
    ("BULL_BRAHMAN", profile(3200.0, 1000.0, 35.0)),
    ("PIG_LANDRACE", profile(400.0, 120.0, 1.5)),
    ("PIG_BLACK_PIED", profile(450.0, 125.0, 1.5)),
    ("PIG_BERKSHIRE", profile(500.0, 130.0, 1.5)),
    ("SHEEP_LANDRACE", profile(300.0, 75.0, 4.0)),
    ("SHEEP_STEINSCHAF", profile(320.0, 70.0, 4.0)),
    ("SHEEP_SWISS_MOUNTAIN", profile(340.0, 80.0, 4.0)),
    ("SHEEP_BLACK_WELSH", profile(350.0, 80.0, 4.0)),
    ("CHICKEN_ROOSTER", profile(30.0, 3.5, 0.05)),
];

const TYPES: &[(&str, BreedProfile)] = &[
    ("COW", profile(2500.0, 700.0, 40.0)),
    ("BULL", profile(3000.0, 1000.0, 45.0)),
    ("PIG", profile(400.0, 120.0, 1.5)),
    ("SHEEP", profile(300.0, 75.0, 4.0)),
    ("GOAT", profile(350.0, 65.0, 3.0)),
    ("CHICKEN", profile(25.0, 2.5, 0.05)),
    ("HORSE", profile(5000.0, 550.0, 50.0)),
];

/// Resolves by sub-type, then type prefix, then the cow-priced default.
pub fn breed_profile(sub_type: &str) -> BreedProfile {
    let lookup = |table: &[(&str, BreedProfile)], key: &str| {
        table
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, profile)| *profile)
    };
    lookup(BREEDS, sub_type)
        .or_else(|| lookup(TYPES, type_of(sub_type)))
        .unwrap_or(profile(
            DEFAULT_BASE_VALUE,
            DEFAULT_TARGET_WEIGHT,
            DEFAULT_MIN_WEIGHT,
        ))
}

/// Linear segment `[start, end)` in months mapping to `[from, to]` of base value.
struct Ramp {
    start: f64,
    end: f64,
    from: f64,
    to: f64,
}

impl Ramp {
    fn at(&self, age: f64) -> f64 {
        self.from + (age - self.start) / (self.end - self.start) * (self.to - self.from)
    }
}

struct AgeCurve {
    newborn: f64,
    growth: [Ramp; 2],
    prime_until: f64,
    decline: Ramp,
    elderly: f64,
}

impl AgeCurve {
    fn fraction(&self, age: f64) -> f64 {
        if age < self.growth[0].start {
            return self.newborn;
        }
        for ramp in &self.growth {
            if age < ramp.end {
                return ramp.at(age);
            }
        }
        if age <= self.prime_until {
            1.0
        } else if age <= self.decline.end {
            self.decline.at(age)
        } else {
            self.elderly
        }
    }
}

static COW_CURVE: AgeCurve = AgeCurve {
    newborn: 0.15,
    growth: [
        Ramp { start: 1.0, end: 6.0, from: 0.15, to: 0.50 },
        Ramp { start: 6.0, end: 12.0, from: 0.50, to: 0.98 },
    ],
    prime_until: 36.0,
    decline: Ramp { start: 36.0, end: 120.0, from: 1.0, to: 0.60 },
    elderly: 0.40,
};

static BULL_CURVE: AgeCurve = AgeCurve {
    newborn: 0.20,
    growth: [
        Ramp { start: 1.0, end: 6.0, from: 0.20, to: 0.55 },
        Ramp { start: 6.0, end: 15.0, from: 0.55, to: 1.0 },
    ],
    prime_until: 48.0,
    decline: Ramp { start: 48.0, end: 120.0, from: 1.0, to: 0.50 },
    elderly: 0.35,
};

static HORSE_CURVE: AgeCurve = AgeCurve {
    newborn: 0.10,
    growth: [
        Ramp { start: 1.0, end: 12.0, from: 0.10, to: 0.40 },
        Ramp { start: 12.0, end: 36.0, from: 0.40, to: 1.0 },
    ],
    prime_until: 144.0,
    decline: Ramp { start: 144.0, end: 300.0, from: 1.0, to: 0.30 },
    elderly: 0.25,
};

static DEFAULT_CURVE: AgeCurve = AgeCurve {
    newborn: 0.20,
    growth: [
        Ramp { start: 1.0, end: 6.0, from: 0.20, to: 0.70 },
        Ramp { start: 6.0, end: 12.0, from: 0.70, to: 1.0 },
    ],
    prime_until: 48.0,
    decline: Ramp { start: 48.0, end: 96.0, from: 1.0, to: 0.50 },
    elderly: 0.40,
};

fn age_curve(sub_type: &str) -> &'static AgeCurve {
    if sub_type.starts_with("COW") {
        &COW_CURVE
    } else if sub_type.starts_with("BULL") {
        &BULL_CURVE
    } else if sub_type.starts_with("HORSE") {
        &HORSE_CURVE
    } else {
        &DEFAULT_CURVE
    }
}

/// Fraction of base value an animal of this sub-type fetches at `age` months.
pub fn age_value_fraction(sub_type: &str, age: f64) -> f64 {
    age_curve(sub_type).fraction(age.max(0.0))
}

/// Expected weight for age: a ramp from `min_weight` to `target_weight`
/// over 1.5x the reproduction age, scaled by 0.85.
pub fn target_weight_for_age(profile: &BreedProfile, age: f64) -> f64 {
    let ramp_months = REPRODUCTION_MIN_AGE_MONTHS * WEIGHT_RAMP_FACTOR;
    let progress = (age.max(0.0) / ramp_months).min(1.0);
    (profile.min_weight + (profile.target_weight - profile.min_weight) * progress)
        * TARGET_WEIGHT_SCALE
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueBreakdown {
    pub base_value: f64,
    pub age_fraction: f64,
    pub target_weight: f64,
    pub target_weight_for_age: f64,
    pub weight_factor: f64,
    pub health_factor: f64,
    pub meat_factor: f64,
    pub pregnancy_bonus: f64,
    pub lactation_bonus: f64,
    pub sell_price: f64,
    pub floor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalValue {
    pub value: u64,
    pub breakdown: ValueBreakdown,
}

pub fn calculate_animal_value(animal: &Animal) -> AnimalValue {
    let profile = breed_profile(&animal.sub_type);
    let age_fraction = age_value_fraction(&animal.sub_type, animal.age);
    let mut sell_price = profile.base_value * age_fraction;

    let target_for_age = target_weight_for_age(&profile, animal.age);
    let weight_factor = if target_for_age > 0.0 {
        1.0 + (animal.weight - target_for_age) / target_for_age
    } else {
        1.0
    };
    let health_factor = animal.health / 100.0;
    let meat_factor = animal.genetics.map(|g| g.quality).unwrap_or(1.0);

    sell_price += sell_price * 0.25 * (meat_factor - 1.0);
    if profile.target_weight > 0.0 {
        sell_price +=
            (sell_price * 0.6 / profile.target_weight) * animal.weight * (meat_factor - 1.0);
    }

    let pregnancy_bonus = if animal.is_pregnant { PREGNANCY_BONUS } else { 0.0 };
    let lactation_bonus = if animal.is_lactating { LACTATION_BONUS } else { 0.0 };
    sell_price *= 1.0 + pregnancy_bonus + lactation_bonus;

    let minimum = sell_price * VALUE_FLOOR_FRACTION;
    let estimate = if animal.sub_type.starts_with("HORSE") {
        let fitness = animal.fitness.unwrap_or(0.0);
        let riding = animal.riding.unwrap_or(0.0);
        let dirt = animal.dirt.unwrap_or(0.0);
        (sell_price * 0.4 + sell_price * 0.3 * fitness + sell_price * 0.3 * riding
            - sell_price * 0.2 * dirt)
            * health_factor
    } else {
        sell_price * 0.6 + sell_price * 0.4 * weight_factor * 0.75 * health_factor
    };

    let floor = profile.base_value * VALUE_FLOOR_FRACTION;
    let value = estimate.max(minimum).max(floor).round().max(0.0) as u64;

    AnimalValue {
        value,
        breakdown: ValueBreakdown {
            base_value: profile.base_value,
            age_fraction,
            target_weight: profile.target_weight,
            target_weight_for_age: target_for_age,
            weight_factor,
            health_factor,
            meat_factor,
            pregnancy_bonus,
            lactation_bonus,
            sell_price,
            floor,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livestock::Genetics;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn profiles_fall_back_by_type_then_default() {
        assert_eq!(breed_profile("COW_ANGUS").base_value, 2800.0);
        assert_eq!(breed_profile("GOAT").target_weight, 65.0);
        assert_eq!(breed_profile("PIG_MYSTERY").base_value, 400.0);
        let unknown = breed_profile("ALPACA_WHITE");
        assert_eq!(unknown.base_value, 2500.0);
        assert_eq!(unknown.target_weight, 100.0);
        assert_eq!(unknown.min_weight, 10.0);
    }

    #[test]
    fn cow_curve_breakpoints() {
        let f = |age| age_value_fraction("COW_HOLSTEIN", age);
        assert!(close(f(0.0), 0.15));
        assert!(close(f(1.0), 0.15));
        assert!(close(f(6.0), 0.50));
        assert!(close(f(9.0), 0.74));
        assert!(close(f(12.0), 1.0));
        assert!(close(f(36.0), 1.0));
        assert!(close(f(78.0), 0.80));
        assert!(close(f(120.0), 0.60));
        assert!(close(f(121.0), 0.40));
    }

    #[test]
    fn species_curves_differ() {
        assert!(close(age_value_fraction("BULL_ANGUS", 15.0), 1.0));
        assert!(close(age_value_fraction("HORSE_BAY", 24.0), 0.70));
        assert!(close(age_value_fraction("PIG_LANDRACE", 6.0), 0.70));
        assert!(close(age_value_fraction("PIG_LANDRACE", 200.0), 0.40));
    }

    #[test]
    fn target_weight_ramps_over_eighteen_months() {
        let cow = breed_profile("COW_HOLSTEIN");
        assert!(close(target_weight_for_age(&cow, 0.0), 34.0));
        assert!(close(target_weight_for_age(&cow, 9.0), 314.5));
        assert!(close(target_weight_for_age(&cow, 18.0), 595.0));
        assert!(close(target_weight_for_age(&cow, 60.0), 595.0));
    }

    #[test]
    fn prime_cow_at_target_weight() {
        let mut cow = Animal::new("c1", "COW_HOLSTEIN");
        cow.age = 24.0;
        cow.weight = 595.0;
        let valued = calculate_animal_value(&cow);
        // 2500 * (0.6 + 0.4 * 1.0 * 0.75 * 1.0)
        assert_eq!(valued.value, 2250);
        assert!(close(valued.breakdown.weight_factor, 1.0));
    }

    #[test]
    fn pregnancy_and_lactation_stack() {
        let mut cow = Animal::new("c2", "COW_HOLSTEIN");
        cow.age = 24.0;
        cow.weight = 595.0;
        cow.is_pregnant = true;
        cow.is_lactating = true;
        let valued = calculate_animal_value(&cow);
        assert!(close(valued.breakdown.sell_price, 3500.0));
        assert_eq!(valued.value, 3150);
    }

    #[test]
    fn meat_quality_adjusts_sell_price() {
        let mut cow = Animal::new("c3", "COW_HOLSTEIN");
        cow.age = 24.0;
        cow.weight = 700.0;
        cow.genetics = Some(Genetics {
            quality: 1.2,
            ..Genetics::default()
        });
        let valued = calculate_animal_value(&cow);
        // 2500 -> 2625 -> 2625 + 2625*0.6/700*700*0.2 = 2940
        assert!(close(valued.breakdown.sell_price, 2940.0));
    }

    #[test]
    fn value_never_below_floor() {
        let mut sick = Animal::new("s1", "SHEEP_LANDRACE");
        sick.age = 300.0;
        sick.health = 0.0;
        sick.genetics = Some(Genetics {
            quality: 0.0,
            ..Genetics::default()
        });
        sick.weight = 500.0;
        let valued = calculate_animal_value(&sick);
        assert!(valued.value >= (300.0_f64 * 0.05).round() as u64);
    }

    #[test]
    fn horse_uses_training_factors() {
        let mut horse = Animal::new("h1", "HORSE_GRAY");
        horse.age = 60.0;
        let untrained = calculate_animal_value(&horse).value;
        horse.fitness = Some(1.0);
        horse.riding = Some(1.0);
        let trained = calculate_animal_value(&horse).value;
        assert_eq!(untrained, 2000);
        assert_eq!(trained, 5000);
    }
}

pub mod capacity;
pub mod milk;
pub mod reports;
pub mod valuation;
pub mod warnings;

pub use capacity::estimate_capacity;
pub use milk::{calculate_milk_production, MilkProduction};
pub use reports::{
    calculate_condition_report, calculate_food_report, ConditionReport, FillLevels, FoodReport,
    HusbandryData, Telemetry,
};
pub use valuation::{calculate_animal_value, AnimalValue, ValueBreakdown};
pub use warnings::{
    calculate_all_pasture_warnings, Severity, Warning, WarningDetails, WarningKind,
};

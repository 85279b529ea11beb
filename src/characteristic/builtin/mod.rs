//! Built-in characteristic codecs, grounded directly on their Bluetooth SIG
//! GSS definitions. Registered into a [`crate::characteristic::class_registry::ClassRegistry`]
//! by [`register_builtin`].

pub mod battery_level;
pub mod battery_level_status;
pub mod body_composition_feature;
pub mod body_composition_measurement;
pub mod cycling_power_feature;
pub mod cycling_power_measurement;
pub mod cycling_power_vector;
pub mod glucose_measurement;
pub mod glucose_measurement_context;
pub mod heart_rate_measurement;
pub mod humidity;
pub mod temperature;
pub mod unknown;
pub mod voc_concentration;

use crate::characteristic::class_registry::ClassRegistry;

/// Registers every built-in characteristic class. Called once from
/// [`ClassRegistry::with_builtins`](crate::characteristic::class_registry::ClassRegistry::with_builtins).
pub fn register_builtin(registry: &mut ClassRegistry) {
    battery_level::register(registry);
    battery_level_status::register(registry);
    temperature::register(registry);
    humidity::register(registry);
    heart_rate_measurement::register(registry);
    glucose_measurement::register(registry);
    glucose_measurement_context::register(registry);
    cycling_power_feature::register(registry);
    cycling_power_measurement::register(registry);
    cycling_power_vector::register(registry);
    body_composition_feature::register(registry);
    body_composition_measurement::register(registry);
    voc_concentration::register(registry);
}

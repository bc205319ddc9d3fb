use control::{ChangeDetectorConfig, Redlines, RegulatorConfig};
use mppt::TrackerConfig;
use pv::Array;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub regulator: RegulatorConfig,
    #[serde(default)]
    pub redlines: Redlines,
    #[serde(default)]
    pub change_detector: ChangeDetectorConfig,
    pub simulation: SimulationConfig,
}

/// Bench run: the array model stands in for the sensors and the boost stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub ticks: usize,
    /// Control period, used to stamp telemetry.
    pub tick_ms: u64,
    pub battery_voltage: f32,
    /// Log a telemetry line every this many ticks.
    pub telemetry_every: usize,
    pub array: Array,
    /// Irradiance steps applied to the substrings during the run.
    #[serde(default)]
    pub events: Vec<IrradianceEvent>,
    /// Sensor readings taken per tick, the tracker sees their median.
    #[serde(default = "default_measurements_per_tick")]
    pub measurements_per_tick: usize,
    #[serde(default)]
    pub noise: SensorNoise,
    /// Seed of the sensor noise.
    #[serde(default)]
    pub seed: u64,
}

fn default_measurements_per_tick() -> usize {
    control::WINDOW
}

/// Amplitude of the uniform noise on every reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorNoise {
    /// V
    pub voltage: f32,
    /// A
    pub current: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrradianceEvent {
    pub tick: usize,
    /// One value per substring, W/m^2.
    pub irradiance: Vec<f64>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Try external file first
        let config: Config = if Path::new("config.toml").exists() {
            let config_content = fs::read_to_string("config.toml")?;
            let config = toml::from_str(&config_content)?;
            log::info!("Loaded configuration from file");
            config
        } else {
            // Fallback to embedded defaults
            let config_content = include_str!("../config.toml.example");
            let config = toml::from_str(config_content)?;
            log::warn!("Using embedded default configuration");
            config
        };
        config.tracker.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_example_parses_and_validates() {
        let config: Config = toml::from_str(include_str!("../config.toml.example")).unwrap();
        assert_eq!(config.tracker.validate(), Ok(()));
        assert_eq!(config.simulation.array.substrings.len(), 3);
        for event in &config.simulation.events {
            assert_eq!(event.irradiance.len(), 3);
        }
        assert_eq!(config.simulation.measurements_per_tick, control::WINDOW);
    }

    #[test]
    fn sensor_model_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [simulation]
            ticks = 10
            tick_ms = 1000
            battery_voltage = 100.0
            telemetry_every = 1

            [[simulation.array.substrings]]
            cells = 32
            irradiance = 1000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.measurements_per_tick, control::WINDOW);
        assert_eq!(config.simulation.noise.voltage, 0.0);
        assert_eq!(config.simulation.noise.current, 0.0);
        assert_eq!(config.simulation.array.bypass_drop, 0.6);
    }
}

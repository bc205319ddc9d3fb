use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which global search runs in front of the local algorithm. Picked once when
/// the tracker is composed, never toggled mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalKind {
    /// Local algorithm only
    #[default]
    None,
    VoltageSweep,
    Trapezoid,
    SimulatedAnnealing,
    ParticleSwarm,
    Firefly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    #[default]
    PerturbAndObserve,
    IncrementalConductance,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub global: GlobalKind,
    pub local: LocalKind,
    /// Upper end of the reference range, volts.
    pub max_voltage: f32,
    /// Seed for every random stream the tracker owns. Entropy when absent.
    pub seed: Option<u64>,
    pub perturb_and_observe: PerturbAndObserveConfig,
    pub incremental_conductance: IncrementalConductanceConfig,
    pub fuzzy: FuzzyConfig,
    pub sweep: SweepConfig,
    pub trapezoid: TrapezoidConfig,
    pub annealing: AnnealingConfig,
    pub swarm: SwarmConfig,
    pub firefly: FireflyConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            global: GlobalKind::default(),
            local: LocalKind::default(),
            max_voltage: 70.0,
            seed: None,
            perturb_and_observe: PerturbAndObserveConfig::default(),
            incremental_conductance: IncrementalConductanceConfig::default(),
            fuzzy: FuzzyConfig::default(),
            sweep: SweepConfig::default(),
            trapezoid: TrapezoidConfig::default(),
            annealing: AnnealingConfig::default(),
            swarm: SwarmConfig::default(),
            firefly: FireflyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbAndObserveConfig {
    pub stride: f32,
}

impl Default for PerturbAndObserveConfig {
    fn default() -> Self {
        PerturbAndObserveConfig { stride: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalConductanceConfig {
    pub stride: f32,
    /// Band around dP/dV = 0 treated as "at the maximum", watts per volt.
    pub tolerance: f32,
}

impl Default for IncrementalConductanceConfig {
    fn default() -> Self {
        IncrementalConductanceConfig {
            stride: 0.1,
            tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Power the change of power is expressed against, watts.
    pub max_power: f32,
    /// Current the change of current is expressed against, amps.
    pub max_current: f32,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        FuzzyConfig {
            max_power: 400.0,
            max_current: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub stride: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig { stride: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapezoidConfig {
    pub stride: f32,
    /// One-shot perturbation applied after the local algorithm takes over.
    pub kick: f32,
}

impl Default for TrapezoidConfig {
    fn default() -> Self {
        TrapezoidConfig {
            stride: 0.5,
            kick: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f32,
    /// Multiplier applied to the temperature every tick, in (0, 1).
    pub cooling_rate: f32,
    /// Below this temperature the local algorithm takes over.
    pub temperature_floor: f32,
    /// Proposals are drawn uniformly from +/- this many volts.
    pub max_perturbation: f32,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temperature: 10.0,
            cooling_rate: 0.99,
            temperature_floor: 0.1,
            max_perturbation: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub agents: usize,
    pub inertia: f32,
    /// Pull towards the agent's own best voltage.
    pub cognitive: f32,
    /// Pull towards the swarm's best voltage.
    pub social: f32,
    /// Hand over to the local algorithm once every agent sits within this
    /// many volts of the others. Zero keeps the swarm running forever.
    pub convergence_spread: f32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        SwarmConfig {
            agents: 4,
            inertia: 0.35,
            cognitive: 0.02,
            social: 0.5,
            convergence_spread: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireflyConfig {
    pub fireflies: usize,
    /// Attractiveness at zero distance (beta0).
    pub attractiveness: f32,
    /// Light absorption coefficient (gamma), per square volt.
    pub absorption: f32,
    /// Width of the random walk taken by a firefly with no brighter neighbour.
    pub jitter: f32,
    /// Attraction passes before the local algorithm takes over.
    pub passes: usize,
}

impl Default for FireflyConfig {
    fn default() -> Self {
        FireflyConfig {
            fireflies: 8,
            attractiveness: 1.0,
            absorption: 0.01,
            jitter: 1.0,
            passes: 10,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be finite and not negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("cooling rate must lie strictly between 0 and 1, got {0}")]
    CoolingRate(f32),
    #[error("{name} needs at least {min} members, got {value}")]
    Population {
        name: &'static str,
        min: usize,
        value: usize,
    },
    #[error("firefly search needs at least one pass")]
    NoPasses,
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

impl TrackerConfig {
    /// Check every tunable, including those of algorithms that are not
    /// selected, so a configuration file is either wholly valid or rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_voltage", self.max_voltage)?;

        positive("perturb_and_observe.stride", self.perturb_and_observe.stride)?;
        positive("incremental_conductance.stride", self.incremental_conductance.stride)?;
        non_negative(
            "incremental_conductance.tolerance",
            self.incremental_conductance.tolerance,
        )?;
        positive("fuzzy.max_power", self.fuzzy.max_power)?;
        positive("fuzzy.max_current", self.fuzzy.max_current)?;

        positive("sweep.stride", self.sweep.stride)?;
        positive("trapezoid.stride", self.trapezoid.stride)?;
        non_negative("trapezoid.kick", self.trapezoid.kick)?;

        let annealing = &self.annealing;
        positive("annealing.initial_temperature", annealing.initial_temperature)?;
        non_negative("annealing.temperature_floor", annealing.temperature_floor)?;
        positive("annealing.max_perturbation", annealing.max_perturbation)?;
        if !(annealing.cooling_rate > 0.0 && annealing.cooling_rate < 1.0) {
            return Err(ConfigError::CoolingRate(annealing.cooling_rate));
        }

        let swarm = &self.swarm;
        if swarm.agents < 2 {
            return Err(ConfigError::Population {
                name: "swarm.agents",
                min: 2,
                value: swarm.agents,
            });
        }
        non_negative("swarm.inertia", swarm.inertia)?;
        non_negative("swarm.cognitive", swarm.cognitive)?;
        non_negative("swarm.social", swarm.social)?;
        non_negative("swarm.convergence_spread", swarm.convergence_spread)?;

        let firefly = &self.firefly;
        if firefly.fireflies < 2 {
            return Err(ConfigError::Population {
                name: "firefly.fireflies",
                min: 2,
                value: firefly.fireflies,
            });
        }
        non_negative("firefly.attractiveness", firefly.attractiveness)?;
        non_negative("firefly.absorption", firefly.absorption)?;
        non_negative("firefly.jitter", firefly.jitter)?;
        if firefly.passes == 0 {
            return Err(ConfigError::NoPasses);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TrackerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: TrackerConfig = toml::from_str(
            r#"
            global = "particle_swarm"
            seed = 7

            [swarm]
            agents = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.global, GlobalKind::ParticleSwarm);
        assert_eq!(config.local, LocalKind::PerturbAndObserve);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.swarm.agents, 6);
        assert_eq!(config.swarm.inertia, 0.35);
        assert_eq!(config.max_voltage, 70.0);
    }

    #[test]
    fn rejects_bad_tunables() {
        let mut config = TrackerConfig::default();
        config.max_voltage = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "max_voltage",
                value: 0.0
            })
        );

        let mut config = TrackerConfig::default();
        config.annealing.cooling_rate = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::CoolingRate(1.0)));

        let mut config = TrackerConfig::default();
        config.swarm.agents = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Population { min: 2, value: 1, .. })
        ));

        let mut config = TrackerConfig::default();
        config.sweep.stride = f32::NAN;
        assert!(config.validate().is_err());
    }
}

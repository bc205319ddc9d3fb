//! Local algorithms: fast, greedy hill climbers that track the maximum next to
//! the current operating point.

mod fuzzy;
mod ic;
mod pando;

pub use fuzzy::Fuzzy;
pub use ic::IncrementalConductance;
pub use pando::PerturbAndObserve;

use crate::config::{LocalKind, TrackerConfig};
use crate::{LocalMppt, Mppt, Sample};

/// The local algorithm picked by the configuration. Every global algorithm
/// owns exactly one of these.
#[derive(Debug, Clone)]
pub enum Local {
    PerturbAndObserve(PerturbAndObserve),
    IncrementalConductance(IncrementalConductance),
    Fuzzy(Fuzzy),
}

impl Local {
    pub fn new(config: &TrackerConfig) -> Self {
        match config.local {
            LocalKind::PerturbAndObserve => Local::PerturbAndObserve(PerturbAndObserve::new(
                &config.perturb_and_observe,
                config.max_voltage,
            )),
            LocalKind::IncrementalConductance => Local::IncrementalConductance(
                IncrementalConductance::new(&config.incremental_conductance, config.max_voltage),
            ),
            LocalKind::Fuzzy => Local::Fuzzy(Fuzzy::new(&config.fuzzy, config.max_voltage)),
        }
    }

    pub fn kind(&self) -> LocalKind {
        match self {
            Local::PerturbAndObserve(_) => LocalKind::PerturbAndObserve,
            Local::IncrementalConductance(_) => LocalKind::IncrementalConductance,
            Local::Fuzzy(_) => LocalKind::Fuzzy,
        }
    }

    /// Feed `sample` and advance one tick.
    pub(crate) fn track(&mut self, sample: &Sample) -> f32 {
        self.input_context(sample);
        self.step()
    }

    fn inner(&mut self) -> &mut dyn LocalMppt {
        match self {
            Local::PerturbAndObserve(mppt) => mppt,
            Local::IncrementalConductance(mppt) => mppt,
            Local::Fuzzy(mppt) => mppt,
        }
    }
}

impl Mppt for Local {
    fn input_context(&mut self, sample: &Sample) {
        self.inner().input_context(sample);
    }

    fn step(&mut self) -> f32 {
        self.inner().step()
    }

    fn reset(&mut self) {
        self.inner().reset();
    }

    fn get_reference(&self) -> f32 {
        match self {
            Local::PerturbAndObserve(mppt) => mppt.get_reference(),
            Local::IncrementalConductance(mppt) => mppt.get_reference(),
            Local::Fuzzy(mppt) => mppt.get_reference(),
        }
    }
}

impl LocalMppt for Local {
    fn seed(&mut self, voltage: f32) {
        self.inner().seed(voltage);
    }

    fn prime(&mut self, voltage: f32, power: f32) {
        self.inner().prime(voltage, power);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_configured_kind() {
        for kind in [
            LocalKind::PerturbAndObserve,
            LocalKind::IncrementalConductance,
            LocalKind::Fuzzy,
        ] {
            let config = TrackerConfig {
                local: kind,
                ..Default::default()
            };
            assert_eq!(Local::new(&config).kind(), kind);
        }
    }

    #[test]
    fn seed_is_clamped() {
        let mut local = Local::new(&TrackerConfig::default());
        local.seed(120.0);
        assert_eq!(local.get_reference(), 70.0);
        local.seed(-3.0);
        assert_eq!(local.get_reference(), 0.0);
    }
}

use log::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::{AnnealingConfig, LocalKind, TrackerConfig};
use crate::local::Local;
use crate::{clamp_reference, make_rng, Context, LocalMppt, Mppt, OperatingPoint, Sample};

/// Simulated annealing over the measured P-V curve.
///
/// Each proposal is imposed as the reference for one tick and judged on the
/// power measured the tick after, so one proposal costs one tick. Losing moves
/// are accepted with probability `exp(dP / T)`; the temperature shrinks by the
/// cooling rate every tick. Below the floor the local algorithm continues from
/// the accepted point.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    config: AnnealingConfig,
    max_voltage: f32,
    seed: Option<u64>,
    rng: StdRng,
    context: Context,
    reference_voltage: f32,

    temperature: f32,
    accepted: Option<OperatingPoint>,
    annealing: bool,
    local: Local,
}

/// Metropolis criterion. `delta_power` of a losing move is negative, so the
/// exponent is capped at zero and a frozen temperature rejects outright.
fn acceptance_probability(delta_power: f32, temperature: f32) -> f32 {
    if temperature <= 0.0 {
        return 0.0;
    }
    (delta_power / temperature).min(0.0).exp()
}

impl SimulatedAnnealing {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        SimulatedAnnealing {
            config: config.annealing.clone(),
            max_voltage: config.max_voltage,
            seed: config.seed,
            rng: make_rng(config.seed),
            context: Context::default(),
            reference_voltage: 0.0,
            temperature: config.annealing.initial_temperature,
            accepted: None,
            annealing: true,
            local: Local::new(config),
        }
    }

    pub fn local_kind(&self) -> LocalKind {
        self.local.kind()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn is_annealing(&self) -> bool {
        self.annealing
    }

    /// Point the search currently sits on, `None` before the first sample.
    pub fn accepted(&self) -> Option<OperatingPoint> {
        self.accepted
    }

    fn evaluate(&mut self, sample: &Sample) -> OperatingPoint {
        let candidate = OperatingPoint::of(sample);
        let Some(accepted) = self.accepted else {
            return candidate;
        };

        let delta_power = candidate.power - accepted.power;
        if delta_power > 0.0 {
            return candidate;
        }
        let probability = acceptance_probability(delta_power, self.temperature);
        if self.rng.gen::<f32>() < probability {
            trace!("Accepting losing move of {:.3} W", delta_power);
            candidate
        } else {
            accepted
        }
    }

    fn propose(&mut self, from: f32) -> f32 {
        let limit = self.config.max_perturbation;
        clamp_reference(from + self.rng.gen_range(-limit..=limit), self.max_voltage)
    }
}

impl Mppt for SimulatedAnnealing {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        if self.annealing {
            let accepted = self.evaluate(&sample);
            self.accepted = Some(accepted);
            self.temperature *= self.config.cooling_rate;

            if self.temperature < self.config.temperature_floor {
                self.annealing = false;
                self.reference_voltage = clamp_reference(accepted.voltage, self.max_voltage);
                self.local.seed(self.reference_voltage);
                info!(
                    "Annealing frozen at {:.2} V ({:.2} W)",
                    accepted.voltage, accepted.power
                );
            } else {
                self.reference_voltage = self.propose(accepted.voltage);
            }
        } else {
            self.temperature *= self.config.cooling_rate;
            self.reference_voltage = self.local.track(&sample);
        }

        self.reference_voltage
    }

    fn reset(&mut self) {
        self.rng = make_rng(self.seed);
        self.context.clear();
        self.reference_voltage = 0.0;
        self.temperature = self.config.initial_temperature;
        self.accepted = None;
        self.annealing = true;
        self.local.reset();
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

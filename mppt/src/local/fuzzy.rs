//! Fuzzy logic hill climbing.
//!
//! Two inputs, the change of power and the change of current, each expressed
//! as a percentage of the configured maxima, are classified into terms:
//!
//! ```text
//! power    NB (..-10]  NS (-10..-3]  ZE (-3..3)  PS [3..10)  PB [10..)
//! current  N  (..-1]   Z  (-1..1)    P  [1..)
//! ```
//!
//! The rule table maps every (current, power) pair onto a step of the
//! reference voltage. Large moves of power produce large steps, which makes
//! this an adaptive-stride hill climber.

use crate::config::FuzzyConfig;
use crate::{clamp_reference, Context, LocalMppt, Mppt, Sample};

/// Output steps, volts.
const OUTPUT: [f32; 5] = [-0.04, -0.02, 0.01, 0.02, 0.04];

/// Rows: current term N, Z, P. Columns: power term NB, NS, ZE, PS, PB.
/// Nothing maps onto the largest backwards step.
const RULES: [[usize; 5]; 3] = [
    [1, 1, 1, 3, 4],
    [3, 3, 2, 3, 4],
    [4, 3, 3, 1, 1],
];

fn power_term(percent: f32) -> usize {
    if percent <= -10.0 {
        0
    } else if percent <= -3.0 {
        1
    } else if percent < 3.0 {
        2
    } else if percent < 10.0 {
        3
    } else {
        4
    }
}

fn current_term(percent: f32) -> usize {
    if percent <= -1.0 {
        0
    } else if percent < 1.0 {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone)]
pub struct Fuzzy {
    max_power: f32,
    max_current: f32,
    max_voltage: f32,
    context: Context,
    reference_voltage: f32,
    has_started: bool,

    prev_array_current: f32,
    prev_array_power: f32,
}

impl Fuzzy {
    pub fn new(config: &FuzzyConfig, max_voltage: f32) -> Self {
        Fuzzy {
            max_power: config.max_power,
            max_current: config.max_current,
            max_voltage,
            context: Context::default(),
            reference_voltage: 0.0,
            has_started: false,
            prev_array_current: 0.0,
            prev_array_power: 0.0,
        }
    }

    fn delta(&self, sample: &Sample) -> f32 {
        let delta_power = sample.array_power() - self.prev_array_power;
        let delta_current = sample.array_current - self.prev_array_current;

        let power = power_term(delta_power * 100.0 / self.max_power);
        let current = current_term(delta_current * 100.0 / self.max_current);
        OUTPUT[RULES[current][power]]
    }
}

impl Mppt for Fuzzy {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        if self.has_started {
            let delta = self.delta(&sample);
            self.reference_voltage =
                clamp_reference(self.reference_voltage + delta, self.max_voltage);
        } else {
            self.has_started = true;
        }

        self.prev_array_current = sample.array_current;
        self.prev_array_power = sample.array_power();
        self.reference_voltage
    }

    fn reset(&mut self) {
        self.context.clear();
        self.reference_voltage = 0.0;
        self.has_started = false;
        self.prev_array_current = 0.0;
        self.prev_array_power = 0.0;
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

impl LocalMppt for Fuzzy {
    fn seed(&mut self, voltage: f32) {
        self.reference_voltage = clamp_reference(voltage, self.max_voltage);
    }

    fn prime(&mut self, voltage: f32, power: f32) {
        self.prev_array_power = power;
        self.prev_array_current = if voltage != 0.0 { power / voltage } else { 0.0 };
        self.has_started = true;
    }
}

//! Incremental conductance.
//!
//! Given the P-V curve of the array, the incremental conductance dI/dV against
//! the instantaneous conductance I/V tells which side of the maximum the array
//! operates on:
//!
//! ```text
//! dI/dV = -I/V   at the maximum
//! dI/dV > -I/V   left of the maximum
//! dI/dV < -I/V   right of the maximum
//! ```
//!
//! Multiplying through by V gives dP/dV = I + V * dI/dV, which is evaluated
//! directly so that V = 0 needs no special case.

use crate::config::IncrementalConductanceConfig;
use crate::{clamp_reference, Context, LocalMppt, Mppt, Sample};

#[derive(Debug, Clone)]
pub struct IncrementalConductance {
    stride: f32,
    tolerance: f32,
    max_voltage: f32,
    context: Context,
    reference_voltage: f32,

    prev_array_voltage: f32,
    prev_array_current: f32,
}

impl IncrementalConductance {
    pub fn new(config: &IncrementalConductanceConfig, max_voltage: f32) -> Self {
        IncrementalConductance {
            stride: config.stride,
            tolerance: config.tolerance,
            max_voltage,
            context: Context::default(),
            reference_voltage: 0.0,
            prev_array_voltage: 0.0,
            prev_array_current: 0.0,
        }
    }

    /// +1 left of the maximum, -1 right of it, 0 on it.
    fn region(&self, sample: &Sample) -> f32 {
        let delta_array_voltage = sample.array_voltage - self.prev_array_voltage;
        let delta_array_current = sample.array_current - self.prev_array_current;

        if delta_array_voltage == 0.0 {
            // Same operating voltage, only irradiance moved the current
            if delta_array_current == 0.0 {
                0.0
            } else {
                delta_array_current.signum()
            }
        } else {
            let slope = sample.array_current
                + sample.array_voltage * delta_array_current / delta_array_voltage;
            if slope.abs() <= self.tolerance {
                0.0
            } else {
                slope.signum()
            }
        }
    }
}

impl Mppt for IncrementalConductance {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        let region = self.region(&sample);
        self.reference_voltage =
            clamp_reference(self.reference_voltage + region * self.stride, self.max_voltage);

        self.prev_array_voltage = sample.array_voltage;
        self.prev_array_current = sample.array_current;
        self.reference_voltage
    }

    fn reset(&mut self) {
        self.context.clear();
        self.reference_voltage = 0.0;
        self.prev_array_voltage = 0.0;
        self.prev_array_current = 0.0;
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

impl LocalMppt for IncrementalConductance {
    fn seed(&mut self, voltage: f32) {
        self.reference_voltage = clamp_reference(voltage, self.max_voltage);
    }

    fn prime(&mut self, voltage: f32, power: f32) {
        self.prev_array_voltage = voltage;
        self.prev_array_current = if voltage != 0.0 { power / voltage } else { 0.0 };
    }
}

use log::*;
use mppt::Sample;
use pid::Pid;
use serde::{Deserialize, Serialize};

/// Duty cycle the converter is parked at while stopped.
pub const IDLE_DUTY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Largest correction the loop may add to the feedforward duty.
    pub correction_limit: f32,
    pub min_duty: f32,
    pub max_duty: f32,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        RegulatorConfig {
            kp: 0.002,
            ki: 0.001,
            kd: 0.0,
            correction_limit: 0.2,
            min_duty: 0.1,
            max_duty: 0.8,
        }
    }
}

/// Holds the array at the tracker's reference by adjusting the boost
/// converter's duty cycle.
///
/// An ideal boost stage runs the array at `V_batt * (1 - D)`, which gives a
/// feedforward duty for every reference. The PID loop on the measured array
/// voltage trims out what the ideal model misses.
pub struct Regulator {
    config: RegulatorConfig,
    pid: Pid<f32>,
    duty: f32,
}

impl Regulator {
    pub fn new(config: &RegulatorConfig) -> Self {
        let limit = config.correction_limit;
        let mut pid: Pid<f32> = Pid::new(0.0f32, limit);
        pid.p(config.kp, limit).i(config.ki, limit).d(config.kd, limit);

        Regulator {
            config: config.clone(),
            pid,
            duty: IDLE_DUTY,
        }
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Duty cycle that brings the array measured in `sample` to `reference`.
    pub fn update(&mut self, reference: f32, sample: &Sample) -> f32 {
        let feedforward = if sample.battery_voltage > 0.0 {
            1.0 - reference / sample.battery_voltage
        } else {
            self.duty
        };

        self.pid.setpoint(reference);
        let control = self.pid.next_control_output(sample.array_voltage);
        // Raising the duty pulls the array voltage down
        let duty = feedforward - control.output;

        self.duty = if duty.is_finite() {
            duty.clamp(self.config.min_duty, self.config.max_duty)
        } else {
            warn!("Non-finite duty for reference {:.2} V, holding", reference);
            self.duty
        };
        self.duty
    }

    /// Forget the integral and park the converter.
    pub fn reset(&mut self) {
        self.pid.reset_integral_term();
        self.duty = IDLE_DUTY;
    }
}

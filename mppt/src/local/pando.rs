use crate::config::PerturbAndObserveConfig;
use crate::{clamp_reference, Context, LocalMppt, Mppt, Sample};

/// Perturb and observe: keep stepping in the direction that raised power,
/// turn around when power falls.
#[derive(Debug, Clone)]
pub struct PerturbAndObserve {
    stride: f32,
    max_voltage: f32,
    context: Context,
    reference_voltage: f32,

    /// Saved internal data.
    prev_array_voltage: f32,
    prev_array_power: f32,
    /// +1.0 climbs the voltage range, -1.0 descends it.
    direction: f32,
}

impl PerturbAndObserve {
    pub fn new(config: &PerturbAndObserveConfig, max_voltage: f32) -> Self {
        PerturbAndObserve {
            stride: config.stride,
            max_voltage,
            context: Context::default(),
            reference_voltage: 0.0,
            prev_array_voltage: 0.0,
            prev_array_power: 0.0,
            direction: 1.0,
        }
    }
}

impl Mppt for PerturbAndObserve {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };
        let array_power = sample.array_power();

        // Get the discernment criteria
        let delta_array_voltage = sample.array_voltage - self.prev_array_voltage;
        let delta_array_power = array_power - self.prev_array_power;

        if delta_array_voltage != 0.0 {
            self.direction = if delta_array_power > 0.0 {
                delta_array_voltage.signum()
            } else {
                -delta_array_voltage.signum()
            };
        } else if delta_array_power < 0.0 {
            self.direction = -self.direction;
        }

        let target = self.reference_voltage + self.direction * self.stride;
        self.reference_voltage = clamp_reference(target, self.max_voltage);
        if self.reference_voltage != target {
            // Pinned against a bound, the next perturbation has to come back
            self.direction = -self.direction;
        }

        // Stash for next call.
        self.prev_array_voltage = sample.array_voltage;
        self.prev_array_power = array_power;
        self.reference_voltage
    }

    fn reset(&mut self) {
        self.context.clear();
        self.reference_voltage = 0.0;
        self.prev_array_voltage = 0.0;
        self.prev_array_power = 0.0;
        self.direction = 1.0;
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

impl LocalMppt for PerturbAndObserve {
    fn seed(&mut self, voltage: f32) {
        self.reference_voltage = clamp_reference(voltage, self.max_voltage);
    }

    fn prime(&mut self, voltage: f32, power: f32) {
        self.prev_array_voltage = voltage;
        self.prev_array_power = power;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{drive, single_peak};
    use approx::assert_abs_diff_eq;

    fn pando() -> PerturbAndObserve {
        PerturbAndObserve::new(&PerturbAndObserveConfig::default(), 70.0)
    }

    #[test]
    fn climbs_while_power_rises() {
        let mut mppt = pando();
        let references = drive(&mut mppt, single_peak(30.0), 10);
        for pair in references.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_abs_diff_eq!(references[9], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn reverses_when_power_falls() {
        let mut mppt = pando();
        mppt.seed(10.0);
        mppt.prime(10.0, 100.0);

        // Higher voltage, lower power
        mppt.input_context(&Sample::new(10.1, 9.0, 100.0, 0.0));
        assert_abs_diff_eq!(mppt.step(), 9.9, epsilon = 1e-4);

        // Lower voltage, higher power: keep descending
        mppt.input_context(&Sample::new(9.9, 9.5, 100.0, 0.0));
        assert_abs_diff_eq!(mppt.step(), 9.8, epsilon = 1e-4);
    }

    #[test]
    fn settles_around_single_peak() {
        let mut mppt = pando();
        let references = drive(&mut mppt, single_peak(12.0), 400);
        for reference in &references[300..] {
            assert!(
                (reference - 12.0).abs() <= 0.2 + 1e-3,
                "reference {} wandered off the peak",
                reference
            );
        }
    }

    #[test]
    fn bounces_off_the_lower_bound() {
        let mut mppt = pando();
        mppt.seed(0.05);
        mppt.prime(0.0, 0.0);
        mppt.input_context(&Sample::new(0.0, 1.0, 100.0, 0.0));
        mppt.direction = -1.0;
        // No change in voltage or power keeps the direction, which hits 0 V
        assert_eq!(mppt.step(), 0.0);
        assert_eq!(mppt.direction, 1.0);
    }

    #[test]
    fn holds_without_fresh_sample() {
        let mut mppt = pando();
        mppt.input_context(&Sample::new(1.0, 1.0, 100.0, 0.0));
        let reference = mppt.step();
        assert_eq!(mppt.step(), reference);

        mppt.input_context(&Sample::new(f32::NAN, 1.0, 100.0, 0.0));
        assert_eq!(mppt.step(), reference);
    }
}

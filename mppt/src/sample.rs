use log::warn;

/// The measurements delivered by the sampler once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub array_voltage: f32,
    pub array_current: f32,
    pub battery_voltage: f32,
    pub battery_current: f32,
}

impl Sample {
    pub fn new(
        array_voltage: f32,
        array_current: f32,
        battery_voltage: f32,
        battery_current: f32,
    ) -> Self {
        Sample {
            array_voltage,
            array_current,
            battery_voltage,
            battery_current,
        }
    }

    pub fn array_power(&self) -> f32 {
        self.array_voltage * self.array_current
    }

    pub fn is_finite(&self) -> bool {
        self.array_voltage.is_finite()
            && self.array_current.is_finite()
            && self.battery_voltage.is_finite()
            && self.battery_current.is_finite()
    }
}

/// `[array_voltage, array_current, battery_voltage, battery_current]`
impl From<[f32; 4]> for Sample {
    fn from(raw: [f32; 4]) -> Self {
        Sample::new(raw[0], raw[1], raw[2], raw[3])
    }
}

/// A (voltage, power) pair on the array's P-V curve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperatingPoint {
    pub voltage: f32,
    pub power: f32,
}

impl OperatingPoint {
    pub fn new(voltage: f32, power: f32) -> Self {
        OperatingPoint { voltage, power }
    }

    pub(crate) fn of(sample: &Sample) -> Self {
        OperatingPoint::new(sample.array_voltage, sample.array_power())
    }
}

/// Latest sample handed over through `input_context`, consumed by `step`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Context {
    sample: Sample,
    fresh: bool,
}

impl Context {
    pub(crate) fn store(&mut self, sample: &Sample) {
        if sample.is_finite() {
            self.sample = *sample;
            self.fresh = true;
        } else {
            warn!("Rejecting non-finite sample {:?}, holding reference", sample);
            self.fresh = false;
        }
    }

    pub(crate) fn take(&mut self) -> Option<Sample> {
        if self.fresh {
            self.fresh = false;
            Some(self.sample)
        } else {
            None
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Context::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_order_matches_sampler_layout() {
        let sample = Sample::from([35.0, 4.0, 100.0, 1.2]);
        assert_eq!(sample.array_voltage, 35.0);
        assert_eq!(sample.array_current, 4.0);
        assert_eq!(sample.battery_voltage, 100.0);
        assert_eq!(sample.battery_current, 1.2);
        assert_eq!(sample.array_power(), 140.0);
    }

    #[test]
    fn context_is_consumed_once() {
        let mut context = Context::default();
        assert!(context.take().is_none());

        context.store(&Sample::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(context.take(), Some(Sample::new(1.0, 2.0, 3.0, 4.0)));
        assert!(context.take().is_none());
    }

    #[test]
    fn non_finite_sample_is_dropped() {
        let mut context = Context::default();
        context.store(&Sample::new(1.0, 2.0, 3.0, 4.0));
        context.store(&Sample::new(f32::NAN, 2.0, 3.0, 4.0));
        assert!(context.take().is_none());

        context.store(&Sample::new(1.0, f32::INFINITY, 3.0, 4.0));
        assert!(context.take().is_none());
    }
}

use heapless::Vec;
use log::*;

use crate::config::{LocalKind, TrackerConfig};
use crate::local::Local;
use crate::{clamp_reference, Context, LocalMppt, Mppt, OperatingPoint, Sample};

/// Peaks remembered from one sweep.
pub const PEAK_HISTORY: usize = 10;

/// Sweeps the reference from 0 V to the maximum in fixed strides, noting every
/// point where power turns from rising to falling, then starts the local
/// algorithm from the strongest of those peaks.
#[derive(Debug, Clone)]
pub struct VoltageSweep {
    stride: f32,
    max_voltage: f32,
    context: Context,
    reference_voltage: f32,

    // Saved internal data
    prev_array_voltage: f32,
    prev_array_power: f32,
    peaks: Vec<OperatingPoint, PEAK_HISTORY>,

    // Algorithm properties
    sweeping: bool,
    increasing: bool,
    local: Local,
}

impl VoltageSweep {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        VoltageSweep {
            stride: config.sweep.stride,
            max_voltage: config.max_voltage,
            context: Context::default(),
            reference_voltage: 0.0,
            prev_array_voltage: 0.0,
            prev_array_power: 0.0,
            peaks: Vec::new(),
            sweeping: true,
            increasing: false,
            local: Local::new(config),
        }
    }

    pub fn local_kind(&self) -> LocalKind {
        self.local.kind()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping
    }

    pub fn peaks(&self) -> &[OperatingPoint] {
        &self.peaks
    }

    /// A peak is the previous point whenever power turns from rising to falling.
    fn detect_peak(&mut self, array_power: f32) {
        if array_power < self.prev_array_power && self.increasing {
            self.increasing = false;
            self.record(OperatingPoint::new(self.prev_array_voltage, self.prev_array_power));
        } else if array_power >= self.prev_array_power && !self.increasing {
            self.increasing = true;
        }
    }

    fn record(&mut self, peak: OperatingPoint) {
        debug!("Peak at {:.2} V, {:.2} W", peak.voltage, peak.power);
        if let Err(peak) = self.peaks.push(peak) {
            // History is full, keep the strongest peaks
            let weakest = self
                .peaks
                .iter_mut()
                .min_by(|a, b| a.power.total_cmp(&b.power));
            if let Some(weakest) = weakest {
                if peak.power > weakest.power {
                    *weakest = peak;
                }
            }
        }
    }

    /// Voltage of the strongest peak, 0 V when the sweep saw none.
    fn starting_point(&self) -> f32 {
        let mut max_power = 0.0;
        let mut max_voltage = 0.0;
        for peak in &self.peaks {
            if peak.power > max_power {
                max_power = peak.power;
                max_voltage = peak.voltage;
            }
        }
        max_voltage
    }
}

impl Mppt for VoltageSweep {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };
        let array_power = sample.array_power();

        if self.sweeping {
            self.detect_peak(array_power);
            let next = self.reference_voltage + self.stride;
            if next > self.max_voltage {
                self.sweeping = false;
                self.reference_voltage = clamp_reference(self.starting_point(), self.max_voltage);
                self.local.seed(self.reference_voltage);
                info!(
                    "Sweep complete with {} peaks, tracking from {:.2} V",
                    self.peaks.len(),
                    self.reference_voltage
                );
            } else {
                self.reference_voltage = next;
            }
        } else {
            self.reference_voltage = self.local.track(&sample);
        }

        self.prev_array_voltage = sample.array_voltage;
        self.prev_array_power = array_power;
        self.reference_voltage
    }

    fn reset(&mut self) {
        self.context.clear();
        self.reference_voltage = 0.0;
        self.prev_array_voltage = 0.0;
        self.prev_array_power = 0.0;
        self.peaks.clear();
        self.sweeping = true;
        self.increasing = false;
        self.local.reset();
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{drive, single_peak};

    fn sweep(max_voltage: f32) -> VoltageSweep {
        VoltageSweep::new(&TrackerConfig {
            max_voltage,
            ..Default::default()
        })
    }

    /// Run until the sweep hands over and return the starting reference.
    fn sweep_to_end(mppt: &mut VoltageSweep, array: impl Fn(f32) -> Sample) -> f32 {
        for _ in 0..10_000 {
            mppt.input_context(&array(mppt.get_reference()));
            let reference = mppt.step();
            if !mppt.is_sweeping() {
                return reference;
            }
        }
        panic!("sweep never finished");
    }

    #[test]
    fn starts_local_tracking_at_the_captured_peak() {
        let mut mppt = sweep(40.0);
        let start = sweep_to_end(&mut mppt, single_peak(17.3));
        assert_eq!(mppt.peaks().len(), 1);
        assert!((start - 17.3).abs() <= 0.1 + 1e-3, "start {}", start);
    }

    #[test]
    fn monotonic_sweep_falls_back_to_zero() {
        let mut mppt = sweep(10.0);
        // Power rises all the way to the top of the range
        let start = sweep_to_end(&mut mppt, single_peak(50.0));
        assert!(mppt.peaks().is_empty());
        assert_eq!(start, 0.0);
    }

    #[test]
    fn sweep_strides_up_from_zero() {
        let mut mppt = sweep(70.0);
        let references = drive(&mut mppt, single_peak(30.0), 5);
        for (i, reference) in references.iter().enumerate() {
            assert!((reference - 0.1 * (i + 1) as f32).abs() < 1e-4);
        }
    }

    #[test]
    fn full_history_keeps_strongest_peaks() {
        let mut mppt = sweep(70.0);
        for i in 0..PEAK_HISTORY {
            mppt.record(OperatingPoint::new(i as f32, 10.0 + i as f32));
        }
        mppt.record(OperatingPoint::new(50.0, 5.0));
        assert!(mppt.peaks().iter().all(|p| p.voltage != 50.0));

        mppt.record(OperatingPoint::new(60.0, 100.0));
        assert_eq!(mppt.peaks().len(), PEAK_HISTORY);
        assert!(mppt.peaks().iter().any(|p| p.voltage == 60.0));
        assert!(mppt.peaks().iter().all(|p| p.power != 10.0));
        assert_eq!(mppt.starting_point(), 60.0);
    }

    #[test]
    fn reset_restarts_the_sweep() {
        let mut mppt = sweep(20.0);
        drive(&mut mppt, single_peak(8.0), 250);
        assert!(!mppt.is_sweeping());

        mppt.reset();
        assert!(mppt.is_sweeping());
        assert!(mppt.peaks().is_empty());
        assert_eq!(mppt.get_reference(), 0.0);
    }
}

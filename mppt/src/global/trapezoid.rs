use log::*;

use crate::config::{LocalKind, TrackerConfig};
use crate::local::Local;
use crate::states::TrapezoidPhase;
use crate::{clamp_reference, Context, LocalMppt, Mppt, OperatingPoint, Sample};

/// Trapezoidal sum optimisation.
///
/// Steps through the voltage range like a sweep while integrating the area
/// under the P-V curve with the trapezoidal rule. A point is only a candidate
/// for the global maximum when it bounds the largest trapezoid seen so far, so
/// a narrow spike next to a broad, slightly lower hill does not win. Past the
/// top of the range the search hands the best candidate to the local
/// algorithm, kicks it once and then leaves every tick to it.
#[derive(Debug, Clone)]
pub struct Trapezoid {
    stride: f32,
    kick: f32,
    max_voltage: f32,
    context: Context,
    reference_voltage: f32,

    prev_array_voltage: f32,
    prev_array_power: f32,
    largest_area: f32,
    best: OperatingPoint,

    phase: TrapezoidPhase,
    local: Local,
}

impl Trapezoid {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        Trapezoid {
            stride: config.trapezoid.stride,
            kick: config.trapezoid.kick,
            max_voltage: config.max_voltage,
            context: Context::default(),
            reference_voltage: 0.0,
            prev_array_voltage: 0.0,
            prev_array_power: 0.0,
            largest_area: 0.0,
            best: OperatingPoint::default(),
            phase: TrapezoidPhase::default(),
            local: Local::new(config),
        }
    }

    pub fn local_kind(&self) -> LocalKind {
        self.local.kind()
    }

    pub fn phase(&self) -> TrapezoidPhase {
        self.phase
    }

    /// Strongest point recorded by the search so far.
    pub fn best(&self) -> OperatingPoint {
        self.best
    }

    fn search(&mut self, sample: &Sample) {
        let array_power = sample.array_power();
        let area = 0.5 * self.stride * (array_power + self.prev_array_power);

        if area >= self.largest_area {
            self.largest_area = area;
            // Stronger edge of the largest trapezoid
            let edge = if array_power >= self.prev_array_power {
                OperatingPoint::of(sample)
            } else {
                OperatingPoint::new(self.prev_array_voltage, self.prev_array_power)
            };
            if edge.power >= self.best.power {
                self.best = edge;
            }
        }

        let next = self.reference_voltage + self.stride;
        if next > self.max_voltage {
            self.phase = self.phase.next();
            self.reference_voltage = clamp_reference(self.best.voltage, self.max_voltage);
            info!(
                "Trapezoid search done, best {:.2} W at {:.2} V",
                self.best.power, self.best.voltage
            );
        } else {
            self.reference_voltage = next;
        }
    }
}

impl Mppt for Trapezoid {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        match self.phase {
            TrapezoidPhase::Searching => self.search(&sample),
            TrapezoidPhase::StartLocal => {
                self.local.seed(self.reference_voltage);
                self.phase = self.phase.next();
            }
            TrapezoidPhase::Kick => {
                self.reference_voltage =
                    clamp_reference(sample.array_voltage + self.kick, self.max_voltage);
                self.local.prime(sample.array_voltage, sample.array_power());
                self.local.seed(self.reference_voltage);
                self.phase = self.phase.next();
                debug!("Trapezoid kick to {:.2} V", self.reference_voltage);
            }
            TrapezoidPhase::Steady => {
                self.reference_voltage = self.local.track(&sample);
            }
        }

        self.prev_array_voltage = sample.array_voltage;
        self.prev_array_power = sample.array_power();
        self.reference_voltage
    }

    fn reset(&mut self) {
        self.context.clear();
        self.reference_voltage = 0.0;
        self.prev_array_voltage = 0.0;
        self.prev_array_power = 0.0;
        self.largest_area = 0.0;
        self.best = OperatingPoint::default();
        self.phase = TrapezoidPhase::default();
        self.local.reset();
    }

    fn get_reference(&self) -> f32 {
        self.reference_voltage
    }
}

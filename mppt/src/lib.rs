//! Maximum power point tracking for a photovoltaic array feeding a charge
//! controller.
//!
//! Every tracker is a stepwise state machine: the control loop hands it one
//! [`Sample`] per tick through [`Mppt::input_context`], advances it with
//! [`Mppt::step`] and reads back the reference voltage it should impose on the
//! array. Optimizer state (populations, temperature, peak history) survives
//! between ticks so that no single call ever runs an unbounded search.
//!
//! Local algorithms ([`local`]) climb the nearest hill. Global algorithms
//! ([`global`]) search the wider voltage range to escape the local maxima that
//! partial shading creates, then hand over to the local algorithm they own.
//! [`Tracker`] composes the pair picked by a [`TrackerConfig`].

pub mod config;
pub mod global;
pub mod local;
mod sample;
pub mod states;

pub use config::{ConfigError, GlobalKind, LocalKind, TrackerConfig};
pub use global::Tracker;
pub use local::Local;
pub use sample::{OperatingPoint, Sample};

pub(crate) use sample::Context;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// The contract shared by every tracking algorithm.
///
/// `input_context` and `step` are called once per control tick, in that order.
/// `reset` may be called between ticks at any point in the life of the
/// process, typically when the supervisor detects a step change in irradiance.
pub trait Mppt {
    /// Store the measurements of the current tick. Nothing else happens until
    /// [`Mppt::step`].
    fn input_context(&mut self, sample: &Sample);

    /// Advance the algorithm by exactly one tick and return the new reference.
    ///
    /// Without a fresh, finite sample since the previous call the reference is
    /// held and no internal state moves.
    fn step(&mut self) -> f32;

    /// Return every field to the state produced by construction.
    fn reset(&mut self);

    /// Last computed reference voltage.
    fn get_reference(&self) -> f32;
}

/// Extra hooks a global algorithm uses to hand control to its local delegate.
pub trait LocalMppt: Mppt {
    /// Continue tracking from `voltage`.
    fn seed(&mut self, voltage: f32);

    /// Overwrite the previous-tick snapshot so the next difference is taken
    /// against this operating point.
    fn prime(&mut self, voltage: f32, power: f32);
}

/// Keep a reference inside the physically meaningful range `[0, max_voltage]`.
pub(crate) fn clamp_reference(voltage: f32, max_voltage: f32) -> f32 {
    if voltage.is_nan() {
        return 0.0;
    }
    voltage.clamp(0.0, max_voltage)
}

/// Per-instance random stream, reproducible when a seed is configured.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
pub(crate) mod harness {
    use crate::{Mppt, Sample};

    /// Unimodal power curve peaking at `peak` volts, zero at 0 V and `2 * peak`.
    pub fn single_peak(peak: f32) -> impl Fn(f32) -> Sample {
        move |v: f32| {
            let v_oc = 2.0 * peak;
            let current = (8.0 * (1.0 - v / v_oc)).clamp(0.0, 8.0);
            Sample::new(v, current, 100.0, 0.0)
        }
    }

    /// Impose each reference on an ideal array and collect the references.
    pub fn drive<T: Mppt>(
        tracker: &mut T,
        array: impl Fn(f32) -> Sample,
        ticks: usize,
    ) -> Vec<f32> {
        let mut references = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let sample = array(tracker.get_reference());
            tracker.input_context(&sample);
            references.push(tracker.step());
        }
        references
    }
}

//! Global algorithms: searches over the whole voltage range that escape the
//! local maxima created by partial shading, each handing over to the local
//! algorithm it owns once the search is done.

mod annealing;
mod firefly;
mod swarm;
mod sweep;
mod trapezoid;

pub use annealing::SimulatedAnnealing;
pub use firefly::{Candidate, Firefly};
pub use swarm::{Particle, ParticleSwarm};
pub use sweep::{VoltageSweep, PEAK_HISTORY};
pub use trapezoid::Trapezoid;

use log::*;

use crate::config::{ConfigError, GlobalKind, LocalKind, TrackerConfig};
use crate::local::Local;
use crate::states::SwarmPhase;
use crate::{Mppt, Sample};

/// The algorithm pair picked by a [`TrackerConfig`], resolved once.
///
/// `Tracker::Local` is the default global: it forwards every tick to the local
/// algorithm without any search in front of it.
#[derive(Debug, Clone)]
pub enum Tracker {
    Local(Local),
    VoltageSweep(VoltageSweep),
    Trapezoid(Trapezoid),
    SimulatedAnnealing(SimulatedAnnealing),
    ParticleSwarm(ParticleSwarm),
    Firefly(Firefly),
}

impl Tracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let tracker = match config.global {
            GlobalKind::None => Tracker::Local(Local::new(config)),
            GlobalKind::VoltageSweep => Tracker::VoltageSweep(VoltageSweep::new(config)),
            GlobalKind::Trapezoid => Tracker::Trapezoid(Trapezoid::new(config)),
            GlobalKind::SimulatedAnnealing => {
                Tracker::SimulatedAnnealing(SimulatedAnnealing::new(config))
            }
            GlobalKind::ParticleSwarm => Tracker::ParticleSwarm(ParticleSwarm::new(config)),
            GlobalKind::Firefly => Tracker::Firefly(Firefly::new(config)),
        };
        info!(
            "Tracking with {:?} over {:?}, 0 to {} V",
            config.global, config.local, config.max_voltage
        );
        Ok(tracker)
    }

    pub fn kind(&self) -> GlobalKind {
        match self {
            Tracker::Local(_) => GlobalKind::None,
            Tracker::VoltageSweep(_) => GlobalKind::VoltageSweep,
            Tracker::Trapezoid(_) => GlobalKind::Trapezoid,
            Tracker::SimulatedAnnealing(_) => GlobalKind::SimulatedAnnealing,
            Tracker::ParticleSwarm(_) => GlobalKind::ParticleSwarm,
            Tracker::Firefly(_) => GlobalKind::Firefly,
        }
    }

    pub fn local_kind(&self) -> LocalKind {
        match self {
            Tracker::Local(local) => local.kind(),
            Tracker::VoltageSweep(mppt) => mppt.local_kind(),
            Tracker::Trapezoid(mppt) => mppt.local_kind(),
            Tracker::SimulatedAnnealing(mppt) => mppt.local_kind(),
            Tracker::ParticleSwarm(mppt) => mppt.local_kind(),
            Tracker::Firefly(mppt) => mppt.local_kind(),
        }
    }

    /// True while a global search is still moving the array across the
    /// voltage range. The bare local algorithm never searches.
    pub fn is_searching(&self) -> bool {
        match self {
            Tracker::Local(_) => false,
            Tracker::VoltageSweep(mppt) => mppt.is_sweeping(),
            Tracker::Trapezoid(mppt) => !mppt.phase().is_local(),
            Tracker::SimulatedAnnealing(mppt) => mppt.is_annealing(),
            Tracker::ParticleSwarm(mppt) => mppt.phase() != SwarmPhase::Converged,
            Tracker::Firefly(mppt) => mppt.phase().is_searching(),
        }
    }

    fn inner(&mut self) -> &mut dyn Mppt {
        match self {
            Tracker::Local(mppt) => mppt,
            Tracker::VoltageSweep(mppt) => mppt,
            Tracker::Trapezoid(mppt) => mppt,
            Tracker::SimulatedAnnealing(mppt) => mppt,
            Tracker::ParticleSwarm(mppt) => mppt,
            Tracker::Firefly(mppt) => mppt,
        }
    }
}

impl Mppt for Tracker {
    fn input_context(&mut self, sample: &Sample) {
        self.inner().input_context(sample);
    }

    fn step(&mut self) -> f32 {
        self.inner().step()
    }

    fn reset(&mut self) {
        debug!("Resetting {:?} tracker", self.kind());
        self.inner().reset();
    }

    fn get_reference(&self) -> f32 {
        match self {
            Tracker::Local(mppt) => mppt.get_reference(),
            Tracker::VoltageSweep(mppt) => mppt.get_reference(),
            Tracker::Trapezoid(mppt) => mppt.get_reference(),
            Tracker::SimulatedAnnealing(mppt) => mppt.get_reference(),
            Tracker::ParticleSwarm(mppt) => mppt.get_reference(),
            Tracker::Firefly(mppt) => mppt.get_reference(),
        }
    }
}

use log::*;
use mppt::{Mppt, Sample, Tracker};
use serde::{Deserialize, Serialize};

use crate::redlines::Fault;
use crate::states::State;

/// Outcome of one state machine update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// Leaving Run for Stop or Error: tracker and regulator must be reset.
    pub fn requires_reset(&self) -> bool {
        self.changed() && !self.to.is_tracking()
    }
}

/// STOP/RUN/ERROR machine of the converter.
///
/// Run is requested with `set_mode`. A fault from any state latches Error,
/// which is only left through `acknowledge`, and acknowledging drops back to
/// Stop with the run request cleared.
#[derive(Debug, Default)]
pub struct Supervisor {
    state: State,
    set_mode: bool,
    fault: Option<Fault>,
    ack_fault: bool,
}

impl Supervisor {
    pub fn new() -> Self {
        Supervisor::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Fault that put the machine into Error, until acknowledged.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn set_mode(&mut self, run: bool) -> Transition {
        self.set_mode = run;
        self.update()
    }

    pub fn raise(&mut self, fault: Fault) -> Transition {
        self.fault = Some(fault);
        self.update()
    }

    /// Only meaningful in Error; anywhere else the request is dropped.
    pub fn acknowledge(&mut self) -> Transition {
        if self.state == State::Error {
            self.ack_fault = true;
        }
        self.update()
    }

    fn update(&mut self) -> Transition {
        let from = self.state;
        let is_error = self.fault.is_some();

        self.state = match self.state {
            State::Stop | State::Run if is_error => State::Error,
            State::Stop if self.set_mode => State::Run,
            State::Run if !self.set_mode => State::Stop,
            State::Error if self.ack_fault => {
                self.fault = None;
                self.ack_fault = false;
                self.set_mode = false;
                State::Stop
            }
            state => state,
        };

        let transition = Transition {
            from,
            to: self.state,
        };
        if transition.changed() {
            match self.fault {
                Some(fault) if self.state == State::Error => {
                    error!("{:?} -> {:?}, fault {}: {}", from, self.state, fault.code(), fault)
                }
                _ => info!("{:?} -> {:?}", from, self.state),
            }
        }
        transition
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeDetectorConfig {
    /// Relative change of array current that counts as a step change.
    pub threshold: f32,
    /// Only compare ticks whose array voltages lie this close together, V.
    pub voltage_window: f32,
    /// Currents below this are noise, A.
    pub min_current: f32,
}

impl Default for ChangeDetectorConfig {
    fn default() -> Self {
        ChangeDetectorConfig {
            threshold: 0.2,
            voltage_window: 0.5,
            min_current: 0.1,
        }
    }
}

/// Spots a step change of irradiance or temperature that makes the tracker's
/// accumulated search state worthless.
///
/// Array current barely moves between neighbouring operating points on the
/// same curve, so a large relative jump while the voltage stays put means the
/// curve itself moved. Ticks where the tracker moved the array far are not
/// compared. Close to open circuit a single sweep stride moves the current by
/// more than any sensible threshold, so [`ChangeDetector::watch`] stays quiet
/// while a global search runs.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: ChangeDetectorConfig,
    previous: Option<Sample>,
}

impl ChangeDetector {
    pub fn new(config: &ChangeDetectorConfig) -> Self {
        ChangeDetector {
            config: config.clone(),
            previous: None,
        }
    }

    /// Feed one tick, true when the environment changed since the last one.
    pub fn observe(&mut self, sample: &Sample) -> bool {
        let Some(previous) = self.previous.replace(*sample) else {
            return false;
        };
        if !sample.is_finite() || !previous.is_finite() {
            return false;
        }
        if (sample.array_voltage - previous.array_voltage).abs() > self.config.voltage_window {
            return false;
        }

        let base = previous.array_current.abs().max(sample.array_current.abs());
        if base < self.config.min_current {
            return false;
        }
        let change = (sample.array_current - previous.array_current).abs() / base;
        if change > self.config.threshold {
            debug!(
                "Array current stepped {:.2} A -> {:.2} A",
                previous.array_current, sample.array_current
            );
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.previous = None;
    }

    /// Observe `sample` on behalf of `tracker` and reset it when the
    /// environment changed. True when the tracker was reset.
    pub fn watch(&mut self, sample: &Sample, tracker: &mut Tracker) -> bool {
        if tracker.is_searching() {
            self.clear();
            return false;
        }
        if !self.observe(sample) {
            return false;
        }
        tracker.reset();
        self.clear();
        true
    }
}

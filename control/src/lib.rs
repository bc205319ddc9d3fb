//! Collaborators of the tracker in the converter's control loop: the sensor
//! filters, the duty cycle regulator, the redline checks and the run/stop
//! supervisor.

pub mod filter;
pub mod redlines;
pub mod regulator;
pub mod states;
pub mod supervisor;

pub use filter::{MedianFilter, SampleFilter, WINDOW};
pub use redlines::{Fault, Redlines};
pub use regulator::{Regulator, RegulatorConfig, IDLE_DUTY};
pub use states::State;
pub use supervisor::{ChangeDetector, ChangeDetectorConfig, Supervisor, Transition};

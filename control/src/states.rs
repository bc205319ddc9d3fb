// State-related enums of the converter supervisor.
// Transitions live in supervisor.rs, this file only names the states.

/// - Stop: converter disabled, tracker idle, duty parked at 50 %
/// - Run: tracker and regulator drive the converter every tick
/// - Error: a redline was crossed, waits for an acknowledge
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum State {
    #[default]
    Stop,
    Run,
    Error,
}

impl State {
    /// Whether the tracker should be stepped in this state
    pub fn is_tracking(&self) -> bool {
        matches!(self, State::Run)
    }

    /// Numeric state as reported in telemetry
    pub fn code(&self) -> u8 {
        match self {
            State::Stop => 0,
            State::Run => 1,
            State::Error => 2,
        }
    }
}

// Phase enums of the global algorithms that run as explicit state machines.
// Each one starts at its first variant after construction or reset.

/// - Searching: stepping through the voltage range, integrating area
/// - StartLocal: hand the best voltage to the local algorithm (one tick)
/// - Kick: one fixed perturbation to get off a plateau (one tick)
/// - Steady: the local algorithm owns every tick
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum TrapezoidPhase {
    #[default]
    Searching,
    StartLocal,
    Kick,
    Steady,
}

impl TrapezoidPhase {
    /// Next phase once the current one has been consumed
    pub fn next(&self) -> TrapezoidPhase {
        match self {
            TrapezoidPhase::Searching => TrapezoidPhase::StartLocal,
            TrapezoidPhase::StartLocal => TrapezoidPhase::Kick,
            TrapezoidPhase::Kick => TrapezoidPhase::Steady,
            TrapezoidPhase::Steady => TrapezoidPhase::Steady,
        }
    }

    pub fn is_local(&self) -> bool {
        !matches!(self, TrapezoidPhase::Searching)
    }
}

/// - Setup: every agent is imposed once, front to back
/// - PingPong: one agent per tick, sweeping forward then backward
/// - Converged: the swarm collapsed, the local algorithm owns every tick
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum SwarmPhase {
    #[default]
    Setup,
    PingPong,
    Converged,
}

/// - Survey: every firefly is imposed once to measure its power
/// - Attract: one trial move per tick
/// - Converged: the local algorithm owns every tick
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum FireflyPhase {
    #[default]
    Survey,
    Attract,
    Converged,
}

impl FireflyPhase {
    pub fn is_searching(&self) -> bool {
        matches!(self, FireflyPhase::Survey | FireflyPhase::Attract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoid_phases_run_in_order_and_stop_at_steady() {
        let mut phase = TrapezoidPhase::default();
        let mut seen = vec![phase];
        for _ in 0..4 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                TrapezoidPhase::Searching,
                TrapezoidPhase::StartLocal,
                TrapezoidPhase::Kick,
                TrapezoidPhase::Steady,
                TrapezoidPhase::Steady,
            ]
        );
    }
}

use log::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::{LocalKind, SwarmConfig, TrackerConfig};
use crate::local::Local;
use crate::states::SwarmPhase;
use crate::{clamp_reference, make_rng, Context, LocalMppt, Mppt, OperatingPoint, Sample};

/// One candidate voltage of the swarm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub position: f32,
    pub velocity: f32,
    /// Strongest point this particle has measured.
    pub best: Option<OperatingPoint>,
}

/// Particle swarm optimisation with one agent evaluated per tick.
///
/// The array can only be held at one voltage at a time, so every agent is
/// imposed for a tick and judged on the sample that follows. A setup pass
/// visits agents front to back to establish the bests, after which the swarm
/// ping-pongs through the agents (0, 1, 2, 3, 2, 1, 0, 1, ... for four),
/// moving each one as it is evaluated.
#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    config: SwarmConfig,
    max_voltage: f32,
    seed: Option<u64>,
    rng: StdRng,
    context: Context,
    reference_voltage: f32,

    agents: Vec<Particle>,
    global_best: Option<OperatingPoint>,
    phase: SwarmPhase,
    /// Agent whose position is imposed on the array right now.
    cursor: Option<usize>,
    forward: bool,
    local: Local,
}

fn improve(best: &mut Option<OperatingPoint>, point: OperatingPoint) -> bool {
    match best {
        Some(best) if best.power >= point.power => false,
        _ => {
            *best = Some(point);
            true
        }
    }
}

impl ParticleSwarm {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        let mut swarm = ParticleSwarm {
            config: config.swarm.clone(),
            max_voltage: config.max_voltage,
            seed: config.seed,
            rng: make_rng(config.seed),
            context: Context::default(),
            reference_voltage: 0.0,
            agents: vec![Particle::default(); config.swarm.agents],
            global_best: None,
            phase: SwarmPhase::default(),
            cursor: None,
            forward: true,
            local: Local::new(config),
        };
        swarm.scatter();
        swarm
    }

    pub fn local_kind(&self) -> LocalKind {
        self.local.kind()
    }

    pub fn agents(&self) -> &[Particle] {
        &self.agents
    }

    pub fn global_best(&self) -> Option<OperatingPoint> {
        self.global_best
    }

    pub fn phase(&self) -> SwarmPhase {
        self.phase
    }

    /// Index of the agent currently imposed on the array.
    pub fn exposed(&self) -> Option<usize> {
        self.cursor
    }

    /// Agent `i` starts somewhere in the `i`-th of `N + 1` equal slices of the
    /// voltage range, at rest and with no best.
    fn scatter(&mut self) {
        let interval = self.max_voltage / (self.agents.len() + 1) as f32;
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let position = self.rng.gen::<f32>() * interval + i as f32 * interval;
            *agent = Particle {
                position: clamp_reference(position, self.max_voltage),
                velocity: 0.0,
                best: None,
            };
        }
    }

    fn expose(&mut self, index: usize) {
        self.cursor = Some(index);
        self.reference_voltage = self.agents[index].position;
    }

    fn evaluate(&mut self, index: usize, point: OperatingPoint) {
        improve(&mut self.agents[index].best, point);
        if improve(&mut self.global_best, point) {
            debug!(
                "Swarm best {:.2} W at {:.2} V from agent {}",
                point.power, point.voltage, index
            );
        }
    }

    /// Canonical velocity update followed by the move, kept inside the range.
    fn fly(&mut self, index: usize) {
        let r1: f32 = self.rng.gen();
        let r2: f32 = self.rng.gen();
        let agent = &mut self.agents[index];
        let personal = agent.best.map_or(agent.position, |best| best.voltage);
        let global = self.global_best.map_or(agent.position, |best| best.voltage);

        agent.velocity = self.config.inertia * agent.velocity
            + self.config.cognitive * r1 * (personal - agent.position)
            + self.config.social * r2 * (global - agent.position);
        agent.position = clamp_reference(agent.position + agent.velocity, self.max_voltage);
    }

    fn next_index(&mut self, index: usize) -> usize {
        let last = self.agents.len() - 1;
        if self.forward && index == last {
            self.forward = false;
        } else if !self.forward && index == 0 {
            self.forward = true;
        }
        if self.forward {
            index + 1
        } else {
            index - 1
        }
    }

    fn spread(&self) -> f32 {
        let (min, max) = self
            .agents
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), agent| {
                (min.min(agent.position), max.max(agent.position))
            });
        max - min
    }

    fn has_converged(&self) -> bool {
        self.config.convergence_spread > 0.0 && self.spread() < self.config.convergence_spread
    }

    fn hand_over(&mut self) {
        self.phase = SwarmPhase::Converged;
        self.cursor = None;
        let voltage = self
            .global_best
            .map_or(self.reference_voltage, |best| best.voltage);
        self.reference_voltage = clamp_reference(voltage, self.max_voltage);
        self.local.seed(self.reference_voltage);
        info!("Swarm converged, tracking from {:.2} V", self.reference_voltage);
    }
}

impl Mppt for ParticleSwarm {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        if self.phase == SwarmPhase::Converged {
            self.reference_voltage = self.local.track(&sample);
            return self.reference_voltage;
        }

        // First tick only puts agent 0 on the array
        let Some(index) = self.cursor else {
            self.expose(0);
            return self.reference_voltage;
        };
        self.evaluate(index, OperatingPoint::of(&sample));

        match self.phase {
            SwarmPhase::Setup => {
                if index + 1 < self.agents.len() {
                    self.expose(index + 1);
                } else {
                    self.phase = SwarmPhase::PingPong;
                    self.forward = false;
                    self.expose(index - 1);
                }
            }
            SwarmPhase::PingPong => {
                self.fly(index);
                if self.has_converged() {
                    self.hand_over();
                } else {
                    let next = self.next_index(index);
                    self.expose(next);
                }
            }
            SwarmPhase::Converged => {}
        }

        self.reference_voltage
    }

    fn reset(&mut self) {
        self.rng = make_rng(self.seed);
        self.context.clear();
        self.reference_voltage = 0.0;
        self.scatter();
        self.global_best = None;
        self.phase = SwarmPhase::default();
        self.cursor = None;
        self.forward = true;
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

    fn swarm(convergence_spread: f32) -> ParticleSwarm {
        let mut config = TrackerConfig {
            seed: Some(11),
            ..Default::default()
        };
        config.swarm.convergence_spread = convergence_spread;
        ParticleSwarm::new(&config)
    }

    #[test]
    fn agents_start_in_their_own_slice() {
        let mppt = swarm(0.5);
        let interval = 70.0 / 5.0;
        for (i, agent) in mppt.agents().iter().enumerate() {
            assert!(agent.position >= i as f32 * interval);
            assert!(agent.position <= (i + 1) as f32 * interval);
            assert_eq!(agent.velocity, 0.0);
            assert!(agent.best.is_none());
        }
    }

    #[test]
    fn one_agent_per_tick_in_ping_pong_order() {
        let mut mppt = swarm(0.0);
        let array = single_peak(30.0);
        let mut order = Vec::new();
        for _ in 0..12 {
            let reference = drive(&mut mppt, &array, 1)[0];
            let exposed = mppt.exposed().unwrap();
            assert_eq!(reference, mppt.agents()[exposed].position);
            order.push(exposed);
        }
        assert_eq!(order, vec![0, 1, 2, 3, 2, 1, 0, 1, 2, 3, 2, 1]);
    }

    #[test]
    fn setup_pass_records_measured_bests() {
        let mut mppt = swarm(0.0);
        let array = single_peak(30.0);
        let start: Vec<f32> = mppt.agents().iter().map(|a| a.position).collect();
        drive(&mut mppt, &array, 5);

        assert_eq!(mppt.phase(), SwarmPhase::PingPong);
        let mut strongest = f32::NEG_INFINITY;
        for (agent, position) in mppt.agents().iter().zip(&start) {
            // Setup measures without moving
            assert_eq!(agent.position, *position);
            let best = agent.best.unwrap();
            assert_eq!(best, OperatingPoint::of(&array(*position)));
            strongest = strongest.max(best.power);
        }
        assert_eq!(mppt.global_best().unwrap().power, strongest);
    }

    #[test]
    fn collapses_and_hands_over_to_local() {
        let mut mppt = swarm(0.5);
        let references = drive(&mut mppt, single_peak(30.0), 3000);
        assert_eq!(mppt.phase(), SwarmPhase::Converged);
        assert!(mppt.exposed().is_none());
        for reference in &references[2900..] {
            assert!((reference - 30.0).abs() <= 0.25, "reference {}", reference);
        }
    }

    #[test]
    fn reset_rescatters_the_same_swarm() {
        let mut mppt = swarm(0.5);
        let fresh = mppt.agents().to_vec();
        drive(&mut mppt, single_peak(30.0), 40);
        assert_ne!(mppt.agents(), &fresh[..]);

        mppt.reset();
        assert_eq!(mppt.agents(), &fresh[..]);
        assert_eq!(mppt.phase(), SwarmPhase::Setup);
        assert!(mppt.global_best().is_none());
    }
}

use log::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::{FireflyConfig, LocalKind, TrackerConfig};
use crate::local::Local;
use crate::states::FireflyPhase;
use crate::{clamp_reference, make_rng, Context, LocalMppt, Mppt, OperatingPoint, Sample};

/// One member of the firefly population.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Candidate {
    pub voltage: f32,
    /// Last power measured at `voltage`.
    pub power: f32,
    /// Power relative to the strongest member, in [0, 1].
    pub brightness: f32,
}

/// A voltage imposed on the array on behalf of candidate `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trial {
    index: usize,
    voltage: f32,
}

/// Firefly algorithm with every trial move measured on the array.
///
/// After a survey tick per candidate, each attraction pass walks the ordered
/// pairs (i, j) where j was brighter than i when the pass began. Candidate i
/// is moved towards j by `beta0 * exp(-gamma * d^2)` times a uniform draw; the
/// move is imposed for one tick and kept only if the measured power beats
/// what i had. A candidate with no brighter neighbour takes a random walk
/// instead. Brightness is renormalised after every pass; after the last pass
/// the local algorithm starts from the best voltage found.
#[derive(Debug, Clone)]
pub struct Firefly {
    config: FireflyConfig,
    max_voltage: f32,
    seed: Option<u64>,
    rng: StdRng,
    context: Context,
    reference_voltage: f32,

    fireflies: Vec<Candidate>,
    /// Brightness at the start of the running pass.
    snapshot: Vec<f32>,
    trial: Option<Trial>,
    row: usize,
    column: usize,
    attracted: bool,
    pass: usize,
    best: Option<OperatingPoint>,

    phase: FireflyPhase,
    local: Local,
}

impl Firefly {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        let population = config.firefly.fireflies;
        let mut firefly = Firefly {
            config: config.firefly.clone(),
            max_voltage: config.max_voltage,
            seed: config.seed,
            rng: make_rng(config.seed),
            context: Context::default(),
            reference_voltage: 0.0,
            fireflies: vec![Candidate::default(); population],
            snapshot: vec![0.0; population],
            trial: None,
            row: 0,
            column: 0,
            attracted: false,
            pass: 0,
            best: None,
            phase: FireflyPhase::default(),
            local: Local::new(config),
        };
        firefly.scatter();
        firefly
    }

    pub fn local_kind(&self) -> LocalKind {
        self.local.kind()
    }

    pub fn fireflies(&self) -> &[Candidate] {
        &self.fireflies
    }

    pub fn phase(&self) -> FireflyPhase {
        self.phase
    }

    /// Attraction passes completed so far.
    pub fn pass(&self) -> usize {
        self.pass
    }

    pub fn best(&self) -> Option<OperatingPoint> {
        self.best
    }

    fn scatter(&mut self) {
        for firefly in self.fireflies.iter_mut() {
            *firefly = Candidate {
                voltage: self.rng.gen_range(0.0..=self.max_voltage),
                power: 0.0,
                brightness: 0.0,
            };
        }
    }

    fn impose(&mut self, trial: Trial) {
        self.reference_voltage = trial.voltage;
        self.trial = Some(trial);
    }

    fn judge(&mut self, trial: Trial, power: f32) {
        let firefly = &mut self.fireflies[trial.index];
        match self.phase {
            FireflyPhase::Survey => firefly.power = power,
            FireflyPhase::Attract if power > firefly.power => {
                firefly.voltage = trial.voltage;
                firefly.power = power;
            }
            _ => {}
        }
    }

    fn attract(&mut self, i: usize, j: usize) -> f32 {
        let xi = self.fireflies[i].voltage;
        let xj = self.fireflies[j].voltage;
        let distance = xj - xi;
        let beta =
            self.config.attractiveness * (-self.config.absorption * distance * distance).exp();
        let r: f32 = self.rng.gen();
        clamp_reference(xi + beta * r * distance, self.max_voltage)
    }

    fn jitter(&mut self, i: usize) -> f32 {
        let walk = self.config.jitter * (self.rng.gen::<f32>() - 0.5);
        clamp_reference(self.fireflies[i].voltage + walk, self.max_voltage)
    }

    /// Next trial of the running pass, `None` once every row is done.
    fn next_trial(&mut self) -> Option<Trial> {
        let population = self.fireflies.len();
        while self.row < population {
            let i = self.row;
            while self.column < population {
                let j = self.column;
                self.column += 1;
                if self.snapshot[j] > self.snapshot[i] {
                    self.attracted = true;
                    let voltage = self.attract(i, j);
                    return Some(Trial { index: i, voltage });
                }
            }

            let lonely = !self.attracted;
            self.row += 1;
            self.column = 0;
            self.attracted = false;
            if lonely && self.config.jitter > 0.0 {
                let voltage = self.jitter(i);
                return Some(Trial { index: i, voltage });
            }
        }
        None
    }

    /// Renormalise brightness and pick up the strongest candidate.
    fn finish_pass(&mut self) {
        let max_power = self
            .fireflies
            .iter()
            .fold(f32::NEG_INFINITY, |max, firefly| max.max(firefly.power));
        for firefly in self.fireflies.iter_mut() {
            firefly.brightness = if max_power > 0.0 {
                firefly.power / max_power
            } else {
                0.0
            };
            let point = OperatingPoint::new(firefly.voltage, firefly.power);
            if self.best.map_or(true, |best| point.power > best.power) {
                self.best = Some(point);
            }
        }
    }

    fn start_pass(&mut self) {
        for (snapshot, firefly) in self.snapshot.iter_mut().zip(&self.fireflies) {
            *snapshot = firefly.brightness;
        }
        self.row = 0;
        self.column = 0;
        self.attracted = false;
    }

    /// Impose the next trial, closing passes that have nothing left to try.
    fn schedule(&mut self) {
        loop {
            if let Some(trial) = self.next_trial() {
                self.impose(trial);
                return;
            }
            self.finish_pass();
            self.pass += 1;
            if self.pass >= self.config.passes {
                self.hand_over();
                return;
            }
            self.start_pass();
        }
    }

    fn hand_over(&mut self) {
        self.phase = FireflyPhase::Converged;
        self.trial = None;
        let voltage = self.best.map_or(self.reference_voltage, |best| best.voltage);
        self.reference_voltage = clamp_reference(voltage, self.max_voltage);
        self.local.seed(self.reference_voltage);
        info!(
            "Firefly search done after {} passes, tracking from {:.2} V",
            self.pass, self.reference_voltage
        );
    }
}

impl Mppt for Firefly {
    fn input_context(&mut self, sample: &Sample) {
        self.context.store(sample);
    }

    fn step(&mut self) -> f32 {
        let Some(sample) = self.context.take() else {
            return self.reference_voltage;
        };

        if !self.phase.is_searching() {
            self.reference_voltage = self.local.track(&sample);
            return self.reference_voltage;
        }

        let Some(trial) = self.trial.take() else {
            // First tick only puts the first firefly on the array
            self.impose(Trial {
                index: 0,
                voltage: self.fireflies[0].voltage,
            });
            return self.reference_voltage;
        };
        self.judge(trial, sample.array_power());

        match self.phase {
            FireflyPhase::Survey if trial.index + 1 < self.fireflies.len() => {
                let index = trial.index + 1;
                self.impose(Trial {
                    index,
                    voltage: self.fireflies[index].voltage,
                });
            }
            FireflyPhase::Survey => {
                self.finish_pass();
                self.start_pass();
                self.phase = FireflyPhase::Attract;
                debug!("Firefly survey done, brightest at {:?}", self.best);
                self.schedule();
            }
            _ => self.schedule(),
        }

        self.reference_voltage
    }

    fn reset(&mut self) {
        self.rng = make_rng(self.seed);
        self.context.clear();
        self.reference_voltage = 0.0;
        self.scatter();
        self.snapshot.fill(0.0);
        self.trial = None;
        self.row = 0;
        self.column = 0;
        self.attracted = false;
        self.pass = 0;
        self.best = None;
        self.phase = FireflyPhase::default();
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

    fn firefly() -> Firefly {
        Firefly::new(&TrackerConfig {
            seed: Some(5),
            ..Default::default()
        })
    }

    fn survey(mppt: &mut Firefly, array: &impl Fn(f32) -> Sample) {
        while mppt.phase() == FireflyPhase::Survey {
            drive(mppt, array, 1);
        }
    }

    #[test]
    fn survey_measures_each_firefly_once() {
        let mut mppt = firefly();
        let array = single_peak(30.0);
        let start: Vec<f32> = mppt.fireflies().iter().map(|f| f.voltage).collect();

        let references = drive(&mut mppt, &array, 8);
        assert_eq!(references, start);
        assert_eq!(mppt.phase(), FireflyPhase::Survey);

        drive(&mut mppt, &array, 1);
        assert_eq!(mppt.phase(), FireflyPhase::Attract);
        for firefly in mppt.fireflies() {
            assert_eq!(firefly.power, array(firefly.voltage).array_power());
            assert!((0.0..=1.0).contains(&firefly.brightness));
        }
        assert!(mppt.fireflies().iter().any(|f| f.brightness == 1.0));
    }

    #[test]
    fn only_fireflies_without_brighter_neighbour_jitter() {
        let mut mppt = firefly();
        let array = single_peak(30.0);
        survey(&mut mppt, &array);

        let brightness: Vec<f32> = mppt.fireflies().iter().map(|f| f.brightness).collect();
        let mut expected = vec![0; brightness.len()];
        for (i, count) in expected.iter_mut().enumerate() {
            let brighter = brightness.iter().filter(|b| **b > brightness[i]).count();
            *count = brighter.max(1);
        }

        let mut seen = vec![0; brightness.len()];
        seen[mppt.trial.unwrap().index] += 1;
        loop {
            drive(&mut mppt, &array, 1);
            if mppt.pass() > 0 {
                break;
            }
            seen[mppt.trial.unwrap().index] += 1;
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn accepted_moves_never_lose_power() {
        let mut mppt = firefly();
        let array = single_peak(30.0);
        survey(&mut mppt, &array);

        let mut before: Vec<f32> = mppt.fireflies().iter().map(|f| f.power).collect();
        while mppt.phase() == FireflyPhase::Attract {
            drive(&mut mppt, &array, 1);
            for (firefly, power) in mppt.fireflies().iter().zip(before.iter_mut()) {
                assert!(firefly.power >= *power);
                *power = firefly.power;
            }
        }
    }

    #[test]
    fn dark_array_has_no_brightness() {
        let mut mppt = firefly();
        let dark = |v: f32| Sample::new(v, 0.0, 100.0, 0.0);
        survey(&mut mppt, &dark);
        assert!(mppt.fireflies().iter().all(|f| f.brightness == 0.0));
        assert!(mppt.get_reference().is_finite());
    }

    #[test]
    fn hands_over_after_the_last_pass() {
        let mut mppt = firefly();
        let references = drive(&mut mppt, single_peak(30.0), 3000);
        assert_eq!(mppt.phase(), FireflyPhase::Converged);
        assert_eq!(mppt.pass(), 10);
        for reference in &references[2900..] {
            assert!((reference - 30.0).abs() <= 0.25, "reference {}", reference);
        }
    }

    #[test]
    fn reset_rescatters_the_same_population() {
        let mut mppt = firefly();
        let fresh = mppt.fireflies().to_vec();
        drive(&mut mppt, single_peak(30.0), 30);
        mppt.reset();
        assert_eq!(mppt.fireflies(), &fresh[..]);
        assert_eq!(mppt.phase(), FireflyPhase::Survey);
        assert!(mppt.best().is_none());
    }
}

use mppt::{GlobalKind, Local, LocalKind, LocalMppt, Mppt, Sample, Tracker, TrackerConfig};
use pv::{Array, Substring};

const BATTERY_VOLTAGE: f32 = 100.0;

/// Two bright substrings and one under a shadow: the stronger peak sits near
/// 36 V with the weaker one near 60 V.
fn shaded_array() -> Array {
    Array::new(vec![
        Substring::new(32, 1000.0),
        Substring::new(32, 1000.0),
        Substring::new(32, 300.0),
    ])
}

fn closed_loop(tracker: &mut Tracker, array: &Array, ticks: usize) -> Vec<(f32, f32)> {
    (0..ticks)
        .map(|_| {
            let sample = Sample::from(array.sample(tracker.get_reference(), BATTERY_VOLTAGE));
            tracker.input_context(&sample);
            let reference = tracker.step();
            (reference, sample.array_power())
        })
        .collect()
}

fn tracker(global: GlobalKind, local: LocalKind) -> Tracker {
    Tracker::new(&TrackerConfig {
        global,
        local,
        seed: Some(42),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn local_algorithm_alone_sticks_to_the_nearest_peak() {
    let array = shaded_array();
    let (_, global_power) = array.maximum_power_point(0.05);

    // Start on the weaker hill
    let mut local = Local::new(&TrackerConfig::default());
    local.seed(62.0);
    let mut best = 0.0f32;
    for tick in 0..400 {
        let sample = Sample::from(array.sample(local.get_reference(), BATTERY_VOLTAGE));
        local.input_context(&sample);
        local.step();
        if tick >= 300 {
            best = best.max(sample.array_power());
        }
    }
    assert!(f64::from(best) < 0.8 * global_power, "settled at {} W", best);
}

#[test]
fn sweeping_globals_find_the_shaded_maximum() {
    let array = shaded_array();
    let (peak_voltage, peak_power) = array.maximum_power_point(0.05);
    assert!(peak_voltage < 45.0, "global peak at {} V", peak_voltage);

    for global in [GlobalKind::VoltageSweep, GlobalKind::Trapezoid] {
        for local in [LocalKind::PerturbAndObserve, LocalKind::IncrementalConductance] {
            let mut tracker = tracker(global, local);
            let history = closed_loop(&mut tracker, &array, 1000);
            for (reference, power) in &history[900..] {
                assert!(
                    f64::from(*power) > 0.98 * peak_power,
                    "{:?}/{:?} at {} V gives {} W of {} W",
                    global,
                    local,
                    reference,
                    power,
                    peak_power
                );
            }
        }
    }
}

#[test]
fn every_global_ends_up_harvesting() {
    let array = shaded_array();
    let (_, peak_power) = array.maximum_power_point(0.05);

    for global in [
        GlobalKind::SimulatedAnnealing,
        GlobalKind::ParticleSwarm,
        GlobalKind::Firefly,
    ] {
        let mut tracker = tracker(global, LocalKind::PerturbAndObserve);
        let history = closed_loop(&mut tracker, &array, 2000);
        let (_, last_power) = history[1999];
        // Either hill is fine, being off both is not
        assert!(
            f64::from(last_power) > 0.3 * peak_power,
            "{:?} ends at {} W",
            global,
            last_power
        );
    }
}

use chrono::{TimeDelta, Utc};
use control::{
    ChangeDetector, Regulator, SampleFilter, State, Supervisor, Transition, IDLE_DUTY,
};
use log::*;
use mppt::{Mppt, Sample, Tracker};
use pv::Array;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod config;
use config::{Config, SensorNoise};

/// Resolution of the curve scan used to score the run, V.
const SCORE_RESOLUTION: f64 = 0.05;

/// Array voltage an ideal boost stage imposes for `duty`. Past open circuit
/// the array stops conducting and floats.
fn boost_input_voltage(array: &Array, battery_voltage: f32, duty: f32) -> f32 {
    let imposed = battery_voltage * (1.0 - duty);
    imposed.min(array.open_circuit_voltage() as f32)
}

/// One noisy reading of `truth`. The current sensors do not read below zero.
fn measure(truth: &Sample, noise: &SensorNoise, rng: &mut StdRng) -> Sample {
    let mut jitter = |value: f32, amplitude: f32| {
        if amplitude > 0.0 {
            value + rng.gen_range(-amplitude..=amplitude)
        } else {
            value
        }
    };
    Sample::new(
        jitter(truth.array_voltage, noise.voltage),
        jitter(truth.array_current, noise.current).max(0.0),
        jitter(truth.battery_voltage, noise.voltage),
        jitter(truth.battery_current, noise.current).max(0.0),
    )
}

fn maximum_power(array: &Array) -> f64 {
    let (voltage, power) = array.maximum_power_point(SCORE_RESOLUTION);
    info!("Available maximum {:.1} W at {:.2} V", power, voltage);
    power
}

fn handle(transition: Transition, tracker: &mut Tracker, regulator: &mut Regulator) {
    if transition.requires_reset() {
        tracker.reset();
        regulator.reset();
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger, `log` records from the libraries land here as well
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting up main program. MPPT SRC.");
    let config = Config::load()?;
    let simulation = &config.simulation;

    let mut array = simulation.array.clone();
    let mut tracker = Tracker::new(&config.tracker)?;
    let mut regulator = Regulator::new(&config.regulator);
    let mut supervisor = Supervisor::new();
    let mut detector = ChangeDetector::new(&config.change_detector);
    let mut filter = SampleFilter::new();
    let mut rng = StdRng::seed_from_u64(simulation.seed);

    let battery_voltage = simulation.battery_voltage;
    let mut array_voltage = boost_input_voltage(&array, battery_voltage, IDLE_DUTY);
    let mut available = maximum_power(&array);
    let mut harvested_energy = 0.0;
    let mut available_energy = 0.0;
    let start = Utc::now();

    handle(supervisor.set_mode(true), &mut tracker, &mut regulator);

    for tick in 0..simulation.ticks {
        for event in simulation.events.iter().filter(|event| event.tick == tick) {
            info!("Irradiance now {:?} W/m^2", event.irradiance);
            array.set_irradiance(&event.irradiance);
            available = maximum_power(&array);
        }

        let truth = Sample::from(array.sample(array_voltage, battery_voltage));
        for _ in 0..simulation.measurements_per_tick.max(1) {
            filter.push(&measure(&truth, &simulation.noise, &mut rng));
        }
        let sample = filter.sample().unwrap_or(truth);

        if supervisor.state() != State::Error {
            if let Err(fault) = config.redlines.check(&sample) {
                handle(supervisor.raise(fault), &mut tracker, &mut regulator);
                detector.clear();
            }
        }

        let duty = match supervisor.state() {
            State::Run => {
                if detector.watch(&sample, &mut tracker) {
                    info!("Environment changed at tick {}, restarting search", tick);
                }
                tracker.input_context(&sample);
                let reference = tracker.step();
                regulator.update(reference, &sample)
            }
            State::Stop => IDLE_DUTY,
            State::Error => {
                // Bench operator clears the fault and re-arms on the next tick
                warn!("Acknowledging fault {:?}", supervisor.fault());
                handle(supervisor.acknowledge(), &mut tracker, &mut regulator);
                handle(supervisor.set_mode(true), &mut tracker, &mut regulator);
                IDLE_DUTY
            }
        };

        harvested_energy += f64::from(truth.array_power());
        available_energy += available;

        if simulation.telemetry_every > 0 && tick % simulation.telemetry_every == 0 {
            let elapsed = TimeDelta::milliseconds((tick as u64 * simulation.tick_ms) as i64);
            info!(
                "{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{}",
                (start + elapsed).to_rfc3339(),
                sample.array_voltage,
                sample.array_current,
                sample.battery_voltage,
                sample.battery_current,
                tracker.get_reference(),
                duty,
                supervisor.state().code()
            );
        }

        array_voltage = boost_input_voltage(&array, battery_voltage, duty);
    }

    handle(supervisor.set_mode(false), &mut tracker, &mut regulator);

    if available_energy > 0.0 {
        info!(
            "Tracked {:?} over {} ticks: {:.1} % of the available energy",
            tracker.kind(),
            simulation.ticks,
            100.0 * harvested_energy / available_energy
        );
    }
    Ok(())
}

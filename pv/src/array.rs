use serde::{Deserialize, Serialize};

use crate::cell::{bisect, Cell, Conditions, T_REF};

/// Series cells sharing one bypass diode and one set of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substring {
    pub cells: u32,
    /// W/m^2
    pub irradiance: f64,
    /// K
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    T_REF
}

impl Substring {
    pub fn new(cells: u32, irradiance: f64) -> Self {
        Substring {
            cells,
            irradiance,
            temperature: T_REF,
        }
    }

    fn conditions(&self) -> Conditions {
        Conditions {
            irradiance: self.irradiance,
            temperature: self.temperature,
        }
    }
}

/// A string of substrings in series. A substring that cannot carry the
/// string current is bypassed by its diode, so uneven irradiance gives the
/// P-V curve one peak per distinct irradiance level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    #[serde(default)]
    pub cell: Cell,
    /// Forward drop of a conducting bypass diode, V.
    #[serde(default = "default_bypass_drop")]
    pub bypass_drop: f64,
    pub substrings: Vec<Substring>,
}

fn default_bypass_drop() -> f64 {
    0.6
}

impl Array {
    pub fn new(substrings: Vec<Substring>) -> Self {
        Array {
            cell: Cell::default(),
            bypass_drop: default_bypass_drop(),
            substrings,
        }
    }

    /// `substrings` equal substrings of `cells` cells, all under `irradiance`.
    pub fn uniform(substrings: usize, cells: u32, irradiance: f64) -> Self {
        Array::new(vec![Substring::new(cells, irradiance); substrings])
    }

    pub fn set_irradiance(&mut self, irradiance: &[f64]) {
        for (substring, irradiance) in self.substrings.iter_mut().zip(irradiance) {
            substring.irradiance = *irradiance;
        }
    }

    /// Terminal voltage while the string carries `current`.
    pub fn voltage_at(&self, current: f64) -> f64 {
        self.substrings
            .iter()
            .filter(|substring| substring.cells > 0)
            .map(|substring| {
                let cells = f64::from(substring.cells);
                let operating = self.cell.at(substring.conditions());
                cells * operating.voltage(current, -self.bypass_drop / cells)
            })
            .sum()
    }

    /// String current with the terminals held at `voltage`. Zero at and
    /// beyond open circuit, the array never sinks current.
    pub fn current_at(&self, voltage: f64) -> f64 {
        if !voltage.is_finite() || self.voltage_at(0.0) <= voltage {
            return 0.0;
        }
        let upper = self
            .substrings
            .iter()
            .map(|substring| self.cell.at(substring.conditions()).photo_current())
            .fold(0.0, f64::max)
            + 1.0;
        bisect(0.0, upper, |current| self.voltage_at(current) - voltage)
    }

    pub fn open_circuit_voltage(&self) -> f64 {
        self.voltage_at(0.0)
    }

    /// Measurements of one tick in the sampler's raw layout
    /// `[array_voltage, array_current, battery_voltage, battery_current]`.
    /// The converter is taken as lossless.
    pub fn sample(&self, voltage: f32, battery_voltage: f32) -> [f32; 4] {
        let voltage = voltage.max(0.0);
        let current = self.current_at(f64::from(voltage)) as f32;
        let battery_current = if battery_voltage > 0.0 {
            voltage * current / battery_voltage
        } else {
            0.0
        };
        [voltage, current, battery_voltage, battery_current]
    }

    /// Power curve sampled every `resolution` volts from 0 to open circuit.
    pub fn curve(&self, resolution: f64) -> Vec<(f64, f64)> {
        let open_circuit = self.open_circuit_voltage();
        let steps = (open_circuit / resolution).ceil().max(0.0) as usize;
        (0..=steps)
            .map(|k| {
                let voltage = (k as f64 * resolution).min(open_circuit);
                (voltage, voltage * self.current_at(voltage))
            })
            .collect()
    }

    /// Strongest point of [`Array::curve`].
    pub fn maximum_power_point(&self, resolution: f64) -> (f64, f64) {
        self.curve(resolution)
            .into_iter()
            .fold((0.0, 0.0), |best, point| if point.1 > best.1 { point } else { best })
    }
}

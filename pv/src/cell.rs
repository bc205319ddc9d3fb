use serde::{Deserialize, Serialize};

/// Boltzmann constant, J/K.
const K_B: f64 = 1.380_649e-23;
/// Elementary charge, C.
const Q: f64 = 1.602_176_634e-19;

/// Reference irradiance of the datasheet values, W/m^2.
pub const G_REF: f64 = 1000.0;
/// Reference temperature of the datasheet values, K.
pub const T_REF: f64 = 298.15;

const BISECTIONS: usize = 48;

/// Single-diode model of one solar cell.
///
/// ```text
/// I = Iph - I0 * (exp((V + I*Rs) / (n*Vt)) - 1) - (V + I*Rs) / Rsh
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cell {
    /// Short circuit current at the reference conditions, A.
    pub short_circuit_current: f64,
    /// Open circuit voltage at the reference conditions, V.
    pub open_circuit_voltage: f64,
    /// Relative change of short circuit current per kelvin.
    pub current_temperature_coefficient: f64,
    /// Relative change of open circuit voltage per kelvin.
    pub voltage_temperature_coefficient: f64,
    pub ideality: f64,
    pub series_resistance: f64,
    pub shunt_resistance: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            short_circuit_current: 6.15,
            open_circuit_voltage: 0.721,
            current_temperature_coefficient: 0.005,
            voltage_temperature_coefficient: -0.0022,
            ideality: 1.0,
            series_resistance: 0.01,
            shunt_resistance: 100.0,
        }
    }
}

/// Operating conditions of a group of cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    /// W/m^2
    pub irradiance: f64,
    /// K
    pub temperature: f64,
}

/// Cell model evaluated for one set of conditions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Operating {
    photo_current: f64,
    saturation_current: f64,
    thermal_voltage: f64,
    series_resistance: f64,
    shunt_resistance: f64,
}

impl Cell {
    pub(crate) fn at(&self, conditions: Conditions) -> Operating {
        let delta_t = T_REF - conditions.temperature;
        let thermal_voltage = self.ideality * K_B * conditions.temperature / Q;
        let short_circuit_current =
            self.short_circuit_current * (1.0 - self.current_temperature_coefficient * delta_t);
        let open_circuit_voltage =
            self.open_circuit_voltage * (1.0 - self.voltage_temperature_coefficient * delta_t);

        Operating {
            photo_current: short_circuit_current * conditions.irradiance.max(0.0) / G_REF,
            saturation_current: short_circuit_current
                / ((open_circuit_voltage / thermal_voltage).exp() - 1.0),
            thermal_voltage,
            series_resistance: self.series_resistance,
            shunt_resistance: self.shunt_resistance,
        }
    }

    /// Current of one cell held at `voltage`.
    pub fn current(&self, conditions: Conditions, voltage: f64) -> f64 {
        self.at(conditions).current(voltage)
    }
}

impl Operating {
    /// Signed error of the diode equation, decreasing in both arguments.
    fn residual(&self, voltage: f64, current: f64) -> f64 {
        let junction = voltage + current * self.series_resistance;
        self.photo_current
            - self.saturation_current * ((junction / self.thermal_voltage).exp() - 1.0)
            - junction / self.shunt_resistance
            - current
    }

    pub(crate) fn photo_current(&self) -> f64 {
        self.photo_current
    }

    pub(crate) fn current(&self, voltage: f64) -> f64 {
        let upper = self.photo_current + voltage.abs() / self.shunt_resistance + 1.0;
        bisect(-upper, upper, |current| self.residual(voltage, current))
    }

    /// Voltage of one cell carrying `current`, never below `floor`.
    pub(crate) fn voltage(&self, current: f64, floor: f64) -> f64 {
        let ceiling = 2.0;
        if self.residual(floor, current) <= 0.0 {
            return floor;
        }
        bisect(floor, ceiling, |voltage| self.residual(voltage, current))
    }
}

/// Root of a decreasing function on `[low, high]`, or the nearer bound.
pub(crate) fn bisect(mut low: f64, mut high: f64, f: impl Fn(f64) -> f64) -> f64 {
    for _ in 0..BISECTIONS {
        let mid = 0.5 * (low + high);
        if f(mid) > 0.0 {
            low = mid;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STC: Conditions = Conditions {
        irradiance: G_REF,
        temperature: T_REF,
    };

    #[test]
    fn short_circuit_matches_datasheet() {
        let cell = Cell::default();
        assert_abs_diff_eq!(cell.current(STC, 0.0), 6.15, epsilon = 0.01);
    }

    #[test]
    fn open_circuit_has_no_current() {
        let cell = Cell::default();
        let current = cell.current(STC, 0.721);
        assert!(current.abs() < 0.05, "current {}", current);
        assert!(cell.current(STC, 0.75) < 0.0);
    }

    #[test]
    fn current_falls_with_voltage_and_irradiance() {
        let cell = Cell::default();
        let half = Conditions {
            irradiance: 500.0,
            ..STC
        };
        assert!(cell.current(STC, 0.3) > cell.current(STC, 0.6));
        assert!(cell.current(half, 0.3) < cell.current(STC, 0.3));
        assert_abs_diff_eq!(cell.current(half, 0.0), 3.075, epsilon = 0.01);
    }

    #[test]
    fn voltage_inverts_current() {
        let operating = Cell::default().at(STC);
        let current = operating.current(0.55);
        assert_abs_diff_eq!(operating.voltage(current, -1.0), 0.55, epsilon = 1e-6);
    }

    #[test]
    fn dark_cell_sits_at_floor_under_load() {
        let operating = Cell::default().at(Conditions {
            irradiance: 0.0,
            ..STC
        });
        assert_eq!(operating.voltage(1.0, -0.02), -0.02);
    }
}

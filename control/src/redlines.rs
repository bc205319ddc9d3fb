use log::*;
use mppt::Sample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A crossed redline. The discriminants are the fault codes reported on the
/// bus.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum Fault {
    #[error("input undervoltage lockout ({0:.2} V)")]
    InputUndervoltage(f32),
    #[error("input overvoltage lockout ({0:.2} V)")]
    InputOvervoltage(f32),
    #[error("input undercurrent lockout ({0:.2} A)")]
    InputUndercurrent(f32),
    #[error("input overcurrent lockout ({0:.2} A)")]
    InputOvercurrent(f32),
    #[error("output undervoltage lockout ({0:.2} V)")]
    OutputUndervoltage(f32),
    #[error("output overvoltage lockout ({0:.2} V)")]
    OutputOvervoltage(f32),
    #[error("output undercurrent lockout ({0:.2} A)")]
    OutputUndercurrent(f32),
    #[error("output overcurrent lockout ({0:.2} A)")]
    OutputOvercurrent(f32),
    #[error("input voltage {input:.2} V is not below output voltage {output:.2} V")]
    Inversion { input: f32, output: f32 },
}

impl Fault {
    pub fn code(&self) -> u16 {
        match self {
            Fault::InputUndervoltage(_) => 100,
            Fault::InputOvervoltage(_) => 101,
            Fault::InputUndercurrent(_) => 102,
            Fault::InputOvercurrent(_) => 103,
            Fault::OutputUndervoltage(_) => 104,
            Fault::OutputOvervoltage(_) => 105,
            Fault::OutputUndercurrent(_) => 106,
            Fault::OutputOvercurrent(_) => 107,
            Fault::Inversion { .. } => 108,
        }
    }
}

/// Operating envelope of the converter. A boost stage needs the array below
/// the battery at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Redlines {
    pub min_input_voltage: f32,
    pub max_input_voltage: f32,
    pub min_input_current: f32,
    pub max_input_current: f32,
    pub min_output_voltage: f32,
    pub max_output_voltage: f32,
    pub min_output_current: f32,
    pub max_output_current: f32,
}

impl Default for Redlines {
    fn default() -> Self {
        Redlines {
            min_input_voltage: 1.0,
            max_input_voltage: 70.0,
            min_input_current: 0.0,
            max_input_current: 8.0,
            min_output_voltage: 80.0,
            max_output_voltage: 130.0,
            min_output_current: 0.0,
            max_output_current: 5.0,
        }
    }
}

fn assert_redline(condition: bool, fault: Fault) -> Result<(), Fault> {
    if condition {
        Ok(())
    } else {
        warn!("A redline ({}) has been crossed: {}", fault.code(), fault);
        Err(fault)
    }
}

impl Redlines {
    /// First redline `sample` crosses, in fault code order. Comparisons fail
    /// on NaN, so a non-finite sample always faults.
    pub fn check(&self, sample: &Sample) -> Result<(), Fault> {
        let v_in = sample.array_voltage;
        let i_in = sample.array_current;
        let v_out = sample.battery_voltage;
        let i_out = sample.battery_current;

        assert_redline(v_in >= self.min_input_voltage, Fault::InputUndervoltage(v_in))?;
        assert_redline(v_in <= self.max_input_voltage, Fault::InputOvervoltage(v_in))?;
        assert_redline(i_in >= self.min_input_current, Fault::InputUndercurrent(i_in))?;
        assert_redline(i_in <= self.max_input_current, Fault::InputOvercurrent(i_in))?;
        assert_redline(v_out >= self.min_output_voltage, Fault::OutputUndervoltage(v_out))?;
        assert_redline(v_out <= self.max_output_voltage, Fault::OutputOvervoltage(v_out))?;
        assert_redline(i_out >= self.min_output_current, Fault::OutputUndercurrent(i_out))?;
        assert_redline(i_out <= self.max_output_current, Fault::OutputOvercurrent(i_out))?;
        assert_redline(
            v_in < v_out,
            Fault::Inversion {
                input: v_in,
                output: v_out,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_sample_passes() {
        let redlines = Redlines::default();
        assert_eq!(redlines.check(&Sample::new(40.0, 5.0, 100.0, 2.0)), Ok(()));
    }

    #[test]
    fn reports_firmware_codes_in_order() {
        let redlines = Redlines::default();
        let cases = [
            (Sample::new(0.5, 5.0, 100.0, 2.0), 100),
            (Sample::new(75.0, 5.0, 100.0, 2.0), 101),
            (Sample::new(40.0, -0.1, 100.0, 2.0), 102),
            (Sample::new(40.0, 9.0, 100.0, 2.0), 103),
            (Sample::new(40.0, 5.0, 60.0, 2.0), 104),
            (Sample::new(40.0, 5.0, 140.0, 2.0), 105),
            (Sample::new(40.0, 5.0, 100.0, -1.0), 106),
            (Sample::new(40.0, 5.0, 100.0, 6.0), 107),
        ];
        for (sample, code) in cases {
            assert_eq!(redlines.check(&sample).unwrap_err().code(), code);
        }

        let redlines = Redlines {
            min_output_voltage: 10.0,
            ..Default::default()
        };
        let fault = redlines.check(&Sample::new(40.0, 5.0, 30.0, 2.0)).unwrap_err();
        assert_eq!(fault.code(), 108);
    }

    #[test]
    fn non_finite_sample_faults() {
        let redlines = Redlines::default();
        assert!(redlines.check(&Sample::new(f32::NAN, 1.0, 100.0, 0.0)).is_err());
    }
}

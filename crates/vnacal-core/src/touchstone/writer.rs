//! Touchstone file writer
//!
//! Writes S-parameter data to Touchstone v1 files, one record per line.

use num_complex::Complex64;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::parser::{SParamFormat, Touchstone, TouchstoneError};
use crate::math::conversions::{complex_2_db, complex_2_degree, complex_2_magnitude};

impl fmt::Display for Touchstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        if self.write_to(&mut buf).is_err() {
            return Err(fmt::Error);
        }
        write!(f, "{}", String::from_utf8_lossy(&buf))
    }
}

impl Touchstone {
    /// Write to a Touchstone file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), TouchstoneError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), TouchstoneError> {
        for comment in &self.comments {
            writeln!(writer, "! {}", comment.replace(['\r', '\n'], " "))?;
        }

        writeln!(
            writer,
            "# {} S {} R {}",
            self.frequency.unit().label(),
            self.format.label(),
            self.z0
        )?;

        let prec = self.precision;
        let f_scaled = self.frequency.f_scaled();
        let n = self.nports;

        for (freq_idx, freq) in f_scaled.iter().enumerate() {
            write!(writer, "{}", format_frequency(*freq, prec))?;

            // 2-port records are column-major: S11 S21 S12 S22
            let order: Vec<(usize, usize)> = if n == 2 {
                vec![(0, 0), (1, 0), (0, 1), (1, 1)]
            } else {
                (0..n).flat_map(|i| (0..n).map(move |j| (i, j))).collect()
            };
            for (i, j) in order {
                let (v1, v2) = self.format_complex(self.s[[freq_idx, i, j]]);
                write!(writer, " {:.*} {:.*}", prec, v1, prec, v2)?;
            }

            writeln!(writer)?;
        }

        Ok(())
    }

    fn format_complex(&self, c: Complex64) -> (f64, f64) {
        match self.format {
            SParamFormat::RI => (c.re, c.im),
            SParamFormat::MA => (complex_2_magnitude(c), complex_2_degree(c)),
            SParamFormat::DB => (complex_2_db(c), complex_2_degree(c)),
        }
    }
}

/// Fixed decimals when they represent `freq` exactly, shortest round-trip form otherwise
fn format_frequency(freq: f64, prec: usize) -> String {
    let fixed = format!("{:.*}", prec, freq);
    if fixed.parse::<f64>() == Ok(freq) {
        fixed
    } else {
        format!("{}", freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{Frequency, FrequencyUnit, SweepType};
    use ndarray::Array3;

    #[test]
    fn test_s1p_record_shape() {
        let frequency = Frequency::new(1.0, 2.0, 2, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let s = Array3::from_elem((2, 1, 1), Complex64::from_polar(0.9, -30f64.to_radians()));
        let ts = Touchstone {
            nports: 1,
            frequency,
            s,
            z0: 50.0,
            comments: Vec::new(),
            format: SParamFormat::MA,
            precision: 6,
        };

        let text = ts.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# GHz S MA R 50");
        assert_eq!(lines[1], "1.000000 0.900000 -30.000000");
        assert_eq!(lines[2], "2.000000 0.900000 -30.000000");
    }

    #[test]
    fn test_s2p_column_order() {
        let frequency = Frequency::from_f(vec![1.0], FrequencyUnit::Hz).unwrap();
        let mut s = Array3::<Complex64>::zeros((1, 2, 2));
        s[[0, 0, 0]] = Complex64::new(11.0, 0.0);
        s[[0, 1, 0]] = Complex64::new(21.0, 0.0);
        s[[0, 0, 1]] = Complex64::new(12.0, 0.0);
        s[[0, 1, 1]] = Complex64::new(22.0, 0.0);
        let ts = Touchstone {
            nports: 2,
            frequency,
            s,
            z0: 75.0,
            comments: vec!["calibrated".to_string()],
            format: SParamFormat::RI,
            precision: 1,
        };

        let text = ts.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "! calibrated");
        assert_eq!(lines[1], "# Hz S RI R 75");
        assert_eq!(lines[2], "1.0 11.0 0.0 21.0 0.0 12.0 0.0 22.0 0.0");
    }

    #[test]
    fn test_frequency_keeps_full_precision() {
        assert_eq!(format_frequency(2.0, 3), "2.000");
        let freq = 10f64.powf(0.1);
        let text = format_frequency(freq, 6);
        assert_eq!(text.parse::<f64>().unwrap(), freq);
    }

    #[test]
    fn test_comment_line_breaks_flattened() {
        let frequency = Frequency::from_f(vec![1.0], FrequencyUnit::Hz).unwrap();
        let ts = Touchstone {
            nports: 1,
            frequency,
            s: Array3::zeros((1, 1, 1)),
            z0: 50.0,
            comments: vec!["dut\nrev B".to_string()],
            format: SParamFormat::RI,
            precision: 1,
        };

        let text = ts.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "! dut rev B");
        assert_eq!(lines[1], "# Hz S RI R 50");
    }
}

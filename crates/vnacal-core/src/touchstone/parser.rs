//! Touchstone file parser
//!
//! Implements parsing of Touchstone v1 `.sNp` files carrying S-parameters:
//!
//! ```text
//! ! comment
//! # GHz S MA R 50
//! 1.000000 0.900000 -30.000000
//! ```

use ndarray::Array3;
use num_complex::Complex64;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::constants::TOUCHSTONE_PRECISION;
use crate::error::CalError;
use crate::frequency::{Frequency, FrequencyUnit};
use crate::math::conversions::{dbdeg_2_reim, magdeg_2_reim};

/// Touchstone parsing errors
#[derive(Error, Debug)]
pub enum TouchstoneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid option line: {0}")]
    InvalidOption(String),

    #[error("Invalid file extension: expected .sNp format")]
    InvalidExtension,

    #[error("Invalid network data: {0}")]
    Network(#[from] CalError),
}

/// S-parameter data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SParamFormat {
    #[default]
    MA, // Magnitude-Angle (degrees)
    DB, // dB-Angle (degrees)
    RI, // Real-Imaginary
}

impl SParamFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RI" => Some(SParamFormat::RI),
            "MA" => Some(SParamFormat::MA),
            "DB" => Some(SParamFormat::DB),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SParamFormat::RI => "RI",
            SParamFormat::MA => "MA",
            SParamFormat::DB => "DB",
        }
    }
}

/// Contents of the `#` option line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionLine {
    pub unit: FrequencyUnit,
    pub format: SParamFormat,
    pub z0: f64,
}

impl Default for OptionLine {
    /// Touchstone defaults: `# GHz S MA R 50`
    fn default() -> Self {
        Self {
            unit: FrequencyUnit::GHz,
            format: SParamFormat::MA,
            z0: 50.0,
        }
    }
}

/// Touchstone file parser and data container
#[derive(Debug, Clone)]
pub struct Touchstone {
    /// Number of ports
    pub nports: usize,
    /// Frequency data
    pub frequency: Frequency,
    /// S-parameter data: [nfreq, nports, nports]
    pub s: Array3<Complex64>,
    /// Reference impedance (all ports)
    pub z0: f64,
    /// Comments from the file
    pub comments: Vec<String>,
    /// Data format
    pub format: SParamFormat,
    /// Decimals written per value
    pub precision: usize,
}

impl Touchstone {
    /// Parse a Touchstone file, taking the port count from its extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TouchstoneError> {
        let path = path.as_ref();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(TouchstoneError::InvalidExtension)?;
        let nports = Self::parse_extension(ext)?;

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        Self::parse(reader, nports)
    }

    /// Parse extension to get number of ports
    pub fn parse_extension(ext: &str) -> Result<usize, TouchstoneError> {
        let ext_lower = ext.to_lowercase();
        if ext_lower.len() > 2 && ext_lower.starts_with('s') && ext_lower.ends_with('p') {
            let num_str = &ext_lower[1..ext_lower.len() - 1];
            match num_str.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(TouchstoneError::InvalidExtension),
            }
        } else {
            Err(TouchstoneError::InvalidExtension)
        }
    }

    /// Parse from string content with a known port count
    ///
    /// # Example
    /// ```
    /// use vnacal_core::touchstone::Touchstone;
    /// let content = "# GHz S RI R 50\n1.0 0.1 0.0 0.9 0.0 0.9 0.0 0.1 0.0";
    /// let ts = Touchstone::from_str(content, 2).unwrap();
    /// assert_eq!(ts.nfreq(), 1);
    /// ```
    pub fn from_str(content: &str, nports: usize) -> Result<Self, TouchstoneError> {
        Self::parse(std::io::Cursor::new(content), nports)
    }

    fn parse<R: BufRead>(reader: R, nports: usize) -> Result<Self, TouchstoneError> {
        if nports == 0 {
            return Err(TouchstoneError::InvalidExtension);
        }
        let mut state = ParserState::new(nports);

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_no = line_idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = trimmed.strip_prefix('!') {
                state.comments.push(comment.trim().to_string());
                continue;
            }

            if trimmed.starts_with('#') {
                // Only the first option line counts
                if state.option.is_none() {
                    state.option = Some(Self::parse_option_line(trimmed)?);
                }
                continue;
            }

            if state.option.is_none() {
                return Err(TouchstoneError::Parse {
                    line: line_no,
                    message: "data record before the option line".to_string(),
                });
            }
            state.parse_data_line(trimmed, line_no)?;
        }

        state.finalize()
    }

    /// Parse the option line (`# GHz S MA R 50`)
    ///
    /// Missing fields keep their defaults. Only S-parameter files are accepted.
    pub fn parse_option_line(line: &str) -> Result<OptionLine, TouchstoneError> {
        let body = line
            .strip_prefix('#')
            .ok_or_else(|| TouchstoneError::InvalidOption(line.to_string()))?;
        let parts: Vec<&str> = body.split_whitespace().collect();

        let mut option = OptionLine::default();

        let mut i = 0;
        while i < parts.len() {
            let part = parts[i];
            if let Some(unit) = FrequencyUnit::from_str(part) {
                option.unit = unit;
            } else if let Some(fmt) = SParamFormat::from_str(part) {
                option.format = fmt;
            } else if part.eq_ignore_ascii_case("S") {
                // S-parameters, the only supported kind
            } else if part.eq_ignore_ascii_case("R") {
                let value = parts.get(i + 1).and_then(|v| v.parse::<f64>().ok());
                match value {
                    Some(r) if r > 0.0 => {
                        option.z0 = r;
                        i += 1;
                    }
                    _ => {
                        return Err(TouchstoneError::InvalidOption(format!(
                            "R must be followed by a positive impedance: {}",
                            line
                        )))
                    }
                }
            } else {
                return Err(TouchstoneError::InvalidOption(format!(
                    "unsupported token '{}' in {}",
                    part, line
                )));
            }
            i += 1;
        }

        Ok(option)
    }

    /// Get the number of frequency points
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }
}

struct ParserState {
    nports: usize,
    option: Option<OptionLine>,
    comments: Vec<String>,

    // Data accumulation; a record may be wrapped over several lines
    frequencies: Vec<f64>,
    s_data: Vec<Complex64>,
    current: Vec<f64>,
    record_start_line: usize,
}

impl ParserState {
    fn new(nports: usize) -> Self {
        Self {
            nports,
            option: None,
            comments: Vec::new(),
            frequencies: Vec::new(),
            s_data: Vec::new(),
            current: Vec::new(),
            record_start_line: 0,
        }
    }

    fn option(&self) -> OptionLine {
        self.option.unwrap_or_default()
    }

    fn record_len(&self) -> usize {
        1 + 2 * self.nports * self.nports
    }

    fn parse_data_line(&mut self, line: &str, line_no: usize) -> Result<(), TouchstoneError> {
        // Strip trailing comments
        let clean_line = match line.find('!') {
            Some(idx) => &line[..idx],
            None => line,
        };

        if self.current.is_empty() {
            self.record_start_line = line_no;
        }
        for part in clean_line.split_whitespace() {
            let val = part.parse::<f64>().map_err(|_| TouchstoneError::Parse {
                line: line_no,
                message: format!("'{}' is not a number", part),
            })?;
            self.current.push(val);
        }

        while self.current.len() >= self.record_len() {
            self.take_record();
            self.record_start_line = line_no;
        }
        Ok(())
    }

    fn take_record(&mut self) {
        let option = self.option();
        let record: Vec<f64> = self.current.drain(0..self.record_len()).collect();
        self.frequencies.push(record[0]);

        let n = self.nports;
        let mut matrix = vec![Complex64::new(0.0, 0.0); n * n];
        for (k, pair) in record[1..].chunks_exact(2).enumerate() {
            let value = match option.format {
                SParamFormat::RI => Complex64::new(pair[0], pair[1]),
                SParamFormat::MA => magdeg_2_reim(pair[0], pair[1]),
                SParamFormat::DB => dbdeg_2_reim(pair[0], pair[1]),
            };
            // 2-port records are column-major: S11 S21 S12 S22
            let (i, j) = if n == 2 { (k % 2, k / 2) } else { (k / n, k % n) };
            matrix[i * n + j] = value;
        }
        self.s_data.extend(matrix);
    }

    fn finalize(self) -> Result<Touchstone, TouchstoneError> {
        if !self.current.is_empty() {
            return Err(TouchstoneError::Parse {
                line: self.record_start_line,
                message: format!(
                    "incomplete record: {} values, expected {}",
                    self.current.len(),
                    self.record_len()
                ),
            });
        }
        if self.frequencies.is_empty() {
            return Err(TouchstoneError::Parse {
                line: 0,
                message: "no data records".to_string(),
            });
        }

        let option = self.option();
        let nfreq = self.frequencies.len();
        let frequency = Frequency::from_f(self.frequencies, option.unit)?;
        let s = Array3::from_shape_vec((nfreq, self.nports, self.nports), self.s_data)
            .map_err(|e| CalError::DimensionMismatch(e.to_string()))?;

        Ok(Touchstone {
            nports: self.nports,
            frequency,
            s,
            z0: option.z0,
            comments: self.comments,
            format: option.format,
            precision: TOUCHSTONE_PRECISION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_extension() {
        assert_eq!(Touchstone::parse_extension("s1p").unwrap(), 1);
        assert_eq!(Touchstone::parse_extension("s2p").unwrap(), 2);
        assert_eq!(Touchstone::parse_extension("S4P").unwrap(), 4);
        assert!(Touchstone::parse_extension("sp").is_err());
        assert!(Touchstone::parse_extension("s0p").is_err());
        assert!(Touchstone::parse_extension("txt").is_err());
    }

    #[test]
    fn test_parse_option_line() {
        let opt = Touchstone::parse_option_line("# GHz S RI R 50").unwrap();
        assert_eq!(opt.unit, FrequencyUnit::GHz);
        assert_eq!(opt.format, SParamFormat::RI);
        assert_eq!(opt.z0, 50.0);

        let opt = Touchstone::parse_option_line("# MHz S MA R 75").unwrap();
        assert_eq!(opt.unit, FrequencyUnit::MHz);
        assert_eq!(opt.format, SParamFormat::MA);
        assert_eq!(opt.z0, 75.0);

        let opt = Touchstone::parse_option_line("#").unwrap();
        assert_eq!(opt, OptionLine::default());
    }

    #[test]
    fn test_rejects_non_s_parameters() {
        assert!(matches!(
            Touchstone::parse_option_line("# GHz Z RI R 50"),
            Err(TouchstoneError::InvalidOption(_))
        ));
        assert!(matches!(
            Touchstone::parse_option_line("# GHz S RI R"),
            Err(TouchstoneError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_sparam_format_from_str() {
        assert_eq!(SParamFormat::from_str("RI"), Some(SParamFormat::RI));
        assert_eq!(SParamFormat::from_str("ma"), Some(SParamFormat::MA));
        assert_eq!(SParamFormat::from_str("DB"), Some(SParamFormat::DB));
        assert_eq!(SParamFormat::from_str("invalid"), None);
    }

    #[test]
    fn test_two_port_order() {
        let content = "# Hz S RI R 50\n1 11 0 21 0 12 0 22 0\n";
        let ts = Touchstone::from_str(content, 2).unwrap();
        assert_eq!(ts.s[[0, 0, 0]].re, 11.0);
        assert_eq!(ts.s[[0, 1, 0]].re, 21.0);
        assert_eq!(ts.s[[0, 0, 1]].re, 12.0);
        assert_eq!(ts.s[[0, 1, 1]].re, 22.0);
    }

    #[test]
    fn test_wrapped_records_and_comments() {
        let content = "! header comment\n# MHz S DB R 50\n100 -6.0 0.0 ! inline\n200\n-20.0 90.0\n";
        let ts = Touchstone::from_str(content, 1).unwrap();
        assert_eq!(ts.nfreq(), 2);
        assert_eq!(ts.comments, vec!["header comment".to_string()]);
        assert_relative_eq!(ts.frequency.f()[1], 200e6);
        assert_relative_eq!(ts.s[[0, 0, 0]].re, 10f64.powf(-6.0 / 20.0), epsilon = 1e-12);
        assert_relative_eq!(ts.s[[1, 0, 0]].im, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_incomplete_record() {
        let content = "# GHz S MA R 50\n1.0 0.5\n";
        assert!(matches!(
            Touchstone::from_str(content, 1),
            Err(TouchstoneError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_non_monotonic_frequencies() {
        let content = "# GHz S MA R 50\n2.0 0.5 0\n1.0 0.5 0\n";
        assert!(matches!(
            Touchstone::from_str(content, 1),
            Err(TouchstoneError::Network(CalError::InvalidRange(_)))
        ));
    }

    #[test]
    fn test_data_before_option_line() {
        let content = "1.0 0.5 0\n# MHz S RI R 50\n2.0 0.5 0\n";
        match Touchstone::from_str(content, 1) {
            Err(TouchstoneError::Parse { line, message }) => {
                assert_eq!(line, 1);
                assert!(message.contains("option line"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}

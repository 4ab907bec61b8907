//! VCD loader for replaying recorded waveforms as stimulus.
//!
//! Parses IEEE 1364 Value Change Dump text produced by [`export_vcd`] or other
//! simulators into a [`LoadedWaveform`]: the timescale, the declared variables
//! and each variable's value changes. [`LoadedWaveform::to_stimulus`] matches
//! variables to netlist nets by name (splitting vectors into `base[i]` bits)
//! and rescales timestamps to the engine timescale.
//!
//! [`export_vcd`]: crate::waveform::export_vcd

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use strobe_common::{Logic, Timescale};
use strobe_netlist::{NetId, Netlist};
use thiserror::Error;

use crate::stimulus::Stimulus;

/// Errors that can occur while loading a VCD file.
#[derive(Debug, Error)]
pub enum VcdLoadError {
    /// An I/O error occurred while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A parse error at a specific line number.
    #[error("parse error at line {line}: {message}")]
    ParseError {
        /// The 1-based line number where the error occurred.
        line: usize,
        /// Description of the error.
        message: String,
    },
    /// The VCD file has a structural format error.
    #[error("format error: {0}")]
    FormatError(String),
    /// A timestamp cannot be expressed in the target timescale.
    #[error("time {time} in units of {from} is not a whole number of {to} steps")]
    Rescale {
        /// Timestamp in file units.
        time: u64,
        /// File timescale.
        from: Timescale,
        /// Target timescale.
        to: Timescale,
    },
}

/// A variable declared in the VCD file with its value changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcdSignal {
    /// The VCD identifier code.
    pub code: String,
    /// Enclosing scope names, outermost first.
    pub scope: Vec<String>,
    /// The variable name without its range.
    pub name: String,
    /// Bit width.
    pub width: usize,
    /// Declared `[msb:lsb]` range, if any.
    pub range: Option<(u32, u32)>,
    /// `(time, value)` changes in file time units; values are MSB first.
    pub changes: Vec<(u64, Vec<Logic>)>,
}

impl VcdSignal {
    /// Names of the single-bit nets this variable maps to, MSB first.
    pub fn bit_names(&self) -> Vec<String> {
        match (self.width, self.range) {
            (1, None) => vec![self.name.clone()],
            (_, Some((msb, lsb))) => {
                let indices: Vec<u32> = if msb >= lsb {
                    (lsb..=msb).rev().collect()
                } else {
                    (msb..=lsb).collect()
                };
                indices
                    .into_iter()
                    .map(|i| format!("{}[{i}]", self.name))
                    .collect()
            }
            (width, None) => (0..width)
                .rev()
                .map(|i| format!("{}[{i}]", self.name))
                .collect(),
        }
    }
}

/// A fully loaded waveform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedWaveform {
    /// The timescale from the VCD header.
    pub timescale: Timescale,
    /// Variables in declaration order.
    pub signals: Vec<VcdSignal>,
}

impl LoadedWaveform {
    /// Finds a variable by name.
    pub fn signal(&self, name: &str) -> Option<&VcdSignal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Converts the waveform into stimulus for the nets of `netlist`.
    ///
    /// Each variable bit is matched to the net of the same name; bus bits also
    /// match the `base(i)` spelling. Bits without a matching net are skipped and
    /// their names returned. Timestamps are rescaled to `timescale`.
    pub fn to_stimulus(
        &self,
        netlist: &Netlist,
        timescale: Timescale,
    ) -> Result<(Stimulus, Vec<String>), VcdLoadError> {
        let names = netlist.net_name_index();
        let lookup = |name: &str| -> Option<NetId> {
            names.get(name).copied().or_else(|| {
                let alt = name.strip_suffix(']')?.replacen('[', "(", 1) + ")";
                names.get(alt.as_str()).copied()
            })
        };
        let mut stimulus = Stimulus::new();
        let mut unmatched = Vec::new();
        let mut claimed: HashSet<NetId> = HashSet::new();
        for signal in &self.signals {
            for (bit, name) in signal.bit_names().into_iter().enumerate() {
                let Some(net) = lookup(&name) else {
                    unmatched.push(name);
                    continue;
                };
                if !claimed.insert(net) {
                    continue;
                }
                let mut previous = None;
                for (time, value) in &signal.changes {
                    let v = value[bit];
                    if previous == Some(v) {
                        continue;
                    }
                    previous = Some(v);
                    let t = timescale
                        .convert_from(*time, self.timescale)
                        .ok_or(VcdLoadError::Rescale {
                            time: *time,
                            from: self.timescale,
                            to: timescale,
                        })?;
                    stimulus.events.push((net, v, t));
                }
            }
        }
        if !unmatched.is_empty() {
            log::debug!("{} waveform bits have no matching net", unmatched.len());
        }
        Ok((stimulus, unmatched))
    }
}

/// Loads a VCD waveform from a buffered reader.
///
/// # Errors
///
/// Returns [`VcdLoadError`] on I/O errors, parse errors, or missing
/// `$enddefinitions`.
pub fn load_vcd<R: BufRead>(reader: R) -> Result<LoadedWaveform, VcdLoadError> {
    let mut parser = Parser::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        for token in line.split_whitespace() {
            parser.token(token, index + 1)?;
        }
    }
    parser.finish()
}

/// Loads a VCD file from a filesystem path.
pub fn load_vcd_file(path: &Path) -> Result<LoadedWaveform, VcdLoadError> {
    let file = std::fs::File::open(path)?;
    load_vcd(std::io::BufReader::new(file))
}

#[derive(Default)]
struct Parser {
    timescale: Option<Timescale>,
    signals: Vec<VcdSignal>,
    codes: HashMap<String, Vec<usize>>,
    scope: Vec<String>,
    section: Option<(String, Vec<String>)>,
    definitions_done: bool,
    time: u64,
    pending_vector: Option<Vec<Logic>>,
    skip_next: bool,
}

fn parse_error(line: usize, message: String) -> VcdLoadError {
    VcdLoadError::ParseError { line, message }
}

impl Parser {
    fn token(&mut self, token: &str, line: usize) -> Result<(), VcdLoadError> {
        if let Some((_, body)) = &mut self.section {
            if token == "$end" {
                if let Some((keyword, body)) = self.section.take() {
                    self.finish_section(&keyword, &body, line)?;
                }
            } else {
                body.push(token.to_string());
            }
            return Ok(());
        }
        if self.skip_next {
            self.skip_next = false;
            return Ok(());
        }
        if let Some(bits) = self.pending_vector.take() {
            self.record(token, bits);
            return Ok(());
        }
        if let Some(keyword) = token.strip_prefix('$') {
            match keyword {
                "dumpvars" | "dumpall" | "dumpon" | "dumpoff" | "end" => {}
                "enddefinitions" => {
                    self.definitions_done = true;
                    self.section = Some((keyword.to_string(), Vec::new()));
                }
                _ => self.section = Some((keyword.to_lowercase(), Vec::new())),
            }
            return Ok(());
        }
        if !self.definitions_done {
            return Err(parse_error(line, format!("unexpected token '{token}' in header")));
        }
        if let Some(time) = token.strip_prefix('#') {
            self.time = time
                .parse()
                .map_err(|_| parse_error(line, format!("invalid timestamp: {token}")))?;
            return Ok(());
        }
        let mut chars = token.chars();
        match chars.next() {
            Some('b' | 'B') => {
                let bits = parse_bits(chars.as_str())
                    .ok_or_else(|| parse_error(line, format!("invalid vector value: {token}")))?;
                self.pending_vector = Some(bits);
            }
            Some('r' | 'R') => self.skip_next = true,
            Some(c) => {
                let value = Logic::from_char(c)
                    .ok_or_else(|| parse_error(line, format!("invalid value change: {token}")))?;
                let code = chars.as_str();
                if code.is_empty() {
                    return Err(parse_error(line, format!("value change without identifier: {token}")));
                }
                self.record(code, vec![value]);
            }
            None => {}
        }
        Ok(())
    }

    fn record(&mut self, code: &str, bits: Vec<Logic>) {
        let Some(indices) = self.codes.get(code) else {
            return;
        };
        for &i in indices {
            let signal = &mut self.signals[i];
            let value = extend_to_width(&bits, signal.width);
            match signal.changes.last_mut() {
                Some((t, last)) if *t == self.time => *last = value,
                _ => signal.changes.push((self.time, value)),
            }
        }
    }

    fn finish_section(&mut self, keyword: &str, body: &[String], line: usize) -> Result<(), VcdLoadError> {
        match keyword {
            "timescale" => {
                let text = body.concat();
                let timescale = text
                    .parse()
                    .map_err(|_| parse_error(line, format!("unsupported timescale: {text}")))?;
                self.timescale = Some(timescale);
            }
            "scope" => {
                if let Some(name) = body.get(1).or(body.first()) {
                    self.scope.push(name.clone());
                }
            }
            "upscope" => {
                self.scope.pop();
            }
            "var" => {
                if body.len() < 4 {
                    return Err(parse_error(line, format!("invalid $var: {}", body.join(" "))));
                }
                let width: usize = body[1]
                    .parse()
                    .ok()
                    .filter(|w| *w > 0)
                    .ok_or_else(|| parse_error(line, format!("invalid width in $var: {}", body[1])))?;
                let (name, range) = match body.get(4) {
                    Some(range) => (body[3].clone(), parse_range(range)),
                    None => split_attached_range(&body[3]),
                };
                let code = body[2].clone();
                self.codes
                    .entry(code.clone())
                    .or_default()
                    .push(self.signals.len());
                self.signals.push(VcdSignal {
                    code,
                    scope: self.scope.clone(),
                    name,
                    width,
                    range: range.filter(|(msb, lsb)| msb.abs_diff(*lsb) as usize + 1 == width),
                    changes: Vec::new(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<LoadedWaveform, VcdLoadError> {
        if let Some((keyword, _)) = &self.section {
            return Err(VcdLoadError::FormatError(format!("unterminated ${keyword} section")));
        }
        if !self.definitions_done && !self.signals.is_empty() {
            return Err(VcdLoadError::FormatError(
                "missing $enddefinitions".to_string(),
            ));
        }
        Ok(LoadedWaveform {
            timescale: self.timescale.unwrap_or_default(),
            signals: self.signals,
        })
    }
}

fn parse_bits(text: &str) -> Option<Vec<Logic>> {
    if text.is_empty() {
        return None;
    }
    text.chars().map(Logic::from_char).collect()
}

/// Left-extends a vector value to `width`: with `X`/`Z` when the leftmost bit
/// is `X`/`Z`, with `0` otherwise. Longer values keep their low bits.
fn extend_to_width(bits: &[Logic], width: usize) -> Vec<Logic> {
    if bits.len() >= width {
        return bits[bits.len() - width..].to_vec();
    }
    let fill = match bits[0] {
        Logic::X | Logic::Z => bits[0],
        _ => Logic::Zero,
    };
    let mut value = vec![fill; width - bits.len()];
    value.extend_from_slice(bits);
    value
}

/// Parses `[msb:lsb]` or `[bit]`.
fn parse_range(text: &str) -> Option<(u32, u32)> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    match inner.split_once(':') {
        Some((msb, lsb)) => Some((msb.trim().parse().ok()?, lsb.trim().parse().ok()?)),
        None => {
            let bit = inner.trim().parse().ok()?;
            Some((bit, bit))
        }
    }
}

/// Splits `name[3:0]` into `("name", Some((3, 0)))`.
fn split_attached_range(text: &str) -> (String, Option<(u32, u32)>) {
    if let Some(start) = text.find('[') {
        if let Some(range) = parse_range(&text[start..]) {
            return (text[..start].to_string(), Some(range));
        }
    }
    (text.to_string(), None)
}

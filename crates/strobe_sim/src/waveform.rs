//! Value Change Dump export.
//!
//! [`export_vcd`] turns an [`EventLog`] into IEEE 1364 VCD text. The output is
//! a pure function of the log, the netlist names and the [`VcdOptions`]: no
//! wall-clock date is written unless one is supplied, so identical runs
//! produce byte-identical files.
//!
//! Single-bit nets named `base[i]` or `base(i)` are grouped into one vector
//! variable `base`, most significant bit first.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use strobe_common::{Logic, Timescale};
use strobe_config::WaveformDef;
use strobe_netlist::{NetId, Netlist};

use crate::error::{SimError, StimulusError};
use crate::store::EventLog;

/// What to include in an exported waveform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcdOptions {
    /// Nets to dump; empty dumps every net of the netlist.
    pub nets: Vec<NetId>,
    /// First dumped timestamp; values at this time form the initial dump.
    pub start: Option<u64>,
    /// Last dumped timestamp.
    pub end: Option<u64>,
    /// Text of the `$date` section; omitted when `None`.
    pub date: Option<String>,
}

impl VcdOptions {
    /// Builds options from a `[waveform]` configuration table.
    pub fn from_config(netlist: &Netlist, def: &WaveformDef) -> Result<Self, StimulusError> {
        let names = netlist.net_name_index();
        let nets = def
            .nets
            .iter()
            .map(|name| {
                names
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| StimulusError::UnknownNetName(name.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            nets,
            start: def.start,
            end: def.end,
            date: None,
        })
    }
}

/// A dumped variable: a scalar net or a group of bus bits, MSB first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Variable {
    name: String,
    range: Option<(u32, u32)>,
    bits: Vec<NetId>,
}

/// Splits `base[i]` / `base(i)` into its base name, bracket style and index.
fn split_bus_bit(name: &str) -> Option<(&str, char, u32)> {
    let open = match name.chars().last()? {
        ']' => '[',
        ')' => '(',
        _ => return None,
    };
    let start = name.rfind(open)?;
    let index = name[start + 1..name.len() - 1].parse().ok()?;
    let base = &name[..start];
    (!base.is_empty()).then_some((base, open, index))
}

/// Groups the selected nets into variables, in order of first appearance.
fn collect_variables(netlist: &Netlist, nets: &[NetId]) -> Vec<Variable> {
    let mut variables: Vec<Variable> = Vec::new();
    let mut buses: Vec<((String, char), Vec<(u32, NetId)>)> = Vec::new();
    let mut order: Vec<Result<usize, usize>> = Vec::new();
    for &net in nets {
        let name = &netlist.net(net).name;
        match split_bus_bit(name) {
            Some((base, open, index)) => {
                let key = (base.to_string(), open);
                match buses.iter_mut().position(|(k, _)| *k == key) {
                    Some(i) => buses[i].1.push((index, net)),
                    None => {
                        order.push(Err(buses.len()));
                        buses.push((key, vec![(index, net)]));
                    }
                }
            }
            None => {
                order.push(Ok(variables.len()));
                variables.push(Variable {
                    name: name.clone(),
                    range: None,
                    bits: vec![net],
                });
            }
        }
    }
    let mut grouped: Vec<Option<Variable>> = buses
        .into_iter()
        .map(|((base, _), mut bits)| {
            bits.sort_by(|a, b| b.0.cmp(&a.0));
            bits.dedup_by_key(|b| b.0);
            let msb = bits.first().map_or(0, |b| b.0);
            let lsb = bits.last().map_or(0, |b| b.0);
            let contiguous = (msb - lsb) as usize + 1 == bits.len();
            Some(Variable {
                name: base,
                range: contiguous.then_some((msb, lsb)),
                bits: bits.into_iter().map(|(_, net)| net).collect(),
            })
        })
        .collect();
    let mut scalars: Vec<Option<Variable>> = variables.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|slot| match slot {
            Ok(i) => scalars[i].take(),
            Err(i) => grouped[i].take(),
        })
        .collect()
}

/// Generates a VCD identifier code from a sequential index.
///
/// Uses printable ASCII characters starting from `!` (0x21).
/// Multi-character codes are generated for indices >= 94.
fn make_id_code(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;
    loop {
        let c = (b'!' + (idx % 94) as u8) as char;
        result.push(c);
        idx /= 94;
        if idx == 0 {
            break;
        }
        idx -= 1;
    }
    result
}

/// Formats a value as a VCD change line body: `0!` for scalars, `b1010 !` for vectors.
fn format_change(bits: &[Logic], code: &str) -> String {
    if bits.len() == 1 {
        format!("{}{code}", bits[0].to_vcd_char())
    } else {
        let digits: String = bits.iter().map(|b| b.to_vcd_char()).collect();
        format!("b{digits} {code}")
    }
}

/// Streaming VCD writer.
pub struct VcdWriter<W: Write> {
    writer: W,
    next_id: usize,
}

impl<W: Write> VcdWriter<W> {
    /// Creates a writer over the given output.
    pub fn new(writer: W) -> Self {
        Self { writer, next_id: 0 }
    }

    /// Writes the `$date`, `$version` and `$timescale` sections.
    pub fn write_header(&mut self, timescale: Timescale, date: Option<&str>) -> Result<(), SimError> {
        if let Some(date) = date {
            writeln!(self.writer, "$date")?;
            writeln!(self.writer, "  {date}")?;
            writeln!(self.writer, "$end")?;
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  Strobe gate-level simulator {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  {timescale}")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    /// Opens a module scope.
    pub fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    /// Closes the current scope.
    pub fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    /// Declares a wire and returns its identifier code.
    pub fn declare(
        &mut self,
        name: &str,
        width: usize,
        range: Option<(u32, u32)>,
    ) -> Result<String, SimError> {
        let code = make_id_code(self.next_id);
        self.next_id += 1;
        match range {
            Some((msb, lsb)) => {
                writeln!(self.writer, "$var wire {width} {code} {name} [{msb}:{lsb}] $end")?
            }
            None => writeln!(self.writer, "$var wire {width} {code} {name} $end")?,
        }
        Ok(code)
    }

    /// Ends the declaration section.
    pub fn end_definitions(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$enddefinitions $end")?;
        Ok(())
    }

    /// Writes a `#time` marker.
    pub fn timestamp(&mut self, time: u64) -> Result<(), SimError> {
        writeln!(self.writer, "#{time}")?;
        Ok(())
    }

    /// Writes one value change.
    pub fn change(&mut self, code: &str, bits: &[Logic]) -> Result<(), SimError> {
        writeln!(self.writer, "{}", format_change(bits, code))?;
        Ok(())
    }

    /// Writes a raw section keyword such as `$dumpvars` or `$end`.
    pub fn keyword(&mut self, keyword: &str) -> Result<(), SimError> {
        writeln!(self.writer, "{keyword}")?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, SimError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Writes the waveform of `log` as VCD text to `writer`.
pub fn export_vcd<W: Write>(
    log: &EventLog,
    netlist: &Netlist,
    timescale: Timescale,
    options: &VcdOptions,
    writer: W,
) -> Result<W, SimError> {
    let nets: Vec<NetId> = if options.nets.is_empty() {
        netlist.nets().map(|n| n.id).collect()
    } else {
        options.nets.clone()
    };
    let variables = collect_variables(netlist, &nets);
    let start = options.start.unwrap_or(0);
    let end = options.end.unwrap_or(u64::MAX);

    let mut vcd = VcdWriter::new(writer);
    vcd.write_header(timescale, options.date.as_deref())?;
    vcd.begin_scope(&netlist.name)?;
    let mut codes = Vec::with_capacity(variables.len());
    for var in &variables {
        codes.push(vcd.declare(&var.name, var.bits.len(), var.range)?);
    }
    vcd.end_scope()?;
    vcd.end_definitions()?;

    let sample = |var: &Variable, time: u64| -> Vec<Logic> {
        var.bits.iter().map(|&net| log.get_value(net, time)).collect()
    };

    vcd.timestamp(start)?;
    vcd.keyword("$dumpvars")?;
    let mut current: Vec<Vec<Logic>> = Vec::with_capacity(variables.len());
    for (var, code) in variables.iter().zip(&codes) {
        let value = sample(var, start);
        vcd.change(code, &value)?;
        current.push(value);
    }
    vcd.keyword("$end")?;

    let times: BTreeSet<u64> = variables
        .iter()
        .flat_map(|var| var.bits.iter())
        .flat_map(|&net| log.history(net).iter().map(|e| e.time))
        .filter(|&t| t > start && t <= end)
        .collect();
    for time in times {
        let mut stamped = false;
        for (i, var) in variables.iter().enumerate() {
            let value = sample(var, time);
            if value != current[i] {
                if !stamped {
                    vcd.timestamp(time)?;
                    stamped = true;
                }
                vcd.change(&codes[i], &value)?;
                current[i] = value;
            }
        }
    }
    vcd.finish()
}

/// Renders the waveform of `log` as a VCD string.
pub fn export_vcd_string(
    log: &EventLog,
    netlist: &Netlist,
    timescale: Timescale,
    options: &VcdOptions,
) -> Result<String, SimError> {
    let bytes = export_vcd(log, netlist, timescale, options, Vec::new())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes the waveform of `log` to a VCD file at `path`.
pub fn write_vcd_file(
    path: &Path,
    log: &EventLog,
    netlist: &Netlist,
    timescale: Timescale,
    options: &VcdOptions,
) -> Result<(), SimError> {
    let file = BufWriter::new(File::create(path)?);
    export_vcd(log, netlist, timescale, options, file)?;
    log::debug!("wrote waveform to {}", path.display());
    Ok(())
}

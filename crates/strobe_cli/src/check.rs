//! `strobe check`: validate a netlist and simulation file without simulating.

use std::collections::BTreeSet;

use strobe_netlist::{GateGraph, NetId, Netlist};
use strobe_sim::{Engine, EngineConfig, Stimulus, StimulusError, VcdOptions};

use crate::run::load_netlist;
use crate::{CheckArgs, GlobalArgs};

/// Runs the `strobe check` command.
///
/// Structural problems and unresolvable names are errors. Combinational loops
/// are reported but do not fail the check, since they only matter if they
/// oscillate at run time.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let netlist = load_netlist(&args.netlist)?;
    let config = EngineConfig::default();
    Engine::new(&netlist, config)?;

    let loops = combinational_loops(&netlist);
    for cycle in &loops {
        log::warn!("combinational loop through {}", cycle.join(", "));
    }

    if let Some(path) = &args.config {
        let sim = strobe_config::load_config(path)?;
        let stimulus = Stimulus::from_config(&netlist, &sim)?;
        for name in undriven_inputs(&netlist, &stimulus) {
            log::warn!("input '{name}' is read but never driven; it stays X");
        }
        for init in &sim.initialize {
            for name in &init.gates {
                if netlist.gate_by_name(name).is_none() {
                    return Err(StimulusError::UnknownGateName(name.clone()).into());
                }
            }
        }
        if let Some(wave) = &sim.waveform {
            VcdOptions::from_config(&netlist, wave)?;
        }
    }

    if !global.quiet {
        eprintln!(
            "   {}: {} gates, {} nets, {} combinational loop(s)",
            netlist.name,
            netlist.gate_count(),
            netlist.net_count(),
            loops.len()
        );
    }
    Ok(0)
}

/// Gate names of every combinational cycle, one list per cycle.
fn combinational_loops(netlist: &Netlist) -> Vec<Vec<String>> {
    GateGraph::combinational(netlist)
        .cycles()
        .into_iter()
        .map(|cycle| {
            cycle
                .into_iter()
                .map(|g| netlist.gate(g).name.clone())
                .collect()
        })
        .collect()
}

/// Global inputs that some gate reads but no clock or stimulus entry drives.
fn undriven_inputs(netlist: &Netlist, stimulus: &Stimulus) -> Vec<String> {
    let driven: BTreeSet<NetId> = stimulus
        .events
        .iter()
        .map(|&(net, ..)| net)
        .chain(stimulus.clocks.iter().map(|c| c.net))
        .collect();
    netlist
        .global_inputs()
        .into_iter()
        .filter(|net| !driven.contains(net))
        .map(|net| netlist.net(net))
        .filter(|net| !net.destinations.is_empty())
        .map(|net| net.name.clone())
        .collect()
}

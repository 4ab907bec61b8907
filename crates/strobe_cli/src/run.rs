//! `strobe run`: simulate a netlist snapshot.
//!
//! Loads the netlist and the optional simulation file, applies command-line
//! overrides, runs the simulation and writes the waveform if one was asked for.

use std::path::Path;

use strobe_config::{SimulationFile, WaveformDef};
use strobe_netlist::Netlist;
use strobe_sim::{load_vcd_file, Stimulus};

use crate::{GlobalArgs, RunArgs};

/// Runs the `strobe run` command. Returns exit code 0 on success.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let netlist = load_netlist(&args.netlist)?;
    let mut config = match &args.config {
        Some(path) => strobe_config::load_config(path)?,
        None => SimulationFile::default(),
    };
    apply_overrides(&mut config, args);

    let extra = match &args.replay {
        Some(path) => {
            let wave = load_vcd_file(path)?;
            let (stimulus, unmatched) = wave.to_stimulus(&netlist, config.simulation.timescale)?;
            for name in &unmatched {
                log::warn!("replayed signal '{name}' has no matching net");
            }
            stimulus
        }
        None => Stimulus::new(),
    };

    if !global.quiet {
        eprintln!(
            "   Simulating {} ({} gates, {} nets)",
            netlist.name,
            netlist.gate_count(),
            netlist.net_count()
        );
    }

    let result = strobe_sim::simulate_with(&netlist, &config, &extra)?;

    if !global.quiet {
        let end = result
            .summary
            .final_time
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        eprintln!(
            "   Simulation finished at {end} x {} ({} events, {} delta rounds)",
            result.timescale, result.summary.events, result.summary.delta_rounds
        );
        if let Some(wave) = &config.waveform {
            eprintln!("   Waveform: {}", wave.path.display());
        }
    }
    Ok(0)
}

/// Loads a netlist snapshot and checks its structure.
pub fn load_netlist(path: &Path) -> Result<Netlist, Box<dyn std::error::Error>> {
    let netlist = Netlist::load(path)?;
    netlist.validate()?;
    log::debug!("loaded netlist '{}' from {}", netlist.name, path.display());
    Ok(netlist)
}

fn apply_overrides(config: &mut SimulationFile, args: &RunArgs) {
    if let Some(until) = args.until {
        config.simulation.until = Some(until);
    }
    if let Some(path) = &args.vcd {
        match &mut config.waveform {
            Some(wave) => wave.path = path.clone(),
            None => {
                config.waveform = Some(WaveformDef {
                    path: path.clone(),
                    nets: Vec::new(),
                    start: None,
                    end: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(netlist: &Path) -> RunArgs {
        RunArgs {
            netlist: netlist.to_path_buf(),
            config: None,
            vcd: None,
            until: None,
            replay: None,
        }
    }

    fn write_netlist(dir: &Path) -> PathBuf {
        let mut nl = Netlist::with_standard_library("and");
        let a = nl.add_net("a");
        let b = nl.add_net("b");
        let y = nl.add_net("y");
        nl.add_cell("u0", "AND2", &[("A", a), ("B", b)], &[("Y", y)])
            .unwrap();
        let path = dir.join("and.json");
        std::fs::write(&path, nl.to_json().unwrap()).unwrap();
        path
    }

    #[test]
    fn overrides_replace_config() {
        let mut config = SimulationFile::default();
        let mut run_args = args(Path::new("x.json"));
        run_args.until = Some(7);
        run_args.vcd = Some(PathBuf::from("out.vcd"));
        apply_overrides(&mut config, &run_args);
        assert_eq!(config.simulation.until, Some(7));
        assert_eq!(config.waveform.unwrap().path, PathBuf::from("out.vcd"));
    }

    #[test]
    fn run_writes_waveform() {
        let dir = tempfile::tempdir().unwrap();
        let netlist = write_netlist(dir.path());
        let sim = dir.path().join("sim.toml");
        std::fs::write(
            &sim,
            "[[stimulus]]\nnet = \"a\"\nvalue = 1\ntime = 0\n\n[[stimulus]]\nnet = \"b\"\nvalue = 1\ntime = 4\n",
        )
        .unwrap();
        let vcd = dir.path().join("out.vcd");
        let mut run_args = args(&netlist);
        run_args.config = Some(sim);
        run_args.vcd = Some(vcd.clone());
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
        };
        assert_eq!(run(&run_args, &global).unwrap(), 0);
        let text = std::fs::read_to_string(&vcd).unwrap();
        assert!(text.contains(" y $end"));
        assert!(text.contains("#4"));
    }

    #[test]
    fn replayed_waveform_drives_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let netlist = write_netlist(dir.path());
        let recorded = dir.path().join("in.vcd");
        std::fs::write(
            &recorded,
            "$timescale 1ps $end\n$var wire 1 ! a $end\n$var wire 1 \" b $end\n$enddefinitions $end\n#0\n1!\n0\"\n#6\n1\"\n",
        )
        .unwrap();
        let vcd = dir.path().join("out.vcd");
        let mut run_args = args(&netlist);
        run_args.replay = Some(recorded);
        run_args.vcd = Some(vcd.clone());
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
        };
        assert_eq!(run(&run_args, &global).unwrap(), 0);
        let wave = load_vcd_file(&vcd).unwrap();
        let y = wave.signal("y").unwrap();
        assert_eq!(y.changes.last().map(|(t, _)| *t), Some(6));
    }

    #[test]
    fn missing_netlist_is_an_error() {
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
        };
        assert!(run(&args(Path::new("/nonexistent/net.json")), &global).is_err());
    }
}

//! Parallel runs of independent stimulus sets over one netlist.

use rayon::prelude::*;
use strobe_netlist::Netlist;

use crate::engine::{Engine, EngineConfig};
use crate::error::SimError;
use crate::stimulus::Stimulus;
use crate::store::EventLog;

/// Runs every stimulus set in its own engine, in parallel.
///
/// Each run owns its cells and log and only reads `netlist`. Runs stop at
/// `until` when given, otherwise when no events remain. Results are returned
/// in the order of `sets`; one failing run does not affect the others.
pub fn run_batch(
    netlist: &Netlist,
    config: EngineConfig,
    sets: &[Stimulus],
    until: Option<u64>,
) -> Vec<Result<EventLog, SimError>> {
    sets.par_iter()
        .enumerate()
        .map(|(index, stimulus)| {
            let log = run_one(netlist, config, stimulus, until);
            if let Err(err) = &log {
                log::warn!("batch run {index} failed: {err}");
            }
            log
        })
        .collect()
}

fn run_one(
    netlist: &Netlist,
    config: EngineConfig,
    stimulus: &Stimulus,
    until: Option<u64>,
) -> Result<EventLog, SimError> {
    let mut engine = Engine::new(netlist, config)?;
    stimulus.apply(&mut engine)?;
    match until {
        Some(end) => engine.run_until(end)?,
        None => engine.run_to_completion()?,
    };
    Ok(engine.into_log())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_common::Logic;

    fn and_gate() -> Netlist {
        let mut nl = Netlist::with_standard_library("top");
        let a = nl.add_net("a");
        let b = nl.add_net("b");
        let y = nl.add_net("y");
        nl.add_cell("u0", "AND2", &[("A", a), ("B", b)], &[("Y", y)])
            .unwrap();
        nl
    }

    #[test]
    fn results_follow_input_order() {
        let nl = and_gate();
        let a = nl.net_by_name("a").unwrap();
        let b = nl.net_by_name("b").unwrap();
        let y = nl.net_by_name("y").unwrap();
        let sets: Vec<Stimulus> = [(Logic::Zero, Logic::One), (Logic::One, Logic::One), (Logic::One, Logic::Zero)]
            .iter()
            .map(|&(va, vb)| Stimulus::new().event(a, va, 0).event(b, vb, 0))
            .collect();
        let results = run_batch(&nl, EngineConfig::default(), &sets, None);
        let outputs: Vec<Logic> = results
            .iter()
            .map(|r| r.as_ref().unwrap().get_value(y, 0))
            .collect();
        assert_eq!(outputs, vec![Logic::Zero, Logic::One, Logic::Zero]);
    }

    #[test]
    fn failing_run_is_isolated() {
        let nl = and_gate();
        let a = nl.net_by_name("a").unwrap();
        let bogus = strobe_netlist::NetId::from_raw(99);
        let sets = vec![
            Stimulus::new().event(bogus, Logic::One, 0),
            Stimulus::new().event(a, Logic::One, 0),
        ];
        let results = run_batch(&nl, EngineConfig::default(), &sets, Some(10));
        assert!(matches!(results[0], Err(SimError::InvalidStimulus(_))));
        assert_eq!(results[1].as_ref().unwrap().get_value(a, 5), Logic::One);
    }

    #[test]
    fn until_bounds_each_run() {
        let nl = and_gate();
        let a = nl.net_by_name("a").unwrap();
        let sets = vec![Stimulus::new().event(a, Logic::One, 5).event(a, Logic::Zero, 50)];
        let results = run_batch(&nl, EngineConfig::default(), &sets, Some(10));
        let log = results[0].as_ref().unwrap();
        assert_eq!(log.get_value(a, 100), Logic::One);
    }
}

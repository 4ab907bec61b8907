//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SimulationFile;
use std::path::Path;

/// Loads and validates a simulation configuration file.
pub fn load_config(path: &Path) -> Result<SimulationFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a simulation configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SimulationFile, ConfigError> {
    let config: SimulationFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &SimulationFile) -> Result<(), ConfigError> {
    if config.simulation.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.max_iterations must be greater than zero".to_string(),
        ));
    }
    for (i, clock) in config.clocks.iter().enumerate() {
        if clock.net.is_empty() {
            return Err(ConfigError::MissingField(format!("clocks[{i}].net")));
        }
        if clock.period < 2 || clock.period % 2 != 0 {
            return Err(ConfigError::ValidationError(format!(
                "clock on '{}' has period {}; the period must be even and at least 2",
                clock.net, clock.period
            )));
        }
        if !clock.start_value.is_binary() {
            return Err(ConfigError::ValidationError(format!(
                "clock on '{}' must start at 0 or 1, not {}",
                clock.net, clock.start_value
            )));
        }
    }
    for (i, stimulus) in config.stimulus.iter().enumerate() {
        if stimulus.net.is_empty() {
            return Err(ConfigError::MissingField(format!("stimulus[{i}].net")));
        }
    }
    for (i, init) in config.initialize.iter().enumerate() {
        if init.gates.iter().any(String::is_empty) {
            return Err(ConfigError::ValidationError(format!(
                "initialize[{i}].gates contains an empty gate name"
            )));
        }
    }
    if let Some(waveform) = &config.waveform {
        if waveform.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("waveform.path".to_string()));
        }
        if waveform.nets.iter().any(String::is_empty) {
            return Err(ConfigError::ValidationError(
                "waveform.nets contains an empty net name".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (waveform.start, waveform.end) {
            if start > end {
                return Err(ConfigError::ValidationError(format!(
                    "waveform window starts at {start} after it ends at {end}"
                )));
            }
        }
    }
    Ok(())
}

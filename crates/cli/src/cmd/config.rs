//! Configuration management command
//!
//! Provides CLI interface to view and edit user configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

const KEYS: [&str; 3] = [
    "user.name",
    "worker.recheck_interval_secs",
    "worker.event_capacity",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "User Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[user]".yellow());
    match &config.user.name {
        Some(name) => println!("  {} = {}", "name".cyan(), name),
        None => println!("  {} = {}", "name".cyan(), "(unset, using $USER)".dimmed()),
    }

    println!("\n{}", "[worker]".yellow());
    println!(
        "  {} = {} {}",
        "recheck_interval_secs".cyan(),
        config.worker.recheck_interval_secs,
        format!("({}s)", config.worker.recheck_interval_secs).dimmed()
    );
    println!(
        "  {} = {}",
        "event_capacity".cyan(),
        config.worker.event_capacity
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  recheck_interval_secs: 1-3600");
    println!("  event_capacity: 16-65,536");

    Ok(())
}

/// Read one key as a display string
pub fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let value = match key {
        "user.name" => config.user.name.clone().unwrap_or_default(),
        "worker.recheck_interval_secs" => config.worker.recheck_interval_secs.to_string(),
        "worker.event_capacity" => config.worker.event_capacity.to_string(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Known keys: {}",
            key,
            KEYS.join(", ")
        ),
    };
    Ok(value)
}

/// Apply one key to `config` and validate the result
pub fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "user.name" => {
            config.user.name = (!value.is_empty()).then(|| value.to_string());
        }
        "worker.recheck_interval_secs" => {
            config.worker.recheck_interval_secs = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "worker.event_capacity" => {
            config.worker.event_capacity = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Known keys: {}",
            key,
            KEYS.join(", ")
        ),
    }
    config.validate().context("Invalid configuration value")
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: Restart 'cw watch' for worker changes to take effect".yellow()
    );
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }
    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut config = SystemConfig::default();

        set_value(&mut config, "worker.recheck_interval_secs", "10").unwrap();
        set_value(&mut config, "user.name", "alice").unwrap();

        assert_eq!(get_value(&config, "worker.recheck_interval_secs").unwrap(), "10");
        assert_eq!(get_value(&config, "user.name").unwrap(), "alice");
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = SystemConfig::default();

        assert!(set_value(&mut config, "worker.recheck_interval_secs", "0").is_err());
        assert!(set_value(&mut config, "worker.event_capacity", "lots").is_err());
        assert!(set_value(&mut config, "no.such.key", "1").is_err());
        assert!(get_value(&config, "no.such.key").is_err());
    }
}

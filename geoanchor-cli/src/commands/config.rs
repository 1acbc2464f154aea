//! Config command - inspect and edit `~/.geoanchor/config.ini`.

use clap::Subcommand;
use geoanchor::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// Key as section.key, e.g. mosaic.zoom
        key: String,
    },

    /// Validate and store one value
    Set {
        /// Key as section.key, e.g. output.compression
        key: String,

        value: String,
    },

    /// Print every setting grouped by section
    List,

    /// Print the config file location
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let config = ConfigFile::load()?;
            println!("{}", display_value(&lookup(&key)?.get(&config)));
        }
        ConfigCommands::Set { key, value } => {
            let key = lookup(&key)?;
            let mut config = ConfigFile::load()?;
            key.set(&mut config, &value)?;
            config.save()?;
            println!("{} = {}", key, display_value(&key.get(&config)));
        }
        ConfigCommands::List => {
            let config = ConfigFile::load()?;
            print!("{}", render(&config));
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
    }
    Ok(())
}

fn lookup(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        let known: Vec<String> = ConfigKey::all().iter().map(ConfigKey::name).collect();
        CliError::Config(format!(
            "Unknown key '{}'. Known keys: {}",
            key,
            known.join(", ")
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// INI-style listing of the effective settings.
fn render(config: &ConfigFile) -> String {
    let mut out = String::new();
    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            if !section.is_empty() {
                out.push('\n');
            }
            section = key.section();
            out.push_str(&format!("[{}]\n", section));
        }
        out.push_str(&format!(
            "{} = {}\n",
            key.key_name(),
            display_value(&key.get(config))
        ));
    }
    out
}

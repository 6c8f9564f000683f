//! Command-line interface for gpgreport.
//!
//! Commands analyze raw engine results against the configured key snapshot,
//! classify trust values, and show or adjust keys in the snapshot.

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::Config;
use crate::Result;

pub use args::{Command, GlobalOptions, Invocation};

/// Builds the effective configuration: file, then environment, then flags
pub fn load_config(options: &GlobalOptions) -> Result<Config> {
    let mut config = Config::load(options.config_file.as_deref())?;
    if let Some(keyring) = &options.keyring {
        config.keyring_path = keyring.clone();
    }
    if let Some(format) = options.format {
        config.output_format = format;
    }
    if let Some(time) = options.time {
        config.reference_time = Some(time);
    }
    Ok(config)
}

/// Execute one parsed command
pub fn run(command: Command, config: &Config) -> Result<()> {
    let format = config.output_format;
    let ctx = config.analysis_context();

    let output = match command {
        Command::Help => {
            args::print_usage();
            return Ok(());
        }
        Command::Analyze { input_file } => {
            let keyring = utils::open_keyring(config)?;
            commands::analyze(&input_file, &keyring, &ctx, format)?
        }
        Command::Classify {
            owner_trust,
            validity,
        } => commands::classify_trust(owner_trust, validity, format)?,
        Command::ListKeys => {
            let keyring = utils::open_keyring(config)?;
            commands::list_keys(&keyring, ctx.reference_time, format)?
        }
        Command::ShowKey { handle } => {
            let keyring = utils::open_keyring(config)?;
            commands::show_key(&keyring, &handle, ctx.reference_time, format)?
        }
        Command::SetTrust { handle, level } => {
            let mut keyring = utils::open_keyring(config)?;
            commands::set_trust(&mut keyring, &handle, level)?;
            keyring.save(&config.keyring_path)?;
            commands::show_key(&keyring, &handle, ctx.reference_time, format)?
        }
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config() {
        let options = GlobalOptions {
            config_file: None,
            keyring: Some(PathBuf::from("/tmp/ring.bin")),
            format: Some(crate::config::OutputFormat::Json),
            time: Some(7),
        };
        let config = load_config(&options).unwrap();
        assert_eq!(config.keyring_path, PathBuf::from("/tmp/ring.bin"));
        assert_eq!(config.reference_time, Some(7));
    }
}

//! Command-line argument parsing for gpgreport.

use crate::config::OutputFormat;
use crate::error::{GpgReportError, Result};
use crate::key::KeyHandle;
use crate::trust::{OwnerTrust, ValidityCode};
use std::env;
use std::path::PathBuf;

/// Command-line interface commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze {
        input_file: PathBuf,
    },
    Classify {
        owner_trust: OwnerTrust,
        validity: ValidityCode,
    },
    ListKeys,
    ShowKey {
        handle: KeyHandle,
    },
    SetTrust {
        handle: KeyHandle,
        level: i64,
    },
    Help,
}

/// Options accepted before the command name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub config_file: Option<PathBuf>,
    pub keyring: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub options: GlobalOptions,
    pub command: Command,
}

/// Parse the process arguments
pub fn parse_args() -> Result<Invocation> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args)
}

/// Parse arguments, program name excluded
pub fn parse_from(args: &[String]) -> Result<Invocation> {
    let mut options = GlobalOptions::default();
    let mut rest = args;

    while let Some(flag) = rest.first().filter(|arg| arg.starts_with("--")) {
        let value = rest
            .get(1)
            .ok_or_else(|| GpgReportError::invalid_input(format!("{} requires a value", flag)))?;
        match flag.as_str() {
            "--config" => options.config_file = Some(PathBuf::from(value)),
            "--keyring" => options.keyring = Some(PathBuf::from(value)),
            "--format" => options.format = Some(value.parse()?),
            "--time" => {
                options.time = Some(value.parse().map_err(|_| {
                    GpgReportError::invalid_input(format!(
                        "--time expects a Unix timestamp, got '{}'",
                        value
                    ))
                })?)
            }
            other => {
                return Err(GpgReportError::invalid_input(format!(
                    "Unknown option '{}'",
                    other
                )))
            }
        }
        rest = &rest[2..];
    }

    let Some((name, params)) = rest.split_first() else {
        return Ok(Invocation {
            options,
            command: Command::Help,
        });
    };

    let require = |count: usize, usage: &str| -> Result<()> {
        if params.len() < count {
            return Err(GpgReportError::invalid_input(format!("Usage: gpgreport {}", usage)));
        }
        Ok(())
    };

    let command = match name.as_str() {
        "analyze" => {
            require(1, "analyze <raw-result.json>")?;
            Command::Analyze {
                input_file: PathBuf::from(&params[0]),
            }
        }
        "classify" => {
            require(2, "classify <owner-trust> <validity>")?;
            Command::Classify {
                owner_trust: parse_owner_trust(&params[0])?,
                validity: parse_validity(&params[1])?,
            }
        }
        "list-keys" => Command::ListKeys,
        "show-key" => {
            require(1, "show-key <fingerprint|keyid>")?;
            Command::ShowKey {
                handle: KeyHandle::parse(&params[0])?,
            }
        }
        "set-trust" => {
            require(2, "set-trust <fingerprint|keyid> <1-5>")?;
            let level = params[1].parse().map_err(|_| {
                GpgReportError::invalid_input(format!(
                    "Trust level must be a number, got '{}'",
                    params[1]
                ))
            })?;
            Command::SetTrust {
                handle: KeyHandle::parse(&params[0])?,
                level,
            }
        }
        "help" | "-h" => Command::Help,
        other => {
            return Err(GpgReportError::invalid_input(format!(
                "Unknown command '{}'",
                other
            )))
        }
    };

    Ok(Invocation { options, command })
}

/// Owner trust by name (`full`) or engine code (`4`)
pub fn parse_owner_trust(input: &str) -> Result<OwnerTrust> {
    if let Ok(code) = input.parse::<i64>() {
        return match code {
            0..=5 => Ok(OwnerTrust::from_code(code)),
            _ => Err(GpgReportError::invalid_input(format!(
                "Owner trust code out of range: {}",
                code
            ))),
        };
    }
    match input.to_ascii_lowercase().as_str() {
        "unknown" => Ok(OwnerTrust::Unknown),
        "undefined" => Ok(OwnerTrust::Undefined),
        "never" => Ok(OwnerTrust::Never),
        "marginal" => Ok(OwnerTrust::Marginal),
        "full" => Ok(OwnerTrust::Full),
        "ultimate" => Ok(OwnerTrust::Ultimate),
        other => Err(GpgReportError::invalid_input(format!(
            "Unknown owner trust '{}'",
            other
        ))),
    }
}

/// Validity by name, engine code (any integer) or colon-listing character
pub fn parse_validity(input: &str) -> Result<ValidityCode> {
    if let Ok(code) = input.parse::<i64>() {
        return Ok(ValidityCode(code));
    }
    match input.to_ascii_lowercase().as_str() {
        "unknown" => Ok(ValidityCode::UNKNOWN),
        "undefined" => Ok(ValidityCode::UNDEFINED),
        "never" => Ok(ValidityCode::NEVER),
        "marginal" => Ok(ValidityCode::MARGINAL),
        "full" => Ok(ValidityCode::FULL),
        "ultimate" => Ok(ValidityCode::ULTIMATE),
        other if other.chars().count() == 1 => {
            Ok(ValidityCode::from_colon_char(other.chars().next().unwrap_or('-')))
        }
        other => Err(GpgReportError::invalid_input(format!(
            "Unknown validity '{}'",
            other
        ))),
    }
}

/// Print usage information
pub fn print_usage() {
    println!("gpgreport - OpenPGP operation result analysis");
    println!();
    println!("Usage: gpgreport [options] <command> [args...]");
    println!();
    println!("Options:");
    println!("  --config <file>      JSON configuration file");
    println!("  --keyring <file>     Key snapshot (.json or bincode)");
    println!("  --format <fmt>       Output format: text or json");
    println!("  --time <unix>        Reference time for expiry checks");
    println!();
    println!("Commands:");
    println!("  analyze <raw-result.json>          Analyze an engine operation result");
    println!("  classify <owner-trust> <validity>  Classify a trust/validity pair");
    println!("  list-keys                          List keys in the snapshot");
    println!("  show-key <fingerprint|keyid>       Show one key");
    println!("  set-trust <fingerprint|keyid> <n>  Set owner trust (1-5)");
    println!();
    println!("Environment:");
    println!("  GPGREPORT_KEYRING, GPGREPORT_TIME, GPGREPORT_LOG, GPGREPORT_FORMAT");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_commands() {
        let inv = parse_from(&args("--format json --time 100 analyze result.json")).unwrap();
        assert_eq!(inv.options.format, Some(OutputFormat::Json));
        assert_eq!(inv.options.time, Some(100));
        assert_eq!(
            inv.command,
            Command::Analyze {
                input_file: PathBuf::from("result.json")
            }
        );

        let inv = parse_from(&args("classify full u")).unwrap();
        assert_eq!(
            inv.command,
            Command::Classify {
                owner_trust: OwnerTrust::Full,
                validity: ValidityCode::ULTIMATE
            }
        );

        assert_eq!(parse_from(&[]).unwrap().command, Command::Help);
        assert_eq!(parse_from(&args("list-keys")).unwrap().command, Command::ListKeys);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_from(&args("analyze")).is_err());
        assert!(parse_from(&args("--time soon list-keys")).is_err());
        assert!(parse_from(&args("--verbose list-keys")).is_err());
        assert!(parse_from(&args("show-key XYZ")).is_err());
        assert!(parse_from(&args("frobnicate")).is_err());
        assert!(parse_from(&args("--keyring")).is_err());
    }

    #[test]
    fn test_trust_arguments() {
        assert_eq!(parse_owner_trust("3").unwrap(), OwnerTrust::Marginal);
        assert!(parse_owner_trust("9").is_err());
        assert_eq!(parse_validity("42").unwrap(), ValidityCode(42));
        assert_eq!(parse_validity("r").unwrap(), ValidityCode::UNRECOGNIZED);
        assert!(parse_validity("sometimes").is_err());
    }
}

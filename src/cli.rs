// File: ./src/cli.rs
//! Command-line parsing and help text for the `invahelp` binary.
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the effective dataset (remote, else local fallback).
    Load,
    /// Replace the remote dataset with the contents of a JSON file.
    Override(PathBuf),
    /// Write a JSON dataset file into local storage.
    SaveFallback(PathBuf),
    ConfigPath,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub command: Command,
}

/// Parses `args` (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Invocation, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut root = None;
    let mut positional: Vec<String> = Vec::new();
    let mut iter = args.into_iter().map(Into::into);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => {
                return Ok(Invocation {
                    root,
                    command: Command::Help,
                });
            }
            "-r" | "--root" => {
                let path = iter.next().ok_or("--root requires a path")?;
                root = Some(PathBuf::from(path));
            }
            _ => positional.push(arg),
        }
    }

    let command = match positional.first().map(String::as_str) {
        None | Some("load") => Command::Load,
        Some("override") => Command::Override(file_arg(&positional, "override")?),
        Some("save-fallback") => Command::SaveFallback(file_arg(&positional, "save-fallback")?),
        Some("config-path") => Command::ConfigPath,
        Some(other) => return Err(format!("unknown command `{}`", other)),
    };
    Ok(Invocation { root, command })
}

fn file_arg(positional: &[String], command: &str) -> Result<PathBuf, String> {
    positional
        .get(1)
        .map(PathBuf::from)
        .ok_or_else(|| format!("`{}` requires a JSON file", command))
}

pub fn print_help(binary_name: &str) {
    println!(
        "Invahelp v{} - events and help services with offline fallback",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [--root <path>] [load]", binary_name);
    println!("    {} override <data.json>", binary_name);
    println!("    {} save-fallback <data.json>", binary_name);
    println!("    {} config-path", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("ENVIRONMENT:");
    println!("    INVAHELP_ENDPOINT     Overrides the endpoint from config.toml.");
}

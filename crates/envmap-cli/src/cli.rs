//! envmap CLI - Inspect and resolve environment variable maps
//!
//! Usage:
//!   envmap keys env.json
//!   envmap get env.json APP_BIN
//!   envmap resolve base.yaml local.yaml --format json
//!   envmap set env.json APP_HOME '${env:HOME}/app'
//!   envmap check env.json

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use envmap_core::EnvironmentVariableMap;
use tracing_subscriber::EnvFilter;

/// envmap - Environment variable maps with ${env:NAME} resolution
#[derive(Parser, Debug)]
#[command(name = "envmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the variables defined in the map
    Keys {
        /// Map file(s); later files override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the value of one variable
    Get {
        /// Map file(s); later files override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Variable name
        key: String,

        /// Print the raw value instead of resolving it
        #[arg(long)]
        raw: bool,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Value to print if the variable is not defined in the map
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Resolve every variable and print the result
    Resolve {
        /// Map file(s); later files override earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Set the raw value of a variable and save the file
    Set {
        /// Map file to edit (created if missing)
        file: PathBuf,

        /// Variable name
        key: String,

        /// Raw value, may contain ${env:NAME} references
        value: String,
    },

    /// Check that files load and every variable resolves
    Check {
        /// Map file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Keys { files } => cmd_keys(&files),

        Commands::Get {
            files,
            key,
            raw,
            format,
            default,
        } => cmd_get(&files, &key, raw, &format, default),

        Commands::Resolve {
            files,
            format,
            output,
        } => cmd_resolve(&files, &format, output),

        Commands::Set { file, key, value } => cmd_set(file, key, value),

        Commands::Check { files } => cmd_check(files),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_map(files: &[PathBuf]) -> Result<EnvironmentVariableMap, String> {
    if files.is_empty() {
        return Err("No map files specified".to_string());
    }

    let mut map = EnvironmentVariableMap::new();
    for file in files {
        map.layer_file(file)
            .map_err(|e| format!("Failed to load {}: {}", file.display(), e))?;
    }

    Ok(map)
}

fn render_resolved(resolved: &BTreeMap<String, String>, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(resolved)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::to_string(resolved).map_err(|e| e.to_string()),
        "text" => Ok(resolved
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()),
        other => Err(format!(
            "Unsupported format: {}. Use text, json, or yaml.",
            other
        )),
    }
}

fn render_value(value: String, format: &str) -> Result<String, String> {
    match format {
        "json" => Ok(serde_json::Value::String(value).to_string()),
        "text" => Ok(value),
        other => Err(format!("Unsupported format: {}. Use text or json.", other)),
    }
}

fn print_value(value: String, format: &str) -> ExitCode {
    match render_value(value, format) {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.red());
            ExitCode::from(1)
        }
    }
}

fn cmd_keys(files: &[PathBuf]) -> ExitCode {
    let map = match load_map(files) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    for key in map.keys() {
        println!("{}", key);
    }
    ExitCode::SUCCESS
}

fn cmd_get(
    files: &[PathBuf],
    key: &str,
    raw: bool,
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let mut map = match load_map(files) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    if !map.contains_key(key) {
        return match default {
            Some(default_val) => print_value(default_val, format),
            None => {
                eprintln!("{}: Variable '{}' is not defined", "Error".red(), key);
                ExitCode::from(1)
            }
        };
    }

    let result = if raw {
        Ok(map.get_raw(key).unwrap_or_default().to_string())
    } else {
        map.resolve(key)
    };

    match result {
        Ok(value) => print_value(value, format),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), envmap_core::Error::from(e));
            ExitCode::from(1)
        }
    }
}

fn cmd_resolve(files: &[PathBuf], format: &str, output: Option<PathBuf>) -> ExitCode {
    let mut map = match load_map(files) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let resolved = match map.resolved_environment_variables() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), envmap_core::Error::from(e));
            return ExitCode::from(1);
        }
    };

    let content = match render_resolved(&resolved, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn cmd_set(file: PathBuf, key: String, value: String) -> ExitCode {
    match set_in_file(&file, &key, value) {
        Ok(count) => {
            log::info!("Saved {} variable(s) to {}", count, file.display());
            eprintln!("{} Set {} in {}", "✓".green(), key, file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.red());
            ExitCode::from(2)
        }
    }
}

/// Overwrite one raw value in `file`, creating the file if needed
fn set_in_file(file: &Path, key: &str, value: String) -> Result<usize, String> {
    let mut map = if file.exists() {
        load_map(&[file.to_path_buf()])?
    } else {
        EnvironmentVariableMap::new()
    };

    map.set_value(key, value);
    map.save(file)
        .map_err(|e| format!("Error writing {}: {}", file.display(), e))?;
    Ok(map.len())
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match check_file(&file) {
            Ok(count) => {
                println!(
                    "{} {}: {} variable(s) resolve",
                    "✓".green(),
                    file.display(),
                    count
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Load `file` and resolve every variable, returning how many there are
fn check_file(file: &Path) -> Result<usize, String> {
    let mut map = EnvironmentVariableMap::load(file).map_err(|e| e.to_string())?;
    let values = map
        .resolved_values()
        .map_err(|e| envmap_core::Error::from(e).to_string())?;
    Ok(values.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("envmap_cli_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_get_command() {
        let cli =
            Cli::try_parse_from(["envmap", "-vv", "get", "env.json", "HOME", "--raw"]).unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Get {
                files, key, raw, ..
            } => {
                assert_eq!(files, vec![PathBuf::from("env.json")]);
                assert_eq!(key, "HOME");
                assert!(raw);
            }
            other => panic!("Expected Get, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_resolve_requires_file() {
        assert!(Cli::try_parse_from(["envmap", "resolve"]).is_err());
    }

    #[test]
    fn test_render_text() {
        let resolved: BTreeMap<String, String> = [("A", "1"), ("B", "two words")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert_eq!(
            render_resolved(&resolved, "text").unwrap(),
            "A=1\nB=two words\n"
        );
    }

    #[test]
    fn test_render_json() {
        let resolved: BTreeMap<String, String> =
            [("A".to_string(), "x".to_string())].into_iter().collect();
        let json = render_resolved(&resolved, "json").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, serde_json::json!({"A": "x"}));
    }

    #[test]
    fn test_render_unknown_format() {
        let err = render_resolved(&BTreeMap::new(), "toml").unwrap_err();
        assert!(err.contains("Unsupported format"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value("a b".to_string(), "text").unwrap(), "a b");
        assert_eq!(
            render_value(r#"say "hi""#.to_string(), "json").unwrap(),
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn test_render_value_unknown_format() {
        let err = render_value("x".to_string(), "yaml").unwrap_err();
        assert!(err.contains("Unsupported format: yaml"));
    }

    #[test]
    fn test_get_rejects_unknown_format() {
        let file = temp_file("get_format.json", r#"{"A": "1"}"#);
        let mut map = load_map(&[file]).unwrap();
        let value = map.resolve("A").unwrap();

        assert_eq!(render_value(value.clone(), "json").unwrap(), r#""1""#);
        assert!(render_value(value, "xml")
            .unwrap_err()
            .contains("Unsupported format"));
    }

    #[test]
    fn test_load_map_layers_files() {
        let base = temp_file("base.json", r#"{"A": "base", "B": "${env:A}-b"}"#);
        let local = temp_file("local.yaml", "A: local\n");

        let mut map = load_map(&[base, local]).unwrap();
        assert_eq!(map.resolve("B").unwrap(), "local-b");
    }

    #[test]
    fn test_load_map_reports_file() {
        let err = load_map(&[PathBuf::from("/nonexistent/envmap.json")]).unwrap_err();
        assert!(err.contains("/nonexistent/envmap.json"));
        assert!(load_map(&[]).is_err());
    }

    #[test]
    fn test_check_detects_cycle() {
        let ok = temp_file("ok.json", r#"{"A": "${env:B}", "B": "b"}"#);
        let cyclic = temp_file("cyclic.json", r#"{"A": "${env:B}", "B": "${env:A}"}"#);

        assert_eq!(check_file(&ok).unwrap(), 2);
        let err = check_file(&cyclic).unwrap_err();
        assert!(err.contains("Circular reference detected"));
        assert!(err.contains("A → B → A"));
    }

    #[test]
    fn test_check_reports_load_failure() {
        let bad = temp_file("bad.json", "{");
        assert!(check_file(&bad).unwrap_err().contains("Parse error"));
    }

    #[test]
    fn test_set_creates_and_updates_file() {
        let dir = std::env::temp_dir().join("envmap_cli_set");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("env.json");
        std::fs::remove_file(&path).ok();

        assert_eq!(set_in_file(&path, "A", "${env:B}".into()).unwrap(), 1);
        assert_eq!(set_in_file(&path, "B", "b".into()).unwrap(), 2);

        let mut map = EnvironmentVariableMap::load(&path).unwrap();
        assert_eq!(map.get_raw("A"), Some("${env:B}"));
        assert_eq!(map.resolve("A").unwrap(), "b");

        std::fs::remove_dir_all(&dir).ok();
    }
}

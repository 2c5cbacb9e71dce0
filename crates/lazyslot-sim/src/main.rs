use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lazyslot_gate::GateConfig;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod scenario;
mod simulator;

use scenario::{run_scenario, Scenario};
use simulator::{run_simulator, SimulatorConfig};

fn cli() -> Command {
    Command::new("lazyslot-sim")
        .version(lazyslot_core::VERSION)
        .about("lazyslot registry simulator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run randomized register/unregister sequences and check invariants")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("keys")
                        .long("keys")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Number of distinct slot keys"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("fail-rate")
                        .long("fail-rate")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Probability that an initializer or teardown fails"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("scenario")
                .about("Replay a scripted visibility scenario")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .help("Path to scenario TOML file"),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("report")
                .about("Print default gate configuration")
                .arg(json_flag()),
        )
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Keep injected teardown panics out of the output; anything else is a crash
fn install_simulation_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = info.to_string();
        if simulator::is_simulated_panic(&message) {
            tracing::debug!(panic = %message, "panic contained");
        } else {
            tracing::error!(panic = %message, "unexpected panic");
            default_hook(info);
        }
    }));
}

fn simulate(args: &ArgMatches) -> Result<bool> {
    let fail_rate: f64 = arg(args, "fail-rate")?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&fail_rate),
        "--fail-rate must be within 0.0..=1.0, got {fail_rate}"
    );

    let config = SimulatorConfig {
        seed: arg(args, "seed")?,
        total_operations: arg(args, "operations")?,
        keys: arg(args, "keys")?,
        fail_rate,
        stop_on_first_violation: args.get_flag("stop-on-violation"),
    };
    tracing::info!(seed = config.seed, ops = config.total_operations, "running simulator");
    install_simulation_panic_hook();

    let report = run_simulator(config);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(report.passed())
}

fn scenario(args: &ArgMatches) -> Result<bool> {
    let path: String = arg(args, "file")?;
    let scenario = Scenario::load(&path)?;
    tracing::info!(%path, sections = scenario.sections.len(), "running scenario");

    let report = run_scenario(&scenario);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }
    Ok(true)
}

fn report(args: &ArgMatches) -> Result<bool> {
    let config = GateConfig::default();
    if args.get_flag("json") {
        let out = serde_json::json!({
            "version": lazyslot_core::VERSION,
            "gate": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("lazyslot {}", lazyslot_core::VERSION);
        println!();
        println!("[gate]");
        print!("{}", toml::to_string(&config)?);
    }
    Ok(true)
}

fn main() -> ExitCode {
    init_tracing();

    let matches = cli().get_matches();
    let outcome = match matches.subcommand() {
        Some(("simulate", args)) => simulate(args),
        Some(("scenario", args)) => scenario(args),
        Some(("report", args)) => report(args),
        _ => Ok(true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn simulate_args_parse() {
        let matches = cli()
            .try_get_matches_from(["lazyslot-sim", "simulate", "--ops", "100", "--seed", "9"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "simulate");
        assert_eq!(arg::<u64>(args, "operations").unwrap(), 100);
        assert_eq!(arg::<u64>(args, "seed").unwrap(), 9);
        assert_eq!(arg::<usize>(args, "keys").unwrap(), 4);
        assert!(!args.get_flag("json"));
    }

    #[test]
    fn scenario_requires_file() {
        assert!(cli().try_get_matches_from(["lazyslot-sim", "scenario"]).is_err());
    }
}

//! `osa` - operator CLI for the strategy recommendation pipeline

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use osa_types::{MaturityPhase, Scenario};
use std::path::PathBuf;

fn settings_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("Settings TOML file (defaults apply when omitted)")
}

fn org_arg(required: bool) -> Arg {
    Arg::new("org")
        .long("org")
        .required(required)
        .value_parser(value_parser!(PathBuf))
        .help("Organization metadata JSON file")
}

fn context_arg() -> Arg {
    Arg::new("context")
        .long("context")
        .value_parser(value_parser!(PathBuf))
        .help("Context JSON file keyed by bucket (content, analytics, experience, strategy)")
}

fn cli() -> Command {
    Command::new("osa")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Strategy recommendation orchestrator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("run")
                .about("Generate a recommendation document")
                .arg(settings_arg())
                .arg(org_arg(true))
                .arg(context_arg())
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .value_parser(["speed", "quality", "comprehensive"])
                        .help("Scenario preset (the configured one when omitted)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full run result as JSON"),
                ),
        )
        .subcommand(
            Command::new("assign")
                .about("Show the rollout assignment for a subject")
                .arg(settings_arg())
                .arg(Arg::new("subject").long("subject").required(true).help("Subject id"))
                .arg(Arg::new("group").long("group").help("Subject group"))
                .arg(
                    Arg::new("phase")
                        .long("phase")
                        .value_parser(["seed", "growth", "scale", "advanced"])
                        .help("Subject maturity phase"),
                )
                .arg(Arg::new("industry").long("industry").help("Subject industry")),
        )
        .subcommand(
            Command::new("route")
                .about("Assign a subject and run the assigned arm")
                .arg(settings_arg())
                .arg(org_arg(true))
                .arg(context_arg())
                .arg(Arg::new("subject").long("subject").required(true).help("Subject id"))
                .arg(Arg::new("group").long("group").help("Subject group")),
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate a settings file and print the effective values")
                .arg(settings_arg()),
        )
}

fn path(args: &ArgMatches, id: &str) -> Option<PathBuf> {
    args.get_one::<PathBuf>(id).cloned()
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("run", args)) => {
            let settings = commands::load_settings(path(args, "config").as_deref())?;
            let org_path = path(args, "org").context("--org is required")?;
            let org = commands::load_org(&org_path)?;
            let registry = commands::load_registry(path(args, "context").as_deref())?;
            let scenario = args
                .get_one::<String>("scenario")
                .map(|s| s.parse::<Scenario>())
                .transpose()?;

            let success =
                commands::run(&settings, &org, registry, scenario, args.get_flag("json")).await?;
            std::process::exit(if success { 0 } else { 1 });
        }
        Some(("assign", args)) => {
            let settings = commands::load_settings(path(args, "config").as_deref())?;
            let subject = args.get_one::<String>("subject").context("--subject is required")?;
            let phase = args
                .get_one::<String>("phase")
                .map(|p| p.parse::<MaturityPhase>())
                .transpose()?;
            commands::assign(
                &settings,
                subject,
                args.get_one::<String>("group").map(String::as_str),
                phase,
                args.get_one::<String>("industry").map(String::as_str),
            )
            .await
        }
        Some(("route", args)) => {
            let settings = commands::load_settings(path(args, "config").as_deref())?;
            let org_path = path(args, "org").context("--org is required")?;
            let org = commands::load_org(&org_path)?;
            let registry = commands::load_registry(path(args, "context").as_deref())?;
            let subject = args.get_one::<String>("subject").context("--subject is required")?;
            commands::route(
                &settings,
                org,
                registry,
                subject,
                args.get_one::<String>("group").map(String::as_str),
            )
            .await
        }
        Some(("check-config", args)) => {
            let settings = commands::load_settings(path(args, "config").as_deref())?;
            print!("{}", commands::check_config(&settings)?);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_requires_org() {
        assert!(cli().try_get_matches_from(["osa", "run"]).is_err());
        let m = cli()
            .try_get_matches_from(["osa", "run", "--org", "org.json", "--scenario", "speed"])
            .unwrap();
        let (_, args) = m.subcommand().unwrap();
        assert_eq!(args.get_one::<String>("scenario").map(String::as_str), Some("speed"));
    }

    #[test]
    fn unknown_scenario_rejected() {
        assert!(cli()
            .try_get_matches_from(["osa", "run", "--org", "o.json", "--scenario", "fast"])
            .is_err());
    }
}

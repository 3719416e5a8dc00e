//! flowcat command-line client
//!
//! Runs a catalog in-process over a filesystem store, performs one operation
//! and prints the result as JSON.

mod commands;

use clap::{value_parser, Arg, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn flow_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("group").required(true).help("Flow group"))
        .arg(Arg::new("name").required(true).help("Flow name"))
}

fn spec_file_arg() -> Arg {
    Arg::new("file")
        .long("file")
        .short('f')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Flow spec JSON file, '-' for stdin")
}

fn build_cli() -> Command {
    Command::new("flowcat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manage flow specs in a flowcat catalog")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Catalog configuration file (TOML)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Filesystem store root, overriding the configuration"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .global(true)
                .help("Principal to act as (defaults to $USER)"),
        )
        .subcommand(
            Command::new("create")
                .about("Register a new flow")
                .arg(spec_file_arg()),
        )
        .subcommand(flow_args(Command::new("get").about("Show one flow")))
        .subcommand(
            Command::new("update")
                .about("Replace an existing flow")
                .arg(spec_file_arg()),
        )
        .subcommand(
            flow_args(Command::new("patch").about("Apply a JSON patch document to a flow")).arg(
                Arg::new("patch")
                    .required(true)
                    .help("Patch document, e.g. '{\"properties\":{\"$delete\":[\"k\"]}}'"),
            ),
        )
        .subcommand(flow_args(Command::new("delete").about("Remove a flow")))
        .subcommand(flow_args(Command::new("run").about("Trigger a run of a flow now")))
        .subcommand(Command::new("list").about("List every flow"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();

    match commands::run(&matches).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

//! dstore command-line front end
//!
//! Drives a list record kept in a directory of JSON documents:
//!
//! ```text
//! dstore --root ./data list
//! dstore --root ./data add "buy milk"
//! dstore --root ./data remove 0
//! dstore --root ./data --namespace chores --key weekly show
//! ```
//!
//! Logging goes to stderr and is filtered with `RUST_LOG`.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{Action, Options};

fn cli() -> Command {
    Command::new("dstore")
        .version(dstore_core::VERSION)
        .about("Inspect and edit list records in a dstore directory")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with cache and write-policy settings"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value("data")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the record documents"),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .global(true)
                .default_value("maintenance")
                .help("Namespace of the record"),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .global(true)
                .default_value("todos")
                .help("Key of the record"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("list").about("Print the items of the list"))
        .subcommand(
            Command::new("add").about("Append an item").arg(
                Arg::new("value")
                    .required(true)
                    .help("Item to append; an empty string is ignored"),
            ),
        )
        .subcommand(
            Command::new("remove").about("Remove the item at an index").arg(
                Arg::new("index")
                    .required(true)
                    .value_parser(value_parser!(usize))
                    .help("Zero-based position of the item"),
            ),
        )
        .subcommand(Command::new("show").about("Print the whole record as JSON"))
}

fn parse(matches: &ArgMatches) -> anyhow::Result<(Options, Action)> {
    let options = Options {
        config: matches.get_one::<PathBuf>("config").cloned(),
        root: matches
            .get_one::<PathBuf>("root")
            .cloned()
            .context("missing --root")?,
        namespace: matches
            .get_one::<String>("namespace")
            .cloned()
            .context("missing --namespace")?,
        key: matches
            .get_one::<String>("key")
            .cloned()
            .context("missing --key")?,
    };

    let action = match matches.subcommand() {
        Some(("list", _)) => Action::List,
        Some(("show", _)) => Action::Show,
        Some(("add", args)) => Action::Add(
            args.get_one::<String>("value")
                .cloned()
                .context("missing value")?,
        ),
        Some(("remove", args)) => Action::Remove(
            *args
                .get_one::<usize>("index")
                .context("missing index")?,
        ),
        Some((other, _)) => anyhow::bail!("unknown command `{other}`"),
        None => anyhow::bail!("no command given"),
    };

    Ok((options, action))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let outcome = match parse(&matches) {
        Ok((options, action)) => commands::execute(&options, action).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

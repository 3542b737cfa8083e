//! `countersctl` -- command-line harness for the fact/index/counter
//! ingestion engine. Entry point: parses CLI arguments with clap,
//! resolves the runtime context, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    if ctx.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("countersctl=debug,counters_engine=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::ExampleMessage(args)) => commands::example_message::run(&ctx, &args),
        Some(Commands::Ingest(args)) => commands::ingest::run(&ctx, &args),
        Some(Commands::ShowFact(args)) => commands::show_fact::run(&ctx, &args),
        Some(Commands::Stats) => commands::stats::run(&ctx),
        Some(Commands::Completion(args)) => commands::completion::run(&args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if ctx.json {
            let err_json = serde_json::json!({ "error": format!("{:#}", e) });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{s}");
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

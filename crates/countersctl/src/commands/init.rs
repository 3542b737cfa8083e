//! `countersctl init` -- create the SQLite store and run schema migrations.

use anyhow::{bail, Context, Result};

use crate::cli::InitArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    if !args.force && ctx.db.exists() {
        bail!(
            "store already exists at {}\n\nUse --force to re-run migrations against it anyway, \
             or pass a different --db path.",
            ctx.db.display()
        );
    }

    let store = ctx.open_store().context("initializing store")?;
    drop(store);

    if ctx.json {
        crate::output::print_json(&serde_json::json!({ "db": ctx.db, "status": "initialized" }));
    } else {
        println!("initialized store at {}", ctx.db.display());
    }
    Ok(())
}

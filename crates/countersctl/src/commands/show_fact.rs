//! `countersctl show-fact` -- look up a previously persisted fact by id.

use anyhow::{Context, Result};

use counters_storage::StorageLayer;

use crate::cli::ShowFactArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &ShowFactArgs) -> Result<()> {
    let storage = ctx.open_store()?;
    let fact = storage.get_fact(&args.id).context("looking up fact")?;
    crate::output::print_json(&fact);
    Ok(())
}

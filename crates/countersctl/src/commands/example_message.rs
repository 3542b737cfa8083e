//! `countersctl example-message` -- generate a synthetic sample message.
//!
//! Stands in for a diagnostics endpoint that would otherwise live behind
//! the HTTP boundary (`GET /api/v1/message/{t}/json`): fills every field
//! configured for the given message type with a schema-appropriate
//! placeholder.

use anyhow::{Context, Result};

use counters_config::MessageConfig;
use counters_engine::generate_example_message;

use crate::cli::ExampleMessageArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &ExampleMessageArgs) -> Result<()> {
    let path = ctx.message_config_path()?;
    let config = MessageConfig::load(path).with_context(|| format!("loading message config from {}", path.display()))?;

    let message = generate_example_message(args.message_type, &config.fields);
    crate::output::print_json(&message);
    Ok(())
}

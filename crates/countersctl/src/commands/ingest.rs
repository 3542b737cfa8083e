//! `countersctl ingest` -- run one message through the full ingestion
//! pipeline and print the resulting `OutboundResponse`.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use counters_aggregate::CounterProducer;
use counters_config::{CounterConfig, IndexConfig, MessageConfig};
use counters_core::indexer::FactIndexer;
use counters_core::message::InboundMessage;
use counters_dispatch::QueryDispatcher;
use counters_engine::{IngestionPipeline, OutboundResponse};

use crate::cli::IngestArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &IngestArgs) -> Result<()> {
    let body = read_input(args)?;
    let message: InboundMessage = serde_json::from_str(&body).context("parsing inbound message JSON")?;

    let message_config = MessageConfig::load(ctx.message_config_path()?).context("loading message config")?;
    let index_config = IndexConfig::load(ctx.index_config_path()?).context("loading index config")?;
    let counter_config = CounterConfig::load(ctx.counter_config_path()?).context("loading counter config")?;

    let mapper = message_config.build_mapper().context("building fact mapper")?;
    let index_field_configs = index_config.to_core_configs().context("resolving index configs")?;
    let indexer = FactIndexer::new(index_field_configs.clone(), index_config.include_fact_data_to_index)
        .context("building fact indexer")?;
    let producer: CounterProducer = counter_config
        .build_producer(&index_field_configs)
        .context("building counter producer")?;

    let storage = ctx.open_store()?;

    let mut pipeline = IngestionPipeline::new(mapper, indexer, storage, producer, 100, None);

    if args.dispatch_workers > 0 {
        let dispatcher = Arc::new(
            QueryDispatcher::new(&ctx.db, args.dispatch_workers).context("starting query dispatcher")?,
        );
        pipeline = pipeline.with_dispatcher(dispatcher, Default::default());
    }

    let result = pipeline.ingest(&message, Utc::now()).context("ingesting message")?;
    let response = OutboundResponse::from(&result);

    crate::output::print_json(&response);
    Ok(())
}

fn read_input(args: &IngestArgs) -> Result<String> {
    match &args.file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading message JSON from stdin")?;
            Ok(buf)
        }
    }
}

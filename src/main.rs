use anyhow::{bail, Context};
use clap::Parser;
use kafka_bindings::consumer::DefaultCommitStrategyFactory;
use kafka_bindings::BindingSettings;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kafka-binding")]
#[command(about = "Resolve Kafka binding settings and run a logging consumer", long_about = None)]
struct Cli {
    /// Path to the YAML settings file
    #[arg(short, long, env = "KAFKA_BINDING_CONFIG")]
    config: Option<PathBuf>,

    /// Also print the effective producer properties of this output topic
    #[arg(short, long)]
    output: Option<String>,

    /// Consume and log records until Ctrl-C
    #[arg(long)]
    run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    kafka_bindings::init_tracing();

    let mut settings = match &cli.config {
        Some(path) => BindingSettings::from_file(path)?,
        None => BindingSettings::default(),
    };
    settings.apply_env()?;

    let factory = DefaultCommitStrategyFactory::new();
    let strategy = &settings.consumer.commit_strategy;
    if !factory.is_registered(strategy) {
        bail!(
            "Unknown commit strategy: {} (expected one of {:?})",
            strategy,
            factory.names()
        );
    }

    let consumer_options = settings.consumer_options();
    let mut report = serde_json::json!({
        "commit_strategy": strategy.to_lowercase(),
        "consumer": settings
            .consumer
            .client_properties_with(&consumer_options.security_properties())?,
    });

    if let Some(topic) = &cli.output {
        let effective = settings
            .output_options(topic)
            .with_context(|| format!("No output binding for topic {topic}"))?;
        report["producer"] = serde_json::to_value(effective.producer_properties())?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if cli.run {
        return run(&settings, &factory).await;
    }

    info!("Settings resolved");
    Ok(())
}

#[cfg(feature = "kafka")]
async fn run(
    settings: &BindingSettings,
    factory: &DefaultCommitStrategyFactory,
) -> anyhow::Result<()> {
    use async_trait::async_trait;
    use kafka_bindings::consumer::{EventHandler, KafkaConsumerHandle, RawEventRecord, TopicBinding};
    use std::sync::Arc;
    use tokio::sync::watch;

    struct LoggingHandler;

    #[async_trait]
    impl EventHandler<RawEventRecord> for LoggingHandler {
        type Error = std::convert::Infallible;

        async fn handle(&self, record: &RawEventRecord) -> Result<(), Self::Error> {
            info!(
                topic = %record.topic(),
                partition = record.partition(),
                offset = record.offset(),
                bytes = record.value().as_ref().map_or(0, Vec::len),
                headers = record.headers().len(),
                "Received record"
            );
            Ok(())
        }
    }

    let config = settings.consumer_config()?;
    let handle = Arc::new(KafkaConsumerHandle::new(config, &settings.consumer_options())?);
    let span = tracing::info_span!("binding", group_id = %config.group_id);
    let binding = TopicBinding::from_config(handle, config, factory, span)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown_tx.send(true).ok();
        }
    });

    binding.run(&LoggingHandler, config, shutdown_rx).await?;
    Ok(())
}

#[cfg(not(feature = "kafka"))]
async fn run(
    _settings: &BindingSettings,
    _factory: &DefaultCommitStrategyFactory,
) -> anyhow::Result<()> {
    bail!("--run requires the `kafka` feature")
}

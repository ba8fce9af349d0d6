use kafka_bindings::consumer::{
    CommitMode, CommitReportSink, DefaultCommitStrategyFactory, TopicBinding, TopicPartition,
};
use kafka_bindings::event::RawRecord;
use kafka_bindings::options::{BrokerAuthenticationMode, BrokerProtocol, MessageCompressionType};
use kafka_bindings::{
    BindingSettings, BrokerError, ConfigError, ConsumerHandle, TopicPartitionOffset,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const SETTINGS: &str = "\
consumer:
  brokers: broker-1:9092,broker-2:9092
  group_id: orders-consumer
  topics: [orders, refunds]
  commit_strategy: SYNC
  max_batch_size: 25
producer:
  protocol: sasl_ssl
  authentication_mode: scram_sha512
  username: svc-orders
  batch_size: 500
outputs:
  - broker_list: broker-1:9092
    topic: orders-enriched
    compression_type: zstd
    batch_size: 50
";

fn settings_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_consumer_and_option_layers_from_file() {
    let file = settings_file(SETTINGS);
    let settings = BindingSettings::from_file(file.path()).unwrap();

    let consumer = settings.consumer_config().unwrap();
    assert_eq!(consumer.group_id, "orders-consumer");
    assert_eq!(consumer.topics, vec!["orders", "refunds"]);
    assert_eq!(consumer.max_batch_size, 25);
    assert_eq!(consumer.session_timeout_ms, 30000);

    assert_eq!(settings.producer.protocol, Some(BrokerProtocol::SaslSsl));
    assert_eq!(
        settings.producer.authentication_mode,
        Some(BrokerAuthenticationMode::ScramSha512)
    );
    assert_eq!(settings.outputs[0].options.compression_type, Some(MessageCompressionType::Zstd));
}

#[test]
fn output_options_layer_over_host_options() {
    let settings = BindingSettings::from_yaml_str(SETTINGS).unwrap();

    let output = settings.output_options("orders-enriched").unwrap();
    assert_eq!(output.batch_size, 50);
    assert_eq!(output.protocol, Some(BrokerProtocol::SaslSsl));
    assert_eq!(output.username.as_deref(), Some("svc-orders"));
    assert_eq!(output.compression_type, Some(MessageCompressionType::Zstd));

    let consumer = settings.consumer_options();
    assert_eq!(consumer.batch_size, 500);
    assert_eq!(consumer.compression_type, None);

    assert!(settings.output_options("unknown").is_none());
}

#[test]
fn consumer_properties_include_security_settings() {
    let settings = BindingSettings::from_yaml_str(SETTINGS).unwrap();
    let security = settings.consumer_options().security_properties();

    let props = settings.consumer.client_properties_with(&security).unwrap();

    assert_eq!(props["bootstrap.servers"], "broker-1:9092,broker-2:9092");
    assert_eq!(props["security.protocol"], "sasl_ssl");
    assert_eq!(props["sasl.mechanism"], "SCRAM-SHA-512");
    assert_eq!(props["sasl.username"], "svc-orders");
    assert_eq!(props["enable.auto.commit"], "false");
}

#[test]
fn configured_strategy_name_is_case_insensitive() {
    let settings = BindingSettings::from_yaml_str(SETTINGS).unwrap();
    assert!(DefaultCommitStrategyFactory::new().is_registered(&settings.consumer.commit_strategy));
}

#[test]
fn unknown_enum_value_in_file_fails_to_load() {
    let yaml = "producer:\n  protocol: carrier_pigeon\n";
    let err = BindingSettings::from_yaml_str(yaml).unwrap_err();
    match err {
        ConfigError::Load(message) => assert!(message.contains("carrier_pigeon")),
        other => panic!("expected load error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BindingSettings::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn unknown_strategy_in_settings_fails_binding_setup() {
    struct Idle;

    impl ConsumerHandle for Idle {
        fn commit(
            &self,
            _offsets: &[TopicPartitionOffset],
            _mode: CommitMode,
        ) -> Result<(), BrokerError> {
            Ok(())
        }

        fn assignment(&self) -> Result<Vec<TopicPartition>, BrokerError> {
            Ok(Vec::new())
        }

        fn add_commit_report_sink(&self, _sink: &Arc<dyn CommitReportSink>) {}

        fn poll(&self, _timeout: Duration) -> Result<Option<RawRecord>, BrokerError> {
            Ok(None)
        }
    }

    let yaml = SETTINGS.replace("SYNC", "exactly-once");
    let settings = BindingSettings::from_yaml_str(&yaml).unwrap();
    let result = TopicBinding::from_config(
        Arc::new(Idle),
        settings.consumer_config().unwrap(),
        &DefaultCommitStrategyFactory::new(),
        tracing::Span::none(),
    );

    match result {
        Err(ConfigError::OutOfRange { value, .. }) => assert_eq!(value, "exactly-once"),
        Err(other) => panic!("expected OutOfRange, got {other:?}"),
        Ok(_) => panic!("binding started with an unknown strategy"),
    }
}

#[test]
#[serial]
fn process_environment_overrides_file_values() {
    std::env::set_var("KAFKA_GROUP_ID", "env-group");
    std::env::set_var("KAFKA_COMMIT_STRATEGY", "async");
    std::env::set_var("KAFKA_PASSWORD", "from-env");

    let mut settings = BindingSettings::from_yaml_str(SETTINGS).unwrap();
    let applied = settings.apply_env();

    std::env::remove_var("KAFKA_GROUP_ID");
    std::env::remove_var("KAFKA_COMMIT_STRATEGY");
    std::env::remove_var("KAFKA_PASSWORD");

    applied.unwrap();
    assert_eq!(settings.consumer.group_id, "env-group");
    assert_eq!(settings.consumer.commit_strategy, "async");
    assert_eq!(settings.producer.password.as_deref(), Some("from-env"));
    assert_eq!(settings.producer.username.as_deref(), Some("svc-orders"));
}

#[test]
#[serial]
fn invalid_environment_enum_is_rejected() {
    std::env::set_var("KAFKA_AUTHENTICATION_MODE", "kerberos-ish");

    let mut settings = BindingSettings::default();
    let applied = settings.apply_env();

    std::env::remove_var("KAFKA_AUTHENTICATION_MODE");

    assert!(matches!(
        applied,
        Err(ConfigError::OutOfRange { name: "authentication_mode", .. })
    ));
}

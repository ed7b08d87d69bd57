//! 具体数据源与加载器组合后的端到端行为。

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use spark_config::{
    ConfigError, ConfigLoader, LoaderOptions, PropertyMap, PropertySource, PropertyValue,
    RetryPolicy, SourceError,
};
use spark_config_sources::{
    BytesProvider, EnvProvider, FileProvider, JsonParser, YamlParser, YamlSourceParams,
    yaml_property_source,
};
use tracing_test::traced_test;

const APPLICATION_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata/application.yaml");
const TEST_JSON: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata/test.json");

fn loader() -> ConfigLoader {
    ConfigLoader::new(LoaderOptions::new().with_retry(RetryPolicy::from_millis(1, 0)))
        .expect("loader")
}

fn yaml() -> PropertySource {
    yaml_property_source(YamlSourceParams::with_config_file_path(APPLICATION_YAML))
}

fn env<const N: usize>(vars: [(&str, &str); N]) -> PropertySource {
    PropertySource::from_provider("env", EnvProvider::from_vars(vars))
}

#[test]
fn yaml_fixture_is_flattened_into_the_snapshot() {
    let loader = loader();
    loader.init([yaml()]);

    assert_eq!(loader.get_or_default_string("test.var", "-"), "yaml");
    assert_eq!(
        loader.get("slice.var"),
        Some(PropertyValue::from(vec!["first", "second", "third"]))
    );
    assert_eq!(
        loader.get_or_default("nonexistent.var", vec!["test"]),
        PropertyValue::from(vec!["test"])
    );
    assert_eq!(loader.well_known(spark_config::keys::MICROSERVICE_NAME), "orders");
}

#[test]
fn later_source_decides_between_env_and_yaml() {
    let loader = loader();

    loader.init([env([("TEST_VAR", "env")]), yaml()]);
    assert_eq!(loader.get_or_default_string("test.var", "-"), "yaml");

    loader.init([yaml(), env([("TEST_VAR", "env")])]);
    assert_eq!(loader.get_or_default_string("test.var", "-"), "env");
}

#[test]
fn nested_flat_and_env_keys_share_one_namespace() {
    let loader = loader();
    loader.init([yaml(), env([("UNFLATTEN_ENV", "unflatten_env")])]);

    let snapshot = loader.snapshot().expect("initialized");
    assert_eq!(snapshot.string("unflatten.env").as_deref(), Some("unflatten_env"));
    assert_eq!(snapshot.string("unflatten.yaml").as_deref(), Some("unflatten_yaml"));
    assert_eq!(snapshot.string("flatten.yaml").as_deref(), Some("flatten_yaml"));
    assert_eq!(
        snapshot.string("deep.yaml.level").as_deref(),
        Some("unflatten_yaml_deep_level")
    );
}

#[test]
fn env_keys_do_not_shadow_a_shorter_yaml_key() {
    let loader = loader();
    loader.init([
        yaml(),
        env([("DBAAS_AGENT_PORT", "8080"), ("DBAAS_AGENT_PROTO", "tcp")]),
    ]);

    assert_eq!(
        loader.get_or_default_string("dbaas.agent", "-"),
        "http://dbaas-agent:8080"
    );
    assert_eq!(loader.get_or_default_string("dbaas.agent.port", "-"), "8080");
    assert_eq!(loader.get_or_default_string("dbaas.agent.proto", "-"), "tcp");
}

#[test]
fn bytes_and_json_file_sources_follow_list_order() {
    let bytes = PropertySource::new("bytes", BytesProvider::new(r#"{"key": "bytes"}"#), JsonParser);
    let json = PropertySource::new("json", FileProvider::new(TEST_JSON), JsonParser);
    let loader = loader();

    loader.init([json.clone(), bytes.clone()]);
    assert_eq!(loader.get_or_default_string("key", "-"), "bytes");

    loader.init([bytes, json]);
    assert_eq!(loader.get_or_default_string("key", "-"), "json");
}

#[test]
fn every_source_contributes_its_own_keys() {
    let loader = loader();
    loader.init([
        PropertySource::new("json", FileProvider::new(TEST_JSON), JsonParser),
        yaml(),
        env([("ENV_VARIABLE", "env")]),
    ]);

    assert_eq!(loader.get_or_default_string("key", "-"), "json");
    assert_eq!(loader.get_or_default_string("env.variable", "-"), "env");
    assert_eq!(loader.get_or_default_string("test.var", "-"), "yaml");
}

#[test]
fn refresh_rereads_file_and_drops_removed_keys() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("application.yaml");
    fs::write(&path, "feature:\n  flag: enabled\n  limit: 10\n").expect("write config");

    let loader = loader();
    loader.init([PropertySource::new("file", FileProvider::new(&path), YamlParser)]);
    assert_eq!(loader.get_or_default_string("feature.limit", "-"), "10");

    fs::write(&path, "feature:\n  flag: disabled\n").expect("rewrite config");
    let generation = loader.refresh().expect("refresh");

    assert_eq!(generation, 2);
    assert_eq!(loader.get_or_default_string("feature.flag", "-"), "disabled");
    assert_eq!(loader.get("feature.limit"), None);
}

#[test]
#[traced_test]
fn failed_refresh_keeps_previous_values() {
    let value = Arc::new(Mutex::new(String::from("old-value")));
    let must_fail = Arc::new(Mutex::new(false));
    let interesting = {
        let value = Arc::clone(&value);
        PropertySource::from_fn("interesting", move |_| {
            let mut map = PropertyMap::new();
            map.insert("interesting.property".into(), value.lock().clone().into());
            Ok(map)
        })
    };
    let flaky = {
        let must_fail = Arc::clone(&must_fail);
        PropertySource::from_fn("flaky", move |_| {
            if *must_fail.lock() {
                return Err(SourceError::custom("fail in property provider"));
            }
            Ok(PropertyMap::new())
        })
    };

    let loader = loader();
    loader.init([interesting, flaky]);
    assert_eq!(loader.get_or_default_string("interesting.property", ""), "old-value");

    *value.lock() = "new-value".into();
    *must_fail.lock() = true;
    let error = loader.refresh().expect_err("flaky source fails");

    assert!(matches!(error, ConfigError::Source { ref source_name, .. } if source_name == "flaky"));
    assert_eq!(loader.get_or_default_string("interesting.property", ""), "old-value");
    assert_eq!(loader.generation(), 1);
    assert!(logs_contain("configuration refresh failed"));
}

#[test]
fn missing_file_during_refresh_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("application.yaml");
    fs::write(&path, "name: first\n").expect("write config");

    let loader = loader();
    loader.init([PropertySource::new("file", FileProvider::new(&path), YamlParser)]);
    fs::remove_file(&path).expect("remove config");

    let error = loader.refresh().expect_err("file is gone");

    assert!(matches!(
        error,
        ConfigError::Source {
            source: SourceError::Io { .. },
            ..
        }
    ));
    assert_eq!(loader.get_or_default_string("name", "-"), "first");
}

#[test]
fn missing_file_exhausts_init_budget() {
    let loader = ConfigLoader::new(
        LoaderOptions::new().with_retry(RetryPolicy::new(
            Duration::from_millis(5),
            Duration::from_millis(30),
        )),
    )
    .expect("loader");
    let missing = yaml_property_source(YamlSourceParams::with_config_file_path(
        "/definitely/not/here/application.yaml",
    ));

    let error = loader.try_init([missing]).expect_err("file never appears");

    match error {
        ConfigError::InitExhausted { attempts, source, .. } => {
            assert!(attempts >= 2, "expected retries, got {attempts} attempt(s)");
            assert!(matches!(source, SourceError::Io { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!loader.is_initialized());
}

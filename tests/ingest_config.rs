// tests/ingest_config.rs
//
// Config resolution: explicit file, $PIPELINE_CONFIG_PATH, CWD default, built-ins.
// Tests that touch the env or CWD are serialized.

use std::{env, fs};

use news_sentiment_stream::config::{PipelineConfig, ENV_CONFIG_PATH, MAX_WINDOW, MIN_WINDOW};
use tempfile::tempdir;

#[test]
fn load_from_reads_all_sections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    fs::write(
        &path,
        r#"
feed_path = "in.jsonl"
live_feed_path = "out.jsonl"
replay_delay_ms = 0
queue_capacity = 0

[index]
dir = "idx"
collection = "wire"
top_k = 5

[llm]
enabled = false

[dashboard]
bind = "0.0.0.0:9000"
default_window = 500
"#,
    )
    .unwrap();

    let cfg = PipelineConfig::load_from(&path).unwrap();
    assert_eq!(cfg.feed_path.to_str(), Some("in.jsonl"));
    assert_eq!(cfg.live_feed_path.to_str(), Some("out.jsonl"));
    assert_eq!(cfg.queue_capacity, 1, "zero capacity is bumped to one");
    assert_eq!(cfg.index.collection, "wire");
    assert_eq!(cfg.index.top_k, 5);
    assert_eq!(cfg.dashboard.bind, "0.0.0.0:9000");
    assert_eq!(cfg.dashboard.default_window, MAX_WINDOW);

    let sc = cfg.stream_config();
    assert_eq!(sc.capacity, 1);
    assert!(sc.delay.is_zero());
}

#[test]
fn load_from_reports_bad_toml_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "replay_delay_ms = [not toml").unwrap();
    let err = PipelineConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.toml"));
}

#[test]
#[serial_test::serial]
fn env_path_must_exist() {
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    let res = PipelineConfig::load_default();
    env::remove_var(ENV_CONFIG_PATH);
    assert!(res.is_err());
}

#[test]
#[serial_test::serial]
fn falls_back_to_builtin_defaults_in_empty_cwd() {
    let dir = tempdir().unwrap();
    let old = env::current_dir().unwrap();
    env::remove_var(ENV_CONFIG_PATH);
    env::set_current_dir(dir.path()).unwrap();

    let res = PipelineConfig::load_default();
    env::set_current_dir(old).unwrap();

    let cfg = res.unwrap();
    assert_eq!(cfg.replay_delay_ms, 1000);
    assert_eq!(cfg.queue_capacity, 100);
    assert!((MIN_WINDOW..=MAX_WINDOW).contains(&cfg.dashboard.default_window));
}

#[test]
#[serial_test::serial]
fn picks_up_config_dir_in_cwd() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/pipeline.toml"),
        "replay_delay_ms = 42\n",
    )
    .unwrap();
    let old = env::current_dir().unwrap();
    env::remove_var(ENV_CONFIG_PATH);
    env::set_current_dir(dir.path()).unwrap();

    let res = PipelineConfig::load_default();
    env::set_current_dir(old).unwrap();

    assert_eq!(res.unwrap().replay_delay_ms, 42);
}

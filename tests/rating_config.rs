// tests/rating_config.rs
use advanced_rating::config::{load_config_default, load_config_from, RatingScale, ENV_CONFIG_PATH};
use advanced_rating::store::MemoryStore;
use advanced_rating::{process_one, Record, RecordOutcome, TaxonomyManager};
use std::{env, fs};

#[test]
fn parse_toml_and_json_files() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("advanced_rating.toml");
    fs::write(
        &p_toml,
        r#"
categories = "Acting, camera , story,acting"
minimum_required_tags = 2
rating_scale = 1
"#,
    )
    .unwrap();
    let c = load_config_from(&p_toml).unwrap();
    assert_eq!(c.categories, vec!["acting", "camera", "story"]);
    assert_eq!(c.minimum_required_tags, 2);
    assert_eq!(c.rating_scale, RatingScale::Five);
    assert!(!c.allow_destructive_actions);

    let p_json = dir.path().join("advanced_rating.json");
    fs::write(
        &p_json,
        r#"{"categories":["story","camera"],"allow_destructive_actions":"true","levels_per_category":3}"#,
    )
    .unwrap();
    let cj = load_config_from(&p_json).unwrap();
    assert_eq!(cj.categories, vec!["story", "camera"]);
    assert!(cj.allow_destructive_actions);
    assert_eq!(cj.levels_per_category, 3);
    assert_eq!(cj.minimum_required_tags, 5);
}

#[tokio::test]
async fn oversized_level_count_falls_back_to_five() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("advanced_rating.json");
    fs::write(
        &p,
        r#"{"categories":"acting,story","minimum_required_tags":2,"levels_per_category":9}"#,
    )
    .unwrap();
    let cfg = load_config_from(&p).unwrap();
    assert_eq!(cfg.levels_per_category, 5);

    let store = MemoryStore::new();
    TaxonomyManager::new(&store)
        .ensure(&cfg.categories, cfg.levels_per_category)
        .await
        .unwrap();
    assert!(store.label("acting_5").is_some());
    assert!(store.label("acting_6").is_none());
    assert!(store.label("acting_9").is_none());

    let four = Record {
        id: "1".into(),
        labels: vec!["acting_4".into(), "story_4".into()],
        ..Default::default()
    };
    let store = MemoryStore::with_records(vec![four.clone()]);
    assert_eq!(
        process_one(&store, &four, &cfg).await,
        RecordOutcome::Updated { from: None, to: 80 }
    );
}

#[test]
fn garbage_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("advanced_rating.toml");
    fs::write(&p, "this is = = not a config").unwrap();
    assert!(load_config_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Run in a scratch CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);

    // 1) Nothing on disk -> defaults
    let c = load_config_default().unwrap();
    assert_eq!(c.categories.len(), 6);

    // 2) config/advanced_rating.toml fallback
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("advanced_rating.toml"),
        r#"categories = "acting,story""#,
    )
    .unwrap();
    let ct = load_config_default().unwrap();
    assert_eq!(ct.categories, vec!["acting", "story"]);

    // 3) env var wins
    let p_env = tmp.path().join("override.json");
    fs::write(&p_env, r#"{"categories":"camera"}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let ce = load_config_default().unwrap();
    assert_eq!(ce.categories, vec!["camera"]);

    // 4) env var pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_config_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

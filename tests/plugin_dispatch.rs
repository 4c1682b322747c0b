// tests/plugin_dispatch.rs
//
// Drives whole plugin requests through `dispatch` against the in-memory store.

use advanced_rating::plugin::{dispatch, Mode, PluginInput, Request};
use advanced_rating::store::MemoryStore;
use advanced_rating::{RatingConfig, Record};
use serde_json::json;

fn config() -> RatingConfig {
    let mut c = RatingConfig::with_categories(["acting", "camera", "story"]);
    c.minimum_required_tags = 2;
    c
}

fn request(raw: &str) -> Request {
    PluginInput::parse(raw).unwrap().request().unwrap()
}

fn store() -> MemoryStore {
    MemoryStore::with_records(vec![
        Record {
            id: "10".into(),
            title: Some("Rated".into()),
            rating: Some(40),
            labels: vec!["acting_5".into(), "camera_5".into(), "story_5".into()],
        },
        Record {
            id: "11".into(),
            title: None,
            rating: None,
            labels: vec!["acting_4".into(), "camera_2".into(), "story_5".into()],
        },
    ])
}

#[tokio::test]
async fn process_all_task() {
    let s = store();
    let req = request(r#"{"args":{"mode":"process_scenes"}}"#);
    assert_eq!(req, Request::Task(Mode::ProcessAll));

    let out = dispatch(&s, &config(), &req).await.unwrap();
    assert_eq!(out["processed"], 2);
    assert_eq!(out["updated"], 2);
    assert_eq!(s.record("10").unwrap().rating, Some(100));
    assert_eq!(s.record("11").unwrap().rating, Some(80));
}

#[tokio::test]
async fn process_unrated_task() {
    let s = store();
    let req = request(r#"{"args":{"mode":"process_scenes_unrated"}}"#);
    let out = dispatch(&s, &config(), &req).await.unwrap();
    assert_eq!(out["processed"], 1);
    assert_eq!(s.record("10").unwrap().rating, Some(40));
}

#[tokio::test]
async fn create_then_remove_tags() {
    let s = store();
    let mut cfg = config();

    let created = dispatch(&s, &cfg, &request(r#"{"args":{"mode":"create_tags"}}"#))
        .await
        .unwrap();
    assert_eq!(created["created"].as_array().unwrap().len(), 19);

    let declined = dispatch(&s, &cfg, &request(r#"{"args":{"mode":"remove_tags"}}"#))
        .await
        .unwrap();
    assert_eq!(declined["status"], "declined");
    assert_eq!(s.labels().len(), 19);

    cfg.allow_destructive_actions = true;
    let removed = dispatch(&s, &cfg, &request(r#"{"args":{"mode":"remove_tags"}}"#))
        .await
        .unwrap();
    assert_eq!(removed["status"], "removed");
    assert!(s.labels().is_empty());
}

#[tokio::test]
async fn update_hook_rates_one_scene_and_settles() {
    let s = store();
    let req = request(r#"{"args":{"hookContext":{"id":11,"type":"Scene.Update.Post"}}}"#);

    let first = dispatch(&s, &config(), &req).await.unwrap();
    assert_eq!(
        first,
        json!({ "scene": "11", "status": "updated", "from": null, "to": 80 })
    );
    assert_eq!(s.record("10").unwrap().rating, Some(40));

    // our own write fires the hook again; it must not write a second time
    s.reset_calls();
    let second = dispatch(&s, &config(), &req).await.unwrap();
    assert_eq!(second["status"], "unchanged");
    assert_eq!(s.calls().updates, 0);
}

#[tokio::test]
async fn other_hooks_and_missing_scenes() {
    let s = store();
    let other = request(r#"{"args":{"hookContext":{"id":"11","type":"Scene.Create.Post"}}}"#);
    let out = dispatch(&s, &config(), &other).await.unwrap();
    assert_eq!(out["status"], "ignored");

    let missing = request(r#"{"args":{"hookContext":{"id":"99","type":"Scene.Update.Post"}}}"#);
    let out = dispatch(&s, &config(), &missing).await.unwrap();
    assert_eq!(out["status"], "not_found");
    assert_eq!(s.calls().updates, 0);
}

#[tokio::test]
async fn store_outage_surfaces_as_error() {
    let s = store();
    s.set_unavailable(true);
    let req = request(r#"{"args":{"mode":"create_tags"}}"#);
    assert!(dispatch(&s, &config(), &req).await.is_err());
}

// src/store/stash.rs
//! Stash GraphQL client implementing [`RatingStore`].
//!
//! Connection details come from the `server_connection` object that Stash
//! hands every plugin on stdin. Errors are classified into [`StoreError`]
//! so the callers can tell an outage from a refused request.

use super::{Label, NewLabel, RatingStore, Record, RecordFilter};
use crate::error::StoreError;
use anyhow::Context;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

const FIND_SCENES: &str = r#"
query FindScenes($scene_filter: SceneFilterType, $filter: FindFilterType) {
  findScenes(scene_filter: $scene_filter, filter: $filter) {
    count
    scenes { id title rating100 tags { id name } }
  }
}"#;

const FIND_SCENE: &str = r#"
query FindScene($id: ID!) {
  findScene(id: $id) { id title rating100 tags { id name } }
}"#;

const FIND_TAGS: &str = r#"
query FindTags($tag_filter: TagFilterType, $filter: FindFilterType) {
  findTags(tag_filter: $tag_filter, filter: $filter) {
    tags { id name parents { id } }
  }
}"#;

const TAG_CREATE: &str = r#"
mutation TagCreate($input: TagCreateInput!) {
  tagCreate(input: $input) { id name }
}"#;

const TAG_UPDATE: &str = r#"
mutation TagUpdate($input: TagUpdateInput!) {
  tagUpdate(input: $input) { id }
}"#;

const TAG_DESTROY: &str = r#"
mutation TagDestroy($input: TagDestroyInput!) {
  tagDestroy(input: $input)
}"#;

const SCENE_UPDATE: &str = r#"
mutation SceneUpdate($input: SceneUpdateInput!) {
  sceneUpdate(input: $input) { id rating100 }
}"#;

const CONFIGURATION: &str = r#"
query Configuration {
  configuration { plugins }
}"#;

/// Session cookie handed over by Stash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// `server_connection` block of the plugin input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConnection {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub session_cookie: Option<SessionCookie>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_scheme() -> String {
    "http".to_string()
}
fn default_port() -> u16 {
    9999
}

impl ServerConnection {
    /// GraphQL endpoint URL. A wildcard bind address maps to localhost.
    pub fn endpoint(&self) -> String {
        let host = match self.host.as_deref().map(str::trim) {
            None | Some("") | Some("0.0.0.0") => "localhost",
            Some(h) => h,
        };
        format!("{}://{}:{}/graphql", self.scheme, host, self.port)
    }
}

#[derive(Serialize)]
struct GqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct TagRef {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct SceneDto {
    id: String,
    title: Option<String>,
    rating100: Option<i64>,
    #[serde(default)]
    tags: Vec<TagRef>,
}

impl From<SceneDto> for Record {
    fn from(s: SceneDto) -> Self {
        Record {
            id: s.id,
            title: s.title,
            rating: s.rating100,
            labels: s.tags.into_iter().map(|t| t.name).collect(),
        }
    }
}

#[derive(Deserialize)]
struct TagDto {
    id: String,
    name: String,
    #[serde(default)]
    parents: Vec<TagRef>,
}

impl From<TagDto> for Label {
    fn from(t: TagDto) -> Self {
        Label {
            id: t.id,
            name: t.name,
            parent_ids: t.parents.into_iter().map(|p| p.id).collect(),
        }
    }
}

/// Map GraphQL error messages onto a [`StoreError`].
fn classify_errors(errors: &[GqlError]) -> StoreError {
    let joined = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let lower = joined.to_ascii_lowercase();
    if lower.contains("already exists") {
        StoreError::DuplicateName(joined)
    } else if lower.contains("not found") {
        StoreError::NotFound(joined)
    } else {
        StoreError::Rejected(joined)
    }
}

fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let msg = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StoreError::Unavailable(msg)
    } else {
        StoreError::Rejected(msg)
    }
}

#[derive(Clone)]
pub struct StashClient {
    http: Client,
    endpoint: String,
}

impl StashClient {
    pub fn new(conn: &ServerConnection) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(cookie) = &conn.session_cookie {
            let v = header::HeaderValue::from_str(&format!("{}={}", cookie.name, cookie.value))
                .context("session cookie is not a valid header value")?;
            headers.insert(header::COOKIE, v);
        }
        if let Some(key) = conn.api_key.as_deref().filter(|k| !k.is_empty()) {
            let v = header::HeaderValue::from_str(key).context("api key is not a valid header value")?;
            headers.insert("apikey", v);
        }

        let http = Client::builder()
            .user_agent(concat!("advanced-rating/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            endpoint: conn.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, StoreError> {
        let rsp = self
            .http
            .post(&self.endpoint)
            .json(&GqlRequest { query, variables })
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = rsp.status();
        let body = rsp
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: GqlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        if !parsed.errors.is_empty() {
            return Err(classify_errors(&parsed.errors));
        }
        parsed
            .data
            .ok_or_else(|| StoreError::InvalidResponse("response without data".into()))
    }

    /// Settings saved for `plugin_id` in the Stash UI, if any.
    pub async fn plugin_settings(
        &self,
        plugin_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        #[derive(Deserialize)]
        struct Data {
            configuration: Conf,
        }
        #[derive(Deserialize)]
        struct Conf {
            #[serde(default)]
            plugins: Map<String, Value>,
        }

        let data: Data = self.graphql(CONFIGURATION, json!({})).await?;
        Ok(match data.configuration.plugins.get(plugin_id) {
            Some(Value::Object(m)) => Some(m.clone()),
            _ => None,
        })
    }
}

#[async_trait::async_trait]
impl RatingStore for StashClient {
    async fn find_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        if let RecordFilter::ById(id) = filter {
            #[derive(Deserialize)]
            struct SceneData {
                #[serde(rename = "findScene")]
                find_scene: Option<SceneDto>,
            }
            let data: SceneData = self.graphql(FIND_SCENE, json!({ "id": id })).await?;
            return Ok(data.find_scene.map(Record::from).into_iter().collect());
        }

        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "findScenes")]
            find_scenes: Page,
        }
        #[derive(Deserialize)]
        struct Page {
            scenes: Vec<SceneDto>,
        }

        let scene_filter = match filter {
            RecordFilter::Unrated => json!({ "rating100": { "modifier": "IS_NULL", "value": 0 } }),
            _ => json!({}),
        };
        let vars = json!({
            "scene_filter": scene_filter,
            "filter": { "per_page": -1 },
        });
        let data: Data = self.graphql(FIND_SCENES, vars).await?;
        Ok(data
            .find_scenes
            .scenes
            .into_iter()
            .map(Record::from)
            .collect())
    }

    async fn find_label_by_name(&self, name: &str) -> Result<Option<Label>, StoreError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "findTags")]
            find_tags: Page,
        }
        #[derive(Deserialize)]
        struct Page {
            tags: Vec<TagDto>,
        }

        let vars = json!({
            "tag_filter": { "name": { "value": name, "modifier": "EQUALS" } },
            "filter": { "per_page": -1 },
        });
        let data: Data = self.graphql(FIND_TAGS, vars).await?;
        Ok(data
            .find_tags
            .tags
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
            .map(Label::from))
    }

    async fn create_label(&self, label: &NewLabel) -> Result<Label, StoreError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "tagCreate")]
            tag_create: Option<TagDto>,
        }
        let data: Data = self.graphql(TAG_CREATE, json!({ "input": label })).await?;
        data.tag_create.map(Label::from).ok_or_else(|| {
            StoreError::DuplicateName(format!("tagCreate returned nothing for '{}'", label.name))
        })
    }

    async fn set_label_parent(&self, label_id: &str, parent_id: &str) -> Result<(), StoreError> {
        let vars = json!({ "input": { "id": label_id, "parent_ids": [parent_id] } });
        let _: Value = self.graphql(TAG_UPDATE, vars).await?;
        Ok(())
    }

    async fn destroy_label(&self, label_id: &str) -> Result<(), StoreError> {
        let _: Value = self
            .graphql(TAG_DESTROY, json!({ "input": { "id": label_id } }))
            .await?;
        Ok(())
    }

    /// Written as-is to `rating100`; a 0..=5 rating from `RatingScale::Five`
    /// lands at the bottom of Stash's 0..=100 range.
    async fn update_record_rating(&self, record_id: &str, rating: i64) -> Result<(), StoreError> {
        let vars = json!({ "input": { "id": record_id, "rating100": rating } });
        let _: Value = self.graphql(SCENE_UPDATE, vars).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_maps_wildcard_host_to_localhost() {
        let conn: ServerConnection = serde_json::from_str(
            r#"{"Scheme":"http","Host":"0.0.0.0","Port":9999,
                "SessionCookie":{"Name":"session","Value":"abc","Path":"","Domain":""},
                "Dir":"/root/.stash","PluginDir":"/root/.stash/plugins/advanced_rating"}"#,
        )
        .unwrap();
        assert_eq!(conn.endpoint(), "http://localhost:9999/graphql");
        assert_eq!(conn.session_cookie.unwrap().value, "abc");
    }

    #[test]
    fn endpoint_keeps_explicit_host_and_scheme() {
        let conn: ServerConnection =
            serde_json::from_str(r#"{"Scheme":"https","Host":"stash.lan","Port":443}"#).unwrap();
        assert_eq!(conn.endpoint(), "https://stash.lan:443/graphql");
    }

    #[test]
    fn graphql_errors_are_classified() {
        let dup = vec![GqlError {
            message: "tag with name 'acting' already exists".into(),
        }];
        assert!(matches!(classify_errors(&dup), StoreError::DuplicateName(_)));

        let other = vec![GqlError {
            message: "rating100 must be between 0 and 100".into(),
        }];
        assert!(matches!(classify_errors(&other), StoreError::Rejected(_)));
    }

    #[test]
    fn server_errors_count_as_unavailable() {
        assert!(classify_status(StatusCode::BAD_GATEWAY, "").is_unavailable());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "login").is_unavailable());
    }

    #[test]
    fn scene_payload_maps_to_record() {
        let dto: SceneDto = serde_json::from_str(
            r#"{"id":"12","title":"Pilot","rating100":null,
                "tags":[{"id":"3","name":"acting_4"},{"id":"4","name":"story_2"}]}"#,
        )
        .unwrap();
        let rec = Record::from(dto);
        assert_eq!(rec.id, "12");
        assert_eq!(rec.rating, None);
        assert_eq!(rec.current_rating(), 0);
        assert_eq!(rec.labels, vec!["acting_4", "story_2"]);
    }
}

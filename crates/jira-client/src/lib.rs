//! Jira Cloud REST client implementing [`hydro_core::Tracker`].
//!
//! Reads go through API v3. The v2 surface serves as the alternate link read
//! because it tends to include link ids that v3 leaves out.

pub mod wire;

use hydro_core::model::{
    Account, FieldDef, FieldOptions, GroupingField, Issue, Link, LinkId, LinkType, SearchPage,
    Transition,
};
use hydro_core::{HydroError, Tracker, TrackerConfig, TrackerError, TrackerResult};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

const PRIMARY_API: &str = "/rest/api/3";
const ALTERNATE_API: &str = "/rest/api/2";

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl JiraClient {
    /// Build a client from validated tracker settings.
    pub fn new(config: &TrackerConfig) -> hydro_core::Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("hydro/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HydroError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            email: config.email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, api: &str, path: &str) -> String {
        format!("{}{api}{path}", self.base_url)
    }

    fn request(&self, method: Method, api: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(api, path))
            .basic_auth(&self.email, Some(&self.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send `req`, mapping transport failures and non-success statuses.
    /// Returns the body text, empty for 204 responses.
    async fn send(&self, req: RequestBuilder, what: &str) -> TrackerResult<String> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(call = %what, error = %e, "tracker request failed");
            TrackerError::Transport(e.to_string())
        })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        if status.is_success() {
            return Ok(body);
        }
        let message = wire::error_message(&body);
        tracing::debug!(call = %what, status = status.as_u16(), message = %message, "tracker error response");
        if status == StatusCode::NOT_FOUND {
            return Err(TrackerError::NotFound(format!("{what}: {message}")));
        }
        Err(TrackerError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json(&self, req: RequestBuilder, what: &str) -> TrackerResult<Value> {
        let body = self.send(req, what).await?;
        serde_json::from_str(&body).map_err(|e| TrackerError::Decode(format!("{what}: {e}")))
    }
}

fn encode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.trim().bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[async_trait::async_trait]
impl Tracker for JiraClient {
    async fn issue(&self, key: &str, grouping: &GroupingField) -> TrackerResult<Issue> {
        let req = self
            .request(Method::GET, PRIMARY_API, &format!("/issue/{}", encode(key)))
            .query(&[("fields", wire::issue_fields(grouping))]);
        let raw = self.send_json(req, &format!("issue {key}")).await?;
        wire::issue(&raw, grouping)
    }

    async fn issue_links_alternate(&self, key: &str) -> TrackerResult<Vec<Link>> {
        let req = self
            .request(Method::GET, ALTERNATE_API, &format!("/issue/{}", encode(key)))
            .query(&[("fields", "issuelinks")]);
        let raw = self.send_json(req, &format!("links of {key}")).await?;
        let owner = raw.get("key").and_then(Value::as_str).unwrap_or(key);
        Ok(wire::links(owner, raw.get("fields").unwrap_or(&Value::Null)))
    }

    async fn update_fields(&self, key: &str, fields: Value) -> TrackerResult<()> {
        let req = self
            .request(Method::PUT, PRIMARY_API, &format!("/issue/{}", encode(key)))
            .json(&json!({ "fields": fields }));
        self.send(req, &format!("update {key}")).await?;
        Ok(())
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
    ) -> TrackerResult<()> {
        let req = self.request(Method::POST, PRIMARY_API, "/issueLink").json(&json!({
            "type": { "name": link_type },
            "inwardIssue": { "key": inward_key },
            "outwardIssue": { "key": outward_key },
        }));
        self.send(req, "create link").await?;
        tracing::debug!(link_type = %link_type, inward = %inward_key, outward = %outward_key, "link created");
        Ok(())
    }

    async fn delete_link(&self, id: &LinkId) -> TrackerResult<()> {
        let req = self.request(
            Method::DELETE,
            PRIMARY_API,
            &format!("/issueLink/{}", encode(id.as_str())),
        );
        self.send(req, &format!("delete link {id}")).await?;
        Ok(())
    }

    async fn link_types(&self) -> TrackerResult<Vec<LinkType>> {
        let req = self.request(Method::GET, PRIMARY_API, "/issueLinkType");
        let raw = self.send_json(req, "link types").await?;
        Ok(wire::link_types(&raw))
    }

    async fn fields(&self) -> TrackerResult<Vec<FieldDef>> {
        let req = self.request(Method::GET, PRIMARY_API, "/field");
        let raw = self.send_json(req, "fields").await?;
        Ok(wire::fields(&raw))
    }

    async fn search_page(
        &self,
        query: &str,
        grouping: &GroupingField,
        page_size: u32,
        page_token: Option<&str>,
    ) -> TrackerResult<SearchPage> {
        let mut fields = String::from("summary,status,issuetype,updated,parent");
        if let Some(id) = grouping.field_id() {
            fields.push(',');
            fields.push_str(id);
        }
        let mut params = vec![
            ("jql", query.to_string()),
            ("fields", fields),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("nextPageToken", token.to_string()));
        }
        let req = self
            .request(Method::GET, PRIMARY_API, "/search/jql")
            .query(&params);
        let raw = self.send_json(req, "search").await?;
        wire::search_page(&raw, grouping)
    }

    async fn transitions(&self, key: &str) -> TrackerResult<Vec<Transition>> {
        let req = self.request(
            Method::GET,
            PRIMARY_API,
            &format!("/issue/{}/transitions", encode(key)),
        );
        let raw = self.send_json(req, &format!("transitions of {key}")).await?;
        Ok(wire::transitions(&raw))
    }

    async fn transition(&self, key: &str, transition_id: &str) -> TrackerResult<()> {
        let req = self
            .request(
                Method::POST,
                PRIMARY_API,
                &format!("/issue/{}/transitions", encode(key)),
            )
            .json(&json!({ "transition": { "id": transition_id } }));
        self.send(req, &format!("transition {key}")).await?;
        Ok(())
    }

    async fn add_comment(&self, key: &str, text: &str) -> TrackerResult<()> {
        let req = self
            .request(
                Method::POST,
                PRIMARY_API,
                &format!("/issue/{}/comment", encode(key)),
            )
            .json(&wire::comment_body(text));
        self.send(req, &format!("comment on {key}")).await?;
        Ok(())
    }

    async fn field_options(&self, key: &str, field_id: &str) -> TrackerResult<FieldOptions> {
        let req = self.request(
            Method::GET,
            PRIMARY_API,
            &format!("/issue/{}/editmeta", encode(key)),
        );
        let raw = self.send_json(req, &format!("edit metadata of {key}")).await?;
        Ok(wire::field_options(field_id, &raw))
    }

    async fn myself(&self) -> TrackerResult<Account> {
        let req = self.request(Method::GET, PRIMARY_API, "/myself");
        let raw = self.send_json(req, "myself").await?;
        Ok(wire::account(&raw))
    }
}

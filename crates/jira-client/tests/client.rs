use hydro_core::model::{GroupingField, LinkId};
use hydro_core::{Tracker, TrackerConfig, TrackerError};
use jira_client::JiraClient;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

fn client(server: &ServerGuard) -> JiraClient {
    JiraClient::new(&TrackerConfig {
        base_url: format!("{}/", server.url()),
        email: "ops@example.com".into(),
        api_token: "secret".into(),
        ..Default::default()
    })
    .unwrap()
}

fn blocks() -> serde_json::Value {
    json!({"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"})
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn issue_read_normalizes_links() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/api/3/issue/S1")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "key": "S1",
                "fields": {
                    "summary": "Puesto 1",
                    "issuetype": {"name": "Puesto"},
                    "status": {"name": "Verde"},
                    "customfield_10014": "G1",
                    "issuelinks": [
                        {"linkId": 501, "type": blocks(), "inwardIssue": {"key": "P1"}},
                        {"type": blocks(), "outwardIssue": {"key": "P2"}}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let issue = client(&server)
        .issue("S1", &GroupingField::Field("customfield_10014".into()))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(issue.grouping.as_deref(), Some("G1"));
    assert_eq!(issue.links.len(), 2);
    assert_eq!(issue.links[0].id, Some(LinkId::new("501")));
    assert_eq!(issue.links[0].inward_key, "P1");
    assert_eq!(issue.links[0].outward_key, "S1");
    assert_eq!(issue.links[1].id, None);
    assert_eq!(issue.links[1].inward_key, "S1");
    assert_eq!(issue.links[1].outward_key, "P2");
}

#[tokio::test]
async fn alternate_links_come_from_v2() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/api/2/issue/S1")
        .match_query(Matcher::UrlEncoded("fields".into(), "issuelinks".into()))
        .with_status(200)
        .with_body(
            json!({
                "key": "S1",
                "fields": {"issuelinks": [{"id": "777", "type": blocks(), "inwardIssue": {"key": "P1"}}]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let links = client(&server).issue_links_alternate("S1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(links[0].id, Some(LinkId::new("777")));
    assert_eq!(links[0].outward_key, "S1");
}

#[tokio::test]
async fn search_drains_token_pages() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/rest/api/3/search/jql")
        .match_query(Matcher::UrlEncoded("jql".into(), "issuetype = Epic".into()))
        .with_status(200)
        .with_body(
            json!({"issues": [{"key": "G1", "fields": {"summary": "a"}}], "nextPageToken": "t1", "isLast": false})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/rest/api/3/search/jql")
        .match_query(Matcher::UrlEncoded("nextPageToken".into(), "t1".into()))
        .with_status(200)
        .with_body(
            json!({"issues": [{"key": "G2", "fields": {"summary": "b"}}], "nextPageToken": "t2", "isLast": true})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let issues = client(&server)
        .search_all("issuetype = Epic", &GroupingField::Parent, 1)
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    let keys: Vec<_> = issues.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["G1", "G2"]);
}

#[tokio::test]
async fn search_stops_on_empty_page_despite_token() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/rest/api/3/search/jql")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"issues": [], "nextPageToken": "t9", "isLast": false}).to_string())
        .expect(1)
        .create_async()
        .await;

    let issues = client(&server)
        .search_all("issuetype = Epic", &GroupingField::Parent, 100)
        .await
        .unwrap();

    page.assert_async().await;
    assert!(issues.is_empty());
}

#[tokio::test]
async fn field_options_read_editmeta() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/api/3/issue/P1/editmeta")
        .with_status(200)
        .with_body(
            json!({"fields": {"customfield_1": {
                "name": "Tensión",
                "schema": {"type": "option"},
                "allowedValues": [{"id": "1", "value": "220V"}]
            }}})
            .to_string(),
        )
        .create_async()
        .await;

    let opts = client(&server).field_options("P1", "customfield_1").await.unwrap();
    assert_eq!(opts.name.as_deref(), Some("Tensión"));
    assert!(!opts.is_multi);
    assert_eq!(opts.options[0].value, "220V");
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_link_sends_both_sides() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/api/3/issueLink")
        .match_body(Matcher::PartialJson(json!({
            "type": {"name": "Blocks"},
            "inwardIssue": {"key": "P1"},
            "outwardIssue": {"key": "S1"}
        })))
        .with_status(201)
        .create_async()
        .await;

    client(&server).create_link("Blocks", "P1", "S1").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn comment_is_sent_as_document() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/api/3/issue/P1/comment")
        .match_body(Matcher::PartialJson(json!({
            "body": {"type": "doc", "content": [{"type": "paragraph", "content": [{"text": "Rodamiento roto"}]}]}
        })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    client(&server).add_comment("P1", "Rodamiento roto").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_errors_are_classified() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/rest/api/3/issueLink/1")
        .with_status(404)
        .with_body(r#"{"errorMessages":["No issue link with id '1' exists."]}"#)
        .create_async()
        .await;
    server
        .mock("DELETE", "/rest/api/3/issueLink/2")
        .with_status(403)
        .with_body(r#"{"errorMessages":["You do not have permission"]}"#)
        .create_async()
        .await;
    let jira = client(&server);

    let missing = jira.delete_link(&LinkId::new("1")).await.unwrap_err();
    assert!(matches!(missing, TrackerError::NotFound(_)));

    match jira.delete_link(&LinkId::new("2")).await.unwrap_err() {
        TrackerError::Http { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "You do not have permission");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_tracker_is_a_transport_error() {
    let jira = JiraClient::new(&TrackerConfig {
        base_url: "http://127.0.0.1:1".into(),
        email: "ops@example.com".into(),
        api_token: "secret".into(),
        ..Default::default()
    })
    .unwrap();

    let err = jira.myself().await.unwrap_err();
    assert!(matches!(err, TrackerError::Transport(_)));
}

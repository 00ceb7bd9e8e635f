//! Conversions from Jira REST payloads to engine types.
//!
//! Jira reports each link relative to the issue being read: only the far
//! side is present, as `inwardIssue` or `outwardIssue`. The near side is
//! filled in here so every [`Link`] carries both keys.

use hydro_core::model::{
    Account, FieldDef, FieldOption, FieldOptions, GroupingField, Issue, IssueRef, Link, LinkId,
    LinkType, SearchPage, Status, Transition,
};
use hydro_core::{TrackerError, TrackerResult};
use serde_json::{json, Value};

fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(Value::as_str)
}

fn string_at(v: &Value, pointer: &str) -> String {
    str_at(v, pointer).unwrap_or_default().to_string()
}

/// Field list requested for an issue read.
pub fn issue_fields(grouping: &GroupingField) -> String {
    let mut fields = String::from("summary,status,issuetype,issuelinks,parent,updated");
    if let Some(id) = grouping.field_id() {
        fields.push(',');
        fields.push_str(id);
    }
    fields
}

pub fn link_type(raw: &Value) -> LinkType {
    LinkType {
        id: raw.get("id").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        name: string_at(raw, "/name"),
        inward: string_at(raw, "/inward"),
        outward: string_at(raw, "/outward"),
    }
}

pub fn link_types(raw: &Value) -> Vec<LinkType> {
    raw.get("issueLinkTypes")
        .and_then(Value::as_array)
        .map(|types| types.iter().map(link_type).collect())
        .unwrap_or_default()
}

/// A link as listed under `owner`'s `issuelinks`. `None` when neither side
/// is present.
pub fn link(owner: &str, raw: &Value) -> Option<Link> {
    let inward = str_at(raw, "/inwardIssue/key");
    let outward = str_at(raw, "/outwardIssue/key");
    let (inward_key, outward_key) = match (inward, outward) {
        (Some(i), Some(o)) => (i.to_string(), o.to_string()),
        (Some(i), None) => (i.to_string(), owner.to_string()),
        (None, Some(o)) => (owner.to_string(), o.to_string()),
        (None, None) => return None,
    };
    Some(Link {
        id: LinkId::from_raw_link(raw),
        link_type: link_type(raw.get("type").unwrap_or(&Value::Null)),
        inward_key,
        outward_key,
    })
}

pub fn links(owner: &str, fields: &Value) -> Vec<Link> {
    fields
        .get("issuelinks")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(|l| link(owner, l)).collect())
        .unwrap_or_default()
}

pub fn issue(raw: &Value, grouping: &GroupingField) -> TrackerResult<Issue> {
    let key = str_at(raw, "/key")
        .ok_or_else(|| TrackerError::Decode("issue without key".into()))?
        .to_string();
    let fields = raw.get("fields").unwrap_or(&Value::Null);
    let parent = str_at(fields, "/parent/key").map(|k| IssueRef {
        key: k.to_string(),
        summary: str_at(fields, "/parent/fields/summary").map(str::to_string),
    });
    Ok(Issue {
        summary: string_at(fields, "/summary"),
        issue_type: string_at(fields, "/issuetype/name").trim().to_string(),
        status: Status {
            name: string_at(fields, "/status/name"),
            category: str_at(fields, "/status/statusCategory/name").map(str::to_string),
        },
        grouping: grouping.extract(fields),
        parent,
        links: links(&key, fields),
        updated: str_at(fields, "/updated").map(str::to_string),
        key,
    })
}

pub fn search_page(raw: &Value, grouping: &GroupingField) -> TrackerResult<SearchPage> {
    let issues = raw
        .get("issues")
        .and_then(Value::as_array)
        .map(|list| list.iter().map(|i| issue(i, grouping)).collect::<TrackerResult<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let next_page_token = str_at(raw, "/nextPageToken")
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let is_last = raw
        .get("isLast")
        .and_then(Value::as_bool)
        .unwrap_or(next_page_token.is_none());
    Ok(SearchPage {
        issues,
        next_page_token,
        is_last,
    })
}

pub fn fields(raw: &Value) -> Vec<FieldDef> {
    raw.as_array()
        .map(|list| {
            list.iter()
                .filter_map(|f| {
                    Some(FieldDef {
                        id: str_at(f, "/id")?.to_string(),
                        name: string_at(f, "/name"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn transitions(raw: &Value) -> Vec<Transition> {
    raw.get("transitions")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|t| Transition {
                    id: string_at(t, "/id"),
                    name: string_at(t, "/name"),
                    to_name: string_at(t, "/to/name"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Allowed values of `field_id` from an `editmeta` payload.
pub fn field_options(field_id: &str, raw: &Value) -> FieldOptions {
    let field = raw
        .get("fields")
        .and_then(|f| f.get(field_id))
        .unwrap_or(&Value::Null);
    let field_type = str_at(field, "/schema/type").map(str::to_string);
    let options = field
        .get("allowedValues")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .map(|o| FieldOption {
                    id: string_at(o, "/id"),
                    value: str_at(o, "/value")
                        .or_else(|| str_at(o, "/name"))
                        .map(str::to_string)
                        .unwrap_or_else(|| o.to_string()),
                })
                .collect()
        })
        .unwrap_or_default();
    FieldOptions {
        field_id: field_id.to_string(),
        name: str_at(field, "/name").map(str::to_string),
        is_multi: field_type.as_deref() == Some("array"),
        field_type,
        options,
    }
}

pub fn account(raw: &Value) -> Account {
    Account {
        account_id: str_at(raw, "/accountId").map(str::to_string),
        display_name: str_at(raw, "/displayName").map(str::to_string),
        email_address: str_at(raw, "/emailAddress").map(str::to_string),
    }
}

/// One-paragraph rich-text document holding `text`.
pub fn comment_body(text: &str) -> Value {
    json!({
        "body": {
            "type": "doc",
            "version": 1,
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": text }] }
            ]
        }
    })
}

/// Readable message from a Jira error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    let Ok(raw) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let mut parts: Vec<String> = raw
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|m| m.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if let Some(errors) = raw.get("errors").and_then(Value::as_object) {
        for (field, msg) in errors {
            if let Some(msg) = msg.as_str() {
                parts.push(format!("{field}: {msg}"));
            }
        }
    }
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

//! In-memory [`Tracker`] for tests and offline runs.
//!
//! Holds issues and links in a single mutex-guarded store and can be told to
//! misbehave the way the real tracker does: hide a link id from one of the
//! two read surfaces, refuse a deletion, or fail reads of an issue.

use crate::error::{TrackerError, TrackerResult};
use crate::model::{
    same_key, Account, FieldDef, FieldOption, FieldOptions, GroupingField, Issue, IssueRef, Link,
    LinkId, LinkType, SearchPage, Status, Transition,
};
use crate::tracker::Tracker;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

pub const GROUPING_FIELD_ID: &str = "customfield_10014";

#[derive(Debug, Clone)]
struct StoredIssue {
    key: String,
    summary: String,
    issue_type: String,
    status: String,
    grouping: Option<String>,
    parent: Option<String>,
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
struct StoredLink {
    id: LinkId,
    type_name: String,
    inward: String,
    outward: String,
}

#[derive(Default)]
struct Store {
    issues: BTreeMap<String, StoredIssue>,
    links: Vec<StoredLink>,
    next_link_id: u64,
    link_types: Vec<LinkType>,
    fields: Vec<FieldDef>,
    hidden_primary: HashSet<LinkId>,
    hidden_alternate: HashSet<LinkId>,
    failing_deletes: HashSet<LinkId>,
    failing_reads: HashSet<String>,
    transitions: HashMap<String, Vec<Transition>>,
    comments: Vec<(String, String)>,
    created: Vec<(String, String, String)>,
    deleted: Vec<LinkId>,
    link_type_reads: usize,
    field_reads: usize,
}

pub struct MemoryTracker {
    store: Mutex<Store>,
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTracker {
    /// A tracker with the Blocks, Connects and Relates link types and an
    /// `Epic Link` grouping field.
    pub fn new() -> Self {
        let store = Store {
            next_link_id: 10_000,
            link_types: vec![
                LinkType::new("Blocks", "is blocked by", "blocks"),
                LinkType::new("Connects", "connects to", "connects to"),
                LinkType::new("Relates", "relates to", "relates to"),
            ],
            fields: vec![
                FieldDef {
                    id: "summary".into(),
                    name: "Summary".into(),
                },
                FieldDef {
                    id: GROUPING_FIELD_ID.into(),
                    name: "Epic Link".into(),
                },
            ],
            ..Default::default()
        };
        Self {
            store: Mutex::new(store),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- setup --------------------------------------------------------------

    pub fn add_issue(&self, key: &str, issue_type: &str, summary: &str) -> &Self {
        self.lock().issues.insert(
            key.to_string(),
            StoredIssue {
                key: key.to_string(),
                summary: summary.to_string(),
                issue_type: issue_type.to_string(),
                status: "Verde".to_string(),
                grouping: None,
                parent: None,
                extra: serde_json::Map::new(),
            },
        );
        self
    }

    pub fn set_status(&self, key: &str, status: &str) -> &Self {
        if let Some(issue) = self.lock().issues.get_mut(key) {
            issue.status = status.to_string();
        }
        self
    }

    pub fn set_grouping(&self, key: &str, grouping: Option<&str>) -> &Self {
        if let Some(issue) = self.lock().issues.get_mut(key) {
            issue.grouping = grouping.map(str::to_string);
        }
        self
    }

    /// Parent relationship of a grouping issue (used for sector inference).
    pub fn set_parent(&self, key: &str, parent: &str) -> &Self {
        if let Some(issue) = self.lock().issues.get_mut(key) {
            issue.parent = Some(parent.to_string());
        }
        self
    }

    pub fn set_link_types(&self, types: Vec<LinkType>) -> &Self {
        self.lock().link_types = types;
        self
    }

    pub fn set_fields(&self, fields: Vec<FieldDef>) -> &Self {
        self.lock().fields = fields;
        self
    }

    pub fn set_transitions(&self, key: &str, transitions: Vec<Transition>) -> &Self {
        self.lock().transitions.insert(key.to_string(), transitions);
        self
    }

    pub fn link(&self, type_name: &str, inward: &str, outward: &str) -> LinkId {
        let mut store = self.lock();
        store.next_link_id += 1;
        let id = LinkId::new(store.next_link_id.to_string());
        store.links.push(StoredLink {
            id: id.clone(),
            type_name: type_name.to_string(),
            inward: inward.to_string(),
            outward: outward.to_string(),
        });
        id
    }

    pub fn hide_id_from_primary(&self, id: &LinkId) -> &Self {
        self.lock().hidden_primary.insert(id.clone());
        self
    }

    pub fn hide_id_from_alternate(&self, id: &LinkId) -> &Self {
        self.lock().hidden_alternate.insert(id.clone());
        self
    }

    pub fn fail_delete(&self, id: &LinkId) -> &Self {
        self.lock().failing_deletes.insert(id.clone());
        self
    }

    pub fn fail_reads(&self, key: &str) -> &Self {
        self.lock().failing_reads.insert(key.to_string());
        self
    }

    // -- inspection ---------------------------------------------------------

    /// Number of links of `type_name` joining `a` and `b` in either direction.
    pub fn count_links(&self, type_name: &str, a: &str, b: &str) -> usize {
        self.lock()
            .links
            .iter()
            .filter(|l| l.type_name.eq_ignore_ascii_case(type_name))
            .filter(|l| {
                (same_key(&l.inward, a) && same_key(&l.outward, b))
                    || (same_key(&l.inward, b) && same_key(&l.outward, a))
            })
            .count()
    }

    pub fn grouping_of(&self, key: &str) -> Option<String> {
        self.lock().issues.get(key).and_then(|i| i.grouping.clone())
    }

    pub fn field_of(&self, key: &str, field: &str) -> Option<serde_json::Value> {
        self.lock()
            .issues
            .get(key)
            .and_then(|i| i.extra.get(field).cloned())
    }

    pub fn status_of(&self, key: &str) -> Option<String> {
        self.lock().issues.get(key).map(|i| i.status.clone())
    }

    /// `(type, inward, outward)` of every link created through the tracker API.
    pub fn created_links(&self) -> Vec<(String, String, String)> {
        self.lock().created.clone()
    }

    pub fn deleted_links(&self) -> Vec<LinkId> {
        self.lock().deleted.clone()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.lock().comments.clone()
    }

    pub fn link_type_reads(&self) -> usize {
        self.lock().link_type_reads
    }

    pub fn field_reads(&self) -> usize {
        self.lock().field_reads
    }

    // -- helpers ------------------------------------------------------------

    fn links_for(store: &Store, key: &str, hidden: &HashSet<LinkId>) -> Vec<Link> {
        store
            .links
            .iter()
            .filter(|l| same_key(&l.inward, key) || same_key(&l.outward, key))
            .map(|l| Link {
                id: (!hidden.contains(&l.id)).then(|| l.id.clone()),
                link_type: store
                    .link_types
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(&l.type_name))
                    .cloned()
                    .unwrap_or_else(|| LinkType::new(&l.type_name, "", "")),
                inward_key: l.inward.clone(),
                outward_key: l.outward.clone(),
            })
            .collect()
    }

    fn to_issue(store: &Store, stored: &StoredIssue, with_links: bool) -> Issue {
        Issue {
            key: stored.key.clone(),
            summary: stored.summary.clone(),
            issue_type: stored.issue_type.clone(),
            status: Status {
                name: stored.status.clone(),
                category: None,
            },
            grouping: stored.grouping.clone(),
            parent: stored.parent.as_ref().map(|p| IssueRef {
                key: p.clone(),
                summary: store.issues.get(p).map(|i| i.summary.clone()),
            }),
            links: if with_links {
                Self::links_for(store, &stored.key, &store.hidden_primary)
            } else {
                Vec::new()
            },
            updated: None,
        }
    }

    fn read_guard(store: &Store, key: &str) -> TrackerResult<()> {
        if store.failing_reads.contains(key) {
            return Err(TrackerError::Http {
                status: 503,
                message: format!("read of {key} refused"),
            });
        }
        Ok(())
    }
}

/// Names listed in a `<field> in (...)` or `<field> = ...` clause of a query.
fn clause_values(query: &str, field: &str) -> Option<Vec<String>> {
    let lower = query.to_ascii_lowercase();
    let in_pat = format!("{field} in (");
    if let Some(start) = lower.find(&in_pat) {
        let rest = &query[start + in_pat.len()..];
        let end = rest.find(')')?;
        return Some(
            rest[..end]
                .split(',')
                .map(|v| v.trim().trim_matches('"').to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        );
    }
    let eq_pat = format!("{field} = ");
    let start = lower.find(&eq_pat)?;
    let rest = query[start + eq_pat.len()..].trim_start();
    let value = rest.split_whitespace().next()?.trim_matches('"');
    Some(vec![value.to_string()])
}

fn grouping_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(o) => o.get("key").and_then(|k| k.as_str()).map(str::to_string),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Tracker for MemoryTracker {
    async fn issue(&self, key: &str, _grouping: &GroupingField) -> TrackerResult<Issue> {
        let store = self.lock();
        Self::read_guard(&store, key)?;
        let stored = store
            .issues
            .get(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        Ok(Self::to_issue(&store, stored, true))
    }

    async fn issue_links_alternate(&self, key: &str) -> TrackerResult<Vec<Link>> {
        let store = self.lock();
        Self::read_guard(&store, key)?;
        if !store.issues.contains_key(key) {
            return Err(TrackerError::NotFound(key.to_string()));
        }
        Ok(Self::links_for(&store, key, &store.hidden_alternate))
    }

    async fn update_fields(&self, key: &str, fields: serde_json::Value) -> TrackerResult<()> {
        let serde_json::Value::Object(map) = fields else {
            return Err(TrackerError::Http {
                status: 400,
                message: "fields must be an object".into(),
            });
        };
        let mut store = self.lock();
        let issue = store
            .issues
            .get_mut(key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        for (name, value) in map {
            if name == GROUPING_FIELD_ID || name == "parent" {
                issue.grouping = grouping_from_value(&value);
            } else {
                issue.extra.insert(name, value);
            }
        }
        Ok(())
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
    ) -> TrackerResult<()> {
        {
            let mut store = self.lock();
            for key in [inward_key, outward_key] {
                if !store.issues.contains_key(key) {
                    return Err(TrackerError::NotFound(key.to_string()));
                }
            }
            store.created.push((
                link_type.to_string(),
                inward_key.to_string(),
                outward_key.to_string(),
            ));
        }
        self.link(link_type, inward_key, outward_key);
        Ok(())
    }

    async fn delete_link(&self, id: &LinkId) -> TrackerResult<()> {
        let mut store = self.lock();
        if store.failing_deletes.contains(id) {
            return Err(TrackerError::Http {
                status: 500,
                message: format!("could not delete link {id}"),
            });
        }
        let before = store.links.len();
        store.links.retain(|l| &l.id != id);
        if store.links.len() == before {
            return Err(TrackerError::NotFound(format!("link {id}")));
        }
        store.deleted.push(id.clone());
        Ok(())
    }

    async fn link_types(&self) -> TrackerResult<Vec<LinkType>> {
        let mut store = self.lock();
        store.link_type_reads += 1;
        Ok(store.link_types.clone())
    }

    async fn fields(&self) -> TrackerResult<Vec<FieldDef>> {
        let mut store = self.lock();
        store.field_reads += 1;
        Ok(store.fields.clone())
    }

    async fn search_page(
        &self,
        query: &str,
        _grouping: &GroupingField,
        page_size: u32,
        page_token: Option<&str>,
    ) -> TrackerResult<SearchPage> {
        let store = self.lock();
        let types = clause_values(query, "issuetype");
        let keys = clause_values(query, "key");
        let matching: Vec<&StoredIssue> = store
            .issues
            .values()
            .filter(|i| types.as_ref().map_or(true, |t| t.contains(&i.issue_type)))
            .filter(|i| keys.as_ref().map_or(true, |k| k.iter().any(|k| same_key(k, &i.key))))
            .collect();
        let offset: usize = match page_token {
            Some(t) => t
                .parse()
                .map_err(|_| TrackerError::Decode(format!("bad page token {t}")))?,
            None => 0,
        };
        let size = page_size.max(1) as usize;
        let issues: Vec<Issue> = matching
            .iter()
            .skip(offset)
            .take(size)
            .map(|i| Self::to_issue(&store, i, false))
            .collect();
        let next = offset + issues.len();
        let is_last = next >= matching.len();
        Ok(SearchPage {
            issues,
            next_page_token: (!is_last).then(|| next.to_string()),
            is_last,
        })
    }

    async fn transitions(&self, key: &str) -> TrackerResult<Vec<Transition>> {
        let store = self.lock();
        if !store.issues.contains_key(key) {
            return Err(TrackerError::NotFound(key.to_string()));
        }
        Ok(store.transitions.get(key).cloned().unwrap_or_default())
    }

    async fn transition(&self, key: &str, transition_id: &str) -> TrackerResult<()> {
        let mut store = self.lock();
        let target = store
            .transitions
            .get(key)
            .and_then(|ts| ts.iter().find(|t| t.id == transition_id))
            .map(|t| t.to_name.clone())
            .ok_or_else(|| TrackerError::Http {
                status: 400,
                message: format!("transition {transition_id} not available for {key}"),
            })?;
        if let Some(issue) = store.issues.get_mut(key) {
            issue.status = target;
        }
        Ok(())
    }

    async fn add_comment(&self, key: &str, text: &str) -> TrackerResult<()> {
        let mut store = self.lock();
        if !store.issues.contains_key(key) {
            return Err(TrackerError::NotFound(key.to_string()));
        }
        store.comments.push((key.to_string(), text.to_string()));
        Ok(())
    }

    async fn field_options(&self, key: &str, field_id: &str) -> TrackerResult<FieldOptions> {
        let store = self.lock();
        if !store.issues.contains_key(key) {
            return Err(TrackerError::NotFound(key.to_string()));
        }
        let name = store
            .fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| f.name.clone());
        Ok(FieldOptions {
            field_id: field_id.to_string(),
            name,
            field_type: Some("option".into()),
            is_multi: false,
            options: vec![
                FieldOption {
                    id: "1".into(),
                    value: "Sí".into(),
                },
                FieldOption {
                    id: "2".into(),
                    value: "No".into(),
                },
            ],
        })
    }

    async fn myself(&self) -> TrackerResult<Account> {
        Ok(Account {
            account_id: Some("memory".into()),
            display_name: Some("In-memory tracker".into()),
            email_address: None,
        })
    }
}

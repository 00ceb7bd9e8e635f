use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// LinkId
// ---------------------------------------------------------------------------

/// Field names under which the tracker has been observed to expose a link's
/// identifier, in priority order.
pub const LINK_ID_FIELDS: &[&str] = &["id", "linkId", "link_id", "linkID"];

/// Identifier of a link instance, required to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pick the first present, non-empty identifier out of a raw link object.
    ///
    /// Numbers and strings are both accepted; anything else is ignored.
    pub fn from_raw_link(raw: &serde_json::Value) -> Option<LinkId> {
        LINK_ID_FIELDS.iter().find_map(|field| match raw.get(*field)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(LinkId::new(s.trim())),
            serde_json::Value::Number(n) => Some(LinkId::new(n.to_string())),
            _ => None,
        })
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// LinkType
// ---------------------------------------------------------------------------

/// A relationship type defined by the tracker. The same type reads
/// differently depending on traversal direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
}

impl LinkType {
    pub fn new(name: &str, inward: &str, outward: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            inward: inward.to_string(),
            outward: outward.to_string(),
        }
    }

    /// Case-insensitive match against the name or either direction label.
    pub fn matches(&self, label: &str) -> bool {
        let label = label.trim();
        !label.is_empty()
            && (same_label(&self.name, label)
                || same_label(&self.inward, label)
                || same_label(&self.outward, label))
    }

    pub fn same_as(&self, other: &LinkType) -> bool {
        same_label(&self.name, &other.name)
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// One link instance between two issues, with both ends filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: Option<LinkId>,
    pub link_type: LinkType,
    pub inward_key: String,
    pub outward_key: String,
}

impl Link {
    pub fn is_type(&self, link_type: &LinkType) -> bool {
        self.link_type.same_as(link_type)
    }

    /// The side of the link that is not `known`.
    ///
    /// When neither side matches the inward side is returned and the anomaly
    /// is logged; callers treat the result as just another key.
    pub fn other_end(&self, known: &str) -> &str {
        if same_key(&self.inward_key, known) {
            &self.outward_key
        } else if same_key(&self.outward_key, known) {
            &self.inward_key
        } else {
            tracing::warn!(
                known = %known,
                inward = %self.inward_key,
                outward = %self.outward_key,
                "link does not involve the issue it was read from"
            );
            &self.inward_key
        }
    }

    /// True when this link joins `a` and `b` in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (same_key(&self.inward_key, a) && same_key(&self.outward_key, b))
            || (same_key(&self.inward_key, b) && same_key(&self.outward_key, a))
    }
}

pub(crate) fn same_label(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Issue keys compare case-insensitively.
pub fn same_key(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Lightweight reference to another issue, carrying its summary when the
/// tracker embedded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub key: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub status: Status,
    /// Key of the grouping (epic) issue this issue belongs to.
    #[serde(default)]
    pub grouping: Option<String>,
    #[serde(default)]
    pub parent: Option<IssueRef>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub updated: Option<String>,
}

impl Issue {
    pub fn links_of<'a>(&'a self, link_type: &'a LinkType) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.is_type(link_type))
    }

    /// Distinct other-end keys over links of `link_type`, in enumeration order.
    pub fn partners(&self, link_type: &LinkType) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for link in self.links_of(link_type) {
            let other = link.other_end(&self.key);
            if !other.is_empty() && !out.iter().any(|k| same_key(k, other)) {
                out.push(other.to_string());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// IssueKind / StatusLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Station,
    Pump,
    Blower,
    Boat,
    Other,
}

impl IssueKind {
    pub fn is_equipment(self) -> bool {
        matches!(self, IssueKind::Pump | IssueKind::Blower | IssueKind::Boat)
    }

    /// Whether `other` sits on the far side of an active assignment from an
    /// issue of this kind. Stations face equipment; everything else faces
    /// stations.
    pub fn counterpart_is(self, other: IssueKind) -> bool {
        match self {
            IssueKind::Station => other.is_equipment(),
            _ => other == IssueKind::Station,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Normal,
    Warning,
    Critical,
}

impl StatusLevel {
    pub fn needs_attention(self) -> bool {
        !matches!(self, StatusLevel::Normal)
    }
}

// ---------------------------------------------------------------------------
// GroupingField
// ---------------------------------------------------------------------------

/// Where an issue's grouping lives: a dedicated field, or the generic
/// parent relationship when the tracker has no such field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum GroupingField {
    Field(String),
    Parent,
}

impl GroupingField {
    pub fn field_id(&self) -> Option<&str> {
        match self {
            GroupingField::Field(id) => Some(id),
            GroupingField::Parent => None,
        }
    }

    /// Read the grouping key out of a raw `fields` object.
    pub fn extract(&self, fields: &serde_json::Value) -> Option<String> {
        if let GroupingField::Field(id) = self {
            match fields.get(id) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(serde_json::Value::Object(o)) => {
                    if let Some(k) = o.get("key").and_then(|k| k.as_str()) {
                        return Some(k.to_string());
                    }
                }
                _ => {}
            }
        }
        fields
            .get("parent")
            .and_then(|p| p.get("key"))
            .and_then(|k| k.as_str())
            .map(str::to_string)
    }

    /// The `fields` object of a partial update setting the grouping.
    pub fn update_payload(&self, grouping: Option<&str>) -> serde_json::Value {
        match self {
            GroupingField::Field(id) => serde_json::json!({ id.as_str(): grouping }),
            GroupingField::Parent => match grouping {
                Some(key) => serde_json::json!({ "parent": { "key": key } }),
                None => serde_json::json!({ "parent": null }),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog and workflow records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    pub field_id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub is_multi: bool,
    pub options: Vec<FieldOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

/// One page of a cursor-paginated search.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub issues: Vec<Issue>,
    pub next_page_token: Option<String>,
    pub is_last: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blocks() -> LinkType {
        LinkType::new("Blocks", "is blocked by", "blocks")
    }

    fn link(inward: &str, outward: &str) -> Link {
        Link {
            id: None,
            link_type: blocks(),
            inward_key: inward.into(),
            outward_key: outward.into(),
        }
    }

    #[test]
    fn link_id_prefers_first_present_field() {
        let raw = json!({ "linkId": "20", "link_id": "30" });
        assert_eq!(LinkId::from_raw_link(&raw), Some(LinkId::new("20")));
    }

    #[test]
    fn link_id_accepts_numbers_and_skips_empty_strings() {
        let raw = json!({ "id": "", "linkID": 4411 });
        assert_eq!(LinkId::from_raw_link(&raw), Some(LinkId::new("4411")));
        assert_eq!(LinkId::from_raw_link(&json!({ "id": null })), None);
    }

    #[test]
    fn link_type_matches_any_label_case_insensitively() {
        let t = blocks();
        assert!(t.matches("BLOCKS"));
        assert!(t.matches("Is Blocked By"));
        assert!(!t.matches("connects to"));
        assert!(!t.matches(""));
    }

    #[test]
    fn other_end_returns_opposite_side() {
        let l = link("CH-1", "CH-2");
        assert_eq!(l.other_end("CH-1"), "CH-2");
        assert_eq!(l.other_end("ch-2"), "CH-1");
    }

    #[test]
    fn other_end_falls_back_to_inward_side() {
        let l = link("CH-1", "CH-2");
        assert_eq!(l.other_end("CH-9"), "CH-1");
    }

    #[test]
    fn partners_are_distinct_and_ordered() {
        let issue = Issue {
            key: "CH-1".into(),
            links: vec![link("CH-2", "CH-1"), link("CH-1", "CH-3"), link("CH-1", "CH-2")],
            ..Default::default()
        };
        assert_eq!(issue.partners(&blocks()), vec!["CH-2", "CH-3"]);
    }

    #[test]
    fn grouping_extract_prefers_dedicated_field() {
        let fields = json!({ "customfield_1": "CH-100", "parent": { "key": "CH-200" } });
        let field = GroupingField::Field("customfield_1".into());
        assert_eq!(field.extract(&fields), Some("CH-100".into()));
        assert_eq!(GroupingField::Parent.extract(&fields), Some("CH-200".into()));
    }

    #[test]
    fn grouping_extract_falls_back_to_parent_when_field_empty() {
        let fields = json!({ "customfield_1": null, "parent": { "key": "CH-200" } });
        let field = GroupingField::Field("customfield_1".into());
        assert_eq!(field.extract(&fields), Some("CH-200".into()));
    }

    #[test]
    fn grouping_update_payload_shapes() {
        let field = GroupingField::Field("customfield_1".into());
        assert_eq!(field.update_payload(Some("CH-9")), json!({ "customfield_1": "CH-9" }));
        assert_eq!(
            GroupingField::Parent.update_payload(Some("CH-9")),
            json!({ "parent": { "key": "CH-9" } })
        );
        assert_eq!(GroupingField::Parent.update_payload(None), json!({ "parent": null }));
    }

    #[test]
    fn station_counterparts_are_equipment() {
        assert!(IssueKind::Station.counterpart_is(IssueKind::Boat));
        assert!(IssueKind::Pump.counterpart_is(IssueKind::Station));
        assert!(!IssueKind::Pump.counterpart_is(IssueKind::Blower));
        assert!(IssueKind::Other.counterpart_is(IssueKind::Station));
        assert!(!IssueKind::Station.counterpart_is(IssueKind::Station));
    }
}

//! Process-lifetime caches over the tracker's administrative catalogs.
//!
//! Both caches fill on first use and stay filled until [`refresh`] is
//! called. Concurrent first uses may fetch twice; the results are identical.
//!
//! [`refresh`]: LinkTypeCatalog::refresh

use crate::error::{HydroError, Result, TrackerResult};
use crate::model::{same_label, GroupingField, LinkType};
use crate::tracker::Tracker;
use std::sync::Arc;
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// LinkTypeCatalog
// ---------------------------------------------------------------------------

pub struct LinkTypeCatalog {
    tracker: Arc<dyn Tracker>,
    cached: RwLock<Option<Arc<Vec<LinkType>>>>,
}

impl LinkTypeCatalog {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self {
            tracker,
            cached: RwLock::new(None),
        }
    }

    pub async fn all(&self) -> TrackerResult<Arc<Vec<LinkType>>> {
        if let Some(types) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(types));
        }
        let types = Arc::new(self.tracker.link_types().await?);
        tracing::debug!(count = types.len(), "link type catalog loaded");
        *self.cached.write().await = Some(Arc::clone(&types));
        Ok(types)
    }

    /// Find a link type by name, then inward label, then outward label.
    pub async fn resolve(&self, label: &str) -> TrackerResult<Option<LinkType>> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        let types = self.all().await?;
        Ok(find_by(&types, label, |t| &t.name)
            .or_else(|| find_by(&types, label, |t| &t.inward))
            .or_else(|| find_by(&types, label, |t| &t.outward)))
    }

    /// Like [`resolve`](Self::resolve), failing when the type does not exist.
    pub async fn require(&self, label: &str) -> Result<LinkType> {
        self.resolve(label)
            .await?
            .ok_or_else(|| HydroError::MissingLinkType(label.to_string()))
    }

    pub async fn refresh(&self) {
        *self.cached.write().await = None;
    }
}

fn find_by(types: &[LinkType], label: &str, pick: fn(&LinkType) -> &str) -> Option<LinkType> {
    types.iter().find(|t| same_label(pick(t), label)).cloned()
}

// ---------------------------------------------------------------------------
// GroupingFieldResolver
// ---------------------------------------------------------------------------

pub struct GroupingFieldResolver {
    tracker: Arc<dyn Tracker>,
    field_name: String,
    cached: RwLock<Option<GroupingField>>,
}

impl GroupingFieldResolver {
    pub fn new(tracker: Arc<dyn Tracker>, field_name: impl Into<String>) -> Self {
        Self {
            tracker,
            field_name: field_name.into(),
            cached: RwLock::new(None),
        }
    }

    /// The dedicated grouping field when the tracker defines one whose
    /// display name matches exactly, the parent relationship otherwise.
    pub async fn resolve(&self) -> TrackerResult<GroupingField> {
        if let Some(field) = self.cached.read().await.as_ref() {
            return Ok(field.clone());
        }
        let fields = self.tracker.fields().await?;
        let resolved = fields
            .into_iter()
            .find(|f| f.name == self.field_name)
            .map(|f| GroupingField::Field(f.id))
            .unwrap_or(GroupingField::Parent);
        if resolved == GroupingField::Parent {
            tracing::info!(
                field = %self.field_name,
                "no grouping field found, falling back to parent relationship"
            );
        }
        *self.cached.write().await = Some(resolved.clone());
        Ok(resolved)
    }

    pub async fn refresh(&self) {
        *self.cached.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryTracker, GROUPING_FIELD_ID};
    use crate::model::FieldDef;

    #[tokio::test]
    async fn resolve_prefers_name_over_labels() {
        let mem = Arc::new(MemoryTracker::new());
        mem.set_link_types(vec![
            LinkType::new("Feeds", "blocks", "is fed by"),
            LinkType::new("Blocks", "is blocked by", "blocks"),
        ]);
        let catalog = LinkTypeCatalog::new(mem);
        let t = catalog.resolve("BLOCKS").await.unwrap().unwrap();
        assert_eq!(t.name, "Blocks");
        let t = catalog.resolve("is fed by").await.unwrap().unwrap();
        assert_eq!(t.name, "Feeds");
    }

    #[tokio::test]
    async fn inward_label_wins_over_outward_label() {
        let mem = Arc::new(MemoryTracker::new());
        mem.set_link_types(vec![
            LinkType::new("A", "x", "shared"),
            LinkType::new("B", "shared", "y"),
        ]);
        let catalog = LinkTypeCatalog::new(mem);
        assert_eq!(catalog.resolve("shared").await.unwrap().unwrap().name, "B");
    }

    #[tokio::test]
    async fn catalog_is_fetched_once_until_refresh() {
        let mem = Arc::new(MemoryTracker::new());
        let catalog = LinkTypeCatalog::new(mem.clone());
        catalog.resolve("blocks").await.unwrap();
        catalog.resolve("connects to").await.unwrap();
        assert_eq!(mem.link_type_reads(), 1);

        catalog.refresh().await;
        catalog.resolve("blocks").await.unwrap();
        assert_eq!(mem.link_type_reads(), 2);
    }

    #[tokio::test]
    async fn require_reports_missing_type() {
        let mem = Arc::new(MemoryTracker::new());
        let catalog = LinkTypeCatalog::new(mem);
        let err = catalog.require("cloners").await.unwrap_err();
        assert!(matches!(err, HydroError::MissingLinkType(ref l) if l == "cloners"));
    }

    #[tokio::test]
    async fn grouping_field_resolves_exact_name() {
        let mem = Arc::new(MemoryTracker::new());
        let resolver = GroupingFieldResolver::new(mem.clone(), "Epic Link");
        assert_eq!(
            resolver.resolve().await.unwrap(),
            GroupingField::Field(GROUPING_FIELD_ID.into())
        );
        resolver.resolve().await.unwrap();
        assert_eq!(mem.field_reads(), 1);
    }

    #[tokio::test]
    async fn grouping_field_falls_back_to_parent_and_caches_it() {
        let mem = Arc::new(MemoryTracker::new());
        mem.set_fields(vec![FieldDef {
            id: "customfield_1".into(),
            name: "epic link".into(),
        }]);
        let resolver = GroupingFieldResolver::new(mem.clone(), "Epic Link");
        assert_eq!(resolver.resolve().await.unwrap(), GroupingField::Parent);
        resolver.resolve().await.unwrap();
        assert_eq!(mem.field_reads(), 1);
    }
}

use crate::active::ActiveEquipmentResolver;
use crate::catalog::{GroupingFieldResolver, LinkTypeCatalog};
use crate::config::{HydroConfig, Vocabulary};
use crate::control::ControlListAggregator;
use crate::directory::IssueDirectory;
use crate::groupings::Groupings;
use crate::links::LinkGraphReader;
use crate::reconcile::Reconciler;
use crate::tracker::Tracker;
use crate::withdrawal::WithdrawalSweep;
use crate::workflow::Workflow;
use std::sync::Arc;

/// Shared state of the engine: the tracker handle, the vocabulary and the
/// two catalog caches. Components borrow it for the duration of one call.
pub struct Engine {
    tracker: Arc<dyn Tracker>,
    vocabulary: Vocabulary,
    project_key: Option<String>,
    issue_keys: Vec<String>,
    link_types: LinkTypeCatalog,
    grouping_field: GroupingFieldResolver,
}

impl Engine {
    pub fn new(tracker: Arc<dyn Tracker>, config: &HydroConfig) -> Self {
        Self {
            link_types: LinkTypeCatalog::new(Arc::clone(&tracker)),
            grouping_field: GroupingFieldResolver::new(
                Arc::clone(&tracker),
                config.vocabulary.grouping_field_name.clone(),
            ),
            tracker,
            vocabulary: config.vocabulary.clone(),
            project_key: config.tracker.project_key.clone(),
            issue_keys: config.tracker.issue_keys.clone(),
        }
    }

    pub fn tracker(&self) -> &dyn Tracker {
        self.tracker.as_ref()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn project_key(&self) -> Option<&str> {
        self.project_key.as_deref()
    }

    pub fn issue_keys(&self) -> &[String] {
        &self.issue_keys
    }

    pub fn link_types(&self) -> &LinkTypeCatalog {
        &self.link_types
    }

    pub fn grouping_field(&self) -> &GroupingFieldResolver {
        &self.grouping_field
    }

    /// Drop both catalog caches so the next call refetches them.
    pub async fn refresh_catalogs(&self) {
        self.link_types.refresh().await;
        self.grouping_field.refresh().await;
    }

    /// `project = KEY AND ` prefix for queries, empty without a project.
    pub(crate) fn project_clause(&self) -> String {
        match &self.project_key {
            Some(p) if !p.trim().is_empty() => format!("project = {} AND ", p.trim()),
            _ => String::new(),
        }
    }

    pub fn reader(&self) -> LinkGraphReader<'_> {
        LinkGraphReader::new(self)
    }

    pub fn active(&self) -> ActiveEquipmentResolver<'_> {
        ActiveEquipmentResolver::new(self)
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self)
    }

    pub fn withdrawal(&self) -> WithdrawalSweep<'_> {
        WithdrawalSweep::new(self)
    }

    pub fn control(&self) -> ControlListAggregator<'_> {
        ControlListAggregator::new(self)
    }

    pub fn groupings(&self) -> Groupings<'_> {
        Groupings::new(self)
    }

    pub fn directory(&self) -> IssueDirectory<'_> {
        IssueDirectory::new(self)
    }

    pub fn workflow(&self) -> Workflow<'_> {
        Workflow::new(self)
    }
}

/// A JQL string literal: double-quoted, with `\` and `"` escaped.
pub(crate) fn jql_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

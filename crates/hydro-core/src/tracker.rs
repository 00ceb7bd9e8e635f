//! The narrow contract the engine uses to talk to the issue tracker.
//!
//! Implementations normalize the tracker's wire shapes before returning:
//! every [`Link`] has both ends filled in and a typed optional [`LinkId`],
//! whichever field name the tracker used for it.

use crate::error::TrackerResult;
use crate::model::{
    Account, FieldDef, FieldOptions, GroupingField, Issue, Link, LinkId, LinkType, SearchPage,
    Transition,
};

#[async_trait::async_trait]
pub trait Tracker: Send + Sync {
    /// Read an issue with type, status, summary, grouping, parent and links
    /// through the primary API surface.
    async fn issue(&self, key: &str, grouping: &GroupingField) -> TrackerResult<Issue>;

    /// Read only an issue's links through the alternate API surface, which
    /// may expose link ids the primary surface omitted.
    async fn issue_links_alternate(&self, key: &str) -> TrackerResult<Vec<Link>>;

    /// Partial update of an issue's fields.
    async fn update_fields(&self, key: &str, fields: serde_json::Value) -> TrackerResult<()>;

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
    ) -> TrackerResult<()>;

    async fn delete_link(&self, id: &LinkId) -> TrackerResult<()>;

    async fn link_types(&self) -> TrackerResult<Vec<LinkType>>;

    async fn fields(&self) -> TrackerResult<Vec<FieldDef>>;

    /// One page of a search. `page_token` is the cursor returned by the
    /// previous page.
    async fn search_page(
        &self,
        query: &str,
        grouping: &GroupingField,
        page_size: u32,
        page_token: Option<&str>,
    ) -> TrackerResult<SearchPage>;

    async fn transitions(&self, key: &str) -> TrackerResult<Vec<Transition>>;

    async fn transition(&self, key: &str, transition_id: &str) -> TrackerResult<()>;

    async fn add_comment(&self, key: &str, text: &str) -> TrackerResult<()>;

    async fn field_options(&self, key: &str, field_id: &str) -> TrackerResult<FieldOptions>;

    async fn myself(&self) -> TrackerResult<Account>;

    /// Drain a search across all pages.
    ///
    /// Stops on a page flagged last, an empty page, or a page without a
    /// continuation token.
    async fn search_all(
        &self,
        query: &str,
        grouping: &GroupingField,
        page_size: u32,
    ) -> TrackerResult<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .search_page(query, grouping, page_size, token.as_deref())
                .await?;
            let empty = page.issues.is_empty();
            issues.extend(page.issues);
            if page.is_last || empty {
                break;
            }
            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(issues)
    }
}

//! Reading the link graph around one issue.

use crate::engine::Engine;
use crate::error::Result;
use crate::model::{Issue, IssueKind, Link, LinkId, LinkType};
use serde::Serialize;

/// A link as shown by the diagnostics view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    pub id: Option<LinkId>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub inward_key: String,
    pub outward_key: String,
}

impl From<&Link> for LinkView {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id.clone(),
            type_name: link.link_type.name.clone(),
            inward_key: link.inward_key.clone(),
            outward_key: link.outward_key.clone(),
        }
    }
}

/// An issue's links as seen through both tracker read paths.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDiagnosis {
    pub key: String,
    pub blocking_link_type: Option<LinkType>,
    pub primary: Vec<LinkView>,
    pub alternate: Vec<LinkView>,
}

pub struct LinkGraphReader<'a> {
    engine: &'a Engine,
}

impl<'a> LinkGraphReader<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Fetch an issue with its links through the primary read path.
    pub async fn fetch_with_links(&self, key: &str) -> Result<Issue> {
        let grouping = self.engine.grouping_field().resolve().await?;
        Ok(self.engine.tracker().issue(key, &grouping).await?)
    }

    /// Links of `key` through the alternate read path.
    pub async fn alternate_links(&self, key: &str) -> Result<Vec<Link>> {
        Ok(self.engine.tracker().issue_links_alternate(key).await?)
    }

    pub async fn kind_of(&self, key: &str) -> Result<IssueKind> {
        let issue = self.fetch_with_links(key).await?;
        Ok(self.engine.vocabulary().classify(&issue.issue_type))
    }

    /// Delete every `link_type` link between `holder` and `partner`, using
    /// the ids of `holder`'s primary read and then, for whatever survived,
    /// those of its alternate read.
    ///
    /// Returns true only when no matching link is left: each one had an id
    /// on some read path and its deletion succeeded. Failures are logged,
    /// never raised.
    pub async fn delete_between(&self, holder: &str, partner: &str, link_type: &LinkType) -> bool {
        match self.fetch_with_links(holder).await {
            Ok(issue) => {
                if self.delete_matching(&issue.links, holder, partner, link_type).await {
                    return true;
                }
            }
            Err(e) => {
                tracing::warn!(holder = %holder, error = %e, "primary link read failed");
            }
        }
        match self.alternate_links(holder).await {
            Ok(links) => self.delete_matching(&links, holder, partner, link_type).await,
            Err(e) => {
                tracing::warn!(holder = %holder, error = %e, "alternate link read failed");
                false
            }
        }
    }

    /// True when every matching link in `links` had an id and was deleted.
    async fn delete_matching(
        &self,
        links: &[Link],
        holder: &str,
        partner: &str,
        link_type: &LinkType,
    ) -> bool {
        let mut clean = true;
        for link in links
            .iter()
            .filter(|l| l.is_type(link_type) && l.joins(holder, partner))
        {
            let Some(id) = &link.id else {
                tracing::debug!(holder = %holder, partner = %partner, "matching link has no id on this read path");
                clean = false;
                continue;
            };
            if let Err(e) = self.engine.tracker().delete_link(id).await {
                tracing::warn!(link_id = %id, holder = %holder, partner = %partner, error = %e, "link deletion failed");
                clean = false;
            }
        }
        clean
    }

    pub async fn diagnose(&self, key: &str) -> Result<LinkDiagnosis> {
        let blocking = self
            .engine
            .link_types()
            .resolve(&self.engine.vocabulary().blocking_label)
            .await?;
        let issue = self.fetch_with_links(key).await?;
        let alternate = self.alternate_links(key).await?;
        Ok(LinkDiagnosis {
            key: key.to_string(),
            blocking_link_type: blocking,
            primary: issue.links.iter().map(LinkView::from).collect(),
            alternate: alternate.iter().map(LinkView::from).collect(),
        })
    }
}

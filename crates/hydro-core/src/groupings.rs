use crate::engine::{jql_quote, Engine};
use crate::error::{HydroError, Result};
use crate::withdrawal::WithdrawalReport;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingSummary {
    pub key: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingUpdate {
    pub key: String,
    pub grouping: Option<String>,
    pub withdrawal: WithdrawalReport,
}

pub struct Groupings<'a> {
    engine: &'a Engine,
}

impl<'a> Groupings<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Every grouping issue of the project by summary, minus the hidden ones.
    pub async fn list_groupings(&self) -> Result<Vec<GroupingSummary>> {
        let vocab = self.engine.vocabulary();
        let query = format!(
            "{}issuetype = {} ORDER BY summary",
            self.engine.project_clause(),
            jql_quote(&vocab.grouping_type)
        );
        let field = self.engine.grouping_field().resolve().await?;
        let issues = self
            .engine
            .tracker()
            .search_all(&query, &field, vocab.page_size)
            .await?;

        let mut out: Vec<GroupingSummary> = issues
            .into_iter()
            .filter(|i| !vocab.is_hidden_grouping(&i.summary))
            .map(|i| GroupingSummary {
                key: i.key,
                summary: i.summary,
            })
            .collect();
        out.sort_by(|a, b| a.summary.cmp(&b.summary));
        Ok(out)
    }

    /// Write `key`'s grouping (blank clears it), then apply the withdrawal
    /// side effect.
    pub async fn set_grouping(&self, key: &str, grouping: Option<&str>) -> Result<GroupingUpdate> {
        let key = key.trim();
        if key.is_empty() {
            return Err(HydroError::Validation("issue key is required".into()));
        }
        let grouping = grouping.map(str::trim).filter(|g| !g.is_empty());

        let field = self.engine.grouping_field().resolve().await?;
        self.engine
            .tracker()
            .update_fields(key, field.update_payload(grouping))
            .await?;
        tracing::info!(key = %key, grouping = ?grouping, "grouping updated");

        let withdrawal = self
            .engine
            .withdrawal()
            .on_grouping_changed(key, grouping)
            .await?;
        Ok(GroupingUpdate {
            key: key.to_string(),
            grouping: grouping.map(str::to_string),
            withdrawal,
        })
    }
}

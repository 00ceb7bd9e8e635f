use crate::engine::{jql_quote, Engine};
use crate::error::{HydroError, Result};
use crate::model::{same_key, Status};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    pub status: Status,
    pub issue_type: String,
    pub updated: Option<String>,
}

pub struct IssueDirectory<'a> {
    engine: &'a Engine,
}

impl<'a> IssueDirectory<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Issues named by `keys`, else the configured issue keys, else the
    /// whole project by last update. Fails when none of the three is set.
    pub async fn list_issues(&self, keys: &[String]) -> Result<Vec<IssueSummary>> {
        let keys = if keys.is_empty() {
            self.engine.issue_keys()
        } else {
            keys
        };
        let vocab = self.engine.vocabulary();

        let queries: Vec<String> = if keys.is_empty() {
            match self.engine.project_key().map(str::trim) {
                Some(p) if !p.is_empty() => vec![format!("project = {p} ORDER BY updated DESC")],
                _ => {
                    return Err(HydroError::Validation(
                        "no issue keys given and no project key configured".into(),
                    ))
                }
            }
        } else {
            keys.chunks(vocab.key_chunk_size.max(1))
                .map(|chunk| {
                    let quoted: Vec<String> = chunk.iter().map(|k| jql_quote(k.trim())).collect();
                    format!("key in ({})", quoted.join(", "))
                })
                .collect()
        };

        let field = self.engine.grouping_field().resolve().await?;
        let mut out: Vec<IssueSummary> = Vec::new();
        for query in queries {
            let issues = self
                .engine
                .tracker()
                .search_all(&query, &field, vocab.page_size)
                .await?;
            for issue in issues {
                if out.iter().any(|i| same_key(&i.key, &issue.key)) {
                    continue;
                }
                out.push(IssueSummary {
                    key: issue.key,
                    summary: issue.summary,
                    status: issue.status,
                    issue_type: issue.issue_type,
                    updated: issue.updated,
                });
            }
        }
        Ok(out)
    }
}

//! The maintenance control list: equipment that needs an operator's eye.

use crate::batch::gather_bounded;
use crate::engine::{jql_quote, Engine};
use crate::error::Result;
use crate::model::Issue;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlItem {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub grouping_key: Option<String>,
    pub grouping_summary: Option<String>,
    pub sector: Option<String>,
}

#[derive(Debug, Clone)]
struct GroupingInfo {
    summary: String,
    parent_summary: Option<String>,
}

pub struct ControlListAggregator<'a> {
    engine: &'a Engine,
}

impl<'a> ControlListAggregator<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Equipment with no grouping, a warning or critical status, or a
    /// withdrawn grouping.
    pub async fn list_for_attention(&self) -> Result<Vec<ControlItem>> {
        let vocab = self.engine.vocabulary();
        let types = vocab
            .equipment_types()
            .iter()
            .map(|t| jql_quote(t))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "{}issuetype in ({types}) ORDER BY issuetype, key",
            self.engine.project_clause()
        );
        let field = self.engine.grouping_field().resolve().await?;
        let equipment = self
            .engine
            .tracker()
            .search_all(&query, &field, vocab.page_size)
            .await?;

        let groupings = self.grouping_info(&equipment).await;

        let mut out = Vec::new();
        for issue in equipment {
            let info = issue.grouping.as_ref().and_then(|g| groupings.get(g));
            let withdrawn = info.is_some_and(|i| vocab.is_withdrawn(&i.summary));
            let attention = issue.grouping.is_none()
                || vocab.status_level(&issue.status.name).needs_attention()
                || withdrawn;
            if !attention {
                continue;
            }
            let sector = info.and_then(|i| {
                vocab.sector_for(Some(&i.summary), i.parent_summary.as_deref())
            });
            out.push(ControlItem {
                grouping_summary: info.map(|i| i.summary.clone()),
                sector,
                key: issue.key,
                summary: issue.summary,
                status: issue.status.name,
                issue_type: issue.issue_type,
                grouping_key: issue.grouping,
            });
        }
        tracing::debug!(count = out.len(), "control list built");
        Ok(out)
    }

    /// Summaries of every distinct grouping referenced by `issues`. Groupings
    /// that cannot be read are left out.
    async fn grouping_info(&self, issues: &[Issue]) -> HashMap<String, GroupingInfo> {
        let mut keys: Vec<String> = Vec::new();
        for g in issues.iter().filter_map(|i| i.grouping.as_deref()) {
            if !keys.iter().any(|k| k == g) {
                keys.push(g.to_string());
            }
        }
        let limit = self.engine.vocabulary().batch_concurrency;
        let reader = self.engine.reader();
        let reader = &reader;
        gather_bounded(keys, limit, move |key: String| async move {
            match reader.fetch_with_links(&key).await {
                Ok(issue) => Some((
                    key,
                    GroupingInfo {
                        summary: issue.summary,
                        parent_summary: issue.parent.and_then(|p| p.summary),
                    },
                )),
                Err(e) => {
                    tracing::warn!(grouping = %key, error = %e, "could not read grouping");
                    None
                }
            }
        })
        .await
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::fixture;

    #[tokio::test]
    async fn selects_ungrouped_alerting_and_withdrawn_equipment() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("G1", "Epic", "Sistema Gruta N°1")
            .add_issue("W1", "Epic", "Sopladores en depósito")
            .add_issue("PK", "Epic", "Parque acuático")
            .add_issue("G2", "Epic", "Sistema Norte")
            .add_issue("P1", "Bomba", "Bomba ok")
            .add_issue("P2", "Bomba", "Bomba sin sistema")
            .add_issue("P3", "Bomba", "Bomba alerta")
            .add_issue("B1", "Soplador", "Soplador guardado")
            .add_issue("L1", "Lanchón", "Lanchón rojo")
            .add_issue("S1", "Puesto", "Puesto sin sistema");
        mem.set_parent("G2", "PK");
        mem.set_grouping("P1", Some("G1"))
            .set_grouping("P3", Some("G2"))
            .set_grouping("B1", Some("W1"))
            .set_grouping("L1", Some("G1"));
        mem.set_status("P3", "🟨 Amarillo").set_status("L1", "Rojo");

        let items = engine.control().list_for_attention().await.unwrap();
        let mut keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["B1", "L1", "P2", "P3"]);

        let p3 = items.iter().find(|i| i.key == "P3").unwrap();
        assert_eq!(p3.sector.as_deref(), Some("Parque"));
        let l1 = items.iter().find(|i| i.key == "L1").unwrap();
        assert_eq!(l1.sector.as_deref(), Some("Gruta"));
        let p2 = items.iter().find(|i| i.key == "P2").unwrap();
        assert_eq!(p2.sector, None);
    }

    #[tokio::test]
    async fn unreadable_grouping_does_not_fail_the_list() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("G1", "Epic", "Sistema Gruta")
            .add_issue("P1", "Bomba", "Bomba 1");
        mem.set_grouping("P1", Some("G1")).set_status("P1", "Rojo");
        mem.fail_reads("G1");

        let items = engine.control().list_for_attention().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].grouping_summary, None);
    }
}

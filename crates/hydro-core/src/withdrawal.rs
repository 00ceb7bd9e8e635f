//! Clearing active assignments when an issue moves into a withdrawn grouping.
//!
//! Only blocking links are touched. Connectivity, electrical and suction
//! links describe the installation and survive a trip to the workshop.

use crate::engine::Engine;
use crate::error::Result;
use crate::model::IssueKind;
use crate::saga::{SagaLog, Step};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReport {
    pub grouping: Option<String>,
    /// Whether the grouping's summary names a withdrawn state.
    pub withdrawn: bool,
    /// Partners whose blocking link was removed.
    pub removed: Vec<String>,
    /// Partners whose blocking link could not be removed from either side.
    pub residue: Vec<String>,
    pub steps: SagaLog,
}

pub struct WithdrawalSweep<'a> {
    engine: &'a Engine,
}

impl<'a> WithdrawalSweep<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Run after `key`'s grouping was set to `grouping`.
    pub async fn on_grouping_changed(
        &self,
        key: &str,
        grouping: Option<&str>,
    ) -> Result<WithdrawalReport> {
        let mut report = WithdrawalReport {
            grouping: grouping.map(str::to_string),
            ..Default::default()
        };
        let Some(grouping) = grouping else {
            return Ok(report);
        };

        let reader = self.engine.reader();
        let vocab = self.engine.vocabulary();
        let container = reader.fetch_with_links(grouping).await?;
        if !vocab.is_withdrawn(&container.summary) {
            return Ok(report);
        }
        report.withdrawn = true;

        let Some(blocking) = self.engine.link_types().resolve(&vocab.blocking_label).await? else {
            report
                .steps
                .skipped(Step::WithdrawalSweep, key, "no blocking link type");
            return Ok(report);
        };

        let issue = reader.fetch_with_links(key).await?;
        let kind = vocab.classify(&issue.issue_type);
        if kind != IssueKind::Station && !kind.is_equipment() {
            report
                .steps
                .skipped(Step::WithdrawalSweep, key, "neither station nor equipment");
            return Ok(report);
        }

        tracing::info!(key = %key, grouping = %grouping, "withdrawn grouping, clearing active links");
        for partner in issue.partners(&blocking) {
            let partner_kind = match reader.kind_of(&partner).await {
                Ok(k) => k,
                Err(e) => {
                    report
                        .steps
                        .failed(Step::WithdrawalSweep, &partner, format!("could not classify: {e}"));
                    continue;
                }
            };
            if !kind.counterpart_is(partner_kind) {
                continue;
            }
            let removed = reader.delete_between(key, &partner, &blocking).await
                || reader.delete_between(&partner, key, &blocking).await;
            if removed {
                report.steps.done(Step::WithdrawalSweep, &partner);
                report.removed.push(partner);
            } else {
                report
                    .steps
                    .failed(Step::WithdrawalSweep, &partner, "blocking link still present");
                report.residue.push(partner);
            }
        }
        Ok(report)
    }
}

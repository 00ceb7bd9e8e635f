//! Read-side queries over active-equipment assignments.
//!
//! A station's active equipment is the equipment on the far side of a
//! blocking link. When a station carries several such links the first one in
//! the tracker's enumeration order wins; that order is not guaranteed stable,
//! so a station in that state may report different equipment across calls.

use crate::batch::gather_bounded;
use crate::engine::Engine;
use crate::error::Result;
use crate::model::{same_key, Issue, IssueKind, LinkType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentOption {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub grouping_key: Option<String>,
    pub grouping_summary: Option<String>,
    pub in_use_elsewhere: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationOptions {
    pub options: Vec<EquipmentOption>,
    pub active_key: Option<String>,
}

pub struct ActiveEquipmentResolver<'a> {
    engine: &'a Engine,
}

impl<'a> ActiveEquipmentResolver<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    async fn blocking_type(&self) -> Result<Option<LinkType>> {
        Ok(self
            .engine
            .link_types()
            .resolve(&self.engine.vocabulary().blocking_label)
            .await?)
    }

    /// Kind of `key`, or `None` when it cannot be read.
    async fn kind_or_skip(&self, key: &str) -> Option<IssueKind> {
        match self.engine.reader().kind_of(key).await {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "could not classify linked issue");
                None
            }
        }
    }

    /// The equipment currently active at `station_key`, if any.
    pub async fn active_equipment_for(&self, station_key: &str) -> Result<Option<String>> {
        let Some(blocking) = self.blocking_type().await? else {
            return Ok(None);
        };
        let station = self.engine.reader().fetch_with_links(station_key).await?;
        for partner in station.partners(&blocking) {
            if let Some(kind) = self.kind_or_skip(&partner).await {
                if kind.is_equipment() {
                    return Ok(Some(partner));
                }
            }
        }
        Ok(None)
    }

    /// Whether `equipment_key` is active at any station other than
    /// `excluding_station`.
    pub async fn is_in_use_elsewhere(
        &self,
        equipment_key: &str,
        excluding_station: &str,
    ) -> Result<bool> {
        let Some(blocking) = self.blocking_type().await? else {
            return Ok(false);
        };
        let equipment = self.engine.reader().fetch_with_links(equipment_key).await?;
        Ok(self
            .in_use_elsewhere(&equipment, excluding_station, &blocking)
            .await)
    }

    async fn in_use_elsewhere(&self, equipment: &Issue, excluding: &str, blocking: &LinkType) -> bool {
        for partner in equipment.partners(blocking) {
            if same_key(&partner, excluding) {
                continue;
            }
            if self.kind_or_skip(&partner).await == Some(IssueKind::Station) {
                tracing::debug!(equipment = %equipment.key, station = %partner, "equipment in use elsewhere");
                return true;
            }
        }
        false
    }

    /// Active equipment for many stations. A station whose lookup fails maps
    /// to `None` instead of failing the batch.
    pub async fn active_batch(&self, station_keys: &[String]) -> BTreeMap<String, Option<String>> {
        let limit = self.engine.vocabulary().batch_concurrency;
        let keys = station_keys.iter().cloned();
        let results = gather_bounded(keys, limit, move |key: String| async move {
            let active = match self.active_equipment_for(&key).await {
                Ok(active) => active,
                Err(e) => {
                    tracing::warn!(station = %key, error = %e, "active equipment lookup failed");
                    None
                }
            };
            (key, active)
        })
        .await;
        results.into_iter().collect()
    }

    /// Equipment wired to `station_key` through the connects-to link type,
    /// with grouping summaries and the current active selection.
    pub async fn station_options(&self, station_key: &str) -> Result<StationOptions> {
        let vocab = self.engine.vocabulary();
        let connects = self.engine.link_types().require(&vocab.connects_label).await?;
        let blocking = self.blocking_type().await?;
        let station = self.engine.reader().fetch_with_links(station_key).await?;
        let connected = station.partners(&connects);

        let blocking_ref = blocking.as_ref();
        let fetched = gather_bounded(connected, vocab.batch_concurrency, move |key: String| {
            let blocking = blocking_ref;
            async move {
                let issue = match self.engine.reader().fetch_with_links(&key).await {
                    Ok(issue) => issue,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "could not read connected issue");
                        return None;
                    }
                };
                if !vocab.classify(&issue.issue_type).is_equipment() {
                    return None;
                }
                let in_use = match blocking {
                    Some(b) => self.in_use_elsewhere(&issue, station_key, b).await,
                    None => false,
                };
                Some((issue, in_use))
            }
        })
        .await;
        let equipment: Vec<(Issue, bool)> = fetched.into_iter().flatten().collect();

        let summaries = self
            .grouping_summaries(equipment.iter().filter_map(|(i, _)| i.grouping.clone()))
            .await;

        let options: Vec<EquipmentOption> = equipment
            .into_iter()
            .map(|(issue, in_use_elsewhere)| EquipmentOption {
                grouping_summary: issue
                    .grouping
                    .as_ref()
                    .and_then(|g| summaries.get(g).cloned().flatten()),
                grouping_key: issue.grouping,
                key: issue.key,
                summary: issue.summary,
                status: issue.status.name,
                issue_type: issue.issue_type,
                in_use_elsewhere,
            })
            .collect();

        let active_key = blocking.and_then(|b| {
            station
                .partners(&b)
                .into_iter()
                .find(|k| options.iter().any(|o| same_key(&o.key, k)))
        });

        Ok(StationOptions {
            options,
            active_key,
        })
    }

    async fn grouping_summaries(
        &self,
        keys: impl Iterator<Item = String>,
    ) -> HashMap<String, Option<String>> {
        let mut unique: Vec<String> = Vec::new();
        for k in keys {
            if !unique.contains(&k) {
                unique.push(k);
            }
        }
        let limit = self.engine.vocabulary().batch_concurrency;
        gather_bounded(unique, limit, move |key: String| async move {
            let summary = match self.engine.reader().fetch_with_links(&key).await {
                Ok(issue) => Some(issue.summary),
                Err(e) => {
                    tracing::warn!(grouping = %key, error = %e, "could not read grouping");
                    None
                }
            };
            (key, summary)
        })
        .await
        .into_iter()
        .collect()
    }
}

//! Moving a station's active designation to another piece of equipment.
//!
//! The tracker has no transactions and no locks, so a reassignment is a
//! sequence of idempotent repair steps. Each step records its own outcome in
//! a [`SagaLog`]; cleanup failures never abort the call and surface instead
//! as residue stations that need a manual look. Only precondition failures,
//! the primary reads, creation of the new active link and the grouping writes
//! are fatal.
//!
//! Steps:
//!
//! 1. detach blocking links from the new equipment to other stations
//!    (retrying once through the alternate read path for missing ids);
//! 2. sweep the stations still linked from their own side;
//! 3. drop the station's blocking links to any other equipment;
//! 4. create the new blocking link unless it already exists, removing
//!    duplicates if several exist;
//! 5. propagate the grouping: the station keeps its own, or inherits the
//!    equipment's, and both end up with the same value. The previous
//!    equipment keeps whatever grouping it had.

use crate::engine::Engine;
use crate::error::{HydroError, Result};
use crate::model::{same_key, Issue, IssueKind, LinkId, LinkType};
use crate::saga::{SagaLog, Step};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignOutcome {
    pub station: String,
    pub equipment: String,
    /// False when the active link already existed.
    pub created_link: bool,
    /// Grouping both sides were aligned to, if any side had one.
    pub grouping: Option<String>,
    /// Stations whose stale link to the equipment could not be confirmed
    /// removed.
    pub unlinked_stations: Vec<String>,
    pub steps: SagaLog,
}

pub struct Reconciler<'a> {
    engine: &'a Engine,
}

impl<'a> Reconciler<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub async fn reassign(&self, station_key: &str, equipment_key: &str) -> Result<ReassignOutcome> {
        let station_key = station_key.trim();
        let equipment_key = equipment_key.trim();
        if station_key.is_empty() || equipment_key.is_empty() {
            return Err(HydroError::Validation(
                "station and equipment keys are required".into(),
            ));
        }

        let vocab = self.engine.vocabulary();
        let catalog = self.engine.link_types();
        let blocking = catalog.require(&vocab.blocking_label).await?;
        let connects = catalog.require(&vocab.connects_label).await?;

        let reader = self.engine.reader();
        let station = reader.fetch_with_links(station_key).await?;
        let wired = station
            .partners(&connects)
            .iter()
            .any(|k| same_key(k, equipment_key));
        if !wired {
            return Err(HydroError::Validation(format!(
                "{equipment_key} is not connected to station {station_key}"
            )));
        }
        let equipment = reader.fetch_with_links(equipment_key).await?;

        tracing::info!(station = %station_key, equipment = %equipment_key, "reassigning active equipment");
        let mut log = SagaLog::new();

        let pending = self
            .detach_stale_links(&equipment, station_key, &blocking, &mut log)
            .await;
        let mut residue = self
            .station_side_sweep(pending, equipment_key, &blocking, &mut log)
            .await;
        if !self
            .remove_station_links(&station, equipment_key, &blocking, &mut log)
            .await
        {
            push_unique(&mut residue, station_key);
        }
        let created_link = self
            .ensure_active_link(&station, equipment_key, &blocking, &mut residue, &mut log)
            .await?;
        let grouping = self
            .propagate_grouping(&station, equipment_key, &mut log)
            .await?;

        if !residue.is_empty() {
            tracing::warn!(
                station = %station_key,
                equipment = %equipment_key,
                residue = ?residue,
                "reassignment left links that need manual cleanup"
            );
        }

        Ok(ReassignOutcome {
            station: station_key.to_string(),
            equipment: equipment_key.to_string(),
            created_link,
            grouping,
            unlinked_stations: residue,
            steps: log,
        })
    }

    /// Step 1. Returns the stations whose link could not be deleted from the
    /// equipment side.
    async fn detach_stale_links(
        &self,
        equipment: &Issue,
        station_key: &str,
        blocking: &LinkType,
        log: &mut SagaLog,
    ) -> Vec<String> {
        let tracker = self.engine.tracker();
        let reader = self.engine.reader();
        let mut pending: Vec<String> = Vec::new();

        for link in equipment.links_of(blocking) {
            let other = link.other_end(&equipment.key);
            if other.is_empty() || same_key(other, station_key) {
                continue;
            }
            match reader.kind_of(other).await {
                Ok(IssueKind::Station) => {}
                Ok(_) => continue,
                Err(e) => {
                    log.failed(Step::DetachStaleLinks, other, format!("could not classify: {e}"));
                    continue;
                }
            }
            match &link.id {
                Some(id) => match tracker.delete_link(id).await {
                    Ok(()) => log.done(Step::DetachStaleLinks, other),
                    Err(e) => {
                        tracing::warn!(link_id = %id, station = %other, error = %e, "deleting stale link failed");
                        push_unique(&mut pending, other);
                    }
                },
                None => push_unique(&mut pending, other),
            }
        }

        if pending.is_empty() {
            return pending;
        }

        // One retry through the alternate read path, which may expose ids
        // the primary read omitted.
        let alternate = match reader.alternate_links(&equipment.key).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(equipment = %equipment.key, error = %e, "alternate link read failed");
                return pending;
            }
        };
        let mut retried: Vec<(String, LinkId)> = Vec::new();
        for link in alternate.iter().filter(|l| l.is_type(blocking)) {
            let other = link.other_end(&equipment.key);
            if let (Some(id), true) = (&link.id, pending.iter().any(|p| same_key(p, other))) {
                retried.push((other.to_string(), id.clone()));
            }
        }
        for (other, id) in retried {
            match tracker.delete_link(&id).await {
                Ok(()) => {
                    log.done(Step::DetachStaleLinks, &other);
                    pending.retain(|p| !same_key(p, &other));
                }
                Err(e) => {
                    tracing::warn!(link_id = %id, station = %other, error = %e, "deleting stale link via alternate id failed");
                }
            }
        }
        pending
    }

    /// Step 2. Returns the stations that still could not be cleaned.
    async fn station_side_sweep(
        &self,
        pending: Vec<String>,
        equipment_key: &str,
        blocking: &LinkType,
        log: &mut SagaLog,
    ) -> Vec<String> {
        let reader = self.engine.reader();
        let mut residue = Vec::new();
        for station in pending {
            if reader.delete_between(&station, equipment_key, blocking).await {
                log.done(Step::StationSideSweep, &station);
            } else {
                log.failed(
                    Step::StationSideSweep,
                    &station,
                    format!("no deletable link to {equipment_key} from either side"),
                );
                residue.push(station);
            }
        }
        residue
    }

    /// Step 3. Returns false when some link could not be removed.
    async fn remove_station_links(
        &self,
        station: &Issue,
        equipment_key: &str,
        blocking: &LinkType,
        log: &mut SagaLog,
    ) -> bool {
        let reader = self.engine.reader();
        let mut clean = true;

        for other in station.partners(blocking) {
            if same_key(&other, equipment_key) {
                continue;
            }
            match reader.kind_of(&other).await {
                Ok(kind) if kind.is_equipment() => {}
                Ok(_) => {
                    log.skipped(Step::RemoveStationLinks, &other, "not equipment");
                    continue;
                }
                Err(e) => {
                    log.failed(Step::RemoveStationLinks, &other, format!("could not classify: {e}"));
                    clean = false;
                    continue;
                }
            }
            let deleted = reader.delete_between(&station.key, &other, blocking).await
                || reader.delete_between(&other, &station.key, blocking).await;
            if deleted {
                log.done(Step::RemoveStationLinks, &other);
            } else {
                log.failed(Step::RemoveStationLinks, &other, "previous active link still present");
                clean = false;
            }
        }
        clean
    }

    /// Step 4. Returns whether a link was created. Duplicates that cannot be
    /// removed put the station in `residue`.
    async fn ensure_active_link(
        &self,
        station: &Issue,
        equipment_key: &str,
        blocking: &LinkType,
        residue: &mut Vec<String>,
        log: &mut SagaLog,
    ) -> Result<bool> {
        let tracker = self.engine.tracker();
        let existing: Vec<_> = station
            .links_of(blocking)
            .filter(|l| l.joins(&station.key, equipment_key))
            .collect();

        if existing.is_empty() {
            tracker
                .create_link(&blocking.name, equipment_key, &station.key)
                .await?;
            log.done(Step::CreateActiveLink, &station.key);
            return Ok(true);
        }

        log.skipped(Step::CreateActiveLink, &station.key, "active link already present");
        if existing.len() == 1 {
            return Ok(false);
        }

        let mut leftover = false;
        for dup in existing.iter().skip(1) {
            match &dup.id {
                Some(id) => match tracker.delete_link(id).await {
                    Ok(()) => log.done(Step::RepairDuplicates, &station.key),
                    Err(e) => {
                        tracing::warn!(link_id = %id, station = %station.key, error = %e, "deleting duplicate active link failed");
                        leftover = true;
                    }
                },
                None => leftover = true,
            }
        }
        if leftover && !self.collapse_from_alternate(station, equipment_key, blocking, log).await {
            log.failed(Step::RepairDuplicates, &station.key, "duplicate active link still present");
            push_unique(residue, &station.key);
        }
        Ok(false)
    }

    /// Second pass over duplicates through the alternate read: delete every
    /// copy with an id but one. True when exactly one link remains.
    async fn collapse_from_alternate(
        &self,
        station: &Issue,
        equipment_key: &str,
        blocking: &LinkType,
        log: &mut SagaLog,
    ) -> bool {
        let links = match self.engine.reader().alternate_links(&station.key).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(station = %station.key, error = %e, "alternate link read failed");
                return false;
            }
        };
        let copies: Vec<_> = links
            .iter()
            .filter(|l| l.is_type(blocking) && l.joins(&station.key, equipment_key))
            .collect();
        let ids: Vec<&LinkId> = copies.iter().filter_map(|l| l.id.as_ref()).collect();
        // Keep an id-less copy when there is one, since it cannot be deleted anyway.
        let keep_one = usize::from(ids.len() == copies.len());
        let mut remaining = copies.len();
        for id in ids.into_iter().skip(keep_one) {
            match self.engine.tracker().delete_link(id).await {
                Ok(()) => {
                    log.done(Step::RepairDuplicates, &station.key);
                    remaining -= 1;
                }
                Err(e) => {
                    tracing::warn!(link_id = %id, station = %station.key, error = %e, "deleting duplicate active link failed");
                }
            }
        }
        remaining <= 1
    }

    /// Step 5. Returns the grouping both sides now share.
    async fn propagate_grouping(
        &self,
        station: &Issue,
        equipment_key: &str,
        log: &mut SagaLog,
    ) -> Result<Option<String>> {
        // Re-read: another operator may have regrouped the equipment while
        // the link steps ran.
        let equipment = self.engine.reader().fetch_with_links(equipment_key).await?;
        let Some(target) = station.grouping.clone().or(equipment.grouping.clone()) else {
            log.skipped(Step::PropagateGrouping, &station.key, "neither side has a grouping");
            return Ok(None);
        };

        let field = self.engine.grouping_field().resolve().await?;
        for (key, current) in [
            (station.key.as_str(), &station.grouping),
            (equipment.key.as_str(), &equipment.grouping),
        ] {
            if current.as_deref() == Some(target.as_str()) {
                log.skipped(Step::PropagateGrouping, key, "grouping already set");
                continue;
            }
            self.engine
                .tracker()
                .update_fields(key, field.update_payload(Some(target.as_str())))
                .await?;
            log.done(Step::PropagateGrouping, key);
        }
        Ok(Some(target))
    }
}

fn push_unique(list: &mut Vec<String>, key: &str) {
    if !list.iter().any(|k| same_key(k, key)) {
        list.push(key.to_string());
    }
}

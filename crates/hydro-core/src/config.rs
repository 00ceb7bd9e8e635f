use crate::error::{HydroError, Result};
use crate::model::{IssueKind, StatusLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

/// Connection settings for the issue tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: Option<String>,
    /// Explicit issue keys for the issue directory; overrides the project query.
    pub issue_keys: Vec<String>,
}

impl TrackerConfig {
    /// Fail with the name of the first missing required setting.
    pub fn validate(&self) -> Result<()> {
        for (value, name) in [
            (&self.base_url, "JIRA_BASE_URL"),
            (&self.email, "JIRA_EMAIL"),
            (&self.api_token, "JIRA_API_TOKEN"),
        ] {
            if value.trim().is_empty() {
                return Err(HydroError::Config(format!("missing {name}")));
            }
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Split a comma-separated key list, dropping blanks.
pub fn parse_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorKeyword {
    pub keyword: String,
    pub sector: String,
}

/// Names and phrases the engine matches against tracker data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Substring identifying station issue types (case-insensitive).
    pub station_type: String,
    pub pump_type: String,
    pub blower_type: String,
    pub boat_type: String,
    pub grouping_type: String,
    /// Label of the link type that marks a station's active equipment.
    pub blocking_label: String,
    /// Label of the link type that marks physically connectable equipment.
    pub connects_label: String,
    /// Display name of the dedicated grouping field.
    pub grouping_field_name: String,
    pub withdrawn_phrases: Vec<String>,
    pub warning_markers: Vec<String>,
    pub critical_markers: Vec<String>,
    pub sectors: Vec<SectorKeyword>,
    /// Grouping summaries never offered in the grouping selector.
    pub hidden_groupings: Vec<String>,
    pub batch_concurrency: usize,
    pub page_size: u32,
    pub key_chunk_size: usize,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            station_type: "puesto".to_string(),
            pump_type: "Bomba".to_string(),
            blower_type: "Soplador".to_string(),
            boat_type: "Lanchón".to_string(),
            grouping_type: "Epic".to_string(),
            blocking_label: "blocks".to_string(),
            connects_label: "connects to".to_string(),
            grouping_field_name: "Epic Link".to_string(),
            withdrawn_phrases: vec!["en reparación".to_string(), "en depósito".to_string()],
            warning_markers: vec!["🟨".to_string(), "yellow".to_string(), "amarillo".to_string()],
            critical_markers: vec!["🟥".to_string(), "red".to_string(), "rojo".to_string()],
            sectors: vec![
                SectorKeyword {
                    keyword: "gruta".to_string(),
                    sector: "Gruta".to_string(),
                },
                SectorKeyword {
                    keyword: "parque".to_string(),
                    sector: "Parque".to_string(),
                },
            ],
            hidden_groupings: [
                "Sist. 1-Arriba",
                "Sist. 2-BTV",
                "Sist. 3-JFV",
                "Sist. 4-Duchas",
                "Sist. Hidro",
                "1-Arriba",
                "2-BTV",
                "3-JFV",
                "4-Duchas",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            batch_concurrency: 15,
            page_size: 100,
            key_chunk_size: 50,
        }
    }
}

impl Vocabulary {
    pub fn classify(&self, issue_type: &str) -> IssueKind {
        let t = issue_type.trim();
        if t.is_empty() {
            return IssueKind::Other;
        }
        if t.to_lowercase().contains(&self.station_type.to_lowercase()) {
            IssueKind::Station
        } else if t == self.pump_type {
            IssueKind::Pump
        } else if t == self.blower_type {
            IssueKind::Blower
        } else if t == self.boat_type {
            IssueKind::Boat
        } else {
            IssueKind::Other
        }
    }

    pub fn equipment_types(&self) -> [&str; 3] {
        [&self.pump_type, &self.blower_type, &self.boat_type]
    }

    pub fn status_level(&self, status: &str) -> StatusLevel {
        let s = status.trim().to_lowercase();
        if s.is_empty() {
            return StatusLevel::Normal;
        }
        let hit = |markers: &[String]| markers.iter().any(|m| s.contains(&m.to_lowercase()));
        if hit(&self.critical_markers) {
            StatusLevel::Critical
        } else if hit(&self.warning_markers) {
            StatusLevel::Warning
        } else {
            StatusLevel::Normal
        }
    }

    pub fn is_withdrawn(&self, grouping_summary: &str) -> bool {
        let s = grouping_summary.to_lowercase();
        self.withdrawn_phrases
            .iter()
            .any(|p| s.contains(&p.to_lowercase()))
    }

    /// First sector keyword found in either summary, in configured order.
    pub fn sector_for(&self, summary: Option<&str>, parent_summary: Option<&str>) -> Option<String> {
        let summary = summary.unwrap_or_default().to_lowercase();
        let parent = parent_summary.unwrap_or_default().to_lowercase();
        self.sectors
            .iter()
            .find(|s| {
                let kw = s.keyword.to_lowercase();
                summary.contains(&kw) || parent.contains(&kw)
            })
            .map(|s| s.sector.clone())
    }

    pub fn is_hidden_grouping(&self, summary: &str) -> bool {
        let s = summary.trim();
        self.hidden_groupings.iter().any(|h| h == s)
    }

    fn check(&self) -> Result<()> {
        if self.blocking_label.trim().is_empty() || self.connects_label.trim().is_empty() {
            return Err(HydroError::Config(
                "blocking_label and connects_label must not be empty".into(),
            ));
        }
        if self.batch_concurrency == 0 || self.page_size == 0 || self.key_chunk_size == 0 {
            return Err(HydroError::Config(
                "batch_concurrency, page_size and key_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HydroConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HydroConfig {
    pub tracker: TrackerConfig,
    pub vocabulary: Vocabulary,
}

impl HydroConfig {
    /// Load the vocabulary from `path` when it exists, defaults otherwise.
    pub fn load(tracker: TrackerConfig, path: Option<&Path>) -> Result<Self> {
        let vocabulary = match path {
            Some(p) if p.exists() => {
                let data = std::fs::read_to_string(p)?;
                let vocab: Vocabulary = serde_yaml::from_str(&data)?;
                vocab.check()?;
                vocab
            }
            Some(p) => {
                tracing::debug!(path = %p.display(), "vocabulary file not found, using defaults");
                Vocabulary::default()
            }
            None => Vocabulary::default(),
        };
        Ok(Self {
            tracker,
            vocabulary,
        })
    }
}

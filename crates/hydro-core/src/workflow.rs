//! Status workflow, comments and field edits used by the diagram UI.
//!
//! These share the tracker client with the reconciler but never touch links.

use crate::engine::Engine;
use crate::error::{HydroError, Result};
use crate::model::{Account, FieldOptions, Transition};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionView {
    pub id: String,
    pub name: String,
    pub to_name: String,
    /// Moving equipment into a warning or critical status asks the operator
    /// to describe the breakdown.
    pub requires_breakdown_comment: bool,
}

pub struct Workflow<'a> {
    engine: &'a Engine,
}

impl<'a> Workflow<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub async fn transitions(&self, key: &str) -> Result<Vec<TransitionView>> {
        let vocab = self.engine.vocabulary();
        let issue = self.engine.reader().fetch_with_links(key).await?;
        let equipment = vocab.classify(&issue.issue_type).is_equipment();
        let transitions = self.engine.tracker().transitions(key).await?;
        Ok(transitions
            .into_iter()
            .map(|t| TransitionView {
                requires_breakdown_comment: equipment
                    && vocab.status_level(&t.to_name).needs_attention(),
                id: t.id,
                name: t.name,
                to_name: t.to_name,
            })
            .collect())
    }

    /// Apply a transition chosen by id, or by case-insensitive name.
    pub async fn transition(
        &self,
        key: &str,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Transition> {
        let id = id.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        if id.is_none() && name.is_none() {
            return Err(HydroError::Validation(
                "a transition id or name is required".into(),
            ));
        }

        let tracker = self.engine.tracker();
        let available = tracker.transitions(key).await?;
        let chosen = available
            .into_iter()
            .find(|t| match (id, name) {
                (Some(id), _) => t.id == id,
                (None, Some(name)) => t.name.to_lowercase() == name.to_lowercase(),
                (None, None) => false,
            })
            .ok_or_else(|| {
                HydroError::Validation(format!(
                    "transition {} is not available for {key}",
                    id.or(name).unwrap_or_default()
                ))
            })?;

        tracker.transition(key, &chosen.id).await?;
        tracing::info!(key = %key, to = %chosen.to_name, "issue transitioned");
        Ok(chosen)
    }

    pub async fn comment(&self, key: &str, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HydroError::Validation("comment text is required".into()));
        }
        self.engine.tracker().add_comment(key, text).await?;
        Ok(())
    }

    pub async fn update_fields(&self, key: &str, fields: serde_json::Value) -> Result<()> {
        if !fields.is_object() {
            return Err(HydroError::Validation("fields must be an object".into()));
        }
        self.engine.tracker().update_fields(key, fields).await?;
        Ok(())
    }

    pub async fn field_options(&self, key: &str, field_id: &str) -> Result<FieldOptions> {
        let field_id = field_id.trim();
        if field_id.is_empty() {
            return Err(HydroError::Validation("fieldId is required".into()));
        }
        Ok(self.engine.tracker().field_options(key, field_id).await?)
    }

    pub async fn whoami(&self) -> Result<Account> {
        Ok(self.engine.tracker().myself().await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::fixture;
    use crate::memory::MemoryTracker;
    use crate::model::Transition;
    use serde_json::json;

    fn transitions(mem: &MemoryTracker, key: &str) {
        mem.set_transitions(
            key,
            vec![
                Transition {
                    id: "11".into(),
                    name: "Averiar".into(),
                    to_name: "🟥 Rojo".into(),
                },
                Transition {
                    id: "21".into(),
                    name: "Reparar".into(),
                    to_name: "Verde".into(),
                },
            ],
        );
    }

    #[tokio::test]
    async fn breakdown_comment_only_for_equipment_alerts() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("P1", "Bomba", "Bomba 1").add_issue("S1", "Puesto", "Puesto 1");
        transitions(&mem, "P1");
        transitions(&mem, "S1");

        let pump = engine.workflow().transitions("P1").await.unwrap();
        assert!(pump[0].requires_breakdown_comment);
        assert!(!pump[1].requires_breakdown_comment);
        let station = engine.workflow().transitions("S1").await.unwrap();
        assert!(station.iter().all(|t| !t.requires_breakdown_comment));
    }

    #[tokio::test]
    async fn transition_by_name_is_case_insensitive() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("P1", "Bomba", "Bomba 1");
        transitions(&mem, "P1");

        let t = engine.workflow().transition("P1", None, Some("averiar")).await.unwrap();
        assert_eq!(t.id, "11");
        assert_eq!(mem.status_of("P1").as_deref(), Some("🟥 Rojo"));
    }

    #[tokio::test]
    async fn transition_needs_id_or_name() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("P1", "Bomba", "Bomba 1");
        let err = engine.workflow().transition("P1", None, Some(" ")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn comment_and_field_validation() {
        let (mem, engine) = fixture::engine();
        mem.add_issue("P1", "Bomba", "Bomba 1");
        let wf = engine.workflow();

        assert!(wf.comment("P1", "   ").await.unwrap_err().is_validation());
        wf.comment("P1", "Rodamiento roto").await.unwrap();
        assert_eq!(mem.comments(), vec![("P1".to_string(), "Rodamiento roto".to_string())]);

        assert!(wf.update_fields("P1", json!(["x"])).await.unwrap_err().is_validation());
        wf.update_fields("P1", json!({"customfield_10100": "220V"})).await.unwrap();
        assert_eq!(mem.field_of("P1", "customfield_10100"), Some(json!("220V")));
    }
}

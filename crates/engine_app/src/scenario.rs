//! The demo scenario.
//!
//! Three entities; one `Stat` instance shared by the first two; a `Label` on
//! the first. The first entity is then destroyed, which must leave the shared
//! `Stat` alive through the second and drop the orphaned `Label`.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use engine_component::{Component, EntityId, Index, Shared};

use crate::components::{Label, Stat};

/// What the index reported at one point of the scenario.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub stat_instances: usize,
    pub label_instances: usize,
    pub with_stat: Vec<String>,
    pub with_stat_and_label: Vec<String>,
    pub entity_count: usize,
}

/// Scenario output.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entities: Vec<String>,
    pub steps: Vec<Step>,
    /// Sum of every `Stat` reachable through an entity holding both types,
    /// as a "system" over the index would compute it.
    pub stat_total: i64,
}

/// Position of `entity` in `entities`, used to print stable names instead of
/// random ids.
fn name_of(entities: &[EntityId], entity: EntityId) -> String {
    entities
        .iter()
        .position(|e| *e == entity)
        .map_or_else(|| entity.to_string(), |i| format!("e{}", i + 1))
}

fn names(entities: &[EntityId], mut found: Vec<EntityId>) -> Vec<String> {
    found.sort_by_key(|e| entities.iter().position(|x| x == e));
    found.into_iter().map(|e| name_of(entities, e)).collect()
}

fn snapshot(index: &Index, entities: &[EntityId], name: &'static str) -> Step {
    let step = Step {
        name,
        stat_instances: index.component_count(Stat::component_type_id()),
        label_instances: index.component_count(Label::component_type_id()),
        with_stat: names(entities, index.entities_with::<Stat>()),
        with_stat_and_label: names(
            entities,
            index.get_all_entities_with_component(&[
                Stat::component_type_id(),
                Label::component_type_id(),
            ]),
        ),
        entity_count: index.entity_count(),
    };
    debug!(?step, "scenario step");
    step
}

/// Sum `Stat` over every entity that also has a `Label`.
fn stat_total(index: &Index) -> i64 {
    index
        .get_all_entities_with_component(&[Stat::component_type_id(), Label::component_type_id()])
        .into_iter()
        .filter_map(|entity| index.get::<Stat>(entity))
        .map(|stat| stat.read().val)
        .sum()
}

/// Run the scenario against `index`.
///
/// # Errors
///
/// Fails if the index rejects an attachment or ends up inconsistent.
pub fn run(index: &Index) -> Result<Report> {
    let entities: Vec<EntityId> = (0..3).map(|_| index.create_entity()).collect();
    let (e1, e2) = (entities[0], entities[1]);
    let mut steps = vec![snapshot(index, &entities, "created")];

    let stat = Shared::new(Stat { val: 3 });
    index
        .add_component(e1, &stat)
        .context("attaching Stat to e1")?;
    index
        .add_component(e2, &stat)
        .context("sharing Stat with e2")?;
    index
        .add_component(e1, Shared::new(Label { val: "x".into() }))
        .context("attaching Label to e1")?;
    steps.push(snapshot(index, &entities, "attached"));

    let total = stat_total(index);
    info!(total, "computed stat total");

    index.destroy_entity(e1);
    steps.push(snapshot(index, &entities, "destroyed e1"));

    index.verify().context("index inconsistent after scenario")?;

    Ok(Report {
        entities: entities.iter().map(|e| e.to_string()).collect(),
        steps,
        stat_total: total,
    })
}

#[cfg(test)]
mod tests {
    use engine_component::{IndexConfig, ReplacePolicy};

    use super::*;

    #[test]
    fn test_scenario_steps() {
        let index = Index::new();
        let report = run(&index).unwrap();
        assert_eq!(report.entities.len(), 3);
        assert_eq!(report.stat_total, 3);

        let attached = &report.steps[1];
        assert_eq!(attached.stat_instances, 1);
        assert_eq!(attached.with_stat, vec!["e1", "e2"]);
        assert_eq!(attached.with_stat_and_label, vec!["e1"]);

        let destroyed = &report.steps[2];
        assert_eq!(destroyed.with_stat, vec!["e2"]);
        assert_eq!(destroyed.label_instances, 0);
        assert!(destroyed.with_stat_and_label.is_empty());
        assert_eq!(destroyed.entity_count, 2);
    }

    #[test]
    fn test_scenario_under_reject_policy() {
        let index = Index::with_config(IndexConfig::new().with_replace_policy(ReplacePolicy::Reject));
        let report = run(&index).unwrap();
        assert_eq!(report.steps[2].with_stat, vec!["e2"]);
    }

    #[test]
    fn test_report_serialises_to_json() {
        let index = Index::new();
        let report = run(&index).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["name"], "created");
        assert_eq!(json["steps"].as_array().unwrap().len(), 3);
    }
}

//! Template-based query planner.
//!
//! Fills fixed search templates from the current gaps. No model in the loop:
//! the templates mirror how a human researcher would phrase category probes
//! and entity lookups. Entity queries come first so budget truncation trims
//! category probes, not the priority entity.

use async_trait::async_trait;

use crate::collaborator::{PlannedQuery, Planner};
use crate::error::PlannerError;
use crate::evaluator::Focus;
use crate::types::{CandidateEntity, FactCategory, QueryFocus, Subject};

fn category_template(subject: &str, category: FactCategory) -> String {
    match category {
        FactCategory::Biographical => format!("{subject} biography background"),
        FactCategory::Professional => format!("{subject} career history roles"),
        FactCategory::Financial => format!("{subject} investments funding finances"),
        FactCategory::Behavioral => format!("{subject} public statements controversy"),
        FactCategory::Legal => format!("{subject} lawsuit legal issues"),
        FactCategory::Associations => format!("{subject} partners affiliations network"),
    }
}

/// Deterministic planner filling per-category and per-entity templates.
#[derive(Debug, Clone, Default)]
pub struct TemplatePlanner;

impl TemplatePlanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Planner for TemplatePlanner {
    async fn plan(
        &self,
        subject: &Subject,
        focus: &Focus,
        entity: Option<&CandidateEntity>,
    ) -> Result<Vec<PlannedQuery>, PlannerError> {
        let mut planned = Vec::new();

        if let Some(entity) = entity {
            planned.push(PlannedQuery {
                text: format!("{} {} relationship", entity.name, subject.name),
                focus: QueryFocus::Entity(entity.name.clone()),
            });
            planned.push(PlannedQuery {
                text: format!("{} background profile", entity.name),
                focus: QueryFocus::Entity(entity.name.clone()),
            });
        }

        for category in &focus.missing_categories {
            planned.push(PlannedQuery {
                text: category_template(&subject.name, *category),
                focus: QueryFocus::Category(*category),
            });
        }

        // Fully covered and no entity: probe generally rather than go silent.
        if planned.is_empty() {
            planned.push(PlannedQuery {
                text: format!("{} recent news", subject.name),
                focus: QueryFocus::General,
            });
        }

        Ok(planned)
    }
}

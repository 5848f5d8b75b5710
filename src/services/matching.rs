//! Rule evaluation. Pure functions over loaded rows; persistence of the
//! resulting workflow state lives in [`super::action_center`].

use std::cmp::Ordering;

use crate::{
    entity::{inspection, rule},
    services::checklist::ChecklistField,
};

/// City comparison used by rules and by the `city` filters: surrounding
/// whitespace and ASCII case are ignored.
pub fn same_city(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn rule_city(rule: &rule::Model) -> Option<&str> {
    rule.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

pub fn rule_matches(rule: &rule::Model, inspection: &inspection::Model) -> bool {
    let Some(field) = ChecklistField::parse(&rule.field) else {
        return false;
    };
    if inspection.checklist_value(field) != Some(rule.option_value.as_str()) {
        return false;
    }
    match rule_city(rule) {
        None => true,
        Some(city) => inspection
            .city
            .as_deref()
            .is_some_and(|c| same_city(c, city)),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub inspection: &'a inspection::Model,
    pub rule: &'a rule::Model,
}

impl Hit<'_> {
    pub fn key(&self) -> (i32, i32) {
        (self.inspection.id, self.rule.id)
    }
}

/// Action-center order: priority, newest inspection, then rule row.
fn hit_order(a: &Hit<'_>, b: &Hit<'_>) -> Ordering {
    a.rule
        .priority
        .rank()
        .cmp(&b.rule.priority.rank())
        .then_with(|| b.inspection.timestamp.cmp(&a.inspection.timestamp))
        .then_with(|| b.inspection.id.cmp(&a.inspection.id))
        .then_with(|| a.rule.id.cmp(&b.rule.id))
}

/// Every `(inspection, rule)` pair that fires, sorted for display.
pub fn evaluate<'a>(
    inspections: &'a [inspection::Model],
    rules: &'a [rule::Model],
) -> Vec<Hit<'a>> {
    let mut hits: Vec<Hit<'a>> = inspections
        .iter()
        .flat_map(|inspection| {
            rules
                .iter()
                .filter(move |rule| rule_matches(rule, inspection))
                .map(move |rule| Hit { inspection, rule })
        })
        .collect();
    hits.sort_by(hit_order);
    hits
}

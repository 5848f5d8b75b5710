//! Action center: rule validation, the computed match list joined with its
//! persisted workflow state, and the pending/done transitions.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ConnectionTrait;
use tracing::info;

use crate::{
    dto::{
        request::{AssignRequest, ConfirmRequest, MatchesQuery, RuleRequest},
        response::MatchResponse,
    },
    entity::{action_match, action_match::MatchStatus, inspection, rule, rule::Priority, user},
    error::{AppError, AppResult, FieldError},
    repositories,
    services::{
        checklist::ChecklistField,
        inspection::clean,
        matching::{self, same_city},
    },
};

/// A rule body that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDraft {
    pub rule_id: i32,
    pub city: Option<String>,
    pub field: ChecklistField,
    pub option_value: String,
    pub action_id: i32,
    pub priority: Priority,
    pub assignee_user_id: Option<i32>,
}

pub async fn validate_rule<C: ConnectionTrait>(db: &C, req: RuleRequest) -> AppResult<RuleDraft> {
    let mut errors = Vec::new();

    if req.rule_id <= 0 {
        errors.push(FieldError::body("rule_id", "rule_id must be a positive integer"));
    }

    let field = ChecklistField::parse(&req.field);
    match field {
        None => errors.push(FieldError::body(
            "field",
            format!(
                "'{}' is not a checklist field; expected one of: {}",
                req.field,
                crate::services::checklist::field_names()
            ),
        )),
        Some(field) if !field.accepts(&req.option_value) => {
            errors.push(FieldError::body("option_value", field.rejection(&req.option_value)))
        }
        Some(_) => {}
    }

    if repositories::action::find_by_id(db, req.action_id).await?.is_none() {
        errors.push(FieldError::body(
            "action_id",
            format!("Action {} does not exist", req.action_id),
        ));
    }

    if let Some(user_id) = req.assignee_user_id {
        if !repositories::user::exist_by_id(db, user_id).await? {
            errors.push(FieldError::body(
                "assignee_user_id",
                format!("User {user_id} does not exist"),
            ));
        }
    }

    match field {
        Some(field) if errors.is_empty() => Ok(RuleDraft {
            rule_id: req.rule_id,
            city: clean(req.city),
            field,
            option_value: req.option_value,
            action_id: req.action_id,
            priority: req.priority,
            assignee_user_id: req.assignee_user_id,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub city: Option<String>,
    pub status: Option<MatchStatus>,
    pub field: Option<ChecklistField>,
}

impl MatchFilter {
    pub fn from_query(query: MatchesQuery) -> AppResult<Self> {
        let field = match clean(query.field) {
            None => None,
            Some(raw) => Some(ChecklistField::parse(&raw).ok_or_else(|| {
                AppError::Validation(vec![FieldError::query(
                    "field",
                    format!("'{raw}' is not a checklist field"),
                )])
            })?),
        };
        Ok(Self {
            city: clean(query.city),
            status: query.status,
            field,
        })
    }
}

/// Every current match with its state, in action-center order.
#[tracing::instrument(skip_all)]
pub async fn list_matches<C: ConnectionTrait>(
    db: &C,
    filter: &MatchFilter,
) -> AppResult<Vec<MatchResponse>> {
    let mut inspections = repositories::inspection::find_all(db).await?;
    if let Some(city) = filter.city.as_deref() {
        inspections.retain(|i| i.city.as_deref().is_some_and(|c| same_city(c, city)));
    }

    let (rules, actions): (Vec<rule::Model>, Vec<Option<String>>) =
        repositories::rule::find_with_action(db, None, filter.field.map(ChecklistField::as_str))
            .await?
            .into_iter()
            .map(|(rule, action)| (rule, action.map(|a| a.name)))
            .unzip();
    let action_names: HashMap<i32, Option<String>> = rules
        .iter()
        .map(|r| r.id)
        .zip(actions)
        .collect();

    let states = repositories::action_match::find_all_keyed(db).await?;
    let usernames: HashMap<i32, String> = repositories::user::find_all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();
    let username = |id: Option<i32>| id.and_then(|id| usernames.get(&id).cloned());

    let rows = matching::evaluate(&inspections, &rules)
        .into_iter()
        .filter_map(|hit| {
            let state = states.get(&hit.key());
            let status = state.map(|s| s.status).unwrap_or_default();
            if filter.status.is_some_and(|wanted| wanted != status) {
                return None;
            }
            let match_assignee = state.and_then(|s| s.assignee_user_id);
            let match_assignee2 = state.and_then(|s| s.assignee2_user_id);
            Some(MatchResponse {
                inspection_id: hit.inspection.id,
                rule_id: hit.rule.id,
                rule_group: hit.rule.rule_id,
                city: hit.inspection.city.clone(),
                field: hit.rule.field.clone(),
                option_value: hit.rule.option_value.clone(),
                action_id: hit.rule.action_id,
                action_name: action_names.get(&hit.rule.id).cloned().flatten(),
                priority: hit.rule.priority,
                inspected_by: hit.inspection.inspected_by.clone(),
                timestamp: hit.inspection.timestamp,
                status,
                rule_assignee_user_id: hit.rule.assignee_user_id,
                rule_assignee_username: username(hit.rule.assignee_user_id),
                match_assignee_user_id: match_assignee,
                match_assignee_username: username(match_assignee),
                match_assignee2_user_id: match_assignee2,
                match_assignee2_username: username(match_assignee2),
                confirmed_by_username: state.and_then(|s| s.confirmed_by.clone()),
                confirmed_at: state.and_then(|s| s.confirmed_at),
                notes: state.and_then(|s| s.notes.clone()),
            })
        })
        .collect();
    Ok(rows)
}

/// The inspection and rule behind a pair, if the rule currently fires on it.
pub async fn require_current_match<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
) -> AppResult<(inspection::Model, rule::Model)> {
    let not_found = || AppError::NotFound("Match not found".to_string());
    let inspection = repositories::inspection::find_by_id(db, inspection_id)
        .await?
        .ok_or_else(not_found)?;
    let rule = repositories::rule::find_by_id(db, rule_id)
        .await?
        .ok_or_else(not_found)?;
    if !matching::rule_matches(&rule, &inspection) {
        return Err(not_found());
    }
    Ok((inspection, rule))
}

#[tracing::instrument(skip_all, fields(inspection_id = req.inspection_id, rule_id = req.rule_id))]
pub async fn confirm<C: ConnectionTrait>(
    db: &C,
    by: &user::Model,
    req: ConfirmRequest,
) -> AppResult<action_match::Model> {
    require_current_match(db, req.inspection_id, req.rule_id).await?;
    let state = repositories::action_match::set_done(
        db,
        req.inspection_id,
        req.rule_id,
        &by.username,
        Utc::now(),
        clean(req.notes),
    )
    .await?
    .ok_or_else(|| AppError::Conflict("Action already confirmed".to_string()))?;
    info!("Match confirmed by {}", by.username);
    Ok(state)
}

#[tracing::instrument(skip_all)]
pub async fn unconfirm<C: ConnectionTrait>(
    db: &C,
    inspection_id: i32,
    rule_id: i32,
) -> AppResult<action_match::Model> {
    require_current_match(db, inspection_id, rule_id).await?;
    repositories::action_match::set_pending(db, inspection_id, rule_id)
        .await?
        .ok_or_else(|| AppError::Conflict("Action is not confirmed".to_string()))
}

#[tracing::instrument(skip_all)]
pub async fn assign<C: ConnectionTrait>(
    db: &C,
    req: AssignRequest,
) -> AppResult<action_match::Model> {
    require_current_match(db, req.inspection_id, req.rule_id).await?;

    let mut errors = Vec::new();
    for (name, id) in [
        ("assignee_user_id", req.assignee_user_id),
        ("assignee2_user_id", req.assignee2_user_id),
    ] {
        if let Some(id) = id {
            if !repositories::user::exist_by_id(db, id).await? {
                errors.push(FieldError::body(name, format!("User {id} does not exist")));
            }
        }
    }
    if req.assignee_user_id.is_some() && req.assignee_user_id == req.assignee2_user_id {
        errors.push(FieldError::body(
            "assignee2_user_id",
            "The two assignees must be different users",
        ));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(repositories::action_match::set_assignees(
        db,
        req.inspection_id,
        req.rule_id,
        req.assignee_user_id,
        req.assignee2_user_id,
    )
    .await?)
}

/// Drops persisted state of pairs on this inspection that no longer match.
pub async fn prune_for_inspection<C: ConnectionTrait>(
    db: &C,
    inspection: &inspection::Model,
) -> AppResult<u64> {
    let mut dropped = 0;
    for state in repositories::action_match::find_by_inspection(db, inspection.id).await? {
        let still_matches = repositories::rule::find_by_id(db, state.rule_id)
            .await?
            .is_some_and(|rule| matching::rule_matches(&rule, inspection));
        if !still_matches {
            dropped += repositories::action_match::delete_by_id(db, state.id).await?;
        }
    }
    Ok(dropped)
}

/// Drops persisted state of pairs on this rule that no longer match.
pub async fn prune_for_rule<C: ConnectionTrait>(db: &C, rule: &rule::Model) -> AppResult<u64> {
    let mut dropped = 0;
    for state in repositories::action_match::find_by_rule(db, rule.id).await? {
        let still_matches = repositories::inspection::find_by_id(db, state.inspection_id)
            .await?
            .is_some_and(|inspection| matching::rule_matches(rule, &inspection));
        if !still_matches {
            dropped += repositories::action_match::delete_by_id(db, state.id).await?;
        }
    }
    Ok(dropped)
}

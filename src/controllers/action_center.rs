use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    dto::{
        request::{AssignRequest, ConfirmRequest, DeleteMatchesRequest, MatchKeyRequest, MatchesQuery},
        response::{DeletedResponse, MatchResponse, MatchStateResponse},
    },
    error::AppResult,
    repositories,
    services::action_center::{self, MatchFilter},
    utils::current_user::CurrentUser,
    ServiceState,
};

pub async fn matches(
    State(state): State<Arc<ServiceState>>,
    _current: CurrentUser,
    Query(query): Query<MatchesQuery>,
) -> AppResult<Json<Vec<MatchResponse>>> {
    let filter = MatchFilter::from_query(query)?;
    Ok(Json(
        action_center::list_matches(state.db.as_ref(), &filter).await?,
    ))
}

pub async fn confirm(
    State(state): State<Arc<ServiceState>>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<Json<MatchStateResponse>> {
    let tx = state.db.begin().await?;
    let confirmed = action_center::confirm(&tx, &current, req).await?;
    tx.commit().await?;
    Ok(Json(confirmed.into()))
}

pub async fn unconfirm(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<MatchKeyRequest>,
) -> AppResult<Json<MatchStateResponse>> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    let reopened = action_center::unconfirm(&tx, req.inspection_id, req.rule_id).await?;
    tx.commit().await?;

    info!(
        "Match ({}, {}) reopened by {}",
        req.inspection_id, req.rule_id, current.0.username
    );
    Ok(Json(reopened.into()))
}

pub async fn assign(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<AssignRequest>,
) -> AppResult<Json<MatchStateResponse>> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    let assigned = action_center::assign(&tx, req).await?;
    tx.commit().await?;

    info!(
        "Match ({}, {}) assigned by {}",
        assigned.inspection_id, assigned.rule_id, current.0.username
    );
    Ok(Json(assigned.into()))
}

pub async fn delete_matches(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<DeleteMatchesRequest>,
) -> AppResult<Json<DeletedResponse>> {
    current.require_admin()?;
    let deleted = repositories::action_match::delete_for_inspection(
        state.db.as_ref(),
        req.inspection_id,
        req.rule_id,
    )
    .await?;
    info!("Discarded {} match state(s) of inspection {}", deleted, req.inspection_id);
    Ok(Json(DeletedResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use reqwest::{multipart::Form, Client, StatusCode};
    use serde_json::{json, Value};

    use crate::{
        entity::user::Role,
        test_support::{seed_user, spawn_app, TestApp},
    };

    struct Desk {
        app: TestApp,
        http: Client,
        admin: String,
        supervisor: String,
    }

    impl Desk {
        async fn open() -> Self {
            let app = spawn_app().await;
            let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
            let (_, supervisor) = app.seed_and_login("sup@example.com", Role::Supervisor).await;
            Self {
                app,
                http,
                admin,
                supervisor,
            }
        }

        async fn call(&self, method: reqwest::Method, path: &str, token: &str, body: Value) -> reqwest::Response {
            self.http
                .request(method, self.app.endpoint(path))
                .bearer_auth(token)
                .json(&body)
                .send()
                .await
                .unwrap()
        }

        async fn json(&self, method: reqwest::Method, path: &str, token: &str, body: Value) -> Value {
            let response = self.call(method, path, token, body).await;
            assert!(response.status().is_success(), "{path}: {}", response.status());
            response.json().await.unwrap()
        }

        async fn inspect(&self, fields: &[(&str, &str)]) -> Value {
            let form = fields.iter().fold(Form::new(), |form, (name, value)| {
                form.text(name.to_string(), value.to_string())
            });
            self.http
                .post(self.app.endpoint("/inspections"))
                .bearer_auth(&self.supervisor)
                .multipart(form)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }

        async fn matches(&self, query: &[(&str, &str)]) -> Vec<Value> {
            self.http
                .get(self.app.endpoint("/actions/matches"))
                .bearer_auth(&self.supervisor)
                .query(query)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }

        /// One action and a helmet rule; returns the rule row id.
        async fn helmet_rule(&self, city: Option<&str>) -> i64 {
            let action = self
                .json(reqwest::Method::POST, "/actions", &self.admin, json!({ "name": "Warn rider" }))
                .await;
            let rule = self
                .json(
                    reqwest::Method::POST,
                    "/rules",
                    &self.admin,
                    json!({
                        "rule_id": 1,
                        "city": city,
                        "field": "helmet",
                        "option_value": "No",
                        "action_id": action["id"],
                        "priority": "high",
                    }),
                )
                .await;
            assert_eq!(rule["action_name"], "Warn rider");
            rule["id"].as_i64().unwrap()
        }
    }

    #[tokio::test]
    async fn matching_inspections_appear_pending_with_their_action() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(Some("Casablanca")).await;

        desk.inspect(&[("location", "Maarif"), ("city", "casablanca "), ("helmet", "No")]).await;
        desk.inspect(&[("location", "Agdal"), ("city", "Rabat"), ("helmet", "No")]).await;
        desk.inspect(&[("location", "Anfa"), ("city", "Casablanca"), ("helmet", "Yes")]).await;

        let rows = desk.matches(&[]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["rule_id"], rule);
        assert_eq!(rows[0]["status"], "pending");
        assert_eq!(rows[0]["action_name"], "Warn rider");
        assert_eq!(rows[0]["inspected_by"], "sup@example.com");

        assert!(desk.matches(&[("city", "Rabat")]).await.is_empty());
        assert!(desk.matches(&[("field", "box")]).await.is_empty());
        let bad_field = desk
            .http
            .get(desk.app.endpoint("/actions/matches"))
            .bearer_auth(&desk.supervisor)
            .query(&[("field", "colour")])
            .send()
            .await
            .unwrap();
        assert_eq!(bad_field.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn confirm_and_unconfirm_follow_the_pending_done_cycle() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(None).await;
        let inspection = desk.inspect(&[("location", "Maarif"), ("helmet", "No")]).await;
        let key = json!({ "inspection_id": inspection["id"], "rule_id": rule });
        let mut with_notes = key.clone();
        with_notes["notes"] = json!("called the rider");

        let done = desk
            .json(reqwest::Method::POST, "/actions/confirm", &desk.supervisor, with_notes.clone())
            .await;
        assert_eq!(done["status"], "done");
        assert_eq!(done["confirmed_by"], "sup@example.com");
        assert_eq!(done["notes"], "called the rider");

        let again = desk
            .call(reqwest::Method::POST, "/actions/confirm", &desk.supervisor, with_notes)
            .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let rows = desk.matches(&[("status", "done")]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["confirmed_by_username"], "sup@example.com");

        let by_supervisor = desk
            .call(reqwest::Method::POST, "/actions/unconfirm", &desk.supervisor, key.clone())
            .await;
        assert_eq!(by_supervisor.status(), StatusCode::FORBIDDEN);

        let reopened = desk
            .json(reqwest::Method::POST, "/actions/unconfirm", &desk.admin, key.clone())
            .await;
        assert_eq!(reopened["status"], "pending");
        assert_eq!(reopened["confirmed_by"], Value::Null);

        let not_done = desk
            .call(reqwest::Method::POST, "/actions/unconfirm", &desk.admin, key)
            .await;
        assert_eq!(not_done.status(), StatusCode::CONFLICT);
        assert_eq!(desk.matches(&[("status", "pending")]).await.len(), 1);
    }

    #[tokio::test]
    async fn pairs_that_do_not_match_cannot_be_confirmed() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(None).await;
        let inspection = desk.inspect(&[("location", "Maarif"), ("helmet", "Yes")]).await;

        let response = desk
            .call(
                reqwest::Method::POST,
                "/actions/confirm",
                &desk.supervisor,
                json!({ "inspection_id": inspection["id"], "rule_id": rule }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Match not found");
    }

    #[tokio::test]
    async fn assignment_checks_users_and_shows_in_the_list() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(None).await;
        let inspection = desk.inspect(&[("location", "Maarif"), ("helmet", "No")]).await;
        let first = seed_user(desk.app.db(), "a1@example.com", "password123", Role::User).await;
        let second = seed_user(desk.app.db(), "a2@example.com", "password123", Role::User).await;

        let same = desk
            .call(
                reqwest::Method::POST,
                "/actions/assign",
                &desk.admin,
                json!({
                    "inspection_id": inspection["id"],
                    "rule_id": rule,
                    "assignee_user_id": first.id,
                    "assignee2_user_id": first.id,
                }),
            )
            .await;
        assert_eq!(same.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unknown = desk
            .call(
                reqwest::Method::POST,
                "/actions/assign",
                &desk.admin,
                json!({ "inspection_id": inspection["id"], "rule_id": rule, "assignee_user_id": 4242 }),
            )
            .await;
        assert_eq!(unknown.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let assigned = desk
            .json(
                reqwest::Method::POST,
                "/actions/assign",
                &desk.admin,
                json!({
                    "inspection_id": inspection["id"],
                    "rule_id": rule,
                    "assignee_user_id": first.id,
                    "assignee2_user_id": second.id,
                }),
            )
            .await;
        assert_eq!(assigned["status"], "pending");

        let rows = desk.matches(&[]).await;
        assert_eq!(rows[0]["match_assignee_username"], "a1@example.com");
        assert_eq!(rows[0]["match_assignee2_username"], "a2@example.com");
    }

    #[tokio::test]
    async fn editing_an_inspection_away_from_a_rule_drops_its_state() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(None).await;
        let inspection = desk.inspect(&[("location", "Maarif"), ("helmet", "No")]).await;
        desk.json(
            reqwest::Method::POST,
            "/actions/confirm",
            &desk.supervisor,
            json!({ "inspection_id": inspection["id"], "rule_id": rule }),
        )
        .await;

        let form = Form::new()
            .text("location", "Maarif")
            .text("helmet", "Yes");
        let response = desk
            .http
            .put(desk.app.endpoint(&format!("/inspections/{}", inspection["id"])))
            .bearer_auth(&desk.supervisor)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(desk.matches(&[]).await.is_empty());

        let form = Form::new().text("location", "Maarif").text("helmet", "No");
        desk.http
            .put(desk.app.endpoint(&format!("/inspections/{}", inspection["id"])))
            .bearer_auth(&desk.supervisor)
            .multipart(form)
            .send()
            .await
            .unwrap();
        let rows = desk.matches(&[]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "pending");
    }

    #[tokio::test]
    async fn admins_discard_match_state() {
        let desk = Desk::open().await;
        let rule = desk.helmet_rule(None).await;
        let inspection = desk.inspect(&[("location", "Maarif"), ("helmet", "No")]).await;
        desk.json(
            reqwest::Method::POST,
            "/actions/confirm",
            &desk.supervisor,
            json!({ "inspection_id": inspection["id"], "rule_id": rule }),
        )
        .await;

        let body = json!({ "inspection_id": inspection["id"] });
        let refused = desk
            .call(reqwest::Method::DELETE, "/actions/matches", &desk.supervisor, body.clone())
            .await;
        assert_eq!(refused.status(), StatusCode::FORBIDDEN);

        let deleted = desk
            .json(reqwest::Method::DELETE, "/actions/matches", &desk.admin, body)
            .await;
        assert_eq!(deleted["deleted"], 1);
        assert_eq!(desk.matches(&[]).await[0]["status"], "pending");
    }
}

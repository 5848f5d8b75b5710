use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::TransactionTrait;
use tracing::info;

use crate::{
    dto::{request::RiderRequest, response::RiderResponse},
    error::{AppError, AppResult, FieldError},
    repositories::rider,
    utils::current_user::CurrentUser,
    ServiceState,
};

fn rider_not_found() -> AppError {
    AppError::NotFound("Rider not found".to_string())
}

/// Trims the required names and rejects blanks.
fn validated(mut req: RiderRequest) -> AppResult<RiderRequest> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("first_name", &mut req.first_name),
        ("first_last_name", &mut req.first_last_name),
        ("id_number", &mut req.id_number),
    ] {
        *value = value.trim().to_string();
        if value.is_empty() {
            errors.push(FieldError::body(field, format!("{field} must not be blank")));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    req.city_code = req.city_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    req.vehicle_type = req
        .vehicle_type
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    Ok(req)
}

pub async fn list(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
) -> AppResult<Json<Vec<RiderResponse>>> {
    current.require_admin()?;
    let riders = rider::find_all(state.db.as_ref()).await?;
    Ok(Json(riders.into_iter().map(RiderResponse::from).collect()))
}

pub async fn create(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<RiderRequest>,
) -> AppResult<Json<RiderResponse>> {
    current.require_admin()?;
    let created = rider::save(state.db.as_ref(), validated(req)?).await?;
    info!("🛵 Rider {} created", created.rider_id);
    Ok(Json(created.into()))
}

pub async fn update(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(rider_id): Path<i32>,
    Json(req): Json<RiderRequest>,
) -> AppResult<Json<RiderResponse>> {
    current.require_admin()?;
    let req = validated(req)?;

    let tx = state.db.begin().await?;
    let existing = rider::find_by_id(&tx, rider_id)
        .await?
        .ok_or_else(rider_not_found)?;
    let updated = rider::replace(&tx, existing, req).await?;
    tx.commit().await?;

    info!("🛵 Rider {} updated", rider_id);
    Ok(Json(updated.into()))
}

pub async fn delete(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Path(rider_id): Path<i32>,
) -> AppResult<StatusCode> {
    current.require_admin()?;

    let tx = state.db.begin().await?;
    if rider::find_by_id(&tx, rider_id).await?.is_none() {
        return Err(rider_not_found());
    }
    rider::delete(&tx, rider_id).await?;
    tx.commit().await?;

    info!("🛵 Rider {} deleted", rider_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use reqwest::{multipart::Form, StatusCode};
    use serde_json::{json, Value};

    use crate::{entity::user::Role, test_support::spawn_app};

    #[tokio::test]
    async fn blank_names_are_rejected_and_supervisors_refused() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let (_, supervisor) = app.seed_and_login("sup@example.com", Role::Supervisor).await;
        let body = json!({ "first_name": " ", "first_last_name": "Amrani", "id_number": "" });

        let blank = http
            .post(app.endpoint("/riders"))
            .bearer_auth(&admin)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail: Value = blank.json().await.unwrap();
        assert_eq!(detail["detail"].as_array().unwrap().len(), 2);

        let refused = http
            .get(app.endpoint("/riders"))
            .bearer_auth(&supervisor)
            .send()
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn deleting_a_rider_keeps_the_inspections() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let rider: Value = http
            .post(app.endpoint("/riders"))
            .bearer_auth(&admin)
            .json(&json!({
                "first_name": "Salma",
                "first_last_name": "Idrissi",
                "id_number": "AB777",
                "city_code": "",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(rider["city_code"], Value::Null);

        let inspection: Value = http
            .post(app.endpoint("/inspections"))
            .bearer_auth(&admin)
            .multipart(Form::new().text("rider_id", rider["rider_id"].to_string()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(inspection["rider_id"], rider["rider_id"]);

        let path = format!("/riders/{}", rider["rider_id"]);
        let deleted = http
            .delete(app.endpoint(&path))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let inspections: Vec<Value> = http
            .get(app.endpoint("/inspections"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(inspections.len(), 1);
        assert_eq!(inspections[0]["rider_id"], Value::Null);

        let missing = http
            .put(app.endpoint(&path))
            .bearer_auth(&admin)
            .json(&json!({ "first_name": "S", "first_last_name": "I", "id_number": "AB777" }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}

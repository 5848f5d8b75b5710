use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::{
    dto::{
        request::{LocationRequest, LocationsQuery},
        response::LocationResponse,
    },
    error::{AppError, AppResult, FieldError},
    repositories::location,
    services::inspection::clean,
    utils::current_user::CurrentUser,
    ServiceState,
};

const HISTORY_LIMIT: u64 = 500;

fn validate(req: &LocationRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    if !(-90.0..=90.0).contains(&req.latitude) {
        errors.push(FieldError::body("latitude", "latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&req.longitude) {
        errors.push(FieldError::body("longitude", "longitude must be between -180 and 180"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn record(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<LocationResponse>> {
    current.require_supervisor()?;
    validate(&req)?;
    let saved = location::save(
        state.db.as_ref(),
        &current.0.username,
        req.latitude,
        req.longitude,
    )
    .await?;
    info!("📍 Location ping from {}", saved.username);
    Ok(Json(saved.into()))
}

pub async fn history(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
    Query(query): Query<LocationsQuery>,
) -> AppResult<Json<Vec<LocationResponse>>> {
    current.require_admin()?;
    let username = clean(query.username);
    let pings = location::find_recent(state.db.as_ref(), username.as_deref(), HISTORY_LIMIT).await?;
    Ok(Json(pings.into_iter().map(LocationResponse::from).collect()))
}

/// Latest ping of every user, newest first.
pub async fn last_locations(
    State(state): State<Arc<ServiceState>>,
    current: CurrentUser,
) -> AppResult<Json<Vec<LocationResponse>>> {
    current.require_admin()?;
    let latest = location::find_latest_per_user(state.db.as_ref()).await?;
    Ok(Json(latest.into_iter().map(LocationResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::{entity::user::Role, test_support::spawn_app};

    #[tokio::test]
    async fn last_locations_pick_each_users_newest_ping_by_time() {
        use crate::entity::location;
        use chrono::{TimeDelta, Utc};
        use sea_orm::{ActiveModelTrait, Set};

        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let now = Utc::now();
        // Inserted out of time order so row order and time order disagree.
        for (username, latitude, minutes_ago) in [
            ("s1@example.com", 31.0, 1),
            ("s1@example.com", 30.0, 10),
            ("s2@example.com", 40.0, 30),
            ("s1@example.com", 29.0, 20),
            ("s2@example.com", 41.0, 5),
            ("s3@example.com", 50.0, 60),
        ] {
            location::ActiveModel {
                username: Set(username.to_string()),
                latitude: Set(latitude),
                longitude: Set(-7.6),
                timestamp: Set(now - TimeDelta::minutes(minutes_ago)),
                ..Default::default()
            }
            .insert(app.db())
            .await
            .unwrap();
        }

        let latest: Vec<Value> = http
            .get(app.endpoint("/api/last-locations"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let picked: Vec<_> = latest
            .iter()
            .map(|p| (p["username"].as_str().unwrap(), p["latitude"].as_f64().unwrap()))
            .collect();
        assert_eq!(
            picked,
            vec![
                ("s1@example.com", 31.0),
                ("s2@example.com", 41.0),
                ("s3@example.com", 50.0)
            ]
        );
    }

    #[tokio::test]
    async fn only_supervisors_send_pings_and_only_admins_read_them() {
        let app = spawn_app().await;
        let (http, admin) = app.seed_and_login("ana@example.com", Role::Admin).await;
        let (_, first) = app.seed_and_login("s1@example.com", Role::Supervisor).await;
        let (_, second) = app.seed_and_login("s2@example.com", Role::Supervisor).await;

        let ping = |token: &str, lat: f64, long: f64| {
            http.post(app.endpoint("/api/locations"))
                .bearer_auth(token.to_string())
                .json(&json!({ "latitude": lat, "longitude": long }))
                .send()
        };

        assert_eq!(ping(&admin, 33.5, -7.6).await.unwrap().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ping(&first, 95.0, -7.6).await.unwrap().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        for (token, lat) in [(&first, 33.1), (&second, 34.0), (&first, 33.2)] {
            assert_eq!(ping(token, lat, -7.6).await.unwrap().status(), StatusCode::OK);
        }

        let refused = http
            .get(app.endpoint("/api/locations"))
            .bearer_auth(&first)
            .send()
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::FORBIDDEN);

        let history: Vec<Value> = http
            .get(app.endpoint("/api/locations"))
            .bearer_auth(&admin)
            .query(&[("username", "s1@example.com")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|p| p["username"] == "s1@example.com"));

        let latest: Vec<Value> = http
            .get(app.endpoint("/api/last-locations"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest.len(), 2);
        let s1 = latest
            .iter()
            .find(|p| p["username"] == "s1@example.com")
            .unwrap();
        assert_eq!(s1["latitude"], 33.2);
    }
}

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::TransactionTrait;
use tracing::{info, warn};

use crate::{
    dto::{
        request::{InspectionForm, InspectionSearchQuery, UploadedImage},
        response::InspectionResponse,
    },
    entity::inspection,
    error::{AppError, AppResult},
    repositories,
    services::{action_center, inspection as inspections},
    utils::{current_user::CurrentUser, upload},
    ServiceState,
};

fn inspection_not_found() -> AppError {
    AppError::NotFound("Inspection not found".to_string())
}

fn permission_denied() -> AppError {
    AppError::Forbidden("Permission denied".to_string())
}

/// Collects the multipart parts. An empty `image` part counts as no image.
async fn read_form(mut multipart: Multipart) -> AppResult<InspectionForm> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        warn!("Malformed inspection form: {}", e);
        AppError::BadRequest(format!("Malformed multipart body: {e}"))
    };

    let mut form = InspectionForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(malformed)?;
            if !bytes.is_empty() {
                form.image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(malformed)?;
            form.set(&name, value);
        }
    }
    Ok(form)
}

async fn store_image(state: &ServiceState, image: Option<UploadedImage>) -> AppResult<Option<String>> {
    match image {
        Some(image) => Ok(Some(
            upload::save_image(&state.config.upload.dir, image.file_name.as_deref(), &image.bytes)
                .await?,
        )),
        None => Ok(None),
    }
}

/// Removes a freshly stored image when the write it belongs to failed.
async fn discard_on_error<T>(
    state: &ServiceState,
    image_url: Option<&str>,
    outcome: AppResult<T>,
) -> AppResult<T> {
    if outcome.is_err() {
        if let Some(url) = image_url {
            upload::remove_image(&state.config.upload.dir, url).await;
        }
    }
    outcome
}

fn to_responses(models: Vec<inspection::Model>) -> Json<Vec<InspectionResponse>> {
    Json(models.into_iter().map(InspectionResponse::from).collect())
}

pub async fn list(
    State(state): State<Arc<ServiceState>>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<InspectionResponse>>> {
    Ok(to_responses(
        repositories::inspection::find_all(state.db.as_ref()).await?,
    ))
}

pub async fn search(
    State(state): State<Arc<ServiceState>>,
    _current: CurrentUser,
    Query(query): Query<InspectionSearchQuery>,
) -> AppResult<Json<Vec<InspectionResponse>>> {
    let city = inspections::clean(query.city);
    let location = inspections::clean(query.location);
    Ok(to_responses(
        repositories::inspection::search(state.db.as_ref(), city.as_deref(), location.as_deref())
            .await?,
    ))
}

pub async fn create(
    State(state): State<Arc<ServiceState>>,
    CurrentUser(current): CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<InspectionResponse>> {
    let mut form = read_form(multipart).await?;
    let image = form.image.take();

    let tx = state.db.begin().await?;
    let draft = inspections::resolve_draft(&tx, form).await?;
    let image_url = store_image(&state, image).await?;
    let saved = async {
        let created =
            repositories::inspection::save(&tx, draft, &current.username, image_url.clone())
                .await?;
        tx.commit().await?;
        Ok::<_, AppError>(created)
    }
    .await;
    let created = discard_on_error(&state, image_url.as_deref(), saved).await?;

    info!("📋 Inspection {} recorded by {}", created.id, current.username);
    Ok(Json(created.into()))
}

pub async fn update(
    State(state): State<Arc<ServiceState>>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<InspectionResponse>> {
    let mut form = read_form(multipart).await?;
    let image = form.image.take();

    let tx = state.db.begin().await?;
    let existing = repositories::inspection::find_by_id(&tx, id)
        .await?
        .ok_or_else(inspection_not_found)?;
    if !inspections::can_modify(&current, &existing) {
        warn!("{} may not edit inspection {}", current.username, id);
        return Err(permission_denied());
    }

    let draft = inspections::resolve_draft(&tx, form).await?;
    let previous_image = existing.image_url.clone();
    let image_url = store_image(&state, image).await?;
    let replaced_image = image_url.is_some();
    let written = async {
        let updated =
            repositories::inspection::replace(&tx, existing, draft, image_url.clone()).await?;
        let dropped = action_center::prune_for_inspection(&tx, &updated).await?;
        tx.commit().await?;
        Ok::<_, AppError>((updated, dropped))
    }
    .await;
    let (updated, dropped) = discard_on_error(&state, image_url.as_deref(), written).await?;

    if replaced_image {
        if let Some(old) = previous_image {
            upload::remove_image(&state.config.upload.dir, &old).await;
        }
    }
    info!(
        "📋 Inspection {} updated by {} ({} stale match state(s) dropped)",
        id, current.username, dropped
    );
    Ok(Json(updated.into()))
}

pub async fn delete(
    State(state): State<Arc<ServiceState>>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let tx = state.db.begin().await?;
    let existing = repositories::inspection::find_by_id(&tx, id)
        .await?
        .ok_or_else(inspection_not_found)?;
    if !inspections::can_modify(&current, &existing) {
        warn!("{} may not delete inspection {}", current.username, id);
        return Err(permission_denied());
    }
    repositories::inspection::delete(&tx, id).await?;
    tx.commit().await?;

    if let Some(url) = existing.image_url {
        upload::remove_image(&state.config.upload.dir, &url).await;
    }
    info!("📋 Inspection {} deleted by {}", id, current.username);
    Ok(StatusCode::NO_CONTENT)
}

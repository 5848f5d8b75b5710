use sea_orm::ConnectionTrait;

use crate::{
    dto::request::InspectionForm,
    entity::{inspection, user, user::Role},
    error::{AppError, AppResult, FieldError},
    repositories,
    services::checklist::ChecklistField,
};

pub const MISSING_IDENTITY: &str =
    "You must provide at least rider_id, id_number, or location for an inspection";

/// Validated inspection columns. `inspected_by` and the image are supplied
/// separately by the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionDraft {
    pub rider_id: Option<i32>,
    pub id_number: Option<String>,
    pub box_serial_number: Option<String>,
    pub plate_number: Option<String>,
    pub helmet: Option<String>,
    pub box_status: Option<String>,
    pub account: Option<String>,
    pub parking: Option<String>,
    pub appearance: Option<String>,
    pub driving: Option<String>,
    pub mfc_status: Option<String>,
    pub courier_behavior: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub comments: Option<String>,
}

impl InspectionDraft {
    fn checklist_value(&self, field: ChecklistField) -> Option<&str> {
        let value = match field {
            ChecklistField::Helmet => &self.helmet,
            ChecklistField::Box => &self.box_status,
            ChecklistField::Account => &self.account,
            ChecklistField::Parking => &self.parking,
            ChecklistField::Appearance => &self.appearance,
            ChecklistField::Driving => &self.driving,
            ChecklistField::MfcStatus => &self.mfc_status,
            ChecklistField::CourierBehavior => &self.courier_behavior,
        };
        value.as_deref()
    }
}

/// Trims and drops blank values.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_rider_id(raw: Option<String>) -> AppResult<Option<i32>> {
    match clean(raw) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AppError::BadRequest("rider_id must be an integer or blank".to_string())),
    }
}

/// Checks everything that does not need the database.
pub fn draft_from_form(form: InspectionForm) -> AppResult<InspectionDraft> {
    let draft = InspectionDraft {
        rider_id: parse_rider_id(form.rider_id)?,
        id_number: clean(form.id_number),
        box_serial_number: clean(form.box_serial_number),
        plate_number: clean(form.plate_number),
        helmet: clean(form.helmet),
        box_status: clean(form.box_status),
        account: clean(form.account),
        parking: clean(form.parking),
        appearance: clean(form.appearance),
        driving: clean(form.driving),
        mfc_status: clean(form.mfc_status),
        courier_behavior: clean(form.courier_behavior),
        city: clean(form.city),
        location: clean(form.location),
        comments: clean(form.comments),
    };

    if draft.rider_id.is_none() && draft.id_number.is_none() && draft.location.is_none() {
        return Err(AppError::Unprocessable(MISSING_IDENTITY.to_string()));
    }

    let errors: Vec<FieldError> = ChecklistField::ALL
        .into_iter()
        .filter_map(|field| {
            let value = draft.checklist_value(field)?;
            (!field.accepts(value)).then(|| FieldError::body(field.as_str(), field.rejection(value)))
        })
        .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(draft)
}

/// Validates the form and links the rider: an explicit `rider_id` must exist,
/// otherwise the rider is looked up by `id_number`.
pub async fn resolve_draft<C: ConnectionTrait>(
    db: &C,
    form: InspectionForm,
) -> AppResult<InspectionDraft> {
    let mut draft = draft_from_form(form)?;

    match draft.rider_id {
        Some(rider_id) => {
            if repositories::rider::find_by_id(db, rider_id).await?.is_none() {
                return Err(AppError::invalid_field(
                    "rider_id",
                    format!("Rider {rider_id} does not exist"),
                ));
            }
        }
        None => {
            if let Some(id_number) = draft.id_number.as_deref() {
                draft.rider_id = repositories::rider::find_by_id_number(db, id_number)
                    .await?
                    .map(|r| r.rider_id);
            }
        }
    }

    Ok(draft)
}

/// Admins may edit anything; supervisors only what they recorded.
pub fn can_modify(user: &user::Model, inspection: &inspection::Model) -> bool {
    user.is_admin() || (user.role == Role::Supervisor && inspection.inspected_by == user.username)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{action_match::MatchStatus, rule::Priority, user::Role};

/// `POST /token`, form-encoded like an OAuth2 password grant.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Supervisor
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateUserForm {
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RiderRequest {
    pub first_name: String,
    pub first_last_name: String,
    pub id_number: String,
    pub city_code: Option<String>,
    pub vehicle_type: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw multipart fields of an inspection submission, before validation.
#[derive(Debug, Clone, Default)]
pub struct InspectionForm {
    pub rider_id: Option<String>,
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
    pub image: Option<UploadedImage>,
}

impl InspectionForm {
    /// Stores a text part. Unknown names (including `inspected_by`) are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "rider_id" => &mut self.rider_id,
            "id_number" => &mut self.id_number,
            "box_serial_number" => &mut self.box_serial_number,
            "plate_number" => &mut self.plate_number,
            "helmet" => &mut self.helmet,
            "box" => &mut self.box_status,
            "account" => &mut self.account,
            "parking" => &mut self.parking,
            "appearance" => &mut self.appearance,
            "driving" => &mut self.driving,
            "mfc_status" => &mut self.mfc_status,
            "courier_behavior" => &mut self.courier_behavior,
            "city" => &mut self.city,
            "location" => &mut self.location,
            "comments" => &mut self.comments,
            _ => return,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InspectionSearchQuery {
    pub city: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleRequest {
    pub rule_id: i32,
    pub city: Option<String>,
    pub field: String,
    pub option_value: String,
    pub action_id: i32,
    #[serde(default)]
    pub priority: Priority,
    pub assignee_user_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RulesQuery {
    pub rule_id: Option<i32>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchesQuery {
    pub city: Option<String>,
    pub status: Option<MatchStatus>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfirmRequest {
    pub inspection_id: i32,
    pub rule_id: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchKeyRequest {
    pub inspection_id: i32,
    pub rule_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssignRequest {
    pub inspection_id: i32,
    pub rule_id: i32,
    pub assignee_user_id: Option<i32>,
    pub assignee2_user_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeleteMatchesRequest {
    pub inspection_id: i32,
    pub rule_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationsQuery {
    pub username: Option<String>,
}

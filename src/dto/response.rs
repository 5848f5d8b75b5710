use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{
    action, action_match, action_match::MatchStatus, inspection, location, rider, rule,
    rule::Priority, user, user::Role,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            is_verified: model.is_verified,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderResponse {
    pub rider_id: i32,
    pub first_name: String,
    pub first_last_name: String,
    pub id_number: String,
    pub city_code: Option<String>,
    pub vehicle_type: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<rider::Model> for RiderResponse {
    fn from(model: rider::Model) -> Self {
        Self {
            rider_id: model.rider_id,
            first_name: model.first_name,
            first_last_name: model.first_last_name,
            id_number: model.id_number,
            city_code: model.city_code,
            vehicle_type: model.vehicle_type,
            joined_at: model.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionResponse {
    pub id: i32,
    pub rider_id: Option<i32>,
    pub id_number: Option<String>,
    pub box_serial_number: Option<String>,
    pub plate_number: Option<String>,
    pub inspected_by: String,
    pub helmet: Option<String>,
    #[serde(rename = "box")]
    pub box_status: Option<String>,
    pub account: Option<String>,
    pub parking: Option<String>,
    pub appearance: Option<String>,
    pub driving: Option<String>,
    pub mfc_status: Option<String>,
    pub courier_behavior: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<inspection::Model> for InspectionResponse {
    fn from(model: inspection::Model) -> Self {
        Self {
            id: model.id,
            rider_id: model.rider_id,
            id_number: model.id_number,
            box_serial_number: model.box_serial_number,
            plate_number: model.plate_number,
            inspected_by: model.inspected_by,
            helmet: model.helmet,
            box_status: model.box_status,
            account: model.account,
            parking: model.parking,
            appearance: model.appearance,
            driving: model.driving,
            mfc_status: model.mfc_status,
            courier_behavior: model.courier_behavior,
            city: model.city,
            location: model.location,
            image_url: model.image_url,
            comments: model.comments,
            timestamp: model.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<action::Model> for ActionResponse {
    fn from(model: action::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResponse {
    pub id: i32,
    pub rule_id: i32,
    pub city: Option<String>,
    pub field: String,
    pub option_value: String,
    pub action_id: i32,
    pub action_name: Option<String>,
    pub priority: Priority,
    pub assignee_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl RuleResponse {
    pub fn new(model: rule::Model, action: Option<action::Model>) -> Self {
        Self {
            id: model.id,
            rule_id: model.rule_id,
            city: model.city,
            field: model.field,
            option_value: model.option_value,
            action_id: model.action_id,
            action_name: action.map(|a| a.name),
            priority: model.priority,
            assignee_user_id: model.assignee_user_id,
            created_at: model.created_at,
        }
    }
}

/// One row of the action center: a rule firing on an inspection, joined with
/// its workflow state. `rule_id` is the rule row id; `rule_group` its group number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub inspection_id: i32,
    pub rule_id: i32,
    pub rule_group: i32,
    pub city: Option<String>,
    pub field: String,
    pub option_value: String,
    pub action_id: i32,
    pub action_name: Option<String>,
    pub priority: Priority,
    pub inspected_by: String,
    pub timestamp: DateTime<Utc>,
    pub status: MatchStatus,
    pub rule_assignee_user_id: Option<i32>,
    pub rule_assignee_username: Option<String>,
    pub match_assignee_user_id: Option<i32>,
    pub match_assignee_username: Option<String>,
    pub match_assignee2_user_id: Option<i32>,
    pub match_assignee2_username: Option<String>,
    pub confirmed_by_username: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStateResponse {
    pub inspection_id: i32,
    pub rule_id: i32,
    pub status: MatchStatus,
    pub assignee_user_id: Option<i32>,
    pub assignee2_user_id: Option<i32>,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<action_match::Model> for MatchStateResponse {
    fn from(model: action_match::Model) -> Self {
        Self {
            inspection_id: model.inspection_id,
            rule_id: model.rule_id,
            status: model.status,
            assignee_user_id: model.assignee_user_id,
            assignee2_user_id: model.assignee2_user_id,
            confirmed_by: model.confirmed_by,
            confirmed_at: model.confirmed_at,
            notes: model.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResponse {
    pub id: i32,
    pub username: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<location::Model> for LocationResponse {
    fn from(model: location::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            latitude: model.latitude,
            longitude: model.longitude,
            timestamp: model.timestamp,
        }
    }
}

//! Request bodies of the REST API and the checks they must pass before a handler runs.
//!
//! Bodies use `#[serde(default)]` so that a missing field reaches validation and is
//! reported by name instead of failing deserialization.

use serde::Deserialize;
use serde_json::Value;

use tembea_core::domain::route::{parse_take_off, RouteBatchChanges};
use tembea_core::validation::{
    is_valid_email, is_valid_phone_no, validate_team_url, FieldError, Validate, ValidationResult,
    Violations, TEAM_URL_HINT,
};
use tembea_core::{
    DepartmentId, DepartmentSelector, DriverChanges, HomebaseId, NewCab, NewDriver, ProviderId,
};

use crate::services::route::{BatchSpec, Destination, NewRouteWithBatch, RouteApproval};

/// Capacities arrive as numbers or numeric strings.
fn number_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn positive_number(value: Option<&Value>) -> Option<u32> {
    number_text(value).trim().parse::<u32>().ok().filter(|number| *number > 0)
}

fn email(violations: &mut Violations, field: &str, value: &str) {
    if !value.trim().is_empty() {
        violations.check(is_valid_email(value), field, format!("Please provide a valid {field}"));
    }
}

fn optional_email(violations: &mut Violations, field: &str, value: Option<&String>) {
    if let Some(value) = value {
        violations.check(is_valid_email(value), field, format!("Please provide a valid {field}"));
    }
}

fn optional_phone(violations: &mut Violations, field: &str, value: Option<&String>) {
    if let Some(value) = value {
        let message = format!("Please provide a valid {field}");
        violations.check(is_valid_phone_no(value), field, message);
    }
}

fn team_url(violations: &mut Violations, field: &str, value: &str) {
    violations.check(validate_team_url(value), field, TEAM_URL_HINT);
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewHomebaseBody {
    pub homebase_name: String,
    pub country_name: String,
}

impl Validate for NewHomebaseBody {
    fn validate(&self) -> ValidationResult {
        Violations::new()
            .require("homebaseName", &self.homebase_name)
            .require("countryName", &self.country_name)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewDepartmentBody {
    pub name: String,
    pub email: String,
    pub homebase_id: Option<HomebaseId>,
}

impl Validate for NewDepartmentBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations.require("name", &self.name).require("email", &self.email);
        email(&mut violations, "email", &self.email);
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateDepartmentBody {
    pub name: String,
    pub new_name: Option<String>,
    pub new_head_email: Option<String>,
}

impl Validate for UpdateDepartmentBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations.require("name", &self.name).check(
            self.new_name.is_some() || self.new_head_email.is_some(),
            "newName",
            "Provide a newName or a newHeadEmail to update the department",
        );
        optional_email(&mut violations, "newHeadEmail", self.new_head_email.as_ref());
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteDepartmentBody {
    pub id: Option<DepartmentId>,
    pub name: Option<String>,
}

impl DeleteDepartmentBody {
    /// The id wins when both are given.
    pub fn selector(&self) -> Option<DepartmentSelector> {
        match (self.id, self.name.as_deref().map(str::trim)) {
            (Some(id), _) => Some(DepartmentSelector::Id(id)),
            (None, Some(name)) if !name.is_empty() => {
                Some(DepartmentSelector::Name(name.to_string()))
            }
            _ => None,
        }
    }
}

impl Validate for DeleteDepartmentBody {
    fn validate(&self) -> ValidationResult {
        Violations::new()
            .check(self.selector().is_some(), "id", "Provide the id or the name of the department")
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewRoleBody {
    pub role_name: String,
}

impl Validate for NewRoleBody {
    fn validate(&self) -> ValidationResult {
        Violations::new().require("roleName", &self.role_name).finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssignRoleBody {
    pub email: String,
    pub role_name: String,
    pub homebase_id: Option<HomebaseId>,
}

impl Validate for AssignRoleBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations.require("email", &self.email).require("roleName", &self.role_name);
        email(&mut violations, "email", &self.email);
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewUserBody {
    pub slack_url: String,
    pub email: String,
}

impl Validate for NewUserBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        team_url(&mut violations, "slackUrl", &self.slack_url);
        violations.require("email", &self.email);
        email(&mut violations, "email", &self.email);
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub slack_url: String,
    pub email: String,
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_phone_no: Option<String>,
}

impl Validate for UpdateUserBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        team_url(&mut violations, "slackUrl", &self.slack_url);
        violations.require("email", &self.email);
        email(&mut violations, "email", &self.email);
        violations.check(
            self.new_name.is_some() || self.new_email.is_some() || self.new_phone_no.is_some(),
            "newName",
            "Provide at least one of newName, newEmail or newPhoneNo",
        );
        optional_email(&mut violations, "newEmail", self.new_email.as_ref());
        optional_phone(&mut violations, "newPhoneNo", self.new_phone_no.as_ref());
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DestinationBody {
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewRouteBody {
    pub route_name: String,
    pub destination: DestinationBody,
    pub take_off_time: String,
    pub capacity: Option<Value>,
    pub provider_id: Option<ProviderId>,
    pub image_url: Option<String>,
}

impl NewRouteBody {
    pub fn into_route(self) -> NewRouteWithBatch {
        let coordinates = self.destination.coordinates.unwrap_or_default();
        NewRouteWithBatch {
            batch: BatchSpec {
                take_off: self.take_off_time,
                capacity: positive_number(self.capacity.as_ref()).unwrap_or_default(),
                provider_id: self.provider_id,
            },
            route_name: self.route_name,
            destination: Destination {
                address: self.destination.address,
                latitude: coordinates.lat,
                longitude: coordinates.lng,
            },
            image_url: self.image_url,
        }
    }
}

impl Validate for NewRouteBody {
    fn validate(&self) -> ValidationResult {
        Violations::new()
            .require("routeName", &self.route_name)
            .require("destination.address", &self.destination.address)
            .check(
                self.destination.coordinates.is_some(),
                "destination.coordinates",
                "Please Provide a destination.coordinates",
            )
            .check(
                parse_take_off(&self.take_off_time).is_ok(),
                "takeOffTime",
                "takeOffTime must be in the 24 hour format hh:mm",
            )
            .number("capacity", &number_text(self.capacity.as_ref()))
            .require_some("providerId", self.provider_id.as_ref())
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateRouteBatchBody {
    #[serde(flatten)]
    pub changes: RouteBatchChanges,
    pub team_url: Option<String>,
}

impl Validate for UpdateRouteBatchBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        if let Some(take_off) = self.changes.take_off.as_deref() {
            violations.check(
                parse_take_off(take_off).is_ok(),
                "takeOff",
                "takeOff must be in the 24 hour format hh:mm",
            );
        }
        if let Some(capacity) = self.changes.capacity {
            violations.number("capacity", &capacity.to_string());
        }
        if let Some(url) = self.team_url.as_deref() {
            team_url(&mut violations, "teamUrl", url);
        }
        violations.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpsDecision {
    Approve,
    Decline,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteRequestDecisionBody {
    pub new_ops_status: String,
    pub comment: String,
    pub reviewer_email: String,
    pub team_url: String,
    pub route_name: Option<String>,
    pub capacity: Option<Value>,
    pub take_off: Option<String>,
    pub provider_id: Option<ProviderId>,
}

impl RouteRequestDecisionBody {
    pub fn decision(&self) -> Option<OpsDecision> {
        match self.new_ops_status.trim() {
            "approve" => Some(OpsDecision::Approve),
            "decline" => Some(OpsDecision::Decline),
            _ => None,
        }
    }

    /// `None` unless every approval field is present and valid.
    pub fn approval(&self) -> Option<RouteApproval> {
        Some(RouteApproval {
            route_name: self.route_name.clone()?,
            take_off: self.take_off.clone()?,
            capacity: positive_number(self.capacity.as_ref())?,
            provider_id: self.provider_id?,
        })
    }
}

impl Validate for RouteRequestDecisionBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations
            .check(
                self.decision().is_some(),
                "newOpsStatus",
                "newOpsStatus must be either approve or decline",
            )
            .require("comment", &self.comment)
            .require("reviewerEmail", &self.reviewer_email);
        email(&mut violations, "reviewerEmail", &self.reviewer_email);
        team_url(&mut violations, "teamUrl", &self.team_url);

        if self.decision() == Some(OpsDecision::Approve) {
            let take_off_valid = self
                .take_off
                .as_deref()
                .is_some_and(|take_off| parse_take_off(take_off).is_ok());
            violations
                .require("routeName", self.route_name.as_deref().unwrap_or_default())
                .number("capacity", &number_text(self.capacity.as_ref()))
                .check(
                    take_off_valid,
                    "takeOff",
                    "takeOff must be in the 24 hour format hh:mm",
                )
                .require_some("providerId", self.provider_id.as_ref());
        }
        violations.finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewProviderBody {
    pub name: String,
    pub email: String,
    pub is_direct_message: bool,
    pub channel_id: Option<String>,
}

impl Default for NewProviderBody {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            is_direct_message: true,
            channel_id: None,
        }
    }
}

impl Validate for NewProviderBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations.require("name", &self.name).require("email", &self.email);
        email(&mut violations, "email", &self.email);
        if !self.is_direct_message {
            violations.require("channelId", self.channel_id.as_deref().unwrap_or_default());
        }
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewDriverBody {
    pub driver_name: String,
    pub driver_phone_no: String,
    pub driver_number: String,
    pub email: Option<String>,
    pub provider_id: Option<ProviderId>,
}

impl NewDriverBody {
    pub fn into_driver(self) -> Option<NewDriver> {
        Some(NewDriver {
            provider_id: self.provider_id?,
            driver_name: self.driver_name.trim().to_string(),
            driver_phone_no: self.driver_phone_no.trim().to_string(),
            driver_number: self.driver_number.trim().to_string(),
            email: self.email.map(|email| email.trim().to_string()),
        })
    }
}

impl Validate for NewDriverBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        violations
            .require("driverName", &self.driver_name)
            .require("driverPhoneNo", &self.driver_phone_no)
            .require("driverNumber", &self.driver_number)
            .require_some("providerId", self.provider_id.as_ref());
        if !self.driver_phone_no.trim().is_empty() {
            optional_phone(&mut violations, "driverPhoneNo", Some(&self.driver_phone_no));
        }
        optional_email(&mut violations, "email", self.email.as_ref());
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateDriverBody {
    pub driver_name: Option<String>,
    pub driver_phone_no: Option<String>,
    pub driver_number: Option<String>,
    pub email: Option<String>,
}

impl UpdateDriverBody {
    pub fn into_changes(self) -> DriverChanges {
        DriverChanges {
            driver_name: self.driver_name,
            driver_phone_no: self.driver_phone_no,
            driver_number: self.driver_number,
            email: self.email,
        }
    }
}

impl Validate for UpdateDriverBody {
    fn validate(&self) -> ValidationResult {
        let mut violations = Violations::new();
        let fields = [&self.driver_name, &self.driver_phone_no, &self.driver_number, &self.email];
        violations.check(
            fields.iter().any(|field| field.is_some()),
            "driverName",
            "Provide at least one of driverName, driverPhoneNo, driverNumber or email",
        );
        let required = [("driverName", &self.driver_name), ("driverNumber", &self.driver_number)];
        for (field, value) in required {
            if let Some(value) = value {
                violations.require(field, value);
            }
        }
        optional_phone(&mut violations, "driverPhoneNo", self.driver_phone_no.as_ref());
        optional_email(&mut violations, "email", self.email.as_ref());
        violations.finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewCabBody {
    pub reg_number: String,
    pub model: String,
    pub capacity: Option<Value>,
    pub provider_id: Option<ProviderId>,
}

impl NewCabBody {
    pub fn into_cab(self) -> Option<NewCab> {
        Some(NewCab {
            capacity: positive_number(self.capacity.as_ref())?,
            provider_id: self.provider_id?,
            reg_number: self.reg_number.trim().to_string(),
            model: self.model.trim().to_string(),
        })
    }
}

impl Validate for NewCabBody {
    fn validate(&self) -> ValidationResult {
        Violations::new()
            .require("regNumber", &self.reg_number)
            .require("model", &self.model)
            .number("capacity", &number_text(self.capacity.as_ref()))
            .require_some("providerId", self.provider_id.as_ref())
            .finish()
    }
}

/// Field errors carry the field name; API clients only see the messages.
pub fn messages(errors: &[FieldError]) -> Vec<String> {
    errors.iter().map(|error| error.message.clone()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tembea_core::validation::Validate;

    use super::{
        messages, NewRouteBody, NewUserBody, OpsDecision, RouteRequestDecisionBody,
        UpdateDriverBody,
    };

    #[test]
    fn route_body_reports_every_bad_field() {
        let body: NewRouteBody = serde_json::from_value(json!({
            "routeName": "Ngong",
            "destination": { "address": "Ngong Road" },
            "takeOffTime": "7pm",
            "capacity": 0
        }))
        .expect("deserialize");

        let errors = body.validate().expect_err("invalid");

        assert_eq!(
            messages(&errors),
            vec![
                "Please Provide a destination.coordinates",
                "takeOffTime must be in the 24 hour format hh:mm",
                "capacity must be a non-zero integer greater than zero",
                "Please Provide a providerId",
            ]
        );
    }

    #[test]
    fn route_body_converts_string_capacity() {
        let body: NewRouteBody = serde_json::from_value(json!({
            "routeName": "Ngong",
            "destination": {
                "address": "Ngong Road",
                "coordinates": { "lat": -1.3, "lng": 36.78 }
            },
            "takeOffTime": "17:30",
            "capacity": "4",
            "providerId": 1
        }))
        .expect("deserialize");
        assert!(body.validate().is_ok());

        let route = body.into_route();

        assert_eq!(route.batch.capacity, 4);
        assert_eq!(route.destination.longitude, 36.78);
    }

    #[test]
    fn user_body_needs_a_slack_team_url() {
        let body = NewUserBody {
            slack_url: "andela.com".to_string(),
            email: "ada@andela.com".to_string(),
        };

        let errors = body.validate().expect_err("invalid");

        assert_eq!(errors[0].field, "slackUrl");
    }

    #[test]
    fn approvals_need_the_route_fields() {
        let body: RouteRequestDecisionBody = serde_json::from_value(json!({
            "newOpsStatus": "approve",
            "comment": "Looks good",
            "reviewerEmail": "ops@andela.com",
            "teamUrl": "andela-tembea.slack.com"
        }))
        .expect("deserialize");

        assert_eq!(body.decision(), Some(OpsDecision::Approve));
        let errors = body.validate().expect_err("invalid");
        let fields: Vec<String> = errors.into_iter().map(|error| error.field).collect();
        assert_eq!(fields, vec!["routeName", "capacity", "takeOff", "providerId"]);
        assert!(body.approval().is_none());
    }

    #[test]
    fn driver_updates_need_at_least_one_field() {
        assert!(UpdateDriverBody::default().validate().is_err());
        let rename = UpdateDriverBody {
            driver_name: Some("Wanjiru".to_string()),
            ..UpdateDriverBody::default()
        };
        assert!(rename.validate().is_ok());
    }
}

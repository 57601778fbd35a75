use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use tembea_core::{Department, Page};

use super::error::ApiError;
use super::extract::ValidatedJson;
use super::requests::{DeleteDepartmentBody, NewDepartmentBody, UpdateDepartmentBody};
use super::response::{ApiReply, ApiResponse};
use super::{parse_id, PageQuery};
use crate::services::department::DepartmentView;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/departments",
            get(list_departments)
                .post(create_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/departments/{id}", get(get_department))
}

async fn create_department(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewDepartmentBody>,
) -> Result<ApiReply<Department>, ApiError> {
    let head = state.services.users.get_user(&body.email).await?;
    let (department, created) =
        state.services.departments.create_department(&head, &body.name, body.homebase_id).await?;
    if !created {
        return Err(ApiError::new(StatusCode::CONFLICT, "Department already exists."));
    }
    Ok(ApiResponse::created("Department created successfully", department))
}

async fn list_departments(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<ApiReply<Page<DepartmentView>>, ApiError> {
    let departments = state.services.departments.get_all_departments(query.page_request()).await?;
    Ok(ApiResponse::ok("All departments", departments))
}

async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiReply<Department>, ApiError> {
    let department = state.services.departments.get_department(parse_id(&id)?).await?;
    Ok(ApiResponse::ok("Department fetched successfully", department))
}

async fn update_department(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UpdateDepartmentBody>,
) -> Result<ApiReply<Department>, ApiError> {
    let department = state
        .services
        .departments
        .update_department(&body.name, body.new_name.as_deref(), body.new_head_email.as_deref())
        .await?;
    Ok(ApiResponse::ok("Department record updated", department))
}

async fn delete_department(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<DeleteDepartmentBody>,
) -> Result<ApiReply<Department>, ApiError> {
    let selector = body
        .selector()
        .ok_or_else(|| ApiError::bad_request("Provide the id or the name of the department"))?;
    let department = state.services.departments.delete_department_by_name_or_id(selector).await?;
    Ok(ApiResponse::ok("The department has been deleted", department))
}

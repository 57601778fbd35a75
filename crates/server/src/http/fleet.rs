use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::Router;

use tembea_core::{Cab, Driver, Page, Provider};

use super::error::ApiError;
use super::extract::ValidatedJson;
use super::requests::{NewCabBody, NewDriverBody, NewProviderBody, UpdateDriverBody};
use super::response::{ApiReply, ApiResponse};
use super::{parse_id, PageQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(list_providers).post(create_provider))
        .route("/providers/drivers", get(list_drivers).post(create_driver))
        .route("/providers/drivers/{id}", put(update_driver).delete(delete_driver))
        .route("/cabs", get(list_cabs).post(create_cab))
        .route("/cabs/{id}", delete(delete_cab))
}

async fn create_provider(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewProviderBody>,
) -> Result<ApiReply<Provider>, ApiError> {
    let provider = state
        .services
        .providers
        .create_provider(&body.name, &body.email, body.is_direct_message, body.channel_id)
        .await?;
    Ok(ApiResponse::created("Provider created successfully", provider))
}

async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<ApiReply<Page<Provider>>, ApiError> {
    let providers = state.services.providers.get_providers(query.page_request()).await?;
    Ok(ApiResponse::ok("List of providers", providers))
}

async fn create_driver(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewDriverBody>,
) -> Result<ApiReply<Driver>, ApiError> {
    let driver = body
        .into_driver()
        .ok_or_else(|| ApiError::bad_request("Please Provide a providerId"))?;
    let (driver, created) = state.services.drivers.create(driver).await?;
    if !created {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Driver with driver number {} already exists", driver.driver_number),
        ));
    }
    Ok(ApiResponse::created("Driver added successfully", driver))
}

async fn list_drivers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<ApiReply<Page<Driver>>, ApiError> {
    let drivers = state
        .services
        .drivers
        .get_drivers(query.provider_id, query.page_request())
        .await?;
    Ok(ApiResponse::ok("List of drivers", drivers))
}

async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateDriverBody>,
) -> Result<ApiReply<Driver>, ApiError> {
    let driver = state.services.drivers.update(parse_id(&id)?, body.into_changes()).await?;
    Ok(ApiResponse::ok("Driver updated successfully", driver))
}

async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiReply<Driver>, ApiError> {
    let removal = state.services.drivers.delete_driver(parse_id(&id)?).await?;
    Ok(ApiResponse::ok("Driver successfully deleted", removal.removed))
}

async fn create_cab(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<NewCabBody>,
) -> Result<ApiReply<Cab>, ApiError> {
    let cab = body.into_cab().ok_or_else(|| ApiError::bad_request("Please Provide a providerId"))?;
    let cab = state.services.cabs.create(cab).await?;
    Ok(ApiResponse::created("You have successfully created a cab", cab))
}

async fn list_cabs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<ApiReply<Page<Cab>>, ApiError> {
    let cabs = state.services.cabs.get_cabs(query.provider_id, query.page_request()).await?;
    Ok(ApiResponse::ok("List of cabs", cabs))
}

async fn delete_cab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiReply<Cab>, ApiError> {
    let removal = state.services.cabs.delete_cab(parse_id(&id)?).await?;
    Ok(ApiResponse::ok("Cab successfully deleted", removal.removed))
}

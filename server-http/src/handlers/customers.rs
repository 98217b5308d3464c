use crate::api::requests::{DeleteCustomersRequest, ListCustomersQuery, SaveCustomersRequest};
use crate::api::responses::{
    DeleteCustomersResponse, ErrorResponse, ListCustomersResponse, ALREADY_DELETED_MESSAGE,
    STATUS_OK,
};
use crate::state::AppState;
use crate::validation::validate_pagination;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use crm::{BulkResponse, CustomerError, CustomerId, DeleteOutcome};
use tracing::{debug, error, info, warn};

const INVALID_PAYLOAD: &str = "invalid request payload";

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn status_for(err: &CustomerError) -> StatusCode {
    match err {
        err if err.is_precondition() => StatusCode::BAD_REQUEST,
        CustomerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn customer_error(operation: &str, err: CustomerError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("{} failed: {}", operation, err);
    } else {
        warn!("{} rejected: {}", operation, err);
    }
    (status, Json(ErrorResponse::new(err.to_string())))
}

/// GET /api/customers
pub async fn list_customers(
    State(state): State<AppState>,
    query: Result<Query<ListCustomersQuery>, QueryRejection>,
) -> Result<Json<ListCustomersResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| bad_request(rejection.body_text()))?;
    let pagination = validate_pagination(&query).map_err(|e| bad_request(e.to_string()))?;

    info!(
        "LIST_CUSTOMERS: pageNo={}, recordsOnPage={}",
        pagination.page_no, pagination.records_on_page
    );

    let page = state
        .customer_operations
        .list_customers(pagination)
        .await
        .map_err(|e| customer_error("LIST_CUSTOMERS", e))?;

    debug!("LIST_CUSTOMERS: served from {:?}", page.source);
    Ok(Json(ListCustomersResponse {
        customers: page.payload.get().to_owned(),
    }))
}

/// POST /api/customers/save
pub async fn save_customers(
    State(state): State<AppState>,
    payload: Result<Json<SaveCustomersRequest>, JsonRejection>,
) -> Result<Json<BulkResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Invalid save payload: {}", rejection.body_text());
        bad_request(INVALID_PAYLOAD)
    })?;

    info!("SAVE_CUSTOMERS: count={}", req.customers.len());

    let response = state
        .customer_operations
        .save_customers(req.customers)
        .await
        .map_err(|e| customer_error("SAVE_CUSTOMERS", e))?;

    Ok(Json(response))
}

/// DELETE /api/customers/delete
pub async fn delete_customers(
    State(state): State<AppState>,
    payload: Result<Json<DeleteCustomersRequest>, JsonRejection>,
) -> Result<Json<DeleteCustomersResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Invalid delete payload: {}", rejection.body_text());
        bad_request(INVALID_PAYLOAD)
    })?;

    let ids = CustomerId::parse_all(&req.customer_ids)
        .map_err(|e| customer_error("DELETE_CUSTOMERS", e))?;

    info!("DELETE_CUSTOMERS: ids={:?}", ids.iter().map(CustomerId::as_str).collect::<Vec<_>>());

    match state.customer_operations.delete_customers(ids).await {
        Ok(DeleteOutcome::Deleted(response)) => Ok(Json(DeleteCustomersResponse {
            status: STATUS_OK,
            message: None,
            response,
        })),
        Ok(DeleteOutcome::AlreadyDeleted(response)) => {
            warn!("DELETE_CUSTOMERS: customer already deleted or invalid ID");
            Ok(Json(DeleteCustomersResponse {
                status: STATUS_OK,
                message: Some(ALREADY_DELETED_MESSAGE),
                response,
            }))
        }
        Err(err) => {
            let (status, Json(body)) = customer_error("DELETE_CUSTOMERS", err);
            let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
                body.with_customer_ids(req.customer_ids)
            } else {
                body
            };
            Err((status, Json(body)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm::DirectoryError;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&CustomerError::EmptyBatch("no customers to save")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CustomerError::InvalidCustomerId { value: "null".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CustomerError::Timeout {
                operation: "delete customers",
                after: Duration::from_secs(10),
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&DirectoryError::api(1002, "too many requests").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

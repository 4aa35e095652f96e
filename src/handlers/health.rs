use axum::http::StatusCode;

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health() -> StatusCode {
    StatusCode::OK
}

use crate::response;
use actix_web::{get, HttpResponse};
use chrono::Utc;

/// Current server time as unix seconds.
#[get("/api/time")]
pub async fn get_time() -> HttpResponse {
    response::web_success(Utc::now().timestamp())
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use thiserror::Error;

use std::sync::Arc;

use crate::sensor;
use crate::store::{CsvStore, Reading};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing \"data\" field")]
    MissingData,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingData => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Store failures keep their detail in the log; callers only see a
        // generic message.
        let body = match &self {
            Self::MissingData => r#"Missing "data" field"#,
            Self::Store(err) => {
                log::error!("request failed: {err:#}");
                "Error: internal server error"
            }
        };

        (self.status_code(), body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AddDataRequest {
    data: Option<String>,
}

pub fn router(store: Arc<CsvStore>) -> Router {
    Router::new()
        .route("/", get(list_readings))
        .route("/add-data", post(add_data))
        .with_state(store)
}

async fn add_data(
    State(store): State<Arc<CsvStore>>,
    Json(payload): Json<AddDataRequest>,
) -> Result<&'static str, ApiError> {
    let line = payload
        .data
        .filter(|line| !line.is_empty())
        .ok_or(ApiError::MissingData)?;

    let groups = sensor::parse_sensor_line(&line);
    log::debug!("Parsed sensor groups: {groups:?}");

    store.append(Reading::now(groups)).await?;

    Ok("Data saved")
}

async fn list_readings(State(store): State<Arc<CsvStore>>) -> Result<Html<String>, ApiError> {
    let (headers, rows) = store.read_all().await?;

    Ok(Html(render_table(&headers, &rows)))
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Hive sensor readings</title></head>\n\
         <body>\n<h1>Hive sensor readings</h1>\n<table border=\"1\">\n<tr>",
    );

    for header in headers {
        page.push_str("<th>");
        page.push_str(&escape(header));
        page.push_str("</th>");
    }
    page.push_str("</tr>\n");

    for row in rows {
        page.push_str("<tr>");
        for cell in row {
            page.push_str("<td>");
            page.push_str(&escape(cell));
            page.push_str("</td>");
        }
        page.push_str("</tr>\n");
    }

    page.push_str("</table>\n</body>\n</html>\n");
    page
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

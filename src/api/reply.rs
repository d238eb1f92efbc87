use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, Rejection, UnsupportedMediaType,
    },
    reply::{self, Reply},
};

use crate::error::ApiError;

fn json_error(status: StatusCode, body: serde_json::Value) -> reply::WithStatus<reply::Json> {
    reply::with_status(reply::json(&body), status)
}

/// Turns every rejection into a JSON reply.
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(e) = rejection.find::<ApiError>() {
        let status = e.status();
        if status.is_server_error() {
            log::error!("{e}");
        } else {
            log::debug!("Rejected request: {e}");
        }
        return Ok(json_error(status, e.body()));
    }

    let (status, detail) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found."))
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Malformed request body: {e}"))
    } else if let Some(e) = rejection.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, format!("{e}"))
    } else if let Some(e) = rejection.find::<InvalidHeader>() {
        (StatusCode::BAD_REQUEST, format!("{e}"))
    } else if let Some(e) = rejection.find::<MissingHeader>() {
        (StatusCode::BAD_REQUEST, format!("{e}"))
    } else if rejection.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, String::from("Request body is required."))
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, String::from("Request body is too large."))
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Expected a JSON body."),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, String::from("Method not allowed."))
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error."),
        )
    };

    log::debug!("Rejected request with {status}: {detail}");
    Ok(json_error(status, json!({ "detail": detail })))
}

use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

/// Accepts `Token <jwt>` as well as `Bearer <jwt>`.
pub fn extract_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate_header(header: &str, secret: &str) -> Result<SessionData, ApiError> {
    let token = extract_token(header)
        .ok_or_else(|| ApiError::Unauthorized(String::from("Invalid authorization header.")))?;

    verify_jwt_session(token, secret).map(SessionData::from)
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match header {
                Some(header) => authenticate_header(&header, &secret).map_err(Rejection::from),
                None => Err(Rejection::from(ApiError::unauthenticated())),
            }
        }
    })
}

/// Anonymous callers pass through as `None`; a present but broken token is still a 401.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match header {
                Some(header) => authenticate_header(&header, &secret)
                    .map(Some)
                    .map_err(Rejection::from),
                None => Ok(None),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefixes() {
        assert_eq!(extract_token("Token abc"), Some("abc"));
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Token "), None);
    }
}

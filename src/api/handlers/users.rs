use std::sync::Arc;

use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply},
};

use crate::{
    actions::users,
    constants::USER_COUNT_PER_PAGE,
    cryptography::hash_password,
    error::{ApiError, FieldErrors},
    jwt::SessionData,
    pagination::{PageQuery, Pagination},
    schema::Id,
    serializers::{LoginWrite, TokenRead, UserRead, UserWrite},
    state::AppState,
    validators::validate_new_user,
};

const USERS_PATH: &str = "/api/users/";

pub async fn list_users(
    query: PageQuery,
    session: Option<SessionData>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let pagination = Pagination::from_query(query, USER_COUNT_PER_PAGE)?;
    let viewer = session.map(|s| s.user_id);

    let page = users::fetch_users(&state.pool, viewer, pagination, USERS_PATH).await?;

    Ok(reply::json(&page.map(UserRead::from)))
}

pub async fn register(write: UserWrite, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let user = validate_new_user(write)?;

    let password_hash = hash_password(&user.password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;
    let created = users::register_user(&user, &password_hash, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&UserRead::from_user(&created, false)),
        StatusCode::CREATED,
    ))
}

pub async fn get_user(
    user_id: Id,
    session: Option<SessionData>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let row = users::get_user_row(&state.pool, user_id, viewer)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(reply::json(&UserRead::from(row)))
}

pub async fn me(session: SessionData, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    // a valid token can outlive its user
    let row = users::get_user_row(&state.pool, session.user_id, Some(session.user_id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(String::from("User no longer exists.")))?;

    Ok(reply::json(&UserRead::from(row)))
}

pub async fn login(write: LoginWrite, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let mut errors = FieldErrors::new();
    if write.email.as_deref().map_or(true, str::is_empty) {
        errors.add("email", "This field is required.");
    }
    if write.password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", "This field is required.");
    }
    errors.into_result(())?;

    let token = users::login_user(
        write.email.as_deref().unwrap_or_default(),
        write.password.as_deref().unwrap_or_default(),
        &state.jwt_secret,
        state.config.token_lifetime_hours,
        &state.pool,
    )
    .await?;

    Ok(reply::json(&TokenRead { auth_token: token }))
}

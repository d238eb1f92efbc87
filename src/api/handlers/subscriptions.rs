use std::sync::Arc;

use serde::Deserialize;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply},
};

use crate::{
    actions::{subscriptions, users},
    authentication::permissions::ActionType,
    constants::USER_COUNT_PER_PAGE,
    error::ApiError,
    jwt::SessionData,
    pagination::{PageContext, PageQuery, Pagination},
    schema::Id,
    state::AppState,
    validators::parse_recipes_limit,
};

use super::load_subscription_reads;

const SUBSCRIPTIONS_PATH: &str = "/api/users/subscriptions/";

/// `recipes_limit` is kept as text so a malformed value becomes a field error.
#[derive(Deserialize, Debug, Default)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<String>,
}

pub async fn list_subscriptions(
    query: SubscriptionQuery,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = parse_recipes_limit(query.recipes_limit.as_deref())?;
    let pagination = Pagination::from_query(
        PageQuery {
            page: query.page,
            limit: query.limit,
        },
        USER_COUNT_PER_PAGE,
    )?;

    let base_path = match recipes_limit {
        Some(limit) => format!("{SUBSCRIPTIONS_PATH}?recipes_limit={limit}"),
        None => SUBSCRIPTIONS_PATH.to_string(),
    };
    let PageContext {
        count,
        next,
        previous,
        results,
    } = subscriptions::fetch_subscriptions(session.user_id, pagination, &base_path, &state.pool)
        .await?;
    let results = load_subscription_reads(results, recipes_limit, &state).await?;

    Ok(reply::json(&PageContext {
        count,
        next,
        previous,
        results,
    }))
}

pub async fn subscribe(
    author_id: Id,
    query: SubscriptionQuery,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = parse_recipes_limit(query.recipes_limit.as_deref())?;

    subscriptions::subscribe(session.user_id, author_id, &state.pool).await?;

    let author = users::get_user_row(&state.pool, author_id, Some(session.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let read = load_subscription_reads(vec![author], recipes_limit, &state)
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(String::from("Subscription vanished while loading")))?;

    Ok(reply::with_status(reply::json(&read), StatusCode::CREATED))
}

pub async fn unsubscribe(
    author_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    subscriptions::unsubscribe(session.user_id, author_id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

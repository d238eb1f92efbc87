use std::sync::Arc;

use serde::Deserialize;
use warp::{
    reject::Rejection,
    reply::{self, Reply},
};

use crate::{
    actions::{ingredients, tags},
    error::ApiError,
    schema::Id,
    state::AppState,
};

/// `search` is the documented parameter; `name` is accepted as an alias.
#[derive(Deserialize, Debug, Default)]
pub struct IngredientQuery {
    pub search: Option<String>,
    pub name: Option<String>,
}

pub async fn list_tags(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    Ok(reply::json(&tags::list_tags(&state.pool).await?))
}

pub async fn get_tag(tag_id: Id, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(tag_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;

    Ok(reply::json(&tag))
}

pub async fn list_ingredients(
    query: IngredientQuery,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let search = query.search.or(query.name);
    let rows = ingredients::search_ingredients(search.as_deref(), &state.pool).await?;

    Ok(reply::json(&rows))
}

pub async fn get_ingredient(
    ingredient_id: Id,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(ingredient_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient"))?;

    Ok(reply::json(&ingredient))
}

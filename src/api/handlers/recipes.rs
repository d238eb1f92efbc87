use std::sync::Arc;

use warp::{
    http::{header, Response, StatusCode},
    reject::Rejection,
    reply::{self, Reply},
};

use crate::{
    actions::{
        favorites,
        recipes::{self, RecipeFilter},
        shopping_cart,
    },
    authentication::permissions::ActionType,
    constants::{RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME},
    error::{ApiError, FieldErrors},
    jwt::SessionData,
    pagination::{PageContext, PageQuery, Pagination},
    schema::{Id, Recipe},
    serializers::{RecipeWrite, ShortRecipeRead},
    shopping_list,
    state::AppState,
    validators::{is_valid_slug, validate_new_recipe, validate_recipe},
};

use super::{load_recipe_read, load_recipe_reads};

const RECIPES_PATH: &str = "/api/recipes/";

fn parse_flag(field: &str, value: &str, errors: &mut FieldErrors) -> bool {
    match value {
        "1" | "true" | "True" => true,
        "0" | "false" | "False" => false,
        _ => {
            errors.add(field, "Expected 0 or 1.");
            false
        }
    }
}

fn parse_number(field: &str, value: &str, errors: &mut FieldErrors) -> Option<i64> {
    let number = value.parse::<i64>().ok();
    if number.is_none() {
        errors.add(field, "A valid integer is required.");
    }
    number
}

/// Reads the recipe list query. `tags` may repeat; everything else is single-valued.
pub fn parse_recipe_query(
    pairs: &[(String, String)],
) -> Result<(Pagination, RecipeFilter), ApiError> {
    let mut errors = FieldErrors::new();
    let mut page = PageQuery::default();
    let mut filter = RecipeFilter::default();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => page.page = parse_number("page", value, &mut errors),
            "limit" => page.limit = parse_number("limit", value, &mut errors),
            "author" => match parse_number("author", value, &mut errors).map(Id::try_from) {
                Some(Ok(author)) => filter.author = Some(author),
                Some(Err(_)) => errors.add("author", "Unknown author."),
                None => {}
            },
            "tags" if value.is_empty() => {}
            "tags" if !is_valid_slug(value) => {
                errors.add("tags", format!("{value:?} is not a valid tag slug."))
            }
            "tags" => {
                if !filter.tags.contains(value) {
                    filter.tags.push(value.to_owned());
                }
            }
            "is_favorited" => filter.is_favorited = parse_flag(key, value, &mut errors),
            "is_in_shopping_cart" => {
                filter.is_in_shopping_cart = parse_flag(key, value, &mut errors)
            }
            _ => {}
        }
    }
    errors.into_result(())?;

    let pagination = Pagination::from_query(page, RECIPE_COUNT_PER_PAGE)?;
    Ok((pagination, filter))
}

/// Path that page links are built on, carrying the active filters.
fn filtered_path(filter: &RecipeFilter) -> String {
    let mut params: Vec<String> = vec![];
    if let Some(author) = filter.author {
        params.push(format!("author={author}"));
    }
    params.extend(filter.tags.iter().map(|tag| format!("tags={tag}")));
    if filter.is_favorited {
        params.push(String::from("is_favorited=1"));
    }
    if filter.is_in_shopping_cart {
        params.push(String::from("is_in_shopping_cart=1"));
    }

    if params.is_empty() {
        RECIPES_PATH.to_string()
    } else {
        format!("{RECIPES_PATH}?{}", params.join("&"))
    }
}

pub async fn list_recipes(
    pairs: Vec<(String, String)>,
    session: Option<SessionData>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let (pagination, filter) = parse_recipe_query(&pairs)?;
    let viewer = session.map(|s| s.user_id);

    let page = recipes::fetch_recipes(
        &filter,
        viewer,
        pagination,
        &filtered_path(&filter),
        &state.pool,
    )
    .await?;

    let PageContext {
        count,
        next,
        previous,
        results,
    } = page;
    let results = load_recipe_reads(results, viewer, &state).await?;

    Ok(reply::json(&PageContext {
        count,
        next,
        previous,
        results,
    }))
}

pub async fn get_recipe(
    recipe_id: Id,
    session: Option<SessionData>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let row = recipes::get_recipe_row(recipe_id, viewer, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    Ok(reply::json(&load_recipe_read(row, viewer, &state).await?))
}

async fn reply_with_recipe(
    recipe_id: Id,
    session: &SessionData,
    state: &Arc<AppState>,
    status: StatusCode,
) -> Result<reply::WithStatus<reply::Json>, ApiError> {
    let row = recipes::get_recipe_row(recipe_id, Some(session.user_id), &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;
    let read = load_recipe_read(row, Some(session.user_id), state).await?;

    Ok(reply::with_status(reply::json(&read), status))
}

pub async fn create_recipe(
    session: SessionData,
    write: RecipeWrite,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = validate_new_recipe(write)?;

    let image = state.media.save_recipe_image(&recipe.image).await?;
    let created = match recipes::create_recipe(session.user_id, &recipe, &image, &state.pool).await
    {
        Ok(created) => created,
        Err(e) => {
            state.media.remove(&image).await;
            return Err(e.into());
        }
    };

    Ok(reply_with_recipe(created.id, &session, &state, StatusCode::CREATED).await?)
}

pub async fn update_recipe(
    recipe_id: Id,
    session: SessionData,
    write: RecipeWrite,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let current: Recipe = recipes::get_recipe_mut(recipe_id, &session, &state.pool).await?;
    let changes = validate_recipe(write, true)?;

    let image = match &changes.image {
        Some(image) => Some(state.media.save_recipe_image(image).await?),
        None => None,
    };

    if let Err(e) =
        recipes::update_recipe(recipe_id, &changes, image.as_deref(), &state.pool).await
    {
        if let Some(image) = &image {
            state.media.remove(image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        state.media.remove(&current.image).await;
    }

    Ok(reply_with_recipe(recipe_id, &session, &state, StatusCode::OK).await?)
}

pub async fn delete_recipe(
    recipe_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_mut(recipe_id, &session, &state.pool).await?;

    if !recipes::delete_recipe(recipe.id, &state.pool).await? {
        return Err(ApiError::not_found("Recipe").into());
    }
    state.media.remove(&recipe.image).await;

    log::info!("User {} deleted recipe {}", session.user_id, recipe.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn existing_recipe(recipe_id: Id, state: &Arc<AppState>) -> Result<Recipe, ApiError> {
    recipes::get_recipe(recipe_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))
}

pub async fn add_favorite(
    recipe_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    let recipe = existing_recipe(recipe_id, &state).await?;

    favorites::add_favorite(session.user_id, recipe.id, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&ShortRecipeRead::from_recipe(&recipe, &state.media)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_favorite(
    recipe_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    let recipe = existing_recipe(recipe_id, &state).await?;

    favorites::remove_favorite(session.user_id, recipe.id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_cart(
    recipe_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let recipe = existing_recipe(recipe_id, &state).await?;

    shopping_cart::add_to_cart(session.user_id, recipe.id, &state.pool).await?;

    Ok(reply::with_status(
        reply::json(&ShortRecipeRead::from_recipe(&recipe, &state.media)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_from_cart(
    recipe_id: Id,
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;
    let recipe = existing_recipe(recipe_id, &state).await?;

    shopping_cart::remove_from_cart(session.user_id, recipe.id, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    session: SessionData,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    if shopping_cart::count_cart(session.user_id, &state.pool).await? == 0 {
        return Err(ApiError::InvalidRequest(String::from("Shopping cart is empty.")).into());
    }

    let parts = shopping_cart::list_cart_parts(session.user_id, &state.pool).await?;
    let body = shopping_list::render(&shopping_list::aggregate(&parts));

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build shopping list response: {e}")))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn repeated_tags_accumulate() {
        let (pagination, filter) = parse_recipe_query(&pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("tags", "breakfast"),
            ("author", "3"),
            ("is_favorited", "1"),
        ]))
        .unwrap();

        assert_eq!(pagination, Pagination::new(1, RECIPE_COUNT_PER_PAGE));
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(3));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn bad_numbers_and_flags_are_field_errors() {
        match parse_recipe_query(&pairs(&[("page", "two"), ("is_in_shopping_cart", "yes")])) {
            Err(ApiError::Validation(errors)) => {
                assert!(errors.contains("page"));
                assert!(errors.contains("is_in_shopping_cart"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tags_that_are_not_slugs_are_rejected() {
        match parse_recipe_query(&pairs(&[("tags", "a b"), ("tags", "x&y"), ("tags", "lunch")])) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.get("tags").map(|m| m.len()), Some(2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn page_links_carry_filters() {
        let filter = RecipeFilter {
            author: Some(2),
            tags: vec![String::from("dinner")],
            is_favorited: false,
            is_in_shopping_cart: true,
        };

        assert_eq!(
            filtered_path(&filter),
            "/api/recipes/?author=2&tags=dinner&is_in_shopping_cart=1"
        );
        assert_eq!(filtered_path(&RecipeFilter::default()), "/api/recipes/");
    }
}

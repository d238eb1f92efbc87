use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::{
    handlers::{recipes, reference, subscriptions, users},
    middleware::{with_possible_session, with_session},
    pagination::PageQuery,
    reply::handle_rejection,
    schema::Id,
    state::{with_state, AppState},
};

fn json_body<T>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(limit).and(warp::body::json())
}

fn recipe_routes(
    state: &Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let app = with_state(state.clone());
    let session = with_session(state.jwt_secret.clone());
    let possible_session = with_possible_session(state.jwt_secret.clone());
    let limit = state.config.body_limit;

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(app.clone())
        .and_then(recipes::download_shopping_cart);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(possible_session.clone())
        .and(app.clone())
        .and_then(recipes::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(session.clone())
        .and(json_body(limit))
        .and(app.clone())
        .and_then(recipes::create_recipe);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(possible_session)
        .and(app.clone())
        .and_then(recipes::get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(session.clone())
        .and(json_body(limit))
        .and(app.clone())
        .and_then(recipes::update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(app.clone())
        .and_then(recipes::delete_recipe);

    let favorite = warp::path!("recipes" / Id / "favorite")
        .and(warp::post())
        .and(session.clone())
        .and(app.clone())
        .and_then(recipes::add_favorite)
        .or(warp::path!("recipes" / Id / "favorite")
            .and(warp::delete())
            .and(session.clone())
            .and(app.clone())
            .and_then(recipes::remove_favorite));

    let cart = warp::path!("recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(session.clone())
        .and(app.clone())
        .and_then(recipes::add_to_cart)
        .or(warp::path!("recipes" / Id / "shopping_cart")
            .and(warp::delete())
            .and(session)
            .and(app)
            .and_then(recipes::remove_from_cart));

    download
        .or(list)
        .or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(cart)
}

fn reference_routes(
    state: &Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let app = with_state(state.clone());

    let tags = warp::path!("tags")
        .and(warp::get())
        .and(app.clone())
        .and_then(reference::list_tags);

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(app.clone())
        .and_then(reference::get_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<reference::IngredientQuery>())
        .and(app.clone())
        .and_then(reference::list_ingredients);

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(app)
        .and_then(reference::get_ingredient);

    tags.or(tag).or(ingredients).or(ingredient)
}

fn user_routes(
    state: &Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let app = with_state(state.clone());
    let session = with_session(state.jwt_secret.clone());
    let possible_session = with_possible_session(state.jwt_secret.clone());
    let limit = state.config.body_limit;

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(app.clone())
        .and_then(users::me);

    let list_subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<subscriptions::SubscriptionQuery>())
        .and(session.clone())
        .and(app.clone())
        .and_then(subscriptions::list_subscriptions);

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(possible_session.clone())
        .and(app.clone())
        .and_then(users::list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body(limit))
        .and(app.clone())
        .and_then(users::register);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(possible_session)
        .and(app.clone())
        .and_then(users::get_user);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<subscriptions::SubscriptionQuery>())
        .and(session.clone())
        .and(app.clone())
        .and_then(subscriptions::subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(session)
        .and(app.clone())
        .and_then(subscriptions::unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body(limit))
        .and(app)
        .and_then(users::login);

    me.or(list_subscriptions)
        .or(list)
        .or(register)
        .or(detail)
        .or(subscribe)
        .or(unsubscribe)
        .or(login)
}

/// The whole HTTP surface: `/api/...` plus uploaded files under `/media/`.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        recipe_routes(&state)
            .or(reference_routes(&state))
            .or(user_routes(&state)),
    );
    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.media.root().to_path_buf()));

    api.or(media)
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}

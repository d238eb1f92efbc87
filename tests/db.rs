// Run with DATABASE_URL set and `cargo test -- --ignored`.

use foodgram::{
    actions::{favorites, ingredients, recipes, shopping_cart, subscriptions, tags, users},
    config::Config,
    error::ApiError,
    jwt::generate_jwt_session,
    media::DecodedImage,
    pagination::Pagination,
    routes::routes,
    schema::{Id, User},
    shopping_list,
    state::AppState,
    validators::{NewRecipe, NewUser, RecipeChanges},
};
use serde_json::Value;
use sqlx::PgPool;
use warp::http::StatusCode;

const SECRET: &str = "db-test-secret";

fn app_state(pool: PgPool) -> std::sync::Arc<AppState> {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(String::from("postgres://unused")),
        "FOODGRAM_JWT_SECRET" => Some(String::from(SECRET)),
        _ => None,
    })
    .unwrap();
    AppState::new(pool, config)
}

fn token(user: &User) -> String {
    format!("Token {}", generate_jwt_session(user, SECRET, 1).unwrap())
}

async fn user(pool: &PgPool, name: &str) -> User {
    let new_user = NewUser {
        email: format!("{name}@example.com"),
        username: name.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::from("irrelevant"),
    };
    users::register_user(&new_user, "not-a-real-hash", pool)
        .await
        .unwrap()
}

async fn tag(pool: &PgPool, slug: &str) -> Id {
    tags::insert_tag(slug, Some("#FFAA00"), slug, pool)
        .await
        .unwrap()
        .unwrap()
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Id {
    ingredients::insert_ingredient(name, unit, pool)
        .await
        .unwrap()
        .unwrap()
}

fn new_recipe(name: &str, tags: Vec<Id>, ingredients: Vec<(Id, i32)>) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        text: String::from("Mix and bake."),
        cooking_time: 30,
        image: DecodedImage {
            extension: "png",
            bytes: vec![0],
        },
        tags,
        ingredients,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_a_user_cascades(pool: PgPool) {
    let author = user(&pool, "author").await;
    let fan = user(&pool, "fan").await;
    let breakfast = tag(&pool, "breakfast").await;
    let flour = ingredient(&pool, "мука", "г").await;

    let recipe = recipes::create_recipe(
        author.id,
        &new_recipe("Pancakes", vec![breakfast], vec![(flour, 200)]),
        "recipes/images/pancakes.png",
        &pool,
    )
    .await
    .unwrap();
    favorites::add_favorite(fan.id, recipe.id, &pool).await.unwrap();
    shopping_cart::add_to_cart(fan.id, recipe.id, &pool).await.unwrap();
    subscriptions::subscribe(fan.id, author.id, &pool).await.unwrap();

    assert!(users::delete_user(author.id, &pool).await.unwrap());

    assert!(recipes::get_recipe(recipe.id, &pool).await.unwrap().is_none());
    assert!(!favorites::is_favorite(fan.id, recipe.id, &pool).await.unwrap());
    assert_eq!(shopping_cart::count_cart(fan.id, &pool).await.unwrap(), 0);
    assert!(!subscriptions::is_subscribed(fan.id, author.id, &pool).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn favorites_and_cart_reject_duplicates(pool: PgPool) {
    let author = user(&pool, "author").await;
    let lunch = tag(&pool, "lunch").await;
    let rice = ingredient(&pool, "рис", "г").await;
    let recipe = recipes::create_recipe(
        author.id,
        &new_recipe("Plov", vec![lunch], vec![(rice, 300)]),
        "recipes/images/plov.png",
        &pool,
    )
    .await
    .unwrap();

    assert!(matches!(
        favorites::remove_favorite(author.id, recipe.id, &pool).await,
        Err(ApiError::InvalidRequest(_))
    ));

    favorites::add_favorite(author.id, recipe.id, &pool).await.unwrap();
    assert!(matches!(
        favorites::add_favorite(author.id, recipe.id, &pool).await,
        Err(ApiError::InvalidRequest(_))
    ));

    shopping_cart::remove_from_cart(author.id, recipe.id, &pool)
        .await
        .unwrap_err();

    // the constraint holds even when the pre-check is bypassed
    let error = sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2)")
        .bind(author.id)
        .bind(recipe.id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert_eq!(
        error.as_database_error().and_then(|e| e.constraint()),
        Some("unique_favorite")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn update_replaces_tags_and_ingredients(pool: PgPool) {
    let author = user(&pool, "author").await;
    let (breakfast, dinner) = (tag(&pool, "breakfast").await, tag(&pool, "dinner").await);
    let (egg, milk, salt) = (
        ingredient(&pool, "яйцо", "шт").await,
        ingredient(&pool, "молоко", "мл").await,
        ingredient(&pool, "соль", "г").await,
    );
    let recipe = recipes::create_recipe(
        author.id,
        &new_recipe("Omelette", vec![breakfast], vec![(egg, 3), (milk, 100)]),
        "recipes/images/omelette.png",
        &pool,
    )
    .await
    .unwrap();

    let changes = RecipeChanges {
        name: None,
        text: None,
        cooking_time: Some(10),
        image: None,
        tags: vec![dinner],
        ingredients: vec![(egg, 4), (salt, 2)],
    };
    let updated = recipes::update_recipe(recipe.id, &changes, None, &pool)
        .await
        .unwrap();
    assert_eq!(updated.name, "Omelette");
    assert_eq!(updated.cooking_time, 10);
    assert_eq!(updated.image, "recipes/images/omelette.png");

    let tag_ids: Vec<Id> = tags::list_recipe_tags(&pool, &[recipe.id])
        .await
        .unwrap()
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    assert_eq!(tag_ids, vec![dinner]);

    let mut parts: Vec<(Id, i32)> = recipes::list_recipe_parts(&pool, &[recipe.id])
        .await
        .unwrap()
        .into_iter()
        .map(|part| (part.ingredient_id, part.amount))
        .collect();
    parts.sort();
    let mut expected = vec![(egg, 4), (salt, 2)];
    expected.sort();
    assert_eq!(parts, expected);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_update_leaves_recipe_untouched(pool: PgPool) {
    let author = user(&pool, "author").await;
    let breakfast = tag(&pool, "breakfast").await;
    let egg = ingredient(&pool, "яйцо", "шт").await;
    let recipe = recipes::create_recipe(
        author.id,
        &new_recipe("Boiled egg", vec![breakfast], vec![(egg, 1)]),
        "recipes/images/egg.png",
        &pool,
    )
    .await
    .unwrap();

    let changes = RecipeChanges {
        name: Some(String::from("Two eggs")),
        text: None,
        cooking_time: None,
        image: None,
        tags: vec![breakfast],
        ingredients: vec![(egg, 2), (egg + 1000, 1)],
    };
    match recipes::update_recipe(recipe.id, &changes, None, &pool).await {
        Err(ApiError::Validation(errors)) => assert!(errors.contains("ingredients")),
        other => panic!("unexpected {other:?}"),
    }

    let stored = recipes::get_recipe(recipe.id, &pool).await.unwrap().unwrap();
    assert_eq!(stored.name, "Boiled egg");
    let parts = recipes::list_recipe_parts(&pool, &[recipe.id]).await.unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].amount, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn shopping_list_sums_across_cart(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let baking = tag(&pool, "baking").await;
    let flour = ingredient(&pool, "Мука", "г").await;
    let sugar = ingredient(&pool, "Сахар", "г").await;
    let pinch = ingredient(&pool, "Сахар", "щепотка").await;

    let bread = recipes::create_recipe(
        cook.id,
        &new_recipe("Bread", vec![baking], vec![(flour, 500), (sugar, 10)]),
        "recipes/images/bread.png",
        &pool,
    )
    .await
    .unwrap();
    let cake = recipes::create_recipe(
        cook.id,
        &new_recipe("Cake", vec![baking], vec![(flour, 200), (sugar, 150), (pinch, 1)]),
        "recipes/images/cake.png",
        &pool,
    )
    .await
    .unwrap();
    shopping_cart::add_to_cart(cook.id, bread.id, &pool).await.unwrap();
    shopping_cart::add_to_cart(cook.id, cake.id, &pool).await.unwrap();

    let parts = shopping_cart::list_cart_parts(cook.id, &pool).await.unwrap();
    let text = shopping_list::render(&shopping_list::aggregate(&parts));

    assert_eq!(text, "Мука - 700 г\nСахар - 160 г\nСахар - 1 щепотка\n");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn self_subscription_is_blocked_by_the_schema(pool: PgPool) {
    let cook = user(&pool, "cook").await;

    let error = sqlx::query("INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $1)")
        .bind(cook.id)
        .execute(&pool)
        .await
        .unwrap_err();

    assert_eq!(
        error.as_database_error().and_then(|e| e.constraint()),
        Some("no_self_subscription")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscription_previews_respect_the_limit(pool: PgPool) {
    let author = user(&pool, "author").await;
    let fan = user(&pool, "fan").await;
    let soup = tag(&pool, "soup").await;
    let water = ingredient(&pool, "вода", "мл").await;
    for name in ["Borscht", "Shchi", "Ukha"] {
        recipes::create_recipe(
            author.id,
            &new_recipe(name, vec![soup], vec![(water, 1000)]),
            "recipes/images/soup.png",
            &pool,
        )
        .await
        .unwrap();
    }
    subscriptions::subscribe(fan.id, author.id, &pool).await.unwrap();

    let preview = subscriptions::list_author_recipes(&[author.id], Some(2), &pool)
        .await
        .unwrap();
    assert_eq!(preview.len(), 2);
    assert_eq!(preview[0].name, "Ukha");

    let counts = subscriptions::count_author_recipes(&[author.id], &pool)
        .await
        .unwrap();
    assert_eq!(counts[0].count, 3);

    assert!(matches!(
        subscriptions::subscribe(fan.id, author.id, &pool).await,
        Err(ApiError::InvalidRequest(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn downloading_an_empty_cart_is_a_bad_request(pool: PgPool) {
    let cook = user(&pool, "cook").await;

    let response = warp::test::request()
        .path("/api/recipes/download_shopping_cart/")
        .header("authorization", token(&cook))
        .reply(&routes(app_state(pool)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert!(body["errors"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn pages_past_the_end_are_not_found(pool: PgPool) {
    let author = user(&pool, "author").await;
    let soup = tag(&pool, "soup").await;
    let water = ingredient(&pool, "вода", "мл").await;
    recipes::create_recipe(
        author.id,
        &new_recipe("Ukha", vec![soup], vec![(water, 1000)]),
        "recipes/images/ukha.png",
        &pool,
    )
    .await
    .unwrap();

    let filter = recipes::RecipeFilter::default();
    let page = |number| {
        recipes::fetch_recipes(&filter, None, Pagination::new(number, 6), "/api/recipes/", &pool)
    };

    assert_eq!(page(1).await.unwrap().count, 1);
    assert!(matches!(page(3).await, Err(ApiError::NotFound(_))));
}

use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{config::Config, media::MediaStore};

pub struct AppState {
    pub pool: Pool<Postgres>,
    pub config: Config,
    pub media: MediaStore,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Arc<Self> {
        let media = MediaStore::new(config.media_root.clone(), config.media_url.clone());
        let jwt_secret: Arc<str> = Arc::from(config.jwt_secret.as_str());

        Arc::new(Self {
            pool,
            config,
            media,
            jwt_secret,
        })
    }
}

pub fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

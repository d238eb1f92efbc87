mod database {
    pub mod actions;
    pub mod connect;
    pub mod error;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod handlers;
    pub mod reply;
    pub mod routes;
    pub mod serializers;
    pub mod validators;
}
mod constants;

pub mod config;
pub mod error;
pub mod import;
pub mod media;
pub mod shopping_list;
pub mod state;

pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::*;

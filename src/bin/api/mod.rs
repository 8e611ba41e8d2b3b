use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::task;

use crate::{
    database::models::user::User,
    error::AppError,
    media::MediaStorage,
    store::recipe_store::{RecipeStore, StoreProvider},
    viewer::Viewer,
};

pub mod ingredients;
pub mod payload;
pub mod recipes;
pub mod tags;
pub mod users;

pub struct AppState<P> {
    pub provider: P,
    pub media: Arc<MediaStorage>,
}

impl<P: Clone> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            media: Arc::clone(&self.media),
        }
    }
}

impl<P: StoreProvider> AppState<P> {
    pub fn new(provider: P, media: MediaStorage) -> Self {
        Self {
            provider,
            media: Arc::new(media),
        }
    }

    /// Runs one unit of work against a fresh store on the blocking pool.
    pub async fn run<T, F>(&self, work: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut P::Store, &MediaStorage) -> Result<T, AppError> + Send + 'static,
    {
        let provider = self.provider.clone();
        let media = Arc::clone(&self.media);

        task::spawn_blocking(move || {
            let mut store = provider.store()?;
            work(&mut store, &media)
        })
        .await?
    }
}

/// Resolves the viewer to an existing account, for endpoints that write.
pub fn authenticated<S: RecipeStore>(store: &mut S, viewer: Viewer) -> Result<User, AppError> {
    let user_id = viewer.require_user()?;
    store.user(user_id)?.ok_or(AppError::Unauthorized)
}

pub fn router<P: StoreProvider>(state: AppState<P>) -> Router {
    Router::new()
        .route("/api/ingredients/", get(ingredients::list_ingredients::<P>))
        .route("/api/ingredients/:id/", get(ingredients::get_ingredient::<P>))
        .route("/api/tags/", get(tags::list_tags::<P>))
        .route("/api/tags/:id/", get(tags::get_tag::<P>))
        .route(
            "/api/recipes/",
            get(recipes::list_recipes::<P>).post(recipes::create_recipe::<P>),
        )
        .route(
            "/api/recipes/download_shopping_cart/",
            get(recipes::download_shopping_cart::<P>),
        )
        .route(
            "/api/recipes/:id/",
            get(recipes::get_recipe::<P>)
                .patch(recipes::update_recipe::<P>)
                .delete(recipes::delete_recipe::<P>),
        )
        .route(
            "/api/recipes/:id/favorite/",
            post(recipes::add_favorite::<P>).delete(recipes::remove_favorite::<P>),
        )
        .route(
            "/api/recipes/:id/shopping_cart/",
            post(recipes::add_to_shopping_cart::<P>).delete(recipes::remove_from_shopping_cart::<P>),
        )
        .route(
            "/api/users/:id/subscribe/",
            post(users::subscribe::<P>).delete(users::unsubscribe::<P>),
        )
        .with_state(state)
}

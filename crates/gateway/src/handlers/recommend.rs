//! Daily recommendation endpoint
//!
//! The recommendation model is advisory: when it is down or returns a
//! recipe that no longer exists, the response carries nulls instead of
//! an error.

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::extract::Caller;
use crate::AppState;
use recipeguard_common::{db::Repository, errors::Result};

#[derive(Serialize, Default)]
pub struct TodayRecipeResponse {
    pub recipe_id: Option<Uuid>,
    pub name: Option<String>,
    pub image_path: Option<String>,
}

pub async fn today_recipe(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<TodayRecipeResponse>> {
    let Some(recipe_id) = state.recommend.today_recipe(caller.user_id).await else {
        return Ok(Json(TodayRecipeResponse::default()));
    };

    let repo = Repository::new(state.db.clone());
    match repo.find_recipe_by_id(recipe_id).await? {
        Some(recipe) => Ok(Json(TodayRecipeResponse {
            recipe_id: Some(recipe.id),
            name: Some(recipe.name),
            image_path: recipe.image_path,
        })),
        None => {
            tracing::warn!(
                recipe_id = %recipe_id,
                "Recommended recipe no longer exists, degrading to empty response"
            );
            Ok(Json(TodayRecipeResponse::default()))
        }
    }
}

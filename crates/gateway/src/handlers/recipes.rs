//! Recipe browse/search/detail handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::Caller;
use crate::AppState;
use recipeguard_common::{
    db::{RecipeFilter, Repository},
    detail::{assemble_detail, RecipeDetail},
    errors::{AppError, Result},
};

/// One row of a recipe list response
#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: Uuid,
    pub name: String,
    pub image_path: Option<String>,
    pub serving: i32,
    pub scrapped: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

/// Shared list pipeline: query, refuse empty results, attach scrap flags.
async fn list_response(
    repo: &Repository,
    user_id: Uuid,
    filter: RecipeFilter,
    exclude: &[String],
) -> Result<Json<Vec<RecipeListItem>>> {
    let recipes = repo.list_recipes(&filter, exclude).await?;

    if recipes.is_empty() {
        return Err(AppError::NotFound {
            resource_type: "recipes".to_string(),
            id: format!("{:?}", filter),
        });
    }

    let mut items = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let scrapped = repo.exists_user_scrap(user_id, recipe.id).await?;
        items.push(RecipeListItem {
            id: recipe.id,
            name: recipe.name,
            image_path: recipe.image_path,
            serving: recipe.serving,
            scrapped,
        });
    }

    Ok(Json(items))
}

/// The caller's allergy list; a user with none recorded gets `NotFound`
/// on the filtered endpoints.
async fn require_allergy_list(repo: &Repository, user_id: Uuid) -> Result<Vec<String>> {
    let allergy = repo.allergy_ingredient_names(user_id).await?;
    if allergy.is_empty() {
        return Err(AppError::NotFound {
            resource_type: "allergy ingredients".to_string(),
            id: user_id.to_string(),
        });
    }
    Ok(allergy)
}

/// All recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    list_response(&repo, caller.user_id, RecipeFilter::All, &[]).await
}

/// All recipes, minus those containing the caller's allergy ingredients
pub async fn list_filtered_recipes(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    let allergy = require_allergy_list(&repo, caller.user_id).await?;
    list_response(&repo, caller.user_id, RecipeFilter::All, &allergy).await
}

/// Recipes of one cuisine
pub async fn list_by_cuisine(
    State(state): State<AppState>,
    caller: Caller,
    Path(cuisine): Path<String>,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    list_response(&repo, caller.user_id, RecipeFilter::Cuisine(cuisine), &[]).await
}

/// Recipes of one cuisine, allergy-filtered
pub async fn list_by_cuisine_filtered(
    State(state): State<AppState>,
    caller: Caller,
    Path(cuisine): Path<String>,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    let allergy = require_allergy_list(&repo, caller.user_id).await?;
    list_response(&repo, caller.user_id, RecipeFilter::Cuisine(cuisine), &allergy).await
}

/// Name search
pub async fn search_recipes(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    list_response(&repo, caller.user_id, RecipeFilter::Query(params.q), &[]).await
}

/// Name search, allergy-filtered
pub async fn search_filtered_recipes(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());
    let allergy = require_allergy_list(&repo, caller.user_id).await?;
    list_response(&repo, caller.user_id, RecipeFilter::Query(params.q), &allergy).await
}

/// Full recipe detail for one recipe
pub async fn recipe_detail(
    State(state): State<AppState>,
    caller: Caller,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<RecipeDetail>> {
    let repo = Repository::new(state.db.clone());

    let recipe = repo
        .find_recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::RecipeNotFound {
            id: recipe_id.to_string(),
        })?;

    // Stats are created with the recipe; a missing row is corrupted data.
    let stats = repo
        .find_stats(recipe_id)
        .await?
        .ok_or_else(|| AppError::StatsNotFound {
            recipe_id: recipe_id.to_string(),
        })?;

    let nutrition = repo.find_nutrition(recipe_id).await?;
    let ingredients = repo.list_associations(recipe_id).await?;
    let instructions = repo.list_instructions(recipe_id).await?;

    // Best effort: failures degrade to an empty warning list.
    let warnings = state
        .recommend
        .similar_allergy_ingredients(recipe_id, caller.user_id)
        .await;

    let scrapped = repo.exists_user_scrap(caller.user_id, recipe_id).await?;

    Ok(Json(assemble_detail(
        &recipe,
        nutrition.as_ref(),
        &stats,
        &ingredients,
        &instructions,
        warnings,
        scrapped,
    )))
}

//! Owned-recipe handlers: create, edit form, and the edit operation
//!
//! The edit handler is where reconciliation comes together: both planners
//! run against fresh persisted snapshots, image side effects are resolved,
//! and the repository applies everything in one transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::extract::Caller;
use crate::AppState;
use recipeguard_common::{
    db::{NewInstruction, NewRecipe, RecipeFields, RecipeFilter, Repository},
    detail::{assemble_detail, RecipeDetail},
    errors::{AppError, Result},
    metrics,
    reconcile::{plan_ingredients, plan_instructions, resolve_images, IngredientRow,
        SubmittedInstruction},
};

use super::recipes::RecipeListItem;

/// One submitted ingredient form row; blank handling happens in the planner
#[derive(Debug, Deserialize)]
pub struct IngredientRowDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: String,
}

/// One submitted instruction: body plus at most one image action
#[derive(Debug, Deserialize)]
pub struct InstructionDto {
    pub body: String,

    /// New image bytes, base64-encoded
    #[serde(default)]
    pub image_base64: Option<String>,

    /// Remove the existing image (ignored when `image_base64` is present)
    #[serde(default)]
    pub image_removed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 1))]
    pub serving: i32,

    pub cuisine: String,
    pub food_type: String,
    pub cooking_style: String,

    /// Main recipe image, base64-encoded
    #[serde(default)]
    pub image_base64: Option<String>,

    #[serde(default)]
    pub ingredients: Vec<IngredientRowDto>,

    #[serde(default)]
    pub instructions: Vec<InstructionDto>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 1))]
    pub serving: i32,

    pub cuisine: String,
    pub food_type: String,
    pub cooking_style: String,

    #[serde(default)]
    pub ingredients: Vec<IngredientRowDto>,

    #[serde(default)]
    pub instructions: Vec<InstructionDto>,
}

#[derive(Serialize)]
pub struct CreateRecipeResponse {
    pub id: Uuid,
}

/// Edit-form snapshot of an owned recipe
#[derive(Serialize)]
pub struct RecipeFormEditResponse {
    pub name: String,
    pub image_path: Option<String>,
    pub serving: i32,
    pub cuisine: String,
    pub food_type: String,
    pub cooking_style: String,
    pub ingredients: Vec<FormIngredient>,
    pub instructions: Vec<FormInstruction>,
}

#[derive(Serialize)]
pub struct FormIngredient {
    pub name: String,
    pub quantity: String,
}

#[derive(Serialize)]
pub struct FormInstruction {
    pub body: String,
    pub image_path: Option<String>,
}

fn decode_image(field: &Option<String>) -> Result<Option<Vec<u8>>> {
    match field {
        None => Ok(None),
        Some(encoded) => BASE64
            .decode(encoded)
            .map(Some)
            .map_err(|e| AppError::Validation {
                message: format!("Invalid base64 image data: {}", e),
                field: Some("image_base64".to_string()),
            }),
    }
}

fn ingredient_rows(dtos: &[IngredientRowDto]) -> Vec<IngredientRow> {
    dtos.iter()
        .map(|dto| IngredientRow::new(dto.name.clone(), dto.quantity.clone()))
        .collect()
}

/// Recipes owned by the caller (empty list is a normal result here)
pub async fn my_recipes(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<RecipeListItem>>> {
    let repo = Repository::new(state.db.clone());

    let recipes = repo
        .list_recipes(&RecipeFilter::Owner(caller.user_id), &[])
        .await?;

    let mut items = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let scrapped = repo.exists_user_scrap(caller.user_id, recipe.id).await?;
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

/// Create a recipe with its children and zeroed stats
pub async fn create_recipe(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<CreateRecipeResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    // Main image upload failures surface to the caller; a recipe submitted
    // with an image should not silently lose it.
    let image_path = match decode_image(&request.image_base64)? {
        Some(bytes) => Some(state.store.upload(&bytes).await?),
        None => None,
    };

    // Run the planner against an empty set to validate and dedupe rows.
    let rows = ingredient_rows(&request.ingredients);
    let ingredients = plan_ingredients(&[], &rows)?.inserts;

    // Step images are best effort, like during edits.
    let mut instructions = Vec::with_capacity(request.instructions.len());
    for (idx, dto) in request.instructions.iter().enumerate() {
        let image_path = match decode_image(&dto.image_base64)? {
            Some(bytes) => match state.store.upload(&bytes).await {
                Ok(reference) => Some(reference),
                Err(e) => {
                    tracing::warn!(
                        step_no = idx + 1,
                        error = %e,
                        "Step image upload failed, creating step without image"
                    );
                    None
                }
            },
            None => None,
        };
        instructions.push(NewInstruction {
            body: dto.body.clone(),
            image_path,
        });
    }

    let repo = Repository::new(state.db.clone());
    let recipe = repo
        .create_recipe(NewRecipe {
            user_id: caller.user_id,
            fields: RecipeFields {
                name: request.name,
                serving: request.serving,
                cuisine: request.cuisine,
                food_type: request.food_type,
                cooking_style: request.cooking_style,
            },
            image_path,
            ingredients,
            instructions,
        })
        .await?;

    metrics::record_recipe_created();
    tracing::info!(
        recipe_id = %recipe.id,
        user_id = %caller.user_id,
        "Recipe created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateRecipeResponse { id: recipe.id }),
    ))
}

/// Edit-form snapshot, ownership enforced
pub async fn edit_form(
    State(state): State<AppState>,
    caller: Caller,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<RecipeFormEditResponse>> {
    let repo = Repository::new(state.db.clone());

    let recipe = repo.find_recipe_owned(recipe_id, caller.user_id).await?;
    let ingredients = repo.list_associations(recipe_id).await?;
    let instructions = repo.list_instructions(recipe_id).await?;

    Ok(Json(RecipeFormEditResponse {
        name: recipe.name,
        image_path: recipe.image_path,
        serving: recipe.serving,
        cuisine: recipe.cuisine,
        food_type: recipe.food_type,
        cooking_style: recipe.cooking_style,
        ingredients: ingredients
            .into_iter()
            .map(|a| FormIngredient {
                name: a.name,
                quantity: a.quantity,
            })
            .collect(),
        instructions: instructions
            .into_iter()
            .map(|i| FormInstruction {
                body: i.body,
                image_path: i.image_path,
            })
            .collect(),
    }))
}

/// Delete an owned recipe and its children
pub async fn delete_recipe(
    State(state): State<AppState>,
    caller: Caller,
    Path(recipe_id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.find_recipe_owned(recipe_id, caller.user_id).await?;

    repo.delete_recipe(recipe_id).await?;
    tracing::info!(
        recipe_id = %recipe_id,
        user_id = %caller.user_id,
        "Recipe deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// The edit operation: reconcile both child collections against the
/// submitted snapshot and apply everything atomically.
pub async fn update_recipe(
    State(state): State<AppState>,
    caller: Caller,
    Path(recipe_id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    repo.find_recipe_owned(recipe_id, caller.user_id).await?;

    // Fresh persisted snapshots of both collections.
    let existing_associations = repo.list_associations(recipe_id).await?;
    let existing_instructions = repo.list_instructions(recipe_id).await?;

    // Ingredient validation is all-or-nothing: a bad row aborts here,
    // before anything is written.
    let rows = ingredient_rows(&request.ingredients);
    let ingredient_plan = plan_ingredients(&existing_associations, &rows)?;

    let mut submitted = Vec::with_capacity(request.instructions.len());
    for dto in &request.instructions {
        submitted.push(SubmittedInstruction {
            body: dto.body.clone(),
            new_image: decode_image(&dto.image_base64)?,
            image_removed: dto.image_removed,
        });
    }

    let instruction_plan = plan_instructions(&existing_instructions, submitted);

    // Image side effects happen outside the transaction and are best
    // effort; a failed call degrades that step and never aborts the edit.
    let resolved = resolve_images(instruction_plan, state.store.as_ref()).await;

    let counts = (
        ingredient_plan.deletes.len(),
        ingredient_plan.updates.len(),
        ingredient_plan.inserts.len(),
        resolved.upserts.len(),
        resolved.deletes.len(),
    );

    repo.update_recipe(
        recipe_id,
        RecipeFields {
            name: request.name,
            serving: request.serving,
            cuisine: request.cuisine,
            food_type: request.food_type,
            cooking_style: request.cooking_style,
        },
        ingredient_plan,
        resolved,
    )
    .await?;

    metrics::record_recipe_updated(counts.0, counts.1, counts.2, counts.3, counts.4);
    tracing::info!(
        recipe_id = %recipe_id,
        user_id = %caller.user_id,
        association_deletes = counts.0,
        association_updates = counts.1,
        association_inserts = counts.2,
        "Recipe updated"
    );

    // Render the post-update state.
    let recipe = repo
        .find_recipe_by_id(recipe_id)
        .await?
        .ok_or_else(|| AppError::RecipeNotFound {
            id: recipe_id.to_string(),
        })?;
    let stats = repo
        .find_stats(recipe_id)
        .await?
        .ok_or_else(|| AppError::StatsNotFound {
            recipe_id: recipe_id.to_string(),
        })?;
    let nutrition = repo.find_nutrition(recipe_id).await?;
    let ingredients = repo.list_associations(recipe_id).await?;
    let instructions = repo.list_instructions(recipe_id).await?;

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

//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling and transaction support. Edit reconciliation plans are
//! applied here: one transaction covers the recipe field updates and both
//! child-collection plans, so either everything commits or nothing does.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::reconcile::{
    AssociationSnapshot, ImageOutcome, IngredientPlan, InstructionSnapshot,
    ResolvedInstructionPlan,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
};
use uuid::Uuid;

/// Scalar recipe fields carried by create and edit forms
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub serving: i32,
    pub cuisine: String,
    pub food_type: String,
    pub cooking_style: String,
}

/// Filter for recipe list queries
#[derive(Debug, Clone)]
pub enum RecipeFilter {
    /// Every recipe
    All,

    /// Recipes of one cuisine
    Cuisine(String),

    /// Name search
    Query(String),

    /// Recipes owned by one user
    Owner(Uuid),
}

/// A new instruction row for recipe creation (images already uploaded)
#[derive(Debug, Clone)]
pub struct NewInstruction {
    pub body: String,
    pub image_path: Option<String>,
}

/// Everything needed to create a recipe transactionally
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub fields: RecipeFields,
    pub image_path: Option<String>,

    /// Validated, deduplicated (name, quantity) pairs
    pub ingredients: Vec<(String, String)>,

    /// In submission order; step numbers are assigned by position
    pub instructions: Vec<NewInstruction>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Recipe Reads
    // ========================================================================

    /// Find recipe by ID
    pub async fn find_recipe_by_id(&self, id: Uuid) -> Result<Option<Recipe>> {
        RecipeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a recipe and verify ownership in one step.
    ///
    /// A recipe that exists but belongs to someone else is `Forbidden`;
    /// a recipe that does not exist is `RecipeNotFound`.
    pub async fn find_recipe_owned(&self, recipe_id: Uuid, user_id: Uuid) -> Result<Recipe> {
        let recipe = self
            .find_recipe_by_id(recipe_id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound {
                id: recipe_id.to_string(),
            })?;

        if recipe.user_id != user_id {
            return Err(AppError::Forbidden {
                message: "Recipe belongs to another user".to_string(),
            });
        }

        Ok(recipe)
    }

    /// List recipes matching a filter, optionally excluding every recipe
    /// containing one of `exclude_ingredients` (the caller's allergy list).
    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        exclude_ingredients: &[String],
    ) -> Result<Vec<Recipe>> {
        if exclude_ingredients.is_empty() {
            let mut query = RecipeEntity::find();
            query = match filter {
                RecipeFilter::All => query,
                RecipeFilter::Cuisine(cuisine) => {
                    query.filter(RecipeColumn::Cuisine.eq(cuisine.clone()))
                }
                RecipeFilter::Query(q) => query.filter(RecipeColumn::Name.contains(q.clone())),
                RecipeFilter::Owner(user_id) => query.filter(RecipeColumn::UserId.eq(*user_id)),
            };

            return query
                .order_by_desc(RecipeColumn::CreatedAt)
                .all(self.read_conn())
                .await
                .map_err(Into::into);
        }

        // Allergy-aware variant: exclude recipes containing any listed
        // ingredient name via a NOT EXISTS subquery.
        let mut values: Vec<sea_orm::Value> = Vec::new();
        let filter_sql = match filter {
            RecipeFilter::All => String::new(),
            RecipeFilter::Cuisine(cuisine) => {
                values.push(cuisine.clone().into());
                format!("AND r.cuisine = ${}", values.len())
            }
            RecipeFilter::Query(q) => {
                values.push(q.clone().into());
                format!("AND r.name ILIKE '%' || ${} || '%'", values.len())
            }
            RecipeFilter::Owner(user_id) => {
                values.push((*user_id).into());
                format!("AND r.user_id = ${}", values.len())
            }
        };

        let placeholders: Vec<String> = exclude_ingredients
            .iter()
            .enumerate()
            .map(|(i, _)| format!("${}", values.len() + i + 1))
            .collect();
        for name in exclude_ingredients {
            values.push(name.clone().into());
        }

        let sql = format!(
            r#"
            SELECT r.*
            FROM recipes r
            WHERE NOT EXISTS (
                SELECT 1
                FROM recipe_ingredients ri
                JOIN ingredients i ON ri.ingredient_id = i.id
                WHERE ri.recipe_id = r.id
                  AND i.name IN ({})
            )
            {}
            ORDER BY r.created_at DESC
            "#,
            placeholders.join(", "),
            filter_sql
        );

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

        RecipeEntity::find()
            .from_raw_sql(stmt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load the recipe's stats row
    pub async fn find_stats(&self, recipe_id: Uuid) -> Result<Option<RecipeStats>> {
        RecipeStatsEntity::find_by_id(recipe_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load the recipe's nutrition snapshot, if any
    pub async fn find_nutrition(&self, recipe_id: Uuid) -> Result<Option<Nutrition>> {
        NutritionEntity::find_by_id(recipe_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load the ordered instruction list as reconciliation snapshots
    pub async fn list_instructions(&self, recipe_id: Uuid) -> Result<Vec<InstructionSnapshot>> {
        let rows = InstructionEntity::find()
            .filter(InstructionColumn::RecipeId.eq(recipe_id))
            .order_by_asc(InstructionColumn::StepNo)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| InstructionSnapshot {
                id: row.id,
                step_no: row.step_no,
                body: row.body,
                image_path: row.image_path,
            })
            .collect())
    }

    /// Load the association set joined to ingredient names
    pub async fn list_associations(&self, recipe_id: Uuid) -> Result<Vec<AssociationSnapshot>> {
        let rows = RecipeIngredientEntity::find()
            .filter(RecipeIngredientColumn::RecipeId.eq(recipe_id))
            .find_also_related(IngredientEntity)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(assoc, ingredient)| AssociationSnapshot {
                id: assoc.id,
                name: ingredient.map(|i| i.name).unwrap_or_default(),
                quantity: assoc.quantity,
            })
            .collect())
    }

    // ========================================================================
    // User Reads
    // ========================================================================

    /// The user's allergy ingredient names
    pub async fn allergy_ingredient_names(&self, user_id: Uuid) -> Result<Vec<String>> {
        let rows = UserIngredientEntity::find()
            .filter(UserIngredientColumn::UserId.eq(user_id))
            .all(self.read_conn())
            .await?;

        Ok(rows.into_iter().map(|row| row.ingredient_name).collect())
    }

    /// Has this user scrapped this recipe?
    pub async fn exists_user_scrap(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool> {
        let count = UserScrapEntity::find()
            .filter(UserScrapColumn::UserId.eq(user_id))
            .filter(UserScrapColumn::RecipeId.eq(recipe_id))
            .count(self.read_conn())
            .await?;

        Ok(count > 0)
    }

    // ========================================================================
    // Ingredient Catalog
    // ========================================================================

    /// Look up an ingredient by exact name, creating it on first use.
    ///
    /// Concurrent first-uses of the same name race on the insert; the unique
    /// name constraint turns the loser's insert into a conflict, which is
    /// retried as a lookup.
    pub async fn resolve_ingredient<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> Result<Uuid> {
        if let Some(existing) = IngredientEntity::find()
            .filter(IngredientColumn::Name.eq(name))
            .one(conn)
            .await?
        {
            return Ok(existing.id);
        }

        let candidate = IngredientActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
        };

        match candidate.insert(conn).await {
            Ok(created) => Ok(created.id),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = IngredientEntity::find()
                    .filter(IngredientColumn::Name.eq(name))
                    .one(conn)
                    .await?
                    .ok_or_else(|| AppError::Internal {
                        message: format!("ingredient '{}' vanished after insert conflict", name),
                    })?;
                Ok(existing.id)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Recipe Writes
    // ========================================================================

    /// Create a recipe with its instructions, associations and zeroed stats
    /// in one transaction.
    pub async fn create_recipe(&self, new: NewRecipe) -> Result<Recipe> {
        let txn = self.pool.begin_write().await?;
        let now = chrono::Utc::now();

        let recipe = RecipeActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            name: Set(new.fields.name),
            image_path: Set(new.image_path),
            serving: Set(new.fields.serving),
            cuisine: Set(new.fields.cuisine),
            food_type: Set(new.fields.food_type),
            cooking_style: Set(new.fields.cooking_style),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        for (name, quantity) in new.ingredients {
            let ingredient_id = self.resolve_ingredient(&txn, &name).await?;
            RecipeIngredientActiveModel {
                id: Set(Uuid::new_v4()),
                recipe_id: Set(recipe.id),
                ingredient_id: Set(ingredient_id),
                quantity: Set(quantity),
            }
            .insert(&txn)
            .await?;
        }

        for (idx, instruction) in new.instructions.into_iter().enumerate() {
            InstructionActiveModel {
                id: Set(Uuid::new_v4()),
                recipe_id: Set(recipe.id),
                step_no: Set(idx as i32 + 1),
                body: Set(instruction.body),
                image_path: Set(instruction.image_path),
            }
            .insert(&txn)
            .await?;
        }

        RecipeStatsActiveModel {
            recipe_id: Set(recipe.id),
            view_count: Set(0),
            scrap_count: Set(0),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(recipe)
    }

    /// Apply an edit: recipe field updates plus both reconciliation plans,
    /// atomically.
    ///
    /// Association mutations run deletes first, then updates, then inserts,
    /// so the per-recipe ingredient-name uniqueness never breaks mid-apply.
    pub async fn update_recipe(
        &self,
        recipe_id: Uuid,
        fields: RecipeFields,
        ingredient_plan: IngredientPlan,
        instruction_plan: ResolvedInstructionPlan,
    ) -> Result<()> {
        let txn = self.pool.begin_write().await?;

        let recipe = RecipeEntity::find_by_id(recipe_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound {
                id: recipe_id.to_string(),
            })?;

        let mut recipe: RecipeActiveModel = recipe.into();
        recipe.name = Set(fields.name);
        recipe.serving = Set(fields.serving);
        recipe.cuisine = Set(fields.cuisine);
        recipe.food_type = Set(fields.food_type);
        recipe.cooking_style = Set(fields.cooking_style);
        recipe.updated_at = Set(chrono::Utc::now().into());
        recipe.update(&txn).await?;

        // Associations: deletes, updates, inserts - in that order.
        if !ingredient_plan.deletes.is_empty() {
            RecipeIngredientEntity::delete_many()
                .filter(RecipeIngredientColumn::Id.is_in(ingredient_plan.deletes))
                .exec(&txn)
                .await?;
        }

        for (id, quantity) in ingredient_plan.updates {
            RecipeIngredientActiveModel {
                id: Set(id),
                quantity: Set(quantity),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }

        for (name, quantity) in ingredient_plan.inserts {
            let ingredient_id = self.resolve_ingredient(&txn, &name).await?;
            RecipeIngredientActiveModel {
                id: Set(Uuid::new_v4()),
                recipe_id: Set(recipe_id),
                ingredient_id: Set(ingredient_id),
                quantity: Set(quantity),
            }
            .insert(&txn)
            .await?;
        }

        // Instructions: clear leftovers first so step numbers stay unique.
        if !instruction_plan.deletes.is_empty() {
            InstructionEntity::delete_many()
                .filter(InstructionColumn::Id.is_in(instruction_plan.deletes))
                .exec(&txn)
                .await?;
        }

        for step in instruction_plan.upserts {
            match step.existing_id {
                Some(id) => {
                    let mut row = InstructionActiveModel {
                        id: Set(id),
                        step_no: Set(step.step_no),
                        body: Set(step.body),
                        ..Default::default()
                    };
                    if let ImageOutcome::Set(image) = step.image {
                        row.image_path = Set(image);
                    }
                    row.update(&txn).await?;
                }
                None => {
                    let image_path = match step.image {
                        ImageOutcome::Set(image) => image,
                        // A brand-new row has nothing to keep
                        ImageOutcome::Keep => None,
                    };
                    InstructionActiveModel {
                        id: Set(Uuid::new_v4()),
                        recipe_id: Set(recipe_id),
                        step_no: Set(step.step_no),
                        body: Set(step.body),
                        image_path: Set(image_path),
                    }
                    .insert(&txn)
                    .await?;
                }
            }
        }

        txn.commit().await.map_err(Into::into)
    }

    /// Delete a recipe and its children
    pub async fn delete_recipe(&self, recipe_id: Uuid) -> Result<bool> {
        let txn = self.pool.begin_write().await?;

        RecipeIngredientEntity::delete_many()
            .filter(RecipeIngredientColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        InstructionEntity::delete_many()
            .filter(InstructionColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        RecipeStatsEntity::delete_many()
            .filter(RecipeStatsColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        NutritionEntity::delete_many()
            .filter(NutritionColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        UserScrapEntity::delete_many()
            .filter(UserScrapColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;

        let result = RecipeEntity::delete_by_id(recipe_id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}

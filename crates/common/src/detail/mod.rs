//! Recipe detail assembly
//!
//! Pure read-side transform: combines the recipe row with its stats,
//! children, allergy warnings and the viewer's scrap flag into the detail
//! view. Missing nutrition renders as zeros by policy; missing stats is
//! the caller's `StatsNotFound` condition and never reaches this module.

use crate::db::models::{Nutrition, Recipe, RecipeStats};
use crate::reconcile::{AssociationSnapshot, InstructionSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ingredient line of the detail view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientDetail {
    pub name: String,
    pub quantity: String,
}

/// One instruction line of the detail view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstructionDetail {
    pub body: String,
    pub image_path: Option<String>,
}

/// Nutrient fields, zero-filled when the recipe has no nutrition snapshot
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionDetail {
    pub calories: f64,
    pub sodium: f64,
    pub carbohydrate: f64,
    pub fat: f64,
    pub protein: f64,
}

/// The read-facing recipe detail view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub name: String,
    pub image_path: Option<String>,
    pub serving: i32,
    pub cuisine: String,
    pub food_type: String,
    pub cooking_style: String,
    pub nutrition: NutritionDetail,
    pub scrapped: bool,
    pub view_count: i32,
    pub scrap_count: i32,
    pub ingredients: Vec<IngredientDetail>,
    pub instructions: Vec<InstructionDetail>,
    pub similar_allergy_ingredients: Vec<String>,
}

/// Build the detail view from fully loaded state.
pub fn assemble_detail(
    recipe: &Recipe,
    nutrition: Option<&Nutrition>,
    stats: &RecipeStats,
    ingredients: &[AssociationSnapshot],
    instructions: &[InstructionSnapshot],
    similar_allergy_ingredients: Vec<String>,
    scrapped: bool,
) -> RecipeDetail {
    // No nutrition snapshot means zeros for every nutrient, never an error.
    let nutrition = nutrition
        .map(|n| NutritionDetail {
            calories: n.calories,
            sodium: n.sodium,
            carbohydrate: n.carbohydrate,
            fat: n.fat,
            protein: n.protein,
        })
        .unwrap_or_default();

    RecipeDetail {
        id: recipe.id,
        name: recipe.name.clone(),
        image_path: recipe.image_path.clone(),
        serving: recipe.serving,
        cuisine: recipe.cuisine.clone(),
        food_type: recipe.food_type.clone(),
        cooking_style: recipe.cooking_style.clone(),
        nutrition,
        scrapped,
        view_count: stats.view_count,
        scrap_count: stats.scrap_count,
        ingredients: ingredients
            .iter()
            .map(|a| IngredientDetail {
                name: a.name.clone(),
                quantity: a.quantity.clone(),
            })
            .collect(),
        instructions: instructions
            .iter()
            .map(|i| InstructionDetail {
                body: i.body.clone(),
                image_path: i.image_path.clone(),
            })
            .collect(),
        similar_allergy_ingredients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> Recipe {
        let now = chrono::Utc::now().into();
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Kimchi stew".to_string(),
            image_path: Some("img-main".to_string()),
            serving: 2,
            cuisine: "Korean".to_string(),
            food_type: "Soup".to_string(),
            cooking_style: "Simmered".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn stats(recipe_id: Uuid) -> RecipeStats {
        RecipeStats {
            recipe_id,
            view_count: 7,
            scrap_count: 3,
        }
    }

    #[test]
    fn test_missing_nutrition_yields_zeros() {
        let recipe = recipe();
        let detail = assemble_detail(
            &recipe,
            None,
            &stats(recipe.id),
            &[],
            &[],
            Vec::new(),
            false,
        );

        assert_eq!(detail.nutrition.calories, 0.0);
        assert_eq!(detail.nutrition.sodium, 0.0);
        assert_eq!(detail.nutrition.carbohydrate, 0.0);
        assert_eq!(detail.nutrition.fat, 0.0);
        assert_eq!(detail.nutrition.protein, 0.0);
    }

    #[test]
    fn test_nutrition_passthrough() {
        let recipe = recipe();
        let nutrition = Nutrition {
            recipe_id: recipe.id,
            calories: 320.0,
            sodium: 800.0,
            carbohydrate: 12.0,
            fat: 20.0,
            protein: 25.0,
        };

        let detail = assemble_detail(
            &recipe,
            Some(&nutrition),
            &stats(recipe.id),
            &[],
            &[],
            Vec::new(),
            true,
        );

        assert_eq!(detail.nutrition.calories, 320.0);
        assert!(detail.scrapped);
        assert_eq!(detail.view_count, 7);
        assert_eq!(detail.scrap_count, 3);
    }

    #[test]
    fn test_children_preserve_order() {
        let recipe = recipe();
        let instructions = vec![
            InstructionSnapshot {
                id: Uuid::new_v4(),
                step_no: 1,
                body: "Chop".to_string(),
                image_path: None,
            },
            InstructionSnapshot {
                id: Uuid::new_v4(),
                step_no: 2,
                body: "Simmer".to_string(),
                image_path: Some("img-2".to_string()),
            },
        ];
        let ingredients = vec![AssociationSnapshot {
            id: Uuid::new_v4(),
            name: "kimchi".to_string(),
            quantity: "300 g".to_string(),
        }];

        let detail = assemble_detail(
            &recipe,
            None,
            &stats(recipe.id),
            &ingredients,
            &instructions,
            vec!["shrimp".to_string()],
            false,
        );

        assert_eq!(detail.instructions[0].body, "Chop");
        assert_eq!(detail.instructions[1].image_path.as_deref(), Some("img-2"));
        assert_eq!(detail.ingredients[0].name, "kimchi");
        assert_eq!(detail.similar_allergy_ingredients, vec!["shrimp"]);
    }
}

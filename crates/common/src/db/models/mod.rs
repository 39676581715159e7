//! SeaORM entity models
//!
//! Database entities for RecipeGuard

mod ingredient;
mod instruction;
mod nutrition;
mod recipe;
mod recipe_ingredient;
mod recipe_stats;
mod user_ingredient;
mod user_scrap;

pub use recipe::{
    ActiveModel as RecipeActiveModel, Column as RecipeColumn, Entity as RecipeEntity,
    Model as Recipe,
};

pub use ingredient::{
    ActiveModel as IngredientActiveModel, Column as IngredientColumn, Entity as IngredientEntity,
    Model as Ingredient,
};

pub use recipe_ingredient::{
    ActiveModel as RecipeIngredientActiveModel, Column as RecipeIngredientColumn,
    Entity as RecipeIngredientEntity, Model as RecipeIngredient,
};

pub use instruction::{
    ActiveModel as InstructionActiveModel, Column as InstructionColumn,
    Entity as InstructionEntity, Model as Instruction,
};

pub use nutrition::{
    ActiveModel as NutritionActiveModel, Column as NutritionColumn, Entity as NutritionEntity,
    Model as Nutrition,
};

pub use recipe_stats::{
    ActiveModel as RecipeStatsActiveModel, Column as RecipeStatsColumn,
    Entity as RecipeStatsEntity, Model as RecipeStats,
};

pub use user_scrap::{
    ActiveModel as UserScrapActiveModel, Column as UserScrapColumn, Entity as UserScrapEntity,
    Model as UserScrap,
};

pub use user_ingredient::{
    ActiveModel as UserIngredientActiveModel, Column as UserIngredientColumn,
    Entity as UserIngredientEntity, Model as UserIngredient,
};

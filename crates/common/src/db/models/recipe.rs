//! Recipe entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Main recipe image reference (opaque image-store key)
    #[sea_orm(column_type = "Text", nullable)]
    pub image_path: Option<String>,

    pub serving: i32,

    #[sea_orm(column_type = "Text")]
    pub cuisine: String,

    #[sea_orm(column_type = "Text")]
    pub food_type: String,

    #[sea_orm(column_type = "Text")]
    pub cooking_style: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::instruction::Entity")]
    Instructions,

    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,

    #[sea_orm(has_one = "super::recipe_stats::Entity")]
    Stats,

    #[sea_orm(has_one = "super::nutrition::Entity")]
    Nutrition,
}

impl Related<super::instruction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructions.def()
    }
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::recipe_stats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stats.def()
    }
}

impl Related<super::nutrition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Nutrition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

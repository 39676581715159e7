//! Instruction entity
//!
//! `step_no` is 1-based, dense, and unique within a recipe. Position order
//! equals step order; reconciliation matches rows by step number, not body.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instructions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub recipe_id: Uuid,

    /// 1-based sequence number within the recipe
    pub step_no: i32,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Step image reference (opaque image-store key)
    #[sea_orm(column_type = "Text", nullable)]
    pub image_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

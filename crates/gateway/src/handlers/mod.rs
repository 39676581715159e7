//! API handlers module

pub mod health;
pub mod my_recipes;
pub mod recipes;
pub mod recommend;

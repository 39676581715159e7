//! Edit reconciliation core
//!
//! An edit request carries a full snapshot of the desired ingredient and
//! instruction lists. Each reconciler diffs that snapshot against the
//! persisted state and produces an apply-plan (explicit inserts, updates,
//! deletes); the repository executes both plans in one transaction. Image
//! side effects are resolved between planning and application and never
//! abort the edit.

pub mod ingredients;
pub mod instructions;

pub use ingredients::{plan_ingredients, AssociationSnapshot, IngredientPlan, IngredientRow};
pub use instructions::{
    plan_instructions, resolve_images, ImageOp, ImageOutcome, InstructionPlan, InstructionSnapshot,
    ResolvedInstructionPlan, ResolvedUpsert, StepUpsert, SubmittedInstruction,
};

//! Ingredient reconciliation
//!
//! Diffs a submitted (name, quantity) list against the persisted association
//! set of one recipe. Names are unique per recipe, so the persisted set is
//! effectively a name -> quantity mapping with a surrogate row id attached.
//!
//! Blank handling is all-or-nothing: a row with both sides blank is an
//! intentionally empty form row and is dropped; a row with exactly one side
//! blank fails the whole plan and nothing is applied.

use crate::errors::{AppError, Result};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A submitted form row, either field may be blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub name: String,
    pub quantity: String,
}

impl IngredientRow {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

/// Persisted association snapshot (one row of `recipe_ingredients`, joined
/// to its ingredient name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSnapshot {
    pub id: Uuid,
    pub name: String,
    pub quantity: String,
}

/// Apply-plan for the association set.
///
/// Must be applied in field order: deletes, then updates, then inserts, so
/// the per-recipe name uniqueness invariant holds at every point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientPlan {
    /// Association row ids to delete
    pub deletes: Vec<Uuid>,

    /// (association row id, new quantity) - row identity is preserved
    pub updates: Vec<(Uuid, String)>,

    /// (ingredient name, quantity) - ingredient resolved via the catalog at
    /// apply time
    pub inserts: Vec<(String, String)>,
}

impl IngredientPlan {
    /// True when applying the plan would change nothing
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Compute the minimal apply-plan turning `existing` into `submitted`.
///
/// Duplicate submitted names are tolerated; the last occurrence wins.
pub fn plan_ingredients(
    existing: &[AssociationSnapshot],
    submitted: &[IngredientRow],
) -> Result<IngredientPlan> {
    // Validate and collapse the form rows into name -> quantity, preserving
    // first-seen order for deterministic insert order.
    let mut order: Vec<String> = Vec::new();
    let mut desired: HashMap<String, String> = HashMap::new();

    for row in submitted {
        let name = row.name.trim();
        let quantity = row.quantity.trim();

        if name.is_empty() && quantity.is_empty() {
            // Intentionally empty form row
            continue;
        }
        if name.is_empty() || quantity.is_empty() {
            return Err(AppError::InvalidIngredientRow {
                name: row.name.clone(),
                quantity: row.quantity.clone(),
            });
        }

        if desired.insert(name.to_string(), quantity.to_string()).is_none() {
            order.push(name.to_string());
        }
    }

    let mut plan = IngredientPlan::default();

    // Walk the persisted set: absent names are deleted, changed quantities
    // are updated in place (same row id).
    let mut matched: HashSet<&str> = HashSet::new();
    for assoc in existing {
        match desired.get(assoc.name.as_str()) {
            None => plan.deletes.push(assoc.id),
            Some(quantity) => {
                matched.insert(assoc.name.as_str());
                if *quantity != assoc.quantity {
                    plan.updates.push((assoc.id, quantity.clone()));
                }
            }
        }
    }

    // Names with no existing association become inserts.
    for name in order {
        if !matched.contains(name.as_str()) {
            let quantity = desired
                .remove(&name)
                .unwrap_or_default();
            plan.inserts.push((name, quantity));
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assoc(name: &str, quantity: &str) -> AssociationSnapshot {
        AssociationSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            quantity: quantity.to_string(),
        }
    }

    #[test]
    fn test_blank_row_is_dropped() {
        let plan = plan_ingredients(&[], &[IngredientRow::new("", "")]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_half_blank_row_fails() {
        let existing = vec![assoc("salt", "1 tsp")];

        let err = plan_ingredients(&existing, &[IngredientRow::new("salt", "")]).unwrap_err();
        assert!(matches!(err, AppError::InvalidIngredientRow { .. }));

        let err = plan_ingredients(&existing, &[IngredientRow::new("", "2 tbsp")]).unwrap_err();
        assert!(matches!(err, AppError::InvalidIngredientRow { .. }));
    }

    #[test]
    fn test_half_blank_row_poisons_whole_submission() {
        // A valid row alongside an invalid one still fails: no partial apply.
        let rows = vec![
            IngredientRow::new("flour", "1 cup"),
            IngredientRow::new("salt", ""),
        ];
        assert!(plan_ingredients(&[], &rows).is_err());
    }

    #[test]
    fn test_delete_update_insert() {
        let flour = assoc("flour", "1 cup");
        let salt = assoc("salt", "1 tsp");
        let existing = vec![flour.clone(), salt.clone()];

        let submitted = vec![
            IngredientRow::new("flour", "2 cups"),
            IngredientRow::new("sugar", "1 cup"),
        ];

        let plan = plan_ingredients(&existing, &submitted).unwrap();
        assert_eq!(plan.deletes, vec![salt.id]);
        assert_eq!(plan.updates, vec![(flour.id, "2 cups".to_string())]);
        assert_eq!(plan.inserts, vec![("sugar".to_string(), "1 cup".to_string())]);
    }

    #[test]
    fn test_unchanged_rows_are_untouched() {
        let existing = vec![assoc("flour", "1 cup"), assoc("salt", "1 tsp")];
        let submitted = vec![
            IngredientRow::new("flour", "1 cup"),
            IngredientRow::new("salt", "1 tsp"),
        ];

        // Idempotence: resubmitting the current state yields an empty plan.
        let plan = plan_ingredients(&existing, &submitted).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_duplicate_names_last_occurrence_wins() {
        let flour = assoc("flour", "1 cup");
        let submitted = vec![
            IngredientRow::new("flour", "2 cups"),
            IngredientRow::new("flour", "3 cups"),
        ];

        let plan = plan_ingredients(&[flour.clone()], &submitted).unwrap();
        assert_eq!(plan.updates, vec![(flour.id, "3 cups".to_string())]);
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn test_names_are_trimmed() {
        let flour = assoc("flour", "1 cup");
        let submitted = vec![IngredientRow::new(" flour ", " 1 cup ")];

        let plan = plan_ingredients(&[flour], &submitted).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_insert_order_follows_submission() {
        let submitted = vec![
            IngredientRow::new("c", "3"),
            IngredientRow::new("a", "1"),
            IngredientRow::new("b", "2"),
        ];

        let plan = plan_ingredients(&[], &submitted).unwrap();
        let names: Vec<&str> = plan.inserts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_clear_all_deletes_everything() {
        let existing = vec![assoc("flour", "1 cup"), assoc("salt", "1 tsp")];

        let plan = plan_ingredients(&existing, &[]).unwrap();
        assert_eq!(plan.deletes.len(), 2);
        assert!(plan.updates.is_empty());
        assert!(plan.inserts.is_empty());
    }
}

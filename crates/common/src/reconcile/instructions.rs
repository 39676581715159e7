//! Instruction reconciliation
//!
//! The submitted list is authoritative: position k in the submission IS step
//! number k. Planning matches persisted rows by step number (preserving row
//! identity for positions that already exist), always overwrites the body,
//! and records an image operation per step. Leftover persisted steps beyond
//! the submitted length are deleted; their stored images are intentionally
//! left in the store (see `plan_instructions`).
//!
//! Image side effects run in `resolve_images`, between planning and the
//! database transaction. A store failure downgrades that step to "no image"
//! and never aborts the edit.

use crate::storage::ImageStore;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Persisted instruction snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSnapshot {
    pub id: Uuid,
    pub step_no: i32,
    pub body: String,
    pub image_path: Option<String>,
}

/// One submitted instruction: body text plus at most one image action
#[derive(Debug, Clone, Default)]
pub struct SubmittedInstruction {
    pub body: String,

    /// Raw bytes of a newly uploaded image, if any
    pub new_image: Option<Vec<u8>>,

    /// Explicit "remove the existing image" flag; ignored when a new image
    /// is present
    pub image_removed: bool,
}

/// Image operation for one step, mutually exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOp {
    /// Leave the existing reference untouched
    Keep,

    /// Upload new bytes; delete `old` from the store once the upload lands
    Replace {
        bytes: Vec<u8>,
        old: Option<String>,
    },

    /// Clear the reference; delete `old` from the store if present
    Clear { old: Option<String> },
}

/// Planned upsert for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepUpsert {
    /// Persisted row to reuse; `None` means a new row
    pub existing_id: Option<Uuid>,

    /// 1-based position in the submitted list
    pub step_no: i32,

    pub body: String,

    pub image_op: ImageOp,
}

/// Apply-plan for the instruction list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionPlan {
    /// One upsert per submitted position, in step order
    pub upserts: Vec<StepUpsert>,

    /// Persisted rows whose step number was not reused
    pub deletes: Vec<Uuid>,
}

/// Image outcome after side effects have run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Leave the column as it is
    Keep,

    /// Write this value (a fresh reference, or `None` to clear)
    Set(Option<String>),
}

/// `StepUpsert` with its image operation resolved to a column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpsert {
    pub existing_id: Option<Uuid>,
    pub step_no: i32,
    pub body: String,
    pub image: ImageOutcome,
}

/// Plan ready for transactional application: row mutations only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedInstructionPlan {
    pub upserts: Vec<ResolvedUpsert>,
    pub deletes: Vec<Uuid>,
}

/// Compute the apply-plan turning `existing` into `submitted`.
///
/// Steps removed outright (step_no beyond the submitted length) keep their
/// stored image objects; only replaced or explicitly cleared images on
/// retained steps are deleted from the store. That asymmetry matches the
/// existing edit semantics and is covered by tests.
pub fn plan_instructions(
    existing: &[InstructionSnapshot],
    submitted: Vec<SubmittedInstruction>,
) -> InstructionPlan {
    let by_step: HashMap<i32, &InstructionSnapshot> =
        existing.iter().map(|ins| (ins.step_no, ins)).collect();

    let submitted_len = submitted.len() as i32;
    let mut upserts = Vec::with_capacity(submitted.len());

    for (idx, item) in submitted.into_iter().enumerate() {
        let step_no = idx as i32 + 1;
        let current = by_step.get(&step_no).copied();

        let old_image = current.and_then(|ins| ins.image_path.clone());
        let image_op = if let Some(bytes) = item.new_image {
            ImageOp::Replace {
                bytes,
                old: old_image,
            }
        } else if item.image_removed {
            ImageOp::Clear { old: old_image }
        } else {
            ImageOp::Keep
        };

        upserts.push(StepUpsert {
            existing_id: current.map(|ins| ins.id),
            step_no,
            body: item.body,
            image_op,
        });
    }

    let deletes = existing
        .iter()
        .filter(|ins| ins.step_no < 1 || ins.step_no > submitted_len)
        .map(|ins| ins.id)
        .collect();

    InstructionPlan { upserts, deletes }
}

/// Execute the image operations of a plan against the store.
///
/// Uploads and deletes are best effort: a failed upload leaves the step with
/// no image and the superseded object still in the store, a failed delete is
/// logged and ignored. The returned plan holds
/// only row mutations and is safe to apply inside a transaction.
pub async fn resolve_images(
    plan: InstructionPlan,
    store: &dyn ImageStore,
) -> ResolvedInstructionPlan {
    let mut upserts = Vec::with_capacity(plan.upserts.len());

    for step in plan.upserts {
        let image = match step.image_op {
            ImageOp::Keep => ImageOutcome::Keep,
            ImageOp::Replace { bytes, old } => {
                // The old object is deleted only once the upload has landed;
                // a failed upload leaves it in the store untouched.
                match store.upload(&bytes).await {
                    Ok(reference) => {
                        delete_old(store, old, step.step_no).await;
                        ImageOutcome::Set(Some(reference))
                    }
                    Err(e) => {
                        warn!(
                            step_no = step.step_no,
                            error = %e,
                            "Image upload failed, storing step without image"
                        );
                        ImageOutcome::Set(None)
                    }
                }
            }
            ImageOp::Clear { old } => {
                delete_old(store, old, step.step_no).await;
                ImageOutcome::Set(None)
            }
        };

        upserts.push(ResolvedUpsert {
            existing_id: step.existing_id,
            step_no: step.step_no,
            body: step.body,
            image,
        });
    }

    ResolvedInstructionPlan {
        upserts,
        deletes: plan.deletes,
    }
}

async fn delete_old(store: &dyn ImageStore, old: Option<String>, step_no: i32) {
    if let Some(reference) = old {
        if let Err(e) = store.delete(&reference).await {
            warn!(
                step_no,
                reference = %reference,
                error = %e,
                "Superseded image delete failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, Result};
    use crate::storage::{ImageStore, MemoryImageStore};
    use async_trait::async_trait;

    fn snapshot(step_no: i32, body: &str, image: Option<String>) -> InstructionSnapshot {
        InstructionSnapshot {
            id: Uuid::new_v4(),
            step_no,
            body: body.to_string(),
            image_path: image,
        }
    }

    fn text_step(body: &str) -> SubmittedInstruction {
        SubmittedInstruction {
            body: body.to_string(),
            ..Default::default()
        }
    }

    /// Store that refuses every call, for degrade-path tests
    struct BrokenStore;

    #[async_trait]
    impl ImageStore for BrokenStore {
        async fn upload(&self, _bytes: &[u8]) -> Result<String> {
            Err(AppError::Storage {
                message: "unreachable".into(),
            })
        }

        async fn delete(&self, _reference: &str) -> Result<()> {
            Err(AppError::Storage {
                message: "unreachable".into(),
            })
        }
    }

    /// Store whose uploads fail while deletes still work
    struct RejectingUploadStore {
        inner: MemoryImageStore,
    }

    #[async_trait]
    impl ImageStore for RejectingUploadStore {
        async fn upload(&self, _bytes: &[u8]) -> Result<String> {
            Err(AppError::Storage {
                message: "upload rejected".into(),
            })
        }

        async fn delete(&self, reference: &str) -> Result<()> {
            self.inner.delete(reference).await
        }
    }

    #[test]
    fn test_positions_are_step_numbers() {
        let existing = vec![snapshot(1, "old one", None), snapshot(2, "old two", None)];
        let submitted = vec![text_step("a"), text_step("b"), text_step("c")];

        let plan = plan_instructions(&existing, submitted);

        let steps: Vec<i32> = plan.upserts.iter().map(|u| u.step_no).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        // Positions 1 and 2 reuse existing rows, position 3 is new
        assert_eq!(plan.upserts[0].existing_id, Some(existing[0].id));
        assert_eq!(plan.upserts[1].existing_id, Some(existing[1].id));
        assert_eq!(plan.upserts[2].existing_id, None);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_body_always_overwritten() {
        let existing = vec![snapshot(1, "old", None)];
        let plan = plan_instructions(&existing, vec![text_step("new")]);
        assert_eq!(plan.upserts[0].body, "new");
        assert_eq!(plan.upserts[0].image_op, ImageOp::Keep);
    }

    #[test]
    fn test_truncation_deletes_leftover_steps() {
        let existing = vec![
            snapshot(1, "one", None),
            snapshot(2, "two", Some("img-2".to_string())),
            snapshot(3, "three", Some("img-3".to_string())),
        ];

        let plan = plan_instructions(&existing, vec![text_step("only")]);

        assert_eq!(plan.upserts.len(), 1);
        let mut deleted = plan.deletes.clone();
        deleted.sort();
        let mut expected = vec![existing[1].id, existing[2].id];
        expected.sort();
        assert_eq!(deleted, expected);
    }

    #[test]
    fn test_new_image_wins_over_removed_flag() {
        let existing = vec![snapshot(1, "step", Some("old-ref".to_string()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: Some(vec![1, 2, 3]),
            image_removed: true,
        }];

        let plan = plan_instructions(&existing, submitted);
        assert_eq!(
            plan.upserts[0].image_op,
            ImageOp::Replace {
                bytes: vec![1, 2, 3],
                old: Some("old-ref".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_replace_uploads_new_and_deletes_old() {
        let store = MemoryImageStore::new();
        let old_ref = store.upload(b"old").await.unwrap();

        let existing = vec![snapshot(1, "step", Some(old_ref.clone()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: Some(b"new".to_vec()),
            image_removed: false,
        }];

        let plan = plan_instructions(&existing, submitted);
        let resolved = resolve_images(plan, &store).await;

        match &resolved.upserts[0].image {
            ImageOutcome::Set(Some(new_ref)) => {
                assert!(store.contains(new_ref));
                assert!(!store.contains(&old_ref));
            }
            other => panic!("expected a fresh reference, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_removed_flag_clears_and_deletes() {
        let store = MemoryImageStore::new();
        let old_ref = store.upload(b"old").await.unwrap();

        let existing = vec![snapshot(1, "step", Some(old_ref.clone()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: None,
            image_removed: true,
        }];

        let resolved = resolve_images(plan_instructions(&existing, submitted), &store).await;

        assert_eq!(resolved.upserts[0].image, ImageOutcome::Set(None));
        assert!(!store.contains(&old_ref));
    }

    #[tokio::test]
    async fn test_truncation_leaves_store_objects() {
        let store = MemoryImageStore::new();
        let ref2 = store.upload(b"two").await.unwrap();
        let ref3 = store.upload(b"three").await.unwrap();

        let existing = vec![
            snapshot(1, "one", None),
            snapshot(2, "two", Some(ref2.clone())),
            snapshot(3, "three", Some(ref3.clone())),
        ];

        let resolved =
            resolve_images(plan_instructions(&existing, vec![text_step("only")]), &store).await;

        // Rows 2 and 3 go away, their store objects stay
        assert_eq!(resolved.deletes.len(), 2);
        assert!(store.contains(&ref2));
        assert!(store.contains(&ref3));
    }

    #[tokio::test]
    async fn test_upload_failure_downgrades_to_no_image() {
        let existing = vec![snapshot(1, "step", Some("old-ref".to_string()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: Some(b"new".to_vec()),
            image_removed: false,
        }];

        let resolved =
            resolve_images(plan_instructions(&existing, submitted), &BrokenStore).await;

        // The edit proceeds; this step just ends up without an image.
        assert_eq!(resolved.upserts[0].image, ImageOutcome::Set(None));
        assert_eq!(resolved.upserts[0].body, "step");
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_old_store_object() {
        let memory = MemoryImageStore::new();
        let old_ref = memory.upload(b"old").await.unwrap();
        let store = RejectingUploadStore { inner: memory };

        let existing = vec![snapshot(1, "step", Some(old_ref.clone()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: Some(b"new".to_vec()),
            image_removed: false,
        }];

        let resolved = resolve_images(plan_instructions(&existing, submitted), &store).await;

        // The row loses its reference, but the prior object survives.
        assert_eq!(resolved.upserts[0].image, ImageOutcome::Set(None));
        assert!(store.inner.contains(&old_ref));
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let existing = vec![snapshot(1, "step", Some("old-ref".to_string()))];
        let submitted = vec![SubmittedInstruction {
            body: "step".to_string(),
            new_image: None,
            image_removed: true,
        }];

        let resolved =
            resolve_images(plan_instructions(&existing, submitted), &BrokenStore).await;

        assert_eq!(resolved.upserts[0].image, ImageOutcome::Set(None));
    }

    #[test]
    fn test_reorder_is_keyed_by_position_not_identity() {
        // Prior bodies at steps 1 and 2; the resubmission swaps the text.
        // Rows keep their step numbers, the bodies move.
        let existing = vec![snapshot(1, "boil", None), snapshot(2, "serve", None)];
        let plan = plan_instructions(&existing, vec![text_step("serve"), text_step("boil")]);

        assert_eq!(plan.upserts[0].existing_id, Some(existing[0].id));
        assert_eq!(plan.upserts[0].body, "serve");
        assert_eq!(plan.upserts[1].existing_id, Some(existing[1].id));
        assert_eq!(plan.upserts[1].body, "boil");
    }

    #[test]
    fn test_empty_submission_deletes_all() {
        let existing = vec![snapshot(1, "one", None), snapshot(2, "two", None)];
        let plan = plan_instructions(&existing, vec![]);
        assert!(plan.upserts.is_empty());
        assert_eq!(plan.deletes.len(), 2);
    }
}

//! Review workflow rules for detected changes.
//!
//! Two pieces of policy live here: the reviewer-driven status state machine,
//! and the field-patch model for edits. Status moves `pending -> relevant`,
//! `pending -> not-relevant`, or toggles between `relevant` and
//! `not-relevant`; it only re-enters `pending` as a side effect of an edit,
//! since any content change invalidates prior review.

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ChangeStatus, DetailedChange};

/// Outcome of validating a requested status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition is legal and changes the status.
    Apply(ChangeStatus),
    /// The requested status equals the current one; nothing to write.
    NoOp,
}

/// Validate a reviewer-requested status transition.
///
/// Requesting `pending` directly is rejected: re-review is triggered by
/// editing the change, never by a status action.
pub fn validate_transition(
    current: ChangeStatus,
    requested: ChangeStatus,
) -> Result<Transition, AppError> {
    if requested == ChangeStatus::Pending {
        return Err(AppError::Validation(
            "Cannot set a change back to pending; editing the change resets its review".to_string(),
        ));
    }
    if requested == current {
        return Ok(Transition::NoOp);
    }
    Ok(Transition::Apply(requested))
}

/// A single editable field with its new value.
///
/// Edits travel as a typed patch rather than dynamic property assignment, so
/// applying one is an exhaustive match.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    Summary(String),
    Analysis(String),
    Change(String),
    BeforeQuote(String),
    AfterQuote(String),
}

impl FieldPatch {
    /// Wire name of the patched field.
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldPatch::Summary(_) => "summary",
            FieldPatch::Analysis(_) => "analysis",
            FieldPatch::Change(_) => "change",
            FieldPatch::BeforeQuote(_) => "before_quote",
            FieldPatch::AfterQuote(_) => "after_quote",
        }
    }
}

/// Request body for the edit endpoint: any subset of the mutable text fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeEditRequest {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub change: Option<String>,
    #[serde(default)]
    pub before_quote: Option<String>,
    #[serde(default)]
    pub after_quote: Option<String>,
}

impl ChangeEditRequest {
    /// Convert the supplied fields into typed patches.
    pub fn into_patches(self) -> Vec<FieldPatch> {
        let mut patches = Vec::new();
        if let Some(v) = self.summary {
            patches.push(FieldPatch::Summary(v));
        }
        if let Some(v) = self.analysis {
            patches.push(FieldPatch::Analysis(v));
        }
        if let Some(v) = self.change {
            patches.push(FieldPatch::Change(v));
        }
        if let Some(v) = self.before_quote {
            patches.push(FieldPatch::BeforeQuote(v));
        }
        if let Some(v) = self.after_quote {
            patches.push(FieldPatch::AfterQuote(v));
        }
        patches
    }
}

/// Keep only patches whose value actually differs from the stored change.
///
/// This is the edit-session diff: a commit that re-submits unchanged values
/// writes nothing and leaves the review status alone.
pub fn diff(original: &DetailedChange, patches: Vec<FieldPatch>) -> Vec<FieldPatch> {
    patches
        .into_iter()
        .filter(|patch| match patch {
            FieldPatch::Summary(v) => *v != original.summary,
            FieldPatch::Analysis(v) => *v != original.analysis,
            FieldPatch::Change(v) => *v != original.change,
            FieldPatch::BeforeQuote(v) => *v != original.before_quote,
            FieldPatch::AfterQuote(v) => *v != original.after_quote,
        })
        .collect()
}

/// Apply an edit to a change in place.
///
/// A non-empty patch set forces the status back to `Pending` regardless of
/// its prior value; an empty set leaves the change untouched.
pub fn apply_edit(change: &mut DetailedChange, patches: &[FieldPatch]) {
    if patches.is_empty() {
        return;
    }
    for patch in patches {
        match patch {
            FieldPatch::Summary(v) => change.summary = v.clone(),
            FieldPatch::Analysis(v) => change.analysis = v.clone(),
            FieldPatch::Change(v) => change.change = v.clone(),
            FieldPatch::BeforeQuote(v) => change.before_quote = v.clone(),
            FieldPatch::AfterQuote(v) => change.after_quote = v.clone(),
        }
    }
    change.status = ChangeStatus::Pending;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_change() -> DetailedChange {
        DetailedChange {
            id: "c1".to_string(),
            summary: "Reporting window shortened".to_string(),
            analysis: "Deadline moved from 72h to 24h".to_string(),
            change: "Section 4.2 incident reporting".to_string(),
            before_quote: "within 72 hours".to_string(),
            after_quote: "within 24 hours".to_string(),
            change_type: "modification".to_string(),
            confidence: 0.92,
            status: ChangeStatus::Relevant,
            classification: None,
            comments: Vec::new(),
        }
    }

    #[test]
    fn test_pending_to_either_disposition() {
        assert_eq!(
            validate_transition(ChangeStatus::Pending, ChangeStatus::Relevant).unwrap(),
            Transition::Apply(ChangeStatus::Relevant)
        );
        assert_eq!(
            validate_transition(ChangeStatus::Pending, ChangeStatus::NotRelevant).unwrap(),
            Transition::Apply(ChangeStatus::NotRelevant)
        );
    }

    #[test]
    fn test_relevant_not_relevant_toggle() {
        assert_eq!(
            validate_transition(ChangeStatus::Relevant, ChangeStatus::NotRelevant).unwrap(),
            Transition::Apply(ChangeStatus::NotRelevant)
        );
        assert_eq!(
            validate_transition(ChangeStatus::NotRelevant, ChangeStatus::Relevant).unwrap(),
            Transition::Apply(ChangeStatus::Relevant)
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        assert_eq!(
            validate_transition(ChangeStatus::Relevant, ChangeStatus::Relevant).unwrap(),
            Transition::NoOp
        );
    }

    #[test]
    fn test_direct_transition_to_pending_rejected() {
        for current in [ChangeStatus::Relevant, ChangeStatus::NotRelevant] {
            let err = validate_transition(current, ChangeStatus::Pending).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_diff_drops_unchanged_values() {
        let original = sample_change();
        let request = ChangeEditRequest {
            summary: Some("new text".to_string()),
            analysis: Some(original.analysis.clone()),
            ..Default::default()
        };
        let changed = diff(&original, request.into_patches());
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].field_name(), "summary");
    }

    #[test]
    fn test_apply_edit_forces_pending() {
        let mut change = sample_change();
        assert_eq!(change.status, ChangeStatus::Relevant);

        apply_edit(&mut change, &[FieldPatch::Summary("new text".to_string())]);

        assert_eq!(change.summary, "new text");
        assert_eq!(change.status, ChangeStatus::Pending);
        // Untouched fields survive.
        assert_eq!(change.before_quote, "within 72 hours");
    }

    #[test]
    fn test_empty_edit_leaves_status_alone() {
        let mut change = sample_change();
        apply_edit(&mut change, &[]);
        assert_eq!(change.status, ChangeStatus::Relevant);
    }
}

//! Command-pattern actions and the undo manager.
//!
//! Every annotation mutation a tool commits is expressed as an `Action`
//! with symmetric `do`/`undo`. Actions return `Ok(false)` when they could
//! not apply (for example the target annotation is already gone); a false
//! return never enters history, so the stacks stay consistent.

use crate::error::ActionError;
use crate::model::{Annotation, AnnotationId, AnnotationPayload};
use crate::store::Store;
use crate::view::View;

/// Mutable state an action is allowed to touch.
pub struct ActionContext<'a> {
    pub view: &'a mut View,
    pub store: &'a mut dyn Store,
}

/// A reversible annotation mutation.
pub trait Action {
    /// Apply the mutation. `Ok(false)` means it could not apply and
    /// nothing changed.
    fn do_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError>;

    /// Revert the mutation.
    fn undo_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError>;
}

// ============================================================================
// Action Group
// ============================================================================

/// A batch of actions undone and redone as one unit.
///
/// Actions are executed as they are appended. An uncommitted group can be
/// `remove`d, which reverts its executed actions in reverse order and
/// discards them; committing hands the group to the manager as a single
/// history entry.
#[derive(Default)]
pub struct ActionGroup {
    actions: Vec<Box<dyn Action>>,
}

impl ActionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Execute `action` and keep it if it applied.
    pub fn do_action(
        &mut self,
        mut action: Box<dyn Action>,
        ctx: &mut ActionContext,
    ) -> Result<bool, ActionError> {
        let applied = action.do_action(ctx)?;
        if applied {
            self.actions.push(action);
        }
        Ok(applied)
    }

    /// Abort the group: undo executed actions in reverse order and
    /// discard them.
    pub fn remove(&mut self, ctx: &mut ActionContext) -> Result<(), ActionError> {
        while let Some(mut action) = self.actions.pop() {
            action.undo_action(ctx)?;
        }
        Ok(())
    }
}

impl Action for ActionGroup {
    fn do_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let mut any = false;
        for action in &mut self.actions {
            any |= action.do_action(ctx)?;
        }
        Ok(any)
    }

    fn undo_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let mut any = false;
        for action in self.actions.iter_mut().rev() {
            any |= action.undo_action(ctx)?;
        }
        Ok(any)
    }
}

// ============================================================================
// Action Manager
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ActionManagerConfig {
    /// Maximum number of history entries kept for undo.
    pub max_history: usize,
}

impl Default for ActionManagerConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

/// Two-stack undo/redo history.
#[derive(Default)]
pub struct ActionManager {
    config: ActionManagerConfig,
    done: Vec<Box<dyn Action>>,
    undone: Vec<Box<dyn Action>>,
}

impl ActionManager {
    pub fn new(config: ActionManagerConfig) -> Self {
        Self {
            config,
            done: Vec::new(),
            undone: Vec::new(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }

    /// Execute an action and record it. Redo history is cleared on every
    /// new mutation; an action that could not apply is dropped without
    /// touching either stack.
    pub fn do_action(
        &mut self,
        mut action: Box<dyn Action>,
        ctx: &mut ActionContext,
    ) -> Result<bool, ActionError> {
        let applied = action.do_action(ctx)?;
        if applied {
            self.push_done(action);
        }
        Ok(applied)
    }

    /// Record an already-executed unit (a committed group) in history.
    pub fn commit(&mut self, group: ActionGroup) {
        if !group.is_empty() {
            self.push_done(Box::new(group));
        }
    }

    fn push_done(&mut self, action: Box<dyn Action>) {
        self.done.push(action);
        self.undone.clear();
        if self.done.len() > self.config.max_history {
            let excess = self.done.len() - self.config.max_history;
            self.done.drain(..excess);
        }
    }

    /// Revert the newest history entry. The entry only crosses to the
    /// redo stack once its effect is actually reverted; a failed or
    /// inapplicable undo puts it back where it was.
    pub fn undo(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let Some(mut action) = self.done.pop() else {
            log::debug!("undo requested with empty history");
            return Ok(false);
        };
        match action.undo_action(ctx) {
            Ok(true) => {
                log::debug!("undo ({} entries remain)", self.done.len());
                self.undone.push(action);
                Ok(true)
            }
            Ok(false) => {
                self.done.push(action);
                Ok(false)
            }
            Err(error) => {
                self.done.push(action);
                Err(error)
            }
        }
    }

    /// Re-apply the newest undone entry, with the same guard as `undo`.
    pub fn redo(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let Some(mut action) = self.undone.pop() else {
            log::debug!("redo requested with empty history");
            return Ok(false);
        };
        match action.do_action(ctx) {
            Ok(true) => {
                log::debug!("redo ({} entries remain)", self.undone.len());
                self.done.push(action);
                Ok(true)
            }
            Ok(false) => {
                self.undone.push(action);
                Ok(false)
            }
            Err(error) => {
                self.undone.push(action);
                Err(error)
            }
        }
    }
}

// ============================================================================
// Concrete Actions
// ============================================================================

/// Create an annotation on the view and persist it.
pub struct AddAnnotation {
    annotation: Annotation,
}

impl AddAnnotation {
    pub fn new(annotation: Annotation) -> Self {
        Self { annotation }
    }
}

impl Action for AddAnnotation {
    fn do_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        ctx.store.create_annotation(&self.annotation)?;
        ctx.view.annotations.add(self.annotation.clone());
        Ok(true)
    }

    fn undo_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        ctx.store.delete_annotation(self.annotation.id)?;
        let removed = ctx.view.delete_annotation(self.annotation.id)?;
        Ok(removed.is_some())
    }
}

/// Delete an annotation, including raster cleanup for masks.
pub struct DeleteAnnotation {
    id: AnnotationId,
    removed: Option<Annotation>,
}

impl DeleteAnnotation {
    pub fn new(id: AnnotationId) -> Self {
        Self { id, removed: None }
    }
}

impl Action for DeleteAnnotation {
    fn do_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let Some(removed) = ctx.view.delete_annotation(self.id)? else {
            return Ok(false);
        };
        ctx.store.delete_annotation(self.id)?;
        self.removed = Some(removed);
        Ok(true)
    }

    fn undo_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let Some(removed) = self.removed.take() else {
            return Ok(false);
        };
        ctx.store.create_annotation(&removed)?;
        ctx.view.annotations.add(removed);
        Ok(true)
    }
}

/// Replace an annotation's payload, carrying before/after snapshots.
/// One completed edit-tool drag commits exactly one of these.
pub struct UpdateAnnotationData {
    id: AnnotationId,
    before: AnnotationPayload,
    after: AnnotationPayload,
}

impl UpdateAnnotationData {
    pub fn new(id: AnnotationId, before: AnnotationPayload, after: AnnotationPayload) -> Self {
        Self { id, before, after }
    }

    fn apply(
        &self,
        payload: &AnnotationPayload,
        ctx: &mut ActionContext,
    ) -> Result<bool, ActionError> {
        if !ctx.view.annotations.set_payload(self.id, payload.clone()) {
            return Ok(false);
        }
        // set_payload guarantees presence here.
        if let Some(annotation) = ctx.view.annotations.get(self.id) {
            let annotation = annotation.clone();
            ctx.store.update_annotation(&annotation)?;
        }
        Ok(true)
    }
}

impl Action for UpdateAnnotationData {
    fn do_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let after = self.after.clone();
        self.apply(&after, ctx)
    }

    fn undo_action(&mut self, ctx: &mut ActionContext) -> Result<bool, ActionError> {
        let before = self.before.clone();
        self.apply(&before, ctx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{AnnotationData, BoxData};
    use crate::store::MemoryStore;

    fn box_annotation(id: AnnotationId, x: f64) -> Annotation {
        Annotation::from_instance_params(
            id,
            0,
            AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(
                x, 0.0, 10.0, 10.0,
            )))),
        )
    }

    fn payload(x: f64) -> AnnotationPayload {
        AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(
            x, 0.0, 10.0, 10.0,
        ))))
    }

    #[test]
    fn test_group_undoes_in_reverse_and_restores_initial_state() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());

        let mut group = ActionGroup::new();
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            for id in 1..=3 {
                group
                    .do_action(Box::new(AddAnnotation::new(box_annotation(id, 0.0))), &mut ctx)
                    .unwrap();
            }
        }
        manager.commit(group);
        assert_eq!(view.annotations.len(), 3);

        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        manager.undo(&mut ctx).unwrap();
        assert_eq!(ctx.view.annotations.len(), 0);
        // Undo ran newest-first.
        assert_eq!(store.deleted, vec![3, 2, 1]);
    }

    #[test]
    fn test_uncommitted_group_remove_reverts() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };

        let mut group = ActionGroup::new();
        group
            .do_action(Box::new(AddAnnotation::new(box_annotation(1, 0.0))), &mut ctx)
            .unwrap();
        assert_eq!(ctx.view.annotations.len(), 1);

        group.remove(&mut ctx).unwrap();
        assert_eq!(ctx.view.annotations.len(), 0);
        assert!(group.is_empty());
    }

    #[test]
    fn test_failed_apply_leaves_history_untouched() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };

        // Deleting a missing annotation cannot apply.
        let applied = manager
            .do_action(Box::new(DeleteAnnotation::new(42)), &mut ctx)
            .unwrap();
        assert!(!applied);
        assert!(!manager.can_undo());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };

        manager
            .do_action(Box::new(AddAnnotation::new(box_annotation(1, 0.0))), &mut ctx)
            .unwrap();
        manager.undo(&mut ctx).unwrap();
        assert!(manager.can_redo());

        manager
            .do_action(Box::new(AddAnnotation::new(box_annotation(2, 5.0))), &mut ctx)
            .unwrap();
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_update_round_trips_payload() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        view.annotations.add(box_annotation(1, 0.0));

        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        manager
            .do_action(
                Box::new(UpdateAnnotationData::new(1, payload(0.0), payload(20.0))),
                &mut ctx,
            )
            .unwrap();
        assert_eq!(ctx.view.annotations.get(1).unwrap().payload, payload(20.0));

        manager.undo(&mut ctx).unwrap();
        assert_eq!(ctx.view.annotations.get(1).unwrap().payload, payload(0.0));

        manager.redo(&mut ctx).unwrap();
        assert_eq!(ctx.view.annotations.get(1).unwrap().payload, payload(20.0));
    }

    #[test]
    fn test_failed_undo_keeps_history_entry() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            manager
                .do_action(Box::new(AddAnnotation::new(box_annotation(1, 0.0))), &mut ctx)
                .unwrap();
        }

        store.reject_with = Some("backend offline".into());
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            assert!(manager.undo(&mut ctx).is_err());
        }
        // The effect is still applied, so the entry must still be undoable.
        assert_eq!(view.annotations.len(), 1);
        assert!(manager.can_undo());
        assert!(!manager.can_redo());

        // The same entry undoes cleanly once the backend recovers.
        store.reject_with = None;
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        assert!(manager.undo(&mut ctx).unwrap());
        assert_eq!(view.annotations.len(), 0);
        assert!(manager.can_redo());
    }

    #[test]
    fn test_inapplicable_undo_stays_on_done_stack() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            manager
                .do_action(Box::new(AddAnnotation::new(box_annotation(1, 0.0))), &mut ctx)
                .unwrap();
        }

        // The annotation disappears behind the manager's back.
        view.delete_annotation(1).unwrap();

        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        let applied = manager.undo(&mut ctx).unwrap();
        assert!(!applied);
        // Nothing was reverted, so nothing migrates to the redo stack.
        assert!(manager.can_undo());
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_failed_redo_keeps_history_entry() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig::default());
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            manager
                .do_action(Box::new(AddAnnotation::new(box_annotation(1, 0.0))), &mut ctx)
                .unwrap();
            manager.undo(&mut ctx).unwrap();
        }

        store.reject_with = Some("backend offline".into());
        {
            let mut ctx = ActionContext {
                view: &mut view,
                store: &mut store,
            };
            assert!(manager.redo(&mut ctx).is_err());
        }
        assert!(view.annotations.is_empty());
        assert!(manager.can_redo());
        assert!(!manager.can_undo());

        store.reject_with = None;
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        assert!(manager.redo(&mut ctx).unwrap());
        assert_eq!(view.annotations.len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut manager = ActionManager::new(ActionManagerConfig { max_history: 2 });
        let mut ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };

        for id in 1..=4 {
            manager
                .do_action(Box::new(AddAnnotation::new(box_annotation(id, 0.0))), &mut ctx)
                .unwrap();
        }
        manager.undo(&mut ctx).unwrap();
        manager.undo(&mut ctx).unwrap();
        // Oldest two entries were evicted.
        assert!(!manager.can_undo());
        assert_eq!(ctx.view.annotations.len(), 2);
    }
}

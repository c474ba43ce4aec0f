//! Edit tool: selection, hover highlight, whole-annotation drags,
//! single-vertex drags and polygon merge/subtract.
//!
//! A completed drag commits exactly one action carrying the payload
//! before and after the gesture, so one undo reverts the whole drag no
//! matter how many pointer moves it took.

use crate::action::{ActionContext, ActionGroup, DeleteAnnotation, UpdateAnnotationData};
use crate::geometry::ImagePoint;
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{AnnotationData, AnnotationId, AnnotationPayload};
use crate::store::Ability;
use crate::tool::{Tool, ToolContext, VERTEX_GRAB_THRESHOLD};

/// Exclusive edit modes activated from the toolbar. Plain dragging stays
/// available while either is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditToolOption {
    /// Clicking a second polygon folds its outline into the selected one.
    Merge,
    /// Clicking a second polygon cuts it out of the selected one.
    Subtract,
}

enum DragMode {
    Whole,
    Vertex(usize),
}

struct Drag {
    id: AnnotationId,
    mode: DragMode,
    before: AnnotationPayload,
    last: ImagePoint,
    moved: bool,
}

#[derive(Default)]
pub struct EditTool {
    drag: Option<Drag>,
    option: Option<EditToolOption>,
}

impl EditTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_option(&mut self, option: Option<EditToolOption>) {
        self.option = option;
    }

    pub fn option(&self) -> Option<EditToolOption> {
        self.option
    }

    fn hit_test(&self, point: &ImagePoint, ctx: &ToolContext) -> Option<AnnotationId> {
        let renderers = ctx.renderers;
        let view_ctx = ctx.view.context();
        ctx.view.annotations.topmost_at(point, |annotation| {
            renderers
                .get(&annotation.kind)
                .map(|renderer| renderer.get_path(annotation, &view_ctx))
                .unwrap_or_default()
        })
    }

    /// Index of the selected annotation's vertex under `point`, if any.
    fn vertex_under(&self, point: &ImagePoint, ctx: &ToolContext) -> Option<(AnnotationId, usize)> {
        let selected = ctx.view.annotations.selected()?;
        let annotation = ctx.view.annotations.get(selected)?;
        let renderer = ctx.renderers.get(&annotation.kind)?;
        let view_ctx = ctx.view.context();
        renderer
            .get_all_vertices(annotation, &view_ctx)
            .iter()
            .position(|vertex| vertex.distance_to(point) < VERTEX_GRAB_THRESHOLD)
            .map(|index| (selected, index))
    }

    /// Fold `other` into the selected polygon and delete it, as one
    /// undoable unit. Subtract reverses the folded ring so it reads as a
    /// hole.
    fn combine(
        &mut self,
        selected_id: AnnotationId,
        other_id: AnnotationId,
        option: EditToolOption,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if !ctx.check_ability(Ability::UpdateAnnotation)
            || !ctx.check_ability(Ability::DeleteAnnotation)
        {
            return CallbackStatus::Stop;
        }

        let (Some(selected), Some(other)) = (
            ctx.view.annotations.get(selected_id),
            ctx.view.annotations.get(other_id),
        ) else {
            return CallbackStatus::Continue;
        };

        let before = selected.payload.clone();
        let frame = ctx.view.current_frame_index();
        let Some(AnnotationData::Polygon(selected_data)) =
            selected.infer_video_data(frame, None).data
        else {
            return CallbackStatus::Continue;
        };
        let Some(AnnotationData::Polygon(other_data)) = other.infer_video_data(frame, None).data
        else {
            return CallbackStatus::Continue;
        };

        let mut combined = selected_data;
        let mut folded = other_data.path;
        if option == EditToolOption::Subtract {
            folded.reverse();
        }
        combined.additional_paths.push(folded);
        combined.additional_paths.extend(other_data.additional_paths);

        let mut after = before.clone();
        match &mut after {
            AnnotationPayload::Image(data) => *data = AnnotationData::Polygon(combined),
            AnnotationPayload::Video(video) => {
                video
                    .frames
                    .insert(frame, AnnotationData::Polygon(combined));
            }
        }

        let mut group = ActionGroup::new();
        let mut action_ctx = ActionContext {
            view: &mut *ctx.view,
            store: &mut *ctx.store,
        };
        let result = group
            .do_action(
                Box::new(UpdateAnnotationData::new(selected_id, before, after)),
                &mut action_ctx,
            )
            .and_then(|_| {
                group.do_action(Box::new(DeleteAnnotation::new(other_id)), &mut action_ctx)
            });
        match result {
            Ok(_) => {
                ctx.actions.commit(group);
            }
            Err(error) => {
                // Roll back whatever part applied, keep history clean.
                if let Err(rollback) = group.remove(&mut action_ctx) {
                    log::warn!("rollback after failed combine also failed: {rollback}");
                }
                ctx.toast_error(&error);
            }
        }
        CallbackStatus::Stop
    }
}

impl Tool for EditTool {
    fn name(&self) -> &'static str {
        "edit_tool"
    }

    fn deactivate(&mut self, ctx: &mut ToolContext) {
        self.cancel(ctx);
        self.option = None;
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        // Vertex handles of the selected annotation take priority over
        // whole-shape hits.
        if let Some((id, vertex)) = self.vertex_under(&point, ctx) {
            if !ctx.check_ability(Ability::UpdateAnnotation) {
                return CallbackStatus::Stop;
            }
            if let Some(annotation) = ctx.view.annotations.get(id) {
                self.drag = Some(Drag {
                    id,
                    mode: DragMode::Vertex(vertex),
                    before: annotation.payload.clone(),
                    last: point,
                    moved: false,
                });
                return CallbackStatus::Stop;
            }
        }

        let Some(hit) = self.hit_test(&point, ctx) else {
            ctx.view.annotations.select(None);
            return CallbackStatus::Continue;
        };

        if let (Some(option), Some(selected)) = (self.option, ctx.view.annotations.selected()) {
            if selected != hit {
                return self.combine(selected, hit, option, ctx);
            }
        }

        ctx.view.annotations.select(Some(hit));
        // Selection works without the update ability; dragging does not.
        if !ctx.store.can(Ability::UpdateAnnotation) {
            return CallbackStatus::Stop;
        }
        let Some(annotation) = ctx.view.annotations.get(hit) else {
            return CallbackStatus::Continue;
        };
        self.drag = Some(Drag {
            id: hit,
            mode: DragMode::Whole,
            before: annotation.payload.clone(),
            last: point,
            moved: false,
        });
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(drag) = &mut self.drag else {
            // Not dragging: keep the hover highlight fresh.
            let hover = self.hit_test(&point, ctx);
            ctx.view.annotations.highlight(hover);
            return CallbackStatus::Continue;
        };

        let offset = point.sub(drag.last);
        drag.last = point;
        drag.moved = true;

        let view_ctx = ctx.view.context();
        let Some(annotation) = ctx.view.annotations.get_mut(drag.id) else {
            self.drag = None;
            return CallbackStatus::Continue;
        };
        let Some(renderer) = ctx.renderers.get(&annotation.kind) else {
            return CallbackStatus::Continue;
        };
        match drag.mode {
            DragMode::Whole => renderer.translate(annotation, offset, &view_ctx),
            DragMode::Vertex(index) => renderer.move_vertex(annotation, index, offset, &view_ctx),
        }
        CallbackStatus::Stop
    }

    fn on_end(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(drag) = self.drag.take() else {
            return CallbackStatus::Continue;
        };
        if !drag.moved {
            return CallbackStatus::Continue;
        }
        let Some(annotation) = ctx.view.annotations.get(drag.id) else {
            return CallbackStatus::Continue;
        };
        let after = annotation.payload.clone();
        if after == drag.before {
            return CallbackStatus::Continue;
        }

        match ctx.run_action(Box::new(UpdateAnnotationData::new(
            drag.id,
            drag.before.clone(),
            after,
        ))) {
            Ok(_) => {}
            Err(error) => {
                // Local geometry already moved; put it back.
                ctx.view.annotations.set_payload(drag.id, drag.before);
                ctx.toast_error(&error);
            }
        }
        CallbackStatus::Stop
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        if event.key == "escape" {
            if self.drag.is_some() {
                self.cancel(ctx);
                return CallbackStatus::Stop;
            }
            if ctx.view.annotations.selected().is_some() {
                ctx.view.annotations.select(None);
                return CallbackStatus::Stop;
            }
        }
        CallbackStatus::Continue
    }

    /// Abort the drag in flight, restoring the pre-drag payload.
    fn cancel(&mut self, ctx: &mut ToolContext) {
        if let Some(drag) = self.drag.take() {
            if drag.moved {
                ctx.view.annotations.set_payload(drag.id, drag.before);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::action::{ActionManager, ActionManagerConfig};
    use crate::geometry::{CanvasPoint, Rect};
    use crate::model::{Annotation, AnnotationKind, BoxData, PolygonData};
    use crate::renderer::{BoundingBoxRenderer, PolygonRenderer, Renderer};
    use crate::store::MemoryStore;
    use crate::view::View;

    fn renderers() -> HashMap<AnnotationKind, Box<dyn Renderer>> {
        let mut map: HashMap<AnnotationKind, Box<dyn Renderer>> = HashMap::new();
        map.insert(AnnotationKind::BoundingBox, Box::new(BoundingBoxRenderer));
        map.insert(AnnotationKind::Polygon, Box::new(PolygonRenderer));
        map
    }

    fn box_annotation(id: AnnotationId, rect: Rect) -> Annotation {
        Annotation::from_instance_params(
            id,
            0,
            AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(rect))),
        )
    }

    fn polygon_annotation(id: AnnotationId, path: Vec<ImagePoint>) -> Annotation {
        Annotation::from_instance_params(
            id,
            0,
            AnnotationPayload::Image(AnnotationData::Polygon(PolygonData {
                path,
                additional_paths: Vec::new(),
            })),
        )
    }

    fn event() -> PointerEvent {
        PointerEvent::left(CanvasPoint::new(0.0, 0.0))
    }

    #[test]
    fn test_drag_commits_single_undoable_action() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations
            .add(box_annotation(1, Rect::new(10.0, 10.0, 20.0, 20.0)));
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        tool.on_start(ImagePoint::new(20.0, 20.0), &event(), &mut ctx);
        // Two incremental moves, one committed action.
        tool.on_move(ImagePoint::new(25.0, 20.0), &event(), &mut ctx);
        tool.on_move(ImagePoint::new(30.0, 20.0), &event(), &mut ctx);
        tool.on_end(ImagePoint::new(30.0, 20.0), &event(), &mut ctx);

        let moved = ctx.view.annotations.get(1).unwrap();
        match &moved.payload {
            AnnotationPayload::Image(AnnotationData::BoundingBox(data)) => {
                assert_eq!(data.rect(), Rect::new(20.0, 10.0, 20.0, 20.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        // One undo reverts the whole drag.
        let mut action_ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        actions.undo(&mut action_ctx).unwrap();
        let restored = view.annotations.get(1).unwrap();
        match &restored.payload {
            AnnotationPayload::Image(AnnotationData::BoundingBox(data)) => {
                assert_eq!(data.rect(), Rect::new(10.0, 10.0, 20.0, 20.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!(!actions.can_undo());
    }

    #[test]
    fn test_vertex_drag_keeps_box_rectangular() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations
            .add(box_annotation(1, Rect::new(0.0, 0.0, 10.0, 10.0)));
        view.annotations.select(Some(1));
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        // Grab the bottom-right corner.
        tool.on_start(ImagePoint::new(10.0, 10.0), &event(), &mut ctx);
        tool.on_move(ImagePoint::new(16.0, 14.0), &event(), &mut ctx);
        tool.on_end(ImagePoint::new(16.0, 14.0), &event(), &mut ctx);

        let annotation = ctx.view.annotations.get(1).unwrap();
        match &annotation.payload {
            AnnotationPayload::Image(AnnotationData::BoundingBox(data)) => {
                assert_eq!(data.rect(), Rect::new(0.0, 0.0, 16.0, 14.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_merge_folds_other_polygon_and_deletes_it() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations.add(polygon_annotation(
            1,
            vec![
                ImagePoint::new(0.0, 0.0),
                ImagePoint::new(20.0, 0.0),
                ImagePoint::new(20.0, 20.0),
                ImagePoint::new(0.0, 20.0),
            ],
        ));
        view.annotations.add(polygon_annotation(
            2,
            vec![
                ImagePoint::new(50.0, 50.0),
                ImagePoint::new(70.0, 50.0),
                ImagePoint::new(70.0, 70.0),
            ],
        ));
        view.annotations.select(Some(1));
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        tool.set_option(Some(EditToolOption::Merge));
        tool.on_start(ImagePoint::new(60.0, 55.0), &event(), &mut ctx);

        assert_eq!(view.annotations.len(), 1);
        match &view.annotations.get(1).unwrap().payload {
            AnnotationPayload::Image(AnnotationData::Polygon(data)) => {
                assert_eq!(data.additional_paths.len(), 1);
                assert_eq!(data.additional_paths[0].len(), 3);
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        // Undo restores both annotations in one step.
        let mut action_ctx = ActionContext {
            view: &mut view,
            store: &mut store,
        };
        actions.undo(&mut action_ctx).unwrap();
        assert_eq!(view.annotations.len(), 2);
        match &view.annotations.get(1).unwrap().payload {
            AnnotationPayload::Image(AnnotationData::Polygon(data)) => {
                assert!(data.additional_paths.is_empty());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_drag_restores_geometry() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations
            .add(box_annotation(1, Rect::new(10.0, 10.0, 20.0, 20.0)));
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        tool.on_start(ImagePoint::new(20.0, 20.0), &event(), &mut ctx);
        tool.on_move(ImagePoint::new(80.0, 80.0), &event(), &mut ctx);
        tool.cancel(&mut ctx);
        tool.on_end(ImagePoint::new(80.0, 80.0), &event(), &mut ctx);

        match &ctx.view.annotations.get(1).unwrap().payload {
            AnnotationPayload::Image(AnnotationData::BoundingBox(data)) => {
                assert_eq!(data.rect(), Rect::new(10.0, 10.0, 20.0, 20.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!(!actions.can_undo());
    }

    #[test]
    fn test_denied_update_ability_blocks_drag_but_not_selection() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations
            .add(box_annotation(1, Rect::new(10.0, 10.0, 20.0, 20.0)));
        let mut store = MemoryStore::new();
        store.denied.push(Ability::UpdateAnnotation);
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        tool.on_start(ImagePoint::new(20.0, 20.0), &event(), &mut ctx);
        tool.on_move(ImagePoint::new(80.0, 80.0), &event(), &mut ctx);
        tool.on_end(ImagePoint::new(80.0, 80.0), &event(), &mut ctx);

        // The click still selects, but nothing moved and nothing committed.
        assert_eq!(ctx.view.annotations.selected(), Some(1));
        match &ctx.view.annotations.get(1).unwrap().payload {
            AnnotationPayload::Image(AnnotationData::BoundingBox(data)) => {
                assert_eq!(data.rect(), Rect::new(10.0, 10.0, 20.0, 20.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!(!actions.can_undo());
    }

    #[test]
    fn test_hover_updates_highlight() {
        let mut view = View::new(1, 200, 200, 1);
        view.annotations
            .add(box_annotation(1, Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = EditTool::new();
        tool.on_move(ImagePoint::new(5.0, 5.0), &event(), &mut ctx);
        assert_eq!(ctx.view.annotations.highlighted(), Some(1));
        tool.on_move(ImagePoint::new(100.0, 100.0), &event(), &mut ctx);
        assert_eq!(ctx.view.annotations.highlighted(), None);
    }
}

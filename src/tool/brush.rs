//! Brush tool: paints label stamps into the view's raster and commits a
//! mask annotation when the stroke ends.
//!
//! While the pointer is down the draft annotation is parked on the raster
//! as in-progress, so the renderer can show the growing mask before
//! anything is committed. Holding alt erases instead of painting.

use crate::action::{AddAnnotation, UpdateAnnotationData};
use crate::geometry::{ImagePoint, Rect};
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData, AnnotationId, AnnotationPayload, MaskData, Raster, RasterId};
use crate::store::{Ability, ToastLevel};
use crate::tool::{Tool, ToolContext};

/// Default stamp radius in image pixels.
pub const DEFAULT_BRUSH_SIZE: f64 = 10.0;

struct Stroke {
    raster_id: RasterId,
    label: u8,
    annotation_id: AnnotationId,
    /// Whether this stroke started a brand new mask annotation.
    is_new: bool,
    erase: bool,
    /// Painted extent: (x_min, x_max, y_min, y_max), max exclusive.
    bounds: Option<(usize, usize, usize, usize)>,
}

pub struct BrushTool {
    brush_size: f64,
    stroke: Option<Stroke>,
}

impl Default for BrushTool {
    fn default() -> Self {
        Self {
            brush_size: DEFAULT_BRUSH_SIZE,
            stroke: None,
        }
    }
}

impl BrushTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.brush_size = size.max(1.0);
    }

    /// Stamp a filled circle of `label` (or zero when erasing) around
    /// `center`, growing the stroke bounds.
    fn stamp(&self, raster: &mut Raster, stroke: &mut Stroke, center: ImagePoint) {
        let radius = self.brush_size;
        let width = raster.width() as f64;
        let height = raster.height() as f64;
        let x_lo = ((center.x - radius).floor().max(0.0)) as usize;
        let x_hi = ((center.x + radius).ceil().min(width)) as usize;
        let y_lo = ((center.y - radius).floor().max(0.0)) as usize;
        let y_hi = ((center.y + radius).ceil().min(height)) as usize;

        for y in y_lo..y_hi {
            for x in x_lo..x_hi {
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                if stroke.erase {
                    if raster.buffer[(y, x)] == stroke.label {
                        raster.buffer[(y, x)] = 0;
                    }
                } else {
                    raster.buffer[(y, x)] = stroke.label;
                }
            }
        }

        if x_lo < x_hi && y_lo < y_hi {
            stroke.bounds = Some(match stroke.bounds {
                Some((bx_lo, bx_hi, by_lo, by_hi)) => (
                    bx_lo.min(x_lo),
                    bx_hi.max(x_hi),
                    by_lo.min(y_lo),
                    by_hi.max(y_hi),
                ),
                None => (x_lo, x_hi, y_lo, y_hi),
            });
        }
        if let Some((bx_lo, bx_hi, by_lo, by_hi)) = stroke.bounds {
            raster.invalidate(
                bx_lo,
                bx_hi.saturating_sub(1),
                by_lo,
                by_hi.saturating_sub(1),
            );
        }
    }

    /// The raster backing this view's file, created on first use.
    fn ensure_raster(ctx: &mut ToolContext) -> Option<RasterId> {
        if let Some(raster) = ctx.view.rasters.raster_for_file(ctx.view.file_id) {
            return Some(raster.id);
        }
        // One raster per file; the file id doubles as its raster id.
        let raster = Raster::new(
            ctx.view.file_id,
            ctx.view.file_id,
            ctx.view.width as usize,
            ctx.view.height as usize,
        );
        match ctx.view.rasters.create_raster(raster) {
            Ok(id) => Some(id),
            Err(error) => {
                ctx.store.toast(ToastLevel::Error, &error.to_string());
                None
            }
        }
    }

    /// Bounding box of the stroke's painted extent, unioned with the
    /// mask's previous box when it already had one.
    fn stroke_rect(stroke: &Stroke, previous: Option<Rect>) -> Option<Rect> {
        let (x_lo, x_hi, y_lo, y_hi) = stroke.bounds?;
        let painted = Rect::new(
            x_lo as f64,
            y_lo as f64,
            (x_hi - x_lo) as f64,
            (y_hi - y_lo) as f64,
        );
        Some(match previous {
            Some(prev) => {
                let x = prev.x.min(painted.x);
                let y = prev.y.min(painted.y);
                let x2 = (prev.x + prev.w).max(painted.x + painted.w);
                let y2 = (prev.y + prev.h).max(painted.y + painted.h);
                Rect::new(x, y, x2 - x, y2 - y)
            }
            None => painted,
        })
    }
}

impl Tool for BrushTool {
    fn name(&self) -> &'static str {
        "brush_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(raster_id) = Self::ensure_raster(ctx) else {
            return CallbackStatus::Continue;
        };

        // Painting extends the selected mask when there is one on this
        // raster; otherwise a fresh label and draft annotation start.
        let selected_mask = ctx
            .view
            .annotations
            .selected()
            .and_then(|id| ctx.view.annotations.get(id))
            .and_then(|annotation| {
                annotation
                    .mask_data()
                    .filter(|mask| mask.raster_id == raster_id)
                    .map(|_| annotation.id)
            });

        // A stroke is blocked before any pixel lands, so no cleanup is
        // needed on refusal.
        let required = match selected_mask {
            Some(_) => Ability::UpdateAnnotation,
            None => Ability::CreateAnnotation,
        };
        if !ctx.check_ability(required) {
            return CallbackStatus::Stop;
        }

        let mut stroke = match selected_mask {
            Some(annotation_id) => {
                let Some(raster) = ctx.view.rasters.get_raster(raster_id) else {
                    return CallbackStatus::Continue;
                };
                let Some(label) = raster.label_index_for_annotation(annotation_id) else {
                    log::warn!(
                        "selected mask {annotation_id} has no label on raster {raster_id}"
                    );
                    return CallbackStatus::Continue;
                };
                Stroke {
                    raster_id,
                    label,
                    annotation_id,
                    is_new: false,
                    erase: event.alt,
                    bounds: None,
                }
            }
            None => {
                let annotation_id = ctx.view.annotations.next_id();
                let Some(raster) = ctx.view.rasters.get_raster_mut(raster_id) else {
                    return CallbackStatus::Continue;
                };
                let label = match raster.next_available_label_index() {
                    Ok(label) => label,
                    Err(error) => {
                        ctx.store.toast(ToastLevel::Error, &error.to_string());
                        return CallbackStatus::Continue;
                    }
                };
                raster.set_annotation_mapping(label, annotation_id);
                raster.set_in_progress_annotation(Annotation::from_instance_params(
                    annotation_id,
                    ctx.class_id,
                    AnnotationPayload::Image(AnnotationData::Mask(MaskData {
                        raster_id,
                        bounding_box: None,
                    })),
                ));
                Stroke {
                    raster_id,
                    label,
                    annotation_id,
                    is_new: true,
                    erase: false,
                    bounds: None,
                }
            }
        };

        if let Some(raster) = ctx.view.rasters.get_raster_mut(raster_id) {
            self.stamp(raster, &mut stroke, point);
        }
        ctx.view.rasters.notify_raster_updated(raster_id);
        self.stroke = Some(stroke);
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(mut stroke) = self.stroke.take() else {
            return CallbackStatus::Continue;
        };
        if let Some(raster) = ctx.view.rasters.get_raster_mut(stroke.raster_id) {
            self.stamp(raster, &mut stroke, point);
        }
        ctx.view.rasters.notify_raster_updated(stroke.raster_id);
        self.stroke = Some(stroke);
        CallbackStatus::Stop
    }

    fn on_end(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(stroke) = self.stroke.take() else {
            return CallbackStatus::Continue;
        };

        if stroke.is_new {
            if let Some(raster) = ctx.view.rasters.get_raster_mut(stroke.raster_id) {
                raster.clear_in_progress_annotations();
            }
            let Some(bounding_box) = Self::stroke_rect(&stroke, None) else {
                // Nothing was painted; release the label.
                if let Some(raster) = ctx.view.rasters.get_raster_mut(stroke.raster_id) {
                    raster.delete_annotation_mapping(stroke.label);
                }
                return CallbackStatus::Continue;
            };

            let annotation = Annotation::from_instance_params(
                stroke.annotation_id,
                ctx.class_id,
                AnnotationPayload::Image(AnnotationData::Mask(MaskData {
                    raster_id: stroke.raster_id,
                    bounding_box: Some(bounding_box),
                })),
            );
            match ctx.run_action(Box::new(AddAnnotation::new(annotation))) {
                Ok(_) => {}
                Err(error) => {
                    // Creation refused: wipe the stroke's pixels and label.
                    if let Some(raster) = ctx.view.rasters.get_raster_mut(stroke.raster_id) {
                        let (x_lo, x_hi, y_lo, y_hi) =
                            stroke.bounds.unwrap_or((0, 0, 0, 0));
                        for y in y_lo..y_hi {
                            for x in x_lo..x_hi {
                                if raster.buffer[(y, x)] == stroke.label {
                                    raster.buffer[(y, x)] = 0;
                                }
                            }
                        }
                        raster.delete_annotation_mapping(stroke.label);
                    }
                    ctx.view.rasters.notify_raster_updated(stroke.raster_id);
                    ctx.toast_error(&error);
                }
            }
        } else {
            // Extending or erasing an existing mask updates its box.
            let Some(annotation) = ctx.view.annotations.get(stroke.annotation_id) else {
                return CallbackStatus::Continue;
            };
            let before = annotation.payload.clone();
            let previous = annotation.mask_data().and_then(|mask| mask.bounding_box);
            let Some(bounding_box) = Self::stroke_rect(&stroke, previous) else {
                return CallbackStatus::Continue;
            };
            let after = AnnotationPayload::Image(AnnotationData::Mask(MaskData {
                raster_id: stroke.raster_id,
                bounding_box: Some(bounding_box),
            }));
            if after == before {
                return CallbackStatus::Stop;
            }
            match ctx.run_action(Box::new(UpdateAnnotationData::new(
                stroke.annotation_id,
                before,
                after,
            ))) {
                Ok(_) => {}
                Err(error) => ctx.toast_error(&error),
            }
        }
        CallbackStatus::Stop
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        if event.key == "escape" && self.stroke.is_some() {
            self.cancel(ctx);
            return CallbackStatus::Stop;
        }
        CallbackStatus::Continue
    }

    /// Abort the stroke: painted pixels of a draft mask are wiped and its
    /// label released; strokes on an existing mask keep their pixels but
    /// commit nothing.
    fn cancel(&mut self, ctx: &mut ToolContext) {
        let Some(stroke) = self.stroke.take() else {
            return;
        };
        if !stroke.is_new {
            return;
        }
        if let Some(raster) = ctx.view.rasters.get_raster_mut(stroke.raster_id) {
            if let Some((x_lo, x_hi, y_lo, y_hi)) = stroke.bounds {
                for y in y_lo..y_hi {
                    for x in x_lo..x_hi {
                        if raster.buffer[(y, x)] == stroke.label {
                            raster.buffer[(y, x)] = 0;
                        }
                    }
                }
            }
            raster.delete_annotation_mapping(stroke.label);
            raster.clear_in_progress_annotations();
        }
        ctx.view.rasters.notify_raster_updated(stroke.raster_id);
    }
}

// ============================================================================
// Tests
// ============================================================================

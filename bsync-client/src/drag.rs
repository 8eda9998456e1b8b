//! Drag-reorder controller
//!
//! Turns pointer gestures over the rendered queue into `REORDER_QUEUE` requests.
//! The controller never writes the mirror: a completed drop records an optimistic
//! preview and hands the full proposed order to a [`RequestSink`], and the
//! mirror changes only when the server's broadcast comes back.
//!
//! Gesture flow:
//! 1. `pointer_down` on an item starts a pending drag (or an active one for a
//!    mouse with no distance constraint)
//! 2. `pointer_move` / `tick` activate it once the sensor's constraint is met
//! 3. `pointer_up` resolves the drop against the closest slot; `cancel` aborts

use crate::config::{MouseActivation, TouchActivation};
use crate::mirror::ClientMirror;
use crate::order::array_move;
use crate::preview::OptimisticPreview;
use bsync_common::{ClientRequest, EntryUrl, RequestId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where requests leave the client; must not block
pub trait RequestSink: Send + Sync {
    fn submit(&self, request: ClientRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }
}

/// On-screen slot of one queue item, keyed by url
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRect {
    pub url: EntryUrl,
    pub rect: Rect,
}

/// Why a finished gesture produced no request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Released with no slot under the item
    NoTarget,
    /// Released over its own slot
    SameTarget,
    /// Released, or moved too far, before the drag activated
    NotActivated,
    /// Escape / cancel
    Cancelled,
    /// Capability lost during the drag
    NoCapability,
    /// Source or target vanished from the local order
    StaleEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Event had no effect (no capability, no gesture in progress, unknown item)
    Ignored,
    /// Waiting for the activation constraint
    Pending,
    Activated { active: EntryUrl, over: Option<EntryUrl> },
    Moved { over: Option<EntryUrl> },
    NoOp(NoOpReason),
    Submitted {
        request_id: RequestId,
        order: Vec<EntryUrl>,
    },
}

#[derive(Debug, Clone)]
enum DragPhase {
    Idle,
    Pending {
        active: EntryUrl,
        kind: PointerKind,
        origin: Point,
        started: Instant,
    },
    Dragging {
        active: EntryUrl,
        origin: Point,
        over: Option<EntryUrl>,
    },
}

pub struct DragReorderController {
    mirror: ClientMirror,
    preview: OptimisticPreview,
    sink: Arc<dyn RequestSink>,
    touch: TouchActivation,
    mouse: MouseActivation,

    slots: Vec<SlotRect>,
    viewport: Option<Rect>,
    phase: DragPhase,
}

impl DragReorderController {
    pub fn new(
        mirror: ClientMirror,
        preview: OptimisticPreview,
        sink: Arc<dyn RequestSink>,
        touch: TouchActivation,
        mouse: MouseActivation,
    ) -> Self {
        Self {
            mirror,
            preview,
            sink,
            touch,
            mouse,
            slots: Vec::new(),
            viewport: None,
            phase: DragPhase::Idle,
        }
    }

    /// Whether grip handles should be shown at all
    pub fn affordances_enabled(&self) -> bool {
        self.mirror.capability()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// Item currently held, pending or active
    pub fn active(&self) -> Option<&EntryUrl> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Pending { active, .. } | DragPhase::Dragging { active, .. } => Some(active),
        }
    }

    /// Slot geometry from the renderer, plus the visible scroll area
    pub fn set_layout(&mut self, slots: Vec<SlotRect>, viewport: Rect) {
        self.slots = slots;
        self.viewport = Some(viewport);
    }

    // ========================================
    // Pointer events
    // ========================================

    pub fn pointer_down(&mut self, url: &EntryUrl, kind: PointerKind, at_point: Point, now: Instant) -> DragOutcome {
        if !self.affordances_enabled() || !matches!(self.phase, DragPhase::Idle) {
            return DragOutcome::Ignored;
        }
        if !self.is_displayed(url) {
            return DragOutcome::Ignored;
        }

        let immediate = kind == PointerKind::Mouse && self.mouse.distance <= 0.0;
        if immediate {
            return self.activate(url.clone(), at_point, at_point);
        }

        self.phase = DragPhase::Pending {
            active: url.clone(),
            kind,
            origin: at_point,
            started: now,
        };
        DragOutcome::Pending
    }

    pub fn pointer_move(&mut self, to: Point, now: Instant) -> DragOutcome {
        match self.phase.clone() {
            DragPhase::Idle => DragOutcome::Ignored,
            DragPhase::Pending {
                active,
                kind,
                origin,
                started,
            } => {
                let moved = origin.distance_to(&to);
                match kind {
                    PointerKind::Touch => {
                        if now.duration_since(started) >= self.touch.delay() {
                            self.activate(active, origin, to)
                        } else if moved > self.touch.tolerance {
                            debug!(url = %active, moved, "Touch moved before hold delay, not a drag");
                            self.phase = DragPhase::Idle;
                            DragOutcome::NoOp(NoOpReason::NotActivated)
                        } else {
                            DragOutcome::Pending
                        }
                    }
                    PointerKind::Mouse => {
                        if moved >= self.mouse.distance {
                            self.activate(active, origin, to)
                        } else {
                            DragOutcome::Pending
                        }
                    }
                }
            }
            DragPhase::Dragging { active, origin, .. } => {
                let over = self.closest_slot(&active, origin, to);
                self.phase = DragPhase::Dragging {
                    active,
                    origin,
                    over: over.clone(),
                };
                DragOutcome::Moved { over }
            }
        }
    }

    /// Activate a held touch once its delay passed without movement
    pub fn tick(&mut self, now: Instant) -> DragOutcome {
        match self.phase.clone() {
            DragPhase::Pending {
                active,
                kind: PointerKind::Touch,
                origin,
                started,
            } if now.duration_since(started) >= self.touch.delay() => self.activate(active, origin, origin),
            DragPhase::Pending { .. } => DragOutcome::Pending,
            _ => DragOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, at_point: Point, now: Instant) -> DragOutcome {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragOutcome::Ignored,
            DragPhase::Pending { .. } => DragOutcome::NoOp(NoOpReason::NotActivated),
            DragPhase::Dragging { active, origin, .. } => {
                let over = self.closest_slot(&active, origin, at_point);
                self.drop_on(&active, over.as_ref(), now)
            }
        }
    }

    pub fn cancel(&mut self) -> DragOutcome {
        match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Idle => DragOutcome::Ignored,
            _ => DragOutcome::NoOp(NoOpReason::Cancelled),
        }
    }

    // ========================================
    // Drop resolution
    // ========================================

    /// Resolve a drop of `active` onto `over`
    ///
    /// Public so keyboard or scripted moves share the same path as pointer drops.
    pub fn drop_on(&mut self, active: &EntryUrl, over: Option<&EntryUrl>, now: Instant) -> DragOutcome {
        self.phase = DragPhase::Idle;

        if !self.affordances_enabled() {
            return DragOutcome::NoOp(NoOpReason::NoCapability);
        }
        let Some(over) = over else {
            return DragOutcome::NoOp(NoOpReason::NoTarget);
        };
        if over == active {
            return DragOutcome::NoOp(NoOpReason::SameTarget);
        }

        let displayed: Vec<EntryUrl> = self.displayed_order();
        let (Some(from), Some(to)) = (
            displayed.iter().position(|u| u == active),
            displayed.iter().position(|u| u == over),
        ) else {
            return DragOutcome::NoOp(NoOpReason::StaleEntry);
        };
        let Some(order) = array_move(&displayed, from, to) else {
            return DragOutcome::NoOp(NoOpReason::StaleEntry);
        };

        let request_id = RequestId::new();
        info!(url = %active, from, to, request_id = %request_id, "Submitting reorder");

        self.preview.record(request_id, order.clone(), now);
        self.sink
            .submit(ClientRequest::reorder(order.clone(), Some(request_id)));

        DragOutcome::Submitted { request_id, order }
    }

    fn activate(&mut self, active: EntryUrl, origin: Point, pointer: Point) -> DragOutcome {
        let over = self.closest_slot(&active, origin, pointer);
        debug!(url = %active, "Drag activated");
        self.phase = DragPhase::Dragging {
            active: active.clone(),
            origin,
            over: over.clone(),
        };
        DragOutcome::Activated { active, over }
    }

    /// Local order as the user sees it (preview if one is pending)
    fn displayed_order(&self) -> Vec<EntryUrl> {
        self.preview
            .view(&self.mirror.current_order())
            .into_iter()
            .map(|e| e.url)
            .collect()
    }

    fn is_displayed(&self, url: &EntryUrl) -> bool {
        self.mirror.snapshot().position(url.as_str()).is_some()
    }

    /// Closest slot center to the dragged item's center, vertical axis only
    ///
    /// The dragged center follows the pointer's vertical travel from `origin`
    /// and is clamped to the viewport; slots outside the viewport are skipped.
    fn closest_slot(&self, active: &EntryUrl, origin: Point, pointer: Point) -> Option<EntryUrl> {
        let travel = pointer.y - origin.y;
        let mut center = self
            .slots
            .iter()
            .find(|slot| &slot.url == active)
            .map(|slot| slot.rect.center_y() + travel)
            .unwrap_or(pointer.y);

        if let Some(viewport) = &self.viewport {
            center = center.clamp(viewport.y, viewport.bottom());
        }

        self.slots
            .iter()
            .filter(|slot| {
                self.viewport
                    .as_ref()
                    .map_or(true, |viewport| slot.rect.overlaps_vertically(viewport))
            })
            .min_by(|a, b| {
                let da = (a.rect.center_y() - center).abs();
                let db = (b.rect.center_y() - center).abs();
                da.total_cmp(&db)
            })
            .map(|slot| slot.url.clone())
    }
}

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesturePhase {
    Start,
    Move,
    End,
    Cancel,
}

/// Position in client (viewport) pixels.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

impl ClientPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pointer {
        phase: GesturePhase,
        point: ClientPoint,
    },
    /// Only the first touch point is ever used.
    Touch {
        phase: GesturePhase,
        touches: SmallVec<[ClientPoint; 2]>,
    },
    ContextMenu,
}

impl InputEvent {
    pub const fn phase(&self) -> Option<GesturePhase> {
        match self {
            Self::Pointer { phase, .. } | Self::Touch { phase, .. } => Some(*phase),
            Self::ContextMenu => None,
        }
    }

    /// Whether this event carries a position that may turn into a stroke.
    pub fn samples_position(&self) -> bool {
        matches!(self.phase(), Some(GesturePhase::Start | GesturePhase::Move)) && self.active_point().is_some()
    }

    pub fn active_point(&self) -> Option<ClientPoint> {
        match self {
            Self::Pointer { point, .. } => Some(*point),
            Self::Touch { touches, .. } => touches.first().copied(),
            Self::ContextMenu => None,
        }
    }
}

/// Where the cover is displayed and how big its backing store is.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub backing: SurfaceSize,
}

impl SurfaceGeometry {
    pub const fn new(left: f64, top: f64, width: f64, height: f64, backing: SurfaceSize) -> Self {
        Self {
            left,
            top,
            width,
            height,
            backing,
        }
    }

    /// Backing pixels per displayed pixel, per axis.
    pub fn scale(&self) -> Option<(f64, f64)> {
        let usable = |len: f64| len.is_finite() && len > 0.0;
        if !usable(self.width) || !usable(self.height) {
            return None;
        }
        Some((
            f64::from(self.backing.0) / self.width,
            f64::from(self.backing.1) / self.height,
        ))
    }

    pub fn to_surface(&self, point: ClientPoint) -> Option<(f64, f64)> {
        let (scale_x, scale_y) = self.scale()?;
        Some((
            (point.x - self.left) * scale_x,
            (point.y - self.top) * scale_y,
        ))
    }
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, (0, 0))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GestureResponse {
    /// Whether the platform's default handling (scroll, context menu) should be suppressed.
    pub prevent_default: bool,
    pub stroke: Option<Stroke>,
    pub outcome: StrokeOutcome,
}

impl GestureResponse {
    const fn passive(prevent_default: bool) -> Self {
        Self {
            prevent_default,
            stroke: None,
            outcome: StrokeOutcome::Ignored,
        }
    }
}

/// Turns raw pointer and touch input into erase strokes for the session.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureRouter {
    geometry: SurfaceGeometry,
    brush_radius: f64,
    pressing: bool,
}

impl GestureRouter {
    pub fn new(brush_radius: f64) -> Self {
        Self {
            geometry: Default::default(),
            brush_radius,
            pressing: false,
        }
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: SurfaceGeometry) {
        self.geometry = geometry;
    }

    pub fn is_pressing(&self) -> bool {
        self.pressing
    }

    /// Brush radius in backing pixels.
    pub fn scaled_radius(&self) -> Option<f64> {
        self.geometry.scale().map(|(scale_x, _)| self.brush_radius * scale_x)
    }

    /// Stroke for the given client point, if the surface has a usable size.
    pub fn stroke_at(&self, point: ClientPoint) -> Option<Stroke> {
        let (x, y) = self.geometry.to_surface(point)?;
        Some(Stroke::new(x, y, self.scaled_radius()?))
    }

    /// Route one input event, applying any resulting stroke to the session and mirroring it on `surface`.
    pub fn route<G, S>(
        &mut self,
        event: &InputEvent,
        session: &mut Session<G>,
        surface: &mut S,
    ) -> GestureResponse
    where
        G: GridGenerator,
        S: CoverSurface + ?Sized,
    {
        use GesturePhase::*;

        let scratching = session.state().is_scratching();
        if !scratching {
            self.pressing = false;
        }

        let Some(phase) = event.phase() else {
            return GestureResponse::passive(scratching);
        };

        match phase {
            Start if scratching => self.pressing = true,
            Start => {
                log::trace!("press ignored outside of scratching");
                return GestureResponse::passive(false);
            }
            Move if self.pressing => {}
            Move => return GestureResponse::passive(scratching),
            End | Cancel => {
                self.pressing = false;
                return GestureResponse::passive(scratching);
            }
        }

        let Some(stroke) = event.active_point().and_then(|point| self.stroke_at(point)) else {
            return GestureResponse::passive(scratching);
        };

        let outcome = session.erase_stroke(stroke);
        if outcome.has_update() {
            surface.erase(stroke);
        }
        if !session.state().is_scratching() {
            self.pressing = false;
        }

        GestureResponse {
            prevent_default: true,
            stroke: Some(stroke),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use smallvec::smallvec;

    #[derive(Default)]
    struct RecordingSurface {
        strokes: Vec<Stroke>,
    }

    impl CoverSurface for RecordingSurface {
        fn erase(&mut self, stroke: Stroke) {
            self.strokes.push(stroke);
        }

        fn clear_all(&mut self) {}

        fn restore(&mut self) {
            self.strokes.clear();
        }
    }

    /// Displayed at 200x100 css pixels from (10, 20), backed by 400x300 pixels.
    fn geometry() -> SurfaceGeometry {
        SurfaceGeometry::new(10.0, 20.0, 200.0, 100.0, (400, 300))
    }

    fn scratching_session() -> Session {
        let mut session =
            Session::with_seed(GameConfig::default(), SymbolCatalog::default(), 9).unwrap();
        session.resize_surface((400, 300));
        session.start_card().unwrap();
        session
    }

    fn router() -> GestureRouter {
        let mut router = GestureRouter::new(2.0);
        router.set_geometry(geometry());
        router
    }

    fn pointer(phase: GesturePhase, x: f64, y: f64) -> InputEvent {
        InputEvent::Pointer {
            phase,
            point: ClientPoint::new(x, y),
        }
    }

    #[test]
    fn maps_client_points_with_independent_scales() {
        let geometry = geometry();

        assert_eq!(geometry.scale(), Some((2.0, 3.0)));
        assert_eq!(
            geometry.to_surface(ClientPoint::new(60.0, 30.0)),
            Some((100.0, 30.0))
        );
        assert_eq!(SurfaceGeometry::default().scale(), None);
    }

    #[test]
    fn erases_only_while_pressing() {
        let mut router = router();
        let mut session = scratching_session();
        let mut surface = RecordingSurface::default();

        let response = router.route(&pointer(GesturePhase::Move, 60.0, 30.0), &mut session, &mut surface);
        assert_eq!(response.stroke, None);

        let response = router.route(&pointer(GesturePhase::Start, 60.0, 30.0), &mut session, &mut surface);
        assert_eq!(response.stroke, Some(Stroke::new(100.0, 30.0, 4.0)));
        assert_eq!(response.outcome, StrokeOutcome::Erased);
        assert!(response.prevent_default);
        assert!(router.is_pressing());

        router.route(&pointer(GesturePhase::Move, 70.0, 30.0), &mut session, &mut surface);
        router.route(&pointer(GesturePhase::End, 70.0, 30.0), &mut session, &mut surface);
        assert!(!router.is_pressing());

        let response = router.route(&pointer(GesturePhase::Move, 80.0, 30.0), &mut session, &mut surface);
        assert_eq!(response.stroke, None);
        assert_eq!(surface.strokes.len(), 2);
    }

    #[test]
    fn uses_first_touch_only() {
        let mut router = router();
        let mut session = scratching_session();
        let mut surface = RecordingSurface::default();

        let event = InputEvent::Touch {
            phase: GesturePhase::Start,
            touches: smallvec![ClientPoint::new(10.0, 20.0), ClientPoint::new(200.0, 100.0)],
        };
        let response = router.route(&event, &mut session, &mut surface);

        assert_eq!(response.stroke, Some(Stroke::new(0.0, 0.0, 4.0)));
        assert_eq!(surface.strokes, [Stroke::new(0.0, 0.0, 4.0)]);
    }

    #[test]
    fn passive_outside_of_scratching() {
        let mut router = router();
        let mut session =
            Session::with_seed(GameConfig::default(), SymbolCatalog::default(), 9).unwrap();
        let mut surface = RecordingSurface::default();

        let response = router.route(&pointer(GesturePhase::Start, 60.0, 30.0), &mut session, &mut surface);
        assert!(!response.prevent_default);
        assert!(!router.is_pressing());

        let response = router.route(&InputEvent::ContextMenu, &mut session, &mut surface);
        assert!(!response.prevent_default);
        assert!(surface.strokes.is_empty());

        session.resize_surface((400, 300));
        session.start_card().unwrap();
        let response = router.route(&InputEvent::ContextMenu, &mut session, &mut surface);
        assert!(response.prevent_default);
    }

    #[test]
    fn press_ends_when_card_resolves() {
        let mut router = GestureRouter::new(1_000.0);
        router.set_geometry(geometry());
        let mut session = scratching_session();
        let mut surface = RecordingSurface::default();

        let response = router.route(&pointer(GesturePhase::Start, 60.0, 30.0), &mut session, &mut surface);

        assert_eq!(response.outcome, StrokeOutcome::Revealed);
        assert_eq!(session.state(), SessionState::Resolved);
        assert!(!router.is_pressing());

        let response = router.route(&pointer(GesturePhase::Move, 60.0, 30.0), &mut session, &mut surface);
        assert_eq!(response.outcome, StrokeOutcome::Ignored);
        assert!(!response.prevent_default);
    }

    #[test]
    fn position_samples_are_starts_and_moves() {
        assert!(pointer(GesturePhase::Start, 1.0, 2.0).samples_position());
        assert!(pointer(GesturePhase::Move, 1.0, 2.0).samples_position());
        assert!(!pointer(GesturePhase::End, 1.0, 2.0).samples_position());
        assert!(!pointer(GesturePhase::Cancel, 1.0, 2.0).samples_position());
        assert!(!InputEvent::ContextMenu.samples_position());

        let lifted = InputEvent::Touch {
            phase: GesturePhase::Move,
            touches: SmallVec::new(),
        };
        assert!(!lifted.samples_position());
    }
}

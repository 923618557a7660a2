//! Map surface capability.
//!
//! The geometry engine never talks to a mapping SDK directly. It drives a
//! [`MapSurface`], which renders overlays, reports user mutations and frames
//! the viewport. [`RecordingMapSurface`] is the in-process implementation: it
//! keeps overlay state in memory and records every operation as a
//! [`SurfaceCommand`] so that a browser client can replay them on a real map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransientCollaboratorError;
use crate::models::coordinate::Coordinate;
use crate::models::shape::{bounding_box, BoundingBox, Shape};

/// Opaque reference to an overlay owned by a map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayHandle(pub u64);

impl std::fmt::Display for OverlayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// Visual options of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStyle {
    pub stroke_color: String,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub editable: bool,
    pub draggable: bool,
}

impl OverlayStyle {
    /// Style of the overlay under edit.
    pub fn editable(color: &str) -> Self {
        Self {
            stroke_color: color.to_string(),
            fill_color: color.to_string(),
            fill_opacity: 0.35,
            editable: true,
            draggable: true,
        }
    }

    /// Style of committed geofences drawn for context.
    pub fn read_only(color: &str) -> Self {
        Self {
            stroke_color: color.to_string(),
            fill_color: color.to_string(),
            fill_opacity: 0.2,
            editable: false,
            draggable: false,
        }
    }
}

/// Geometry reported by, or written to, an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayGeometry {
    #[serde(rename_all = "camelCase")]
    Circle {
        center: Coordinate,
        radius_meters: f64,
    },
    Polygon { vertices: Vec<Coordinate> },
}

impl OverlayGeometry {
    /// Overlay form of a shape. Rectangles are drawn as polygons.
    pub fn from_shape(shape: &Shape) -> Self {
        match shape.clone().into_editable() {
            Shape::Circle {
                center,
                radius_meters,
            } => OverlayGeometry::Circle {
                center,
                radius_meters,
            },
            Shape::Polygon { vertices } => OverlayGeometry::Polygon { vertices },
            Shape::Rectangle { .. } => OverlayGeometry::Polygon {
                vertices: shape.bounding_points(),
            },
        }
    }

    pub fn into_shape(self) -> Shape {
        match self {
            OverlayGeometry::Circle {
                center,
                radius_meters,
            } => Shape::circle(center, radius_meters),
            OverlayGeometry::Polygon { vertices } => Shape::polygon(vertices),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OverlayGeometry::Circle { .. } => "circle",
            OverlayGeometry::Polygon { .. } => "polygon",
        }
    }

    /// Tolerant comparison used to recognise echoes of our own writes.
    pub fn approx_eq(&self, other: &OverlayGeometry) -> bool {
        self.clone().into_shape().approx_eq(&other.clone().into_shape())
    }
}

/// Operations of a map surface.
///
/// Implementations are driven from one editing session at a time; they do
/// not need to be `Sync`.
pub trait MapSurface: Send {
    fn render_circle(
        &mut self,
        center: Coordinate,
        radius_meters: f64,
        style: &OverlayStyle,
    ) -> Result<OverlayHandle, TransientCollaboratorError>;

    fn render_polygon(
        &mut self,
        vertices: &[Coordinate],
        style: &OverlayStyle,
    ) -> Result<OverlayHandle, TransientCollaboratorError>;

    /// Programmatic write of new geometry onto an existing overlay.
    fn update_overlay(
        &mut self,
        handle: OverlayHandle,
        geometry: &OverlayGeometry,
    ) -> Result<(), TransientCollaboratorError>;

    /// Starts delivering user mutations of `handle` to the session.
    fn subscribe_mutations(&mut self, handle: OverlayHandle);

    /// Temporarily mutes mutation events of `handle`.
    fn suppress_mutations(&mut self, handle: OverlayHandle, suppressed: bool);

    fn set_visible(&mut self, handle: OverlayHandle, visible: bool);

    fn remove_overlay(&mut self, handle: OverlayHandle);

    /// Frames the viewport around `points`. No-op when empty.
    fn fit_bounds(&mut self, points: &[Coordinate]);
}

/// Renders a shape with the overlay primitive matching its geometry.
pub fn render_shape(
    surface: &mut dyn MapSurface,
    shape: &Shape,
    style: &OverlayStyle,
) -> Result<OverlayHandle, TransientCollaboratorError> {
    match OverlayGeometry::from_shape(shape) {
        OverlayGeometry::Circle {
            center,
            radius_meters,
        } => surface.render_circle(center, radius_meters, style),
        OverlayGeometry::Polygon { vertices } => surface.render_polygon(&vertices, style),
    }
}

/// A surface operation, as replayed by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceCommand {
    #[serde(rename_all = "camelCase")]
    RenderCircle {
        handle: OverlayHandle,
        center: Coordinate,
        radius_meters: f64,
        style: OverlayStyle,
    },
    RenderPolygon {
        handle: OverlayHandle,
        vertices: Vec<Coordinate>,
        style: OverlayStyle,
    },
    UpdateOverlay {
        handle: OverlayHandle,
        geometry: OverlayGeometry,
    },
    SetVisible {
        handle: OverlayHandle,
        visible: bool,
    },
    RemoveOverlay {
        handle: OverlayHandle,
    },
    FitBounds {
        bounds: BoundingBox,
    },
}

/// Overlay state held by [`RecordingMapSurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOverlay {
    pub geometry: OverlayGeometry,
    pub style: OverlayStyle,
    pub visible: bool,
    pub subscribed: bool,
    pub suppressed: bool,
}

/// In-memory map surface that records what it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingMapSurface {
    next_handle: u64,
    overlays: HashMap<OverlayHandle, RecordedOverlay>,
    commands: Vec<SurfaceCommand>,
    pending_events: Vec<(OverlayHandle, OverlayGeometry)>,
    overlay_writes: usize,
    /// Queue a change event for every programmatic write, as SDKs that
    /// dispatch events asynchronously do.
    pub echo_updates: bool,
    /// Simulate a map that failed to initialize.
    pub simulate_failure: bool,
}

impl RecordingMapSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose writes come back as deferred mutation events.
    pub fn echoing() -> Self {
        Self {
            echo_updates: true,
            ..Self::default()
        }
    }

    /// A surface that cannot render anything.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    /// Drains the commands recorded so far.
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drains queued mutation events (echoes of programmatic writes).
    pub fn take_pending_events(&mut self) -> Vec<(OverlayHandle, OverlayGeometry)> {
        std::mem::take(&mut self.pending_events)
    }

    /// Number of `update_overlay` calls received.
    pub fn overlay_writes(&self) -> usize {
        self.overlay_writes
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&RecordedOverlay> {
        self.overlays.get(&handle)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn visible_overlay_count(&self) -> usize {
        self.overlays.values().filter(|o| o.visible).count()
    }

    /// Simulates the user dragging or reshaping an overlay.
    ///
    /// Returns the geometry the session should receive, or `None` when the
    /// overlay is unknown, unsubscribed or muted.
    pub fn user_mutation(
        &mut self,
        handle: OverlayHandle,
        geometry: OverlayGeometry,
    ) -> Option<OverlayGeometry> {
        let overlay = self.overlays.get_mut(&handle)?;
        overlay.geometry = geometry.clone();
        if overlay.subscribed && !overlay.suppressed {
            Some(geometry)
        } else {
            None
        }
    }

    fn render(
        &mut self,
        geometry: OverlayGeometry,
        style: &OverlayStyle,
    ) -> Result<OverlayHandle, TransientCollaboratorError> {
        if self.simulate_failure {
            return Err(TransientCollaboratorError::MapSurface(
                "map surface failed to initialize".to_string(),
            ));
        }

        self.next_handle += 1;
        let handle = OverlayHandle(self.next_handle);

        let command = match &geometry {
            OverlayGeometry::Circle {
                center,
                radius_meters,
            } => SurfaceCommand::RenderCircle {
                handle,
                center: *center,
                radius_meters: *radius_meters,
                style: style.clone(),
            },
            OverlayGeometry::Polygon { vertices } => SurfaceCommand::RenderPolygon {
                handle,
                vertices: vertices.clone(),
                style: style.clone(),
            },
        };
        self.commands.push(command);
        self.overlays.insert(
            handle,
            RecordedOverlay {
                geometry,
                style: style.clone(),
                visible: true,
                subscribed: false,
                suppressed: false,
            },
        );

        debug!(%handle, "Overlay rendered");
        Ok(handle)
    }
}

impl MapSurface for RecordingMapSurface {
    fn render_circle(
        &mut self,
        center: Coordinate,
        radius_meters: f64,
        style: &OverlayStyle,
    ) -> Result<OverlayHandle, TransientCollaboratorError> {
        self.render(
            OverlayGeometry::Circle {
                center,
                radius_meters,
            },
            style,
        )
    }

    fn render_polygon(
        &mut self,
        vertices: &[Coordinate],
        style: &OverlayStyle,
    ) -> Result<OverlayHandle, TransientCollaboratorError> {
        self.render(
            OverlayGeometry::Polygon {
                vertices: vertices.to_vec(),
            },
            style,
        )
    }

    fn update_overlay(
        &mut self,
        handle: OverlayHandle,
        geometry: &OverlayGeometry,
    ) -> Result<(), TransientCollaboratorError> {
        let overlay = self.overlays.get_mut(&handle).ok_or_else(|| {
            TransientCollaboratorError::MapSurface(format!("unknown overlay {}", handle))
        })?;
        overlay.geometry = geometry.clone();
        self.overlay_writes += 1;

        if self.echo_updates && overlay.subscribed {
            self.pending_events.push((handle, geometry.clone()));
        }

        self.commands.push(SurfaceCommand::UpdateOverlay {
            handle,
            geometry: geometry.clone(),
        });
        Ok(())
    }

    fn subscribe_mutations(&mut self, handle: OverlayHandle) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            overlay.subscribed = true;
        }
    }

    fn suppress_mutations(&mut self, handle: OverlayHandle, suppressed: bool) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            overlay.suppressed = suppressed;
        }
    }

    fn set_visible(&mut self, handle: OverlayHandle, visible: bool) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            if overlay.visible != visible {
                overlay.visible = visible;
                self.commands
                    .push(SurfaceCommand::SetVisible { handle, visible });
            }
        }
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            self.commands.push(SurfaceCommand::RemoveOverlay { handle });
            debug!(%handle, "Overlay removed");
        }
    }

    fn fit_bounds(&mut self, points: &[Coordinate]) {
        if let Some(bounds) = bounding_box(points) {
            self.commands.push(SurfaceCommand::FitBounds { bounds });
        }
    }
}

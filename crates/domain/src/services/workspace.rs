//! Committed geofences of a console session and their overlays.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::EditorError;
use crate::models::coordinate::Coordinate;
use crate::models::geofence::{Geofence, GeofencePage, SkippedRecord};
use crate::services::map_surface::{render_shape, MapSurface, OverlayHandle, OverlayStyle};

/// Which overlay belongs to which geofence.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    handles: HashMap<String, OverlayHandle>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, handle: OverlayHandle) -> Option<OverlayHandle> {
        self.handles.insert(id.into(), handle)
    }

    pub fn get(&self, id: &str) -> Option<OverlayHandle> {
        self.handles.get(id).copied()
    }

    /// Removes the overlay of `id` from the surface.
    pub fn release(&mut self, surface: &mut dyn MapSurface, id: &str) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                surface.remove_overlay(handle);
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self, surface: &mut dyn MapSurface) {
        for (_, handle) in self.handles.drain() {
            surface.remove_overlay(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Saved list state for rolling back an optimistic change.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    geofences: Vec<Geofence>,
}

/// The committed geofence list, as rendered on the map.
#[derive(Debug, Default)]
pub struct GeofenceWorkspace {
    geofences: Vec<Geofence>,
    skipped: Vec<SkippedRecord>,
    overlays: OverlayRegistry,
    hidden: Option<String>,
}

impl GeofenceWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geofences(&self) -> &[Geofence] {
        &self.geofences
    }

    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.geofences.iter().find(|g| g.id == id)
    }

    /// Records that were left out of the last load.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn overlays(&self) -> &OverlayRegistry {
        &self.overlays
    }

    pub fn hidden(&self) -> Option<&str> {
        self.hidden.as_deref()
    }

    /// Replaces the list with a freshly listed page, renders it and frames it.
    pub fn load(&mut self, surface: &mut dyn MapSurface, page: GeofencePage) {
        self.overlays.release_all(surface);

        for record in &page.skipped {
            warn!(
                geofence_id = record.id.as_deref().unwrap_or("unknown"),
                reason = %record.reason,
                "Skipping geofence with unreadable geometry"
            );
        }

        self.geofences = page.geofences;
        self.skipped = page.skipped;
        self.render_all(surface);
        self.fit(surface);

        debug!(
            loaded = self.geofences.len(),
            skipped = self.skipped.len(),
            "Workspace loaded"
        );
    }

    /// Frames every geofence in the list.
    pub fn fit(&self, surface: &mut dyn MapSurface) {
        let points: Vec<Coordinate> = self
            .geofences
            .iter()
            .flat_map(|g| g.shape.bounding_points())
            .collect();
        surface.fit_bounds(&points);
    }

    /// Takes a geofence off the map while it is being edited.
    pub fn hide(&mut self, surface: &mut dyn MapSurface, id: &str) -> Result<Geofence, EditorError> {
        let geofence = self
            .get(id)
            .cloned()
            .ok_or_else(|| EditorError::UnknownGeofence(id.to_string()))?;
        self.overlays.release(surface, id);
        self.hidden = Some(id.to_string());
        Ok(geofence)
    }

    /// Puts the hidden geofence back on the map.
    pub fn show(&mut self, surface: &mut dyn MapSurface) {
        if let Some(id) = self.hidden.take() {
            if let Some(geofence) = self.get(&id).cloned() {
                self.render(surface, &geofence);
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            geofences: self.geofences.clone(),
        }
    }

    /// Inserts or replaces a geofence by id.
    pub fn upsert(&mut self, surface: &mut dyn MapSurface, geofence: Geofence) {
        self.overlays.release(surface, &geofence.id);
        match self.geofences.iter_mut().find(|g| g.id == geofence.id) {
            Some(existing) => *existing = geofence.clone(),
            None => self.geofences.push(geofence.clone()),
        }
        self.render(surface, &geofence);
    }

    /// Swaps the entry `old_id` (e.g. a placeholder) for the persisted geofence.
    pub fn replace(&mut self, surface: &mut dyn MapSurface, old_id: &str, geofence: Geofence) {
        self.overlays.release(surface, old_id);
        self.geofences.retain(|g| g.id != old_id);
        if self.hidden.as_deref() == Some(old_id) {
            self.hidden = Some(geofence.id.clone());
        }
        self.upsert(surface, geofence);
    }

    /// Removes a geofence and its overlay.
    pub fn remove(&mut self, surface: &mut dyn MapSurface, id: &str) -> Option<Geofence> {
        let index = self.geofences.iter().position(|g| g.id == id)?;
        self.overlays.release(surface, id);
        Some(self.geofences.remove(index))
    }

    /// Restores the list saved by [`GeofenceWorkspace::snapshot`].
    pub fn rollback(&mut self, surface: &mut dyn MapSurface, snapshot: Snapshot) {
        self.overlays.release_all(surface);
        self.geofences = snapshot.geofences;
        self.render_all(surface);
        debug!(count = self.geofences.len(), "Workspace rolled back");
    }

    pub fn release_all(&mut self, surface: &mut dyn MapSurface) {
        self.overlays.release_all(surface);
        self.hidden = None;
    }

    fn render_all(&mut self, surface: &mut dyn MapSurface) {
        let geofences = self.geofences.clone();
        for geofence in &geofences {
            self.render(surface, geofence);
        }
    }

    fn render(&mut self, surface: &mut dyn MapSurface, geofence: &Geofence) {
        if self.hidden.as_deref() == Some(geofence.id.as_str()) {
            return;
        }

        let style = OverlayStyle::read_only(&geofence.color);
        match render_shape(surface, &geofence.shape, &style) {
            Ok(handle) => {
                if let Some(previous) = self.overlays.insert(geofence.id.clone(), handle) {
                    surface.remove_overlay(previous);
                }
            }
            Err(e) => {
                warn!(geofence_id = %geofence.id, error = %e, "Failed to render geofence");
            }
        }
    }
}

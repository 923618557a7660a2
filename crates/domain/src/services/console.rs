//! Console session orchestration.
//!
//! Ties one [`GeofenceEditor`] and one [`GeofenceWorkspace`] to a map surface
//! and to the persistence and geocoding collaborators. List changes caused by
//! commit and delete are applied optimistically and rolled back when
//! persistence fails.

use std::sync::Arc;

use shared::pagination::{PageInfo, PageRequest};
use tracing::{debug, error, info, warn};

use crate::error::{EditorError, PersistenceError};
use crate::models::coordinate::{Coordinate, COORDINATE_EPSILON};
use crate::models::geofence::Geofence;
use crate::models::shape::{Shape, ShapeType};
use crate::services::editor::{
    CommitMode, EditorSettings, FormField, GeofenceEditor, SyncOutcome,
};
use crate::services::geocoder::Geocoder;
use crate::services::map_surface::{MapSurface, OverlayGeometry};
use crate::services::store::GeofenceStore;
use crate::services::workspace::{GeofenceWorkspace, Snapshot};

/// One user's geofence console.
pub struct GeofenceConsole<M: MapSurface> {
    surface: M,
    editor: GeofenceEditor,
    workspace: GeofenceWorkspace,
    store: Arc<dyn GeofenceStore>,
    geocoder: Arc<dyn Geocoder>,
    page: PageRequest,
    search: Option<String>,
    pagination: Option<PageInfo>,
    geocoded_anchor: Option<Coordinate>,
}

impl<M: MapSurface> GeofenceConsole<M> {
    pub fn new(
        surface: M,
        settings: EditorSettings,
        store: Arc<dyn GeofenceStore>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            surface,
            editor: GeofenceEditor::new(settings),
            workspace: GeofenceWorkspace::new(),
            store,
            geocoder,
            page: PageRequest::default(),
            search: None,
            pagination: None,
            geocoded_anchor: None,
        }
    }

    pub fn editor(&self) -> &GeofenceEditor {
        &self.editor
    }

    pub fn workspace(&self) -> &GeofenceWorkspace {
        &self.workspace
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut M {
        &mut self.surface
    }

    pub fn pagination(&self) -> Option<&PageInfo> {
        self.pagination.as_ref()
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Lists a page of geofences and loads it onto the map.
    pub async fn open(
        &mut self,
        page: PageRequest,
        search: Option<String>,
    ) -> Result<(), EditorError> {
        let search = search.filter(|s| !s.trim().is_empty());
        let listed = self
            .store
            .list_geofences(&page, search.as_deref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list geofences");
                EditorError::Persistence(e)
            })?;

        info!(
            count = listed.geofences.len(),
            skipped = listed.skipped.len(),
            page = page.page,
            "Geofences listed"
        );

        self.pagination = Some(listed.pagination.clone());
        self.page = page;
        self.search = search;
        self.workspace.load(&mut self.surface, listed);
        Ok(())
    }

    /// Re-lists from the first page filtered by `text`.
    pub async fn search(&mut self, text: &str) -> Result<(), EditorError> {
        let page = PageRequest {
            page: 1,
            limit: self.page.limit,
        };
        self.open(page, Some(text.to_string())).await
    }

    pub fn start_drawing(
        &mut self,
        shape_type: ShapeType,
        center: Option<Coordinate>,
    ) -> Result<(), EditorError> {
        self.geocoded_anchor = None;
        self.editor
            .start_drawing(&mut self.surface, shape_type, center)
    }

    pub fn place(&mut self, at: Coordinate) -> Result<(), EditorError> {
        self.editor.place(&mut self.surface, at)
    }

    /// Opens a listed geofence for editing, hiding its read-only overlay.
    pub fn begin_edit(&mut self, id: &str) -> Result<(), EditorError> {
        if self.editor.state().is_active() {
            return Err(EditorError::InvalidTransition {
                state: self.editor.state(),
                action: "edit",
            });
        }

        let geofence = self.workspace.hide(&mut self.surface, id)?;
        if let Err(e) = self.editor.begin_edit(&mut self.surface, &geofence) {
            self.workspace.show(&mut self.surface);
            return Err(e);
        }
        self.geocoded_anchor = None;
        Ok(())
    }

    pub fn apply_overlay_mutation(
        &mut self,
        geometry: OverlayGeometry,
    ) -> Result<SyncOutcome, EditorError> {
        self.editor.apply_overlay_mutation(geometry)
    }

    pub fn apply_form_edit(
        &mut self,
        field: FormField,
        value: &str,
    ) -> Result<SyncOutcome, EditorError> {
        self.editor.apply_form_edit(&mut self.surface, field, value)
    }

    pub fn insert_vertex(&mut self, index: usize, at: Coordinate) -> Result<(), EditorError> {
        self.editor.insert_vertex(&mut self.surface, index, at)
    }

    pub fn remove_vertex(&mut self, index: usize) -> Result<(), EditorError> {
        self.editor.remove_vertex(&mut self.surface, index)
    }

    pub fn switch_shape_type(&mut self, shape_type: ShapeType) -> Result<(), EditorError> {
        self.editor.switch_shape_type(&mut self.surface, shape_type)
    }

    /// Reverse geocodes the anchor of the working shape into the address field.
    ///
    /// Geocoding failures are logged and leave the address empty.
    pub async fn refresh_address(&mut self) -> Result<Option<String>, EditorError> {
        if !self.editor.state().is_active() {
            return Err(EditorError::InvalidTransition {
                state: self.editor.state(),
                action: "look up an address",
            });
        }

        let Some(anchor) = self.editor.shape().and_then(Shape::anchor) else {
            return Ok(None);
        };
        if self
            .geocoded_anchor
            .is_some_and(|last| last.approx_eq(&anchor, COORDINATE_EPSILON))
        {
            return Ok(self.editor.metadata().address.clone());
        }

        match self.geocoder.reverse_geocode(anchor).await {
            Ok(address) => {
                self.editor.set_address(address.clone());
                self.geocoded_anchor = Some(anchor);
                Ok(address)
            }
            Err(e) => {
                warn!(error = %e, lat = anchor.lat, lng = anchor.lng, "Reverse geocoding failed");
                self.editor.set_address(None);
                self.geocoded_anchor = None;
                Ok(None)
            }
        }
    }

    /// Commits the working geofence through the persistence collaborator.
    ///
    /// If the returned future is dropped before the store answers, the
    /// optimistic list change is rolled back and the editor leaves
    /// `Committing` as if the store had failed.
    pub async fn commit(&mut self) -> Result<Geofence, EditorError> {
        let request = self.editor.commit()?;
        let store = Arc::clone(&self.store);

        let pending = PendingCommit::begin(self, request.geofence.clone());
        let result = match &request.mode {
            CommitMode::Create => store.create_geofence(&request.payload).await,
            CommitMode::Update { id } => store.update_geofence(id, &request.payload).await,
        };
        pending.settle(request.mode, result)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), EditorError> {
        if self.editor.editing_id() == Some(id) {
            return Err(EditorError::GeofenceBusy(id.to_string()));
        }

        let snapshot = self.workspace.snapshot();
        if self.workspace.remove(&mut self.surface, id).is_none() {
            return Err(EditorError::UnknownGeofence(id.to_string()));
        }

        match self.store.delete_geofence(id).await {
            Ok(()) => {
                info!(geofence_id = %id, "Geofence deleted");
                Ok(())
            }
            Err(e) => {
                error!(geofence_id = %id, error = %e, "Failed to delete geofence");
                self.workspace.rollback(&mut self.surface, snapshot);
                Err(EditorError::Persistence(e))
            }
        }
    }

    /// Abandons the current draw or edit and restores the hidden geofence.
    pub fn cancel(&mut self) -> Result<(), EditorError> {
        self.editor.cancel(&mut self.surface)?;
        self.workspace.show(&mut self.surface);
        self.geocoded_anchor = None;
        Ok(())
    }

    /// Releases every overlay owned by this console.
    pub fn close(&mut self) {
        if let Err(e) = self.editor.cancel(&mut self.surface) {
            warn!(error = %e, "Closing console with an unfinished commit");
        }
        self.workspace.release_all(&mut self.surface);
    }
}

/// An in-flight commit holding the optimistic list change.
///
/// Dropping it unsettled restores the list and returns the editor to the
/// state the commit started from.
struct PendingCommit<'a, M: MapSurface> {
    console: &'a mut GeofenceConsole<M>,
    snapshot: Snapshot,
    provisional_id: String,
    settled: bool,
}

impl<'a, M: MapSurface> PendingCommit<'a, M> {
    fn begin(console: &'a mut GeofenceConsole<M>, geofence: Geofence) -> Self {
        let snapshot = console.workspace.snapshot();
        let provisional_id = geofence.id.clone();
        console.workspace.upsert(&mut console.surface, geofence);
        Self {
            console,
            snapshot,
            provisional_id,
            settled: false,
        }
    }

    fn settle(
        mut self,
        mode: CommitMode,
        result: Result<Geofence, PersistenceError>,
    ) -> Result<Geofence, EditorError> {
        self.settled = true;
        let snapshot = std::mem::take(&mut self.snapshot);
        let console = &mut *self.console;

        match result {
            Ok(persisted) => {
                console
                    .workspace
                    .replace(&mut console.surface, &self.provisional_id, persisted.clone());
                console.editor.complete_commit(&mut console.surface, Ok(()))?;
                console.workspace.show(&mut console.surface);
                console.geocoded_anchor = None;

                info!(
                    geofence_id = %persisted.id,
                    mode = mode.as_str(),
                    "Geofence committed"
                );
                Ok(persisted)
            }
            Err(e) => {
                error!(
                    geofence_id = %self.provisional_id,
                    mode = mode.as_str(),
                    error = %e,
                    "Failed to persist geofence"
                );
                console.workspace.rollback(&mut console.surface, snapshot);
                let err = console
                    .editor
                    .complete_commit(&mut console.surface, Err(e.clone()))
                    .err()
                    .unwrap_or(EditorError::Persistence(e));
                Err(err)
            }
        }
    }
}

impl<M: MapSurface> Drop for PendingCommit<'_, M> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        warn!(
            geofence_id = %self.provisional_id,
            "Commit abandoned before the store answered, rolling back"
        );
        let console = &mut *self.console;
        console
            .workspace
            .rollback(&mut console.surface, std::mem::take(&mut self.snapshot));
        let abandoned = PersistenceError::Unavailable(
            "Commit was interrupted before the backend answered".to_string(),
        );
        if let Err(e) = console
            .editor
            .complete_commit(&mut console.surface, Err(abandoned))
        {
            debug!(error = %e, "Editor resumed after abandoned commit");
        }
    }
}

//! In-memory `RecordStore` backing the demo binary and the test suites.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::{
    ApplicationFilter, DocumentFilter, ProfileFilter, RecordCounts, RecordStore, SchemeFilter,
    StoreError,
};
use crate::domain::{
    Application, ApplicationId, Document, DocumentId, Notification, Profile, ProfileId, Scheme,
    SchemeId,
};

#[derive(Default)]
struct Shelves {
    profiles: HashMap<ProfileId, Profile>,
    schemes: HashMap<SchemeId, Scheme>,
    documents: HashMap<DocumentId, Document>,
    applications: HashMap<ApplicationId, Application>,
    notifications: Vec<Notification>,
    available: bool,
}

/// Mutex-guarded map store. `set_available(false)` simulates connectivity
/// loss so degraded-mode behavior can be exercised without a real backend.
pub struct InMemoryStore {
    shelves: Mutex<Shelves>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            shelves: Mutex::new(Shelves {
                available: true,
                ..Shelves::default()
            }),
        }
    }
}

impl InMemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Shelves> {
        self.shelves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checked(&self) -> Result<std::sync::MutexGuard<'_, Shelves>, StoreError> {
        let guard = self.lock();
        if guard.available {
            Ok(guard)
        } else {
            Err(StoreError::Unavailable("store offline".to_string()))
        }
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    pub fn insert_scheme(&self, scheme: Scheme) {
        self.lock().schemes.insert(scheme.id.clone(), scheme);
    }

    pub fn insert_document(&self, document: Document) {
        self.lock().documents.insert(document.id.clone(), document);
    }

    pub fn insert_application(&self, application: Application) {
        self.lock()
            .applications
            .insert(application.id.clone(), application);
    }

    /// Flip simulated connectivity.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Snapshot of stored notifications, newest last.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.lock().documents.get(id).cloned()
    }
}

impl RecordStore for InMemoryStore {
    fn find_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let guard = self.checked()?;
        let mut profiles: Vec<Profile> = guard
            .profiles
            .values()
            .filter(|profile| filter.ids.is_empty() || filter.ids.contains(&profile.id))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(profiles)
    }

    fn find_schemes(&self, filter: &SchemeFilter) -> Result<Vec<Scheme>, StoreError> {
        let guard = self.checked()?;
        let mut schemes: Vec<Scheme> = guard
            .schemes
            .values()
            .filter(|scheme| filter.ids.is_empty() || filter.ids.contains(&scheme.id))
            .filter(|scheme| !filter.active_only || scheme.active)
            .cloned()
            .collect();
        schemes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(schemes)
    }

    fn find_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        let guard = self.checked()?;
        let mut documents: Vec<Document> = guard
            .documents
            .values()
            .filter(|document| {
                filter
                    .profile_id
                    .as_ref()
                    .map_or(true, |id| &document.profile_id == id)
            })
            .filter(|document| {
                filter
                    .status
                    .map_or(true, |status| document.status == status)
            })
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(documents)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = self.checked()?;
        Ok(guard.applications.get(id).cloned())
    }

    fn query_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let guard = self.checked()?;
        let mut applications: Vec<Application> = guard
            .applications
            .values()
            .filter(|application| {
                filter
                    .profile_id
                    .as_ref()
                    .map_or(true, |id| &application.profile_id == id)
            })
            .filter(|application| {
                filter
                    .status
                    .map_or(true, |status| application.status == status)
            })
            .filter(|application| match filter.submitted_before {
                Some(cutoff) => application
                    .submitted_at
                    .map_or(false, |submitted| submitted < cutoff),
                None => true,
            })
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(applications)
    }

    fn save_application(&self, application: &Application) -> Result<(), StoreError> {
        let mut guard = self.checked()?;
        guard
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(())
    }

    fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        let mut guard = self.checked()?;
        guard.documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    fn insert_notification(&self, notification: Notification) -> Result<(), StoreError> {
        let mut guard = self.checked()?;
        guard.notifications.push(notification);
        Ok(())
    }

    fn delete_notifications_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut guard = self.checked()?;
        let before = guard.notifications.len();
        guard
            .notifications
            .retain(|notification| notification.expires_at > cutoff);
        Ok(before - guard.notifications.len())
    }

    fn counts(&self) -> Result<RecordCounts, StoreError> {
        let guard = self.checked()?;
        Ok(RecordCounts {
            profiles: guard.profiles.len() as u64,
            schemes: guard.schemes.len() as u64,
            applications: guard.applications.len() as u64,
        })
    }
}

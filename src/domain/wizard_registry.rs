//! Concurrent storage of server-held wizard sessions.
//!
//! Each session sits behind its own [`tokio::sync::RwLock`], so requests for
//! one wizard are serialized while different wizards proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ids::{CompanyId, UserId, WizardId};
use super::wizard::BookingWizard;
use crate::error::BookingError;

/// A wizard together with the identity it books for.
#[derive(Debug)]
pub struct WizardEntry {
    /// Session identifier.
    pub wizard_id: WizardId,
    /// Booking user.
    pub user_id: UserId,
    /// Company billed.
    pub company_id: Option<CompanyId>,
    /// Wizard state.
    pub wizard: BookingWizard,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub last_modified_at: DateTime<Utc>,
}

impl WizardEntry {
    /// Creates an entry with a fresh id.
    #[must_use]
    pub fn new(user_id: UserId, company_id: Option<CompanyId>, wizard: BookingWizard) -> Self {
        let now = Utc::now();
        Self {
            wizard_id: WizardId::new(),
            user_id,
            company_id,
            wizard,
            created_at: now,
            last_modified_at: now,
        }
    }

    /// Marks the entry as modified.
    pub fn touch(&mut self) {
        self.last_modified_at = Utc::now();
    }
}

/// Store of active wizard sessions.
#[derive(Debug, Default)]
pub struct WizardRegistry {
    wizards: RwLock<HashMap<WizardId, Arc<RwLock<WizardEntry>>>>,
}

impl WizardRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRequest`] if the id is already taken.
    pub async fn insert(&self, entry: WizardEntry) -> Result<WizardId, BookingError> {
        let wizard_id = entry.wizard_id;
        let mut map = self.wizards.write().await;
        if map.contains_key(&wizard_id) {
            return Err(BookingError::InvalidRequest(format!(
                "wizard {wizard_id} already exists"
            )));
        }
        map.insert(wizard_id, Arc::new(RwLock::new(entry)));
        Ok(wizard_id)
    }

    /// Returns the session behind its lock.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn get(&self, wizard_id: WizardId) -> Result<Arc<RwLock<WizardEntry>>, BookingError> {
        self.wizards
            .read()
            .await
            .get(&wizard_id)
            .cloned()
            .ok_or(BookingError::WizardNotFound(*wizard_id.as_uuid()))
    }

    /// Removes a session.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::WizardNotFound`] for an unknown id.
    pub async fn remove(&self, wizard_id: WizardId) -> Result<(), BookingError> {
        self.wizards
            .write()
            .await
            .remove(&wizard_id)
            .map(drop)
            .ok_or(BookingError::WizardNotFound(*wizard_id.as_uuid()))
    }

    /// Drops sessions idle since before `cutoff`. Returns how many went.
    pub async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut map = self.wizards.write().await;
        let mut stale = Vec::new();
        for (id, entry) in map.iter() {
            if entry.read().await.last_modified_at < cutoff {
                stale.push(*id);
            }
        }
        for id in &stale {
            map.remove(id);
        }
        stale.len()
    }

    /// Number of sessions.
    pub async fn len(&self) -> usize {
        self.wizards.read().await.len()
    }

    /// Returns `true` if there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.wizards.read().await.is_empty()
    }
}

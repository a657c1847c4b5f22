//! Wizard session DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CompanyId, ResourceId, SiteId, Slot, UserId, WizardId, WizardView};

/// Request body for `POST /wizards`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWizardRequest {
    /// Booking user.
    pub user_id: UserId,
    /// Company billed for the credits.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    /// Modal sessions close themselves after a successful booking.
    #[serde(default)]
    pub modal: bool,
    /// Preselected site.
    #[serde(default)]
    pub site_id: Option<SiteId>,
    /// Preselected day.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Response body for `POST /wizards` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateWizardResponse {
    /// Session identifier.
    pub wizard_id: WizardId,
    /// Initial view.
    pub wizard: WizardView,
}

/// Request body for `PUT /wizards/{id}/site`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectSiteRequest {
    /// Site to show.
    pub site_id: SiteId,
}

/// Request body for `PUT /wizards/{id}/date`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectDateRequest {
    /// Day to show.
    pub date: NaiveDate,
}

/// Request body for `POST /wizards/{id}/slot-click`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SlotClickRequest {
    /// Clicked room.
    pub resource_id: ResourceId,
    /// Clicked hour.
    pub slot: Slot,
}

/// Request body for `PUT /wizards/{id}/slots`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetSlotsRequest {
    /// First hour.
    pub start: Slot,
    /// Hour at which the selection ends.
    pub end_hour: u32,
}

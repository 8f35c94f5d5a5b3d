//! Sample document type: a service offering.
//!
//! Offerings carry a list of requirements and a list of option groups,
//! each option group holding tier-pricing entries. The reducers follow
//! the same idioms as every domain document type: lookup-or-reject with
//! a distinct error kind per missing-reference site, tri-state partial
//! updates, and duplicate-id rejection before any mutation.

use std::fmt;

use serde::{Deserialize, Serialize};

use quire::dispatch::Emitter;
use quire::model::types::Scope;
use quire::model::update::Update;
use quire::registry::{DomainError, Registry, RegistryError};

/// The registered document type.
pub const OFFERING_DOCUMENT_TYPE: &str = "quire/offering";

/// Add a requirement (global scope).
pub const ADD_REQUIREMENT: &str = "ADD_REQUIREMENT";
/// Partially update a requirement (global scope).
pub const UPDATE_REQUIREMENT: &str = "UPDATE_REQUIREMENT";
/// Add an option group (global scope).
pub const ADD_OPTION_GROUP: &str = "ADD_OPTION_GROUP";
/// Add a tier-pricing entry to an option group (global scope).
pub const ADD_OPTION_GROUP_TIER_PRICING: &str = "ADD_OPTION_GROUP_TIER_PRICING";
/// Partially update a tier-pricing entry (global scope).
pub const UPDATE_OPTION_GROUP_TIER_PRICING: &str = "UPDATE_OPTION_GROUP_TIER_PRICING";
/// Set or clear the private draft note (local scope).
pub const SET_DRAFT_NOTE: &str = "SET_DRAFT_NOTE";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Global scope state of an offering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingState {
    pub requirements: Vec<Requirement>,
    pub option_groups: Vec<OptionGroup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionGroup {
    pub id: String,
    pub name: String,
    pub tier_pricing: Vec<TierPricing>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPricing {
    pub id: String,
    pub tier_id: String,
    pub unit_price_cents: i64,
}

/// Local scope state: a machine-private draft note.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingLocalState {
    pub draft_note: Option<String>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequirementInput {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequirementInput {
    pub id: String,
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub title: Update<String>,
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub description: Update<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptionGroupInput {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTierPricingInput {
    pub option_group_id: String,
    pub tier_pricing_id: String,
    pub tier_id: String,
    pub unit_price_cents: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTierPricingInput {
    pub option_group_id: String,
    pub tier_pricing_id: String,
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub tier_id: Update<String>,
    #[serde(default, skip_serializing_if = "Update::is_absent")]
    pub unit_price_cents: Update<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDraftNoteInput {
    #[serde(default)]
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejections raised by the offering reducers. One variant per
/// (action kind, rejection site).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OfferingError {
    DuplicateRequirementId { id: String },
    UpdateRequirementNotFound { id: String },
    RequirementTitleRequired { id: String },
    DuplicateOptionGroupId { id: String },
    AddOptionGroupTierPricingGroupNotFound { id: String },
    DuplicateOptionGroupTierPricingId { id: String },
    UpdateOptionGroupTierPricingGroupNotFound { id: String },
    UpdateOptionGroupTierPricingNotFound { id: String },
    TierPricingFieldRequired { id: String, field: &'static str },
}

impl OfferingError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateRequirementId { .. } => "DuplicateRequirementId",
            Self::UpdateRequirementNotFound { .. } => "UpdateRequirementNotFound",
            Self::RequirementTitleRequired { .. } => "RequirementTitleRequired",
            Self::DuplicateOptionGroupId { .. } => "DuplicateOptionGroupId",
            Self::AddOptionGroupTierPricingGroupNotFound { .. } => {
                "AddOptionGroupTierPricingGroupNotFound"
            }
            Self::DuplicateOptionGroupTierPricingId { .. } => "DuplicateOptionGroupTierPricingId",
            Self::UpdateOptionGroupTierPricingGroupNotFound { .. } => {
                "UpdateOptionGroupTierPricingGroupNotFound"
            }
            Self::UpdateOptionGroupTierPricingNotFound { .. } => {
                "UpdateOptionGroupTierPricingNotFound"
            }
            Self::TierPricingFieldRequired { .. } => "TierPricingFieldRequired",
        }
    }
}

impl fmt::Display for OfferingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRequirementId { id } => {
                write!(f, "a requirement with id '{id}' already exists")
            }
            Self::UpdateRequirementNotFound { id } => {
                write!(f, "cannot update: no requirement with id '{id}'")
            }
            Self::RequirementTitleRequired { id } => {
                write!(f, "requirement '{id}' must keep a title")
            }
            Self::DuplicateOptionGroupId { id } => {
                write!(f, "an option group with id '{id}' already exists")
            }
            Self::AddOptionGroupTierPricingGroupNotFound { id } => {
                write!(f, "cannot add tier pricing: no option group with id '{id}'")
            }
            Self::DuplicateOptionGroupTierPricingId { id } => {
                write!(f, "a tier-pricing entry with id '{id}' already exists in this group")
            }
            Self::UpdateOptionGroupTierPricingGroupNotFound { id } => {
                write!(f, "cannot update tier pricing: no option group with id '{id}'")
            }
            Self::UpdateOptionGroupTierPricingNotFound { id } => {
                write!(f, "cannot update: no tier-pricing entry with id '{id}' in this group")
            }
            Self::TierPricingFieldRequired { id, field } => {
                write!(f, "tier-pricing entry '{id}' must keep its {field}")
            }
        }
    }
}

impl From<OfferingError> for DomainError {
    fn from(e: OfferingError) -> Self {
        let kind = e.kind();
        let message = e.to_string();
        match e {
            OfferingError::UpdateRequirementNotFound { .. }
            | OfferingError::AddOptionGroupTierPricingGroupNotFound { .. }
            | OfferingError::UpdateOptionGroupTierPricingGroupNotFound { .. }
            | OfferingError::UpdateOptionGroupTierPricingNotFound { .. } => {
                Self::not_found(kind, message)
            }
            OfferingError::DuplicateRequirementId { .. }
            | OfferingError::RequirementTitleRequired { .. }
            | OfferingError::DuplicateOptionGroupId { .. }
            | OfferingError::DuplicateOptionGroupTierPricingId { .. }
            | OfferingError::TierPricingFieldRequired { .. } => Self::invariant(kind, message),
        }
    }
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

pub fn add_requirement(
    state: &mut OfferingState,
    input: AddRequirementInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    if state.requirements.iter().any(|r| r.id == input.id) {
        return Err(OfferingError::DuplicateRequirementId { id: input.id }.into());
    }
    state.requirements.push(Requirement {
        id: input.id,
        title: input.title,
        description: input.description,
    });
    Ok(())
}

pub fn update_requirement(
    state: &mut OfferingState,
    input: UpdateRequirementInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    let Some(requirement) = state.requirements.iter_mut().find(|r| r.id == input.id) else {
        return Err(OfferingError::UpdateRequirementNotFound { id: input.id }.into());
    };
    match input.title {
        Update::Absent => {}
        Update::Clear => {
            return Err(OfferingError::RequirementTitleRequired { id: input.id }.into());
        }
        Update::Set(title) => requirement.title = title,
    }
    input.description.apply_to(&mut requirement.description);
    Ok(())
}

pub fn add_option_group(
    state: &mut OfferingState,
    input: AddOptionGroupInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    if state.option_groups.iter().any(|g| g.id == input.id) {
        return Err(OfferingError::DuplicateOptionGroupId { id: input.id }.into());
    }
    state.option_groups.push(OptionGroup {
        id: input.id,
        name: input.name,
        tier_pricing: Vec::new(),
    });
    Ok(())
}

pub fn add_tier_pricing(
    state: &mut OfferingState,
    input: AddTierPricingInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    let Some(group) = state
        .option_groups
        .iter_mut()
        .find(|g| g.id == input.option_group_id)
    else {
        return Err(OfferingError::AddOptionGroupTierPricingGroupNotFound {
            id: input.option_group_id,
        }
        .into());
    };
    if group.tier_pricing.iter().any(|t| t.id == input.tier_pricing_id) {
        return Err(OfferingError::DuplicateOptionGroupTierPricingId {
            id: input.tier_pricing_id,
        }
        .into());
    }
    group.tier_pricing.push(TierPricing {
        id: input.tier_pricing_id,
        tier_id: input.tier_id,
        unit_price_cents: input.unit_price_cents,
    });
    Ok(())
}

pub fn update_tier_pricing(
    state: &mut OfferingState,
    input: UpdateTierPricingInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    // The group and the entry within it are distinct rejection sites.
    let Some(group) = state
        .option_groups
        .iter_mut()
        .find(|g| g.id == input.option_group_id)
    else {
        return Err(OfferingError::UpdateOptionGroupTierPricingGroupNotFound {
            id: input.option_group_id,
        }
        .into());
    };
    let Some(entry) = group
        .tier_pricing
        .iter_mut()
        .find(|t| t.id == input.tier_pricing_id)
    else {
        return Err(OfferingError::UpdateOptionGroupTierPricingNotFound {
            id: input.tier_pricing_id,
        }
        .into());
    };
    match input.tier_id {
        Update::Absent => {}
        Update::Clear => {
            return Err(OfferingError::TierPricingFieldRequired {
                id: input.tier_pricing_id,
                field: "tier",
            }
            .into());
        }
        Update::Set(tier_id) => entry.tier_id = tier_id,
    }
    match input.unit_price_cents {
        Update::Absent => {}
        Update::Clear => {
            return Err(OfferingError::TierPricingFieldRequired {
                id: input.tier_pricing_id,
                field: "unit price",
            }
            .into());
        }
        Update::Set(price) => entry.unit_price_cents = price,
    }
    Ok(())
}

pub fn set_draft_note(
    state: &mut OfferingLocalState,
    input: SetDraftNoteInput,
    _emitter: &mut Emitter,
) -> Result<(), DomainError> {
    state.draft_note = input.text;
    Ok(())
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the offering document type and all of its reducers.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_document_type::<OfferingState, OfferingLocalState>(OFFERING_DOCUMENT_TYPE)?;
    registry.register_action::<OfferingState, AddRequirementInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Global,
        ADD_REQUIREMENT,
        add_requirement,
    )?;
    registry.register_action::<OfferingState, UpdateRequirementInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Global,
        UPDATE_REQUIREMENT,
        update_requirement,
    )?;
    registry.register_action::<OfferingState, AddOptionGroupInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Global,
        ADD_OPTION_GROUP,
        add_option_group,
    )?;
    registry.register_action::<OfferingState, AddTierPricingInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Global,
        ADD_OPTION_GROUP_TIER_PRICING,
        add_tier_pricing,
    )?;
    registry.register_action::<OfferingState, UpdateTierPricingInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Global,
        UPDATE_OPTION_GROUP_TIER_PRICING,
        update_tier_pricing,
    )?;
    registry.register_action::<OfferingLocalState, SetDraftNoteInput, _>(
        OFFERING_DOCUMENT_TYPE,
        Scope::Local,
        SET_DRAFT_NOTE,
        set_draft_note,
    )?;
    Ok(())
}

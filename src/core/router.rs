//! Intent routing: from the conversational flow's advisory `action` field to a
//! typed intent, and from a resolved intent to the panel the client renders.

use crate::core::equipment::{Equipment, EquipmentStatus, MaintenanceEvent, Sensor};
use crate::core::error::ResolveError;
use crate::core::schemas::{ActionKind, ConversationalResponseOutput, DiagnosticsOutput};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use uuid::Uuid;

pub const DRONE_WORK_ORDER: &str = "78345";
pub const DRONE_STATUS: &str = "En route to warehouse";
pub const DRONE_ETA: &str = "12 minutes";

pub const BAG_SECTOR: &str = "Sector 7";
pub const BAG_LANDMARK: &str = "near the main assembly line";

pub const FIND_BAG_PROMPT: &str =
    "I can help with that. Please enter the ID of the bag you are looking for in the dialog.";
pub const EXPLANATION_PENDING: &str = "Generating explanation...";

/// An equipment reference as named by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRef {
    pub id: String,
    pub name: String,
}

/// A classified user intent, carrying exactly what its side effect needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionIntent {
    None,
    Status(Option<EquipmentRef>),
    Report(Option<EquipmentRef>),
    Diagnostics(Option<EquipmentRef>),
    Insights(Option<EquipmentRef>),
    Order,
    Drone,
    FindBag,
    Explanation { topic: String },
}

impl ActionIntent {
    pub fn from_output(output: &ConversationalResponseOutput) -> Self {
        let target = output.target_equipment.as_ref().map(|snapshot| EquipmentRef {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
        });

        match output.action.unwrap_or(ActionKind::None) {
            ActionKind::None => ActionIntent::None,
            ActionKind::Status => ActionIntent::Status(target),
            ActionKind::Report => ActionIntent::Report(target),
            ActionKind::Diagnostics => ActionIntent::Diagnostics(target),
            ActionKind::Insights => ActionIntent::Insights(target),
            ActionKind::Order => ActionIntent::Order,
            ActionKind::Drone => ActionIntent::Drone,
            ActionKind::FindBag => ActionIntent::FindBag,
            ActionKind::Explanation => match output.action_topic.as_deref().map(str::trim) {
                Some(topic) if !topic.is_empty() => ActionIntent::Explanation {
                    topic: topic.to_owned(),
                },
                _ => {
                    warn!("explanation intent without a topic, ignoring");
                    ActionIntent::None
                }
            },
        }
    }

    pub fn target(&self) -> Option<&EquipmentRef> {
        match self {
            ActionIntent::Status(target)
            | ActionIntent::Report(target)
            | ActionIntent::Diagnostics(target)
            | ActionIntent::Insights(target) => target.as_ref(),
            _ => None,
        }
    }

    /// Whether the side effect operates on a specific piece of equipment.
    pub fn needs_equipment(&self) -> bool {
        matches!(
            self,
            ActionIntent::Status(_)
                | ActionIntent::Report(_)
                | ActionIntent::Diagnostics(_)
                | ActionIntent::Insights(_)
        )
    }
}

/// Looks `reference` up by id first, then by case-insensitive name.
pub fn resolve<'a>(
    reference: &EquipmentRef,
    fleet: &'a [Equipment],
) -> Result<&'a Equipment, ResolveError> {
    fleet
        .iter()
        .find(|equipment| equipment.matches(&reference.id))
        .or_else(|| fleet.iter().find(|equipment| equipment.matches(&reference.name)))
        .ok_or_else(|| ResolveError::EquipmentNotResolved(reference.id.clone()))
}

/// Resolves `reference`, falling back to the previously selected equipment
/// when it is absent or unknown.
pub fn resolve_or_previous<'a>(
    reference: Option<&EquipmentRef>,
    fleet: &'a [Equipment],
    previous: Option<&str>,
) -> Option<&'a Equipment> {
    let previous = || previous.and_then(|id| fleet.iter().find(|equipment| equipment.id == id));

    match reference {
        Some(reference) => resolve(reference, fleet).ok().or_else(|| {
            warn!(
                "{}, falling back to previous selection {:?}",
                ResolveError::EquipmentNotResolved(reference.id.clone()),
                previous().map(|equipment| &equipment.id)
            );
            previous()
        }),
        None => previous(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedPart {
    pub name: String,
    pub part_number: String,
    pub quantity: u32,
}

impl Default for RecommendedPart {
    fn default() -> Self {
        RecommendedPart {
            name: "Spindle Motor Bearing".to_owned(),
            part_number: "SKF-6205-2RS".to_owned(),
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneDispatch {
    pub work_order: String,
    pub status: String,
    pub eta: String,
}

impl Default for DroneDispatch {
    fn default() -> Self {
        DroneDispatch {
            work_order: DRONE_WORK_ORDER.to_owned(),
            status: DRONE_STATUS.to_owned(),
            eta: DRONE_ETA.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BagLocation {
    pub bag_id: String,
    pub sector: String,
    pub landmark: String,
    pub message: String,
}

impl BagLocation {
    pub fn located(bag_id: &str) -> Self {
        BagLocation {
            bag_id: bag_id.to_owned(),
            sector: BAG_SECTOR.to_owned(),
            landmark: BAG_LANDMARK.to_owned(),
            message: format!("We've located bag {bag_id} in {BAG_SECTOR}, {BAG_LANDMARK}."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmergencyStatus {
    Dispatching,
    #[serde(rename = "En Route")]
    EnRoute,
}

/// An emergency drone sent to the user's location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyOrder {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: EmergencyStatus,
}

impl EmergencyOrder {
    /// A new `ED-<n>` order, still dispatching.
    pub fn dispatch() -> Self {
        EmergencyOrder {
            id: format!("ED-{}", Uuid::new_v4().as_u128() % 10_000),
            created_at: Utc::now(),
            status: EmergencyStatus::Dispatching,
        }
    }
}

/// What the client renders next to the conversation after a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Panel {
    #[serde(rename_all = "camelCase")]
    Status {
        equipment_id: String,
        equipment_name: String,
        status: EquipmentStatus,
        sensors: Vec<Sensor>,
    },
    #[serde(rename_all = "camelCase")]
    NoLiveData {
        equipment_id: String,
        equipment_name: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    MaintenanceLog {
        equipment_id: String,
        equipment_name: String,
        entries: Vec<MaintenanceEvent>,
    },
    #[serde(rename_all = "camelCase")]
    Diagnostics {
        equipment_id: String,
        report: DiagnosticsOutput,
    },
    #[serde(rename_all = "camelCase")]
    Insights {
        equipment_id: String,
        insights: String,
    },
    OrderPrompt {
        part: RecommendedPart,
    },
    DroneDispatch {
        dispatch: DroneDispatch,
    },
    FindBagDialog,
}

impl Panel {
    pub fn status(equipment: &Equipment) -> Self {
        if equipment.sensors.is_empty() {
            return Panel::NoLiveData {
                equipment_id: equipment.id.clone(),
                equipment_name: equipment.name.clone(),
                message: format!("No live sensor data is available for {}.", equipment.name),
            };
        }

        Panel::Status {
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            status: equipment.status,
            sensors: equipment.sensors.clone(),
        }
    }

    pub fn maintenance_log(equipment: &Equipment) -> Self {
        Panel::MaintenanceLog {
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            entries: equipment.maintenance_log.clone(),
        }
    }
}

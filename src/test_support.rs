//! Test doubles for the generative model and the equipment store.

use crate::core::equipment::{
    Equipment, EquipmentStatus, MaintenanceEvent, MaintenanceStatus, Sensor, SensorReading,
};
use crate::core::error::{FlowError, StoreError};
use crate::core::model::{GenerateRequest, GenerateResponse, Part};
use crate::core::traits::GenerativeModel;
use crate::infrastructure::traits::EquipmentRepository;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A model answering from a script.
///
/// Routed responses are matched against the prompt text and may be reused.
/// Everything else pops the queue in order; an exhausted queue fails the call.
#[derive(Default)]
pub struct ScriptedModel {
    queue: Mutex<VecDeque<Result<GenerateResponse, String>>>,
    routes: Vec<(String, GenerateResponse)>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, response: GenerateResponse) -> Self {
        self.queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.then(GenerateResponse {
            parts: vec![Part::Text(text.into())],
        })
    }

    pub fn then_json(self, json: Value) -> Self {
        self.then_text(&json.to_string())
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.queue.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn route(mut self, needle: &str, response: GenerateResponse) -> Self {
        self.routes.push((needle.into(), response));
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn prompt_text(request: &GenerateRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|content| &content.parts)
        .filter_map(|part| match part {
            Part::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, FlowError> {
        let prompt = prompt_text(&request);
        self.requests.lock().unwrap().push(request);

        if let Some((_, response)) = self.routes.iter().find(|(needle, _)| prompt.contains(needle))
        {
            return Ok(response.clone());
        }

        match self.queue.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(FlowError::upstream(message)),
            None => Err(FlowError::upstream("script exhausted")),
        }
    }
}

fn sensor(name: &str, unit: &str, values: &[f64]) -> Sensor {
    Sensor {
        name: name.into(),
        value: values.last().copied().unwrap_or_default(),
        unit: unit.into(),
        history: values
            .iter()
            .enumerate()
            .map(|(hour, value)| SensorReading {
                time: format!("{:02}:00", 8 + hour),
                value: *value,
            })
            .collect(),
    }
}

/// The three-machine demo fleet.
pub fn demo_fleet() -> Vec<Equipment> {
    vec![
        Equipment {
            id: "cnc-001".into(),
            name: "CNC Mill 3-Axis".into(),
            kind: "Machining".into(),
            status: EquipmentStatus::Operational,
            sensors: vec![
                sensor("Temperature", "°C", &[70.0, 72.5, 75.0]),
                sensor("Vibration", "mm/s", &[1.1, 1.2, 1.2]),
            ],
            maintenance_log: vec![
                MaintenanceEvent {
                    id: "m-102".into(),
                    date: "2024-05-20".into(),
                    description: "Spindle bearing inspection".into(),
                    status: MaintenanceStatus::Scheduled,
                },
                MaintenanceEvent {
                    id: "m-101".into(),
                    date: "2024-04-02".into(),
                    description: "Coolant flush".into(),
                    status: MaintenanceStatus::Completed,
                },
            ],
        },
        Equipment {
            id: "conv-002".into(),
            name: "Main Conveyor Belt".into(),
            kind: "Material Handling".into(),
            status: EquipmentStatus::Warning,
            sensors: vec![sensor("Speed", "m/s", &[1.5, 1.4, 1.3])],
            maintenance_log: vec![MaintenanceEvent {
                id: "m-201".into(),
                date: "2024-05-11".into(),
                description: "Belt tension adjustment".into(),
                status: MaintenanceStatus::InProgress,
            }],
        },
        Equipment {
            id: "pump-003".into(),
            name: "Coolant Pump".into(),
            kind: "Fluid System".into(),
            status: EquipmentStatus::Offline,
            sensors: vec![sensor("Pressure", "psi", &[12.0, 9.5, 0.0])],
            maintenance_log: vec![],
        },
    ]
}

/// In-memory equipment store. Every read fails once `unavailable` is set.
pub struct FakeEquipmentRepository {
    pub fleet: Vec<Equipment>,
    pub unavailable: AtomicBool,
}

impl FakeEquipmentRepository {
    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Default for FakeEquipmentRepository {
    fn default() -> Self {
        FakeEquipmentRepository {
            fleet: demo_fleet(),
            unavailable: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EquipmentRepository for FakeEquipmentRepository {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StoreError> {
        self.check()?;
        Ok(self.fleet.clone())
    }

    async fn find_equipment(&self, id: &str) -> Result<Option<Equipment>, StoreError> {
        self.check()?;
        Ok(self.fleet.iter().find(|e| e.id == id).cloned())
    }
}

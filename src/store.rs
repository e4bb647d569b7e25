use crate::error::EngrossError;
use crate::template::{ContractKind, ContractTemplate, default_template};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

pub const TEMPLATES_KEY: &str = "contract_templates";

/// Injected persistence boundary. The browser shell adapts its key-value
/// storage to this; tests and demos use [`MemoryStorage`]. The core never
/// reaches for ambient global state.
pub trait StoragePort {
    fn read(&self, key: &str) -> Result<Option<String>, EngrossError>;
    fn write(&self, key: &str, value: &str) -> Result<(), EngrossError>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, EngrossError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngrossError::Storage("storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), EngrossError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngrossError::Storage("storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

type ObserverFn = Arc<dyn Fn() + Send + Sync>;
type ObserverRegistry = Mutex<Vec<(u64, ObserverFn)>>;

/// Deregisters its observer when dropped.
pub struct Subscription {
    registry: Weak<ObserverRegistry>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade()
            && let Ok(mut observers) = registry.lock()
        {
            observers.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Payload-free change notification shared by the stores: observers reload
/// whatever they render from.
pub(crate) struct Observers {
    registry: Arc<ObserverRegistry>,
    next_id: Mutex<u64>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Vec::new())),
            next_id: Mutex::new(0),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        if let Ok(mut observers) = self.registry.lock() {
            observers.push((id, Arc::new(callback)));
        }
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    pub(crate) fn notify(&self) {
        let snapshot: Vec<ObserverFn> = match self.registry.lock() {
            Ok(observers) => observers.iter().map(|(_, f)| f.clone()).collect(),
            Err(_) => return,
        };
        for observer in snapshot {
            observer();
        }
    }
}

pub struct TemplateStore {
    storage: Box<dyn StoragePort>,
    observers: Observers,
}

impl TemplateStore {
    pub fn new(storage: Box<dyn StoragePort>) -> Self {
        Self {
            storage,
            observers: Observers::new(),
        }
    }

    /// Fired after every save/reset.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    fn notify(&self) {
        self.observers.notify();
    }

    /// All stored templates. Missing or corrupt data regenerates the two
    /// built-in defaults rather than failing hard; the regenerated set is
    /// not persisted until the next mutation.
    pub fn get_all(&self) -> Vec<ContractTemplate> {
        let raw = match self.storage.read(TEMPLATES_KEY) {
            Ok(Some(raw)) => raw,
            _ => return ContractKind::ALL.map(default_template).to_vec(),
        };
        match serde_json::from_str::<Vec<ContractTemplate>>(&raw) {
            Ok(templates) => templates,
            Err(_) => ContractKind::ALL.map(default_template).to_vec(),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<ContractTemplate> {
        self.get_all().into_iter().find(|t| t.id == id)
    }

    /// The stored template for `kind`, or a synthesized default when none
    /// is stored. The synthesized default is not persisted.
    pub fn get_active(&self, kind: ContractKind) -> ContractTemplate {
        self.get_all()
            .into_iter()
            .find(|t| t.kind == kind)
            .unwrap_or_else(|| default_template(kind))
    }

    /// Upserts, matching first on id and then on kind. When an existing
    /// record matches, its id is kept even if the incoming template carries
    /// a different one, so a kind never accumulates duplicates.
    pub fn save(&self, template: &ContractTemplate) -> Result<(), EngrossError> {
        let mut templates = self.get_all();
        let now = Utc::now();
        let mut record = template.clone();
        record.updated_at = now;

        let index = templates
            .iter()
            .position(|t| t.id == template.id || t.kind == template.kind);
        match index {
            Some(index) => {
                record.id = templates[index].id.clone();
                record.created_at = templates[index].created_at;
                templates[index] = record;
            }
            None => {
                templates.push(record);
            }
        }

        self.persist(&templates)?;
        self.notify();
        Ok(())
    }

    /// Discards the stored template for `kind` and reseeds the built-in
    /// default.
    pub fn reset(&self, kind: ContractKind) -> Result<ContractTemplate, EngrossError> {
        let mut templates = self.get_all();
        templates.retain(|t| t.kind != kind);
        let seeded = default_template(kind);
        templates.push(seeded.clone());
        self.persist(&templates)?;
        self.notify();
        Ok(seeded)
    }

    pub fn delete(&self, id: &str) -> Result<(), EngrossError> {
        let mut templates = self.get_all();
        templates.retain(|t| t.id != id);
        self.persist(&templates)
    }

    fn persist(&self, templates: &[ContractTemplate]) -> Result<(), EngrossError> {
        let raw = serde_json::to_string(templates)
            .map_err(|err| EngrossError::Storage(format!("serialize templates: {}", err)))?;
        self.storage.write(TEMPLATES_KEY, &raw)
    }
}

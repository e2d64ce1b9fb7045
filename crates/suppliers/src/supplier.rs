use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_core::{Aggregate, AggregateRoot, DomainError, typed_id};
use invenhub_events::Event;

typed_id!(
    /// Supplier identifier.
    SupplierId
);

/// Supplier status lifecycle.
///
/// `Removed` is terminal: the supplier disappears from listings and every
/// further command reports not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Inactive,
    Removed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Aggregate root: Supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    contact: ContactInfo,
    contact_person: Option<String>,
    lead_time_days: u32,
    status: SupplierStatus,
    version: u64,
    created: bool,
}

impl Supplier {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SupplierId) -> Self {
        Self {
            id,
            name: String::new(),
            contact: ContactInfo::default(),
            contact_person: None,
            lead_time_days: 0,
            status: SupplierStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn contact_person(&self) -> Option<&str> {
        self.contact_person.as_deref()
    }

    pub fn lead_time_days(&self) -> u32 {
        self.lead_time_days
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    /// Only active suppliers receive new purchase orders.
    pub fn can_receive_orders(&self) -> bool {
        self.created && self.status == SupplierStatus::Active
    }
}

impl AggregateRoot for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub contact_person: Option<String>,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateSupplier (full replacement of the editable details).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSupplier {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub contact_person: Option<String>,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateSupplier {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateSupplier {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSupplier {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierCommand {
    Register(RegisterSupplier),
    Update(UpdateSupplier),
    Deactivate(DeactivateSupplier),
    Reactivate(ReactivateSupplier),
    Remove(RemoveSupplier),
}

/// Event: SupplierRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRegistered {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub contact_person: Option<String>,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierUpdated {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub contact_person: Option<String>,
    pub lead_time_days: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierStatusChanged {
    pub supplier_id: SupplierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierEvent {
    Registered(SupplierRegistered),
    Updated(SupplierUpdated),
    Deactivated(SupplierStatusChanged),
    Reactivated(SupplierStatusChanged),
    Removed(SupplierStatusChanged),
}

impl Event for SupplierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierEvent::Registered(_) => "suppliers.supplier.registered",
            SupplierEvent::Updated(_) => "suppliers.supplier.updated",
            SupplierEvent::Deactivated(_) => "suppliers.supplier.deactivated",
            SupplierEvent::Reactivated(_) => "suppliers.supplier.reactivated",
            SupplierEvent::Removed(_) => "suppliers.supplier.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierEvent::Registered(e) => e.occurred_at,
            SupplierEvent::Updated(e) => e.occurred_at,
            SupplierEvent::Deactivated(e)
            | SupplierEvent::Reactivated(e)
            | SupplierEvent::Removed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Supplier {
    type Command = SupplierCommand;
    type Event = SupplierEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierEvent::Registered(e) => {
                self.id = e.supplier_id;
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.contact_person = e.contact_person.clone();
                self.lead_time_days = e.lead_time_days;
                self.status = SupplierStatus::Active;
                self.created = true;
            }
            SupplierEvent::Updated(e) => {
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.contact_person = e.contact_person.clone();
                self.lead_time_days = e.lead_time_days;
            }
            SupplierEvent::Deactivated(_) => self.status = SupplierStatus::Inactive,
            SupplierEvent::Reactivated(_) => self.status = SupplierStatus::Active,
            SupplierEvent::Removed(_) => self.status = SupplierStatus::Removed,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierCommand::Register(cmd) => self.handle_register(cmd),
            SupplierCommand::Update(cmd) => self.handle_update(cmd),
            SupplierCommand::Deactivate(cmd) => {
                self.ensure_live(cmd.supplier_id)?;
                if self.status == SupplierStatus::Inactive {
                    return Err(DomainError::conflict("supplier is already inactive"));
                }
                Ok(vec![SupplierEvent::Deactivated(SupplierStatusChanged {
                    supplier_id: cmd.supplier_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            SupplierCommand::Reactivate(cmd) => {
                self.ensure_live(cmd.supplier_id)?;
                if self.status == SupplierStatus::Active {
                    return Err(DomainError::conflict("supplier is already active"));
                }
                Ok(vec![SupplierEvent::Reactivated(SupplierStatusChanged {
                    supplier_id: cmd.supplier_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            SupplierCommand::Remove(cmd) => {
                self.ensure_live(cmd.supplier_id)?;
                Ok(vec![SupplierEvent::Removed(SupplierStatusChanged {
                    supplier_id: cmd.supplier_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Supplier {
    /// Exists, matches the id and has not been removed.
    fn ensure_live(&self, supplier_id: SupplierId) -> Result<(), DomainError> {
        if !self.created || self.status == SupplierStatus::Removed {
            return Err(DomainError::not_found());
        }
        if self.id != supplier_id {
            return Err(DomainError::invariant("supplier_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("supplier already exists"));
        }
        validate_details(&cmd.name, &cmd.contact)?;

        Ok(vec![SupplierEvent::Registered(SupplierRegistered {
            supplier_id: cmd.supplier_id,
            name: cmd.name.trim().to_string(),
            contact: cmd.contact.clone(),
            contact_person: cmd.contact_person.clone(),
            lead_time_days: cmd.lead_time_days,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        self.ensure_live(cmd.supplier_id)?;
        validate_details(&cmd.name, &cmd.contact)?;

        Ok(vec![SupplierEvent::Updated(SupplierUpdated {
            supplier_id: cmd.supplier_id,
            name: cmd.name.trim().to_string(),
            contact: cmd.contact.clone(),
            contact_person: cmd.contact_person.clone(),
            lead_time_days: cmd.lead_time_days,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn validate_details(name: &str, contact: &ContactInfo) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if let Some(email) = &contact.email {
        if !email.contains('@') {
            return Err(DomainError::validation("contact email is invalid"));
        }
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventrent_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use eventrent_events::Event;

/// Client identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub AggregateId);

impl ClientId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Contact details of a client that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: String,
}

/// Partial update of contact details; `None` keeps the current value.
///
/// `company: Some(None)` clears the company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<Option<String>>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Aggregate root: Client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    id: ClientId,
    first_name: String,
    last_name: String,
    company: Option<String>,
    email: String,
    phone: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl Client {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: ClientId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            company: None,
            email: String::new(),
            phone: String::new(),
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ClientId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// "First Last", the form bookings denormalise.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }

    /// Case-insensitive email comparison used for duplicate detection.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

impl AggregateRoot for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterClient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterClient {
    pub client_id: ClientId,
    pub details: NewClient,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateClientDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClientDetails {
    pub client_id: ClientId,
    pub patch: ClientPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientCommand {
    RegisterClient(RegisterClient),
    UpdateClientDetails(UpdateClientDetails),
}

/// Event: ClientRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistered {
    pub client_id: ClientId,
    pub details: NewClient,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ClientDetailsUpdated. Carries the full resulting contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetailsUpdated {
    pub client_id: ClientId,
    pub details: NewClient,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    ClientRegistered(ClientRegistered),
    ClientDetailsUpdated(ClientDetailsUpdated),
}

impl Event for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::ClientRegistered(_) => "clients.client.registered",
            ClientEvent::ClientDetailsUpdated(_) => "clients.client.details_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ClientEvent::ClientRegistered(e) => e.occurred_at,
            ClientEvent::ClientDetailsUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Client {
    type Command = ClientCommand;
    type Event = ClientEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ClientEvent::ClientRegistered(e) => {
                self.id = e.client_id;
                self.set_details(&e.details);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            ClientEvent::ClientDetailsUpdated(e) => {
                self.set_details(&e.details);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ClientCommand::RegisterClient(cmd) => self.handle_register(cmd),
            ClientCommand::UpdateClientDetails(cmd) => self.handle_update(cmd),
        }
    }
}

impl Client {
    fn set_details(&mut self, details: &NewClient) {
        self.first_name = details.first_name.clone();
        self.last_name = details.last_name.clone();
        self.company = details.company.clone();
        self.email = details.email.clone();
        self.phone = details.phone.clone();
    }

    fn details(&self) -> NewClient {
        NewClient {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    fn ensure_client_id(&self, client_id: ClientId) -> Result<(), DomainError> {
        if self.id != client_id {
            return Err(DomainError::invalid_state("client_id mismatch"));
        }
        Ok(())
    }

    fn validate(details: &NewClient) -> Result<(), DomainError> {
        if details.first_name.trim().is_empty() || details.last_name.trim().is_empty() {
            return Err(DomainError::validation("first and last name are required"));
        }
        if !details.email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterClient) -> Result<Vec<ClientEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invalid_state("client already exists"));
        }
        Self::validate(&cmd.details)?;

        Ok(vec![ClientEvent::ClientRegistered(ClientRegistered {
            client_id: cmd.client_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateClientDetails) -> Result<Vec<ClientEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_client_id(cmd.client_id)?;

        let mut details = self.details();
        let patch = &cmd.patch;
        if let Some(v) = &patch.first_name {
            details.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            details.last_name = v.clone();
        }
        if let Some(v) = &patch.company {
            details.company = v.clone();
        }
        if let Some(v) = &patch.email {
            details.email = v.clone();
        }
        if let Some(v) = &patch.phone {
            details.phone = v.clone();
        }
        Self::validate(&details)?;

        Ok(vec![ClientEvent::ClientDetailsUpdated(ClientDetailsUpdated {
            client_id: cmd.client_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }
}

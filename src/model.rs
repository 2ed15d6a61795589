use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::record::{DonationRecord, HelpDocument, ProfileRecord, ReportRecord, SubscriberRecord};

pub const USERS_COLLECTION: &str = "users";
pub const NGOS_COLLECTION: &str = "ngos";
pub const ADMINS_COLLECTION: &str = "admins";
pub const REPORTS_COLLECTION: &str = "reports";
pub const HELP_COLLECTION: &str = "help";
pub const DONATIONS_COLLECTION: &str = "donations";
pub const SUBSCRIBERS_COLLECTION: &str = "subscribers";

pub const ANONYMOUS_DONOR: &str = "anonymous";

/// A Firestore document that carries its own document id.
///
/// `Record` is the shape written to Firestore; `Self` is what handlers see and return.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Record: Serialize
        + DeserializeOwned
        + for<'a> From<&'a Self>
        + Into<Self>
        + Unpin
        + Send
        + Sync
        + 'static;

    fn id(&self) -> &str;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ngo,
    Admin,
}

impl Role {
    /// Lookup order when a single role has to be chosen for an identity.
    pub const PRECEDENCE: [Role; 3] = [Role::Admin, Role::Ngo, Role::User];

    pub fn collection(self) -> &'static str {
        match self {
            Role::User => USERS_COLLECTION,
            Role::Ngo => NGOS_COLLECTION,
            Role::Admin => ADMINS_COLLECTION,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ngo => "ngo",
            Role::Admin => "admin",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub uid: String,
    pub role: Role,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,

    /// NGOs only.
    pub address: Option<String>,
    /// Users and admins only.
    pub gender: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub created: DateTime<Utc>,
}

impl Document for Profile {
    type Record = ProfileRecord;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Complete,
}

/// Snapshot of the NGO that handled a report, embedded in the report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NgoSummary {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub contact: String,
}

impl From<&Profile> for NgoSummary {
    fn from(ngo: &Profile) -> Self {
        NgoSummary {
            id: ngo.uid.clone(),
            name: ngo.name.clone(),
            address: ngo.address.clone(),
            contact: ngo.contact.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub informant: String,
    pub contact: String,
    pub location_description: String,
    pub description: String,
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub timestamp: DateTime<Utc>,

    pub status: ReportStatus,
    pub ngo: Option<NgoSummary>,
    pub reporter_uid: Option<String>,
}

impl Document for Report {
    type Record = ReportRecord;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HelpRecord {
    pub id: String,
    pub report_id: String,
    pub ngo_id: String,
    pub ngo_name: String,
    pub ngo_address: Option<String>,
    pub description_of_help: String,

    /// Contact of the person who filed the report; the link back to their profile.
    pub reported_by_contact: String,
    pub reported_by_name: String,
    pub report_location: String,

    pub timestamp: DateTime<Utc>,
}

impl Document for HelpRecord {
    type Record = HelpDocument;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Donation {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,

    /// As entered; parsed only for validation and totals.
    pub amount: String,
    pub payment_method: String,

    /// Donor uid or [`ANONYMOUS_DONOR`].
    pub user_id: String,

    pub timestamp: DateTime<Utc>,

    pub status: DonationStatus,
    pub payment_id: Option<String>,
}

impl Document for Donation {
    type Record = DonationRecord;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: String,
    pub email: String,

    pub timestamp: DateTime<Utc>,
}

impl Document for Subscriber {
    type Record = SubscriberRecord;

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

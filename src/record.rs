//! Firestore document shapes.
//!
//! Timestamps are stored as native Firestore timestamps. The `model` types
//! carry plain `DateTime<Utc>` so they serialize to RFC 3339 in responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Donation, DonationStatus, HelpRecord, NgoSummary, Profile, Report, ReportStatus, Role,
    Subscriber,
};

#[derive(Serialize, Deserialize)]
pub struct ProfileRecord {
    id: String,
    uid: String,
    role: Role,
    name: String,
    contact: String,
    email: String,
    avatar_url: Option<String>,
    banner_url: Option<String>,
    address: Option<String>,
    gender: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(with = "firestore_serde_timestamp::timestamp")]
    created: DateTime<Utc>,
}

impl From<&Profile> for ProfileRecord {
    fn from(profile: &Profile) -> Self {
        let profile = profile.clone();
        ProfileRecord {
            id: profile.id,
            uid: profile.uid,
            role: profile.role,
            name: profile.name,
            contact: profile.contact,
            email: profile.email,
            avatar_url: profile.avatar_url,
            banner_url: profile.banner_url,
            address: profile.address,
            gender: profile.gender,
            latitude: profile.latitude,
            longitude: profile.longitude,
            created: profile.created,
        }
    }
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        Profile {
            id: record.id,
            uid: record.uid,
            role: record.role,
            name: record.name,
            contact: record.contact,
            email: record.email,
            avatar_url: record.avatar_url,
            banner_url: record.banner_url,
            address: record.address,
            gender: record.gender,
            latitude: record.latitude,
            longitude: record.longitude,
            created: record.created,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ReportRecord {
    id: String,
    informant: String,
    contact: String,
    location_description: String,
    description: String,
    image_url: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(with = "firestore_serde_timestamp::timestamp")]
    timestamp: DateTime<Utc>,
    status: ReportStatus,
    ngo: Option<NgoSummary>,
    reporter_uid: Option<String>,
}

impl From<&Report> for ReportRecord {
    fn from(report: &Report) -> Self {
        let report = report.clone();
        ReportRecord {
            id: report.id,
            informant: report.informant,
            contact: report.contact,
            location_description: report.location_description,
            description: report.description,
            image_url: report.image_url,
            latitude: report.latitude,
            longitude: report.longitude,
            timestamp: report.timestamp,
            status: report.status,
            ngo: report.ngo,
            reporter_uid: report.reporter_uid,
        }
    }
}

impl From<ReportRecord> for Report {
    fn from(record: ReportRecord) -> Self {
        Report {
            id: record.id,
            informant: record.informant,
            contact: record.contact,
            location_description: record.location_description,
            description: record.description,
            image_url: record.image_url,
            latitude: record.latitude,
            longitude: record.longitude,
            timestamp: record.timestamp,
            status: record.status,
            ngo: record.ngo,
            reporter_uid: record.reporter_uid,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct HelpDocument {
    id: String,
    report_id: String,
    ngo_id: String,
    ngo_name: String,
    ngo_address: Option<String>,
    description_of_help: String,
    reported_by_contact: String,
    reported_by_name: String,
    report_location: String,
    #[serde(with = "firestore_serde_timestamp::timestamp")]
    timestamp: DateTime<Utc>,
}

impl From<&HelpRecord> for HelpDocument {
    fn from(help: &HelpRecord) -> Self {
        let help = help.clone();
        HelpDocument {
            id: help.id,
            report_id: help.report_id,
            ngo_id: help.ngo_id,
            ngo_name: help.ngo_name,
            ngo_address: help.ngo_address,
            description_of_help: help.description_of_help,
            reported_by_contact: help.reported_by_contact,
            reported_by_name: help.reported_by_name,
            report_location: help.report_location,
            timestamp: help.timestamp,
        }
    }
}

impl From<HelpDocument> for HelpRecord {
    fn from(doc: HelpDocument) -> Self {
        HelpRecord {
            id: doc.id,
            report_id: doc.report_id,
            ngo_id: doc.ngo_id,
            ngo_name: doc.ngo_name,
            ngo_address: doc.ngo_address,
            description_of_help: doc.description_of_help,
            reported_by_contact: doc.reported_by_contact,
            reported_by_name: doc.reported_by_name,
            report_location: doc.report_location,
            timestamp: doc.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct DonationRecord {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    amount: String,
    payment_method: String,
    user_id: String,
    #[serde(with = "firestore_serde_timestamp::timestamp")]
    timestamp: DateTime<Utc>,
    status: DonationStatus,
    payment_id: Option<String>,
}

impl From<&Donation> for DonationRecord {
    fn from(donation: &Donation) -> Self {
        let donation = donation.clone();
        DonationRecord {
            id: donation.id,
            name: donation.name,
            email: donation.email,
            phone: donation.phone,
            address: donation.address,
            amount: donation.amount,
            payment_method: donation.payment_method,
            user_id: donation.user_id,
            timestamp: donation.timestamp,
            status: donation.status,
            payment_id: donation.payment_id,
        }
    }
}

impl From<DonationRecord> for Donation {
    fn from(record: DonationRecord) -> Self {
        Donation {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
            address: record.address,
            amount: record.amount,
            payment_method: record.payment_method,
            user_id: record.user_id,
            timestamp: record.timestamp,
            status: record.status,
            payment_id: record.payment_id,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SubscriberRecord {
    id: String,
    email: String,
    #[serde(with = "firestore_serde_timestamp::timestamp")]
    timestamp: DateTime<Utc>,
}

impl From<&Subscriber> for SubscriberRecord {
    fn from(subscriber: &Subscriber) -> Self {
        SubscriberRecord {
            id: subscriber.id.clone(),
            email: subscriber.email.clone(),
            timestamp: subscriber.timestamp,
        }
    }
}

impl From<SubscriberRecord> for Subscriber {
    fn from(record: SubscriberRecord) -> Self {
        Subscriber {
            id: record.id,
            email: record.email,
            timestamp: record.timestamp,
        }
    }
}

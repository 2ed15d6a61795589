use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{fs::read_to_string, path::PathBuf};
use tracing::Instrument;

use crate::{
    database::{DocumentCollection, RescueDatabase},
    model::{
        Document, Donation, DonationStatus, HelpRecord, NgoSummary, Profile, Report,
        ReportStatus, Role, Subscriber, ANONYMOUS_DONOR,
    },
};

/// A JSON export of the browser app's collections, camelCase fields and ISO timestamps.
#[derive(Deserialize, Default)]
struct LegacyExport {
    #[serde(default)]
    users: Vec<LegacyProfile>,
    #[serde(default)]
    ngos: Vec<LegacyProfile>,
    #[serde(default)]
    admins: Vec<LegacyProfile>,
    #[serde(default)]
    reports: Vec<LegacyReport>,
    #[serde(default)]
    help: Vec<LegacyHelp>,
    #[serde(default)]
    donations: Vec<LegacyDonation>,
    #[serde(default)]
    subscribers: Vec<LegacySubscriber>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProfile {
    uid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    email: String,
    avatar_url: Option<String>,
    banner_url: Option<String>,
    address: Option<String>,
    gender: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyNgo {
    id: Option<String>,
    #[serde(default)]
    name: String,
    address: Option<String>,
    #[serde(default)]
    contact: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyReport {
    id: String,
    #[serde(default)]
    informant: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    location_description: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timestamp: Option<String>,
    status: Option<String>,
    ngo: Option<LegacyNgo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyHelp {
    id: String,
    report_id: String,
    #[serde(default)]
    ngo_id: String,
    #[serde(default)]
    ngo_name: String,
    ngo_address: Option<String>,
    #[serde(default)]
    description_of_help: String,
    #[serde(default)]
    reported_by_contact: String,
    #[serde(default)]
    reported_by_name: String,
    #[serde(default)]
    report_location: String,
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDonation {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    address: String,
    amount: serde_json::Value,
    #[serde(default)]
    payment_method: String,
    user_id: Option<String>,
    timestamp: Option<String>,
    status: Option<String>,
    payment_id: Option<String>,
}

#[derive(Deserialize)]
struct LegacySubscriber {
    id: String,
    email: String,
    timestamp: Option<String>,
}

fn parse_time(raw: &Option<String>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Bad timestamp {:?}", raw))?
            .with_timezone(&Utc)),
        None => {
            tracing::warn!("Missing timestamp, using now.");
            Ok(Utc::now())
        }
    }
}

impl LegacyProfile {
    fn into_profile(self, role: Role) -> Result<Profile> {
        let created = parse_time(&self.created_at)?;

        Ok(Profile {
            id: self.uid.clone(),
            uid: self.uid,
            role,
            name: self.name,
            contact: self.contact,
            email: self.email,
            avatar_url: self.avatar_url,
            banner_url: self.banner_url,
            address: self.address,
            gender: self.gender,
            latitude: self.latitude,
            longitude: self.longitude,
            created,
        })
    }
}

impl LegacyReport {
    fn into_report(self) -> Result<Report> {
        let status = match self.status.as_deref() {
            Some("complete") => ReportStatus::Complete,
            _ => ReportStatus::Pending,
        };

        Ok(Report {
            timestamp: parse_time(&self.timestamp)?,
            id: self.id,
            informant: self.informant,
            contact: self.contact,
            location_description: self.location_description,
            description: self.description,
            image_url: self.image_url,
            latitude: self.latitude,
            longitude: self.longitude,
            status,
            ngo: self.ngo.map(|ngo| NgoSummary {
                id: ngo.id.unwrap_or_default(),
                name: ngo.name,
                address: ngo.address,
                contact: ngo.contact,
            }),
            reporter_uid: None,
        })
    }
}

impl LegacyHelp {
    fn into_help(self) -> Result<HelpRecord> {
        Ok(HelpRecord {
            timestamp: parse_time(&self.timestamp)?,
            id: self.id,
            report_id: self.report_id,
            ngo_id: self.ngo_id,
            ngo_name: self.ngo_name,
            ngo_address: self.ngo_address,
            description_of_help: self.description_of_help,
            reported_by_contact: self.reported_by_contact,
            reported_by_name: self.reported_by_name,
            report_location: self.report_location,
        })
    }
}

impl LegacyDonation {
    fn into_donation(self) -> Result<Donation> {
        // The browser stored amounts as either strings or numbers.
        let amount = match &self.amount {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        let status = match self.status.as_deref() {
            Some("success") => DonationStatus::Success,
            Some("failed") => DonationStatus::Failed,
            _ => DonationStatus::Pending,
        };

        Ok(Donation {
            timestamp: parse_time(&self.timestamp)?,
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            amount,
            payment_method: self.payment_method,
            user_id: self.user_id.unwrap_or_else(|| ANONYMOUS_DONOR.to_string()),
            status,
            payment_id: self.payment_id,
        })
    }
}

async fn insert_all<T: Document>(
    kind: &str,
    collection: &dyn DocumentCollection<T>,
    docs: Vec<T>,
) -> Result<usize> {
    let mut created_count = 0;
    for (index, doc) in docs.into_iter().enumerate() {
        let span = tracing::info_span!("Document", %kind, id = %doc.id());
        let created = async {
            tracing::info!(%index, "Inserting.");
            let created = collection.insert(&doc).await?;
            if !created {
                tracing::warn!("Already exists, skipped.");
            }
            anyhow::Ok(created)
        }
        .instrument(span)
        .await?;
        if created {
            created_count += 1;
        }
    }

    Ok(created_count)
}

pub async fn import(path: PathBuf, db: &RescueDatabase) -> Result<()> {
    let export_json = read_to_string(&path)?;
    let export: LegacyExport = serde_json::from_str(&export_json)?;

    for (role, profiles) in [
        (Role::User, export.users),
        (Role::Ngo, export.ngos),
        (Role::Admin, export.admins),
    ] {
        let profiles = profiles
            .into_iter()
            .map(|p| p.into_profile(role))
            .collect::<Result<Vec<_>>>()?;
        let created = insert_all(role.collection(), db.profiles(role), profiles).await?;
        tracing::info!(%created, collection = role.collection(), "Success.");
    }

    let reports = export
        .reports
        .into_iter()
        .map(LegacyReport::into_report)
        .collect::<Result<Vec<_>>>()?;
    let created = insert_all("reports", db.reports(), reports).await?;
    tracing::info!(%created, "Success (reports).");

    let help = export
        .help
        .into_iter()
        .map(LegacyHelp::into_help)
        .collect::<Result<Vec<_>>>()?;
    let created = insert_all("help", db.help(), help).await?;
    tracing::info!(%created, "Success (help).");

    let donations = export
        .donations
        .into_iter()
        .map(LegacyDonation::into_donation)
        .collect::<Result<Vec<_>>>()?;
    let created = insert_all("donations", db.donations(), donations).await?;
    tracing::info!(%created, "Success (donations).");

    let subscribers = export
        .subscribers
        .into_iter()
        .map(|s| {
            Ok(Subscriber {
                timestamp: parse_time(&s.timestamp)?,
                id: s.id,
                email: s.email,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let created = insert_all("subscribers", db.subscribers(), subscribers).await?;
    tracing::info!(%created, "Success (subscribers).");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EXPORT: &str = r#"{
        "ngos": [{"uid": "n1", "name": "Paws", "contact": "111", "email": "paws@example.org",
                  "address": "12 Shelter Road", "createdAt": "2024-03-01T10:00:00Z"}],
        "reports": [{"id": "r1", "informant": "Alice", "contact": "98765 43210",
                     "locationDescription": "Market", "description": "Limping dog",
                     "imageUrl": "https://i.example.org/1.jpg", "timestamp": "2024-03-02T08:30:00+05:30",
                     "status": "complete", "ngo": {"id": "n1", "name": "Paws", "contact": "111"}}],
        "help": [{"id": "h1", "reportId": "r1", "ngoId": "n1", "ngoName": "Paws",
                  "descriptionOfHelp": "Vet", "reportedByContact": "9876543210",
                  "timestamp": "2024-03-02T09:00:00Z"}],
        "donations": [{"id": "d1", "name": "Asha", "amount": 500, "paymentMethod": "upi",
                       "status": "success"}]
    }"#;

    #[tokio::test]
    async fn imports_and_skips_existing() {
        let mut file = std::env::temp_dir();
        file.push(format!("stray-rescue-import-{}.json", crate::model::new_document_id()));
        std::fs::File::create(&file)
            .unwrap()
            .write_all(EXPORT.as_bytes())
            .unwrap();

        let db = RescueDatabase::in_memory();
        import(file.clone(), &db).await.unwrap();
        import(file.clone(), &db).await.unwrap();
        std::fs::remove_file(&file).unwrap();

        let ngos = db.profiles(Role::Ngo).list().await.unwrap();
        assert_eq!(ngos.len(), 1);
        assert_eq!(ngos[0].role, Role::Ngo);

        let reports = db.reports().list().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, ReportStatus::Complete);
        assert_eq!(reports[0].timestamp.to_rfc3339(), "2024-03-02T03:00:00+00:00");

        let donations = db.donations().list().await.unwrap();
        assert_eq!(donations[0].amount, "500");
        assert_eq!(donations[0].user_id, ANONYMOUS_DONOR);
        assert_eq!(db.help().list().await.unwrap().len(), 1);
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        assert!(parse_time(&Some("yesterday".to_string())).is_err());
    }
}

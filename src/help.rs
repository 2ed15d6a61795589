use std::{collections::HashSet, sync::Mutex};

use chrono::Utc;
use serde::Deserialize;

use crate::{
    database::RescueDatabase,
    error::{AppError, AppResult, ValidationErrors},
    join::ANONYMOUS_NAME,
    logging::LogError,
    model::{new_document_id, HelpRecord, NgoSummary, Profile, ReportStatus, Role},
    profile::ProfileResolver,
};

/// Report ids an NGO is currently writing help for, in this process.
#[derive(Default)]
pub struct ClaimRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl ClaimRegistry {
    /// None if someone else holds the claim.
    pub fn claim(&self, report_id: &str) -> Option<Claim<'_>> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if claimed.insert(report_id.to_string()) {
            Some(Claim {
                registry: self,
                report_id: report_id.to_string(),
            })
        } else {
            None
        }
    }
}

/// Released on drop.
pub struct Claim<'a> {
    registry: &'a ClaimRegistry,
    report_id: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut claimed = self
            .registry
            .claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        claimed.remove(&self.report_id);
    }
}

#[derive(Deserialize, Debug)]
pub struct HelpForm {
    #[serde(default)]
    pub description_of_help: String,
}

/// Record an NGO's help for a pending report and mark the report complete.
pub async fn provide_help(
    db: &RescueDatabase,
    claims: &ClaimRegistry,
    ngo: &Profile,
    report_id: &str,
    form: &HelpForm,
) -> AppResult<HelpRecord> {
    let description = form.description_of_help.trim();
    if description.is_empty() {
        let mut errors = ValidationErrors::default();
        errors.push(
            "description_of_help",
            "required",
            "Please describe the help provided.",
        );
        return Err(errors.into());
    }

    let _claim = claims.claim(report_id).ok_or_else(|| {
        AppError::Conflict("Another NGO is already responding to this report.".to_string())
    })?;

    let mut report = db
        .reports()
        .find(report_id)
        .await
        .log_error_internal()?
        .ok_or(AppError::NotFound)?;
    if report.status == ReportStatus::Complete {
        return Err(AppError::Conflict(
            "Help has already been recorded for this report.".to_string(),
        ));
    }

    let reported_by_name = match report.reporter_uid.as_deref() {
        Some(uid) => ProfileResolver::new(db)
            .in_role(uid, Role::User)
            .await
            .log_error_internal()?
            .map(|profile| profile.name),
        None => None,
    }
    .unwrap_or_else(|| {
        if report.informant.trim().is_empty() {
            ANONYMOUS_NAME.to_string()
        } else {
            report.informant.clone()
        }
    });

    let record = HelpRecord {
        id: new_document_id(),
        report_id: report.id.clone(),
        ngo_id: ngo.uid.clone(),
        ngo_name: ngo.name.clone(),
        ngo_address: ngo.address.clone(),
        description_of_help: description.to_string(),
        reported_by_contact: report.contact.clone(),
        reported_by_name,
        report_location: report.location_description.clone(),
        timestamp: Utc::now(),
    };
    db.help().insert(&record).await.log_error_internal()?;

    report.status = ReportStatus::Complete;
    report.ngo = Some(NgoSummary::from(ngo));
    if let Err(error) = db.reports().put(&report).await {
        tracing::error!(?error, report = %report.id, help = %record.id, "Report update failed, removing help record.");
        db.help().remove(&record.id).await.log_error_internal()?;

        return Err(AppError::Submission(error));
    }

    tracing::info!(report = %report.id, ngo = %ngo.uid, help = %record.id, "Help recorded.");

    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::join::fixtures::report;
    use crate::profile::fixtures::profile;

    fn form(text: &str) -> HelpForm {
        HelpForm {
            description_of_help: text.to_string(),
        }
    }

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let registry = ClaimRegistry::default();
        let first = registry.claim("r1");
        assert!(first.is_some());
        assert!(registry.claim("r1").is_none());
        assert!(registry.claim("r2").is_some());
        drop(first);
        assert!(registry.claim("r1").is_some());
    }

    #[tokio::test]
    async fn help_completes_report_once() {
        let db = RescueDatabase::in_memory();
        let claims = ClaimRegistry::default();
        db.reports()
            .insert(&report("r1", "9876543210", ReportStatus::Pending))
            .await
            .unwrap();
        let ngo = profile("n1", Role::Ngo, "Paws Shelter", "111");

        let record = provide_help(&db, &claims, &ngo, "r1", &form("Vet visit"))
            .await
            .unwrap();
        assert_eq!(record.report_id, "r1");
        assert_eq!(record.reported_by_contact, "9876543210");
        assert_eq!(record.reported_by_name, "Walk-in");

        let stored = db.reports().find("r1").await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Complete);
        assert_eq!(stored.ngo.unwrap().name, "Paws Shelter");

        let again = provide_help(&db, &claims, &ngo, "r1", &form("Second visit")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(db.help().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_help_yields_one_record() {
        let db = RescueDatabase::in_memory();
        let claims = Arc::new(ClaimRegistry::default());
        db.reports()
            .insert(&report("r1", "1", ReportStatus::Pending))
            .await
            .unwrap();
        let a = profile("n1", Role::Ngo, "Paws", "111");
        let b = profile("n2", Role::Ngo, "Tails", "222");
        let (form_a, form_b) = (form("A"), form("B"));

        let (first, second) = tokio::join!(
            provide_help(&db, &claims, &a, "r1", &form_a),
            provide_help(&db, &claims, &b, "r1", &form_b),
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert_eq!(db.help().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_report_and_blank_description() {
        let db = RescueDatabase::in_memory();
        let claims = ClaimRegistry::default();
        let ngo = profile("n1", Role::Ngo, "Paws", "111");

        assert!(matches!(
            provide_help(&db, &claims, &ngo, "nope", &form("x")).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            provide_help(&db, &claims, &ngo, "nope", &form("   ")).await,
            Err(AppError::Validation(_))
        ));
    }
}

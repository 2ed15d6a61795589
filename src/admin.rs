//! Admin summary counts and the edit/delete commands behind the admin dashboard.
//!
//! A mutation is two steps: [`execute`] sends the command to the store and
//! returns the acknowledged [`Change`], and [`AdminSnapshot::apply`] folds that
//! change into the already-fetched snapshot. Stats are always recomputed from
//! the snapshot in full.

use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    database::RescueDatabase,
    error::{AppError, AppResult, ValidationErrors},
    logging::LogError,
    model::{
        Donation, DonationStatus, HelpRecord, Profile, Report, ReportStatus, Role, Subscriber,
    },
    submission::parse_amount,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCollection {
    Profiles(Role),
    Reports,
    Help,
    Donations,
    Subscribers,
}

impl FromStr for AdminCollection {
    type Err = AppError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "users" => Ok(AdminCollection::Profiles(Role::User)),
            "ngos" => Ok(AdminCollection::Profiles(Role::Ngo)),
            "admins" => Ok(AdminCollection::Profiles(Role::Admin)),
            "reports" => Ok(AdminCollection::Reports),
            "help" => Ok(AdminCollection::Help),
            "donations" => Ok(AdminCollection::Donations),
            "subscribers" => Ok(AdminCollection::Subscribers),
            _ => Err(AppError::NotFound),
        }
    }
}

/// Editable fields. Which ones apply depends on the collection.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct AdminPatch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub location_description: Option<String>,
    pub description_of_help: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AdminCommand {
    Delete {
        collection: AdminCollection,
        id: String,
    },
    Update {
        collection: AdminCollection,
        id: String,
        patch: AdminPatch,
    },
}

/// What the store acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Deleted { collection: AdminCollection, id: String },
    Profile(Profile),
    Report(Report),
    Help(HelpRecord),
    Donation(Donation),
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct AdminStats {
    pub users: usize,
    pub ngos: usize,
    pub admins: usize,
    pub reports: usize,
    pub pending_reports: usize,
    pub complete_reports: usize,
    pub help_records: usize,
    pub donations: usize,
    pub donation_total: f64,
    pub subscribers: usize,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Everything the admin dashboard shows, fetched once.
#[derive(Serialize, Debug, Clone, Default)]
pub struct AdminSnapshot {
    pub users: Vec<Profile>,
    pub ngos: Vec<Profile>,
    pub admins: Vec<Profile>,
    pub reports: Vec<Report>,
    pub help: Vec<HelpRecord>,
    pub donations: Vec<Donation>,
    pub subscribers: Vec<Subscriber>,
}

impl AdminSnapshot {
    pub async fn load(db: &RescueDatabase) -> Result<Self> {
        Ok(AdminSnapshot {
            users: db.profiles(Role::User).list().await?,
            ngos: db.profiles(Role::Ngo).list().await?,
            admins: db.profiles(Role::Admin).list().await?,
            reports: db.reports().list().await?,
            help: db.help().list().await?,
            donations: db.donations().list().await?,
            subscribers: db.subscribers().list().await?,
        })
    }

    pub fn stats(&self) -> AdminStats {
        let pending_reports = self
            .reports
            .iter()
            .filter(|report| report.status == ReportStatus::Pending)
            .count();
        let total: f64 = self
            .donations
            .iter()
            .map(|donation| parse_amount(&donation.amount).unwrap_or(0.0))
            .sum();

        AdminStats {
            users: self.users.len(),
            ngos: self.ngos.len(),
            admins: self.admins.len(),
            reports: self.reports.len(),
            pending_reports,
            complete_reports: self.reports.len() - pending_reports,
            help_records: self.help.len(),
            donations: self.donations.len(),
            donation_total: round_cents(total),
            subscribers: self.subscribers.len(),
        }
    }

    fn profiles(&self, role: Role) -> &[Profile] {
        match role {
            Role::User => &self.users,
            Role::Ngo => &self.ngos,
            Role::Admin => &self.admins,
        }
    }

    fn contains(&self, collection: AdminCollection, id: &str) -> bool {
        match collection {
            AdminCollection::Profiles(role) => self.profiles(role).iter().any(|p| p.id == id),
            AdminCollection::Reports => self.reports.iter().any(|r| r.id == id),
            AdminCollection::Help => self.help.iter().any(|h| h.id == id),
            AdminCollection::Donations => self.donations.iter().any(|d| d.id == id),
            AdminCollection::Subscribers => self.subscribers.iter().any(|s| s.id == id),
        }
    }

    fn profiles_mut(&mut self, role: Role) -> &mut Vec<Profile> {
        match role {
            Role::User => &mut self.users,
            Role::Ngo => &mut self.ngos,
            Role::Admin => &mut self.admins,
        }
    }

    /// Fold an acknowledged change into the snapshot.
    pub fn apply(&mut self, change: Change) {
        fn replace<T>(items: &mut [T], updated: T, same: impl Fn(&T) -> bool) {
            if let Some(slot) = items.iter_mut().find(|item| same(item)) {
                *slot = updated;
            }
        }

        match change {
            Change::Deleted { collection, id } => match collection {
                AdminCollection::Profiles(role) => self.profiles_mut(role).retain(|p| p.id != id),
                AdminCollection::Reports => self.reports.retain(|r| r.id != id),
                AdminCollection::Help => self.help.retain(|h| h.id != id),
                AdminCollection::Donations => self.donations.retain(|d| d.id != id),
                AdminCollection::Subscribers => self.subscribers.retain(|s| s.id != id),
            },
            Change::Profile(profile) => {
                let id = profile.id.clone();
                replace(self.profiles_mut(profile.role), profile, |p| p.id == id);
            }
            Change::Report(report) => {
                let id = report.id.clone();
                replace(&mut self.reports, report, |r| r.id == id);
            }
            Change::Help(record) => {
                let id = record.id.clone();
                replace(&mut self.help, record, |h| h.id == id);
            }
            Change::Donation(donation) => {
                let id = donation.id.clone();
                replace(&mut self.donations, donation, |d| d.id == id);
            }
        }
    }
}

fn set_text(target: &mut String, value: &Option<String>, field: &str, errors: &mut ValidationErrors) {
    if let Some(value) = value {
        if value.trim().is_empty() {
            errors.push(field, "required", format!("{} cannot be empty.", field));
        } else {
            *target = value.trim().to_string();
        }
    }
}

fn patch_profile(mut profile: Profile, patch: &AdminPatch) -> Result<Profile, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    set_text(&mut profile.name, &patch.name, "name", &mut errors);
    set_text(&mut profile.contact, &patch.contact, "contact", &mut errors);
    if patch.address.is_some() {
        profile.address = patch.address.as_deref().map(str::trim).map(str::to_string);
    }

    errors.finish(profile)
}

fn patch_report(mut report: Report, patch: &AdminPatch) -> Result<Report, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    set_text(&mut report.description, &patch.description, "description", &mut errors);
    set_text(
        &mut report.location_description,
        &patch.location_description,
        "location_description",
        &mut errors,
    );
    match patch.status.as_deref() {
        None => {}
        Some("pending") => report.status = ReportStatus::Pending,
        Some("complete") => report.status = ReportStatus::Complete,
        Some(_) => errors.push("status", "format", "Status must be pending or complete."),
    }

    errors.finish(report)
}

fn patch_help(mut record: HelpRecord, patch: &AdminPatch) -> Result<HelpRecord, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    set_text(
        &mut record.description_of_help,
        &patch.description_of_help,
        "description_of_help",
        &mut errors,
    );

    errors.finish(record)
}

fn patch_donation(mut donation: Donation, patch: &AdminPatch) -> Result<Donation, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(amount) = &patch.amount {
        match parse_amount(amount) {
            Some(value) if value >= 0.0 => donation.amount = amount.trim().to_string(),
            _ => errors.push("amount", "format", "Amount must be a non-negative number."),
        }
    }
    match patch.status.as_deref() {
        None => {}
        Some("pending") => donation.status = DonationStatus::Pending,
        Some("success") => donation.status = DonationStatus::Success,
        Some("failed") => donation.status = DonationStatus::Failed,
        Some(_) => errors.push("status", "format", "Status must be pending, success or failed."),
    }

    errors.finish(donation)
}

fn find<T: Clone>(items: &[T], id: &str, id_of: impl Fn(&T) -> &str) -> AppResult<T> {
    items
        .iter()
        .find(|item| id_of(item) == id)
        .cloned()
        .ok_or(AppError::NotFound)
}

/// Send one command to the store. Nothing local changes here.
pub async fn execute(
    db: &RescueDatabase,
    snapshot: &AdminSnapshot,
    command: AdminCommand,
) -> AppResult<Change> {
    match command {
        AdminCommand::Delete { collection, id } => {
            if !snapshot.contains(collection, &id) {
                return Err(AppError::NotFound);
            }
            let result = match collection {
                AdminCollection::Profiles(role) => db.profiles(role).remove(&id).await,
                AdminCollection::Reports => db.reports().remove(&id).await,
                AdminCollection::Help => db.help().remove(&id).await,
                AdminCollection::Donations => db.donations().remove(&id).await,
                AdminCollection::Subscribers => db.subscribers().remove(&id).await,
            };
            result.log_error_internal()?;
            tracing::info!(?collection, %id, "Admin deleted document.");

            Ok(Change::Deleted { collection, id })
        }
        AdminCommand::Update {
            collection,
            id,
            patch,
        } => {
            let change = match collection {
                AdminCollection::Profiles(role) => {
                    let current = find(snapshot.profiles(role), &id, |p| p.id.as_str())?;
                    let mut updated = patch_profile(current, &patch)?;
                    updated.role = role;
                    db.profiles(role).put(&updated).await.log_error_internal()?;
                    Change::Profile(updated)
                }
                AdminCollection::Reports => {
                    let current = find(&snapshot.reports, &id, |r| r.id.as_str())?;
                    let updated = patch_report(current, &patch)?;
                    db.reports().put(&updated).await.log_error_internal()?;
                    Change::Report(updated)
                }
                AdminCollection::Help => {
                    let current = find(&snapshot.help, &id, |h| h.id.as_str())?;
                    let updated = patch_help(current, &patch)?;
                    db.help().put(&updated).await.log_error_internal()?;
                    Change::Help(updated)
                }
                AdminCollection::Donations => {
                    let current = find(&snapshot.donations, &id, |d| d.id.as_str())?;
                    let updated = patch_donation(current, &patch)?;
                    db.donations().put(&updated).await.log_error_internal()?;
                    Change::Donation(updated)
                }
                AdminCollection::Subscribers => {
                    let mut errors = ValidationErrors::default();
                    errors.push("collection", "read_only", "Subscribers cannot be edited.");
                    return Err(errors.into());
                }
            };
            tracing::info!(?collection, %id, "Admin updated document.");

            Ok(change)
        }
    }
}

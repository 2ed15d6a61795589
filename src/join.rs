//! Joins reports, help records and profiles on normalized contact, and the
//! dashboard filters over the joined rows. Everything here works on data that
//! has already been fetched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    contact::normalize_contact,
    model::{HelpRecord, Profile, Report, ReportStatus},
};

pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Profiles keyed by normalized contact. Built once per fetch.
pub struct ProfileIndex<'a> {
    by_contact: HashMap<String, &'a Profile>,
}

impl<'a> ProfileIndex<'a> {
    pub fn build(profiles: &'a [Profile]) -> Self {
        let mut by_contact = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let key = normalize_contact(Some(&profile.contact));
            if !key.is_empty() {
                by_contact.entry(key).or_insert(profile);
            }
        }

        ProfileIndex { by_contact }
    }

    pub fn get(&self, contact: &str) -> Option<&'a Profile> {
        self.by_contact.get(&normalize_contact(Some(contact))).copied()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct JoinedReport {
    #[serde(flatten)]
    pub report: Report,
    pub user: Option<Profile>,
    pub reporter_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

pub fn join_reports(reports: Vec<Report>, index: &ProfileIndex) -> Vec<JoinedReport> {
    reports
        .into_iter()
        .map(|report| {
            let user = index.get(&report.contact).cloned();
            let reporter_name = user
                .as_ref()
                .map(|user| user.name.clone())
                .unwrap_or_else(|| ANONYMOUS_NAME.to_string());

            JoinedReport {
                report,
                user,
                reporter_name,
                distance_km: None,
            }
        })
        .collect()
}

/// Help records filed against reports made from `contact`. Empty contact matches nothing.
pub fn help_for_contact<'h>(help: &'h [HelpRecord], contact: Option<&str>) -> Vec<&'h HelpRecord> {
    let key = normalize_contact(contact);
    if key.is_empty() {
        return Vec::new();
    }

    help.iter()
        .filter(|record| normalize_contact(Some(&record.reported_by_contact)) == key)
        .collect()
}

/// Reports filed from `contact`. Empty contact matches nothing.
pub fn reports_for_contact(reports: Vec<JoinedReport>, contact: Option<&str>) -> Vec<JoinedReport> {
    let key = normalize_contact(contact);
    if key.is_empty() {
        return Vec::new();
    }

    reports
        .into_iter()
        .filter(|joined| normalize_contact(Some(&joined.report.contact)) == key)
        .collect()
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Complete,
}

impl StatusFilter {
    fn admits(self, status: ReportStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == ReportStatus::Pending,
            StatusFilter::Complete => status == ReportStatus::Complete,
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Status AND case-insensitive text search.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReportFilter {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: String,
}

impl ReportFilter {
    pub fn matches(&self, joined: &JoinedReport) -> bool {
        if !self.status.admits(joined.report.status) {
            return false;
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        contains_folded(&joined.report.description, &needle)
            || contains_folded(&joined.reporter_name, &needle)
            || contains_folded(&joined.report.informant, &needle)
            || contains_folded(&joined.report.location_description, &needle)
    }

    pub fn apply(&self, reports: Vec<JoinedReport>) -> Vec<JoinedReport> {
        reports.into_iter().filter(|joined| self.matches(joined)).collect()
    }
}

/// Text search for the "Help For Your Reports" tab.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct HelpFilter {
    #[serde(default)]
    pub search: String,
}

impl HelpFilter {
    pub fn apply<'h>(&self, help: Vec<&'h HelpRecord>) -> Vec<&'h HelpRecord> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return help;
        }

        help.into_iter()
            .filter(|record| {
                contains_folded(&record.ngo_name, &needle)
                    || contains_folded(&record.description_of_help, &needle)
                    || contains_folded(&record.report_location, &needle)
            })
            .collect()
    }
}

#[cfg(test)]
pub mod fixtures {
    use chrono::Utc;

    use crate::model::{HelpRecord, Report, ReportStatus};

    pub fn report(id: &str, contact: &str, status: ReportStatus) -> Report {
        Report {
            id: id.to_string(),
            informant: "Walk-in".to_string(),
            contact: contact.to_string(),
            location_description: "Near the railway station".to_string(),
            description: "Injured dog with a limp".to_string(),
            image_url: format!("https://images.example.org/{}.jpg", id),
            latitude: None,
            longitude: None,
            timestamp: Utc::now(),
            status,
            ngo: None,
            reporter_uid: None,
        }
    }

    pub fn help(id: &str, report_id: &str, reported_by_contact: &str) -> HelpRecord {
        HelpRecord {
            id: id.to_string(),
            report_id: report_id.to_string(),
            ngo_id: "n1".to_string(),
            ngo_name: "Paws Shelter".to_string(),
            ngo_address: Some("12 Shelter Road".to_string()),
            description_of_help: "Took the dog to the vet".to_string(),
            reported_by_contact: reported_by_contact.to_string(),
            reported_by_name: "Alice".to_string(),
            report_location: "Near the railway station".to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{help, report};
    use super::*;
    use crate::model::Role;
    use crate::profile::fixtures::profile;

    #[test]
    fn join_attaches_profile_by_normalized_contact() {
        let profiles = vec![profile("u1", Role::User, "Alice", "9876543210")];
        let index = ProfileIndex::build(&profiles);
        let reports = vec![
            report("r1", "98765-43210", ReportStatus::Pending),
            report("r2", "000", ReportStatus::Pending),
        ];

        let joined = join_reports(reports, &index);
        let named: Vec<_> = joined
            .iter()
            .filter(|j| j.user.as_ref().map(|u| u.name.as_str()) == Some("Alice"))
            .collect();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].report.id, "r1");

        let anonymous: Vec<_> = joined.iter().filter(|j| j.user.is_none()).collect();
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].reporter_name, ANONYMOUS_NAME);
    }

    #[test]
    fn empty_contacts_are_not_indexed() {
        let profiles = vec![profile("u1", Role::User, "Nobody", "n/a")];
        let index = ProfileIndex::build(&profiles);
        assert!(index.get("").is_none());
        assert!(index.get("none").is_none());
    }

    #[test]
    fn status_filter_counts() {
        let reports: Vec<Report> = [
            ReportStatus::Pending,
            ReportStatus::Complete,
            ReportStatus::Pending,
            ReportStatus::Complete,
            ReportStatus::Complete,
        ]
        .iter()
        .enumerate()
        .map(|(i, status)| report(&format!("r{}", i), "1", *status))
        .collect();
        let joined = join_reports(reports, &ProfileIndex::build(&[]));

        let pending = ReportFilter {
            status: StatusFilter::Pending,
            search: String::new(),
        };
        assert_eq!(pending.apply(joined.clone()).len(), 2);

        let nothing = ReportFilter {
            status: StatusFilter::Pending,
            search: "giraffe".to_string(),
        };
        assert!(nothing.apply(joined.clone()).is_empty());

        assert_eq!(ReportFilter::default().apply(joined).len(), 5);
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_location() {
        let profiles = vec![profile("u1", Role::User, "Alice", "123")];
        let mut kitten = report("r1", "123", ReportStatus::Pending);
        kitten.description = "Kitten stuck".to_string();
        kitten.location_description = "MG Road".to_string();
        let joined = join_reports(vec![kitten], &ProfileIndex::build(&profiles));

        for term in ["KITTEN", "alice", "mg road", "  road "] {
            let filter = ReportFilter {
                status: StatusFilter::All,
                search: term.to_string(),
            };
            assert_eq!(filter.apply(joined.clone()).len(), 1, "{}", term);
        }
    }

    #[test]
    fn help_for_contact_degrades_to_empty() {
        let records = vec![help("h1", "r1", "+91 98765 43210"), help("h2", "r2", "111")];
        assert_eq!(help_for_contact(&records, Some("919876543210")).len(), 1);
        assert!(help_for_contact(&records, None).is_empty());
        assert!(help_for_contact(&records, Some("")).is_empty());
    }

    #[test]
    fn help_filter_searches_ngo_and_description() {
        let records = vec![help("h1", "r1", "1")];
        let refs: Vec<&HelpRecord> = records.iter().collect();
        let vet = HelpFilter {
            search: "VET".to_string(),
        };
        assert_eq!(vet.apply(refs.clone()).len(), 1);
        let none = HelpFilter {
            search: "zebra".to_string(),
        };
        assert!(none.apply(refs).is_empty());
    }
}

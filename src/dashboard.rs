use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    database::RescueDatabase,
    geo::distance_km,
    join::{
        help_for_contact, join_reports, reports_for_contact, HelpFilter, JoinedReport,
        ProfileIndex, ReportFilter, StatusFilter,
    },
    model::{HelpRecord, Profile, Role},
};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    #[default]
    All,
    Mine,
}

#[derive(Deserialize, Debug, Default)]
pub struct UserDashboardQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub scope: ReportScope,
    #[serde(default)]
    pub help_search: String,
}

#[derive(Serialize, Debug)]
pub struct UserDashboard {
    pub profile: Profile,
    pub reports: Vec<JoinedReport>,
    /// Hidden until at least one NGO has helped with one of this user's reports.
    pub show_help_tab: bool,
    pub help_for_my_reports: Vec<HelpRecord>,
}

pub async fn user_dashboard(
    db: &RescueDatabase,
    profile: Profile,
    query: &UserDashboardQuery,
) -> Result<UserDashboard> {
    let users = db.profiles(Role::User).list().await?;
    let reports = db.reports().list().await?;
    let help = db.help().list().await?;

    let index = ProfileIndex::build(&users);
    let mut joined = join_reports(reports, &index);
    if query.scope == ReportScope::Mine {
        joined = reports_for_contact(joined, Some(&profile.contact));
    }

    let filter = ReportFilter {
        status: query.status,
        search: query.search.clone(),
    };
    let reports = filter.apply(joined);

    let mine = help_for_contact(&help, Some(&profile.contact));
    let show_help_tab = !mine.is_empty();
    let help_filter = HelpFilter {
        search: query.help_search.clone(),
    };
    let help_for_my_reports = help_filter.apply(mine).into_iter().cloned().collect();

    Ok(UserDashboard {
        profile,
        reports,
        show_help_tab,
        help_for_my_reports,
    })
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportOrder {
    /// As fetched.
    #[default]
    Fetched,
    Nearest,
}

#[derive(Deserialize, Debug, Default)]
pub struct NgoDashboardQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: ReportOrder,
}

#[derive(Serialize, Debug)]
pub struct NgoDashboard {
    pub profile: Profile,
    pub reports: Vec<JoinedReport>,
    pub help_given: Vec<HelpRecord>,
}

/// Stable sort by distance; reports without one keep fetch order at the end.
pub fn order_by_distance(reports: &mut [JoinedReport]) {
    reports.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

pub async fn ngo_dashboard(
    db: &RescueDatabase,
    profile: Profile,
    query: &NgoDashboardQuery,
) -> Result<NgoDashboard> {
    let users = db.profiles(Role::User).list().await?;
    let reports = db.reports().list().await?;
    let help = db.help().list().await?;

    let index = ProfileIndex::build(&users);
    let mut joined = join_reports(reports, &index);
    for row in joined.iter_mut() {
        row.distance_km = distance_km(
            profile.latitude,
            profile.longitude,
            row.report.latitude,
            row.report.longitude,
        );
    }

    let filter = ReportFilter {
        status: query.status,
        search: query.search.clone(),
    };
    let mut reports = filter.apply(joined);
    if query.sort == ReportOrder::Nearest {
        order_by_distance(&mut reports);
    }

    let help_given = help
        .into_iter()
        .filter(|record| record.ngo_id == profile.uid)
        .collect();

    Ok(NgoDashboard {
        profile,
        reports,
        help_given,
    })
}

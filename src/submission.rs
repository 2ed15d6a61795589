//! Form validation and the single-write pipelines behind each form.

use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{AuthProvider, Session},
    contact::normalize_contact,
    database::RescueDatabase,
    error::{AppError, AppResult, ValidationErrors},
    image_host::{upload_checked, ImageHost, ImageUpload},
    logging::LogError,
    model::{
        new_document_id, Donation, DonationStatus, Profile, Report, ReportStatus, Role,
        Subscriber, ANONYMOUS_DONOR,
    },
    payment::PaymentProvider,
};

const MIN_CONTACT_DIGITS: usize = 10;
const MIN_PASSWORD_CHARS: usize = 6;

fn require(errors: &mut ValidationErrors, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(field, "required", format!("{} is required.", label));
    }
}

fn check_contact(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "required", "Contact number is required.");
    } else if normalize_contact(Some(value)).len() < MIN_CONTACT_DIGITS {
        errors.push(
            field,
            "format",
            format!("Contact number needs at least {} digits.", MIN_CONTACT_DIGITS),
        );
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    >= 2
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "required", "Email is required.");
    } else if !is_valid_email(value) {
        errors.push(field, "format", "Please enter a valid email address.");
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct StrayReportForm {
    #[serde(default)]
    pub informant: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub location_description: String,
    #[serde(default)]
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StrayReportForm {
    pub fn validate(&self, image: Option<&ImageUpload>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "informant", &self.informant, "Your name");
        check_contact(&mut errors, "contact", &self.contact);
        require(&mut errors, "location_description", &self.location_description, "Location");
        require(&mut errors, "description", &self.description, "Description");

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    errors.push("latitude", "range", "Latitude must be between -90 and 90.");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    errors.push("longitude", "range", "Longitude must be between -180 and 180.");
                }
            }
            (None, None) => {}
            _ => errors.push(
                "latitude",
                "pair",
                "Latitude and longitude must be given together.",
            ),
        }

        if image.is_none() {
            errors.push("image", "required", "Please attach a photo of the animal.");
        }

        errors.finish(())
    }
}

/// Validate, upload the photo, then write one pending report.
pub async fn submit_report(
    db: &RescueDatabase,
    images: &dyn ImageHost,
    reporter: Option<&Profile>,
    form: &StrayReportForm,
    image: Option<ImageUpload>,
) -> AppResult<Report> {
    form.validate(image.as_ref())?;

    let image_url = match &image {
        Some(image) => upload_checked(images, image).await?,
        None => String::new(),
    };

    let report = Report {
        id: new_document_id(),
        informant: form.informant.trim().to_string(),
        contact: form.contact.trim().to_string(),
        location_description: form.location_description.trim().to_string(),
        description: form.description.trim().to_string(),
        image_url,
        latitude: form.latitude,
        longitude: form.longitude,
        timestamp: Utc::now(),
        status: ReportStatus::Pending,
        ngo: None,
        reporter_uid: reporter.map(|profile| profile.uid.clone()),
    };
    db.reports().insert(&report).await.log_error_internal()?;
    tracing::info!(report = %report.id, "Stray report submitted.");

    Ok(report)
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub contact: String,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SignupForm {
    pub fn validate(&self, role: Role) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "name", &self.name, "Name");
        check_email(&mut errors, "email", &self.email);
        check_contact(&mut errors, "contact", &self.contact);
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.push(
                "password",
                "length",
                format!("Password needs at least {} characters.", MIN_PASSWORD_CHARS),
            );
        }
        if role == Role::Ngo && trimmed(&self.address).is_none() {
            errors.push("address", "required", "NGO address is required.");
        }

        errors.finish(())
    }

    fn profile(&self, role: Role, uid: &str) -> Profile {
        let (address, gender, latitude, longitude) = match role {
            Role::Ngo => (trimmed(&self.address), None, self.latitude, self.longitude),
            Role::User | Role::Admin => (None, trimmed(&self.gender), None, None),
        };

        Profile {
            id: uid.to_string(),
            uid: uid.to_string(),
            role,
            name: self.name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            email: self.email.trim().to_string(),
            avatar_url: trimmed(&self.avatar_url),
            banner_url: trimmed(&self.banner_url),
            address,
            gender,
            latitude,
            longitude,
            created: Utc::now(),
        }
    }
}

/// Create the provider account, then the profile document keyed by uid.
pub async fn sign_up(
    auth: &dyn AuthProvider,
    db: &RescueDatabase,
    role: Role,
    form: &SignupForm,
) -> AppResult<(Session, Profile)> {
    form.validate(role)?;

    let session = auth
        .sign_up(form.email.trim(), &form.password, form.name.trim())
        .await?;
    let profile = form.profile(role, &session.identity.uid);

    let created = db
        .profiles(role)
        .insert(&profile)
        .await
        .log_error_internal()?;
    if !created {
        return Err(AppError::Conflict(
            "A profile already exists for this account.".to_string(),
        ));
    }
    tracing::info!(uid = %profile.uid, role = role.as_str(), "Profile created.");

    Ok((session, profile))
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct DonationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub payment_method: String,
}

pub fn parse_amount(amount: &str) -> Option<f64> {
    amount
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

impl DonationForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require(&mut errors, "name", &self.name, "Name");
        check_email(&mut errors, "email", &self.email);
        check_contact(&mut errors, "phone", &self.phone);
        require(&mut errors, "address", &self.address, "Address");
        require(&mut errors, "payment_method", &self.payment_method, "Payment method");

        match parse_amount(&self.amount) {
            Some(amount) if amount > 0.0 => {}
            Some(_) => errors.push("amount", "range", "Amount must be greater than zero."),
            None if self.amount.trim().is_empty() => {
                errors.push("amount", "required", "Amount is required.")
            }
            None => errors.push("amount", "format", "Amount must be a number."),
        }

        errors.finish(())
    }

    pub fn is_form_invalid(&self) -> bool {
        self.validate().is_err()
    }
}

/// Write a pending donation, settle it through the provider, record the outcome.
pub async fn submit_donation(
    db: &RescueDatabase,
    payments: &dyn PaymentProvider,
    donor_uid: Option<&str>,
    form: &DonationForm,
) -> AppResult<Donation> {
    form.validate()?;

    let mut donation = Donation {
        id: new_document_id(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        amount: form.amount.trim().to_string(),
        payment_method: form.payment_method.trim().to_string(),
        user_id: donor_uid.unwrap_or(ANONYMOUS_DONOR).to_string(),
        timestamp: Utc::now(),
        status: DonationStatus::Pending,
        payment_id: None,
    };
    db.donations().insert(&donation).await.log_error_internal()?;

    match payments.charge(&donation).await {
        Ok(outcome) => {
            donation.status = outcome.status;
            donation.payment_id = outcome.payment_id;
        }
        Err(error) => {
            tracing::warn!(?error, donation = %donation.id, "Payment failed.");
            donation.status = DonationStatus::Failed;
        }
    }
    db.donations().put(&donation).await.log_error_internal()?;
    tracing::info!(donation = %donation.id, status = ?donation.status, "Donation settled.");

    Ok(donation)
}

#[derive(Deserialize, Debug, Default)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

pub async fn subscribe(db: &RescueDatabase, form: &SubscribeForm) -> AppResult<Subscriber> {
    let mut errors = ValidationErrors::default();
    check_email(&mut errors, "email", &form.email);
    errors.finish(())?;

    let subscriber = Subscriber {
        id: new_document_id(),
        email: form.email.trim().to_string(),
        timestamp: Utc::now(),
    };
    db.subscribers()
        .insert(&subscriber)
        .await
        .log_error_internal()?;

    Ok(subscriber)
}

use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use governor::Quota;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    admin::{execute, AdminCollection, AdminCommand, AdminPatch, AdminSnapshot, AdminStats},
    auth::{AuthError, Caller, Identity, Session},
    config::Config,
    dashboard::{
        ngo_dashboard, user_dashboard, NgoDashboard, NgoDashboardQuery, UserDashboard,
        UserDashboardQuery,
    },
    error::{AppError, AppResult, ValidationErrors},
    guard::{AccessGuard, GuardState},
    help::{provide_help, HelpForm},
    image_host::ImageUpload,
    logging::LogError,
    model::{Donation, HelpRecord, Profile, Report, Role, Subscriber},
    profile::ProfileResolver,
    rate_limiter::RateLimiterLayer,
    routes::Route,
    server_state::ServerState,
    submission::{
        sign_up, submit_donation, submit_report, subscribe, DonationForm, SignupForm,
        StrayReportForm, SubscribeForm,
    },
};

/// Room for a 2 MiB image plus the text fields; the image limit itself is checked later.
const MAX_FORM_BYTES: usize = 4 * 1024 * 1024;

const RATE_LIMIT_PRUNE_PERIOD: Duration = Duration::from_secs(60);

async fn status() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct About {
    name: &'static str,
    mission: &'static str,
}

async fn about() -> Json<About> {
    Json(About {
        name: "Stray Rescue",
        mission: "Connecting people who spot injured stray animals with NGOs that can help.",
    })
}

#[derive(Serialize)]
struct LoginOption {
    role: Role,
    login: &'static str,
    signup: &'static str,
}

async fn type_of_login() -> Json<Vec<LoginOption>> {
    Json(vec![
        LoginOption {
            role: Role::User,
            login: Route::UserLogin.path(),
            signup: Route::UserSignup.path(),
        },
        LoginOption {
            role: Role::Ngo,
            login: Route::NgoLogin.path(),
            signup: Route::NgoSignup.path(),
        },
        LoginOption {
            role: Role::Admin,
            login: Route::AdminLogin.path(),
            signup: Route::AdminSignup.path(),
        },
    ])
}

#[derive(Deserialize)]
struct NavigateQuery {
    path: String,
}

async fn navigate(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Query(query): Query<NavigateQuery>,
) -> AppResult<Json<GuardState>> {
    let route = Route::from_path(&query.path).ok_or(AppError::NotFound)?;
    let guard_state = AccessGuard::new(&state.db)
        .check(identity.as_ref(), route)
        .await
        .log_error_internal()?;

    Ok(Json(guard_state))
}

#[derive(Deserialize)]
struct AccessDeniedQuery {
    from: Option<String>,
}

#[derive(Serialize)]
struct AccessDeniedView {
    message: &'static str,
    back: String,
}

async fn access_denied(Query(query): Query<AccessDeniedQuery>) -> Json<AccessDeniedView> {
    Json(AccessDeniedView {
        message: "You do not have permission to view this page.",
        back: query.from.unwrap_or_else(|| Route::Home.path().to_string()),
    })
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct SignedInView {
    session: Session,
    profile: Profile,
    redirect: &'static str,
}

/// Sign in, then require a profile in the role's collection.
async fn login(state: &ServerState, role: Role, form: LoginForm) -> AppResult<Json<SignedInView>> {
    let mut errors = ValidationErrors::default();
    if form.email.trim().is_empty() {
        errors.push("email", "required", "Email is required.");
    }
    if form.password.is_empty() {
        errors.push("password", "required", "Password is required.");
    }
    errors.finish(())?;

    let session = state.auth.sign_in(form.email.trim(), &form.password).await?;
    let homepage = Route::homepage(role);
    let profile = AccessGuard::new(&state.db)
        .authorize(Some(&session.identity), homepage)
        .await?;
    tracing::info!(uid = %profile.uid, role = role.as_str(), "Signed in.");

    Ok(Json(SignedInView {
        session,
        profile,
        redirect: homepage.path(),
    }))
}

async fn user_login(
    State(state): State<ServerState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<SignedInView>> {
    login(&state, Role::User, form).await
}

async fn ngo_login(
    State(state): State<ServerState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<SignedInView>> {
    login(&state, Role::Ngo, form).await
}

async fn admin_login(
    State(state): State<ServerState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<SignedInView>> {
    login(&state, Role::Admin, form).await
}

async fn signup(state: &ServerState, role: Role, form: SignupForm) -> AppResult<Json<SignedInView>> {
    let (session, profile) = sign_up(state.auth.as_ref(), &state.db, role, &form).await?;

    Ok(Json(SignedInView {
        session,
        profile,
        redirect: Route::homepage(role).path(),
    }))
}

async fn user_signup(
    State(state): State<ServerState>,
    Json(form): Json<SignupForm>,
) -> AppResult<Json<SignedInView>> {
    signup(&state, Role::User, form).await
}

async fn ngo_signup(
    State(state): State<ServerState>,
    Json(form): Json<SignupForm>,
) -> AppResult<Json<SignedInView>> {
    signup(&state, Role::Ngo, form).await
}

async fn admin_signup(
    State(state): State<ServerState>,
    Json(form): Json<SignupForm>,
) -> AppResult<Json<SignedInView>> {
    signup(&state, Role::Admin, form).await
}

#[derive(Serialize)]
struct SignedOut {
    signed_out: bool,
    redirect: &'static str,
}

/// Tokens are discarded client-side; this only tells the client where to go.
async fn sign_out() -> Json<SignedOut> {
    Json(SignedOut {
        signed_out: true,
        redirect: Route::Home.path(),
    })
}

#[derive(Serialize)]
struct WhoAmI {
    identity: Identity,
    profiles: Vec<Profile>,
    role: Option<Role>,
    contact: Option<String>,
    homepage: Option<&'static str>,
}

/// Every profile the caller holds, plus where a fresh sign-in should land.
async fn me(State(state): State<ServerState>, Caller(identity): Caller) -> AppResult<Json<WhoAmI>> {
    let identity = identity.ok_or(AuthError::InvalidToken)?;
    let resolved = ProfileResolver::new(&state.db)
        .resolve(&identity.uid)
        .await
        .log_error_internal()?;
    let primary = resolved.primary().cloned();

    Ok(Json(WhoAmI {
        identity,
        role: primary.as_ref().map(|profile| profile.role),
        contact: primary.as_ref().map(|profile| profile.contact.clone()),
        homepage: primary.map(|profile| Route::homepage(profile.role).path()),
        profiles: resolved.profiles,
    }))
}

async fn user_homepage(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Query(query): Query<UserDashboardQuery>,
) -> AppResult<Json<UserDashboard>> {
    let profile = AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::UserHomepage)
        .await?;
    let dashboard = user_dashboard(&state.db, profile, &query)
        .await
        .log_error_internal()?;

    Ok(Json(dashboard))
}

fn malformed(field: &str) -> AppError {
    let mut errors = ValidationErrors::default();
    errors.push(field, "format", "The form could not be read. Please try again.");
    errors.into()
}

fn parse_coordinate(field: &str, value: &str) -> AppResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| {
        let mut errors = ValidationErrors::default();
        errors.push(field, "format", format!("{} must be a number.", field));
        errors.into()
    })
}

async fn read_report_form(
    mut multipart: Multipart,
) -> AppResult<(StrayReportForm, Option<ImageUpload>)> {
    let mut form = StrayReportForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| malformed("form"))? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|_| malformed("image"))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(|_| malformed(&name))?;
        match name.as_str() {
            "informant" => form.informant = value,
            "contact" => form.contact = value,
            "location_description" => form.location_description = value,
            "description" => form.description = value,
            "latitude" => form.latitude = parse_coordinate("latitude", &value)?,
            "longitude" => form.longitude = parse_coordinate("longitude", &value)?,
            _ => tracing::debug!(%name, "Ignoring unknown report field."),
        }
    }

    Ok((form, image))
}

async fn create_report(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    multipart: Multipart,
) -> AppResult<Json<Report>> {
    let reporter = AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::UserHomepage)
        .await?;
    let (form, image) = read_report_form(multipart).await?;
    let report = submit_report(&state.db, state.images.as_ref(), Some(&reporter), &form, image).await?;

    Ok(Json(report))
}

async fn ngo_homepage(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Query(query): Query<NgoDashboardQuery>,
) -> AppResult<Json<NgoDashboard>> {
    let profile = AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::NgoHomepage)
        .await?;
    let dashboard = ngo_dashboard(&state.db, profile, &query)
        .await
        .log_error_internal()?;

    Ok(Json(dashboard))
}

async fn help_report(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Path(report_id): Path<String>,
    Json(form): Json<HelpForm>,
) -> AppResult<Json<HelpRecord>> {
    let ngo = AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::NgoHomepage)
        .await?;
    let record = provide_help(&state.db, &state.claims, &ngo, &report_id, &form).await?;

    Ok(Json(record))
}

#[derive(Serialize)]
struct AdminDashboard {
    stats: AdminStats,
    #[serde(flatten)]
    snapshot: AdminSnapshot,
}

async fn admin_dashboard(
    State(state): State<ServerState>,
    Caller(identity): Caller,
) -> AppResult<Json<AdminDashboard>> {
    AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::AdminDashboard)
        .await?;
    let snapshot = AdminSnapshot::load(&state.db).await.log_error_internal()?;

    Ok(Json(AdminDashboard {
        stats: snapshot.stats(),
        snapshot,
    }))
}

async fn admin_mutation(
    state: &ServerState,
    identity: Option<Identity>,
    make_command: impl FnOnce() -> AdminCommand,
) -> AppResult<Json<AdminDashboard>> {
    AccessGuard::new(&state.db)
        .authorize(identity.as_ref(), Route::AdminDashboard)
        .await?;
    let mut snapshot = AdminSnapshot::load(&state.db).await.log_error_internal()?;

    let change = execute(&state.db, &snapshot, make_command()).await?;
    snapshot.apply(change);

    Ok(Json(AdminDashboard {
        stats: snapshot.stats(),
        snapshot,
    }))
}

async fn admin_update(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Path((collection, id)): Path<(String, String)>,
    Json(patch): Json<AdminPatch>,
) -> AppResult<Json<AdminDashboard>> {
    let collection: AdminCollection = collection.parse()?;
    admin_mutation(&state, identity, || AdminCommand::Update {
        collection,
        id,
        patch,
    })
    .await
}

async fn admin_delete(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<AdminDashboard>> {
    let collection: AdminCollection = collection.parse()?;
    admin_mutation(&state, identity, || AdminCommand::Delete { collection, id }).await
}

#[derive(Serialize)]
struct DonationsPage {
    payment_methods: &'static [&'static str],
}

async fn donations_page() -> Json<DonationsPage> {
    Json(DonationsPage {
        payment_methods: &["upi", "card", "netbanking"],
    })
}

async fn donate(
    State(state): State<ServerState>,
    Caller(identity): Caller,
    Json(form): Json<DonationForm>,
) -> AppResult<Json<Donation>> {
    let donor = identity.as_ref().map(|identity| identity.uid.as_str());
    let donation = submit_donation(&state.db, state.payments.as_ref(), donor, &form).await?;

    Ok(Json(donation))
}

async fn subscribe_newsletter(
    State(state): State<ServerState>,
    Json(form): Json<SubscribeForm>,
) -> AppResult<Json<Subscriber>> {
    Ok(Json(subscribe(&state.db, &form).await?))
}

#[derive(Deserialize)]
struct ChatQuery {
    #[serde(default)]
    query: String,
}

async fn chat(State(state): State<ServerState>, Query(query): Query<ChatQuery>) -> AppResult<String> {
    let client = state.chat.as_ref().ok_or(AppError::Unavailable("Chat assistant"))?;
    if query.query.trim().is_empty() {
        let mut errors = ValidationErrors::default();
        errors.push("query", "required", "Please type a question.");
        return Err(errors.into());
    }

    client
        .ask(query.query.trim())
        .await
        .log_error_unavailable("Chat assistant")
}

pub fn router(state: ServerState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/", get(status))
        .route(Route::About.path(), get(about))
        .route(Route::TypeOfLogin.path(), get(type_of_login))
        .route("/navigate", get(navigate))
        .route(Route::AccessDenied.path(), get(access_denied))
        .route(Route::UserLogin.path(), post(user_login))
        .route(Route::NgoLogin.path(), post(ngo_login))
        .route(Route::AdminLogin.path(), post(admin_login))
        .route(Route::UserSignup.path(), post(user_signup))
        .route(Route::NgoSignup.path(), post(ngo_signup))
        .route(Route::AdminSignup.path(), post(admin_signup))
        .route("/sign-out", post(sign_out))
        .route("/me", get(me))
        .route(Route::UserHomepage.path(), get(user_homepage))
        .route(
            "/reports",
            post(create_report).layer(DefaultBodyLimit::max(MAX_FORM_BYTES)),
        )
        .route(Route::NgoHomepage.path(), get(ngo_homepage))
        .route("/reports/:id/help", post(help_report))
        .route(Route::AdminDashboard.path(), get(admin_dashboard))
        .route("/admin/:collection/:id", patch(admin_update).delete(admin_delete))
        .route(Route::Donations.path(), get(donations_page).post(donate))
        .route("/subscribe", post(subscribe_newsletter))
        .route("/chat", get(chat));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
}

pub async fn serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    let state = ServerState::new(&config, in_memory)?;

    let per_minute = NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(nonzero!(120u32));
    let rate_limiter = RateLimiterLayer::new(Quota::per_minute(per_minute));
    rate_limiter.spawn_pruning(RATE_LIMIT_PRUNE_PERIOD);
    let app = router(state, config.static_dir.as_deref())
        .layer(rate_limiter)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::fake::FakeAuth,
        database::RescueDatabase,
        help::ClaimRegistry,
        image_host::fake::FakeImageHost,
        model::{DonationStatus, ReportStatus},
        payment::SimulatedPayment,
    };

    const BOUNDARY: &str = "stray-rescue-boundary";

    fn test_state() -> ServerState {
        ServerState {
            db: RescueDatabase::in_memory(),
            auth: Arc::new(FakeAuth::default()),
            images: Arc::new(FakeImageHost::default()),
            payments: Arc::new(SimulatedPayment::new(Duration::ZERO)),
            chat: None,
            claims: Arc::new(ClaimRegistry::default()),
        }
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(state: &ServerState, request: Request<Body>) -> Response {
        router(state.clone(), None).oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn signup(state: &ServerState, path: &str, body: Value) -> String {
        let response = send(state, request(Method::POST, path, None, Some(body))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["session"]["id_token"].as_str().unwrap().to_string()
    }

    async fn signup_user(state: &ServerState) -> String {
        signup(
            state,
            "/user-signup",
            json!({
                "name": "Asha",
                "email": "asha@example.org",
                "password": "secret1",
                "contact": "98765 43210",
            }),
        )
        .await
    }

    fn report_form(image_size: usize) -> Body {
        let mut body = Vec::new();
        for (name, value) in [
            ("informant", "Asha"),
            ("contact", "98765 43210"),
            ("location_description", "Behind the market"),
            ("description", "Dog with an injured leg"),
            ("latitude", "19.07"),
            ("longitude", "72.87"),
        ] {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"dog.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend(std::iter::repeat(0xffu8).take(image_size));
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Body::from(body)
    }

    #[tokio::test]
    async fn user_is_turned_away_from_admin_dashboard() {
        let state = test_state();
        let token = signup_user(&state).await;

        let response = send(
            &state,
            request(Method::GET, "/admin-dashboard", Some(&token), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["error"], "access_denied");
        assert_eq!(body["redirect"], "/access-denied?from=%2Fadmin-dashboard");
        assert_eq!(body["sign_out"], true);
    }

    #[tokio::test]
    async fn anonymous_navigation_is_denied() {
        let state = test_state();

        let response = send(
            &state,
            request(Method::GET, "/navigate?path=%2Fngo-homepage", None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["state"], "denied");

        let response = send(
            &state,
            request(Method::GET, "/navigate?path=%2Fabout", None, None),
        )
        .await;
        assert_eq!(body_json(response).await["state"], "authorized");
    }

    #[tokio::test]
    async fn report_then_help_completes_the_report() {
        let state = test_state();
        let user_token = signup_user(&state).await;

        let response = send(
            &state,
            Request::builder()
                .method(Method::POST)
                .uri("/reports")
                .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(report_form(1024 * 1024))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["status"], "pending");
        let report_id = report["id"].as_str().unwrap().to_string();

        let ngo_token = signup(
            &state,
            "/ngo-signup",
            json!({
                "name": "Paws Shelter",
                "email": "paws@example.org",
                "password": "secret1",
                "contact": "0221234567",
                "address": "12 Shelter Road",
            }),
        )
        .await;

        let response = send(
            &state,
            request(
                Method::POST,
                &format!("/reports/{}/help", report_id),
                Some(&ngo_token),
                Some(json!({ "description_of_help": "Took the dog to the vet." })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        assert_eq!(record["reported_by_name"], "Asha");

        let reports = state.db.reports().list().await.unwrap();
        assert_eq!(reports[0].status, ReportStatus::Complete);
        assert_eq!(
            reports[0].ngo.as_ref().map(|ngo| ngo.name.as_str()),
            Some("Paws Shelter")
        );
        assert_eq!(state.db.help().list().await.unwrap().len(), 1);

        let response = send(
            &state,
            request(
                Method::POST,
                &format!("/reports/{}/help", report_id),
                Some(&ngo_token),
                Some(json!({ "description_of_help": "Again." })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let state = test_state();
        let token = signup_user(&state).await;

        let response = send(
            &state,
            Request::builder()
                .method(Method::POST)
                .uri("/reports")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(report_form(3 * 1024 * 1024))
                .unwrap(),
        )
        .await;
        assert!(response.status().is_client_error());
        assert!(state.db.reports().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn donations_need_a_positive_amount() {
        let state = test_state();
        let mut form = json!({
            "name": "Asha",
            "email": "asha@example.org",
            "phone": "9876543210",
            "address": "4 Lake View",
            "amount": "0",
            "payment_method": "upi",
        });

        let response = send(
            &state,
            request(Method::POST, "/donations", None, Some(form.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["fields"][0]["field"], "amount");
        assert!(state.db.donations().list().await.unwrap().is_empty());

        form["amount"] = json!("500");
        let response = send(&state, request(Method::POST, "/donations", None, Some(form))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let donations = state.db.donations().list().await.unwrap();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].status, DonationStatus::Success);
        assert_eq!(donations[0].user_id, "anonymous");
    }

    fn is_rfc3339(value: &Value) -> bool {
        value
            .as_str()
            .map_or(false, |raw| chrono::DateTime::parse_from_rfc3339(raw).is_ok())
    }

    #[tokio::test]
    async fn timestamps_are_rfc3339() {
        let state = test_state();
        let token = signup_user(&state).await;

        let response = send(
            &state,
            Request::builder()
                .method(Method::POST)
                .uri("/reports")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(report_form(1024))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert!(is_rfc3339(&report["timestamp"]), "{}", report["timestamp"]);

        let response = send(&state, request(Method::GET, "/user-homepage", Some(&token), None)).await;
        let dashboard = body_json(response).await;
        assert!(is_rfc3339(&dashboard["profile"]["created"]));
        assert!(is_rfc3339(&dashboard["reports"][0]["timestamp"]));
    }

    #[tokio::test]
    async fn login_requires_profile_in_role() {
        let state = test_state();
        signup_user(&state).await;
        let credentials = json!({ "email": "asha@example.org", "password": "secret1" });

        let response = send(
            &state,
            request(Method::POST, "/admin-login", None, Some(credentials.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["sign_out"], true);
        assert_eq!(body["redirect"], "/access-denied?from=%2Fadmin-dashboard");

        let response = send(
            &state,
            request(Method::POST, "/user-login", None, Some(credentials)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["redirect"], "/user-homepage");
        assert_eq!(body["profile"]["role"], "user");
    }

    #[tokio::test]
    async fn me_reports_primary_role() {
        let state = test_state();
        let token = signup_user(&state).await;

        let response = send(&state, request(Method::GET, "/me", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "user");
        assert_eq!(body["contact"], "98765 43210");
        assert_eq!(body["homepage"], "/user-homepage");

        let response = send(&state, request(Method::GET, "/me", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_without_endpoint_is_unavailable() {
        let state = test_state();
        let response = send(&state, request(Method::GET, "/chat?query=hello", None, None)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

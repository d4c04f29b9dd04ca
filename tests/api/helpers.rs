use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    get,
    middleware::{from_fn, Next},
    post, web, HttpResponse,
};
use ctf_web::{
    config,
    error::ApiError,
    response,
    routes::{RouteGroup, RouteGroups},
    session_state::SessionState,
    startup::App,
    telemetry,
};
use reqwest::{header, Client, Response};
use serde::Deserialize;
use std::{env, io, sync::LazyLock};
use uuid::Uuid;

const RQST_FAIL: &str = "Failed to execute request.";

const LOGGER_NAME: &str = "test";
const LOGGER_FILTER_LEVEL: &str = "info";

static TRACING: LazyLock<()> = LazyLock::new(TestApp::init_logging);

pub struct TestApp {
    pub addr: String,
    pub client: Client,
}

impl TestApp {
    /// Runs the app in the background at a random port
    /// with the failure-raising `/api/test` group mounted.
    pub async fn spawn() -> TestApp {
        LazyLock::force(&TRACING);

        let config = {
            let mut raw = config::get().expect("Failed to read configuration");
            // Use a random OS port
            raw.application.port = 0;
            raw
        };

        let groups = RouteGroups::standard().mount(RouteGroup::new("test", "/api/test", test_routes));
        let app = App::build(&config, groups).expect("Failed to build application.");
        let addr = format!("http://127.0.0.1:{}", app.addr().port());

        // Run the application as a background task
        tokio::spawn(app.run_until_stopped());

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build the http client.");

        TestApp { addr, client }
    }

    fn init_logging() {
        let subscriber: Box<dyn tracing::subscriber::Subscriber + Send + Sync> =
            if env::var("TEST_LOG").is_ok() {
                Box::new(telemetry::get_subscriber(
                    LOGGER_NAME,
                    LOGGER_FILTER_LEVEL,
                    io::stdout,
                ))
            } else {
                Box::new(telemetry::get_subscriber(
                    LOGGER_NAME,
                    LOGGER_FILTER_LEVEL,
                    io::sink,
                ))
            };

        telemetry::init_subscriber(subscriber)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.addr, path))
            .send()
            .await
            .expect(RQST_FAIL)
    }

    pub async fn get_time(&self) -> Response {
        self.get("/api/time").await
    }

    /// Marks the client's session as logged in.
    pub async fn login(&self) -> Response {
        self.client
            .post(format!("{}/api/test/login", self.addr))
            .send()
            .await
            .expect(RQST_FAIL)
    }

    pub async fn post_json(&self, path: &str, body: &str) -> Response {
        self.client
            .post(format!("{}{}", self.addr, path))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect(RQST_FAIL)
    }
}

#[derive(Deserialize, Debug)]
pub struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

pub async fn envelope(resp: Response) -> Envelope {
    resp.json().await.expect("Response body is not an API envelope.")
}

pub fn token_cookie(resp: &Response) -> Option<String> {
    resp.cookies()
        .find(|c| c.name() == "token")
        .map(|c| c.value().to_string())
}

pub fn assert_response_headers(resp: &Response) {
    let headers = resp.headers();
    assert_eq!(headers["Access-Control-Allow-Methods"], "GET, POST");
    assert_eq!(headers["Access-Control-Allow-Credentials"], "true");
    assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type, *");

    let cache_control: Vec<_> = headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert!(cache_control.contains(&"no-cache"));
    assert!(cache_control.contains(&"no-store"));
}

fn test_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(domain_failure)
        .service(web_failure)
        .service(internal_failure)
        .service(severe_failure)
        .service(unclassified_failure)
        .service(converted_failure)
        .service(echo)
        .service(
            web::scope("/guarded")
                .wrap(from_fn(refuse_everyone))
                .route("", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .service(
            web::scope("/members-only")
                .wrap(from_fn(refuse_anonymous))
                .route("", web::get().to(|| async { HttpResponse::Ok().finish() })),
        );
}

/// Scope middleware that fails before the handler runs.
async fn refuse_everyone(
    _req: ServiceRequest,
    _next: Next<impl MessageBody>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    Err(actix_web::error::ErrorInternalServerError(
        "password=hunter2 rejected by db.internal",
    ))
}

async fn refuse_anonymous(
    _req: ServiceRequest,
    _next: Next<impl MessageBody>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    Err(actix_web::error::ErrorUnauthorized("You must be logged in"))
}

#[post("/login")]
async fn login(session: SessionState) -> Result<HttpResponse, ApiError> {
    session.renew();
    session
        .user_id()
        .insert(Uuid::new_v4())
        .map_err(|e| ApiError::internal("Failed to log in", e))?;
    Ok(response::web_success("Logged in"))
}

#[get("/domain")]
async fn domain_failure() -> Result<HttpResponse, ApiError> {
    Err(
        ApiError::domain(actix_web::http::StatusCode::FORBIDDEN, "You are not on a team")
            .with_data(serde_json::json!({ "tid": null })),
    )
}

#[get("/web")]
async fn web_failure() -> Result<HttpResponse, ApiError> {
    Err(ApiError::web("Invalid team name").with_data(serde_json::json!(["name"])))
}

#[get("/internal")]
async fn internal_failure() -> Result<HttpResponse, ApiError> {
    Err(ApiError::internal(
        "Could not load the scoreboard",
        anyhow::anyhow!("connection refused by db.internal:5432"),
    ))
}

#[get("/severe")]
async fn severe_failure() -> Result<HttpResponse, ApiError> {
    Err(ApiError::severe(anyhow::anyhow!(
        "flag store corrupted at /var/lib/ctf/flags"
    )))
}

#[get("/unclassified")]
async fn unclassified_failure() -> Result<HttpResponse, actix_web::Error> {
    Err(actix_web::error::ErrorInternalServerError(
        "password=hunter2 rejected by db.internal",
    ))
}

#[get("/converted")]
async fn converted_failure() -> Result<HttpResponse, ApiError> {
    let scored: anyhow::Result<HttpResponse> =
        Err(anyhow::anyhow!("stack: frame 0 at scoring.rs:12"));
    Ok(scored?)
}

#[derive(Deserialize)]
struct EchoBody {
    message: String,
}

#[post("/echo")]
async fn echo(body: web::Json<EchoBody>) -> HttpResponse {
    response::web_success(body.0.message)
}

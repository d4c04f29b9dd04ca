use crate::{
    error::ApiError,
    session_state::{self, SessionState},
};
use actix_session::SessionExt;
use actix_web::{
    body::{BoxBody, MessageBody},
    cookie::Cookie,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{
        HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, CACHE_CONTROL,
    },
    middleware::Next,
    web::Data,
    HttpResponse,
};

/// Domain attribute for the `token` cookie, `None` for host-only cookies.
#[derive(Clone, Debug)]
pub struct SessionCookieDomain(pub Option<String>);

/// Runs on every response: sets the cross-origin and caching headers and
/// hands logged-in sessions their anti-forgery token cookie.
pub async fn after_request(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let session = SessionState::new(req.get_session());
    let domain = req
        .app_data::<Data<SessionCookieDomain>>()
        .and_then(|d| d.0.clone());

    let mut res = call_to_response(req, next).await;

    let headers = res.headers_mut();
    headers.append(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST"),
    );
    headers.append(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, *"),
    );
    headers.append(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.append(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if let Err(e) = set_token_cookie(&session, domain, res.response_mut()) {
        tracing::error!(error.cause_chain = ?e, "Failed to issue the anti-forgery token");
    }

    Ok(res)
}

fn set_token_cookie<B>(
    session: &SessionState,
    domain: Option<String>,
    response: &mut HttpResponse<B>,
) -> anyhow::Result<()> {
    if !session.is_logged_in()? {
        return Ok(());
    }

    let token = match session.token().get()? {
        Some(token) => token,
        None => {
            let token = session_state::new_token();
            session.token().insert(token.clone())?;
            token
        }
    };

    let mut cookie = Cookie::build("token", token).path("/");
    if let Some(domain) = domain {
        cookie = cookie.domain(domain);
    }
    response.add_cookie(&cookie.finish())?;
    Ok(())
}

/// Rewrites failures that did not come from an [`ApiError`] into the API's
/// error envelope. Server errors never expose their details.
pub async fn translate_uncaught(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let res = call_to_response(req, next).await;

    let translated = match res.response().error() {
        Some(e) if e.as_error::<ApiError>().is_none() => Some(if res.status().is_client_error() {
            ApiError::domain(res.status(), e.to_string())
        } else {
            ApiError::from(anyhow::anyhow!("{:?}", e))
        }),
        _ => None,
    };
    let Some(translated) = translated else {
        return Ok(res);
    };

    let (req, _) = res.into_parts();
    Ok(ServiceResponse::new(req, HttpResponse::from_error(translated)))
}

/// Errors returned by inner middleware become responses, so they still pass
/// through the response hook and the translation above.
async fn call_to_response(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> ServiceResponse<BoxBody> {
    let http_req = req.request().clone();
    match next.call(req).await {
        Ok(res) => res.map_into_boxed_body(),
        Err(e) => ServiceResponse::from_err(e, http_req),
    }
}

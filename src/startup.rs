use crate::{
    config::Settings,
    mail::Mailer,
    middleware::{after_request, translate_uncaught, SessionCookieDomain},
    routes::{get_time, not_found, RouteGroups},
};
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key, dev::Server, middleware::from_fn as mw_fn, web, web::Data, HttpServer,
};
use core::net::SocketAddr;
use secrecy::{ExposeSecret, SecretString};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

/// Shortest key `cookie::Key` accepts for signing and encrypting sessions.
const MIN_HMAC_SECRET_LEN: usize = 64;

pub struct App {
    server: Server,
    socket_addr: SocketAddr,
}

impl App {
    pub fn build(config: &Settings, groups: RouteGroups) -> anyhow::Result<Self> {
        if config.application.hmac_secret.expose_secret().len() < MIN_HMAC_SECRET_LEN {
            anyhow::bail!(
                "application.hmac_secret must be at least {MIN_HMAC_SECRET_LEN} bytes long"
            );
        }

        let listener =
            TcpListener::bind((config.application.host.clone(), config.application.port))?;
        let socket_addr = listener.local_addr()?;

        let mail_config = config.email.transport_config();
        let mailer = Mailer::new(&mail_config)?;
        if mailer.is_suppressed() {
            tracing::warn!(sender = %mailer.sender(), "Email is disabled, outbound mail is suppressed");
        }
        let cookie_domain =
            SessionCookieDomain(config.application.cookie_domain().map(str::to_string));

        let server = Self::get_server_runner(
            listener,
            mailer,
            cookie_domain,
            config.application.hmac_secret.clone(),
            config.application.cookie_secure,
            groups,
        )?;

        Ok(Self {
            server,
            socket_addr,
        })
    }

    fn get_server_runner(
        listener: TcpListener,
        mailer: Mailer,
        cookie_domain: SessionCookieDomain,
        hmac_secret: SecretString,
        cookie_secure: bool,
        groups: RouteGroups,
    ) -> anyhow::Result<Server> {
        let mailer = Data::new(mailer);
        let cookie_domain = Data::new(cookie_domain);
        let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());
        let server = HttpServer::new(move || {
            actix_web::App::new()
                .wrap(mw_fn(translate_uncaught))
                .wrap(mw_fn(after_request))
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                        .cookie_secure(cookie_secure)
                        .cookie_domain(cookie_domain.0.clone())
                        .build(),
                )
                .wrap(TracingLogger::default())
                .service(get_time)
                .configure(|cfg| groups.register(cfg))
                .default_service(web::to(not_found))
                .app_data(Data::clone(&mailer))
                .app_data(Data::clone(&cookie_domain))
        })
        .listen(listener)?
        .run();

        Ok(server)
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket_addr
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        self.server.await?;
        Ok(())
    }
}

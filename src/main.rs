use ctf_web::{config, routes::RouteGroups, startup::App, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // telemetry
    let subscriber = telemetry::get_subscriber("ctf-web", "info", std::io::stdout);
    telemetry::init_subscriber(subscriber);

    // config
    let config = config::get().map_err(|e| anyhow::anyhow!("Failed to read configuration: {e}"))?;

    let app = App::build(&config, RouteGroups::standard())?;
    tracing::info!(addr = %app.addr(), "Serving the API");
    app.run_until_stopped().await
}

use std::sync::Arc;

use actix_web::{middleware as actix_middleware, web, App, HttpServer};

use poll_server::{
    auth_token::AuthTokenService,
    config::ServerConfig,
    routes,
    state::{AppState, AuthSettings},
    store::RestStore,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting poll server...");
    log::info!("Protocol version: {}", poll_protocol::protocol_version());

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "server/config/server.toml".to_string());

    let config = ServerConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load server configuration from '{}': {}", config_path, e);
        eprintln!("Hint: PASSPHRASE, SUPABASE_URL and SUPABASE_KEY must be set in the file or the environment");
        std::process::exit(1);
    });
    log::debug!("Configuration: {:?}", config);

    let store = RestStore::new(&config.store.url, &config.store.key, config.store_timeout())
        .unwrap_or_else(|e| {
            eprintln!("Failed to build store client: {}", e);
            std::process::exit(1);
        });
    log::info!("Using store at {}", store.rest_url());

    let tokens = AuthTokenService::new(config.auth.passphrase.as_bytes().to_vec(), config.session_ttl())
        .unwrap_or_else(|e| {
            eprintln!("Failed to set up token signing: {}", e);
            std::process::exit(1);
        });

    let settings = AuthSettings::from(&config);
    log::info!(
        "Session tokens carried by {:?}, valid for {}s; CSRF on reads: {}",
        settings.carrier,
        tokens.ttl().as_secs(),
        settings.csrf_protect_reads
    );

    let state = web::Data::new(AppState::new(Arc::new(store), tokens, settings));

    let (host, port) = (config.http.host.clone(), config.http.port);
    log::info!("Starting HTTP server at {}:{}...", host, port);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(actix_middleware::Logger::default())
            .configure(move |cfg| routes::configure(cfg, state))
    })
    .bind((host, port))?
    .run()
    .await
}

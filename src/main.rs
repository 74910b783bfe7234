use clap::Parser;
use foodhive::cli::{
    Args, build_config, init_logging, load_signing_secrets, open_database,
    validate_allowed_origins,
};
use foodhive::db::StoreGate;
use foodhive::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_format);

    let Some((access_secret, refresh_secret)) = load_signing_secrets(
        args.access_secret_file.as_deref(),
        args.refresh_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(allowed_origins) = validate_allowed_origins(&args.allowed_origins, args.environment)
    else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    // The store is installed before the first request is accepted.
    let store = StoreGate::pending();
    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };
    store.install(db);

    let config = build_config(
        store,
        access_secret,
        refresh_secret,
        args.environment,
        allowed_origins,
        args.rotate_refresh_tokens,
    );

    info!(
        address = %local_addr,
        environment = ?args.environment,
        rotate_refresh_tokens = args.rotate_refresh_tokens,
        "Food Hive Server is running"
    );

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

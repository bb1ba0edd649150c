use std::{process, sync::Arc};

use qoptions::{
    application::{
        error::AppError,
        lookup::LookupService,
        records::AdminRecordService,
        repos::{TextsRepo, ValueRecordsRepo},
    },
    cache::{CacheConfig, OptionCache},
    config::{self, StorageBackend},
    domain::language::SupportedLanguages,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::MemoryRepositories,
        telemetry,
    },
};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (values, texts, db) = init_records(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = OptionCache::from_config(&cache_config);
    info!(
        target = "qoptions::serve",
        cache_enabled = cache_config.enabled,
        cache_backend = cache_config.backend.as_str(),
        default_language = %settings.i18n.default_language,
        languages = settings.i18n.languages.len(),
        "Lookup cache configured"
    );

    let lookup = LookupService::new(values.clone(), texts.clone())
        .with_cache_opt(cache.clone())
        .with_create_missing_items(settings.options.create_missing_items);
    let records = AdminRecordService::new(values, texts).with_cache_opt(cache);

    let state = HttpState {
        lookup: Arc::new(lookup),
        records: Arc::new(records),
        languages: SupportedLanguages::new(
            settings.i18n.default_language.clone(),
            settings.i18n.languages.iter().cloned(),
        ),
        db,
    };

    serve_http(&settings, state).await
}

type RecordStores = (
    Arc<dyn ValueRecordsRepo>,
    Arc<dyn TextsRepo>,
    Option<Arc<PostgresRepositories>>,
);

async fn init_records(settings: &config::Settings) -> Result<RecordStores, AppError> {
    match settings.storage.backend {
        StorageBackend::Postgres => {
            let repositories = init_postgres(settings).await?;
            let values: Arc<dyn ValueRecordsRepo> = repositories.clone();
            let texts: Arc<dyn TextsRepo> = repositories.clone();
            Ok((values, texts, Some(repositories)))
        }
        StorageBackend::Memory => {
            warn!(
                target = "qoptions::serve",
                "Using in-memory record store; records are lost on restart"
            );
            let repositories = Arc::new(MemoryRepositories::new());
            let values: Arc<dyn ValueRecordsRepo> = repositories.clone();
            let texts: Arc<dyn TextsRepo> = repositories;
            Ok((values, texts, None))
        }
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_postgres(&settings).await?;
    info!(target = "qoptions::migrate", "Migrations applied");
    Ok(())
}

async fn init_postgres(settings: &config::Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let public_router = http::build_public_router(state.clone());
    let admin_router = http::build_admin_router(state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(InfraError::from)?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "qoptions::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use webook::{
    application::{
        articles::{ArticleRepository, RepositoryConfig},
        authors::CachedAuthorDirectory,
        background::{BackgroundConfig, BackgroundTasks},
        service::ArticleService,
    },
    cache::{self, ArticleCache, CacheBackend, CacheConfig, RedisCacheStore},
    config,
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
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

async fn run() -> Result<(), InfraError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Migrate(_) => run_migrate(&settings).await,
        config::Command::Check(_) => run_check(&settings).await,
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), InfraError> {
    let repositories = connect(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    info!("database migrations applied");
    Ok(())
}

async fn run_check(settings: &config::Settings) -> Result<(), InfraError> {
    let repositories = connect(settings).await?;
    repositories
        .health_check()
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    let cache_config = CacheConfig::from(&settings.cache);
    if cache_config.backend == CacheBackend::Redis {
        let url = cache_config
            .redis_url
            .as_deref()
            .ok_or_else(|| InfraError::configuration("cache.redis_url is not configured"))?;
        let redis = RedisCacheStore::connect(url, cache_config.key_prefix.clone())
            .map_err(|err| InfraError::cache(err.to_string()))?;
        redis
            .health_check()
            .await
            .map_err(|err| InfraError::cache(err.to_string()))?;
    }

    let service = build_article_service(repositories, settings)?;
    info!(
        backend = ?cache_config.backend,
        background_in_flight = service.repository().tasks().in_flight(),
        "article service ready"
    );
    Ok(())
}

async fn connect(settings: &config::Settings) -> Result<PostgresRepositories, InfraError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(PostgresRepositories::new(pool))
}

fn build_article_service(
    repositories: PostgresRepositories,
    settings: &config::Settings,
) -> Result<ArticleService, InfraError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = cache::build_store(&cache_config).map_err(|err| InfraError::cache(err.to_string()))?;
    let article_cache = ArticleCache::new(store, cache_config.expiry);
    let tasks = BackgroundTasks::new(BackgroundConfig::from(&settings.articles));

    let repositories = Arc::new(repositories);
    let authors = Arc::new(CachedAuthorDirectory::new(
        repositories.clone(),
        article_cache.clone(),
        tasks.clone(),
    ));
    let repository = ArticleRepository::new(
        repositories,
        article_cache,
        authors,
        tasks,
        RepositoryConfig::from(&settings.articles),
    );

    Ok(ArticleService::new(repository))
}

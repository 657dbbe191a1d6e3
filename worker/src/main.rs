use anyhow::Result;
use backend::{
    config::config_model::reconciler_config, usecases::reconciler::StatusReconciler,
};
use crates::{
    domain::repositories::jobs::JobRepository,
    infra::{
        db::{
            postgres::postgres_connection,
            repositories::{jobs::JobPostgres, payments::PaymentPostgres},
        },
        email::http_notifier::HttpEmailNotifier,
    },
    payments::gateway_client::GatewayClient,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config,
    status_polling::{self, worker::StatusPollHandler},
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let job_postgres = Arc::new(JobPostgres::new(Arc::clone(&db_pool_arc)));
    let job_repository: Arc<dyn JobRepository + Send + Sync> = job_postgres.clone();

    let reconciler: Arc<dyn StatusPollHandler + Send + Sync> = Arc::new(StatusReconciler::new(
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(GatewayClient::new(dotenvy_env.gateway.client.clone())?),
        job_postgres,
        Arc::new(HttpEmailNotifier::new(dotenvy_env.email.clone())?),
        reconciler_config(&dotenvy_env.poll, &dotenvy_env.gateway),
    ));

    let status_poll_loop = tokio::spawn(status_polling::worker::run(
        job_repository,
        reconciler,
        dotenvy_env.status_polling.clone(),
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let health_server = tokio::spawn(async move { axum_http::http_serve::start(server_config).await });

    tokio::select! {
        result = status_poll_loop => result??,
        result = health_server => result??,
    };
    Ok(())
}

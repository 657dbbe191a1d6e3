use crate::{
    axum_http::{default_routers, routers},
    config::config_model::{DotEnvyConfig, reconciler_config},
    usecases::{
        cancel_refund::CancelRefundUseCase, payments::PaymentUseCase, reconciler::StatusReconciler,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                jobs::JobPostgres, payments::PaymentPostgres,
                saved_payment_methods::SavedPaymentMethodPostgres,
            },
        },
        email::http_notifier::HttpEmailNotifier,
    },
    payments::gateway_client::GatewayClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let saved_method_repository = Arc::new(SavedPaymentMethodPostgres::new(Arc::clone(&db_pool)));
    let job_repository = Arc::new(JobPostgres::new(Arc::clone(&db_pool)));
    let gateway = Arc::new(GatewayClient::new(config.gateway.client.clone())?);
    let notifier = Arc::new(HttpEmailNotifier::new(config.email.clone())?);

    let reconciler = Arc::new(StatusReconciler::new(
        Arc::clone(&payment_repository),
        Arc::clone(&gateway),
        job_repository,
        Arc::clone(&notifier),
        reconciler_config(&config.poll, &config.gateway),
    ));
    let payment_usecase = Arc::new(PaymentUseCase::new(
        Arc::clone(&payment_repository),
        saved_method_repository,
        Arc::clone(&gateway),
        reconciler.poller(),
        config.payments.clone(),
    ));
    let cancel_refund_usecase = Arc::new(CancelRefundUseCase::new(
        payment_repository,
        gateway,
        notifier,
    ));

    let payments_api = Router::new()
        .merge(routers::payments::routes(Arc::clone(&payment_usecase)))
        .merge(routers::charges::routes(
            Arc::clone(&payment_usecase),
            Arc::clone(&cancel_refund_usecase),
        ))
        .merge(routers::subscriptions::routes(
            payment_usecase,
            cancel_refund_usecase,
        ))
        .merge(routers::webhooks::routes(reconciler));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/payments", payments_api)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static(routers::webhooks::SIGNATURE_HEADER),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

//! Fraud Prediction Service - Main Entry Point
//!
//! Loads the preprocessing artifacts and classifiers once, then answers form
//! commands received over NATS request/reply.

use anyhow::Result;
use fraud_prediction_service::{
    config::{AppConfig, LoggingConfig},
    handler::Response,
    metrics::{MetricsReporter, ServiceMetrics},
    registry::ModelRegistry,
    service::{self, FormService, Outcome},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level))
        .add_directive(format!("fraud_prediction_service={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration comes first so the log format can follow it
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Prediction Service");
    info!(
        artifacts = %config.artifacts.dir,
        models = config.models.len(),
        "Configuration loaded successfully"
    );

    // Every artifact is loaded before the first request is accepted
    let registry = Arc::new(ModelRegistry::load(&config.artifacts, &config.models)?);
    info!(
        "Inference engine initialized with {} models: {:?}",
        registry.engine().model_count(),
        registry.engine().model_names()
    );

    let metrics = Arc::new(ServiceMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let service = FormService::new(client, &config.nats.request_subject);

    let num_workers = config.pipeline.workers;
    info!(
        "Serving form requests on '{}' with {} parallel workers",
        service.subject(),
        num_workers
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));

    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let mut subscription = service.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let registry = registry.clone();
        let service = service.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let served = service::serve(&registry, &message.payload);
            let processing_time = start_time.elapsed();

            metrics.record_request(served.command, processing_time);
            metrics.record_model_times(&served.timings);
            match &served.reply.outcome {
                Outcome::Ok(Response::Prediction(report)) => {
                    metrics.record_prediction(&report.results, report.comparison.agree);
                    debug!(
                        request_id = %served.reply.request_id,
                        fraud_votes = report.comparison.fraud_votes,
                        models = report.comparison.total,
                        processing_time_us = processing_time.as_micros(),
                        "Prediction served"
                    );
                }
                Outcome::Ok(_) => {}
                Outcome::Rejected { .. } => metrics.record_rejection(),
                Outcome::Failed { .. } => metrics.record_failure(),
            }

            match message.reply {
                Some(inbox) => {
                    if let Err(e) = service.respond(inbox, &served.reply).await {
                        error!(
                            request_id = %served.reply.request_id,
                            error = %e,
                            "Failed to publish reply"
                        );
                    }
                }
                None => {
                    warn!(
                        request_id = %served.reply.request_id,
                        "Request carried no reply subject, dropping reply"
                    );
                }
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

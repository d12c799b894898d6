//! Request and model statistics for the prediction service.

use crate::models::inference::ModelTiming;
use crate::types::prediction::PredictionResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;
const MAX_MODEL_SAMPLES: usize = 1_000;

/// Metrics collector for the service
pub struct ServiceMetrics {
    /// Total requests handled
    pub requests: AtomicU64,
    /// Predictions served
    pub predictions: AtomicU64,
    /// Submissions rejected by validation
    pub rejected: AtomicU64,
    /// Requests that failed for deployment reasons
    pub failed: AtomicU64,
    /// Predictions where every model chose the same class
    pub agreements: AtomicU64,
    /// Requests by command
    by_command: RwLock<HashMap<String, u64>>,
    /// Handling times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Model inference times (in microseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Fraud decisions per model
    fraud_flags: RwLock<HashMap<String, u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            agreements: AtomicU64::new(0),
            by_command: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            model_times: RwLock::new(HashMap::new()),
            fraud_flags: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a handled request
    pub fn record_request(&self, command: Option<&str>, processing_time: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_command) = self.by_command.write() {
            *by_command
                .entry(command.unwrap_or("malformed").to_string())
                .or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the model outputs of one prediction
    pub fn record_prediction(&self, results: &[PredictionResult], agree: bool) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if agree {
            self.agreements.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut flags) = self.fraud_flags.write() {
            for result in results {
                let count = flags.entry(result.model_key.clone()).or_insert(0);
                if result.predicted_class.is_fraud() {
                    *count += 1;
                }
            }
        }
    }

    /// Record model inference times
    pub fn record_model_times(&self, timings: &[ModelTiming]) {
        if let Ok(mut times) = self.model_times.write() {
            for timing in timings {
                let model_times = times.entry(timing.model_key.clone()).or_default();
                model_times.push(timing.elapsed.as_micros() as u64);
                if model_times.len() > MAX_MODEL_SAMPLES {
                    model_times.drain(0..MAX_MODEL_SAMPLES / 2);
                }
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        match self.processing_times.read() {
            Ok(times) => ProcessingStats::from_samples(&times),
            Err(_) => ProcessingStats::default(),
        }
    }

    /// Get model performance stats
    pub fn get_model_stats(&self) -> HashMap<String, ProcessingStats> {
        let Ok(times) = self.model_times.read() else {
            return HashMap::new();
        };

        times
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(model, samples)| (model.clone(), ProcessingStats::from_samples(samples)))
            .collect()
    }

    /// Fraction of predictions where the models agreed
    pub fn get_agreement_rate(&self) -> f64 {
        let predictions = self.predictions.load(Ordering::Relaxed);
        if predictions == 0 {
            return 0.0;
        }
        self.agreements.load(Ordering::Relaxed) as f64 / predictions as f64
    }

    /// Get fraud decisions per model
    pub fn get_fraud_flags(&self) -> HashMap<String, u64> {
        self.fraud_flags
            .read()
            .map(|flags| flags.clone())
            .unwrap_or_default()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let predictions = self.predictions.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            requests = requests,
            predictions = predictions,
            rejected = rejected,
            failed = failed,
            throughput = format!("{:.1} req/s", self.get_throughput()),
            agreement = format!("{:.1}%", self.get_agreement_rate() * 100.0),
            "Service metrics"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Request handling time"
        );

        if let Ok(by_command) = self.by_command.read() {
            for (command, count) in by_command.iter() {
                info!(command = %command, count = count, "Requests by command");
            }
        }

        let flags = self.get_fraud_flags();
        for (model, stats) in &self.get_model_stats() {
            let flagged = flags.get(model).copied().unwrap_or(0);
            let rate = if predictions > 0 {
                flagged as f64 / predictions as f64 * 100.0
            } else {
                0.0
            };
            info!(
                model = %model,
                calls = stats.count,
                mean_us = stats.mean_us,
                p99_us = stats.p99_us,
                fraud_rate = format!("{:.1}%", rate),
                "Model statistics"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics over a window of samples
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl ProcessingStats {
    fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        Self {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

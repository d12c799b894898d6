//! Form Submission Tool
//!
//! Generates form submissions from the deployed encoder vocabularies and sends
//! them to the prediction service over NATS request/reply.

use anyhow::Context;
use fraud_prediction_service::{
    artifacts::LabelEncoder,
    config::ArtifactsConfig,
    service::{Outcome, Reply},
    Command, Response, TransactionInput,
};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Submission generator drawing categorical values from the encoders
struct SubmissionGenerator {
    rng: rand::rngs::ThreadRng,
    categories: Vec<String>,
    genders: Vec<String>,
    jobs: Vec<String>,
}

impl SubmissionGenerator {
    fn load(artifacts: &ArtifactsConfig) -> anyhow::Result<Self> {
        let classes = |file: &str, field: &'static str| -> anyhow::Result<Vec<String>> {
            let encoder = LabelEncoder::load(artifacts.path(file), field)?;
            Ok(encoder.classes().to_vec())
        };

        Ok(Self {
            rng: rand::thread_rng(),
            categories: classes(&artifacts.category_encoder, "category")?,
            genders: classes(&artifacts.gender_encoder, "gender")?,
            jobs: classes(&artifacts.job_encoder, "job")?,
        })
    }

    /// Everyday purchase near home
    fn generate_legitimate(&mut self) -> TransactionInput {
        let mut input = self.base();
        input.amount = (self.rng.gen_range(5.0..200.0_f64) * 100.0).round() / 100.0;
        input.hour = self.rng.gen_range(8..22);
        input.age = self.rng.gen_range(25..70);
        input.distance_km = self.rng.gen_range(0.0..30.0);
        input
    }

    /// Large late-night purchase far from home
    fn generate_suspicious(&mut self) -> TransactionInput {
        let mut input = self.base();
        input.amount = (self.rng.gen_range(500.0..1500.0_f64) * 100.0).round() / 100.0;
        input.hour = self.rng.gen_range(0..4);
        input.age = self.rng.gen_range(18..100);
        input.distance_km = self.rng.gen_range(100.0..150.0);
        input
    }

    fn base(&mut self) -> TransactionInput {
        let category = random_choice(&mut self.rng, &self.categories);
        let gender = random_choice(&mut self.rng, &self.genders);
        let job = random_choice(&mut self.rng, &self.jobs);
        let mut input = TransactionInput::new(category, gender, job);
        input.city_population = self.rng.gen_range(100..2_000_000);
        input
    }
}

fn random_choice<'a>(rng: &mut impl Rng, choices: &'a [String]) -> &'a str {
    &choices[rng.gen_range(0..choices.len())]
}

/// Share of suspicious submissions; must lie in [0, 1]
fn parse_fraud_rate(arg: Option<&str>) -> anyhow::Result<f64> {
    let Some(arg) = arg else {
        return Ok(0.2);
    };
    let rate: f64 = arg
        .parse()
        .with_context(|| format!("Invalid fraud rate '{}'", arg))?;
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("Fraud rate must be between 0 and 1, got {}", rate);
    }
    Ok(rate)
}

fn summarize(reply: &Reply) {
    match &reply.outcome {
        Outcome::Ok(Response::Prediction(report)) => {
            for card in &report.cards {
                info!(
                    request_id = %reply.request_id,
                    model = %card.model_name,
                    label = %card.label,
                    probability = %card.probability_text,
                    "Prediction"
                );
            }
        }
        Outcome::Ok(_) => info!(request_id = %reply.request_id, "Page served"),
        Outcome::Rejected { kind, message } => {
            warn!(request_id = %reply.request_id, kind = %kind, message = %message, "Submission rejected")
        }
        Outcome::Failed { kind, message } => {
            warn!(request_id = %reply.request_id, kind = %kind, message = %message, "Request failed")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_form=info".parse()?),
        )
        .init();

    info!("Starting Form Submission Tool");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.form");
    let artifact_dir = args.get(3).map(|s| s.as_str()).unwrap_or("models");
    let count: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(20);
    let fraud_rate = parse_fraud_rate(args.get(5).map(|s| s.as_str()))?;
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(250);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        artifact_dir = %artifact_dir,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let artifacts = ArtifactsConfig {
        dir: artifact_dir.to_string(),
        ..ArtifactsConfig::default()
    };
    let mut generator =
        SubmissionGenerator::load(&artifacts).context("Failed to load label encoders")?;

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&mut generator, count, fraud_rate, delay_ms).await;
        }
    };

    let mut rng = rand::thread_rng();
    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let input = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&Command::Predict(input))?;
        let message = client.request(subject.to_string(), payload.into()).await?;

        match serde_json::from_slice::<Reply>(&message.payload) {
            Ok(reply) => summarize(&reply),
            Err(e) => warn!(error = %e, "Failed to decode reply"),
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Submitted {}/{} forms ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Submitted {} forms ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(
    generator: &mut SubmissionGenerator,
    count: u64,
    fraud_rate: f64,
    delay_ms: u64,
) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut rng = rand::thread_rng();

    for i in 0..count {
        let input = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&Command::Predict(input))?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample submission {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraud_rate() {
        assert_eq!(parse_fraud_rate(None).unwrap(), 0.2);
        assert_eq!(parse_fraud_rate(Some("0")).unwrap(), 0.0);
        assert_eq!(parse_fraud_rate(Some("1.0")).unwrap(), 1.0);
        assert_eq!(parse_fraud_rate(Some("0.35")).unwrap(), 0.35);
    }

    #[test]
    fn test_out_of_range_fraud_rate_is_rejected() {
        for arg in ["1.5", "-0.1", "NaN", "often"] {
            assert!(parse_fraud_rate(Some(arg)).is_err(), "{} accepted", arg);
        }
    }
}

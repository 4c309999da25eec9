//! Driftwatch CLI module
//!
//! Command-line interface for running the service and for generating
//! synthetic prediction traffic against a running instance.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{info, warn};

use crate::server::{run_server, ServerConfig};

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Online inference service with automatic input-drift monitoring")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the inference server with background drift monitoring
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Bind port
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Send synthetic prediction traffic to a running server
    Simulate {
        /// Base URL of the server
        #[arg(long, default_value = "http://localhost:8000")]
        url: String,

        /// Traffic mode (normal, drift)
        #[arg(short, long, default_value = "normal")]
        mode: String,

        /// Number of requests to send
        #[arg(short, long, default_value = "50")]
        steps: usize,
    },
}

pub async fn cmd_serve(host: &str, port: u16) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.to_string(),
        port,
        ..Default::default()
    };
    run_server(config).await
}

pub async fn cmd_simulate(url: &str, mode: &str, steps: usize) -> anyhow::Result<()> {
    let drifted = match mode {
        "normal" => false,
        "drift" => true,
        other => anyhow::bail!("unknown mode '{}', expected 'normal' or 'drift'", other),
    };

    let client = reqwest::Client::new();
    let endpoint = format!("{}/predict", url.trim_end_matches('/'));
    info!(mode, steps, endpoint = %endpoint, "starting traffic simulation");

    for step in 1..=steps {
        let features = generate_sample(drifted);
        match client.post(&endpoint).json(&features).send().await {
            Ok(response) => {
                info!(step, total = steps, status = %response.status(), "request sent");
            }
            Err(e) => {
                warn!(step, total = steps, error = %e, "request failed");
            }
        }

        // Irregular pacing to resemble real traffic.
        let pause = rand::thread_rng().gen_range(100..500);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }

    info!(
        "simulation complete; POST /monitor/trigger_now for an immediate report \
         or wait for the next scheduled run"
    );
    Ok(())
}

/// One synthetic iris-like sample, drawn from the same mixture as the
/// reference baseline. Drifted mode shifts three features by amounts large
/// relative to their spread, resembling a sensor fault.
fn generate_sample(drifted: bool) -> BTreeMap<String, f64> {
    let mut rng = rand::thread_rng();
    let class = rng.gen_range(0..3usize);

    let mut sepal_length = [5.0, 5.9, 6.6][class] + rng.gen::<f64>() * 0.8;
    let mut sepal_width = [3.4, 2.8, 3.0][class] + rng.gen::<f64>() * 0.5;
    let mut petal_length = [1.4, 4.3, 5.5][class] + rng.gen::<f64>() * 0.5;
    let petal_width = [0.2, 1.3, 2.0][class] + rng.gen::<f64>() * 0.3;

    if drifted {
        sepal_length += 2.5;
        sepal_width -= 1.0;
        petal_length += 3.0;
    }

    let mut features = BTreeMap::new();
    features.insert("sepal_length".to_string(), sepal_length);
    features.insert("sepal_width".to_string(), sepal_width);
    features.insert("petal_length".to_string(), petal_length);
    features.insert("petal_width".to_string(), petal_width);
    features
}

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client for the payment failover service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key (needed for `status` and `breaker`).
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one payment
    Pay,
    /// Show service status
    Status,
    /// Show the circuit breaker snapshot
    Breaker,
    /// Drive `/pay` with concurrent virtual users
    Load {
        /// Concurrent virtual users
        #[arg(long, default_value_t = 10)]
        users: usize,

        /// How long each user keeps paying
        #[arg(long, default_value_t = 60)]
        duration_secs: u64,

        /// Pause between a user's requests
        #[arg(long, default_value_t = 1000)]
        pause_ms: u64,

        /// Users start staggered over this many seconds and stop the same way
        #[arg(long, default_value_t = 0)]
        ramp_secs: u64,
    },
}

#[derive(Debug, Default)]
struct LoadReport {
    total: usize,
    ok: usize,
    failed: usize,
    errors: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    match cli.command {
        Commands::Pay => {
            let res = client.post(format!("{}/pay", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Breaker => {
            let res = client
                .get(format!("{}/admin/breaker", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Load {
            users,
            duration_secs,
            pause_ms,
            ramp_secs,
        } => {
            let report = run_load(
                &client,
                &cli.url,
                users,
                Duration::from_secs(duration_secs),
                Duration::from_millis(pause_ms),
                Duration::from_secs(ramp_secs),
            )
            .await?;

            println!("\n--- Load Results ---");
            println!("Virtual users:  {}", users);
            println!("Total requests: {}", report.total);
            println!("Status 200:     {}", report.ok);
            println!("Status 5xx/4xx: {}", report.failed);
            println!("Transport errs: {}", report.errors);
            if report.total > 0 {
                println!(
                    "Success rate:   {:.2}%",
                    report.ok as f64 * 100.0 / report.total as f64
                );
            }
            println!("--------------------\n");
        }
    }

    Ok(())
}

async fn run_load(
    client: &reqwest::Client,
    base_url: &str,
    users: usize,
    duration: Duration,
    pause: Duration,
    ramp: Duration,
) -> Result<LoadReport, Box<dyn std::error::Error>> {
    let url = format!("{}/pay", base_url);
    let start = Instant::now();
    let deadline = start
        .checked_add(duration)
        .ok_or("load duration is too large")?;
    let ramp = ramp.min(duration / 2);

    let tasks = (0..users).map(|user| {
        let client = client.clone();
        let url = url.clone();
        let offset = ramp_offset(ramp, user, users);
        let stop_at = deadline.checked_sub(offset).unwrap_or(start);
        tokio::spawn(async move {
            tokio::time::sleep(offset).await;
            let mut report = LoadReport::default();
            while Instant::now() < stop_at {
                report.total += 1;
                match client.get(&url).send().await {
                    Ok(res) if res.status().as_u16() == 200 => report.ok += 1,
                    Ok(_) => report.failed += 1,
                    Err(_) => report.errors += 1,
                }
                tokio::time::sleep(pause).await;
            }
            report
        })
    });

    let mut total = LoadReport::default();
    for result in join_all(tasks).await {
        match result {
            Ok(report) => {
                total.total += report.total;
                total.ok += report.ok;
                total.failed += report.failed;
                total.errors += report.errors;
            }
            Err(e) => eprintln!("Virtual user task failed: {}", e),
        }
    }
    Ok(total)
}

/// How long after the start user `user` begins, and how long before the end it stops.
fn ramp_offset(ramp: Duration, user: usize, users: usize) -> Duration {
    ramp.mul_f64(user as f64 / users as f64)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_oversized_duration_is_an_error() {
        let client = reqwest::Client::new();
        let result = run_load(
            &client,
            "http://127.0.0.1:1",
            1,
            Duration::from_secs(u64::MAX),
            Duration::ZERO,
            Duration::ZERO,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_ramp_staggers_users_evenly() {
        let ramp = Duration::from_secs(10);
        assert_eq!(ramp_offset(ramp, 0, 4), Duration::ZERO);
        assert_eq!(ramp_offset(ramp, 2, 4), Duration::from_secs(5));
        assert!(ramp_offset(ramp, 3, 4) < ramp);
        assert_eq!(ramp_offset(Duration::ZERO, 3, 4), Duration::ZERO);
    }
}

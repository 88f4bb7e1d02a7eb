use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use action_ratelimit::config::{LoggingConfig, ServiceConfig};
use action_ratelimit::ratelimit::{ActionIdentity, InMemoryCounterStore, RateLimiter, Request};

/// Replay a stream of requests against a rate limit configuration.
#[derive(Parser, Debug)]
#[command(name = "action-ratelimit", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: String,

    /// HTTP method of the simulated requests
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Request path of the simulated requests
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Controller the requests are routed to
    #[arg(long, default_value = "")]
    controller: String,

    /// Action the requests are routed to
    #[arg(long, default_value = "")]
    action: String,

    /// Number of requests to send
    #[arg(short = 'n', long, default_value_t = 1)]
    requests: u32,

    /// Pause between requests in milliseconds
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config_with(&args.config, default_filter("info"), std::io::stderr)?;
    init_tracing(&config.logging);

    info!(
        path_limits = config.rate_limiting.path_limits.len(),
        action_limits = config.rate_limiting.action_limits.len(),
        enabled = config.rate_limiting.enabled,
        "Configuration loaded"
    );

    let store = Arc::new(InMemoryCounterStore::new());
    let limiter = RateLimiter::from_config(&config.rate_limiting, store);
    let action = ActionIdentity::new(&args.controller, &args.action);

    for sequence in 1..=args.requests {
        let mut request = Request::new(&args.method, args.path.clone());
        let decision = limiter.evaluate(&mut request, &action).await?;

        println!(
            "{}",
            serde_json::json!({
                "request": sequence,
                "method": request.method(),
                "path": request.path(),
                "decision": decision,
            })
        );

        if args.interval_ms > 0 && sequence < args.requests {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    Ok(())
}

/// Load the configuration with a temporary subscriber installed, so messages
/// logged while loading are not dropped before [`init_tracing`] runs.
fn load_config_with<W>(path: &str, filter: EnvFilter, writer: W) -> anyhow::Result<ServiceConfig>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .finish();

    let config = tracing::subscriber::with_default(bootstrap, || ServiceConfig::load(path))?;
    Ok(config)
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(default_filter(&logging.level))
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::{self, Write};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_loading_is_logged() {
        let path = std::env::temp_dir().join(format!("action-ratelimit-main-{}.yaml", std::process::id()));
        std::fs::write(&path, "rate_limiting: { on_store_failure: fail_open }\n").unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let loaded = load_config_with(path.to_str().unwrap(), EnvFilter::new("info"), move || writer.clone());
        std::fs::remove_file(&path).unwrap();

        assert!(loaded.unwrap().rate_limiting.enabled);
        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("Loading configuration"), "captured: {}", output);
    }

    #[test]
    fn test_config_load_failure_is_returned() {
        let captured = Captured::default();
        let writer = captured.clone();
        let result = load_config_with(
            "/nonexistent/action-ratelimit.yaml",
            EnvFilter::new("info"),
            move || writer.clone(),
        );

        assert!(result.is_err());
        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(output.contains("Loading configuration"));
    }
}

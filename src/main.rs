use std::process;

use keyword_relay::{
    BotConfig, HttpTransport, Poller, PollerOptions, Result, SubscriptionStore, BOT_VERSION,
    DEFAULT_SECRETS_PATH,
};
use tracing::{error, info};

/// Snapshot file holding the subscriber to keyword mapping.
const SNAPSHOT_PATH: &str = "dados_palavras.json";

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

fn run() -> Result<()> {
    let config = BotConfig::load(DEFAULT_SECRETS_PATH)?;
    let store = SubscriptionStore::open(SNAPSHOT_PATH)?;

    let options = PollerOptions::default();
    let transport = HttpTransport::new(&config.token, options.fetch_timeout)?;

    info!("relay starting (version {})", BOT_VERSION);
    let mut poller = Poller::with_options(transport, store, config.channel, options);
    poller.run();
    Ok(())
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        error!("startup failed: {}", e);
        process::exit(1);
    }
}

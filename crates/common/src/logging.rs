use tracing::*;

pub fn init() {
    let filt = tracing_subscriber::EnvFilter::from_default_env();
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filt)
        .try_init();
    info!("logging started");
}

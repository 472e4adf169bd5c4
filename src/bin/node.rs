use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    std::process::exit(ledger_core::cli::exit_code(ledger_core::cli::run()));
}

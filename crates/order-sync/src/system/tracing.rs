//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! Module paths are hidden (`with_target(false)`); the structured fields carry the context
//! instead: `order_id`, `status`, `agent`, `kind`, `expected_version`.
//!
//! ```bash
//! RUST_LOG=info cargo run      # writes and rejected intents
//! RUST_LOG=debug cargo run     # plus store requests, cache saves and event fan-out
//! RUST_LOG=order_sync::sync=debug cargo run
//! ```
//!
//! Call it once, at the start of `main`. Library code never installs a subscriber.

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

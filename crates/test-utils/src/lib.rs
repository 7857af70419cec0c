pub mod items;
pub mod recorder;

use std::sync::Once;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use stepgraph::{ChainResult, Execution};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run an execution on a helper thread, failing the test if it takes
/// longer than 5 seconds instead of hanging.
pub fn run_with_timeout(execution: Execution) -> stepgraph::Result<ChainResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(execution.run());
    });
    rx.recv_timeout(Duration::from_secs(5))
        .expect("Run timed out after 5 seconds")
}

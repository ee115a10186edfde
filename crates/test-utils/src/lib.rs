pub mod bins;
pub mod fake_executor;
pub mod sink;

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Once;

use localplugin::exec::{LaunchSpec, LocalBinaryExecutor};
use tracing_subscriber::{EnvFilter, fmt};

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

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A real executor whose "plugin binary" is `/bin/sh -c <script>`.
///
/// Running a shell instead of a freshly written script file avoids
/// `ETXTBSY` races between parallel tests.
pub fn sh_executor(driver_name: &str, script: &str) -> LocalBinaryExecutor {
    let spec = LaunchSpec::new(PathBuf::from("/bin/sh"), driver_name)
        .with_args([OsString::from("-c"), OsString::from(script)]);
    LocalBinaryExecutor::with_spec(driver_name, spec)
}

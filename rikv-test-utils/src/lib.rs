//! Helpers shared by rikv test binaries.

use std::sync::Once;

use tracing_subscriber::filter::EnvFilter;

static INIT: Once = Once::new();

/// Level used when `RUST_LOG` is unset or unparsable. Schema operations log
/// at `debug`, so tests stay quiet unless asked.
const DEFAULT_FILTER: &str = "warn";

/// Install a test-friendly tracing subscriber once per binary.
///
/// Honors `RUST_LOG`, e.g. `RUST_LOG=rikv_table=debug cargo test`. Output goes
/// through the test writer so it is captured per test.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // Fails only when the harness already installed a subscriber.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_tracing_for_tests();
        init_tracing_for_tests();
        tracing_subscriber::fmt::try_init().unwrap_err();
    }
}

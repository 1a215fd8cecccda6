//! Logging configuration for the Mino toolchain
//!
//! Thin setup helpers over the `log` facade and the `env_logger` backend.
//!
//! ```rust,ignore
//! use compiler::logging;
//!
//! logging::init_from_env();
//! logging::init_with_level(log::LevelFilter::Debug);
//! ```
//!
//! Levels:
//!
//! - `info!` - pipeline phases (discovery, members, subtypes, check, dispatch, run)
//! - `debug!` - per-class and per-method events (registration, overrides, frames)
//! - `trace!` - per-expression detail (dispatch lookups, intern hits)
//!
//! `RUST_LOG` filters by module as usual:
//!
//! ```bash
//! RUST_LOG=compiler::subtypes=debug mino check main.mino
//! RUST_LOG=runtime=trace mino run main.mino
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Warn level. Subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Fixed level, ignoring `RUST_LOG`. Only the first call takes effect.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Level from `RUST_LOG`, `warn` when unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Test logger; safe to call from every test.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

/// Whether `init*` (other than `init_test`) ran.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

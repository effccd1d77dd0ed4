//! Idempotent logger initialization, grounded on the teacher's
//! `lib.rs::tests::init_log` (a `Once`-guarded `env_logger::Builder`).

use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` with a format that includes level, target, and
/// call site. Safe to call from every test; only the first call has effect.
pub fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_default_env()
            .format_timestamp_millis()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {}] [{}:{}] {}",
                    record.level(),
                    record.target(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}

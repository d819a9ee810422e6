use std::io::Write;

use env_logger::{Builder, Env};

/// Install the process-wide logger.
///
/// Lines look like `2024-05-01 12:00:00 - [INFO] rx868: Received: b'hi'`.
/// `RUST_LOG` overrides the default filter; `verbose` lowers it to `debug`.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let module = record
                .module_path()
                .and_then(|path| path.rsplit("::").next())
                .unwrap_or("-");
            writeln!(
                buf,
                "{} - [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                module,
                record.args()
            )
        })
        .init();
}

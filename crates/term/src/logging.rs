use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "KILN_LOG";

/// Installs the stderr subscriber. `KILN_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("info")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}

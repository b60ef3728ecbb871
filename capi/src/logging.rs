use log::LevelFilter;

/// Inits logging at `level`. `RUST_LOG` takes precedence when set.
pub fn init_logging(level: LevelFilter) {
    env_logger::Builder::new().filter(None, level).parse_default_env().try_init().ok();
}

/// Inits logging at the level named by the test configuration, Info if it names none.
pub fn init_logging_from_config(conf: &crate::config::TestConfig) {
    init_logging(conf.log_level().unwrap_or(LevelFilter::Info));
}

use std::sync::LazyLock;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/* build identity, injected by the release pipeline */
const COMMIT: Option<&str> = option_env!("WATCHDOG_COMMIT");
const BUILT_AT: Option<&str> = option_env!("WATCHDOG_BUILT_AT");
const BUILT_BY: Option<&str> = option_env!("WATCHDOG_BUILT_BY");

pub static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} (commit {}, built {} by {})",
        VERSION,
        COMMIT.unwrap_or("unknown"),
        BUILT_AT.unwrap_or("unknown"),
        BUILT_BY.unwrap_or("unknown"),
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_version_starts_with_crate_version() {
        assert!(LONG_VERSION.starts_with(VERSION));
        assert!(LONG_VERSION.contains("commit "));
    }
}

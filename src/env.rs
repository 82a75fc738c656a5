/// The environment variable that marks a production deployment.
pub const ENV_VAR: &str = "RENDER_SHIELD_ENV";

/// Whether diagnostics should be silenced.
///
/// True for builds without debug assertions, and for any build that runs
/// with `RENDER_SHIELD_ENV=production`.
pub fn is_production() -> bool {
    !cfg!(debug_assertions) || marks_production(std::env::var(ENV_VAR).ok().as_deref())
}

fn marks_production(value: Option<&str>) -> bool {
    value == Some("production")
}

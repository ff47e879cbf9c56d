//! Built-in defaults, the lowest-precedence layer.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with every default applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("synthesis.endpoint", crate::synthesis::DEFAULT_SYNTHESIS_ENDPOINT)?
        .set_default("synthesis.timeout_ms", 60_000_i64)?
        .set_default("synthesis.connect_timeout_ms", 10_000_i64)?
        .set_default("cache.capacity", 256_i64)?
        .set_default("batch.inter_item_delay_ms", 1_000_i64)?
        .set_default("costing.operational_cost_percent", 30.0_f64)?
        .set_default(
            "costing.match_threshold",
            crate::worker::tasks::DEFAULT_MATCH_THRESHOLD,
        )
}

//! Structured logging helpers
//!
//! Turns [`LoggingConfig`](crate::config::LoggingConfig) into an `EnvFilter`
//! directive string. The subscriber itself is installed by the `watch`
//! command.

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
/// Components are sorted so the output is stable.
///
/// # Examples
///
/// ```
/// use studycam::config::{LogFormat, LoggingConfig};
/// use studycam::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("capture".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,studycam::capture=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",studycam::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_component_levels_sorted() {
        let config = LoggingConfig {
            component_levels: Some(HashMap::from([
                ("history".to_string(), "trace".to_string()),
                ("agent".to_string(), "debug".to_string()),
            ])),
            ..Default::default()
        };

        assert_eq!(
            build_filter_directives(&config),
            "info,studycam::agent=debug,studycam::history=trace"
        );
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        let config = LoggingConfig {
            component_levels: Some(HashMap::from([(
                "capture".to_string(),
                "debug".to_string(),
            )])),
            ..Default::default()
        };

        let filter = tracing_subscriber::EnvFilter::try_new(build_filter_directives(&config));
        assert!(filter.is_ok());
    }
}

//! Configuration module for the ModelServe node.
//!
//! This module turns the process-start token list into a validated server
//! configuration: environment-seeded defaults are resolved first, then the
//! scanner and config mapper consume the tokens, and the cross-field
//! validator finalizes the result. Data flows strictly forward; the first
//! detected problem aborts the whole parse.

pub mod commandline;
pub mod config_check;
pub mod errors;
pub mod model;

pub use errors::ParseError;
pub use model::ServerConf;

/// Environment values consumed during default resolution and validation.
/// Read once at startup; the scanner and mapper never touch the process
/// environment, so the whole parse is testable with synthetic snapshots.
#[derive(Debug, Default, Clone)]
pub struct EnvSnapshot {
    /// `AIP_MODE`; the value `PREDICTION` selects the Vertex AI serving
    /// defaults.
    pub deploy_mode: Option<String>,
    /// `AIP_HTTP_PORT`; default port for the Vertex AI endpoint.
    pub default_serving_port: Option<String>,
    /// `AIP_STORAGE_URI`; fallback model repository location.
    pub default_model_repository: Option<String>,
}

impl EnvSnapshot {
    pub fn from_process_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        EnvSnapshot {
            deploy_mode: var("AIP_MODE"),
            default_serving_port: var("AIP_HTTP_PORT"),
            default_model_repository: var("AIP_STORAGE_URI"),
        }
    }
}

/// Configuration building and parsing functionality
pub mod builder {
    use super::commandline::config_mapper::{apply_option, ParseState};
    use super::commandline::converters::parse_option;
    use super::commandline::scanner::ArgumentScanner;
    use super::config_check;
    use super::{EnvSnapshot, ParseError, ServerConf};

    /// The initial configuration value: compiled-in defaults adjusted by
    /// the environment snapshot. Runs before any token is scanned.
    pub fn initial_conf(env: &EnvSnapshot) -> Result<ServerConf, ParseError> {
        let mut conf = ServerConf::default();

        // A prediction deployment serves Vertex AI by default and turns the
        // other inference endpoints off.
        if env.deploy_mode.as_deref() == Some("PREDICTION") {
            conf.vertex_ai.allow = true;
            conf.http.allow = false;
            conf.grpc.allow = false;
        }
        if let Some(port) = &env.default_serving_port {
            conf.vertex_ai.port = parse_option::<i32>(port)?;
        }

        Ok(conf)
    }

    /// Builds the server configuration from the CLI token list (argv minus
    /// the program name).
    ///
    /// # Arguments
    /// * `env` - environment snapshot for default resolution
    /// * `args` - the token list to scan
    ///
    /// # Returns
    /// * `Result<ServerConf, ParseError>` - the validated configuration, or
    ///   the first error encountered
    pub fn build(env: &EnvSnapshot, args: &[String]) -> Result<ServerConf, ParseError> {
        let mut conf = initial_conf(env)?;
        let mut state = ParseState::default();

        let mut scanner = ArgumentScanner::new(args);
        while let Some(event) = scanner.next_event()? {
            apply_option(&mut conf, &mut state, &event)?;
        }

        config_check::finalize(conf, &state, env)
    }
}

// Re-export commonly used types
pub use builder::build;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_mode_flips_default_endpoints() {
        let env = EnvSnapshot {
            deploy_mode: Some("PREDICTION".to_string()),
            default_serving_port: Some("9090".to_string()),
            default_model_repository: None,
        };
        let conf = builder::initial_conf(&env).unwrap();
        assert!(conf.vertex_ai.allow);
        assert!(!conf.http.allow);
        assert!(!conf.grpc.allow);
        assert_eq!(conf.vertex_ai.port, 9090);
    }

    #[test]
    fn test_other_deploy_modes_keep_defaults() {
        let env = EnvSnapshot {
            deploy_mode: Some("BATCH".to_string()),
            ..EnvSnapshot::default()
        };
        let conf = builder::initial_conf(&env).unwrap();
        assert!(!conf.vertex_ai.allow);
        assert!(conf.http.allow);
        assert!(conf.grpc.allow);
    }

    #[test]
    fn test_malformed_default_port_is_rejected() {
        let env = EnvSnapshot {
            default_serving_port: Some("80eighty".to_string()),
            ..EnvSnapshot::default()
        };
        assert!(matches!(
            builder::initial_conf(&env),
            Err(ParseError::Format(_))
        ));
    }
}

//! Cross-field validation
//!
//! Runs once after the full token list has been consumed: resolves default
//! interactions between fields, rejects mutually exclusive flag
//! combinations and checks the enabled network endpoints for port
//! collisions. The first detected problem aborts the whole parse.

use tracing::warn;

use crate::rust::configuration::commandline::config_mapper::ParseState;
use crate::rust::configuration::errors::ParseError;
use crate::rust::configuration::model::{ModelControlMode, ServerConf, TraceLevel};
use crate::rust::configuration::EnvSnapshot;

/// One currently-enabled network endpoint, rebuilt fresh for every
/// validation run.
#[derive(Debug)]
struct PortEntry {
    service: &'static str,
    address: String,
    port: i32,
    /// Range of ports this endpoint allows the *other* endpoints to use on
    /// its bind address. Only the SageMaker endpoint may declare one.
    allowed_range: Option<(i32, i32)>,
}

/// Finalize the configuration after scanning: apply cross-field defaults
/// and enforce the invariants that span multiple flags.
pub fn finalize(
    mut conf: ServerConf,
    state: &ParseState,
    env: &EnvSnapshot,
) -> Result<ServerConf, ParseError> {
    // The poll interval is meaningless outside poll mode.
    if conf.model_control.mode != ModelControlMode::Poll {
        conf.model_control.repository_poll_secs = 0;
    }

    // A platform-provided storage location becomes the sole repository
    // path, but only when none was given explicitly and the Vertex AI
    // surface is serving.
    if conf.model_repository_paths.is_empty() && conf.vertex_ai.allow {
        if let Some(storage_uri) = &env.default_model_repository {
            conf.model_repository_paths.insert(storage_uri.clone());
        }
    }

    // Metric sub-flags only count while metrics collection itself is on.
    conf.metrics.allow_gpu &= conf.metrics.allow;
    conf.metrics.allow_cpu &= conf.metrics.allow;

    // An explicit OFF among the trace-level flags wins over every
    // accumulated bit.
    if state.explicit_disable_trace {
        conf.trace.level = TraceLevel::empty();
    }

    // The replacement flag always wins over the deprecated one.
    if state.disable_auto_complete_config {
        if state.strict_model_config_present && !conf.strict_model_config {
            warn!(
                "overriding deprecated '--strict-model-config' from false to \
                 true in favor of '--disable-auto-complete-config'"
            );
        }
        conf.strict_model_config = true;
    }

    if state.cache_size_present && state.cache_config_present {
        return Err(ParseError::ConflictingOptions {
            first: "response-cache-byte-size",
            second: "cache-config",
        });
    }
    conf.cache.enable = state.cache_size_present || state.cache_config_present;

    check_port_collision(&conf)?;

    Ok(conf)
}

/// Check every pair of enabled endpoints sharing a bind address, exactly
/// once per unordered pair: a declared port range on either side bounds the
/// other side's exact port, and equal exact ports are a conflict.
fn check_port_collision(conf: &ServerConf) -> Result<(), ParseError> {
    let mut ports: Vec<PortEntry> = Vec::new();
    if conf.http.allow {
        ports.push(PortEntry {
            service: "HTTP",
            address: conf.http.address.clone(),
            port: conf.http.port,
            allowed_range: None,
        });
    }
    if conf.grpc.allow {
        ports.push(PortEntry {
            service: "GRPC",
            address: conf.grpc.socket.address.clone(),
            port: conf.grpc.socket.port,
            allowed_range: None,
        });
    }
    if conf.metrics.allow {
        ports.push(PortEntry {
            service: "metrics",
            address: conf.metrics.address.clone(),
            port: conf.metrics.port,
            allowed_range: None,
        });
    }
    if conf.sagemaker.allow {
        ports.push(PortEntry {
            service: "SageMaker",
            address: conf.sagemaker.address.clone(),
            port: conf.sagemaker.port,
            allowed_range: conf.sagemaker.safe_port_range,
        });
    }
    if conf.vertex_ai.allow {
        ports.push(PortEntry {
            service: "Vertex AI",
            address: conf.vertex_ai.address.clone(),
            port: conf.vertex_ai.port,
            allowed_range: None,
        });
    }

    for (i, curr) in ports.iter().enumerate() {
        for other in &ports[i + 1..] {
            if curr.address != other.address {
                continue;
            }
            check_allowed_range(curr, other)?;
            check_allowed_range(other, curr)?;
            if curr.port == other.port {
                return Err(ParseError::PortConflict {
                    first: curr.service,
                    second: other.service,
                    address: curr.address.clone(),
                    port: curr.port,
                });
            }
        }
    }
    Ok(())
}

fn check_allowed_range(constraining: &PortEntry, other: &PortEntry) -> Result<(), ParseError> {
    if let Some((lower, upper)) = constraining.allowed_range {
        if other.port < lower || other.port > upper {
            return Err(ParseError::PortRangeViolation {
                range_service: constraining.service,
                service: other.service,
                port: other.port,
                lower,
                upper,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize_default(conf: ServerConf) -> Result<ServerConf, ParseError> {
        finalize(conf, &ParseState::default(), &EnvSnapshot::default())
    }

    // The compiled-in defaults put HTTP, GRPC and metrics on distinct ports
    // of the same address; they must pass the collision check.
    #[test]
    fn test_default_configuration_is_valid() {
        assert!(finalize_default(ServerConf::default()).is_ok());
    }

    #[test]
    fn test_poll_interval_is_zeroed_outside_poll_mode() {
        let mut conf = ServerConf::default();
        conf.model_control.repository_poll_secs = 60;
        conf.model_control.mode = ModelControlMode::Explicit;
        let conf = finalize_default(conf).unwrap();
        assert_eq!(conf.model_control.repository_poll_secs, 0);

        let mut conf = ServerConf::default();
        conf.model_control.repository_poll_secs = 60;
        conf.model_control.mode = ModelControlMode::Poll;
        let conf = finalize_default(conf).unwrap();
        assert_eq!(conf.model_control.repository_poll_secs, 60);
    }

    #[test]
    fn test_storage_location_adopted_only_for_vertex_ai() {
        let env = EnvSnapshot {
            default_model_repository: Some("gs://models".to_string()),
            ..EnvSnapshot::default()
        };

        let mut conf = ServerConf::default();
        conf.vertex_ai.allow = true;
        conf.vertex_ai.port = 8080;
        let conf = finalize(conf, &ParseState::default(), &env).unwrap();
        assert!(conf.model_repository_paths.contains("gs://models"));

        let conf = finalize(ServerConf::default(), &ParseState::default(), &env).unwrap();
        assert!(conf.model_repository_paths.is_empty());

        // An explicit repository path wins over the environment.
        let mut conf = ServerConf::default();
        conf.vertex_ai.allow = true;
        conf.vertex_ai.port = 8080;
        conf.model_repository_paths.insert("/models".to_string());
        let conf = finalize(conf, &ParseState::default(), &env).unwrap();
        assert_eq!(conf.model_repository_paths.len(), 1);
        assert!(conf.model_repository_paths.contains("/models"));
    }

    #[test]
    fn test_metric_sub_flags_follow_master_flag() {
        let mut conf = ServerConf::default();
        conf.metrics.allow = false;
        let conf = finalize_default(conf).unwrap();
        assert!(!conf.metrics.allow_gpu);
        assert!(!conf.metrics.allow_cpu);
    }

    #[test]
    fn test_explicit_trace_disable_overrides_accumulated_bits() {
        let mut conf = ServerConf::default();
        conf.trace.level = TraceLevel::TIMESTAMPS | TraceLevel::TENSORS;
        let state = ParseState {
            explicit_disable_trace: true,
            ..ParseState::default()
        };
        let conf = finalize(conf, &state, &EnvSnapshot::default()).unwrap();
        assert_eq!(conf.trace.level, TraceLevel::empty());
    }

    #[test]
    fn test_disable_auto_complete_config_forces_strict_model_config() {
        let mut conf = ServerConf::default();
        conf.strict_model_config = false;
        let state = ParseState {
            disable_auto_complete_config: true,
            strict_model_config_present: true,
            ..ParseState::default()
        };
        let conf = finalize(conf, &state, &EnvSnapshot::default()).unwrap();
        assert!(conf.strict_model_config);
    }

    #[test]
    fn test_cache_flags_are_mutually_exclusive() {
        let state = ParseState {
            cache_size_present: true,
            cache_config_present: true,
            ..ParseState::default()
        };
        let err = finalize(ServerConf::default(), &state, &EnvSnapshot::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::ConflictingOptions {
                first: "response-cache-byte-size",
                second: "cache-config",
            }
        );

        let state = ParseState {
            cache_config_present: true,
            ..ParseState::default()
        };
        let conf = finalize(ServerConf::default(), &state, &EnvSnapshot::default()).unwrap();
        assert!(conf.cache.enable);
    }

    #[test]
    fn test_equal_ports_on_same_address_conflict() {
        let mut conf = ServerConf::default();
        conf.grpc.socket.port = conf.http.port;
        let err = finalize_default(conf).unwrap_err();
        assert_eq!(
            err,
            ParseError::PortConflict {
                first: "HTTP",
                second: "GRPC",
                address: "0.0.0.0".to_string(),
                port: 8000,
            }
        );
    }

    #[test]
    fn test_equal_ports_on_different_addresses_do_not_conflict() {
        let mut conf = ServerConf::default();
        conf.grpc.socket.address = "127.0.0.1".to_string();
        conf.grpc.socket.port = conf.http.port;
        assert!(finalize_default(conf).is_ok());
    }

    #[test]
    fn test_port_outside_declared_range_is_rejected() {
        let mut conf = ServerConf::default();
        conf.grpc.allow = false;
        conf.metrics.allow = false;
        conf.sagemaker.allow = true;
        conf.sagemaker.safe_port_range = Some((8000, 8002));
        conf.http.port = 8005;
        let err = finalize_default(conf).unwrap_err();
        assert_eq!(
            err,
            ParseError::PortRangeViolation {
                range_service: "SageMaker",
                service: "HTTP",
                port: 8005,
                lower: 8000,
                upper: 8002,
            }
        );
    }

    #[test]
    fn test_port_inside_declared_range_is_accepted() {
        let mut conf = ServerConf::default();
        conf.grpc.allow = false;
        conf.metrics.allow = false;
        conf.sagemaker.allow = true;
        conf.sagemaker.safe_port_range = Some((8000, 8002));
        conf.http.port = 8001;
        assert!(finalize_default(conf).is_ok());
    }

    // The range constrains the other endpoints, never the declaring
    // endpoint itself.
    #[test]
    fn test_range_does_not_apply_to_the_declaring_endpoint() {
        let mut conf = ServerConf::default();
        conf.http.allow = false;
        conf.grpc.allow = false;
        conf.metrics.allow = false;
        conf.sagemaker.allow = true;
        conf.sagemaker.port = 8080;
        conf.sagemaker.safe_port_range = Some((8000, 8002));
        assert!(finalize_default(conf).is_ok());
    }

    #[test]
    fn test_disabled_endpoints_are_not_checked() {
        let mut conf = ServerConf::default();
        conf.grpc.socket.port = conf.http.port;
        conf.grpc.allow = false;
        assert!(finalize_default(conf).is_ok());
    }
}

//! Configuration mapper for applying scanned options to the configuration
//!
//! This module dispatches each raw scanner event to exactly one destination
//! field of the server configuration, parsing the argument with the typed
//! or compound converters. Multi-valued destinations accumulate across
//! repeated flags; single-valued destinations overwrite (last flag wins).

use tracing::warn;

use super::converters::{
    parse_int_bool_option, parse_named_setting_option, parse_option, parse_pair_option,
    parse_rate_limit_resource_option, parse_trace_level_option,
};
use super::options::OptionId;
use super::scanner::RawEvent;
use crate::rust::configuration::errors::ParseError;
use crate::rust::configuration::model::{
    GrpcCompressionLevel, LogFormat, ModelControlMode, RateLimitMode, ServerConf,
};

/// Scratch state observed while scanning, consumed by the cross-field
/// validator after the token list is exhausted.
#[derive(Debug, Default, Clone)]
pub struct ParseState {
    pub strict_model_config_present: bool,
    pub disable_auto_complete_config: bool,
    pub cache_size_present: bool,
    pub cache_config_present: bool,
    pub explicit_disable_trace: bool,
}

/// Apply one scanned event to the configuration under construction.
pub fn apply_option(
    conf: &mut ServerConf,
    state: &mut ParseState,
    event: &RawEvent,
) -> Result<(), ParseError> {
    // The scanner guarantees an argument for every flag that takes one;
    // value-less flags never read `raw`.
    let raw = event.arg.as_deref().unwrap_or_default();

    match event.id {
        OptionId::Help => return Err(ParseError::HelpRequested),

        OptionId::LogVerbose => conf.log.verbose = parse_int_bool_option(raw)?,
        OptionId::LogInfo => conf.log.info = parse_option::<bool>(raw)?,
        OptionId::LogWarning => conf.log.warn = parse_option::<bool>(raw)?,
        OptionId::LogError => conf.log.error = parse_option::<bool>(raw)?,
        OptionId::LogFormat => {
            conf.log.format = match raw {
                "default" => LogFormat::Default,
                "ISO8601" => LogFormat::Iso8601,
                _ => {
                    return Err(ParseError::Format(format!(
                        "invalid argument for --log-format: {raw}"
                    )))
                }
            }
        }
        OptionId::LogFile => conf.log.file = raw.to_string(),

        OptionId::ServerId => conf.server_id = raw.to_string(),
        OptionId::ModelRepository => {
            conf.model_repository_paths.insert(raw.to_string());
        }
        OptionId::ExitOnError => conf.exit_on_error = parse_option::<bool>(raw)?,
        OptionId::DisableAutoCompleteConfig => state.disable_auto_complete_config = true,
        OptionId::StrictModelConfig => {
            warn!(
                "'--strict-model-config' has been deprecated, please use \
                 '--disable-auto-complete-config' instead"
            );
            state.strict_model_config_present = true;
            conf.strict_model_config = parse_option::<bool>(raw)?;
        }
        OptionId::StrictReadiness => conf.strict_readiness = parse_option::<bool>(raw)?,

        OptionId::AllowHttp => conf.http.allow = parse_option::<bool>(raw)?,
        OptionId::HttpPort => conf.http.port = parse_option::<i32>(raw)?,
        OptionId::ReuseHttpPort => conf.http.reuse_port = parse_option::<bool>(raw)?,
        OptionId::HttpAddress => {
            conf.http.address = raw.to_string();
            // Binding HTTP to an address also seeds the metrics address as a
            // convenience default. One-way priming, not a persistent link.
            conf.metrics.address = raw.to_string();
        }
        OptionId::HttpThreadCount => conf.http.thread_count = parse_option::<i32>(raw)?,

        OptionId::AllowGrpc => conf.grpc.allow = parse_option::<bool>(raw)?,
        OptionId::GrpcPort => conf.grpc.socket.port = parse_option::<i32>(raw)?,
        OptionId::ReuseGrpcPort => conf.grpc.socket.reuse_port = parse_option::<bool>(raw)?,
        OptionId::GrpcAddress => conf.grpc.socket.address = raw.to_string(),
        OptionId::GrpcInferAllocationPoolSize => {
            conf.grpc.infer_allocation_pool_size = parse_option::<i32>(raw)?
        }
        OptionId::GrpcUseSsl => conf.grpc.ssl.use_ssl = parse_option::<bool>(raw)?,
        OptionId::GrpcUseSslMutual => {
            conf.grpc.ssl.use_mutual_auth = parse_option::<bool>(raw)?;
            // Mutual TLS implies TLS.
            conf.grpc.ssl.use_ssl = true;
        }
        OptionId::GrpcServerCert => conf.grpc.ssl.server_cert = raw.to_string(),
        OptionId::GrpcServerKey => conf.grpc.ssl.server_key = raw.to_string(),
        OptionId::GrpcRootCert => conf.grpc.ssl.root_cert = raw.to_string(),
        OptionId::GrpcResponseCompressionLevel => {
            conf.grpc.infer_compression_level = match raw.to_lowercase().as_str() {
                "none" => GrpcCompressionLevel::None,
                "low" => GrpcCompressionLevel::Low,
                "medium" => GrpcCompressionLevel::Medium,
                "high" => GrpcCompressionLevel::High,
                _ => {
                    return Err(ParseError::Format(format!(
                        "invalid argument for --grpc-infer-response-compression-level: {raw}"
                    )))
                }
            }
        }
        OptionId::GrpcKeepAliveTime => {
            conf.grpc.keep_alive.keepalive_time_ms = parse_option::<i32>(raw)?
        }
        OptionId::GrpcKeepAliveTimeout => {
            conf.grpc.keep_alive.keepalive_timeout_ms = parse_option::<i32>(raw)?
        }
        OptionId::GrpcKeepAlivePermitWithoutCalls => {
            conf.grpc.keep_alive.keepalive_permit_without_calls = parse_option::<bool>(raw)?
        }
        OptionId::GrpcHttp2MaxPingsWithoutData => {
            conf.grpc.keep_alive.http2_max_pings_without_data = parse_option::<i32>(raw)?
        }
        OptionId::GrpcHttp2MinRecvPingIntervalWithoutData => {
            conf.grpc.keep_alive.http2_min_recv_ping_interval_without_data_ms =
                parse_option::<i32>(raw)?
        }
        OptionId::GrpcHttp2MaxPingStrikes => {
            conf.grpc.keep_alive.http2_max_ping_strikes = parse_option::<i32>(raw)?
        }

        OptionId::AllowSageMaker => conf.sagemaker.allow = parse_option::<bool>(raw)?,
        OptionId::SageMakerPort => conf.sagemaker.port = parse_option::<i32>(raw)?,
        OptionId::SageMakerSafePortRange => {
            conf.sagemaker.safe_port_range = Some(parse_pair_option::<i32, i32>(raw, "-")?)
        }
        OptionId::SageMakerThreadCount => conf.sagemaker.thread_count = parse_option::<i32>(raw)?,

        OptionId::AllowVertexAi => conf.vertex_ai.allow = parse_option::<bool>(raw)?,
        OptionId::VertexAiPort => conf.vertex_ai.port = parse_option::<i32>(raw)?,
        OptionId::VertexAiThreadCount => conf.vertex_ai.thread_count = parse_option::<i32>(raw)?,
        OptionId::VertexAiDefaultModel => conf.vertex_ai.default_model = raw.to_string(),

        OptionId::AllowMetrics => conf.metrics.allow = parse_option::<bool>(raw)?,
        OptionId::AllowGpuMetrics => conf.metrics.allow_gpu = parse_option::<bool>(raw)?,
        OptionId::AllowCpuMetrics => conf.metrics.allow_cpu = parse_option::<bool>(raw)?,
        OptionId::MetricsPort => conf.metrics.port = parse_option::<i32>(raw)?,
        OptionId::MetricsIntervalMs => conf.metrics.interval_ms = parse_option::<f64>(raw)?,

        OptionId::TraceFile => conf.trace.filepath = raw.to_string(),
        OptionId::TraceLevel => {
            let level = parse_trace_level_option(raw)?;
            if level.is_empty() {
                state.explicit_disable_trace = true;
            }
            conf.trace.level |= level;
        }
        OptionId::TraceRate => conf.trace.rate = parse_option::<i32>(raw)?,
        OptionId::TraceCount => conf.trace.count = parse_option::<i32>(raw)?,
        OptionId::TraceLogFrequency => conf.trace.log_frequency = parse_option::<i32>(raw)?,

        OptionId::ModelControlMode => {
            conf.model_control.mode = match raw.to_lowercase().as_str() {
                "none" => ModelControlMode::None,
                "poll" => ModelControlMode::Poll,
                "explicit" => ModelControlMode::Explicit,
                _ => {
                    return Err(ParseError::Format(format!(
                        "invalid argument for --model-control-mode: {raw}"
                    )))
                }
            }
        }
        OptionId::RepositoryPollSecs => {
            conf.model_control.repository_poll_secs = parse_option::<i32>(raw)?
        }
        OptionId::StartupModel => {
            conf.model_control.startup_models.insert(raw.to_string());
        }

        OptionId::RateLimit => {
            conf.rate_limit.mode = match raw.to_lowercase().as_str() {
                "execution_count" => RateLimitMode::ExecutionCount,
                "off" => RateLimitMode::Off,
                _ => {
                    return Err(ParseError::Format(format!(
                        "invalid argument for --rate-limit: {raw}"
                    )))
                }
            }
        }
        OptionId::RateLimitResource => {
            conf.rate_limit
                .resources
                .push(parse_rate_limit_resource_option(raw)?);
        }

        OptionId::PinnedMemoryPoolByteSize => {
            conf.pinned_memory_pool_byte_size = parse_option::<i64>(raw)?
        }
        OptionId::CudaMemoryPoolByteSize => {
            let (device, size) = parse_pair_option::<i32, u64>(raw, ":")?;
            match conf.cuda_pools.iter_mut().find(|(d, _)| *d == device) {
                Some(entry) => entry.1 = size,
                None => conf.cuda_pools.push((device, size)),
            }
        }

        OptionId::ResponseCacheByteSize => {
            state.cache_size_present = true;
            let byte_size = parse_option::<i64>(raw)?;
            warn!(
                "'--response-cache-byte-size' has been deprecated, this will \
                 default to the 'local' cache implementation with the provided \
                 byte size for its config. Please use '--cache-config' instead. \
                 The equivalent --cache-config CLI args would be: \
                 '--cache-config=local,size={byte_size}'"
            );
            conf.cache
                .settings
                .insert("local".to_string(), vec![("size".to_string(), byte_size.to_string())]);
        }
        OptionId::CacheConfig => {
            state.cache_config_present = true;
            let (name, setting, value) = parse_named_setting_option(raw, "cache-config")?;
            conf.cache
                .settings
                .entry(name)
                .or_default()
                .push((setting, value));
        }
        OptionId::CacheDir => conf.cache.dir = raw.to_string(),

        OptionId::MinSupportedComputeCapability => {
            conf.min_supported_compute_capability = parse_option::<f64>(raw)?
        }
        OptionId::ExitTimeoutSecs => conf.exit_timeout_secs = parse_option::<i32>(raw)?,
        OptionId::BackendDir => conf.backend_dir = raw.to_string(),
        OptionId::RepoAgentDir => conf.repoagent_dir = raw.to_string(),
        OptionId::BufferManagerThreadCount => {
            conf.buffer_manager_thread_count = parse_option::<i32>(raw)?
        }
        OptionId::ModelLoadThreadCount => {
            conf.model_load_thread_count = parse_option::<i32>(raw)?
        }
        OptionId::BackendConfig => {
            conf.backend_config_settings
                .push(parse_named_setting_option(raw, "backend-config")?);
        }
        OptionId::HostPolicy => {
            conf.host_policies
                .push(parse_named_setting_option(raw, "host-policy")?);
        }
        OptionId::ModelLoadGpuLimit => {
            let (device, fraction) = parse_pair_option::<i32, f64>(raw, ":")?;
            // Only the first limit per device takes effect.
            conf.model_load_gpu_limit.entry(device).or_insert(fraction);
        }
        OptionId::ModelNamespacing => conf.enable_model_namespacing = parse_option::<bool>(raw)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(conf: &mut ServerConf, state: &mut ParseState, id: OptionId, arg: Option<&str>) {
        let event = RawEvent {
            id,
            arg: arg.map(|s| s.to_string()),
        };
        apply_option(conf, state, &event).unwrap();
    }

    #[test]
    fn test_repeated_load_model_accumulates_without_duplicates() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(&mut conf, &mut state, OptionId::StartupModel, Some("foo"));
        apply(&mut conf, &mut state, OptionId::StartupModel, Some("bar"));
        apply(&mut conf, &mut state, OptionId::StartupModel, Some("foo"));
        let models: Vec<&str> = conf
            .model_control
            .startup_models
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(models, vec!["bar", "foo"]);
    }

    #[test]
    fn test_single_valued_destination_keeps_last_value() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(&mut conf, &mut state, OptionId::HttpPort, Some("9000"));
        apply(&mut conf, &mut state, OptionId::HttpPort, Some("9100"));
        assert_eq!(conf.http.port, 9100);
    }

    #[test]
    fn test_http_address_seeds_metrics_address() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(&mut conf, &mut state, OptionId::HttpAddress, Some("10.0.0.1"));
        assert_eq!(conf.http.address, "10.0.0.1");
        assert_eq!(conf.metrics.address, "10.0.0.1");
        // One-way priming: a later metrics flag is independent of HTTP.
        apply(&mut conf, &mut state, OptionId::MetricsPort, Some("9999"));
        assert_eq!(conf.metrics.port, 9999);
        assert_eq!(conf.http.port, 8000);
    }

    #[test]
    fn test_mutual_ssl_forces_ssl_even_when_false() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::GrpcUseSslMutual,
            Some("false"),
        );
        assert!(!conf.grpc.ssl.use_mutual_auth);
        assert!(conf.grpc.ssl.use_ssl);
    }

    #[test]
    fn test_cuda_pool_replaces_entry_for_same_device() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::CudaMemoryPoolByteSize,
            Some("0:1024"),
        );
        apply(
            &mut conf,
            &mut state,
            OptionId::CudaMemoryPoolByteSize,
            Some("1:512"),
        );
        apply(
            &mut conf,
            &mut state,
            OptionId::CudaMemoryPoolByteSize,
            Some("0:2048"),
        );
        assert_eq!(conf.cuda_pools, vec![(0, 2048), (1, 512)]);
    }

    #[test]
    fn test_model_load_gpu_limit_keeps_first_entry_per_device() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::ModelLoadGpuLimit,
            Some("0:0.5"),
        );
        apply(
            &mut conf,
            &mut state,
            OptionId::ModelLoadGpuLimit,
            Some("0:0.9"),
        );
        assert_eq!(conf.model_load_gpu_limit.get(&0), Some(&0.5));
    }

    #[test]
    fn test_deprecated_cache_flag_resolves_to_local_cache_settings() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::ResponseCacheByteSize,
            Some("1048576"),
        );
        assert!(state.cache_size_present);
        assert_eq!(
            conf.cache.settings.get("local"),
            Some(&vec![("size".to_string(), "1048576".to_string())])
        );
    }

    #[test]
    fn test_cache_config_groups_settings_by_cache_name() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::CacheConfig,
            Some("redis,host=localhost"),
        );
        apply(
            &mut conf,
            &mut state,
            OptionId::CacheConfig,
            Some("redis,port=6379"),
        );
        assert!(state.cache_config_present);
        assert_eq!(
            conf.cache.settings.get("redis").map(|v| v.len()),
            Some(2)
        );
    }

    #[test]
    fn test_trace_level_bits_accumulate() {
        use crate::rust::configuration::model::TraceLevel;

        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(&mut conf, &mut state, OptionId::TraceLevel, Some("timestamps"));
        apply(&mut conf, &mut state, OptionId::TraceLevel, Some("tensors"));
        assert_eq!(
            conf.trace.level,
            TraceLevel::TIMESTAMPS | TraceLevel::TENSORS
        );
        assert!(!state.explicit_disable_trace);
        apply(&mut conf, &mut state, OptionId::TraceLevel, Some("off"));
        assert!(state.explicit_disable_trace);
    }

    #[test]
    fn test_strict_model_config_records_presence() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        apply(
            &mut conf,
            &mut state,
            OptionId::StrictModelConfig,
            Some("false"),
        );
        assert!(state.strict_model_config_present);
        assert!(!conf.strict_model_config);
    }

    #[test]
    fn test_invalid_keyword_arguments_fail() {
        let mut conf = ServerConf::default();
        let mut state = ParseState::default();
        for (id, raw) in [
            (OptionId::LogFormat, "iso8601"),
            (OptionId::ModelControlMode, "auto"),
            (OptionId::RateLimit, "on"),
            (OptionId::GrpcResponseCompressionLevel, "max"),
        ] {
            let event = RawEvent {
                id,
                arg: Some(raw.to_string()),
            };
            let err = apply_option(&mut conf, &mut state, &event).unwrap_err();
            assert!(matches!(err, ParseError::Format(_)), "raw: {raw}");
        }
    }
}

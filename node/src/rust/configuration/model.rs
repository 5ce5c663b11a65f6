//! Configuration model definitions
//!
//! This module contains the data structures that represent the server
//! configuration, including all the nested configuration sections. The
//! `Default` impl carries the compiled-in defaults; command-line options
//! override individual fields on top of it.

use bitflags::bitflags;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Main server configuration structure
#[derive(Debug, Clone, Serialize)]
pub struct ServerConf {
    pub server_id: String,

    /// Model repository paths. Repeated flags accumulate; the set keeps
    /// each path at most once.
    pub model_repository_paths: BTreeSet<String>,

    pub exit_on_error: bool,
    pub strict_model_config: bool,
    pub strict_readiness: bool,
    pub enable_model_namespacing: bool,
    pub exit_timeout_secs: i32,

    pub buffer_manager_thread_count: i32,
    pub model_load_thread_count: i32,
    pub min_supported_compute_capability: f64,

    pub backend_dir: String,
    pub repoagent_dir: String,

    /// (backend, setting, value) triples, in flag order.
    pub backend_config_settings: Vec<(String, String, String)>,
    /// (policy, setting, value) triples, in flag order.
    pub host_policies: Vec<(String, String, String)>,
    /// Per-device GPU memory fraction limit for model loading. The first
    /// entry for a device wins.
    pub model_load_gpu_limit: BTreeMap<i32, f64>,

    pub pinned_memory_pool_byte_size: i64,
    /// Per-device CUDA pool byte sizes; at most one entry per device, a
    /// repeated device replaces the earlier entry in place.
    pub cuda_pools: Vec<(i32, u64)>,

    pub log: LogConf,
    pub model_control: ModelControlConf,
    pub rate_limit: RateLimitConf,
    pub cache: CacheConf,
    pub trace: TraceConf,

    pub http: HttpConf,
    pub grpc: GrpcConf,
    pub sagemaker: SageMakerConf,
    pub vertex_ai: VertexAiConf,
    pub metrics: MetricsConf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize)]
pub struct LogConf {
    pub info: bool,
    pub warn: bool,
    pub error: bool,
    /// Zero disables verbose logging, values >= 1 enable it.
    pub verbose: i32,
    pub format: LogFormat,
    /// Empty means log to the console.
    pub file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogFormat {
    Default,
    Iso8601,
}

/// Model management configuration
#[derive(Debug, Clone, Serialize)]
pub struct ModelControlConf {
    pub mode: ModelControlMode,
    /// Only meaningful in poll mode; forced to zero otherwise.
    pub repository_poll_secs: i32,
    pub startup_models: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelControlMode {
    None,
    Poll,
    Explicit,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConf {
    pub mode: RateLimitMode,
    /// (resource, count, device) triples; device -1 applies to every device.
    pub resources: Vec<(String, i32, i32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateLimitMode {
    Off,
    ExecutionCount,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize)]
pub struct CacheConf {
    pub enable: bool,
    pub dir: String,
    /// Per-cache-name (setting, value) lists, in flag order.
    pub settings: BTreeMap<String, Vec<(String, String)>>,
}

bitflags! {
    /// Accumulated trace level. Repeated `--trace-level` flags OR their
    /// bits together; empty means tracing is disabled.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
    pub struct TraceLevel: u8 {
        const TIMESTAMPS = 0b01;
        const TENSORS = 0b10;
    }
}

/// Inference tracing configuration
#[derive(Debug, Clone, Serialize)]
pub struct TraceConf {
    pub filepath: String,
    pub level: TraceLevel,
    pub rate: i32,
    /// -1 means the number of sampled traces is not limited.
    pub count: i32,
    pub log_frequency: i32,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize)]
pub struct HttpConf {
    pub allow: bool,
    pub address: String,
    pub port: i32,
    pub reuse_port: bool,
    pub thread_count: i32,
}

/// gRPC endpoint configuration
#[derive(Debug, Clone, Serialize)]
pub struct GrpcConf {
    pub allow: bool,
    pub socket: GrpcSocketConf,
    pub infer_allocation_pool_size: i32,
    pub ssl: GrpcSslConf,
    pub infer_compression_level: GrpcCompressionLevel,
    pub keep_alive: GrpcKeepAliveConf,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrpcSocketConf {
    pub address: String,
    pub port: i32,
    pub reuse_port: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrpcSslConf {
    pub use_ssl: bool,
    pub use_mutual_auth: bool,
    pub server_cert: String,
    pub server_key: String,
    pub root_cert: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrpcCompressionLevel {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrpcKeepAliveConf {
    pub keepalive_time_ms: i32,
    pub keepalive_timeout_ms: i32,
    pub keepalive_permit_without_calls: bool,
    pub http2_max_pings_without_data: i32,
    pub http2_min_recv_ping_interval_without_data_ms: i32,
    pub http2_max_ping_strikes: i32,
}

/// SageMaker endpoint configuration. The only endpoint that may declare an
/// allowed port range constraining the other endpoints on its bind address.
#[derive(Debug, Clone, Serialize)]
pub struct SageMakerConf {
    pub allow: bool,
    pub address: String,
    pub port: i32,
    pub thread_count: i32,
    pub safe_port_range: Option<(i32, i32)>,
}

/// Vertex AI endpoint configuration
#[derive(Debug, Clone, Serialize)]
pub struct VertexAiConf {
    pub allow: bool,
    pub address: String,
    pub port: i32,
    pub thread_count: i32,
    pub default_model: String,
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Serialize)]
pub struct MetricsConf {
    pub allow: bool,
    pub allow_gpu: bool,
    pub allow_cpu: bool,
    pub address: String,
    pub port: i32,
    pub interval_ms: f64,
}

impl Default for ServerConf {
    fn default() -> Self {
        ServerConf {
            server_id: "modelserve".to_string(),
            model_repository_paths: BTreeSet::new(),
            exit_on_error: true,
            strict_model_config: false,
            strict_readiness: true,
            enable_model_namespacing: false,
            exit_timeout_secs: 30,
            buffer_manager_thread_count: 0,
            model_load_thread_count: default_model_load_threads(),
            min_supported_compute_capability: 6.0,
            backend_dir: "/opt/modelserve/backends".to_string(),
            repoagent_dir: "/opt/modelserve/repoagents".to_string(),
            backend_config_settings: Vec::new(),
            host_policies: Vec::new(),
            model_load_gpu_limit: BTreeMap::new(),
            pinned_memory_pool_byte_size: 1 << 28,
            cuda_pools: Vec::new(),
            log: LogConf {
                info: true,
                warn: true,
                error: true,
                verbose: 0,
                format: LogFormat::Default,
                file: String::new(),
            },
            model_control: ModelControlConf {
                mode: ModelControlMode::None,
                repository_poll_secs: 15,
                startup_models: BTreeSet::new(),
            },
            rate_limit: RateLimitConf {
                mode: RateLimitMode::Off,
                resources: Vec::new(),
            },
            cache: CacheConf {
                enable: false,
                dir: "/opt/modelserve/caches".to_string(),
                settings: BTreeMap::new(),
            },
            trace: TraceConf {
                filepath: String::new(),
                level: TraceLevel::empty(),
                rate: 1000,
                count: -1,
                log_frequency: 0,
            },
            http: HttpConf {
                allow: true,
                address: "0.0.0.0".to_string(),
                port: 8000,
                reuse_port: false,
                thread_count: 8,
            },
            grpc: GrpcConf {
                allow: true,
                socket: GrpcSocketConf {
                    address: "0.0.0.0".to_string(),
                    port: 8001,
                    reuse_port: false,
                },
                infer_allocation_pool_size: 8,
                ssl: GrpcSslConf {
                    use_ssl: false,
                    use_mutual_auth: false,
                    server_cert: String::new(),
                    server_key: String::new(),
                    root_cert: String::new(),
                },
                infer_compression_level: GrpcCompressionLevel::None,
                keep_alive: GrpcKeepAliveConf {
                    keepalive_time_ms: 7_200_000,
                    keepalive_timeout_ms: 20_000,
                    keepalive_permit_without_calls: false,
                    http2_max_pings_without_data: 2,
                    http2_min_recv_ping_interval_without_data_ms: 300_000,
                    http2_max_ping_strikes: 2,
                },
            },
            sagemaker: SageMakerConf {
                allow: false,
                address: "0.0.0.0".to_string(),
                port: 8080,
                thread_count: 8,
                safe_port_range: None,
            },
            vertex_ai: VertexAiConf {
                allow: false,
                address: "0.0.0.0".to_string(),
                port: 8080,
                thread_count: 8,
                default_model: String::new(),
            },
            metrics: MetricsConf {
                allow: true,
                allow_gpu: true,
                allow_cpu: true,
                address: "0.0.0.0".to_string(),
                port: 8002,
                interval_ms: 2000.0,
            },
        }
    }
}

fn default_model_load_threads() -> i32 {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cores * 2) as i32
}

//! Command-line option registry
//!
//! This module declares every recognized long-form flag: its destination
//! identifier, argument shape and help text. The registry is the single
//! source of truth for both flag matching and generated usage text.

/// Destination identifier for a recognized option. Two flags may share one
/// identifier (a legacy name aliased to the same destination field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionId {
    Help,

    LogVerbose,
    LogInfo,
    LogWarning,
    LogError,
    LogFormat,
    LogFile,

    ServerId,
    ModelRepository,
    ExitOnError,
    DisableAutoCompleteConfig,
    StrictModelConfig,
    StrictReadiness,

    AllowHttp,
    HttpPort,
    ReuseHttpPort,
    HttpAddress,
    HttpThreadCount,

    AllowGrpc,
    GrpcPort,
    ReuseGrpcPort,
    GrpcAddress,
    GrpcInferAllocationPoolSize,
    GrpcUseSsl,
    GrpcUseSslMutual,
    GrpcServerCert,
    GrpcServerKey,
    GrpcRootCert,
    GrpcResponseCompressionLevel,
    GrpcKeepAliveTime,
    GrpcKeepAliveTimeout,
    GrpcKeepAlivePermitWithoutCalls,
    GrpcHttp2MaxPingsWithoutData,
    GrpcHttp2MinRecvPingIntervalWithoutData,
    GrpcHttp2MaxPingStrikes,

    AllowSageMaker,
    SageMakerPort,
    SageMakerSafePortRange,
    SageMakerThreadCount,

    AllowVertexAi,
    VertexAiPort,
    VertexAiThreadCount,
    VertexAiDefaultModel,

    AllowMetrics,
    AllowGpuMetrics,
    AllowCpuMetrics,
    MetricsPort,
    MetricsIntervalMs,

    TraceFile,
    TraceLevel,
    TraceRate,
    TraceCount,
    TraceLogFrequency,

    ModelControlMode,
    RepositoryPollSecs,
    StartupModel,

    RateLimit,
    RateLimitResource,

    PinnedMemoryPoolByteSize,
    CudaMemoryPoolByteSize,

    ResponseCacheByteSize,
    CacheConfig,
    CacheDir,

    MinSupportedComputeCapability,
    ExitTimeoutSecs,
    BackendDir,
    RepoAgentDir,
    BufferManagerThreadCount,
    ModelLoadThreadCount,
    BackendConfig,
    HostPolicy,
    ModelLoadGpuLimit,
    ModelNamespacing,
}

/// Argument shape of one option. `Custom` carries the format hint rendered
/// in the usage text for compound shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    Bool,
    Int,
    Float,
    Str,
    Custom(&'static str),
}

/// Immutable metadata for one recognized flag.
#[derive(Debug, Clone, Copy)]
pub struct Opt {
    pub id: OptionId,
    pub flag: &'static str,
    pub arg: ArgKind,
    pub desc: &'static str,
}

impl Opt {
    pub fn takes_arg(&self) -> bool {
        !matches!(self.arg, ArgKind::None)
    }

    pub fn arg_hint(&self) -> Option<&'static str> {
        match self.arg {
            ArgKind::None => None,
            ArgKind::Bool => Some("<boolean>"),
            ArgKind::Int => Some("<integer>"),
            ArgKind::Float => Some("<float>"),
            ArgKind::Str => Some("<string>"),
            ArgKind::Custom(hint) => Some(hint),
        }
    }
}

const fn opt(id: OptionId, flag: &'static str, arg: ArgKind, desc: &'static str) -> Opt {
    Opt { id, flag, arg, desc }
}

/// Every recognized option, in usage-text emission order. Matching is by
/// exact flag-name equality; declaration order is not significant for it.
pub static RECOGNIZED_OPTIONS: &[Opt] = &[
    opt(OptionId::Help, "help", ArgKind::None, "Print usage"),
    opt(
        OptionId::LogVerbose,
        "log-verbose",
        ArgKind::Int,
        "Set verbose logging level. Zero (0) disables verbose logging and \
         values >= 1 enable verbose logging.",
    ),
    opt(
        OptionId::LogInfo,
        "log-info",
        ArgKind::Bool,
        "Enable/disable info-level logging.",
    ),
    opt(
        OptionId::LogWarning,
        "log-warning",
        ArgKind::Bool,
        "Enable/disable warning-level logging.",
    ),
    opt(
        OptionId::LogError,
        "log-error",
        ArgKind::Bool,
        "Enable/disable error-level logging.",
    ),
    opt(
        OptionId::LogFormat,
        "log-format",
        ArgKind::Str,
        "Set the logging format. Options are \"default\" and \"ISO8601\". \
         The default is \"default\".",
    ),
    opt(
        OptionId::LogFile,
        "log-file",
        ArgKind::Str,
        "Set the name of the log output file. If not specified, log outputs \
         stream to the console.",
    ),
    opt(
        OptionId::ServerId,
        "id",
        ArgKind::Str,
        "Identifier for this server.",
    ),
    opt(
        OptionId::ModelRepository,
        "model-store",
        ArgKind::Str,
        "Equivalent to --model-repository.",
    ),
    opt(
        OptionId::ModelRepository,
        "model-repository",
        ArgKind::Str,
        "Path to model repository directory. It may be specified multiple \
         times to add multiple model repositories.",
    ),
    opt(
        OptionId::ExitOnError,
        "exit-on-error",
        ArgKind::Bool,
        "Exit the server if an error occurs during initialization.",
    ),
    opt(
        OptionId::DisableAutoCompleteConfig,
        "disable-auto-complete-config",
        ArgKind::None,
        "If set, disables the server and backends from auto completing model \
         configuration files. Model configuration files must be provided and \
         all required configuration settings must be specified.",
    ),
    opt(
        OptionId::StrictModelConfig,
        "strict-model-config",
        ArgKind::Bool,
        "DEPRECATED: If true model configuration files must be provided and \
         all required configuration settings must be specified. If false the \
         server will attempt to derive the missing required configuration.",
    ),
    opt(
        OptionId::StrictReadiness,
        "strict-readiness",
        ArgKind::Bool,
        "If true the readiness endpoint indicates ready only when the server \
         is responsive and all models are available.",
    ),
    opt(
        OptionId::AllowHttp,
        "allow-http",
        ArgKind::Bool,
        "Allow the server to listen for HTTP requests.",
    ),
    opt(
        OptionId::HttpPort,
        "http-port",
        ArgKind::Int,
        "The port for the server to listen on for HTTP requests.",
    ),
    opt(
        OptionId::ReuseHttpPort,
        "reuse-http-port",
        ArgKind::Bool,
        "Allow multiple servers to listen on the same HTTP port when every \
         server has this option set.",
    ),
    opt(
        OptionId::HttpAddress,
        "http-address",
        ArgKind::Str,
        "The address for the http server to bind to.",
    ),
    opt(
        OptionId::HttpThreadCount,
        "http-thread-count",
        ArgKind::Int,
        "Number of threads handling HTTP requests.",
    ),
    opt(
        OptionId::AllowGrpc,
        "allow-grpc",
        ArgKind::Bool,
        "Allow the server to listen for GRPC requests.",
    ),
    opt(
        OptionId::GrpcPort,
        "grpc-port",
        ArgKind::Int,
        "The port for the server to listen on for GRPC requests.",
    ),
    opt(
        OptionId::ReuseGrpcPort,
        "reuse-grpc-port",
        ArgKind::Bool,
        "Allow multiple servers to listen on the same GRPC port when every \
         server has this option set.",
    ),
    opt(
        OptionId::GrpcAddress,
        "grpc-address",
        ArgKind::Str,
        "The address for the grpc server to bind to.",
    ),
    opt(
        OptionId::GrpcInferAllocationPoolSize,
        "grpc-infer-allocation-pool-size",
        ArgKind::Int,
        "The maximum number of inference request/response objects that \
         remain allocated for reuse.",
    ),
    opt(
        OptionId::GrpcUseSsl,
        "grpc-use-ssl",
        ArgKind::Bool,
        "Use SSL authentication for GRPC requests. Default is false.",
    ),
    opt(
        OptionId::GrpcUseSslMutual,
        "grpc-use-ssl-mutual",
        ArgKind::Bool,
        "Use mutual SSL authentication for GRPC requests. This option will \
         preempt '--grpc-use-ssl' if it is also specified. Default is false.",
    ),
    opt(
        OptionId::GrpcServerCert,
        "grpc-server-cert",
        ArgKind::Str,
        "File holding PEM-encoded server certificate. Ignored unless \
         --grpc-use-ssl is true.",
    ),
    opt(
        OptionId::GrpcServerKey,
        "grpc-server-key",
        ArgKind::Str,
        "File holding PEM-encoded server key. Ignored unless --grpc-use-ssl \
         is true.",
    ),
    opt(
        OptionId::GrpcRootCert,
        "grpc-root-cert",
        ArgKind::Str,
        "File holding PEM-encoded root certificate. Ignored unless \
         --grpc-use-ssl is true.",
    ),
    opt(
        OptionId::GrpcResponseCompressionLevel,
        "grpc-infer-response-compression-level",
        ArgKind::Str,
        "The compression level to be used while returning the infer response \
         to the peer. Allowed values are none, low, medium and high. Default \
         is none.",
    ),
    opt(
        OptionId::GrpcKeepAliveTime,
        "grpc-keepalive-time",
        ArgKind::Int,
        "The period (in milliseconds) after which a keepalive ping is sent \
         on the transport. Default is 7200000 (2 hours).",
    ),
    opt(
        OptionId::GrpcKeepAliveTimeout,
        "grpc-keepalive-timeout",
        ArgKind::Int,
        "The period (in milliseconds) the sender of the keepalive ping waits \
         for an acknowledgement before closing the connection. Default is \
         20000 (20 seconds).",
    ),
    opt(
        OptionId::GrpcKeepAlivePermitWithoutCalls,
        "grpc-keepalive-permit-without-calls",
        ArgKind::Bool,
        "Allows keepalive pings to be sent even if there are no calls in \
         flight. Default is false.",
    ),
    opt(
        OptionId::GrpcHttp2MaxPingsWithoutData,
        "grpc-http2-max-pings-without-data",
        ArgKind::Int,
        "The maximum number of pings that can be sent when there is no \
         data/header frame to be sent. Setting it to 0 allows sending pings \
         without such a restriction. Default is 2.",
    ),
    opt(
        OptionId::GrpcHttp2MinRecvPingIntervalWithoutData,
        "grpc-http2-min-recv-ping-interval-without-data",
        ArgKind::Int,
        "The minimum time (in milliseconds) expected between successive \
         pings when there are no data/header frames being sent on the \
         transport. A faster ping counts as a ping strike. Default is \
         300000 (5 minutes).",
    ),
    opt(
        OptionId::GrpcHttp2MaxPingStrikes,
        "grpc-http2-max-ping-strikes",
        ArgKind::Int,
        "Maximum number of bad pings the server tolerates before closing the \
         transport. Setting it to 0 allows any number of bad pings. Default \
         is 2.",
    ),
    opt(
        OptionId::AllowSageMaker,
        "allow-sagemaker",
        ArgKind::Bool,
        "Allow the server to listen for SageMaker requests. Default is \
         false.",
    ),
    opt(
        OptionId::SageMakerPort,
        "sagemaker-port",
        ArgKind::Int,
        "The port for the server to listen on for SageMaker requests. \
         Default is 8080.",
    ),
    opt(
        OptionId::SageMakerSafePortRange,
        "sagemaker-safe-port-range",
        ArgKind::Custom("<integer>-<integer>"),
        "Set the allowed port range for endpoints other than the SageMaker \
         endpoints.",
    ),
    opt(
        OptionId::SageMakerThreadCount,
        "sagemaker-thread-count",
        ArgKind::Int,
        "Number of threads handling SageMaker requests. Default is 8.",
    ),
    opt(
        OptionId::AllowVertexAi,
        "allow-vertex-ai",
        ArgKind::Bool,
        "Allow the server to listen for Vertex AI requests. Default is true \
         if AIP_MODE=PREDICTION, false otherwise.",
    ),
    opt(
        OptionId::VertexAiPort,
        "vertex-ai-port",
        ArgKind::Int,
        "The port for the server to listen on for Vertex AI requests. \
         Default is AIP_HTTP_PORT if set, 8080 otherwise.",
    ),
    opt(
        OptionId::VertexAiThreadCount,
        "vertex-ai-thread-count",
        ArgKind::Int,
        "Number of threads handling Vertex AI requests. Default is 8.",
    ),
    opt(
        OptionId::VertexAiDefaultModel,
        "vertex-ai-default-model",
        ArgKind::Str,
        "The name of the model to use for single-model inference requests.",
    ),
    opt(
        OptionId::AllowMetrics,
        "allow-metrics",
        ArgKind::Bool,
        "Allow the server to provide prometheus metrics.",
    ),
    opt(
        OptionId::AllowGpuMetrics,
        "allow-gpu-metrics",
        ArgKind::Bool,
        "Allow the server to provide GPU metrics. Ignored unless \
         --allow-metrics is true.",
    ),
    opt(
        OptionId::AllowCpuMetrics,
        "allow-cpu-metrics",
        ArgKind::Bool,
        "Allow the server to provide CPU metrics. Ignored unless \
         --allow-metrics is true.",
    ),
    opt(
        OptionId::MetricsPort,
        "metrics-port",
        ArgKind::Int,
        "The port reporting prometheus metrics.",
    ),
    opt(
        OptionId::MetricsIntervalMs,
        "metrics-interval-ms",
        ArgKind::Float,
        "Metrics will be collected once every <metrics-interval-ms> \
         milliseconds. Default is 2000 milliseconds.",
    ),
    opt(
        OptionId::TraceFile,
        "trace-file",
        ArgKind::Str,
        "Set the file where trace output will be saved. If \
         --trace-log-frequency is also specified, this argument value is the \
         prefix of the files to save the trace output.",
    ),
    opt(
        OptionId::TraceLevel,
        "trace-level",
        ArgKind::Str,
        "Specify a trace level. OFF to disable tracing, TIMESTAMPS to trace \
         timestamps, TENSORS to trace tensors. It may be specified multiple \
         times to trace multiple information. Default is OFF.",
    ),
    opt(
        OptionId::TraceRate,
        "trace-rate",
        ArgKind::Int,
        "Set the trace sampling rate. Default is 1000.",
    ),
    opt(
        OptionId::TraceCount,
        "trace-count",
        ArgKind::Int,
        "Set the number of traces to be sampled. If the value is -1, the \
         number of traces to be sampled will not be limited. Default is -1.",
    ),
    opt(
        OptionId::TraceLogFrequency,
        "trace-log-frequency",
        ArgKind::Int,
        "Set the trace log frequency. If the value is 0, the server will \
         only log the trace output to <trace-file> when shutting down. \
         Otherwise, the server will log to <trace-file>.<idx> every time the \
         specified number of traces is collected. Default is 0.",
    ),
    opt(
        OptionId::ModelControlMode,
        "model-control-mode",
        ArgKind::Str,
        "Specify the mode for model management. Options are \"none\", \
         \"poll\" and \"explicit\". The default is \"none\". For \"none\", \
         the server will load all models in the model repository(s) at \
         startup. For \"poll\", the server will poll the model repository(s) \
         to detect changes, at the rate controlled by 'repository-poll-secs'. \
         For \"explicit\", model load and unload is initiated by the model \
         control APIs, and only models specified with --load-model will be \
         loaded at startup.",
    ),
    opt(
        OptionId::RepositoryPollSecs,
        "repository-poll-secs",
        ArgKind::Int,
        "Interval in seconds between each poll of the model repository to \
         check for changes. Valid only when --model-control-mode=poll is \
         specified.",
    ),
    opt(
        OptionId::StartupModel,
        "load-model",
        ArgKind::Str,
        "Name of the model to be loaded on server startup. It may be \
         specified multiple times to add multiple models. Note that this \
         option will only take effect if --model-control-mode=explicit is \
         true.",
    ),
    opt(
        OptionId::RateLimit,
        "rate-limit",
        ArgKind::Str,
        "Specify the mode for rate limiting. Options are \
         \"execution_count\" and \"off\". The default is \"off\". For \
         \"execution_count\", the server will determine the instance using \
         configured priority and the number of times the instance has been \
         used to run inference. For \"off\", the server will ignore any rate \
         limiter config and run inference as soon as an instance is ready.",
    ),
    opt(
        OptionId::RateLimitResource,
        "rate-limit-resource",
        ArgKind::Custom("<string>:<integer>:<integer>"),
        "The number of resources available to the server, in the format \
         --rate-limit-resource=<resource_name>:<count>:<device>. The \
         <device> is optional and if not listed will be applied to every \
         device. This flag can be specified multiple times to specify each \
         resource and its availability.",
    ),
    opt(
        OptionId::PinnedMemoryPoolByteSize,
        "pinned-memory-pool-byte-size",
        ArgKind::Int,
        "The total byte size that can be allocated as pinned system memory, \
         used to accelerate data transfer between host and devices. Default \
         is 256 MB.",
    ),
    opt(
        OptionId::CudaMemoryPoolByteSize,
        "cuda-memory-pool-byte-size",
        ArgKind::Custom("<integer>:<integer>"),
        "The total byte size that can be allocated as CUDA memory for the \
         GPU device, as 2 integers separated by a colon in the format \
         <GPU device ID>:<pool byte size>. This option can be used multiple \
         times, but only once per GPU device; subsequent uses overwrite \
         previous uses for the same device. Default is 64 MB.",
    ),
    opt(
        OptionId::ResponseCacheByteSize,
        "response-cache-byte-size",
        ArgKind::Int,
        "DEPRECATED: Please use --cache-config instead.",
    ),
    opt(
        OptionId::CacheConfig,
        "cache-config",
        ArgKind::Custom("<string>,<string>=<string>"),
        "Specify a cache-specific configuration setting, in the format \
         --cache-config=<cache_name>,<setting>=<value>. Where <cache_name> \
         is the name of the cache, such as 'local' or 'redis'. Example: \
         --cache-config=local,size=1048576 will configure a 'local' cache \
         implementation with a fixed buffer pool of size 1048576 bytes.",
    ),
    opt(
        OptionId::CacheDir,
        "cache-directory",
        ArgKind::Str,
        "The global directory searched for cache shared libraries. Default \
         is '/opt/modelserve/caches'.",
    ),
    opt(
        OptionId::MinSupportedComputeCapability,
        "min-supported-compute-capability",
        ArgKind::Float,
        "The minimum supported CUDA compute capability. GPUs that don't \
         support this compute capability will not be used by the server.",
    ),
    opt(
        OptionId::ExitTimeoutSecs,
        "exit-timeout-secs",
        ArgKind::Int,
        "Timeout (in seconds) when exiting to wait for in-flight inferences \
         to finish. After the timeout expires the server exits even if \
         inferences are still in flight.",
    ),
    opt(
        OptionId::BackendDir,
        "backend-directory",
        ArgKind::Str,
        "The global directory searched for backend shared libraries. \
         Default is '/opt/modelserve/backends'.",
    ),
    opt(
        OptionId::RepoAgentDir,
        "repoagent-directory",
        ArgKind::Str,
        "The global directory searched for repository agent shared \
         libraries. Default is '/opt/modelserve/repoagents'.",
    ),
    opt(
        OptionId::BufferManagerThreadCount,
        "buffer-manager-thread-count",
        ArgKind::Int,
        "The number of threads used to accelerate copies and other \
         operations required to manage input and output tensor contents. \
         Default is 0.",
    ),
    opt(
        OptionId::ModelLoadThreadCount,
        "model-load-thread-count",
        ArgKind::Int,
        "The number of threads used to concurrently load models in model \
         repositories. Default is 2*<num_cpu_cores>.",
    ),
    opt(
        OptionId::BackendConfig,
        "backend-config",
        ArgKind::Custom("<string>,<string>=<string>"),
        "Specify a backend-specific configuration setting, in the format \
         --backend-config=<backend_name>,<setting>=<value>. Where \
         <backend_name> is the name of the backend, such as 'tensorrt'.",
    ),
    opt(
        OptionId::HostPolicy,
        "host-policy",
        ArgKind::Custom("<string>,<string>=<string>"),
        "Specify a host policy setting associated with a policy name, in \
         the format --host-policy=<policy_name>,<setting>=<value>. \
         Currently supported settings are 'numa-node' and 'cpu-cores'.",
    ),
    opt(
        OptionId::ModelLoadGpuLimit,
        "model-load-gpu-limit",
        ArgKind::Custom("<device_id>:<fraction>"),
        "Specify the limit on GPU memory usage as a fraction. If model \
         loading on the device is requested and the current memory usage \
         exceeds the limit, the load will be rejected. If not specified, \
         the limit will not be set.",
    ),
    opt(
        OptionId::ModelNamespacing,
        "model-namespacing",
        ArgKind::Bool,
        "Whether model namespacing is enabled or not. If true, models with \
         the same name can be served if they are in different namespaces.",
    ),
];

/// Exact, case-sensitive lookup of a flag name (without the `--` prefix).
pub fn find_option(flag: &str) -> Option<&'static Opt> {
    RECOGNIZED_OPTIONS.iter().find(|o| o.flag == flag)
}

/// Render the usage text by iterating the registry in declared order.
pub fn usage() -> String {
    let mut out = String::new();
    for o in RECOGNIZED_OPTIONS {
        match o.arg_hint() {
            Some(hint) => {
                out.push_str(&format!("  --{} {}\n\t{}\n", o.flag, hint, wrap(o.desc, 60)))
            }
            None => out.push_str(&format!("  --{}\n\t{}\n", o.flag, wrap(o.desc, 60))),
        }
    }
    out
}

// Greedy word wrap; continuation lines keep the tab indent.
fn wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n\t")
}

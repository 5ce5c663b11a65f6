//! Server options builder boundary
//!
//! Marshals the validated configuration into the runtime's option set, one
//! builder call per field. This is a straight field-by-field hand-off with
//! no decision logic beyond the documented clamps; any failure reported by
//! the builder is terminal.

use eyre::{Context, Result};
use serde_json::{Map, Value};

use crate::rust::configuration::model::{
    LogFormat, ModelControlMode, RateLimitMode, ServerConf, TraceLevel,
};

/// The fully marshaled option set consumed by the server runtime.
#[derive(Debug, Default, Clone)]
pub struct ServerOptions {
    pub server_id: String,
    pub model_repository_paths: Vec<String>,
    pub model_control_mode: ModelControlModeOption,
    pub startup_models: Vec<String>,
    pub repository_poll_secs: i32,
    pub rate_limit_mode: RateLimitModeOption,
    pub rate_limit_resources: Vec<(String, i32, i32)>,
    pub pinned_memory_pool_byte_size: i64,
    pub cuda_memory_pool_byte_sizes: Vec<(i32, u64)>,
    pub min_supported_compute_capability: f64,
    pub exit_on_error: bool,
    pub strict_model_config: bool,
    pub strict_readiness: bool,
    pub exit_timeout_secs: i32,
    pub buffer_manager_thread_count: i32,
    pub model_load_thread_count: i32,
    pub model_namespacing: bool,
    pub log_file: String,
    pub log_info: bool,
    pub log_warn: bool,
    pub log_error: bool,
    pub log_verbose: i32,
    pub log_format: LogFormatOption,
    pub metrics: bool,
    pub gpu_metrics: bool,
    pub cpu_metrics: bool,
    pub metrics_interval_ms: f64,
    pub backend_dir: String,
    pub repoagent_dir: String,
    pub cache_dir: Option<String>,
    /// (cache name, JSON-encoded settings object) pairs.
    pub cache_configs: Vec<(String, String)>,
    pub backend_configs: Vec<(String, String, String)>,
    pub host_policies: Vec<(String, String, String)>,
    pub model_load_gpu_limits: Vec<(i32, f64)>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModelControlModeOption {
    #[default]
    None,
    Poll,
    Explicit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitModeOption {
    #[default]
    Off,
    ExecutionCount,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatOption {
    #[default]
    Default,
    Iso8601,
}

/// Builder over [`ServerOptions`]. Mirrors the native runtime API: one
/// fallible setter per option.
#[derive(Debug, Default)]
pub struct ServerOptionsBuilder {
    options: ServerOptions,
}

impl ServerOptionsBuilder {
    pub fn new() -> Self {
        ServerOptionsBuilder::default()
    }

    pub fn set_server_id(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            eyre::bail!("server id must not be empty");
        }
        self.options.server_id = id.to_string();
        Ok(())
    }

    pub fn add_model_repository_path(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            eyre::bail!("model repository path must not be empty");
        }
        self.options.model_repository_paths.push(path.to_string());
        Ok(())
    }

    pub fn set_model_control_mode(&mut self, mode: ModelControlModeOption) -> Result<()> {
        self.options.model_control_mode = mode;
        Ok(())
    }

    pub fn add_startup_model(&mut self, model: &str) -> Result<()> {
        self.options.startup_models.push(model.to_string());
        Ok(())
    }

    pub fn set_repository_poll_secs(&mut self, secs: i32) -> Result<()> {
        self.options.repository_poll_secs = secs;
        Ok(())
    }

    pub fn set_rate_limiter_mode(&mut self, mode: RateLimitModeOption) -> Result<()> {
        self.options.rate_limit_mode = mode;
        Ok(())
    }

    pub fn add_rate_limiter_resource(
        &mut self,
        name: &str,
        count: i32,
        device: i32,
    ) -> Result<()> {
        self.options
            .rate_limit_resources
            .push((name.to_string(), count, device));
        Ok(())
    }

    pub fn set_pinned_memory_pool_byte_size(&mut self, size: i64) -> Result<()> {
        self.options.pinned_memory_pool_byte_size = size;
        Ok(())
    }

    pub fn set_cuda_memory_pool_byte_size(&mut self, device: i32, size: u64) -> Result<()> {
        self.options.cuda_memory_pool_byte_sizes.push((device, size));
        Ok(())
    }

    pub fn set_min_supported_compute_capability(&mut self, capability: f64) -> Result<()> {
        self.options.min_supported_compute_capability = capability;
        Ok(())
    }

    pub fn set_exit_on_error(&mut self, exit: bool) -> Result<()> {
        self.options.exit_on_error = exit;
        Ok(())
    }

    pub fn set_strict_model_config(&mut self, strict: bool) -> Result<()> {
        self.options.strict_model_config = strict;
        Ok(())
    }

    pub fn set_strict_readiness(&mut self, strict: bool) -> Result<()> {
        self.options.strict_readiness = strict;
        Ok(())
    }

    pub fn set_exit_timeout(&mut self, secs: i32) -> Result<()> {
        self.options.exit_timeout_secs = secs;
        Ok(())
    }

    pub fn set_buffer_manager_thread_count(&mut self, count: i32) -> Result<()> {
        self.options.buffer_manager_thread_count = count;
        Ok(())
    }

    pub fn set_model_load_thread_count(&mut self, count: i32) -> Result<()> {
        self.options.model_load_thread_count = count;
        Ok(())
    }

    pub fn set_model_namespacing(&mut self, enable: bool) -> Result<()> {
        self.options.model_namespacing = enable;
        Ok(())
    }

    pub fn set_log_file(&mut self, file: &str) -> Result<()> {
        self.options.log_file = file.to_string();
        Ok(())
    }

    pub fn set_log_info(&mut self, enable: bool) -> Result<()> {
        self.options.log_info = enable;
        Ok(())
    }

    pub fn set_log_warn(&mut self, enable: bool) -> Result<()> {
        self.options.log_warn = enable;
        Ok(())
    }

    pub fn set_log_error(&mut self, enable: bool) -> Result<()> {
        self.options.log_error = enable;
        Ok(())
    }

    pub fn set_log_verbose(&mut self, level: i32) -> Result<()> {
        self.options.log_verbose = level;
        Ok(())
    }

    pub fn set_log_format(&mut self, format: LogFormatOption) -> Result<()> {
        self.options.log_format = format;
        Ok(())
    }

    pub fn set_metrics(&mut self, enable: bool) -> Result<()> {
        self.options.metrics = enable;
        Ok(())
    }

    pub fn set_gpu_metrics(&mut self, enable: bool) -> Result<()> {
        self.options.gpu_metrics = enable;
        Ok(())
    }

    pub fn set_cpu_metrics(&mut self, enable: bool) -> Result<()> {
        self.options.cpu_metrics = enable;
        Ok(())
    }

    pub fn set_metrics_interval(&mut self, interval_ms: f64) -> Result<()> {
        self.options.metrics_interval_ms = interval_ms;
        Ok(())
    }

    pub fn set_backend_directory(&mut self, dir: &str) -> Result<()> {
        self.options.backend_dir = dir.to_string();
        Ok(())
    }

    pub fn set_repoagent_directory(&mut self, dir: &str) -> Result<()> {
        self.options.repoagent_dir = dir.to_string();
        Ok(())
    }

    pub fn set_cache_directory(&mut self, dir: &str) -> Result<()> {
        self.options.cache_dir = Some(dir.to_string());
        Ok(())
    }

    pub fn set_cache_config(&mut self, name: &str, json_config: &str) -> Result<()> {
        self.options
            .cache_configs
            .push((name.to_string(), json_config.to_string()));
        Ok(())
    }

    pub fn set_backend_config(&mut self, backend: &str, setting: &str, value: &str) -> Result<()> {
        self.options
            .backend_configs
            .push((backend.to_string(), setting.to_string(), value.to_string()));
        Ok(())
    }

    pub fn set_host_policy(&mut self, policy: &str, setting: &str, value: &str) -> Result<()> {
        self.options
            .host_policies
            .push((policy.to_string(), setting.to_string(), value.to_string()));
        Ok(())
    }

    pub fn set_model_load_device_limit(&mut self, device: i32, fraction: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&fraction) {
            eyre::bail!("model load GPU limit must be a fraction in [0, 1], got {fraction}");
        }
        self.options.model_load_gpu_limits.push((device, fraction));
        Ok(())
    }

    pub fn into_options(self) -> ServerOptions {
        self.options
    }
}

/// Encode per-cache (setting, value) pairs as a JSON object string.
fn settings_to_json(settings: &[(String, String)]) -> Result<String> {
    let mut object = Map::new();
    for (setting, value) in settings {
        object.insert(setting.clone(), Value::String(value.clone()));
    }
    serde_json::to_string(&Value::Object(object)).wrap_err("failed to convert config to JSON")
}

/// Marshal the validated configuration into the runtime option set. Each
/// configuration field maps to exactly one builder call.
pub fn build_server_options(conf: &ServerConf) -> Result<ServerOptions> {
    let mut builder = ServerOptionsBuilder::new();

    builder
        .set_server_id(&conf.server_id)
        .wrap_err("setting server ID")?;
    for path in &conf.model_repository_paths {
        builder
            .add_model_repository_path(path)
            .wrap_err("setting model repository path")?;
    }
    let control_mode = match conf.model_control.mode {
        ModelControlMode::None => ModelControlModeOption::None,
        ModelControlMode::Poll => ModelControlModeOption::Poll,
        ModelControlMode::Explicit => ModelControlModeOption::Explicit,
    };
    builder
        .set_model_control_mode(control_mode)
        .wrap_err("setting model control mode")?;
    for model in &conf.model_control.startup_models {
        builder
            .add_startup_model(model)
            .wrap_err("setting startup model")?;
    }
    builder
        .set_repository_poll_secs(conf.model_control.repository_poll_secs)
        .wrap_err("setting repository poll interval")?;

    let rate_limit_mode = match conf.rate_limit.mode {
        RateLimitMode::Off => RateLimitModeOption::Off,
        RateLimitMode::ExecutionCount => RateLimitModeOption::ExecutionCount,
    };
    builder
        .set_rate_limiter_mode(rate_limit_mode)
        .wrap_err("setting rate limiter configuration")?;
    for (name, count, device) in &conf.rate_limit.resources {
        builder
            .add_rate_limiter_resource(name, *count, *device)
            .wrap_err("setting rate limiter resource")?;
    }

    builder
        .set_pinned_memory_pool_byte_size(conf.pinned_memory_pool_byte_size)
        .wrap_err("setting total pinned memory byte size")?;
    for (device, size) in &conf.cuda_pools {
        builder
            .set_cuda_memory_pool_byte_size(*device, *size)
            .wrap_err("setting total CUDA memory byte size")?;
    }
    builder
        .set_min_supported_compute_capability(conf.min_supported_compute_capability)
        .wrap_err("setting minimum supported CUDA compute capability")?;
    builder
        .set_exit_on_error(conf.exit_on_error)
        .wrap_err("setting exit on error")?;
    builder
        .set_strict_model_config(conf.strict_model_config)
        .wrap_err("setting strict model configuration")?;
    builder
        .set_strict_readiness(conf.strict_readiness)
        .wrap_err("setting strict readiness")?;
    builder
        .set_exit_timeout(conf.exit_timeout_secs.max(0))
        .wrap_err("setting exit timeout")?;
    builder
        .set_buffer_manager_thread_count(conf.buffer_manager_thread_count.max(0))
        .wrap_err("setting buffer manager thread count")?;
    builder
        .set_model_load_thread_count(conf.model_load_thread_count.max(1))
        .wrap_err("setting model load thread count")?;
    builder
        .set_model_namespacing(conf.enable_model_namespacing)
        .wrap_err("setting model namespacing")?;

    builder
        .set_log_file(&conf.log.file)
        .wrap_err("setting log file")?;
    builder
        .set_log_info(conf.log.info)
        .wrap_err("setting log info enable")?;
    builder
        .set_log_warn(conf.log.warn)
        .wrap_err("setting log warn enable")?;
    builder
        .set_log_error(conf.log.error)
        .wrap_err("setting log error enable")?;
    builder
        .set_log_verbose(conf.log.verbose)
        .wrap_err("setting log verbose level")?;
    let log_format = match conf.log.format {
        LogFormat::Default => LogFormatOption::Default,
        LogFormat::Iso8601 => LogFormatOption::Iso8601,
    };
    builder
        .set_log_format(log_format)
        .wrap_err("setting log format")?;

    builder
        .set_metrics(conf.metrics.allow)
        .wrap_err("setting metrics enable")?;
    builder
        .set_gpu_metrics(conf.metrics.allow_gpu)
        .wrap_err("setting GPU metrics enable")?;
    builder
        .set_cpu_metrics(conf.metrics.allow_cpu)
        .wrap_err("setting CPU metrics enable")?;
    builder
        .set_metrics_interval(conf.metrics.interval_ms)
        .wrap_err("setting metrics interval")?;

    builder
        .set_backend_directory(&conf.backend_dir)
        .wrap_err("setting backend directory")?;

    // Cache directory and per-cache configs only apply when a cache CLI
    // flag enabled the cache; an empty settings object is allowed.
    if conf.cache.enable {
        builder
            .set_cache_directory(&conf.cache.dir)
            .wrap_err("setting cache directory")?;
        for (name, settings) in &conf.cache.settings {
            let json_config = settings_to_json(settings)?;
            builder
                .set_cache_config(name, &json_config)
                .wrap_err("setting cache configuration")?;
        }
    }

    builder
        .set_repoagent_directory(&conf.repoagent_dir)
        .wrap_err("setting repository agent directory")?;
    for (backend, setting, value) in &conf.backend_config_settings {
        builder
            .set_backend_config(backend, setting, value)
            .wrap_err("setting backend configuration")?;
    }
    for (device, fraction) in &conf.model_load_gpu_limit {
        builder
            .set_model_load_device_limit(*device, *fraction)
            .wrap_err("setting model load GPU limit")?;
    }
    for (policy, setting, value) in &conf.host_policies {
        builder
            .set_host_policy(policy, setting, value)
            .wrap_err("setting host policy")?;
    }

    Ok(builder.into_options())
}

// Trace settings stay outside the runtime option set; the trace collector
// consumes them directly from the configuration.
pub fn trace_enabled(conf: &ServerConf) -> bool {
    conf.trace.level != TraceLevel::empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rust::configuration::model::ServerConf;

    #[test]
    fn test_marshal_of_default_configuration() {
        let options = build_server_options(&ServerConf::default()).unwrap();
        assert_eq!(options.server_id, "modelserve");
        assert_eq!(options.model_control_mode, ModelControlModeOption::None);
        assert_eq!(options.pinned_memory_pool_byte_size, 1 << 28);
        assert!(options.cache_dir.is_none());
        assert!(options.cache_configs.is_empty());
    }

    #[test]
    fn test_thread_count_and_timeout_clamps() {
        let mut conf = ServerConf::default();
        conf.exit_timeout_secs = -5;
        conf.buffer_manager_thread_count = -1;
        conf.model_load_thread_count = 0;
        let options = build_server_options(&conf).unwrap();
        assert_eq!(options.exit_timeout_secs, 0);
        assert_eq!(options.buffer_manager_thread_count, 0);
        assert_eq!(options.model_load_thread_count, 1);
    }

    #[test]
    fn test_cache_settings_render_as_json_object() {
        let mut conf = ServerConf::default();
        conf.cache.enable = true;
        conf.cache.settings.insert(
            "local".to_string(),
            vec![("size".to_string(), "1048576".to_string())],
        );
        let options = build_server_options(&conf).unwrap();
        assert_eq!(options.cache_dir.as_deref(), Some("/opt/modelserve/caches"));
        assert_eq!(
            options.cache_configs,
            vec![("local".to_string(), "{\"size\":\"1048576\"}".to_string())]
        );
    }

    #[test]
    fn test_out_of_range_gpu_limit_is_a_builder_error() {
        let mut conf = ServerConf::default();
        conf.model_load_gpu_limit.insert(0, 1.5);
        assert!(build_server_options(&conf).is_err());
    }

    #[test]
    fn test_trace_enabled_follows_level() {
        let mut conf = ServerConf::default();
        assert!(!trace_enabled(&conf));
        conf.trace.level = crate::rust::configuration::model::TraceLevel::TIMESTAMPS;
        assert!(trace_enabled(&conf));
    }
}

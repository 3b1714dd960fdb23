use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub watch: WatchConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under /debug (the preview UI). Not served when omitted.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub images_path: String,
    pub gps_path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Max buffered path events; when full the oldest are dropped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_frame_extension")]
    pub frame_extension: String,
    #[serde(default = "default_gps_extension")]
    pub gps_extension: String,
    /// Substring a path must contain to be treated as a GPS batch.
    #[serde(default = "default_gps_marker")]
    pub gps_marker: String,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_frame_extension() -> String {
    "jpg".into()
}

fn default_gps_extension() -> String {
    "json".into()
}

fn default_gps_marker() -> String {
    "gps".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramesConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpsConfig {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// How often expired buckets are evicted. 0 disables eviction.
    #[serde(default = "default_evict_interval_secs")]
    pub evict_interval_secs: u64,
    /// Average the tdop field under the vdop name, as older capture tooling did.
    #[serde(default)]
    pub vdop_from_tdop: bool,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            evict_interval_secs: default_evict_interval_secs(),
            vdop_from_tdop: false,
        }
    }
}

fn default_retention_secs() -> u64 {
    2 * 60 * 60
}

fn default_evict_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Delay between the two CPU counter reads of one sample.
    #[serde(default = "default_cpu_sample_delay_ms")]
    pub cpu_sample_delay_ms: u64,
    /// How often to log app stats (frame rate, totals, drops) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            cpu_sample_delay_ms: default_cpu_sample_delay_ms(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_cpu_sample_delay_ms() -> u64 {
    1000
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.watch.images_path.is_empty(),
            "watch.images_path must be non-empty"
        );
        anyhow::ensure!(
            !self.watch.gps_path.is_empty(),
            "watch.gps_path must be non-empty"
        );
        anyhow::ensure!(
            self.watch.poll_interval_ms > 0,
            "watch.poll_interval_ms must be > 0, got {}",
            self.watch.poll_interval_ms
        );
        anyhow::ensure!(
            self.watch.channel_capacity > 0,
            "watch.channel_capacity must be > 0, got {}",
            self.watch.channel_capacity
        );
        anyhow::ensure!(
            !self.watch.frame_extension.is_empty() && !self.watch.gps_extension.is_empty(),
            "watch.frame_extension and watch.gps_extension must be non-empty"
        );
        anyhow::ensure!(
            !self.watch.gps_marker.is_empty(),
            "watch.gps_marker must be non-empty"
        );
        anyhow::ensure!(
            self.frames.window_secs > 0,
            "frames.window_secs must be > 0, got {}",
            self.frames.window_secs
        );
        anyhow::ensure!(
            self.gps.retention_secs > 0,
            "gps.retention_secs must be > 0, got {}",
            self.gps.retention_secs
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}

//! Construction time configuration of the supervisor, and the board's fixed electrical limits.

use tracing::level_filters::LevelFilter;

use crate::{
    error::{Error, Result},
    hal::Duration,
};

/// Input voltage limit used unless one is configured.
pub const DEFAULT_VOLTAGE_LIMIT: f32 = 17.2;
/// No configured limit may exceed this.
pub const ABSOLUTE_MAX_VOLTAGE_LIMIT: f32 = 18.0;
/// Minimum operating voltage of the board.
pub const VOLTAGE_LOWER_LIMIT: f32 = 4.8;
/// Below this there is no input voltage at all.
pub const VOLTAGE_ZERO_LEVEL: f32 = 0.2;
/// Below this a live output is considered shorted.
pub const VOLTAGE_SHORT_LEVEL: f32 = 0.5;
pub const DEFAULT_CURRENT_LIMIT: f32 = 20.0;
pub const DEFAULT_TEMPERATURE_LIMIT: f32 = 80.0;
/// Consecutive low input readings tolerated before an under-voltage fault.
pub const UNDER_VOLTAGE_COUNT_LIMIT: u8 = 3;

/// Longest the output may take to settle after being enabled.
pub const STABILISE_TIMEOUT: Duration = Duration::millis(200);
/// How long the output must stay within [`STABILISE_DELTA`] to count as settled.
pub const STABILISE_WINDOW: Duration = Duration::millis(10);
pub const STABILISE_DELTA: f32 = 0.1;

/// Longest the output may take to fall to [`DISSIPATE_LEVEL`] before detection.
pub const DISSIPATE_TIMEOUT: Duration = Duration::secs(5);
/// How long the output must stay below [`DISSIPATE_LEVEL`].
pub const DISSIPATE_WINDOW: Duration = Duration::millis(10);
pub const DISSIPATE_LEVEL: f32 = 2.0;

/// How much the supervisor reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    None,
    Warn,
    #[default]
    Info,
    /// Also prints the readings report after each monitoring period.
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Use [`YukonConfigBuilder`] to create a configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YukonConfig {
    /// Input voltage ceiling, never above [`ABSOLUTE_MAX_VOLTAGE_LIMIT`].
    voltage_limit: f32,
    current_limit: f32,
    temperature_limit: f32,
    log_level: LogLevel,
    /// Samples averaged per measurement when monitoring.
    monitor_samples: u16,
}

impl Default for YukonConfig {
    fn default() -> Self {
        Self {
            voltage_limit: DEFAULT_VOLTAGE_LIMIT,
            current_limit: DEFAULT_CURRENT_LIMIT,
            temperature_limit: DEFAULT_TEMPERATURE_LIMIT,
            log_level: LogLevel::default(),
            monitor_samples: 1,
        }
    }
}

impl YukonConfig {
    pub fn builder() -> YukonConfigBuilder {
        YukonConfigBuilder::default()
    }

    pub fn voltage_limit(&self) -> f32 {
        self.voltage_limit
    }

    pub fn current_limit(&self) -> f32 {
        self.current_limit
    }

    pub fn temperature_limit(&self) -> f32 {
        self.temperature_limit
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn monitor_samples(&self) -> u16 {
        self.monitor_samples
    }

    pub(crate) fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }
}

/// Use this type to create a [`YukonConfig`].
#[derive(Debug, Clone, Default)]
pub struct YukonConfigBuilder {
    config: YukonConfig,
}

impl YukonConfigBuilder {
    /// Let's build it!
    pub fn build(self) -> Result<YukonConfig> {
        let config = self.config;
        for limit in [
            config.voltage_limit,
            config.current_limit,
            config.temperature_limit,
        ] {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(Error::InvalidConfig("limits must be positive"));
            }
        }
        if config.monitor_samples == 0 {
            return Err(Error::InvalidConfig("at least one sample is needed per measurement"));
        }

        Ok(YukonConfig {
            voltage_limit: config.voltage_limit.min(ABSOLUTE_MAX_VOLTAGE_LIMIT),
            ..config
        })
    }

    /// Set the input voltage ceiling. Anything above the absolute maximum is clamped to it.
    pub fn with_voltage_limit(mut self, volts: f32) -> Self {
        self.config.voltage_limit = volts;
        self
    }

    /// Set the output current ceiling.
    pub fn with_current_limit(mut self, amps: f32) -> Self {
        self.config.current_limit = amps;
        self
    }

    /// Set the board temperature ceiling in °C.
    pub fn with_temperature_limit(mut self, celsius: f32) -> Self {
        self.config.temperature_limit = celsius;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Set how many ADC samples are averaged per measurement when monitoring.
    pub fn with_monitor_samples(mut self, samples: u16) -> Self {
        self.config.monitor_samples = samples;
        self
    }
}

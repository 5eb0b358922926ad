use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;

/// Upper bound for the deferred teardown grace period.
pub const MAX_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LeaseConfig {
    pub version: u32,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub teardown: TeardownSection,
    #[serde(default)]
    pub surface: SurfaceSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceSection {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub power: PowerSetting,
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendSetting>,
    #[serde(default)]
    pub limits: LimitsSetting,
    #[serde(default)]
    pub memory: MemorySetting,
    #[serde(default)]
    pub fallback_adapter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TeardownSection {
    #[serde(default)]
    pub mode: TeardownMode,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub grace: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SurfaceSection {
    #[serde(default)]
    pub alpha: AlphaSetting,
    #[serde(default)]
    pub prefer_srgb: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    High,
    Low,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSetting {
    Primary,
    All,
    Vulkan,
    Metal,
    Dx12,
    Gl,
    Webgpu,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitsSetting {
    #[default]
    Default,
    Downlevel,
    Webgl2,
    Adapter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySetting {
    #[default]
    Performance,
    Balanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownMode {
    #[default]
    Immediate,
    Deferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaSetting {
    Auto,
    Opaque,
    #[default]
    Premultiplied,
    Postmultiplied,
    Inherit,
}

fn default_label() -> String {
    "gpulease shared device".to_string()
}

fn default_backends() -> Vec<BackendSetting> {
    vec![BackendSetting::Primary]
}

fn default_grace() -> Duration {
    Duration::from_millis(100)
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            label: default_label(),
            power: PowerSetting::default(),
            backends: default_backends(),
            limits: LimitsSetting::default(),
            memory: MemorySetting::default(),
            fallback_adapter: false,
        }
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            device: DeviceSection::default(),
            teardown: TeardownSection::default(),
            surface: SurfaceSection::default(),
        }
    }
}

impl TeardownSection {
    /// Grace period to apply in deferred mode.
    pub fn resolved_grace(&self) -> Duration {
        self.grace.unwrap_or_else(default_grace)
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

impl LeaseConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LeaseConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path`, or returns the defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.device.label.trim().is_empty() {
            return Err(ConfigError::Invalid("device.label may not be empty".into()));
        }

        if self.device.backends.is_empty() {
            return Err(ConfigError::Invalid(
                "device.backends must list at least one backend".into(),
            ));
        }

        if let Some(grace) = self.teardown.grace {
            if grace.is_zero() && self.teardown.mode == TeardownMode::Deferred {
                return Err(ConfigError::Invalid(
                    "teardown.grace must be greater than zero in deferred mode".into(),
                ));
            }
            if grace > MAX_GRACE {
                return Err(ConfigError::Invalid(format!(
                    "teardown.grace must not exceed {}",
                    humantime::format_duration(MAX_GRACE)
                )));
            }
        }

        Ok(())
    }
}

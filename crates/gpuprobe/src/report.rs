use std::fmt;

use gpulease::backend::AdapterProfile;
use gpulease::{LifecycleStats, TeardownPolicy};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterReport>,
    pub teardown: String,
    pub stats: StatsReport,
}

#[derive(Debug, Serialize)]
pub struct AdapterReport {
    pub name: String,
    pub backend: String,
    pub device_type: String,
    pub driver: String,
    pub driver_info: String,
    pub software: bool,
    pub max_texture_dimension_2d: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct StatsReport {
    pub devices_created: u64,
    pub initialization_failures: u64,
    pub teardowns: u64,
    pub lost_devices_reclaimed: u64,
}

impl From<&AdapterProfile> for AdapterReport {
    fn from(profile: &AdapterProfile) -> Self {
        Self {
            name: profile.name.clone(),
            backend: format!("{:?}", profile.backend),
            device_type: format!("{:?}", profile.device_type),
            driver: profile.driver.clone(),
            driver_info: profile.driver_info.clone(),
            software: profile.is_software(),
            max_texture_dimension_2d: profile.max_texture_dimension_2d,
        }
    }
}

impl From<LifecycleStats> for StatsReport {
    fn from(stats: LifecycleStats) -> Self {
        Self {
            devices_created: stats.devices_created,
            initialization_failures: stats.initialization_failures,
            teardowns: stats.teardowns,
            lost_devices_reclaimed: stats.lost_devices_reclaimed,
        }
    }
}

pub fn describe_policy(policy: TeardownPolicy) -> String {
    match policy {
        TeardownPolicy::Immediate => "immediate".to_string(),
        TeardownPolicy::Deferred { grace } => format!("deferred ({grace:?} grace)"),
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {} device(s), {} failed initialization(s), {} teardown(s), {} lost device(s) reclaimed",
            self.devices_created,
            self.initialization_failures,
            self.teardowns,
            self.lost_devices_reclaimed
        )
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.supported {
            writeln!(f, "GPU: supported")?;
        } else {
            writeln!(f, "GPU: unsupported")?;
        }
        if let Some(reason) = &self.reason {
            writeln!(f, "reason: {reason}")?;
        }
        if let Some(adapter) = &self.adapter {
            writeln!(
                f,
                "adapter: {} ({}, {})",
                adapter.name, adapter.backend, adapter.device_type
            )?;
            if !adapter.driver.is_empty() {
                writeln!(f, "driver: {} {}", adapter.driver, adapter.driver_info)?;
            }
            writeln!(f, "software rasterizer: {}", adapter.software)?;
            writeln!(f, "max 2D texture: {}", adapter.max_texture_dimension_2d)?;
        }
        writeln!(f, "teardown: {}", self.teardown)?;
        write!(f, "lifecycle: {}", self.stats)
    }
}

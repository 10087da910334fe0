//! Resource sizing and the display units it may be entered in.

use serde::{Deserialize, Serialize};

/// Unit the CPU value was entered in. The backend expects milli-cores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CpuUnit {
    #[default]
    Milli,
    Cores,
}

impl CpuUnit {
    /// Convert a raw value in this unit to milli-cores.
    pub fn to_milli(self, value: f64) -> u32 {
        let milli = match self {
            Self::Milli => value,
            Self::Cores => value * 1000.0,
        };
        round_non_negative(milli)
    }
}

/// Unit the memory value was entered in. The backend expects MB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryUnit {
    #[default]
    #[serde(rename = "MB", alias = "mb", alias = "MiB")]
    Mb,
    #[serde(rename = "GB", alias = "gb", alias = "GiB")]
    Gb,
}

impl MemoryUnit {
    /// Convert a raw value in this unit to MB.
    pub fn to_mb(self, value: f64) -> u32 {
        let mb = match self {
            Self::Mb => value,
            Self::Gb => value * 1024.0,
        };
        round_non_negative(mb)
    }
}

/// Whether a raw amount can be converted at all. Negative and NaN inputs
/// are rejected by validation instead of being sent as 0.
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn round_non_negative(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn default_instances() -> u32 {
    1
}

/// Resources step data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesData {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub cpu_unit: CpuUnit,
    #[serde(default)]
    pub memory: Option<f64>,
    #[serde(default, alias = "unit")]
    pub memory_unit: MemoryUnit,
    #[serde(default = "default_instances")]
    pub min_running_instances: u32,
    #[serde(default = "default_instances")]
    pub max_running_instances: u32,
    /// Storage in GB (databases only).
    #[serde(default)]
    pub storage: Option<u32>,
    /// Cloud instance type (managed databases only).
    #[serde(default)]
    pub instance_type: Option<String>,
}

impl Default for ResourcesData {
    fn default() -> Self {
        Self {
            cpu: None,
            cpu_unit: CpuUnit::default(),
            memory: None,
            memory_unit: MemoryUnit::default(),
            min_running_instances: default_instances(),
            max_running_instances: default_instances(),
            storage: None,
            instance_type: None,
        }
    }
}

impl ResourcesData {
    /// CPU in milli-cores, if a value was entered.
    pub fn cpu_milli(&self) -> Option<u32> {
        self.cpu.map(|cpu| self.cpu_unit.to_milli(cpu))
    }

    /// Memory in MB, if a value was entered.
    pub fn memory_mb(&self) -> Option<u32> {
        self.memory.map(|memory| self.memory_unit.to_mb(memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_conversion() {
        let gb: ResourcesData = serde_json::from_value(json!({"memory": 2, "unit": "GB"})).unwrap();
        assert_eq!(gb.memory_mb(), Some(2048));

        let mb: ResourcesData =
            serde_json::from_value(json!({"memory": 512, "memory_unit": "MB"})).unwrap();
        assert_eq!(mb.memory_mb(), Some(512));

        let half: ResourcesData =
            serde_json::from_value(json!({"memory": 0.5, "memory_unit": "GB"})).unwrap();
        assert_eq!(half.memory_mb(), Some(512));
    }

    #[test]
    fn test_cpu_conversion() {
        assert_eq!(CpuUnit::Cores.to_milli(0.25), 250);
        assert_eq!(CpuUnit::Cores.to_milli(2.0), 2000);
        assert_eq!(CpuUnit::Milli.to_milli(500.0), 500);
    }

    #[test]
    fn test_invalid_amounts() {
        assert!(is_valid_amount(0.0));
        assert!(is_valid_amount(0.25));
        assert!(!is_valid_amount(-1.0));
        assert!(!is_valid_amount(f64::NAN));
        assert!(!is_valid_amount(f64::INFINITY));
        // Conversion itself never wraps around.
        assert_eq!(MemoryUnit::Gb.to_mb(-1.0), 0);
    }

    #[test]
    fn test_defaults() {
        let resources: ResourcesData = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resources.cpu_unit, CpuUnit::Milli);
        assert_eq!(resources.memory_unit, MemoryUnit::Mb);
        assert_eq!(resources.min_running_instances, 1);
        assert_eq!(resources.max_running_instances, 1);
        assert_eq!(resources.cpu_milli(), None);
    }
}

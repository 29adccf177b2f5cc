//! Structural configurations: which pipeline stages are enabled and how they
//! are parameterised.
//!
//! Configurations are JSON objects with one `*RegionConfig` section per stage.
//! They come either from a template expanded once per category count or from
//! an explicit pre-built list. Both are validated up front so the training loop
//! never has to look at raw JSON again.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::ConfigError;

/// Template file name inside the configuration directory.
pub const TEMPLATE_FILE: &str = "network_config_template.json";
/// Explicit configuration list file name inside the configuration directory.
pub const LIST_FILE: &str = "sdr_network_configs.json";

/// A pipeline stage, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sensor,
    SpatialPooler,
    TemporalMemory,
    TemporalPooler,
    Classifier,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Sensor,
        Stage::SpatialPooler,
        Stage::TemporalMemory,
        Stage::TemporalPooler,
        Stage::Classifier,
    ];

    /// Stages between the sensor and the classifier.
    pub const UPSTREAM: [Stage; 3] = [
        Stage::SpatialPooler,
        Stage::TemporalMemory,
        Stage::TemporalPooler,
    ];

    /// JSON section holding this stage's configuration.
    pub fn section(&self) -> &'static str {
        match self {
            Stage::Sensor => "sensorRegionConfig",
            Stage::SpatialPooler => "spRegionConfig",
            Stage::TemporalMemory => "tmRegionConfig",
            Stage::TemporalPooler => "tpRegionConfig",
            Stage::Classifier => "classifierRegionConfig",
        }
    }

    /// Short prefix used in trace series names and run keys.
    pub fn short_name(&self) -> &'static str {
        match self {
            Stage::Sensor => "sensor",
            Stage::SpatialPooler => "sp",
            Stage::TemporalMemory => "tm",
            Stage::TemporalPooler => "tp",
            Stage::Classifier => "classifier",
        }
    }

    /// The sensor only encodes; every other stage can adapt.
    pub fn can_learn(&self) -> bool {
        !matches!(self, Stage::Sensor)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Sensor => "sensor",
            Stage::SpatialPooler => "spatial pooler",
            Stage::TemporalMemory => "temporal memory",
            Stage::TemporalPooler => "temporal pooler",
            Stage::Classifier => "classifier",
        };
        f.write_str(name)
    }
}

/// Scalar encoder settings attached to the sensor section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    #[serde(default = "default_minval")]
    pub minval: f64,
    #[serde(default = "default_maxval")]
    pub maxval: f64,
    /// Total number of bits.
    #[serde(default = "default_encoder_n")]
    pub n: usize,
    /// Number of active bits.
    #[serde(default = "default_encoder_w")]
    pub w: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            minval: default_minval(),
            maxval: default_maxval(),
            n: default_encoder_n(),
            w: default_encoder_w(),
        }
    }
}

fn default_minval() -> f64 {
    -10.0
}

fn default_maxval() -> f64 {
    10.0
}

fn default_encoder_n() -> usize {
    256
}

fn default_encoder_w() -> usize {
    21
}

/// One `*RegionConfig` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub region_enabled: bool,
    pub region_type: String,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub region_params: serde_json::Map<String, serde_json::Value>,
    /// Encoder settings; only meaningful for the sensor section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoders: Option<EncoderSettings>,
    /// Stable identity for reports; only meaningful for the classifier section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RegionConfig {
    pub fn param_usize(&self, key: &str) -> Option<usize> {
        self.region_params
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.region_params.get(key).and_then(|v| v.as_f64())
    }
}

/// A validated structural configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralConfiguration {
    pub sensor_region_config: RegionConfig,
    pub sp_region_config: RegionConfig,
    pub tm_region_config: RegionConfig,
    pub tp_region_config: RegionConfig,
    pub classifier_region_config: RegionConfig,
}

impl StructuralConfiguration {
    /// Parse and validate one configuration object.
    pub fn from_value(value: &serde_json::Value, origin: &str) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or_else(|| ConfigError::Parse {
            origin: origin.to_string(),
            message: "structural configuration must be a JSON object".into(),
        })?;

        for stage in Stage::ALL {
            let section = object
                .get(stage.section())
                .ok_or_else(|| ConfigError::MissingKey {
                    section: origin.to_string(),
                    key: stage.section().to_string(),
                })?;
            for key in ["regionEnabled", "regionType"] {
                if section.get(key).is_none() {
                    return Err(ConfigError::MissingKey {
                        section: format!("{origin}/{}", stage.section()),
                        key: key.to_string(),
                    });
                }
            }
        }

        let config: Self =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::Parse {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;

        for stage in [Stage::Sensor, Stage::Classifier] {
            if !config.region(stage).region_enabled {
                return Err(ConfigError::InvalidValue {
                    section: format!("{origin}/{}", stage.section()),
                    key: "regionEnabled".into(),
                    message: format!("the {stage} cannot be disabled"),
                });
            }
        }

        Ok(config)
    }

    pub fn region(&self, stage: Stage) -> &RegionConfig {
        match stage {
            Stage::Sensor => &self.sensor_region_config,
            Stage::SpatialPooler => &self.sp_region_config,
            Stage::TemporalMemory => &self.tm_region_config,
            Stage::TemporalPooler => &self.tp_region_config,
            Stage::Classifier => &self.classifier_region_config,
        }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        self.region(stage).region_enabled
    }

    /// Enabled stages in processing order.
    pub fn enabled_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }

    /// Enabled stages sitting between the sensor and the classifier.
    pub fn enabled_upstream(&self) -> Vec<Stage> {
        Stage::UPSTREAM
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }

    /// Opaque classifier identity: the configured label, else the region type.
    pub fn classifier_label(&self) -> &str {
        let classifier = &self.classifier_region_config;
        classifier
            .label
            .as_deref()
            .unwrap_or(&classifier.region_type)
    }

    pub fn encoder(&self) -> EncoderSettings {
        self.sensor_region_config
            .encoders
            .clone()
            .unwrap_or_default()
    }

    /// Short content digest: the first 8 hex chars of a SHA-256 over the
    /// serialized configuration. Differs whenever any section or parameter
    /// differs.
    pub fn fingerprint(&self) -> String {
        // Keys are strings and maps are ordered, so this cannot fail and is
        // stable across runs.
        let canonical = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
        digest[..8].to_string()
    }

    /// Category capacity declared for the classifier, if any.
    pub fn max_category_count(&self) -> Option<usize> {
        self.classifier_region_config
            .param_usize("maxCategoryCount")
    }
}

/// Expand a template into one configuration per distinct category count,
/// keeping first-occurrence order.
pub fn expand_template(
    template: &serde_json::Value,
    category_counts: &[usize],
    origin: &str,
) -> Result<Vec<Arc<StructuralConfiguration>>, ConfigError> {
    let mut seen = Vec::new();
    for count in category_counts {
        if !seen.contains(count) {
            seen.push(*count);
        }
    }
    if seen.is_empty() {
        return Err(ConfigError::Empty {
            origin: origin.to_string(),
        });
    }

    // Validate before substituting so a broken template reports its own keys.
    StructuralConfiguration::from_value(template, origin)?;

    let mut configs = Vec::with_capacity(seen.len());
    for count in seen {
        let mut value = template.clone();
        let params = value
            .get_mut(Stage::Classifier.section())
            .and_then(|section| section.as_object_mut())
            .map(|section| {
                section
                    .entry("regionParams")
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()))
            })
            .and_then(|params| params.as_object_mut())
            .ok_or_else(|| ConfigError::InvalidValue {
                section: format!("{origin}/{}", Stage::Classifier.section()),
                key: "regionParams".into(),
                message: "must be a JSON object".into(),
            })?;
        params.insert("maxCategoryCount".into(), serde_json::Value::from(count));
        configs.push(Arc::new(StructuralConfiguration::from_value(
            &value,
            &format!("{origin} (categories={count})"),
        )?));
    }
    Ok(configs)
}

/// Parse an explicit list of configurations.
pub fn parse_list(
    list: &serde_json::Value,
    origin: &str,
) -> Result<Vec<Arc<StructuralConfiguration>>, ConfigError> {
    let items = list.as_array().ok_or_else(|| ConfigError::Parse {
        origin: origin.to_string(),
        message: "expected a JSON array of structural configurations".into(),
    })?;
    if items.is_empty() {
        return Err(ConfigError::Empty {
            origin: origin.to_string(),
        });
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            StructuralConfiguration::from_value(item, &format!("{origin}[{i}]")).map(Arc::new)
        })
        .collect()
}

fn read_json(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        origin: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load the structural configuration axis from `config_dir`.
pub fn load_configurations(
    config_dir: &Path,
    use_template: bool,
    category_counts: &[usize],
) -> Result<Vec<Arc<StructuralConfiguration>>, ConfigError> {
    if use_template {
        let path = config_dir.join(TEMPLATE_FILE);
        let template = read_json(&path)?;
        expand_template(&template, category_counts, &path.display().to_string())
    } else {
        let path = config_dir.join(LIST_FILE);
        let list = read_json(&path)?;
        parse_list(&list, &path.display().to_string())
    }
}

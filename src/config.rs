//! 模型配置.
//!
//! JSON 格式, 所有字段都有默认值:
//!
//! ```json
//! {
//!   "logging": { "level": "debug", "directory": "logs" },
//!   "quant": { "offset": 0, "deadzone": 0 },
//!   "deblock": { "disable_idc": 0, "alpha_offset_div2": 0, "beta_offset_div2": 0 }
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use avcref_codec::{DeblockParams, QuantParams};

use crate::logging::LoggingConfig;

/// 量化配置, 单位 1/256
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuantConfig {
    /// 舍入偏移, 128 表示截断前加 0.5
    pub offset: i32,
    /// 死区阈值
    pub deadzone: i32,
}

impl QuantConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0..=256).contains(&self.offset) {
            bail!("quant.offset={} 超出 0..=256", self.offset);
        }
        if !(0..=65536).contains(&self.deadzone) {
            bail!("quant.deadzone={} 超出 0..=65536", self.deadzone);
        }
        Ok(())
    }
}

impl From<QuantConfig> for QuantParams {
    fn from(config: QuantConfig) -> Self {
        QuantParams::new(config.offset, config.deadzone)
    }
}

/// 片级去块配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeblockConfig {
    pub disable_idc: u8,
    pub alpha_offset_div2: i8,
    pub beta_offset_div2: i8,
}

impl DeblockConfig {
    /// 校验并转换为去块参数
    pub fn to_params(&self) -> Result<DeblockParams> {
        DeblockParams::new(self.disable_idc, self.alpha_offset_div2, self.beta_offset_div2)
            .context("去块配置无效")
    }
}

/// 参考模型配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub logging: Option<LoggingConfig>,
    pub quant: QuantConfig,
    pub deblock: DeblockConfig,
}

impl ModelConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("解析配置 JSON 失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("加载配置失败, path={}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }
        self.quant.validate()?;
        self.deblock.to_params()?;
        Ok(())
    }

    pub fn quant_params(&self) -> QuantParams {
        self.quant.into()
    }

    pub fn deblock_params(&self) -> Result<DeblockParams> {
        self.deblock.to_params()
    }
}

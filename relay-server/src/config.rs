//! 中继配置

use std::path::Path;

use anyhow::Context;
use protocol::RELAY_PORT;
use serde::{Deserialize, Serialize};

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "RELAY_CONFIG";

/// 监听地址的环境变量（覆盖配置文件）
pub const ADDR_ENV: &str = "RELAY_ADDR";

/// 中继配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 监听地址
    pub addr: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: format!("0.0.0.0:{}", RELAY_PORT),
        }
    }
}

impl RelayConfig {
    /// 从 JSON 文件加载
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效: {:?}", path))?;
        tracing::info!("已加载配置: {:?}", path);
        Ok(config)
    }

    /// 从环境变量构建配置
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(addr) = lookup(ADDR_ENV) {
            config.addr = addr;
        }
        Ok(config)
    }
}

//! 客户端配置
//!
//! JSON 文件，默认位于 `<config_dir>/topochess/client.json`。

use std::path::{Path, PathBuf};

use anyhow::Context;
use protocol::{DEFAULT_MOVE_LIMIT, INTERRUPT_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::online::PeerEndpoint;

/// 联机设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineConfig {
    /// 本端执棋的玩家序号
    pub local_player: usize,
    pub endpoint: PeerEndpoint,
}

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 中断通道容量
    pub interrupt_capacity: usize,
    /// 单个棋子枚举走法的上限
    pub move_limit: usize,
    /// 为空时是本地对局
    pub online: Option<OnlineConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            interrupt_capacity: INTERRUPT_CAPACITY,
            move_limit: DEFAULT_MOVE_LIMIT,
            online: None,
        }
    }
}

impl ClientConfig {
    /// 获取配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("topochess");
            path.push("client.json");
            path
        })
    }

    /// 从默认位置加载配置
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("无法获取配置目录，使用默认配置");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// 从文件加载配置，失败时使用默认值
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("配置文件不存在，使用默认配置");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    tracing::info!("已加载配置: {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("配置文件格式无效: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取配置文件: {}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 保存到默认位置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("无法获取配置目录")?;
        self.save_to(&path)
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化配置失败")?;
        std::fs::write(path, content).with_context(|| format!("写入配置文件失败: {:?}", path))?;

        tracing::info!("配置已保存: {:?}", path);
        Ok(())
    }
}

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::orders::StorageError;

/// 服务启动/运行错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("存储初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

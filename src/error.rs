//! 错误类型定义
//!
//! 业务层统一使用 `anyhow::Result`，本模块只定义两类需要区分处理方式的
//! 类型化错误：
//!
//! - [`ConfigError`]：致命的配置错误，面向用户，错误信息中直接附带修复提示
//! - [`ApiError`]：远程 API 错误，由 `GeminiClient` 产生。
//!   生成路径会直接向上传播（没有兜底产物可生成）；
//!   校验路径会把它降级为一条 `validation_error` 的合成校验结果，继续处理

use thiserror::Error;

/// 配置错误（致命，不重试）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 密钥
    #[error("未设置 GEMINI_API_KEY 环境变量，请先执行: export GEMINI_API_KEY='你的密钥'")]
    ApiKeyMissing,

    /// 源文件目录不存在
    #[error("源文件目录不存在: {path}")]
    FilesDirNotFound { path: String },

    /// 源文件目录中没有可上传的文件
    #[error("源文件目录 {path} 中没有可上传的文件")]
    NoSourceFiles { path: String },
}

impl ConfigError {
    /// 面向用户的修复清单，入口在退出前逐行打印
    pub fn remediation(&self) -> Vec<String> {
        match self {
            ConfigError::ApiKeyMissing => vec![
                "1. 已设置环境变量 GEMINI_API_KEY".to_string(),
                "2. 密钥未过期且拼写正确".to_string(),
                "3. 可选的 QBG_* 环境变量拼写正确".to_string(),
            ],
            ConfigError::FilesDirNotFound { path } => vec![
                format!("1. 已创建源文档目录: {path}/"),
                "2. 源文档 (PDF/TXT/MD) 已放入该目录".to_string(),
                "3. 或通过 QBG_FILES_DIR 指定其他目录".to_string(),
            ],
            ConfigError::NoSourceFiles { path } => vec![
                format!("1. 目录 {path}/ 中至少有一个源文档 (PDF/TXT/MD)"),
                "2. 文件名不以 . 开头（隐藏文件会被跳过）".to_string(),
                "3. 源文档是文件而不是子目录".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_mentions_the_missing_dir() {
        let err = ConfigError::FilesDirNotFound {
            path: "files".to_string(),
        };
        let steps = err.remediation();
        assert_eq!(steps.len(), 3);
        assert!(steps[0].contains("files/"));
    }

    #[test]
    fn test_config_error_survives_anyhow_conversion() {
        // 入口依赖 downcast 识别配置错误并打印修复清单，
        // 这里确认经过 ? 转换后仍能还原出具体变体
        fn failing() -> anyhow::Result<()> {
            Err(ConfigError::NoSourceFiles {
                path: "files".to_string(),
            })?;
            Ok(())
        }

        let err = failing().unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().expect("应能还原为配置错误");
        assert!(matches!(config_err, ConfigError::NoSourceFiles { .. }));
        assert!(!config_err.remediation().is_empty());
    }
}

/// 远程 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 上传前读取本地文件失败
    #[error("读取本地文件失败 ({path}): {source}")]
    LocalFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 网络请求失败
    #[error("API 请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// API 返回非 2xx 状态码
    #[error("API 返回错误状态 ({endpoint}): HTTP {status}, 响应: {body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// API 返回空结果（没有候选内容）
    #[error("API 返回空结果 ({endpoint})")]
    EmptyResponse { endpoint: String },

    /// 响应 JSON 解析失败
    #[error("API 响应 JSON 解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

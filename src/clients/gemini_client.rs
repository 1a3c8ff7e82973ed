//! Gemini API 客户端
//!
//! 封装所有与 Gemini REST API 相关的调用逻辑：
//! 文件上传 / 查询 / 删除、上下文缓存的创建与删除、结构化内容生成。
//!
//! 所有调用都是普通的请求-响应，不设置客户端超时，也不做重试。
//! 错误以 [`ApiError`] 的形式返回，由调用方决定是传播（出题路径）
//! 还是降级为合成校验结果（校验路径）。

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;

/// 已上传的远程文件句柄
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// 远程资源名（形如 files/xxxx）
    pub name: String,
    /// 生成调用中引用文件用的 URI
    pub uri: String,
    /// MIME 类型
    pub mime_type: String,
    /// 文件状态（如 ACTIVE / PROCESSING）
    #[serde(default)]
    pub state: Option<String>,
}

/// 远程上下文缓存句柄
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    /// 远程资源名（形如 cachedContents/xxxx）
    pub name: String,
    /// 过期时间
    #[serde(default)]
    pub expire_time: Option<String>,
}

/// 生成调用的内容片段：文件引用或文本提示词
#[derive(Debug, Clone)]
pub enum ContentPart {
    /// 引用一个已上传的文件
    FileData { mime_type: String, file_uri: String },
    /// 文本提示词
    Text(String),
}

impl ContentPart {
    /// 引用一个已上传文件的便捷构造
    pub fn from_file(file: &UploadedFile) -> Self {
        ContentPart::FileData {
            mime_type: file.mime_type.clone(),
            file_uri: file.uri.clone(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ContentPart::FileData {
                mime_type,
                file_uri,
            } => json!({
                "fileData": { "mimeType": mime_type, "fileUri": file_uri }
            }),
            ContentPart::Text(text) => json!({ "text": text }),
        }
    }
}

/// 单次生成调用的配置
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// 系统指令（使用缓存时不要传，指令已在缓存中）
    pub system_instruction: Option<String>,
    /// 上下文缓存资源名
    pub cached_content: Option<String>,
    /// 结构化输出的 JSON schema
    pub response_schema: Option<Value>,
}

/// Gemini API 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// 上传单个文件
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile, ApiError> {
        let endpoint = format!("{}/upload/v1beta/files", self.base_url);
        let mime_type = mime_type_for(path);

        debug!("上传文件: {} ({})", path.display(), mime_type);

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::LocalFileRead {
                path: path.display().to_string(),
                source,
            })?;

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        let body = self.read_body(&endpoint, response).await?;

        #[derive(Deserialize)]
        struct UploadResponse {
            file: UploadedFile,
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|source| ApiError::JsonParseFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        debug!("✓ 文件已上传: {} -> {}", path.display(), parsed.file.uri);

        Ok(parsed.file)
    }

    /// 查询已上传文件的元数据（用于上传后的可用性验证）
    pub async fn get_file(&self, name: &str) -> Result<UploadedFile, ApiError> {
        let endpoint = format!("{}/v1beta/{}", self.base_url, name);

        let response = self
            .http
            .get(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        let body = self.read_body(&endpoint, response).await?;

        serde_json::from_str(&body).map_err(|source| ApiError::JsonParseFailed {
            endpoint,
            source,
        })
    }

    /// 删除已上传的文件
    pub async fn delete_file(&self, name: &str) -> Result<(), ApiError> {
        self.delete_resource(name).await
    }

    /// 删除上下文缓存
    pub async fn delete_cache(&self, name: &str) -> Result<(), ApiError> {
        self.delete_resource(name).await
    }

    /// 创建上下文缓存（源文件 + 系统指令）
    pub async fn create_cache(
        &self,
        model: &str,
        system_instruction: &str,
        files: &[UploadedFile],
        ttl: &str,
        display_name: &str,
    ) -> Result<CachedContent, ApiError> {
        let endpoint = format!("{}/v1beta/cachedContents", self.base_url);

        let file_parts: Vec<Value> = files
            .iter()
            .map(|f| ContentPart::from_file(f).to_json())
            .collect();

        let payload = json!({
            "model": format!("models/{model}"),
            "displayName": display_name,
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": file_parts }],
            "ttl": ttl,
        });

        debug!("创建上下文缓存: {} 个文件, TTL {}", files.len(), ttl);

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        let body = self.read_body(&endpoint, response).await?;

        serde_json::from_str(&body).map_err(|source| ApiError::JsonParseFailed {
            endpoint,
            source,
        })
    }

    /// 结构化内容生成，返回首个候选的原始 JSON 文本
    pub async fn generate_content(
        &self,
        model: &str,
        parts: &[ContentPart],
        options: &GenerationOptions,
    ) -> Result<String, ApiError> {
        let endpoint = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": parts.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
            }],
        });

        if let Some(instruction) = &options.system_instruction {
            payload["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        if let Some(cache_name) = &options.cached_content {
            payload["cachedContent"] = json!(cache_name);
        }
        if let Some(schema) = &options.response_schema {
            payload["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseJsonSchema": schema,
            });
        }

        debug!("调用生成接口, 模型: {}, 片段数: {}", model, parts.len());

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        let body = self.read_body(&endpoint, response).await?;

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|source| ApiError::JsonParseFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        if let Some(usage) = &parsed.usage_metadata {
            if let Some(cached) = usage.cached_content_token_count {
                debug!(
                    "💰 缓存命中 token: {}, 新处理 token: {:?}, 输出 token: {:?}",
                    cached, usage.prompt_token_count, usage.candidates_token_count
                );
            }
        }

        let text = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                warn!("生成接口返回了空候选 ({})", endpoint);
                Err(ApiError::EmptyResponse { endpoint })
            }
        }
    }

    /// 删除远程资源（文件或缓存通用）
    async fn delete_resource(&self, name: &str) -> Result<(), ApiError> {
        let endpoint = format!("{}/v1beta/{}", self.base_url, name);

        let response = self
            .http
            .delete(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        self.read_body(&endpoint, response).await?;
        Ok(())
    }

    /// 读取响应体，非 2xx 状态转为 BadStatus 错误
    async fn read_body(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<String, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// 按扩展名推断 MIME 类型
fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Gemini 生成接口的响应结构（只保留用到的字段）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    cached_content_token_count: Option<u64>,
}

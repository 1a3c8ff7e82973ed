//! 出题编排器 - 编排层
//!
//! ## 职责
//!
//! 串联一次完整的出题流程：上传源文档 → 创建上下文缓存（可选）→
//! 组装提示词 → 调用生成接口 → 解析为题库。
//!
//! ## 状态机
//!
//! 单次运行只向前推进：`无文件 -> 已上传 -> (已缓存) -> 已生成`，
//! 没有在运行中途部分失效缓存的机制。
//!
//! ## 资源管理
//!
//! 已上传文件列表和缓存句柄是本实例独占的显式字段，
//! 由 [`QuestionGenerator::cleanup`] 尽力释放：逐个删除，
//! 单个删除失败只记日志，不影响其余资源的清理。

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::gemini_client::{
    CachedContent, ContentPart, GeminiClient, GenerationOptions, UploadedFile,
};
use crate::config::Config;
use crate::models::question::QuestionBank;
use crate::services::source_files::collect_source_files;
use crate::utils::logging::truncate_text;

/// 出题编排器
pub struct QuestionGenerator {
    client: GeminiClient,
    model_name: String,
    system_instruction: String,
    default_prompt_template: String,
    default_num_questions: usize,
    cache_ttl: String,
    uploaded_files: Vec<UploadedFile>,
    cached_content: Option<CachedContent>,
}

impl QuestionGenerator {
    /// 创建新的出题编排器
    pub fn new(config: &Config) -> Self {
        Self {
            client: GeminiClient::new(config),
            model_name: config.generation_model.clone(),
            system_instruction: config.system_instruction.clone(),
            default_prompt_template: config.default_prompt_template.clone(),
            default_num_questions: config.default_num_questions,
            cache_ttl: config.cache_ttl.clone(),
            uploaded_files: Vec::new(),
            cached_content: None,
        }
    }

    /// 上传源文档目录下的全部文件
    ///
    /// 单个文件上传失败只记日志并跳过（有效文件集随之缩小，不升级为错误）；
    /// 上传后会尝试查询元数据做可用性验证，验证失败仅告警
    pub async fn upload_files(&mut self, files_dir: &str) -> Result<usize> {
        let file_paths = collect_source_files(files_dir)?;
        info!("正在上传 {} 个源文件 (目录: {})...", file_paths.len(), files_dir);

        for path in &file_paths {
            info!("  上传: {}", path.display());
            match self.client.upload_file(path).await {
                Ok(file) => {
                    match self.client.get_file(&file.name).await {
                        Ok(verified) => info!(
                            "    ✓ 文件已验证: {}",
                            verified.state.as_deref().unwrap_or("ACTIVE")
                        ),
                        Err(e) => warn!("    ⚠️ 无法验证文件可用性: {}", e),
                    }
                    self.uploaded_files.push(file);
                }
                Err(e) => {
                    warn!("    ✗ 上传失败，跳过该文件: {}", e);
                }
            }
        }

        info!("✓ 成功上传 {} 个源文件\n", self.uploaded_files.len());
        Ok(self.uploaded_files.len())
    }

    /// 创建上下文缓存（源文件 + 系统指令）
    ///
    /// 缓存只是性能优化：创建失败不致命，记警告后回退为不带缓存的生成
    /// （功能等价，只是更贵）
    pub async fn create_cached_content(&mut self) -> Option<&CachedContent> {
        if self.uploaded_files.is_empty() {
            warn!("还没有上传任何源文件，跳过缓存创建");
            return None;
        }

        info!("正在创建上下文缓存... (TTL: {})", self.cache_ttl);

        let display_name = format!("question_gen_{}_files", self.uploaded_files.len());
        match self
            .client
            .create_cache(
                &self.model_name,
                &self.system_instruction,
                &self.uploaded_files,
                &self.cache_ttl,
                &display_name,
            )
            .await
        {
            Ok(cache) => {
                info!("✓ 缓存创建成功: {}", cache.name);
                if let Some(expire) = &cache.expire_time {
                    info!("  过期时间: {}", expire);
                }
                self.cached_content = Some(cache);
                self.cached_content.as_ref()
            }
            Err(e) => {
                warn!("⚠️ 缓存创建失败: {}", e);
                warn!("  回退为不带缓存的生成（功能不受影响）\n");
                self.cached_content = None;
                None
            }
        }
    }

    /// 生成题库
    ///
    /// - `prompt`: 自定义提示词，缺省使用配置模板（替换 {num_questions}）
    /// - `num_questions`: 每类别题目数量，缺省使用配置默认值
    /// - `use_cache`: 是否使用上下文缓存（未创建时会先尝试创建）
    ///
    /// 生成路径没有兜底产物，远程调用失败或响应不可解析都会直接向上传播
    pub async fn generate_questions(
        &mut self,
        prompt: Option<&str>,
        num_questions: Option<usize>,
        use_cache: bool,
    ) -> Result<QuestionBank> {
        if self.uploaded_files.is_empty() {
            anyhow::bail!("还没有上传任何源文件，请先调用 upload_files()");
        }

        if use_cache && self.cached_content.is_none() {
            self.create_cached_content().await;
        }

        let num_questions = num_questions.unwrap_or(self.default_num_questions);
        let default_prompt =
            crate::config::render_prompt_template(&self.default_prompt_template, num_questions);
        let prompt_to_use = prompt.unwrap_or(&default_prompt);

        let schema = serde_json::to_value(schemars::schema_for!(QuestionBank))
            .context("题库 schema 构建失败")?;

        let (parts, options) = match (&self.cached_content, use_cache) {
            (Some(cache), true) => {
                info!("正在生成题库, 模型: {} (使用缓存上下文)", self.model_name);
                // 使用缓存时只发送新的提示词，文件和系统指令都在缓存里
                (
                    vec![ContentPart::Text(prompt_to_use.to_string())],
                    GenerationOptions {
                        cached_content: Some(cache.name.clone()),
                        response_schema: Some(schema),
                        ..Default::default()
                    },
                )
            }
            _ => {
                info!("正在生成题库, 模型: {} (不使用缓存)", self.model_name);
                let mut parts: Vec<ContentPart> = self
                    .uploaded_files
                    .iter()
                    .map(ContentPart::from_file)
                    .collect();
                parts.push(ContentPart::Text(prompt_to_use.to_string()));
                (
                    parts,
                    GenerationOptions {
                        system_instruction: Some(self.system_instruction.clone()),
                        response_schema: Some(schema),
                        ..Default::default()
                    },
                )
            }
        };

        info!("模型正在分析文档，可能需要一些时间...\n");

        let text = self
            .client
            .generate_content(&self.model_name, &parts, &options)
            .await
            .context("题库生成调用失败")?;

        let bank: QuestionBank =
            serde_json::from_str(&text).context("无法把生成结果解析为题库")?;

        info!("✓ 题库生成成功!\n");
        Ok(bank)
    }

    /// 按类别逐个生成并合并为一个题库
    ///
    /// 对每个 (类别名, 提示词) 顺序发起一次生成调用，
    /// 合并规则：categories 顺序拼接；questions 按键合并，键冲突时后写覆盖
    pub async fn generate_questions_by_category(
        &mut self,
        category_prompts: &[(String, String)],
        num_questions: Option<usize>,
    ) -> Result<QuestionBank> {
        if self.uploaded_files.is_empty() {
            anyhow::bail!("还没有上传任何源文件，请先调用 upload_files()");
        }

        if self.cached_content.is_none() {
            self.create_cached_content().await;
        }

        let num_questions = num_questions.unwrap_or(self.default_num_questions);

        let mut combined = QuestionBank {
            categories: Vec::new(),
            questions: std::collections::HashMap::new(),
        };

        info!("{}", "=".repeat(60));
        info!("📦 按类别生成题目 (共 {} 个类别)", category_prompts.len());
        info!("{}", "=".repeat(60));

        for (category_name, category_prompt) in category_prompts {
            info!("正在生成类别: {}", category_name);

            let prompt = format!(
                "{category_prompt}\n\n\
                 Generate {num_questions} questions for the category: {category_name}\n\n\
                 Output in the standard QuestionBank format."
            );

            let mut bank = self
                .generate_questions(Some(&prompt), Some(num_questions), true)
                .await
                .with_context(|| format!("类别 {category_name} 生成失败"))?;

            let generated = bank.total_questions();
            for category in bank.categories {
                if let Some(questions) = bank.questions.remove(&category.id) {
                    // 键冲突时后写覆盖
                    combined.questions.insert(category.id.clone(), questions);
                }
                combined.categories.push(category);
            }

            info!("  ✓ 本类别生成 {} 道题目\n", generated);
        }

        info!("{}", "=".repeat(60));
        info!("✓ 全部类别生成完成, 共 {} 道题目", combined.total_questions());
        info!("{}", "=".repeat(60));

        Ok(combined)
    }

    /// 用新提示词重新生成（复用已缓存的上下文，便于迭代调整提示词）
    pub async fn regenerate_with_different_prompt(
        &mut self,
        new_prompt: &str,
        num_questions: Option<usize>,
    ) -> Result<QuestionBank> {
        info!("使用新提示词重新生成（复用缓存上下文）...\n");
        self.generate_questions(Some(new_prompt), num_questions, true)
            .await
    }

    /// 打印题库摘要（含一道示例题目）
    pub fn display_summary(&self, bank: &QuestionBank) {
        info!("\n{}", "=".repeat(60));
        info!("📊 题库摘要");
        info!("{}", "=".repeat(60));
        info!("类别总数: {}", bank.categories.len());
        for category in &bank.categories {
            let count = bank.questions_for(&category.id).len();
            info!("  • {} ({}): {} 道题目", category.name, category.id, count);
        }
        info!("题目总数: {}", bank.total_questions());

        // 取第一个有题目的类别展示一道示例
        if let Some((category, question)) = bank
            .categories
            .iter()
            .find_map(|c| bank.questions_for(&c.id).first().map(|q| (c, q)))
        {
            info!("\n{}", "─".repeat(60));
            info!("示例题目 (类别: {})", category.name);
            info!("ID: {}", question.question_id);
            info!("题干: {}", truncate_text(&question.question, 80));
            for (i, option) in question.options.iter().enumerate() {
                let marker = if *option == question.correct_answer { "✓" } else { " " };
                info!("  {} {}. {}", marker, i + 1, truncate_text(option, 60));
            }
            info!("来源: {}", question.source);
        }
        info!("{}\n", "=".repeat(60));
    }

    /// 尽力清理远程资源：先删缓存再删文件
    ///
    /// 每项删除独立处理，失败只记日志并继续，保证其余资源仍会被尝试删除；
    /// 无论成败，本地句柄都会清空
    pub async fn cleanup(&mut self) {
        info!("\n正在清理远程资源...");

        if let Some(cache) = self.cached_content.take() {
            match self.client.delete_cache(&cache.name).await {
                Ok(()) => info!("  ✓ 已删除缓存: {}", cache.name),
                Err(e) => warn!("  ✗ 删除缓存失败 {}: {}", cache.name, e),
            }
        }

        for file in self.uploaded_files.drain(..) {
            match self.client.delete_file(&file.name).await {
                Ok(()) => info!("  ✓ 已删除文件: {}", file.name),
                Err(e) => warn!("  ✗ 删除文件失败 {}: {}", file.name, e),
            }
        }

        info!("✓ 清理完成");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[tokio::test]
    async fn test_missing_files_dir_surfaces_config_error() {
        // 入口靠 downcast 识别配置错误并打印修复清单，
        // 上传路径不能用 with_context 把错误类型包丢
        let mut generator = QuestionGenerator::new(&Config::default());
        let err = generator
            .upload_files("/definitely/not/a/real/dir")
            .await
            .unwrap_err();

        let config_err = err
            .downcast_ref::<ConfigError>()
            .expect("应能还原为配置错误");
        assert!(matches!(config_err, ConfigError::FilesDirNotFound { .. }));
        assert!(!config_err.remediation().is_empty());
    }
}

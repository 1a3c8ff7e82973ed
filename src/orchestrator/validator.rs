//! 校验编排器 - 编排层
//!
//! ## 职责
//!
//! 串联一次完整的题库校验流程：上传源文档 → 准备可复用的校验上下文 →
//! 逐题或按批调用远程校验 → 聚合为整体报告。
//!
//! ## 失败语义
//!
//! 远程调用失败或响应不可解析时，在最小粒度（单题或整批）上捕获，
//! 为受影响的每道题合成一条 `is_valid=false`、携带 `validation_error`
//! 问题的结果。这保证聚合器永远能拿到"每道尝试校验的题一条结果"，
//! 单个坏题/坏批不会中止整次运行。
//!
//! ## 顺序性
//!
//! 所有远程调用严格顺序执行，不并发，不设超时，不支持取消。

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::gemini_client::{ContentPart, GeminiClient, GenerationOptions, UploadedFile};
use crate::config::Config;
use crate::models::question::{Category, Question, QuestionBank};
use crate::models::validation::{
    BatchValidationResult, QuestionValidationResult, ValidationReport,
};
use crate::services::aggregator::generate_validation_report;
use crate::services::source_files::collect_source_files;

/// 可复用的校验上下文：源文件引用 + 校验系统指令
///
/// 校验侧不走显式缓存接口，而是每次调用都带上相同的文件引用，
/// 由远端对重复内容自动做缓存复用
struct CachedContext {
    system_instruction: String,
    file_parts: Vec<ContentPart>,
}

/// 校验编排器
pub struct QuestionValidator {
    client: GeminiClient,
    model_name: String,
    batch_size: usize,
    uploaded_files: Vec<UploadedFile>,
    cached_context: Option<CachedContext>,
    validation_system_instruction: String,
}

impl QuestionValidator {
    /// 创建新的校验编排器
    pub fn new(config: &Config) -> Self {
        Self {
            client: GeminiClient::new(config),
            model_name: config.validation_model.clone(),
            batch_size: config.validation_batch_size.max(1),
            uploaded_files: Vec::new(),
            cached_context: None,
            validation_system_instruction: config.validation_system_instruction.clone(),
        }
    }

    /// 上传校验用的源文档
    ///
    /// 与出题侧一致：单个文件失败跳过并告警，隐藏文件跳过
    pub async fn upload_source_files(&mut self, files_dir: &str) -> Result<usize> {
        let file_paths = collect_source_files(files_dir)?;
        info!("正在上传 {} 个源文件用于校验...", file_paths.len());

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

    /// 准备可复用的校验上下文（文件引用 + 系统指令）
    pub fn prepare_cached_context(&mut self) -> Result<()> {
        if self.uploaded_files.is_empty() {
            anyhow::bail!("还没有上传任何源文件，请先调用 upload_source_files()");
        }

        let file_parts = self
            .uploaded_files
            .iter()
            .map(ContentPart::from_file)
            .collect();

        self.cached_context = Some(CachedContext {
            system_instruction: self.validation_system_instruction.clone(),
            file_parts,
        });

        info!("✓ 校验上下文已准备就绪\n");
        Ok(())
    }

    /// 校验单道题目
    pub async fn validate_single_question(
        &self,
        question: &Question,
        category: &Category,
    ) -> Result<QuestionValidationResult> {
        let context = self
            .cached_context
            .as_ref()
            .context("校验上下文未准备，请先调用 prepare_cached_context()")?;

        let prompt = build_single_prompt(question, category);

        let mut parts = context.file_parts.clone();
        parts.push(ContentPart::Text(prompt));

        let schema = serde_json::to_value(schemars::schema_for!(QuestionValidationResult))
            .context("校验结果 schema 构建失败")?;

        let options = GenerationOptions {
            system_instruction: Some(context.system_instruction.clone()),
            response_schema: Some(schema),
            ..Default::default()
        };

        let text = self
            .client
            .generate_content(&self.model_name, &parts, &options)
            .await?;

        let result: QuestionValidationResult =
            serde_json::from_str(&text).context("无法把响应解析为校验结果")?;

        Ok(result)
    }

    /// 校验一批题目（一次远程调用）
    ///
    /// 返回的结果按 question_id 与本批题目重新对齐：
    /// 远端漏掉的题目会补一条合成失败结果，多余的结果丢弃并告警
    pub async fn validate_question_batch(
        &self,
        questions: &[Question],
        category: &Category,
    ) -> Result<Vec<QuestionValidationResult>> {
        let context = self
            .cached_context
            .as_ref()
            .context("校验上下文未准备，请先调用 prepare_cached_context()")?;

        let prompt = build_batch_prompt(questions, category)?;

        let mut parts = context.file_parts.clone();
        parts.push(ContentPart::Text(prompt));

        let schema = serde_json::to_value(schemars::schema_for!(BatchValidationResult))
            .context("批量校验 schema 构建失败")?;

        let options = GenerationOptions {
            system_instruction: Some(context.system_instruction.clone()),
            response_schema: Some(schema),
            ..Default::default()
        };

        let text = self
            .client
            .generate_content(&self.model_name, &parts, &options)
            .await?;

        let batch: BatchValidationResult =
            serde_json::from_str(&text).context("无法把响应解析为批量校验结果")?;

        Ok(align_batch_results(questions, &category.id, batch))
    }

    /// 校验整个题库并生成报告
    ///
    /// 按 `categories` 顺序遍历，没有题目的类别跳过；
    /// 每个类别内按配置的批次大小分批（1 表示逐题），严格顺序调用
    pub async fn validate_question_bank(&mut self, bank: &QuestionBank) -> Result<ValidationReport> {
        if self.cached_context.is_none() {
            self.prepare_cached_context()?;
        }

        info!("{}", "=".repeat(60));
        info!("🔍 开始校验题库 (批次大小: {})", self.batch_size);
        info!("{}", "=".repeat(60));
        info!(
            "类别数: {}, 题目总数: {}\n",
            bank.categories.len(),
            bank.total_questions()
        );

        let mut all_results: Vec<QuestionValidationResult> = Vec::new();

        for category in &bank.categories {
            let questions = bank.questions_for(&category.id);
            if questions.is_empty() {
                continue;
            }

            info!("正在校验类别: {} ({} 道题目)", category.name, questions.len());

            for chunk in questions.chunks(self.batch_size) {
                if self.batch_size == 1 {
                    // 逐题校验：失败粒度是单题
                    let question = &chunk[0];
                    match self.validate_single_question(question, category).await {
                        Ok(result) => {
                            log_question_status(&result);
                            all_results.push(result);
                        }
                        Err(e) => {
                            warn!("    ✗ 校验 {} 出错: {}", question.question_id, e);
                            all_results.push(QuestionValidationResult::failed(
                                &question.question_id,
                                &category.id,
                                &e.to_string(),
                            ));
                        }
                    }
                } else {
                    // 批量校验：失败粒度是整批
                    match self.validate_question_batch(chunk, category).await {
                        Ok(results) => {
                            for result in &results {
                                log_question_status(result);
                            }
                            all_results.extend(results);
                        }
                        Err(e) => {
                            warn!("    ✗ 本批 {} 道题校验出错: {}", chunk.len(), e);
                            all_results.extend(synthesize_failed_results(
                                chunk,
                                &category.id,
                                &e.to_string(),
                            ));
                        }
                    }
                }
            }
        }

        info!("\n{}", "=".repeat(60));
        info!("✓ 校验完成, 共 {} 条结果", all_results.len());
        info!("{}", "=".repeat(60));

        Ok(generate_validation_report(bank, all_results))
    }

    /// 尽力清理已上传的远程文件
    ///
    /// 逐个删除，失败只记日志并继续；本地句柄总是清空
    pub async fn cleanup(&mut self) {
        info!("\n正在清理已上传的文件...");

        for file in self.uploaded_files.drain(..) {
            match self.client.delete_file(&file.name).await {
                Ok(()) => info!("  ✓ 已删除: {}", file.name),
                Err(e) => warn!("  ✗ 删除失败 {}: {}", file.name, e),
            }
        }

        self.cached_context = None;
        info!("✓ 清理完成");
    }
}

/// 记录单题校验状态
fn log_question_status(result: &QuestionValidationResult) {
    let status = if result.is_valid { "✓ 通过" } else { "✗ 发现问题" };
    info!(
        "    {} - {} (置信度: {:.2})",
        status, result.question_id, result.confidence_score
    );
}

/// 构建单题校验提示词
fn build_single_prompt(question: &Question, category: &Category) -> String {
    format!(
        "You are validating the following exam question against the source documents.\n\n\
         **Category**: {name}\n\
         **Question ID**: {id}\n\n\
         **Question**: {text}\n\n\
         **Options**:\n\
         1. {opt0}\n\
         2. {opt1}\n\
         3. {opt2}\n\
         4. {opt3}\n\n\
         **Stated Correct Answer**: {answer}\n\n\
         **Explanation**: {explanation}\n\n\
         **Stated Source**: {source}\n\n\
         ---\n\n\
         **YOUR VALIDATION TASKS:**\n\n\
         1. **Factual Accuracy**: Verify this question's content against the provided source documents. \
         If you cannot find supporting evidence, note this as a factual error.\n\
         2. **Answer Correctness**: Based on the source documents, is the stated correct answer actually correct?\n\
         3. **Explanation Accuracy**: Does the explanation accurately represent information from the documents?\n\
         4. **Options Quality**: Are all four options plausible and distinct?\n\
         5. **Source Verification**: Can you find the information in the documents?\n\n\
         Quote specific sections from the source documents as evidence, assign a confidence \
         score (0.0 to 1.0), and set question_id to \"{id}\" and category_id to \"{cat_id}\".\n\n\
         Provide your validation assessment in the structured format requested.",
        name = category.name,
        id = question.question_id,
        text = question.question,
        opt0 = question.options[0],
        opt1 = question.options[1],
        opt2 = question.options[2],
        opt3 = question.options[3],
        answer = question.correct_answer,
        explanation = question.explanation,
        source = question.source,
        cat_id = category.id,
    )
}

/// 构建批量校验提示词（题目以 JSON 数组形式给出）
fn build_batch_prompt(questions: &[Question], category: &Category) -> Result<String> {
    let questions_json =
        serde_json::to_string_pretty(questions).context("批量题目序列化失败")?;

    Ok(format!(
        "You are validating a batch of {count} exam questions against the source documents.\n\n\
         **Category**: {name} (category_id: \"{cat_id}\")\n\n\
         **Questions (JSON)**:\n{questions_json}\n\n\
         ---\n\n\
         For EACH question in the batch, verify factual accuracy, answer correctness, \
         explanation accuracy and options quality against the provided source documents, \
         quote evidence, and assign a confidence score (0.0 to 1.0).\n\n\
         Return exactly one result per question, in the same order, echoing each question's \
         question_id and using category_id \"{cat_id}\".\n\n\
         Provide your validation assessment in the structured format requested.",
        count = questions.len(),
        name = category.name,
        cat_id = category.id,
    ))
}

/// 把远端返回的批量结果与本批题目重新对齐
///
/// 以 question_id 为键匹配；远端漏掉的题目合成失败结果补位，
/// 对不上号的多余结果丢弃并告警。输出顺序与本批题目一致
fn align_batch_results(
    questions: &[Question],
    category_id: &str,
    batch: BatchValidationResult,
) -> Vec<QuestionValidationResult> {
    let mut by_id: std::collections::HashMap<String, QuestionValidationResult> = batch
        .results
        .into_iter()
        .map(|r| (r.question_id.clone(), r))
        .collect();

    let mut aligned = Vec::with_capacity(questions.len());
    for question in questions {
        match by_id.remove(&question.question_id) {
            Some(result) => aligned.push(result),
            None => {
                warn!("    ⚠️ 远端未返回 {} 的结果，合成失败结果", question.question_id);
                aligned.push(QuestionValidationResult::failed(
                    &question.question_id,
                    category_id,
                    "no result returned for this question in the batch response",
                ));
            }
        }
    }

    for (id, _) in by_id {
        warn!("    ⚠️ 丢弃无法对齐的多余结果: {}", id);
    }

    aligned
}

/// 为一批题目合成失败结果（整批远程调用失败时使用）
pub fn synthesize_failed_results(
    questions: &[Question],
    category_id: &str,
    reason: &str,
) -> Vec<QuestionValidationResult> {
    questions
        .iter()
        .map(|q| QuestionValidationResult::failed(&q.question_id, category_id, reason))
        .collect()
}

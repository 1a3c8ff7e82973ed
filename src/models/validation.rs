//! 校验数据模型
//!
//! 单题校验结果由远程模型按 schema 直接产出（或由错误兜底逻辑合成），
//! 类别汇总与整体报告由聚合器计算。
//!
//! 字段上的文档注释会进入发送给模型的 JSON schema，因此使用英文书写。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    /// 线上格式的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

/// 问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    FactualError,
    AnswerMismatch,
    ExplanationIncorrect,
    SourceNotFound,
    OptionIssues,
    ValidationError,
}

impl IssueType {
    /// 线上格式的 snake_case 名称
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::FactualError => "factual_error",
            IssueType::AnswerMismatch => "answer_mismatch",
            IssueType::ExplanationIncorrect => "explanation_incorrect",
            IssueType::SourceNotFound => "source_not_found",
            IssueType::OptionIssues => "option_issues",
            IssueType::ValidationError => "validation_error",
        }
    }
}

/// 校验过程中发现的单个问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    /// Severity level: 'critical', 'major', or 'minor'
    pub severity: Severity,
    /// Type of issue found
    pub issue_type: IssueType,
    /// Detailed description of the issue found
    pub description: String,
    /// Relevant excerpt from source documents that supports the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Suggested correction or improvement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// 构造一条校验流程错误（远程调用失败时的兜底问题）
    pub fn validation_error(description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            issue_type: IssueType::ValidationError,
            description: description.into(),
            evidence: None,
            suggestion: None,
        }
    }
}

/// 单题校验结果
///
/// `is_valid` 由结果的生产方（远程模型或错误兜底逻辑）独立给出，
/// 聚合器不会根据四个布尔子项重新计算它
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionValidationResult {
    /// ID of the question being validated
    pub question_id: String,
    /// Category ID the question belongs to
    pub category_id: String,
    /// Whether the question passed validation
    pub is_valid: bool,
    /// Whether the question content is found in source documents
    pub is_factually_accurate: bool,
    /// Whether the stated correct answer is actually correct per the documents
    pub is_answer_correct: bool,
    /// Whether the explanation matches the source material
    pub is_explanation_accurate: bool,
    /// Whether all options are plausible and distinct
    pub are_options_valid: bool,
    /// List of issues found during validation
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    /// Confidence score from 0.0 to 1.0 on the validation assessment
    pub confidence_score: f64,
    /// Additional notes or context about this validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl QuestionValidationResult {
    /// 合成一条失败结果（远程调用抛错或响应不可解析时使用）
    ///
    /// 所有布尔项为 false，置信度为 0.0，携带一条 critical 的
    /// validation_error 问题
    pub fn failed(
        question_id: impl Into<String>,
        category_id: impl Into<String>,
        reason: &str,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            category_id: category_id.into(),
            is_valid: false,
            is_factually_accurate: false,
            is_answer_correct: false,
            is_explanation_accurate: false,
            are_options_valid: false,
            issues: vec![ValidationIssue::validation_error(format!(
                "Validation process failed: {reason}"
            ))],
            confidence_score: 0.0,
            notes: Some(format!("Validation error: {reason}")),
        }
    }
}

/// 批量校验的线上返回格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchValidationResult {
    /// List of validation results for each question in the batch
    pub results: Vec<QuestionValidationResult>,
}

/// 单个类别的校验汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryValidationSummary {
    pub category_id: String,
    pub category_name: String,
    pub total_questions: usize,
    pub valid_questions: usize,
    pub invalid_questions: usize,
    pub critical_issues: usize,
    pub major_issues: usize,
    pub minor_issues: usize,
    /// 类别内所有结果置信度的算术平均值（[0,1]）
    pub average_confidence: f64,
}

/// 整体校验报告（一次校验运行产出一份，只写不改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    /// 校验时刻（ISO-8601）
    pub validation_timestamp: String,
    pub total_questions: usize,
    pub valid_questions: usize,
    pub invalid_questions: usize,
    /// 每个有结果的类别一条汇总（没有结果的类别不出现）
    pub category_summaries: Vec<CategoryValidationSummary>,
    /// 全部单题结果，保持输入顺序
    pub question_results: Vec<QuestionValidationResult>,
    /// 整体准确率（百分比，[0,100]）
    pub overall_accuracy_rate: f64,
    /// 整体平均置信度（[0,1]）
    pub overall_confidence: f64,
    /// critical 级别问题总数
    pub critical_issues_count: usize,
    /// 按固定顺序生成的改进建议
    #[serde(default)]
    pub recommendations: Vec<String>,
}

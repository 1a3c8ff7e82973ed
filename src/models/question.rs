//! 题库数据模型
//!
//! 这些结构体同时承担三个职责：
//! - 持久化格式（题库 JSON 文件）
//! - 远程模型结构化输出的 schema（通过 `schemars::JsonSchema` 派生）
//! - 内存中的业务数据
//!
//! 字段上的文档注释会进入发送给模型的 JSON schema，因此使用英文书写。

use std::collections::HashMap;

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// 题目类别
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    /// Unique identifier for the category (kebab-case)
    pub id: String,
    /// Display name of the category
    pub name: String,
    /// Detailed description of what the category covers
    pub description: String,
}

/// 单个选择题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    /// Unique identifier for the question (e.g. EL001)
    pub question_id: String,
    /// The actual question text
    pub question: String,
    /// List of exactly 4 answer options
    #[serde(deserialize_with = "deserialize_options")]
    pub options: Vec<String>,
    /// The correct answer, copied verbatim from the options
    pub correct_answer: String,
    /// Detailed explanation of why this is the correct answer
    pub explanation: String,
    /// Source URL for the question
    pub source: String,
}

impl Question {
    /// 构造题目，选项数量必须为 4
    ///
    /// 注意：不校验 correct_answer 是否出现在 options 中，
    /// 这是上游数据格式允许的松散之处，这里保持原样
    pub fn new(
        question_id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        explanation: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self> {
        if options.len() != 4 {
            anyhow::bail!("题目选项数量必须为 4，实际为 {}", options.len());
        }
        Ok(Self {
            question_id: question_id.into(),
            question: question.into(),
            options,
            correct_answer: correct_answer.into(),
            explanation: explanation.into(),
            source: source.into(),
        })
    }
}

/// 反序列化时校验选项数量为 4
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let options = Vec::<String>::deserialize(deserializer)?;
    if options.len() != 4 {
        return Err(serde::de::Error::invalid_length(
            options.len(),
            &"exactly 4 options",
        ));
    }
    Ok(options)
}

/// 完整题库
///
/// `questions` 的键与 `categories` 中的类别 id 是松散绑定的：
/// 不保证一一对应，也不做引用完整性校验（上游格式如此，保持原样）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionBank {
    /// List of question categories
    pub categories: Vec<Category>,
    /// Mapping from category id to the list of questions in that category
    pub questions: HashMap<String, Vec<Question>>,
}

impl QuestionBank {
    /// 题库中的题目总数
    pub fn total_questions(&self) -> usize {
        self.questions.values().map(|q| q.len()).sum()
    }

    /// 某个类别下的题目列表（不存在时返回空切片）
    pub fn questions_for(&self, category_id: &str) -> &[Question] {
        self.questions
            .get(category_id)
            .map(|q| q.as_slice())
            .unwrap_or(&[])
    }
}

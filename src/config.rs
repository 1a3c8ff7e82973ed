use std::path::PathBuf;

use crate::error::ConfigError;

/// 默认的出题系统指令（可通过环境变量 QBG_SYSTEM_INSTRUCTION 覆盖）
pub const SYSTEM_INSTRUCTION: &str = "You are an expert educational assessment designer. \
Your task is to generate high-quality multiple-choice exam questions based on the source \
documents provided to you.

IMPORTANT RULES:
1. Only generate questions based on the content of the provided source documents
2. Do NOT invent questions that cannot be answered from the provided documents
3. Each question must have exactly 4 options
4. Provide clear, detailed explanations for correct answers
5. Categories should be named after the document titles or main topics
6. Ensure questions test understanding, application, and analysis - not just recall
7. Make distractors (wrong options) plausible but clearly incorrect

Generate questions that reflect the complexity and depth of the source material.";

/// 默认的校验系统指令
pub const VALIDATION_SYSTEM_INSTRUCTION: &str = "You are an expert fact-checker and \
educational assessment validator. Your role is to meticulously verify exam questions \
against the provided source documents to ensure:
1. Factual accuracy - all content is grounded in the source documents
2. Answer correctness - the correct answer is truly correct per the documents
3. Explanation accuracy - explanations accurately reflect source material
4. Options validity - all options are appropriate and plausible

Be thorough, critical, and precise. Use direct quotes from source documents to support \
your findings. If something cannot be verified or is incorrect, clearly identify it and \
explain why.

The source documents have been uploaded and you must reference them when validating \
questions.";

/// 默认的出题提示词模板，`{num_questions}` 会在调用时被替换为实际数量
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Based on the provided source documents, \
generate comprehensive exam questions.

Generate approximately {num_questions} questions for each relevant category you identify \
in the documents.

Requirements:
1. Create categories based on the document topics (name each category after the document or main topic)
2. Each question must be directly answerable from the provided documents
3. Questions should test higher-order thinking skills
4. Ensure variety in question types (comprehension, application, analysis)
5. Make sure all 4 options are plausible but only one is clearly correct
6. Provide detailed explanations that reference the source material

Output the questions in the specified JSON structure.";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- Gemini API 配置 ---
    /// API 密钥（必填，来自环境变量 GEMINI_API_KEY）
    pub api_key: String,
    /// API 基础地址
    pub api_base_url: String,
    /// 出题使用的模型
    pub generation_model: String,
    /// 校验使用的模型（允许与出题模型不同）
    pub validation_model: String,
    // --- 出题 / 校验 配置 ---
    /// 每个类别默认生成的题目数量
    pub default_num_questions: usize,
    /// 校验批次大小（1 表示逐题校验）
    pub validation_batch_size: usize,
    /// 上下文缓存的有效期（如 "3600s"）
    pub cache_ttl: String,
    // --- 文件路径配置 ---
    /// 源文档目录
    pub files_dir: String,
    /// 输出目录
    pub output_dir: String,
    /// 题库输出文件名
    pub questions_output_file: String,
    /// 校验报告 JSON 文件名
    pub validation_report_json: String,
    /// 校验报告 Markdown 文件名
    pub validation_report_md: String,
    // --- 提示词配置 ---
    /// 出题系统指令
    pub system_instruction: String,
    /// 校验系统指令
    pub validation_system_instruction: String,
    /// 出题提示词模板（含 {num_questions} 占位符）
    pub default_prompt_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            generation_model: "gemini-2.5-pro".to_string(),
            validation_model: "gemini-2.5-flash".to_string(),
            default_num_questions: 10,
            validation_batch_size: 1,
            cache_ttl: "3600s".to_string(),
            files_dir: "files".to_string(),
            output_dir: "output".to_string(),
            questions_output_file: "questions.json".to_string(),
            validation_report_json: "validation_report.json".to_string(),
            validation_report_md: "validation_report.md".to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            validation_system_instruction: VALIDATION_SYSTEM_INSTRUCTION.to_string(),
            default_prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.api_key),
            api_base_url: std::env::var("QBG_API_BASE_URL").unwrap_or(default.api_base_url),
            generation_model: std::env::var("QBG_GENERATION_MODEL")
                .unwrap_or(default.generation_model),
            validation_model: std::env::var("QBG_VALIDATION_MODEL")
                .unwrap_or(default.validation_model),
            default_num_questions: std::env::var("QBG_NUM_QUESTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.default_num_questions),
            validation_batch_size: std::env::var("QBG_VALIDATION_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.validation_batch_size),
            cache_ttl: std::env::var("QBG_CACHE_TTL").unwrap_or(default.cache_ttl),
            files_dir: std::env::var("QBG_FILES_DIR").unwrap_or(default.files_dir),
            output_dir: std::env::var("QBG_OUTPUT_DIR").unwrap_or(default.output_dir),
            questions_output_file: std::env::var("QBG_QUESTIONS_FILE")
                .unwrap_or(default.questions_output_file),
            validation_report_json: std::env::var("QBG_REPORT_JSON")
                .unwrap_or(default.validation_report_json),
            validation_report_md: std::env::var("QBG_REPORT_MD")
                .unwrap_or(default.validation_report_md),
            system_instruction: std::env::var("QBG_SYSTEM_INSTRUCTION")
                .unwrap_or(default.system_instruction),
            validation_system_instruction: std::env::var("QBG_VALIDATION_SYSTEM_INSTRUCTION")
                .unwrap_or(default.validation_system_instruction),
            default_prompt_template: std::env::var("QBG_PROMPT_TEMPLATE")
                .unwrap_or(default.default_prompt_template),
        }
    }

    /// 校验 API 密钥是否已配置
    ///
    /// 缺少密钥是面向用户的致命错误，错误信息中附带设置方法
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::ApiKeyMissing);
        }
        Ok(&self.api_key)
    }

    /// 题库输出文件完整路径
    pub fn questions_output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.questions_output_file)
    }

    /// 校验报告 JSON 完整路径
    pub fn validation_report_json_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.validation_report_json)
    }

    /// 校验报告 Markdown 完整路径
    pub fn validation_report_md_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.validation_report_md)
    }
}

/// 替换提示词模板中的 {num_questions} 占位符
pub fn render_prompt_template(template: &str, num_questions: usize) -> String {
    template.replace("{num_questions}", &num_questions.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation_model, "gemini-2.5-pro");
        assert_eq!(config.validation_model, "gemini-2.5-flash");
        assert_eq!(config.default_num_questions, 10);
        assert_eq!(config.validation_batch_size, 1);
        assert!(config.default_prompt_template.contains("{num_questions}"));
    }

    #[test]
    fn test_require_api_key_missing() {
        let config = Config::default();
        assert!(config.require_api_key().is_err());

        let config = Config {
            api_key: "test-key".to_string(),
            ..Config::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_prompt_template_substitution() {
        let config = Config::default();
        let prompt = render_prompt_template(&config.default_prompt_template, 15);
        assert!(prompt.contains("approximately 15 questions"));
        assert!(!prompt.contains("{num_questions}"));
    }

    #[test]
    fn test_output_paths() {
        let config = Config::default();
        assert_eq!(
            config.questions_output_path(),
            PathBuf::from("output").join("questions.json")
        );
        assert_eq!(
            config.validation_report_md_path(),
            PathBuf::from("output").join("validation_report.md")
        );
    }
}

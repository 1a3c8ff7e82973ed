//! 编排层
//!
//! - `generator` - 出题编排器：上传 → 缓存 → 生成 → 清理
//! - `validator` - 校验编排器：上传 → 上下文 → 逐批校验 → 聚合报告 → 清理

pub mod generator;
pub mod validator;

pub use generator::QuestionGenerator;
pub use validator::QuestionValidator;

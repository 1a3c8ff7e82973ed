//! # Question Bank Gen
//!
//! 一个基于生成式模型的题库生成与校验工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的三层架构：
//!
//! ### ① 基础能力层（Clients / Models）
//! - `clients/` - 远程 API 客户端，只封装 HTTP 交互
//! - `GeminiClient` - 文件上传、上下文缓存、结构化生成能力
//! - `models/` - 领域数据模型（题库、校验结果、报告）与加载器
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心调用顺序
//! - `source_files` - 收集待上传的源文档
//! - `aggregator` - 把逐题校验结果聚合为整体报告（纯函数核心）
//! - `renderer` - 报告的确定性 Markdown 渲染（纯函数）
//! - `report_writer` - 报告落盘（JSON + Markdown）
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/generator` - 出题编排器：上传 → 缓存 → 生成 → 清理
//! - `orchestrator/validator` - 校验编排器：上传 → 逐批校验 → 聚合 → 清理
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::GeminiClient;
pub use config::Config;
pub use error::{ApiError, ConfigError};
pub use models::{Category, Question, QuestionBank, QuestionValidationResult, ValidationReport};
pub use orchestrator::{QuestionGenerator, QuestionValidator};
pub use services::{generate_validation_report, render_markdown};

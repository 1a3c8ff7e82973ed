/// 日志工具模块
///
/// 提供日志初始化、格式化和运行摘要输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::validation::ValidationReport;

/// 初始化全局日志订阅器
///
/// 默认级别 info，可通过 RUST_LOG 环境变量覆盖
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `mode`: 运行模式（generate / validate）
/// - `model_name`: 本次运行使用的模型
pub fn log_startup(mode: &str, model_name: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题库{}模式", mode_label(mode));
    info!("🤖 使用模型: {}", model_name);
    info!("{}", "=".repeat(60));
}

fn mode_label(mode: &str) -> &'static str {
    match mode {
        "validate" => "校验",
        _ => "生成",
    }
}

/// 打印校验运行的最终统计信息
///
/// # 参数
/// - `report`: 聚合完成的校验报告
pub fn print_validation_stats(report: &ValidationReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 校验完成统计");
    info!("完成时间: {}", report.validation_timestamp);
    info!("{}", "=".repeat(60));
    info!("✅ 有效题目: {}/{}", report.valid_questions, report.total_questions);
    info!("❌ 无效题目: {}", report.invalid_questions);
    info!("🔴 严重问题: {}", report.critical_issues_count);
    info!("📈 总体准确率: {:.1}%", report.overall_accuracy_rate);
    info!("📈 总体置信度: {:.2}", report.overall_confidence);
    if !report.recommendations.is_empty() {
        info!("\n💡 改进建议:");
        for rec in &report.recommendations {
            info!("  • {}", rec);
        }
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计，不按字节）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

//! 报告写出服务 - 业务能力层
//!
//! 只负责"把校验报告落盘"能力：同一份报告写出两个文件，
//! JSON（完整结构化数据）和 Markdown（人类可读版本）

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

use crate::models::validation::ValidationReport;
use crate::services::renderer::render_markdown;

/// 保存校验报告为 JSON 与 Markdown 两个文件（自动创建父目录）
pub async fn save_validation_report(
    report: &ValidationReport,
    json_path: &Path,
    markdown_path: &Path,
) -> Result<()> {
    write_json(report, json_path).await?;
    write_markdown(report, markdown_path).await?;
    Ok(())
}

/// 写出 JSON 报告
async fn write_json(report: &ValidationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(report).context("校验报告序列化失败")?;
    fs::write(path, json)
        .await
        .with_context(|| format!("无法写入 JSON 报告: {}", path.display()))?;

    info!("✓ JSON 报告已保存至: {}", path.display());
    Ok(())
}

/// 写出 Markdown 报告
async fn write_markdown(report: &ValidationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }

    let markdown = render_markdown(report);
    fs::write(path, markdown)
        .await
        .with_context(|| format!("无法写入 Markdown 报告: {}", path.display()))?;

    info!("✓ Markdown 报告已保存至: {}", path.display());
    Ok(())
}

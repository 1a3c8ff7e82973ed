use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

use crate::models::question::QuestionBank;

/// 从 JSON 文件加载题库
pub async fn load_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取题库文件: {}", path.display()))?;

    let bank: QuestionBank = serde_json::from_str(&content)
        .with_context(|| format!("无法解析题库文件: {}", path.display()))?;

    info!(
        "✓ 已加载题库: {} 个类别, {} 道题目",
        bank.categories.len(),
        bank.total_questions()
    );

    Ok(bank)
}

/// 将题库保存为 JSON 文件（自动创建父目录）
pub async fn save_question_bank(bank: &QuestionBank, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(bank).context("题库序列化失败")?;

    fs::write(path, json)
        .await
        .with_context(|| format!("无法写入题库文件: {}", path.display()))?;

    info!("✓ 题库已保存至: {}", path.display());

    Ok(())
}

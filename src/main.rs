use anyhow::{Context, Result};
use tracing::{error, info};

use question_bank_gen::config::Config;
use question_bank_gen::error::ConfigError;
use question_bank_gen::models::loaders::{load_question_bank, save_question_bank};
use question_bank_gen::orchestrator::{QuestionGenerator, QuestionValidator};
use question_bank_gen::services::save_validation_report;
use question_bank_gen::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 运行模式：generate（默认）或 validate
    let mode = std::env::args().nth(1).unwrap_or_else(|| "generate".to_string());
    if mode != "generate" && mode != "validate" {
        error!("未知的运行模式: {} (支持 generate / validate)", mode);
        std::process::exit(1);
    }

    // 加载配置
    let config = Config::from_env();
    if let Err(e) = config.require_api_key() {
        exit_with_remediation(&e);
    }

    let result = match mode.as_str() {
        "validate" => run_validate(&config).await,
        _ => run_generate(&config).await,
    };

    // 运行途中暴露的配置错误（如源文档目录缺失）同样打印修复清单
    if let Err(e) = &result {
        if let Some(config_err) = e.downcast_ref::<ConfigError>() {
            exit_with_remediation(config_err);
        }
    }
    result
}

/// 打印配置错误与修复清单后退出
fn exit_with_remediation(err: &ConfigError) -> ! {
    error!("{}", err);
    error!("启动前请检查:");
    for step in err.remediation() {
        error!("  {}", step);
    }
    std::process::exit(1);
}

/// 出题流程：上传 → 缓存 → 生成 → 摘要 → 落盘 → 清理
async fn run_generate(config: &Config) -> Result<()> {
    logging::log_startup("generate", &config.generation_model);

    let mut generator = QuestionGenerator::new(config);

    let result = async {
        generator.upload_files(&config.files_dir).await?;
        generator.create_cached_content().await;

        let bank = generator.generate_questions(None, None, true).await?;
        generator.display_summary(&bank);

        let output_path = config.questions_output_path();
        save_question_bank(&bank, &output_path).await?;
        info!("✓ 题库已保存至: {}", output_path.display());

        Ok::<_, anyhow::Error>(())
    }
    .await;

    // 无论生成成败都尝试清理远程资源
    generator.cleanup().await;
    result
}

/// 校验流程：加载题库 → 上传 → 逐批校验 → 报告落盘 → 清理
async fn run_validate(config: &Config) -> Result<()> {
    logging::log_startup("validate", &config.validation_model);

    let bank_path = config.questions_output_path();
    let bank = load_question_bank(&bank_path)
        .await
        .with_context(|| format!("请先运行 generate 模式生成题库: {}", bank_path.display()))?;

    info!(
        "已加载题库: {} 个类别, {} 道题目\n",
        bank.categories.len(),
        bank.total_questions()
    );

    let mut validator = QuestionValidator::new(config);

    let result = async {
        validator.upload_source_files(&config.files_dir).await?;
        validator.prepare_cached_context()?;

        let report = validator.validate_question_bank(&bank).await?;

        save_validation_report(
            &report,
            &config.validation_report_json_path(),
            &config.validation_report_md_path(),
        )
        .await?;

        logging::print_validation_stats(&report);
        Ok::<_, anyhow::Error>(())
    }
    .await;

    validator.cleanup().await;
    result
}

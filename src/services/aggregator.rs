//! 校验结果聚合服务 - 业务能力层（核心）
//!
//! 把一组单题校验结果和对应题库聚合为整体校验报告：
//! 按类别分组统计、置信度/准确率计算、改进建议推导。
//!
//! 本模块是纯函数：不做 I/O，不修改输入，不抛错误。
//! 所有失败处理都发生在上游——远程调用失败已经在校验编排层
//! 被转换为普通的 `validation_error` 结果，这里一视同仁地统计。

use crate::models::question::QuestionBank;
use crate::models::validation::{
    CategoryValidationSummary, QuestionValidationResult, Severity, ValidationReport,
};

/// 生成校验报告，时间戳取当前时刻（ISO-8601）
pub fn generate_validation_report(
    bank: &QuestionBank,
    results: Vec<QuestionValidationResult>,
) -> ValidationReport {
    build_report(bank, results, chrono::Local::now().to_rfc3339())
}

/// 按给定时间戳生成校验报告（便于测试确定性输出）
pub fn build_report(
    bank: &QuestionBank,
    results: Vec<QuestionValidationResult>,
    timestamp: String,
) -> ValidationReport {
    let valid_count = results.iter().filter(|r| r.is_valid).count();
    let invalid_count = results.len() - valid_count;

    // 类别汇总：只为有结果的类别生成，保持 categories 的顺序
    let mut category_summaries = Vec::new();
    for category in &bank.categories {
        let category_results: Vec<&QuestionValidationResult> = results
            .iter()
            .filter(|r| r.category_id == category.id)
            .collect();
        if category_results.is_empty() {
            continue;
        }

        let category_valid = category_results.iter().filter(|r| r.is_valid).count();
        let confidence_sum: f64 = category_results.iter().map(|r| r.confidence_score).sum();

        category_summaries.push(CategoryValidationSummary {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            total_questions: category_results.len(),
            valid_questions: category_valid,
            invalid_questions: category_results.len() - category_valid,
            critical_issues: count_issues(&category_results, Severity::Critical),
            major_issues: count_issues(&category_results, Severity::Major),
            minor_issues: count_issues(&category_results, Severity::Minor),
            // category_results 保证非空，不会除零
            average_confidence: confidence_sum / category_results.len() as f64,
        });
    }

    // critical 总数直接在全量结果上重新统计：
    // 松散绑定允许多个类别共享同一 id，按类别求和会重复计数
    let total_critical = results
        .iter()
        .flat_map(|r| &r.issues)
        .filter(|i| i.severity == Severity::Critical)
        .count();

    let overall_confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence_score).sum::<f64>() / results.len() as f64
    };

    let accuracy_rate = if results.is_empty() {
        0.0
    } else {
        valid_count as f64 / results.len() as f64 * 100.0
    };

    // 改进建议：四个条件互相独立，按固定顺序追加
    let mut recommendations = Vec::new();
    if invalid_count > 0 {
        recommendations.push(format!(
            "{invalid_count} question(s) require review and correction"
        ));
    }
    if total_critical > 0 {
        recommendations.push(format!(
            "{total_critical} critical issue(s) found that must be addressed immediately"
        ));
    }
    if accuracy_rate < 90.0 {
        recommendations
            .push("Overall accuracy is below 90% - recommend thorough review".to_string());
    }
    if overall_confidence < 0.8 {
        recommendations.push(
            "Average confidence score is below 0.8 - some validations need manual verification"
                .to_string(),
        );
    }

    ValidationReport {
        validation_timestamp: timestamp,
        total_questions: results.len(),
        valid_questions: valid_count,
        invalid_questions: invalid_count,
        category_summaries,
        question_results: results,
        overall_accuracy_rate: accuracy_rate,
        overall_confidence,
        critical_issues_count: total_critical,
        recommendations,
    }
}

/// 统计一组结果中指定严重程度的问题总数（一条结果可携带多个问题）
fn count_issues(results: &[&QuestionValidationResult], severity: Severity) -> usize {
    results
        .iter()
        .flat_map(|r| &r.issues)
        .filter(|i| i.severity == severity)
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::question::Category;
    use crate::models::validation::{IssueType, ValidationIssue};

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn bank_with_categories(categories: Vec<Category>) -> QuestionBank {
        QuestionBank {
            categories,
            questions: HashMap::new(),
        }
    }

    fn result(
        question_id: &str,
        category_id: &str,
        is_valid: bool,
        confidence: f64,
    ) -> QuestionValidationResult {
        QuestionValidationResult {
            question_id: question_id.to_string(),
            category_id: category_id.to_string(),
            is_valid,
            is_factually_accurate: is_valid,
            is_answer_correct: is_valid,
            is_explanation_accurate: is_valid,
            are_options_valid: is_valid,
            issues: Vec::new(),
            confidence_score: confidence,
            notes: None,
        }
    }

    fn issue(severity: Severity) -> ValidationIssue {
        ValidationIssue {
            severity,
            issue_type: IssueType::FactualError,
            description: "问题描述".to_string(),
            evidence: None,
            suggestion: None,
        }
    }

    const TS: &str = "2026-08-23T12:00:00+08:00";

    #[test]
    fn test_empty_results() {
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let report = build_report(&bank, Vec::new(), TS.to_string());

        assert_eq!(report.total_questions, 0);
        assert_eq!(report.valid_questions, 0);
        assert_eq!(report.invalid_questions, 0);
        // 明确的除零保护：必须是 0.0，不能是 NaN
        assert_eq!(report.overall_accuracy_rate, 0.0);
        assert_eq!(report.overall_confidence, 0.0);
        assert!(report.category_summaries.is_empty());
        assert!(report.question_results.is_empty());
        // 空结果时 invalid=0、critical=0，但准确率 0 和置信度 0 触发两条建议
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn test_valid_plus_invalid_equals_total() {
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let results = vec![
            result("Q1", "cat-1", true, 0.9),
            result("Q2", "cat-1", false, 0.5),
            result("Q3", "cat-1", true, 0.8),
        ];
        let report = build_report(&bank, results, TS.to_string());
        assert_eq!(
            report.valid_questions + report.invalid_questions,
            report.total_questions
        );
    }

    #[test]
    fn test_eight_valid_two_invalid_scenario() {
        // 8 条 is_valid=true, confidence=0.9；2 条 is_valid=false, confidence=0.3
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let mut results = Vec::new();
        for i in 0..8 {
            results.push(result(&format!("Q{i}"), "cat-1", true, 0.9));
        }
        for i in 8..10 {
            results.push(result(&format!("Q{i}"), "cat-1", false, 0.3));
        }

        let report = build_report(&bank, results, TS.to_string());

        assert_eq!(report.total_questions, 10);
        assert_eq!(report.valid_questions, 8);
        assert_eq!(report.invalid_questions, 2);
        assert!((report.overall_accuracy_rate - 80.0).abs() < 1e-9);
        assert!((report.overall_confidence - 0.78).abs() < 1e-9);

        // invalid>0、准确率<90、置信度<0.8 共三条建议；无 critical 建议
        assert_eq!(report.recommendations.len(), 3);
        assert_eq!(
            report.recommendations[0],
            "2 question(s) require review and correction"
        );
        assert_eq!(
            report.recommendations[1],
            "Overall accuracy is below 90% - recommend thorough review"
        );
        assert_eq!(
            report.recommendations[2],
            "Average confidence score is below 0.8 - some validations need manual verification"
        );
    }

    #[test]
    fn test_category_with_zero_results_is_skipped() {
        let bank = bank_with_categories(vec![
            category("cat-1", "类别一"),
            category("cat-2", "类别二"),
        ]);
        let results = vec![result("Q1", "cat-1", true, 0.9)];
        let report = build_report(&bank, results, TS.to_string());

        assert_eq!(report.category_summaries.len(), 1);
        assert_eq!(report.category_summaries[0].category_id, "cat-1");
    }

    #[test]
    fn test_category_summary_counts_all_issues_per_result() {
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let mut bad = result("Q1", "cat-1", false, 0.4);
        bad.issues = vec![
            issue(Severity::Critical),
            issue(Severity::Critical),
            issue(Severity::Major),
            issue(Severity::Minor),
        ];
        let results = vec![bad, result("Q2", "cat-1", true, 0.8)];
        let report = build_report(&bank, results, TS.to_string());

        let summary = &report.category_summaries[0];
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.valid_questions, 1);
        assert_eq!(summary.invalid_questions, 1);
        assert_eq!(summary.critical_issues, 2);
        assert_eq!(summary.major_issues, 1);
        assert_eq!(summary.minor_issues, 1);
        assert!((summary.average_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_category_ids_do_not_double_count_critical() {
        // 松散绑定允许两个类别共享同一个 id：
        // 两个汇总各自统计到这些结果，但整体 critical 数在全量结果上重算，不会翻倍
        let bank = bank_with_categories(vec![
            category("shared", "类别A"),
            category("shared", "类别B"),
        ]);
        let mut bad = result("Q1", "shared", false, 0.2);
        bad.issues = vec![issue(Severity::Critical)];
        let report = build_report(&bank, vec![bad], TS.to_string());

        assert_eq!(report.category_summaries.len(), 2);
        assert_eq!(report.category_summaries[0].critical_issues, 1);
        assert_eq!(report.category_summaries[1].critical_issues, 1);
        // 不是 2
        assert_eq!(report.critical_issues_count, 1);
    }

    #[test]
    fn test_recommendations_are_independent() {
        // 逐条开关触发条件，确认四条建议互不影响
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);

        // 全部有效、高置信度：无建议
        let results = vec![
            result("Q1", "cat-1", true, 0.95),
            result("Q2", "cat-1", true, 0.9),
        ];
        let report = build_report(&bank, results, TS.to_string());
        assert!(report.recommendations.is_empty());

        // 只降低置信度：恰好一条置信度建议
        let results = vec![
            result("Q1", "cat-1", true, 0.7),
            result("Q2", "cat-1", true, 0.7),
        ];
        let report = build_report(&bank, results, TS.to_string());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("below 0.8"));

        // 加入一条 critical 但保持全部有效、高置信度：恰好一条 critical 建议
        let mut with_critical = result("Q1", "cat-1", true, 0.95);
        with_critical.issues = vec![issue(Severity::Critical)];
        let results = vec![with_critical, result("Q2", "cat-1", true, 0.9)];
        let report = build_report(&bank, results, TS.to_string());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("critical issue(s)"));
    }

    #[test]
    fn test_results_preserved_in_original_order() {
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let results = vec![
            result("Q3", "cat-1", true, 0.9),
            result("Q1", "cat-1", false, 0.2),
            result("Q2", "cat-1", true, 0.8),
        ];
        let report = build_report(&bank, results, TS.to_string());
        let ids: Vec<&str> = report
            .question_results
            .iter()
            .map(|r| r.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn test_accuracy_bounds() {
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);

        let all_valid = vec![result("Q1", "cat-1", true, 1.0)];
        let report = build_report(&bank, all_valid, TS.to_string());
        assert_eq!(report.overall_accuracy_rate, 100.0);
        assert_eq!(report.overall_confidence, 1.0);

        let all_invalid = vec![result("Q1", "cat-1", false, 0.0)];
        let report = build_report(&bank, all_invalid, TS.to_string());
        assert_eq!(report.overall_accuracy_rate, 0.0);
        assert_eq!(report.overall_confidence, 0.0);
    }

    #[test]
    fn test_is_valid_not_recomputed_from_sub_flags() {
        // is_valid 由生产方给出，即使四个子项全为 true 也不改写
        let bank = bank_with_categories(vec![category("cat-1", "类别一")]);
        let mut contradictory = result("Q1", "cat-1", false, 0.9);
        contradictory.is_factually_accurate = true;
        contradictory.is_answer_correct = true;
        contradictory.is_explanation_accurate = true;
        contradictory.are_options_valid = true;

        let report = build_report(&bank, vec![contradictory], TS.to_string());
        assert_eq!(report.valid_questions, 0);
        assert_eq!(report.invalid_questions, 1);
    }
}

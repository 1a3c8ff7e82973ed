//! 报告渲染服务 - 业务能力层
//!
//! 把 `ValidationReport` 确定性地渲染为 Markdown 文本。
//! 纯函数：不做 I/O，不修改输入，不在内部取时间——
//! 同一份报告永远渲染出字节相同的文本。

use std::fmt::Write;

use crate::models::validation::ValidationReport;

/// 渲染校验报告为 Markdown
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut md = String::new();

    // 写入 String 不会失败，unwrap 无风险，但这里统一用 let _ 形式
    let _ = writeln!(md, "# Question Bank Validation Report");
    let _ = writeln!(md, "**Generated:** {}", report.validation_timestamp);
    let _ = writeln!(md, "**Overall Accuracy:** {:.1}%", report.overall_accuracy_rate);
    let _ = writeln!(md, "**Overall Confidence:** {:.2}", report.overall_confidence);
    let _ = writeln!(md);

    let _ = writeln!(md, "## Summary");
    let _ = writeln!(md, "- Total Questions: {}", report.total_questions);
    let _ = writeln!(md, "- Valid Questions: {}", report.valid_questions);
    let _ = writeln!(md, "- Invalid Questions: {}", report.invalid_questions);
    let _ = writeln!(md, "- Critical Issues: {}", report.critical_issues_count);
    let _ = writeln!(md);

    if !report.recommendations.is_empty() {
        let _ = writeln!(md, "## Recommendations");
        for rec in &report.recommendations {
            let _ = writeln!(md, "- {rec}");
        }
        let _ = writeln!(md);
    }

    let _ = writeln!(md, "## Category Summaries");
    for cat in &report.category_summaries {
        let _ = writeln!(md, "### {}", cat.category_name);
        let _ = writeln!(md, "- Total: {}", cat.total_questions);
        let _ = writeln!(md, "- Valid: {}", cat.valid_questions);
        let _ = writeln!(md, "- Invalid: {}", cat.invalid_questions);
        let _ = writeln!(md, "- Average Confidence: {:.2}", cat.average_confidence);
        let _ = writeln!(md);
    }

    let _ = writeln!(md, "## Question Details");
    for result in &report.question_results {
        let status = if result.is_valid { "✓ VALID" } else { "✗ INVALID" };
        let _ = writeln!(md, "### {} - {}", result.question_id, status);
        let _ = writeln!(md, "- Confidence: {:.2}", result.confidence_score);
        if !result.issues.is_empty() {
            let _ = writeln!(md, "- Issues:");
            for issue in &result.issues {
                let _ = writeln!(
                    md,
                    "  - **{}** ({}): {}",
                    issue.severity.as_str().to_uppercase(),
                    issue.issue_type.as_str(),
                    issue.description
                );
            }
        }
        // notes 为 None 或空字符串都不输出 Notes 行
        if let Some(notes) = &result.notes {
            if !notes.is_empty() {
                let _ = writeln!(md, "- Notes: {notes}");
            }
        }
        let _ = writeln!(md);
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validation::{
        CategoryValidationSummary, IssueType, QuestionValidationResult, Severity, ValidationIssue,
    };

    fn sample_result(notes: Option<&str>) -> QuestionValidationResult {
        QuestionValidationResult {
            question_id: "Q001".to_string(),
            category_id: "cat-1".to_string(),
            is_valid: true,
            is_factually_accurate: true,
            is_answer_correct: true,
            is_explanation_accurate: true,
            are_options_valid: true,
            issues: Vec::new(),
            confidence_score: 0.95,
            notes: notes.map(|s| s.to_string()),
        }
    }

    fn sample_report() -> ValidationReport {
        ValidationReport {
            validation_timestamp: "2026-08-23T12:00:00+08:00".to_string(),
            total_questions: 1,
            valid_questions: 1,
            invalid_questions: 0,
            category_summaries: vec![CategoryValidationSummary {
                category_id: "cat-1".to_string(),
                category_name: "类别一".to_string(),
                total_questions: 1,
                valid_questions: 1,
                invalid_questions: 0,
                critical_issues: 0,
                major_issues: 0,
                minor_issues: 0,
                average_confidence: 0.95,
            }],
            question_results: vec![sample_result(None)],
            overall_accuracy_rate: 100.0,
            overall_confidence: 0.95,
            critical_issues_count: 0,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_empty_notes_emits_no_notes_line() {
        let mut report = sample_report();
        report.question_results = vec![sample_result(Some(""))];
        let md = render_markdown(&report);
        assert!(!md.contains("Notes:"));

        report.question_results = vec![sample_result(None)];
        let md = render_markdown(&report);
        assert!(!md.contains("Notes:"));
    }

    #[test]
    fn test_non_empty_notes_emits_notes_line() {
        let mut report = sample_report();
        report.question_results = vec![sample_result(Some("abc"))];
        let md = render_markdown(&report);
        assert!(md.contains("- Notes: abc\n"));
    }

    #[test]
    fn test_empty_recommendations_emits_no_block() {
        let report = sample_report();
        let md = render_markdown(&report);
        assert!(!md.contains("## Recommendations"));

        let mut report = sample_report();
        report.recommendations = vec!["第一条建议".to_string(), "第二条建议".to_string()];
        let md = render_markdown(&report);
        assert!(md.contains("## Recommendations\n- 第一条建议\n- 第二条建议\n"));
    }

    #[test]
    fn test_issue_severity_is_uppercased() {
        let mut report = sample_report();
        let mut result = sample_result(None);
        result.is_valid = false;
        result.issues = vec![ValidationIssue {
            severity: Severity::Major,
            issue_type: IssueType::AnswerMismatch,
            description: "答案与文档不符".to_string(),
            evidence: None,
            suggestion: None,
        }];
        report.question_results = vec![result];
        let md = render_markdown(&report);
        assert!(md.contains("  - **MAJOR** (answer_mismatch): 答案与文档不符\n"));
        assert!(md.contains("### Q001 - ✗ INVALID"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let report = sample_report();
        assert_eq!(render_markdown(&report), render_markdown(&report));
    }

    #[test]
    fn test_full_golden_output() {
        let mut report = sample_report();
        report.recommendations = vec!["1 question(s) require review and correction".to_string()];
        report.question_results = vec![sample_result(Some("核对过第 2 节"))];

        let expected = "\
# Question Bank Validation Report
**Generated:** 2026-08-23T12:00:00+08:00
**Overall Accuracy:** 100.0%
**Overall Confidence:** 0.95

## Summary
- Total Questions: 1
- Valid Questions: 1
- Invalid Questions: 0
- Critical Issues: 0

## Recommendations
- 1 question(s) require review and correction

## Category Summaries
### 类别一
- Total: 1
- Valid: 1
- Invalid: 0
- Average Confidence: 0.95

## Question Details
### Q001 - ✓ VALID
- Confidence: 0.95
- Notes: 核对过第 2 节

";
        assert_eq!(render_markdown(&report), expected);
    }
}

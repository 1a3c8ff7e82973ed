pub mod loaders;
pub mod question;
pub mod validation;

pub use loaders::{load_question_bank, save_question_bank};
pub use question::{Category, Question, QuestionBank};
pub use validation::{
    BatchValidationResult, CategoryValidationSummary, IssueType, QuestionValidationResult,
    Severity, ValidationIssue, ValidationReport,
};

pub mod bank_loader;

pub use bank_loader::{load_question_bank, save_question_bank};

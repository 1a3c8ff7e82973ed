pub mod gemini_client;

pub use gemini_client::{CachedContent, ContentPart, GeminiClient, GenerationOptions, UploadedFile};

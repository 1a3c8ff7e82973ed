//! 源文件收集服务 - 业务能力层
//!
//! 只负责"扫描源文档目录"能力，不关心上传流程

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ConfigError;

/// 收集目录下所有可上传的源文件
///
/// - 隐藏文件（文件名以 `.` 开头，如 `.gitkeep`）跳过并记录日志，不算错误
/// - 子目录跳过
/// - 返回按文件名排序的路径列表，保证上传顺序确定
///
/// 目录不存在或没有可上传文件属于致命配置错误
pub fn collect_source_files(files_dir: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = Path::new(files_dir);

    if !dir.is_dir() {
        return Err(ConfigError::FilesDirNotFound {
            path: files_dir.to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|_| ConfigError::FilesDirNotFound {
        path: files_dir.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') {
            info!("  跳过隐藏文件: {}", file_name);
            continue;
        }

        files.push(path);
    }

    if files.is_empty() {
        return Err(ConfigError::NoSourceFiles {
            path: files_dir.to_string(),
        });
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 为单个测试创建独立的临时目录
    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qbg_source_files_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let dir = test_dir("hidden");
        std::fs::write(dir.join("doc1.txt"), "内容一").unwrap();
        std::fs::write(dir.join("doc2.txt"), "内容二").unwrap();
        std::fs::write(dir.join(".gitkeep"), "").unwrap();

        let files = collect_source_files(dir.to_str().unwrap()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| {
            !p.file_name().unwrap().to_string_lossy().starts_with('.')
        }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_files_sorted_by_name() {
        let dir = test_dir("sorted");
        std::fs::write(dir.join("b.txt"), "b").unwrap();
        std::fs::write(dir.join("a.txt"), "a").unwrap();
        std::fs::write(dir.join("c.txt"), "c").unwrap();

        let files = collect_source_files(dir.to_str().unwrap()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_dir_is_config_error() {
        let result = collect_source_files("/definitely/not/a/real/dir");
        assert!(matches!(result, Err(ConfigError::FilesDirNotFound { .. })));
    }

    #[test]
    fn test_empty_dir_is_config_error() {
        let dir = test_dir("empty");
        let result = collect_source_files(dir.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::NoSourceFiles { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dir_with_only_hidden_files_is_config_error() {
        let dir = test_dir("only_hidden");
        std::fs::write(dir.join(".gitkeep"), "").unwrap();
        let result = collect_source_files(dir.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::NoSourceFiles { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

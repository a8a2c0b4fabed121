//! 配置文件读写：首次运行生成带注释的 `config.yml`，之后与默认值合并加载。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];

    /// 合并完成后的语义校验；默认不做任何检查。
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// 在 `base_dir`（缺省为当前目录）下加载或创建配置文件。
///
/// - 文件不存在：写出带注释的默认配置并返回默认值
/// - 文件存在：用户值覆盖默认值；缺字段时回写补全后的文件
pub fn load_or_create<T: ConfigSpec>(base_dir: Option<&Path>) -> Result<T, ConfigError> {
    let path = resolve_path::<T>(base_dir);
    ensure_parent(&path)?;

    if !path.exists() {
        let default_config = T::default();
        write_with_comments(&default_config, &path)?;
        info!(target: "startup", "created default config at {}", path.display());
        return Ok(default_config);
    }

    let raw = read(&path)?;
    let config: T = merge_with_defaults(&raw, &path)?;
    config.validate()?;

    if has_missing_fields::<T>(&raw, &path)? {
        debug!(target: "startup", "config missing fields, rewriting {}", path.display());
        write_with_comments(&config, &path)?;
    }

    Ok(config)
}

pub fn write_with_comments<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    ensure_parent(path)?;
    let yaml = generate_yaml_with_comments(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn generate_yaml_with_comments<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let value =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?;
    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut lines = Vec::new();
    for field in T::fields() {
        if !field.description.is_empty() {
            lines.push(format!("# {}", field.description.replace('\n', "\n# ")));
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let yaml_line = serde_yaml::to_string(&serde_yaml::Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        lines.push(yaml_line.trim().to_string());
    }
    lines.push(String::new());

    Ok(lines.join("\n"))
}

fn merge_with_defaults<T: ConfigSpec>(raw: &str, path: &Path) -> Result<T, ConfigError> {
    let user_yaml: Value = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    // 空文件解析为 Null：视为全部使用默认值
    if !user_yaml.is_null() {
        merge_values(&mut merged, user_yaml);
    }

    serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))
}

fn has_missing_fields<T: ConfigSpec>(raw: &str, path: &Path) -> Result<bool, ConfigError> {
    let user_yaml: Value = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Mapping(map) = user_yaml else {
        return Ok(true);
    };
    Ok(T::fields()
        .iter()
        .any(|field| !map.contains_key(Value::String(field.name.to_string()))))
}

fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, user_val) in src {
                if let Some(dest_val) = dest.get_mut(&key) {
                    merge_values(dest_val, user_val);
                } else {
                    dest.insert(key, user_val);
                }
            }
        }
        (dest, other) => {
            *dest = other;
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_path<T: ConfigSpec>(base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) => base.join(T::FILE_NAME),
        None => PathBuf::from(T::FILE_NAME),
    }
}

fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::Config;

    #[test]
    fn creates_commented_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.fallback_page_size, 24);

        let written = fs::read_to_string(dir.path().join(Config::FILE_NAME)).unwrap();
        assert!(written.contains("# "));
        assert!(written.contains("comic_api_base:"));
    }

    #[test]
    fn user_values_override_defaults_and_missing_fields_are_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Config::FILE_NAME);
        fs::write(&path, "theme: light\nfallback_page_size: 30\n").unwrap();

        let cfg: Config = load_or_create(Some(dir.path())).unwrap();
        assert_eq!(cfg.theme, "light");
        assert_eq!(cfg.fallback_page_size, 30);
        assert_eq!(cfg.history_page_limit, 20);

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("history_page_limit:"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(Config::FILE_NAME);
        fs::write(&path, "comic_api_base: ftp://nope\n").unwrap();

        let err = load_or_create::<Config>(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn broken_yaml_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(Config::FILE_NAME), "theme: [unclosed\n").unwrap();

        let err = load_or_create::<Config>(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Locate the `config/` directory of a workspace member.
///
/// Binaries may be started from the workspace root or from the crate directory,
/// so both layouts are accepted.
pub fn configuration_directory(crate_name: &str) -> Result<PathBuf, AppError> {
    let base_path = std::env::current_dir()?;

    if base_path.ends_with(crate_name) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(crate_name).join("config"))
    }
}

/// Load settings from `<dir>/base.yaml`, overridden by `APP_*` environment variables.
///
/// Nested keys use a double underscore, e.g. `APP_API__BASE_URL`.
pub fn load_settings<T: DeserializeOwned>(directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Cfg::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        server: SampleServer,
    }

    #[derive(Debug, Deserialize)]
    struct SampleServer {
        port: u16,
    }

    #[test]
    fn test_load_settings_from_yaml() {
        let dir = std::env::temp_dir().join(format!("service-core-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("base.yaml"), "server:\n  port: 8123\n").unwrap();

        let sample: Sample = load_settings(&dir).unwrap();
        assert_eq!(sample.server.port, 8123);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_base_file_is_config_error() {
        let dir = std::env::temp_dir().join(format!("service-core-none-{}", uuid::Uuid::new_v4()));
        let result: Result<Sample, _> = load_settings(&dir);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}

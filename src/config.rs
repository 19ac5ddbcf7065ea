use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::pipeline::PageLimits;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vidnest-env";
pub const DEFAULT_DB_PATH: &str = "/var/lib/vidnest/vidnest.db";
pub const DEFAULT_VIDNEST_PORT: u16 = 8080;
pub const DEFAULT_VIDNEST_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub db_path: Option<PathBuf>,
    pub vidnest_port: Option<u16>,
    pub vidnest_host: Option<String>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

/// Fully resolved settings for the backend process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub vidnest_port: u16,
    pub vidnest_host: String,
    pub page_limits: PageLimits,
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key.trim() {
                "DB_PATH" => {
                    if !value.is_empty() {
                        cfg.db_path = Some(PathBuf::from(value));
                    }
                }
                "VIDNEST_PORT" => {
                    let port: u16 = value
                        .parse()
                        .with_context(|| format!("Parsing VIDNEST_PORT from {}", path.display()))?;
                    cfg.vidnest_port = Some(port);
                }
                "VIDNEST_HOST" => {
                    if !value.is_empty() {
                        cfg.vidnest_host = Some(value.to_string());
                    }
                }
                "DEFAULT_PAGE_SIZE" => {
                    let size: u32 = value.parse().with_context(|| {
                        format!("Parsing DEFAULT_PAGE_SIZE from {}", path.display())
                    })?;
                    cfg.default_page_size = Some(size);
                }
                "MAX_PAGE_SIZE" => {
                    let size: u32 = value
                        .parse()
                        .with_context(|| format!("Parsing MAX_PAGE_SIZE from {}", path.display()))?;
                    cfg.max_page_size = Some(size);
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Reads `path` if it exists; every missing key falls back to its default.
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?.unwrap_or_default();
    let defaults = PageLimits::default();
    let page_limits = PageLimits::new(
        cfg.default_page_size.unwrap_or(defaults.default_size),
        cfg.max_page_size.unwrap_or(defaults.max_size),
    )
    .with_context(|| format!("Invalid page sizes in {}", path.display()))?;

    Ok(Settings {
        db_path: cfg
            .db_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        vidnest_port: cfg.vidnest_port.unwrap_or(DEFAULT_VIDNEST_PORT),
        vidnest_host: cfg
            .vidnest_host
            .unwrap_or_else(|| DEFAULT_VIDNEST_HOST.to_string()),
        page_limits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn read_env_config_extracts_port_and_db() {
        let cfg = make_config("# comment\nDB_PATH=\"/data/v.db\"\nVIDNEST_PORT=\"4242\"\n");
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.vidnest_port, Some(4242));
        assert_eq!(parsed.db_path, Some(PathBuf::from("/data/v.db")));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path().join("absent-env")).unwrap();
        assert_eq!(settings.vidnest_port, DEFAULT_VIDNEST_PORT);
        assert_eq!(settings.vidnest_host, DEFAULT_VIDNEST_HOST);
        assert_eq!(settings.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(settings.page_limits, PageLimits::default());
    }

    #[test]
    fn load_settings_reads_host_and_page_sizes() {
        let cfg = make_config(
            "VIDNEST_HOST=\"0.0.0.0\"\nDEFAULT_PAGE_SIZE=20\nMAX_PAGE_SIZE=\"50\"\n",
        );
        let settings = load_settings_from(cfg.path()).unwrap();
        assert_eq!(settings.vidnest_host, "0.0.0.0");
        assert_eq!(settings.page_limits.default_size, 20);
        assert_eq!(settings.page_limits.max_size, 50);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let cfg = make_config("VIDNEST_PORT=eighty\n");
        let err = read_env_config(cfg.path()).unwrap_err();
        assert!(format!("{err:#}").contains("VIDNEST_PORT"));

        let cfg = make_config("DEFAULT_PAGE_SIZE=200\nMAX_PAGE_SIZE=100\n");
        assert!(load_settings_from(cfg.path()).is_err());
    }
}

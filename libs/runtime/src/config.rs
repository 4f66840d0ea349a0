use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main application configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Shell (host) configuration.
    pub shell: ShellConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module id → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    pub home_dir: String, // will be normalized to absolute path
    pub title: String,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/shell.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            // Empty => $HOME/.ui-shell
            home_dir: String::new(),
            title: "UI Shell".to_string(),
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/ui-shell.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shell: ShellConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `shell.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            shell: ShellConfig::default(),
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // Example: UI_SHELL__SHELL__TITLE=Console maps to shell.title
            .merge(Env::prefixed("UI_SHELL__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to extract config from figment")?;

        normalize_home_dir_inplace(&mut config.shell)
            .context("Failed to resolve shell.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.shell)
                    .context("Failed to resolve shell.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

/// Serves `modules.<id>` sections to the module registry.
#[derive(Debug, Clone)]
pub struct AppConfigProvider(AppConfig);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(config)
    }
}

impl ui_modkit::ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_id: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_id)
    }
}

const DEFAULT_SUBDIR: &str = ".ui-shell";

/// Resolve the shell home directory: `~` expands to the user's home, empty means
/// `<home>/<default_subdir>`. Relative paths resolve against the current directory.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let user_home = || -> Result<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .context("neither HOME nor USERPROFILE is set")
    };

    let mut path = match configured.as_deref() {
        None => user_home()?.join(default_subdir),
        Some("~") => user_home()?,
        Some(p) => match p.strip_prefix("~/").or_else(|| p.strip_prefix("~\\")) {
            Some(rest) => user_home()?.join(rest),
            None => PathBuf::from(p),
        },
    };

    if path.is_relative() {
        path = std::env::current_dir()
            .context("cannot read current directory")?
            .join(path);
    }

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create home dir {}", path.display()))?;
    }
    Ok(path)
}

/// Normalize `shell.home_dir` and store the absolute path back.
fn normalize_home_dir_inplace(shell: &mut ShellConfig) -> Result<()> {
    let opt = if shell.home_dir.trim().is_empty() {
        None
    } else {
        Some(shell.home_dir.clone())
    };

    let resolved = resolve_home_dir(opt, DEFAULT_SUBDIR, true)
        .context("home_dir normalization failed")?;

    shell.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

/// Merge `<modules_dir>/<id>.yaml` files into the module bag; the file stem is the module id.
fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        bag.insert(id.to_string(), serde_json::to_value(val)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::fs;
    use tempfile::tempdir;
    use ui_modkit::ConfigProvider;

    fn is_normalized_path(p: &str) -> bool {
        let pb = PathBuf::from(p);
        pb.is_absolute() && !p.starts_with('~')
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.shell.title, "UI Shell");
        // raw (not yet normalized)
        assert_eq!(config.shell.home_dir, "");

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/ui-shell.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_reads_yaml_and_module_sections() {
        // Jail serializes against the tests that mutate process env.
        Jail::expect_with(|_| {
            let tmp = tempdir().unwrap();
            let cfg_path = tmp.path().join("cfg.yaml");
            let home = tmp.path().join("home");

            let yaml = format!(
                r#"
shell:
  home_dir: "{}"
  title: "Console"

logging:
  default:
    console_level: debug
    file: ""

modules:
  dashboard:
    order: 5
    name: Overview
"#,
                home.to_string_lossy().replace('\\', "/")
            );
            fs::write(&cfg_path, yaml).unwrap();

            let config = AppConfig::load_layered(&cfg_path).unwrap();

            assert!(is_normalized_path(&config.shell.home_dir));
            assert!(home.is_dir());
            assert_eq!(config.shell.title, "Console");

            let def = &config.logging.as_ref().unwrap()["default"];
            assert_eq!(def.console_level, "debug");
            assert!(def.file.is_empty());

            let provider = AppConfigProvider::new(config);
            let section = provider.get_module_config("dashboard").unwrap();
            assert_eq!(section["order"], 5);
            assert_eq!(section["name"], "Overview");
            assert!(provider.get_module_config("settings").is_none());
            Ok(())
        });
    }

    #[test]
    fn test_modules_dir_files_merge_into_bag() {
        let tmp = tempdir().unwrap();
        let mods = tmp.path().join("modules");
        fs::create_dir_all(&mods).unwrap();
        fs::write(mods.join("reports.yaml"), "order: 40\n").unwrap();
        fs::write(mods.join("notes.txt"), "ignored").unwrap();

        let mut bag = HashMap::new();
        merge_module_files(&mut bag, &mods).unwrap();

        assert_eq!(bag.len(), 1);
        assert_eq!(bag["reports"]["order"], 40);
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        Jail::expect_with(|_| {
            let tmp = tempdir().unwrap();
            let cfg_path = tmp.path().join("cfg.yaml");
            let yaml = format!(
                "shell:\n  home_dir: \"{}\"\n  title: x\nserver:\n  port: 1\n",
                tmp.path().to_string_lossy().replace('\\', "/")
            );
            fs::write(&cfg_path, yaml).unwrap();

            assert!(AppConfig::load_layered(&cfg_path).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("home");
            jail.create_file(
                "cfg.yaml",
                &format!(
                    "shell:\n  home_dir: \"{}\"\n  title: FromYaml\nmodules:\n  reports:\n    page_size: 10\n",
                    home.to_string_lossy().replace('\\', "/")
                ),
            )?;
            jail.set_env("UI_SHELL__SHELL__TITLE", "FromEnv");
            jail.set_env("UI_SHELL__MODULES__REPORTS__PAGE_SIZE", "50");

            let config = AppConfig::load_layered("cfg.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.shell.title, "FromEnv");
            assert_eq!(config.modules["reports"]["page_size"], 50);
            Ok(())
        });
    }

    #[test]
    fn test_tilde_home_dir_expands_to_home() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("user");
            fs::create_dir_all(&home).map_err(|e| e.to_string())?;
            jail.set_env("HOME", home.display());

            let bare = resolve_home_dir(Some("~".into()), DEFAULT_SUBDIR, false)
                .map_err(|e| e.to_string())?;
            assert_eq!(bare, home);

            let sub = resolve_home_dir(Some("~/sub".into()), DEFAULT_SUBDIR, true)
                .map_err(|e| e.to_string())?;
            assert_eq!(sub, home.join("sub"));
            assert!(sub.is_dir());
            Ok(())
        });
    }

    #[test]
    fn test_empty_home_dir_defaults_under_home() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("user");
            fs::create_dir_all(&home).map_err(|e| e.to_string())?;
            jail.set_env("HOME", home.display());
            jail.create_file("cfg.yaml", "shell:\n  home_dir: \"\"\n  title: t\n")?;

            let config = AppConfig::load_layered("cfg.yaml").map_err(|e| e.to_string())?;
            let expected = home.join(DEFAULT_SUBDIR);
            assert_eq!(PathBuf::from(&config.shell.home_dir), expected);
            assert!(expected.is_dir());

            let defaults = AppConfig::load_or_default(None::<&str>).map_err(|e| e.to_string())?;
            assert_eq!(PathBuf::from(&defaults.shell.home_dir), expected);
            Ok(())
        });
    }

    #[test]
    fn test_resolve_home_dir_keeps_absolute_path() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("a").join("b");
        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), DEFAULT_SUBDIR, true)
                .unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_cli_verbosity_overrides_console_level() {
        let mut config = AppConfig {
            logging: None,
            ..AppConfig::default()
        };
        config.apply_cli_overrides(&CliArgs {
            verbose: 2,
            ..CliArgs::default()
        });
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "trace");
    }

    #[test]
    fn test_to_yaml_round_trips_title() {
        let mut config = AppConfig::default();
        config.shell.title = "Round".into();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("title: Round"));
    }
}

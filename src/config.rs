use crate::swagger::dependency::AnalyzerOptions;
use log::error;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".apiscenario";

#[derive(PartialEq, Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub settings: Settings,
    pub analyzer: Analyzer,
}

#[derive(PartialEq, Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub continue_on_failure: bool,
    pub output_directory: Option<String>,
}

#[derive(PartialEq, Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Analyzer {
    pub swagger_file_paths: Vec<String>,
    pub no_external_dependency_resource_type: bool,
    pub filer_top_level_resource_type: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct File {
    pub settings: Option<FileSettings>,
    pub analyzer: Option<FileAnalyzer>,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct FileSettings {
    pub continue_on_failure: Option<bool>,
    pub output_directory: Option<String>,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct FileAnalyzer {
    pub swagger_file_paths: Option<Vec<String>>,
    pub no_external_dependency_resource_type: Option<bool>,
    pub filer_top_level_resource_type: Option<bool>,
}

impl Config {
    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            no_external_dependency_resource_type: self.analyzer.no_external_dependency_resource_type,
            filer_top_level_resource_type: self.analyzer.filer_top_level_resource_type,
        }
    }

    pub fn swagger_file_paths(&self) -> Vec<PathBuf> {
        self.analyzer
            .swagger_file_paths
            .iter()
            .map(PathBuf::from)
            .collect()
    }
}

pub async fn get_config(file: Option<String>) -> Config {
    let config_sources_ascending_priority = vec![
        load_home_file().await,
        load_config_file(file.unwrap_or(CONFIG_FILE_NAME.to_string()).as_str()).await,
        Some(load_config_from_environment_variables_as_file()),
    ];

    get_config_impl(config_sources_ascending_priority)
}

fn get_config_impl(config_sources_ascending_priority: Vec<Option<File>>) -> Config {
    let specified_config = config_sources_ascending_priority
        .into_iter()
        .fold(None, combine_config_files);
    apply_config_file(Config::default(), specified_config)
}

async fn load_config_file(file: &str) -> Option<File> {
    if !Path::new(file).is_file() {
        return None;
    }

    match tokio::fs::read_to_string(file).await {
        Ok(data) => match toml::from_str::<File>(&data) {
            Ok(config) => Some(config),
            Err(e) => {
                error!("unable to load config file ({}): {}", file, e);
                None
            }
        },
        Err(e) => {
            error!("unable to load config file ({}): {}", file, e);
            None
        }
    }
}

async fn load_home_file() -> Option<File> {
    let cfg_file = dirs::home_dir().map(|pb| pb.join(CONFIG_FILE_NAME));
    load_config_file(cfg_file?.as_path().to_str()?).await
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| v.parse::<bool>().ok())
}

fn load_config_from_environment_variables_as_file() -> File {
    let swagger_file_paths = env::var_os("APISCENARIO_SWAGGER_FILE_PATHS").map(|paths| {
        env::split_paths(&paths)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    });

    File {
        settings: Some(FileSettings {
            continue_on_failure: env_bool("APISCENARIO_CONTINUE_ON_FAILURE"),
            output_directory: env::var("APISCENARIO_OUTPUT_DIRECTORY").ok(),
        }),
        analyzer: Some(FileAnalyzer {
            swagger_file_paths,
            no_external_dependency_resource_type: env_bool("APISCENARIO_NO_EXTERNAL_DEPENDENCY_RESOURCE_TYPE"),
            filer_top_level_resource_type: env_bool("APISCENARIO_FILER_TOP_LEVEL_RESOURCE_TYPE"),
        }),
    }
}

fn apply_config_file(config: Config, file_opt: Option<File>) -> Config {
    let Some(file) = file_opt else {
        return config;
    };

    let settings = match file.settings {
        Some(settings) => Settings {
            continue_on_failure: settings
                .continue_on_failure
                .unwrap_or(config.settings.continue_on_failure),
            output_directory: settings.output_directory.or(config.settings.output_directory),
        },
        None => config.settings,
    };

    let analyzer = match file.analyzer {
        Some(analyzer) => Analyzer {
            swagger_file_paths: analyzer
                .swagger_file_paths
                .unwrap_or(config.analyzer.swagger_file_paths),
            no_external_dependency_resource_type: analyzer
                .no_external_dependency_resource_type
                .unwrap_or(config.analyzer.no_external_dependency_resource_type),
            filer_top_level_resource_type: analyzer
                .filer_top_level_resource_type
                .unwrap_or(config.analyzer.filer_top_level_resource_type),
        },
        None => config.analyzer,
    };

    Config { settings, analyzer }
}

//rhs priority
fn combine_config_files(lhs: Option<File>, rhs: Option<File>) -> Option<File> {
    match (lhs, rhs) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(x)) => Some(x),
        (Some(existing_file), Some(file_to_apply)) => {
            let settings = match (existing_file.settings, file_to_apply.settings) {
                (Some(existing), Some(applied)) => Some(FileSettings {
                    continue_on_failure: applied.continue_on_failure.or(existing.continue_on_failure),
                    output_directory: applied.output_directory.or(existing.output_directory),
                }),
                (existing, applied) => applied.or(existing),
            };

            let analyzer = match (existing_file.analyzer, file_to_apply.analyzer) {
                (Some(existing), Some(applied)) => Some(FileAnalyzer {
                    swagger_file_paths: applied.swagger_file_paths.or(existing.swagger_file_paths),
                    no_external_dependency_resource_type: applied
                        .no_external_dependency_resource_type
                        .or(existing.no_external_dependency_resource_type),
                    filer_top_level_resource_type: applied
                        .filer_top_level_resource_type
                        .or(existing.filer_top_level_resource_type),
                }),
                (existing, applied) => applied.or(existing),
            };

            Some(File { settings, analyzer })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn no_overrides_yields_default_config() {
        let sources: Vec<Option<File>> = vec![None, None];
        let actual = get_config_impl(sources);
        assert_eq!(Config::default(), actual);
    }

    #[tokio::test]
    async fn one_override_yields_correct_combination() {
        let tmp_dir = tempdir().unwrap();
        let override_file_path = tmp_dir.path().join("foo.apiscenario");
        std::fs::write(
            &override_file_path,
            r#"
            [settings]
            continueOnFailure=true

            [analyzer]
            swaggerFilePaths=["specs/mesh.json"]
            "#,
        )
        .unwrap();

        let sources: Vec<Option<File>> =
            vec![load_config_file(override_file_path.to_str().unwrap()).await, None];
        let actual = get_config_impl(sources);
        assert_eq!(
            Config {
                settings: Settings {
                    continue_on_failure: true,
                    output_directory: None,
                },
                analyzer: Analyzer {
                    swagger_file_paths: vec!["specs/mesh.json".to_string()],
                    no_external_dependency_resource_type: false,
                    filer_top_level_resource_type: false,
                },
            },
            actual
        );
    }

    #[tokio::test]
    async fn two_overrides_yields_correct_combination() {
        let tmp_dir = tempdir().unwrap();
        let first = tmp_dir.path().join("foo.apiscenario");
        let second = tmp_dir.path().join("foo2.apiscenario");

        std::fs::write(
            &first,
            r#"
            [settings]
            continueOnFailure=true
            outputDirectory="out"

            [analyzer]
            swaggerFilePaths=["a.json"]
            noExternalDependencyResourceType=true
            "#,
        )
        .unwrap();
        std::fs::write(
            &second,
            r#"
            [settings]
            continueOnFailure=false

            [analyzer]
            swaggerFilePaths=["b.json", "c.json"]
            filerTopLevelResourceType=true
            "#,
        )
        .unwrap();

        let sources: Vec<Option<File>> = vec![
            load_config_file(first.to_str().unwrap()).await,
            load_config_file(second.to_str().unwrap()).await,
        ];
        let actual = get_config_impl(sources);
        assert_eq!(
            Config {
                settings: Settings {
                    continue_on_failure: false,
                    output_directory: Some("out".to_string()),
                },
                analyzer: Analyzer {
                    swagger_file_paths: vec!["b.json".to_string(), "c.json".to_string()],
                    no_external_dependency_resource_type: true,
                    filer_top_level_resource_type: true,
                },
            },
            actual
        );
        assert_eq!(
            AnalyzerOptions {
                no_external_dependency_resource_type: true,
                filer_top_level_resource_type: true,
            },
            actual.analyzer_options()
        );
    }

    #[tokio::test]
    async fn malformed_file_is_skipped() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("bad.apiscenario");
        std::fs::write(&path, "[settings\ncontinueOnFailure=").unwrap();

        assert!(load_config_file(path.to_str().unwrap()).await.is_none());
        assert!(load_config_file("/definitely/not/here").await.is_none());
    }
} // mod tests

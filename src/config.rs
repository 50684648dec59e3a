use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use ini::{Ini, ParseOption};

use crate::error::CbioError;

pub const CONFIG_ENV: &str = "CBIO_CONFIG";
pub const DEFAULT_DB_PORT: u16 = 3306;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub importer: ImporterConfig,
    pub java_file: JavaConfig,
    pub reference_genome: ReferenceGenomeConfig,
    pub cbioportal_db: DatabaseConfig,
}

#[derive(Debug, Clone, Default)]
pub struct ImporterConfig {
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct JavaConfig {
    pub jar_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ReferenceGenomeConfig {
    pub species: String,
    pub ncbi_build: String,
    pub ucsc_build: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatabaseEngine {
    #[default]
    MySql,
    Sqlite,
}

impl FromStr for DatabaseEngine {
    type Err = CbioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mysql" => Ok(DatabaseEngine::MySql),
            "sqlite" => Ok(DatabaseEngine::Sqlite),
            other => Err(CbioError::ConfigParse(format!(
                "cbioportal_db.engine must be mysql or sqlite, found {other:?}"
            ))),
        }
    }
}

/// Connection settings of the portal database.
///
/// With the default MySQL engine `name` is the schema on `host:port`; with
/// the SQLite engine it is the database file.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub engine: DatabaseEngine,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("engine", &self.engine)
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::MySql,
            username: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: DEFAULT_DB_PORT,
            name: "cbioportal".to_string(),
        }
    }
}

impl Default for ReferenceGenomeConfig {
    fn default() -> Self {
        Self {
            species: "human".to_string(),
            ncbi_build: "GRCh37".to_string(),
            ucsc_build: "hg19".to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves the config path from an explicit argument, then
    /// `$CBIO_CONFIG`, then the per-user config directory.
    pub fn resolve(path: Option<&Path>) -> Result<Config, CbioError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(value) if !value.is_empty() => PathBuf::from(value),
                _ => default_config_path().ok_or(CbioError::MissingConfig)?,
            },
        };

        if !config_path.exists() {
            return Err(if path.is_none() {
                CbioError::MissingConfig
            } else {
                CbioError::ConfigRead(config_path)
            });
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CbioError::ConfigRead(config_path.clone()))?;
        let mut config = Self::parse(&content)?;
        config.resolve_relative_to(config_path.parent().unwrap_or(Path::new(".")));
        Ok(config)
    }

    /// Parses the INI config. Values are taken verbatim: no quoting and no
    /// escapes, except that `'` is removed from `importer.log_file`.
    pub fn parse(content: &str) -> Result<Config, CbioError> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)
            .map_err(|err| CbioError::ConfigParse(err.to_string()))?;
        let value = |section: &str, key: &str| {
            ini.get_from(Some(section), key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        if ini.section(Some("cbioportal_db")).is_none() {
            return Err(CbioError::ConfigParse(
                "missing [cbioportal_db] section".to_string(),
            ));
        }
        let defaults = DatabaseConfig::default();
        let cbioportal_db = DatabaseConfig {
            engine: value("cbioportal_db", "engine")
                .map(|engine| engine.parse())
                .transpose()?
                .unwrap_or_default(),
            username: value("cbioportal_db", "username").unwrap_or_default(),
            password: value("cbioportal_db", "password").unwrap_or_default(),
            host: value("cbioportal_db", "host").unwrap_or(defaults.host),
            port: value("cbioportal_db", "port")
                .map(|port| {
                    port.parse().map_err(|_| {
                        CbioError::ConfigParse(format!("cbioportal_db.port is not a port: {port}"))
                    })
                })
                .transpose()?
                .unwrap_or(DEFAULT_DB_PORT),
            name: value("cbioportal_db", "name").ok_or_else(|| {
                CbioError::ConfigParse("cbioportal_db.name is required".to_string())
            })?,
        };

        let genome_defaults = ReferenceGenomeConfig::default();
        Ok(Config {
            importer: ImporterConfig {
                log_file: value("importer", "log_file")
                    .map(|path| path.replace('\'', ""))
                    .filter(|path| !path.is_empty())
                    .map(PathBuf::from),
            },
            java_file: JavaConfig {
                jar_path: value("java_file", "jar_path").map(PathBuf::from),
            },
            reference_genome: ReferenceGenomeConfig {
                species: value("reference_genome", "species").unwrap_or(genome_defaults.species),
                ncbi_build: value("reference_genome", "ncbi_build")
                    .unwrap_or(genome_defaults.ncbi_build),
                ucsc_build: value("reference_genome", "ucsc_build")
                    .unwrap_or(genome_defaults.ucsc_build),
            },
            cbioportal_db,
        })
    }
}

impl Config {
    /// Jar path, log file and a SQLite database file are relative to the
    /// directory of the config file when not absolute.
    fn resolve_relative_to(&mut self, base: &Path) {
        let db_path = Path::new(&self.cbioportal_db.name);
        if self.cbioportal_db.engine == DatabaseEngine::Sqlite
            && self.cbioportal_db.name != ":memory:"
            && db_path.is_relative()
        {
            self.cbioportal_db.name = base.join(db_path).to_string_lossy().into_owned();
        }
        if let Some(jar) = self.java_file.jar_path.as_mut() {
            if jar.is_relative() {
                *jar = base.join(&*jar);
            }
        }
        if let Some(log_file) = self.importer.log_file.as_mut() {
            if log_file.is_relative() {
                *log_file = base.join(&*log_file);
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "cbioportal", "cbio-importer")
        .map(|dirs| dirs.config_dir().join("config.ini"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PORTAL_CONFIG: &str = "\
[importer]
log_file = '/var/log/cbio-importer.log'

[java_file]
jar_path = /opt/cbioportal/scripts/target/scripts.jar

[reference_genome]
species = mouse
ncbi_build = GRCm38
ucsc_build = mm10

[cbioportal_db]
username = cbio
password = s3cr=t
host = db.example.org
name = cbioportal
";

    #[test]
    fn parse_portal_ini() {
        let config = ConfigLoader::parse(PORTAL_CONFIG).unwrap();

        assert_eq!(
            config.importer.log_file.as_deref(),
            Some(Path::new("/var/log/cbio-importer.log"))
        );
        assert_eq!(
            config.java_file.jar_path.as_deref(),
            Some(Path::new("/opt/cbioportal/scripts/target/scripts.jar"))
        );
        assert_eq!(config.reference_genome.ucsc_build, "mm10");
        assert_eq!(config.cbioportal_db.engine, DatabaseEngine::MySql);
        assert_eq!(config.cbioportal_db.username, "cbio");
        assert_eq!(config.cbioportal_db.password, "s3cr=t");
        assert_eq!(config.cbioportal_db.host, "db.example.org");
        assert_eq!(config.cbioportal_db.port, 3306);
        assert_eq!(config.cbioportal_db.name, "cbioportal");
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = ConfigLoader::parse("[cbioportal_db]\nname = cbioportal\n").unwrap();
        assert_eq!(config.reference_genome.ucsc_build, "hg19");
        assert_eq!(config.reference_genome.ncbi_build, "GRCh37");
        assert_eq!(config.cbioportal_db.host, "localhost");
        assert!(config.importer.log_file.is_none());
        assert!(config.java_file.jar_path.is_none());
    }

    #[test]
    fn engine_and_port_are_checked() {
        let config =
            ConfigLoader::parse("[cbioportal_db]\nengine = sqlite\nname = portal.db\nport = 3307\n")
                .unwrap();
        assert_eq!(config.cbioportal_db.engine, DatabaseEngine::Sqlite);
        assert_eq!(config.cbioportal_db.port, 3307);

        assert_matches!(
            ConfigLoader::parse("[cbioportal_db]\nengine = oracle\nname = x\n"),
            Err(CbioError::ConfigParse(_))
        );
        assert_matches!(
            ConfigLoader::parse("[cbioportal_db]\nname = x\nport = high\n"),
            Err(CbioError::ConfigParse(_))
        );
    }

    #[test]
    fn password_is_not_printed() {
        let config =
            ConfigLoader::parse("[cbioportal_db]\nname = cbioportal\npassword = hunter2\n")
                .unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

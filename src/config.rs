use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use tabwright::ConvertError;

/// Local settings of the CLI, kept in `$HOME/.tabwright/config.json`.
///
/// `tab` and `midi` write into `output_folder` when no `--output` is given,
/// falling back to the working directory when it is unset.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    output_folder: Option<PathBuf>,
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".tabwright";

    pub fn get_output_folder(&self) -> Option<PathBuf> {
        self.output_folder.clone()
    }

    /// Where a file named `file_name` is written when no explicit output is given.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_folder
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(file_name)
    }

    /// Persists the folder right away, as set by the `config` subcommand.
    pub fn set_output_folder(
        &mut self,
        new_output_folder: Option<PathBuf>,
    ) -> Result<(), ConvertError> {
        if self.output_folder == new_output_folder {
            // no op
            Ok(())
        } else {
            self.output_folder = new_output_folder;
            self.save_config()
        }
    }

    fn get_base_path() -> Result<PathBuf, ConvertError> {
        let home = home_dir()
            .ok_or_else(|| ConvertError::Config("Could not find home directory".to_string()))?;
        Ok(home.join(Self::FOLDER))
    }

    fn get_path() -> Result<PathBuf, ConvertError> {
        let base = Self::get_base_path()?;
        Ok(base.join("config.json"))
    }

    /// Loads the settings, creating an empty config file on first use.
    pub fn read_config() -> Result<Self, ConvertError> {
        let base_path = Self::get_base_path()?;
        if !base_path.exists() {
            create_dir_all(base_path)?;
        }
        let config_path = Self::get_path()?;
        if !config_path.exists() {
            // create empty config
            Self::default().save_config()?;
        }
        Self::read_from(&config_path)
    }

    fn read_from(config_path: &Path) -> Result<Self, ConvertError> {
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|err| {
            ConvertError::Config(format!("Could not read local configuration {err:}"))
        })
    }

    /// Assumes the config folder exists
    pub fn save_config(&self) -> Result<(), ConvertError> {
        self.save_to(&Self::get_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<(), ConvertError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            ConvertError::Config(format!("Could not save local configuration {err:}"))
        })?;
        let mut file = File::create(config_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_defaults_to_current_directory() {
        let config = Config::default();
        assert_eq!(config.output_path("song.gp5"), PathBuf::from("./song.gp5"));
        let config = Config {
            output_folder: Some(PathBuf::from("/tmp/tabs")),
        };
        assert_eq!(config.output_path("song.gp5"), PathBuf::from("/tmp/tabs/song.gp5"));
    }

    #[test]
    fn config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("tabwright-config-{}.json", std::process::id()));
        let config = Config {
            output_folder: Some(PathBuf::from("/tmp/out")),
        };
        config.save_to(&path).unwrap();
        let read = Config::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, config);
        assert_eq!(read.get_output_folder(), Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn unreadable_config_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("tabwright-broken-{}.json", std::process::id()));
        std::fs::write(&path, b"{ not json").unwrap();
        let err = Config::read_from(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConvertError::Config(_)));
    }
}

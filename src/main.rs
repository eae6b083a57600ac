use crate::AppError::ConfigError;
use clap::{Parser, Subcommand};
use config::Config;
use std::io;
use std::path::{Path, PathBuf};
use tabwright::{
    generate_sequence, song_from_json, validate_tablature, write_tablature, ConvertError,
    Gp5Writer, SongWriter,
};

mod config;

const SEQUENCE_FILE_NAME: &str = "sequence.mid";

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("tabwright=info"))
        .init();

    let args = CliArgs::parse();
    match args.command {
        Command::Tab { input, output } => {
            let json = read_input(&input)?;
            let song = song_from_json(&json)?;
            let bytes = Gp5Writer.write_song(&song)?;
            let output = match output {
                Some(output) => output,
                None => Config::read_config()?.output_path(&tab_file_name(&song.title)),
            };
            write_output(&output, &bytes)?;
        }
        Command::Midi { input, output } => {
            let json = read_input(&input)?;
            let bytes = generate_sequence(&json)?;
            let output = match output {
                Some(output) => output,
                None => Config::read_config()?.output_path(SEQUENCE_FILE_NAME),
            };
            write_output(&output, &bytes)?;
        }
        Command::Validate { fixture } => {
            let json = read_input(&fixture)?;
            let bytes = write_tablature(&json)?;
            let song = validate_tablature(&bytes)?;
            log::info!(
                "'{}' read back with {} tracks at {} BPM",
                song.title,
                song.tracks.len(),
                song.tempo
            );
            println!("GP5 validation succeeded.");
        }
        Command::Config { output_folder } => {
            if !output_folder.is_dir() {
                let err = ConfigError(format!("Output folder not found {output_folder:?}"));
                return Err(err);
            }
            let mut config = Config::read_config()?;
            config.set_output_folder(Some(output_folder))?;
            log::info!("Output folder set to {:?}", config.get_output_folder());
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>, AppError> {
    if !path.exists() {
        return Err(AppError::InputError(format!("Input file not found {path:?}")));
    }
    log::info!("Reading {path:?}");
    Ok(std::fs::read(path)?)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, bytes)?;
    log::info!("Wrote {} bytes to {path:?}", bytes.len());
    Ok(())
}

/// File name derived from the song title, unsafe characters replaced.
fn tab_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "untitled.gp5".to_string()
    } else {
        format!("{stem}.gp5")
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a JSON song into a Guitar Pro 5 file.
    Tab {
        input: PathBuf,
        /// Output file, defaults to `<title>.gp5` in the configured output folder.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate a MIDI sequence from a JSON request.
    Midi {
        input: PathBuf,
        /// Output file, defaults to `sequence.mid` in the configured output folder.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Convert a JSON fixture and check the GP5 bytes read back.
    Validate { fixture: PathBuf },
    /// Persist local settings.
    Config {
        #[arg(long)]
        output_folder: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InputError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<ConvertError> for AppError {
    fn from(error: ConvertError) -> Self {
        match error {
            ConvertError::InputValidation(s) => Self::InputError(s),
            ConvertError::Parsing(s) => Self::ParsingError(s),
            ConvertError::Config(s) => Self::ConfigError(s),
            ConvertError::Serialization(s) | ConvertError::Io(s) => Self::OtherError(s),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

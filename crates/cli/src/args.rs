use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "hedra_batch")]
#[command(
    about = "Generate one talking-head video per audio clip from a single character image",
    long_about = None
)]
pub struct Cli {
    /// Folder with exactly one character image and one or more audio clips
    #[arg(long = "input_folder", alias = "input-folder", value_name = "PATH")]
    pub input_folder: PathBuf,

    /// Text prompt sent with every clip
    #[arg(long)]
    pub prompt: String,

    /// Where videos and the run log are written (default: the input folder)
    #[arg(long = "output_folder", alias = "output-folder", value_name = "PATH")]
    pub output_folder: Option<PathBuf>,

    /// API key for the generation service
    #[arg(
        long = "api_key",
        alias = "api-key",
        env = "HEDRA_API_KEY",
        hide_env_values = true
    )]
    pub api_key: Option<String>,

    /// Optional TOML configuration file
    #[arg(long, env = "HEDRA_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the batch report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn output_folder(&self) -> PathBuf {
        self.output_folder
            .clone()
            .unwrap_or_else(|| self.input_folder.clone())
    }
}

// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines per-platform subcommands and global flags

use crate::{assets::AssetPlatform, rednote::DetailSourceKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "marksort")]
#[command(about = "Export saved notes and favourites from rednote and bilibili", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn parse_cap(s: &str) -> Result<usize, String> {
    let cap: usize = s.parse().map_err(|_| format!("Invalid count: {}", s))?;
    if cap == 0 {
        return Err("count must be > 0".into());
    }
    Ok(cap)
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// rednote saved notes
    Rednote {
        #[command(subcommand)]
        command: RednoteCommand,
    },

    /// bilibili favourite folders
    Bilibili {
        #[command(subcommand)]
        command: BilibiliCommand,
    },

    /// Download cover and avatar images referenced by an export file
    Download {
        /// Export file produced by one of the export commands
        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_enum)]
        platform: AssetPlatform,

        /// Directory the images are written into
        #[arg(long)]
        dir: PathBuf,

        /// Keep files that are already present
        #[arg(long)]
        skip_existing: bool,

        /// Also fetch every image and video of each note's detail (rednote)
        #[arg(long)]
        detail_media: bool,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RednoteCommand {
    /// Export saved notes with their details to a JSON file
    Export {
        #[arg(long)]
        output: PathBuf,

        /// Account whose saved notes are listed (overrides config)
        #[arg(long)]
        user_id: Option<String>,

        /// Start from this cursor instead of the resume file
        #[arg(long)]
        cursor: Option<String>,

        /// Stop after this many notes
        #[arg(long, value_parser = parse_cap)]
        max_notes: Option<usize>,

        #[arg(long)]
        cursor_file: Option<PathBuf>,

        #[arg(long, value_enum)]
        detail_source: Option<DetailSourceKind>,

        /// Raw Cookie header (overrides config/env)
        #[arg(long)]
        cookie: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BilibiliCommand {
    /// List the favourite folders of an account
    Folders {
        #[arg(long)]
        up_mid: Option<String>,

        #[arg(long)]
        cookie: Option<String>,
    },

    /// Export one favourite folder with video details to a JSON file
    Export {
        #[arg(long)]
        media_id: i64,

        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        cursor: Option<String>,

        #[arg(long, value_parser = parse_cap)]
        max_items: Option<usize>,

        #[arg(long)]
        cursor_file: Option<PathBuf>,

        #[arg(long)]
        cookie: Option<String>,
    },

    /// Export every favourite folder into its own file
    ExportAll {
        #[arg(long)]
        output_dir: PathBuf,

        #[arg(long)]
        up_mid: Option<String>,

        /// Per-folder item cap
        #[arg(long, value_parser = parse_cap)]
        max_items: Option<usize>,

        #[arg(long)]
        cookie: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print an example config file
    Example,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cap_valid() {
        assert_eq!(parse_cap("25").unwrap(), 25);
    }

    #[test]
    fn test_parse_cap_invalid() {
        assert!(parse_cap("0").is_err());
        assert!(parse_cap("-3").is_err());
        assert!(parse_cap("many").is_err());
    }

    #[test]
    fn test_rednote_export_args() {
        let cli = Cli::try_parse_from([
            "marksort",
            "-v",
            "rednote",
            "export",
            "--output",
            "notes.json",
            "--max-notes",
            "25",
            "--detail-source",
            "explore-page",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Rednote {
                command:
                    RednoteCommand::Export {
                        output,
                        max_notes,
                        detail_source,
                        cursor,
                        ..
                    },
            } => {
                assert_eq!(output, PathBuf::from("notes.json"));
                assert_eq!(max_notes, Some(25));
                assert_eq!(detail_source, Some(DetailSourceKind::ExplorePage));
                assert!(cursor.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bilibili_export_requires_media_id() {
        assert!(Cli::try_parse_from(["marksort", "bilibili", "export", "--output", "f.json"]).is_err());
        let cli = Cli::try_parse_from([
            "marksort", "bilibili", "export", "--media-id", "77", "--output", "f.json",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Bilibili {
                command: BilibiliCommand::Export { media_id: 77, .. }
            }
        ));
    }

    #[test]
    fn test_download_args_and_global_config() {
        let cli = Cli::try_parse_from([
            "marksort", "download", "--input", "notes.json", "--platform", "rednote", "--dir",
            "img", "--skip-existing", "--config", "my.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.yaml")));
        match cli.command {
            Commands::Download {
                platform,
                skip_existing,
                detail_media,
                ..
            } => {
                assert_eq!(platform, AssetPlatform::Rednote);
                assert!(skip_existing);
                assert!(!detail_media);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

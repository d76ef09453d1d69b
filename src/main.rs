// ABOUTME: CLI entrypoint for marksort command
// ABOUTME: Handles logging setup, error exit codes, and command dispatch

use clap::Parser;
use marksort::{
    assets::{collect_urls, AssetDownloader},
    auth::{
        platform_cookies, BILIBILI_COOKIE_ENV, BILIBILI_REQUIRED_COOKIES, REDNOTE_COOKIE_ENV,
        REDNOTE_REQUIRED_COOKIES,
    },
    bilibili::BilibiliClient,
    cli::{BilibiliCommand, Cli, Commands, ConfigCommand, RednoteCommand},
    config::{self, Config},
    export::progress_bar,
    rednote::{detail_source, sign::build_signer, RedNoteClient},
    run_export, storage,
    util::{folder_cursor_name, folder_export_name},
    Cursor, Error, ExportReport, ExportRequest, ResumeStore, Result,
};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("marksort: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "marksort=debug" } else { "marksort=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Config {
        command: ConfigCommand::Example,
    } = cli.command
    {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Rednote {
            command:
                RednoteCommand::Export {
                    output,
                    user_id,
                    cursor,
                    max_notes,
                    cursor_file,
                    detail_source: source,
                    cookie,
                },
        } => {
            let cookies = platform_cookies(
                cookie.as_deref(),
                &cfg.rednote.cookies,
                REDNOTE_COOKIE_ENV,
                REDNOTE_REQUIRED_COOKIES,
                "rednote",
            )?;
            let user_id = user_id.unwrap_or_else(|| cfg.rednote.user_id.clone());
            if user_id.trim().is_empty() {
                return Err(Error::Config(
                    "rednote.user_id is not set (use --user-id)".into(),
                ));
            }

            let client = RedNoteClient::new(cookies, user_id, cfg.export.timeout())?
                .with_api_base(&cfg.rednote.api_base)
                .with_web_base(&cfg.rednote.web_base)
                .with_signer(build_signer(cfg.rednote.signer.as_ref())?)
                .with_detail_source(detail_source(
                    source.unwrap_or(cfg.rednote.detail_source),
                ));

            let store =
                ResumeStore::new(cursor_file.unwrap_or_else(|| cfg.export.cursor_file.clone()));
            let request = ExportRequest {
                output,
                cursor: cursor.map(Cursor::new),
                max_items: max_notes,
                batch_size: cfg.export.batch_size,
            };
            let report = run_export(&client, &store, &request, &progress_bar(max_notes))?;
            print_report(&report, &request.output);
        }
        Commands::Bilibili { command } => run_bilibili(command, &cfg)?,
        Commands::Download {
            input,
            platform,
            dir,
            skip_existing,
            detail_media,
        } => {
            let items: Vec<Value> = storage::read_json(&input)?;
            let urls = collect_urls(&items, platform, detail_media);
            info!(items = items.len(), assets = urls.len(), "downloading assets");

            let report = AssetDownloader::new(platform, cfg.export.timeout())?
                .skip_existing(skip_existing)
                .download_all(&urls, &dir)?;
            println!(
                "Downloaded {} files into {} ({} skipped, {} failed)",
                report.downloaded,
                dir.display(),
                report.skipped,
                report.failed
            );
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_bilibili(command: BilibiliCommand, cfg: &Config) -> Result<()> {
    let client = |cookie: Option<String>| -> Result<BilibiliClient> {
        let cookies = platform_cookies(
            cookie.as_deref(),
            &cfg.bilibili.cookies,
            BILIBILI_COOKIE_ENV,
            BILIBILI_REQUIRED_COOKIES,
            "bilibili",
        )?;
        Ok(BilibiliClient::new(&cookies, cfg.export.timeout())?
            .with_api_base(&cfg.bilibili.api_base)
            .with_web_location(&cfg.bilibili.web_location))
    };
    let up_mid = |flag: Option<String>| -> Result<String> {
        let up_mid = flag.unwrap_or_else(|| cfg.bilibili.up_mid.clone());
        if up_mid.trim().is_empty() {
            return Err(Error::Config(
                "bilibili.up_mid is not set (use --up-mid)".into(),
            ));
        }
        Ok(up_mid)
    };

    match command {
        BilibiliCommand::Folders {
            up_mid: flag,
            cookie,
        } => {
            let folders = client(cookie)?.favourite_folders(&up_mid(flag)?)?;
            for folder in &folders {
                println!("{}\t{}\t{}", folder.id, folder.media_count, folder.title);
            }
        }
        BilibiliCommand::Export {
            media_id,
            output,
            cursor,
            max_items,
            cursor_file,
            cookie,
        } => {
            let client = client(cookie)?;
            let store =
                ResumeStore::new(cursor_file.unwrap_or_else(|| cfg.export.cursor_file.clone()));
            let request = ExportRequest {
                output,
                cursor: cursor.map(Cursor::new),
                max_items,
                batch_size: cfg.export.batch_size,
            };
            let report = run_export(
                &client.folder(media_id),
                &store,
                &request,
                &progress_bar(max_items),
            )?;
            print_report(&report, &request.output);
        }
        BilibiliCommand::ExportAll {
            output_dir,
            up_mid: flag,
            max_items,
            cookie,
        } => {
            let client = client(cookie)?;
            let folders = client.favourite_folders(&up_mid(flag)?)?;
            fs::create_dir_all(&output_dir)?;

            let mut first_error = None;
            for folder in &folders {
                println!("Folder {}: {}", folder.id, folder.title);
                let store = ResumeStore::new(output_dir.join(folder_cursor_name(folder.id)));
                let mut request =
                    ExportRequest::new(output_dir.join(folder_export_name(folder.id, &folder.title)));
                request.max_items = max_items;
                request.batch_size = cfg.export.batch_size;

                match run_export(
                    &client.folder(folder.id),
                    &store,
                    &request,
                    &progress_bar(max_items),
                ) {
                    Ok(report) => print_report(&report, &request.output),
                    Err(e) => {
                        error!(folder = folder.id, error = %e, "folder export failed");
                        first_error.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = first_error {
                return Err(e);
            }
        }
    }

    Ok(())
}

fn print_report(report: &ExportReport, output: &Path) {
    println!(
        "Exported {} items to {} ({} without detail) in {:.1}s",
        report.items,
        output.display(),
        report.degraded,
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );
    match &report.persisted_cursor {
        Some(cursor) => println!("More remain; resume cursor saved: {}", cursor),
        None if report.resume_lost() => {
            println!("More remain but the resume point is unknown; cursor file left unchanged")
        }
        None => println!("Collection fully exported"),
    }
}

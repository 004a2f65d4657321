use clap::{Parser, Subcommand};
use series_downloader::{
    DownloadOptions, DownloadReport, EpisodeCatalog, EpisodeDownloader, ExtractionMethod,
    JsonStore, ProgressEvent, SeriesConfig, SeriesDownloaderError, SkipReason, ValidationReport,
    YtDlpDownloader, YtDlpPlaylistProvider, count_existing_media, default_playlists_path,
    download_series, execute_renames, extract_season_subtitles, fetch_playlists, find_config,
    list_available_configs, plan_standardization, resolve_config_dir, save_playlists,
    validate_downloads, verify_subtitle_dir,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const RULE: &str = "============================================================";

#[derive(Debug, Parser)]
#[command(
    name = "series-downloader",
    version,
    about = "Download and organize children's series from YouTube"
)]
struct Cli {
    /// Directory holding the series configs
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download all episodes that are not on disk yet
    Download {
        /// Series config name
        series: String,

        #[arg(long, default_value = "downloads")]
        download_dir: PathBuf,

        /// Playlists file (defaults to the platform data directory)
        #[arg(long)]
        playlists: Option<PathBuf>,

        /// yt-dlp download archive (defaults to <download-dir>/<series>_downloaded.txt)
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Only show what would be downloaded
        #[arg(long)]
        dry_run: bool,

        #[arg(long, default_value = "yt-dlp")]
        yt_dlp: String,
    },

    /// Fetch the configured season playlists into the playlists file
    Fetch {
        series: String,

        #[arg(long)]
        playlists: Option<PathBuf>,

        #[arg(long, default_value = "yt-dlp")]
        yt_dlp: String,
    },

    /// Rename downloaded files to the canonical S01E01_Title form
    Standardize {
        series: String,

        #[arg(long, default_value = "downloads")]
        download_dir: PathBuf,

        /// Perform the renames (default is preview only)
        #[arg(long)]
        execute: bool,
    },

    /// Compare the catalog with the files on disk
    Validate {
        series: String,

        #[arg(long, default_value = "downloads")]
        download_dir: PathBuf,

        #[arg(long)]
        playlists: Option<PathBuf>,
    },

    /// Extract embedded subtitles of a season directory to SRT
    ExtractSubs {
        season_dir: PathBuf,

        #[arg(long, default_value = "Subtitles_SRT_Clean")]
        output: PathBuf,

        #[arg(long, default_value = "mp4")]
        extension: String,
    },

    /// Check SRT files for structural problems
    VerifySubs {
        #[arg(default_value = "Subtitles_SRT_Clean")]
        dir: PathBuf,
    },

    /// List the available series configs
    List,
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::SeasonStarted {
            label,
            episode_count,
        } => {
            println!("\n{}", RULE);
            println!("Processing {} ({} episodes)", label, episode_count);
            println!("{}", RULE);
        }
        ProgressEvent::EpisodeUnparseable { title, .. } => {
            println!("  [WARN] Cannot parse: {}", title);
        }
        ProgressEvent::EpisodeSkipped {
            episode, reason, ..
        } => match reason {
            SkipReason::AlreadyPresent => println!("  [SKIP] {} already exists", episode),
            SkipReason::InArchive => println!("  [SKIP] {} already in download archive", episode),
        },
        ProgressEvent::EpisodePlanned { path, .. } => {
            println!("  [PLAN] {}", path.display());
        }
        ProgressEvent::EpisodeDownloading { path, .. } => {
            println!("  [DOWN] {}", path.display());
        }
        ProgressEvent::EpisodeDownloaded { episode, .. } => {
            println!("  [OK]   {}", episode);
        }
        ProgressEvent::EpisodeFailed {
            episode, reason, ..
        } => {
            println!("  [FAIL] {}: {}", episode, reason);
        }
        ProgressEvent::Complete { .. } => {}
        ProgressEvent::FetchingPlaylist { label, .. } => {
            println!("Fetching {}...", label);
        }
        ProgressEvent::PlaylistFetched {
            episode_count: 0, ..
        } => {
            println!("  Warning: empty playlist");
        }
        ProgressEvent::PlaylistFetched { episode_count, .. } => {
            println!("  Found {} episodes", episode_count);
        }
        ProgressEvent::PlaylistFailed { error, .. } => {
            println!("  Warning: {}", error);
        }
        ProgressEvent::ExtractingSubtitles { video } => {
            println!("Extracting subtitles from: {}", file_name(&video));
        }
        ProgressEvent::SubtitlesExtracted { output, method, .. } => match method {
            ExtractionMethod::Direct => println!("  ✓ {}", output.display()),
            ExtractionMethod::ConvertedFromWebVtt => {
                println!("  ✓ {} (converted from WebVTT)", output.display())
            }
        },
        ProgressEvent::SubtitleExtractionFailed { error, .. } => {
            println!("  ✗ {}", error);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn playlists_path(
    explicit: Option<PathBuf>,
    config: &SeriesConfig,
) -> Result<PathBuf, SeriesDownloaderError> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(default_playlists_path(config)?),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_download(
    config_dir: &Path,
    series: &str,
    download_dir: PathBuf,
    playlists: Option<PathBuf>,
    archive: Option<PathBuf>,
    yes: bool,
    dry_run: bool,
    yt_dlp: &str,
) -> Result<bool, SeriesDownloaderError> {
    let config = find_config(config_dir, series)?;
    let catalog = EpisodeCatalog::load(&config, &playlists_path(playlists, &config)?)?;

    let archive_file = archive
        .unwrap_or_else(|| download_dir.join(format!("{}_downloaded.txt", config.series_slug())));

    println!("{}", RULE);
    println!("{} Downloader", config.series_name);
    println!("{}", RULE);
    println!(
        "\nFound {} seasons, {} episodes",
        catalog.seasons().len(),
        catalog.episode_count()
    );
    println!("Download directory: {}", download_dir.display());
    println!("Archive file: {}", archive_file.display());
    println!(
        "Already downloaded: {} episodes",
        count_existing_media(&download_dir, &config.media_extension)
    );
    println!();

    let downloader = if dry_run {
        println!("Dry run - nothing will be downloaded.");
        None
    } else {
        Some(YtDlpDownloader::new(yt_dlp)?)
    };

    if !yes && !dry_run {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Start downloading missing episodes?")
            .default(true)
            .interact();

        match confirmed {
            Ok(true) => {}
            Ok(false) => {
                println!("Cancelled.");
                return Ok(true);
            }
            Err(e) => {
                eprintln!("Error: cannot read confirmation: {}", e);
                return Ok(false);
            }
        }
    }

    let options = DownloadOptions {
        download_dir,
        archive_file: Some(archive_file),
    };

    let summary = download_series(
        &config,
        &catalog,
        &options,
        downloader.as_ref().map(|d| d as &dyn EpisodeDownloader),
        handle_progress_event,
    );

    println!("\n{}", RULE);
    println!("DOWNLOAD SUMMARY");
    println!("{}", RULE);
    if dry_run {
        println!("  Would download: {}", summary.planned());
    } else {
        println!("  New downloads: {}", summary.downloaded());
    }
    println!("  Skipped:       {}", summary.skipped());
    println!("  Failed:        {}", summary.failed());
    println!("  Total:         {}", summary.results.len());

    if !dry_run {
        let report = DownloadReport::from_summary(&config, &options, &summary)?;
        let path = report.save()?;
        println!("\nReport saved to: {}", path.display());
    }

    Ok(!summary.has_failures())
}

fn run_fetch(
    config_dir: &Path,
    series: &str,
    playlists: Option<PathBuf>,
    yt_dlp: &str,
) -> Result<bool, SeriesDownloaderError> {
    let config = find_config(config_dir, series)?;
    let path = playlists_path(playlists, &config)?;

    let provider = YtDlpPlaylistProvider::new(yt_dlp);
    if !provider.is_available() {
        eprintln!("Error: {} is not installed or not in PATH", yt_dlp);
        return Ok(false);
    }

    let catalog = fetch_playlists(&config, &provider, handle_progress_event)?;
    save_playlists(&path, &catalog)?;

    let total: usize = catalog.values().map(|p| p.episode_count).sum();
    println!("\n✓ Saved playlist data to {}", path.display());
    println!("Total seasons: {}", catalog.len());
    println!("Total episodes: {}", total);

    Ok(true)
}

fn run_standardize(
    config_dir: &Path,
    series: &str,
    download_dir: &Path,
    execute: bool,
) -> Result<bool, SeriesDownloaderError> {
    let config = find_config(config_dir, series)?;

    println!("{}", RULE);
    println!("{} Filename Standardization", config.series_name);
    println!("{}", RULE);

    let plan = plan_standardization(download_dir, &config)?;

    for op in &plan.operations {
        println!("  {}", file_name(&op.source));
        println!("    -> {}", file_name(&op.destination));
    }

    if !plan.unrecognized.is_empty() {
        println!("\nNo episode number found in:");
        for path in &plan.unrecognized {
            println!("  {}", path.display());
        }
    }

    if plan.operations.is_empty() {
        println!("\n✓ All files already have correct naming!");
        return Ok(true);
    }

    println!("\n{}", RULE);
    println!("Files to rename: {}", plan.operations.len());
    println!("{}", RULE);

    if !execute {
        println!("\nPreview mode - no changes made.");
        println!("Run with --execute to perform actual renaming.");
        return Ok(true);
    }

    let failures = execute_renames(&plan.operations);
    for failure in &failures {
        println!(
            "  ✗ Failed: {} - {}",
            file_name(&failure.operation.source),
            failure.error
        );
    }

    println!("\n{}", RULE);
    println!("Rename Summary");
    println!("{}", RULE);
    println!("  Success: {}", plan.operations.len() - failures.len());
    println!("  Failed:  {}", failures.len());

    Ok(failures.is_empty())
}

fn print_validation(report: &ValidationReport) {
    println!("\n{}", RULE);
    println!("{} DOWNLOAD VALIDATION REPORT", report.series_name.to_uppercase());
    println!("{}", RULE);

    println!("\nOverall:");
    println!("   Expected: {} episodes", report.total_expected);
    println!("   Found:    {} files", report.total_found);
    println!("   Missing:  {} episodes", report.total_missing());
    println!(
        "   Rate:     {:.1}%",
        percentage(report.total_found, report.total_expected)
    );

    println!("\nBy Season:");
    for season in &report.seasons {
        println!(
            "   {}: {}/{} ({:.0}%)",
            season.label,
            season.found,
            season.expected,
            percentage(season.found, season.expected)
        );
        for missing in &season.missing {
            println!("     missing {}: {}", missing.episode, missing.title);
        }
        for title in &season.unparseable {
            println!("     no episode number: {}", title);
        }
    }

    let non_canonical: Vec<_> = report.non_canonical_files().collect();
    if !non_canonical.is_empty() {
        println!("\nNon-canonical filenames ({}):", non_canonical.len());
        for file in non_canonical {
            println!("   - {}", file.path.display());
        }
    }

    let non_video: Vec<_> = report.non_video_files().collect();
    if !non_video.is_empty() {
        println!("\nFiles that are not videos ({}):", non_video.len());
        for file in non_video {
            println!("   - {} ({})", file.path.display(), file.size);
        }
    }

    println!("\nSample Videos:");
    for season in report.seasons.iter().filter(|s| !s.files.is_empty()) {
        println!("\n   {}:", season.label);
        for file in season.files.iter().take(3) {
            println!("     - {} ({})", file.file_name, file.size);
        }
        if season.files.len() > 3 {
            println!("     ... and {} more", season.files.len() - 3);
        }
    }

    println!("\n{}", RULE);
}

fn run_validate(
    config_dir: &Path,
    series: &str,
    download_dir: &Path,
    playlists: Option<PathBuf>,
) -> Result<bool, SeriesDownloaderError> {
    let config = find_config(config_dir, series)?;
    let catalog = EpisodeCatalog::load(&config, &playlists_path(playlists, &config)?)?;

    if !download_dir.is_dir() {
        eprintln!(
            "Error: Download directory does not exist: {}",
            download_dir.display()
        );
        return Ok(false);
    }

    let report = validate_downloads(&config, &catalog, download_dir);
    print_validation(&report);

    let path = JsonStore::<ValidationReport>::open(download_dir)?.store("validation_report", &report)?;
    println!("\nReport saved to: {}", path.display());

    Ok(report.is_complete())
}

fn run_extract_subs(
    season_dir: &Path,
    output: &Path,
    extension: &str,
) -> Result<bool, SeriesDownloaderError> {
    if !season_dir.is_dir() {
        eprintln!("Error: Season directory not found: {}", season_dir.display());
        return Ok(false);
    }

    println!("Processing: {}", season_dir.display());
    println!("Output directory: {}", output.display());
    println!("{}", RULE);

    let summary = extract_season_subtitles(season_dir, output, extension, handle_progress_event)?;
    let total = summary.extracted.len() + summary.failed.len();

    println!("\n{}", RULE);
    if total == 0 {
        println!("No .{} files found", extension);
        return Ok(true);
    }
    println!("Success: {}/{}", summary.extracted.len(), total);
    println!("Failed: {}/{}", summary.failed.len(), total);

    Ok(summary.failed.is_empty())
}

fn run_verify_subs(dir: &Path) -> Result<bool, SeriesDownloaderError> {
    if !dir.is_dir() {
        eprintln!("Error: Subtitle directory not found: {}", dir.display());
        return Ok(false);
    }

    let reports = verify_subtitle_dir(dir)?;
    if reports.is_empty() {
        eprintln!("Error: No SRT files found in {}", dir.display());
        return Ok(false);
    }

    println!("Found {} subtitle files\n", reports.len());

    let mut valid_files = 0;
    let mut total_entries = 0;
    let mut total_issues = 0;

    for (path, report) in &reports {
        println!("Verifying: {}", file_name(path));
        if report.is_valid() {
            valid_files += 1;
            println!("  ✓ Valid format");
            println!("    Entries: {}", report.entries);
            println!("    Start: {}", report.first_timestamp.as_deref().unwrap_or("-"));
            println!("    End: {}", report.last_timestamp.as_deref().unwrap_or("-"));
        } else if report.issues.is_empty() {
            println!("  ✗ No entries");
        } else {
            println!("  ✗ Issues found:");
            for issue in &report.issues {
                println!("    - {}", issue);
            }
        }
        total_entries += report.entries;
        total_issues += report.issues.len();
        println!();
    }

    println!("{}", RULE);
    println!("Total files: {}", reports.len());
    println!("Valid files: {}", valid_files);
    println!("Total entries: {}", total_entries);
    println!("Total issues: {}", total_issues);

    if valid_files < reports.len() {
        println!("\nSome issues found, but subtitles may still work");
    }

    // Advisory only
    Ok(true)
}

fn run_list(config_dir: &Path) -> bool {
    let names = list_available_configs(config_dir);
    if names.is_empty() {
        println!("No series configs found in {}", config_dir.display());
        return true;
    }

    println!("Available series ({}):", config_dir.display());
    for name in names {
        println!("  {}", name);
    }
    true
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = resolve_config_dir(cli.config_dir.as_deref());

    let result = match cli.command {
        Command::Download {
            series,
            download_dir,
            playlists,
            archive,
            yes,
            dry_run,
            yt_dlp,
        } => run_download(
            &config_dir,
            &series,
            download_dir,
            playlists,
            archive,
            yes,
            dry_run,
            &yt_dlp,
        ),
        Command::Fetch {
            series,
            playlists,
            yt_dlp,
        } => run_fetch(&config_dir, &series, playlists, &yt_dlp),
        Command::Standardize {
            series,
            download_dir,
            execute,
        } => run_standardize(&config_dir, &series, &download_dir, execute),
        Command::Validate {
            series,
            download_dir,
            playlists,
        } => run_validate(&config_dir, &series, &download_dir, playlists),
        Command::ExtractSubs {
            season_dir,
            output,
            extension,
        } => run_extract_subs(&season_dir, &output, &extension),
        Command::VerifySubs { dir } => run_verify_subs(&dir),
        Command::List => Ok(run_list(&config_dir)),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("\nError: {}", e);
            process::exit(1);
        }
    }
}

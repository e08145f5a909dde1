//! Webpbin command-line tool
//!
//! Installs the prebuilt libwebp tools and runs them for one-off
//! conversions.

use std::cell::Cell;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webpbin_core::{
    BinWrapper, BinaryConfig, BinLocation, CWebP, DWebP, DecodeFormat, DownloadProgress,
    MetadataKind, Provisioner, Tool,
};

/// Path argument meaning stdin or stdout.
const STDIO: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "webpbin", version, about = "Download and run the libwebp tools")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Never download; run the tools from the vendor path, or PATH without one.
    #[arg(long, global = true)]
    skip_download: bool,

    /// Directory holding (or receiving) the tools.
    #[arg(long, global = true, value_name = "DIR")]
    vendor_path: Option<PathBuf>,

    /// libwebp release to use.
    #[arg(long, global = true, value_name = "VERSION")]
    lib_version: Option<String>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the tools now and print their directory.
    Install(InstallArgs),
    /// Print the binary directory and download URL.
    Path,
    /// Print what is installed.
    Status,
    /// Print the version reported by a tool.
    Version(VersionArgs),
    /// Encode an image to WebP.
    Encode(EncodeArgs),
    /// Decode a WebP image.
    Decode(DecodeArgs),
}

#[derive(Parser, Debug)]
struct InstallArgs {
    /// Download again even if the tools are present.
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Parser, Debug)]
struct VersionArgs {
    /// Tool to query (cwebp or dwebp).
    #[arg(long, default_value = "cwebp")]
    tool: Tool,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Input image (PNG, JPEG, TIFF or WebP), or `-` for stdin.
    input: PathBuf,

    /// Output WebP path, or `-` for stdout.
    #[arg(short, long)]
    output: PathBuf,

    /// Quality factor (0-100).
    #[arg(short, long)]
    quality: Option<f32>,

    /// Compression method (0 = fastest, 6 = smallest).
    #[arg(short, long)]
    method: Option<u8>,

    /// Encode losslessly.
    #[arg(long, default_value_t = false)]
    lossless: bool,

    /// Metadata to copy (all, none, exif, icc, xmp).
    #[arg(long, value_delimiter = ',')]
    metadata: Vec<MetadataKind>,

    /// Silence the encoder.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Input WebP image, or `-` for stdin.
    input: PathBuf,

    /// Output path, or `-` for stdout.
    #[arg(short, long)]
    output: PathBuf,

    /// Output format (png, pam, ppm, bmp, tiff, pgm, yuv).
    #[arg(long, default_value = "png")]
    format: DecodeFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    tracing::debug!("webpbin v{}", webpbin_core::VERSION);

    let config = build_config(&cli.global);
    match cli.cmd {
        Command::Install(args) => cmd_install(config, args).await,
        Command::Path => cmd_path(config),
        Command::Status => cmd_status(config),
        Command::Version(args) => cmd_version(config, args).await,
        Command::Encode(args) => cmd_encode(config, args).await,
        Command::Decode(args) => cmd_decode(config, args).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "webpbin=debug,webpbin_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, then flags.
fn build_config(global: &GlobalArgs) -> BinaryConfig {
    let mut config = BinaryConfig::from_env();
    if global.skip_download {
        config = config.with_skip_download(true);
    }
    if let Some(dir) = &global.vendor_path {
        config = config.with_vendor_path(dir);
    }
    if let Some(version) = &global.lib_version {
        config = config.with_version(version);
    }
    config.detect_unsupported_platforms()
}

async fn cmd_install(config: BinaryConfig, args: InstallArgs) -> anyhow::Result<()> {
    let provisioner = Provisioner::new(config);
    let last_decile = Cell::new(0u32);
    let report = |progress: DownloadProgress| {
        if let Some(percent) = progress.percent {
            let decile = (percent / 10.0) as u32;
            if decile > last_decile.get() {
                last_decile.set(decile);
                eprintln!("downloading... {:.0}%", percent);
            }
        }
    };

    let location = if args.force && !provisioner.should_skip_download() {
        provisioner
            .install(report)
            .await
            .context("install libwebp tools")?;
        BinLocation::Directory(provisioner.bin_dir())
    } else {
        provisioner
            .ensure_installed(report)
            .await
            .context("install libwebp tools")?
    };

    match location {
        BinLocation::Directory(dir) => println!("{}", dir.display()),
        BinLocation::SystemPath => eprintln!("download skipped, tools are taken from PATH"),
    }
    Ok(())
}

fn cmd_path(config: BinaryConfig) -> anyhow::Result<()> {
    let provisioner = Provisioner::new(config);
    println!("bin dir:  {}", provisioner.bin_dir().display());
    match provisioner.download_url() {
        Ok(url) => println!("download: {url}"),
        Err(e) => println!("download: unavailable ({e})"),
    }
    if provisioner.should_skip_download() {
        match &provisioner.config().vendor_path {
            Some(dir) => println!("download skipped, tools are taken from {}", dir.display()),
            None => println!("download skipped, tools are taken from PATH"),
        }
    }
    Ok(())
}

fn cmd_status(config: BinaryConfig) -> anyhow::Result<()> {
    let provisioner = Provisioner::new(config);
    let bin_dir = provisioner.bin_dir();

    if !provisioner.is_installed() {
        println!("not installed in {}", bin_dir.display());
        return Ok(());
    }

    println!("installed in {}", bin_dir.display());
    match provisioner
        .install_manifest()
        .context("read install record")?
    {
        Some(manifest) => {
            println!("version:      {}", manifest.version);
            println!("source:       {}", manifest.source_url);
            println!("installed at: {}", manifest.installed_at.to_rfc3339());
            println!("archive size: {} bytes", manifest.archive_bytes);
        }
        None => println!("no install record (vendored tools?)"),
    }
    Ok(())
}

async fn cmd_version(config: BinaryConfig, args: VersionArgs) -> anyhow::Result<()> {
    let bin = BinWrapper::new(config);
    let version = bin
        .version(args.tool)
        .await
        .with_context(|| format!("query {} version", args.tool))?;
    println!("{version}");
    Ok(())
}

async fn cmd_encode(config: BinaryConfig, args: EncodeArgs) -> anyhow::Result<()> {
    let mut encoder = CWebP::new(BinWrapper::new(config));
    if let Some(quality) = args.quality {
        encoder.quality(quality);
    }
    if let Some(method) = args.method {
        encoder.method(method);
    }
    encoder.lossless(args.lossless);
    for kind in args.metadata {
        encoder.metadata(kind);
    }
    if args.quiet {
        encoder.quiet();
    }

    if args.input.as_os_str() == STDIO {
        encoder.input(tokio::io::stdin());
    } else {
        encoder.input_file(&args.input);
    }
    if args.output.as_os_str() == STDIO {
        encoder.output(tokio::io::stdout());
    } else {
        create_parent_dir(&args.output)?;
        encoder.output_file(&args.output);
    }

    encoder
        .run()
        .await
        .with_context(|| format!("encode '{}'", args.input.display()))?;

    if args.output.as_os_str() != STDIO {
        eprintln!("wrote {}", args.output.display());
    }
    Ok(())
}

async fn cmd_decode(config: BinaryConfig, args: DecodeArgs) -> anyhow::Result<()> {
    let mut decoder = DWebP::new(BinWrapper::new(config));
    decoder.format(args.format);

    if args.input.as_os_str() == STDIO {
        decoder.input(tokio::io::stdin());
    } else {
        decoder.input_file(&args.input);
    }
    if args.output.as_os_str() == STDIO {
        decoder.output(tokio::io::stdout());
    } else {
        create_parent_dir(&args.output)?;
        decoder.output_file(&args.output);
    }

    decoder
        .run()
        .await
        .with_context(|| format!("decode '{}'", args.input.display()))?;

    if args.output.as_os_str() != STDIO {
        eprintln!("wrote {}", args.output.display());
    }
    Ok(())
}

fn create_parent_dir(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use pixel_tools::{
    ColorSample, DateFormat, OutputFormat, Orientation, ResizeFilter, SignPosition, StampPosition,
    ToolkitConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pixel-tools", version, about = "Pixel-buffer image tools")]
struct Cli {
    /// Settings file (JSON). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = "pixel-tools.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cap the width and re-encode at a lower quality.
    Compress(CompressArgs),
    /// Scale to an exact size.
    Resize(ResizeArgs),
    /// Re-encode in another format.
    Convert(ConvertArgs),
    /// Brightness, contrast, saturation, sharpen, denoise.
    Enhance(EnhanceArgs),
    /// Make the corner-coloured background transparent.
    RemoveBg(BackgroundArgs),
    /// Paint the corner-coloured background with another colour.
    ChangeBg(ChangeBgArgs),
    /// Blur circular regions.
    Redact(RedactArgs),
    /// Put a signature next to, below, or on top of a photo.
    Join(JoinArgs),
    /// Write a name and date onto the image.
    Stamp(StampArgs),
    /// Write the effective settings as JSON.
    DumpConfig {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct IoArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. Defaults to `<input stem>-<tool>.<ext>` next to the input.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CompressArgs {
    #[command(flatten)]
    io: IoArgs,
    /// Quality in (0, 1].
    #[arg(long)]
    quality: Option<f32>,
    #[arg(long)]
    max_width: Option<u32>,
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,
}

#[derive(Parser, Debug)]
struct ResizeArgs {
    #[command(flatten)]
    io: IoArgs,
    /// Target width. Computed from the aspect ratio when only height is given.
    #[arg(long)]
    width: Option<u32>,
    /// Target height. Computed from the aspect ratio when only width is given.
    #[arg(long)]
    height: Option<u32>,
    /// Scale both sides by a percentage instead.
    #[arg(long, conflicts_with_all = ["width", "height"])]
    percent: Option<f32>,
    #[arg(long)]
    quality: Option<f32>,
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,
    #[arg(long)]
    quality: Option<f32>,
}

#[derive(Parser, Debug)]
struct EnhanceArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(long)]
    brightness: Option<f32>,
    #[arg(long)]
    contrast: Option<f32>,
    #[arg(long)]
    saturation: Option<f32>,
    /// Unsharp strength, 0 to 10.
    #[arg(long)]
    sharpness: Option<f32>,
    #[arg(long)]
    denoise: bool,
}

#[derive(Parser, Debug)]
struct BackgroundArgs {
    #[command(flatten)]
    io: IoArgs,
    /// Per-channel tolerance, 0 to 255.
    #[arg(long)]
    tolerance: Option<i64>,
}

#[derive(Parser, Debug)]
struct ChangeBgArgs {
    #[command(flatten)]
    bg: BackgroundArgs,
    /// Replacement colour as hex, e.g. `#00ff00`.
    #[arg(long)]
    color: Option<ColorSample>,
}

#[derive(Parser, Debug)]
struct RedactArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(long)]
    blur_radius: Option<f32>,
}

#[derive(Parser, Debug)]
struct JoinArgs {
    /// Photo image.
    #[arg(long)]
    photo: PathBuf,
    /// Signature image.
    #[arg(long)]
    signature: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    orientation: Option<OrientationChoice>,
    #[arg(long, value_enum)]
    position: Option<PositionChoice>,
    /// Signature scale in percent.
    #[arg(long)]
    scale: Option<f32>,
    #[arg(long)]
    padding: Option<u32>,
    /// Signature transparency in percent.
    #[arg(long)]
    transparency: Option<f32>,
    #[arg(long)]
    border: bool,
    /// Leave the canvas transparent instead of white.
    #[arg(long)]
    transparent: bool,
}

#[derive(Parser, Debug)]
struct StampArgs {
    #[command(flatten)]
    io: IoArgs,
    /// Name to write.
    #[arg(long)]
    text: Option<String>,
    /// Leave the date off.
    #[arg(long)]
    no_date: bool,
    /// Date as YYYY-MM-DD instead of today.
    #[arg(long)]
    date: Option<chrono::NaiveDate>,
    /// One of dd/MM/yyyy, MM/dd/yyyy, yyyy-MM-dd, dd.MM.yyyy, dd-MM-yy.
    #[arg(long)]
    date_format: Option<DateFormat>,
    #[arg(long, value_enum)]
    position: Option<StampPositionChoice>,
    #[arg(long)]
    font_size: Option<f32>,
    /// TrueType/OpenType font file.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Text colour as hex.
    #[arg(long)]
    color: Option<ColorSample>,
    /// Draw a box behind the text.
    #[arg(long)]
    background: bool,
    #[arg(long)]
    background_color: Option<ColorSample>,
    /// Box opacity in percent.
    #[arg(long)]
    background_opacity: Option<f32>,
    #[arg(long)]
    padding: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StampPositionChoice {
    BottomRight,
    BottomLeft,
    BottomCenter,
    TopRight,
    TopLeft,
    TopCenter,
}

impl From<StampPositionChoice> for StampPosition {
    fn from(choice: StampPositionChoice) -> Self {
        match choice {
            StampPositionChoice::BottomRight => StampPosition::BottomRight,
            StampPositionChoice::BottomLeft => StampPosition::BottomLeft,
            StampPositionChoice::BottomCenter => StampPosition::BottomCenter,
            StampPositionChoice::TopRight => StampPosition::TopRight,
            StampPositionChoice::TopLeft => StampPosition::TopLeft,
            StampPositionChoice::TopCenter => StampPosition::TopCenter,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl From<FilterChoice> for ResizeFilter {
    fn from(choice: FilterChoice) -> Self {
        match choice {
            FilterChoice::Nearest => ResizeFilter::Nearest,
            FilterChoice::Bilinear => ResizeFilter::Bilinear,
            FilterChoice::CatmullRom => ResizeFilter::CatmullRom,
            FilterChoice::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl From<FormatChoice> for OutputFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Jpeg => OutputFormat::Jpeg,
            FormatChoice::Png => OutputFormat::Png,
            FormatChoice::Webp => OutputFormat::Webp,
            FormatChoice::Gif => OutputFormat::Gif,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationChoice {
    Horizontal,
    Vertical,
    Overlay,
}

impl From<OrientationChoice> for Orientation {
    fn from(choice: OrientationChoice) -> Self {
        match choice {
            OrientationChoice::Horizontal => Orientation::Horizontal,
            OrientationChoice::Vertical => Orientation::Vertical,
            OrientationChoice::Overlay => Orientation::Overlay,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PositionChoice {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl From<PositionChoice> for SignPosition {
    fn from(choice: PositionChoice) -> Self {
        match choice {
            PositionChoice::Top => SignPosition::Top,
            PositionChoice::Bottom => SignPosition::Bottom,
            PositionChoice::Left => SignPosition::Left,
            PositionChoice::Right => SignPosition::Right,
            PositionChoice::Center => SignPosition::Center,
            PositionChoice::TopLeft => SignPosition::TopLeft,
            PositionChoice::TopRight => SignPosition::TopRight,
            PositionChoice::BottomLeft => SignPosition::BottomLeft,
            PositionChoice::BottomRight => SignPosition::BottomRight,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ToolkitConfig::load_or_default(&cli.config)
        .with_context(|| format!("load settings '{}'", cli.config.display()))?;

    match cli.cmd {
        Command::Compress(args) => cmd_compress(args, config).await,
        Command::Resize(args) => cmd_resize(args, config).await,
        Command::Convert(args) => cmd_convert(args, config).await,
        Command::Enhance(args) => cmd_enhance(args, config).await,
        Command::RemoveBg(args) => cmd_remove_bg(args, config).await,
        Command::ChangeBg(args) => cmd_change_bg(args, config).await,
        Command::Redact(args) => cmd_redact(args, config).await,
        Command::Join(args) => cmd_join(args, config).await,
        Command::Stamp(args) => cmd_stamp(args, config).await,
        Command::DumpConfig { out } => cmd_dump_config(out, config),
    }
}

/// `photo.png` + `compressed` + `jpg` -> `photo-compressed.jpg`
fn default_output(input: &Path, tool: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}-{}.{}", stem, tool, extension))
}

fn source_format(input: &Path) -> OutputFormat {
    input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
        .unwrap_or_default()
}

async fn cmd_compress(args: CompressArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.compress;
    if let Some(q) = args.quality {
        settings.quality = q;
    }
    if let Some(w) = args.max_width {
        settings.max_width = w;
    }
    if let Some(f) = args.filter {
        settings.filter = f.into();
    }

    let out = args.io.out.unwrap_or_else(|| {
        default_output(&args.io.in_path, "compressed", source_format(&args.io.in_path).extension())
    });
    let (file, report) = pixel_tools::compress_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("compress '{}'", args.io.in_path.display()))?;

    info!("{}", report.summary());
    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_resize(args: ResizeArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.resize;
    if let Some(q) = args.quality {
        settings.quality = q;
    }
    if let Some(f) = args.filter {
        settings.filter = f.into();
    }

    let decoded = pixel_tools::decode_file(&args.io.in_path)
        .await
        .with_context(|| format!("read '{}'", args.io.in_path.display()))?;
    let original = decoded.image.dimensions();

    let (width, height) = match (args.percent, args.width, args.height) {
        (Some(p), _, _) => pixel_tools::resample::scale_by_percent(original, p),
        (None, Some(w), Some(h)) => (w, h),
        (None, Some(w), None) => (w, pixel_tools::resample::height_for_width(original, w)),
        (None, None, Some(h)) => (pixel_tools::resample::width_for_height(original, h), h),
        (None, None, None) => anyhow::bail!("resize needs --width, --height or --percent"),
    };

    let format = OutputFormat::for_source(decoded.mime);
    let out = args
        .io
        .out
        .unwrap_or_else(|| default_output(&args.io.in_path, "resized", format.extension()));
    let file = pixel_tools::resize_file(&args.io.in_path, &out, width, height, settings)
        .await
        .with_context(|| format!("resize '{}'", args.io.in_path.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_convert(args: ConvertArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.convert;
    if let Some(f) = args.format {
        settings.format = f.into();
    }
    if let Some(q) = args.quality {
        settings.quality = q;
    }

    let out = args
        .io
        .out
        .unwrap_or_else(|| default_output(&args.io.in_path, "converted", settings.format.extension()));
    let file = pixel_tools::convert_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("convert '{}'", args.io.in_path.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_enhance(args: EnhanceArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.enhance;
    if let Some(v) = args.brightness {
        settings.tone.brightness = v;
    }
    if let Some(v) = args.contrast {
        settings.tone.contrast = v;
    }
    if let Some(v) = args.saturation {
        settings.tone.saturation = v;
    }
    if let Some(v) = args.sharpness {
        settings.sharpness = v;
    }
    settings.denoise |= args.denoise;

    let out = args.io.out.unwrap_or_else(|| default_output(&args.io.in_path, "enhanced", "png"));
    let file = pixel_tools::enhance_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("enhance '{}'", args.io.in_path.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_remove_bg(args: BackgroundArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.background;
    if let Some(t) = args.tolerance {
        settings.tolerance = pixel_tools::background::tolerance_from(t);
    }

    let out = args.io.out.unwrap_or_else(|| default_output(&args.io.in_path, "no-bg", "png"));
    let (file, result) = pixel_tools::remove_background_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("remove background '{}'", args.io.in_path.display()))?;

    info!("Background {} matched {} pixels", result.reference, result.matched_pixels);
    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_change_bg(args: ChangeBgArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.background;
    if let Some(t) = args.bg.tolerance {
        settings.tolerance = pixel_tools::background::tolerance_from(t);
    }
    if let Some(c) = args.color {
        settings.replacement = c;
    }

    let io = args.bg.io;
    let out = io.out.unwrap_or_else(|| default_output(&io.in_path, "new-bg", "png"));
    let (file, result) = pixel_tools::change_background_file(&io.in_path, &out, settings)
        .await
        .with_context(|| format!("change background '{}'", io.in_path.display()))?;

    info!("Background {} matched {} pixels", result.reference, result.matched_pixels);
    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_redact(args: RedactArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.redact;
    if let Some(r) = args.blur_radius {
        settings.blur_radius = r;
    }

    let out = args.io.out.unwrap_or_else(|| default_output(&args.io.in_path, "redacted", "png"));
    let file = pixel_tools::redact_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("redact '{}'", args.io.in_path.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_join(args: JoinArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.join;
    if let Some(o) = args.orientation {
        settings.orientation = o.into();
    }
    if let Some(p) = args.position {
        settings.position = p.into();
    }
    if let Some(s) = args.scale {
        settings.scale = s;
    }
    if let Some(p) = args.padding {
        settings.padding = p;
    }
    if let Some(t) = args.transparency {
        settings.transparency = t;
    }
    settings.border |= args.border;
    if args.transparent {
        settings.white_background = false;
    }

    let out = args.out.unwrap_or_else(|| default_output(&args.photo, "signed", "png"));
    let file = pixel_tools::join_files(&args.photo, &args.signature, &out, settings)
        .await
        .with_context(|| format!("join '{}' + '{}'", args.photo.display(), args.signature.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

async fn cmd_stamp(args: StampArgs, config: ToolkitConfig) -> anyhow::Result<()> {
    let mut settings = config.stamp;
    if let Some(t) = args.text {
        settings.text = t;
    }
    if args.no_date {
        settings.include_date = false;
    }
    if let Some(d) = args.date {
        settings.date = Some(d);
    }
    if let Some(f) = args.date_format {
        settings.date_format = f;
    }
    if let Some(p) = args.position {
        settings.position = p.into();
    }
    if let Some(s) = args.font_size {
        settings.font_size = s;
    }
    if let Some(f) = args.font {
        settings.font_path = Some(f);
    }
    if let Some(c) = args.color {
        settings.text_color = c;
    }
    settings.background |= args.background;
    if let Some(c) = args.background_color {
        settings.background_color = c;
    }
    if let Some(o) = args.background_opacity {
        settings.background_opacity = o;
    }
    if let Some(p) = args.padding {
        settings.padding = p;
    }

    let out = args.io.out.unwrap_or_else(|| default_output(&args.io.in_path, "signed", "jpg"));
    let file = pixel_tools::stamp_file(&args.io.in_path, &out, settings)
        .await
        .with_context(|| format!("stamp '{}'", args.io.in_path.display()))?;

    println!("{}", file.output_path.display());
    Ok(())
}

fn cmd_dump_config(out: Option<PathBuf>, config: ToolkitConfig) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            config
                .save(&path)
                .with_context(|| format!("write settings '{}'", path.display()))?;
            println!("{}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

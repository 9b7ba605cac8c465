// ============================================================================
// voover CLI: apply effect chains to image files
// ============================================================================
//
// Usage examples:
//   voover -i photo.png -o grey.png --effect grey
//   voover -i photo.jpg -o out.png --effect brightness:factor=40 --effect sepia
//   voover -i photo.png -o out.png --chain warm.json --seed 7
//   voover --list-effects

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use voover_core::config::EngineConfig;
use voover_core::effects::{Effect, EffectChain, EffectKind, ParameterType};
use voover_core::error::CoreError;
use voover_core::image::ImageBuffer;
use voover_core::pipeline::Progress;
use voover_core::worker::spawn_run;

/// voover headless image effects.
#[derive(Parser, Debug)]
#[command(
    name = "voover",
    about = "Apply pixel effects and region recoloring to an image",
    long_about = "Run a chain of pixel effects over an image file and write the result.\n\
                  Effects are given as NAME or NAME:PARAM=VALUE,... and run in order,\n\
                  after any effects loaded from --chain.\n\n\
                  Example:\n  \
                  voover -i photo.png -o out.png --effect contrast:factor=60 --effect floodfill"
)]
pub struct CliArgs {
    /// Input image.
    #[arg(short, long, value_name = "FILE", required_unless_present = "list_effects")]
    pub input: Option<PathBuf>,

    /// Output image. The format is inferred from the extension.
    #[arg(short, long, value_name = "FILE", required_unless_present = "list_effects")]
    pub output: Option<PathBuf>,

    /// Effect to apply, e.g. "grey" or "sepia:depth=40". Repeatable.
    #[arg(short, long = "effect", value_name = "NAME[:P=V,...]", value_parser = parse_effect)]
    pub effects: Vec<Effect>,

    /// Chain preset (JSON) whose effects run before any --effect.
    #[arg(long, value_name = "PRESET.json")]
    pub chain: Option<PathBuf>,

    /// Engine configuration (JSON).
    #[arg(long, value_name = "ENGINE.json")]
    pub config: Option<PathBuf>,

    /// Seed for noise and floodfill. Overrides the config file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// List the available effects and their parameters, then exit.
    #[arg(long)]
    pub list_effects: bool,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Usage(String),
}

/// Parse `NAME` or `NAME:PARAM=VALUE,PARAM=VALUE` into an effect.
pub fn parse_effect(arg: &str) -> Result<Effect, String> {
    let (name, params) = match arg.split_once(':') {
        Some((name, params)) => (name, params),
        None => (arg, ""),
    };
    let kind = EffectKind::from_name(name.trim()).map_err(|e| e.to_string())?;

    let mut parsed = Vec::new();
    for pair in params.split(',').filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected PARAM=VALUE, got '{pair}'"))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", value.trim()))?;
        parsed.push((key.trim().to_string(), value));
    }
    Effect::from_kind_params(kind, &parsed).map_err(|e| e.to_string())
}

/// Run the CLI and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if args.list_effects {
        print!("{}", effect_listing());
        return ExitCode::SUCCESS;
    }
    match process(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn process(args: &CliArgs) -> Result<(), CliError> {
    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        return Err(CliError::Usage("--input and --output are required".into()));
    };

    let config = resolve_config(args)?;
    let chain = build_chain(args, &config)?;
    if chain.active().next().is_none() {
        log::warn!("no effects given, copying {} unchanged", input.display());
    }

    let image = load_image(input)?;
    log::info!(
        "loaded {} ({}x{}), {} effect(s)",
        input.display(),
        image.width(),
        image.height(),
        chain.active().count()
    );

    let mut meter = ProgressMeter::default();
    let outcome = spawn_run(image, chain, config)?.wait(|p| meter.update(p));
    meter.finish();
    let result = outcome.result?;

    save_image(&result, output)?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn resolve_config(args: &CliArgs) -> Result<EngineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

/// Preset effects first, then command-line effects. The configured palette
/// applies to command-line effects only; presets keep their own.
fn build_chain(args: &CliArgs, config: &EngineConfig) -> Result<EffectChain, CliError> {
    let mut chain = match &args.chain {
        Some(path) => EffectChain::load(path)?,
        None => EffectChain::new(),
    };
    for effect in &args.effects {
        let mut effect = effect.clone();
        effect.set_palette(&config.palette);
        chain.push(effect);
    }
    Ok(chain)
}

fn load_image(path: &Path) -> Result<ImageBuffer, CliError> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageBuffer::from_rgba_vec(width, height, rgba.into_raw())?)
}

fn save_image(buffer: &ImageBuffer, path: &Path) -> Result<(), CliError> {
    let (width, height) = buffer.dimensions();
    let rgba = image::RgbaImage::from_raw(width, height, buffer.as_bytes().to_vec())
        .ok_or_else(|| CliError::Usage("result buffer has the wrong size".into()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    // JPEG has no alpha channel.
    if matches!(ext.as_deref(), Some("jpg" | "jpeg")) {
        image::DynamicImage::ImageRgba8(rgba).to_rgb8().save(path)?;
    } else {
        rgba.save(path)?;
    }
    Ok(())
}

fn effect_listing() -> String {
    let mut out = String::new();
    for kind in EffectKind::all_builtin() {
        out.push_str(&format!("{:<12} {}\n", kind.name(), kind.display_name()));
        for def in kind.parameter_definitions() {
            let range = match def.param_type {
                ParameterType::Int { default, min, max } => format!("{min}..={max}, default {default}"),
                ParameterType::Float { default, min, max } => format!("{min}..={max}, default {default}"),
            };
            out.push_str(&format!("    {:<10} {} ({range})\n", def.name, def.label));
        }
    }
    out
}

/// Whole-percent progress on stderr, one line per effect pass.
#[derive(Default)]
struct ProgressMeter {
    last: Option<(usize, u32)>,
}

impl ProgressMeter {
    fn update(&mut self, progress: &Progress) {
        let percent = (progress.fraction() * 100.0) as u32;
        let key = (progress.effect_index, percent);
        if self.last == Some(key) {
            return;
        }
        if self.last.is_some_and(|(index, _)| index != progress.effect_index) {
            eprintln!();
        }
        self.last = Some(key);
        eprint!("\r{} {percent:>3}%", progress.label);
        let _ = std::io::stderr().flush();
    }

    fn finish(&self) {
        if self.last.is_some() {
            eprintln!();
        }
    }
}

// cloud-imager/src/cli.rs
use clap::{Parser, Subcommand, ValueEnum};
use cloud_imager::processors::steps::{self, op};
use cloud_imager::{OpArg, ReturnType, SharedStep, Variants};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cloud-imager")]
#[command(about = "Generate image variants from presets and store them in a directory")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a preset over images and print where every variant landed
    Process {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Upload directory
        #[arg(short, long)]
        output: PathBuf,

        /// Variant as NAME=STEP;STEP, e.g. thumb=smartCrop(100,100);sepia()
        #[arg(long = "variant", value_name = "NAME=STEPS", value_parser = parse_variant)]
        variants: Vec<VariantArg>,

        /// File name format
        #[arg(short, long)]
        format: Option<String>,

        /// Also store the unmodified source as "original"
        #[arg(long)]
        keep_original: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Shape of the returned locations
        #[arg(long, value_enum, default_value = "relative")]
        return_type: ReturnKind,

        /// Report the pixel size of every stored file
        #[arg(long)]
        include_size: bool,
    },
    /// Show what an image would be described as
    Info {
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReturnKind {
    Relative,
    Url,
    Absolute,
}

impl From<ReturnKind> for ReturnType {
    fn from(kind: ReturnKind) -> Self {
        match kind {
            ReturnKind::Relative => ReturnType::Relative,
            ReturnKind::Url => ReturnType::Url,
            ReturnKind::Absolute => ReturnType::Absolute,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariantArg {
    pub name: String,
    pub steps: Vec<SharedStep>,
}

pub fn parse_variant(raw: &str) -> Result<VariantArg, String> {
    let (name, pipeline) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=STEPS, got \"{}\"", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("variant name is empty".to_string());
    }

    let steps = pipeline
        .split(';')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(parse_step)
        .collect::<Result<Vec<_>, _>>()?;
    if steps.is_empty() {
        return Err(format!("variant \"{}\" has no steps", name));
    }

    Ok(VariantArg {
        name: name.to_string(),
        steps,
    })
}

fn parse_step(raw: &str) -> Result<SharedStep, String> {
    let (name, args) = match raw.split_once('(') {
        Some((name, rest)) => {
            let args = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("missing \")\" in \"{}\"", raw))?;
            (name.trim(), args)
        }
        None => (raw, ""),
    };

    let args: Vec<OpArg> = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split(',').map(parse_arg).collect()
    };

    if name == "smartCrop" {
        let side = |i: usize| {
            args.get(i)
                .and_then(OpArg::as_u32)
                .ok_or_else(|| format!("smartCrop needs width and height, got \"{}\"", raw))
        };
        let crop = steps::smart_crop(side(0)?, side(1)?).map_err(|e| e.to_string())?;
        return Ok(Arc::new(crop));
    }

    Ok(Arc::new(op(name.to_string(), args)))
}

fn parse_arg(raw: &str) -> OpArg {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return OpArg::Absent;
    }
    if raw.starts_with('+') {
        return OpArg::Text(raw.to_string());
    }
    if let Ok(int) = raw.parse::<i64>() {
        return OpArg::Int(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return OpArg::Float(float);
    }
    OpArg::Text(raw.trim_matches('"').to_string())
}

const DEMO_VARIANTS: [&str; 3] = [
    "square=smartCrop(100,100)",
    "sepia=sepia()",
    "pop=colorize(10,-20,25);blur(10);contrast(+4)",
];

/// Variants from the command line, or the demo set when none were given.
pub fn build_variants(args: Vec<VariantArg>) -> Result<Variants, String> {
    let args = if args.is_empty() {
        DEMO_VARIANTS
            .iter()
            .map(|raw| parse_variant(raw))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        args
    };

    Ok(args
        .into_iter()
        .fold(Variants::new(), |variants, arg| variants.pipeline(arg.name, arg.steps)))
}

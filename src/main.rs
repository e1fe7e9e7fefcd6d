mod cli;

use crate::cli::{build_variants, Cli, Commands, ReturnKind, VariantArg};
use anyhow::{anyhow, bail, Context as _};
use clap::Parser;
use cloud_imager::processors::MetadataProcessor;
use cloud_imager::{
    collect_image_paths, format_file_size, CloudImager, ExtensionMimeLookup, FileDescriptor,
    ImageManipulator, LocalOutletOptions, PresetOptions, RasterManipulator,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

const CLI_PRESET: &str = "cli";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Process {
            inputs,
            output,
            variants,
            format,
            keep_original,
            recursive,
            return_type,
            include_size,
        } => process_images(
            inputs,
            output,
            variants,
            format,
            keep_original,
            recursive,
            return_type,
            include_size,
        ),
        Commands::Info { input } => process_info(input),
    }
}

#[allow(clippy::too_many_arguments)]
fn process_images(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    variants: Vec<VariantArg>,
    format: Option<String>,
    keep_original: bool,
    recursive: bool,
    return_type: ReturnKind,
    include_size: bool,
) -> anyhow::Result<()> {
    let images = collect_image_paths(&inputs, recursive)?;
    if images.is_empty() {
        bail!("No image files found");
    }

    let mut imager = CloudImager::new()?;
    if let Some(format) = format {
        imager.set_file_name_format(format);
    }
    let variants = build_variants(variants).map_err(|e| anyhow!(e))?;
    imager.preset(
        CLI_PRESET,
        variants,
        PresetOptions::default().keep_original(keep_original),
    )?;

    let outlet = imager.local_directory_outlet(
        LocalOutletOptions::default()
            .upload_directory(output)
            .return_type(return_type.into())
            .include_size(include_size),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Processing {} image(s)", images.len()));

    let count = images.len();
    let result = imager.process(images, Some(CLI_PRESET), Some(outlet));
    spinner.finish_and_clear();

    let output = result.context("processing failed")?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    log::info!("Processed {} image(s)", count);

    Ok(())
}

fn process_info(input: PathBuf) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("File does not exist: {}", input.display());
    }

    let descriptor = FileDescriptor::new(input.clone().into(), &ExtensionMimeLookup)?;
    let file_size = std::fs::metadata(&input)?.len();
    let size = RasterManipulator::new().open(&input)?.size()?;

    println!("=== Image Information ===");
    println!("File: {}", input.display());
    println!("Name: {}", descriptor.name());
    println!("Type: {}", descriptor.declared_type());
    println!("Basename: {}", descriptor.basename());
    println!("Extension: {}", descriptor.extension());
    println!("MIME extension: {}", descriptor.mime_extension());
    println!("Size: {}", format_file_size(file_size));
    println!("Dimensions: {} x {} pixels", size.width, size.height);
    println!("Aspect Ratio: {:.2}", size.aspect_ratio());

    if let Ok(Some(exif)) = MetadataProcessor::new().read_metadata(&input) {
        println!("\n=== EXIF Metadata ===");
        for field in exif.fields() {
            println!("{}: {}", field.tag, field.display_value().with_unit(&exif));
        }
    }

    Ok(())
}

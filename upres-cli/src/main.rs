//! # upres CLI
//!
//! Operator tool for the upres filter: validates an option string, reports
//! the negotiated output geometry for a given input, checks the model
//! folder, and probes engine runtime availability. Runs entirely without a
//! device.

use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use upres_core::adapter::compute_output_geometry;
use upres_core::format::{PixelFormat, ACCEPTED_INPUT_FORMATS};
use upres_core::options::FilterOptions;
use upres_core::raisr;

struct Args {
    options_spec: String,
    input: Option<(u32, u32)>,
    format: PixelFormat,
    probe: bool,
    check_models: bool,
    show_config: bool,
}

fn usage() -> &'static str {
    "Usage: upres [--options key=value:...] [--input WxH] [--format NAME]\n\
     \x20            [--probe] [--check-models] [--show-config]\n\
     \n\
     --options       Filter option string (ratio, bits, range, filterfolder,\n\
     \x20             blending, passes, mode, evenoutput)\n\
     --input WxH     Print the negotiated output geometry for this input\n\
     --format NAME   Input pixel format (default nv12)\n\
     --probe         Check whether the engine runtime library is loadable\n\
     --check-models  Check the configured model folder\n\
     --show-config   Print the parsed configuration as JSON"
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        options_spec: String::new(),
        input: None,
        format: PixelFormat::Nv12,
        probe: false,
        check_models: false,
        show_config: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--options" => {
                args.options_spec = iter
                    .next()
                    .ok_or_else(|| anyhow!("--options requires a value"))?;
            }
            "--input" => {
                let value = iter.next().ok_or_else(|| anyhow!("--input requires WxH"))?;
                args.input = Some(parse_dimensions(&value)?);
            }
            "--format" => {
                let value = iter.next().ok_or_else(|| anyhow!("--format requires a name"))?;
                args.format = PixelFormat::from_name(&value)
                    .ok_or_else(|| anyhow!("unknown pixel format '{value}'"))?;
            }
            "--probe" => args.probe = true,
            "--check-models" => args.check_models = true,
            "--show-config" => args.show_config = true,
            "--help" | "-h" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("unknown argument '{other}'\n\n{}", usage()),
        }
    }
    Ok(args)
}

fn parse_dimensions(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| anyhow!("expected WxH, got '{value}'"))?;
    let width: u32 = w.parse().with_context(|| format!("bad width '{w}'"))?;
    let height: u32 = h.parse().with_context(|| format!("bad height '{h}'"))?;
    if width == 0 || height == 0 {
        bail!("dimensions must be non-zero, got {value}");
    }
    Ok((width, height))
}

fn report_geometry(options: &FilterOptions, format: PixelFormat, width: u32, height: u32) -> Result<()> {
    if !format.supported_by_engine() {
        let accepted: Vec<&str> = ACCEPTED_INPUT_FORMATS.iter().map(|f| f.name()).collect();
        bail!(
            "format {} is not accepted by the engine (accepted: {})",
            format.name(),
            accepted.join(", ")
        );
    }
    if format.bit_depth() != options.bits {
        bail!(
            "format {} is {}-bit but the configured model is {}-bit",
            format.name(),
            format.bit_depth(),
            options.bits
        );
    }

    let geometry = compute_output_geometry(width, height, options);
    println!(
        "{} {}x{} -> {}x{} (ratio {}, evenoutput {})",
        format.name(),
        width,
        height,
        geometry.width,
        geometry.height,
        options.ratio,
        options.evenoutput,
    );
    Ok(())
}

fn report_model_folder(options: &FilterOptions) -> Result<()> {
    let count = options.check_model_folder()?;
    println!(
        "model folder ok: {} ({} files)",
        options.filterfolder.display(),
        count
    );
    Ok(())
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let options = FilterOptions::parse(&args.options_spec).context("invalid --options string")?;
    info!("Parsed filter options: ratio={} bits={}", options.ratio, options.bits);

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&options)?);
    }

    if args.probe {
        println!("{}", serde_json::to_string_pretty(&raisr::runtime_info())?);
    }

    if args.check_models {
        report_model_folder(&options)?;
    }

    if let Some((width, height)) = args.input {
        report_geometry(&options, args.format, width, height)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080").unwrap(), (1920, 1080));
        assert!(parse_dimensions("1920").is_err());
        assert!(parse_dimensions("0x1080").is_err());
        assert!(parse_dimensions("axb").is_err());
    }
}

use std::path::Path;
use std::sync::Arc;

use eyre::{ensure, Result, WrapErr};

use varsieve_core_rs::parallelism;
use varsieve_io_rs::compression::Compression;
use varsieve_io_rs::{regions, vcf, WriteRecord};
use varsieve_screen_rs::{Engine, Lookup, SampleReport, Screened};

use crate::cli::{ScreenArgs, ValidateArgs};
use crate::manifest;

pub fn screen(args: ScreenArgs) -> Result<()> {
    // Fail fast on malformed inputs before any pileup is generated
    let regions = regions::load(&args.regions)?;
    if regions.is_empty() {
        log::warn!("No regions found in {}", args.regions.display());
    }
    let lookup = Lookup::load(args.annotation.as_ref())?;
    let samples = manifest::load(&args.samples)?;

    let config = args.config();
    let sources = samples
        .iter()
        .map(|(name, path)| {
            config
                .source(path)
                .wrap_err_with(|| format!("Invalid input for sample {name}"))
                .map(|source| (name.clone(), source))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&args.outdir)
        .wrap_err_with(|| format!("Failed to create {}", args.outdir.display()))?;

    let mut engine = Engine::builder()
        .add_regions(regions)
        .set_lookup(Arc::new(lookup))
        .set_thread_pool(parallelism::pool(*config.threads())?)
        .build();
    let screened = engine.run(sources)?;

    let reported = write_reports(&screened, &args.outdir, Compression::from(args.compression))?;
    log::info!(
        "Screened {} samples, {} with variants",
        screened.len(),
        reported
    );
    Ok(())
}

/// Write a VCF for every sample with something to report. A failed sample doesn't stop the
/// remaining ones, the error is returned once all samples were attempted.
fn write_reports(screened: &[Screened], outdir: &Path, compression: Compression) -> Result<usize> {
    let (mut reported, mut failed) = (0, Vec::new());
    for result in screened {
        match result.report() {
            Some(report) => match write(report, outdir, compression) {
                Ok(()) => reported += 1,
                Err(err) => {
                    log::error!("{}: {err:?}", result.sample());
                    failed.push(result.sample().as_str());
                }
            },
            None => log::info!("{}: no variant detected", result.sample()),
        }
    }
    ensure!(
        failed.is_empty(),
        "Failed to write results for {} samples: {}",
        failed.len(),
        failed.join(", ")
    );
    Ok(reported)
}

fn write(report: &SampleReport, outdir: &Path, compression: Compression) -> Result<()> {
    let (path, mut writer) = vcf::Writer::create(outdir, report.sample(), compression)?;
    writer
        .write_records(report.records())
        .and_then(|_| writer.finish())
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    log::info!(
        "{}: {} records written to {}",
        report.sample(),
        report.records().len(),
        path.display()
    );
    Ok(())
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let regions = regions::load(&args.regions)?;
    println!("{}: {} regions", args.regions.display(), regions.len());

    if let Some(annotation) = &args.annotation {
        let lookup = Lookup::load(Some(annotation))?;
        println!("{}: {} annotated alleles", annotation.display(), lookup.len());
    }
    if let Some(path) = &args.samples {
        let samples = manifest::load(path)?;
        println!("{}: {} samples", path.display(), samples.len());
    }
    Ok(())
}

use std::path::PathBuf;
use std::process::exit;

use structopt::StructOpt;

use bozorth3::Format;

use crate::driver::{ComparePlan, Driver, DriverOptions, MatchMode};
use crate::lists::{items_from_file_or_directory, items_from_pairs, slice_by_range, Range};

mod cache;
mod driver;
mod lists;

/// Bozorth3 fingerprint template matcher
#[derive(StructOpt, Debug)]
#[structopt(name = "bz3")]
struct Options {
    /// All *.xyt files use representation according to ANSI INCITS 378-2004
    #[structopt(short = "a", long = "ansi")]
    use_ansi: bool,

    /// Matching mode; supported modes: all, first-match, all-matches
    #[structopt(short = "m", long = "match-mode", default_value = "all")]
    mode: MatchMode,

    /// Set match score threshold
    #[structopt(short = "t", long, default_value = "40")]
    threshold: u32,

    /// Only print the filenames between which match scores would be computed
    #[structopt(short = "d", long = "dry")]
    dry_run: bool,

    /// Set maximum number of minutiae to use from any file; allowed range 0-200
    #[structopt(short = "n", long, default_value = "150")]
    max_minutiae: u32,

    /// Number of threads to use
    #[structopt(short = "T", long, default_value = "1")]
    threads: usize,

    /// File containing list of pairs to compare, one file in each line
    #[structopt(short = "M", long = "pair-list")]
    pair_file: Option<PathBuf>,

    /// File containing list of probe files, or a directory
    #[structopt(short = "P", long = "probe-list")]
    probe_files: Option<PathBuf>,

    /// File containing list of gallery files, or a directory
    #[structopt(short = "G", long = "gallery-list")]
    gallery_files: Option<PathBuf>,

    /// Single probe file
    #[structopt(short = "p", long = "probe")]
    fixed_probe: Option<PathBuf>,

    /// Single gallery file
    #[structopt(short = "g", long = "gallery")]
    fixed_gallery: Option<PathBuf>,

    /// Subset of files in the probe list to process, 1-based inclusive A-B
    #[structopt(long)]
    probe_range: Option<Range>,

    /// Subset of files in the gallery list to process, 1-based inclusive A-B
    #[structopt(long)]
    gallery_range: Option<Range>,

    /// Print only scores without filenames (applicable only for -m 'all')
    #[structopt(short = "s", long)]
    only_scores: bool,

    /// Output file
    #[structopt(short = "o", long)]
    output: Option<PathBuf>,

    /// List of .xyt files
    inputs: Vec<PathBuf>,
}

fn validate(options: &Options) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if options.max_minutiae > 200 {
        errors.push("invalid number of computable minutiae");
    }
    if options.threads == 0
        || options.threads
            > std::thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(usize::MAX)
    {
        errors.push("invalid number of threads");
    }
    if options.pair_file.is_some() && options.probe_files.is_some() {
        errors.push(r#"flags "-M" and "-P" are incompatible"#);
    }
    if options.pair_file.is_some() && options.gallery_files.is_some() {
        errors.push(r#"flags "-M" and "-G" are incompatible"#);
    }
    if options.pair_file.is_some() && options.fixed_probe.is_some() {
        errors.push(r#"flags "-M" and "-p" are incompatible"#);
    }
    if options.pair_file.is_some() && options.fixed_gallery.is_some() {
        errors.push(r#"flags "-M" and "-g" are incompatible"#);
    }
    if options.probe_files.is_some() && options.fixed_probe.is_some() {
        errors.push(r#"flags "-P" and "-p" are incompatible"#);
    }
    if options.gallery_files.is_some() && options.fixed_gallery.is_some() {
        errors.push(r#"flags "-G" and "-g" are incompatible"#);
    }
    if options.mode != MatchMode::All && options.pair_file.is_some() {
        errors.push(r#"flag "-M" is not compatible with modes other than "all""#);
    }

    errors
}

/// Resolves the probe and gallery lists and the comparison plan from the
/// input flags.
fn resolve_inputs(options: &Options) -> anyhow::Result<(Vec<PathBuf>, Vec<PathBuf>, ComparePlan)> {
    let default_plan = if options.mode == MatchMode::All {
        ComparePlan::Product
    } else {
        ComparePlan::PerProbe
    };

    if let Some(pair_file) = &options.pair_file {
        let (probes, galleries) = items_from_pairs(pair_file)?;
        return Ok((probes, galleries, ComparePlan::OneToOne));
    }

    if let (Some(probe), Some(gallery)) = (&options.fixed_probe, &options.fixed_gallery) {
        return Ok((vec![probe.clone()], vec![gallery.clone()], default_plan));
    }

    if let Some(probe) = &options.fixed_probe {
        let galleries = if let Some(gallery_files) = &options.gallery_files {
            items_from_file_or_directory(gallery_files)?
        } else if !options.inputs.is_empty() {
            options.inputs.clone()
        } else {
            anyhow::bail!("missing gallery files");
        };
        return Ok((vec![probe.clone()], galleries, default_plan));
    }

    if let Some(gallery) = &options.fixed_gallery {
        let probes = if let Some(probe_files) = &options.probe_files {
            items_from_file_or_directory(probe_files)?
        } else if !options.inputs.is_empty() {
            options.inputs.clone()
        } else {
            anyhow::bail!("missing probe files");
        };
        return Ok((probes, vec![gallery.clone()], default_plan));
    }

    match (&options.probe_files, &options.gallery_files) {
        (Some(probe_files), Some(gallery_files)) => {
            let probes = items_from_file_or_directory(probe_files)?;
            let galleries = items_from_file_or_directory(gallery_files)?;
            Ok((probes, galleries, default_plan))
        }
        (Some(probe_files), None) if !options.inputs.is_empty() => {
            let probes = items_from_file_or_directory(probe_files)?;
            Ok((probes, options.inputs.clone(), default_plan))
        }
        (None, Some(gallery_files)) if !options.inputs.is_empty() => {
            let galleries = items_from_file_or_directory(gallery_files)?;
            Ok((options.inputs.clone(), galleries, default_plan))
        }
        (None, None) if !options.inputs.is_empty() => {
            if options.inputs.len() % 2 == 1 {
                anyhow::bail!("number of files to compare is odd");
            }
            let mut probes = Vec::with_capacity(options.inputs.len() / 2);
            let mut galleries = Vec::with_capacity(options.inputs.len() / 2);
            for (i, path) in options.inputs.iter().enumerate() {
                if i % 2 == 0 {
                    probes.push(path.clone());
                } else {
                    galleries.push(path.clone());
                }
            }
            Ok((probes, galleries, ComparePlan::OneToOne))
        }
        _ => anyhow::bail!("missing input data"),
    }
}

fn dry_run(probes: &[PathBuf], galleries: &[PathBuf], plan: ComparePlan) {
    match plan {
        ComparePlan::OneToOne => {
            for (probe, gallery) in probes.iter().zip(galleries.iter()) {
                println!("{} {}", probe.display(), gallery.display());
            }
        }
        ComparePlan::Product | ComparePlan::PerProbe => {
            for probe in probes {
                for gallery in galleries {
                    println!("{} {}", probe.display(), gallery.display());
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let options = Options::from_args();

    let errors = validate(&options);
    if !errors.is_empty() {
        eprintln!("Parsing errors:");
        for error in errors {
            eprintln!(" - {error}");
        }
        exit(1);
    }

    let (probes, galleries, plan) = resolve_inputs(&options)?;

    let probes = match options.probe_range {
        Some(range) => slice_by_range(&probes, range)
            .ok_or_else(|| anyhow::anyhow!("range for probes out of bounds"))?
            .to_vec(),
        None => probes,
    };
    let galleries = match options.gallery_range {
        Some(range) => slice_by_range(&galleries, range)
            .ok_or_else(|| anyhow::anyhow!("range for galleries out of bounds"))?
            .to_vec(),
        None => galleries,
    };

    if options.dry_run {
        dry_run(&probes, &galleries, plan);
        return Ok(());
    }

    let format = if options.use_ansi {
        Format::Ansi
    } else {
        Format::NistInternal
    };

    let mut driver = Driver::new(
        DriverOptions {
            mode: options.mode,
            threshold: options.threshold,
            only_scores: options.only_scores,
            format,
            threads: options.threads,
        },
        options.max_minutiae,
    )?;

    if let Some(path) = &options.output {
        let file = std::fs::File::create(path)?;
        let mut output = std::io::BufWriter::new(file);
        driver.run(plan, &probes, &galleries, &mut output)?;
    } else {
        let stdout = std::io::stdout();
        let mut output = std::io::BufWriter::new(stdout.lock());
        driver.run(plan, &probes, &galleries, &mut output)?;
    }

    Ok(())
}

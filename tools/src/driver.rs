//! Sequential and parallel match drivers.
//!
//! Work is submitted in chunks; a chunk's scores are computed (in parallel
//! when a thread pool is configured), then reported in submission order, so
//! output is deterministic either way. In first-match mode no further
//! chunks are submitted once a hit is seen; tasks already in flight run to
//! completion.

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use bozorth3::{match_templates, BozorthState, Format, PairHolder, Template};

use crate::cache::TemplateCache;

/// Tasks per submission chunk.
const CHUNK_SIZE: usize = 1000;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum MatchMode {
    All,
    FirstMatch,
    AllMatches,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MatchMode::All),
            "first-match" => Ok(MatchMode::FirstMatch),
            "all-matches" => Ok(MatchMode::AllMatches),
            other => Err(format!("unsupported match mode '{other}'")),
        }
    }
}

/// How the probe and gallery lists combine into match tasks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComparePlan {
    /// Zip the two lists.
    OneToOne,
    /// Full Cartesian product.
    Product,
    /// Scan the whole gallery per probe, reporting per-probe hits.
    PerProbe,
}

pub struct DriverOptions {
    pub mode: MatchMode,
    pub threshold: u32,
    pub only_scores: bool,
    pub format: Format,
    pub threads: usize,
}

pub struct Driver {
    options: DriverOptions,
    cache: TemplateCache,
    pool: Option<rayon::ThreadPool>,
}

thread_local! {
    static SCRATCH: RefCell<(PairHolder, BozorthState)> =
        RefCell::new((PairHolder::new(), BozorthState::new()));
}

/// One match on the calling thread's scratch.
fn score_one(probe: &Template, gallery: &Template, format: Format) -> u32 {
    SCRATCH.with(|scratch| {
        let (pairs, state) = &mut *scratch.borrow_mut();
        match_templates(probe, gallery, format, pairs, state)
    })
}

type Task = Option<(Arc<Template>, Arc<Template>)>;

impl Driver {
    pub fn new(options: DriverOptions, max_minutiae: u32) -> anyhow::Result<Driver> {
        let pool = if options.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(options.threads)
                    .build()?,
            )
        } else {
            None
        };
        let cache = TemplateCache::new(max_minutiae, options.format);
        Ok(Driver {
            options,
            cache,
            pool,
        })
    }

    pub fn run(
        &mut self,
        plan: ComparePlan,
        probes: &[PathBuf],
        galleries: &[PathBuf],
        output: &mut dyn Write,
    ) -> anyhow::Result<()> {
        match plan {
            ComparePlan::OneToOne => self.run_zipped(probes, galleries, output),
            ComparePlan::Product => self.run_product(probes, galleries, output),
            ComparePlan::PerProbe => self.run_per_probe(probes, galleries, output),
        }
    }

    /// A hit is anything in `all` mode, and a loaded score at or above the
    /// threshold otherwise.
    fn is_hit(&self, score: Option<u32>) -> bool {
        match self.options.mode {
            MatchMode::All => true,
            _ => score.is_some_and(|score| score >= self.options.threshold),
        }
    }

    fn write_result(
        &self,
        output: &mut dyn Write,
        probe: &str,
        gallery: &str,
        score: Option<u32>,
    ) -> anyhow::Result<()> {
        let score = score.map(|score| score as i64).unwrap_or(-1);
        if self.options.mode == MatchMode::All && self.options.only_scores {
            writeln!(output, "{score}")?;
        } else {
            writeln!(output, "{probe} {gallery} {score}")?;
        }
        Ok(())
    }

    /// Scores one chunk of tasks; `None` tasks (load failures) stay `None`.
    fn score_chunk(&self, tasks: &[Task]) -> Vec<Option<u32>> {
        let format = self.options.format;
        match &self.pool {
            Some(pool) => pool.install(|| {
                tasks
                    .par_iter()
                    .map(|task| {
                        task.as_ref()
                            .map(|(probe, gallery)| score_one(probe, gallery, format))
                    })
                    .collect()
            }),
            None => tasks
                .iter()
                .map(|task| {
                    task.as_ref()
                        .map(|(probe, gallery)| score_one(probe, gallery, format))
                })
                .collect(),
        }
    }

    fn run_zipped(
        &mut self,
        probes: &[PathBuf],
        galleries: &[PathBuf],
        output: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let items: Vec<_> = probes.iter().zip(galleries.iter()).collect();
        for chunk in items.chunks(CHUNK_SIZE) {
            let tasks: Vec<Task> = chunk
                .iter()
                .map(|(probe, gallery)| {
                    let probe = self.cache.get_or_load(probe)?;
                    let gallery = self.cache.get_or_load(gallery)?;
                    Some((probe, gallery))
                })
                .collect();

            let scores = self.score_chunk(&tasks);
            for ((probe, gallery), score) in chunk.iter().zip(scores) {
                if self.is_hit(score) {
                    self.write_result(
                        output,
                        &probe.display().to_string(),
                        &gallery.display().to_string(),
                        score,
                    )?;
                    if self.options.mode == MatchMode::FirstMatch {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    fn run_product(
        &mut self,
        probes: &[PathBuf],
        galleries: &[PathBuf],
        output: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let mut chunk: Vec<(&PathBuf, &PathBuf)> = Vec::with_capacity(CHUNK_SIZE);

        for probe in probes {
            for gallery in galleries {
                chunk.push((probe, gallery));
                if chunk.len() == CHUNK_SIZE {
                    self.flush_product_chunk(&mut chunk, output)?;
                }
            }
        }
        if !chunk.is_empty() {
            self.flush_product_chunk(&mut chunk, output)?;
        }
        Ok(())
    }

    fn flush_product_chunk(
        &mut self,
        chunk: &mut Vec<(&PathBuf, &PathBuf)>,
        output: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let tasks: Vec<Task> = chunk
            .iter()
            .map(|(probe, gallery)| {
                let probe = self.cache.get_or_load(probe)?;
                let gallery = self.cache.get_or_load(gallery)?;
                Some((probe, gallery))
            })
            .collect();

        let scores = self.score_chunk(&tasks);
        for ((probe, gallery), score) in chunk.iter().zip(scores) {
            self.write_result(
                output,
                &probe.display().to_string(),
                &gallery.display().to_string(),
                score,
            )?;
        }
        chunk.clear();
        Ok(())
    }

    fn run_per_probe(
        &mut self,
        probes: &[PathBuf],
        galleries: &[PathBuf],
        output: &mut dyn Write,
    ) -> anyhow::Result<()> {
        for probe_path in probes {
            let probe = self.cache.get_or_load(probe_path);
            let probe_name = probe_path.display().to_string();

            let mut hits: Vec<(String, u32)> = Vec::new();
            if let Some(probe) = probe {
                'chunks: for chunk in galleries.chunks(CHUNK_SIZE) {
                    let tasks: Vec<Task> = chunk
                        .iter()
                        .map(|gallery| {
                            let gallery = self.cache.get_or_load(gallery)?;
                            Some((probe.clone(), gallery))
                        })
                        .collect();

                    let scores = self.score_chunk(&tasks);
                    for (gallery, score) in chunk.iter().zip(scores) {
                        if self.is_hit(score) {
                            hits.push((gallery.display().to_string(), score.unwrap_or(0)));
                            if self.options.mode == MatchMode::FirstMatch {
                                break 'chunks;
                            }
                        }
                    }
                }
            }

            if hits.is_empty() {
                self.write_result(output, &probe_name, "-", None)?;
            } else {
                for (gallery, score) in hits {
                    self.write_result(output, &probe_name, &gallery, Some(score))?;
                }
            }
        }
        Ok(())
    }
}

//! Generation orchestrator
//!
//! Advances the store one generation at a time. Generation `n` is grown from
//! generation `n - 1`, deduplicated, written, and marked complete before work
//! on `n + 1` starts, so an interrupted run resumes from the last complete
//! generation and redoes only the one in flight.

use crate::dedup::{DedupStats, Deduplicator};
use crate::error::{PolycubeError, Result};
use crate::generation::Generation;
use crate::grid::Grid;
use crate::grow::Grower;
use crate::store::GenerationStore;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress of one generation, reported once per source shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Generation being built
    pub n: usize,
    /// Source shapes of generation `n - 1` grown so far
    pub processed: usize,
    pub total: usize,
    /// Representatives accepted so far
    pub accepted: usize,
}

/// Result of loading one stored generation, see [`Generator::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Intact { n: usize, shapes: usize },
    Corrupt { n: usize, reason: String },
}

type ProgressFn = Box<dyn FnMut(Progress)>;

/// Drives generation growth on top of a store.
pub struct Generator<S: GenerationStore> {
    store: S,
    verify_matches: bool,
    computed: Vec<usize>,
    on_progress: Option<ProgressFn>,
}

impl<S: GenerationStore> Generator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            verify_matches: true,
            computed: Vec::new(),
            on_progress: None,
        }
    }

    /// Toggle confirmation of fingerprint hits during dedup.
    pub fn with_verification(mut self, verify_matches: bool) -> Self {
        self.verify_matches = verify_matches;
        self
    }

    pub fn with_progress(mut self, on_progress: impl FnMut(Progress) + 'static) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Generations this generator grew (as opposed to read back), in order.
    pub fn computed(&self) -> &[usize] {
        &self.computed
    }

    /// Return generation `target`, computing and persisting any missing generations.
    ///
    /// A complete `target` is read back. Otherwise growth resumes from the end of
    /// the run of complete generations starting at 1, so a gap left by a discarded
    /// generation is filled before anything above it is reused.
    pub fn advance_to(&mut self, target: usize) -> Result<Generation> {
        if target == 0 {
            return Err(PolycubeError::InvalidTarget(target));
        }

        let complete = self.store.complete_generations()?;
        if complete.contains(&target) {
            debug!(target, "generation already complete");
            return Ok(Generation::new(target, self.store.get_generation(target)?));
        }

        let last = self.ensure_seeded(&complete)?;
        if target <= last {
            return Ok(Generation::new(target, self.store.get_generation(target)?));
        }

        let mut current = Generation::new(last, self.store.get_generation(last)?);
        info!(from = last, to = target, "resuming");

        for n in last + 1..=target {
            let started = Instant::now();
            let (next, stats) = self.grow_generation(&current)?;
            debug_assert_eq!(next.n, n);

            self.store.put_generation(n, &next.shapes)?;
            self.store.mark_complete(n)?;
            self.computed.push(n);

            info!(
                n,
                shapes = next.len(),
                candidates = stats.candidates,
                duplicates = stats.duplicates,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generation complete"
            );
            current = next;
        }

        Ok(current)
    }

    /// End of the unbroken run `1..=k` in `complete`, writing the seed when generation 1 is absent.
    fn ensure_seeded(&mut self, complete: &[usize]) -> Result<usize> {
        let prefix = complete
            .iter()
            .zip(1..)
            .take_while(|&(&n, expected)| n == expected)
            .count();
        if prefix > 0 {
            return Ok(prefix);
        }
        let seed = Generation::seed();
        self.store.put_generation(seed.n, &seed.shapes)?;
        self.store.mark_complete(seed.n)?;
        info!("seeded generation 1");
        Ok(seed.n)
    }

    fn grow_generation(&mut self, previous: &Generation) -> Result<(Generation, DedupStats)> {
        let verify_matches = self.verify_matches;
        match self.on_progress.as_mut() {
            Some(report) => next_generation_with(previous, verify_matches, report),
            None => next_generation_with(previous, verify_matches, |_| {}),
        }
    }

    /// Load every complete generation and report whether it is intact.
    ///
    /// Corrupt generations are reported, not returned as errors. Other errors abort the scan.
    pub fn check(&self) -> Result<Vec<Health>> {
        let mut report = Vec::new();
        for n in self.store.complete_generations()? {
            match self.store.get_generation(n) {
                Ok(shapes) => report.push(Health::Intact {
                    n,
                    shapes: shapes.len(),
                }),
                Err(PolycubeError::CorruptGeneration { n, reason }) => {
                    report.push(Health::Corrupt { n, reason })
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Discard corrupt generations along with every complete generation above the
    /// lowest corrupt one, which were grown from it.
    ///
    /// Returns the discarded generation numbers in ascending order.
    pub fn discard_corrupt(&mut self) -> Result<Vec<usize>> {
        let mut lowest = None;
        for health in self.check()? {
            if let Health::Corrupt { n, reason } = health {
                warn!(n, %reason, "corrupt generation");
                lowest.get_or_insert(n);
            }
        }
        let Some(lowest) = lowest else {
            return Ok(Vec::new());
        };

        let mut discarded = Vec::new();
        for n in self.store.complete_generations()? {
            if n >= lowest {
                self.store.discard_generation(n)?;
                discarded.push(n);
            }
        }
        warn!(lowest, ?discarded, "discarded generations for recompute");
        Ok(discarded)
    }
}

/// Grow and deduplicate `previous` into the next generation. Touches no store.
pub fn next_generation(previous: &Generation) -> Result<(Generation, DedupStats)> {
    next_generation_with(previous, true, |_| {})
}

fn next_generation_with(
    previous: &Generation,
    verify_matches: bool,
    mut on_progress: impl FnMut(Progress),
) -> Result<(Generation, DedupStats)> {
    let n = previous.n + 1;
    let total = previous.len();
    let mut deduplicator = Deduplicator::new().with_verification(verify_matches);

    for (i, shape) in previous.shapes.iter().enumerate() {
        for candidate in Grower::new(shape) {
            deduplicator.offer(candidate?);
        }
        on_progress(Progress {
            n,
            processed: i + 1,
            total,
            accepted: deduplicator.len(),
        });
    }

    let stats = deduplicator.stats();
    if stats.collisions > 0 {
        warn!(n, collisions = stats.collisions, "fingerprint collisions resolved");
    }
    let shapes: Vec<Grid> = deduplicator.into_shapes();
    Ok((Generation::new(n, shapes), stats))
}

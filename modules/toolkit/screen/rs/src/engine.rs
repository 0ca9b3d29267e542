use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::HashMap;
use eyre::{eyre, Result};
use rayon::ThreadPool;
use thread_local::ThreadLocal;

use varsieve_core_rs::loc::Region;
use varsieve_core_rs::source::Source;

use crate::lookup::Lookup;
use crate::report::Screened;
use crate::worker::Worker;

#[derive(Default)]
pub struct EngineBuilder {
    regions: Vec<Region>,
    lookup: Option<Arc<Lookup>>,
    thread_pool: Option<ThreadPool>,
}

impl EngineBuilder {
    pub fn add_regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.regions.extend(regions);
        self
    }

    pub fn set_lookup(mut self, lookup: Arc<Lookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn set_thread_pool(mut self, pool: ThreadPool) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            thread_pool: self.thread_pool,
            regions: self.regions,
            lookup: self.lookup.unwrap_or_default(),
            workers: ThreadLocal::new(),
        }
    }
}

/// Screens every (sample, region) pair in parallel. Each pair is an independent unit of work,
/// results are merged per sample once all units are done.
pub struct Engine {
    thread_pool: Option<ThreadPool>,
    regions: Vec<Region>,
    lookup: Arc<Lookup>,
    workers: ThreadLocal<RefCell<Worker>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn run(
        &mut self,
        samples: impl IntoIterator<Item = (String, Box<dyn Source>)>,
    ) -> Result<Vec<Screened>> {
        let (names, sources): (Vec<_>, Vec<_>) = samples.into_iter().unzip();
        match self.thread_pool.take() {
            Some(pool) => {
                let result = pool.install(|| self._run(names, sources));
                self.thread_pool = Some(pool);
                result
            }
            None => self._run(names, sources),
        }
    }

    fn _run(&mut self, names: Vec<String>, sources: Vec<Box<dyn Source>>) -> Result<Vec<Screened>> {
        // Soft-reset all workers
        for worker in self.workers.iter_mut() {
            worker.get_mut().reset();
        }

        let worker_sources: ThreadLocal<RefCell<HashMap<usize, Box<dyn Source>>>> =
            ThreadLocal::new();
        let has_failed = AtomicBool::new(false);

        let (workers, regions, lookup) = (&self.workers, &self.regions, &*self.lookup);
        let (worker_sources, has_failed_ref, sources_ref) =
            (&worker_sources, &has_failed, &sources);
        rayon::scope(|s| {
            for smplind in 0..sources_ref.len() {
                for (rgnind, region) in regions.iter().enumerate() {
                    // Stop scheduling if an error has occurred in any of the threads
                    if has_failed_ref.load(Ordering::Relaxed) {
                        return;
                    }

                    s.spawn(move |_| {
                        if has_failed_ref.load(Ordering::Relaxed) {
                            return;
                        }

                        // Thread-local copy of the sample source
                        let mut local_sources = worker_sources.get_or_default().borrow_mut();
                        let source = local_sources
                            .entry(smplind)
                            .or_insert_with(|| dyn_clone::clone_box(&*sources_ref[smplind]));

                        let mut worker = workers.get_or_default().borrow_mut();
                        let result =
                            worker.process(smplind, source.as_mut(), rgnind, region, lookup);

                        if let Err(err) = result {
                            has_failed_ref.store(true, Ordering::Relaxed);
                            log::error!("Screening failed: {:?}", err);
                        }
                    });
                }
            }
        });

        if has_failed.into_inner() {
            return Err(eyre!("Screening internal error. See log for details."));
        }

        let screened = Worker::aggregate(
            names,
            self.regions.len(),
            self.workers.iter_mut().map(|x| x.get_mut()),
        )?;
        for result in &screened {
            log::info!("{}", result.summary());
        }
        Ok(screened)
    }
}

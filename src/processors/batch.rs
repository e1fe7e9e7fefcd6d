use crate::core::{
    FileDescriptor, FileDescriptorInput, ImagerConfig, ImagerError, Preset, Result,
    VariantResults, MAX_IMAGES_IN_FLIGHT, MAX_VARIANTS_IN_FLIGHT, ORIGINAL_VARIANT,
};
use crate::outlets::{Outlet, OutletRef};
use crate::processors::SharedStep;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Maps `f` over `items` on `pool` with at most `limit` calls in flight.
///
/// Results keep the order of `items`. After the first error no new item is
/// started; items already running finish and their results are dropped.
pub(crate) fn try_map_bounded<T, R, F>(
    pool: &ThreadPool,
    limit: usize,
    items: &[T],
    f: F,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let first_error: Mutex<Option<ImagerError>> = Mutex::new(None);
    let slots: Vec<Mutex<Option<R>>> = items.iter().map(|_| Mutex::new(None)).collect();

    pool.scope(|scope| {
        for _ in 0..limit.clamp(1, items.len()) {
            scope.spawn(|_| {
                while !stop.load(Ordering::SeqCst) {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(index) else {
                        break;
                    };

                    match f(item) {
                        Ok(value) => *lock(&slots[index]) = Some(value),
                        Err(e) => {
                            stop.store(true, Ordering::SeqCst);
                            lock(&first_error).get_or_insert(e);
                            break;
                        }
                    }
                }
            });
        }
    });

    if let Some(e) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(e);
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .ok_or_else(|| ImagerError::ProcessingError("Unit finished without a result".to_string()))
        })
        .collect()
}

/// Runs presets over batches of images on two bounded worker pools.
pub struct BatchProcessor {
    image_pool: ThreadPool,
    variant_pool: ThreadPool,
}

impl BatchProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            image_pool: build_pool("imager-image", MAX_IMAGES_IN_FLIGHT)?,
            variant_pool: build_pool("imager-variant", MAX_IMAGES_IN_FLIGHT * MAX_VARIANTS_IN_FLIGHT)?,
        })
    }

    /// Applies `preset` to every image; results are in input order.
    pub fn process_images(
        &self,
        images: &[FileDescriptorInput],
        preset: &Preset,
        outlet: &dyn Outlet,
        config: &ImagerConfig,
    ) -> Result<Vec<VariantResults>> {
        log::info!(
            "Processing {} image(s) with preset \"{}\"",
            images.len(),
            preset.name()
        );

        let results = try_map_bounded(&self.image_pool, MAX_IMAGES_IN_FLIGHT, images, |input| {
            let outcome = FileDescriptor::new(input.clone(), config.mime_lookup())
                .and_then(|image| self.apply_preset(&image, preset, outlet, config));
            if let Err(e) = &outcome {
                log::warn!("Image {} failed: {}", input_label(input), e);
            }
            outcome
        })?;

        log::info!("Finished {} image(s)", results.len());
        Ok(results)
    }

    /// Every variant of `preset` for one image, plus `original` when kept.
    ///
    /// `original` is persisted only once all variants have succeeded.
    pub fn apply_preset(
        &self,
        image: &FileDescriptor,
        preset: &Preset,
        outlet: &dyn Outlet,
        config: &ImagerConfig,
    ) -> Result<VariantResults> {
        let units: Vec<(&str, &[SharedStep])> = preset.variants().iter().collect();

        let references = try_map_bounded(
            &self.variant_pool,
            MAX_VARIANTS_IN_FLIGHT,
            &units,
            |&(variant, steps)| run_variant(image, preset, variant, steps, outlet, config),
        )?;

        let mut results: VariantResults = units
            .iter()
            .map(|(variant, _)| variant.to_string())
            .zip(references)
            .collect();

        if preset.keep_original() {
            let original = run_variant(image, preset, ORIGINAL_VARIANT, &[], outlet, config)?;
            results.insert(ORIGINAL_VARIANT.to_string(), original);
        }

        Ok(results)
    }
}

/// Fresh handle, steps in order, then the outlet; the handle is dropped after.
fn run_variant(
    image: &FileDescriptor,
    preset: &Preset,
    variant: &str,
    steps: &[SharedStep],
    outlet: &dyn Outlet,
    config: &ImagerConfig,
) -> Result<OutletRef> {
    let mut handle = config
        .image_manipulator()
        .open(image.path())
        .map_err(|e| ImagerError::step_failure(variant, e))?;
    log::debug!("Opened {} for variant \"{}\"", image.path().display(), variant);

    for step in steps {
        log::debug!("{} [{}]: {}", image.name(), variant, step.describe());
        step.apply(handle.as_mut())
            .map_err(|e| ImagerError::step_failure(variant, e))?;
    }

    outlet
        .persist(handle.as_mut(), &preset.context(image, variant), config)
        .map_err(|e| ImagerError::outlet_failure(variant, e))
}

fn build_pool(name: &'static str, threads: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .map_err(|e| ImagerError::ProcessingError(format!("Failed to create thread pool: {}", e)))
}

fn input_label(input: &FileDescriptorInput) -> String {
    match input {
        FileDescriptorInput::Path(path) => path.display().to_string(),
        FileDescriptorInput::Upload(record) => record.name.clone(),
    }
}

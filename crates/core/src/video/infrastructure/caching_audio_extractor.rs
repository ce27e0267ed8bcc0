use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use crate::audio::domain::waveform::Waveform;
use crate::shared::constants::WAVEFORM_CACHE_CAPACITY;
use crate::shared::media_asset::MediaAsset;
use crate::video::domain::audio_extractor::{AudioExtractor, ExtractionError};

/// Identity of an asset on disk: a rewritten file gets a new key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AssetKey {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl AssetKey {
    fn of(asset: &MediaAsset) -> Option<Self> {
        let path = asset.path().canonicalize().ok()?;
        let meta = std::fs::metadata(&path).ok()?;
        Some(Self {
            path,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Default)]
struct Entries {
    waveforms: HashMap<AssetKey, Waveform>,
    /// Least recently used first.
    order: VecDeque<AssetKey>,
}

impl Entries {
    fn get(&mut self, key: &AssetKey) -> Option<Waveform> {
        let hit = self.waveforms.get(key)?.clone();
        self.touch(key);
        Some(hit)
    }

    fn insert(&mut self, key: AssetKey, waveform: Waveform, capacity: usize) {
        while self.waveforms.len() >= capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.waveforms.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.waveforms.insert(key, waveform);
    }

    fn touch(&mut self, key: &AssetKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// Reuses waveforms across runs that target the same unchanged file.
///
/// Holds at most `capacity` waveforms, evicting the least recently used.
/// Extraction runs while the cache lock is held, so a second run for the
/// same asset waits for the first and never sees a half-filled entry.
/// Files whose identity cannot be read bypass the cache.
pub struct CachingAudioExtractor {
    inner: Box<dyn AudioExtractor>,
    capacity: usize,
    cache: Mutex<Entries>,
}

impl CachingAudioExtractor {
    pub fn new(inner: Box<dyn AudioExtractor>) -> Self {
        Self::with_capacity(inner, WAVEFORM_CACHE_CAPACITY)
    }

    /// A `capacity` of 0 disables caching.
    pub fn with_capacity(inner: Box<dyn AudioExtractor>, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            cache: Mutex::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|c| c.waveforms.len()).unwrap_or(0)
    }
}

impl AudioExtractor for CachingAudioExtractor {
    fn extract(&self, asset: &MediaAsset) -> Result<Waveform, ExtractionError> {
        if self.capacity == 0 {
            return self.inner.extract(asset);
        }
        let Some(key) = AssetKey::of(asset) else {
            return self.inner.extract(asset);
        };

        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = cache.get(&key) {
            log::debug!("Reusing cached waveform for {}", key.path.display());
            return Ok(hit);
        }

        let waveform = self.inner.extract(asset)?;
        cache.insert(key, waveform.clone(), self.capacity);
        Ok(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl AudioExtractor for CountingExtractor {
        fn extract(&self, asset: &MediaAsset) -> Result<Waveform, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if asset.has_audio {
                Ok(Waveform::new(vec![0.5; 160], 16000, 1))
            } else {
                Err(ExtractionError::NoAudioTrack(asset.path.clone()))
            }
        }
    }

    fn asset(path: PathBuf, has_audio: bool) -> MediaAsset {
        MediaAsset {
            path,
            width: 16,
            height: 16,
            fps: 25.0,
            frame_rate: (25, 1),
            duration: 1.0,
            total_frames: 25,
            codec: String::new(),
            has_audio,
        }
    }

    fn extractor() -> (CachingAudioExtractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = CountingExtractor {
            calls: calls.clone(),
        };
        (CachingAudioExtractor::new(Box::new(inner)), calls)
    }

    #[test]
    fn test_second_extraction_of_same_file_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, b"video bytes").unwrap();
        let (cache, calls) = extractor();

        let first = cache.extract(&asset(path.clone(), true)).unwrap();
        let second = cache.extract(&asset(path, true)).unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_count(), 1);
    }

    #[test]
    fn test_modified_file_is_extracted_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, b"video bytes").unwrap();
        let (cache, calls) = extractor();

        cache.extract(&asset(path.clone(), true)).unwrap();
        std::fs::write(&path, b"different and longer video bytes").unwrap();
        cache.extract(&asset(path, true)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.mp4");
        std::fs::write(&path, b"video bytes").unwrap();
        let (cache, calls) = extractor();

        assert!(cache.extract(&asset(path.clone(), false)).is_err());
        assert!(cache.extract(&asset(path, false)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_count(), 0);
    }

    #[test]
    fn test_missing_file_bypasses_cache() {
        let (cache, calls) = extractor();
        let missing = PathBuf::from("/nonexistent/a.mp4");
        cache.extract(&asset(missing.clone(), true)).unwrap();
        cache.extract(&asset(missing, true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_count(), 0);
    }

    #[test]
    fn test_concurrent_runs_extract_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, b"video bytes").unwrap();
        let (cache, calls) = extractor();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let a = asset(path.clone(), true);
                std::thread::spawn(move || cache.extract(&a).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn write_assets(dir: &std::path::Path, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("clip{i}.mp4"));
                std::fs::write(&path, format!("video bytes {i}")).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_cache_never_grows_past_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachingAudioExtractor::with_capacity(
            Box::new(CountingExtractor {
                calls: calls.clone(),
            }),
            2,
        );

        for path in write_assets(dir.path(), 5) {
            cache.extract(&asset(path, true)).unwrap();
            assert!(cache.cached_count() <= 2);
        }
        assert_eq!(cache.cached_count(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_least_recently_used_entry_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_assets(dir.path(), 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachingAudioExtractor::with_capacity(
            Box::new(CountingExtractor {
                calls: calls.clone(),
            }),
            2,
        );

        cache.extract(&asset(paths[0].clone(), true)).unwrap();
        cache.extract(&asset(paths[1].clone(), true)).unwrap();
        // Touch the first so the second becomes the oldest.
        cache.extract(&asset(paths[0].clone(), true)).unwrap();
        cache.extract(&asset(paths[2].clone(), true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.extract(&asset(paths[0].clone(), true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        cache.extract(&asset(paths[1].clone(), true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_assets(dir.path(), 1).remove(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CachingAudioExtractor::with_capacity(
            Box::new(CountingExtractor {
                calls: calls.clone(),
            }),
            0,
        );

        cache.extract(&asset(path.clone(), true)).unwrap();
        cache.extract(&asset(path, true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_count(), 0);
    }

    #[test]
    fn test_cached_waveform_shares_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_assets(dir.path(), 1).remove(0);
        let (cache, _) = extractor();

        let first = cache.extract(&asset(path.clone(), true)).unwrap();
        let second = cache.extract(&asset(path, true)).unwrap();
        assert!(std::ptr::eq(first.samples().as_ptr(), second.samples().as_ptr()));
    }
}

//! Bounded-retry frame acquisition from a live video source.
//!
//! A [`VideoSource`] opens a [`CaptureDevice`]; [`StreamAcquisition`] reads
//! from it until one usable frame arrives or the retry budget runs out.
//! The device is held by a scoped guard, so it is released exactly once on
//! every exit path: success, exhaustion, or a read that errors out.

#[cfg(feature = "opencv")]
pub mod opencv_source;
pub mod synthetic;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{VisionError, VisionResult};
use crate::frame::{FrameSample, RawImage};
use crate::metrics;

#[cfg(feature = "opencv")]
pub use opencv_source::OpenCvSource;
pub use synthetic::SyntheticSource;

/// An opened capture handle.
pub trait CaptureDevice: Send {
    /// Read the next frame.
    ///
    /// `Ok(None)` means the device reported a failed grab; `Err` means the
    /// read itself blew up and acquisition should stop.
    fn read(&mut self) -> VisionResult<Option<RawImage>>;

    /// Release the underlying handle. Called exactly once per opened device.
    fn release(&mut self) -> VisionResult<()>;
}

/// Something that can be opened into a [`CaptureDevice`].
pub trait VideoSource: Send + Sync {
    /// Stable identifier, also used as the single-flight lock key.
    fn id(&self) -> &str;

    /// Open the source with the given timeouts.
    fn open(
        &self,
        open_timeout: Duration,
        read_timeout: Duration,
    ) -> VisionResult<Box<dyn CaptureDevice>>;
}

/// Open a source from its configured identifier.
///
/// `stub://...` selects the synthetic source; anything else is handed to
/// OpenCV (an integer is a local device index, otherwise a stream URL).
pub fn open_source(source_id: &str) -> VisionResult<Arc<dyn VideoSource>> {
    if source_id.starts_with(synthetic::STUB_SCHEME) {
        return Ok(Arc::new(SyntheticSource::parse(source_id)?));
    }

    #[cfg(feature = "opencv")]
    {
        Ok(Arc::new(OpenCvSource::new(source_id)))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Err(VisionError::invalid_config(format!(
            "Camera source '{}' requires the opencv feature",
            source_id
        )))
    }
}

/// Retry and timeout budget for one acquisition.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Maximum number of read attempts (at least 1)
    pub max_retries: u32,
    /// Wait between failed attempts
    pub retry_delay: Duration,
    /// Device open timeout
    pub open_timeout: Duration,
    /// Device read timeout
    pub read_timeout: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            open_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> VisionResult<()> {
        if self.max_retries == 0 {
            return Err(VisionError::invalid_config("max_retries must be at least 1"));
        }
        Ok(())
    }
}

/// Owns an opened device and releases it on drop.
struct DeviceGuard {
    device: Option<Box<dyn CaptureDevice>>,
    source_id: String,
}

impl DeviceGuard {
    fn new(device: Box<dyn CaptureDevice>, source_id: &str) -> Self {
        Self {
            device: Some(device),
            source_id: source_id.to_string(),
        }
    }

    fn read(&mut self) -> VisionResult<Option<RawImage>> {
        match self.device.as_mut() {
            Some(device) => device.read(),
            None => Err(VisionError::internal("Capture device already released")),
        }
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            match device.release() {
                Ok(()) => debug!(source = %self.source_id, "Capture device released"),
                Err(e) => warn!(source = %self.source_id, error = %e, "Failed to release capture device"),
            }
        }
    }
}

type PauseFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Grabs one usable frame from a source under a bounded-retry policy.
///
/// Blocking: call it from a worker thread, never from an async task.
#[derive(Clone)]
pub struct StreamAcquisition {
    source: Arc<dyn VideoSource>,
    config: AcquisitionConfig,
    pause: PauseFn,
}

impl StreamAcquisition {
    pub fn new(source: Arc<dyn VideoSource>, config: AcquisitionConfig) -> Self {
        Self {
            source,
            config,
            pause: Arc::new(std::thread::sleep),
        }
    }

    /// Replace the inter-attempt wait (tests count waits instead of sleeping).
    pub fn with_pause(mut self, pause: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.pause = Arc::new(pause);
        self
    }

    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    /// Open the source and return the first frame that reads successfully
    /// and carries a non-empty payload.
    ///
    /// Waits `retry_delay` between failed attempts, never after the last one.
    pub fn acquire(&self) -> VisionResult<FrameSample> {
        let source_id = self.source.id();
        let max_retries = self.config.max_retries;
        self.config.validate()?;

        let device = self
            .source
            .open(self.config.open_timeout, self.config.read_timeout)?;
        let mut guard = DeviceGuard::new(device, source_id);

        for attempt in 1..=max_retries {
            metrics::record_acquisition_attempt(source_id);

            match guard.read()? {
                Some(image) if !image.is_empty() => {
                    info!(
                        source = %source_id,
                        attempt,
                        width = image.width,
                        height = image.height,
                        "Frame acquired"
                    );
                    return Ok(FrameSample { image, attempt });
                }
                _ => {
                    warn!(source = %source_id, "Grab failed ({}/{}); retrying", attempt, max_retries);
                }
            }

            if attempt < max_retries {
                (self.pause)(self.config.retry_delay);
            }
        }

        Err(VisionError::AcquisitionExhausted {
            source_id: source_id.to_string(),
            attempts: max_retries,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted capture doubles shared by the crate's tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{CaptureDevice, VideoSource};
    use crate::error::{VisionError, VisionResult};
    use crate::frame::RawImage;

    /// What a scripted read does.
    #[derive(Debug, Clone)]
    pub enum Step {
        Frame(u8),
        Empty,
        Fail,
        Error,
    }

    /// Counters observed from outside the device.
    #[derive(Debug, Default)]
    pub struct Probe {
        pub opens: AtomicUsize,
        pub reads: AtomicUsize,
        pub releases: AtomicUsize,
        pub active: AtomicUsize,
        pub max_active: AtomicUsize,
    }

    impl Probe {
        pub fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Source whose every opened device replays the same script.
    pub struct ScriptedSource {
        pub id: String,
        pub script: Vec<Step>,
        pub read_delay: Duration,
        pub probe: Arc<Probe>,
        pub fail_open: bool,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Step>) -> Self {
            Self {
                id: "cam-test".to_string(),
                script,
                read_delay: Duration::ZERO,
                probe: Arc::new(Probe::default()),
                fail_open: false,
            }
        }

        pub fn with_read_delay(mut self, delay: Duration) -> Self {
            self.read_delay = delay;
            self
        }
    }

    impl VideoSource for ScriptedSource {
        fn id(&self) -> &str {
            &self.id
        }

        fn open(&self, _open: Duration, _read: Duration) -> VisionResult<Box<dyn CaptureDevice>> {
            if self.fail_open {
                return Err(VisionError::capture(&self.id, "cannot open"));
            }
            self.probe.opens.fetch_add(1, Ordering::SeqCst);
            let active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.max_active.fetch_max(active, Ordering::SeqCst);
            Ok(Box::new(ScriptedDevice {
                steps: self.script.clone().into(),
                read_delay: self.read_delay,
                probe: Arc::clone(&self.probe),
            }))
        }
    }

    struct ScriptedDevice {
        steps: VecDeque<Step>,
        read_delay: Duration,
        probe: Arc<Probe>,
    }

    impl CaptureDevice for ScriptedDevice {
        fn read(&mut self) -> VisionResult<Option<RawImage>> {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            if !self.read_delay.is_zero() {
                std::thread::sleep(self.read_delay);
            }
            let step = self.steps.pop_front().unwrap_or(Step::Fail);
            match step {
                Step::Frame(fill) => Ok(Some(RawImage::new(vec![fill; 4 * 4 * 3], 4, 4))),
                Step::Empty => Ok(Some(RawImage::new(Vec::new(), 0, 0))),
                Step::Fail => Ok(None),
                Step::Error => Err(VisionError::capture("cam-test", "decoder crashed")),
            }
        }

        fn release(&mut self) -> VisionResult<()> {
            self.probe.releases.fetch_add(1, Ordering::SeqCst);
            self.probe.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::testing::{Probe, ScriptedSource, Step};
    use super::*;

    fn acquisition(source: ScriptedSource, max_retries: u32) -> (StreamAcquisition, Arc<Probe>, Arc<AtomicUsize>) {
        let probe = Arc::clone(&source.probe);
        let waits = Arc::new(AtomicUsize::new(0));
        let waits_clone = Arc::clone(&waits);
        let config = AcquisitionConfig {
            max_retries,
            retry_delay: Duration::from_millis(250),
            ..Default::default()
        };
        let acq = StreamAcquisition::new(Arc::new(source), config).with_pause(move |delay| {
            assert_eq!(delay, Duration::from_millis(250));
            waits_clone.fetch_add(1, Ordering::SeqCst);
        });
        (acq, probe, waits)
    }

    #[test]
    fn test_succeeds_on_nth_attempt_for_every_n() {
        let max_retries = 5;
        for n in 1..=max_retries {
            let mut script = vec![Step::Fail; (n - 1) as usize];
            script.push(Step::Frame(n as u8));
            let (acq, probe, waits) = acquisition(ScriptedSource::new(script), max_retries);

            let frame = acq.acquire().unwrap();
            assert_eq!(frame.attempt, n);
            assert_eq!(frame.image.data[0], n as u8);
            assert_eq!(Probe::get(&probe.reads), n as usize);
            assert_eq!(waits.load(Ordering::SeqCst), (n - 1) as usize);
            assert_eq!(Probe::get(&probe.releases), 1);
        }
    }

    #[test]
    fn test_fifth_attempt_after_four_waits() {
        let script = vec![Step::Fail, Step::Empty, Step::Fail, Step::Fail, Step::Frame(7)];
        let (acq, probe, waits) = acquisition(ScriptedSource::new(script), 5);

        let frame = acq.acquire().unwrap();
        assert_eq!(frame.attempt, 5);
        assert_eq!(waits.load(Ordering::SeqCst), 4);
        assert_eq!(Probe::get(&probe.reads), 5);
    }

    #[test]
    fn test_exhaustion_releases_once() {
        let (acq, probe, waits) = acquisition(ScriptedSource::new(vec![Step::Fail; 10]), 3);

        let err = acq.acquire().unwrap_err();
        assert!(matches!(
            err,
            VisionError::AcquisitionExhausted { attempts: 3, .. }
        ));
        assert_eq!(Probe::get(&probe.reads), 3);
        assert_eq!(waits.load(Ordering::SeqCst), 2);
        assert_eq!(Probe::get(&probe.opens), 1);
        assert_eq!(Probe::get(&probe.releases), 1);
    }

    #[test]
    fn test_empty_payload_counts_as_failure() {
        let (acq, _probe, _waits) = acquisition(ScriptedSource::new(vec![Step::Empty; 2]), 2);
        assert!(matches!(
            acq.acquire(),
            Err(VisionError::AcquisitionExhausted { .. })
        ));
    }

    #[test]
    fn test_read_error_propagates_and_releases() {
        let script = vec![Step::Fail, Step::Error, Step::Frame(1)];
        let (acq, probe, _waits) = acquisition(ScriptedSource::new(script), 5);

        let err = acq.acquire().unwrap_err();
        assert!(matches!(err, VisionError::Capture { .. }));
        assert_eq!(Probe::get(&probe.reads), 2);
        assert_eq!(Probe::get(&probe.releases), 1);
    }

    #[test]
    fn test_open_failure_has_nothing_to_release() {
        let mut source = ScriptedSource::new(vec![Step::Frame(1)]);
        source.fail_open = true;
        let (acq, probe, _waits) = acquisition(source, 5);

        assert!(matches!(acq.acquire(), Err(VisionError::Capture { .. })));
        assert_eq!(Probe::get(&probe.releases), 0);
    }

    #[test]
    fn test_zero_retries_is_rejected() {
        let (acq, probe, _waits) = acquisition(ScriptedSource::new(vec![Step::Frame(1)]), 0);
        assert!(matches!(acq.acquire(), Err(VisionError::InvalidConfig(_))));
        assert_eq!(Probe::get(&probe.opens), 0);
    }

    #[test]
    fn test_open_source_selects_stub() {
        let source = open_source("stub://greenhouse").unwrap();
        assert_eq!(source.id(), "stub://greenhouse");
    }
}

//! Synthetic `stub://` source for development and tests.
//!
//! Produces flat gray frames without touching any hardware. Query options:
//! - `fail_first=N`: the first N reads of each opened device report failure
//! - `width=W`, `height=H`: frame size (default 640x480)
//! - `delay_ms=D`: every read blocks for D milliseconds, like a slow stream
//!
//! Example: `stub://greenhouse?fail_first=2&width=320&height=240`

use std::time::Duration;

use tracing::debug;

use super::{CaptureDevice, VideoSource};
use crate::error::{VisionError, VisionResult};
use crate::frame::RawImage;

/// URL scheme selecting the synthetic source.
pub const STUB_SCHEME: &str = "stub://";

const MAX_DIMENSION: u32 = 8192;

/// Synthetic frame source.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    id: String,
    fail_first: u32,
    width: u32,
    height: u32,
    read_delay: Duration,
}

impl SyntheticSource {
    /// Parse a `stub://name?opts` identifier.
    pub fn parse(source_id: &str) -> VisionResult<Self> {
        let rest = source_id
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| VisionError::invalid_config(format!("Not a stub source: {}", source_id)))?;

        let mut source = Self {
            id: source_id.to_string(),
            fail_first: 0,
            width: 640,
            height: 480,
            read_delay: Duration::ZERO,
        };

        let query = match rest.split_once('?') {
            Some((_, query)) => query,
            None => return Ok(source),
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| VisionError::invalid_config(format!("Malformed stub option '{}'", pair)))?;
            let parsed: u32 = value
                .parse()
                .map_err(|_| VisionError::invalid_config(format!("Stub option '{}' is not a number", key)))?;
            match key {
                "fail_first" => source.fail_first = parsed,
                "width" => source.width = parsed,
                "height" => source.height = parsed,
                "delay_ms" => source.read_delay = Duration::from_millis(parsed.into()),
                other => {
                    return Err(VisionError::invalid_config(format!(
                        "Unknown stub option '{}'",
                        other
                    )))
                }
            }
        }

        if source.width > MAX_DIMENSION || source.height > MAX_DIMENSION {
            return Err(VisionError::invalid_config(format!(
                "Stub frame size {}x{} exceeds {}x{}",
                source.width, source.height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(source)
    }
}

impl VideoSource for SyntheticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, _open_timeout: Duration, _read_timeout: Duration) -> VisionResult<Box<dyn CaptureDevice>> {
        debug!(source = %self.id, "Opening synthetic source");
        Ok(Box::new(SyntheticDevice {
            remaining_failures: self.fail_first,
            width: self.width,
            height: self.height,
            read_delay: self.read_delay,
        }))
    }
}

struct SyntheticDevice {
    remaining_failures: u32,
    width: u32,
    height: u32,
    read_delay: Duration,
}

impl CaptureDevice for SyntheticDevice {
    fn read(&mut self) -> VisionResult<Option<RawImage>> {
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }
        if self.remaining_failures > 0 {
            self.remaining_failures -= 1;
            return Ok(None);
        }
        let len = RawImage::rgb_len(self.width, self.height)
            .ok_or_else(|| VisionError::internal("Stub frame size overflows"))?;
        Ok(Some(RawImage::new(vec![128; len], self.width, self.height)))
    }

    fn release(&mut self) -> VisionResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let source = SyntheticSource::parse("stub://field").unwrap();
        assert_eq!(source.id(), "stub://field");
        assert_eq!((source.width, source.height, source.fail_first), (640, 480, 0));
    }

    #[test]
    fn test_parse_options() {
        let source = SyntheticSource::parse("stub://field?fail_first=2&width=8&height=6").unwrap();
        assert_eq!((source.width, source.height, source.fail_first), (8, 6, 2));

        let slow = SyntheticSource::parse("stub://field?delay_ms=250").unwrap();
        assert_eq!(slow.read_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_rejects_unknown_option() {
        assert!(SyntheticSource::parse("stub://field?fps=3").is_err());
        assert!(SyntheticSource::parse("stub://field?width=wide").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_frames() {
        assert!(SyntheticSource::parse("stub://field?width=4000000000&height=4000000000").is_err());
        assert!(SyntheticSource::parse("stub://field?width=8193").is_err());
        assert!(SyntheticSource::parse("stub://field?width=8192&height=8192").is_ok());
    }

    #[test]
    fn test_fail_first_then_frames() {
        let source = SyntheticSource::parse("stub://field?fail_first=1&width=2&height=2").unwrap();
        let mut device = source.open(Duration::ZERO, Duration::ZERO).unwrap();
        assert!(device.read().unwrap().is_none());
        let frame = device.read().unwrap().unwrap();
        assert_eq!(frame.data.len(), 12);
        device.release().unwrap();
    }
}

//! Async entry point for photo analysis.
//!
//! The pipeline is blocking (camera I/O, ONNX inference), so it runs on
//! tokio's blocking pool, gated by a semaphore sized by `workers`. The source
//! lease is taken before a worker slot, and given back as soon as the frame
//! is in hand, so inference never holds the camera.

use std::sync::Arc;
use std::time::Instant;

use farm_models::AnalysisReport;
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::aggregate::AggregatedCount;
use crate::error::{VisionError, VisionResult};
use crate::metrics;
use crate::pipeline::InspectionPipeline;
use crate::source_lock::{SingleFlightPolicy, SourceLocks};

/// Concurrency settings for analysis runs.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Maximum concurrent pipeline runs on the blocking pool
    pub workers: usize,
    /// Behaviour when the camera is already in use
    pub single_flight: SingleFlightPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            single_flight: SingleFlightPolicy::default(),
        }
    }
}

pub struct AnalysisOrchestrator {
    pipeline: Arc<InspectionPipeline>,
    workers: Arc<Semaphore>,
    locks: SourceLocks,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(pipeline: InspectionPipeline, config: OrchestratorConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            workers: Arc::new(Semaphore::new(config.workers.max(1))),
            locks: SourceLocks::new(),
            config,
        }
    }

    pub fn source_id(&self) -> &str {
        self.pipeline.source_id()
    }

    pub fn model_count(&self) -> usize {
        self.pipeline.ensemble().len()
    }

    /// Whether an acquisition currently holds the camera.
    pub async fn is_busy(&self) -> bool {
        self.locks.is_held(self.pipeline.source_id()).await
    }

    /// Capture a frame, run all models on it, and count what they found.
    pub async fn analyze(&self) -> VisionResult<AnalysisReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id, source = %self.pipeline.source_id());
        let start = Instant::now();

        let counts = self.run().instrument(span.clone()).await;

        let elapsed = start.elapsed().as_secs_f64();
        span.in_scope(|| match counts {
            Ok(counts) => {
                let report = counts.to_report();
                metrics::record_analysis("success", elapsed, counts.total());
                info!(result = ?report.result, duration_ms = (elapsed * 1000.0) as u64, "Analysis completed");
                Ok(report)
            }
            Err(e) => {
                metrics::record_analysis(e.kind(), elapsed, 0);
                warn!(error = %e, kind = e.kind(), "Analysis failed");
                Err(e)
            }
        })
    }

    async fn run(&self) -> VisionResult<AggregatedCount> {
        let lease = self
            .locks
            .acquire(self.pipeline.source_id(), self.config.single_flight)
            .await?;

        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| VisionError::internal("Analysis worker pool closed"))?;

        let pipeline = Arc::clone(&self.pipeline);
        let span = Span::current();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _entered = span.enter();

            let frame = pipeline.capture();
            drop(lease);
            let frame = frame?;

            pipeline.detect(&frame)
        })
        .await
        .map_err(|e| VisionError::internal(format!("Analysis worker failed: {}", e)))?
    }
}

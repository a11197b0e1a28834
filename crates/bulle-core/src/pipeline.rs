use std::sync::Arc;
use std::time::Duration;

use bulle_config::Config;
use bulle_ocr::{CaptureError, DetectError, FrameSource, TextDetector};
use bulle_translator::{LanguageIdentifier, TranslateError, Translation, Translator, TranslatorFactory};
use bulle_types::{
    AppEvent, DetectedBlock, Frame, LanguageCode, LanguagePair, PipelineStatus, Rect, ResolvedPair,
    SourceLanguage, TextBlock, TranslationOutcome, TranslationResult,
};
use bulle_ui::SurfacePresenter;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::gate::CaptureGate;
use crate::preprocess::usable_blocks;
use crate::slot::{Acquire, Configured, Lease, TranslatorSlot};

/// Everything the pipeline talks to, as capabilities
#[derive(Clone)]
pub struct Collaborators {
    pub frame_source: Arc<dyn FrameSource>,
    pub detector: Arc<dyn TextDetector>,
    pub translators: Arc<dyn TranslatorFactory>,
    /// Needed only when the source language is `auto`
    pub identifier: Option<Arc<dyn LanguageIdentifier>>,
    pub presenter: Arc<dyn SurfacePresenter>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stuck_threshold: Duration,
    pub capture_delay: Duration,
    pub label_ttl: Duration,
    /// Source used for `auto` when no identifier is available
    pub fallback_source: LanguageCode,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stuck_threshold: Duration::from_millis(config.capture.stuck_threshold_ms),
            capture_delay: Duration::from_millis(config.capture.capture_delay_ms),
            label_ttl: Duration::from_millis(config.overlay.label_ttl_ms),
            fallback_source: config.translator.fallback_source.clone(),
        }
    }
}

/// One block on its way to the translator
#[derive(Debug, Clone)]
pub struct PendingTranslation {
    pub request: u64,
    pub bounds: Rect,
    pub text: String,
    /// Pair active when the block was submitted
    pub pair: ResolvedPair,
    /// 0 for the first call, 1 for the retry after an invalidated translator
    pub attempt: u8,
}

#[derive(Debug)]
pub struct TranslationCompletion {
    pub work: PendingTranslation,
    pub generation: u64,
    pub result: Result<Translation, TranslateError>,
}

/// Inputs of the control loop: external commands and stage completions
pub enum PipelineMessage {
    Trigger,
    SetLanguagePair(LanguagePair),
    FrameCaptured {
        request: u64,
        result: Result<Option<Frame>, CaptureError>,
    },
    TextDetected {
        request: u64,
        result: Result<Vec<DetectedBlock>, DetectError>,
    },
    LanguageIdentified {
        request: u64,
        pair: LanguagePair,
        blocks: Vec<TextBlock>,
        result: Result<LanguageCode, TranslateError>,
    },
    TranslatorConfigured {
        generation: u64,
        pair: ResolvedPair,
        result: Result<Arc<dyn Translator>, TranslateError>,
    },
    Translated(TranslationCompletion),
    Shutdown,
}

/// Sending side of the control loop, handed to the trigger and the language picker
#[derive(Clone)]
pub struct PipelineHandle {
    tx: AsyncSender<PipelineMessage>,
}

impl PipelineHandle {
    pub fn on_trigger_tap(&self) -> Result<(), PipelineError> {
        self.send(PipelineMessage::Trigger)
    }

    pub fn set_language_pair(
        &self,
        source: SourceLanguage,
        target: impl Into<LanguageCode>,
    ) -> Result<(), PipelineError> {
        self.send(PipelineMessage::SetLanguagePair(LanguagePair::new(
            source, target,
        )))
    }

    pub fn shutdown(&self) -> Result<(), PipelineError> {
        self.send(PipelineMessage::Shutdown)
    }

    fn send(&self, message: PipelineMessage) -> Result<(), PipelineError> {
        match self.tx.try_send(message) {
            Ok(_) => Ok(()),
            Err(_) => Err(PipelineError::ChannelClosed),
        }
    }
}

/// Capture, recognize, translate, render.
///
/// All state lives here and is only touched from the loop in [`Pipeline::run`].
/// Every stage runs as its own task and posts its completion back to the loop,
/// so a trigger that arrives mid-cycle meets a held gate instead of a busy loop.
pub struct Pipeline {
    settings: PipelineSettings,
    pair: LanguagePair,
    gate: CaptureGate,
    slot: TranslatorSlot<PendingTranslation>,
    collaborators: Collaborators,
    tx: AsyncSender<PipelineMessage>,
    status_tx: AsyncSender<AppEvent>,
    /// Factory calls whose result has not come back yet
    configuring: usize,
    shut_down: bool,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        pair: LanguagePair,
        collaborators: Collaborators,
        status_tx: AsyncSender<AppEvent>,
    ) -> (Self, AsyncReceiver<PipelineMessage>) {
        let (tx, rx) = kanal::unbounded_async();
        let pipeline = Self {
            gate: CaptureGate::new(settings.stuck_threshold),
            settings,
            pair,
            slot: TranslatorSlot::new(),
            collaborators,
            tx,
            status_tx,
            configuring: 0,
            shut_down: false,
        };
        (pipeline, rx)
    }

    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    pub fn language_pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Drive the pipeline until shutdown, cancellation, or loss of the capture source
    pub async fn run(
        mut self,
        inbox: AsyncReceiver<PipelineMessage>,
        cancel: CancellationToken,
    ) -> Result<(), PipelineError> {
        tracing::info!("[PIPELINE] running, language pair {}", self.pair);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.shutdown();
                    self.drain_configurations(&inbox).await;
                    return Ok(());
                }
                message = inbox.recv() => {
                    let message = message.map_err(|_| PipelineError::ChannelClosed)?;
                    if let Err(e) = self.dispatch(message) {
                        self.shutdown();
                        self.drain_configurations(&inbox).await;
                        return Err(e);
                    }
                    if self.shut_down {
                        self.drain_configurations(&inbox).await;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Wait out factory calls still running at shutdown so their translators get closed
    async fn drain_configurations(&mut self, inbox: &AsyncReceiver<PipelineMessage>) {
        while self.configuring > 0 {
            tracing::debug!("[PIPELINE] waiting for {} translator(s) to close", self.configuring);
            let Ok(message) = inbox.recv().await else {
                break;
            };
            if self.dispatch(message).is_err() {
                break;
            }
        }
    }

    /// Apply one message on the control loop
    pub fn dispatch(&mut self, message: PipelineMessage) -> Result<(), PipelineError> {
        if self.shut_down {
            // Only translators created after shutdown still need closing
            if let PipelineMessage::TranslatorConfigured {
                generation, result, ..
            } = message
            {
                self.configuring = self.configuring.saturating_sub(1);
                self.slot.configured(generation, result);
            }
            return Ok(());
        }

        match message {
            PipelineMessage::Trigger => {
                self.run_cycle();
            }
            PipelineMessage::SetLanguagePair(pair) => self.set_language_pair(pair),
            PipelineMessage::FrameCaptured { request, result } => {
                self.on_frame_captured(request, result)?
            }
            PipelineMessage::TextDetected { request, result } => {
                self.on_text_detected(request, result)
            }
            PipelineMessage::LanguageIdentified {
                request,
                pair,
                blocks,
                result,
            } => self.on_language_identified(request, pair, blocks, result),
            PipelineMessage::TranslatorConfigured {
                generation,
                pair,
                result,
            } => self.on_translator_configured(generation, pair, result),
            PipelineMessage::Translated(completion) => self.on_translated(completion),
            PipelineMessage::Shutdown => self.shutdown(),
        }
        Ok(())
    }

    /// Start a cycle now; returns whether the gate admitted it
    pub fn run_cycle(&mut self) -> bool {
        self.run_cycle_at(Instant::now())
    }

    pub fn run_cycle_at(&mut self, now: Instant) -> bool {
        if self.shut_down || !self.gate.try_admit(now) {
            return false;
        }
        let Some(request) = self.gate.current() else {
            return false;
        };
        tracing::debug!("[PIPELINE] cycle {} admitted", request.seq);

        let source = self.collaborators.frame_source.clone();
        let delay = self.settings.capture_delay;
        let tx = self.tx.clone();
        let seq = request.seq;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = tokio::task::spawn_blocking(move || source.acquire())
                .await
                .unwrap_or_else(|e| Err(CaptureError::Backend(format!("capture task failed: {e}"))));
            post(&tx, PipelineMessage::FrameCaptured {
                request: seq,
                result,
            })
            .await;
        });
        true
    }

    pub fn set_language_pair(&mut self, pair: LanguagePair) {
        if pair == self.pair {
            return;
        }
        tracing::info!("[PIPELINE] language pair {} -> {}", self.pair, pair);
        self.pair = pair;
        self.slot.invalidate_all();
    }

    /// Release every collaborator and force the gate idle; safe mid-cycle
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        tracing::info!("[PIPELINE] shutting down");
        self.shut_down = true;
        self.gate.release();
        self.slot.shutdown();
        self.collaborators.frame_source.close();
        self.collaborators.detector.close();
    }

    fn on_frame_captured(
        &mut self,
        request: u64,
        result: Result<Option<Frame>, CaptureError>,
    ) -> Result<(), PipelineError> {
        let frame = match result {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.release(request);
                self.report(PipelineStatus::CaptureUnavailable { request });
                return Ok(());
            }
            Err(e) if e.is_fatal() => {
                self.release(request);
                self.report(PipelineStatus::SourceLost {
                    reason: e.to_string(),
                });
                return Err(PipelineError::SourceLost(e));
            }
            Err(e) => {
                tracing::warn!("[PIPELINE] cycle {}: {}", request, e);
                self.release(request);
                self.report(PipelineStatus::CaptureUnavailable { request });
                return Ok(());
            }
        };

        tracing::debug!(
            "[PIPELINE] cycle {}: frame {}x{}",
            request,
            frame.width(),
            frame.height()
        );

        let detector = self.collaborators.detector.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The frame is moved into the detector and dropped with its call
            let result = detector.detect(frame).await;
            post(&tx, PipelineMessage::TextDetected { request, result }).await;
        });
        Ok(())
    }

    fn on_text_detected(&mut self, request: u64, result: Result<Vec<DetectedBlock>, DetectError>) {
        let blocks = match result {
            Ok(blocks) => usable_blocks(blocks),
            Err(e) => {
                self.release(request);
                self.report(PipelineStatus::RecognitionFailed {
                    request,
                    reason: e.to_string(),
                });
                return;
            }
        };

        if blocks.is_empty() {
            self.release(request);
            self.report(PipelineStatus::NoTextDetected { request });
            return;
        }

        tracing::debug!("[PIPELINE] cycle {}: {} blocks", request, blocks.len());

        if let SourceLanguage::Code(_) = self.pair.source {
            let pair = self.pair.resolve("");
            self.translate_blocks(request, blocks, pair);
            return;
        }

        let Some(identifier) = self.collaborators.identifier.clone() else {
            let pair = self.pair.resolve(&self.settings.fallback_source);
            self.translate_blocks(request, blocks, pair);
            return;
        };

        let pair = self.pair.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let sample = blocks
                .iter()
                .map(TextBlock::text)
                .collect::<Vec<_>>()
                .join(" ");
            let result = identifier.identify(&sample).await;
            post(&tx, PipelineMessage::LanguageIdentified {
                request,
                pair,
                blocks,
                result,
            })
            .await;
        });
    }

    fn on_language_identified(
        &mut self,
        request: u64,
        pair: LanguagePair,
        blocks: Vec<TextBlock>,
        result: Result<LanguageCode, TranslateError>,
    ) {
        match result {
            Ok(code) => {
                tracing::debug!("[PIPELINE] cycle {}: identified {}", request, code);
                self.translate_blocks(request, blocks, pair.resolve(&code));
            }
            Err(TranslateError::Undetermined(reason)) => {
                tracing::debug!(
                    "[PIPELINE] cycle {}: {}, assuming {}",
                    request,
                    reason,
                    self.settings.fallback_source
                );
                let resolved = pair.resolve(&self.settings.fallback_source);
                self.translate_blocks(request, blocks, resolved);
            }
            Err(e) => {
                self.release(request);
                self.report(PipelineStatus::LanguageUnidentified {
                    request,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Submit every block, then free the gate without waiting for the results
    fn translate_blocks(&mut self, request: u64, blocks: Vec<TextBlock>, pair: ResolvedPair) {
        for block in blocks {
            self.submit(PendingTranslation {
                request,
                bounds: block.bounds(),
                text: block.text().to_string(),
                pair: pair.clone(),
                attempt: 0,
            });
        }
        self.release(request);
    }

    fn submit(&mut self, work: PendingTranslation) {
        let pair = work.pair.clone();
        match self.slot.acquire(&pair, work) {
            Acquire::Ready(lease, work) => self.spawn_translation(lease, work),
            Acquire::Queued => {}
            Acquire::Configure { generation, pair } => {
                self.configuring += 1;
                let factory = self.collaborators.translators.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = factory.create(&pair).await;
                    post(&tx, PipelineMessage::TranslatorConfigured {
                        generation,
                        pair,
                        result,
                    })
                    .await;
                });
            }
        }
    }

    fn spawn_translation(&self, lease: Lease, work: PendingTranslation) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = lease.translator.translate(&work.text).await;
            post(&tx, PipelineMessage::Translated(TranslationCompletion {
                work,
                generation: lease.generation,
                result,
            }))
            .await;
        });
    }

    fn on_translator_configured(
        &mut self,
        generation: u64,
        pair: ResolvedPair,
        result: Result<Arc<dyn Translator>, TranslateError>,
    ) {
        self.configuring = self.configuring.saturating_sub(1);
        match self.slot.configured(generation, result) {
            Configured::Ready(leases) => {
                tracing::info!("[PIPELINE] translator {} ready for {}", generation, pair);
                for (lease, work) in leases {
                    self.spawn_translation(lease, work);
                }
            }
            Configured::Failed { error, waiting } => {
                let reason = error.to_string();
                self.report(PipelineStatus::TranslatorUnavailable {
                    pair,
                    reason: reason.clone(),
                });
                // A failed reconfiguration is also a failed retry
                for work in waiting.into_iter().filter(|work| work.attempt > 0) {
                    self.render(TranslationResult {
                        request: work.request,
                        bounds: work.bounds,
                        outcome: TranslationOutcome::Failed(reason.clone()),
                    });
                }
            }
            Configured::Stale => {
                tracing::debug!("[PIPELINE] dropped stale translator {}", generation);
            }
        }
    }

    fn on_translated(&mut self, completion: TranslationCompletion) {
        let TranslationCompletion {
            mut work,
            generation,
            result,
        } = completion;
        self.slot.finish(generation);

        let outcome = match result {
            Ok(translation) => TranslationOutcome::Translated(translation.text),
            Err(TranslateError::Closed) if work.attempt == 0 => {
                tracing::debug!(
                    "[PIPELINE] translator {} closed, retrying block of cycle {}",
                    generation,
                    work.request
                );
                self.slot.invalidate(generation);
                work.pair = self.pair.resolve(&work.pair.source);
                work.attempt += 1;
                self.submit(work);
                return;
            }
            Err(e) => {
                if matches!(e, TranslateError::Closed) {
                    self.slot.invalidate(generation);
                }
                TranslationOutcome::Failed(e.to_string())
            }
        };

        self.render(TranslationResult {
            request: work.request,
            bounds: work.bounds,
            outcome,
        });
    }

    fn render(&self, result: TranslationResult) {
        match result.outcome {
            TranslationOutcome::Translated(text) => {
                self.collaborators
                    .presenter
                    .show(result.bounds, &text, self.settings.label_ttl);
            }
            TranslationOutcome::Failed(reason) => {
                self.report(PipelineStatus::TranslationFailed {
                    request: result.request,
                    bounds: result.bounds,
                    reason,
                });
            }
        }
    }

    /// Release the gate only if cycle `request` still owns it
    fn release(&mut self, request: u64) {
        if self.gate.holds(request) {
            self.gate.release();
        } else {
            tracing::debug!("[PIPELINE] cycle {} no longer holds the gate", request);
        }
    }

    fn report(&self, status: PipelineStatus) {
        if status.is_error() {
            tracing::warn!("[PIPELINE] {}", status);
        } else {
            tracing::info!("[PIPELINE] {}", status);
        }

        match self.status_tx.try_send(AppEvent::Status(status)) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("[PIPELINE] status queue full"),
            Err(_) => tracing::debug!("[PIPELINE] status receiver gone"),
        }
    }
}

async fn post(tx: &AsyncSender<PipelineMessage>, message: PipelineMessage) {
    if tx.send(message).await.is_err() {
        tracing::debug!("[PIPELINE] control loop gone, dropping completion");
    }
}

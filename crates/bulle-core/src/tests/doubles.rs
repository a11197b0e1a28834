use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bulle_ocr::{CaptureError, DetectError, FrameSource, TextDetector};
use bulle_translator::{LanguageIdentifier, TranslateError, Translation, Translator, TranslatorFactory};
use bulle_types::{
    AppEvent, DetectedBlock, Frame, LanguageCode, LanguagePair, PipelineStatus, PixelFormat, Rect,
    ResolvedPair,
};
use bulle_ui::SurfacePresenter;
use kanal::AsyncReceiver;
use tokio::sync::Notify;

use crate::{Collaborators, Pipeline, PipelineError, PipelineMessage, PipelineSettings};

#[derive(Debug, Clone, Copy)]
pub enum SourceMode {
    Frames,
    Empty,
    Fail { fatal: bool },
}

pub struct FakeFrameSource {
    mode: SourceMode,
    acquired: AtomicUsize,
    closed: AtomicBool,
}

impl FakeFrameSource {
    pub fn new(mode: SourceMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            acquired: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl FrameSource for FakeFrameSource {
    fn acquire(&self) -> Result<Option<Frame>, CaptureError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            SourceMode::Frames => Ok(Some(Frame::new(vec![0; 64], 4, 4, PixelFormat::Rgba8))),
            SourceMode::Empty => Ok(None),
            SourceMode::Fail { fatal: true } => {
                Err(CaptureError::Stopped("projection revoked".into()))
            }
            SourceMode::Fail { fatal: false } => Err(CaptureError::Backend("busy".into())),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Returns queued responses in call order, then empty results
#[derive(Default)]
pub struct ScriptedDetector {
    responses: Mutex<VecDeque<Result<Vec<DetectedBlock>, DetectError>>>,
    holds: Mutex<HashMap<usize, Arc<Notify>>>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

impl ScriptedDetector {
    pub fn new(responses: Vec<Result<Vec<DetectedBlock>, DetectError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    /// Every call returns the same blocks
    pub fn repeating(blocks: Vec<DetectedBlock>, times: usize) -> Arc<Self> {
        Self::new((0..times).map(|_| Ok(blocks.clone())).collect())
    }

    /// Call number `index` (from 0) waits until the returned notify fires
    pub fn hold_call(&self, index: usize) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.lock().unwrap().insert(index, notify.clone());
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TextDetector for ScriptedDetector {
    async fn detect(&self, frame: Frame) -> Result<Vec<DetectedBlock>, DetectError> {
        assert!(frame.is_valid());
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().pop_front();
        let hold = self.holds.lock().unwrap().remove(&index);

        if let Some(notify) = hold {
            notify.notified().await;
        }
        response.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// How the next translator built by [`FakeFactory`] behaves
#[derive(Default, Clone)]
pub struct TranslatorSpec {
    pub rejects_as_closed: bool,
    pub failing: Vec<String>,
    pub hold: Option<(String, Arc<Notify>)>,
}

pub struct FakeTranslator {
    pair: ResolvedPair,
    rejects_as_closed: bool,
    failing: HashSet<String>,
    hold: Mutex<Option<(String, Arc<Notify>)>>,
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeTranslator {
    pub fn new(pair: ResolvedPair) -> Arc<Self> {
        Self::with_spec(pair, TranslatorSpec::default())
    }

    pub fn with_spec(pair: ResolvedPair, spec: TranslatorSpec) -> Arc<Self> {
        Arc::new(Self {
            pair,
            rejects_as_closed: spec.rejects_as_closed,
            failing: spec.failing.into_iter().collect(),
            hold: Mutex::new(spec.hold),
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn render(&self, text: &str) -> String {
        let known = match (self.pair.target.as_str(), text) {
            ("en", "Bonjour" | "Hola") => Some("Hello"),
            ("en", "Merci" | "Gracias") => Some("Thanks"),
            _ => None,
        };
        known
            .map(str::to_string)
            .unwrap_or_else(|| format!("[{}] {}", self.pair.target, text))
    }
}

#[async_trait::async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str) -> Result<Translation, TranslateError> {
        self.calls.lock().unwrap().push(text.to_string());

        let hold = {
            let mut hold = self.hold.lock().unwrap();
            match hold.as_ref() {
                Some((held, _)) if held == text => hold.take().map(|(_, notify)| notify),
                _ => None,
            }
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }

        if self.rejects_as_closed || self.is_closed() {
            return Err(TranslateError::Closed);
        }
        if self.failing.contains(text) {
            return Err(TranslateError::ApiError(format!("cannot translate {text:?}")));
        }

        Ok(Translation {
            text: self.render(text),
            from: self.pair.source.clone(),
            to: self.pair.target.clone(),
            provider: "fake".to_string(),
        })
    }

    fn pair(&self) -> &ResolvedPair {
        &self.pair
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeFactory {
    specs: Mutex<VecDeque<TranslatorSpec>>,
    created: Mutex<Vec<Arc<FakeTranslator>>>,
    fail: AtomicBool,
    hold: Mutex<Option<Arc<Notify>>>,
    requested: AtomicUsize,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the behaviour of the next translator to be created
    pub fn push_spec(&self, spec: TranslatorSpec) {
        self.specs.lock().unwrap().push_back(spec);
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Park the next `create` until the returned notify fires
    pub fn hold_next(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Number of `create` calls started so far
    pub fn requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<Arc<FakeTranslator>> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TranslatorFactory for FakeFactory {
    async fn create(&self, pair: &ResolvedPair) -> Result<Arc<dyn Translator>, TranslateError> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().unwrap().take();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TranslateError::AuthenticationError);
        }
        let spec = self.specs.lock().unwrap().pop_front().unwrap_or_default();
        let translator = FakeTranslator::with_spec(pair.clone(), spec);
        self.created.lock().unwrap().push(translator.clone());
        Ok(translator)
    }
}

enum Answer {
    Code(LanguageCode),
    Undetermined,
    Unreachable,
}

pub struct FakeIdentifier {
    answer: Answer,
    samples: Mutex<Vec<String>>,
}

impl FakeIdentifier {
    fn with_answer(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            samples: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(code: &str) -> Arc<Self> {
        Self::with_answer(Answer::Code(code.to_string()))
    }

    /// Too little signal to name a language
    pub fn undetermined() -> Arc<Self> {
        Self::with_answer(Answer::Undetermined)
    }

    /// The identification service cannot be reached
    pub fn failing() -> Arc<Self> {
        Self::with_answer(Answer::Unreachable)
    }

    pub fn samples(&self) -> Vec<String> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LanguageIdentifier for FakeIdentifier {
    async fn identify(&self, text: &str) -> Result<LanguageCode, TranslateError> {
        self.samples.lock().unwrap().push(text.to_string());
        match &self.answer {
            Answer::Code(code) => Ok(code.clone()),
            Answer::Undetermined => Err(TranslateError::Undetermined("too little text".into())),
            Answer::Unreachable => Err(TranslateError::ApiError("HTTP 503".into())),
        }
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    shown: Mutex<Vec<(Rect, String, Duration)>>,
}

impl RecordingPresenter {
    pub fn shown(&self) -> Vec<(Rect, String, Duration)> {
        self.shown.lock().unwrap().clone()
    }

    /// Rendered texts, sorted so sibling completion order does not matter
    pub fn texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.shown().into_iter().map(|(_, text, _)| text).collect();
        texts.sort();
        texts
    }
}

impl SurfacePresenter for RecordingPresenter {
    fn show(&self, bounds: Rect, text: &str, ttl: Duration) {
        self.shown
            .lock()
            .unwrap()
            .push((bounds, text.to_string(), ttl));
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        stuck_threshold: Duration::from_millis(5000),
        capture_delay: Duration::ZERO,
        label_ttl: Duration::from_millis(5000),
        fallback_source: "en".to_string(),
    }
}

pub struct Setup {
    pub pair: LanguagePair,
    pub settings: PipelineSettings,
    pub source: Arc<FakeFrameSource>,
    pub detector: Arc<ScriptedDetector>,
    pub factory: Arc<FakeFactory>,
    pub identifier: Option<Arc<FakeIdentifier>>,
}

impl Setup {
    pub fn new(pair: LanguagePair, detector: Arc<ScriptedDetector>) -> Self {
        Self {
            pair,
            settings: settings(),
            source: FakeFrameSource::new(SourceMode::Frames),
            detector,
            factory: FakeFactory::new(),
            identifier: None,
        }
    }

    pub fn build(self) -> Harness {
        let presenter = Arc::new(RecordingPresenter::default());
        let (status_tx, status_rx) = kanal::unbounded_async();

        let collaborators = Collaborators {
            frame_source: self.source.clone(),
            detector: self.detector.clone(),
            translators: self.factory.clone(),
            identifier: self
                .identifier
                .map(|identifier| identifier as Arc<dyn LanguageIdentifier>),
            presenter: presenter.clone(),
        };
        let (pipeline, inbox) = Pipeline::new(self.settings, self.pair, collaborators, status_tx);

        Harness {
            pipeline,
            inbox,
            status_rx,
            source: self.source,
            detector: self.detector,
            factory: self.factory,
            presenter,
        }
    }
}

/// A pipeline whose control loop is pumped by the test itself
pub struct Harness {
    pub pipeline: Pipeline,
    pub inbox: AsyncReceiver<PipelineMessage>,
    pub status_rx: AsyncReceiver<AppEvent>,
    pub source: Arc<FakeFrameSource>,
    pub detector: Arc<ScriptedDetector>,
    pub factory: Arc<FakeFactory>,
    pub presenter: Arc<RecordingPresenter>,
}

impl Harness {
    /// Apply completions until the pipeline has been quiet for a while
    pub async fn settle(&mut self) -> Result<(), PipelineError> {
        loop {
            match tokio::time::timeout(Duration::from_millis(100), self.inbox.recv()).await {
                Ok(Ok(message)) => self.pipeline.dispatch(message)?,
                _ => return Ok(()),
            }
        }
    }

    /// Statuses reported since the last call
    pub fn statuses(&self) -> Vec<PipelineStatus> {
        let mut statuses = Vec::new();
        while let Ok(Some(event)) = self.status_rx.try_recv() {
            if let AppEvent::Status(status) = event {
                statuses.push(status);
            }
        }
        statuses
    }
}

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::cache::SummaryCache;
use crate::gemini::{GenerationConfig, GenerativeModel, VALIDATION_MODEL};
use crate::host::HostEnvironment;
use crate::prompt::{Model, SummaryLength, build_chat_prompt, build_summary_prompt, is_known_language};
use crate::reduce::Reducer;
use crate::store::{ApiKeyStore, Preferences, Storage};
use crate::transcript::{TranscriptStore, fetch_transcript};
use crate::youtube::CaptionProvider;
use crate::{ChatMessage, Error, Result, Segment};

/// Lifecycle of one user-facing action
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> ActionState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ActionState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActionState::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

/// Which panel is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    Summary,
    Transcript,
    Chat,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Preferences used when nothing valid is stored
    pub defaults: Preferences,
    pub reducer: Reducer,
    pub validation_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            defaults: Preferences::default(),
            reducer: Reducer::default(),
            validation_timeout: Duration::from_secs(8),
        }
    }
}

/// The external capabilities a session runs against
pub struct Services {
    pub captions: Arc<dyn CaptionProvider>,
    pub model: Arc<dyn GenerativeModel>,
    pub host: Arc<dyn HostEnvironment>,
    pub storage: Arc<dyn Storage>,
}

/// Summary, transcript and chat state for the video shown on the host.
///
/// Every action takes `&mut self`, so a transcript fetch always completes
/// before the model call that depends on it and an action cannot be
/// re-triggered while it is in flight.
pub struct Session {
    services: Services,
    options: SessionOptions,
    prefs: Preferences,
    api_key: Option<String>,
    key_notice: Option<String>,
    key_error: Option<String>,
    transcript: TranscriptStore,
    transcript_state: ActionState<()>,
    summary: ActionState<String>,
    cache: SummaryCache,
    messages: Vec<ChatMessage>,
    chat_state: ActionState<()>,
    active_view: Option<ActiveView>,
}

impl Session {
    /// Loads the stored key and preferences once.
    pub fn new(services: Services, options: SessionOptions) -> Self {
        let prefs = Preferences::load(services.storage.as_ref(), options.defaults.clone());
        let api_key = ApiKeyStore::load(services.storage.as_ref());
        debug!(
            "Session started: lang={} model={} length={} key={}",
            prefs.language,
            prefs.model,
            prefs.length,
            if api_key.is_some() { "stored" } else { "missing" }
        );

        Self {
            services,
            options,
            prefs,
            api_key,
            key_notice: None,
            key_error: None,
            transcript: TranscriptStore::default(),
            transcript_state: ActionState::Idle,
            summary: ActionState::Idle,
            cache: SummaryCache::default(),
            messages: Vec::new(),
            chat_state: ActionState::Idle,
            active_view: None,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn key_notice(&self) -> Option<&str> {
        self.key_notice.as_deref()
    }

    pub fn key_error(&self) -> Option<&str> {
        self.key_error.as_deref()
    }

    pub fn summary(&self) -> &ActionState<String> {
        &self.summary
    }

    pub fn transcript_state(&self) -> &ActionState<()> {
        &self.transcript_state
    }

    pub fn transcript_segments(&self) -> &[Segment] {
        self.transcript.segments()
    }

    pub fn transcript_locale(&self) -> Option<&str> {
        self.transcript.locale()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn chat_state(&self) -> &ActionState<()> {
        &self.chat_state
    }

    pub fn active_view(&self) -> Option<ActiveView> {
        self.active_view
    }

    pub fn current_video_id(&self) -> Option<String> {
        self.services.host.current_video_id()
    }

    /// Fails with `UnknownLanguage` for codes missing from the catalog.
    pub fn set_language(&mut self, language: &str) -> Result<()> {
        if !is_known_language(language) {
            return Err(Error::UnknownLanguage(language.to_string()));
        }
        self.prefs.language = language.to_string();
        self.prefs.save(self.services.storage.as_ref())
    }

    pub fn set_model(&mut self, model: Model) -> Result<()> {
        self.prefs.model = model;
        self.prefs.save(self.services.storage.as_ref())
    }

    pub fn set_length(&mut self, length: SummaryLength) -> Result<()> {
        self.prefs.length = length;
        self.prefs.save(self.services.storage.as_ref())
    }

    /// Use `prefs` for this session only, leaving the stored ones untouched.
    pub fn use_preferences(&mut self, prefs: Preferences) {
        self.prefs = prefs;
    }

    /// Use `api_key` for this session only, without validating or storing it.
    pub fn use_unsaved_api_key(&mut self, api_key: &str) {
        let trimmed = api_key.trim();
        self.api_key = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Validate `input` against the model API and store it on success.
    pub async fn save_api_key(&mut self, input: &str) -> Result<()> {
        let trimmed = input.trim();
        self.key_error = None;
        if trimmed.is_empty() {
            self.key_notice = Some(Error::EmptyApiKey.to_string());
            return Err(Error::EmptyApiKey);
        }

        self.key_notice = Some("Testing API key…".to_string());
        let validation = tokio::time::timeout(
            self.options.validation_timeout,
            self.services.model.validate_key(trimmed, VALIDATION_MODEL),
        )
        .await;

        let outcome = match validation {
            Err(_) => Err(Error::ValidationTimeout),
            Ok(Err(e @ (Error::ValidationFailed(_) | Error::ValidationTimeout))) => Err(e),
            Ok(Err(e)) => Err(Error::ValidationFailed(e.to_string())),
            Ok(Ok(())) => ApiKeyStore::save(self.services.storage.as_ref(), trimmed),
        };

        match outcome {
            Ok(()) => {
                info!("API key validated and saved");
                self.api_key = Some(trimmed.to_string());
                self.key_notice = Some("API key validated and saved. You can update it anytime.".to_string());
                Ok(())
            }
            Err(e) => {
                warn!("API key rejected: {e}");
                self.key_notice = None;
                self.key_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Forget the key and everything produced with it.
    pub fn reset_api_key(&mut self) -> Result<()> {
        info!("Resetting API key and session state");
        self.api_key = None;
        self.key_notice = None;
        self.key_error = None;
        self.summary = ActionState::Idle;
        self.cache.clear();
        self.transcript.clear();
        self.transcript_state = ActionState::Idle;
        self.messages.clear();
        self.chat_state = ActionState::Idle;
        self.active_view = None;
        ApiKeyStore::remove(self.services.storage.as_ref())
    }

    /// The host moved to another video (or away from any video).
    pub fn on_video_changed(&mut self, video_id: Option<&str>) {
        info!("Video changed to {video_id:?}; resetting chat");
        self.messages.clear();
        self.chat_state = ActionState::Idle;
        self.active_view = None;
    }

    pub fn seek(&self, offset: f64) -> Result<()> {
        self.services.host.seek(offset)
    }

    fn require_api_key(&self) -> Result<String> {
        self.api_key.clone().ok_or(Error::NoApiKey)
    }

    fn transcript_is_fresh(&self) -> bool {
        let video_id = self.current_video_id();
        self.transcript.is_fresh(video_id.as_deref(), &self.prefs.language)
    }

    /// Make sure the stored transcript matches the current video and language.
    async fn ensure_transcript(&mut self) -> Result<()> {
        if self.transcript_is_fresh() {
            return Ok(());
        }

        let video_id = self.current_video_id();
        let lang = self.prefs.language.clone();
        self.transcript_state = ActionState::Loading;

        match fetch_transcript(self.services.captions.as_ref(), video_id.as_deref(), &lang).await {
            Ok(segments) => {
                info!("Loaded {} transcript segments ({lang})", segments.len());
                // fetch_transcript only succeeds when a video id was resolved
                self.transcript.replace(video_id.as_deref().unwrap_or_default(), &lang, segments);
                self.transcript_state = ActionState::Success(());
                Ok(())
            }
            Err(e) => {
                warn!("Transcript fetch failed: {e}");
                self.transcript.clear();
                self.transcript_state = ActionState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Show the transcript, fetching it unless a fresh one is loaded.
    pub async fn load_transcript(&mut self) -> Result<()> {
        if let Err(e) = self.require_api_key() {
            self.transcript_state = ActionState::Error(e.to_string());
            return Err(e);
        }

        self.active_view = Some(ActiveView::Transcript);
        if self.transcript_is_fresh() {
            self.transcript_state = ActionState::Success(());
            return Ok(());
        }
        self.ensure_transcript().await
    }

    /// Summarize the current video, answering from the cache when possible.
    pub async fn request_summary(&mut self) -> Result<String> {
        match self.summarize().await {
            Ok(summary) => {
                self.summary = ActionState::Success(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                self.summary = ActionState::Error(e.to_string());
                Err(e)
            }
        }
    }

    async fn summarize(&mut self) -> Result<String> {
        let api_key = self.require_api_key()?;
        self.active_view = Some(ActiveView::Summary);

        let video_id = self.current_video_id().ok_or(Error::NoVideoDetected)?;
        let Preferences {
            language,
            model,
            length,
        } = self.prefs.clone();

        let cache_key = SummaryCache::key(&video_id, &language, length, model);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached.to_string());
        }

        self.summary = ActionState::Loading;
        self.ensure_transcript().await?;
        if self.transcript.segments().is_empty() {
            return Err(Error::EmptyTranscript);
        }

        let text = self.options.reducer.reduce(self.transcript.segments());
        let prompt = build_summary_prompt(&text, &language, length);
        let summary = self
            .services
            .model
            .generate(&api_key, model.api_id(), &prompt, GenerationConfig::summary(length))
            .await?;

        info!("Generated {length} summary for {video_id} ({} chars)", summary.len());
        self.cache.insert(cache_key, summary.clone());
        Ok(summary)
    }

    /// Switch to the chat view, fetching the transcript if needed.
    pub async fn open_chat(&mut self) -> Result<()> {
        if let Err(e) = self.require_api_key() {
            self.chat_state = ActionState::Error(e.to_string());
            return Err(e);
        }

        self.active_view = Some(ActiveView::Chat);
        self.chat_state = ActionState::Idle;
        if self.transcript_is_fresh() {
            return Ok(());
        }

        self.chat_state = ActionState::Loading;
        match self.ensure_transcript().await {
            Ok(()) => {
                self.chat_state = ActionState::Idle;
                Ok(())
            }
            Err(e) => {
                self.chat_state = ActionState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Ask a question about the video.
    ///
    /// The question is appended before the model call and retracted again if
    /// the call fails. Blank input is ignored and yields `Ok(None)`.
    pub async fn send_chat_message(&mut self, input: &str) -> Result<Option<String>> {
        let question = input.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let api_key = match self.require_api_key() {
            Ok(key) => key,
            Err(e) => {
                self.chat_state = ActionState::Error(e.to_string());
                return Err(e);
            }
        };

        self.chat_state = ActionState::Loading;
        if let Err(e) = self.ensure_transcript().await {
            self.chat_state = ActionState::Error(e.to_string());
            return Err(e);
        }

        let previous = self.messages.clone();
        self.messages.push(ChatMessage::user(question));

        let text = self.options.reducer.reduce(self.transcript.segments());
        let prompt = build_chat_prompt(&text, &self.prefs.language, &self.messages);
        let reply = self
            .services
            .model
            .generate(&api_key, self.prefs.model.api_id(), &prompt, GenerationConfig::chat())
            .await;

        match reply {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                self.chat_state = ActionState::Success(());
                Ok(Some(reply))
            }
            Err(e) => {
                warn!("Chat reply failed: {e}");
                self.messages = previous;
                self.chat_state = ActionState::Error(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::gemini::tests::FakeModel;
    use crate::host::TerminalHost;
    use crate::reduce::MAX_TRANSCRIPT_CHARACTERS;
    use crate::store::MemoryStorage;
    use crate::transcript::tests::FakeCaptions;

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct Harness {
        captions: Arc<FakeCaptions>,
        model: Arc<FakeModel>,
        host: Arc<TerminalHost>,
        storage: Arc<MemoryStorage>,
    }

    impl Harness {
        fn new(captions: Vec<Result<Vec<Segment>>>, replies: Vec<Result<String>>) -> Self {
            Self {
                captions: Arc::new(FakeCaptions::scripted(captions)),
                model: Arc::new(FakeModel::replying(replies)),
                host: Arc::new(TerminalHost::new(WATCH_URL)),
                storage: Arc::new(MemoryStorage::default()),
            }
        }

        fn session(&self) -> Session {
            let services = Services {
                captions: self.captions.clone(),
                model: self.model.clone(),
                host: self.host.clone(),
                storage: self.storage.clone(),
            };
            Session::new(services, SessionOptions::default())
        }

        fn keyed_session(&self) -> Session {
            ApiKeyStore::save(self.storage.as_ref(), "AIza-test").unwrap();
            self.session()
        }
    }

    fn segments() -> Vec<Segment> {
        vec![Segment::new(5.0, "hello"), Segment::new(65.0, "world")]
    }

    #[tokio::test]
    async fn test_actions_require_api_key() {
        let h = Harness::new(vec![Ok(segments())], vec![Ok("summary".to_string())]);
        let mut session = h.session();

        assert_eq!(session.request_summary().await.unwrap_err(), Error::NoApiKey);
        assert_eq!(session.summary().error(), Some(Error::NoApiKey.to_string().as_str()));
        assert_eq!(session.load_transcript().await.unwrap_err(), Error::NoApiKey);
        assert_eq!(session.open_chat().await.unwrap_err(), Error::NoApiKey);
        assert_eq!(session.send_chat_message("hi").await.unwrap_err(), Error::NoApiKey);

        assert!(h.captions.calls().is_empty());
        assert_eq!(h.model.call_count(), 0);
        assert_eq!(session.active_view(), None);
    }

    #[tokio::test]
    async fn test_summary_uses_transcript_and_caches() {
        let h = Harness::new(vec![Ok(segments())], vec![Ok("It says hello at 0:05.".to_string())]);
        let mut session = h.keyed_session();

        let first = session.request_summary().await.unwrap();
        assert_eq!(first, "It says hello at 0:05.");
        assert_eq!(session.active_view(), Some(ActiveView::Summary));

        let (model_id, prompt, config) = h.model.last_prompt().unwrap();
        assert_eq!(model_id, "gemini-2.5-flash-lite");
        assert!(prompt.contains("\"\"\"[00:05] hello [01:05] world\"\"\""));
        assert_eq!(config.max_output_tokens, 512);

        let second = session.request_summary().await.unwrap();
        assert_eq!(second, first);
        assert_eq!(h.model.call_count(), 1);
        assert_eq!(h.captions.calls().len(), 1);
        assert_eq!(session.summary(), &ActionState::Success(first));
    }

    #[tokio::test]
    async fn test_summary_cache_is_per_length() {
        let h = Harness::new(
            vec![Ok(segments())],
            vec![Ok("short".to_string()), Ok("long".to_string())],
        );
        let mut session = h.keyed_session();

        session.request_summary().await.unwrap();
        session.set_length(SummaryLength::Long).unwrap();
        assert_eq!(session.request_summary().await.unwrap(), "long");

        assert_eq!(h.model.call_count(), 2);
        assert_eq!(h.model.last_prompt().unwrap().2.max_output_tokens, 1024);
        // transcript was still fresh for the second request
        assert_eq!(h.captions.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_long_transcript_prompt_stays_within_budget() {
        let long: Vec<_> = (0..20_000)
            .map(|i| Segment::new(i as f64, format!("sentence number {i}")))
            .collect();
        let h = Harness::new(vec![Ok(long)], vec![Ok("summary".to_string()), Ok("answer".to_string())]);
        let mut session = h.keyed_session();

        session.request_summary().await.unwrap();
        let (_, prompt, _) = h.model.last_prompt().unwrap();
        let overhead = build_summary_prompt("", "en", SummaryLength::Medium).chars().count();
        assert!(prompt.chars().count() <= overhead + MAX_TRANSCRIPT_CHARACTERS);
        assert!(prompt.contains("sentence number 19999"));

        session.open_chat().await.unwrap();
        session.send_chat_message("what happens at the end?").await.unwrap();
        let (_, prompt, _) = h.model.last_prompt().unwrap();
        assert!(prompt.chars().count() < 2 * MAX_TRANSCRIPT_CHARACTERS);
    }

    #[tokio::test]
    async fn test_summary_without_video() {
        let h = Harness::new(vec![], vec![]);
        h.host.navigate("https://www.youtube.com/feed/trending");
        let mut session = h.keyed_session();

        assert_eq!(session.request_summary().await.unwrap_err(), Error::NoVideoDetected);
        assert_eq!(session.summary().error(), Some("Unable to detect the current video."));
        assert!(h.captions.calls().is_empty());
    }

    #[tokio::test]
    async fn test_summary_falls_back_to_default_track() {
        let h = Harness::new(
            vec![Err(Error::Caption("no de track".to_string())), Ok(segments())],
            vec![Ok("Zusammenfassung".to_string())],
        );
        let mut session = h.keyed_session();
        session.set_language("de").unwrap();

        assert_eq!(session.request_summary().await.unwrap(), "Zusammenfassung");
        assert_eq!(
            h.captions.calls(),
            vec![
                ("dQw4w9WgXcQ".to_string(), Some("de".to_string())),
                ("dQw4w9WgXcQ".to_string(), None)
            ]
        );
        assert_eq!(session.transcript_locale(), Some("de"));
    }

    #[tokio::test]
    async fn test_summary_with_empty_transcript() {
        let h = Harness::new(vec![Ok(Vec::new()), Ok(Vec::new())], vec![]);
        let mut session = h.keyed_session();

        assert_eq!(session.request_summary().await.unwrap_err(), Error::EmptyTranscript);
        assert_eq!(session.summary().error(), Some("Transcript was empty for this video."));
        assert_eq!(session.transcript_state().error(), Some("Transcript was empty for this video."));
        assert_eq!(h.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summary_generation_failure() {
        let h = Harness::new(
            vec![Ok(segments())],
            vec![Err(Error::GenerationFailed("quota exceeded".to_string()))],
        );
        let mut session = h.keyed_session();

        assert!(session.request_summary().await.is_err());
        assert_eq!(session.summary().error(), Some("quota exceeded"));
        assert!(session.transcript_state().error().is_none());
    }

    #[tokio::test]
    async fn test_language_change_forces_refetch() {
        let h = Harness::new(vec![Ok(segments()), Ok(segments())], vec![]);
        let mut session = h.keyed_session();

        session.load_transcript().await.unwrap();
        session.load_transcript().await.unwrap();
        assert_eq!(h.captions.calls().len(), 1);

        session.set_language("es").unwrap();
        session.load_transcript().await.unwrap();
        assert_eq!(h.captions.calls().len(), 2);
        assert_eq!(session.transcript_locale(), Some("es"));
        assert_eq!(session.active_view(), Some(ActiveView::Transcript));
    }

    #[tokio::test]
    async fn test_transcript_failure_clears_segments() {
        let h = Harness::new(
            vec![
                Ok(segments()),
                Err(Error::Caption("gone".to_string())),
                Err(Error::Caption("video unavailable".to_string())),
            ],
            vec![],
        );
        let mut session = h.keyed_session();
        session.load_transcript().await.unwrap();
        assert_eq!(session.transcript_segments().len(), 2);

        session.set_language("fr").unwrap();
        assert!(session.load_transcript().await.is_err());
        assert_eq!(session.transcript_state().error(), Some("video unavailable"));
        assert!(session.transcript_segments().is_empty());
        assert_eq!(session.transcript_locale(), None);
    }

    #[tokio::test]
    async fn test_chat_success_appends_both_turns() {
        let h = Harness::new(vec![Ok(segments())], vec![Ok("It greets the world.".to_string())]);
        let mut session = h.keyed_session();
        session.set_model(Model::Gemini25Flash).unwrap();

        session.open_chat().await.unwrap();
        assert_eq!(session.active_view(), Some(ActiveView::Chat));

        let reply = session.send_chat_message("  What happens?  ").await.unwrap();
        assert_eq!(reply.as_deref(), Some("It greets the world."));
        assert_eq!(
            session.messages(),
            &[
                ChatMessage::user("What happens?"),
                ChatMessage::assistant("It greets the world.")
            ]
        );

        let (model_id, prompt, config) = h.model.last_prompt().unwrap();
        assert_eq!(model_id, "gemini-2.5-flash");
        assert!(prompt.ends_with("User: What happens?\n\nAssistant:"));
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(h.captions.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_rolls_back() {
        let h = Harness::new(
            vec![Ok(segments())],
            vec![
                Ok("First answer.".to_string()),
                Err(Error::GenerationFailed("network down".to_string())),
            ],
        );
        let mut session = h.keyed_session();

        session.send_chat_message("first").await.unwrap();
        let before = session.messages().to_vec();

        let err = session.send_chat_message("second").await.unwrap_err();
        assert_eq!(err, Error::GenerationFailed("network down".to_string()));
        assert_eq!(session.messages(), before.as_slice());
        assert_eq!(session.chat_state().error(), Some("network down"));
    }

    #[tokio::test]
    async fn test_chat_transcript_failure_leaves_conversation() {
        let h = Harness::new(vec![Ok(Vec::new()), Ok(Vec::new())], vec![]);
        let mut session = h.keyed_session();

        assert_eq!(
            session.send_chat_message("hello?").await.unwrap_err(),
            Error::EmptyTranscript
        );
        assert!(session.messages().is_empty());
        assert_eq!(session.chat_state().error(), Some("Transcript was empty for this video."));
        assert_eq!(h.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_chat_input_is_ignored() {
        let h = Harness::new(vec![], vec![]);
        let mut session = h.session();
        assert_eq!(session.send_chat_message("   ").await.unwrap(), None);
        assert_eq!(session.chat_state(), &ActionState::Idle);
    }

    #[tokio::test]
    async fn test_open_chat_reports_transcript_error() {
        let h = Harness::new(
            vec![
                Err(Error::Caption("a".to_string())),
                Err(Error::Caption("captions disabled".to_string())),
            ],
            vec![],
        );
        let mut session = h.keyed_session();

        assert!(session.open_chat().await.is_err());
        assert_eq!(session.active_view(), Some(ActiveView::Chat));
        assert_eq!(session.chat_state().error(), Some("captions disabled"));
    }

    #[tokio::test]
    async fn test_video_change_resets_chat() {
        let h = Harness::new(vec![Ok(segments())], vec![Ok("answer".to_string())]);
        let mut session = h.keyed_session();
        session.open_chat().await.unwrap();
        session.send_chat_message("question").await.unwrap();
        assert_eq!(session.messages().len(), 2);

        h.host.navigate("https://youtu.be/aaaaaaaaaaa");
        session.on_video_changed(Some("aaaaaaaaaaa"));

        assert!(session.messages().is_empty());
        assert_eq!(session.active_view(), None);
        assert_eq!(session.chat_state(), &ActionState::Idle);
    }

    #[tokio::test]
    async fn test_transcript_is_refetched_for_new_video() {
        let h = Harness::new(vec![Ok(segments()), Ok(segments())], vec![]);
        let mut session = h.keyed_session();
        session.load_transcript().await.unwrap();

        h.host.navigate("https://youtu.be/aaaaaaaaaaa");
        session.load_transcript().await.unwrap();

        let calls = h.captions.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "aaaaaaaaaaa");
    }

    #[tokio::test]
    async fn test_save_api_key_validates_and_persists() {
        let h = Harness::new(vec![], vec![]);
        let mut session = h.session();

        session.save_api_key("  AIza-new  ").await.unwrap();
        assert_eq!(session.api_key(), Some("AIza-new"));
        assert_eq!(ApiKeyStore::load(h.storage.as_ref()).as_deref(), Some("AIza-new"));
        assert!(session.key_notice().unwrap().starts_with("API key validated"));
    }

    #[tokio::test]
    async fn test_save_blank_api_key() {
        let h = Harness::new(vec![], vec![]);
        let mut session = h.session();
        assert_eq!(session.save_api_key("   ").await.unwrap_err(), Error::EmptyApiKey);
        assert_eq!(session.api_key(), None);
    }

    #[tokio::test]
    async fn test_save_api_key_rejected() {
        let h = Harness {
            model: Arc::new(FakeModel {
                validation: Mutex::new(Some(Err(Error::ValidationFailed("API key not valid".to_string())))),
                ..Default::default()
            }),
            ..Harness::new(vec![], vec![])
        };
        let mut session = h.keyed_session();

        assert!(session.save_api_key("bad").await.is_err());
        assert_eq!(session.key_error(), Some("API key not valid"));
        assert_eq!(session.api_key(), Some("AIza-test"));
        assert_eq!(ApiKeyStore::load(h.storage.as_ref()).as_deref(), Some("AIza-test"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_api_key_times_out() {
        let h = Harness {
            model: Arc::new(FakeModel {
                validation_delay: Some(Duration::from_secs(30)),
                ..Default::default()
            }),
            ..Harness::new(vec![], vec![])
        };
        let mut session = h.session();

        assert_eq!(session.save_api_key("slow").await.unwrap_err(), Error::ValidationTimeout);
        assert_eq!(session.key_error(), Some("API key validation timed out. Please try again."));
        assert_eq!(session.api_key(), None);
    }

    #[tokio::test]
    async fn test_reset_api_key_clears_everything() {
        let h = Harness::new(
            vec![Ok(segments()), Ok(segments())],
            vec![Ok("one".to_string()), Ok("two".to_string())],
        );
        let mut session = h.keyed_session();
        session.request_summary().await.unwrap();

        session.reset_api_key().unwrap();
        assert_eq!(session.api_key(), None);
        assert_eq!(session.summary(), &ActionState::Idle);
        assert!(session.transcript_segments().is_empty());
        assert_eq!(session.active_view(), None);
        assert_eq!(ApiKeyStore::load(h.storage.as_ref()), None);

        session.save_api_key("AIza-again").await.unwrap();
        assert_eq!(session.request_summary().await.unwrap(), "two");
        assert_eq!(h.model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_preferences_persist_across_sessions() {
        let h = Harness::new(vec![], vec![]);
        let mut session = h.session();
        session.set_language("ko").unwrap();
        session.set_model(Model::Gemini20FlashLite).unwrap();
        session.set_length(SummaryLength::Short).unwrap();

        let reloaded = h.session();
        assert_eq!(
            reloaded.preferences(),
            &Preferences {
                language: "ko".to_string(),
                model: Model::Gemini20FlashLite,
                length: SummaryLength::Short,
            }
        );
    }

    #[test]
    fn test_unknown_language_rejected() {
        let h = Harness::new(vec![], vec![]);
        let mut session = h.session();
        session.set_language("ja").unwrap();

        assert_eq!(
            session.set_language("klingon").unwrap_err(),
            Error::UnknownLanguage("klingon".to_string())
        );
        assert_eq!(session.preferences().language, "ja");
        assert_eq!(h.session().preferences().language, "ja");
    }

    #[test]
    fn test_seek_goes_through_host() {
        let h = Harness::new(vec![], vec![]);
        let session = h.session();
        session.seek(125.0).unwrap();
        assert_eq!(
            h.host.last_seek().as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=125s")
        );
    }
}

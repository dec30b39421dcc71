//! Text-generation facility abstraction and the single-session manager.
//!
//! The facility is reached through two traits:
//! - [`LanguageModel`]: parameter discovery and session creation.
//! - [`ModelSession`]: a conversational handle with `prompt` and `destroy`.
//!
//! [`SessionManager`] owns at most one live session. It creates the
//! session lazily on the first prompt, destroys it whenever sampling
//! parameters change or a call fails, and seeds its defaults from the
//! facility's advertised parameters once.
//!
//! ```text
//!             create(params)            prompt ok
//! NoSession ─────────────────▶ Active ◀──────────┐
//!     ▲                          │  └────────────┘
//!     └──── prompt error / param change / reset ─┘
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::prompt::SYSTEM_PROMPT;

/// Ceiling applied to the advertised default top-K when seeding.
pub const DEFAULT_TOP_K_CAP: u32 = 3;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_TOP_K: u32 = 3;
/// Largest top-K a user may pick before the facility advertises its own.
pub const DEFAULT_MAX_TOP_K: u32 = 8;
pub const DEFAULT_OUTPUT_LANGUAGE: &str = "en";
pub const MAX_TEMPERATURE: f64 = 2.0;

/// What a prompt call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    /// A structured value handed back natively by the facility.
    Structured(Value),
}

/// Parameters advertised by the facility. Any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelParams {
    pub default_temperature: Option<f64>,
    pub default_top_k: Option<u32>,
    pub max_top_k: Option<u32>,
}

/// A message seeded at the start of a session's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

/// Everything a facility needs to open a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub initial_prompts: Vec<PromptMessage>,
    pub temperature: f64,
    pub top_k: u32,
    pub output_language: String,
}

/// The two user-adjustable sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_k: u32,
}

/// A live conversational handle.
#[async_trait]
pub trait ModelSession: Send {
    /// Send one user turn and return the reply.
    async fn prompt(&mut self, text: &str) -> Result<ModelOutput, ModelError>;

    /// Release the handle. Later prompts on it may fail.
    fn destroy(&mut self) -> Result<(), ModelError>;
}

/// A text-generation facility.
///
/// Implementations report an absent or unreachable facility as
/// [`ModelError::Unavailable`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Discover default and maximum sampling parameters.
    async fn params(&self) -> Result<ModelParams, ModelError>;

    /// Open a new session.
    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn ModelSession>, ModelError>;
}

#[async_trait]
impl<T: LanguageModel + ?Sized> LanguageModel for Box<T> {
    async fn params(&self) -> Result<ModelParams, ModelError> {
        (**self).params().await
    }

    async fn create(&self, options: &SessionOptions) -> Result<Box<dyn ModelSession>, ModelError> {
        (**self).create(options).await
    }
}

/// Facility used when no provider is configured.
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    async fn params(&self) -> Result<ModelParams, ModelError> {
        Err(disabled())
    }

    async fn create(&self, _options: &SessionOptions) -> Result<Box<dyn ModelSession>, ModelError> {
        Err(disabled())
    }
}

fn disabled() -> ModelError {
    ModelError::Unavailable("no text-generation provider is configured".to_string())
}

/// Initial settings for a [`SessionManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub temperature: f64,
    pub top_k: u32,
    /// Ceiling for the advertised default top-K.
    pub top_k_cap: u32,
    /// User-selectable top-K maximum until the facility advertises one.
    pub max_top_k: u32,
    pub output_language: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_k_cap: DEFAULT_TOP_K_CAP,
            max_top_k: DEFAULT_MAX_TOP_K,
            output_language: DEFAULT_OUTPUT_LANGUAGE.to_string(),
        }
    }
}

/// Owner of the single shared session.
pub struct SessionManager<M> {
    model: M,
    session: Option<Box<dyn ModelSession>>,
    params: SamplingParams,
    top_k_cap: u32,
    max_top_k: u32,
    output_language: String,
    seeded: bool,
    sessions_created: u64,
}

impl<M: LanguageModel> SessionManager<M> {
    pub fn new(model: M, settings: SessionSettings) -> Self {
        let max_top_k = settings.max_top_k.max(1);
        Self {
            model,
            session: None,
            params: SamplingParams {
                temperature: clamp_temperature(settings.temperature),
                top_k: settings.top_k.clamp(1, max_top_k),
            },
            top_k_cap: settings.top_k_cap.max(1),
            max_top_k,
            output_language: settings.output_language,
            seeded: false,
            sessions_created: 0,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> SamplingParams {
        self.params
    }

    pub fn max_top_k(&self) -> u32 {
        self.max_top_k
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Number of session handles created so far.
    pub fn sessions_created(&self) -> u64 {
        self.sessions_created
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Seed sampling parameters from the facility's advertised defaults.
    ///
    /// Runs until it succeeds once. An unavailable facility is reported;
    /// any other discovery failure leaves the current values in place.
    pub async fn seed_defaults(&mut self) -> Result<(), ModelError> {
        if self.seeded {
            return Ok(());
        }
        match self.model.params().await {
            Ok(advertised) => {
                self.seed_from(advertised);
                Ok(())
            }
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                warn!(error = %e, "Parameter discovery failed; keeping current sampling params");
                Ok(())
            }
        }
    }

    /// Seed from parameters the caller already fetched. No-op once seeded.
    pub fn seed_from(&mut self, advertised: ModelParams) {
        if self.seeded {
            return;
        }
        self.apply_advertised(advertised);
        self.seeded = true;
    }

    fn apply_advertised(&mut self, advertised: ModelParams) {
        if let Some(max) = advertised.max_top_k {
            self.max_top_k = max.max(1);
        }
        if let Some(t) = advertised.default_temperature {
            self.params.temperature = clamp_temperature((t * 10.0).round() / 10.0);
        }
        if let Some(k) = advertised.default_top_k {
            self.params.top_k = k.min(self.top_k_cap);
        }
        self.params.top_k = self.params.top_k.clamp(1, self.max_top_k);
        debug!(
            temperature = self.params.temperature,
            top_k = self.params.top_k,
            max_top_k = self.max_top_k,
            "Seeded sampling params"
        );
    }

    /// Change the temperature. Always resets the session.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.params.temperature = clamp_temperature(temperature);
        self.seeded = true;
        self.reset();
    }

    /// Change top-K, clamped to `[1, max_top_k]`. Always resets the session.
    pub fn set_top_k(&mut self, top_k: u32) {
        self.params.top_k = top_k.clamp(1, self.max_top_k);
        self.seeded = true;
        self.reset();
    }

    /// Destroy the current session, if any.
    ///
    /// A failing destroy is logged; the manager ends up without a session
    /// either way.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            discard(session);
        }
    }

    /// Prompt the current session, creating one first if needed.
    ///
    /// On failure the session is destroyed, so the next call starts fresh.
    pub async fn prompt(&mut self, text: &str) -> Result<ModelOutput, ModelError> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => self.create_session().await?,
        };
        match session.prompt(text).await {
            Ok(output) => {
                self.session = Some(session);
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, "Prompt failed; discarding session");
                discard(session);
                Err(e)
            }
        }
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            initial_prompts: vec![PromptMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            }],
            temperature: self.params.temperature,
            top_k: self.params.top_k,
            output_language: self.output_language.clone(),
        }
    }

    async fn create_session(&mut self) -> Result<Box<dyn ModelSession>, ModelError> {
        let options = self.session_options();
        let session = self.model.create(&options).await?;
        self.sessions_created += 1;
        debug!(
            temperature = options.temperature,
            top_k = options.top_k,
            created = self.sessions_created,
            "Created model session"
        );
        Ok(session)
    }
}

fn discard(mut session: Box<dyn ModelSession>) {
    if let Err(e) = session.destroy() {
        warn!(error = %e, "Failed to destroy model session");
    }
}

fn clamp_temperature(t: f64) -> f64 {
    if t.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        t.clamp(0.0, MAX_TEMPERATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        created: Vec<SessionOptions>,
        destroyed: usize,
        prompts: Vec<(usize, String)>,
        params_calls: usize,
    }

    /// Fake facility; prompts containing "fail" error out.
    struct FakeModel {
        log: Arc<Mutex<Log>>,
        params: Result<ModelParams, ModelError>,
        destroy_fails: bool,
    }

    impl FakeModel {
        fn new(params: Result<ModelParams, ModelError>) -> (Self, Arc<Mutex<Log>>) {
            let log = Arc::new(Mutex::new(Log::default()));
            let model = FakeModel {
                log: log.clone(),
                params,
                destroy_fails: false,
            };
            (model, log)
        }
    }

    struct FakeSession {
        index: usize,
        log: Arc<Mutex<Log>>,
        destroy_fails: bool,
    }

    #[async_trait]
    impl ModelSession for FakeSession {
        async fn prompt(&mut self, text: &str) -> Result<ModelOutput, ModelError> {
            self.log
                .lock()
                .unwrap()
                .prompts
                .push((self.index, text.to_string()));
            if text.contains("fail") {
                return Err(ModelError::generation("boom"));
            }
            Ok(ModelOutput::Text(format!("reply from {}", self.index)))
        }

        fn destroy(&mut self) -> Result<(), ModelError> {
            self.log.lock().unwrap().destroyed += 1;
            if self.destroy_fails {
                return Err(ModelError::generation("destroy failed"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn params(&self) -> Result<ModelParams, ModelError> {
            self.log.lock().unwrap().params_calls += 1;
            self.params.clone()
        }

        async fn create(&self, options: &SessionOptions) -> Result<Box<dyn ModelSession>, ModelError> {
            let mut log = self.log.lock().unwrap();
            log.created.push(options.clone());
            Ok(Box::new(FakeSession {
                index: log.created.len(),
                log: self.log.clone(),
                destroy_fails: self.destroy_fails,
            }))
        }
    }

    fn advertised(t: f64, k: u32, max: u32) -> ModelParams {
        ModelParams {
            default_temperature: Some(t),
            default_top_k: Some(k),
            max_top_k: Some(max),
        }
    }

    #[tokio::test]
    async fn test_session_created_lazily_and_reused() {
        let (model, log) = FakeModel::new(Ok(ModelParams::default()));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        assert!(!mgr.has_session());
        mgr.prompt("one").await.unwrap();
        mgr.prompt("two").await.unwrap();
        assert_eq!(mgr.sessions_created(), 1);
        let log = log.lock().unwrap();
        assert_eq!(log.prompts, vec![(1, "one".to_string()), (1, "two".to_string())]);
        assert_eq!(log.created[0].initial_prompts[0].content, SYSTEM_PROMPT);
        assert_eq!(log.created[0].output_language, "en");
    }

    #[tokio::test]
    async fn test_failure_forces_new_session() {
        let (model, log) = FakeModel::new(Ok(ModelParams::default()));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.prompt("hello").await.unwrap();
        let err = mgr.prompt("please fail").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!mgr.has_session());
        let out = mgr.prompt("again").await.unwrap();
        assert_eq!(out, ModelOutput::Text("reply from 2".to_string()));
        assert_eq!(mgr.sessions_created(), 2);
        assert_eq!(log.lock().unwrap().destroyed, 1);
    }

    #[tokio::test]
    async fn test_param_change_resets() {
        let (model, log) = FakeModel::new(Ok(ModelParams::default()));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.prompt("a").await.unwrap();
        mgr.set_temperature(0.3);
        assert!(!mgr.has_session());
        mgr.prompt("b").await.unwrap();
        mgr.set_top_k(2);
        mgr.prompt("c").await.unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.created.len(), 3);
        assert_eq!(log.created[1].temperature, 0.3);
        assert_eq!(log.created[2].top_k, 2);
        assert_eq!(log.destroyed, 2);
    }

    #[tokio::test]
    async fn test_reset_survives_destroy_failure() {
        let (mut model, log) = FakeModel::new(Ok(ModelParams::default()));
        model.destroy_fails = true;
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.prompt("a").await.unwrap();
        mgr.reset();
        assert!(!mgr.has_session());
        mgr.prompt("b").await.unwrap();
        assert_eq!(mgr.sessions_created(), 2);
        assert_eq!(log.lock().unwrap().destroyed, 1);
    }

    #[tokio::test]
    async fn test_seed_caps_top_k_and_rounds_temperature() {
        let (model, _log) = FakeModel::new(Ok(advertised(0.84, 40, 128)));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.seed_defaults().await.unwrap();
        assert!(mgr.is_seeded());
        assert_eq!(mgr.params().top_k, DEFAULT_TOP_K_CAP);
        assert!((mgr.params().temperature - 0.8).abs() < 1e-9);
        assert_eq!(mgr.max_top_k(), 128);
        mgr.set_top_k(500);
        assert_eq!(mgr.params().top_k, 128);
    }

    #[tokio::test]
    async fn test_cap_is_overridable() {
        let (model, _log) = FakeModel::new(Ok(advertised(0.7, 40, 64)));
        let settings = SessionSettings {
            top_k_cap: 10,
            ..SessionSettings::default()
        };
        let mut mgr = SessionManager::new(model, settings);
        mgr.seed_defaults().await.unwrap();
        assert_eq!(mgr.params().top_k, 10);
    }

    #[tokio::test]
    async fn test_seed_does_not_override_user_choice() {
        let (model, _log) = FakeModel::new(Ok(advertised(0.2, 1, 8)));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.set_temperature(1.5);
        mgr.seed_defaults().await.unwrap();
        assert_eq!(mgr.params().temperature, 1.5);
    }

    #[tokio::test]
    async fn test_seed_retries_after_discovery_failure() {
        let (model, _log) = FakeModel::new(Err(ModelError::generation("timeout")));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        mgr.seed_defaults().await.unwrap();
        assert!(!mgr.is_seeded());
        assert_eq!(mgr.params().temperature, DEFAULT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_disabled_model_is_unavailable() {
        let mut mgr = SessionManager::new(DisabledModel, SessionSettings::default());
        assert!(mgr.seed_defaults().await.unwrap_err().is_unavailable());
        assert!(mgr.prompt("x").await.unwrap_err().is_unavailable());
        assert_eq!(mgr.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_boxed_model_delegates() {
        let (model, _log) = FakeModel::new(Ok(ModelParams::default()));
        let boxed: Box<dyn LanguageModel> = Box::new(model);
        let mut mgr = SessionManager::new(boxed, SessionSettings::default());
        assert!(mgr.prompt("hi").await.is_ok());
    }

    #[test]
    fn test_temperature_clamped() {
        let mut mgr = SessionManager::new(DisabledModel, SessionSettings::default());
        mgr.set_temperature(9.0);
        assert_eq!(mgr.params().temperature, MAX_TEMPERATURE);
        mgr.set_temperature(-1.0);
        assert_eq!(mgr.params().temperature, 0.0);
    }

    #[tokio::test]
    async fn test_seed_from_fetched_params_skips_discovery() {
        let (model, log) = FakeModel::new(Ok(advertised(0.9, 40, 16)));
        let mut mgr = SessionManager::new(model, SessionSettings::default());
        let fetched = mgr.model().params().await.unwrap();
        mgr.seed_from(fetched);
        assert!(mgr.is_seeded());
        assert_eq!(mgr.params().top_k, DEFAULT_TOP_K_CAP);
        assert!((mgr.params().temperature - 0.9).abs() < 1e-9);
        assert_eq!(mgr.max_top_k(), 16);

        mgr.seed_defaults().await.unwrap();
        assert_eq!(log.lock().unwrap().params_calls, 1);

        mgr.set_top_k(7);
        mgr.seed_from(advertised(0.1, 1, 2));
        assert_eq!(mgr.params().top_k, 7);
    }
}

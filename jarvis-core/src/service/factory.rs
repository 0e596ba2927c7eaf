use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::ai::{AiProvider, GeminiProvider};
use crate::calendar::auth::{OAuthConfig, TokenStore};
use crate::calendar::{CalendarClient, GoogleCalendarClient, InMemoryCalendar};
use crate::chat::{ChatEngine, FunctionDispatcher};
use crate::memory::MemoryStore;
use crate::prompt::PromptComposer;
use crate::service::assistant::Assistant;
use crate::service::snapshot::ContextLimits;
use crate::service::AssistantService;
use crate::settings::Settings;

/// Initializes the Gemini provider, else raises an error when no API key is
/// configured.
pub fn create_provider(settings: &Settings) -> Result<Arc<dyn AiProvider>> {
    let Some(api_key) = settings.gemini.api_key.clone() else {
        bail!("No Gemini API key configured (set GEMINI_API_KEY or [gemini].api_key)")
    };
    if api_key.trim().is_empty() {
        bail!("Gemini API key is empty")
    }

    let provider = GeminiProvider::new(api_key, settings.gemini.base_url.clone())?;
    Ok(Arc::new(provider))
}

/// The Google client, or an in-process calendar when `offline` is set.
pub fn create_calendar(settings: &Settings, offline: bool) -> Result<Arc<dyn CalendarClient>> {
    let time_zone = settings.parsed_time_zone()?;
    if offline {
        info!("Using in-memory calendar");
        return Ok(Arc::new(InMemoryCalendar::new().with_time_zone(time_zone)));
    }

    let google = &settings.google;
    if google.client_id.is_none() || google.client_secret.is_none() {
        warn!("Google client credentials are not configured; calendar authentication will fail");
    }

    let mut oauth = OAuthConfig::new(
        google.client_id.clone().unwrap_or_default(),
        google.client_secret.clone().unwrap_or_default(),
    );
    oauth.redirect_uri = google.redirect_uri.clone();

    let store = TokenStore::new(settings.token_path()?);
    let client = GoogleCalendarClient::new(oauth, store, time_zone.name().to_string())?;
    Ok(Arc::new(client))
}

pub fn create_engine(
    settings: &Settings,
    provider: Arc<dyn AiProvider>,
    calendar: Arc<dyn CalendarClient>,
) -> Result<ChatEngine> {
    let composer = PromptComposer::new(
        settings.assistant_name.clone(),
        settings.parsed_time_zone()?,
    )
    .with_history_window(settings.history_window);

    Ok(ChatEngine::new(
        provider,
        composer,
        FunctionDispatcher::new(calendar),
        settings.gemini.model_settings(),
    ))
}

/// `None` when memory is disabled in settings.
pub fn load_memory(settings: &Settings) -> Result<Option<MemoryStore>> {
    if !settings.memory.enabled {
        info!("Memory is disabled");
        return Ok(None);
    }
    Ok(Some(MemoryStore::load(&settings.memory_path()?)?))
}

pub fn create_assistant(settings: &Settings, offline: bool) -> Result<Assistant> {
    let provider = create_provider(settings)?;
    let calendar = create_calendar(settings, offline)?;
    let engine = create_engine(settings, provider, calendar.clone())?;

    Ok(Assistant::new(
        engine,
        calendar,
        load_memory(settings)?,
        ContextLimits::from_settings(settings),
        settings.history_window,
    ))
}

pub fn create_service(settings: &Settings, offline: bool) -> Result<AssistantService> {
    let provider = create_provider(settings)?;
    let calendar = create_calendar(settings, offline)?;
    let engine = create_engine(settings, provider, calendar.clone())?;

    Ok(AssistantService::new(
        engine,
        calendar,
        load_memory(settings)?,
        ContextLimits::from_settings(settings),
    ))
}

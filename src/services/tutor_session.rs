use std::{collections::HashSet, sync::Arc};

use futures::StreamExt;
use tokio::{sync::RwLock, task::JoinHandle};
use uuid::Uuid;

use crate::{
    constants::prompts::{CONCEPT_PROMPT, SEND_FAILED},
    errors::AppResult,
    models::{
        domain::{Attachment, Citation, ContentSegment, Locale, Message, Persona, UserProfile},
        dto::response::SessionView,
    },
    services::{
        asset_resolver::{AssetResolver, ResolveReport},
        chat_backend::{ChatBackend, ChatConnection, ImageGenerator, OutgoingPart},
        instruction_builder::build_seed,
        markup_parser::parse_response,
    },
};

pub(crate) struct SessionState {
    /// Identity of the current conversation; replaced on every reset.
    pub(crate) session_id: Uuid,
    pub(crate) persona: Persona,
    pub(crate) locale: Locale,
    pub(crate) profile: Option<UserProfile>,
    pub(crate) seed_context: Option<Arc<str>>,
    pub(crate) history: Vec<Message>,
    pub(crate) is_busy: bool,
    pub(crate) streaming_text: String,
    pub(crate) connection: Arc<dyn ChatConnection>,
    /// Placeholder segments an in-flight resolver has already taken.
    pub(crate) claimed: HashSet<(Uuid, usize)>,
    pub(crate) resolver_tasks: Vec<JoinHandle<ResolveReport>>,
    pub(crate) discarded: bool,
}

impl SessionState {
    fn abort_resolvers(&mut self) {
        for task in self.resolver_tasks.drain(..) {
            task.abort();
        }
        self.claimed.clear();
    }
}

/// Shared handle to one tutoring conversation.
///
/// Clones refer to the same session. The lock is never held across a model or image request.
#[derive(Clone)]
pub struct TutorSession {
    pub(crate) state: Arc<RwLock<SessionState>>,
}

impl TutorSession {
    pub async fn id(&self) -> Uuid {
        self.state.read().await.session_id
    }

    pub async fn persona(&self) -> Persona {
        self.state.read().await.persona
    }

    pub async fn locale(&self) -> Locale {
        self.state.read().await.locale
    }

    pub async fn is_busy(&self) -> bool {
        self.state.read().await.is_busy
    }

    pub async fn is_discarded(&self) -> bool {
        self.state.read().await.discarded
    }

    pub async fn history(&self) -> Vec<Message> {
        self.state.read().await.history.clone()
    }

    /// Partial reply of the in-flight send, empty when idle.
    pub async fn streaming_text(&self) -> String {
        self.state.read().await.streaming_text.clone()
    }

    pub async fn view(&self) -> SessionView {
        let state = self.state.read().await;
        SessionView {
            session_id: state.session_id,
            persona: state.persona,
            locale: state.locale,
            is_busy: state.is_busy,
            streaming_text: state.streaming_text.clone(),
            history: state.history.clone(),
        }
    }

    /// Waits for every background image resolution spawned so far.
    pub async fn settle_assets(&self) -> Vec<ResolveReport> {
        let mut reports = Vec::new();
        loop {
            let tasks: Vec<_> = self.state.write().await.resolver_tasks.drain(..).collect();
            if tasks.is_empty() {
                return reports;
            }
            for task in tasks {
                match task.await {
                    Ok(report) => reports.push(report),
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => log::error!("Image resolver task failed: {}", err),
                }
            }
        }
    }
}

/// A user turn accepted by [`TutorEngine::begin_send`] and not yet answered.
pub struct PendingTurn {
    session_id: Uuid,
    message_id: Uuid,
    parts: Vec<OutgoingPart>,
    connection: Arc<dyn ChatConnection>,
}

impl PendingTurn {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Id of the optimistic user message.
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Busy, discarded or empty input: nothing happened.
    Ignored,
    Completed { message_id: Uuid },
    /// The transport failed and an error notice was appended.
    Failed,
    /// The session was replaced while the reply was streaming.
    Stale,
}

struct StreamedReply {
    text: String,
    citations: Vec<Citation>,
}

/// Drives tutor sessions against a chat backend and an image generator.
#[derive(Clone)]
pub struct TutorEngine {
    backend: Arc<dyn ChatBackend>,
    resolver: AssetResolver,
}

impl TutorEngine {
    pub fn new(backend: Arc<dyn ChatBackend>, images: Arc<dyn ImageGenerator>) -> Self {
        Self {
            backend,
            resolver: AssetResolver::new(images),
        }
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    fn open(
        &self,
        seed_context: Option<&str>,
        locale: Locale,
        persona: Persona,
        profile: Option<&UserProfile>,
    ) -> (Vec<Message>, Arc<dyn ChatConnection>) {
        let seed = build_seed(locale, profile, persona, seed_context);
        let connection = self
            .backend
            .start_chat(&seed.system_instruction, &seed.priming_history());
        (seed.visible_turns, connection)
    }

    pub fn create_session(
        &self,
        seed_context: Option<&str>,
        locale: Locale,
        persona: Persona,
        profile: Option<UserProfile>,
    ) -> TutorSession {
        let seed_context: Option<Arc<str>> = seed_context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Arc::from);
        let (history, connection) =
            self.open(seed_context.as_deref(), locale, persona, profile.as_ref());
        let session_id = Uuid::new_v4();

        log::info!(
            "Created tutor session {} (persona: {}, locale: {}, context: {} chars)",
            session_id,
            persona,
            locale,
            seed_context.as_deref().map_or(0, str::len)
        );

        TutorSession {
            state: Arc::new(RwLock::new(SessionState {
                session_id,
                persona,
                locale,
                profile,
                seed_context,
                history,
                is_busy: false,
                streaming_text: String::new(),
                connection,
                claimed: HashSet::new(),
                resolver_tasks: Vec::new(),
                discarded: false,
            })),
        }
    }

    /// Rebuilds the session in place from its seed context, dropping all history.
    ///
    /// Any send or image resolution still running for the old identity is discarded.
    pub async fn reset_session(
        &self,
        session: &TutorSession,
        persona: Option<Persona>,
        locale: Option<Locale>,
    ) -> Uuid {
        let mut state = session.state.write().await;
        self.rebuild(&mut state, persona, locale)
    }

    /// Rebuilds the session when `locale` or `profile` differ from the current ones.
    ///
    /// `None` keeps the current value. Returns whether the session was rebuilt.
    pub async fn localize_session(
        &self,
        session: &TutorSession,
        locale: Option<Locale>,
        profile: Option<UserProfile>,
    ) -> bool {
        let mut state = session.state.write().await;
        let locale_changed = locale.is_some_and(|locale| locale != state.locale);
        let profile_changed = profile.is_some() && profile != state.profile;
        if !locale_changed && !profile_changed {
            return false;
        }

        if profile_changed {
            state.profile = profile;
        }
        self.rebuild(&mut state, None, locale);
        true
    }

    fn rebuild(
        &self,
        state: &mut SessionState,
        persona: Option<Persona>,
        locale: Option<Locale>,
    ) -> Uuid {
        let persona = persona.unwrap_or(state.persona);
        let locale = locale.unwrap_or(state.locale);
        let (history, connection) = self.open(
            state.seed_context.as_deref(),
            locale,
            persona,
            state.profile.as_ref(),
        );

        let previous = state.session_id;
        state.abort_resolvers();
        state.session_id = Uuid::new_v4();
        state.persona = persona;
        state.locale = locale;
        state.history = history;
        state.connection = connection;
        state.is_busy = false;
        state.streaming_text.clear();
        state.discarded = false;

        log::info!(
            "Reset tutor session {} -> {} (persona: {}, locale: {})",
            previous,
            state.session_id,
            persona,
            locale
        );
        state.session_id
    }

    pub async fn discard_session(&self, session: &TutorSession) {
        let mut state = session.state.write().await;
        let previous = state.session_id;
        state.abort_resolvers();
        state.session_id = Uuid::new_v4();
        state.history.clear();
        state.is_busy = false;
        state.streaming_text.clear();
        state.discarded = true;

        log::info!("Discarded tutor session {}", previous);
    }

    /// Appends the user turn and marks the session busy.
    ///
    /// Returns `None` without touching the session when it is busy or discarded, or
    /// when both `text` and `attachment` are empty.
    pub async fn begin_send(
        &self,
        session: &TutorSession,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Option<PendingTurn> {
        let has_text = !text.trim().is_empty();
        if !has_text && attachment.is_none() {
            return None;
        }

        let mut state = session.state.write().await;
        if state.is_busy || state.discarded {
            log::debug!(
                "Ignoring send on session {} (busy: {}, discarded: {})",
                state.session_id,
                state.is_busy,
                state.discarded
            );
            return None;
        }

        let mut visible = Vec::new();
        let mut parts = Vec::new();
        if has_text {
            visible.push(ContentSegment::text(text));
            parts.push(OutgoingPart::Text(text.to_string()));
        }
        if let Some(attachment) = attachment {
            visible.push(ContentSegment::image(&attachment.mime_type, &attachment.data));
            parts.push(OutgoingPart::from(attachment));
        }

        let message = Message::user(visible);
        let message_id = message.id;
        state.history.push(message);
        state.is_busy = true;
        state.streaming_text.clear();

        log::info!(
            "Dispatching tutor turn on session {} ({} part(s))",
            state.session_id,
            parts.len()
        );

        Some(PendingTurn {
            session_id: state.session_id,
            message_id,
            parts,
            connection: Arc::clone(&state.connection),
        })
    }

    async fn stream_reply(
        &self,
        session: &TutorSession,
        pending: &PendingTurn,
    ) -> AppResult<Option<StreamedReply>> {
        let mut stream = pending.connection.send_stream(pending.parts.clone()).await?;
        let mut reply = StreamedReply {
            text: String::new(),
            citations: Vec::new(),
        };

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            reply.text.push_str(&chunk.text);
            if let Some(citations) = chunk.citations {
                reply.citations = citations;
            }

            let mut state = session.state.write().await;
            if state.session_id != pending.session_id {
                return Ok(None);
            }
            state.streaming_text.push_str(&chunk.text);
        }

        Ok(Some(reply))
    }

    /// Streams the reply for `pending` and finalizes it into the session history.
    pub async fn complete_send(&self, session: &TutorSession, pending: PendingTurn) -> SendOutcome {
        let result = self.stream_reply(session, &pending).await;

        let mut state = session.state.write().await;
        if state.session_id != pending.session_id {
            log::info!(
                "Discarding reply for replaced session {}",
                pending.session_id
            );
            return SendOutcome::Stale;
        }

        state.is_busy = false;
        state.streaming_text.clear();

        match result {
            Ok(Some(reply)) => {
                let parsed = parse_response(&reply.text);
                let message = Message::assistant(parsed.parts)
                    .with_sources(reply.citations)
                    .with_extractions(parsed.extractions);
                let message_id = message.id;
                let needs_images = message.has_placeholders();
                state.history.push(message);

                log::info!(
                    "Completed tutor turn on session {} ({} chars)",
                    state.session_id,
                    reply.text.len()
                );

                if needs_images {
                    let resolver = self.resolver.clone();
                    let handle = session.clone();
                    state.resolver_tasks.retain(|task| !task.is_finished());
                    state.resolver_tasks.push(tokio::spawn(async move {
                        resolver.resolve_session(&handle).await
                    }));
                }

                SendOutcome::Completed { message_id }
            }
            Ok(None) => SendOutcome::Stale,
            Err(err) => {
                log::error!(
                    "Tutor turn failed on session {}: {}",
                    state.session_id,
                    err
                );
                let notice = SEND_FAILED.get(state.locale);
                state.history.push(Message::assistant_text(notice));
                SendOutcome::Failed
            }
        }
    }

    pub async fn send(
        &self,
        session: &TutorSession,
        text: &str,
        attachment: Option<Attachment>,
    ) -> SendOutcome {
        match self.begin_send(session, text, attachment).await {
            Some(pending) => self.complete_send(session, pending).await,
            None => SendOutcome::Ignored,
        }
    }

    /// Asks the tutor to explain `concept` in the session's language.
    pub async fn ask_about_concept(&self, session: &TutorSession, concept: &str) -> SendOutcome {
        let concept = concept.trim();
        if concept.is_empty() {
            return SendOutcome::Ignored;
        }
        let prompt = concept_prompt(session.locale().await, concept);
        self.send(session, &prompt, None).await
    }
}

/// The explanation request sent when a student asks about a concept.
pub fn concept_prompt(locale: Locale, concept: &str) -> String {
    CONCEPT_PROMPT.get(locale).replace("{concept}", concept.trim())
}

use crate::{
    constants::prompts::{
        BANGLA_GRAMMAR_PERSONA, BASE_TUTOR_PROMPT, CAPABILITY_PROTOCOL, CONTEXT_ACK,
        CONTEXT_PREAMBLE, ENGLISH_GRAMMAR_PERSONA, FIRST_QUESTION_PROMPT, GENERAL_PERSONA,
        GREETING, LANGUAGE_ARTS_PERSONA, MATHEMATICS_PERSONA, PRIMARY_DIRECTIVE, PROFILE_PROMPT,
        READY_PROMPT, SCIENCE_PERSONA,
    },
    models::domain::{Locale, Message, Persona, UserProfile},
};

/// Everything a new tutor session starts from.
#[derive(Clone, Debug)]
pub struct SessionSeed {
    pub system_instruction: String,
    /// Sent to the model connection but never shown in the transcript.
    pub hidden_turns: Vec<Message>,
    /// Initial user-visible history.
    pub visible_turns: Vec<Message>,
}

impl SessionSeed {
    /// Turns the model connection is primed with, hidden ones first.
    pub fn priming_history(&self) -> Vec<Message> {
        self.hidden_turns
            .iter()
            .chain(self.visible_turns.iter())
            .cloned()
            .collect()
    }
}

pub fn persona_instruction(persona: Persona) -> &'static str {
    match persona {
        Persona::General => GENERAL_PERSONA,
        Persona::Mathematics => MATHEMATICS_PERSONA,
        Persona::Science => SCIENCE_PERSONA,
        Persona::LanguageArts => LANGUAGE_ARTS_PERSONA,
        Persona::EnglishGrammar => ENGLISH_GRAMMAR_PERSONA,
        Persona::BanglaGrammar => BANGLA_GRAMMAR_PERSONA,
    }
}

fn profile_directive(profile: Option<&UserProfile>) -> Option<String> {
    let profile = profile.filter(|p| p.is_complete())?;
    let language = Locale::for_country(&profile.country).language_name();

    Some(
        PROFILE_PROMPT
            .replace("{country}", profile.country.trim())
            .replace("{curriculum}", profile.curriculum.trim())
            .replace("{language}", language),
    )
}

/// Pure: the same inputs always produce the same instruction.
pub fn build_system_instruction(
    locale: Locale,
    profile: Option<&UserProfile>,
    persona: Persona,
) -> String {
    let mut sections = vec![BASE_TUTOR_PROMPT.replace("{language}", locale.language_name())];
    if let Some(directive) = profile_directive(profile) {
        sections.push(directive);
    }
    sections.push(format!(
        "### Your Persona: {}",
        persona_instruction(persona)
    ));
    sections.push(PRIMARY_DIRECTIVE.to_string());
    sections.push(CAPABILITY_PROTOCOL.to_string());

    sections.join("\n\n")
}

pub fn build_seed(
    locale: Locale,
    profile: Option<&UserProfile>,
    persona: Persona,
    seed_context: Option<&str>,
) -> SessionSeed {
    let system_instruction = build_system_instruction(locale, profile, persona);

    let (hidden_turns, visible_turns) = match seed_context {
        Some(context) => (
            vec![
                Message::user_text(&format!(
                    "{}\n\n{}",
                    CONTEXT_PREAMBLE.get(locale),
                    context
                )),
                Message::assistant_text(CONTEXT_ACK.get(locale)),
            ],
            vec![
                Message::user_text(READY_PROMPT.get(locale)),
                Message::assistant_text(FIRST_QUESTION_PROMPT.get(locale)),
            ],
        ),
        None => (vec![], vec![Message::assistant_text(GREETING.get(locale))]),
    };

    SessionSeed {
        system_instruction,
        hidden_turns,
        visible_turns,
    }
}

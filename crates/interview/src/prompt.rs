//! System prompt composition and conversation seeding.
//!
//! The system prompt is assembled from three parts, in order: the persona
//! template, a `## Interview Context` bullet list built from the validated
//! request, and (for tiered interviews) a `## Progress` block. Nothing here
//! branches on anything other than field presence.

use prepwire_core::message::{Turn, count_user_turns};

use crate::postprocess::{FEEDBACK_END_MARKER, FEEDBACK_START_MARKER};
use crate::progress::Progress;

/// Interviewer behaviour selected by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Formal interview: one question per turn, concluding feedback block.
    RealInterview,
    /// Practice interview: brief coaching after every answer.
    MockInterview,
    /// One-shot model answer to a single question.
    QuickAnswer,
}

impl Persona {
    pub fn template(self) -> String {
        match self {
            Persona::RealInterview => format!(
                "You are Alex, an experienced hiring manager conducting a realistic job interview \
over a voice call. Your replies are read aloud, so keep them short and conversational.

Rules:
- Ask exactly ONE question per turn. Never number or list several questions.
- Start each turn with one brief, natural acknowledgement of the candidate's previous answer, then ask your question.
- Across the interview, cover every evaluation category: motivation and role fit, relevant experience, \
domain or technical knowledge, problem solving, collaboration and communication.
- Do not give scores, feedback or hints while the interview is in progress.

When you are told to conclude, thank the candidate in one or two sentences and then write the \
feedback block exactly in this form:
{FEEDBACK_START_MARKER}
Overall score: <1-10>
Communication: <1-10> - <one sentence>
Domain knowledge: <1-10> - <one sentence>
Problem solving: <1-10> - <one sentence>
Role fit: <1-10> - <one sentence>
Strengths: <two or three short points>
Areas to improve: <two or three short points>
Recommendation: <Strong hire | Hire | Lean no hire | No hire>
{FEEDBACK_END_MARKER}"
            ),
            Persona::MockInterview => "You are a supportive interview coach running a practice interview. \
After each candidate answer, give two or three sentences of specific, constructive feedback on that \
answer (what worked, what to tighten), then ask exactly ONE follow-up interview question. \
Never list several questions. Keep the whole reply under 150 words."
                .to_string(),
            Persona::QuickAnswer => "You are an interview coach. The candidate will give you one \
interview question. Reply with a concise model answer they can adapt, written in the first person \
as the candidate. Use the STAR structure (situation, task, action, result) for behavioural questions. \
Keep it under 200 words and do not add commentary before or after the answer."
                .to_string(),
        }
    }
}

/// Validated, sanitized context fields injected into the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewContext {
    pub job_title: String,
    pub industry: String,
    pub experience_level: Option<String>,
    /// Listed only for formal interviews.
    pub interview_type: Option<String>,
}

/// Build the system prompt.
pub fn compose(persona: Persona, ctx: &InterviewContext, progress: Option<&Progress>) -> String {
    let mut prompt = persona.template();

    prompt.push_str("\n\n## Interview Context\n");
    prompt.push_str(&format!("- Role: {}\n", ctx.job_title));
    prompt.push_str(&format!("- Industry: {}\n", ctx.industry));
    if let Some(level) = &ctx.experience_level {
        prompt.push_str(&format!("- Experience level: {level}\n"));
    }
    if let Some(kind) = &ctx.interview_type {
        prompt.push_str(&format!("- Interview type: {kind}\n"));
    }

    if let Some(progress) = progress {
        prompt.push_str("\n## Progress\n");
        prompt.push_str(&format!(
            "Candidate answers so far: {} (the interview concludes after {}).\n",
            progress.user_turns, progress.final_after
        ));
        if !progress.directive.is_empty() {
            prompt.push_str(progress.directive);
            prompt.push('\n');
        }
    }

    prompt
}

const SEED_CANDIDATE: &str =
    "Last year I led the migration of our billing service to a new database without any downtime.";
const SEED_INTERVIEWER: &str = "That's a demanding project to land without downtime, well done. \
What was the biggest risk you saw going into that migration?";

/// Turns to send upstream for a real interview.
///
/// A history without any candidate turns is replaced by a short scripted
/// exchange that demonstrates acknowledge-then-ask, followed by a kickoff
/// turn. Any other history is forwarded unchanged.
pub fn seed_turns(history: &[Turn], job_title: &str) -> Vec<Turn> {
    if count_user_turns(history) > 0 {
        return history.to_vec();
    }

    vec![
        Turn::user(SEED_CANDIDATE),
        Turn::assistant(SEED_INTERVIEWER),
        Turn::user(format!(
            "That was a warm-up example. I'm here for the {job_title} interview and I'm ready to begin."
        )),
    ]
}

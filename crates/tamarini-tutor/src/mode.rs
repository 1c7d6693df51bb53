//! Tutoring modes and the instructions each one gives the model.
//!
//! Every request declares its own [`Mode`]. The mode selects one fixed
//! behavioural contract, and [`select_instructions`] renders it for the
//! requested [`Language`]. Rendering is pure: the same pair always yields
//! the same text.

use serde::{Deserialize, Serialize};

use crate::config::Language;

/// How the tutor should respond to the current student turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Guide the student through the current exercise step by step.
    #[default]
    Normal,
    /// Judge only the latest student message as one solution step.
    CheckStep,
    /// Generate a new exercise of the same kind, then guide as in `Normal`.
    SimilarExercise,
}

impl Mode {
    /// Parses a wire value, falling back to `Normal` for anything unknown.
    ///
    /// Values must match exactly; case and surrounding whitespace count.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("check-step") => Self::CheckStep,
            Some("similar-exercise") => Self::SimilarExercise,
            _ => Self::Normal,
        }
    }

    /// Returns the wire value of this mode.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::CheckStep => "check-step",
            Self::SimilarExercise => "similar-exercise",
        }
    }

    /// Approximate reply length, in lines, the model is asked to stay within.
    #[must_use]
    pub const fn reply_length(self) -> (u8, u8) {
        match self {
            Self::CheckStep => (3, 6),
            Self::Normal | Self::SimilarExercise => (5, 12),
        }
    }

    fn contract(self) -> &'static str {
        match self {
            Self::Normal => NORMAL_CONTRACT,
            Self::CheckStep => CHECK_STEP_CONTRACT,
            Self::SimilarExercise => SIMILAR_EXERCISE_CONTRACT,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_code(s.as_deref()))
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

// ============================================================================
// Templates
// ============================================================================

const PREAMBLE: &str = "You are TAMARINI, a friendly math tutor for students aged 12-18.";

const NORMAL_CONTRACT: &str = "\
Your task for this turn:
- Act as a step-by-step tutor for the current math exercise.
- Ask the student what they understand, guide them with questions and hints.
- Do NOT reveal the final answer until they either:
  * clearly give a final answer themselves, OR
  * clearly say they give up and want the solution.
- When you finally give the full solution:
  * say if their final answer is correct or not,
  * give the correct answer,
  * explain briefly and clearly.
- AFTER giving the full solution for this exercise:
  * ask 1-2 short \"concept check\" questions (which rule, which operation, what happens if...),
  * wait for the student's answers, and react to them.
- Do not start a new exercise unless the student asks for it.";

const CHECK_STEP_CONTRACT: &str = "\
Your task for this turn:
- Understand the last Student message as ONE step of their solution.
- Your job is ONLY to:
  * say if that step is correct or not,
  * explain why, in simple words,
  * if it is wrong, show how to fix JUST that step, without jumping ahead.
- Do NOT move the exercise forward.
- Do NOT give the final answer of the whole problem.";

const SIMILAR_EXERCISE_CONTRACT: &str = "\
Your task for this turn:
- The student wants a NEW exercise similar to the one discussed so far.
- From the conversation, identify the type of exercise (fractions, linear equations, etc.) and its difficulty.
- Create ONE new exercise of the same type and difficulty, with different numbers.
- Then help them on this new exercise as a step-by-step tutor:
  * explain the new exercise,
  * ask what they understand,
  * guide them one step at a time, without revealing the final answer early.
- Do NOT repeat the solution of the original exercise.";

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::Fr => "Respond entirely in clear, simple French.",
        Language::Ar => "Respond entirely in clear, simple Modern Standard Arabic.",
    }
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Fr => "French",
        Language::Ar => "Modern Standard Arabic",
    }
}

/// Renders the instruction text for a mode and language.
///
/// The text contains, in order: the tutor persona, the language directive,
/// the mode's contract, the rules shared by every mode, and the closing
/// directive to output only the next tutor message.
///
/// # Examples
///
/// ```
/// use tamarini_tutor::{select_instructions, Language, Mode};
///
/// let text = select_instructions(Mode::CheckStep, Language::Ar);
/// assert!(text.contains("Modern Standard Arabic"));
/// assert!(text.contains("3-6 lines"));
/// ```
#[must_use]
pub fn select_instructions(mode: Mode, language: Language) -> String {
    let (min_lines, max_lines) = mode.reply_length();
    let name = language_name(language);

    format!(
        "{PREAMBLE}\n\
         \n\
         Tutoring language: {code}\n\
         {directive}\n\
         \n\
         Mode: {mode}\n\
         {contract}\n\
         \n\
         General rules:\n\
         - Always respond entirely in {name}, whatever language the student writes in.\n\
         - If the exercise text is in another language, first restate or translate it into {name}.\n\
         - Focus on ONE small step at a time.\n\
         - Ask simple questions instead of giving long speeches.\n\
         - Be positive and encouraging about mistakes.\n\
         - Keep the reply short (about {min_lines}-{max_lines} lines).\n\
         \n\
         Now answer with only your next tutor message, without repeating the conversation.",
        code = language.code(),
        directive = language_directive(language),
        contract = mode.contract(),
    )
}

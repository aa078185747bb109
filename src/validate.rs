//! Consistency validation for form and submission payloads.
//!
//! Pure functions over the write shapes: nothing here touches the store or
//! mutates input. Every rule either passes or names a single message that the
//! API surfaces verbatim under `non_field_errors`. Validation always runs to
//! completion before any write, so a failing request leaves no partial state.

use thiserror::Error;

use crate::models::{AnswerWrite, QuestionType, QuestionWrite};

pub const INVALID_DISPLAY_ORDER: &str =
    "display_order must be in running order starting from 1!";
pub const INVALID_CHOICE_ID: &str = "choice_id must be in running order starting from 1!";
pub const CHOICES_NOT_SUPPORTED: &str = "The textbox question type does not support choices!";
pub const NO_CHOICES_SPECIFIED: &str = "Radio and Checkbox questions must have at least 1 choice!";
pub const ANSWERS_LENGTH_MISMATCH: &str =
    "Number of answers do not match the number of questions in form!";
pub const INVALID_QUESTION_TYPE: &str = "Invalid question type in answers array!";
pub const QUESTION_TYPE_MISMATCH: &str = "Question types do not match the specified form!";
pub const FORM_ID_REQUIRED: &str = "form_id is required!";

/// A failed consistency rule, carrying its wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

/// Checks that the order values of `items` form a contiguous 1..=len
/// permutation: each value in range, every slot hit, no duplicates or gaps.
fn check_running_order<T>(items: &[T], order: impl Fn(&T) -> i64) -> bool {
    let mut slot_taken = vec![false; items.len()];
    for item in items {
        let pos = order(item);
        if pos < 1 || pos > items.len() as i64 {
            return false;
        }
        slot_taken[(pos - 1) as usize] = true;
    }
    slot_taken.iter().all(|&taken| taken)
}

/// Validates a form's candidate question list: question `display_order`
/// running order first, then per question (in input order) choice/type
/// coherence and choice `choice_id` running order. First failure wins.
pub fn validate_questions(questions: &[QuestionWrite]) -> Result<(), ValidationError> {
    if !check_running_order(questions, |q| q.display_order) {
        return Err(ValidationError(INVALID_DISPLAY_ORDER));
    }

    for question in questions {
        if !question.choices.is_empty() && !question.question_type.supports_choices() {
            return Err(ValidationError(CHOICES_NOT_SUPPORTED));
        }
        if question.choices.is_empty() && question.question_type.supports_choices() {
            return Err(ValidationError(NO_CHOICES_SPECIFIED));
        }
        if !check_running_order(&question.choices, |c| c.choice_id) {
            return Err(ValidationError(INVALID_CHOICE_ID));
        }
    }

    Ok(())
}

/// Validates a submission's candidate answer list against the target form's
/// question types, ordered by `display_order`. Answers pair with questions
/// positionally; the client never names a question id.
pub fn validate_answers(
    answers: &[AnswerWrite],
    question_types: &[QuestionType],
) -> Result<(), ValidationError> {
    if answers.len() != question_types.len() {
        return Err(ValidationError(ANSWERS_LENGTH_MISMATCH));
    }

    for (answer, &expected) in answers.iter().zip(question_types) {
        match QuestionType::from_tag(&answer.question_type) {
            None => return Err(ValidationError(INVALID_QUESTION_TYPE)),
            Some(tag) if tag != expected => {
                return Err(ValidationError(QUESTION_TYPE_MISMATCH))
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Rule for create-submission requests: a target form id must be present.
/// Replace requests never call this; they take the form from the existing
/// submission and ignore any client-supplied id.
pub fn require_form_id(form_id: Option<i64>) -> Result<i64, ValidationError> {
    form_id.ok_or(ValidationError(FORM_ID_REQUIRED))
}

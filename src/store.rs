//! SQLite-backed store for forms and submissions.
//!
//! Holds the relational schema and the aggregate builders. Every mutation
//! (form create/replace, submission create/replace) runs inside a single
//! transaction, so a failure partway never leaves a half-rebuilt question
//! tree or answer list. "Update" is full replacement: delete the children,
//! recreate them from the new payload.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    Answer, AnswerWrite, Choice, Form, FormWrite, Question, QuestionType, QuestionWrite,
    Submission,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ============ Forms ============

    pub fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, title FROM form ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        let mut forms = Vec::new();
        for row in rows {
            let (id, title) = row?;
            forms.push(Form {
                id,
                title,
                questions: load_questions(&conn, id)?,
            });
        }
        Ok(forms)
    }

    pub fn get_form(&self, id: i64) -> Result<Option<Form>, StoreError> {
        let conn = self.conn.lock();
        let title: Option<String> = conn
            .query_row("SELECT title FROM form WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match title {
            Some(title) => Ok(Some(Form {
                id,
                title,
                questions: load_questions(&conn, id)?,
            })),
            None => Ok(None),
        }
    }

    pub fn create_form(&self, input: &FormWrite) -> Result<Form, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO form(title) VALUES (?1)", params![input.title])?;
        let form_id = tx.last_insert_rowid();
        insert_questions(&tx, form_id, &input.questions)?;
        let form = load_form(&tx, form_id)?;
        tx.commit()?;
        Ok(form)
    }

    /// Full replace: deletes the form's questions (cascading to choices and
    /// answers) and its submissions, then recreates the question tree from
    /// the payload. Dropping the submission rows as well is deliberate — their
    /// answers cannot outlive the deleted questions, and an answerless
    /// submission shell is worse than an explicit delete.
    pub fn replace_form(&self, id: i64, input: &FormWrite) -> Result<Option<Form>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM form WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }
        tx.execute("DELETE FROM question WHERE form_id = ?1", params![id])?;
        tx.execute("DELETE FROM submission WHERE form_id = ?1", params![id])?;
        tx.execute(
            "UPDATE form SET title = ?1 WHERE id = ?2",
            params![input.title, id],
        )?;
        insert_questions(&tx, id, &input.questions)?;
        let form = load_form(&tx, id)?;
        tx.commit()?;
        Ok(Some(form))
    }

    /// Question types of a form ordered by `display_order`, or `None` for an
    /// unknown form. Resolved fresh on every call; callers must not cache the
    /// result across requests.
    pub fn question_types(&self, form_id: i64) -> Result<Option<Vec<QuestionType>>, StoreError> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM form WHERE id = ?1",
                params![form_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }
        let mut stmt = conn.prepare(
            "SELECT question_type FROM question WHERE form_id = ?1 ORDER BY display_order",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            let tag: String = row.get(0)?;
            parse_type(0, tag)
        })?;
        Ok(Some(rows.collect::<Result<Vec<_>, _>>()?))
    }

    // ============ Submissions ============

    pub fn list_submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM submission ORDER BY form_id, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.into_iter()
            .map(|id| load_submission(&conn, id))
            .collect()
    }

    pub fn get_submission(&self, id: i64) -> Result<Option<Submission>, StoreError> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM submission WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(Some(load_submission(&conn, id)?)),
            None => Ok(None),
        }
    }

    /// Form id of an existing submission. Replace requests resolve their
    /// target form through this instead of trusting the request body.
    pub fn submission_form(&self, id: i64) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT form_id FROM submission WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn create_submission(
        &self,
        form_id: i64,
        answers: &[AnswerWrite],
    ) -> Result<Submission, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO submission(form_id) VALUES (?1)",
            params![form_id],
        )?;
        let submission_id = tx.last_insert_rowid();
        insert_answers(&tx, submission_id, form_id, answers)?;
        let submission = load_submission(&tx, submission_id)?;
        tx.commit()?;
        Ok(submission)
    }

    /// Full replace of a submission's answers. The submission row itself
    /// survives and keeps its form.
    pub fn replace_submission(
        &self,
        id: i64,
        answers: &[AnswerWrite],
    ) -> Result<Option<Submission>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let form_id: Option<i64> = tx
            .query_row(
                "SELECT form_id FROM submission WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(form_id) = form_id else {
            return Ok(None);
        };
        tx.execute("DELETE FROM answer WHERE submission_id = ?1", params![id])?;
        insert_answers(&tx, id, form_id, answers)?;
        let submission = load_submission(&tx, id)?;
        tx.commit()?;
        Ok(Some(submission))
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;

        CREATE TABLE IF NOT EXISTS form (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          title TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS question (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          form_id INTEGER NOT NULL REFERENCES form(id) ON DELETE CASCADE,
          display_order INTEGER NOT NULL,
          question TEXT NOT NULL,
          question_type TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS choice (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          question_id INTEGER NOT NULL REFERENCES question(id) ON DELETE CASCADE,
          choice_id INTEGER NOT NULL,
          choice TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS submission (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          form_id INTEGER NOT NULL REFERENCES form(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS answer (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          question_id INTEGER NOT NULL REFERENCES question(id) ON DELETE CASCADE,
          submission_id INTEGER NOT NULL REFERENCES submission(id) ON DELETE CASCADE,
          answer TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_question_form ON question(form_id, display_order);
        CREATE INDEX IF NOT EXISTS idx_choice_question ON choice(question_id, choice_id);
        CREATE INDEX IF NOT EXISTS idx_answer_submission ON answer(submission_id);
        "#,
    )?;
    Ok(())
}

fn parse_type(idx: usize, tag: String) -> rusqlite::Result<QuestionType> {
    QuestionType::from_tag(&tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown question type: {tag}").into(),
        )
    })
}

fn load_form(conn: &Connection, id: i64) -> Result<Form, StoreError> {
    let title: String = conn.query_row("SELECT title FROM form WHERE id = ?1", params![id], |row| {
        row.get(0)
    })?;
    Ok(Form {
        id,
        title,
        questions: load_questions(conn, id)?,
    })
}

fn load_questions(conn: &Connection, form_id: i64) -> Result<Vec<Question>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, display_order, question, question_type
         FROM question WHERE form_id = ?1 ORDER BY display_order",
    )?;
    let rows = stmt.query_map(params![form_id], |row| {
        let tag: String = row.get(3)?;
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            parse_type(3, tag)?,
        ))
    })?;
    let mut questions = Vec::new();
    for row in rows {
        let (id, display_order, question, question_type) = row?;
        questions.push(Question {
            id,
            display_order,
            question,
            question_type,
            choices: load_choices(conn, id)?,
        });
    }
    Ok(questions)
}

fn load_choices(conn: &Connection, question_id: i64) -> Result<Vec<Choice>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, choice, choice_id FROM choice WHERE question_id = ?1 ORDER BY choice_id",
    )?;
    let rows = stmt.query_map(params![question_id], |row| {
        Ok(Choice {
            id: row.get(0)?,
            choice: row.get(1)?,
            choice_id: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_questions(
    conn: &Connection,
    form_id: i64,
    questions: &[QuestionWrite],
) -> Result<(), StoreError> {
    for question in questions {
        conn.execute(
            "INSERT INTO question(form_id, display_order, question, question_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                form_id,
                question.display_order,
                question.question,
                question.question_type.as_str()
            ],
        )?;
        let question_id = conn.last_insert_rowid();
        for choice in &question.choices {
            conn.execute(
                "INSERT INTO choice(question_id, choice_id, choice) VALUES (?1, ?2, ?3)",
                params![question_id, choice.choice_id, choice.choice],
            )?;
        }
    }
    Ok(())
}

/// Pairs answer i with the form's question i, questions ordered by
/// `display_order`. The question list is re-read here, inside the same
/// transaction as the inserts.
fn insert_answers(
    conn: &Connection,
    submission_id: i64,
    form_id: i64,
    answers: &[AnswerWrite],
) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare("SELECT id FROM question WHERE form_id = ?1 ORDER BY display_order")?;
    let question_ids = stmt
        .query_map(params![form_id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    for (answer, question_id) in answers.iter().zip(question_ids) {
        conn.execute(
            "INSERT INTO answer(question_id, submission_id, answer) VALUES (?1, ?2, ?3)",
            params![question_id, submission_id, answer.answer],
        )?;
    }
    Ok(())
}

fn load_submission(conn: &Connection, id: i64) -> Result<Submission, StoreError> {
    let form_id: i64 = conn.query_row(
        "SELECT form_id FROM submission WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    let form = load_form(conn, form_id)?;

    let mut stmt = conn.prepare(
        "SELECT a.id, a.answer, a.question_id, q.question_type
         FROM answer a JOIN question q ON q.id = a.question_id
         WHERE a.submission_id = ?1 ORDER BY a.id",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        let tag: String = row.get(3)?;
        Ok(Answer {
            id: row.get(0)?,
            answer: row.get(1)?,
            question_id: row.get(2)?,
            question_type: parse_type(3, tag)?,
        })
    })?;
    let answers = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(Submission {
        id,
        form_id: form,
        answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChoiceWrite;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        let conn = store.conn.lock();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    fn radio_question(order: i64, choices: usize) -> QuestionWrite {
        QuestionWrite {
            display_order: order,
            question: format!("question {order}"),
            question_type: QuestionType::Radio,
            choices: (1..=choices as i64)
                .map(|id| ChoiceWrite {
                    choice_id: id,
                    choice: format!("choice {id}"),
                })
                .collect(),
        }
    }

    fn textbox_question(order: i64) -> QuestionWrite {
        QuestionWrite {
            display_order: order,
            question: format!("question {order}"),
            question_type: QuestionType::Textbox,
            choices: Vec::new(),
        }
    }

    fn answer(text: &str) -> AnswerWrite {
        AnswerWrite {
            answer: text.into(),
            question_type: "unused-here".into(),
        }
    }

    #[test]
    fn create_form_persists_question_tree() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "survey".into(),
                questions: vec![radio_question(1, 2), textbox_question(2)],
            })
            .unwrap();

        assert_eq!(form.title, "survey");
        assert_eq!(form.questions.len(), 2);
        assert_eq!(form.questions[0].choices.len(), 2);
        assert_eq!(count(&store, "form"), 1);
        assert_eq!(count(&store, "question"), 2);
        assert_eq!(count(&store, "choice"), 2);
    }

    #[test]
    fn questions_read_back_ordered_by_display_order() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "t".into(),
                questions: vec![textbox_question(2), textbox_question(1)],
            })
            .unwrap();
        let orders: Vec<i64> = form.questions.iter().map(|q| q.display_order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn replace_form_recreates_children_and_keeps_id() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "before".into(),
                questions: vec![radio_question(1, 3)],
            })
            .unwrap();
        let old_question_id = form.questions[0].id;

        let replaced = store
            .replace_form(
                form.id,
                &FormWrite {
                    title: "after".into(),
                    questions: vec![textbox_question(1)],
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(replaced.id, form.id);
        assert_eq!(replaced.title, "after");
        assert_eq!(replaced.questions.len(), 1);
        assert_ne!(replaced.questions[0].id, old_question_id);
        assert_eq!(count(&store, "question"), 1);
        assert_eq!(count(&store, "choice"), 0);
    }

    #[test]
    fn replace_form_drops_the_forms_submissions() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "t".into(),
                questions: vec![textbox_question(1)],
            })
            .unwrap();
        store.create_submission(form.id, &[answer("hi")]).unwrap();
        assert_eq!(count(&store, "submission"), 1);
        assert_eq!(count(&store, "answer"), 1);

        store
            .replace_form(
                form.id,
                &FormWrite {
                    title: "t".into(),
                    questions: vec![],
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(count(&store, "submission"), 0);
        assert_eq!(count(&store, "answer"), 0);
    }

    #[test]
    fn replace_missing_form_is_none() {
        let store = store();
        let result = store
            .replace_form(
                99,
                &FormWrite {
                    title: "t".into(),
                    questions: vec![],
                },
            )
            .unwrap();
        assert!(result.is_none());
        assert_eq!(count(&store, "form"), 0);
    }

    #[test]
    fn submission_answers_pair_with_questions_positionally() {
        let store = store();
        // Inserted out of display order on purpose.
        let form = store
            .create_form(&FormWrite {
                title: "t".into(),
                questions: vec![textbox_question(2), textbox_question(1)],
            })
            .unwrap();

        let submission = store
            .create_submission(form.id, &[answer("first"), answer("second")])
            .unwrap();

        let first_question = form
            .questions
            .iter()
            .find(|q| q.display_order == 1)
            .unwrap();
        assert_eq!(submission.answers.len(), 2);
        let first_answer = submission
            .answers
            .iter()
            .find(|a| a.answer == "first")
            .unwrap();
        assert_eq!(first_answer.question_id, first_question.id);
    }

    #[test]
    fn replace_submission_swaps_answers_only() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "t".into(),
                questions: vec![textbox_question(1)],
            })
            .unwrap();
        let submission = store.create_submission(form.id, &[answer("old")]).unwrap();
        let old_answer_id = submission.answers[0].id;

        let replaced = store
            .replace_submission(submission.id, &[answer("new")])
            .unwrap()
            .unwrap();

        assert_eq!(replaced.id, submission.id);
        assert_eq!(replaced.form_id.id, form.id);
        assert_eq!(replaced.answers.len(), 1);
        assert_eq!(replaced.answers[0].answer, "new");
        assert_ne!(replaced.answers[0].id, old_answer_id);
        assert_eq!(count(&store, "answer"), 1);
        assert_eq!(count(&store, "submission"), 1);
    }

    #[test]
    fn question_types_resolve_in_display_order() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "t".into(),
                questions: vec![radio_question(2, 1), textbox_question(1)],
            })
            .unwrap();
        let types = store.question_types(form.id).unwrap().unwrap();
        assert_eq!(types, vec![QuestionType::Textbox, QuestionType::Radio]);
        assert!(store.question_types(form.id + 1).unwrap().is_none());
    }

    #[test]
    fn submission_read_embeds_parent_form() {
        let store = store();
        let form = store
            .create_form(&FormWrite {
                title: "embedded".into(),
                questions: vec![radio_question(1, 2)],
            })
            .unwrap();
        let submission = store.create_submission(form.id, &[answer("a")]).unwrap();
        let fetched = store.get_submission(submission.id).unwrap().unwrap();
        assert_eq!(fetched.form_id.title, "embedded");
        assert_eq!(fetched.form_id.questions.len(), 1);
        assert_eq!(fetched.answers[0].question_type, QuestionType::Radio);
    }
}

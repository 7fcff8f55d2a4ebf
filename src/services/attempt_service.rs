use crate::database::attempt_store::{AttemptStore, NewResult, SubmitOutcome};
use crate::dto::attempt_dto::{SelectAnswerPayload, SessionResponse, SubmitResponse};
use crate::error::{Error, Result};
use crate::models::attempt::{AttemptPhase, QuizAttempt, SubmitTrigger, Tick};
use crate::models::result::QuizResult;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long a finished session stays readable before the sweeper drops it.
const TERMINAL_RETENTION_SECS: i64 = 600;
/// How long a created-but-never-started session may idle.
const READY_IDLE_SECS: i64 = 3600;

struct SessionState {
    attempt: Mutex<QuizAttempt>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// In-memory registry of live quiz attempts, keyed by (user, quiz). Every
/// operation on one attempt serializes through its mutex; the store is the
/// only shared resource underneath.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn AttemptStore>,
    sessions: Arc<Mutex<HashMap<(Uuid, Uuid), Arc<SessionState>>>>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Loads the quiz snapshot and materializes a `Ready` session. A failed
    /// load leaves nothing behind. If the caller already has a live session
    /// for this quiz it is returned as-is, whatever its phase, so a
    /// reconnecting client resumes instead of resetting.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        is_admin: bool,
    ) -> Result<SessionResponse> {
        if let Some(session) = self.find_session(user_id, quiz_id).await {
            let attempt = session.attempt.lock().await;
            return Ok(session_view(&attempt));
        }

        if self.store.find_result(user_id, quiz_id).await?.is_some() {
            return Err(Error::AlreadySubmitted(
                "This quiz has already been submitted".to_string(),
            ));
        }

        let loaded = self.store.load_quiz(quiz_id).await?;
        let (quiz, questions) = match loaded {
            Some(pair) => pair,
            None => return Err(Error::NotFound("Quiz not found".to_string())),
        };
        if !quiz.is_published && !is_admin {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        if questions.is_empty() {
            return Err(Error::BadRequest("Quiz has no questions yet".to_string()));
        }

        let attempt = QuizAttempt::new(user_id, &quiz, &questions);
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry((user_id, quiz_id))
            .or_insert_with(|| {
                Arc::new(SessionState {
                    attempt: Mutex::new(attempt),
                    timer: Mutex::new(None),
                })
            })
            .clone();
        drop(sessions);

        let attempt = session.attempt.lock().await;
        tracing::info!(%user_id, %quiz_id, "Created quiz session");
        Ok(session_view(&attempt))
    }

    /// Starts the countdown for a `Ready` session.
    pub async fn start_session(&self, user_id: Uuid, quiz_id: Uuid) -> Result<SessionResponse> {
        let session = self.require_session(user_id, quiz_id).await?;

        // The timer slot is held across the spawn so a concurrent abandon
        // either waits here and aborts the stored handle, or has already
        // marked the attempt and the task exits on its first tick.
        let mut timer = session.timer.lock().await;
        let view = {
            let mut attempt = session.attempt.lock().await;
            attempt.start(Utc::now())?;
            session_view(&attempt)
        };
        *timer = Some(tokio::spawn(run_countdown(
            self.store.clone(),
            session.clone(),
        )));
        drop(timer);

        tracing::info!(%user_id, %quiz_id, "Started quiz session");
        Ok(view)
    }

    pub async fn select_answer(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        payload: SelectAnswerPayload,
    ) -> Result<SessionResponse> {
        let session = self.require_session(user_id, quiz_id).await?;
        let mut attempt = session.attempt.lock().await;
        attempt.check_deadline(Utc::now())?;
        attempt.select_answer(payload.question_id, payload.answer)?;
        Ok(session_view(&attempt))
    }

    pub async fn advance(&self, user_id: Uuid, quiz_id: Uuid) -> Result<SessionResponse> {
        let session = self.require_session(user_id, quiz_id).await?;
        let mut attempt = session.attempt.lock().await;
        attempt.check_deadline(Utc::now())?;
        attempt.advance()?;
        Ok(session_view(&attempt))
    }

    pub async fn retreat(&self, user_id: Uuid, quiz_id: Uuid) -> Result<SessionResponse> {
        let session = self.require_session(user_id, quiz_id).await?;
        let mut attempt = session.attempt.lock().await;
        attempt.check_deadline(Utc::now())?;
        attempt.retreat()?;
        Ok(session_view(&attempt))
    }

    pub async fn status(&self, user_id: Uuid, quiz_id: Uuid) -> Result<SessionResponse> {
        let session = self.require_session(user_id, quiz_id).await?;
        let mut attempt = session.attempt.lock().await;
        attempt.check_deadline(Utc::now())?;
        Ok(session_view(&attempt))
    }

    /// Manual submit. Shares the persistence path with the countdown's
    /// auto-submit; the session lock is not held across the store call.
    pub async fn submit(&self, user_id: Uuid, quiz_id: Uuid) -> Result<SubmitResponse> {
        let session = self.require_session(user_id, quiz_id).await?;
        {
            let mut attempt = session.attempt.lock().await;
            attempt.check_deadline(Utc::now())?;
            attempt.begin_submit(SubmitTrigger::Manual)?;
        }

        let result = drive_submission(self.store.as_ref(), &session).await?;
        tracing::info!(%user_id, %quiz_id, score = result.score, "Submitted quiz");
        Ok(SubmitResponse {
            result_id: result.id,
            quiz_id: result.quiz_id,
            score: result.score,
            max_score: result.max_score,
            timed_out: result.timed_out,
            submitted_at: result.submitted_at,
            message: "Quiz submitted successfully".to_string(),
        })
    }

    /// Drops the session without persisting anything and cancels its
    /// countdown.
    pub async fn abandon(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        let removed = self.sessions.lock().await.remove(&(user_id, quiz_id));
        let session = match removed {
            Some(session) => session,
            None => {
                return Err(Error::NotFound(
                    "No active session for this quiz".to_string(),
                ))
            }
        };

        // Mark the attempt dead before touching the timer: a countdown task
        // spawned but not yet recorded in the slot still holds the session
        // and must find a terminal phase on its next tick.
        let mut timer = session.timer.lock().await;
        session.attempt.lock().await.abandon();
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        tracing::info!(%user_id, %quiz_id, "Abandoned quiz session");
        Ok(())
    }

    /// Periodic registry maintenance: reaps attempts whose timer was lost
    /// (wall-clock deadline long past) and evicts finished or never-started
    /// sessions after their retention window. Returns how many were evicted.
    pub async fn sweep_stale(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        let mut stale = Vec::new();
        for (key, session) in sessions.iter() {
            let mut attempt = session.attempt.lock().await;
            // Moves a forgotten InProgress attempt to Expired; the error
            // carries nothing useful here.
            let _ = attempt.check_deadline(now);

            let phase = attempt.phase();
            let idle = now - attempt.last_transition_at();
            let done_and_old = phase.is_terminal()
                && idle > chrono::Duration::seconds(TERMINAL_RETENTION_SECS);
            let never_started =
                phase == AttemptPhase::Ready && idle > chrono::Duration::seconds(READY_IDLE_SECS);
            if done_and_old || never_started {
                stale.push(*key);
            }
        }

        for key in &stale {
            if let Some(session) = sessions.remove(key) {
                if let Some(handle) = session.timer.lock().await.take() {
                    handle.abort();
                }
            }
        }

        if !stale.is_empty() {
            tracing::info!(evicted = stale.len(), "Swept stale quiz sessions");
        }
        stale.len()
    }

    async fn find_session(&self, user_id: Uuid, quiz_id: Uuid) -> Option<Arc<SessionState>> {
        self.sessions.lock().await.get(&(user_id, quiz_id)).cloned()
    }

    async fn require_session(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Arc<SessionState>> {
        self.find_session(user_id, quiz_id).await.ok_or_else(|| {
            Error::NotFound("No active session for this quiz".to_string())
        })
    }
}

fn session_view(attempt: &QuizAttempt) -> SessionResponse {
    SessionResponse {
        quiz_id: attempt.quiz_id,
        quiz_title: attempt.quiz_title.clone(),
        phase: attempt.phase().as_str().to_string(),
        current_index: attempt.current_index(),
        total_questions: attempt.total_questions(),
        answered_count: attempt.answered_count(),
        remaining_seconds: attempt.remaining_seconds(),
    }
}

/// One-second cadence for a started attempt. Exits as soon as the attempt
/// leaves `InProgress`; on reaching zero it drives the same submission path
/// a manual submit uses.
async fn run_countdown(store: Arc<dyn AttemptStore>, session: Arc<SessionState>) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut attempt = session.attempt.lock().await;
        match attempt.tick() {
            Tick::Counting(_) => {}
            Tick::Stopped => break,
            Tick::TimedOut => {
                if attempt.begin_submit(SubmitTrigger::Timeout).is_err() {
                    break;
                }
                let user_id = attempt.user_id;
                let quiz_id = attempt.quiz_id;
                drop(attempt);

                match drive_submission(store.as_ref(), &session).await {
                    Ok(result) => tracing::info!(
                        %user_id, %quiz_id, score = result.score,
                        "Auto-submitted quiz after timeout"
                    ),
                    Err(e) => tracing::error!(
                        %user_id, %quiz_id, error = ?e,
                        "Auto-submit after timeout failed"
                    ),
                }
                break;
            }
        }
    }
}

/// Packages the attempt and performs the store insert, with one automatic
/// retry. The session lock is only held to snapshot the payload and to
/// record the outcome.
async fn drive_submission(store: &dyn AttemptStore, session: &SessionState) -> Result<QuizResult> {
    let new_result = {
        let attempt = session.attempt.lock().await;
        let (score, max_score) = attempt.score();
        NewResult {
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            answers: attempt.answers_json(),
            score,
            max_score,
            timed_out: attempt.was_timed_out(),
        }
    };

    let outcome = match store.insert_result(new_result.clone()).await {
        Ok(outcome) => Ok(outcome),
        Err(first_err) => {
            tracing::warn!(error = ?first_err, "Result insert failed, retrying once");
            store.insert_result(new_result).await
        }
    };

    let mut attempt = session.attempt.lock().await;
    match outcome {
        Ok(SubmitOutcome::Created(result)) => {
            attempt.complete_submit();
            Ok(result)
        }
        Ok(SubmitOutcome::Duplicate) => {
            attempt.complete_submit();
            Err(Error::AlreadySubmitted(
                "A result for this quiz already exists".to_string(),
            ))
        }
        Err(err) => {
            attempt.fail_submit();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use crate::models::quiz::Quiz;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct InMemoryStore {
        quiz: Quiz,
        questions: Vec<Question>,
        results: std::sync::Mutex<HashMap<(Uuid, Uuid), QuizResult>>,
        fail_next_inserts: AtomicU32,
    }

    impl InMemoryStore {
        fn new(quiz: Quiz, questions: Vec<Question>) -> Arc<Self> {
            Arc::new(Self {
                quiz,
                questions,
                results: std::sync::Mutex::new(HashMap::new()),
                fail_next_inserts: AtomicU32::new(0),
            })
        }

        fn fail_inserts(&self, times: u32) {
            self.fail_next_inserts.store(times, Ordering::SeqCst);
        }

        fn result_count(&self) -> usize {
            self.results.lock().unwrap().len()
        }

        fn result_for(&self, user_id: Uuid, quiz_id: Uuid) -> Option<QuizResult> {
            self.results.lock().unwrap().get(&(user_id, quiz_id)).cloned()
        }
    }

    #[async_trait::async_trait]
    impl AttemptStore for InMemoryStore {
        async fn load_quiz(&self, quiz_id: Uuid) -> Result<Option<(Quiz, Vec<Question>)>> {
            if quiz_id == self.quiz.id {
                Ok(Some((self.quiz.clone(), self.questions.clone())))
            } else {
                Ok(None)
            }
        }

        async fn find_result(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Option<QuizResult>> {
            Ok(self.result_for(user_id, quiz_id))
        }

        async fn insert_result(&self, result: NewResult) -> Result<SubmitOutcome> {
            let remaining = self.fail_next_inserts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next_inserts.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::Internal("injected store failure".to_string()));
            }

            let mut results = self.results.lock().unwrap();
            let key = (result.user_id, result.quiz_id);
            if results.contains_key(&key) {
                return Ok(SubmitOutcome::Duplicate);
            }
            let row = QuizResult {
                id: Uuid::new_v4(),
                quiz_id: result.quiz_id,
                user_id: result.user_id,
                answers: result.answers,
                score: result.score,
                max_score: result.max_score,
                timed_out: result.timed_out,
                submitted_at: Utc::now(),
            };
            results.insert(key, row.clone());
            Ok(SubmitOutcome::Created(row))
        }
    }

    fn sample_quiz(time_limit_minutes: i32, is_published: bool) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Networking basics".to_string(),
            description: None,
            created_by: None,
            time_limit_minutes,
            is_published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_question(quiz_id: Uuid, correct: &str, points: i32, position: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id,
            question_text: format!("Question {}", position),
            options: serde_json::json!(["a", "b", correct]),
            correct_answer: correct.to_string(),
            points,
            question_type: "single_choice".to_string(),
            position,
            created_at: Utc::now(),
        }
    }

    fn quiz_fixture(time_limit_minutes: i32) -> (Quiz, Vec<Question>) {
        let quiz = sample_quiz(time_limit_minutes, true);
        let questions = vec![
            sample_question(quiz.id, "right", 2, 0),
            sample_question(quiz.id, "also right", 3, 1),
        ];
        (quiz, questions)
    }

    #[tokio::test]
    async fn full_session_flow_persists_one_result() {
        let (quiz, questions) = quiz_fixture(2);
        let q1 = questions[0].id;
        let q2 = questions[1].id;
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        let view = service.create_session(user_id, quiz.id, false).await.unwrap();
        assert_eq!(view.phase, "ready");
        assert_eq!(view.remaining_seconds, 120);
        assert_eq!(view.current_index, 0);
        assert_eq!(view.total_questions, 2);

        service.start_session(user_id, quiz.id).await.unwrap();
        service
            .select_answer(
                user_id,
                quiz.id,
                SelectAnswerPayload {
                    question_id: q1,
                    answer: "right".to_string(),
                },
            )
            .await
            .unwrap();
        service.advance(user_id, quiz.id).await.unwrap();
        service
            .select_answer(
                user_id,
                quiz.id,
                SelectAnswerPayload {
                    question_id: q2,
                    answer: "wrong".to_string(),
                },
            )
            .await
            .unwrap();

        let response = service.submit(user_id, quiz.id).await.unwrap();
        assert_eq!(response.score, 2);
        assert_eq!(response.max_score, 5);
        assert!(!response.timed_out);
        assert_eq!(store.result_count(), 1);

        let err = service.submit(user_id, quiz.id).await.unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn navigation_is_bounded_at_the_http_service_level() {
        let (quiz, _) = quiz_fixture(2);
        let store = InMemoryStore::new(
            quiz.clone(),
            vec![sample_question(quiz.id, "right", 1, 0)],
        );
        let service = AttemptService::new(store);
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();

        assert!(matches!(
            service.advance(user_id, quiz.id).await.unwrap_err(),
            Error::InvalidState(_)
        ));
        assert!(matches!(
            service.retreat(user_id, quiz.id).await.unwrap_err(),
            Error::InvalidState(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_auto_submits_partial_answers() {
        let (quiz, questions) = quiz_fixture(1);
        let q1 = questions[0].id;
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();
        service
            .select_answer(
                user_id,
                quiz.id,
                SelectAnswerPayload {
                    question_id: q1,
                    answer: "right".to_string(),
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let view = service.status(user_id, quiz.id).await.unwrap();
        assert_eq!(view.phase, "completed");
        assert_eq!(view.remaining_seconds, 0);

        let result = store.result_for(user_id, quiz.id).expect("result persisted");
        assert!(result.timed_out);
        assert_eq!(result.score, 2);
        assert_eq!(
            result.answers.as_object().map(|m| m.len()),
            Some(1),
            "only the answered question is recorded"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_seconds_decrease_one_per_tick() {
        let (quiz, questions) = quiz_fixture(1);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store);
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();

        // Half a second past the tenth tick, so the tick ordering at the
        // boundary instant cannot flip the assertion.
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let view = service.status(user_id, quiz.id).await.unwrap();
        assert_eq!(view.remaining_seconds, 50);
        assert_eq!(view.phase, "in_progress");
    }

    #[tokio::test]
    async fn store_failure_is_retried_once_automatically() {
        let (quiz, questions) = quiz_fixture(2);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();

        store.fail_inserts(1);
        let response = service.submit(user_id, quiz.id).await.unwrap();
        assert_eq!(response.message, "Quiz submitted successfully");
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn failed_submission_allows_one_manual_retry() {
        let (quiz, questions) = quiz_fixture(2);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();

        store.fail_inserts(2);
        let err = service.submit(user_id, quiz.id).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        let view = service.status(user_id, quiz.id).await.unwrap();
        assert_eq!(view.phase, "failed");
        assert_eq!(store.result_count(), 0);

        let response = service.submit(user_id, quiz.id).await.unwrap();
        assert_eq!(store.result_count(), 1);
        assert!(!response.timed_out);
    }

    #[tokio::test]
    async fn retry_budget_is_exhausted_after_the_second_failure() {
        let (quiz, questions) = quiz_fixture(2);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();

        store.fail_inserts(4);
        assert!(service.submit(user_id, quiz.id).await.is_err());
        assert!(service.submit(user_id, quiz.id).await.is_err());

        let err = service.submit(user_id, quiz.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(store.result_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_cancels_the_countdown_and_persists_nothing() {
        let (quiz, questions) = quiz_fixture(1);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();
        service.abandon(user_id, quiz.id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.result_count(), 0);
        assert!(matches!(
            service.status(user_id, quiz.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn orphaned_countdown_task_cannot_submit_an_abandoned_attempt() {
        let (quiz, questions) = quiz_fixture(1);
        let store = InMemoryStore::new(quiz.clone(), questions.clone());
        let user_id = Uuid::new_v4();

        // Countdown task whose handle was never recorded, as if an abandon
        // had won the race against the handle store and removed the
        // registry entry first. The task keeps its own Arc and keeps
        // running; only the attempt phase can stop it.
        let mut attempt = QuizAttempt::new(user_id, &quiz, &questions);
        attempt.start(Utc::now()).unwrap();
        let session = Arc::new(SessionState {
            attempt: Mutex::new(attempt),
            timer: Mutex::new(None),
        });
        let orphan = tokio::spawn(run_countdown(store.clone(), session.clone()));

        session.attempt.lock().await.abandon();

        tokio::time::sleep(Duration::from_secs(120)).await;
        orphan.await.unwrap();
        assert_eq!(store.result_count(), 0);
        assert_eq!(
            session.attempt.lock().await.phase(),
            AttemptPhase::Abandoned
        );
    }

    #[tokio::test]
    async fn recreating_a_live_session_returns_it_unchanged() {
        let (quiz, questions) = quiz_fixture(2);
        let q1 = questions[0].id;
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store);
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();
        service
            .select_answer(
                user_id,
                quiz.id,
                SelectAnswerPayload {
                    question_id: q1,
                    answer: "right".to_string(),
                },
            )
            .await
            .unwrap();

        let view = service.create_session(user_id, quiz.id, false).await.unwrap();
        assert_eq!(view.phase, "in_progress");
        assert_eq!(view.answered_count, 1);
    }

    #[tokio::test]
    async fn a_recorded_result_blocks_new_sessions() {
        let (quiz, questions) = quiz_fixture(2);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        store
            .insert_result(NewResult {
                quiz_id: quiz.id,
                user_id,
                answers: serde_json::json!({}),
                score: 0,
                max_score: 5,
                timed_out: false,
            })
            .await
            .unwrap();

        let err = service
            .create_session(user_id, quiz.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
    }

    #[tokio::test]
    async fn unpublished_quizzes_are_invisible_to_regular_users() {
        let quiz = sample_quiz(2, false);
        let questions = vec![sample_question(quiz.id, "right", 1, 0)];
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store);
        let user_id = Uuid::new_v4();

        let err = service
            .create_session(user_id, quiz.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let view = service.create_session(user_id, quiz.id, true).await.unwrap();
        assert_eq!(view.phase, "ready");
    }

    #[tokio::test]
    async fn unknown_quiz_creates_nothing() {
        let (quiz, questions) = quiz_fixture(2);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store);
        let user_id = Uuid::new_v4();

        let err = service
            .create_session(user_id, Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            service.status(user_id, quiz.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn sweeper_keeps_sessions_inside_retention() {
        let (quiz, questions) = quiz_fixture(1);
        let store = InMemoryStore::new(quiz.clone(), questions);
        let service = AttemptService::new(store.clone());
        let user_id = Uuid::new_v4();

        service.create_session(user_id, quiz.id, false).await.unwrap();
        service.start_session(user_id, quiz.id).await.unwrap();
        service.submit(user_id, quiz.id).await.unwrap();

        // Freshly finished: still within retention, nothing to evict.
        assert_eq!(service.sweep_stale().await, 0);
        assert!(service.status(user_id, quiz.id).await.is_ok());
    }
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use course_core::model::{
    AnswerValue, AuthSession, AuthToken, Certificate, CertificateId, Course, CourseId,
    Enrollment, Lesson, LessonId, QuestionId, Quiz, QuizId, QuizOutcome, SectionId,
};
use course_core::unlock::section_cleared;
use course_core::{EnrollmentProgress, NavigationSequencer, Step, Target, UnlockPolicy};
use storage::repository::SessionRepository;

use super::certificate::{CertificateGate, CertificateView};
use super::generation::{RequestGate, Ticket};
use super::lesson::LessonCompletionFlow;
use super::notice::{Notice, Notices};
use super::outline::CourseOutline;
use super::quiz::QuizAttemptFlow;
use crate::api::{CourseApi, CourseDetail, LessonCompletion, QuizSubmission};
use crate::config::PlayerConfig;
use crate::error::{ApiError, FlowError};

const AWAITING_APPROVAL: &str = "Course complete! Your certificate is awaiting admin approval.";
const UNFINISHED: &str = "Finish the remaining lessons and quizzes to complete the course.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Lesson,
    Quiz,
    Certificate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Loading,
    /// Course loaded but the learner is not enrolled: show the enroll action.
    NotEnrolled,
    Ready,
    SignedOut { suspended: bool },
    /// The course itself could not be loaded.
    Failed(FlowError),
}

/// Lesson completion issued by [`CoursePlayerController::begin_complete_lesson`].
#[derive(Debug, Clone)]
pub struct PendingLesson {
    view: Ticket,
    enrollment: Ticket,
    pub request: LessonCompletion,
}

#[derive(Debug, Clone)]
pub struct PendingQuizLoad {
    view: Ticket,
    pub quiz_id: QuizId,
}

#[derive(Debug, Clone)]
pub struct PendingSubmission {
    view: Ticket,
    pub submission: QuizSubmission,
}

#[derive(Debug, Clone)]
pub struct PendingCertificate {
    view: Ticket,
    pub certificate_id: CertificateId,
}

#[derive(Debug, Clone)]
pub struct PendingEnrollment {
    ticket: Ticket,
}

#[derive(Debug, Clone)]
pub enum Opening {
    /// Locked; a notice explains why.
    Refused,
    Opened,
    /// Opened a quiz whose document still has to be fetched.
    NeedsQuiz(PendingQuizLoad),
}

#[derive(Debug, Clone)]
pub enum CertificateOpening {
    /// Not issued yet; a notice explains why.
    Refused,
    Opened,
    NeedsFetch(PendingCertificate),
}

// What a target points at, resolved against the loaded course.
enum Stop {
    Lesson(SectionId, LessonId),
    Quiz(Option<SectionId>, Option<QuizId>),
}

/// Orchestrates one course-viewing session.
///
/// Owns the course, the enrollment and the active flows. Every server call is
/// split into a `begin_*` step that issues a ticket and an `apply_*` step that
/// consumes it, so responses that arrive after the learner moved on can be
/// told apart. The `async` methods without prefix run both steps back to back.
pub struct CoursePlayerController {
    api: Arc<dyn CourseApi>,
    sessions: Arc<dyn SessionRepository>,
    config: PlayerConfig,
    course_id: CourseId,
    policy: UnlockPolicy,
    navigator: NavigationSequencer,

    session: Option<AuthSession>,
    state: PlayerState,
    course: Option<Course>,
    enrollment: Option<Enrollment>,
    progress: EnrollmentProgress,

    current: Option<Target>,
    mode: ViewMode,
    lesson: Option<LessonCompletionFlow>,
    quiz: Option<QuizAttemptFlow>,
    certificate: Option<CertificateView>,

    view_gate: RequestGate,
    enrollment_gate: RequestGate,
    notices: Notices,
}

impl CoursePlayerController {
    #[must_use]
    pub fn new(
        api: Arc<dyn CourseApi>,
        sessions: Arc<dyn SessionRepository>,
        course_id: CourseId,
        config: PlayerConfig,
    ) -> Self {
        Self {
            api,
            sessions,
            config,
            course_id,
            policy: UnlockPolicy::new(),
            navigator: NavigationSequencer::new(),
            session: None,
            state: PlayerState::Loading,
            course: None,
            enrollment: None,
            progress: EnrollmentProgress::default(),
            current: None,
            mode: ViewMode::Lesson,
            lesson: None,
            quiz: None,
            certificate: None,
            view_gate: RequestGate::new(),
            enrollment_gate: RequestGate::new(),
            notices: Notices::default(),
        }
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    #[must_use]
    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    #[must_use]
    pub fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Option<Target> {
        self.current
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.mode
    }

    #[must_use]
    pub fn lesson_flow(&self) -> Option<&LessonCompletionFlow> {
        self.lesson.as_ref()
    }

    #[must_use]
    pub fn quiz_flow(&self) -> Option<&QuizAttemptFlow> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn certificate_view(&self) -> Option<&CertificateView> {
        self.certificate.as_ref()
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// The lesson on screen, if the view is a lesson.
    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        if self.mode != ViewMode::Lesson {
            return None;
        }
        match self.current? {
            Target::Lesson { section, lesson } => self.course.as_ref()?.section(section)?.lesson(lesson),
            _ => None,
        }
    }

    /// Progress of an enrolled learner.
    #[must_use]
    pub fn progress(&self) -> Option<&EnrollmentProgress> {
        (self.state == PlayerState::Ready).then_some(&self.progress)
    }

    /// Sidebar outline. `None` until the learner is enrolled.
    #[must_use]
    pub fn outline(&self) -> Option<CourseOutline> {
        let course = self.course.as_ref()?;
        (self.state == PlayerState::Ready)
            .then(|| CourseOutline::build(course, &self.progress, &self.policy, self.current))
    }

    #[must_use]
    pub fn certificate_gate(&self) -> CertificateGate {
        self.enrollment
            .as_ref()
            .map_or(CertificateGate::NotIssued, CertificateGate::from_enrollment)
    }

    #[must_use]
    pub fn is_unlocked(&self, target: Target) -> bool {
        self.course
            .as_ref()
            .is_some_and(|course| self.policy.is_unlocked(course, &self.progress, target))
    }

    // ─── Load and enroll ───────────────────────────────────────────────────────

    /// Reads the stored session, fetches the course and the enrollment, and
    /// opens where the learner left off.
    ///
    /// # Errors
    ///
    /// Returns `FlowError` when the course cannot be loaded; the state becomes
    /// `PlayerState::Failed`.
    pub async fn load(&mut self) -> Result<(), FlowError> {
        self.state = PlayerState::Loading;
        self.session = match self.sessions.load_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "could not read stored session");
                None
            }
        };

        let ticket = self.enrollment_gate.issue();
        let token = self.session.as_ref().map(|s| s.token.clone());
        let response = self.api.get_course(token.as_ref(), &self.course_id).await;
        let detail = match response {
            Ok(detail) => detail,
            Err(err) => {
                let err = self.fail(err).await;
                if !matches!(self.state, PlayerState::SignedOut { .. }) {
                    self.state = PlayerState::Failed(err.clone());
                }
                return Err(err);
            }
        };

        let CourseDetail { course, enrollment } = detail;
        info!(
            course = %self.course_id,
            sections = course.sections().len(),
            lessons = course.total_lessons(),
            "course loaded"
        );
        self.course = Some(course);

        let enrollment = match (enrollment, token) {
            (Some(enrollment), _) => Some(enrollment),
            (None, Some(token)) => match self.api.get_enrollment(&token, &self.course_id).await {
                Ok(enrollment) => Some(enrollment),
                Err(ApiError::NotFound) => None,
                Err(err) => {
                    let err = self.fail(err).await;
                    if !matches!(self.state, PlayerState::SignedOut { .. }) {
                        self.state = PlayerState::Failed(err.clone());
                    }
                    return Err(err);
                }
            },
            (None, None) => None,
        };

        match enrollment {
            Some(enrollment) => {
                self.replace_enrollment(ticket, enrollment);
                self.resume().await
            }
            None => {
                debug!(course = %self.course_id, "learner is not enrolled");
                self.state = PlayerState::NotEnrolled;
                Ok(())
            }
        }
    }

    /// Enrolls the signed-in learner and opens the first stop.
    ///
    /// # Errors
    ///
    /// `FlowError::AuthRequired` without a session, or the converted server
    /// error.
    pub async fn enroll(&mut self) -> Result<(), FlowError> {
        match self.state {
            PlayerState::NotEnrolled => {}
            PlayerState::Ready => return Ok(()),
            PlayerState::SignedOut { .. } => {
                return Err(self.surface(FlowError::AuthRequired).await);
            }
            PlayerState::Loading | PlayerState::Failed(_) => {
                return Err(self.surface(FlowError::Unavailable("The course".into())).await);
            }
        }
        let token = match self.token() {
            Ok(token) => token,
            Err(err) => return Err(self.surface(err).await),
        };

        let ticket = self.enrollment_gate.issue();
        match self.api.enroll(&token, &self.course_id).await {
            Ok(enrollment) => {
                info!(course = %self.course_id, "enrolled");
                self.replace_enrollment(ticket, enrollment);
                self.notices.push(Notice::success("You are enrolled. Happy learning!"));
                self.resume().await
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    /// Direct jump (sidebar). Locked targets are refused with a notice.
    ///
    /// # Errors
    ///
    /// `FlowError::NotEnrolled` and friends when the player is not ready, or
    /// `FlowError::Unavailable` for targets outside the course.
    pub fn begin_open(&mut self, target: Target) -> Result<Opening, FlowError> {
        self.require_ready()?;
        if !self.is_unlocked(target) {
            let stop_exists = self
                .course
                .as_ref()
                .and_then(|course| resolve(course, target))
                .is_some();
            if !stop_exists {
                return Err(FlowError::Unavailable("That part of the course".into()));
            }
            debug!(?target, "refusing locked target");
            self.notices.push(Notice::warning(locked_message(target)));
            return Ok(Opening::Refused);
        }
        self.enter(target)
    }

    /// # Errors
    ///
    /// The quiz load error, already surfaced as a notice.
    pub async fn apply_quiz(
        &mut self,
        pending: PendingQuizLoad,
        response: Result<Quiz, ApiError>,
    ) -> Result<bool, FlowError> {
        if !self.view_gate.is_current(pending.view) {
            warn!(quiz = %pending.quiz_id, "discarding quiz loaded for a view that is gone");
            return self.discard(response.map(|_| ())).await;
        }
        let Some(flow) = self.quiz.as_mut() else {
            return Ok(false);
        };
        match flow.apply_load(response) {
            Ok(()) => Ok(true),
            Err(err) => Err(self.surface(err).await),
        }
    }

    /// Opens `target` if it is unlocked.
    ///
    /// Returns whether the view moved.
    ///
    /// # Errors
    ///
    /// See [`CoursePlayerController::begin_open`]; a quiz that cannot be
    /// fetched yields `FlowError::Unavailable` and an unavailable quiz view.
    pub async fn open(&mut self, target: Target) -> Result<bool, FlowError> {
        let opening = match self.begin_open(target) {
            Ok(opening) => opening,
            Err(err) => return Err(self.surface(err).await),
        };
        match opening {
            Opening::Refused => Ok(false),
            Opening::Opened => Ok(true),
            Opening::NeedsQuiz(pending) => {
                let token = self.session.as_ref().map(|s| s.token.clone());
                let response = self.api.get_quiz(token.as_ref(), &pending.quiz_id).await;
                self.apply_quiz(pending, response).await?;
                Ok(true)
            }
        }
    }

    /// Moves to the next stop. Past the last stop, goes to the certificate
    /// or tells the learner it awaits approval.
    ///
    /// # Errors
    ///
    /// Same as [`CoursePlayerController::open`].
    pub async fn next(&mut self) -> Result<bool, FlowError> {
        if let Err(err) = self.require_ready() {
            return Err(self.surface(err).await);
        }
        if self.mode == ViewMode::Certificate {
            return Ok(false);
        }
        let (Some(course), Some(current)) = (self.course.as_ref(), self.current) else {
            return Ok(false);
        };
        match self.navigator.next(course, current) {
            Some(Step::Go(target)) => self.open(target).await,
            Some(Step::CourseComplete) => self.reach_completion().await,
            None => Ok(false),
        }
    }

    /// Moves to the previous stop. From a quiz this is always the last lesson
    /// of its section; from the certificate it is the last opened stop.
    ///
    /// # Errors
    ///
    /// Same as [`CoursePlayerController::open`].
    pub async fn previous(&mut self) -> Result<bool, FlowError> {
        if let Err(err) = self.require_ready() {
            return Err(self.surface(err).await);
        }
        if self.mode == ViewMode::Certificate {
            return match self.current {
                Some(current) => self.open(current).await,
                None => Ok(false),
            };
        }
        let (Some(course), Some(current)) = (self.course.as_ref(), self.current) else {
            return Ok(false);
        };
        match self.navigator.previous(course, current) {
            Some(target) => self.open(target).await,
            None => Ok(false),
        }
    }

    // ─── Lessons ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `FlowError::AuthRequired` without a session, `FlowError::InFlight`
    /// while a completion is pending, `FlowError::Validation` outside a
    /// lesson view.
    pub fn begin_complete_lesson(&mut self) -> Result<PendingLesson, FlowError> {
        self.require_ready()?;
        if self.mode != ViewMode::Lesson {
            return Err(FlowError::Validation("Open a lesson first.".into()));
        }
        let now = self.config.clock.now();
        let Some(flow) = self.lesson.as_mut() else {
            return Err(FlowError::Validation("Open a lesson first.".into()));
        };
        let request = flow.begin(self.session.as_ref(), now)?;
        Ok(PendingLesson {
            view: self.view_gate.current(),
            enrollment: self.enrollment_gate.issue(),
            request,
        })
    }

    /// Applies the server's answer. The returned enrollment replaces the
    /// local one unless a newer one was applied meanwhile. Advances to the
    /// next stop only if the learner is still on the lesson.
    ///
    /// # Errors
    ///
    /// The converted server error, already surfaced as a notice.
    pub async fn apply_complete_lesson(
        &mut self,
        pending: PendingLesson,
        response: Result<Enrollment, ApiError>,
    ) -> Result<bool, FlowError> {
        let still_viewing = self.view_gate.is_current(pending.view);
        let settled = match self.lesson.as_mut() {
            Some(flow) if still_viewing => flow.finish(response),
            _ => response.map_err(FlowError::from),
        };

        match settled {
            Err(err) => Err(self.surface(err).await),
            Ok(enrollment) => {
                self.replace_enrollment(pending.enrollment, enrollment);
                if !still_viewing {
                    warn!(
                        lesson = %pending.request.lesson_id,
                        "lesson completion arrived after navigation; not advancing"
                    );
                    return Ok(false);
                }
                self.notices.push(Notice::success("Lesson completed."));
                self.next().await
            }
        }
    }

    /// Marks the open lesson complete and advances.
    ///
    /// # Errors
    ///
    /// See [`CoursePlayerController::begin_complete_lesson`] and
    /// [`CoursePlayerController::apply_complete_lesson`].
    pub async fn complete_current_lesson(&mut self) -> Result<bool, FlowError> {
        let pending = match self.begin_complete_lesson() {
            Ok(pending) => pending,
            Err(err) => return Err(self.surface(err).await),
        };
        let token = self.token()?;
        let response = self.api.complete_lesson(&token, &pending.request).await;
        self.apply_complete_lesson(pending, response).await
    }

    // ─── Quizzes ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `FlowError::Validation` outside a quiz view or for unknown questions.
    pub fn answer(&mut self, question: QuestionId, value: AnswerValue) -> Result<(), FlowError> {
        self.require_ready()?;
        let now = self.config.clock.now();
        let flow = self.active_quiz()?;
        flow.answer(question, value, now)
    }

    /// # Errors
    ///
    /// `FlowError::Validation` when questions are unanswered (no request is
    /// issued), `FlowError::AuthRequired` without a session.
    pub fn begin_submit_quiz(&mut self) -> Result<PendingSubmission, FlowError> {
        self.require_ready()?;
        if self.session.is_none() {
            return Err(FlowError::AuthRequired);
        }
        let view = self.view_gate.current();
        let submission = self.active_quiz()?.begin_submit()?;
        Ok(PendingSubmission { view, submission })
    }

    /// Returns the outcome, or `None` if the learner left the quiz meanwhile.
    ///
    /// # Errors
    ///
    /// The converted server error, already surfaced as a notice.
    pub async fn apply_submit_quiz(
        &mut self,
        pending: PendingSubmission,
        response: Result<QuizOutcome, ApiError>,
    ) -> Result<Option<QuizOutcome>, FlowError> {
        if !self.view_gate.is_current(pending.view) {
            warn!(quiz = %pending.submission.quiz_id, "discarding quiz result for a view that is gone");
            return self.discard(response.map(|_| ())).await.map(|_| None);
        }
        let Some(flow) = self.quiz.as_mut() else {
            return Ok(None);
        };
        match flow.apply_submit(response) {
            Ok(outcome) => {
                let percent = if outcome.max_score == 0 {
                    0
                } else {
                    outcome.score * 100 / outcome.max_score
                };
                if outcome.passed {
                    self.notices.push(Notice::success(format!(
                        "Quiz passed with {percent}% ({}/{}).",
                        outcome.score, outcome.max_score
                    )));
                } else {
                    self.notices.push(Notice::warning(format!(
                        "Quiz not passed: {percent}% ({}/{}).",
                        outcome.score, outcome.max_score
                    )));
                }
                Ok(Some(outcome))
            }
            Err(err) => Err(self.surface(err).await),
        }
    }

    /// Submits the answers, then refreshes the enrollment so unlocks reflect
    /// the graded attempt.
    ///
    /// # Errors
    ///
    /// See [`CoursePlayerController::begin_submit_quiz`] and
    /// [`CoursePlayerController::apply_submit_quiz`].
    pub async fn submit_quiz(&mut self) -> Result<Option<QuizOutcome>, FlowError> {
        let pending = match self.begin_submit_quiz() {
            Ok(pending) => pending,
            Err(err) => return Err(self.surface(err).await),
        };
        let token = self.token()?;
        let response = self.api.submit_quiz(&token, &pending.submission).await;
        let graded = response.is_ok();
        let outcome = self.apply_submit_quiz(pending, response).await?;
        if graded {
            self.refresh_after_grading().await;
        }
        Ok(outcome)
    }

    // The attempt already counts; a failed refetch only leaves unlocks stale
    // until the next refresh, so it stays out of the notices. A suspension
    // still signs out.
    async fn refresh_after_grading(&mut self) {
        let Ok(pending) = self.begin_refresh_enrollment() else {
            return;
        };
        let Ok(token) = self.token() else {
            return;
        };
        match self.api.get_enrollment(&token, &self.course_id).await {
            Ok(enrollment) => {
                self.replace_enrollment(pending.ticket, enrollment);
            }
            Err(ApiError::AccountSuspended) => {
                self.fail(ApiError::AccountSuspended).await;
            }
            Err(err) => {
                warn!(course = %self.course_id, error = %err, "enrollment refresh after quiz failed");
            }
        }
    }

    /// # Errors
    ///
    /// `FlowError::Validation` unless the last attempt failed and a retake is
    /// allowed.
    pub fn retake_quiz(&mut self) -> Result<(), FlowError> {
        self.require_ready()?;
        let now = self.config.clock.now();
        let result = self.active_quiz()?.retake(now);
        if let Err(err) = &result {
            self.notify(err);
        }
        result
    }

    /// After a passed quiz, moves on like `next`.
    ///
    /// # Errors
    ///
    /// `FlowError::Validation` unless the quiz result is a pass.
    pub async fn continue_after_quiz(&mut self) -> Result<bool, FlowError> {
        let passed = self.mode == ViewMode::Quiz
            && self
                .quiz
                .as_ref()
                .is_some_and(QuizAttemptFlow::can_continue);
        if !passed {
            let err = FlowError::Validation("Pass the quiz to continue.".into());
            self.notify(&err);
            return Err(err);
        }
        self.next().await
    }

    // ─── Certificate ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `FlowError::AuthRequired` without a session.
    pub fn begin_open_certificate(&mut self) -> Result<CertificateOpening, FlowError> {
        self.require_ready()?;
        let gate = self.certificate_gate();
        if !gate.is_reachable() {
            self.notices.push(Notice::info(AWAITING_APPROVAL));
            return Ok(CertificateOpening::Refused);
        }
        if self.session.is_none() {
            return Err(FlowError::AuthRequired);
        }

        let view = self.view_gate.issue();
        self.mode = ViewMode::Certificate;
        self.lesson = None;
        self.quiz = None;

        if let Some(immediate) = gate.immediate_view() {
            self.certificate = Some(immediate);
            return Ok(CertificateOpening::Opened);
        }
        match gate.fetch_id() {
            Some(id) => {
                self.certificate = Some(CertificateView::Loading);
                Ok(CertificateOpening::NeedsFetch(PendingCertificate {
                    view,
                    certificate_id: id.clone(),
                }))
            }
            None => {
                self.certificate = Some(CertificateView::Failed(
                    FlowError::Unavailable("The certificate".into()).user_message(),
                ));
                Ok(CertificateOpening::Opened)
            }
        }
    }

    /// # Errors
    ///
    /// Only a suspended account is an error; other failures render
    /// `CertificateView::Failed`.
    pub async fn apply_certificate(
        &mut self,
        pending: PendingCertificate,
        response: Result<Certificate, ApiError>,
    ) -> Result<bool, FlowError> {
        if !self.view_gate.is_current(pending.view) {
            warn!(certificate = %pending.certificate_id, "discarding certificate for a view that is gone");
            return self.discard(response.map(|_| ())).await;
        }
        match CertificateView::from_response(response) {
            Ok(view) => {
                if let CertificateView::Failed(message) = &view {
                    warn!(certificate = %pending.certificate_id, %message, "certificate fetch failed");
                }
                self.certificate = Some(view);
                Ok(true)
            }
            Err(err) => Err(self.surface(err).await),
        }
    }

    /// Shows the certificate, or a notice if it has not been issued.
    ///
    /// Returns whether the view moved.
    ///
    /// # Errors
    ///
    /// See [`CoursePlayerController::begin_open_certificate`].
    pub async fn open_certificate(&mut self) -> Result<bool, FlowError> {
        let opening = match self.begin_open_certificate() {
            Ok(opening) => opening,
            Err(err) => return Err(self.surface(err).await),
        };
        match opening {
            CertificateOpening::Refused => Ok(false),
            CertificateOpening::Opened => Ok(true),
            CertificateOpening::NeedsFetch(pending) => {
                let token = self.token()?;
                let response = self
                    .api
                    .get_certificate(&token, &pending.certificate_id)
                    .await;
                self.apply_certificate(pending, response).await
            }
        }
    }

    // ─── Enrollment refresh ────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `FlowError::AuthRequired` without a session.
    pub fn begin_refresh_enrollment(&mut self) -> Result<PendingEnrollment, FlowError> {
        if self.session.is_none() {
            return Err(FlowError::AuthRequired);
        }
        Ok(PendingEnrollment {
            ticket: self.enrollment_gate.issue(),
        })
    }

    /// Returns whether the response replaced the local enrollment.
    ///
    /// # Errors
    ///
    /// The converted server error, already surfaced as a notice.
    pub async fn apply_refresh_enrollment(
        &mut self,
        pending: PendingEnrollment,
        response: Result<Enrollment, ApiError>,
    ) -> Result<bool, FlowError> {
        match response {
            Ok(enrollment) => Ok(self.replace_enrollment(pending.ticket, enrollment)),
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Refetches the enrollment.
    ///
    /// # Errors
    ///
    /// See [`CoursePlayerController::apply_refresh_enrollment`].
    pub async fn refresh_enrollment(&mut self) -> Result<bool, FlowError> {
        let pending = match self.begin_refresh_enrollment() {
            Ok(pending) => pending,
            Err(err) => return Err(self.surface(err).await),
        };
        let token = self.token()?;
        let response = self.api.get_enrollment(&token, &self.course_id).await;
        self.apply_refresh_enrollment(pending, response).await
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    fn require_ready(&self) -> Result<(), FlowError> {
        match &self.state {
            PlayerState::Ready => Ok(()),
            PlayerState::NotEnrolled => Err(FlowError::NotEnrolled),
            PlayerState::SignedOut { .. } => Err(FlowError::AuthRequired),
            PlayerState::Loading | PlayerState::Failed(_) => {
                Err(FlowError::Unavailable("The course".into()))
            }
        }
    }

    fn token(&self) -> Result<AuthToken, FlowError> {
        self.session
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(FlowError::AuthRequired)
    }

    fn active_quiz(&mut self) -> Result<&mut QuizAttemptFlow, FlowError> {
        if self.mode != ViewMode::Quiz {
            return Err(FlowError::Validation("Open a quiz first.".into()));
        }
        self.quiz
            .as_mut()
            .ok_or_else(|| FlowError::Validation("Open a quiz first.".into()))
    }

    // Replaces the enrollment wholesale if `ticket` is the newest seen.
    fn replace_enrollment(&mut self, ticket: Ticket, enrollment: Enrollment) -> bool {
        if !self.enrollment_gate.accept(ticket) {
            warn!(generation = ticket.generation(), "discarding stale enrollment");
            return false;
        }
        self.progress = EnrollmentProgress::from_enrollment(&enrollment);
        self.enrollment = Some(enrollment);
        if matches!(self.state, PlayerState::Loading | PlayerState::NotEnrolled) {
            self.state = PlayerState::Ready;
        }
        true
    }

    // Moves the view without checking unlock rules.
    fn enter(&mut self, target: Target) -> Result<Opening, FlowError> {
        let stop = self
            .course
            .as_ref()
            .and_then(|course| resolve(course, target))
            .ok_or_else(|| FlowError::Unavailable("That part of the course".into()))?;

        let view = self.view_gate.issue();
        self.current = Some(target);
        self.certificate = None;
        debug!(?target, generation = view.generation(), "opening");

        match stop {
            Stop::Lesson(section_id, lesson_id) => {
                self.mode = ViewMode::Lesson;
                self.quiz = None;
                self.lesson = Some(LessonCompletionFlow::open(
                    self.course_id.clone(),
                    section_id,
                    lesson_id,
                    self.config.clock.now(),
                ));
                Ok(Opening::Opened)
            }
            Stop::Quiz(section_id, quiz_id) => {
                self.mode = ViewMode::Quiz;
                self.lesson = None;
                let mut flow = QuizAttemptFlow::new(
                    self.course_id.clone(),
                    section_id,
                    quiz_id,
                    self.config.retake_policy,
                );
                let loaded = flow.begin_load();
                self.quiz = Some(flow);
                match loaded {
                    Ok(quiz_id) => Ok(Opening::NeedsQuiz(PendingQuizLoad { view, quiz_id })),
                    Err(err) => {
                        self.notify(&err);
                        Ok(Opening::Opened)
                    }
                }
            }
        }
    }

    async fn resume(&mut self) -> Result<(), FlowError> {
        let target = self
            .course
            .as_ref()
            .and_then(|course| self.navigator.resume(course, &self.progress, &self.policy));
        match target {
            Some(target) => self.open(target).await.map(|_| ()),
            None => Ok(()),
        }
    }

    // Every section cleared, and the final quiz passed when there is one.
    fn course_cleared(&self) -> bool {
        let Some(course) = self.course.as_ref() else {
            return false;
        };
        (0..course.sections().len()).all(|index| section_cleared(course, &self.progress, index))
            && (course.final_quiz().is_none() || self.progress.final_quiz_passed())
    }

    async fn reach_completion(&mut self) -> Result<bool, FlowError> {
        if !self.course_cleared() {
            debug!(course = %self.course_id, "end of sequence but course not cleared");
            self.notices.push(Notice::warning(UNFINISHED));
            return Ok(false);
        }
        if self.certificate_gate().is_reachable() {
            info!(course = %self.course_id, "course complete; opening certificate");
            self.open_certificate().await
        } else {
            info!(course = %self.course_id, "course complete; certificate not issued yet");
            self.notices.push(Notice::info(AWAITING_APPROVAL));
            Ok(false)
        }
    }

    // A response for a view that is gone changes nothing, except that a
    // suspended account still signs the learner out.
    async fn discard(&mut self, response: Result<(), ApiError>) -> Result<bool, FlowError> {
        match response {
            Err(ApiError::AccountSuspended) => Err(self.fail(ApiError::AccountSuspended).await),
            _ => Ok(false),
        }
    }

    async fn fail(&mut self, err: ApiError) -> FlowError {
        self.surface(FlowError::from(err)).await
    }

    async fn surface(&mut self, err: FlowError) -> FlowError {
        if err == FlowError::AccountSuspended {
            self.sign_out_suspended().await;
        } else {
            self.notify(&err);
        }
        err
    }

    fn notify(&mut self, err: &FlowError) {
        warn!(course = %self.course_id, error = %err, "player action failed");
        self.notices.push(Notice::error(err.user_message()));
    }

    async fn sign_out_suspended(&mut self) {
        warn!(course = %self.course_id, "account suspended; signing out");
        if let Err(err) = self.sessions.clear_session().await {
            warn!(error = %err, "could not clear stored session");
        }
        self.session = None;
        self.state = PlayerState::SignedOut { suspended: true };
        self.lesson = None;
        self.quiz = None;
        self.certificate = None;
        self.view_gate.issue();
        self.notices
            .push(Notice::error(FlowError::AccountSuspended.user_message()));
    }
}

fn resolve(course: &Course, target: Target) -> Option<Stop> {
    match target {
        Target::Lesson { section, lesson } => {
            let section = course.section(section)?;
            let lesson = section.lesson(lesson)?;
            Some(Stop::Lesson(section.id().clone(), lesson.id().clone()))
        }
        Target::SectionQuiz { section } => {
            let section = course.section(section)?;
            section
                .has_quiz()
                .then(|| Stop::Quiz(Some(section.id().clone()), section.quiz().cloned()))
        }
        Target::FinalQuiz => course
            .final_quiz()
            .map(|quiz| Stop::Quiz(None, Some(quiz.clone()))),
    }
}

fn locked_message(target: Target) -> &'static str {
    match target {
        Target::Lesson { section, lesson: 0 } if section > 0 => {
            "Finish the previous section to unlock this one."
        }
        Target::Lesson { .. } => "Complete the previous lesson to unlock this one.",
        Target::SectionQuiz { .. } => "Complete every lesson in this section to unlock its quiz.",
        Target::FinalQuiz => "Clear every section to unlock the final quiz.",
    }
}

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use course_core::model::{
    AuthSession, AuthToken, Certificate, CertificateId, CertificateRef, CertificateStatus,
    Course, CourseId, Enrollment, Lesson, LessonId, Question, QuestionId, QuestionType, Quiz,
    QuizId, QuizOutcome, QuizScore, Section, SectionId, UserId, UserProfile,
};
use course_core::time::{fixed_clock, fixed_now};
use services::{
    ApiError, CourseApi, CourseDetail, CoursePlayerController, LessonCompletion, PlayerConfig,
    QuizSubmission,
};
use storage::repository::InMemoryRepository;

/// How many times each endpoint was hit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub get_course: usize,
    pub enroll: usize,
    pub get_enrollment: usize,
    pub complete_lesson: usize,
    pub get_quiz: usize,
    pub submit_quiz: usize,
    pub get_certificate: usize,
}

struct FakeState {
    course: Course,
    enrollment: Option<Enrollment>,
    quizzes: HashMap<QuizId, Quiz>,
    outcomes: VecDeque<QuizOutcome>,
    certificate_on_pass: Option<CertificateRef>,
    certificate: Option<Certificate>,
    fail_next: Option<ApiError>,
    fail_enrollment: Option<ApiError>,
    lesson_requests: Vec<LessonCompletion>,
    submissions: Vec<QuizSubmission>,
    calls: Calls,
}

/// In-memory course server that grades from a script.
pub struct FakeCourseApi {
    state: Mutex<FakeState>,
}

impl FakeCourseApi {
    pub fn new(course: Course) -> Self {
        Self {
            state: Mutex::new(FakeState {
                course,
                enrollment: None,
                quizzes: HashMap::new(),
                outcomes: VecDeque::new(),
                certificate_on_pass: None,
                certificate: None,
                fail_next: None,
                fail_enrollment: None,
                lesson_requests: Vec::new(),
                submissions: Vec::new(),
                calls: Calls::default(),
            }),
        }
    }

    pub fn with_enrollment(self, enrollment: Enrollment) -> Self {
        self.state.lock().unwrap().enrollment = Some(enrollment);
        self
    }

    pub fn with_quiz(self, quiz: Quiz) -> Self {
        self.state
            .lock()
            .unwrap()
            .quizzes
            .insert(quiz.id().clone(), quiz);
        self
    }

    /// Issued (and returned in the outcome) on the next passed quiz.
    pub fn with_certificate_on_pass(self, certificate: CertificateRef) -> Self {
        self.state.lock().unwrap().certificate_on_pass = Some(certificate);
        self
    }

    pub fn with_certificate(self, certificate: Certificate) -> Self {
        self.state.lock().unwrap().certificate = Some(certificate);
        self
    }

    pub fn script_outcome(&self, outcome: QuizOutcome) {
        self.state.lock().unwrap().outcomes.push_back(outcome);
    }

    pub fn fail_next(&self, err: ApiError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Fails the next enrollment fetch only.
    pub fn fail_next_enrollment(&self, err: ApiError) {
        self.state.lock().unwrap().fail_enrollment = Some(err);
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn enrollment(&self) -> Option<Enrollment> {
        self.state.lock().unwrap().enrollment.clone()
    }

    pub fn lesson_requests(&self) -> Vec<LessonCompletion> {
        self.state.lock().unwrap().lesson_requests.clone()
    }

    pub fn submissions(&self) -> Vec<QuizSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    fn take_failure(state: &mut FakeState) -> Result<(), ApiError> {
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn with_recomputed_progress(course: &Course, enrollment: Enrollment) -> Enrollment {
    let done: usize = enrollment
        .section_progress
        .iter()
        .map(|s| s.lessons.iter().filter(|l| l.is_completed).count())
        .sum();
    let total = course.total_lessons().max(1);
    #[allow(clippy::cast_precision_loss)]
    let percent = done as f64 * 100.0 / total as f64;
    enrollment.with_overall_progress(percent)
}

#[async_trait]
impl CourseApi for FakeCourseApi {
    async fn get_course(
        &self,
        _token: Option<&AuthToken>,
        _course: &CourseId,
    ) -> Result<CourseDetail, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_course += 1;
        Self::take_failure(&mut state)?;
        Ok(CourseDetail {
            course: state.course.clone(),
            enrollment: state.enrollment.clone(),
        })
    }

    async fn enroll(&self, _token: &AuthToken, course: &CourseId) -> Result<Enrollment, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.enroll += 1;
        Self::take_failure(&mut state)?;
        let enrollment = Enrollment::new(course.clone());
        state.enrollment = Some(enrollment.clone());
        Ok(enrollment)
    }

    async fn get_enrollment(
        &self,
        _token: &AuthToken,
        _course: &CourseId,
    ) -> Result<Enrollment, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_enrollment += 1;
        Self::take_failure(&mut state)?;
        if let Some(err) = state.fail_enrollment.take() {
            return Err(err);
        }
        state.enrollment.clone().ok_or(ApiError::NotFound)
    }

    async fn complete_lesson(
        &self,
        _token: &AuthToken,
        request: &LessonCompletion,
    ) -> Result<Enrollment, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.complete_lesson += 1;
        Self::take_failure(&mut state)?;
        state.lesson_requests.push(request.clone());
        let current = state.enrollment.clone().ok_or(ApiError::NotFound)?;
        let updated = with_recomputed_progress(
            &state.course,
            current.with_lesson_completed(&request.section_id, &request.lesson_id),
        );
        state.enrollment = Some(updated.clone());
        Ok(updated)
    }

    async fn get_quiz(&self, _token: Option<&AuthToken>, quiz: &QuizId) -> Result<Quiz, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_quiz += 1;
        Self::take_failure(&mut state)?;
        state.quizzes.get(quiz).cloned().ok_or(ApiError::NotFound)
    }

    async fn submit_quiz(
        &self,
        _token: &AuthToken,
        submission: &QuizSubmission,
    ) -> Result<QuizOutcome, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.submit_quiz += 1;
        Self::take_failure(&mut state)?;
        state.submissions.push(submission.clone());

        let mut graded = state
            .outcomes
            .pop_front()
            .unwrap_or_else(|| outcome(true, 1));
        let score = QuizScore {
            score: graded.score,
            passed: graded.passed,
            attempt_count: graded.attempt_count,
        };
        let mut enrollment = state.enrollment.clone().ok_or(ApiError::NotFound)?;
        enrollment = match &submission.section_id {
            Some(section) => enrollment.with_section_quiz(section, score),
            None => enrollment.with_final_quiz(score),
        };
        if graded.passed {
            if let Some(certificate) = state.certificate_on_pass.take() {
                enrollment = enrollment.with_certificate(certificate.clone());
                graded.certificate = Some(certificate);
            }
        }
        state.enrollment = Some(enrollment);
        Ok(graded)
    }

    async fn get_certificate(
        &self,
        _token: &AuthToken,
        certificate: &CertificateId,
    ) -> Result<Certificate, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_certificate += 1;
        Self::take_failure(&mut state)?;
        state
            .certificate
            .clone()
            .filter(|c| &c.id == certificate)
            .ok_or(ApiError::NotFound)
    }
}

// ─── Fixtures ──────────────────────────────────────────────────────────────────

pub fn course_id() -> CourseId {
    CourseId::new("rust-101")
}

fn section(id: &str, order: u32, lessons: &[&str], quiz: Option<&str>) -> Section {
    let lessons = lessons
        .iter()
        .enumerate()
        .map(|(i, l)| Lesson::new(LessonId::new(*l), format!("Lesson {l}"), u32::try_from(i).unwrap()))
        .collect();
    Section::new(
        SectionId::new(id),
        format!("Section {id}"),
        order,
        lessons,
        quiz.map(QuizId::new),
    )
    .unwrap()
}

/// One section, two lessons, one section quiz, no final quiz.
pub fn single_section_course() -> Course {
    Course::new(
        course_id(),
        "Rust 101",
        vec![section("s1", 0, &["l1", "l2"], Some("q1"))],
        None,
    )
    .unwrap()
}

/// Two sections, each with a quiz, plus a final quiz.
pub fn two_section_course() -> Course {
    Course::new(
        course_id(),
        "Rust 101",
        vec![
            section("s1", 0, &["l1", "l2"], Some("q1")),
            section("s2", 1, &["l3"], Some("q2")),
        ],
        Some(QuizId::new("final")),
    )
    .unwrap()
}

pub fn quiz(id: &str) -> Quiz {
    Quiz::new(
        QuizId::new(id),
        format!("Quiz {id}"),
        vec![
            Question::new(QuestionId::new("a"), "Pick one", QuestionType::MultipleChoice)
                .with_options(vec!["x".into(), "y".into(), "z".into()]),
            Question::new(QuestionId::new("b"), "True?", QuestionType::TrueFalse),
        ],
        70,
    )
    .unwrap()
}

pub fn outcome(passed: bool, attempt_count: u32) -> QuizOutcome {
    QuizOutcome {
        score: if passed { 9 } else { 4 },
        max_score: 10,
        passed,
        attempt_count,
        results: Vec::new(),
        certificate: None,
    }
}

pub fn certificate(id: &str, status: CertificateStatus) -> Certificate {
    Certificate {
        id: CertificateId::new(id),
        status,
        course_id: Some(course_id()),
        course_title: Some("Rust 101".into()),
        learner_name: Some("Ada Lovelace".into()),
        issued_at: Some(fixed_now()),
        approved_at: None,
        rejection_reason: None,
        verification_code: Some("RUST-0001".into()),
    }
}

pub fn session() -> AuthSession {
    AuthSession {
        token: AuthToken::new("learner-token").unwrap(),
        user: UserProfile {
            id: UserId::new("learner-1"),
            name: "Ada Lovelace".into(),
            email: Some("ada@example.com".into()),
            role: Some("student".into()),
        },
        saved_at: fixed_now(),
    }
}

pub fn enrolled() -> Enrollment {
    Enrollment::new(course_id())
}

/// Controller over `api` with an optional stored session.
pub fn player(
    api: &Arc<FakeCourseApi>,
    signed_in: bool,
) -> (CoursePlayerController, InMemoryRepository) {
    let sessions = if signed_in {
        InMemoryRepository::with_session(session())
    } else {
        InMemoryRepository::new()
    };
    let controller = CoursePlayerController::new(
        api.clone(),
        Arc::new(sessions.clone()),
        course_id(),
        PlayerConfig::default().with_clock(fixed_clock()),
    );
    (controller, sessions)
}

mod common;

use std::sync::Arc;

use common::{
    FakeCourseApi, course_id, enrolled, outcome, player, quiz, single_section_course,
    two_section_course,
};
use course_core::Target;
use course_core::model::{AnswerValue, LessonId, QuestionId, QuizScore, SectionId};
use services::{ApiError, FlowError, NoticeKind, PlayerState, QuizState, ViewMode};
use storage::repository::SessionRepository;

fn lesson(section: usize, lesson: usize) -> Target {
    Target::Lesson { section, lesson }
}

#[tokio::test]
async fn passing_the_section_quiz_reaches_course_completion() {
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(enrolled())
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    assert_eq!(player.state(), &PlayerState::Ready);
    assert_eq!(player.current(), Some(lesson(0, 0)));
    assert!(!player.is_unlocked(lesson(0, 1)));

    // Completing lesson 1 unlocks lesson 2 and advances to it.
    assert_eq!(player.complete_current_lesson().await, Ok(true));
    assert_eq!(player.current(), Some(lesson(0, 1)));
    assert!(player.is_unlocked(lesson(0, 1)));
    assert!(!player.is_unlocked(Target::SectionQuiz { section: 0 }));

    // Completing lesson 2 unlocks the quiz and opens it.
    assert_eq!(player.complete_current_lesson().await, Ok(true));
    assert_eq!(player.current(), Some(Target::SectionQuiz { section: 0 }));
    assert_eq!(player.view_mode(), ViewMode::Quiz);
    assert_eq!(player.quiz_flow().unwrap().state(), &QuizState::Ready);

    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(1))
        .unwrap();
    player
        .answer(QuestionId::new("b"), AnswerValue::Bool(true))
        .unwrap();
    api.script_outcome(outcome(true, 1));
    let graded = player.submit_quiz().await.unwrap().unwrap();
    assert!(graded.passed);
    assert!(player.progress().unwrap().section_quiz_passed(&SectionId::new("s1")));

    player.drain_notices();
    assert_eq!(player.continue_after_quiz().await, Ok(false));
    let notices = player.drain_notices();
    assert!(
        notices
            .iter()
            .any(|n| n.kind == NoticeKind::Info && n.message.contains("awaiting admin approval"))
    );
}

#[tokio::test]
async fn local_enrollment_equals_server_enrollment_after_completion() {
    let api = Arc::new(FakeCourseApi::new(single_section_course()).with_enrollment(enrolled()));
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    player.complete_current_lesson().await.unwrap();

    assert_eq!(player.enrollment(), api.enrollment().as_ref());
    assert_eq!(player.progress().unwrap().overall_percent(), 50);
    let sent = api.lesson_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].lesson_id, LessonId::new("l1"));
    assert_eq!(sent[0].time_spent_minutes, 1);
}

#[tokio::test]
async fn failing_the_quiz_then_retaking_clears_answers() {
    let done = enrolled()
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l1"))
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();
    assert_eq!(player.current(), Some(Target::SectionQuiz { section: 0 }));

    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(0))
        .unwrap();
    player
        .answer(QuestionId::new("b"), AnswerValue::Bool(false))
        .unwrap();
    api.script_outcome(outcome(false, 1));
    let graded = player.submit_quiz().await.unwrap().unwrap();
    assert!(!graded.passed);

    assert!(matches!(
        player.continue_after_quiz().await,
        Err(FlowError::Validation(_))
    ));

    player.retake_quiz().unwrap();
    let flow = player.quiz_flow().unwrap();
    assert_eq!(flow.state(), &QuizState::Answering);
    assert!(flow.answers().is_empty());
    assert_eq!(flow.missing().len(), 2);
}

#[tokio::test]
async fn unanswered_submission_never_reaches_the_server() {
    let done = enrolled()
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l1"))
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(2))
        .unwrap();
    let err = player.submit_quiz().await.unwrap_err();

    assert!(matches!(err, FlowError::Validation(_)));
    assert_eq!(api.calls().submit_quiz, 0);
    assert_eq!(player.quiz_flow().unwrap().state(), &QuizState::Answering);
    assert!(
        player
            .drain_notices()
            .iter()
            .any(|n| n.message.contains("answer all questions"))
    );
}

#[tokio::test]
async fn previous_from_a_quiz_lands_on_the_last_lesson() {
    let done = enrolled()
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l1"))
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();
    player.open(lesson(0, 0)).await.unwrap();
    player.next().await.unwrap();
    player.next().await.unwrap();
    assert_eq!(player.current(), Some(Target::SectionQuiz { section: 0 }));

    assert_eq!(player.previous().await, Ok(true));
    assert_eq!(player.current(), Some(lesson(0, 1)));
    assert_eq!(player.view_mode(), ViewMode::Lesson);
}

#[tokio::test]
async fn next_section_stays_locked_until_its_predecessor_quiz_passes() {
    let api = Arc::new(
        FakeCourseApi::new(two_section_course())
            .with_enrollment(enrolled())
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    player.drain_notices();
    assert_eq!(player.open(lesson(1, 0)).await, Ok(false));
    assert_eq!(player.current(), Some(lesson(0, 0)));
    let notices = player.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Warning);

    assert!(matches!(
        player.open(lesson(7, 0)).await,
        Err(FlowError::Unavailable(_))
    ));

    let outline = player.outline().unwrap();
    assert!(outline.sections[0].lessons[0].current);
    assert!(!outline.sections[1].lessons[0].unlocked);
    assert!(!outline.final_quiz.unwrap().unlocked);
}

#[tokio::test]
async fn failed_completion_leaves_enrollment_untouched_and_can_be_retried() {
    let api = Arc::new(FakeCourseApi::new(single_section_course()).with_enrollment(enrolled()));
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();
    let before = player.enrollment().cloned();

    api.fail_next(ApiError::HttpStatus {
        status: 500,
        message: "database down".into(),
    });
    let err = player.complete_current_lesson().await.unwrap_err();

    assert!(matches!(err, FlowError::NetworkOrServer(_)));
    assert_eq!(player.enrollment().cloned(), before);
    assert_eq!(player.current(), Some(lesson(0, 0)));

    assert_eq!(player.complete_current_lesson().await, Ok(true));
    assert_eq!(api.calls().complete_lesson, 2);
}

#[tokio::test]
async fn unenrolled_learner_must_enroll_first() {
    let api = Arc::new(FakeCourseApi::new(single_section_course()));
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    assert_eq!(player.state(), &PlayerState::NotEnrolled);
    assert!(player.outline().is_none());
    assert_eq!(player.next().await, Err(FlowError::NotEnrolled));
    assert_eq!(
        player.complete_current_lesson().await,
        Err(FlowError::NotEnrolled)
    );

    player.enroll().await.unwrap();
    assert_eq!(player.state(), &PlayerState::Ready);
    assert_eq!(player.current(), Some(lesson(0, 0)));
    assert_eq!(api.calls().enroll, 1);
    assert_eq!(
        player.enrollment().and_then(|e| e.course_id.clone()),
        Some(course_id())
    );
}

#[tokio::test]
async fn signed_out_learner_cannot_enroll_or_complete() {
    let api = Arc::new(FakeCourseApi::new(single_section_course()));
    let (mut player, _) = player(&api, false);
    player.load().await.unwrap();
    assert_eq!(player.state(), &PlayerState::NotEnrolled);
    assert_eq!(api.calls().get_enrollment, 0);

    assert_eq!(player.enroll().await, Err(FlowError::AuthRequired));
    assert_eq!(api.calls().enroll, 0);

    let api = Arc::new(FakeCourseApi::new(single_section_course()).with_enrollment(enrolled()));
    let (mut anonymous, _) = common::player(&api, false);
    anonymous.load().await.unwrap();
    assert_eq!(
        anonymous.complete_current_lesson().await,
        Err(FlowError::AuthRequired)
    );
    assert_eq!(api.calls().complete_lesson, 0);
}

#[tokio::test]
async fn missing_quiz_renders_unavailable() {
    let done = enrolled()
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l1"))
        .with_lesson_completed(&SectionId::new("s1"), &LessonId::new("l2"));
    // No quiz document registered: the fetch 404s.
    let api = Arc::new(FakeCourseApi::new(single_section_course()).with_enrollment(done));
    let (mut player, _) = player(&api, true);

    let err = player.load().await.unwrap_err();

    assert!(matches!(err, FlowError::Unavailable(_)));
    assert_eq!(player.view_mode(), ViewMode::Quiz);
    assert!(matches!(
        player.quiz_flow().unwrap().state(),
        QuizState::Unavailable(_)
    ));
    assert_eq!(player.previous().await, Ok(true));
    assert_eq!(player.current(), Some(lesson(0, 1)));
}

fn passed(score: u32) -> QuizScore {
    QuizScore {
        score,
        passed: true,
        attempt_count: 1,
    }
}

#[tokio::test]
async fn next_after_a_failed_last_quiz_does_not_complete_the_course() {
    let s1 = SectionId::new("s1");
    let done = enrolled()
        .with_lesson_completed(&s1, &LessonId::new("l1"))
        .with_lesson_completed(&s1, &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();

    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(0))
        .unwrap();
    player
        .answer(QuestionId::new("b"), AnswerValue::Bool(false))
        .unwrap();
    api.script_outcome(outcome(false, 1));
    let graded = player.submit_quiz().await.unwrap().unwrap();
    assert!(!graded.passed);
    player.drain_notices();

    assert_eq!(player.next().await, Ok(false));

    let notices = player.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Warning);
    assert!(!notices[0].message.contains("awaiting"));
    assert_eq!(player.current(), Some(Target::SectionQuiz { section: 0 }));
    assert_eq!(player.view_mode(), ViewMode::Quiz);
    assert_eq!(api.calls().get_certificate, 0);
}

#[tokio::test]
async fn next_from_an_unpassed_final_quiz_does_not_complete_the_course() {
    let s1 = SectionId::new("s1");
    let s2 = SectionId::new("s2");
    let sections_cleared = enrolled()
        .with_lesson_completed(&s1, &LessonId::new("l1"))
        .with_lesson_completed(&s1, &LessonId::new("l2"))
        .with_section_quiz(&s1, passed(8))
        .with_lesson_completed(&s2, &LessonId::new("l3"))
        .with_section_quiz(&s2, passed(9));
    let api = Arc::new(
        FakeCourseApi::new(two_section_course())
            .with_enrollment(sections_cleared)
            .with_quiz(quiz("final")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();
    assert_eq!(player.current(), Some(Target::FinalQuiz));
    player.drain_notices();

    assert_eq!(player.next().await, Ok(false));

    let notices = player.drain_notices();
    assert!(notices.iter().all(|n| !n.message.contains("awaiting")));
    assert!(notices.iter().any(|n| n.kind == NoticeKind::Warning));
    assert_eq!(player.current(), Some(Target::FinalQuiz));
}

#[tokio::test]
async fn failed_refetch_after_grading_stays_quiet() {
    let s1 = SectionId::new("s1");
    let done = enrolled()
        .with_lesson_completed(&s1, &LessonId::new("l1"))
        .with_lesson_completed(&s1, &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, _) = player(&api, true);
    player.load().await.unwrap();
    assert_eq!(player.current(), Some(Target::SectionQuiz { section: 0 }));
    player.drain_notices();

    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(1))
        .unwrap();
    player
        .answer(QuestionId::new("b"), AnswerValue::Bool(true))
        .unwrap();
    api.fail_next_enrollment(ApiError::Network("connection reset".into()));
    let graded = player.submit_quiz().await.unwrap().unwrap();
    assert!(graded.passed);

    let notices = player.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Success);
    assert_eq!(player.state(), &PlayerState::Ready);
    assert!(!player.progress().unwrap().section_quiz_passed(&s1));

    // An explicit refresh catches up.
    assert_eq!(player.refresh_enrollment().await, Ok(true));
    assert!(player.progress().unwrap().section_quiz_passed(&s1));
}

#[tokio::test]
async fn suspension_during_refetch_after_grading_signs_out() {
    let s1 = SectionId::new("s1");
    let done = enrolled()
        .with_lesson_completed(&s1, &LessonId::new("l1"))
        .with_lesson_completed(&s1, &LessonId::new("l2"));
    let api = Arc::new(
        FakeCourseApi::new(single_section_course())
            .with_enrollment(done)
            .with_quiz(quiz("q1")),
    );
    let (mut player, sessions) = player(&api, true);
    player.load().await.unwrap();
    player
        .answer(QuestionId::new("a"), AnswerValue::Choice(1))
        .unwrap();
    player
        .answer(QuestionId::new("b"), AnswerValue::Bool(true))
        .unwrap();

    api.fail_next_enrollment(ApiError::AccountSuspended);
    player.submit_quiz().await.unwrap();

    assert_eq!(player.state(), &PlayerState::SignedOut { suspended: true });
    assert!(sessions.load_session().await.unwrap().is_none());
}

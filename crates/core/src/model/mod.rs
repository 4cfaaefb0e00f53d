mod account;
mod certificate;
mod course;
mod enrollment;
mod ids;
mod quiz;

pub use ids::{
    CertificateId, CourseId, LessonId, ParseIdError, QuestionId, QuizId, SectionId, UserId,
};

pub use account::{AuthSession, AuthToken, UserProfile};
pub use certificate::{Certificate, CertificateRef, CertificateStatus};
pub use course::{Course, CourseError, Lesson, Section};
pub use enrollment::{Enrollment, EnrollmentStatus, LessonProgress, QuizScore, SectionProgress};
pub use quiz::{
    AnswerSheet, AnswerValue, Question, QuestionFeedback, QuestionType, Quiz, QuizError,
    QuizOutcome, QuizPayload, SubmittedAnswer,
};

//! Client-side progression: flows, gates and the controller that owns them.

mod certificate;
mod controller;
mod generation;
mod layout;
mod lesson;
mod notice;
mod outline;
mod quiz;

pub use certificate::{CertificateGate, CertificateView};
pub use controller::{
    CertificateOpening, CoursePlayerController, Opening, PendingCertificate, PendingEnrollment,
    PendingLesson, PendingQuizLoad, PendingSubmission, PlayerState, ViewMode,
};
pub use generation::{RequestGate, Ticket};
pub use layout::LayoutState;
pub use lesson::{LessonCompletionFlow, LessonFlowState};
pub use notice::{Notice, NoticeKind, Notices};
pub use outline::{CourseOutline, OutlineLesson, OutlineQuiz, OutlineSection};
pub use quiz::{QuizAttemptFlow, QuizState, RetakePolicy};

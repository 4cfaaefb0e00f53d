#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod config;
pub mod error;
pub mod player;

pub use course_core::Clock;

pub use api::{CourseApi, CourseDetail, HttpCourseApi, LessonCompletion, QuizSubmission};
pub use app_services::AppServices;
pub use config::{ApiConfig, ConfigError, PlayerConfig};
pub use error::{ApiError, AppServicesError, FlowError};
pub use player::{
    CertificateGate, CertificateOpening, CertificateView, CourseOutline, CoursePlayerController,
    LayoutState, Notice, NoticeKind, Opening, PlayerState, QuizAttemptFlow, QuizState,
    RetakePolicy, ViewMode,
};

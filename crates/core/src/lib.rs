#![forbid(unsafe_code)]
//! Course structure, enrollment progress and the pure rules that gate a
//! learner's path through a course.

pub mod error;
pub mod model;
pub mod navigation;
pub mod progress;
pub mod time;
pub mod unlock;

pub use error::Error;
pub use navigation::{NavigationSequencer, Step};
pub use progress::{EnrollmentProgress, SectionCompletion};
pub use time::{Clock, LessonTimer};
pub use unlock::{Target, UnlockPolicy};

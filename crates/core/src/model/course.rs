use serde::Deserialize;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, QuizId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("two sections share order {order}")]
    DuplicateSectionOrder { order: u32 },

    #[error("two lessons in section {section} share order {order}")]
    DuplicateLessonOrder { section: SectionId, order: u32 },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single lesson. The content payload is opaque to the progression engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    order: u32,
    content: serde_json::Value,
    duration_minutes: Option<u32>,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, order: u32) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            content: serde_json::Value::Null,
            duration_minutes: None,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    #[must_use]
    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn content(&self) -> &serde_json::Value {
        &self.content
    }

    #[must_use]
    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// An ordered group of lessons, optionally gated by a section quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    id: SectionId,
    title: String,
    order: u32,
    lessons: Vec<Lesson>,
    quiz: Option<QuizId>,
}

impl Section {
    /// Creates a section, sorting lessons by their `order`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DuplicateLessonOrder` if two lessons share an order.
    pub fn new(
        id: SectionId,
        title: impl Into<String>,
        order: u32,
        mut lessons: Vec<Lesson>,
        quiz: Option<QuizId>,
    ) -> Result<Self, CourseError> {
        lessons.sort_by_key(Lesson::order);
        if let Some(pair) = lessons.windows(2).find(|w| w[0].order == w[1].order) {
            return Err(CourseError::DuplicateLessonOrder {
                section: id,
                order: pair[0].order,
            });
        }

        Ok(Self {
            id,
            title: title.into(),
            order,
            lessons,
            quiz,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Lessons in ascending `order`.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn lesson(&self, index: usize) -> Option<&Lesson> {
        self.lessons.get(index)
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizId> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        self.quiz.is_some()
    }

    #[must_use]
    pub fn last_lesson_index(&self) -> Option<usize> {
        self.lessons.len().checked_sub(1)
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Normalized course structure.
///
/// Sections are kept sorted by `order`; a section's position in
/// [`Course::sections`] is its dense traversal index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CourseRecord")]
pub struct Course {
    id: CourseId,
    title: String,
    sections: Vec<Section>,
    final_quiz: Option<QuizId>,
}

impl Course {
    /// Creates a course, sorting sections by `order`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title and
    /// `CourseError::DuplicateSectionOrder` if two sections share an order.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        mut sections: Vec<Section>,
        final_quiz: Option<QuizId>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        sections.sort_by_key(Section::order);
        if let Some(pair) = sections.windows(2).find(|w| w[0].order == w[1].order) {
            return Err(CourseError::DuplicateSectionOrder {
                order: pair[0].order,
            });
        }

        Ok(Self {
            id,
            title,
            sections,
            final_quiz,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn final_quiz(&self) -> Option<&QuizId> {
        self.final_quiz.as_ref()
    }

    /// A course without sections has no unlockable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }

    #[must_use]
    pub fn section_index(&self, id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == id)
    }

    /// Finds `(section_index, lesson_index)` for a lesson id.
    #[must_use]
    pub fn locate_lesson(&self, id: &LessonId) -> Option<(usize, usize)> {
        self.sections.iter().enumerate().find_map(|(s, section)| {
            section
                .lessons
                .iter()
                .position(|lesson| &lesson.id == id)
                .map(|l| (s, l))
        })
    }
}

//
// ─── WIRE RECORDS ──────────────────────────────────────────────────────────────
//

// A section quiz arrives either as a bare id or as a populated document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuizRefRecord {
    Id(QuizId),
    Embedded {
        #[serde(alias = "_id")]
        id: QuizId,
    },
}

impl From<QuizRefRecord> for QuizId {
    fn from(value: QuizRefRecord) -> Self {
        match value {
            QuizRefRecord::Id(id) | QuizRefRecord::Embedded { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonRecord {
    #[serde(alias = "_id")]
    id: LessonId,
    title: String,
    #[serde(default)]
    order: Option<u32>,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default, alias = "duration")]
    duration_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionRecord {
    #[serde(alias = "_id")]
    id: SectionId,
    title: String,
    #[serde(default)]
    order: Option<u32>,
    #[serde(default)]
    lessons: Vec<LessonRecord>,
    #[serde(default, alias = "sectionQuiz")]
    quiz: Option<QuizRefRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseRecord {
    #[serde(alias = "_id")]
    id: CourseId,
    title: String,
    #[serde(default)]
    sections: Vec<SectionRecord>,
    #[serde(default)]
    final_quiz: Option<QuizRefRecord>,
}

// Orders come from the records only when every sibling carries one;
// otherwise the server's array order is used for the whole list.
fn positional_orders(orders: impl Iterator<Item = Option<u32>>) -> Vec<u32> {
    let orders: Vec<Option<u32>> = orders.collect();
    let explicit = orders.iter().all(Option::is_some);
    orders
        .into_iter()
        .enumerate()
        .map(|(position, order)| match order {
            Some(order) if explicit => order,
            _ => u32::try_from(position).unwrap_or(u32::MAX),
        })
        .collect()
}

impl TryFrom<CourseRecord> for Course {
    type Error = CourseError;

    fn try_from(record: CourseRecord) -> Result<Self, Self::Error> {
        let section_orders = positional_orders(record.sections.iter().map(|s| s.order));
        let sections = record
            .sections
            .into_iter()
            .zip(section_orders)
            .map(|(section, section_order)| {
                let lesson_orders = positional_orders(section.lessons.iter().map(|l| l.order));
                let lessons = section
                    .lessons
                    .into_iter()
                    .zip(lesson_orders)
                    .map(|(lesson, order)| Lesson {
                        id: lesson.id,
                        title: lesson.title,
                        order,
                        content: lesson.content,
                        duration_minutes: lesson.duration_minutes,
                    })
                    .collect();
                Section::new(
                    section.id,
                    section.title,
                    section_order,
                    lessons,
                    section.quiz.map(QuizId::from),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Course::new(
            record.id,
            record.title,
            sections,
            record.final_quiz.map(QuizId::from),
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sections_and_lessons_are_sorted_by_order() {
        let s1 = Section::new(
            SectionId::new("s1"),
            "Later",
            1,
            vec![
                Lesson::new(LessonId::new("b"), "B", 2),
                Lesson::new(LessonId::new("a"), "A", 1),
            ],
            None,
        )
        .unwrap();
        let s0 = Section::new(SectionId::new("s0"), "First", 0, vec![], None).unwrap();

        let course = Course::new(CourseId::new("c"), "Course", vec![s1, s0], None).unwrap();

        assert_eq!(course.sections()[0].id(), &SectionId::new("s0"));
        assert_eq!(course.sections()[1].lessons()[0].id(), &LessonId::new("a"));
        assert_eq!(course.locate_lesson(&LessonId::new("b")), Some((1, 1)));
    }

    #[test]
    fn duplicate_section_order_is_rejected() {
        let a = Section::new(SectionId::new("a"), "A", 3, vec![], None).unwrap();
        let b = Section::new(SectionId::new("b"), "B", 3, vec![], None).unwrap();
        let err = Course::new(CourseId::new("c"), "Course", vec![a, b], None).unwrap_err();
        assert_eq!(err, CourseError::DuplicateSectionOrder { order: 3 });
    }

    #[test]
    fn duplicate_lesson_order_is_rejected() {
        let err = Section::new(
            SectionId::new("s"),
            "S",
            0,
            vec![
                Lesson::new(LessonId::new("a"), "A", 1),
                Lesson::new(LessonId::new("b"), "B", 1),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CourseError::DuplicateLessonOrder { order: 1, .. }));
    }

    #[test]
    fn deserializes_populated_and_bare_quiz_references() {
        let course: Course = serde_json::from_value(json!({
            "_id": "c1",
            "title": "Rust 101",
            "sections": [
                {
                    "_id": "s1",
                    "title": "Basics",
                    "order": 1,
                    "lessons": [
                        { "_id": "l2", "title": "Borrowing", "order": 2, "content": { "md": "..." } },
                        { "_id": "l1", "title": "Ownership", "order": 1, "duration": 12 }
                    ],
                    "quiz": { "_id": "q1", "title": "ignored" }
                },
                { "_id": "s0", "title": "Setup", "order": 0, "lessons": [], "quiz": "q0" }
            ],
            "finalQuiz": "qf"
        }))
        .unwrap();

        assert_eq!(course.sections()[0].quiz(), Some(&QuizId::new("q0")));
        assert_eq!(course.sections()[1].quiz(), Some(&QuizId::new("q1")));
        assert_eq!(course.sections()[1].lessons()[0].duration_minutes(), Some(12));
        assert_eq!(course.final_quiz(), Some(&QuizId::new("qf")));
        assert_eq!(course.total_lessons(), 2);
    }

    #[test]
    fn missing_orders_fall_back_to_server_order() {
        let course: Course = serde_json::from_value(json!({
            "_id": "c1",
            "title": "Rust 101",
            "sections": [
                {
                    "_id": "s1",
                    "title": "Basics",
                    "lessons": [
                        { "_id": "l2", "title": "Borrowing" },
                        { "_id": "l1", "title": "Ownership" }
                    ]
                },
                {
                    "_id": "s2",
                    "title": "Traits",
                    "order": 0,
                    "lessons": [
                        { "_id": "l4", "title": "Generics", "order": 7 },
                        { "_id": "l3", "title": "Impl blocks" }
                    ]
                }
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = course.sections().iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
        let lessons: Vec<&str> = course.sections()[0]
            .lessons()
            .iter()
            .map(|l| l.id().as_str())
            .collect();
        assert_eq!(lessons, ["l2", "l1"]);
        assert_eq!(course.locate_lesson(&LessonId::new("l3")), Some((1, 1)));
    }

    #[test]
    fn explicit_tied_orders_are_still_rejected_on_decode() {
        let decoded = serde_json::from_value::<Course>(json!({
            "_id": "c1",
            "title": "Rust 101",
            "sections": [{
                "_id": "s1",
                "title": "Basics",
                "order": 0,
                "lessons": [
                    { "_id": "l1", "title": "A", "order": 1 },
                    { "_id": "l2", "title": "B", "order": 1 }
                ]
            }]
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn empty_course_has_no_sections() {
        let course = Course::new(CourseId::new("c"), "Empty", vec![], None).unwrap();
        assert!(course.is_empty());
        assert_eq!(course.total_lessons(), 0);
    }
}

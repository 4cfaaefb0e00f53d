//! Response envelopes and error bodies of the course API.

use serde::{Deserialize, Serialize};

use course_core::model::{Certificate, Course, CourseId, Enrollment, QuizOutcome, QuizPayload};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseEnvelope {
    pub data: Course,
    #[serde(default)]
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollEnvelope {
    #[serde(alias = "data")]
    pub enrollment: Enrollment,
}

pub(crate) type QuizEnvelope = DataEnvelope<QuizPayload>;
pub(crate) type OutcomeEnvelope = DataEnvelope<QuizOutcome>;

/// The certificate endpoint is an admin route and is not consistently wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CertificateEnvelope {
    Wrapped { data: Certificate },
    Bare(Certificate),
}

impl CertificateEnvelope {
    pub fn into_certificate(self) -> Certificate {
        match self {
            CertificateEnvelope::Wrapped { data } | CertificateEnvelope::Bare(data) => data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnrollRequest<'a> {
    pub course_id: &'a CourseId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub suspended: Option<bool>,
}

impl ErrorBody {
    fn is_suspension(&self) -> bool {
        self.suspended == Some(true)
            || self
                .code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case("ACCOUNT_SUSPENDED"))
    }
}

/// Maps a non-success response onto `ApiError`.
pub(crate) fn classify(status: u16, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    if parsed.is_suspension() {
        return ApiError::AccountSuspended;
    }
    match status {
        401 => ApiError::AuthRequired,
        404 => ApiError::NotFound,
        _ => ApiError::HttpStatus {
            status,
            message: parsed
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "request failed".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CertificateStatus, CourseId};
    use serde_json::json;

    #[test]
    fn course_envelope_with_and_without_enrollment() {
        let course = json!({
            "_id": "c1",
            "title": "Rust",
            "sections": [{
                "_id": "s1",
                "title": "Basics",
                "order": 0,
                "lessons": [{"_id": "l1", "title": "Hello", "order": 0}],
                "sectionQuiz": "q1"
            }]
        });

        let bare: CourseEnvelope = serde_json::from_value(json!({ "data": course })).unwrap();
        assert!(bare.enrollment.is_none());
        assert_eq!(bare.data.id(), &CourseId::new("c1"));

        let enrolled: CourseEnvelope = serde_json::from_value(json!({
            "data": course,
            "enrollment": {"course": "c1", "overallProgress": 10, "sectionProgress": []}
        }))
        .unwrap();
        assert_eq!(enrolled.enrollment.unwrap().overall_percent(), 10);
    }

    #[test]
    fn quiz_envelope_accepts_both_shapes() {
        let quiz = json!({"_id": "q1", "title": "Check", "passingScore": 70, "questions": []});
        let wrapped: QuizEnvelope =
            serde_json::from_value(json!({ "data": { "quiz": quiz } })).unwrap();
        let bare: QuizEnvelope = serde_json::from_value(json!({ "data": quiz })).unwrap();
        assert_eq!(wrapped.data.into_quiz(), bare.data.into_quiz());
    }

    #[test]
    fn outcome_envelope_with_embedded_certificate() {
        let outcome: OutcomeEnvelope = serde_json::from_value(json!({
            "data": {
                "score": 8,
                "maxScore": 10,
                "passed": true,
                "attemptCount": 2,
                "results": [{"questionId": "a", "isCorrect": true}],
                "certificate": {"_id": "cert-1", "status": "pending"}
            }
        }))
        .unwrap();
        let outcome = outcome.data;
        assert!(outcome.passed);
        assert_eq!(outcome.attempt_count, 2);
        let certificate = outcome.certificate.unwrap();
        assert_eq!(
            certificate.embedded().map(|c| c.status),
            Some(CertificateStatus::Pending)
        );
    }

    #[test]
    fn certificate_envelope_accepts_both_shapes() {
        let cert = json!({"_id": "cert-9", "status": "approved"});
        let wrapped: CertificateEnvelope = serde_json::from_value(json!({ "data": cert })).unwrap();
        let bare: CertificateEnvelope = serde_json::from_value(cert).unwrap();
        assert_eq!(wrapped.into_certificate(), bare.into_certificate());
    }

    #[test]
    fn classify_detects_suspension_by_code_or_flag() {
        assert_eq!(
            classify(403, r#"{"code":"ACCOUNT_SUSPENDED","message":"nope"}"#),
            ApiError::AccountSuspended
        );
        assert_eq!(
            classify(403, r#"{"suspended":true}"#),
            ApiError::AccountSuspended
        );
        assert_eq!(
            classify(403, r#"{"message":"forbidden"}"#),
            ApiError::HttpStatus {
                status: 403,
                message: "forbidden".into()
            }
        );
    }

    #[test]
    fn classify_maps_common_statuses() {
        assert_eq!(classify(401, ""), ApiError::AuthRequired);
        assert_eq!(classify(404, "<html>"), ApiError::NotFound);
        assert_eq!(
            classify(502, "bad gateway"),
            ApiError::HttpStatus {
                status: 502,
                message: "request failed".into()
            }
        );
    }
}

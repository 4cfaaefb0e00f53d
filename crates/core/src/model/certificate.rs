use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::ids::{CertificateId, CourseId};

/// Admin approval state of an issued certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Pending,
    Approved,
    Rejected,
}

/// Certificate detail as returned by the certificate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(alias = "_id")]
    pub id: CertificateId,
    pub status: CertificateStatus,
    #[serde(default)]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default, alias = "studentName")]
    pub learner_name: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default, alias = "certificateNumber")]
    pub verification_code: Option<String>,
}

/// An enrollment refers to its certificate either by id or by embedding it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CertificateRef {
    Id(CertificateId),
    Embedded(Box<Certificate>),
}

impl CertificateRef {
    #[must_use]
    pub fn id(&self) -> &CertificateId {
        match self {
            CertificateRef::Id(id) => id,
            CertificateRef::Embedded(certificate) => &certificate.id,
        }
    }

    /// The embedded certificate, if the server populated it.
    #[must_use]
    pub fn embedded(&self) -> Option<&Certificate> {
        match self {
            CertificateRef::Id(_) => None,
            CertificateRef::Embedded(certificate) => Some(certificate),
        }
    }
}

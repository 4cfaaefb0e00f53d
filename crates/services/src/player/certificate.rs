use course_core::model::{Certificate, CertificateId, CertificateRef, CertificateStatus, Enrollment};

use crate::error::{ApiError, FlowError};

/// Whether the certificate view can be reached at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateGate {
    NotIssued,
    /// Issued; the reference may be missing if the server omitted it.
    Issued(Option<CertificateRef>),
}

impl CertificateGate {
    #[must_use]
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        if enrollment.certificate_issued {
            CertificateGate::Issued(enrollment.certificate.clone())
        } else {
            CertificateGate::NotIssued
        }
    }

    #[must_use]
    pub fn is_reachable(&self) -> bool {
        matches!(self, CertificateGate::Issued(_))
    }

    /// What to show right away, if no fetch is needed.
    #[must_use]
    pub fn immediate_view(&self) -> Option<CertificateView> {
        match self {
            CertificateGate::NotIssued => None,
            CertificateGate::Issued(None) => Some(CertificateView::Failed(
                "Certificate details are missing. Please try again later.".into(),
            )),
            CertificateGate::Issued(Some(reference)) => reference
                .embedded()
                .map(|certificate| CertificateView::from_certificate(certificate.clone())),
        }
    }

    /// Id to fetch details for, when the enrollment only carries the id.
    #[must_use]
    pub fn fetch_id(&self) -> Option<&CertificateId> {
        match self {
            CertificateGate::Issued(Some(CertificateRef::Id(id))) => Some(id),
            _ => None,
        }
    }
}

/// The certificate screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateView {
    Loading,
    Pending(Certificate),
    Approved(Certificate),
    Rejected(Certificate),
    /// The detail fetch failed; the learner can try again.
    Failed(String),
}

impl CertificateView {
    #[must_use]
    pub fn from_certificate(certificate: Certificate) -> Self {
        match certificate.status {
            CertificateStatus::Pending => CertificateView::Pending(certificate),
            CertificateStatus::Approved => CertificateView::Approved(certificate),
            CertificateStatus::Rejected => CertificateView::Rejected(certificate),
        }
    }

    /// # Errors
    ///
    /// Passes through a suspended account so the caller can sign out; every
    /// other failure becomes `CertificateView::Failed`.
    pub fn from_response(response: Result<Certificate, ApiError>) -> Result<Self, FlowError> {
        match response {
            Ok(certificate) => Ok(Self::from_certificate(certificate)),
            Err(ApiError::AccountSuspended) => Err(FlowError::AccountSuspended),
            Err(err) => Ok(CertificateView::Failed(FlowError::from(err).user_message())),
        }
    }

    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            CertificateView::Pending(c) | CertificateView::Approved(c) | CertificateView::Rejected(c) => {
                Some(c)
            }
            CertificateView::Loading | CertificateView::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn can_print(&self) -> bool {
        matches!(self, CertificateView::Approved(_))
    }

    #[must_use]
    pub fn can_share(&self) -> bool {
        matches!(self, CertificateView::Approved(_))
    }

    /// Banner text above the preview, if any.
    #[must_use]
    pub fn banner(&self) -> Option<String> {
        match self {
            CertificateView::Loading | CertificateView::Approved(_) => None,
            CertificateView::Pending(_) => {
                Some("Your certificate is awaiting admin approval.".into())
            }
            CertificateView::Rejected(c) => Some(match c.rejection_reason.as_deref() {
                Some(reason) if !reason.trim().is_empty() => {
                    format!("Your certificate was rejected: {reason}")
                }
                _ => "Your certificate was rejected.".into(),
            }),
            CertificateView::Failed(message) => Some(message.clone()),
        }
    }
}

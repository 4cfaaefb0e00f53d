use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use course_core::model::{
    AuthToken, Certificate, CertificateId, CourseId, Enrollment, Quiz, QuizId, QuizOutcome,
};

use super::wire::{
    CertificateEnvelope, CourseEnvelope, DataEnvelope, EnrollEnvelope, EnrollRequest,
    OutcomeEnvelope, QuizEnvelope, classify,
};
use super::{CourseApi, CourseDetail, LessonCompletion, QuizSubmission};
use crate::config::ApiConfig;
use crate::error::ApiError;

/// `CourseApi` over HTTP with bearer token auth.
#[derive(Clone)]
pub struct HttpCourseApi {
    client: Client,
    base_url: Url,
}

impl HttpCourseApi {
    /// Build a client for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL plus one path segment per entry. Each segment is
    /// percent-encoded, so ids never add path levels or a query.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // A validated http(s) base always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&AuthToken>,
    ) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, %url, "course api request");
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "course api call failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn get_course(
        &self,
        token: Option<&AuthToken>,
        course: &CourseId,
    ) -> Result<CourseDetail, ApiError> {
        let envelope: CourseEnvelope = self
            .send(self.request(Method::GET, &["courses", course.as_str()], token))
            .await?;
        Ok(CourseDetail {
            course: envelope.data,
            enrollment: envelope.enrollment,
        })
    }

    async fn enroll(&self, token: &AuthToken, course: &CourseId) -> Result<Enrollment, ApiError> {
        let request = self
            .request(Method::POST, &["courses", "enroll"], Some(token))
            .json(&EnrollRequest { course_id: course });
        let envelope: EnrollEnvelope = self.send(request).await?;
        Ok(envelope.enrollment)
    }

    async fn get_enrollment(
        &self,
        token: &AuthToken,
        course: &CourseId,
    ) -> Result<Enrollment, ApiError> {
        let envelope: DataEnvelope<Enrollment> = self
            .send(self.request(
                Method::GET,
                &["courses", course.as_str(), "enrollment"],
                Some(token),
            ))
            .await?;
        Ok(envelope.data)
    }

    async fn complete_lesson(
        &self,
        token: &AuthToken,
        request: &LessonCompletion,
    ) -> Result<Enrollment, ApiError> {
        let builder = self
            .request(
                Method::PUT,
                &["courses", request.course_id.as_str(), "progress", "lesson"],
                Some(token),
            )
            .json(request);
        let envelope: DataEnvelope<Enrollment> = self.send(builder).await?;
        Ok(envelope.data)
    }

    async fn get_quiz(&self, token: Option<&AuthToken>, quiz: &QuizId) -> Result<Quiz, ApiError> {
        let envelope: QuizEnvelope = self
            .send(self.request(Method::GET, &["courses", "quizzes", quiz.as_str()], token))
            .await?;
        Ok(envelope.data.into_quiz())
    }

    async fn submit_quiz(
        &self,
        token: &AuthToken,
        submission: &QuizSubmission,
    ) -> Result<QuizOutcome, ApiError> {
        let builder = self
            .request(
                Method::POST,
                &["courses", "quizzes", submission.quiz_id.as_str(), "submit"],
                Some(token),
            )
            .json(submission);
        let envelope: OutcomeEnvelope = self.send(builder).await?;
        Ok(envelope.data)
    }

    async fn get_certificate(
        &self,
        token: &AuthToken,
        certificate: &CertificateId,
    ) -> Result<Certificate, ApiError> {
        let envelope: CertificateEnvelope = self
            .send(self.request(
                Method::GET,
                &["admin", "courses", "certificates", certificate.as_str()],
                Some(token),
            ))
            .await?;
        Ok(envelope.into_certificate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpCourseApi {
        HttpCourseApi::new(&ApiConfig::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_base_url() {
        let api = api("https://learn.example.com/api//");
        assert_eq!(api.base_url().as_str(), "https://learn.example.com/api");
        assert_eq!(
            api.endpoint(&["courses", "rust-101", "enrollment"]).as_str(),
            "https://learn.example.com/api/courses/rust-101/enrollment"
        );
    }

    #[test]
    fn ids_cannot_change_the_endpoint() {
        let api = api("https://learn.example.com/api");
        let course = CourseId::new("a/b?x=1#frag");
        let url = api.endpoint(&["courses", course.as_str()]);

        assert_eq!(url.path(), "/api/courses/a%2Fb%3Fx=1%23frag");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path_segments().map(Iterator::count), Some(3));
    }

    #[test]
    fn endpoints_append_to_a_root_base() {
        let api = api("http://localhost:5000/");
        assert_eq!(
            api.endpoint(&["courses", "quizzes", "q1", "submit"]).as_str(),
            "http://localhost:5000/courses/quizzes/q1/submit"
        );
    }
}

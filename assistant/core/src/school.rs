//! School Data Aggregation
//!
//! Federates the third-party school system's login, profile, and grades
//! endpoints into one normalized student report. The composition is strictly
//! sequential: login yields the bearer token the two follow-on fetches need.
//!
//! Each stage failure is a distinct [`SchoolError`] variant carrying the
//! HTTP status the portal API maps it to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Login credentials for the school system
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    /// Student login (national id or username)
    pub login: String,
    /// Password
    pub password: String,
}

/// Stage-specific failure of the aggregation
#[derive(Debug, thiserror::Error)]
pub enum SchoolError {
    /// Login was rejected or returned no token
    #[error("authentication failed")]
    Auth,
    /// Profile fetch failed
    #[error("failed to fetch student profile")]
    Profile,
    /// Grades fetch failed
    #[error("failed to fetch grades data")]
    Grades,
    /// Credentials missing or request malformed
    #[error("login credentials are required")]
    BadInput,
}

impl SchoolError {
    /// HTTP status the portal API maps this failure to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Auth => 401,
            Self::Profile | Self::Grades => 500,
            Self::BadInput => 400,
        }
    }
}

/// Normalized student identity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Student id in the school system
    pub id: String,
    /// Full name
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// Class designation
    pub class: String,
    /// School name
    pub school: String,
}

/// A term mark within a subject
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermMark {
    /// Term name
    pub term: String,
    /// Final mark, absent for an unfinished term
    pub mark: Option<f64>,
    /// Percentage, absent for an unfinished term
    pub percentage: Option<f64>,
}

/// One dated grade entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    /// ISO date of the grade
    pub date: String,
    /// Grade value
    pub value: f64,
    /// Teacher's comment
    pub comment: String,
}

/// Normalized per-subject record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject id
    pub id: String,
    /// Subject name
    pub name: String,
    /// Teacher name
    pub teacher: String,
    /// Term marks
    pub terms: Vec<TermMark>,
    /// Running percentage for the current term
    pub current_percentage: f64,
    /// Running mark for the current term
    pub current_mark: f64,
    /// Individual grades
    pub grades: Vec<GradeEntry>,
}

/// Overall averages across subjects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverallAverage {
    /// Average percentage
    pub percentage: f64,
    /// Average mark
    pub mark: f64,
}

/// The normalized aggregation result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentReport {
    /// Student identity
    pub student: Student,
    /// Per-subject records
    pub subjects: Vec<Subject>,
    /// Overall averages
    pub overall_average: OverallAverage,
    /// When the school system last updated the data (RFC 3339)
    pub updated_at: String,
}

// Raw upstream shapes (camelCase, never exposed past this module)

#[derive(Debug, Deserialize)]
struct RawLogin {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    id: String,
    full_name: String,
    class: String,
    school: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTerm {
    name: String,
    mark: Option<f64>,
    percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrade {
    date: String,
    value: f64,
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubject {
    id: String,
    name: String,
    teacher: String,
    terms: Vec<RawTerm>,
    current_percentage: f64,
    current_mark: f64,
    grades: Vec<RawGrade>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrades {
    subjects: Vec<RawSubject>,
    overall_percentage: f64,
    overall_mark: f64,
    updated_at: Option<String>,
}

/// Client for the third-party school system
#[derive(Clone)]
pub struct SchoolClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl SchoolClient {
    /// Create a client against the given API base
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create from the `EDUPORT_SCHOOL_API_BASE` environment variable
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("EDUPORT_SCHOOL_API_BASE")
            .unwrap_or_else(|_| "https://school-system-api.example.com/api".to_string());
        Self::new(base_url)
    }

    /// Login, fetch profile and grades, and reshape into a [`StudentReport`]
    pub async fn fetch_report(
        &self,
        credentials: &Credentials,
        term: Option<&str>,
    ) -> Result<StudentReport, SchoolError> {
        if credentials.login.is_empty() || credentials.password.is_empty() {
            return Err(SchoolError::BadInput);
        }

        let token = self.login(credentials).await?;
        let profile = self.fetch_profile(&token).await?;
        let grades = self.fetch_grades(&token, term).await?;

        Ok(normalize(profile, grades))
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, SchoolError> {
        let response = self
            .http_client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({
                "login": credentials.login,
                "password": credentials.password,
            }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::warn!(error = %e, "school login failed");
                SchoolError::Auth
            })?;

        let login: RawLogin = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "school login returned malformed payload");
            SchoolError::Auth
        })?;
        login.token.filter(|t| !t.is_empty()).ok_or(SchoolError::Auth)
    }

    async fn fetch_profile(&self, token: &str) -> Result<RawProfile, SchoolError> {
        let response = self
            .http_client
            .get(format!("{}/student/profile", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::warn!(error = %e, "profile fetch failed");
                SchoolError::Profile
            })?;

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "profile payload malformed");
            SchoolError::Profile
        })
    }

    async fn fetch_grades(
        &self,
        token: &str,
        term: Option<&str>,
    ) -> Result<RawGrades, SchoolError> {
        let mut request = self
            .http_client
            .get(format!("{}/student/grades", self.base_url))
            .bearer_auth(token);
        if let Some(term) = term {
            request = request.query(&[("term", term)]);
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::warn!(error = %e, "grades fetch failed");
                SchoolError::Grades
            })?;

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "grades payload malformed");
            SchoolError::Grades
        })
    }
}

/// Reshape the raw upstream payloads into the normalized report
fn normalize(profile: RawProfile, grades: RawGrades) -> StudentReport {
    StudentReport {
        student: Student {
            id: profile.id,
            full_name: profile.full_name,
            class: profile.class,
            school: profile.school,
        },
        subjects: grades
            .subjects
            .into_iter()
            .map(|subject| Subject {
                id: subject.id,
                name: subject.name,
                teacher: subject.teacher,
                terms: subject
                    .terms
                    .into_iter()
                    .map(|term| TermMark {
                        term: term.name,
                        mark: term.mark,
                        percentage: term.percentage,
                    })
                    .collect(),
                current_percentage: subject.current_percentage,
                current_mark: subject.current_mark,
                grades: subject
                    .grades
                    .into_iter()
                    .map(|grade| GradeEntry {
                        date: grade.date,
                        value: grade.value,
                        comment: grade.comment,
                    })
                    .collect(),
            })
            .collect(),
        overall_average: OverallAverage {
            percentage: grades.overall_percentage,
            mark: grades.overall_mark,
        },
        updated_at: grades
            .updated_at
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(SchoolError::Auth.status_code(), 401);
        assert_eq!(SchoolError::Profile.status_code(), 500);
        assert_eq!(SchoolError::Grades.status_code(), 500);
        assert_eq!(SchoolError::BadInput.status_code(), 400);
    }

    #[test]
    fn test_normalize_reshapes_camel_case() {
        let profile: RawProfile = serde_json::from_value(serde_json::json!({
            "id": "s-1",
            "fullName": "Aruzhan K.",
            "class": "10B",
            "school": "Lyceum 42",
        }))
        .unwrap();
        let grades: RawGrades = serde_json::from_value(serde_json::json!({
            "subjects": [{
                "id": "math",
                "name": "Mathematics",
                "teacher": "B. Omarov",
                "terms": [
                    { "name": "1", "mark": 5.0, "percentage": 91.2 },
                    { "name": "2", "mark": null, "percentage": null },
                ],
                "currentPercentage": 88.4,
                "currentMark": 5.0,
                "grades": [
                    { "date": "2025-02-10", "value": 9.0, "comment": "quiz" },
                ],
            }],
            "overallPercentage": 87.1,
            "overallMark": 4.8,
            "updatedAt": "2025-02-11T08:00:00Z",
        }))
        .unwrap();

        let report = normalize(profile, grades);

        assert_eq!(report.student.full_name, "Aruzhan K.");
        assert_eq!(report.subjects.len(), 1);
        let subject = &report.subjects[0];
        assert_eq!(subject.terms[0].term, "1");
        assert_eq!(subject.terms[1].mark, None);
        assert_eq!(subject.current_percentage, 88.4);
        assert_eq!(report.overall_average.mark, 4.8);
        assert_eq!(report.updated_at, "2025-02-11T08:00:00Z");
    }

    #[test]
    fn test_normalized_report_serializes_snake_case() {
        let report = StudentReport {
            student: Student {
                id: "s-1".to_string(),
                full_name: "A".to_string(),
                class: "10B".to_string(),
                school: "L42".to_string(),
            },
            subjects: Vec::new(),
            overall_average: OverallAverage {
                percentage: 80.0,
                mark: 4.0,
            },
            updated_at: "2025-02-11T08:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("overall_average").is_some());
        assert!(json["student"].get("fullName").is_some());
        assert_eq!(json["updated_at"], "2025-02-11T08:00:00Z");
    }

    #[test]
    fn test_missing_updated_at_falls_back_to_now() {
        let profile: RawProfile = serde_json::from_value(serde_json::json!({
            "id": "s", "fullName": "n", "class": "c", "school": "s",
        }))
        .unwrap();
        let grades: RawGrades = serde_json::from_value(serde_json::json!({
            "subjects": [],
            "overallPercentage": 0.0,
            "overallMark": 0.0,
        }))
        .unwrap();
        let report = normalize(profile, grades);
        assert!(!report.updated_at.is_empty());
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_any_network() {
        let client = SchoolClient::new("http://127.0.0.1:1");
        let err = client
            .fetch_report(
                &Credentials {
                    login: String::new(),
                    password: String::new(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchoolError::BadInput));
    }
}

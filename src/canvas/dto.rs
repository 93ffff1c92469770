use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub quiz_id: Option<u64>,
    /// Present when requested with `include[]=submission`.
    #[serde(default)]
    pub submission: Option<Submission>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_decodes_with_embedded_submission() {
        let json = r#"{
            "id": 501,
            "name": "HW 3",
            "due_at": "2024-03-10T23:59:00Z",
            "quiz_id": null,
            "points_possible": 10,
            "submission": { "workflow_state": "unsubmitted", "submitted_at": null }
        }"#;
        let assignment: Assignment = serde_json::from_str(json).unwrap();
        assert_eq!(assignment.id, 501);
        assert_eq!(assignment.quiz_id, None);
        let submission = assignment.submission.unwrap();
        assert_eq!(submission.workflow_state.as_deref(), Some("unsubmitted"));
        assert!(submission.submitted_at.is_none());
    }

    #[test]
    fn assignment_decodes_without_optional_fields() {
        let assignment: Assignment = serde_json::from_str(r#"{"id": 7, "quiz_id": 88}"#).unwrap();
        assert_eq!(assignment.quiz_id, Some(88));
        assert!(assignment.name.is_none());
        assert!(assignment.due_at.is_none());
        assert!(assignment.submission.is_none());
    }
}

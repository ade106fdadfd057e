use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedFile {
    #[serde(default)]
    pub student_id: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

/// One uploaded batch as listed by the submission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub id: String,
    pub assignment_name: String,
    #[serde(default)]
    pub files_count: usize,
    #[serde(default)]
    pub total_students: Option<usize>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub files: Vec<SubmittedFile>,
}

impl SubmissionEntry {
    pub fn student_count(&self) -> usize {
        self.total_students.unwrap_or(self.files_count)
    }

    /// Student id for each file, falling back to `Student {n}` by position.
    pub fn file_owners(&self) -> Vec<(String, &str)> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let owner = file
                    .student_id
                    .clone()
                    .unwrap_or_else(|| format!("Student {}", index + 1));
                (owner, file.filename.as_str())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CatalogueSummary {
    pub total_files: usize,
    pub total_size_kb: f64,
}

pub fn summarize(entries: &[SubmissionEntry]) -> CatalogueSummary {
    let total_files = entries.iter().map(|entry| entry.files_count).sum();
    let total_bytes: u64 = entries
        .iter()
        .flat_map(|entry| entry.files.iter())
        .map(|file| file.size)
        .sum();

    CatalogueSummary {
        total_files,
        total_size_kb: total_bytes as f64 / 1024.0,
    }
}

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::ValidationError;
use crate::models::UploadItem;

/// Pairwise comparisons the analysis backend runs for `n` files.
pub fn expected_comparisons(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// What the upload collaborator receives once a batch passes validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRequest {
    pub assignment_name: String,
    /// Trimmed ids joined with `", "`, in file order.
    pub student_ids: String,
    pub files: Vec<PathBuf>,
}

/// Files staged for upload, edited locally until submitted.
#[derive(Debug, Clone, Default)]
pub struct SubmissionBatch {
    assignment_name: String,
    items: Vec<UploadItem>,
}

impl SubmissionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment_name(&self) -> &str {
        &self.assignment_name
    }

    pub fn set_assignment_name(&mut self, name: impl Into<String>) {
        self.assignment_name = name.into();
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn expected_comparisons(&self) -> usize {
        expected_comparisons(self.items.len())
    }

    /// Appends files with placeholder ids `Student{n}`, `n` being the
    /// 1-based position in the batch. Returns how many were added.
    pub fn add_files<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let before = self.items.len();
        for file in files {
            let original_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let student_id = format!("Student{}", self.items.len() + 1);
            self.items.push(UploadItem {
                file,
                student_id,
                original_name,
            });
        }
        self.items.len() - before
    }

    pub fn set_student_id(
        &mut self,
        index: usize,
        student_id: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(ValidationError::UnknownItem { index, len })?;
        item.student_id = student_id.into();
        Ok(())
    }

    /// Removes the file at `index`; later files shift down by one.
    pub fn remove(&mut self, index: usize) -> Result<UploadItem, ValidationError> {
        if index >= self.items.len() {
            return Err(ValidationError::UnknownItem {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Checks, in order: files present, assignment named, every id filled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        if self.assignment_name.trim().is_empty() {
            return Err(ValidationError::MissingAssignment);
        }

        let positions: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.student_id.trim().is_empty())
            .map(|(index, _)| index)
            .collect();

        if !positions.is_empty() {
            return Err(ValidationError::BlankStudentIds { positions });
        }

        Ok(())
    }

    /// Validates and packages the batch. The batch is left untouched on error.
    pub fn to_request(&self) -> Result<UploadRequest, ValidationError> {
        self.validate()?;

        Ok(UploadRequest {
            assignment_name: self.assignment_name.trim().to_string(),
            student_ids: self
                .items
                .iter()
                .map(|item| item.student_id.trim())
                .collect::<Vec<_>>()
                .join(", "),
            files: self.items.iter().map(|item| item.file.clone()).collect(),
        })
    }

    /// Applies ids to the staged files in order, then packages the batch.
    /// Validation runs before surplus ids are reported, so an empty batch
    /// still fails as [`ValidationError::EmptyBatch`].
    pub fn request_with_ids<I>(&mut self, student_ids: I) -> Result<UploadRequest, ValidationError>
    where
        I: IntoIterator<Item = String>,
    {
        let len = self.items.len();
        let mut surplus = 0usize;
        for (index, id) in student_ids.into_iter().enumerate() {
            match self.items.get_mut(index) {
                Some(item) => item.student_id = id,
                None => surplus += 1,
            }
        }

        let request = self.to_request()?;
        if surplus > 0 {
            return Err(ValidationError::UnknownItem { index: len, len });
        }
        Ok(request)
    }

    /// Like [`Self::to_request`], then clears the staged files and assignment.
    pub fn submit(&mut self) -> Result<UploadRequest, ValidationError> {
        let request = self.to_request()?;
        info!(
            assignment = %request.assignment_name,
            files = request.files.len(),
            comparisons = self.expected_comparisons(),
            "submission batch packaged"
        );
        self.items.clear();
        self.assignment_name.clear();
        Ok(request)
    }
}

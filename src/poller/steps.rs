use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TRANSLATION_STEPS: &[&str] = &[
    "Queueing",
    "Transcribing",
    "Translating",
    "Dubbing",
    "Finalizing",
];
const SUBTITLE_STEPS: &[&str] = &["Queueing", "Transcribing", "Finalizing"];
const REPROCESSING_STEPS: &[&str] = &["Queueing", "Reprocessing", "Dubbing", "Finalizing"];

/// Kind of processing job the user submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Translation,
    Subtitles,
    Reprocessing,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Translation, JobType::Subtitles, JobType::Reprocessing];

    /// Display stages for this job type, in order
    pub fn steps(self) -> &'static [&'static str] {
        match self {
            JobType::Translation => TRANSLATION_STEPS,
            JobType::Subtitles => SUBTITLE_STEPS,
            JobType::Reprocessing => REPROCESSING_STEPS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Translation => "translation",
            JobType::Subtitles => "subtitles",
            JobType::Reprocessing => "reprocessing",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "translation" => Ok(JobType::Translation),
            "subtitles" => Ok(JobType::Subtitles),
            "reprocessing" => Ok(JobType::Reprocessing),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

/// Map a raw backend status onto the job type's step list.
///
/// The first step whose name occurs (case-insensitively) inside the status
/// wins. Unrecognized statuses fall back to step 0.
pub fn status_to_step_index(job_type: JobType, status: &str) -> usize {
    let status = status.to_lowercase();
    job_type
        .steps()
        .iter()
        .position(|step| status.contains(&step.to_lowercase()))
        .unwrap_or(0)
}

/// Step label for `status`, always a member of the step list
pub fn status_to_step_label(job_type: JobType, status: &str) -> &'static str {
    job_type.steps()[status_to_step_index(job_type, status)]
}

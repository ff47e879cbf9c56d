//! Progress presentation: one status line per bus event.

use crate::progress::{GenerationStage, ProgressEvent, ProgressSource};
use owo_colors::OwoColorize;

/// `[req-3]  40% generating   AI sedang membuat resep...`
pub fn format_progress_line(event: &ProgressEvent) -> String {
    let source = match event.source {
        ProgressSource::Request(id) => id.to_string(),
        ProgressSource::Batch(id) => id.to_string(),
    };
    match &event.progress {
        None => format!("[{}] {}", source, "cancelled".yellow()),
        Some(progress) => {
            let stage = format!("{:<11}", progress.stage.as_str());
            let stage = match progress.stage {
                GenerationStage::Complete => stage.green().to_string(),
                GenerationStage::Error => stage.red().to_string(),
                _ => stage.cyan().to_string(),
            };
            format!(
                "[{}] {:>3}% {} {}",
                source, progress.progress, stage, progress.message
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{GenerationProgress, RequestId};

    fn event(progress: Option<GenerationProgress>) -> ProgressEvent {
        ProgressEvent {
            ts: "0".to_string(),
            seq: 1,
            source: ProgressSource::Request(RequestId::next()),
            progress,
        }
    }

    #[test]
    fn stage_line_shows_percent_and_message() {
        let line = format_progress_line(&event(Some(GenerationProgress::at_stage(
            GenerationStage::Generating,
        ))));
        assert!(line.starts_with("[req-"));
        assert!(line.contains(" 40% "));
        assert!(line.ends_with("AI sedang membuat resep..."));
    }

    #[test]
    fn cleared_event_reads_as_cancelled() {
        assert!(format_progress_line(&event(None)).contains("cancelled"));
    }
}

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{Answer, OutputFormat};

pub trait Formatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_message(&self, message: &str) -> String;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub files_scanned: u64,
    pub files_ingested: u64,
    pub files_skipped: u64,
    pub chunks_added: u64,
    pub backend: String,
    pub entries: u64,
    pub duration_ms: u64,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}", answer.answer);

        if show_sources {
            let _ = writeln!(
                output,
                "\nSources ({} retrieved in {}ms):",
                answer.sources.len(),
                answer.duration_ms
            );
            for (i, source) in answer.sources.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{}. [Score: {:.3}] {} #{}",
                    i + 1,
                    source.score,
                    source.source,
                    source.chunk_index
                );
                let preview: String = source.content.chars().take(200).collect();
                let ellipsis = if source.content.chars().count() > 200 {
                    "..."
                } else {
                    ""
                };
                for line in format!("{}{}", preview, ellipsis).lines() {
                    let _ = writeln!(output, "   {}", line);
                }
            }
        }

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Ingestion Complete");
        let _ = writeln!(output, "------------------");
        let _ = writeln!(output, "Files scanned:  {}", stats.files_scanned);
        let _ = writeln!(output, "Files ingested: {}", stats.files_ingested);
        let _ = writeln!(output, "Files skipped:  {}", stats.files_skipped);
        let _ = writeln!(output, "Chunks added:   {}", stats.chunks_added);
        let _ = writeln!(
            output,
            "Index entries:  {} ({})",
            stats.entries, stats.backend
        );
        let _ = writeln!(output, "Duration:       {}ms", stats.duration_ms);
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &impl Serialize) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, answer: &Answer, show_sources: bool) -> String {
        if show_sources {
            self.render(answer)
        } else {
            self.render(&serde_json::json!({
                "question": answer.question,
                "answer": answer.answer,
            }))
        }
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.render(stats)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;

    fn answer() -> Answer {
        Answer {
            question: "What color is the sky?".to_string(),
            answer: "The sky is blue.".to_string(),
            sources: vec![SearchResult {
                chunk_id: "c1".to_string(),
                document_id: "d1".to_string(),
                source: "sky.txt".to_string(),
                content: "The sky is blue.".to_string(),
                chunk_index: 0,
                score: 0.87,
            }],
            duration_ms: 4,
        }
    }

    #[test]
    fn test_text_answer() {
        let plain = TextFormatter.format_answer(&answer(), false);
        assert_eq!(plain, "The sky is blue.\n");

        let detailed = TextFormatter.format_answer(&answer(), true);
        assert!(detailed.contains("1. [Score: 0.870] sky.txt #0"));
    }

    #[test]
    fn test_json_answer() {
        let out = JsonFormatter::new(false).format_answer(&answer(), false);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["answer"], "The sky is blue.");
        assert!(value.get("sources").is_none());

        let out = JsonFormatter::new(true).format_answer(&answer(), true);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["sources"][0]["source"], "sky.txt");
    }

    #[test]
    fn test_json_message() {
        let out = get_formatter(OutputFormat::Json).format_message("done");
        assert_eq!(out, r#"{"message":"done"}"#);
    }
}

//! Per-view summary of a processed document.
use crate::mmif::Document;

pub fn render_stats(name: &str, document: &Document) -> String {
    let mut lines = vec![name.to_string()];
    for view in &document.views {
        let status = if view.has_error() {
            "status=ERROR".to_string()
        } else {
            let types = view
                .annotation_types()
                .iter()
                .map(|(at_type, count)| format!("{at_type}:{count}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "status=OKAY - {} annotations ({types})",
                view.annotations.len()
            )
        };
        lines.push(format!("    {} app={} {status}", view.id, view.short_app()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::render_stats;
    use crate::mmif::Document;

    #[test]
    fn lists_each_view_with_status() {
        let text = r#"{"metadata": {"mmif": "1.0"}, "documents": [], "views": [
            {"id": "v_0", "metadata": {"app": "http://mmif.clams.ai/apps/tokenizer/v1"}, "annotations": [
                {"@type": "http://vocab.lappsgrid.org/Token"},
                {"@type": "http://vocab.lappsgrid.org/Sentence"},
                {"@type": "http://vocab.lappsgrid.org/Token"}
            ]},
            {"id": "v_1", "metadata": {"app": "unknown", "error": {"message": "boom"}}}
        ]}"#;
        let document = Document::parse(text).expect("parse");
        assert_eq!(
            render_stats("out.json", &document),
            "out.json\n    v_0 app=tokenizer/v1 status=OKAY - 3 annotations (Sentence:1 Token:2)\n    v_1 app=unknown status=ERROR"
        );
    }
}

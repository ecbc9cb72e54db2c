use scraper::Html;

/// Reduce a server-rendered markup fragment to readable text. Block-ish
/// whitespace collapses to single newlines, inline runs to single spaces.
pub fn fragment_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut lines: Vec<String> = Vec::new();
    for chunk in fragment.root_element().text() {
        for line in chunk.lines() {
            let line = collapse_spaces(line);
            if !line.is_empty() {
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

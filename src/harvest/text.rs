use crate::corpus::Corpus;
use crate::error::Result;
use crate::utils::{ensure_directory, save_text};
use crate::{log_error, log_info, log_warn};
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text of the document body, one line per text block.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut lines = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines.join("\n")
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\([^)]*\d+[^)]*\)").unwrap())
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Drops parenthesised references containing a digit (`(Luka 3:23-38)`),
/// then every digit, then collapses whitespace.
pub fn clean_text(text: &str) -> String {
    let text = reference_pattern().replace_all(text, "");
    let text = digits_pattern().replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                sentences.push(&text[start..next_idx]);
                start = next_idx;
            }
        } else {
            sentences.push(&text[start..idx + c.len_utf8()]);
            start = text.len();
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| keep(path))
        .collect();
    entries.sort();
    Ok(entries)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Writes `text_dir/<stem>.txt` for every HTML file in `html_dir`.
pub fn convert_pages(html_dir: &Path, text_dir: &Path) -> Result<usize> {
    ensure_directory(text_dir)?;
    let mut converted = 0;
    for path in sorted_entries(html_dir, |p| has_extension(p, "html"))? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let html = match fs::read_to_string(&path) {
            Ok(html) => html,
            Err(e) => {
                log_warn!("[harvest] Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let out = text_dir.join(format!("{}.txt", stem));
        save_text(&html_to_text(&html), &out)?;
        log_info!("[harvest] Converted to text: {}", out.display());
        converted += 1;
    }
    Ok(converted)
}

/// For each sub-directory of `root`, cleans and splits the `column` cells of
/// its CSVs into `root/<subdir>.txt`, one sentence per line. Returns the
/// written files with their sentence counts.
pub fn extract_sentences(root: &Path, column: &str) -> Result<Vec<(PathBuf, usize)>> {
    let mut written = Vec::new();

    for subdir in sorted_entries(root, Path::is_dir)? {
        let Some(name) = subdir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let mut sentences = Vec::new();
        for csv_path in sorted_entries(&subdir, |p| has_extension(p, "csv"))? {
            let corpus = match Corpus::read(&csv_path) {
                Ok(corpus) => corpus,
                Err(e) => {
                    log_error!(e => "[harvest] Skipping {}", csv_path.display());
                    continue;
                }
            };
            let Some(cells) = corpus.column(column) else {
                log_warn!(
                    "[harvest] Column '{}' not in {}, skipping.",
                    column,
                    csv_path.display()
                );
                continue;
            };
            for cell in cells {
                let cleaned = clean_text(cell);
                if !cleaned.is_empty() {
                    sentences.extend(split_sentences(&cleaned));
                }
            }
        }

        if sentences.is_empty() {
            log_info!("[harvest] No sentences found for {}", name);
            continue;
        }
        let out = root.join(format!("{}.txt", name));
        let mut content = sentences.join("\n");
        content.push('\n');
        save_text(&content, &out)?;
        log_info!("[harvest] Saved {} sentences to {}", sentences.len(), out.display());
        written.push((out, sentences.len()));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("nsanku_text_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&p);
        p
    }

    #[test]
    fn cleans_references_digits_and_spacing() {
        assert_eq!(
            clean_text("Yesu (Luka 3:23-38) ba  2 mu\n asase so."),
            "Yesu ba mu asase so."
        );
        assert_eq!(clean_text("(see above) stays"), "(see above) stays");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        assert_eq!(
            split_sentences("One. Two! Three? e.g.no split"),
            vec!["One.", "Two!", "Three?", "e.g.no split"]
        );
        assert_eq!(split_sentences("Ends here."), vec!["Ends here."]);
        assert!(split_sentences("  ").is_empty());
    }

    #[test]
    fn body_text_skips_scripts() {
        let html = "<html><head><title>T</title></head><body><h1>Hello</h1>\
                    <script>var x = 1;</script><p>World  again</p></body></html>";
        assert_eq!(html_to_text(html), "Hello\nWorld again");
    }

    #[test]
    fn sentences_are_gathered_per_subdirectory() {
        let root = tmp_dir("extract");
        fs::create_dir_all(root.join("twi")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(
            root.join("twi").join("a.csv"),
            "Title,Content\nx,\"Kasa (1:2) yi. Eye 3 fe!\"\ny,\n",
        )
        .unwrap();
        fs::write(root.join("twi").join("b.csv"), "Other\nnope\n").unwrap();

        let written = extract_sentences(&root, "Content").unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1, 2);
        let text = fs::read_to_string(root.join("twi.txt")).unwrap();
        assert_eq!(text, "Kasa yi.\nEye fe!\n");
        assert!(!root.join("empty.txt").exists());
    }
}

pub mod chart;

use crate::corpus::{Corpus, SIMILARITY_COLUMN, SOURCE_COLUMN};
use crate::error::Result;
use crate::language::LanguagePair;
use crate::utils::{ensure_directory, save_csv, save_json, save_text};
use crate::{log_error, log_info, log_warn};
use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub use chart::{horizontal_bar_chart, stacked_bar_chart};

/// recipe -> score (%)
pub type ModelScores = BTreeMap<String, f64>;
/// recipe -> source -> score (%)
pub type SourceScores = BTreeMap<String, BTreeMap<String, f64>>;

/// Percent scores gathered from the output tree, keyed by `src-tgt`.
#[derive(Debug, Clone, Default)]
pub struct CollectedResults {
    pub scores: BTreeMap<String, ModelScores>,
    pub source_breakdown: BTreeMap<String, SourceScores>,
}

impl CollectedResults {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairSummary {
    pub language_pair: String,
    pub timestamp: String,
    pub models: ModelScores,
    pub average_score: f64,
    pub best_model: String,
    pub best_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_breakdown: Option<SourceScores>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallSummary {
    pub timestamp: String,
    pub total_language_pairs: usize,
    pub total_models: usize,
    pub model_performance: BTreeMap<String, f64>,
    pub language_performance: BTreeMap<String, f64>,
    pub best_overall_model: String,
    pub best_overall_score: f64,
    pub best_language_pair: String,
    pub best_language_score: f64,
    pub language_pairs: Vec<String>,
}

/// Names the recipe that produced `stem`. A known recipe the stem ends with
/// (`_r`) wins; otherwise the longest known `r` whose `_r` occurs in the
/// stem, else the text after the last underscore.
pub fn infer_recipe_name(stem: &str, known_recipes: &[String]) -> String {
    if let Some(recipe) = known_recipes
        .iter()
        .find(|recipe| stem.ends_with(&format!("_{}", recipe)))
    {
        return recipe.clone();
    }
    if let Some(recipe) = known_recipes
        .iter()
        .filter(|recipe| stem.contains(&format!("_{}", recipe)))
        .max_by_key(|recipe| recipe.len())
    {
        return recipe.clone();
    }
    match stem.rsplit_once('_') {
        Some((_, suffix)) if !suffix.is_empty() => suffix.to_string(),
        _ => "unknown_recipe".to_string(),
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// First entry with the highest score; ties keep the earliest key.
fn best_of(scores: &BTreeMap<String, f64>) -> Option<(&String, f64)> {
    scores.iter().fold(None, |best, (name, &score)| match best {
        Some((_, top)) if score <= top => best,
        _ => Some((name, score)),
    })
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn sorted_descending(scores: &BTreeMap<String, f64>) -> Vec<(&String, f64)> {
    let mut sorted: Vec<(&String, f64)> = scores.iter().map(|(k, v)| (k, *v)).collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    sorted
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**").join("*.csv");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Scores of one output file: the overall mean and, when a `source` column
/// exists, per-source means. Unparseable score cells are ignored.
fn score_file(corpus: &Corpus) -> Option<(f64, BTreeMap<String, f64>)> {
    corpus.column_index(SIMILARITY_COLUMN)?;
    let source_idx = corpus.column_index(SOURCE_COLUMN);

    let mut all = Vec::new();
    let mut by_source: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in 0..corpus.len() {
        let Some(score) = corpus
            .cell(row, SIMILARITY_COLUMN)
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            continue;
        };
        all.push(score);
        if source_idx.is_some() {
            if let Some(source) = corpus
                .cell(row, SOURCE_COLUMN)
                .filter(|s| !s.trim().is_empty())
            {
                by_source.entry(source.to_string()).or_default().push(score);
            }
        }
    }

    let overall = mean(all)?;
    let breakdown = by_source
        .into_iter()
        .filter_map(|(source, scores)| mean(scores).map(|m| (source, m * 100.0)))
        .collect();
    Some((overall * 100.0, breakdown))
}

/// Walks `output_dir` for scored CSVs inside `src-tgt` directories.
pub fn collect_results(output_dir: &Path, known_recipes: &[String]) -> Result<CollectedResults> {
    let mut results = CollectedResults::default();
    if !output_dir.is_dir() {
        return Ok(results);
    }

    for path in csv_files(output_dir)? {
        let Some(pair) = path
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|name| name.to_str())
            .and_then(LanguagePair::from_dirname)
        else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let recipe = infer_recipe_name(stem, known_recipes);

        let corpus = match Corpus::read(&path) {
            Ok(corpus) => corpus,
            Err(e) => {
                log_error!(e => "[report] Error reading {}", path.display());
                continue;
            }
        };
        if !corpus.has_column(SIMILARITY_COLUMN) {
            continue;
        }
        let Some((score, breakdown)) = score_file(&corpus) else {
            log_warn!("[report] {} has no numeric similarity scores", path.display());
            continue;
        };

        let key = pair.to_string();
        results
            .scores
            .entry(key.clone())
            .or_default()
            .insert(recipe.clone(), score);
        if corpus.has_column(SOURCE_COLUMN) {
            results
                .source_breakdown
                .entry(key)
                .or_default()
                .insert(recipe, breakdown);
        }
    }
    Ok(results)
}

fn write_pair_report(
    pair: &str,
    models: &ModelScores,
    breakdown: Option<&SourceScores>,
    reports_dir: &Path,
) -> Result<PairSummary> {
    let dir = reports_dir.join(pair);
    ensure_directory(&dir)?;

    horizontal_bar_chart(
        models,
        &format!("Translation Quality for {}", pair),
        "Similarity Score (%)",
        "performance_comparison",
        &dir,
    )?;

    let breakdown = breakdown.filter(|b| b.values().any(|sources| !sources.is_empty()));
    if let Some(breakdown) = breakdown {
        stacked_bar_chart(
            breakdown,
            &format!("Translation Quality by Source for {}", pair),
            "Similarity Score (%)",
            "source_breakdown",
            &dir,
        )?;
        save_csv(
            dir.join("source_breakdown.csv"),
            &["Model", "Source", "Similarity Score (%)", "Raw Score"],
            breakdown.iter().flat_map(|(model, sources)| {
                sources.iter().map(move |(source, score)| {
                    vec![
                        model.clone(),
                        source.clone(),
                        format!("{:.2}%", score),
                        score.to_string(),
                    ]
                })
            }),
        )?;
    }

    let ranked = sorted_descending(models);
    save_csv(
        dir.join("detailed_report.csv"),
        &["Model", "Similarity Score (%)", "Raw Score"],
        ranked
            .iter()
            .map(|(model, score)| vec![model.to_string(), format!("{:.2}%", score), score.to_string()]),
    )?;

    let (best_model, best_score) = best_of(models)
        .map(|(name, score)| (name.clone(), score))
        .unwrap_or_else(|| ("none".to_string(), 0.0));
    let summary = PairSummary {
        language_pair: pair.to_string(),
        timestamp: timestamp(),
        models: models.clone(),
        average_score: mean(models.values().copied()).unwrap_or(0.0),
        best_model,
        best_score,
        source_breakdown: breakdown.cloned(),
    };
    save_json(&summary, dir.join("summary_report.json"))?;

    let mut text = format!(
        "Translation Benchmark Results for {}\nGenerated on: {}\n\nModel Performance:\n",
        pair,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for (model, score) in &ranked {
        text.push_str(&format!("{}: {:.2}%\n", model, score));
    }
    text.push_str(&format!(
        "\nBest Model: {} ({:.2}%)\nAverage Score: {:.2}%\n",
        summary.best_model, summary.best_score, summary.average_score
    ));
    save_text(&text, dir.join("summary.txt"))?;

    log_info!("[report] Generated report for {} in {}", pair, dir.display());
    Ok(summary)
}

fn write_overall_report(results: &CollectedResults, reports_dir: &Path) -> Result<OverallSummary> {
    let all_models: BTreeSet<&String> = results.scores.values().flat_map(|m| m.keys()).collect();

    let model_performance: BTreeMap<String, f64> = all_models
        .iter()
        .filter_map(|model| {
            mean(results.scores.values().filter_map(|m| m.get(*model).copied()))
                .map(|avg| ((*model).clone(), avg))
        })
        .collect();

    let language_performance: BTreeMap<String, f64> = results
        .scores
        .iter()
        .filter_map(|(pair, models)| mean(models.values().copied()).map(|avg| (pair.clone(), avg)))
        .collect();

    if !language_performance.is_empty() {
        horizontal_bar_chart(
            &language_performance,
            "Language Translation Performance Across Models",
            "Average Accuracy Score (%)",
            "language_performance",
            reports_dir,
        )?;
    }
    save_csv(
        reports_dir.join("language_performance.csv"),
        &["Language Pair", "Average Score (%)"],
        sorted_descending(&language_performance)
            .into_iter()
            .map(|(pair, score)| vec![pair.clone(), score.to_string()]),
    )?;

    let (best_overall_model, best_overall_score) = best_of(&model_performance)
        .map(|(name, score)| (name.clone(), score))
        .unwrap_or_else(|| ("none".to_string(), 0.0));
    let (best_language_pair, best_language_score) = best_of(&language_performance)
        .map(|(name, score)| (name.clone(), score))
        .unwrap_or_else(|| ("none".to_string(), 0.0));

    let summary = OverallSummary {
        timestamp: timestamp(),
        total_language_pairs: results.scores.len(),
        total_models: all_models.len(),
        model_performance,
        language_performance,
        best_overall_model,
        best_overall_score,
        best_language_pair,
        best_language_score,
        language_pairs: results.scores.keys().cloned().collect(),
    };
    save_json(&summary, reports_dir.join("overall_summary.json"))?;

    if !summary.model_performance.is_empty() {
        horizontal_bar_chart(
            &summary.model_performance,
            "Overall Model Performance Across All Language Pairs",
            "Average Accuracy Score (%)",
            "overall_performance",
            reports_dir,
        )?;
    }
    Ok(summary)
}

/// Writes per-pair and overall artifacts under `reports_dir`. Returns `None`
/// when `output_dir` holds no scored results.
pub fn generate_report(
    output_dir: &Path,
    reports_dir: &Path,
    known_recipes: &[String],
) -> Result<Option<OverallSummary>> {
    log_info!("[report] Generating performance reports...");
    ensure_directory(reports_dir)?;

    let results = collect_results(output_dir, known_recipes)?;
    if results.is_empty() {
        log_info!("[report] No processed results found. Please run translations first.");
        return Ok(None);
    }

    for (pair, models) in &results.scores {
        if models.is_empty() {
            log_warn!("[report] No model results found for {}", pair);
            continue;
        }
        write_pair_report(pair, models, results.source_breakdown.get(pair), reports_dir)?;
    }

    let summary = write_overall_report(&results, reports_dir)?;
    log_info!("[report] Reports generated successfully in {}", reports_dir.display());
    log_info!(
        "[report] Overall best model: {} ({:.2}%)",
        summary.best_overall_model,
        summary.best_overall_score
    );
    log_info!(
        "[report] Best performing language pair: {} ({:.2}%)",
        summary.best_language_pair,
        summary.best_language_score
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn recipe_inference_prefers_known_names() {
        let known = known(&["deepseek-v3.1", "gpt-oss-120b"]);
        assert_eq!(infer_recipe_name("en-fr_gpt-oss-120b", &known), "gpt-oss-120b");
        assert_eq!(infer_recipe_name("en-fr_deepseek-v3.1", &known), "deepseek-v3.1");
        assert_eq!(infer_recipe_name("en-fr_custom", &known), "custom");
        assert_eq!(infer_recipe_name("results", &known), "unknown_recipe");
    }

    #[test]
    fn known_name_with_underscore_beats_suffix_rule() {
        let known = known(&["llama_3"]);
        assert_eq!(infer_recipe_name("en-fr_llama_3", &known), "llama_3");
    }

    #[test]
    fn longer_recipe_name_wins_over_its_prefix() {
        let short_first = known(&["gpt", "gpt-oss"]);
        assert_eq!(infer_recipe_name("en-fr_gpt-oss", &short_first), "gpt-oss");
        assert_eq!(infer_recipe_name("en-fr_gpt", &short_first), "gpt");

        let long_first = known(&["gpt-oss", "gpt"]);
        assert_eq!(infer_recipe_name("en-fr_gpt-oss", &long_first), "gpt-oss");
        assert_eq!(infer_recipe_name("en-fr_gpt-oss_v2", &long_first), "gpt-oss");
    }

    #[test]
    fn best_keeps_first_of_ties() {
        let scores: BTreeMap<String, f64> =
            [("a".to_string(), 50.0), ("b".to_string(), 50.0)].into_iter().collect();
        assert_eq!(best_of(&scores).map(|(n, _)| n.as_str()), Some("a"));
        assert!(best_of(&BTreeMap::new()).is_none());
    }

    #[test]
    fn file_score_skips_blank_cells_and_groups_by_source() {
        let corpus = Corpus::new(
            vec!["text".into(), "source".into(), "similarity_score".into()],
            vec![
                vec!["a".into(), "bible".into(), "0.5".into()],
                vec!["b".into(), "bible".into(), "1.0".into()],
                vec!["c".into(), "news".into(), "".into()],
                vec!["d".into(), "".into(), "0.0".into()],
            ],
        );
        let (overall, breakdown) = score_file(&corpus).unwrap();
        assert!((overall - 50.0).abs() < 1e-9);
        assert_eq!(breakdown.len(), 1);
        assert!((breakdown["bible"] - 75.0).abs() < 1e-9);
    }
}

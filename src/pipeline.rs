use crate::corpus::{Corpus, TEXT_COLUMN};
use crate::error::Result;
use crate::language::LanguagePair;
use crate::recipe::{Recipe, RecipeRegistry};
use crate::state::{state_key, ProcessingState, StateStore};
use crate::utils::ensure_directory;
use crate::{log_error, log_info, log_warn};
use std::path::{Path, PathBuf};

/// Outcome counts of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// (pair, file, recipe) units that ran and were marked completed.
    pub completed: usize,
    /// Units skipped because state already marked them completed.
    pub skipped: usize,
    /// Units whose recipe, output write or state save failed; retried next run.
    pub failed: usize,
    /// CSV files ignored for a bad name, unreadable content or missing columns.
    pub ignored_files: Vec<String>,
}

/// `<stem>_<recipe>.csv`
pub fn output_filename(input_filename: &str, recipe: &str) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_filename);
    format!("{}_{}.csv", stem, recipe)
}

pub struct Pipeline<'a> {
    input_dir: PathBuf,
    output_dir: PathBuf,
    registry: &'a RecipeRegistry,
    store: StateStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        registry: &'a RecipeRegistry,
        store: StateStore,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            registry,
            store,
        }
    }

    /// Input CSV paths in file-name order.
    fn input_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.input_dir.join("*.csv");
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(e) => {
                    log_warn!("[pipeline] Cannot access {}: {}", e.path().display(), e);
                    None
                }
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Runs every registered recipe over every input file not yet completed.
    /// State is saved after each completed unit; a unit whose state cannot be
    /// saved counts as failed and stays pending.
    pub async fn run(&self, state: &mut ProcessingState) -> Result<RunSummary> {
        log_info!("[pipeline] Running translation and similarity comparison...");
        ensure_directory(&self.output_dir)?;

        let mut summary = RunSummary::default();
        let files = self.input_files()?;
        if files.is_empty() {
            log_warn!("[pipeline] No CSV files found in {}", self.input_dir.display());
        }

        for path in files {
            let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let Some(pair) = LanguagePair::from_filename(&filename) else {
                log_warn!(
                    "[pipeline] Skipping {}: filename should be in format 'source-target.csv'",
                    filename
                );
                summary.ignored_files.push(filename);
                continue;
            };

            let corpus = match Corpus::read(&path) {
                Ok(corpus) => corpus,
                Err(e) => {
                    log_error!(e => "[pipeline] Skipping {}: cannot read CSV", filename);
                    summary.ignored_files.push(filename);
                    continue;
                }
            };
            if !corpus.has_column(TEXT_COLUMN) {
                log_warn!(
                    "[pipeline] Skipping {}: missing required '{}' column",
                    filename,
                    TEXT_COLUMN
                );
                summary.ignored_files.push(filename);
                continue;
            }

            let pair_dir = self.output_dir.join(pair.to_string());
            ensure_directory(&pair_dir)?;

            for (recipe_name, recipe) in self.registry.iter() {
                let key = state_key(&pair, &filename, recipe_name);
                if state.is_completed(&key) {
                    log_info!(
                        "[pipeline] Skipping {} for {} ({}) - already processed",
                        recipe_name,
                        filename,
                        pair
                    );
                    summary.skipped += 1;
                    continue;
                }

                let output_path = pair_dir.join(output_filename(&filename, recipe_name));
                log_info!(
                    "[pipeline] Processing {} with recipe {} for {}",
                    path.display(),
                    recipe_name,
                    pair
                );
                log_info!("[pipeline] Output will be saved to {}", output_path.display());

                match self
                    .run_unit(recipe.as_ref(), corpus.clone(), &pair, &output_path)
                    .await
                {
                    Ok(()) => {
                        state.mark_completed(key.as_str());
                        if let Err(e) = self.store.save(state) {
                            state.unmark(&key);
                            summary.failed += 1;
                            log_error!(
                                e => "[pipeline] Could not save state after {} on {} for {}",
                                recipe_name,
                                filename,
                                pair
                            );
                            continue;
                        }
                        summary.completed += 1;
                        log_info!(
                            "[pipeline] Completed {} on {} for {}",
                            recipe_name,
                            filename,
                            pair
                        );
                    }
                    Err(e) => {
                        summary.failed += 1;
                        log_error!(
                            e => "[pipeline] Error applying {} to {} for {}",
                            recipe_name,
                            filename,
                            pair
                        );
                    }
                }
            }
        }

        log_info!(
            "[pipeline] Run finished: {} completed, {} skipped, {} failed, {} files ignored",
            summary.completed,
            summary.skipped,
            summary.failed,
            summary.ignored_files.len()
        );
        Ok(summary)
    }

    async fn run_unit(
        &self,
        recipe: &dyn Recipe,
        corpus: Corpus,
        pair: &LanguagePair,
        output_path: &Path,
    ) -> Result<()> {
        let result = recipe.process(corpus, pair).await?;
        result.write(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_appends_recipe_to_stem() {
        assert_eq!(output_filename("en-fr.csv", "gpt-oss-120b"), "en-fr_gpt-oss-120b.csv");
        assert_eq!(output_filename("en-tw.csv", "a"), "en-tw_a.csv");
    }
}

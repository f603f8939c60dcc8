//! Embedding-based similarity between machine and reference translations.

use crate::error::Result;
use crate::{log_debug, log_error};
use async_trait::async_trait;

/// Turns strings into fixed-size vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Cosine similarity clamped to `[0, 1]`. Zero-length or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Similarity of one translation against its reference. Missing text on either
/// side, or a failed embedding call, yields 0.0.
pub async fn calculate_similarity(
    embedder: &dyn Embedder,
    translated: &str,
    reference: &str,
) -> f64 {
    if translated.trim().is_empty() || reference.trim().is_empty() {
        return 0.0;
    }

    let inputs = [translated.to_string(), reference.to_string()];
    match embedder.embed(&inputs).await {
        Ok(vectors) if vectors.len() == 2 => cosine_similarity(&vectors[0], &vectors[1]),
        Ok(vectors) => {
            log_error!(
                "[similarity] Expected 2 embeddings, got {}",
                vectors.len()
            );
            0.0
        }
        Err(e) => {
            log_error!(e => "[similarity] Error calculating similarity");
            0.0
        }
    }
}

/// Pairwise similarity of `translated[i]` against `references[i]`, embedding
/// `batch_size` rows per side per request. Pairs with an empty side score 0.0
/// and are not sent to the embedder. A failed batch scores 0.0 for its rows.
pub async fn batch_similarity(
    embedder: &dyn Embedder,
    translated: &[String],
    references: &[String],
    batch_size: usize,
) -> Vec<f64> {
    let mut scores = vec![0.0; translated.len().min(references.len())];
    let scorable: Vec<usize> = (0..scores.len())
        .filter(|&i| !translated[i].trim().is_empty() && !references[i].trim().is_empty())
        .collect();

    let batch_size = batch_size.max(1);
    let total_batches = scorable.len().div_ceil(batch_size);

    for (batch_num, batch) in scorable.chunks(batch_size).enumerate() {
        let left: Vec<String> = batch.iter().map(|&i| translated[i].clone()).collect();
        let right: Vec<String> = batch.iter().map(|&i| references[i].clone()).collect();

        let embedded = match embedder.embed(&left).await {
            Ok(l) => embedder.embed(&right).await.map(|r| (l, r)),
            Err(e) => Err(e),
        };

        match embedded {
            Ok((l, r)) if l.len() == batch.len() && r.len() == batch.len() => {
                for (k, &row) in batch.iter().enumerate() {
                    scores[row] = cosine_similarity(&l[k], &r[k]);
                }
            }
            Ok(_) => {
                log_error!(
                    "[similarity] Batch {}/{} returned the wrong number of embeddings",
                    batch_num + 1,
                    total_batches
                );
            }
            Err(e) => {
                log_error!(e => "[similarity] Batch {}/{} failed", batch_num + 1, total_batches);
            }
        }

        log_debug!("[similarity] Processed batch {}/{}", batch_num + 1, total_batches);
    }

    scores
}

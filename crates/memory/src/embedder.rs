//! Embedding providers. `embed` always returns unit-normalized vectors of
//! `dimension()` length, whichever provider produced them.

use async_trait::async_trait;
use nxa_domain::config::EmbeddingProviderKind;
use nxa_domain::error::{Error, Result};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// Deterministic, dependency-free fallback: hash each token into a bucket
/// of a fixed-size sparse vector, then unit-normalize. Used whenever no
/// remote provider key is configured, and in tests.
pub struct LocalHashEmbedder {
    dims: usize,
}

impl LocalHashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dims;
            v[bucket] += 1.0;
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for LocalHashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dims
    }
}

/// Remote OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbedder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, dims: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            dims,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(serde::Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a [String],
        }
        #[derive(serde::Deserialize)]
        struct Item {
            embedding: Vec<f32>,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            data: Vec<Item>,
        }

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::Other(format!("embedding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Other(format!("embedding request failed: {e}")))?
            .json::<Resp>()
            .await
            .map_err(|e| Error::Other(format!("embedding response decode failed: {e}")))?;

        Ok(resp
            .data
            .into_iter()
            .map(|item| {
                let mut v = item.embedding;
                normalize(&mut v);
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dims
    }
}

/// Remote Gemini `embedContent` endpoint (batched as repeated calls).
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl GeminiEmbedder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, dims: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            dims,
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(serde::Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(serde::Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(serde::Serialize)]
        struct Req<'a> {
            model: &'a str,
            content: Content<'a>,
        }
        #[derive(serde::Deserialize)]
        struct Embedding {
            values: Vec<f32>,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            embedding: Embedding,
        }

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let url = format!(
                "{}/models/{}:embedContent?key={}",
                self.base_url.trim_end_matches('/'),
                self.model,
                self.api_key
            );
            let resp = self
                .client
                .post(url)
                .json(&Req {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .send()
                .await
                .map_err(|e| Error::Other(format!("gemini embed request failed: {e}")))?
                .error_for_status()
                .map_err(|e| Error::Other(format!("gemini embed request failed: {e}")))?
                .json::<Resp>()
                .await
                .map_err(|e| Error::Other(format!("gemini embed response decode failed: {e}")))?;
            let mut v = resp.embedding.values;
            normalize(&mut v);
            out.push(v);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dims
    }
}

/// Resolve the configured or auto-detected provider. `Auto` prefers
/// OpenAI, then Gemini, then falls back to the local hash embedder,
/// matching spec's provider-selection order.
pub fn resolve_embedder(
    kind: EmbeddingProviderKind,
    model: &str,
    dims: usize,
    openai_key: Option<&str>,
    gemini_key: Option<&str>,
) -> Box<dyn Embedder> {
    match kind {
        EmbeddingProviderKind::OpenAi => match openai_key {
            Some(key) => Box::new(OpenAiEmbedder::new("https://api.openai.com/v1", key, model, dims)),
            None => Box::new(LocalHashEmbedder::new(dims)),
        },
        EmbeddingProviderKind::Gemini => match gemini_key {
            Some(key) => Box::new(GeminiEmbedder::new(
                "https://generativelanguage.googleapis.com/v1beta",
                key,
                model,
                dims,
            )),
            None => Box::new(LocalHashEmbedder::new(dims)),
        },
        EmbeddingProviderKind::Local => Box::new(LocalHashEmbedder::new(dims)),
        EmbeddingProviderKind::Auto => {
            if let Some(key) = openai_key {
                Box::new(OpenAiEmbedder::new("https://api.openai.com/v1", key, model, dims))
            } else if let Some(key) = gemini_key {
                Box::new(GeminiEmbedder::new(
                    "https://generativelanguage.googleapis.com/v1beta",
                    key,
                    model,
                    dims,
                ))
            } else {
                Box::new(LocalHashEmbedder::new(dims))
            }
        }
    }
}

pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    // Inputs are already unit-normalized, but guard against drift.
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    ((dot / (na * nb)) as f64).max(0.0)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_embeddings_are_unit_vectors() {
        let embedder = LocalHashEmbedder::new(32);
        let vecs = embedder.embed(&["hello world".into()]).await.unwrap();
        let norm: f32 = vecs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5 || norm == 0.0);
    }

    #[tokio::test]
    async fn identical_text_yields_identical_vectors() {
        let embedder = LocalHashEmbedder::new(32);
        let vecs = embedder.embed(&["same text".into(), "same text".into()]).await.unwrap();
        assert_eq!(vecs[0], vecs[1]);
    }

    #[test]
    fn cosine_of_identical_vector_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_never_negative() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}

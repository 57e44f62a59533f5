//! Embedding production
//!
//! The engine treats embeddings as opaque float arrays. They either
//! arrive with the request, come from a hosted endpoint (`EMBEDDER_URL`),
//! or fall back to a deterministic local feature hasher so text tools
//! keep working in self-contained deployments and tests.

use crate::{VectorError, VectorResult};
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Closed set of embedding strategies
pub enum Embedder {
    /// Deterministic local feature hashing
    Hash(HashEmbedder),
    /// Hosted endpoint speaking the JSON batch protocol
    Http(HttpEmbedder),
}

impl Embedder {
    /// Pick the strategy from configuration
    pub fn from_config(url: Option<String>, dimension: usize, rate_per_sec: f64) -> Self {
        match url {
            Some(url) => Embedder::Http(HttpEmbedder::new(url, rate_per_sec)),
            None => Embedder::Hash(HashEmbedder::new(dimension)),
        }
    }

    /// Embed one text
    pub async fn embed(&self, text: &str) -> VectorResult<Vec<f32>> {
        match self {
            Embedder::Hash(h) => Ok(h.embed(text)),
            Embedder::Http(h) => h.embed(text).await,
        }
    }
}

/// Deterministic bag-of-tokens feature hashing.
///
/// Not a learned embedding; tokens hash into signed buckets and the
/// result is L2-normalized downstream. Good enough for lexical
/// similarity and exact round-trips in tests.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create with a fixed output dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    /// Embed one text
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = FxHasher::default();
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        if v.iter().all(|x| *x == 0.0) {
            // keep empty inputs embeddable
            v[0] = 1.0;
        }
        v
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for a hosted embedding endpoint.
///
/// Requests are throttled with a token bucket; a transient failure is
/// retried once with backoff before surfacing.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    limiter: TokenBucket,
}

impl HttpEmbedder {
    /// Create a client against `url`
    pub fn new(url: String, rate_per_sec: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            limiter: TokenBucket::new(rate_per_sec.max(1.0), rate_per_sec.max(1.0)),
        }
    }

    /// Embed one text
    pub async fn embed(&self, text: &str) -> VectorResult<Vec<f32>> {
        self.limiter.acquire().await;
        match self.request(text).await {
            Ok(vector) => Ok(vector),
            Err(first) => {
                tracing::warn!(error = %first, "embedder request failed, retrying once");
                tokio::time::sleep(Duration::from_millis(200)).await;
                self.request(text).await
            }
        }
    }

    async fn request(&self, text: &str) -> VectorResult<Vec<f32>> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { texts: vec![text] })
            .send()
            .await
            .map_err(|e| VectorError::Embedder(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| VectorError::Embedder(e.to_string()))?;
        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| VectorError::Embedder(e.to_string()))?;
        body.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::Embedder("empty embeddings array".to_string()))
    }
}

/// Token bucket limiter for the shared embedding endpoint.
///
/// `acquire` suspends until a token is available, which is what gives
/// the ingest path its bounded backpressure.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket with the given capacity and refill rate
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for a refill when the bucket is dry
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens =
                    (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed("the quick fox"), embedder.embed("the quick fox"));
        assert_ne!(embedder.embed("alpha"), embedder.embed("omega"));
    }

    #[test]
    fn test_hash_embedder_dimension() {
        let embedder = HashEmbedder::new(32);
        assert_eq!(embedder.embed("anything").len(), 32);
        // minimum dimension is enforced
        let tiny = HashEmbedder::new(2);
        assert_eq!(tiny.embed("x").len(), 8);
    }

    #[test]
    fn test_hash_embedder_handles_empty_input() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed("");
        assert!(v.iter().any(|x| *x != 0.0));
    }

    #[tokio::test]
    async fn test_token_bucket_throttles() {
        let bucket = TokenBucket::new(2.0, 1000.0);
        let start = Instant::now();
        for _ in 0..4 {
            bucket.acquire().await;
        }
        // two immediate, two refilled at 1000/s: well under a second
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}

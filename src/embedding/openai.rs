//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{PodgistError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Per-request input limit of the embeddings endpoint.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(model: &str, dimensions: usize) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            dimensions,
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self::new(&settings.model, settings.dimensions as usize)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| PodgistError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| PodgistError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| PodgistError::OpenAI(format!("Embedding API error: {}", e)))?;

            // The API may reorder results; restore input order by index.
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            if embeddings.len() != chunk.len() {
                return Err(PodgistError::Embedding(format!(
                    "Expected {} embeddings, received {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }

            for data in embeddings {
                if data.embedding.len() != self.dimensions {
                    return Err(PodgistError::Embedding(format!(
                        "Expected {}-dimensional vector, received {}",
                        self.dimensions,
                        data.embedding.len()
                    )));
                }
                all_embeddings.push(data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_dimensions() {
        let embedder = OpenAIEmbedder::new("text-embedding-3-small", 1536);
        assert_eq!(embedder.dimensions(), 1536);

        let settings = EmbeddingSettings::default();
        let embedder = OpenAIEmbedder::from_settings(&settings);
        assert_eq!(embedder.dimensions(), settings.dimensions as usize);
    }
}

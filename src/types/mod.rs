//! Core types used throughout the A.R.E.S server.
//!
//! This module contains all the common data structures used for:
//! - Conversation/user-memory records backing the database layer
//! - RAG (Retrieval Augmented Generation) pipeline domain model
//! - Authentication
//! - Error handling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Conversation Types =============
//
// Kept for the user/session/conversation database layer (`db::traits`,
// `db::turso`) that backs authentication; the chat/agent surface that used
// to read and write through these has been removed.

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The message content.
    pub content: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions to the model.
    System,
    /// Message from the user.
    User,
    /// Response from the assistant/agent.
    Assistant,
}

// ============= Memory Types =============

/// A user preference entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    /// Category of the preference (e.g., "communication", "output").
    pub category: String,
    /// Key identifying the specific preference.
    pub key: String,
    /// The preference value.
    pub value: String,
    /// Confidence score (0.0 to 1.0) for this preference.
    pub confidence: f32,
}

/// A fact learned about a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFact {
    /// Unique identifier for this fact.
    pub id: String,
    /// The user this fact belongs to.
    pub user_id: String,
    /// Category of the fact (e.g., "personal", "work").
    pub category: String,
    /// Key identifying the specific fact.
    pub fact_key: String,
    /// The fact value.
    pub fact_value: String,
    /// Confidence score (0.0 to 1.0) for this fact.
    pub confidence: f32,
    /// When this fact was first recorded.
    pub created_at: DateTime<Utc>,
    /// When this fact was last updated.
    pub updated_at: DateTime<Utc>,
}

// ============= RAG Pipeline Domain Model =============
//
// A pipeline is a named, durable assembly of a chunker, embedding model,
// vector collection, retriever and optional reranker/LLM.

/// Text chunking strategy for a pipeline's ingestion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineChunkingStrategy {
    #[default]
    FixedSize,
    Recursive,
    Sentence,
    Paragraph,
    Semantic,
}

impl std::fmt::Display for PipelineChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FixedSize => "fixed_size",
            Self::Recursive => "recursive",
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Semantic => "semantic",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PipelineChunkingStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed_size" => Ok(Self::FixedSize),
            "recursive" => Ok(Self::Recursive),
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            "semantic" => Ok(Self::Semantic),
            other => Err(AppError::ValidationError(format!(
                "unknown chunking strategy '{other}', expected one of: fixed_size, recursive, sentence, paragraph, semantic"
            ))),
        }
    }
}

/// Embedding provider/model selection for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Bundled default sentence encoder, 384-dim.
    #[default]
    ChromaDefault,
    /// Local BGE-small encoder.
    BgeSmall,
    /// Local sentence-transformers MPNet encoder.
    StMpnet,
    /// Local sentence-transformers RoBERTa-based encoder.
    StRoberta,
    /// Local Qwen3 embedding encoder.
    Qwen3Embed,
    /// OpenAI embeddings API.
    Openai,
    /// Google embeddings API.
    Google,
    /// Generic local sentence-transformers model (same family as bge_small).
    SentenceTransformers,
    /// HuggingFace inference API.
    Huggingface,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChromaDefault => "chroma_default",
            Self::BgeSmall => "bge_small",
            Self::StMpnet => "st_mpnet",
            Self::StRoberta => "st_roberta",
            Self::Qwen3Embed => "qwen3_embed",
            Self::Openai => "openai",
            Self::Google => "google",
            Self::SentenceTransformers => "sentence_transformers",
            Self::Huggingface => "huggingface",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chroma_default" => Ok(Self::ChromaDefault),
            "bge_small" => Ok(Self::BgeSmall),
            "st_mpnet" => Ok(Self::StMpnet),
            "st_roberta" => Ok(Self::StRoberta),
            "qwen3_embed" => Ok(Self::Qwen3Embed),
            "openai" => Ok(Self::Openai),
            "google" => Ok(Self::Google),
            "sentence_transformers" => Ok(Self::SentenceTransformers),
            "huggingface" => Ok(Self::Huggingface),
            other => Err(AppError::ValidationError(format!(
                "unknown embedding provider '{other}'"
            ))),
        }
    }
}

impl EmbeddingProvider {
    /// True for providers resolved through a remote HTTP API rather than a
    /// local model.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Openai | Self::Google | Self::Huggingface)
    }
}

/// Vector store backend. Only `chroma` exists today; the enum reserves room
/// for future backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreType {
    #[default]
    Chroma,
}

impl std::fmt::Display for VectorStoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chroma")
    }
}

impl std::str::FromStr for VectorStoreType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chroma" => Ok(Self::Chroma),
            other => Err(AppError::ValidationError(format!(
                "unknown vector store type '{other}'"
            ))),
        }
    }
}

/// Chat-completion provider used for answer synthesis and LLM-scored reranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LLMProvider {
    #[default]
    Gemini,
    Groq,
    Openrouter,
    Openai,
    Anthropic,
    Deepseek,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::Openrouter => "openrouter",
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Deepseek => "deepseek",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "openrouter" => Ok(Self::Openrouter),
            "openai" => Ok(Self::Openai),
            "anthropic" => Ok(Self::Anthropic),
            "deepseek" => Ok(Self::Deepseek),
            other => Err(AppError::ValidationError(format!(
                "unknown LLM provider '{other}'"
            ))),
        }
    }
}

impl LLMProvider {
    /// Fixed fallback order consulted by the LLM dispatcher (C10) when the
    /// configured provider fails. The configured provider is tried first,
    /// then the rest of this order (skipping itself).
    pub const FALLBACK_ORDER: [LLMProvider; 6] = [
        LLMProvider::Gemini,
        LLMProvider::Groq,
        LLMProvider::Openrouter,
        LLMProvider::Openai,
        LLMProvider::Anthropic,
        LLMProvider::Deepseek,
    ];
}

/// Reranking model selection for a pipeline or a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RerankerModel {
    /// Local cross-encoder reranker (preferred).
    #[default]
    Qwen3,
    /// LLM-scored fallback reranker.
    Llm,
}

impl std::fmt::Display for RerankerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", if matches!(self, Self::Qwen3) { "qwen3" } else { "llm" })
    }
}

impl std::str::FromStr for RerankerModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "qwen3" => Ok(Self::Qwen3),
            "llm" => Ok(Self::Llm),
            other => Err(AppError::ValidationError(format!(
                "unknown reranker model '{other}'"
            ))),
        }
    }
}

/// Operators supported by metadata `where`-clause filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl std::str::FromStr for MetadataFilterOperator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "nin" => Ok(Self::Nin),
            other => Err(AppError::ValidationError(format!(
                "unknown metadata filter operator '{other}'"
            ))),
        }
    }
}

/// A single metadata filter term. Combined filters in a request are ANDed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetadataFilter {
    pub field: String,
    pub op: MetadataFilterOperator,
    pub value: serde_json::Value,
}

/// Chunking configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: PipelineChunkingStrategy,
    #[serde(default = "default_pipeline_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_pipeline_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_pipeline_chunk_size() -> usize {
    1000
}
fn default_pipeline_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: PipelineChunkingStrategy::default(),
            chunk_size: default_pipeline_chunk_size(),
            chunk_overlap: default_pipeline_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    /// Validate chunk size and overlap bounds.
    pub fn validate(&self) -> Result<()> {
        if !(100..=10_000).contains(&self.chunk_size) {
            return Err(AppError::ValidationError(format!(
                "chunk_size must be within [100, 10000], got {}",
                self.chunk_size
            )));
        }
        if self.chunk_overlap > 2_000 {
            return Err(AppError::ValidationError(format!(
                "chunk_overlap must be <= 2000, got {}",
                self.chunk_overlap
            )));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::ValidationError(format!(
                "chunk_overlap ({}) must be < chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Embedding configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    /// Optional explicit model identifier override (e.g. an OpenAI model name).
    #[serde(default)]
    pub model: Option<String>,
}

/// Vector store configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub store_type: VectorStoreType,
}

/// Retrieval configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub reranking_enabled: bool,
    #[serde(default = "default_reranking_top_k")]
    pub reranking_top_k: usize,
    #[serde(default)]
    pub reranker_model: RerankerModel,
}

fn default_top_k() -> usize {
    5
}
fn default_reranking_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: None,
            reranking_enabled: false,
            reranking_top_k: default_reranking_top_k(),
            reranker_model: RerankerModel::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=50).contains(&self.top_k) {
            return Err(AppError::ValidationError(format!(
                "top_k must be within [1, 50], got {}",
                self.top_k
            )));
        }
        if self.reranking_top_k < 1 || self.reranking_top_k > 20 {
            return Err(AppError::ValidationError(format!(
                "reranking_top_k must be within [1, 20], got {}",
                self.reranking_top_k
            )));
        }
        if let Some(t) = self.score_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(AppError::ValidationError(format!(
                    "score_threshold must be within [0.0, 1.0], got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

/// LLM configuration block used for answer synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PipelineLLMConfig {
    #[serde(default)]
    pub provider: LLMProvider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub generate_answer: bool,
}

impl Default for PipelineLLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            model: None,
            generate_answer: false,
        }
    }
}

/// Full pipeline configuration: chunking, embedding, vector store, retrieval and LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct PipelineConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: PipelineLLMConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }
}

/// Pipeline lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    Ingesting,
    Ready,
    Error,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Ingesting => "ingesting",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PipelineStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created" => Ok(Self::Created),
            "ingesting" => Ok(Self::Ingesting),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            other => Err(AppError::Internal(format!(
                "corrupt pipeline status in catalog: '{other}'"
            ))),
        }
    }
}

/// A durable, named RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: PipelineStatus,
    pub config: PipelineConfig,
    pub document_count: u64,
    pub chunk_count: u64,
    pub total_queries: u64,
    pub last_query_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processing status of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RagDocumentStatus {
    Processed,
    Error,
}

impl std::fmt::Display for RagDocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            if matches!(self, Self::Processed) {
                "processed"
            } else {
                "error"
            }
        )
    }
}

impl std::str::FromStr for RagDocumentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processed" => Ok(Self::Processed),
            "error" => Ok(Self::Error),
            other => Err(AppError::Internal(format!(
                "corrupt document status in catalog: '{other}'"
            ))),
        }
    }
}

/// A document ingested into a pipeline (the relational catalog row; chunks
/// themselves live only in the vector store).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RagDocument {
    pub id: String,
    pub pipeline_id: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub file_type: String,
    pub chunk_count: u64,
    pub character_count: u64,
    pub word_count: u64,
    pub status: RagDocumentStatus,
    pub error_message: Option<String>,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Metadata carried by every chunk stored in the vector collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub chunk_total: usize,
    pub pipeline_id: String,
    pub file_type: String,
    pub ingested_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/rag/pipelines`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePipelineRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: PipelineConfig,
}

/// Response for a finished document upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentUploadResponse {
    pub document: RagDocument,
    pub warning: Option<String>,
}

/// Request body for `POST /api/v1/rag/pipelines/{id}/query`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RagQueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub metadata_filters: Vec<MetadataFilter>,
    #[serde(default)]
    pub generate_answer: Option<bool>,
    #[serde(default)]
    pub rerank: Option<bool>,
}

/// A single retrieved (and possibly reranked) chunk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RetrievedChunk {
    pub content: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub score: f32,
    pub rerank_score: Option<f32>,
}

/// Response for `POST /api/v1/rag/pipelines/{id}/query`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RagQueryResponse {
    pub results: Vec<RetrievedChunk>,
    pub total_results: usize,
    pub reranking_applied: bool,
    pub answer: Option<String>,
    pub warning: Option<String>,
    pub duration_ms: u64,
}

/// Response for `GET /api/v1/rag/pipelines/{id}/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PipelineStatistics {
    pub pipeline_id: String,
    pub document_count: u64,
    pub chunk_count: u64,
    pub total_queries: u64,
    pub last_query_at: Option<DateTime<Utc>>,
    pub status: PipelineStatus,
}

/// Response for `GET /api/v1/rag/config/options`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigOptions {
    pub chunking_strategies: Vec<&'static str>,
    pub embedding_providers: Vec<&'static str>,
    pub vector_store_types: Vec<&'static str>,
    pub llm_providers: Vec<&'static str>,
    pub reranker_models: Vec<&'static str>,
    pub metadata_filter_operators: Vec<&'static str>,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            chunking_strategies: vec!["fixed_size", "recursive", "sentence", "paragraph", "semantic"],
            embedding_providers: vec![
                "chroma_default",
                "bge_small",
                "st_mpnet",
                "st_roberta",
                "qwen3_embed",
                "openai",
                "google",
                "sentence_transformers",
                "huggingface",
            ],
            vector_store_types: vec!["chroma"],
            llm_providers: vec![
                "gemini",
                "groq",
                "openrouter",
                "openai",
                "anthropic",
                "deepseek",
            ],
            reranker_models: vec!["qwen3", "llm"],
            metadata_filter_operators: vec!["eq", "ne", "gt", "gte", "lt", "lte", "in", "nin"],
        }
    }
}

// ============= Authentication Types =============

/// Request payload for user login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// User's email address.
    pub email: String,
    /// User's password.
    pub password: String,
}

/// Request payload for user registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address for the new account.
    pub email: String,
    /// Password for the new account.
    pub password: String,
    /// Display name for the user.
    pub name: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token for API authentication.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// Time in seconds until the access token expires.
    pub expires_in: i64,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// User's email address.
    pub email: String,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
    /// Issued at time (Unix timestamp).
    pub iat: usize,
}

// ============= Error Types =============

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// LLM operation failed.
    #[error("LLM error: {0}")]
    LLM(String),

    /// Authentication or authorization failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External service call failed.
    #[error("External service error: {0}")]
    External(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    // ===== RAG pipeline error kinds =====
    /// A pipeline config field is outside its allowed bounds.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Upload extension isn't one of the supported document types.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Uploaded file body was empty.
    #[error("Empty file: {0}")]
    EmptyFile(String),

    /// Both PDF extraction strategies returned empty/whitespace text.
    #[error("Could not extract text from PDF: {0}")]
    UnextractablePDF(String),

    /// Parsed/cleaned text had no non-whitespace content.
    #[error("Document has no extractable text: {0}")]
    EmptyText(String),

    /// Query issued against a pipeline that isn't READY.
    #[error("Pipeline not ready: {0}")]
    PipelineNotReady(String),

    /// Ingest attempted with an embedding model that doesn't match the collection's.
    #[error("Embedding model mismatch: {0}")]
    EmbeddingMismatch(String),

    /// Generic conflict, e.g. a collection that already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Provider rejected credentials.
    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    /// Provider rate-limited the request.
    #[error("Provider rate limited: {0}")]
    ProviderRateLimit(String),

    /// Provider call exceeded its deadline.
    #[error("Provider timeout: {0}")]
    ProviderTimeout(String),

    /// Vector store operation failed (insert/query/delete).
    #[error("Vector store failure: {0}")]
    VectorStoreFailure(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LLM(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Auth(msg) => (axum::http::StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::External(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::ValidationError(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::UnsupportedFileType(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::EmptyFile(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::UnextractablePDF(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::EmptyText(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::PipelineNotReady(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::EmbeddingMismatch(msg) => (axum::http::StatusCode::CONFLICT, msg),
            AppError::Conflict(msg) => (axum::http::StatusCode::CONFLICT, msg),
            AppError::ProviderAuth(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::ProviderRateLimit(msg) => (axum::http::StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::ProviderTimeout(msg) => (axum::http::StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::VectorStoreFailure(msg) => {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "details": message
        });

        (status, axum::Json(body)).into_response()
    }
}

/// A specialized Result type for A.R.E.S operations.
pub type Result<T> = std::result::Result<T, AppError>;

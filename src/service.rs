//! Movie resource operations, independent of the HTTP framework.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use crate::MovieDb;
use crate::clock::{format_timestamp, Clock};
use crate::enrich::{Enricher, RequestContext, WriteKind};
use crate::error::{ApiError, ApiResult};
use crate::model::MovieRecord;
use crate::pdf::DocumentRenderer;
use crate::validation::{validate, validate_language};

/// Query string of the list endpoint. `limit` stays a string so that a
/// non-numeric value can be ignored instead of failing the request.
/// A fractional limit keeps its integer part; negatives are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.trunc() as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageUpdate {
    pub message: String,
    pub updated_count: usize,
}

/// A rendered document ready to be sent.
#[derive(Debug, Clone)]
pub struct Document {
    pub content_type: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct MovieService {
    db: Arc<MovieDb>,
    clock: Arc<dyn Clock>,
    enricher: Enricher,
    renderer: Arc<dyn DocumentRenderer>,
}

impl MovieService {
    pub fn new(
        db: Arc<MovieDb>,
        clock: Arc<dyn Clock>,
        enricher: Enricher,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self { db, clock, enricher, renderer }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn get(&self, id: u64) -> ApiResult<MovieRecord> {
        self.db.get(id)?.ok_or(ApiError::NotFound)
    }

    /// Genre filter first, then the limit, keeping stored order.
    pub fn list(&self, query: &ListQuery) -> ApiResult<Vec<MovieRecord>> {
        let mut movies = self.db.all()?;

        if let Some(needle) = query.filter.as_deref().filter(|f| !f.is_empty()) {
            movies.retain(|m| m.genre_matches(needle));
        }
        if let Some(limit) = query.limit() {
            movies.truncate(limit);
        }
        Ok(movies)
    }

    pub fn create(&self, payload: Value, ctx: &RequestContext) -> ApiResult<MovieRecord> {
        let payload = self.enricher.enrich(payload, WriteKind::Create, ctx);
        let fields = validate(&payload, self.clock.current_year())?;

        let movie = self.db.insert(fields)?;
        debug!("Created movie {}", movie.id);
        Ok(movie)
    }

    pub fn update(&self, id: u64, payload: Value, ctx: &RequestContext) -> ApiResult<MovieRecord> {
        let payload = self.enricher.enrich(payload, WriteKind::Update, ctx);
        let fields = validate(&payload, self.clock.current_year())?;

        let movie = self.db.update(id, fields)?.ok_or(ApiError::NotFound)?;
        debug!("Updated movie {}", movie.id);
        Ok(movie)
    }

    pub fn delete(&self, id: u64) -> ApiResult<MovieRecord> {
        let movie = self.db.delete(id)?.ok_or(ApiError::NotFound)?;
        debug!("Deleted movie {}", movie.id);
        Ok(movie)
    }

    pub fn update_language(&self, body: &Value) -> ApiResult<LanguageUpdate> {
        let language = validate_language(body)?;
        let stamp = format_timestamp(self.clock.now());

        let updated_count = self.db.set_language_all(&language, &stamp)?;
        debug!("Set language {:?} on {} movies", language, updated_count);

        Ok(LanguageUpdate {
            message: "Language updated on all movies.".to_string(),
            updated_count,
        })
    }

    pub fn export(&self, id: u64) -> ApiResult<Document> {
        let movie = self.get(id)?;
        let bytes = self.renderer.render(&movie)?;

        Ok(Document {
            content_type: self.renderer.content_type(),
            file_name: self.renderer.file_name(&movie),
            bytes,
        })
    }
}

use serde::{Deserialize, Serialize};

/// Earliest accepted release year (first motion picture)
pub const FIRST_RELEASE_YEAR: i64 = 1888;

/// Business fields of a movie after validation
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFields {
    pub title: String,
    pub director: String,
    pub release_year: i64,
    pub genre: String,
    pub rating: f64,
    pub duration_minutes: u64,
    pub language: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub ip: Option<String>,
}

/// The Atomic Unit of the collection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MovieRecord {
    /// Assigned by the store, never changes
    pub id: u64,

    pub title: String,
    pub director: String,
    pub release_year: i64,
    pub genre: String,
    pub rating: f64,
    pub duration_minutes: u64,
    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Client address of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl MovieRecord {
    pub fn new(id: u64, fields: MovieFields) -> Self {
        Self {
            id,
            title: fields.title,
            director: fields.director,
            release_year: fields.release_year,
            genre: fields.genre,
            rating: fields.rating,
            duration_minutes: fields.duration_minutes,
            language: fields.language,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
            ip: fields.ip,
        }
    }

    /// Shallow merge: present fields overwrite, absent optional fields are kept.
    /// `id` and `created_at` are never touched.
    pub fn merge(&mut self, fields: MovieFields) {
        self.title = fields.title;
        self.director = fields.director;
        self.release_year = fields.release_year;
        self.genre = fields.genre;
        self.rating = fields.rating;
        self.duration_minutes = fields.duration_minutes;
        self.language = fields.language;
        if fields.updated_at.is_some() {
            self.updated_at = fields.updated_at;
        }
        if fields.ip.is_some() {
            self.ip = fields.ip;
        }
    }

    pub fn genre_matches(&self, needle: &str) -> bool {
        self.genre.to_lowercase().contains(&needle.to_lowercase())
    }
}

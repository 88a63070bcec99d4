use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MovieId = u64;

pub const MIN_YEAR: i32 = 1888;
pub const MAX_YEAR: i32 = 2100;
pub const MAX_PLOT_CHARS: usize = 1000;
pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DIRECTOR_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,

    pub title: String,
    pub director: String,
    pub year: i32,
    pub plot: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // tombstone; a set value hides the record from every normal read
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Movie {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub director: String,
    pub year: i32,
    pub plot: String,
}

/// Field-level partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub plot: Option<String>,
}

impl MoviePatch {
    pub fn apply(self, movie: &mut Movie, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(director) = self.director {
            movie.director = director;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(plot) = self.plot {
            movie.plot = plot;
        }
        movie.updated_at = now;
    }
}

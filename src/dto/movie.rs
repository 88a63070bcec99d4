use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::movie::{
        Movie, MovieId, MoviePatch, NewMovie, MAX_DIRECTOR_CHARS, MAX_PLOT_CHARS, MAX_TITLE_CHARS,
        MAX_YEAR, MIN_YEAR,
    },
};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub director: String,
    pub year: i32,
    #[serde(default)]
    pub plot: String,
}

impl CreateMovieRequest {
    pub fn validate(self) -> Result<NewMovie, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".into()));
        }
        if self.director.trim().is_empty() {
            return Err(AppError::Validation("director is required".into()));
        }
        check_len("title", &self.title, MAX_TITLE_CHARS)?;
        check_len("director", &self.director, MAX_DIRECTOR_CHARS)?;
        check_year(self.year)?;
        check_plot(&self.plot)?;

        Ok(NewMovie {
            title: self.title,
            director: self.director,
            year: self.year,
            plot: self.plot,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub plot: Option<String>,
}

impl UpdateMovieRequest {
    pub fn validate(self) -> Result<MoviePatch, AppError> {
        if matches!(&self.title, Some(t) if t.is_empty()) {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if matches!(&self.director, Some(d) if d.is_empty()) {
            return Err(AppError::Validation("director must not be empty".into()));
        }
        if let Some(title) = &self.title {
            check_len("title", title, MAX_TITLE_CHARS)?;
        }
        if let Some(director) = &self.director {
            check_len("director", director, MAX_DIRECTOR_CHARS)?;
        }
        if let Some(year) = self.year {
            check_year(year)?;
        }
        if let Some(plot) = &self.plot {
            check_plot(plot)?;
        }

        Ok(MoviePatch {
            title: self.title,
            director: self.director,
            year: self.year,
            plot: self.plot,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMoviesQuery {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl ListMoviesQuery {
    pub fn validate(&self) -> Result<Page, AppError> {
        let limit = match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(l) if l > MAX_PAGE_LIMIT => {
                return Err(AppError::Validation(format!(
                    "limit must be between 1 and {MAX_PAGE_LIMIT}"
                )))
            }
            Some(l) => l,
        };

        Ok(Page {
            limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn check_year(year: i32) -> Result<(), AppError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::Validation(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    Ok(())
}

// column widths are in characters, not bytes
fn check_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_plot(plot: &str) -> Result<(), AppError> {
    if plot.chars().count() > MAX_PLOT_CHARS {
        return Err(AppError::Validation(format!(
            "plot must be at most {MAX_PLOT_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateMovieResponse {
    pub id: MovieId,
    pub title: String,
    pub director: String,
    pub year: i32,
    pub plot: String,
    pub created_at: DateTime<Utc>,
}

impl From<Movie> for CreateMovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id,
            title: m.title,
            director: m.director,
            year: m.year,
            plot: m.plot,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovieResponse {
    pub id: MovieId,
    pub title: String,
    pub director: String,
    pub year: i32,
    pub plot: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Movie> for MovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id,
            title: m.title,
            director: m.director,
            year: m.year,
            plot: m.plot,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpdateMovieResponse {
    pub id: MovieId,
    pub title: String,
    pub director: String,
    pub year: i32,
    pub plot: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Movie> for UpdateMovieResponse {
    fn from(m: Movie) -> Self {
        Self {
            id: m.id,
            title: m.title,
            director: m.director,
            year: m.year,
            plot: m.plot,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListMoviesResponse {
    pub movies: Vec<MovieResponse>,
    pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteMovieResponse {
    pub message: String,
}

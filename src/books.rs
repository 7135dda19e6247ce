//! Typed view of the records in the `books` collection, plus a synthetic generator
//! for seeding.

use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument, doc};
use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const GENRES: &[&str] = &[
    "Adventure",
    "Fiction",
    "Dystopian",
    "Romance",
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Non-Fiction",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
}

impl BookRecord {
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        doc! {
            "title": self.title.clone(),
            "author": self.author.clone(),
            "genre": self.genre.clone(),
            "published_year": self.published_year,
            "price": self.price,
            "inStock": self.in_stock,
        }
    }

    /// Reads a stored record; numeric fields accept any BSON number width.
    ///
    /// # Errors
    /// Returns `Bson` when a field is missing or has the wrong type.
    pub fn from_document(doc: &BsonDocument) -> Result<Self, DbError> {
        let text = |k: &str| {
            doc.get_str(k).map(str::to_string).map_err(|e| DbError::Bson(format!("{k}: {e}")))
        };
        let number = |k: &str| {
            doc.get(k)
                .and_then(crate::query::as_f64)
                .ok_or_else(|| DbError::Bson(format!("{k}: expected a number")))
        };
        let year = match doc.get("published_year") {
            Some(Bson::Int32(y)) => *y,
            Some(Bson::Int64(y)) => i32::try_from(*y)
                .map_err(|_| DbError::Bson("published_year: out of range".into()))?,
            Some(Bson::Double(y)) => crate::utils::num::f64_to_i64_exact(*y)
                .and_then(|y| i32::try_from(y).ok())
                .ok_or_else(|| DbError::Bson("published_year: not an integer".into()))?,
            _ => return Err(DbError::Bson("published_year: expected an integer".into())),
        };
        Ok(Self {
            title: text("title")?,
            author: text("author")?,
            genre: text("genre")?,
            published_year: year,
            price: number("price")?,
            in_stock: doc
                .get_bool("inStock")
                .map_err(|e| DbError::Bson(format!("inStock: {e}")))?,
        })
    }
}

/// Generates `count` plausible books. The same `seed` always yields the same records.
#[must_use]
pub fn generate_books(count: usize, seed: Option<u64>) -> Vec<BookRecord> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    (0..count).map(|_| generate_one(&mut rng)).collect()
}

fn generate_one(rng: &mut StdRng) -> BookRecord {
    let words: Vec<String> = Words(1..4).fake_with_rng(rng);
    let title = words.iter().map(|w| capitalize(w)).collect::<Vec<_>>().join(" ");
    let cents: i32 = rng.random_range(499..6000);
    BookRecord {
        title,
        author: Name().fake_with_rng(rng),
        genre: GENRES.choose(rng).copied().unwrap_or("Fiction").to_string(),
        published_year: rng.random_range(1850..=2024),
        price: f64::from(cents) / 100.0,
        in_stock: rng.random_bool(0.7),
    }
}

fn capitalize(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

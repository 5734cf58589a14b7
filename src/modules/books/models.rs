use bookbay_db::{Document, FieldViolation};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub description: String,
    pub stock: i64,
    pub isbn: String,
    pub category: String,
    #[serde(with = "calendar_date")]
    pub published_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Book {
    /// Materialize a validated input, stamping it with `created_at`.
    ///
    /// The id is left empty for the store to assign.
    pub fn from_new(book: NewBook, created_at: OffsetDateTime) -> Self {
        Self {
            id: String::new(),
            title: book.title,
            author: book.author,
            price: book.price,
            description: book.description,
            stock: book.stock,
            isbn: book.isbn,
            category: book.category,
            published_date: book.published_date,
            created_at,
        }
    }
}

impl Document for Book {
    const COLLECTION: &'static str = "books";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn unique_fields(&self) -> Vec<(&'static str, String)> {
        vec![("isbn", self.isbn.clone())]
    }

    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("description", &self.description),
            ("isbn", &self.isbn),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                violations.push(FieldViolation::new(field, "is required"));
            }
        }
        check_price(self.price, &mut violations);
        check_stock(self.stock, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Client payload for creating or replacing a book.
///
/// Every field is required; missing fields are reported as violations by
/// [`BookInput::into_new_book`] rather than rejected by the JSON decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub description: String,
    pub stock: Option<i64>,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub category: String,
    pub published_date: Option<String>,
}

/// A trimmed and checked [`BookInput`], ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub price: f64,
    pub description: String,
    pub stock: i64,
    pub isbn: String,
    pub category: String,
    pub published_date: Date,
}

impl BookInput {
    /// Trim every string field and check the schema constraints.
    ///
    /// All violations are collected, not just the first.
    pub fn into_new_book(self) -> Result<NewBook, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let mut required = |field: &'static str, value: String| {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                violations.push(FieldViolation::new(field, "is required"));
            }
            trimmed
        };
        let title = required("title", self.title);
        let author = required("author", self.author);
        let description = required("description", self.description);
        let isbn = required("isbn", self.isbn);
        let category = required("category", self.category);

        let price = match self.price {
            Some(price) => {
                check_price(price, &mut violations);
                price
            }
            None => {
                violations.push(FieldViolation::new("price", "is required"));
                0.0
            }
        };

        let stock = match self.stock {
            Some(stock) => {
                check_stock(stock, &mut violations);
                stock
            }
            None => {
                violations.push(FieldViolation::new("stock", "is required"));
                0
            }
        };

        let published_date = match self.published_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match calendar_date::parse(raw) {
                Ok(date) => Some(date),
                Err(_) => {
                    violations.push(FieldViolation::new(
                        "publishedDate",
                        "must be a date in YYYY-MM-DD format",
                    ));
                    None
                }
            },
            _ => {
                violations.push(FieldViolation::new("publishedDate", "is required"));
                None
            }
        };

        match published_date {
            Some(published_date) if violations.is_empty() => Ok(NewBook {
                title,
                author,
                price,
                description,
                stock,
                isbn,
                category,
                published_date,
            }),
            _ => Err(violations),
        }
    }
}

fn check_price(price: f64, violations: &mut Vec<FieldViolation>) {
    if !price.is_finite() || price < 0.0 {
        violations.push(FieldViolation::new("price", "must be a non-negative number"));
    }
}

fn check_stock(stock: i64, violations: &mut Vec<FieldViolation>) {
    if stock < 0 {
        violations.push(FieldViolation::new("stock", "must not be negative"));
    }
}

/// `YYYY-MM-DD` serde format for [`Date`].
pub(crate) mod calendar_date {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn parse(raw: &str) -> Result<Date, time::error::Parse> {
        Date::parse(raw, FORMAT)
    }

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }
}

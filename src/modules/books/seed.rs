use time::macros::date;

use super::models::NewBook;

/// Sample catalog loaded into an empty store at startup.
pub fn sample_books() -> Vec<NewBook> {
    vec![
        NewBook {
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
            price: 12.99,
            description: "A classic American novel set in the Jazz Age".to_string(),
            stock: 50,
            isbn: "978-0-7432-7356-5".to_string(),
            category: "Fiction".to_string(),
            published_date: date!(1925 - 04 - 10),
        },
        NewBook {
            title: "To Kill a Mockingbird".to_string(),
            author: "Harper Lee".to_string(),
            price: 14.99,
            description: "A gripping tale of racial injustice and childhood innocence".to_string(),
            stock: 30,
            isbn: "978-0-06-112008-4".to_string(),
            category: "Fiction".to_string(),
            published_date: date!(1960 - 07 - 11),
        },
        NewBook {
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
            price: 13.99,
            description: "A dystopian social science fiction novel".to_string(),
            stock: 40,
            isbn: "978-0-452-28423-4".to_string(),
            category: "Science Fiction".to_string(),
            published_date: date!(1949 - 06 - 08),
        },
        NewBook {
            title: "Pride and Prejudice".to_string(),
            author: "Jane Austen".to_string(),
            price: 11.99,
            description: "A romantic novel of manners".to_string(),
            stock: 25,
            isbn: "978-0-14-143951-8".to_string(),
            category: "Romance".to_string(),
            published_date: date!(1813 - 01 - 28),
        },
        NewBook {
            title: "The Catcher in the Rye".to_string(),
            author: "J.D. Salinger".to_string(),
            price: 13.5,
            description: "A controversial novel about teenage rebellion".to_string(),
            stock: 35,
            isbn: "978-0-316-76948-0".to_string(),
            category: "Fiction".to_string(),
            published_date: date!(1951 - 07 - 16),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sample_isbns_are_unique() {
        let books = sample_books();
        let isbns: HashSet<&str> = books.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns.len(), books.len());
    }
}

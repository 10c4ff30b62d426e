//! Built-in word categories.
//!
//! The catalog is static and ships with the server; clients only ever
//! refer to categories by name.

use std::collections::HashSet;

/// Category used when the selected categories yield no words.
pub const FALLBACK_CATEGORY: &str = "Locations";

static CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Locations",
        &[
            "Beach", "Hospital", "School", "Casino", "Airplane", "Pirate Ship",
            "Circus", "Bank", "Spa", "Embassy",
        ],
    ),
    (
        "Objects",
        &[
            "Camera", "Phone", "Watch", "Umbrella", "Shoe", "Laptop", "Guitar",
            "Book", "Key", "Wallet",
        ],
    ),
    (
        "Nature",
        &[
            "Forest", "Desert", "Mountain", "River", "Volcano", "Cave", "Ocean",
            "Waterfall", "Jungle", "Glacier",
        ],
    ),
    (
        "Food",
        &[
            "Pizza", "Sushi", "Burger", "Tacos", "Pasta", "Ice Cream", "Steak",
            "Salad", "Curry", "Sandwich",
        ],
    ),
    (
        "Animals",
        &[
            "Lion", "Elephant", "Penguin", "Kangaroo", "Octopus", "Snake",
            "Eagle", "Shark", "Panda", "Tiger",
        ],
    ),
];

/// Names of every built-in category, in catalog order.
pub fn category_names() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|(name, _)| *name)
}

/// The word list of one category. Names are case-sensitive.
pub fn words(category: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, words)| *words)
}

/// Union of the word lists of every named category.
///
/// Unknown names contribute nothing. Each word appears once, so the
/// pool can be sampled uniformly.
pub fn word_pool<'a, I>(categories: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .filter_map(|name| words(name))
        .flatten()
        .copied()
        .filter(|word| seen.insert(*word))
        .collect()
}

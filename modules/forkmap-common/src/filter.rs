//! Cheap metadata pre-filter.
//!
//! Scores probe metadata against weighted keyword sets so videos with no
//! food signal never reach the paid analysis stage. Substring matching,
//! not word-boundary aware; each metadata field is scored separately, so
//! a keyword appearing in both title and description counts twice.

use crate::types::{FilterVerdict, VideoMetadata};

/// High-confidence food words (+3 per field occurrence).
const HIGH_KEYWORDS: &[&str] = &[
    "restaurant",
    "cafe",
    "café",
    "bistro",
    "omakase",
    "ramen",
    "sushi",
    "pizzeria",
    "diner",
    "eatery",
    "foodtok",
    "foodie",
    "mukbang",
    "michelin",
    "foodcrawl",
    "food crawl",
    "food tour",
    "food review",
    "food spot",
    "food vlog",
    "food blog",
    "must eat",
    "must try",
    "best eats",
    "where to eat",
    "eating tour",
    "street food",
    "food guide",
    "food find",
    "food hack",
    "food rec",
    "izakaya",
    "trattoria",
    "gastropub",
    "hawker",
    // Indonesian
    "resto",
    "warung",
    "kuliner",
    "kulineran",
    "makan",
    "makanan",
    "kopitiam",
    "bakso",
    "prasmanan",
    "foodmap",
    "jktfood",
    "jktgo",
    // Japanese
    "yakitori",
    "yakibuta",
    "tempura",
    "udon",
    "donburi",
];

/// Medium-confidence food words (+1 per field occurrence).
const MEDIUM_KEYWORDS: &[&str] = &[
    "food",
    "eat",
    "eating",
    "ate",
    "brunch",
    "lunch",
    "dinner",
    "breakfast",
    "cook",
    "cooking",
    "recipe",
    "dish",
    "menu",
    "taste",
    "tasting",
    "delicious",
    "yummy",
    "hungry",
    "bao",
    "pho",
    "taco",
    "burger",
    "steak",
    "pasta",
    "noodle",
    "noodles",
    "bbq",
    "barbecue",
    "seafood",
    "dessert",
    "bakery",
    "hidden gem",
    "chef",
    "kitchen",
    "appetizer",
    "entree",
    "cocktail",
    "wine bar",
    "bar food",
    "dim sum",
    "dumpling",
    "pizza",
    "curry",
    "thai",
    "korean",
    "japanese",
    "mexican",
    "italian",
    "chinese",
    "vietnamese",
    "indian",
    "mediterranean",
    "greek",
    "french cuisine",
    "spicy",
    "crispy",
    "grilled",
    "fried",
    "roasted",
    // Indonesian
    "nasi",
    "mie",
    "bakmi",
    "bakmie",
    "babi",
    "ayam",
    "bebek",
    "sambal",
    "goreng",
    "soto",
    "enak",
    "cobain",
    "nyobain",
    "batagor",
    "cuankie",
    "misoa",
    "hainam",
    "tiramisu",
    "lauknya",
    "pedes",
    "viral",
    "hits",
    // Japanese
    "tonkotsu",
    "matcha",
    "gyoza",
    "katsu",
    "bento",
    "onigiri",
];

/// Strong signals this is NOT a restaurant video (−2 per field occurrence).
const ANTI_KEYWORDS: &[&str] = &[
    "tutorial",
    "gaming",
    "makeup",
    "dance challenge",
    "fitness",
    "workout",
    "news",
    "politics",
    "unboxing tech",
    "coding",
    "programming",
    "skincare",
    "fashion haul",
    "prank",
    "diy craft",
    "home decor diy",
];

const HIGH_WEIGHT: i32 = 3;
const MEDIUM_WEIGHT: i32 = 1;
const ANTI_WEIGHT: i32 = -2;

/// Raw relevance score across all metadata fields.
pub fn score_metadata(meta: &VideoMetadata) -> i32 {
    let tags = meta.tags.join(" ");
    let fields = [
        meta.title.as_str(),
        meta.description.as_str(),
        meta.uploader.as_str(),
        tags.as_str(),
    ];

    let mut score = 0;
    for field in fields {
        let text = field.to_lowercase();
        for kw in HIGH_KEYWORDS {
            if text.contains(kw) {
                score += HIGH_WEIGHT;
            }
        }
        for kw in MEDIUM_KEYWORDS {
            if text.contains(kw) {
                score += MEDIUM_WEIGHT;
            }
        }
        for kw in ANTI_KEYWORDS {
            if text.contains(kw) {
                score += ANTI_WEIGHT;
            }
        }
    }
    score
}

/// Map probe metadata to a tri-state relevance verdict.
pub fn relevance(meta: &VideoMetadata) -> FilterVerdict {
    verdict_for(score_metadata(meta))
}

fn verdict_for(score: i32) -> FilterVerdict {
    if score >= 3 {
        FilterVerdict::Likely
    } else if score >= -1 {
        FilterVerdict::Maybe
    } else {
        FilterVerdict::Unlikely
    }
}

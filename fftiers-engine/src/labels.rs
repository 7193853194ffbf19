//! Tier labels and colors
//!
//! Presentation metadata depends only on the tier index, never on the
//! strategy that produced the tier.

/// Red → amber → green → blue → purple
const TIER_COLORS: [&str; 10] = [
    "#e53935", // red
    "#f4511e", // deep orange
    "#fb8c00", // orange
    "#ffb300", // amber
    "#c0ca33", // lime
    "#43a047", // green
    "#00897b", // teal
    "#1e88e5", // blue
    "#3949ab", // indigo
    "#8e24aa", // purple
];

const TIER_LABELS: [&str; 8] = [
    "Elite",
    "Excellent",
    "Very Good",
    "Good",
    "Solid",
    "Average",
    "Below Average",
    "Deep Sleeper",
];

/// Color for a 1-based tier index; cycles past the end of the palette
pub fn tier_color(tier_index: u32) -> &'static str {
    let i = (tier_index.max(1) - 1) as usize;
    TIER_COLORS[i % TIER_COLORS.len()]
}

/// Label for a 1-based tier index; `"Tier n"` past the end of the table
pub fn tier_label(tier_index: u32) -> String {
    match tier_index
        .checked_sub(1)
        .and_then(|i| TIER_LABELS.get(i as usize))
    {
        Some(label) => (*label).to_string(),
        None => format!("Tier {}", tier_index),
    }
}

/// `(color, label)` pair for a tier index
pub fn tier_presentation(tier_index: u32) -> (String, String) {
    (tier_color(tier_index).to_string(), tier_label(tier_index))
}

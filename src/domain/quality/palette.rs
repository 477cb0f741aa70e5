//! 色板提取

use std::collections::HashMap;

use super::report::{ColorPalette, ColorUsage};
use crate::domain::tables::PatternTables;
use crate::domain::text::{self, CharIndex};

/// 主色数量
pub const DOMINANT_COLORS: usize = 3;

/// 统计颜色词，频率最高的前三个为主色，其余为点缀色
pub fn extract(tables: &PatternTables, text: &str) -> ColorPalette {
    let index = CharIndex::new(text);
    let mut found: HashMap<String, ColorUsage> = HashMap::new();
    let mut total = 0;

    for word in text::words(text) {
        let lower = word.text.to_lowercase();
        let Some(hex) = tables.color_hex(&lower) else {
            continue;
        };
        total += 1;
        found
            .entry(lower)
            .or_insert_with_key(|name| ColorUsage {
                name: name.clone(),
                hex: hex.to_string(),
                frequency: 0,
                prominence: 0.0,
                first_position: index.to_char(word.start),
            })
            .frequency += 1;
    }

    if total == 0 {
        return ColorPalette::NoColors;
    }

    let mut colors: Vec<ColorUsage> = found
        .into_values()
        .map(|mut usage| {
            usage.prominence = text::round2(usage.frequency as f64 / total as f64);
            usage
        })
        .collect();
    colors.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.first_position.cmp(&b.first_position))
    });

    let accent = colors.split_off(colors.len().min(DOMINANT_COLORS));
    ColorPalette::Found {
        dominant: colors,
        accent,
        total_mentions: total,
    }
}

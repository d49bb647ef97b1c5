// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text layout for synthesized pages (caption placeholders and text pages).

/// Approximate width of an average Helvetica glyph relative to the font size.
pub(crate) const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Characters that fit on one line at `font_size_pt` within `usable_width_pt`.
pub(crate) fn max_chars_per_line(usable_width_pt: f32, font_size_pt: f32) -> usize {
    let avg_char_width = HELVETICA_CHAR_WIDTH_RATIO * font_size_pt;
    (usable_width_pt / avg_char_width).max(1.0) as usize
}

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within
/// each paragraph. Words longer than `max_width` are force-broken.
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::with_capacity(max_width);

        for word in words {
            if word.len() > max_width {
                if !current_line.is_empty() {
                    result.push(current_line.clone());
                    current_line.clear();
                }
                // Force-break the oversized word.
                let mut remaining = word;
                while remaining.len() > max_width {
                    let (chunk, rest) = remaining.split_at(max_width);
                    result.push(chunk.to_string());
                    remaining = rest;
                }
                if !remaining.is_empty() {
                    current_line.push_str(remaining);
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
            } else if current_line.len() + 1 + word.len() <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                result.push(current_line.clone());
                current_line.clear();
                current_line.push_str(word);
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}

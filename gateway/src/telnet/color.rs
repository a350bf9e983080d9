//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Inline `&`-markup rendering to ANSI escape sequences
//!
//! World-side content tags text with two-character `&` codes. The table below
//! is a legacy compatibility fixture: lowercase letters select normal
//! foreground colors, uppercase the bright variants, digits select
//! backgrounds, and a handful of letters toggle attributes. Unrecognized
//! codes pass through untouched so garbled upstream markup never breaks a
//! client or smuggles in escape sequences of its own.

/// Markup escape character
pub const MARKUP: char = '&';

/// Look up the escape sequence for a single markup code letter
///
/// Returns `None` for unknown codes; callers emit those literally.
pub fn escape_for(code: char) -> Option<&'static str> {
    match code {
        // Normal foreground
        'k' => Some("\x1b[30m"),
        'r' => Some("\x1b[31m"),
        'g' => Some("\x1b[32m"),
        'y' => Some("\x1b[33m"),
        'b' => Some("\x1b[34m"),
        'm' => Some("\x1b[35m"),
        'c' => Some("\x1b[36m"),
        'w' => Some("\x1b[37m"),

        // Bright foreground (bold form for legacy client compatibility)
        'K' => Some("\x1b[1;30m"),
        'R' => Some("\x1b[1;31m"),
        'G' => Some("\x1b[1;32m"),
        'Y' => Some("\x1b[1;33m"),
        'B' => Some("\x1b[1;34m"),
        'M' => Some("\x1b[1;35m"),
        'C' => Some("\x1b[1;36m"),
        'W' => Some("\x1b[1;37m"),

        // Background
        '0' => Some("\x1b[40m"),
        '1' => Some("\x1b[41m"),
        '2' => Some("\x1b[42m"),
        '3' => Some("\x1b[43m"),
        '4' => Some("\x1b[44m"),
        '5' => Some("\x1b[45m"),
        '6' => Some("\x1b[46m"),
        '7' => Some("\x1b[47m"),

        // Attribute toggles
        'h' => Some("\x1b[1m"),
        'f' => Some("\x1b[5m"),
        'u' => Some("\x1b[4m"),
        'i' => Some("\x1b[7m"),

        // Reset
        'n' => Some("\x1b[0m"),

        _ => None,
    }
}

/// Render `&`-markup text into ANSI escape sequences
///
/// `&&` emits a literal ampersand. A trailing lone `&` is emitted as-is.
pub fn render(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch != MARKUP {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(MARKUP) => out.push(MARKUP),
            Some(code) => match escape_for(code) {
                Some(escape) => out.push_str(escape),
                None => {
                    out.push(MARKUP);
                    out.push(code);
                }
            },
            None => out.push(MARKUP),
        }
    }

    out
}

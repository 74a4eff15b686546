// Copyright (c) 2024-present Ignis Engine Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The line-oriented config file format (`CVars`): `@category` headers and
//! `:name value` declarations.
//!
//! Values are kept as their literal source text rather than parsed eagerly
//! into a typed enum. That's what makes "unknown keys are preserved across
//! save/load" (`SPEC_FULL.md` §6) trivial: a category this build doesn't
//! recognize still round-trips byte-for-byte, because nothing here ever
//! tries to interpret it. Typed access is a thin parse/format layer on top,
//! used only by callers that know what a given key means.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Category {
    name: String,
    entries: Vec<Entry>,
}

/// A parsed config file, preserving category and key order from the source
/// text so re-saving an untouched file reproduces it exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    categories: Vec<Category>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut categories: Vec<Category> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim_end();
            if let Some(name) = trimmed.strip_prefix('@') {
                categories.push(Category {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
            } else if let Some(rest) = trimmed.strip_prefix(':') {
                let mut parts = rest.trim_start().splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or_default().to_string();
                let value = parts.next().unwrap_or_default().trim().to_string();
                match categories.last_mut() {
                    Some(category) => category.entries.push(Entry { name, value }),
                    None => categories.push(Category {
                        name: String::new(),
                        entries: vec![Entry { name, value }],
                    }),
                }
            }
        }
        Self { categories }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for category in &self.categories {
            out.push('@');
            out.push_str(&category.name);
            out.push('\n');
            for entry in &category.entries {
                out.push(':');
                out.push_str(&entry.name);
                out.push(' ');
                out.push_str(&entry.value);
                out.push('\n');
            }
        }
        out
    }

    fn entry(&self, category: &str, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .and_then(|c| c.entries.iter().find(|e| e.name == name))
            .map(|e| e.value.as_str())
    }

    fn entry_mut(&mut self, category: &str, name: &str) -> &mut String {
        let category_idx = match self.categories.iter().position(|c| c.name == category) {
            Some(i) => i,
            None => {
                self.categories.push(Category {
                    name: category.to_string(),
                    entries: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        let entries = &mut self.categories[category_idx].entries;
        let entry_idx = match entries.iter().position(|e| e.name == name) {
            Some(i) => i,
            None => {
                entries.push(Entry {
                    name: name.to_string(),
                    value: String::new(),
                });
                entries.len() - 1
            }
        };
        &mut entries[entry_idx].value
    }

    pub fn get_string(&self, category: &str, name: &str) -> Option<&str> {
        self.entry(category, name)
    }

    pub fn set_string(&mut self, category: &str, name: &str, value: &str) {
        *self.entry_mut(category, name) = value.to_string();
    }

    pub fn get<T: std::str::FromStr>(&self, category: &str, name: &str) -> Option<T> {
        self.entry(category, name).and_then(|v| v.parse().ok())
    }

    pub fn set<T: fmt::Display>(&mut self, category: &str, name: &str, value: T) {
        *self.entry_mut(category, name) = value.to_string();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn save_load_save_is_byte_identical() {
        let text = "@render\n:vsync true\n:max_fps 144\n@audio\n:master_volume 0.75\n";
        let config = Config::parse(text);
        let resaved = config.to_text();
        assert_eq!(resaved, text);

        let reparsed = Config::parse(&resaved);
        assert_eq!(reparsed.to_text(), text);
    }

    #[test]
    fn typed_get_and_set_round_trip() {
        let mut config = Config::new();
        config.set("render", "vsync", true);
        config.set("render", "max_fps", 144u32);
        config.set("render", "gamma", 2.2f32);

        assert_eq!(config.get::<bool>("render", "vsync"), Some(true));
        assert_eq!(config.get::<u32>("render", "max_fps"), Some(144));
        assert_eq!(config.get::<f32>("render", "gamma"), Some(2.2));
    }

    #[test]
    fn unknown_keys_are_preserved_verbatim() {
        let text = "@future\n:some_new_flag 42\n";
        let config = Config::parse(text);
        assert_eq!(config.get_string("future", "some_new_flag"), Some("42"));
        assert_eq!(config.to_text(), text);
    }
}

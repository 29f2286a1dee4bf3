//! X10: the packed multi-value format carried in the `utme` parameter.
//!
//! ```text
//! project id → { k: num → value, v: num → value }
//!
//! 8(Section*Member)9(Sports*yes)11(2!1)
//! ^ project  ^ k-group          ^ "2!" = explicit num, 1 implied
//! ```
//!
//! Entries inside a group are joined by `*`. An entry's number is written
//! (`num!`) only when it is not the minimum and does not follow the previous
//! one. A type letter is written only when the type before it is missing.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

const DELIM_BEGIN: char = '(';
const DELIM_END: char = ')';
const DELIM_SET: &str = "*";
const DELIM_NUM_VALUE: char = '!';
const ESCAPE_CHAR: char = '\'';
const MINIMUM: u32 = 1;

/// Num slots used inside the event project.
pub const OBJECT_KEY_NUM: u32 = 1;
pub const TYPE_KEY_NUM: u32 = 2;
pub const LABEL_KEY_NUM: u32 = 3;
pub const VALUE_VALUE_NUM: u32 = 1;

/// Which group of a project a cell lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Key,
    Value,
}

impl DataType {
    /// Rendering order.
    const SET: [DataType; 2] = [DataType::Key, DataType::Value];

    fn letter(self) -> char {
        match self {
            DataType::Key => 'k',
            DataType::Value => 'v',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'k' => Some(DataType::Key),
            'v' => Some(DataType::Value),
            _ => None,
        }
    }

    fn position(self) -> usize {
        match self {
            DataType::Key => 0,
            DataType::Value => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Project {
    key: Option<BTreeMap<u32, String>>,
    value: Option<BTreeMap<u32, String>>,
}

impl Project {
    fn slot(&self, ty: DataType) -> Option<&BTreeMap<u32, String>> {
        match ty {
            DataType::Key => self.key.as_ref(),
            DataType::Value => self.value.as_ref(),
        }
    }

    fn slot_mut(&mut self, ty: DataType) -> &mut Option<BTreeMap<u32, String>> {
        match ty {
            DataType::Key => &mut self.key,
            DataType::Value => &mut self.value,
        }
    }

    fn is_empty(&self) -> bool {
        self.key.is_none() && self.value.is_none()
    }
}

/// One X10 table. Built per beacon, rendered once, then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct X10 {
    projects: BTreeMap<u32, Project>,
}

impl X10 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, project_id: u32, num: u32, value: impl Into<String>) {
        self.set_internal(project_id, DataType::Key, num, value.into());
    }

    pub fn get_key(&self, project_id: u32, num: u32) -> Option<&str> {
        self.get_internal(project_id, DataType::Key, num)
    }

    pub fn clear_key(&mut self, project_id: u32) {
        self.clear_internal(project_id, DataType::Key);
    }

    pub fn set_value(&mut self, project_id: u32, num: u32, value: impl Into<String>) {
        self.set_internal(project_id, DataType::Value, num, value.into());
    }

    pub fn get_value(&self, project_id: u32, num: u32) -> Option<&str> {
        self.get_internal(project_id, DataType::Value, num)
    }

    pub fn clear_value(&mut self, project_id: u32) {
        self.clear_internal(project_id, DataType::Value);
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn has_project(&self, project_id: u32) -> bool {
        self.projects.contains_key(&project_id)
    }

    fn set_internal(&mut self, project_id: u32, ty: DataType, num: u32, value: String) {
        self.projects
            .entry(project_id)
            .or_default()
            .slot_mut(ty)
            .get_or_insert_with(BTreeMap::new)
            .insert(num, value);
    }

    fn get_internal(&self, project_id: u32, ty: DataType, num: u32) -> Option<&str> {
        self.projects
            .get(&project_id)
            .and_then(|p| p.slot(ty))
            .and_then(|data| data.get(&num))
            .map(String::as_str)
    }

    fn clear_internal(&mut self, project_id: u32, ty: DataType) {
        if let Some(project) = self.projects.get_mut(&project_id) {
            *project.slot_mut(ty) = None;
            if project.is_empty() {
                self.projects.remove(&project_id);
            }
        }
    }

    /// Render the whole table; empty tables render to `""`.
    pub fn render_url_string(&self) -> String {
        let mut result = String::new();
        for (project_id, project) in &self.projects {
            result.push_str(&project_id.to_string());
            result.push_str(&render_project(project));
        }
        result
    }

    /// Decode a rendered token back into a table.
    pub fn parse(token: &str) -> Result<X10> {
        let mut x10 = X10::new();
        let chars: Vec<char> = token.chars().collect();
        let mut pos = 0;

        while pos < chars.len() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if start == pos {
                return Err(malformed(token, "expected project id"));
            }
            let project_id: u32 = chars[start..pos]
                .iter()
                .collect::<String>()
                .parse()
                .map_err(|_| malformed(token, "project id out of range"))?;

            let mut expected = 0usize;
            while pos < chars.len() && !chars[pos].is_ascii_digit() {
                let ty = match DataType::from_letter(chars[pos]) {
                    Some(ty) => {
                        pos += 1;
                        ty
                    }
                    None => *DataType::SET
                        .get(expected)
                        .ok_or_else(|| malformed(token, "too many groups"))?,
                };
                if chars.get(pos) != Some(&DELIM_BEGIN) {
                    return Err(malformed(token, "expected '('"));
                }
                pos += 1;

                let body_start = pos;
                while pos < chars.len() && chars[pos] != DELIM_END {
                    pos += 1;
                }
                if pos == chars.len() {
                    return Err(malformed(token, "unterminated group"));
                }
                let body: String = chars[body_start..pos].iter().collect();
                pos += 1;

                parse_data_type(&mut x10, project_id, ty, &body, token)?;
                expected = ty.position() + 1;
            }
        }

        Ok(x10)
    }
}

fn render_project(project: &Project) -> String {
    let mut result = String::new();
    let mut need_type_qualifier = false;

    for ty in DataType::SET {
        match project.slot(ty) {
            Some(data) => {
                if need_type_qualifier {
                    result.push(ty.letter());
                }
                result.push_str(&render_data_type(data));
                need_type_qualifier = false;
            }
            None => need_type_qualifier = true,
        }
    }

    result
}

fn render_data_type(data: &BTreeMap<u32, String>) -> String {
    let mut entries = Vec::with_capacity(data.len());
    let mut last_num: u32 = 0;

    for (&num, value) in data {
        let mut entry = String::new();
        if num != MINIMUM && last_num.checked_add(1) != Some(num) {
            entry.push_str(&num.to_string());
            entry.push(DELIM_NUM_VALUE);
        }
        entry.push_str(&escape_extensible_value(value));
        entries.push(entry);
        last_num = num;
    }

    let mut out = String::new();
    out.push(DELIM_BEGIN);
    out.push_str(&entries.join(DELIM_SET));
    out.push(DELIM_END);
    out
}

fn escape_extensible_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => out.push_str("'0"),
            ')' => out.push_str("'1"),
            '*' => out.push_str("'2"),
            '!' => out.push_str("'3"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_extensible_value(value: &str, token: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE_CHAR {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\''),
            Some('1') => out.push(')'),
            Some('2') => out.push('*'),
            Some('3') => out.push('!'),
            _ => return Err(malformed(token, "bad escape sequence")),
        }
    }
    Ok(out)
}

fn parse_data_type(x10: &mut X10, project_id: u32, ty: DataType, body: &str, token: &str) -> Result<()> {
    let mut last_num: u32 = 0;
    for entry in body.split(DELIM_SET) {
        let (num, raw) = match entry.split_once(DELIM_NUM_VALUE) {
            Some((num, raw)) => {
                let num = num
                    .parse::<u32>()
                    .map_err(|_| malformed(token, "bad entry number"))?;
                (num, raw)
            }
            None => (
                last_num
                    .checked_add(1)
                    .ok_or_else(|| malformed(token, "entry number out of range"))?,
                entry,
            ),
        };
        let value = unescape_extensible_value(raw, token)?;
        x10.set_internal(project_id, ty, num, value);
        last_num = num;
    }
    Ok(())
}

fn malformed(token: &str, reason: &str) -> Error {
    Error::validation(format!("malformed X10 token {:?}: {}", token, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_renders_empty() {
        assert_eq!(X10::new().render_url_string(), "");
    }

    #[test]
    fn test_consecutive_nums_are_implied() {
        let mut x10 = X10::new();
        x10.set_key(8, 1, "Section");
        x10.set_key(8, 2, "Member");
        assert_eq!(x10.render_url_string(), "8(Section*Member)");
    }

    #[test]
    fn test_gap_writes_num() {
        let mut x10 = X10::new();
        x10.set_key(8, 1, "a");
        x10.set_key(8, 3, "b");
        x10.set_key(8, 4, "c");
        assert_eq!(x10.render_url_string(), "8(a*3!b*c)");

        let mut x10 = X10::new();
        x10.set_key(11, 2, "1");
        assert_eq!(x10.render_url_string(), "11(2!1)");
    }

    #[test]
    fn test_type_qualifier() {
        let mut x10 = X10::new();
        x10.set_key(5, OBJECT_KEY_NUM, "Videos");
        x10.set_key(5, TYPE_KEY_NUM, "Play");
        x10.set_value(5, VALUE_VALUE_NUM, "10");
        assert_eq!(x10.render_url_string(), "5(Videos*Play)(10)");

        let mut x10 = X10::new();
        x10.set_value(5, VALUE_VALUE_NUM, "10");
        assert_eq!(x10.render_url_string(), "5v(10)");
    }

    #[test]
    fn test_projects_ascending() {
        let mut x10 = X10::new();
        x10.set_key(11, 1, "2");
        x10.set_key(8, 1, "n");
        x10.set_key(9, 1, "v");
        assert_eq!(x10.render_url_string(), "8(n)9(v)11(2)");
    }

    #[test]
    fn test_escapes() {
        let mut x10 = X10::new();
        x10.set_key(5, 1, "it's (x)*!");
        assert_eq!(x10.render_url_string(), "5(it'0s (x'1'2'3)");
    }

    #[test]
    fn test_later_write_wins() {
        let mut x10 = X10::new();
        x10.set_key(8, 1, "old");
        x10.set_key(8, 1, "new");
        assert_eq!(x10.get_key(8, 1), Some("new"));
        assert_eq!(x10.render_url_string(), "8(new)");
    }

    #[test]
    fn test_clear_key() {
        let mut x10 = X10::new();
        x10.set_key(8, 1, "a");
        x10.set_key(9, 1, "b");
        x10.clear_key(8);
        assert!(!x10.has_project(8));
        assert_eq!(x10.render_url_string(), "9(b)");

        // Clearing an unknown project is a no-op
        x10.clear_key(42);
        x10.clear_value(9);
        assert_eq!(x10.render_url_string(), "9(b)");
    }

    #[test]
    fn test_parse_three_custom_variables() {
        let mut x10 = X10::new();
        x10.set_key(8, 1, "Section");
        x10.set_key(8, 2, "Member");
        x10.set_key(8, 4, "Plan");
        x10.set_key(9, 1, "Sports");
        x10.set_key(9, 2, "yes");
        x10.set_key(9, 4, "pro (annual)");
        x10.set_key(11, 2, "1");
        x10.set_key(11, 4, "2");

        let token = x10.render_url_string();
        assert_eq!(
            token,
            "8(Section*Member*4!Plan)9(Sports*yes*4!pro (annual'1)11(2!1*4!2)"
        );

        let parsed = X10::parse(&token).unwrap();
        assert_eq!(parsed, x10);
        assert_eq!(parsed.get_key(9, 4), Some("pro (annual)"));
        assert_eq!(parsed.get_key(11, 1), None);
    }

    #[test]
    fn test_parse_value_groups() {
        let parsed = X10::parse("5(Videos*Play)(10)").unwrap();
        assert_eq!(parsed.get_key(5, TYPE_KEY_NUM), Some("Play"));
        assert_eq!(parsed.get_value(5, VALUE_VALUE_NUM), Some("10"));

        let parsed = X10::parse("5v(10)").unwrap();
        assert_eq!(parsed.get_key(5, 1), None);
        assert_eq!(parsed.get_value(5, 1), Some("10"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(X10::parse("(abc)").is_err());
        assert!(X10::parse("8(abc").is_err());
        assert!(X10::parse("8(a'9)").is_err());
    }

    #[test]
    fn test_parse_rejects_num_overflow() {
        let err = X10::parse("8(4294967295!a*b)").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let parsed = X10::parse("8(4294967295!a)").unwrap();
        assert_eq!(parsed.get_key(8, u32::MAX), Some("a"));
    }
}

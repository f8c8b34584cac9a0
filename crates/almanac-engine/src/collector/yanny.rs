//! Reader for yanny parameter files (`.par`)
//!
//! A file holds `key value` pairs, `typedef struct { ... } NAME;`
//! declarations and data lines `NAME v1 v2 {a b} "text"`, one row per line.
//! Array values are kept as their raw brace contents.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YannyTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl YannyTable {
    /// Column index, ignoring case
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YannyFile {
    pub pairs: BTreeMap<String, String>,
    pub tables: Vec<YannyTable>,
}

impl YannyFile {
    pub fn table(&self, name: &str) -> Option<&YannyTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split a data line into values; quotes and braces group
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => value.push(ch),
                        None => return Err(format!("unterminated string in '{}'", line)),
                    }
                }
                value
            }
            '{' => {
                chars.next();
                let mut value = String::new();
                let mut depth = 1;
                loop {
                    match chars.next() {
                        Some('{') => {
                            depth += 1;
                            value.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            value.push('}');
                        }
                        Some(ch) => value.push(ch),
                        None => return Err(format!("unterminated array in '{}'", line)),
                    }
                }
                value.trim().to_string()
            }
            _ => {
                let mut value = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() {
                        break;
                    }
                    value.push(ch);
                    chars.next();
                }
                value
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Member names of a struct body such as `int fiberId; char holeType[8];`
fn member_names(body: &str) -> Vec<String> {
    body.split(';')
        .filter_map(|member| {
            let last = member.split_whitespace().last()?;
            let name = last.split('[').next().unwrap_or(last);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

enum State {
    Top,
    Struct(String),
    Enum,
}

/// Parse a whole parameter file
///
/// # Errors
///
/// Unterminated strings, arrays or declarations.
pub fn parse(text: &str) -> Result<YannyFile, String> {
    let mut file = YannyFile::default();
    let mut state = State::Top;

    // continuation lines end with a backslash
    let joined = text.replace("\\\n", " ");

    for (lineno, raw) in joined.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        state = match state {
            State::Struct(mut body) => match line.find('}') {
                Some(close) => {
                    body.push_str(&line[..close]);
                    let name = line[close + 1..].trim().trim_end_matches(';').trim();
                    if name.is_empty() {
                        return Err(format!("line {}: struct without a name", lineno + 1));
                    }
                    file.tables.push(YannyTable {
                        name: name.to_string(),
                        columns: member_names(&body),
                        rows: Vec::new(),
                    });
                    State::Top
                }
                None => {
                    body.push_str(line);
                    body.push(' ');
                    State::Struct(body)
                }
            },
            State::Enum => {
                if line.contains('}') {
                    State::Top
                } else {
                    State::Enum
                }
            }
            State::Top if line.starts_with("typedef") => {
                let after_brace = line.split_once('{').map(|(_, rest)| rest).unwrap_or("");
                if line.contains("enum") {
                    if after_brace.contains('}') {
                        State::Top
                    } else {
                        State::Enum
                    }
                } else if line.contains("struct") {
                    // a one-line declaration is handled like the multi-line form
                    let mut body = String::new();
                    match after_brace.find('}') {
                        Some(close) => {
                            body.push_str(&after_brace[..close]);
                            let name = after_brace[close + 1..].trim().trim_end_matches(';').trim();
                            file.tables.push(YannyTable {
                                name: name.to_string(),
                                columns: member_names(&body),
                                rows: Vec::new(),
                            });
                            State::Top
                        }
                        None => {
                            body.push_str(after_brace);
                            body.push(' ');
                            State::Struct(body)
                        }
                    }
                } else {
                    State::Top
                }
            }
            State::Top => {
                let tokens = tokenize(line).map_err(|e| format!("line {}: {}", lineno + 1, e))?;
                if let Some((head, values)) = tokens.split_first() {
                    match file
                        .tables
                        .iter_mut()
                        .find(|t| t.name.eq_ignore_ascii_case(head))
                    {
                        Some(table) => {
                            if values.len() != table.columns.len() {
                                return Err(format!(
                                    "line {}: {} values for {} columns of {}",
                                    lineno + 1,
                                    values.len(),
                                    table.columns.len(),
                                    table.name
                                ));
                            }
                            table.rows.push(values.to_vec());
                        }
                        None => {
                            file.pairs.insert(head.clone(), values.join(" "));
                        }
                    }
                }
                State::Top
            }
        };
    }

    match state {
        State::Top => Ok(file),
        _ => Err("unterminated typedef at end of file".to_string()),
    }
}

//! Free-format MPS reader.
//!
//! Sections:
//! - NAME: problem name
//! - OBJSENSE: MIN or MAX, on the header line or the next one
//! - ROWS: N (objective), E, L, G rows
//! - COLUMNS: coefficients, with 'MARKER' 'INTORG'/'INTEND' integer blocks
//! - RHS: right-hand sides; a value on the objective row is the negated constant
//! - RANGES: two-sided rows
//! - BOUNDS: UP LO FX FR MI PL BV LI UI
//! - ENDATA: end marker
//!
//! Files ending in `.gz` are decompressed on the fly.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use solver_core::{Number, Relation};

use crate::error::{MipError, MipResult};
use crate::model::{ColumnSpec, LinearModel};

/// Largest accepted rows × columns product; the model is stored densely.
const MAX_DENSE_ENTRIES: usize = 100_000;

/// Bound magnitudes at or above this are read as infinite.
const MPS_INFINITY: f64 = 1e30;

/// A model read from an MPS file.
#[derive(Debug, Clone)]
pub struct MpsModel {
    pub name: String,
    /// Objective, rows and columns; `model.maximize` mirrors `maximize`.
    pub model: LinearModel,
    pub maximize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    Name,
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
}

/// Read an MPS file, gzip-compressed if the name ends in `.gz`.
pub fn read_mps<P: AsRef<Path>>(path: P) -> MipResult<MpsModel> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let gzipped = path.extension().map_or(false, |ext| ext == "gz");
    if gzipped {
        parse_mps(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_mps(BufReader::new(file))
    }
}

/// Parse MPS text from `reader`.
pub fn parse_mps<R: BufRead>(reader: R) -> MipResult<MpsModel> {
    let mut parser = Parser::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        parser.line = idx + 1;
        if !parser.feed(&line)? {
            break;
        }
    }
    parser.finish()
}

#[derive(Debug)]
struct Parser {
    line: usize,
    section: Section,
    name: String,
    maximize: bool,
    objective_row: Option<String>,
    rows: Vec<(String, Relation)>,
    row_index: HashMap<String, usize>,
    columns: Vec<ColumnSpec>,
    col_index: HashMap<String, usize>,
    entries: Vec<(usize, usize, Number)>,
    objective: HashMap<usize, Number>,
    constant: Number,
    rhs: HashMap<usize, Number>,
    ranges: HashMap<usize, Number>,
    integer_block: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            line: 0,
            section: Section::Start,
            name: String::new(),
            maximize: false,
            objective_row: None,
            rows: Vec::new(),
            row_index: HashMap::new(),
            columns: Vec::new(),
            col_index: HashMap::new(),
            entries: Vec::new(),
            objective: HashMap::new(),
            constant: Number::from(0),
            rhs: HashMap::new(),
            ranges: HashMap::new(),
            integer_block: false,
        }
    }
}

impl Parser {
    fn error<T>(&self, message: impl Into<String>) -> MipResult<T> {
        Err(MipError::Parse {
            line: self.line,
            message: message.into(),
        })
    }

    /// Consume one line. Returns false at ENDATA.
    fn feed(&mut self, raw: &str) -> MipResult<bool> {
        let line = raw.trim_end();
        if line.trim().is_empty() || line.starts_with('*') {
            return Ok(true);
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        // Section headers start in the first column.
        if !raw.starts_with(char::is_whitespace) {
            match tokens[0] {
                "NAME" => {
                    self.name = tokens.get(1).unwrap_or(&"unnamed").to_string();
                    self.section = Section::Name;
                }
                "OBJSENSE" => {
                    self.section = Section::ObjSense;
                    if let Some(sense) = tokens.get(1) {
                        self.set_sense(sense)?;
                    }
                }
                "ROWS" => self.section = Section::Rows,
                "COLUMNS" => self.section = Section::Columns,
                "RHS" => self.section = Section::Rhs,
                "RANGES" => self.section = Section::Ranges,
                "BOUNDS" => self.section = Section::Bounds,
                "ENDATA" => return Ok(false),
                other => return self.error(format!("unknown section {}", other)),
            }
            return Ok(true);
        }

        match self.section {
            Section::ObjSense => self.set_sense(tokens[0])?,
            Section::Rows => self.row(&tokens)?,
            Section::Columns => self.column(&tokens)?,
            Section::Rhs => {
                for (row, value) in self.pairs(&tokens)? {
                    match row {
                        Some(i) => {
                            self.rhs.insert(i, value);
                        }
                        None => self.constant = value.negated(),
                    }
                }
            }
            Section::Ranges => {
                for (row, value) in self.pairs(&tokens)? {
                    match row {
                        Some(i) => {
                            self.ranges.insert(i, value);
                        }
                        None => return self.error("range on the objective row"),
                    }
                }
            }
            Section::Bounds => self.bound(&tokens)?,
            Section::Start | Section::Name => {
                return self.error("data line outside of a section");
            }
        }
        Ok(true)
    }

    fn set_sense(&mut self, sense: &str) -> MipResult<()> {
        match sense {
            "MAX" | "MAXIMIZE" => self.maximize = true,
            "MIN" | "MINIMIZE" => self.maximize = false,
            other => return self.error(format!("unknown objective sense {}", other)),
        }
        Ok(())
    }

    fn row(&mut self, tokens: &[&str]) -> MipResult<()> {
        let [kind, name] = tokens else {
            return self.error("expected row type and name");
        };
        let relation = match *kind {
            "N" => {
                if self.objective_row.is_none() {
                    self.objective_row = Some(name.to_string());
                } else {
                    log::warn!("line {}: dropping free row {}", self.line, name);
                }
                return Ok(());
            }
            "E" => Relation::Eq,
            "L" => Relation::Le,
            "G" => Relation::Ge,
            other => return self.error(format!("unknown row type {}", other)),
        };
        let idx = self.rows.len();
        if self.row_index.insert(name.to_string(), idx).is_some() {
            return self.error(format!("duplicate row {}", name));
        }
        self.rows.push((name.to_string(), relation));
        Ok(())
    }

    fn column(&mut self, tokens: &[&str]) -> MipResult<()> {
        if tokens.get(1) == Some(&"'MARKER'") {
            match tokens.get(2).copied() {
                Some("'INTORG'") => self.integer_block = true,
                Some("'INTEND'") => self.integer_block = false,
                other => {
                    return self.error(format!("unknown marker {}", other.unwrap_or("")));
                }
            }
            return Ok(());
        }
        if tokens.len() < 3 || tokens.len() % 2 == 0 {
            return self.error("expected a column name and row/value pairs");
        }

        let name = tokens[0];
        let j = match self.col_index.get(name) {
            Some(&j) => j,
            None => {
                let j = self.columns.len();
                self.col_index.insert(name.to_string(), j);
                self.columns.push(ColumnSpec {
                    integral: self.integer_block,
                    ..ColumnSpec::default()
                });
                j
            }
        };
        for pair in tokens[1..].chunks(2) {
            let value = self.number(pair[1])?;
            match self.lookup_row(pair[0])? {
                Some(i) => self.entries.push((i, j, value)),
                None => {
                    let total = match self.objective.remove(&j) {
                        Some(previous) => add(&previous, &value),
                        None => value,
                    };
                    self.objective.insert(j, total);
                }
            }
        }
        Ok(())
    }

    /// Row/value pairs after an optional set name. `None` rows are the objective.
    fn pairs(&self, tokens: &[&str]) -> MipResult<Vec<(Option<usize>, Number)>> {
        let data = if tokens.len() % 2 == 1 {
            &tokens[1..]
        } else {
            tokens
        };
        if data.is_empty() {
            return self.error("expected row/value pairs");
        }
        data.chunks(2)
            .map(|pair| Ok((self.lookup_row(pair[0])?, self.number(pair[1])?)))
            .collect()
    }

    fn bound(&mut self, tokens: &[&str]) -> MipResult<()> {
        let kind = tokens[0];
        let valued = matches!(kind, "UP" | "LO" | "FX" | "LI" | "UI");
        let (col, value) = match (valued, tokens.len()) {
            (true, 4) => (tokens[2], Some(tokens[3])),
            (true, 3) => (tokens[1], Some(tokens[2])),
            (false, 3) | (false, 4) => (tokens[2], None),
            (false, 2) => (tokens[1], None),
            _ => return self.error(format!("malformed {} bound", kind)),
        };
        let Some(&j) = self.col_index.get(col) else {
            return self.error(format!("bound on unknown column {}", col));
        };
        let value = value.map(|v| self.number(v)).transpose()?;
        let value = value.filter(|v| v.to_f64().abs() < MPS_INFINITY);
        let line = self.line;
        let spec = &mut self.columns[j];
        match kind {
            "UP" | "UI" => {
                if let Some(u) = &value {
                    if u.to_f64() < 0.0 && spec.lower.as_ref().map_or(false, Number::is_zero) {
                        log::warn!("line {}: negative upper bound on {} frees its lower bound", line, col);
                        spec.lower = None;
                    }
                }
                spec.upper = value;
            }
            "LO" | "LI" => spec.lower = value,
            "FX" => {
                spec.lower = value.clone();
                spec.upper = value;
            }
            "FR" => {
                spec.lower = None;
                spec.upper = None;
            }
            "MI" => spec.lower = None,
            "PL" => spec.upper = None,
            "BV" => {
                spec.lower = Some(Number::from(0));
                spec.upper = Some(Number::from(1));
                spec.integral = true;
            }
            other => return self.error(format!("unknown bound type {}", other)),
        }
        if matches!(kind, "LI" | "UI") {
            spec.integral = true;
        }
        Ok(())
    }

    fn lookup_row(&self, name: &str) -> MipResult<Option<usize>> {
        if self.objective_row.as_deref() == Some(name) {
            return Ok(None);
        }
        match self.row_index.get(name) {
            Some(&i) => Ok(Some(i)),
            None => self.error(format!("unknown row {}", name)),
        }
    }

    /// Integer literals stay exact; anything else is a float.
    fn number(&self, token: &str) -> MipResult<Number> {
        if let Ok(v) = token.parse::<i64>() {
            return Ok(Number::from(v));
        }
        match token.parse::<f64>() {
            Ok(v) if !v.is_nan() => Ok(Number::Float(v)),
            _ => self.error(format!("invalid number {}", token)),
        }
    }

    fn finish(self) -> MipResult<MpsModel> {
        let m = self.rows.len();
        let n = self.columns.len();
        if m.saturating_mul(n) > MAX_DENSE_ENTRIES {
            return Err(MipError::InvalidProblem(format!(
                "{} rows x {} columns is too large for the dense model",
                m, n
            )));
        }

        let mut objective = vec![Number::from(0); n];
        for (j, c) in self.objective {
            objective[j] = c;
        }
        let mut dense = vec![vec![Number::from(0); n]; m];
        for (i, j, value) in self.entries {
            dense[i][j] = add(&dense[i][j], &value);
        }

        let mut model = LinearModel {
            objective,
            objective_constant: self.constant,
            rows: Vec::with_capacity(m),
            columns: self.columns,
            maximize: self.maximize,
        };
        for (i, (coefs, (_, relation))) in dense.into_iter().zip(self.rows).enumerate() {
            let rhs = self.rhs.get(&i).cloned().unwrap_or_default();
            match self.ranges.get(&i) {
                None => model.add_row(coefs, relation, rhs),
                Some(r) => {
                    let (lo, hi) = range_limits(relation, &rhs, r);
                    if lo == hi {
                        model.add_row(coefs, Relation::Eq, lo);
                    } else {
                        model.add_row(coefs.clone(), Relation::Ge, lo);
                        model.add_row(coefs, Relation::Le, hi);
                    }
                }
            }
        }

        Ok(MpsModel {
            name: self.name,
            model,
            maximize: self.maximize,
        })
    }
}

/// Lower and upper activity limits of a ranged row.
fn range_limits(relation: Relation, rhs: &Number, range: &Number) -> (Number, Number) {
    let width = abs(range);
    match relation {
        Relation::Le => (add(rhs, &width.negated()), rhs.clone()),
        Relation::Ge => (rhs.clone(), add(rhs, &width)),
        Relation::Eq if range.to_f64() < 0.0 => (add(rhs, range), rhs.clone()),
        Relation::Eq => (rhs.clone(), add(rhs, range)),
    }
}

fn add(a: &Number, b: &Number) -> Number {
    match (a, b) {
        (Number::Exact(x), Number::Exact(y)) => Number::Exact(x + y),
        _ => Number::Float(a.to_f64() + b.to_f64()),
    }
}

fn abs(a: &Number) -> Number {
    if a.to_f64() < 0.0 {
        a.negated()
    } else {
        a.clone()
    }
}

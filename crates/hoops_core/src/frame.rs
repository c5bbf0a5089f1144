use crate::Value;

/// Flat tabular batch: ordered column names and rows of [`Value`]s.
///
/// Rows always have exactly `columns.len()` cells. Entities reference each
/// other only through key columns, never through pointers into another frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Mutable row access; row width stays fixed.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [Value]> + '_ {
        self.rows.iter_mut().map(Vec::as_mut_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends a row, padding with `Null` or truncating to the frame width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Adds the column (or replaces it in place) with one value per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                let mut values = values.into_iter();
                for row in &mut self.rows {
                    row.push(values.next().unwrap_or_default());
                }
            }
        }
    }

    /// Sets the same value on every row.
    pub fn fill_column(&mut self, name: &str, value: Value) {
        let values = vec![value; self.rows.len()];
        self.set_column(name, values);
    }

    /// Renames columns present in `pass`; absent source names are ignored.
    pub fn rename(&mut self, pass: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = pass.iter().find(|(from, _)| *from == column.as_str()) {
                *column = (*to).to_string();
            }
        }
    }

    /// Projects onto `names` in that order; missing columns are filled with `Null`.
    pub fn select(&self, names: &[&str]) -> Frame {
        let indexes: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indexes
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Frame {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String], &[Value]) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|row| keep(columns, row));
    }

    /// Appends `other` below `self`, aligning cells by column name.
    ///
    /// Columns only present in `other` are appended to the right and
    /// back-filled with `Null` for earlier rows.
    pub fn concat(&mut self, other: Frame) {
        for name in &other.columns {
            if !self.has_column(name) {
                self.columns.push(name.clone());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
            }
        }
        let mapping: Vec<usize> = self
            .columns
            .iter()
            .map(|name| other.column_index(name).unwrap_or(usize::MAX))
            .collect();
        for mut row in other.rows {
            let aligned = mapping
                .iter()
                .map(|&idx| {
                    if idx == usize::MAX {
                        Value::Null
                    } else {
                        std::mem::take(&mut row[idx])
                    }
                })
                .collect();
            self.rows.push(aligned);
        }
    }

    /// Splits into consecutive frames of at most `size` rows.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = Frame> + '_ {
        self.rows.chunks(size.max(1)).map(|rows| Frame {
            columns: self.columns.clone(),
            rows: rows.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use crate::Value;

    #[test]
    fn concat_aligns_by_name() {
        let mut a = Frame::new(["x", "y"]);
        a.push_row(vec![Value::Int(1), Value::Int(2)]);
        let mut b = Frame::new(["y", "z"]);
        b.push_row(vec![Value::Int(3), Value::Int(4)]);

        a.concat(b);

        assert_eq!(a.columns(), &["x", "y", "z"]);
        assert_eq!(a.rows()[0], vec![Value::Int(1), Value::Int(2), Value::Null]);
        assert_eq!(a.rows()[1], vec![Value::Null, Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn chunks_cover_all_rows() {
        let mut frame = Frame::new(["n"]);
        for i in 0..5 {
            frame.push_row(vec![Value::Int(i)]);
        }
        let sizes: Vec<usize> = frame.chunks(2).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn rename_ignores_absent_columns() {
        let mut frame = Frame::new(["Team", "PTS"]);
        frame.rename(&[("Team", "Home"), ("Opp", "Visitors")]);
        assert_eq!(frame.columns(), &["Home", "PTS"]);
    }
}

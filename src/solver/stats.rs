//! Model build statistics.
//!
//! Each constraint module's contribution to the assembled MIP (variables,
//! constraints, constraint terms, objective terms) is tallied in an
//! explicit accumulator keyed by module name and reported as an aligned
//! text table before solving.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Per-module contribution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleCounts {
    pub variables: usize,
    pub constraints: usize,
    pub constraint_terms: usize,
    pub objective_terms: usize,
}

/// Accumulated build statistics for one model assembly.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    assignment_variables: usize,
    per_module: BTreeMap<String, ModuleCounts>,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_assignment_variables(&mut self, count: usize) {
        self.assignment_variables = count;
    }

    /// Number of session-assignment variables allocated up front.
    pub fn assignment_variables(&self) -> usize {
        self.assignment_variables
    }

    /// Counters for one module, created zeroed on first access.
    pub fn module(&mut self, name: &str) -> &mut ModuleCounts {
        self.per_module.entry(name.to_string()).or_default()
    }

    /// Read-only counters for one module.
    pub fn module_counts(&self, name: &str) -> ModuleCounts {
        self.per_module.get(name).copied().unwrap_or_default()
    }

    /// Totals over the assignment variables and every module.
    pub fn totals(&self) -> ModuleCounts {
        let mut totals = ModuleCounts {
            variables: self.assignment_variables,
            ..ModuleCounts::default()
        };
        for counts in self.per_module.values() {
            totals.variables += counts.variables;
            totals.constraints += counts.constraints;
            totals.constraint_terms += counts.constraint_terms;
            totals.objective_terms += counts.objective_terms;
        }
        totals
    }

    /// Renders the statistics table. `title` heads the first column,
    /// typically the model name and session count.
    pub fn render_table(&self, title: &str) -> String {
        let mut table = TextTable::new(5);
        table.row([
            title.to_string(),
            "Variables".into(),
            "Constraints".into(),
            "Constraint terms".into(),
            "Objective terms".into(),
        ]);
        table.delimiter();
        table.row([
            "<Session assignment>".into(),
            self.assignment_variables.to_string(),
            "0".into(),
            "0".into(),
            "0".into(),
        ]);
        for (name, counts) in &self.per_module {
            table.row([
                name.clone(),
                counts.variables.to_string(),
                counts.constraints.to_string(),
                counts.constraint_terms.to_string(),
                counts.objective_terms.to_string(),
            ]);
        }
        table.delimiter();
        let totals = self.totals();
        table.row([
            "Total".into(),
            totals.variables.to_string(),
            totals.constraints.to_string(),
            totals.constraint_terms.to_string(),
            totals.objective_terms.to_string(),
        ]);
        table.render()
    }
}

/// Minimal aligned text table: first column left-aligned, the rest right-
/// aligned, with optional horizontal delimiters.
pub(crate) struct TextTable {
    columns: usize,
    rows: Vec<Option<Vec<String>>>, // None marks a delimiter
}

impl TextTable {
    pub(crate) fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn row(&mut self, cells: impl IntoIterator<Item = String>) {
        let mut row: Vec<String> = cells.into_iter().collect();
        row.resize(self.columns, String::new());
        self.rows.push(Some(row));
    }

    pub(crate) fn delimiter(&mut self) {
        self.rows.push(None);
    }

    pub(crate) fn render(&self) -> String {
        let mut widths = vec![0usize; self.columns];
        for row in self.rows.iter().flatten() {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let total_width: usize = widths.iter().sum::<usize>() + 3 * self.columns + 1;
        let mut out = String::new();
        for row in &self.rows {
            match row {
                Some(cells) => {
                    out.push('|');
                    for (i, cell) in cells.iter().enumerate() {
                        if i == 0 {
                            let _ = write!(out, " {cell:<width$} |", width = widths[i]);
                        } else {
                            let _ = write!(out, " {cell:>width$} |", width = widths[i]);
                        }
                    }
                    out.push('\n');
                }
                None => {
                    out.push_str(&"-".repeat(total_width));
                    out.push('\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_counters_accumulate() {
        let mut stats = BuildStats::new();
        stats.set_assignment_variables(10);
        stats.module("PersonConflicts").variables += 4;
        stats.module("PersonConflicts").constraints += 2;
        stats.module("SessionsScheduled").constraints += 3;

        assert_eq!(stats.module_counts("PersonConflicts").variables, 4);
        assert_eq!(stats.module_counts("SessionsScheduled").constraints, 3);
        assert_eq!(stats.module_counts("Unknown"), ModuleCounts::default());

        let totals = stats.totals();
        assert_eq!(totals.variables, 14);
        assert_eq!(totals.constraints, 5);
    }

    #[test]
    fn test_render_table_lists_modules_sorted() {
        let mut stats = BuildStats::new();
        stats.set_assignment_variables(6);
        stats.module("TimeWhitelist").constraints += 1;
        stats.module("NoRoomConflicts").constraints += 2;

        let table = stats.render_table("Week 1 (3 sessions)");
        let no_room = table.find("NoRoomConflicts").unwrap();
        let whitelist = table.find("TimeWhitelist").unwrap();
        assert!(no_room < whitelist); // sorted by module name
        assert!(table.contains("<Session assignment>"));
        assert!(table.contains("Total"));
    }

    #[test]
    fn test_text_table_aligns_columns() {
        let mut table = TextTable::new(2);
        table.row(["a".into(), "1".into()]);
        table.delimiter();
        table.row(["longer".into(), "100".into()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), lines[2].len());
        assert!(lines[2].contains("| longer |"));
        assert!(lines[0].contains("|   1 |"));
    }
}

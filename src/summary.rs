use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::DataFrame;
use std::path::PathBuf;

use incident_analysis::reports::ReportOutput;
use incident_analysis::stats::{FitStatistics, ModelFit, SummaryStats};

/// Significance level at which p-values are highlighted.
const ALPHA: f64 = 0.05;

pub fn print_report(report: &ReportOutput, preview: usize, exported: &[PathBuf]) {
    println!();
    println!("Report: {}", report.name);
    if preview > 0 {
        for named in &report.tables {
            println!(
                "{} ({} rows x {} columns)",
                named.name,
                named.table.height(),
                named.table.width()
            );
            println!("{}", preview_table(&named.table, preview));
        }
    }
    if !report.summaries.is_empty() {
        println!("{}", summary_table(&report.summaries));
    }
    print_fit(&report.fit);
    if !exported.is_empty() {
        println!("Wrote {} files", exported.len());
        for path in exported {
            println!("  {}", path.display());
        }
    }
}

fn print_fit(fit: &ModelFit) {
    println!("Model: {}", fit.formula);
    println!("{}", coefficient_table(fit));
    if !fit.aliased.is_empty() {
        println!("Aliased terms: {}", fit.aliased.join(", "));
    }
    match &fit.statistics {
        FitStatistics::Gaussian {
            r_squared,
            adj_r_squared,
            residual_std_error,
            f_statistic,
            f_p_value,
        } => {
            println!(
                "Residual standard error: {residual_std_error:.4} on {} degrees of freedom",
                fit.df_residual
            );
            println!("R-squared: {r_squared:.4}, adjusted R-squared: {adj_r_squared:.4}");
            println!("F-statistic: {f_statistic:.3}, p-value: {}", format_p(*f_p_value));
        }
        FitStatistics::Binomial {
            null_deviance,
            residual_deviance,
            aic,
            iterations,
        } => {
            println!(
                "Null deviance: {null_deviance:.2}, residual deviance: {residual_deviance:.2} \
                 on {} degrees of freedom",
                fit.df_residual
            );
            println!("AIC: {aic:.2}");
            println!("Fisher scoring iterations: {iterations}");
        }
    }
}

fn coefficient_table(fit: &ModelFit) -> Table {
    let statistic = match fit.statistics {
        FitStatistics::Gaussian { .. } => "t value",
        FitStatistics::Binomial { .. } => "z value",
    };
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Term"),
        header_cell("Estimate"),
        header_cell("Std. Error"),
        header_cell(statistic),
        header_cell("p-value"),
    ]);
    apply_wide_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for c in &fit.coefficients {
        table.add_row(vec![
            Cell::new(&c.term),
            Cell::new(format!("{:.6}", c.estimate)),
            Cell::new(format!("{:.6}", c.std_error)),
            Cell::new(format!("{:.3}", c.statistic)),
            p_cell(c.p_value),
        ]);
    }
    table
}

fn summary_table(summaries: &[SummaryStats]) -> Table {
    let mut table = Table::new();
    table.set_header(
        ["Column", "N", "Missing", "Mean", "Median", "Std", "Min", "Max", "P05", "P95"]
            .into_iter()
            .map(header_cell)
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut table);
    for index in 1..=9 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for s in summaries {
        let mut row = vec![Cell::new(&s.column), Cell::new(s.count), Cell::new(s.missing)];
        row.extend(
            [s.mean, s.median, s.std, s.min, s.max, s.p05, s.p95]
                .into_iter()
                .map(|v| Cell::new(format!("{v:.4}"))),
        );
        table.add_row(row);
    }
    table
}

fn preview_table(df: &DataFrame, rows: usize) -> Table {
    let mut table = Table::new();
    table.set_header(
        df.get_column_names()
            .into_iter()
            .map(|name| header_cell(name.as_str()))
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut table);
    for row in 0..rows.min(df.height()) {
        let cells: Vec<Cell> = df
            .get_columns()
            .iter()
            .map(|column| match column.get(row) {
                Ok(value) if value.is_null() => dim_cell("null"),
                Ok(value) => Cell::new(format!("{value}").trim_matches('"')),
                Err(_) => dim_cell("?"),
            })
            .collect();
        table.add_row(cells);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn apply_wide_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn format_p(p: f64) -> String {
    if p < 2e-16 {
        "< 2e-16".to_string()
    } else if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

fn p_cell(p: f64) -> Cell {
    let cell = Cell::new(format_p(p));
    if p < ALPHA {
        cell.fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).add_attribute(Attribute::Dim)
}
